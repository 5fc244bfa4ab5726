use std::path::PathBuf;
use anyhow::{Result, anyhow};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

const LOG_FILE: &str = "formassist.log";

fn env_filter(default: &str) -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default))
}

/// Log to a file while the TUI owns the terminal.
///
/// Keep the returned guard alive for the whole session; dropping it flushes
/// and stops the background writer.
pub fn init_file() -> Result<(WorkerGuard, PathBuf)> {
    let dir = log_dir()?;
    std::fs::create_dir_all(&dir)?;

    let appender = tracing_appender::rolling::never(&dir, LOG_FILE);
    let (writer, guard) = tracing_appender::non_blocking(appender);

    let file_layer = fmt::layer()
        .with_writer(writer)
        .with_ansi(false)
        .with_target(true);

    tracing_subscriber::registry()
        .with(env_filter("info"))
        .with(file_layer)
        .init();

    let path = dir.join(LOG_FILE);
    tracing::debug!(path = %path.display(), "file logging initialized");
    Ok((guard, path))
}

/// Log to stderr for one-shot commands. Quiet unless something goes wrong.
pub fn init_stderr() {
    let stderr_layer = fmt::layer()
        .with_writer(std::io::stderr)
        .with_target(false)
        .compact();

    tracing_subscriber::registry()
        .with(env_filter("warn"))
        .with(stderr_layer)
        .init();
}

fn log_dir() -> Result<PathBuf> {
    dirs::data_local_dir()
        .or_else(dirs::cache_dir)
        .map(|dir| dir.join("formassist"))
        .ok_or_else(|| anyhow!("Could not determine data directory"))
}
