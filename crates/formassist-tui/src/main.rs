use std::path::PathBuf;
use anyhow::Result;
use clap::{Parser, Subcommand};
use formassist_core::{AssistantClient, Config};

mod app;
mod cli;
mod handler;
mod logging;
mod tui;
mod ui;

use app::App;
use tui::{EventHandler, Tui};

#[derive(Parser)]
#[command(name = "formassist")]
#[command(about = "Chat with the form assistant, upload question documents and download the answers")]
#[command(version)]
struct Cli {
    /// Assistant server origin (overrides the config file and FORMASSIST_SERVER)
    #[arg(short, long, global = true)]
    server: Option<String>,
    /// Language the assistant should work in
    #[arg(short, long, global = true)]
    language: Option<String>,
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Send one message and print the reply
    Ask {
        /// Your message
        message: String,
    },
    /// Ask the assistant to rephrase its last question
    Rephrase,
    /// Upload a document of questions
    Upload {
        /// Path to the document
        path: PathBuf,
    },
    /// Download a generated artifact
    Download {
        /// Download reference returned by the assistant, e.g. /download/qa.txt
        link: String,
        /// Directory to save into
        #[arg(short, long)]
        dir: Option<PathBuf>,
    },
    /// Show the resolved configuration
    Config,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // The TUI owns the terminal, so it logs to a file
    let _log_guard = match cli.command {
        None => Some(logging::init_file()?),
        Some(_) => {
            logging::init_stderr();
            None
        }
    };

    let config = Config::load().unwrap_or_else(|err| {
        tracing::warn!(error = %err, "falling back to default configuration");
        Config::new()
    });

    let server = cli.server.unwrap_or_else(|| config.server_url());
    let language = cli.language.unwrap_or_else(|| config.language());
    let client = AssistantClient::with_timeout(&server, config.request_timeout())?;

    match cli.command {
        None => run_tui(client, &language, config.download_dir()).await,
        Some(Commands::Ask { message }) => cli::ask(client, &language, &message).await,
        Some(Commands::Rephrase) => cli::rephrase(client, &language).await,
        Some(Commands::Upload { path }) => cli::upload(client, &language, &path).await,
        Some(Commands::Download { link, dir }) => {
            let dir = dir.unwrap_or_else(|| config.download_dir());
            cli::download(client, &link, &dir).await
        }
        Some(Commands::Config) => cli::show_config(&config, &server, &language),
    }
}

async fn run_tui(client: AssistantClient, language: &str, download_dir: PathBuf) -> Result<()> {
    tracing::info!(server = client.base_url(), language, "starting conversation client");

    tui::install_panic_hook();
    let mut terminal = tui::init()?;
    let mut app = App::new(client, language, download_dir);
    let mut events = EventHandler::new();

    let result = run_loop(&mut terminal, &mut app, &mut events).await;

    app.abort_tasks();
    tui::restore()?;
    result
}

async fn run_loop(terminal: &mut Tui, app: &mut App, events: &mut EventHandler) -> Result<()> {
    while !app.should_quit {
        terminal.draw(|frame| ui::render(app, frame))?;

        match events.next().await {
            Some(event) => handler::handle_event(app, event),
            None => break,
        }

        app.poll_tasks().await;
    }
    Ok(())
}
