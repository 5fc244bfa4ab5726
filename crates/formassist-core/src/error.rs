use std::path::PathBuf;

use thiserror::Error;

use crate::state::RequestKind;

/// Failure talking to the assistant backend.
#[derive(Debug, Error)]
pub enum ApiError {
    /// The request never produced a response.
    #[error("failed to reach {url}: {source}")]
    Transport {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("request to {url} timed out")]
    Timeout { url: String },

    /// The server answered with a non-success status. `error` carries the
    /// `error` field of the JSON body when there was one.
    #[error("server responded with HTTP {status}: {}", .error.as_deref().unwrap_or("no error detail"))]
    Status { status: u16, error: Option<String> },

    #[error("unexpected response from {url}: {source}")]
    Decode {
        url: String,
        #[source]
        source: serde_json::Error,
    },

    /// The background task running the request panicked or was aborted.
    #[error("request task ended unexpectedly: {0}")]
    Task(String),

    #[error("failed to write {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl ApiError {
    pub(crate) fn from_send(url: &str, source: reqwest::Error) -> Self {
        if source.is_timeout() {
            ApiError::Timeout {
                url: url.to_string(),
            }
        } else {
            ApiError::Transport {
                url: url.to_string(),
                source,
            }
        }
    }

    /// Error text supplied by the server, if the failure carried one.
    pub fn server_error(&self) -> Option<&str> {
        match self {
            ApiError::Status { error, .. } => error.as_deref(),
            _ => None,
        }
    }
}

/// An operation refused locally, before any request was issued.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum Rejected {
    #[error("message is empty")]
    EmptyMessage,

    #[error("no file selected")]
    NoFile,

    #[error("a {0} request is already in flight")]
    Busy(RequestKind),

    #[error("no download is available yet")]
    NoDownload,
}
