//! Errors that can happen while syncing tasks
//!
//! Every variant renders as a human-readable message, which is what ends up in the status bar.

use thiserror::Error;

use crate::item::TaskId;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Error)]
pub enum Error {
    /// A command was rejected before anything was sent to the server
    #[error("{0}")]
    Validation(String),

    /// Timeout, connection failure or non-2xx HTTP status
    #[error("Network error: {0}")]
    Network(String),

    /// A single calendar record could not be decoded
    #[error("Unable to decode task: {0}")]
    Decode(String),

    /// The server location of a task is not known
    #[error("No location known for task {0}")]
    Lookup(TaskId),

    /// The fetched payload as a whole is unusable
    #[error("Invalid server response: {0}")]
    Parse(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<reqwest::Error> for Error {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            Error::Network(format!("request timed out ({})", err))
        } else {
            Error::Network(err.to_string())
        }
    }
}

impl From<minidom::Error> for Error {
    fn from(err: minidom::Error) -> Self {
        Error::Parse(err.to_string())
    }
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Error::Config(err.to_string())
    }
}

impl From<url::ParseError> for Error {
    fn from(err: url::ParseError) -> Self {
        Error::Config(format!("invalid URL: {}", err))
    }
}
