//! Error types for the chat client.

use thiserror::Error;

/// Chat client error type.
#[derive(Error, Debug)]
pub enum Error {
    /// HTTP request failed.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Invalid URL.
    #[error("Invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    /// JSON serialization/deserialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Reading the response body failed.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The streaming endpoint answered with a non-success status.
    #[error("API error ({status}): {message}")]
    Api {
        /// HTTP status code.
        status: u16,
        /// Response body, if any.
        message: String,
    },

    /// The streaming endpoint did not answer with `text/event-stream`.
    #[error("Unexpected content type: {0}")]
    UnexpectedContentType(String),

    /// Configuration error.
    #[error("Configuration error: {0}")]
    Config(String),

    /// A turn is still streaming and overlapping turns are disabled.
    #[error("A reply is still streaming")]
    TurnInProgress,

    /// The task driving a turn panicked or was cancelled.
    #[error("Turn task failed: {0}")]
    Join(#[from] tokio::task::JoinError),

    /// Stream ended before the backend sent `end`.
    #[error("Stream ended unexpectedly")]
    StreamEnded,
}

impl From<config::ConfigError> for Error {
    fn from(err: config::ConfigError) -> Self {
        Self::Config(err.to_string())
    }
}

/// Result type alias for chat client operations.
pub type Result<T> = std::result::Result<T, Error>;
