//! Error types for the ingest pipeline.

use postboard_store::StoreError;
use thiserror::Error;

/// Result type alias using the crate's error type.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur while ingesting announcements.
///
/// Per-event failures (parse errors, dropped items, failed writes) never
/// surface here; they are logged and counted where they happen.
#[derive(Error, Debug)]
pub enum Error {
    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON parsing error.
    #[error("JSON error: {0}")]
    Json(String),

    /// Document store error.
    #[error("Store error: {0}")]
    Store(#[from] StoreError),

    /// HTTP transport error (the request URL is stripped, it carries the bot token).
    #[error("HTTP error: {0}")]
    Http(String),

    /// Telegram Bot API returned `ok: false`.
    #[error("Telegram API error: {0}")]
    Telegram(String),

    /// Configuration error.
    #[error("Configuration error: {0}")]
    Config(String),

    /// A pipeline stage panicked or was cancelled.
    #[error("Pipeline task failed: {0}")]
    Task(String),
}

impl From<reqwest::Error> for Error {
    fn from(e: reqwest::Error) -> Self {
        Self::Http(e.without_url().to_string())
    }
}

impl From<tokio::task::JoinError> for Error {
    fn from(e: tokio::task::JoinError) -> Self {
        Self::Task(e.to_string())
    }
}
