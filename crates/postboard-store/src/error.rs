//! Error types for document store operations.

use std::time::Duration;

use thiserror::Error;

/// Result type alias using the crate's error type.
pub type Result<T> = std::result::Result<T, StoreError>;

/// Errors surfaced by a [`crate::DocumentStore`] backend.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StoreError {
    /// A document could not be written.
    #[error("write failed: {0}")]
    WriteFailed(String),

    /// Index (or backing table) creation failed. Fatal at startup.
    #[error("index creation failed: {0}")]
    IndexCreationFailed(String),

    /// A read, count or aggregation failed.
    #[error("query failed: {0}")]
    QueryFailed(String),

    /// The store did not answer a liveness check.
    #[error("store unreachable: {0}")]
    Unreachable(String),

    /// The operation exceeded its per-call deadline.
    #[error("{operation} timed out after {after:?}")]
    Timeout {
        /// Operation name, e.g. `"insert_one"`.
        operation: &'static str,
        /// Deadline that was exceeded.
        after: Duration,
    },
}

impl StoreError {
    pub fn is_timeout(&self) -> bool {
        matches!(self, Self::Timeout { .. })
    }
}
