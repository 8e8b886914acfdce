//! Error types for announcement parsing.

use thiserror::Error;

/// Result type alias using the crate's error type.
pub type Result<T> = std::result::Result<T, ParseError>;

/// Reasons an announcement cannot become a [`crate::Record`].
///
/// Every variant is terminal for the offending event only: the pipeline
/// logs it, drops the event and moves on.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ParseError {
    /// A required key is absent or its value is blank.
    #[error("missing or empty required field: {0}")]
    MissingField(String),

    /// The listener did not supply a URL for the announcement.
    #[error("no valid URL found in message")]
    MissingUrl,

    /// The `tags` value contained only separators and `#` markers.
    #[error("no valid tags found after parsing")]
    NoValidTags,
}

impl ParseError {
    /// Short, stable label used for metrics.
    pub fn reason(&self) -> &'static str {
        match self {
            Self::MissingField(_) => "missing_field",
            Self::MissingUrl => "missing_url",
            Self::NoValidTags => "no_valid_tags",
        }
    }
}
