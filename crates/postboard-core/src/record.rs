//! Pipeline payloads: the raw listener event and the validated record.

use serde::{Deserialize, Serialize};

/// Unparsed input unit delivered by a listener.
///
/// The URL travels out-of-band (e.g. a link entity attached to a channel
/// post), so it is carried next to the text rather than inside it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawEvent {
    /// Free-text announcement body.
    pub text: String,

    /// Link supplied by the listener, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,

    /// Identifier of the channel the event originated from.
    #[serde(default)]
    pub origin_id: i64,
}

impl RawEvent {
    pub fn new(text: impl Into<String>, url: Option<String>, origin_id: i64) -> Self {
        Self {
            text: text.into(),
            url,
            origin_id,
        }
    }

    /// The supplied URL, exactly as delivered, when present and non-empty.
    pub fn url(&self) -> Option<&str> {
        self.url.as_deref().filter(|url| !url.is_empty())
    }
}

/// A validated announcement, ready for storage.
///
/// Serializes to the persisted document shape `{name, type, tags, url}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Record {
    pub name: String,

    #[serde(rename = "type")]
    pub r#type: String,

    /// Tags in parse order. Duplicates are kept.
    pub tags: Vec<String>,

    pub url: String,
}

impl Record {
    /// The language code carried by the last tag, if it follows the
    /// two-lowercase-letter convention.
    pub fn language(&self) -> Option<&str> {
        self.tags
            .last()
            .map(|tag| tag.strip_prefix('#').unwrap_or(tag))
            .filter(|tag| is_language_code(tag))
    }
}

/// Normalize a tag token: trim, drop at most one leading `#`, trim again.
pub fn normalize_tag(raw: &str) -> String {
    let trimmed = raw.trim();
    trimmed
        .strip_prefix('#')
        .unwrap_or(trimmed)
        .trim()
        .to_string()
}

/// Whether a tag is exactly two ASCII lowercase letters.
pub fn is_language_code(tag: &str) -> bool {
    tag.len() == 2 && tag.bytes().all(|b| b.is_ascii_lowercase())
}
