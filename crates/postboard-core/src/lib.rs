//! Core types, parsing and shared utilities for the Postboard announcement feed.
//!
//! This crate provides:
//! - [`RawEvent`] and [`Record`], the two payloads that flow through the
//!   ingest pipeline
//! - The text-to-record parser ([`parse`]) that turns a free-text
//!   announcement into a validated [`Record`]
//! - Tag normalization and the language-tag convention
//! - Prometheus metrics helpers
//!
//! # Announcement Format
//!
//! ```text
//! Name: Foo
//! Type: Library
//! Tags: #go #backend #us
//! ```
//!
//! The URL is never parsed from the text; the listener supplies it
//! alongside the text (see [`RawEvent::url`]).

mod error;
pub mod metrics;
mod parse;
mod record;

/// Keys every announcement must carry, in the order they are validated.
pub const REQUIRED_FIELDS: [&str; 3] = ["name", "type", "tags"];

/// Characters that may separate tags in the raw `Tags:` value.
pub const TAG_SEPARATORS: [char; 4] = [' ', ',', ';', '|'];

pub use error::{ParseError, Result};
pub use parse::{parse, parse_fields, split_tags};
pub use record::{is_language_code, normalize_tag, RawEvent, Record};
