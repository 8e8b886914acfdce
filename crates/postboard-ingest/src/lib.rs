//! Postboard ingestion pipeline components.
//!
//! This crate turns free-form channel announcements into structured records
//! and writes them to the document store.
//!
//! # Modules
//!
//! - [`pipeline`] - Relays, the parser stage and the persister
//! - [`source`] - Event source adapters (Telegram, JSONL replay)
//! - [`shutdown`] - Cooperative stop signal
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────┐
//! │  Event Source   │  (Telegram channel, JSONL replay)
//! └────────┬────────┘
//!          │ listener_to_parser (bounded, drop on full)
//!          ▼
//! ┌─────────────────┐
//! │     Parser      │  text -> Record, failures logged and skipped
//! └────────┬────────┘
//!          │ parser_to_persister (bounded, drop on full)
//!          ▼
//! ┌─────────────────┐
//! │    Persister    │  one insert per record, failures logged
//! └─────────────────┘
//! ```
//!
//! Delivery is at-most-once: a full relay, a parse failure or a failed
//! write loses the item, and nothing is retried.

pub mod error;
pub mod pipeline;
pub mod shutdown;
pub mod source;

// Re-export commonly used types at crate root
pub use error::{Error, Result};

pub use pipeline::{
    Offer, Persister, PersisterStats, ParserStats, Pipeline, PipelineConfig, PipelineStats, Relay,
    RECORD_INDEXES,
};
pub use shutdown::Shutdown;

pub use source::{
    EventSource, JsonlConfig, JsonlSource, SourceMetadata, SourceStats, TelegramConfig,
    TelegramSource,
};
