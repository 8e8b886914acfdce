//! Event source adapters.
//!
//! A source is the listener stage of the pipeline: it receives raw
//! announcements from somewhere and offers them to the parser relay.
//!
//! # Available Sources
//!
//! - [`TelegramSource`] - Long-polls the Telegram Bot API for channel posts
//! - [`JsonlSource`] - Replays [`RawEvent`] JSON lines from files or stdin
//!
//! Sources never block on the parser. A full relay drops the event, and a
//! triggered [`Shutdown`] stops new intake.

mod jsonl;
mod telegram;

pub use jsonl::{JsonlConfig, JsonlSource};
pub use telegram::{
    event_from_update, Chat, Message, MessageEntity, TelegramConfig, TelegramSource, Update,
};

use std::future::Future;

use metrics::counter;
use postboard_core::RawEvent;

use crate::pipeline::{Offer, Relay};
use crate::shutdown::Shutdown;
use crate::Result;

/// A producer of raw announcements.
pub trait EventSource {
    /// Human-readable name for this source (used in logs).
    fn name(&self) -> &'static str;

    /// Deliver events into `relay` until the source is exhausted or
    /// `shutdown` is triggered.
    fn run(
        &mut self,
        relay: Relay<RawEvent>,
        shutdown: Shutdown,
    ) -> impl Future<Output = Result<SourceStats>> + Send;
}

/// Statistics from running an event source.
#[derive(Debug, Clone, Default)]
pub struct SourceStats {
    /// Events received from the underlying source.
    pub total_events: usize,

    /// Events accepted by the parser relay.
    pub delivered: usize,

    /// Events dropped because the parser relay was full.
    pub dropped: usize,

    /// Events skipped before delivery (empty text, foreign chat).
    pub skipped: usize,

    /// Input that could not be decoded at all.
    pub parse_errors: usize,

    /// Source-specific metadata.
    pub source_metadata: SourceMetadata,
}

/// Source-specific metadata.
#[derive(Debug, Clone, Default)]
pub struct SourceMetadata {
    /// For file-based sources: number of files processed.
    pub files_processed: Option<usize>,

    /// For file-based sources: total bytes read.
    pub bytes_read: Option<usize>,

    /// For polling sources: number of successful polls.
    pub polls: Option<usize>,

    /// For polling sources: number of failed polls.
    pub poll_failures: Option<usize>,
}

/// What a source should do after [`deliver`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Delivery {
    Continue,
    /// The parser is gone; stop reading.
    Stop,
}

/// Offer one event to the parser relay, updating stats and logging drops.
pub(crate) fn deliver(relay: &Relay<RawEvent>, event: RawEvent, stats: &mut SourceStats) -> Delivery {
    stats.total_events += 1;
    counter!("ingest_events_received_total").increment(1);

    if event.text.is_empty() {
        stats.skipped += 1;
        tracing::debug!(origin_id = event.origin_id, "Skipping empty message");
        return Delivery::Continue;
    }

    match relay.offer(event) {
        Offer::Sent => {
            stats.delivered += 1;
            Delivery::Continue
        }
        Offer::Dropped(event) => {
            stats.dropped += 1;
            tracing::warn!(
                hop = relay.hop(),
                text = %event.text,
                "Message channel full, skipping message"
            );
            Delivery::Continue
        }
        Offer::Closed(_) => {
            tracing::warn!("Parser stopped, source exiting");
            Delivery::Stop
        }
    }
}
