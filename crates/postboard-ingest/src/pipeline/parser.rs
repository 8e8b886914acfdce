//! Parser stage: raw events in, records out.

use metrics::counter;
use postboard_core::{parse, RawEvent, Record};
use tokio::sync::mpsc;

use super::relay::{Offer, Relay};

/// Counters for one parser run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ParserStats {
    /// Raw events taken off the inbound relay.
    pub received: usize,
    /// Records handed to the persister.
    pub forwarded: usize,
    /// Events discarded by the parser.
    pub rejected: usize,
    /// Records dropped because the persister relay was full.
    pub dropped: usize,
}

/// Parse events until the inbound relay closes.
///
/// Parse failures are logged and discarded; nothing here blocks on the
/// persister.
pub async fn run_parser(mut input: mpsc::Receiver<RawEvent>, output: Relay<Record>) -> ParserStats {
    let mut stats = ParserStats::default();
    tracing::info!("Parser started");

    while let Some(event) = input.recv().await {
        stats.received += 1;

        let record = match parse(&event) {
            Ok(record) => record,
            Err(e) => {
                stats.rejected += 1;
                counter!("ingest_parse_failures_total", "reason" => e.reason()).increment(1);
                tracing::warn!(
                    origin_id = event.origin_id,
                    error = %e,
                    "Skipping message due to processing error"
                );
                continue;
            }
        };
        counter!("ingest_records_parsed_total").increment(1);

        match output.offer(record) {
            Offer::Sent => {
                stats.forwarded += 1;
            }
            Offer::Dropped(record) => {
                stats.dropped += 1;
                tracing::warn!(
                    hop = output.hop(),
                    name = %record.name,
                    "Output relay full, skipping record"
                );
            }
            Offer::Closed(record) => {
                tracing::warn!(name = %record.name, "Persister stopped, parser exiting");
                break;
            }
        }
    }

    tracing::info!(
        received = stats.received,
        forwarded = stats.forwarded,
        rejected = stats.rejected,
        dropped = stats.dropped,
        "Parser stopped"
    );
    stats
}
