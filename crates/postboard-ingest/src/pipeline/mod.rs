//! The three-stage ingestion pipeline.
//!
//! ```text
//! [EventSource] --listener_to_parser--> [parser] --parser_to_persister--> [Persister]
//!                                                                              |
//!                                                                        DocumentStore
//! ```
//!
//! Each arrow is a bounded [`Relay`] that drops on full. Stages run as
//! independent tokio tasks and never block on one another; items within one
//! hop keep their order. A record already written is never rolled back.

mod parser;
mod persister;
mod relay;

pub use parser::{run_parser, ParserStats};
pub use persister::{Persister, PersisterStats, RECORD_INDEXES};
pub use relay::{relay, Offer, Relay};

use postboard_core::RawEvent;
use postboard_store::Store;
use tokio::task::JoinHandle;

use crate::Result;

/// Hop between the listener and the parser.
pub const LISTENER_TO_PARSER: &str = "listener_to_parser";
/// Hop between the parser and the persister.
pub const PARSER_TO_PERSISTER: &str = "parser_to_persister";

/// Pipeline tuning.
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    /// Capacity of each relay.
    pub relay_capacity: usize,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            relay_capacity: 100,
        }
    }
}

/// Combined counters returned when the pipeline drains.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PipelineStats {
    pub parser: ParserStats,
    pub persister: PersisterStats,
}

/// Running parser and persister tasks plus the intake relay feeding them.
pub struct Pipeline {
    intake: Relay<RawEvent>,
    parser: JoinHandle<ParserStats>,
    persister: JoinHandle<PersisterStats>,
}

impl Pipeline {
    /// Spawn the parser and persister tasks. Must be called inside a tokio
    /// runtime.
    pub fn start(store: Store, config: &PipelineConfig) -> Self {
        let persister = Persister::new(store);
        let (intake, events) = relay(LISTENER_TO_PARSER, config.relay_capacity);
        let (records_out, records) = relay(PARSER_TO_PERSISTER, config.relay_capacity);

        let parser = tokio::spawn(run_parser(events, records_out));
        let persister = tokio::spawn(persister.run(records));

        tracing::info!(
            relay_capacity = config.relay_capacity,
            "Pipeline started"
        );

        Self {
            intake,
            parser,
            persister,
        }
    }

    /// Relay a source should deliver raw events into.
    pub fn intake(&self) -> Relay<RawEvent> {
        self.intake.clone()
    }

    /// Close the intake and wait for both stages to drain.
    ///
    /// Every clone handed out by [`Pipeline::intake`] must be dropped first,
    /// otherwise the parser keeps waiting for input.
    pub async fn shutdown(self) -> Result<PipelineStats> {
        drop(self.intake);

        let parser = self.parser.await?;
        let persister = self.persister.await?;

        tracing::info!(
            parsed = parser.forwarded,
            rejected = parser.rejected,
            saved = persister.saved,
            failed = persister.failed,
            "Pipeline drained"
        );

        Ok(PipelineStats { parser, persister })
    }
}
