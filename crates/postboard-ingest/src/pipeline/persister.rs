//! Persister stage: writes records to the document store.
//!
//! One document per record, no identity key: the same record delivered
//! twice is stored twice. Failed writes are logged and the stage moves on;
//! there is no retry and no dead-letter store.

use metrics::counter;
use postboard_core::Record;
use postboard_store::{Field, IndexSpec, Store, StoreError};
use tokio::sync::mpsc;

/// Secondary indexes maintained on the record collection.
pub const RECORD_INDEXES: [IndexSpec; 2] = [
    IndexSpec::Multikey { field: Field::Tags },
    IndexSpec::Text { field: Field::Name },
];

/// Counters for one persister run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PersisterStats {
    pub saved: usize,
    pub failed: usize,
}

/// Writes records through the shared [`Store`] handle.
#[derive(Clone)]
pub struct Persister {
    store: Store,
}

impl Persister {
    pub fn new(store: Store) -> Self {
        Self { store }
    }

    /// Create the tag and name indexes. Call once at startup; a failure
    /// should abort the process.
    pub async fn ensure_indexes(&self) -> Result<(), StoreError> {
        self.store.create_indexes(&RECORD_INDEXES).await?;
        tracing::info!(
            backend = self.store.backend_name(),
            "Indexes created on tags and name"
        );
        Ok(())
    }

    /// Write one record under the store's point-write deadline.
    pub async fn save(&self, record: &Record) -> Result<(), StoreError> {
        self.store.insert_one(record).await
    }

    /// Persist records until the inbound relay closes.
    pub async fn run(self, mut input: mpsc::Receiver<Record>) -> PersisterStats {
        let mut stats = PersisterStats::default();
        tracing::info!(
            backend = self.store.backend_name(),
            "Persister started, listening for processed messages"
        );

        while let Some(record) = input.recv().await {
            match self.save(&record).await {
                Ok(()) => {
                    stats.saved += 1;
                    counter!("ingest_records_saved_total").increment(1);
                    tracing::info!(
                        name = %record.name,
                        r#type = %record.r#type,
                        tags = ?record.tags,
                        "Saved record"
                    );
                }
                Err(e) => {
                    stats.failed += 1;
                    counter!("ingest_save_failures_total").increment(1);
                    tracing::error!(name = %record.name, error = %e, "Failed to save record");
                }
            }
        }

        tracing::info!(saved = stats.saved, failed = stats.failed, "Persister stopped");
        stats
    }
}
