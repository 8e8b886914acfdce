//! Shared store handle with per-call deadlines.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use postboard_core::Record;

use crate::error::{Result, StoreError};
use crate::filter::{Aggregation, Filter, IndexSpec};
use crate::DocumentStore;

/// Per-call deadlines for store operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StoreTimeouts {
    /// Point reads and writes: ping, insert, paginated find.
    pub point: Duration,

    /// Full scans: count, aggregations, index creation.
    pub scan: Duration,
}

impl Default for StoreTimeouts {
    fn default() -> Self {
        Self {
            point: Duration::from_secs(5),
            scan: Duration::from_secs(10),
        }
    }
}

/// Run a store future under a deadline.
///
/// An elapsed deadline becomes [`StoreError::Timeout`].
pub async fn with_timeout<T, F>(operation: &'static str, after: Duration, future: F) -> Result<T>
where
    F: Future<Output = Result<T>>,
{
    match tokio::time::timeout(after, future).await {
        Ok(result) => result,
        Err(_) => {
            tracing::warn!(operation, ?after, "store operation timed out");
            Err(StoreError::Timeout { operation, after })
        }
    }
}

/// Process-wide store handle.
///
/// Constructed once at startup and cloned into the persister and the query
/// service. Every call is bounded by [`StoreTimeouts`].
#[derive(Clone)]
pub struct Store {
    backend: Arc<dyn DocumentStore>,
    timeouts: StoreTimeouts,
}

impl Store {
    pub fn new(backend: Arc<dyn DocumentStore>, timeouts: StoreTimeouts) -> Self {
        Self { backend, timeouts }
    }

    /// Wrap a backend with default timeouts.
    pub fn from_backend<S: DocumentStore + 'static>(backend: S) -> Self {
        Self::new(Arc::new(backend), StoreTimeouts::default())
    }

    pub fn backend_name(&self) -> &'static str {
        self.backend.name()
    }

    pub fn timeouts(&self) -> StoreTimeouts {
        self.timeouts
    }

    pub async fn ping(&self) -> Result<()> {
        with_timeout("ping", self.timeouts.point, self.backend.ping()).await
    }

    pub async fn insert_one(&self, record: &Record) -> Result<()> {
        with_timeout(
            "insert_one",
            self.timeouts.point,
            self.backend.insert_one(record),
        )
        .await
    }

    pub async fn find(&self, filter: &Filter, skip: u64, limit: u64) -> Result<Vec<Record>> {
        tracing::debug!(filter = %filter.to_document(), skip, limit, "find");
        with_timeout(
            "find",
            self.timeouts.point,
            self.backend.find(filter, skip, limit),
        )
        .await
    }

    pub async fn count(&self, filter: &Filter) -> Result<u64> {
        tracing::debug!(filter = %filter.to_document(), "count");
        with_timeout("count", self.timeouts.scan, self.backend.count(filter)).await
    }

    pub async fn aggregate(&self, aggregation: &Aggregation) -> Result<Vec<String>> {
        tracing::debug!(pipeline = %aggregation.to_pipeline(), "aggregate");
        with_timeout(
            aggregation.name(),
            self.timeouts.scan,
            self.backend.aggregate(aggregation),
        )
        .await
    }

    pub async fn create_indexes(&self, specs: &[IndexSpec]) -> Result<()> {
        with_timeout(
            "create_indexes",
            self.timeouts.scan,
            self.backend.create_indexes(specs),
        )
        .await
    }
}
