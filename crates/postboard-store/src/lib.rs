//! Document store abstraction for Postboard records.
//!
//! Both the ingest pipeline (writes) and the read API (queries) talk to the
//! store through a shared [`Store`] handle wrapping a [`DocumentStore`]
//! backend:
//!
//! - [`MemoryStore`] - in-process, used by tests and embedders
//! - [`ClickHouseStore`] - durable backend used by the binaries
//!
//! Queries are expressed as store-neutral [`Filter`] and [`Aggregation`]
//! values so any backend with equivalent equality, regex and distinct-value
//! semantics can be substituted.

mod clickhouse;
mod error;
mod filter;
mod memory;
mod shared;

use async_trait::async_trait;
use postboard_core::Record;

pub use self::clickhouse::{ClickHouseConfig, ClickHouseStore};
pub use self::error::{Result, StoreError};
pub use self::filter::{Aggregation, Field, Filter, IndexSpec};
pub use self::memory::MemoryStore;
pub use self::shared::{with_timeout, Store, StoreTimeouts};

/// Operations the pipeline and the read API need from a document store.
///
/// Implementations must be safe to share across tasks; the store's own
/// concurrency control governs read/write isolation.
#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// Backend name for logs.
    fn name(&self) -> &'static str;

    /// Liveness check, used at startup and by health endpoints.
    async fn ping(&self) -> Result<()>;

    /// Write one document per record. Not idempotent.
    async fn insert_one(&self, record: &Record) -> Result<()>;

    /// Matching records in insertion order, after skipping `skip`.
    async fn find(&self, filter: &Filter, skip: u64, limit: u64) -> Result<Vec<Record>>;

    /// Number of matching records, ignoring pagination.
    async fn count(&self, filter: &Filter) -> Result<u64>;

    /// Distinct values, ascending.
    async fn aggregate(&self, aggregation: &Aggregation) -> Result<Vec<String>>;

    /// Create the given secondary indexes if they do not exist.
    async fn create_indexes(&self, specs: &[IndexSpec]) -> Result<()>;
}
