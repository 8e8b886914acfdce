//! ClickHouse document store.
//!
//! Records live in a single MergeTree table:
//!
//! ```sql
//! CREATE TABLE posts (
//!     name        String,
//!     type        String,
//!     tags        Array(String),
//!     url         String,
//!     ingested_at UInt64
//! ) ENGINE = MergeTree ORDER BY ingested_at
//! ```
//!
//! `ingested_at` (Unix microseconds) is not part of the record; it only gives
//! reads a stable insertion order for pagination. [`Filter`]s are rendered
//! into parameterised WHERE clauses, and the secondary indexes are
//! data-skipping indexes: `bloom_filter` for tag membership and `tokenbf_v1`
//! for name search.

use async_trait::async_trait;
use clickhouse::{Client, Row};
use postboard_core::Record;
use serde::{Deserialize, Serialize};

use crate::error::{Result, StoreError};
use crate::filter::{Aggregation, Field, Filter, IndexSpec};
use crate::DocumentStore;

/// Connection settings for [`ClickHouseStore`].
#[derive(Debug, Clone)]
pub struct ClickHouseConfig {
    /// ClickHouse server URL (e.g., "http://localhost:8123")
    pub url: String,

    /// Database name
    pub database: String,

    /// Table holding one row per record
    pub table: String,
}

impl Default for ClickHouseConfig {
    fn default() -> Self {
        Self {
            url: "http://localhost:8123".to_string(),
            database: "postboard".to_string(),
            table: "posts".to_string(),
        }
    }
}

/// Row written for each record.
#[derive(Debug, Clone, Row, Serialize)]
struct InsertRow<'a> {
    name: &'a str,
    #[serde(rename = "type")]
    r#type: &'a str,
    tags: &'a [String],
    url: &'a str,
    ingested_at: u64,
}

/// Row read back as a record.
#[derive(Debug, Clone, Row, Deserialize)]
struct PostRow {
    name: String,
    #[serde(rename = "type")]
    r#type: String,
    tags: Vec<String>,
    url: String,
}

impl From<PostRow> for Record {
    fn from(row: PostRow) -> Self {
        Record {
            name: row.name,
            r#type: row.r#type,
            tags: row.tags,
            url: row.url,
        }
    }
}

#[derive(Debug, Clone, Row, Deserialize)]
struct ValueRow {
    value: String,
}

/// [`crate::DocumentStore`] backed by ClickHouse.
pub struct ClickHouseStore {
    client: Client,
    config: ClickHouseConfig,
}

impl ClickHouseStore {
    pub fn new(config: ClickHouseConfig) -> Self {
        let client = Client::default()
            .with_url(&config.url)
            .with_database(&config.database);

        tracing::info!(
            "ClickHouse store initialized: url={}, database={}, table={}",
            config.url,
            config.database,
            config.table
        );

        Self { client, config }
    }

    async fn ensure_table(&self) -> Result<()> {
        let ddl = format!(
            "CREATE TABLE IF NOT EXISTS {} (
                name String,
                `type` String,
                tags Array(String),
                url String,
                ingested_at UInt64
            ) ENGINE = MergeTree ORDER BY ingested_at",
            self.config.table
        );

        self.client
            .query(&ddl)
            .execute()
            .await
            .map_err(|e| StoreError::IndexCreationFailed(e.to_string()))
    }
}

#[async_trait]
impl DocumentStore for ClickHouseStore {
    fn name(&self) -> &'static str {
        "clickhouse"
    }

    async fn ping(&self) -> Result<()> {
        let result: u8 = self
            .client
            .query("SELECT 1")
            .fetch_one()
            .await
            .map_err(|e| StoreError::Unreachable(e.to_string()))?;

        if result == 1 {
            Ok(())
        } else {
            Err(StoreError::Unreachable(format!("unexpected ping result {result}")))
        }
    }

    async fn insert_one(&self, record: &Record) -> Result<()> {
        let row = InsertRow {
            name: &record.name,
            r#type: &record.r#type,
            tags: &record.tags,
            url: &record.url,
            ingested_at: chrono::Utc::now().timestamp_micros().max(0) as u64,
        };

        let write = async {
            let mut insert = self.client.insert(&self.config.table)?;
            insert.write(&row).await?;
            insert.end().await
        };

        write
            .await
            .map_err(|e: clickhouse::error::Error| StoreError::WriteFailed(e.to_string()))
    }

    async fn find(&self, filter: &Filter, skip: u64, limit: u64) -> Result<Vec<Record>> {
        let clause = WhereClause::render(filter);
        let sql = format!(
            "SELECT name, `type`, tags, url FROM {} WHERE {} ORDER BY ingested_at LIMIT ? OFFSET ?",
            self.config.table, clause.sql
        );

        let mut query = self.client.query(&sql);
        for value in &clause.binds {
            query = query.bind(value.as_str());
        }

        let rows: Vec<PostRow> = query
            .bind(limit)
            .bind(skip)
            .fetch_all()
            .await
            .map_err(|e| StoreError::QueryFailed(e.to_string()))?;

        Ok(rows.into_iter().map(Record::from).collect())
    }

    async fn count(&self, filter: &Filter) -> Result<u64> {
        let clause = WhereClause::render(filter);
        let sql = format!(
            "SELECT count() FROM {} WHERE {}",
            self.config.table, clause.sql
        );

        let mut query = self.client.query(&sql);
        for value in &clause.binds {
            query = query.bind(value.as_str());
        }

        query
            .fetch_one::<u64>()
            .await
            .map_err(|e| StoreError::QueryFailed(e.to_string()))
    }

    async fn aggregate(&self, aggregation: &Aggregation) -> Result<Vec<String>> {
        let query = match aggregation {
            Aggregation::DistinctTags => self.client.query(&format!(
                "SELECT DISTINCT arrayJoin(tags) AS value FROM {} ORDER BY value",
                self.config.table
            )),
            Aggregation::DistinctLastTags { pattern } => self
                .client
                .query(&format!(
                    "SELECT DISTINCT value FROM (
                        SELECT arrayElement(tags, -1) AS value FROM {} WHERE notEmpty(tags)
                    ) WHERE match(value, ?) ORDER BY value",
                    self.config.table
                ))
                .bind(pattern.as_str()),
        };

        let rows: Vec<ValueRow> = query
            .fetch_all()
            .await
            .map_err(|e| StoreError::QueryFailed(e.to_string()))?;

        Ok(rows.into_iter().map(|row| row.value).collect())
    }

    async fn create_indexes(&self, specs: &[IndexSpec]) -> Result<()> {
        self.ensure_table().await?;

        for spec in specs {
            let ddl = format!(
                "ALTER TABLE {} ADD INDEX IF NOT EXISTS {} {} GRANULARITY 1",
                self.config.table,
                spec.name(),
                index_definition(spec)
            );

            self.client
                .query(&ddl)
                .execute()
                .await
                .map_err(|e| StoreError::IndexCreationFailed(format!("{}: {}", spec.name(), e)))?;
        }

        tracing::info!(
            table = %self.config.table,
            indexes = ?specs.iter().map(IndexSpec::name).collect::<Vec<_>>(),
            "ClickHouse indexes ensured"
        );

        Ok(())
    }
}

fn column(field: Field) -> &'static str {
    match field {
        Field::Type => "`type`",
        other => other.as_str(),
    }
}

fn index_definition(spec: &IndexSpec) -> String {
    match spec {
        IndexSpec::Multikey { field } => format!("{} TYPE bloom_filter", column(*field)),
        IndexSpec::Text { field } => format!("{} TYPE tokenbf_v1(8192, 3, 0)", column(*field)),
    }
}

/// A WHERE clause with `?` placeholders and the values to bind, in order.
#[derive(Debug, Default, PartialEq, Eq)]
struct WhereClause {
    sql: String,
    binds: Vec<String>,
}

impl WhereClause {
    fn render(filter: &Filter) -> Self {
        let mut binds = Vec::new();
        let sql = Self::render_into(filter, &mut binds);
        Self { sql, binds }
    }

    fn render_into(filter: &Filter, binds: &mut Vec<String>) -> String {
        match filter {
            Filter::All => "1".to_string(),
            Filter::Eq { field, value } => {
                binds.push(value.clone());
                if field.is_array() {
                    format!("has({}, ?)", column(*field))
                } else {
                    format!("{} = ?", column(*field))
                }
            }
            Filter::Regex {
                field,
                pattern,
                case_insensitive,
            } => {
                binds.push(if *case_insensitive {
                    format!("(?i){pattern}")
                } else {
                    pattern.clone()
                });
                if field.is_array() {
                    format!("arrayExists(t -> match(t, ?), {})", column(*field))
                } else {
                    format!("match({}, ?)", column(*field))
                }
            }
            Filter::And(filters) if filters.is_empty() => "1".to_string(),
            Filter::And(filters) => filters
                .iter()
                .map(|f| format!("({})", Self::render_into(f, binds)))
                .collect::<Vec<_>>()
                .join(" AND "),
        }
    }
}
