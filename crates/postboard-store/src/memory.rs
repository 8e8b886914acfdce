//! In-process document store.
//!
//! Keeps records in insertion order behind a `RwLock` and evaluates
//! [`Filter`]s directly. Used by tests and by embedders that do not need
//! durability.

use std::collections::BTreeSet;

use async_trait::async_trait;
use parking_lot::RwLock;
use postboard_core::Record;
use regex::{Regex, RegexBuilder};

use crate::error::{Result, StoreError};
use crate::filter::{Aggregation, Field, Filter, IndexSpec};
use crate::DocumentStore;

/// Vector-backed [`DocumentStore`].
#[derive(Default)]
pub struct MemoryStore {
    records: RwLock<Vec<Record>>,
    indexes: RwLock<Vec<IndexSpec>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a store pre-populated with `records`, in order.
    pub fn with_records(records: impl IntoIterator<Item = Record>) -> Self {
        Self {
            records: RwLock::new(records.into_iter().collect()),
            indexes: RwLock::new(Vec::new()),
        }
    }

    pub fn len(&self) -> usize {
        self.records.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.read().is_empty()
    }

    /// Snapshot of all stored records.
    pub fn records(&self) -> Vec<Record> {
        self.records.read().clone()
    }

    /// Indexes created so far.
    pub fn indexes(&self) -> Vec<IndexSpec> {
        self.indexes.read().clone()
    }
}

#[async_trait]
impl DocumentStore for MemoryStore {
    fn name(&self) -> &'static str {
        "memory"
    }

    async fn ping(&self) -> Result<()> {
        Ok(())
    }

    async fn insert_one(&self, record: &Record) -> Result<()> {
        self.records.write().push(record.clone());
        Ok(())
    }

    async fn find(&self, filter: &Filter, skip: u64, limit: u64) -> Result<Vec<Record>> {
        let matcher = Matcher::compile(filter)?;
        let records = self.records.read();

        Ok(records
            .iter()
            .filter(|record| matcher.matches(record))
            .skip(skip as usize)
            .take(limit as usize)
            .cloned()
            .collect())
    }

    async fn count(&self, filter: &Filter) -> Result<u64> {
        let matcher = Matcher::compile(filter)?;
        let records = self.records.read();

        Ok(records.iter().filter(|record| matcher.matches(record)).count() as u64)
    }

    async fn aggregate(&self, aggregation: &Aggregation) -> Result<Vec<String>> {
        let records = self.records.read();

        let values: BTreeSet<String> = match aggregation {
            Aggregation::DistinctTags => records
                .iter()
                .flat_map(|record| record.tags.iter().cloned())
                .collect(),
            Aggregation::DistinctLastTags { pattern } => {
                let regex = compile_regex(pattern, false)?;
                records
                    .iter()
                    .filter_map(|record| record.tags.last())
                    .filter(|tag| regex.is_match(tag))
                    .cloned()
                    .collect()
            }
        };

        Ok(values.into_iter().collect())
    }

    async fn create_indexes(&self, specs: &[IndexSpec]) -> Result<()> {
        let mut indexes = self.indexes.write();
        for spec in specs {
            if !indexes.contains(spec) {
                indexes.push(*spec);
            }
        }
        Ok(())
    }
}

/// A [`Filter`] with its regular expressions compiled.
enum Matcher<'a> {
    All,
    Eq { field: Field, value: &'a str },
    Regex { field: Field, regex: Regex },
    And(Vec<Matcher<'a>>),
}

impl<'a> Matcher<'a> {
    fn compile(filter: &'a Filter) -> Result<Self> {
        Ok(match filter {
            Filter::All => Self::All,
            Filter::Eq { field, value } => Self::Eq {
                field: *field,
                value,
            },
            Filter::Regex {
                field,
                pattern,
                case_insensitive,
            } => Self::Regex {
                field: *field,
                regex: compile_regex(pattern, *case_insensitive)?,
            },
            Filter::And(filters) => Self::And(
                filters
                    .iter()
                    .map(Matcher::compile)
                    .collect::<Result<Vec<_>>>()?,
            ),
        })
    }

    fn matches(&self, record: &Record) -> bool {
        match self {
            Self::All => true,
            Self::Eq { field, value } => field_values(record, *field).any(|v| v == *value),
            Self::Regex { field, regex } => field_values(record, *field).any(|v| regex.is_match(v)),
            Self::And(matchers) => matchers.iter().all(|m| m.matches(record)),
        }
    }
}

fn field_values(record: &Record, field: Field) -> Box<dyn Iterator<Item = &str> + '_> {
    match field {
        Field::Name => Box::new(std::iter::once(record.name.as_str())),
        Field::Type => Box::new(std::iter::once(record.r#type.as_str())),
        Field::Tags => Box::new(record.tags.iter().map(String::as_str)),
    }
}

fn compile_regex(pattern: &str, case_insensitive: bool) -> Result<Regex> {
    RegexBuilder::new(pattern)
        .case_insensitive(case_insensitive)
        .build()
        .map_err(|e| StoreError::QueryFailed(format!("invalid pattern {pattern:?}: {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(name: &str, r#type: &str, tags: &[&str]) -> Record {
        Record {
            name: name.to_string(),
            r#type: r#type.to_string(),
            tags: tags.iter().map(|t| t.to_string()).collect(),
            url: format!("http://{}", name.to_lowercase()),
        }
    }

    fn fixture() -> MemoryStore {
        MemoryStore::with_records([
            record("Tokio", "Library", &["rust", "async", "en"]),
            record("Gin", "Framework", &["go", "web", "de"]),
            record("Serde", "Library", &["#rust", "serde", "Library"]),
        ])
    }

    #[tokio::test]
    async fn test_insert_preserves_order_and_duplicates() {
        let store = MemoryStore::new();
        let r = record("Foo", "CLI", &["x"]);
        store.insert_one(&r).await.unwrap();
        store.insert_one(&r).await.unwrap();

        assert_eq!(store.len(), 2);
        assert_eq!(store.records(), vec![r.clone(), r]);
    }

    #[tokio::test]
    async fn test_find_eq_and_regex() {
        let store = fixture();

        let libraries = store
            .find(&Filter::eq(Field::Type, "Library"), 0, 10)
            .await
            .unwrap();
        assert_eq!(libraries.len(), 2);

        let by_name = store
            .find(&Filter::regex_ci(Field::Name, "TOK"), 0, 10)
            .await
            .unwrap();
        assert_eq!(by_name[0].name, "Tokio");
    }

    #[tokio::test]
    async fn test_array_membership() {
        let store = fixture();

        let rust = Filter::regex(Field::Tags, "^#?rust$");
        assert_eq!(store.count(&rust).await.unwrap(), 2);

        let exact = Filter::eq(Field::Tags, "rust");
        assert_eq!(store.count(&exact).await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_and_requires_all() {
        let store = fixture();
        let filter = Filter::and([
            Filter::regex(Field::Tags, "^#?rust$"),
            Filter::regex(Field::Tags, "en$"),
        ]);

        let found = store.find(&filter, 0, 10).await.unwrap();
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].name, "Tokio");
    }

    #[tokio::test]
    async fn test_find_skip_limit() {
        let store = MemoryStore::with_records(
            (0..25).map(|i| record(&format!("item{i}"), "CLI", &["x"])),
        );

        let page = store.find(&Filter::All, 10, 10).await.unwrap();
        assert_eq!(page.len(), 10);
        assert_eq!(page[0].name, "item10");
        assert_eq!(page[9].name, "item19");

        let tail = store.find(&Filter::All, 20, 10).await.unwrap();
        assert_eq!(tail.len(), 5);
    }

    #[tokio::test]
    async fn test_invalid_pattern_is_query_error() {
        let store = fixture();
        let err = store
            .count(&Filter::regex(Field::Name, "("))
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::QueryFailed(_)));
    }

    #[tokio::test]
    async fn test_aggregate_distinct_tags_sorted() {
        let store = fixture();
        store.insert_one(&record("Axum", "Library", &["rust", "web"])).await.unwrap();

        let tags = store.aggregate(&Aggregation::DistinctTags).await.unwrap();
        assert_eq!(
            tags,
            ["#rust", "Library", "async", "de", "en", "go", "rust", "serde", "web"]
        );
    }

    #[tokio::test]
    async fn test_aggregate_last_tags() {
        let store = fixture();
        let languages = store
            .aggregate(&Aggregation::DistinctLastTags {
                pattern: "^[a-z]{2}$".to_string(),
            })
            .await
            .unwrap();
        assert_eq!(languages, ["de", "en"]);
    }

    #[tokio::test]
    async fn test_aggregate_empty_store() {
        let store = MemoryStore::new();
        assert!(store.aggregate(&Aggregation::DistinctTags).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_create_indexes_idempotent() {
        let store = MemoryStore::new();
        let specs = [
            IndexSpec::Multikey { field: Field::Tags },
            IndexSpec::Text { field: Field::Name },
        ];
        store.create_indexes(&specs).await.unwrap();
        store.create_indexes(&specs).await.unwrap();
        assert_eq!(store.indexes(), specs);
    }
}
