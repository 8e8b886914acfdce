//! Read-side query service.
//!
//! Translates user criteria into store filters and derives the distinct tag
//! and language lists. Stateless: every call goes straight to the store, so
//! the service is safe to share across request handlers.

use std::collections::BTreeSet;
use std::future::Future;
use std::time::Instant;

use metrics::histogram;
use postboard_core::{is_language_code, normalize_tag, Record};
use postboard_store::{Aggregation, Field, Filter, Store, StoreError};
use serde::{Deserialize, Serialize};

/// Default page number.
pub const DEFAULT_PAGE: u64 = 1;

/// Default page size.
pub const DEFAULT_LIMIT: u64 = 10;

/// Last-tag pattern for language codes. Tolerates a stored `#` prefix.
pub const LANGUAGE_TAG_PATTERN: &str = "^#?[a-z]{2}$";

/// Errors surfaced by the query service.
#[derive(Debug, thiserror::Error)]
pub enum QueryError {
    /// The store failed or timed out.
    #[error("store unavailable: {0}")]
    StoreUnavailable(#[from] StoreError),
}

/// What the caller is looking for. Blank strings count as absent.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FilterCriteria {
    pub free_text: Option<String>,
    pub tag: Option<String>,
    pub r#type: Option<String>,
    pub language: Option<String>,
    pub page: Option<u64>,
    pub limit: Option<u64>,
}

impl FilterCriteria {
    /// Trim strings, drop blank ones, and apply page/limit defaults.
    ///
    /// A `language` that is not a two-letter lowercase code is ignored.
    pub fn normalized(&self) -> NormalizedCriteria {
        fn present(value: &Option<String>) -> Option<String> {
            value
                .as_deref()
                .map(str::trim)
                .filter(|value| !value.is_empty())
                .map(str::to_string)
        }

        NormalizedCriteria {
            free_text: present(&self.free_text),
            tag: present(&self.tag)
                .map(|tag| normalize_tag(&tag))
                .filter(|tag| !tag.is_empty()),
            r#type: present(&self.r#type),
            language: present(&self.language)
                .map(|language| normalize_tag(&language))
                .filter(|language| is_language_code(language)),
            page: self.page.filter(|page| *page > 0).unwrap_or(DEFAULT_PAGE),
            limit: self.limit.filter(|limit| *limit > 0).unwrap_or(DEFAULT_LIMIT),
        }
    }
}

/// [`FilterCriteria`] after defaults have been applied.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NormalizedCriteria {
    pub free_text: Option<String>,
    pub tag: Option<String>,
    pub r#type: Option<String>,
    pub language: Option<String>,
    pub page: u64,
    pub limit: u64,
}

impl NormalizedCriteria {
    /// Records to skip before the requested page.
    pub fn skip(&self) -> u64 {
        (self.page - 1).saturating_mul(self.limit)
    }
}

/// One page of records plus the size of the whole filtered set.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PostsResponse {
    pub posts: Vec<Record>,
    pub total_count: u64,
}

/// Query front-end over a shared [`Store`].
#[derive(Clone)]
pub struct QueryService {
    store: Store,
}

impl QueryService {
    pub fn new(store: Store) -> Self {
        Self { store }
    }

    pub fn store(&self) -> &Store {
        &self.store
    }

    /// Conjunctive filter for `criteria`.
    pub fn build_filter(criteria: &NormalizedCriteria) -> Filter {
        let mut conditions = Vec::new();

        if let Some(text) = &criteria.free_text {
            conditions.push(Filter::regex_ci(Field::Name, regex::escape(text)));
        }
        if let Some(kind) = &criteria.r#type {
            conditions.push(Filter::eq(Field::Type, kind.as_str()));
        }
        if let Some(tag) = &criteria.tag {
            conditions.push(Filter::regex(
                Field::Tags,
                format!("^#?{}$", regex::escape(tag)),
            ));
        }
        if let Some(language) = &criteria.language {
            conditions.push(Filter::regex(
                Field::Tags,
                format!("^#?{}$", regex::escape(language)),
            ));
        }

        Filter::and(conditions)
    }

    /// One page of matching records and the total match count.
    pub async fn find(&self, criteria: &FilterCriteria) -> Result<PostsResponse, QueryError> {
        let criteria = criteria.normalized();
        let filter = Self::build_filter(&criteria);

        timed("find", async {
            let posts = self
                .store
                .find(&filter, criteria.skip(), criteria.limit)
                .await?;
            let total_count = self.store.count(&filter).await?;

            tracing::debug!(
                page = criteria.page,
                limit = criteria.limit,
                returned = posts.len(),
                total_count,
                "find"
            );
            Ok::<_, QueryError>(PostsResponse { posts, total_count })
        })
        .await
    }

    /// Every distinct tag, normalized and sorted.
    pub async fn list_tags(&self) -> Result<Vec<String>, QueryError> {
        timed("list_tags", async {
            let tags = self.store.aggregate(&Aggregation::DistinctTags).await?;
            Ok::<_, QueryError>(normalize_distinct(tags))
        })
        .await
    }

    /// Every distinct language code carried as a record's last tag.
    pub async fn list_languages(&self) -> Result<Vec<String>, QueryError> {
        timed("list_languages", async {
            let languages = self
                .store
                .aggregate(&Aggregation::DistinctLastTags {
                    pattern: LANGUAGE_TAG_PATTERN.to_string(),
                })
                .await?;
            Ok::<_, QueryError>(normalize_distinct(languages))
        })
        .await
    }
}

/// Strip `#`, drop empties, deduplicate and sort.
fn normalize_distinct(values: Vec<String>) -> Vec<String> {
    values
        .iter()
        .map(|value| normalize_tag(value))
        .filter(|value| !value.is_empty())
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect()
}

async fn timed<T, F>(operation: &'static str, future: F) -> Result<T, QueryError>
where
    F: Future<Output = Result<T, QueryError>>,
{
    let start = Instant::now();
    let result = future.await;
    histogram!("query_duration_seconds", "operation" => operation)
        .record(start.elapsed().as_secs_f64());

    if let Err(e) = &result {
        tracing::error!(operation, error = %e, "query failed");
    }
    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use postboard_store::{DocumentStore, IndexSpec, MemoryStore};

    fn record(name: &str, kind: &str, tags: &[&str]) -> Record {
        Record {
            name: name.to_string(),
            r#type: kind.to_string(),
            tags: tags.iter().map(|t| t.to_string()).collect(),
            url: format!("https://{}.dev", name.to_lowercase()),
        }
    }

    fn service(records: Vec<Record>) -> QueryService {
        QueryService::new(Store::from_backend(MemoryStore::with_records(records)))
    }

    fn criteria() -> FilterCriteria {
        FilterCriteria::default()
    }

    fn names(response: &PostsResponse) -> Vec<&str> {
        response.posts.iter().map(|r| r.name.as_str()).collect()
    }

    #[test]
    fn test_normalized_defaults() {
        let normalized = FilterCriteria {
            free_text: Some("   ".to_string()),
            tag: Some(" #go ".to_string()),
            page: Some(0),
            limit: None,
            ..criteria()
        }
        .normalized();

        assert_eq!(normalized.free_text, None);
        assert_eq!(normalized.tag.as_deref(), Some("go"));
        assert_eq!(normalized.page, DEFAULT_PAGE);
        assert_eq!(normalized.limit, DEFAULT_LIMIT);
        assert_eq!(normalized.skip(), 0);
    }

    #[test]
    fn test_build_filter_empty_matches_all() {
        assert_eq!(
            QueryService::build_filter(&criteria().normalized()),
            Filter::All
        );
    }

    #[test]
    fn test_build_filter_combines_conjunctively() {
        let filter = QueryService::build_filter(
            &FilterCriteria {
                free_text: Some("c++".to_string()),
                r#type: Some("Library".to_string()),
                tag: Some("#go".to_string()),
                language: Some("en".to_string()),
                ..criteria()
            }
            .normalized(),
        );

        assert_eq!(
            filter,
            Filter::And(vec![
                Filter::regex_ci(Field::Name, r"c\+\+"),
                Filter::eq(Field::Type, "Library"),
                Filter::regex(Field::Tags, "^#?go$"),
                Filter::regex(Field::Tags, "^#?en$"),
            ])
        );
    }

    #[tokio::test]
    async fn test_find_free_text_is_case_insensitive_substring() {
        let service = service(vec![
            record("FooBar", "Library", &["go"]),
            record("Baz", "Library", &["go"]),
            record("a.b", "Tool", &["go"]),
        ]);

        let response = service
            .find(&FilterCriteria {
                free_text: Some("oob".to_string()),
                ..criteria()
            })
            .await
            .unwrap();
        assert_eq!(names(&response), ["FooBar"]);

        // Regex metacharacters are matched literally.
        let response = service
            .find(&FilterCriteria {
                free_text: Some(".".to_string()),
                ..criteria()
            })
            .await
            .unwrap();
        assert_eq!(names(&response), ["a.b"]);
    }

    #[tokio::test]
    async fn test_find_tag_matches_whole_tag_only() {
        let service = service(vec![
            record("Gin", "Framework", &["go", "web"]),
            record("Gorm", "Library", &["golang", "db"]),
            record("Legacy", "Library", &["#go"]),
        ]);

        let response = service
            .find(&FilterCriteria {
                tag: Some("#go".to_string()),
                ..criteria()
            })
            .await
            .unwrap();
        assert_eq!(names(&response), ["Gin", "Legacy"]);
        assert_eq!(response.total_count, 2);
    }

    #[tokio::test]
    async fn test_find_tag_and_language_both_required() {
        let service = service(vec![
            record("A", "Library", &["rust", "en"]),
            record("B", "Library", &["rust", "de"]),
            record("C", "Library", &["go", "en"]),
        ]);

        let response = service
            .find(&FilterCriteria {
                tag: Some("rust".to_string()),
                language: Some("en".to_string()),
                ..criteria()
            })
            .await
            .unwrap();
        assert_eq!(names(&response), ["A"]);
        assert_eq!(response.total_count, 1);
    }

    #[test]
    fn test_normalized_drops_malformed_language() {
        let language = |raw: &str| {
            FilterCriteria {
                language: Some(raw.to_string()),
                ..criteria()
            }
            .normalized()
            .language
        };

        assert_eq!(language(" #en ").as_deref(), Some("en"));
        assert_eq!(language("n"), None);
        assert_eq!(language("EN"), None);
        assert_eq!(language("eng"), None);
        assert_eq!(language("e."), None);
    }

    #[tokio::test]
    async fn test_find_language_matches_whole_code_tag() {
        let service = service(vec![
            record("A", "Library", &["golden", "de"]),
            record("B", "Library", &["rust", "en"]),
            record("C", "Library", &["kotlin", "fr"]),
            record("D", "Library", &["legacy", "#en"]),
        ]);

        let response = service
            .find(&FilterCriteria {
                language: Some("en".to_string()),
                ..criteria()
            })
            .await
            .unwrap();
        assert_eq!(names(&response), ["B", "D"]);
        assert_eq!(response.total_count, 2);

        // Not a language code, so no language condition applies.
        let response = service
            .find(&FilterCriteria {
                language: Some("n".to_string()),
                ..criteria()
            })
            .await
            .unwrap();
        assert_eq!(response.total_count, 4);
        assert_eq!(
            QueryService::build_filter(
                &FilterCriteria {
                    language: Some("n".to_string()),
                    ..criteria()
                }
                .normalized()
            ),
            Filter::All
        );
    }

    #[tokio::test]
    async fn test_find_type_is_exact() {
        let service = service(vec![
            record("A", "Library", &["x"]),
            record("B", "library", &["x"]),
            record("C", "Libraries", &["x"]),
        ]);

        let response = service
            .find(&FilterCriteria {
                r#type: Some("Library".to_string()),
                ..criteria()
            })
            .await
            .unwrap();
        assert_eq!(names(&response), ["A"]);
    }

    #[tokio::test]
    async fn test_find_pagination_and_total_count() {
        let records = (1..=25)
            .map(|i| record(&format!("item{i:02}"), "Tool", &["x"]))
            .collect();
        let service = service(records);

        let page = |page: u64| FilterCriteria {
            page: Some(page),
            limit: Some(10),
            ..criteria()
        };

        let second = service.find(&page(2)).await.unwrap();
        let expected: Vec<String> = (11..=20).map(|i| format!("item{i:02}")).collect();
        assert_eq!(names(&second), expected);
        assert_eq!(second.total_count, 25);

        let third = service.find(&page(3)).await.unwrap();
        assert_eq!(third.posts.len(), 5);
        assert_eq!(third.total_count, 25);

        let beyond = service.find(&page(9)).await.unwrap();
        assert!(beyond.posts.is_empty());
        assert_eq!(beyond.total_count, 25);
    }

    #[tokio::test]
    async fn test_list_tags_normalized_sorted_deduplicated() {
        let service = service(vec![
            record("A", "Library", &["web", "#go"]),
            record("B", "Library", &["go", "api", "en"]),
        ]);

        assert_eq!(
            service.list_tags().await.unwrap(),
            ["api", "en", "go", "web"]
        );
    }

    #[tokio::test]
    async fn test_list_languages_uses_last_tag_only() {
        let service = service(vec![
            record("A", "Library", &["go", "en"]),
            record("B", "Library", &["go", "de"]),
            record("C", "Library", &["fr", "Library"]),
            record("D", "Library", &["rust", "en"]),
        ]);

        assert_eq!(service.list_languages().await.unwrap(), ["de", "en"]);
    }

    #[tokio::test]
    async fn test_empty_store_returns_empty_lists() {
        let service = service(Vec::new());

        assert!(service.list_tags().await.unwrap().is_empty());
        assert!(service.list_languages().await.unwrap().is_empty());

        let response = service.find(&criteria()).await.unwrap();
        assert!(response.posts.is_empty());
        assert_eq!(response.total_count, 0);
    }

    struct DownStore;

    #[async_trait]
    impl DocumentStore for DownStore {
        fn name(&self) -> &'static str {
            "down"
        }

        async fn ping(&self) -> postboard_store::Result<()> {
            Err(StoreError::Unreachable("connection refused".to_string()))
        }

        async fn insert_one(&self, _record: &Record) -> postboard_store::Result<()> {
            Err(StoreError::Unreachable("connection refused".to_string()))
        }

        async fn find(
            &self,
            _filter: &Filter,
            _skip: u64,
            _limit: u64,
        ) -> postboard_store::Result<Vec<Record>> {
            Err(StoreError::Unreachable("connection refused".to_string()))
        }

        async fn count(&self, _filter: &Filter) -> postboard_store::Result<u64> {
            Err(StoreError::Unreachable("connection refused".to_string()))
        }

        async fn aggregate(&self, _aggregation: &Aggregation) -> postboard_store::Result<Vec<String>> {
            Err(StoreError::Unreachable("connection refused".to_string()))
        }

        async fn create_indexes(&self, _specs: &[IndexSpec]) -> postboard_store::Result<()> {
            Err(StoreError::Unreachable("connection refused".to_string()))
        }
    }

    #[tokio::test]
    async fn test_store_failure_is_surfaced() {
        let service = QueryService::new(Store::from_backend(DownStore));

        let err = service.find(&criteria()).await.unwrap_err();
        assert!(matches!(err, QueryError::StoreUnavailable(_)));
        assert!(service.list_tags().await.is_err());
        assert!(service.list_languages().await.is_err());
    }
}
