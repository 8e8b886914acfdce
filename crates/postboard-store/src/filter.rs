//! Store-neutral predicates, aggregations and index specifications.
//!
//! The read path builds [`Filter`] trees; each backend either evaluates them
//! directly ([`crate::MemoryStore`]) or renders them into its own query
//! language ([`crate::ClickHouseStore`]). [`Filter::to_document`] and
//! [`Aggregation::to_pipeline`] render the MongoDB-style equivalent, which is
//! what gets logged.

use serde_json::{json, Value};

/// Fields of a persisted record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Field {
    Name,
    Type,
    Tags,
}

impl Field {
    /// Document key / column name.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Name => "name",
            Self::Type => "type",
            Self::Tags => "tags",
        }
    }

    /// Array fields match when any element satisfies the predicate.
    pub fn is_array(self) -> bool {
        matches!(self, Self::Tags)
    }
}

/// A conjunctive predicate over records.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Filter {
    /// Matches every record.
    All,

    /// Exact equality (membership on array fields).
    Eq { field: Field, value: String },

    /// Unanchored regular expression match (membership on array fields).
    Regex {
        field: Field,
        pattern: String,
        case_insensitive: bool,
    },

    /// Every sub-filter must match.
    And(Vec<Filter>),
}

impl Filter {
    pub fn eq(field: Field, value: impl Into<String>) -> Self {
        Self::Eq {
            field,
            value: value.into(),
        }
    }

    pub fn regex(field: Field, pattern: impl Into<String>) -> Self {
        Self::Regex {
            field,
            pattern: pattern.into(),
            case_insensitive: false,
        }
    }

    pub fn regex_ci(field: Field, pattern: impl Into<String>) -> Self {
        Self::Regex {
            field,
            pattern: pattern.into(),
            case_insensitive: true,
        }
    }

    /// Combine filters conjunctively.
    ///
    /// Nested `And`s are flattened and `All` is dropped; no conditions
    /// collapse to `All` and a single condition is returned as-is.
    pub fn and(filters: impl IntoIterator<Item = Filter>) -> Self {
        let mut conditions = Vec::new();
        for filter in filters {
            match filter {
                Self::All => {}
                Self::And(nested) => conditions.extend(nested),
                other => conditions.push(other),
            }
        }

        match conditions.len() {
            0 => Self::All,
            1 => conditions.remove(0),
            _ => Self::And(conditions),
        }
    }

    /// MongoDB-style rendering (`$eq`, `$regex`, `$and`).
    pub fn to_document(&self) -> Value {
        match self {
            Self::All => json!({}),
            Self::Eq { field, value } => json!({ field.as_str(): { "$eq": value } }),
            Self::Regex {
                field,
                pattern,
                case_insensitive,
            } => {
                if *case_insensitive {
                    json!({ field.as_str(): { "$regex": pattern, "$options": "i" } })
                } else {
                    json!({ field.as_str(): { "$regex": pattern } })
                }
            }
            Self::And(filters) => {
                json!({ "$and": filters.iter().map(Filter::to_document).collect::<Vec<_>>() })
            }
        }
    }
}

/// Distinct-value derivations over the tag arrays.
///
/// Results are always duplicate-free and sorted ascending.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Aggregation {
    /// Every tag of every record.
    DistinctTags,

    /// The last tag of each record, kept only when it matches `pattern`.
    DistinctLastTags { pattern: String },
}

impl Aggregation {
    /// Operation name used in logs and timeouts.
    pub fn name(&self) -> &'static str {
        match self {
            Self::DistinctTags => "distinct_tags",
            Self::DistinctLastTags { .. } => "distinct_last_tags",
        }
    }

    /// MongoDB-style pipeline stages.
    pub fn to_pipeline(&self) -> Value {
        match self {
            Self::DistinctTags => json!([
                { "$unwind": "$tags" },
                { "$group": { "_id": "$tags" } },
                { "$sort": { "_id": 1 } }
            ]),
            Self::DistinctLastTags { pattern } => json!([
                { "$project": { "last": { "$arrayElemAt": ["$tags", -1] } } },
                { "$match": { "last": { "$regex": pattern } } },
                { "$group": { "_id": "$last" } },
                { "$sort": { "_id": 1 } }
            ]),
        }
    }
}

/// Secondary index to maintain on the record collection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IndexSpec {
    /// One index entry per array element; serves tag equality/membership.
    Multikey { field: Field },

    /// Tokenized index; serves free-text search.
    Text { field: Field },
}

impl IndexSpec {
    /// Conventional index name (`tags_1`, `name_text`).
    pub fn name(&self) -> String {
        match self {
            Self::Multikey { field } => format!("{}_1", field.as_str()),
            Self::Text { field } => format!("{}_text", field.as_str()),
        }
    }

    pub fn to_document(&self) -> Value {
        match self {
            Self::Multikey { field } => json!({ "keys": { field.as_str(): 1 } }),
            Self::Text { field } => json!({ "keys": { field.as_str(): "text" } }),
        }
    }
}
