//! Post listing endpoint.

use axum::extract::{Query, State};
use axum::Json;
use serde::Deserialize;

use crate::error::ApiError;
use crate::query::{FilterCriteria, PostsResponse};
use crate::state::AppState;

/// Query parameters for `GET /posts`.
///
/// `page` and `limit` are taken as strings so that garbage falls back to the
/// defaults instead of rejecting the request.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct PostsQuery {
    pub search: Option<String>,
    pub tag: Option<String>,
    #[serde(rename = "type")]
    pub r#type: Option<String>,
    pub language: Option<String>,
    pub page: Option<String>,
    pub limit: Option<String>,
}

impl PostsQuery {
    pub fn into_criteria(self) -> FilterCriteria {
        FilterCriteria {
            free_text: self.search,
            tag: self.tag,
            r#type: self.r#type,
            language: self.language,
            page: positive(self.page.as_deref()),
            limit: positive(self.limit.as_deref()),
        }
    }
}

fn positive(raw: Option<&str>) -> Option<u64> {
    raw.and_then(|raw| raw.trim().parse::<u64>().ok())
        .filter(|value| *value > 0)
}

/// `GET /posts?search&tag&type&language&page&limit`
///
/// Returns one page of matching posts and the total number of matches.
pub async fn list_posts(
    State(state): State<AppState>,
    Query(params): Query<PostsQuery>,
) -> Result<Json<PostsResponse>, ApiError> {
    let response = state.query.find(&params.into_criteria()).await?;
    Ok(Json(response))
}
