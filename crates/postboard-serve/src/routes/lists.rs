//! Distinct tag and language endpoints.

use axum::extract::State;
use axum::Json;

use crate::cache::{get_or_compute, keys};
use crate::error::ApiError;
use crate::state::AppState;

/// `GET /tags`
///
/// Every distinct tag, without `#`, sorted ascending. Cached briefly.
pub async fn list_tags(State(state): State<AppState>) -> Result<Json<Vec<String>>, ApiError> {
    let tags = get_or_compute(&state.cache, keys::TAGS, || async {
        state.query.list_tags().await.map_err(ApiError::from)
    })
    .await?;

    Ok(Json(tags))
}

/// `GET /languages`
///
/// Every distinct two-letter language code found as a record's last tag,
/// sorted ascending. Cached briefly.
pub async fn list_languages(
    State(state): State<AppState>,
) -> Result<Json<Vec<String>>, ApiError> {
    let languages = get_or_compute(&state.cache, keys::LANGUAGES, || async {
        state.query.list_languages().await.map_err(ApiError::from)
    })
    .await?;

    Ok(Json(languages))
}
