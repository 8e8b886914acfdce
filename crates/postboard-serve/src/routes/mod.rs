//! API route definitions.

mod health;
mod lists;
mod posts;

pub use posts::PostsQuery;

use axum::routing::get;
use axum::Router;

use crate::state::AppState;

/// Build the complete API router.
///
/// # Route Structure
///
/// - `GET /health` - Health check
/// - `GET /posts` - Filtered, paginated posts (`search`, `tag`, `type`,
///   `language`, `page`, `limit`)
/// - `GET /tags` - Distinct tags
/// - `GET /languages` - Distinct language codes
///
/// Every endpoint is public and read-only.
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health::health_check))
        .route("/posts", get(posts::list_posts))
        .route("/tags", get(lists::list_tags))
        .route("/languages", get(lists::list_languages))
        .with_state(state)
}
