//! Postboard Serve - read API over parsed announcements.
//!
//! Exposes filtered, paginated posts and the distinct tag and language lists
//! stored by the ingest daemon.
//!
//! # Architecture
//!
//! - **QueryService**: Builds store filters from request criteria
//! - **AppState**: Shared state (query service, response cache, configuration)
//! - **Routes**: Endpoint handlers

pub mod cache;
mod error;
pub mod query;
mod routes;
mod state;

pub use self::cache::{get_or_compute, new_cache, ResponseCache};
pub use self::error::ApiError;
pub use self::query::{FilterCriteria, PostsResponse, QueryError, QueryService};
pub use self::routes::{router, PostsQuery};
pub use self::state::{AppState, Config};
