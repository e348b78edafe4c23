//! API endpoints.

mod auth;
mod ingredients;
mod recipes;
mod tags;
mod users;

use axum::Router;

use crate::middleware::AppState;

pub use tags::TagResponse;
pub use users::UserResponse;

/// Create the API router.
pub fn router() -> Router<AppState> {
    Router::new()
        .nest("/auth", auth::router())
        .nest("/users", users::router())
        .nest("/tags", tags::router())
        .nest("/ingredients", ingredients::router())
        .nest("/recipes", recipes::router())
}

/// Translate 1-based `page`/`limit` query parameters into limit/offset.
/// The page size defaults to 10 and is capped at 100.
#[must_use]
pub(crate) fn page_bounds(page: Option<u64>, limit: Option<u64>) -> (u64, u64) {
    let limit = limit.unwrap_or(10).clamp(1, 100);
    let page = page.unwrap_or(1).max(1);
    (limit, (page - 1) * limit)
}
