pub mod auth;
pub mod feed;
pub mod posts;
pub mod uploads;

use axum::Router;

use crate::state::AppState;

/// Assemble the full application router.
pub fn app(state: AppState) -> Router {
    Router::new()
        .merge(auth::router())
        .merge(feed::router())
        .merge(posts::router())
        .merge(uploads::router())
        .with_state(state)
}
