use axum::extract::{Path, State};
use axum::response::{IntoResponse, Redirect, Response};
use axum::routing::get;
use axum::{Json, Router};

use crate::error::AppResult;
use crate::extractors::MaybeUser;
use crate::feed;
use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/feed", get(home_feed))
        .route("/profile/{username}", get(profile))
}

/// GET /feed — the signed-in viewer's home feed. Anonymous callers are sent
/// to authentication rather than given an error.
pub async fn home_feed(
    State(state): State<AppState>,
    MaybeUser(user): MaybeUser,
) -> AppResult<Response> {
    let Some(viewer) = user else {
        return Ok(Redirect::to("/auth/login").into_response());
    };

    let feed = feed::build_home_feed(&state.db, viewer.id)?;
    Ok(Json(feed).into_response())
}

/// GET /profile/{username} — a user's posts, newest first.
pub async fn profile(
    State(state): State<AppState>,
    MaybeUser(user): MaybeUser,
    Path(username): Path<String>,
) -> AppResult<Response> {
    if user.is_none() {
        return Ok(Redirect::to("/auth/login").into_response());
    }

    let profile = feed::build_profile(&state.db, &username)?;
    Ok(Json(profile).into_response())
}
