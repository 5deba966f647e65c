use axum::extract::State;
use axum::http::{header, HeaderMap, StatusCode};
use axum::response::{AppendHeaders, IntoResponse, Response};
use axum::routing::post;
use axum::{Json, Router};
use serde::Deserialize;

use crate::auth::session;
use crate::error::{AppError, AppResult};
use crate::extractors::cookie_value;
use crate::state::AppState;
use crate::users::UserRepository;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/auth/register", post(register))
        .route("/auth/login", post(login))
        .route("/auth/logout", post(logout))
}

#[derive(Deserialize)]
pub struct CredentialsRequest {
    pub username: String,
    pub password: String,
}

// -- Cookie helpers --

fn session_cookie(name: &str, token: &str, max_age_hours: u64) -> String {
    let max_age_secs = max_age_hours * 3600;
    format!(
        "{}={}; HttpOnly; SameSite=Strict; Path=/; Max-Age={}",
        name, token, max_age_secs
    )
}

fn clear_session_cookie(name: &str) -> String {
    format!("{}=; HttpOnly; SameSite=Strict; Path=/; Max-Age=0", name)
}

// -- Handlers --

/// POST /auth/register — create an account and sign it in.
pub async fn register(
    State(state): State<AppState>,
    Json(req): Json<CredentialsRequest>,
) -> AppResult<Response> {
    let username = req.username.trim();
    if username.is_empty() || req.password.is_empty() {
        return Err(AppError::BadRequest(
            "Username and password are required".into(),
        ));
    }

    let users = UserRepository::new(state.db.clone());
    let user = users.register(username, &req.password)?;
    let token = session::create_session(&state.db, user.id, state.config.auth.session_hours)?;

    Ok((
        AppendHeaders([(
            header::SET_COOKIE,
            session_cookie(
                &state.config.auth.cookie_name,
                &token,
                state.config.auth.session_hours,
            ),
        )]),
        Json(serde_json::json!({ "id": user.id, "username": user.username })),
    )
        .into_response())
}

/// POST /auth/login — verify credentials and establish a session.
pub async fn login(
    State(state): State<AppState>,
    Json(req): Json<CredentialsRequest>,
) -> AppResult<Response> {
    let users = UserRepository::new(state.db.clone());
    let user = users.authenticate(req.username.trim(), &req.password)?;
    let token = session::create_session(&state.db, user.id, state.config.auth.session_hours)?;

    Ok((
        AppendHeaders([(
            header::SET_COOKIE,
            session_cookie(
                &state.config.auth.cookie_name,
                &token,
                state.config.auth.session_hours,
            ),
        )]),
        Json(serde_json::json!({ "id": user.id, "username": user.username })),
    )
        .into_response())
}

/// POST /auth/logout — delete the session and clear the cookie.
pub async fn logout(State(state): State<AppState>, headers: HeaderMap) -> AppResult<Response> {
    if let Some(token) = cookie_value(&headers, &state.config.auth.cookie_name) {
        let _ = session::delete_session(&state.db, token);
    }

    Ok((
        StatusCode::SEE_OTHER,
        [
            (header::LOCATION, "/auth/login".to_string()),
            (
                header::SET_COOKIE,
                clear_session_cookie(&state.config.auth.cookie_name),
            ),
        ],
        "",
    )
        .into_response())
}
