use axum::body::Bytes;
use axum::extract::{Multipart, Path, State};
use axum::response::{IntoResponse, Response};
use axum::routing::post;
use axum::{Json, Router};
use serde::Deserialize;

use crate::engagement::EngagementRepository;
use crate::error::{AppError, AppResult};
use crate::extractors::CurrentUser;
use crate::media::{self, MediaRef};
use crate::posts::PostRepository;
use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/posts", post(create_post))
        .route("/posts/{id}/delete", post(delete_post))
        .route("/posts/{id}/like", post(toggle_like))
        .route("/posts/{id}/comments", post(add_comment))
}

#[derive(Deserialize)]
pub struct CommentRequest {
    pub content: String,
}

/// POST /posts — publish a post from a multipart form: an optional `content`
/// text field and an optional `media_file` attachment. Disallowed file types
/// are rejected here, before the store sees them.
pub async fn create_post(
    State(state): State<AppState>,
    user: CurrentUser,
    mut multipart: Multipart,
) -> AppResult<Response> {
    let mut text: Option<String> = None;
    let mut upload: Option<(String, Bytes)> = None;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| AppError::BadRequest(format!("Malformed upload: {}", e)))?
    {
        let name = field.name().map(str::to_string);
        match name.as_deref() {
            Some("content") => {
                let value = field
                    .text()
                    .await
                    .map_err(|e| AppError::BadRequest(format!("Malformed upload: {}", e)))?;
                text = Some(value);
            }
            Some("media_file") => {
                let filename = field.file_name().map(str::to_string).unwrap_or_default();
                let bytes = field
                    .bytes()
                    .await
                    .map_err(|e| AppError::BadRequest(format!("Malformed upload: {}", e)))?;
                // Browsers send an empty file part when nothing was chosen
                if !filename.is_empty() && !bytes.is_empty() {
                    upload = Some((filename, bytes));
                }
            }
            _ => {}
        }
    }

    let media = match upload {
        Some((filename, bytes)) => {
            let kind = media::classify(&filename)
                .ok_or_else(|| AppError::BadRequest("File type not allowed".into()))?;
            let stored = state.media.save(&filename, &bytes)?;
            Some(MediaRef { path: stored, kind })
        }
        None => None,
    };

    let posts = PostRepository::new(state.db.clone());
    let created = posts.create(user.id, text.as_deref(), media)?;
    Ok(Json(created).into_response())
}

/// POST /posts/{id}/delete — owner-only. The row cascade commits first; the
/// media file cleanup afterwards is best-effort.
pub async fn delete_post(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(post_id): Path<i64>,
) -> AppResult<Response> {
    let posts = PostRepository::new(state.db.clone());
    let deleted = posts.delete(post_id, user.id)?;

    if let Some(path) = deleted.media_path {
        state.media.remove(&path);
    }

    Ok(Json(serde_json::json!({ "deleted": true })).into_response())
}

/// POST /posts/{id}/like — toggle the caller's like; returns the new state
/// and the authoritative count.
pub async fn toggle_like(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(post_id): Path<i64>,
) -> AppResult<Response> {
    let engagement = EngagementRepository::new(state.db.clone());
    let outcome = engagement.toggle_like(user.id, post_id)?;
    Ok(Json(outcome).into_response())
}

/// POST /posts/{id}/comments — attach a comment.
pub async fn add_comment(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(post_id): Path<i64>,
    Json(req): Json<CommentRequest>,
) -> AppResult<Response> {
    let engagement = EngagementRepository::new(state.db.clone());
    let comment = engagement.add_comment(post_id, user.id, &req.content)?;
    Ok(Json(comment).into_response())
}
