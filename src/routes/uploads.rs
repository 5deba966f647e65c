use axum::extract::{Path, State};
use axum::http::header;
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::Router;

use crate::error::{AppError, AppResult};
use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new().route("/uploads/{filename}", get(serve))
}

/// GET /uploads/{filename} — stream back a stored media file with a guessed
/// content type. The media store refuses names that could escape its root.
pub async fn serve(
    State(state): State<AppState>,
    Path(filename): Path<String>,
) -> AppResult<Response> {
    let path = state.media.resolve(&filename).ok_or(AppError::NotFound)?;
    let bytes = tokio::fs::read(&path).await.map_err(|_| AppError::NotFound)?;
    let mime = mime_guess::from_path(&path).first_or_octet_stream();

    Ok(([(header::CONTENT_TYPE, mime.to_string())], bytes).into_response())
}
