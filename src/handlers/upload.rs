use axum::{
    body::Body,
    extract::{Path, State},
    http::{header, StatusCode},
    response::{IntoResponse, Redirect, Response},
    Extension,
};
use std::time::Duration;

use crate::error::{AppError, Result};
use crate::models::CurrentUser;
use crate::services::PhotoService;
use crate::AppState;

/// Serve a stored photo to its owner
/// GET /api/uploads/:filename
pub async fn serve_upload(
    State(state): State<AppState>,
    Extension(current_user): Extension<CurrentUser>,
    Path(filename): Path<String>,
) -> Result<Response> {
    let photo = PhotoService::find_by_filename(&state.db, &current_user.id, &filename).await?;
    let provider = state.storage.provider();

    let expires = Duration::from_secs(u64::from(state.config.storage.bucket.presign_expire_secs));
    if let Some(url) = provider.get_download_url(&photo.filename, expires).await? {
        return Ok(Redirect::temporary(&url).into_response());
    }

    let data = provider.get(&photo.filename).await?;
    let content_type = mime_guess::from_path(&photo.filename).first_or_octet_stream();

    let response = Response::builder()
        .status(StatusCode::OK)
        .header(header::CONTENT_TYPE, content_type.as_ref())
        .header(header::CONTENT_LENGTH, data.len())
        .header(header::CACHE_CONTROL, "private, max-age=86400")
        .body(Body::from(data))
        .map_err(|e| AppError::Internal(format!("Failed to build response: {}", e)))?;

    Ok(response)
}
