use axum::{
    extract::{Multipart, Path, Query, State},
    http::StatusCode,
    Extension, Json,
};
use bytes::Bytes;

use crate::error::{AppError, Result, SuccessBody};
use crate::models::{CurrentUser, Measurement, NewPhoto, PhotoQuery, PhotoResponse, UpdatePhotoRequest};
use crate::services::photo::is_allowed_image;
use crate::services::PhotoService;
use crate::AppState;

/// List photos of a gallery
/// GET /api/photos?galleryId=
pub async fn list_photos(
    State(state): State<AppState>,
    Extension(current_user): Extension<CurrentUser>,
    Query(query): Query<PhotoQuery>,
) -> Result<Json<Vec<PhotoResponse>>> {
    let photos = PhotoService::list(&state.db, &current_user.id, query.gallery_id.as_deref()).await?;
    Ok(Json(photos))
}

/// Upload a photo with optional metadata
/// POST /api/photos (multipart)
pub async fn upload_photo(
    State(state): State<AppState>,
    Extension(current_user): Extension<CurrentUser>,
    mut multipart: Multipart,
) -> Result<(StatusCode, Json<PhotoResponse>)> {
    let max_bytes = state.config.storage.max_upload_bytes;
    let mut data: Option<Bytes> = None;
    let mut new_photo = NewPhoto::default();

    while let Some(field) = multipart.next_field().await.map_err(multipart_error)? {
        let name = field.name().unwrap_or("").to_string();

        match name.as_str() {
            "photo" => {
                let file_name = field.file_name().unwrap_or("").to_string();
                let content_type = field.content_type().map(|s| s.to_string());
                if !is_allowed_image(content_type.as_deref(), &file_name) {
                    return Err(AppError::BadRequest(
                        "Invalid file type. Only images are allowed.".to_string(),
                    ));
                }

                let bytes = field.bytes().await.map_err(multipart_error)?;
                if bytes.len() > max_bytes {
                    return Err(AppError::BadRequest("File too large".to_string()));
                }
                new_photo.original_name = file_name;
                data = Some(bytes);
            }
            "date" => new_photo.date = text_field(field).await?,
            "galleryId" => new_photo.gallery_id = text_field(field).await?,
            "weight" => {
                new_photo.weight = match text_field(field).await? {
                    Some(raw) => Some(
                        raw.parse::<f64>()
                            .ok()
                            .filter(|w| w.is_finite())
                            .ok_or_else(|| AppError::BadRequest("Invalid weight".to_string()))?,
                    ),
                    None => None,
                };
            }
            "measurements" => {
                new_photo.measurements = match text_field(field).await? {
                    Some(raw) => Some(
                        serde_json::from_str::<Vec<Measurement>>(&raw)
                            .map_err(|_| AppError::BadRequest("Invalid measurements".to_string()))?,
                    ),
                    None => None,
                };
            }
            _ => {}
        }
    }

    let data = data.ok_or_else(|| AppError::BadRequest("No photo uploaded".to_string()))?;
    let photo =
        PhotoService::create(&state.db, &state.storage, &current_user.id, new_photo, data).await?;

    Ok((StatusCode::CREATED, Json(photo)))
}

/// PATCH /api/photos/:id
pub async fn update_photo(
    State(state): State<AppState>,
    Extension(current_user): Extension<CurrentUser>,
    Path(id): Path<String>,
    Json(req): Json<UpdatePhotoRequest>,
) -> Result<Json<PhotoResponse>> {
    let photo = PhotoService::update(&state.db, &current_user.id, &id, req).await?;
    Ok(Json(photo))
}

/// DELETE /api/photos/:id
pub async fn delete_photo(
    State(state): State<AppState>,
    Extension(current_user): Extension<CurrentUser>,
    Path(id): Path<String>,
) -> Result<Json<SuccessBody>> {
    PhotoService::delete(&state.db, &state.storage, &current_user.id, &id).await?;
    Ok(SuccessBody::ok())
}

/// Non-empty trimmed text of a form field
async fn text_field(field: axum::extract::multipart::Field<'_>) -> Result<Option<String>> {
    let text = field.text().await.map_err(multipart_error)?;
    let text = text.trim();
    Ok((!text.is_empty()).then(|| text.to_string()))
}

fn multipart_error(e: axum::extract::multipart::MultipartError) -> AppError {
    if e.status() == StatusCode::PAYLOAD_TOO_LARGE {
        AppError::BadRequest("File too large".to_string())
    } else {
        AppError::BadRequest(format!("Failed to process upload: {}", e.body_text()))
    }
}
