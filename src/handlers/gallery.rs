use axum::{
    extract::{Path, State},
    http::StatusCode,
    Extension, Json,
};

use crate::error::{Result, SuccessBody};
use crate::models::{
    CreateGalleryRequest, CurrentUser, EffectiveConfig, GalleryResponse, UpdateGalleryRequest,
};
use crate::services::GalleryService;
use crate::AppState;

/// GET /api/galleries
pub async fn list_galleries(
    State(state): State<AppState>,
    Extension(current_user): Extension<CurrentUser>,
) -> Result<Json<Vec<GalleryResponse>>> {
    let galleries = GalleryService::list(&state.db, &current_user.id).await?;
    Ok(Json(galleries.into_iter().map(GalleryResponse::from).collect()))
}

/// POST /api/galleries
pub async fn create_gallery(
    State(state): State<AppState>,
    Extension(current_user): Extension<CurrentUser>,
    Json(req): Json<CreateGalleryRequest>,
) -> Result<(StatusCode, Json<GalleryResponse>)> {
    let gallery = GalleryService::create(&state.db, &current_user.id, &req.name).await?;
    Ok((StatusCode::CREATED, Json(gallery.into())))
}

/// Rename a gallery or replace its config override
/// PATCH /api/galleries/:id
pub async fn update_gallery(
    State(state): State<AppState>,
    Extension(current_user): Extension<CurrentUser>,
    Path(id): Path<String>,
    Json(req): Json<UpdateGalleryRequest>,
) -> Result<Json<GalleryResponse>> {
    let gallery = GalleryService::update(&state.db, &current_user.id, &id, req).await?;
    Ok(Json(gallery.into()))
}

/// DELETE /api/galleries/:id
pub async fn delete_gallery(
    State(state): State<AppState>,
    Extension(current_user): Extension<CurrentUser>,
    Path(id): Path<String>,
) -> Result<Json<SuccessBody>> {
    GalleryService::delete(&state.db, &state.storage, &current_user.id, &id).await?;
    Ok(SuccessBody::ok())
}

/// Effective config for a gallery
/// GET /api/galleries/:id/config
pub async fn get_gallery_config(
    State(state): State<AppState>,
    Extension(current_user): Extension<CurrentUser>,
    Path(id): Path<String>,
) -> Result<Json<EffectiveConfig>> {
    let gallery = GalleryService::get_owned(&state.db, &current_user.id, &id).await?;
    let config = GalleryService::effective_config(&state.db, &current_user.id, Some(&gallery)).await?;
    Ok(Json(config))
}

/// DELETE /api/galleries/:id/config
pub async fn clear_gallery_config(
    State(state): State<AppState>,
    Extension(current_user): Extension<CurrentUser>,
    Path(id): Path<String>,
) -> Result<Json<GalleryResponse>> {
    let gallery = GalleryService::clear_config(&state.db, &current_user.id, &id).await?;
    Ok(Json(gallery.into()))
}
