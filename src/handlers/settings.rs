use axum::{extract::State, Extension, Json};

use crate::error::Result;
use crate::models::{CurrentUser, GlobalConfig};
use crate::services::SettingsService;
use crate::AppState;

/// GET /api/settings
pub async fn get_settings(
    State(state): State<AppState>,
    Extension(current_user): Extension<CurrentUser>,
) -> Result<Json<GlobalConfig>> {
    Ok(Json(SettingsService::get(&state.db, &current_user.id).await?))
}

/// PUT /api/settings
pub async fn update_settings(
    State(state): State<AppState>,
    Extension(current_user): Extension<CurrentUser>,
    Json(config): Json<GlobalConfig>,
) -> Result<Json<GlobalConfig>> {
    let config = SettingsService::update(&state.db, &current_user.id, config).await?;
    Ok(Json(config))
}
