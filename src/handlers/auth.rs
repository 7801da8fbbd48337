use axum::{extract::State, Json};
use axum_extra::extract::cookie::CookieJar;

use crate::error::{AppError, Result, SuccessBody};
use crate::models::{MeResponse, UpdateUserRequest, User, UserResponse};
use crate::services::session::SESSION_COOKIE_NAME;
use crate::services::{SessionService, UserService};
use crate::AppState;

/// Current user, or `{user: null}` when signed out
/// GET /api/auth/me
pub async fn me(State(state): State<AppState>, jar: CookieJar) -> Result<(CookieJar, Json<MeResponse>)> {
    let Some(session_id) = session_id(&jar) else {
        return Ok((jar, Json(MeResponse { user: None })));
    };

    match SessionService::get_user(&state.db, &session_id).await? {
        Some((_, user)) => Ok((
            jar,
            Json(MeResponse {
                user: Some(user.into()),
            }),
        )),
        None => Ok((
            jar.remove(SessionService::removal_cookie()),
            Json(MeResponse { user: None }),
        )),
    }
}

/// Set or clear the display username
/// PATCH /api/auth/me
pub async fn update_me(
    State(state): State<AppState>,
    jar: CookieJar,
    Json(req): Json<UpdateUserRequest>,
) -> Result<Json<UserResponse>> {
    let user = signed_in_user(&state, &jar).await?;
    let user = match req.username {
        Some(username) => UserService::update_username(&state.db, &user.id, username).await?,
        None => user,
    };
    Ok(Json(user.into()))
}

/// POST /api/auth/logout
pub async fn logout(
    State(state): State<AppState>,
    jar: CookieJar,
) -> Result<(CookieJar, Json<SuccessBody>)> {
    if let Some(session_id) = session_id(&jar) {
        if let Err(e) = SessionService::delete(&state.db, &session_id).await {
            tracing::warn!("Failed to delete session on logout: {}", e);
        }
    }
    Ok((jar.remove(SessionService::removal_cookie()), SuccessBody::ok()))
}

fn session_id(jar: &CookieJar) -> Option<String> {
    jar.get(SESSION_COOKIE_NAME)
        .map(|c| c.value().to_string())
        .filter(|v| !v.is_empty())
}

async fn signed_in_user(state: &AppState, jar: &CookieJar) -> Result<User> {
    let session_id =
        session_id(jar).ok_or_else(|| AppError::Unauthorized("Not authenticated".to_string()))?;
    SessionService::get_user(&state.db, &session_id)
        .await?
        .map(|(_, user)| user)
        .ok_or_else(|| AppError::Unauthorized("Session expired".to_string()))
}
