use axum::{
    extract::{Request, State},
    middleware::Next,
    response::{IntoResponse, Response},
};
use axum_extra::extract::cookie::CookieJar;

use crate::error::AppError;
use crate::models::CurrentUser;
use crate::services::session::SESSION_COOKIE_NAME;
use crate::services::SessionService;
use crate::AppState;

/// Authentication middleware
/// Resolves the `sessionId` cookie to a user and stores it as `CurrentUser`
pub async fn auth_middleware(
    State(state): State<AppState>,
    jar: CookieJar,
    mut request: Request,
    next: Next,
) -> Result<Response, AppError> {
    let session_id = match jar.get(SESSION_COOKIE_NAME) {
        Some(cookie) if !cookie.value().is_empty() => cookie.value().to_string(),
        _ => return Err(AppError::Unauthorized("Not authenticated".to_string())),
    };

    let Some((_, user)) = SessionService::get_user(&state.db, &session_id).await? else {
        let jar = jar.remove(SessionService::removal_cookie());
        return Ok((
            jar,
            AppError::Unauthorized("Session expired".to_string()),
        )
            .into_response());
    };

    request.extensions_mut().insert(CurrentUser { id: user.id });

    Ok(next.run(request).await)
}
