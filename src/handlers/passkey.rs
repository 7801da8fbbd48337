use axum::{extract::State, Json};
use axum_extra::extract::cookie::CookieJar;

use crate::error::Result;
use crate::models::{
    AuthSuccessResponse, LoginOptionsResponse, LoginVerifyRequest, RegisterOptionsResponse,
    RegisterVerifyRequest, User,
};
use crate::services::{PasskeyService, SessionService};
use crate::AppState;

/// Begin passkey registration for a new account
/// POST /api/auth/register/options
pub async fn register_options(
    State(state): State<AppState>,
) -> Result<Json<RegisterOptionsResponse>> {
    let options = PasskeyService::registration_options(&state.db, &state.webauthn).await?;
    Ok(Json(options))
}

/// POST /api/auth/register/verify
pub async fn register_verify(
    State(state): State<AppState>,
    jar: CookieJar,
    Json(req): Json<RegisterVerifyRequest>,
) -> Result<(CookieJar, Json<AuthSuccessResponse>)> {
    let user = PasskeyService::verify_registration(&state.db, &state.webauthn, req).await?;
    sign_in(&state, jar, user).await
}

/// Begin a usernameless passkey login
/// POST /api/auth/login/options
pub async fn login_options(State(state): State<AppState>) -> Result<Json<LoginOptionsResponse>> {
    let options = PasskeyService::login_options(&state.db, &state.webauthn).await?;
    Ok(Json(options))
}

/// POST /api/auth/login/verify
pub async fn login_verify(
    State(state): State<AppState>,
    jar: CookieJar,
    Json(req): Json<LoginVerifyRequest>,
) -> Result<(CookieJar, Json<AuthSuccessResponse>)> {
    let user = PasskeyService::verify_login(&state.db, &state.webauthn, req).await?;
    sign_in(&state, jar, user).await
}

async fn sign_in(
    state: &AppState,
    jar: CookieJar,
    user: User,
) -> Result<(CookieJar, Json<AuthSuccessResponse>)> {
    let session = SessionService::create(&state.db, &user.id, state.config.session_ttl()).await?;
    let jar = jar.add(SessionService::cookie(&session, &state.config));
    Ok((
        jar,
        Json(AuthSuccessResponse {
            success: true,
            user: user.into(),
        }),
    ))
}
