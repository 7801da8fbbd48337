use base64::Engine;
use chrono::{Duration, Utc};
use uuid::Uuid;
use webauthn_rs::prelude::*;

use crate::config::Config;
use crate::db::Database;
use crate::error::{AppError, Result};
use crate::models::{
    Challenge, ChallengeKind, Credential, LoginOptionsResponse, LoginVerifyRequest,
    RegisterOptionsResponse, RegisterVerifyRequest, User,
};
use crate::services::UserService;

const CHALLENGE_TTL_SECS: i64 = 5 * 60;
const DEFAULT_TRANSPORTS: [&str; 2] = ["internal", "hybrid"];
const INVALID_CHALLENGE: &str = "Challenge expired or invalid";

pub struct PasskeyService;

impl PasskeyService {
    /// Build the relying party from config. Extra origins are accepted too.
    pub fn webauthn_from_config(config: &Config) -> Result<Webauthn> {
        let rp_origin = parse_origin(&config.webauthn.rp_origin)?;
        let mut builder = WebauthnBuilder::new(&config.webauthn.rp_id, &rp_origin).map_err(|_| {
            AppError::Internal(format!(
                "Invalid WebAuthn config (rp_id={}, rp_origin={})",
                config.webauthn.rp_id, rp_origin
            ))
        })?;
        for origin in &config.webauthn.extra_origins {
            builder = builder.append_allowed_origin(&parse_origin(origin)?);
        }
        builder
            .rp_name(&config.webauthn.rp_name)
            .build()
            .map_err(|e| AppError::Internal(format!("WebAuthn build error: {:?}", e)))
    }

    /// Start registering a passkey for a brand new user
    pub async fn registration_options(
        db: &Database,
        webauthn: &Webauthn,
    ) -> Result<RegisterOptionsResponse> {
        let user_id = Uuid::new_v4();
        let user_name = user_id.to_string();
        let (ccr, reg_state) = webauthn
            .start_passkey_registration(user_id, &user_name, "User", None)
            .map_err(|e| AppError::BadRequest(e.to_string()))?;

        let challenge = challenge_string(&ccr.public_key.challenge)?;
        let challenge_id = Self::store_challenge(
            db,
            ChallengeKind::Registration,
            Some(&user_name),
            &challenge,
            serde_json::to_string(&reg_state)?,
        )
        .await?;

        Ok(RegisterOptionsResponse {
            options: ccr,
            challenge_id,
            user_id: user_name,
        })
    }

    /// Finish registration: creates the user and stores its first credential
    pub async fn verify_registration(
        db: &Database,
        webauthn: &Webauthn,
        req: RegisterVerifyRequest,
    ) -> Result<User> {
        let (Some(challenge_id), Some(user_id), Some(response)) =
            (req.challenge_id, req.user_id, req.response)
        else {
            return Err(AppError::BadRequest("Missing required fields".to_string()));
        };

        let challenge = Self::take_challenge(db, &challenge_id, ChallengeKind::Registration).await?;
        if challenge.user_id.as_deref() != Some(user_id.as_str()) {
            return Err(AppError::BadRequest(INVALID_CHALLENGE.to_string()));
        }

        let reg: RegisterPublicKeyCredential = serde_json::from_value(response)
            .map_err(|e| AppError::BadRequest(format!("Invalid registration response: {}", e)))?;
        let reg_state: PasskeyRegistration = serde_json::from_str(&challenge.state_json)?;
        let passkey = webauthn
            .finish_passkey_registration(&reg, &reg_state)
            .map_err(|e| AppError::BadRequest(e.to_string()))?;

        let transports = match &reg.response.transports {
            Some(list) if !list.is_empty() => serde_json::to_string(list)?,
            _ => serde_json::to_string(&DEFAULT_TRANSPORTS)?,
        };

        let user = UserService::create(db, &user_id, None).await?;
        Self::store_credential(db, &user.id, &passkey, &transports).await?;

        tracing::info!("Registered passkey for new user {}", user.id);
        Ok(user)
    }

    /// Start a usernameless login; any resident credential may answer
    pub async fn login_options(db: &Database, webauthn: &Webauthn) -> Result<LoginOptionsResponse> {
        let (rcr, auth_state) = webauthn
            .start_discoverable_authentication()
            .map_err(|e| AppError::BadRequest(e.to_string()))?;

        let challenge = challenge_string(&rcr.public_key.challenge)?;
        let challenge_id = Self::store_challenge(
            db,
            ChallengeKind::Authentication,
            None,
            &challenge,
            serde_json::to_string(&auth_state)?,
        )
        .await?;

        Ok(LoginOptionsResponse {
            options: rcr,
            challenge_id,
        })
    }

    /// Verify an assertion and return the user it belongs to
    pub async fn verify_login(
        db: &Database,
        webauthn: &Webauthn,
        req: LoginVerifyRequest,
    ) -> Result<User> {
        let (Some(challenge_id), Some(response)) = (req.challenge_id, req.response) else {
            return Err(AppError::BadRequest("Missing required fields".to_string()));
        };

        let challenge =
            Self::take_challenge(db, &challenge_id, ChallengeKind::Authentication).await?;
        let auth_state: DiscoverableAuthentication = serde_json::from_str(&challenge.state_json)?;

        let rsp: PublicKeyCredential = serde_json::from_value(response)
            .map_err(|e| AppError::BadRequest(format!("Invalid authentication response: {}", e)))?;
        let (user_handle, cred_id) = webauthn
            .identify_discoverable_authentication(&rsp)
            .map_err(|e| AppError::BadRequest(e.to_string()))?;
        let cred_id = base64::engine::general_purpose::URL_SAFE_NO_PAD.encode(cred_id);

        let credential = sqlx::query_as::<_, Credential>("SELECT * FROM credentials WHERE id = ?")
            .bind(&cred_id)
            .fetch_optional(db.pool())
            .await?
            .filter(|c| c.user_id == user_handle.to_string())
            .ok_or_else(|| AppError::BadRequest("Credential not found".to_string()))?;

        let mut passkey: Passkey = serde_json::from_str(&credential.passkey_json)?;
        let result = webauthn
            .finish_discoverable_authentication(&rsp, auth_state, &[DiscoverableKey::from(&passkey)])
            .map_err(|e| AppError::BadRequest(e.to_string()))?;

        passkey.update_credential(&result);
        sqlx::query(
            "UPDATE credentials SET passkey_json = ?, counter = ?, last_used_at = ? WHERE id = ?",
        )
        .bind(serde_json::to_string(&passkey)?)
        .bind(i64::from(result.counter()))
        .bind(Utc::now().to_rfc3339())
        .bind(&credential.id)
        .execute(db.pool())
        .await?;

        let user = UserService::get_user(db, &credential.user_id).await?;
        tracing::info!("User {} signed in with passkey", user.id);
        Ok(user)
    }

    pub async fn store_credential(
        db: &Database,
        user_id: &str,
        passkey: &Passkey,
        transports: &str,
    ) -> Result<Credential> {
        let id = base64::engine::general_purpose::URL_SAFE_NO_PAD.encode(passkey.cred_id());
        let now = Utc::now().to_rfc3339();
        sqlx::query(
            r#"
            INSERT INTO credentials (id, user_id, passkey_json, counter, transports, created_at)
            VALUES (?, ?, ?, 0, ?, ?)
            "#,
        )
        .bind(&id)
        .bind(user_id)
        .bind(serde_json::to_string(passkey)?)
        .bind(transports)
        .bind(&now)
        .execute(db.pool())
        .await?;

        let credential = sqlx::query_as("SELECT * FROM credentials WHERE id = ?")
            .bind(&id)
            .fetch_one(db.pool())
            .await?;
        Ok(credential)
    }

    pub async fn store_challenge(
        db: &Database,
        kind: ChallengeKind,
        user_id: Option<&str>,
        challenge: &str,
        state_json: String,
    ) -> Result<String> {
        let id = Uuid::new_v4().to_string();
        let now = Utc::now();
        let expires_at = (now + Duration::seconds(CHALLENGE_TTL_SECS)).to_rfc3339();
        sqlx::query(
            r#"
            INSERT INTO challenges (id, challenge, kind, user_id, state_json, expires_at, created_at)
            VALUES (?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&id)
        .bind(challenge)
        .bind(kind.as_str())
        .bind(user_id)
        .bind(&state_json)
        .bind(&expires_at)
        .bind(now.to_rfc3339())
        .execute(db.pool())
        .await?;
        Ok(id)
    }

    /// Consume a challenge. It is removed whether or not it is still valid.
    pub async fn take_challenge(db: &Database, id: &str, kind: ChallengeKind) -> Result<Challenge> {
        let challenge: Option<Challenge> =
            sqlx::query_as("DELETE FROM challenges WHERE id = ? RETURNING *")
                .bind(id)
                .fetch_optional(db.pool())
                .await?;

        match challenge {
            Some(ch) if !ch.is_expired() && ch.kind == kind.as_str() => Ok(ch),
            _ => Err(AppError::BadRequest(INVALID_CHALLENGE.to_string())),
        }
    }
}

fn parse_origin(raw: &str) -> Result<url::Url> {
    let raw = raw.trim();
    let with_scheme = if raw.contains("://") {
        raw.to_string()
    } else {
        format!("http://{}", raw)
    };
    url::Url::parse(&with_scheme)
        .map_err(|_| {
            AppError::Internal(format!(
                "Invalid WebAuthn origin: {} (expected like http://localhost:5173)",
                raw
            ))
        })
}

/// The challenge as the browser sees it (base64url)
fn challenge_string<T: serde::Serialize>(challenge: &T) -> Result<String> {
    match serde_json::to_value(challenge)? {
        serde_json::Value::String(s) => Ok(s),
        other => Ok(other.to_string()),
    }
}
