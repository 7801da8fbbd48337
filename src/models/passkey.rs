use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use webauthn_rs::prelude::{CreationChallengeResponse, RequestChallengeResponse};

/// Stored WebAuthn credential
#[derive(Debug, Clone, FromRow)]
pub struct Credential {
    /// Base64url credential id
    pub id: String,
    pub user_id: String,
    /// Serialized `Passkey` (public key and credential state)
    pub passkey_json: String,
    pub counter: i64,
    /// JSON array of transport hints
    pub transports: String,
    pub created_at: String,
    pub last_used_at: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChallengeKind {
    Registration,
    Authentication,
}

impl ChallengeKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ChallengeKind::Registration => "registration",
            ChallengeKind::Authentication => "authentication",
        }
    }
}

/// Pending ceremony challenge; consumed on first lookup
#[derive(Debug, Clone, FromRow)]
pub struct Challenge {
    pub id: String,
    /// Base64url challenge sent to the browser
    pub challenge: String,
    pub kind: String,
    pub user_id: Option<String>,
    /// Serialized webauthn-rs ceremony state
    pub state_json: String,
    pub expires_at: String,
    pub created_at: String,
}

impl Challenge {
    pub fn is_expired(&self) -> bool {
        match chrono::DateTime::parse_from_rfc3339(&self.expires_at) {
            Ok(exp) => exp < chrono::Utc::now(),
            Err(_) => true,
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RegisterOptionsResponse {
    pub options: CreationChallengeResponse,
    pub challenge_id: String,
    pub user_id: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegisterVerifyRequest {
    pub challenge_id: Option<String>,
    pub user_id: Option<String>,
    pub response: Option<serde_json::Value>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LoginOptionsResponse {
    pub options: RequestChallengeResponse,
    pub challenge_id: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LoginVerifyRequest {
    pub challenge_id: Option<String>,
    pub response: Option<serde_json::Value>,
}
