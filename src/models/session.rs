use sqlx::FromRow;

/// Login session, referenced by the `sessionId` cookie
#[derive(Debug, Clone, FromRow)]
pub struct Session {
    pub id: String,
    pub user_id: String,
    pub expires_at: String,
    pub created_at: String,
}

impl Session {
    pub fn is_expired(&self) -> bool {
        match chrono::DateTime::parse_from_rfc3339(&self.expires_at) {
            Ok(exp) => exp < chrono::Utc::now(),
            Err(_) => true,
        }
    }
}
