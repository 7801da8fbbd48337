use axum_extra::extract::cookie::{Cookie, SameSite};
use chrono::Utc;
use uuid::Uuid;

use crate::config::Config;
use crate::db::Database;
use crate::error::Result;
use crate::models::{Session, User};

pub const SESSION_COOKIE_NAME: &str = "sessionId";

/// Session service
pub struct SessionService;

impl SessionService {
    /// Create a session for `user_id` lasting `ttl`
    pub async fn create(db: &Database, user_id: &str, ttl: chrono::Duration) -> Result<Session> {
        let now = Utc::now();
        let session = Session {
            id: Uuid::new_v4().to_string(),
            user_id: user_id.to_string(),
            expires_at: (now + ttl).to_rfc3339(),
            created_at: now.to_rfc3339(),
        };

        sqlx::query("INSERT INTO sessions (id, user_id, expires_at, created_at) VALUES (?, ?, ?, ?)")
            .bind(&session.id)
            .bind(&session.user_id)
            .bind(&session.expires_at)
            .bind(&session.created_at)
            .execute(db.pool())
            .await?;

        tracing::debug!("Created session for user {}", user_id);
        Ok(session)
    }

    /// Look up a live session; expired ones are deleted on sight
    pub async fn get(db: &Database, session_id: &str) -> Result<Option<Session>> {
        let session: Option<Session> = sqlx::query_as("SELECT * FROM sessions WHERE id = ?")
            .bind(session_id)
            .fetch_optional(db.pool())
            .await?;

        match session {
            Some(s) if s.is_expired() => {
                Self::delete(db, &s.id).await?;
                Ok(None)
            }
            other => Ok(other),
        }
    }

    /// Resolve the user behind a session id
    pub async fn get_user(db: &Database, session_id: &str) -> Result<Option<(Session, User)>> {
        let Some(session) = Self::get(db, session_id).await? else {
            return Ok(None);
        };

        let user: Option<User> = sqlx::query_as("SELECT * FROM users WHERE id = ?")
            .bind(&session.user_id)
            .fetch_optional(db.pool())
            .await?;

        Ok(user.map(|u| (session, u)))
    }

    pub async fn delete(db: &Database, session_id: &str) -> Result<()> {
        sqlx::query("DELETE FROM sessions WHERE id = ?")
            .bind(session_id)
            .execute(db.pool())
            .await?;
        Ok(())
    }

    /// Cookie carrying the session id
    pub fn cookie(session: &Session, config: &Config) -> Cookie<'static> {
        Cookie::build((SESSION_COOKIE_NAME, session.id.clone()))
            .http_only(true)
            .same_site(SameSite::Lax)
            .secure(config.session.cookie_secure)
            .path("/")
            .max_age(time::Duration::days(config.session.max_age_days))
            .build()
    }

    /// Cookie that clears the session id in the browser
    pub fn removal_cookie() -> Cookie<'static> {
        Cookie::build((SESSION_COOKIE_NAME, "")).path("/").build()
    }
}
