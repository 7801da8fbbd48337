use crate::db::Database;
use crate::error::{AppError, Result};
use crate::models::User;

/// User service
pub struct UserService;

impl UserService {
    pub async fn create(db: &Database, user_id: &str, username: Option<&str>) -> Result<User> {
        let now = chrono::Utc::now().to_rfc3339();
        sqlx::query("INSERT INTO users (id, username, created_at) VALUES (?, ?, ?)")
            .bind(user_id)
            .bind(username)
            .bind(&now)
            .execute(db.pool())
            .await
            .map_err(map_username_conflict)?;

        Self::get_user(db, user_id).await
    }

    /// Get user by ID
    pub async fn get_user(db: &Database, user_id: &str) -> Result<User> {
        let user: User = sqlx::query_as("SELECT * FROM users WHERE id = ?")
            .bind(user_id)
            .fetch_optional(db.pool())
            .await?
            .ok_or_else(|| AppError::NotFound("User not found".to_string()))?;

        Ok(user)
    }

    pub async fn find_by_username(db: &Database, username: &str) -> Result<Option<User>> {
        let user = sqlx::query_as("SELECT * FROM users WHERE username = ?")
            .bind(username)
            .fetch_optional(db.pool())
            .await?;
        Ok(user)
    }

    /// Set or clear the username. Blank values clear it.
    pub async fn update_username(
        db: &Database,
        user_id: &str,
        username: Option<String>,
    ) -> Result<User> {
        let username = username
            .map(|u| u.trim().to_string())
            .filter(|u| !u.is_empty());

        if let Some(ref name) = username {
            if name.chars().count() > 50 {
                return Err(AppError::BadRequest(
                    "Username must be at most 50 characters".to_string(),
                ));
            }
            if let Some(existing) = Self::find_by_username(db, name).await? {
                if existing.id != user_id {
                    return Err(AppError::BadRequest("Username already taken".to_string()));
                }
            }
        }

        sqlx::query("UPDATE users SET username = ? WHERE id = ?")
            .bind(&username)
            .bind(user_id)
            .execute(db.pool())
            .await
            .map_err(map_username_conflict)?;

        Self::get_user(db, user_id).await
    }
}

fn map_username_conflict(e: sqlx::Error) -> AppError {
    match &e {
        sqlx::Error::Database(db_err) if db_err.is_unique_violation() => {
            AppError::BadRequest("Username already taken".to_string())
        }
        _ => AppError::Database(e),
    }
}
