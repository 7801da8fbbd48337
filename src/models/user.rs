use serde::{Deserialize, Serialize};
use sqlx::FromRow;

use super::deserialize_some;

/// User model
#[derive(Debug, Clone, FromRow)]
pub struct User {
    pub id: String,
    pub username: Option<String>,
    pub created_at: String,
}

/// Public user representation
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct UserResponse {
    pub id: String,
    pub username: Option<String>,
}

impl From<User> for UserResponse {
    fn from(user: User) -> Self {
        Self {
            id: user.id,
            username: user.username,
        }
    }
}

/// `GET /api/auth/me` body; `user` is null when signed out
#[derive(Debug, Serialize)]
pub struct MeResponse {
    pub user: Option<UserResponse>,
}

/// Body returned after a successful passkey ceremony
#[derive(Debug, Serialize)]
pub struct AuthSuccessResponse {
    pub success: bool,
    pub user: UserResponse,
}

#[derive(Debug, Deserialize)]
pub struct UpdateUserRequest {
    /// Absent leaves the username alone; null or blank clears it
    #[serde(default, deserialize_with = "deserialize_some")]
    pub username: Option<Option<String>>,
}

/// Current authenticated user (resolved from the session cookie)
#[derive(Debug, Clone)]
pub struct CurrentUser {
    pub id: String,
}
