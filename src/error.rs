use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;

/// Application error type
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    #[error("Forbidden: {0}")]
    Forbidden(String),

    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Internal error: {0}")]
    Internal(String),

    #[error("Storage error: {0}")]
    Storage(String),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Request error: {0}")]
    Request(#[from] reqwest::Error),
}

/// Error body: `{"error": "..."}`
#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub error: String,
}

/// Body returned by endpoints that only acknowledge success
#[derive(Debug, Serialize)]
pub struct SuccessBody {
    pub success: bool,
}

impl SuccessBody {
    pub fn ok() -> Json<Self> {
        Json(Self { success: true })
    }
}

impl AppError {
    pub fn status(&self) -> StatusCode {
        match self {
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            AppError::Forbidden(_) => StatusCode::FORBIDDEN,
            AppError::BadRequest(_) => StatusCode::BAD_REQUEST,
            AppError::Conflict(_) => StatusCode::CONFLICT,
            AppError::Database(_)
            | AppError::Internal(_)
            | AppError::Storage(_)
            | AppError::Serialization(_)
            | AppError::Io(_)
            | AppError::Request(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let message = match &self {
            AppError::Database(e) => {
                tracing::error!("Database error: {:?}", e);
                "Database error".to_string()
            }
            AppError::NotFound(msg)
            | AppError::Unauthorized(msg)
            | AppError::Forbidden(msg)
            | AppError::BadRequest(msg)
            | AppError::Conflict(msg) => msg.clone(),
            AppError::Internal(msg) => {
                tracing::error!("Internal error: {}", msg);
                "Internal server error".to_string()
            }
            AppError::Storage(msg) => {
                tracing::error!("Storage error: {}", msg);
                "Storage error".to_string()
            }
            AppError::Serialization(e) => {
                tracing::error!("Serialization error: {:?}", e);
                "Internal server error".to_string()
            }
            AppError::Io(e) => {
                tracing::error!("IO error: {:?}", e);
                "IO error".to_string()
            }
            AppError::Request(e) => {
                tracing::error!("Request error: {:?}", e);
                "External request error".to_string()
            }
        };

        (self.status(), Json(ErrorBody { error: message })).into_response()
    }
}

pub type Result<T> = std::result::Result<T, AppError>;
