/// Error types for the social feed server.
/// Classifies storage, validation and lookup failures and maps them onto HTTP responses.
use actix_web::{http::StatusCode, HttpResponse, ResponseError};
use serde_json::json;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum AppError {
    #[error("{0}")]
    NotFound(String),

    #[error("{0}")]
    Conflict(String),

    #[error("{0}")]
    Validation(String),

    #[error("{0}")]
    Forbidden(String),

    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Push delivery failed: {0}")]
    Push(String),
}

pub type Result<T> = std::result::Result<T, AppError>;

impl AppError {
    pub fn not_found(what: impl Into<String>) -> Self {
        AppError::NotFound(what.into())
    }

    pub fn validation(what: impl Into<String>) -> Self {
        AppError::Validation(what.into())
    }

    /// Turn a UNIQUE constraint violation into a `Conflict`, pass anything else through.
    pub fn unique_or(err: rusqlite::Error, conflict: &str) -> Self {
        match &err {
            rusqlite::Error::SqliteFailure(e, _)
                if e.code == rusqlite::ErrorCode::ConstraintViolation
                    && err.to_string().contains("UNIQUE") =>
            {
                AppError::Conflict(conflict.to_string())
            }
            _ => AppError::Database(err),
        }
    }

    /// Message safe to show a client. Internal failures are logged here and
    /// replaced with a generic text.
    pub fn public_message(&self) -> String {
        if self.is_internal() {
            log::error!("Request failed: {}", self);
            "Internal server error".to_string()
        } else {
            self.to_string()
        }
    }

    fn is_internal(&self) -> bool {
        matches!(
            self,
            AppError::Database(_) | AppError::Io(_) | AppError::Push(_)
        )
    }
}

impl ResponseError for AppError {
    fn status_code(&self) -> StatusCode {
        match self {
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::Conflict(_) => StatusCode::CONFLICT,
            AppError::Validation(_) => StatusCode::BAD_REQUEST,
            AppError::Forbidden(_) => StatusCode::FORBIDDEN,
            AppError::Database(_) | AppError::Io(_) | AppError::Push(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }

    fn error_response(&self) -> HttpResponse {
        let message = self.public_message();

        HttpResponse::build(self.status_code()).json(json!({ "error": message }))
    }
}
