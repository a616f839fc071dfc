//! Error Types
//!
//! Centralized error handling for authentication, project and contact
//! operations. Every authentication failure renders the same generic body so
//! callers cannot tell which check rejected them.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};

/// Authentication errors
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AuthError {
    #[error("Invalid credentials")]
    InvalidCredentials,

    #[error("Invalid refresh token")]
    InvalidRefreshToken,

    #[error("Token has expired")]
    TokenExpired,

    #[error("Token is malformed or has an invalid signature")]
    TokenMalformed,

    #[error("Token has already been used")]
    TokenAlreadyUsed,

    #[error("Missing or malformed Authorization header")]
    MissingToken,

    #[error("User not found")]
    UserNotFound,

    #[error("Admin access required")]
    Forbidden,

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Database error: {0}")]
    Database(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Internal error")]
    Internal,
}

impl AuthError {
    /// Whether this error is collapsed into the generic 401 response
    pub fn is_token_failure(&self) -> bool {
        matches!(
            self,
            AuthError::InvalidRefreshToken
                | AuthError::TokenExpired
                | AuthError::TokenMalformed
                | AuthError::TokenAlreadyUsed
                | AuthError::MissingToken
                | AuthError::UserNotFound
        )
    }
}

impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        if self.is_token_failure() {
            tracing::debug!(reason = %self, "Rejecting unauthenticated request");
        }

        let (status, error_code, message) = match &self {
            AuthError::InvalidCredentials => (
                StatusCode::UNAUTHORIZED,
                "invalid_credentials",
                self.to_string(),
            ),
            e if e.is_token_failure() => (
                StatusCode::UNAUTHORIZED,
                "unauthorized",
                "Unauthorized".to_string(),
            ),
            AuthError::Forbidden => (StatusCode::FORBIDDEN, "forbidden", self.to_string()),
            AuthError::Validation(msg) => {
                (StatusCode::BAD_REQUEST, "validation_error", msg.clone())
            }
            _ => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "internal_error",
                "An internal error occurred".to_string(),
            ),
        };

        error_body(status, error_code, &message)
    }
}

impl From<sqlx::Error> for AuthError {
    fn from(err: sqlx::Error) -> Self {
        tracing::error!("Database error: {:?}", err);
        AuthError::Database(err.to_string())
    }
}

impl From<argon2::password_hash::Error> for AuthError {
    fn from(err: argon2::password_hash::Error) -> Self {
        tracing::error!("Password hashing error: {:?}", err);
        AuthError::Internal
    }
}

/// Project and contact service errors
#[derive(Debug, thiserror::Error)]
pub enum ServiceError {
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("{0}")]
    NotFound(String),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Mail error: {0}")]
    Mail(String),
}

impl IntoResponse for ServiceError {
    fn into_response(self) -> Response {
        let (status, error, message) = match self {
            ServiceError::NotFound(msg) => (StatusCode::NOT_FOUND, "not_found", msg),
            ServiceError::Validation(msg) => (StatusCode::BAD_REQUEST, "validation_error", msg),
            ServiceError::Database(err) => {
                tracing::error!("Database error: {}", err);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "database_error",
                    "A database error occurred".to_string(),
                )
            }
            ServiceError::Mail(msg) => {
                tracing::error!("Mail error: {}", msg);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "mail_error",
                    "Failed to send email".to_string(),
                )
            }
        };

        error_body(status, error, &message)
    }
}

/// Request body rejected before reaching a handler
#[derive(Debug, Clone, thiserror::Error)]
#[error("{0}")]
pub struct ValidationRejection(pub String);

impl IntoResponse for ValidationRejection {
    fn into_response(self) -> Response {
        error_body(StatusCode::BAD_REQUEST, "validation_error", &self.0)
    }
}

fn error_body(status: StatusCode, error: &str, message: &str) -> Response {
    (
        status,
        Json(serde_json::json!({
            "error": error,
            "message": message
        })),
    )
        .into_response()
}
