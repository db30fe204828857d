//! Application error types.

use axum::{
    Json,
    extract::rejection::{JsonRejection, PathRejection, QueryRejection},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use midnight_core::auth::AuthError;
use midnight_core::store::StoreError;
use serde::Serialize;
use thiserror::Error;
use tracing::error;

use crate::models::{ApiResponse, FieldErrors};

/// Convenience alias for handler return types.
pub type AppResult<T> = Result<T, AppError>;

/// Machine-readable error code carried in the response envelope.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    ValidationError,
    InvalidCredentials,
    UserNotFound,
    Unauthorized,
    ResourceNotFound,
    MethodNotAllowed,
    TooManyRequests,
    InternalServerError,
}

/// Application-level errors with HTTP status mapping.
#[derive(Debug, Error)]
pub enum AppError {
    /// Bad input. `fields` maps field names to messages when known.
    #[error("Validation error: {message}")]
    Validation {
        message: String,
        fields: Option<FieldErrors>,
    },

    /// Email/password pair did not match.
    #[error("Invalid email or password")]
    InvalidCredentials,

    /// Caller is not allowed to do this: anonymous on a protected route,
    /// not the owner, or reading someone else's draft.
    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    #[error("Not found: {0}")]
    NotFound(String),

    /// Known path, unsupported method.
    #[error("Method not allowed")]
    MethodNotAllowed,

    #[error("Rate limit exceeded")]
    TooManyRequests,

    #[error("Internal server error: {0}")]
    Internal(String),
}

impl AppError {
    pub fn validation(message: impl Into<String>) -> Self {
        AppError::Validation {
            message: message.into(),
            fields: None,
        }
    }

    /// Field-level failures, reported as "Validation failed" with the map as data.
    pub fn invalid_fields(fields: FieldErrors) -> Self {
        AppError::Validation {
            message: "Validation failed".into(),
            fields: Some(fields),
        }
    }

    pub fn status(&self) -> StatusCode {
        match self {
            AppError::Validation { .. } => StatusCode::BAD_REQUEST,
            AppError::InvalidCredentials => StatusCode::UNAUTHORIZED,
            AppError::Unauthorized(_) => StatusCode::FORBIDDEN,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::MethodNotAllowed => StatusCode::METHOD_NOT_ALLOWED,
            AppError::TooManyRequests => StatusCode::TOO_MANY_REQUESTS,
            AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    pub fn code(&self) -> ErrorCode {
        match self {
            AppError::Validation { .. } => ErrorCode::ValidationError,
            AppError::InvalidCredentials => ErrorCode::InvalidCredentials,
            AppError::Unauthorized(_) => ErrorCode::Unauthorized,
            AppError::NotFound(_) => ErrorCode::ResourceNotFound,
            AppError::MethodNotAllowed => ErrorCode::MethodNotAllowed,
            AppError::TooManyRequests => ErrorCode::TooManyRequests,
            AppError::Internal(_) => ErrorCode::InternalServerError,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();
        let code = self.code();
        let body = match self {
            AppError::Validation { message, fields } => {
                let envelope = ApiResponse::error(message, code);
                match fields {
                    Some(fields) => envelope.with_data(fields),
                    None => envelope,
                }
            }
            AppError::InvalidCredentials => {
                ApiResponse::error("Invalid email or password", code)
            }
            AppError::MethodNotAllowed => ApiResponse::error("Method not allowed", code),
            AppError::TooManyRequests => {
                ApiResponse::error("Rate limit exceeded. Try again in a minute.", code)
            }
            AppError::Internal(m) => {
                error!(error = %m, "internal error");
                ApiResponse::error(format!("An unexpected error occurred: {m}"), code)
            }
            AppError::Unauthorized(m) | AppError::NotFound(m) => ApiResponse::error(m, code),
        };
        (status, Json(body)).into_response()
    }
}

impl From<StoreError> for AppError {
    fn from(e: StoreError) -> Self {
        match e {
            StoreError::Conflict(_) => AppError::validation("Email already exists"),
            StoreError::Corrupt(msg) => AppError::Internal(msg),
            StoreError::DbError(e) => AppError::Internal(e.to_string()),
        }
    }
}

impl From<AuthError> for AppError {
    fn from(e: AuthError) -> Self {
        match e {
            AuthError::TokenError(msg) | AuthError::Internal(msg) => AppError::Internal(msg),
        }
    }
}

impl From<JsonRejection> for AppError {
    fn from(e: JsonRejection) -> Self {
        AppError::validation(e.body_text())
    }
}

impl From<QueryRejection> for AppError {
    fn from(e: QueryRejection) -> Self {
        AppError::validation(e.body_text())
    }
}

impl From<PathRejection> for AppError {
    fn from(e: PathRejection) -> Self {
        AppError::validation(e.body_text())
    }
}
