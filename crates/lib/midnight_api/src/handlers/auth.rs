//! Authentication request handlers.

use axum::Json;
use axum::extract::State;
use axum::extract::rejection::JsonRejection;

use crate::AppState;
use crate::error::{AppError, AppResult};
use crate::models::{ApiResponse, AuthResponse, LoginRequest, RegisterRequest};
use crate::services::auth;

/// `POST /api/v1/auth/register`: create an account and return a token.
pub async fn register_handler(
    State(state): State<AppState>,
    body: Result<Json<RegisterRequest>, JsonRejection>,
) -> AppResult<Json<ApiResponse<AuthResponse>>> {
    let Json(body) = body?;
    let registration = body.validate().map_err(AppError::invalid_fields)?;
    let resp = auth::register(
        state.store.as_ref(),
        registration,
        state.config.jwt_secret.as_bytes(),
        state.config.token_validity,
    )
    .await?;
    Ok(Json(ApiResponse::success(resp, "Registration successful")))
}

/// `POST /api/v1/auth/login`: authenticate with email + password.
pub async fn login_handler(
    State(state): State<AppState>,
    body: Result<Json<LoginRequest>, JsonRejection>,
) -> AppResult<Json<ApiResponse<AuthResponse>>> {
    let Json(body) = body?;
    let (email, password) = body.validate().map_err(AppError::invalid_fields)?;
    let resp = auth::login(
        state.store.as_ref(),
        &email,
        password,
        state.config.jwt_secret.as_bytes(),
        state.config.token_validity,
    )
    .await?;
    Ok(Json(ApiResponse::success(resp, "Login successful")))
}
