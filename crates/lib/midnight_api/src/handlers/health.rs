//! Liveness endpoint.

use axum::Json;
use tracing::debug;

use crate::models::{ApiResponse, HealthStatus};

/// `GET /api/v1/health`: reports that the service is up.
pub async fn health_handler() -> Json<ApiResponse<HealthStatus>> {
    debug!("health check requested");
    Json(ApiResponse::success(
        HealthStatus {
            status: "UP".into(),
            message: "After Midnight backend is running".into(),
        },
        "Service is healthy",
    ))
}
