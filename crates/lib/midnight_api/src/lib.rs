//! # midnight_api
//!
//! HTTP API library for After Midnight.

pub mod config;
pub mod error;
pub mod handlers;
pub mod middleware;
pub mod models;
pub mod routes;
pub mod services;

use std::any::Any;
use std::sync::Arc;

use axum::Router;
use axum::http::header::{ACCEPT, AUTHORIZATION, CONTENT_TYPE, ORIGIN, X_CONTENT_TYPE_OPTIONS, X_FRAME_OPTIONS};
use axum::http::{HeaderValue, Method};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use midnight_core::models::content::ContentKind;
use midnight_core::rate_limit::RateLimiter;
use midnight_core::store::SharedStore;
use tower_http::catch_panic::CatchPanicLayer;
use tower_http::cors::{AllowOrigin, CorsLayer};
use tower_http::set_header::SetResponseHeaderLayer;
use tower_http::trace::TraceLayer;
use tracing::warn;

use crate::config::ApiConfig;
use crate::error::AppError;
use crate::handlers::{auth, content, health};

/// Shared application state passed to all handlers.
#[derive(Clone)]
pub struct AppState {
    /// Credential and content storage.
    pub store: SharedStore,
    /// API configuration.
    pub config: ApiConfig,
    /// Per-client request counters.
    pub rate_limiter: Arc<RateLimiter>,
}

impl AppState {
    /// Build state with a fresh rate limiter sized from `config`.
    pub fn new(store: SharedStore, config: ApiConfig) -> Self {
        let rate_limiter = Arc::new(RateLimiter::new(config.rate_limit));
        Self {
            store,
            config,
            rate_limiter,
        }
    }
}

/// Builds the Axum router with all routes and shared state.
///
/// Requests pass, outermost first: panic guard, trace span, CORS, security
/// headers, rate limiter, identity resolution, handler.
pub fn router(state: AppState) -> Router {
    let mut app = Router::new()
        .route(routes::GET_HEALTH, get(health::health_handler))
        .route(routes::POST_AUTH_REGISTER, post(auth::register_handler))
        .route(routes::POST_AUTH_LOGIN, post(auth::login_handler));
    for kind in ContentKind::ALL {
        app = app.merge(content::routes(kind));
    }

    app.method_not_allowed_fallback(method_not_allowed_handler)
        .fallback(not_found_handler)
        .layer(axum::middleware::from_fn_with_state(
            state.clone(),
            middleware::auth::attach_identity,
        ))
        .layer(axum::middleware::from_fn_with_state(
            state.clone(),
            middleware::rate_limit::rate_limit,
        ))
        .layer(SetResponseHeaderLayer::overriding(
            X_CONTENT_TYPE_OPTIONS,
            HeaderValue::from_static("nosniff"),
        ))
        .layer(SetResponseHeaderLayer::overriding(
            X_FRAME_OPTIONS,
            HeaderValue::from_static("DENY"),
        ))
        .layer(cors_layer(&state.config.cors_allowed_origins))
        .layer(TraceLayer::new_for_http())
        .layer(CatchPanicLayer::custom(panic_response))
        .with_state(state)
}

fn cors_layer(origins: &[String]) -> CorsLayer {
    let origins: Vec<HeaderValue> = origins
        .iter()
        .filter_map(|origin| match HeaderValue::from_str(origin) {
            Ok(value) => Some(value),
            Err(_) => {
                warn!(origin = %origin, "ignoring invalid CORS origin");
                None
            }
        })
        .collect();

    CorsLayer::new()
        .allow_origin(AllowOrigin::list(origins))
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::DELETE,
            Method::OPTIONS,
            Method::PATCH,
        ])
        .allow_headers([AUTHORIZATION, CONTENT_TYPE, ACCEPT, ORIGIN])
        .allow_credentials(true)
}

async fn not_found_handler() -> AppError {
    AppError::NotFound("Resource not found".into())
}

async fn method_not_allowed_handler() -> AppError {
    AppError::MethodNotAllowed
}

fn panic_response(panic: Box<dyn Any + Send + 'static>) -> Response {
    let detail = if let Some(s) = panic.downcast_ref::<String>() {
        s.clone()
    } else if let Some(s) = panic.downcast_ref::<&str>() {
        (*s).to_string()
    } else {
        "handler panicked".to_string()
    };
    AppError::Internal(detail).into_response()
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::StatusCode;
    use serde_json::Value;

    async fn body_json(resp: Response) -> Value {
        let bytes = axum::body::to_bytes(resp.into_body(), usize::MAX)
            .await
            .unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn panics_become_internal_errors() {
        let resp = panic_response(Box::new("boom"));
        assert_eq!(resp.status(), StatusCode::INTERNAL_SERVER_ERROR);
        let body = body_json(resp).await;
        assert_eq!(body["success"], false);
        assert_eq!(body["errorCode"], "INTERNAL_SERVER_ERROR");
        assert_eq!(body["message"], "An unexpected error occurred: boom");

        let resp = panic_response(Box::new(String::from("kaboom")));
        assert_eq!(resp.status(), StatusCode::INTERNAL_SERVER_ERROR);
        let body = body_json(resp).await;
        assert_eq!(body["message"], "An unexpected error occurred: kaboom");

        let resp = panic_response(Box::new(7_u8));
        let body = body_json(resp).await;
        assert_eq!(body["message"], "An unexpected error occurred: handler panicked");
    }

    #[test]
    fn invalid_origins_are_skipped() {
        // Builds without panicking even with a header-unsafe origin.
        let _ = cors_layer(&["http://localhost:3000".into(), "bad\norigin".into()]);
    }
}
