//! Per-client request throttling.

use std::net::SocketAddr;

use axum::{
    extract::{ConnectInfo, Request, State, connect_info::MockConnectInfo},
    http::{HeaderValue, header::RETRY_AFTER},
    middleware::Next,
    response::{IntoResponse, Response},
};
use midnight_core::rate_limit::Decision;
use tracing::warn;

use crate::AppState;
use crate::error::AppError;

/// Key used when the peer address is unavailable.
pub const UNKNOWN_CLIENT: &str = "unknown";

/// Client key for a request: the peer IP address.
pub fn client_key(request: &Request) -> String {
    let extensions = request.extensions();
    extensions
        .get::<ConnectInfo<SocketAddr>>()
        .map(|ConnectInfo(addr)| *addr)
        .or_else(|| {
            extensions
                .get::<MockConnectInfo<SocketAddr>>()
                .map(|MockConnectInfo(addr)| *addr)
        })
        .map(|addr| addr.ip().to_string())
        .unwrap_or_else(|| UNKNOWN_CLIENT.to_string())
}

/// Axum middleware: counts the request against its client's window and
/// answers 429 `TOO_MANY_REQUESTS` once the window's budget is spent.
pub async fn rate_limit(State(state): State<AppState>, request: Request, next: Next) -> Response {
    let client = client_key(&request);
    match state.rate_limiter.check(&client) {
        Decision::Allowed { .. } => next.run(request).await,
        Decision::Limited { retry_after } => {
            warn!(
                client = %client,
                path = %request.uri().path(),
                "rate limit exceeded"
            );
            let mut response = AppError::TooManyRequests.into_response();
            let secs = retry_after.as_secs().max(1);
            if let Ok(value) = HeaderValue::from_str(&secs.to_string()) {
                response.headers_mut().insert(RETRY_AFTER, value);
            }
            response
        }
    }
}
