//! Shared helpers for the router integration tests.
#![allow(dead_code)]

use std::net::SocketAddr;
use std::sync::Arc;

use axum::Router;
use axum::body::Body;
use axum::extract::ConnectInfo;
use axum::extract::connect_info::MockConnectInfo;
use axum::http::{HeaderMap, Method, Request, StatusCode};
use midnight_api::{AppState, config::ApiConfig};
use midnight_core::store::MemoryStore;
use serde_json::{Value, json};
use tower::ServiceExt;

pub const SECRET: &str = "integration-secret";

/// Address every request appears to come from unless overridden.
pub const DEFAULT_CLIENT: ([u8; 4], u16) = ([10, 0, 0, 1], 40000);

pub struct TestApp {
    pub router: Router,
    pub state: AppState,
    pub store: Arc<MemoryStore>,
}

pub struct TestResponse {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: Value,
}

pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_test_writer()
        .with_env_filter("midnight_api=debug")
        .try_init();
}

/// Router over a fresh in-memory store with default limits.
pub fn test_app() -> TestApp {
    test_app_with(ApiConfig::with_secret(SECRET))
}

pub fn test_app_with(config: ApiConfig) -> TestApp {
    init_tracing();
    let store = Arc::new(MemoryStore::new());
    let state = AppState::new(store.clone(), config);
    let router =
        midnight_api::router(state.clone()).layer(MockConnectInfo(SocketAddr::from(DEFAULT_CLIENT)));
    TestApp {
        router,
        state,
        store,
    }
}

impl TestApp {
    pub async fn send(&self, req: Request<Body>) -> TestResponse {
        let resp = self.router.clone().oneshot(req).await.expect("request");
        let status = resp.status();
        let headers = resp.headers().clone();
        let bytes = axum::body::to_bytes(resp.into_body(), usize::MAX)
            .await
            .expect("read body");
        let body = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).expect("parse JSON")
        };
        TestResponse {
            status,
            headers,
            body,
        }
    }

    /// Register an account and return its bearer token.
    pub async fn register(&self, username: &str, email: &str) -> String {
        let resp = self
            .send(json_request(
                Method::POST,
                "/api/v1/auth/register",
                None,
                json!({ "username": username, "email": email, "password": "moonlight" }),
            ))
            .await;
        assert_eq!(resp.status, StatusCode::OK, "register failed: {}", resp.body);
        resp.body["data"]["token"]
            .as_str()
            .expect("token is string")
            .to_string()
    }

    /// Create a content record and return its id.
    pub async fn create(&self, token: &str, collection: &str, body: Value) -> i64 {
        let resp = self
            .send(json_request(Method::POST, collection, Some(token), body))
            .await;
        assert_eq!(resp.status, StatusCode::OK, "create failed: {}", resp.body);
        resp.body["data"]["id"].as_i64().expect("id is number")
    }
}

pub fn request(method: Method, uri: &str, token: Option<&str>) -> Request<Body> {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(token) = token {
        builder = builder.header("authorization", format!("Bearer {token}"));
    }
    builder.body(Body::empty()).unwrap()
}

pub fn json_request(method: Method, uri: &str, token: Option<&str>, body: Value) -> Request<Body> {
    let mut builder = Request::builder()
        .method(method)
        .uri(uri)
        .header("content-type", "application/json");
    if let Some(token) = token {
        builder = builder.header("authorization", format!("Bearer {token}"));
    }
    builder.body(Body::from(body.to_string())).unwrap()
}

/// Make `req` appear to come from `addr`, as the real server does.
pub fn from_client(mut req: Request<Body>, addr: SocketAddr) -> Request<Body> {
    req.extensions_mut().insert(ConnectInfo(addr));
    req
}
