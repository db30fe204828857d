//! Storage outages surface as 500 envelopes, never as anonymous access.

mod common;

use std::net::SocketAddr;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use axum::Router;
use axum::body::Body;
use axum::extract::connect_info::MockConnectInfo;
use axum::http::{Method, Request, StatusCode};
use chrono::{DateTime, Utc};
use common::{DEFAULT_CLIENT, SECRET, json_request, request};
use midnight_api::{AppState, config::ApiConfig};
use midnight_core::models::auth::{Credential, NewUser};
use midnight_core::models::content::{
    ContentFilter, ContentKind, ContentRecord, NewContent, Page, PageRequest, PublicationStatus,
};
use midnight_core::store::{ContentStore, CredentialStore, MemoryStore, StoreError};
use serde_json::{Value, json};
use tower::ServiceExt;

/// In-memory store that fails every call while `down` is set.
#[derive(Default)]
struct FlakyStore {
    inner: MemoryStore,
    down: AtomicBool,
}

impl FlakyStore {
    fn check(&self) -> Result<(), StoreError> {
        if self.down.load(Ordering::SeqCst) {
            Err(StoreError::DbError(sqlx::Error::PoolTimedOut))
        } else {
            Ok(())
        }
    }
}

#[async_trait]
impl CredentialStore for FlakyStore {
    async fn find_credential_by_subject(
        &self,
        subject: &str,
    ) -> Result<Option<Credential>, StoreError> {
        self.check()?;
        self.inner.find_credential_by_subject(subject).await
    }

    async fn email_exists(&self, email: &str) -> Result<bool, StoreError> {
        self.check()?;
        self.inner.email_exists(email).await
    }

    async fn create_user(&self, user: NewUser) -> Result<Credential, StoreError> {
        self.check()?;
        self.inner.create_user(user).await
    }
}

#[async_trait]
impl ContentStore for FlakyStore {
    async fn create_content(
        &self,
        content: NewContent,
        now: DateTime<Utc>,
    ) -> Result<ContentRecord, StoreError> {
        self.check()?;
        self.inner.create_content(content, now).await
    }

    async fn find_content(
        &self,
        kind: ContentKind,
        id: i64,
    ) -> Result<Option<ContentRecord>, StoreError> {
        self.check()?;
        self.inner.find_content(kind, id).await
    }

    async fn list_content(
        &self,
        kind: ContentKind,
        filter: ContentFilter,
        page: PageRequest,
    ) -> Result<Page<ContentRecord>, StoreError> {
        self.check()?;
        self.inner.list_content(kind, filter, page).await
    }

    async fn update_status(
        &self,
        kind: ContentKind,
        id: i64,
        status: PublicationStatus,
        now: DateTime<Utc>,
    ) -> Result<Option<ContentRecord>, StoreError> {
        self.check()?;
        self.inner.update_status(kind, id, status, now).await
    }

    async fn soft_delete(&self, kind: ContentKind, id: i64) -> Result<bool, StoreError> {
        self.check()?;
        self.inner.soft_delete(kind, id).await
    }

    async fn increment_view_count(&self, kind: ContentKind, id: i64) -> Result<bool, StoreError> {
        self.check()?;
        self.inner.increment_view_count(kind, id).await
    }
}

fn flaky_app() -> (Router, Arc<FlakyStore>) {
    common::init_tracing();
    let store = Arc::new(FlakyStore::default());
    let state = AppState::new(store.clone(), ApiConfig::with_secret(SECRET));
    let router =
        midnight_api::router(state).layer(MockConnectInfo(SocketAddr::from(DEFAULT_CLIENT)));
    (router, store)
}

async fn send(router: &Router, req: Request<Body>) -> (StatusCode, Value) {
    let resp = router.clone().oneshot(req).await.unwrap();
    let status = resp.status();
    let bytes = axum::body::to_bytes(resp.into_body(), usize::MAX)
        .await
        .unwrap();
    (status, serde_json::from_slice(&bytes).unwrap())
}

fn assert_internal_error(status: StatusCode, body: &Value) {
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR, "{body}");
    assert_eq!(body["success"], false);
    assert_eq!(body["errorCode"], "INTERNAL_SERVER_ERROR");
    let message = body["message"].as_str().unwrap();
    assert!(message.starts_with("An unexpected error occurred: "), "{message}");
    assert!(message.contains("pool timed out"), "{message}");
}

#[tokio::test]
async fn credential_lookup_failure_is_an_internal_error() {
    let (router, store) = flaky_app();
    let (status, body) = send(
        &router,
        json_request(
            Method::POST,
            "/api/v1/auth/register",
            None,
            json!({ "username": "owl", "email": "owl@example.com", "password": "moonlight" }),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK, "{body}");
    let token = body["data"]["token"].as_str().unwrap().to_string();

    store.down.store(true, Ordering::SeqCst);

    // A valid token must not degrade to anonymous access when its
    // credential cannot be loaded.
    let (status, body) = send(&router, request(Method::GET, "/api/v1/poems", Some(&token))).await;
    assert_internal_error(status, &body);

    store.down.store(false, Ordering::SeqCst);
    let (status, body) = send(&router, request(Method::GET, "/api/v1/poems", Some(&token))).await;
    assert_eq!(status, StatusCode::OK, "{body}");
}

#[tokio::test]
async fn content_store_failure_is_an_internal_error() {
    let (router, store) = flaky_app();
    store.down.store(true, Ordering::SeqCst);

    let (status, body) = send(&router, request(Method::GET, "/api/v1/songs", None)).await;
    assert_internal_error(status, &body);

    let (status, body) = send(&router, request(Method::GET, "/api/v1/thoughts/1", None)).await;
    assert_internal_error(status, &body);
}

#[tokio::test]
async fn login_failure_is_not_reported_as_bad_credentials() {
    let (router, store) = flaky_app();
    store.down.store(true, Ordering::SeqCst);

    let (status, body) = send(
        &router,
        json_request(
            Method::POST,
            "/api/v1/auth/login",
            None,
            json!({ "email": "owl@example.com", "password": "moonlight" }),
        ),
    )
    .await;
    assert_internal_error(status, &body);
}
