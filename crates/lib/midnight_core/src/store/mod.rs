//! Persistence interface.
//!
//! The HTTP layer only talks to storage through these traits. Two
//! implementations exist: [`postgres::PgStore`] for production and
//! [`memory::MemoryStore`] for tests and database-less development.

pub mod memory;
pub mod postgres;

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use thiserror::Error;

use crate::models::auth::{Credential, NewUser};
use crate::models::content::{
    ContentFilter, ContentKind, ContentRecord, NewContent, Page, PageRequest, PublicationStatus,
};

pub use memory::MemoryStore;
pub use postgres::PgStore;

/// Storage errors.
#[derive(Debug, Error)]
pub enum StoreError {
    /// A uniqueness constraint was violated (e.g. duplicate email).
    #[error("Conflict: {0}")]
    Conflict(String),

    /// A stored value could not be mapped back into the domain model.
    #[error("Corrupt row: {0}")]
    Corrupt(String),

    #[error("Database error: {0}")]
    DbError(#[from] sqlx::Error),
}

/// Credential lookups and user creation.
#[async_trait]
pub trait CredentialStore: Send + Sync {
    /// Find the credential whose subject (email) is `subject`.
    async fn find_credential_by_subject(
        &self,
        subject: &str,
    ) -> Result<Option<Credential>, StoreError>;

    /// Check whether an email is already registered.
    async fn email_exists(&self, email: &str) -> Result<bool, StoreError>;

    /// Create a user. Fails with [`StoreError::Conflict`] if the email is taken.
    async fn create_user(&self, user: NewUser) -> Result<Credential, StoreError>;
}

/// Poem, song and thought persistence.
///
/// Soft-deleted records are invisible to every method.
#[async_trait]
pub trait ContentStore: Send + Sync {
    /// Insert a record. `published_at` is set to `now` when created published.
    async fn create_content(
        &self,
        content: NewContent,
        now: DateTime<Utc>,
    ) -> Result<ContentRecord, StoreError>;

    /// Fetch a live record by id.
    async fn find_content(
        &self,
        kind: ContentKind,
        id: i64,
    ) -> Result<Option<ContentRecord>, StoreError>;

    /// List live records matching `filter`, newest first.
    async fn list_content(
        &self,
        kind: ContentKind,
        filter: ContentFilter,
        page: PageRequest,
    ) -> Result<Page<ContentRecord>, StoreError>;

    /// Change the status. Publishing sets `published_at` if it was never set.
    async fn update_status(
        &self,
        kind: ContentKind,
        id: i64,
        status: PublicationStatus,
        now: DateTime<Utc>,
    ) -> Result<Option<ContentRecord>, StoreError>;

    /// Soft delete. Returns `false` if there was no live record.
    async fn soft_delete(&self, kind: ContentKind, id: i64) -> Result<bool, StoreError>;

    /// Atomically add one view. Returns `false` if there was no live record.
    async fn increment_view_count(&self, kind: ContentKind, id: i64) -> Result<bool, StoreError>;
}

/// Everything the API needs from storage.
pub trait Store: CredentialStore + ContentStore {}

impl<T: CredentialStore + ContentStore> Store for T {}

/// Shared handle held in application state.
pub type SharedStore = Arc<dyn Store>;
