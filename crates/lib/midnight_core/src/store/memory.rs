//! In-memory store.
//!
//! Backs tests and database-less development runs. Users are keyed by email
//! and content by `(kind, id)`; every mutation goes through a DashMap entry
//! guard, so per-record updates such as view counting are atomic.

use std::sync::atomic::{AtomicI64, Ordering};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use dashmap::DashMap;
use dashmap::mapref::entry::Entry;

use super::{ContentStore, CredentialStore, StoreError};
use crate::models::auth::{Credential, NewUser};
use crate::models::content::{
    ContentFilter, ContentKind, ContentRecord, NewContent, Page, PageRequest, PublicationStatus,
};

#[derive(Debug)]
struct StoredContent {
    record: ContentRecord,
    deleted: bool,
}

/// Process-local [`Store`](super::Store) implementation.
#[derive(Debug)]
pub struct MemoryStore {
    users: DashMap<String, Credential>,
    content: DashMap<(ContentKind, i64), StoredContent>,
    next_user_id: AtomicI64,
    next_content_id: AtomicI64,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self {
            users: DashMap::new(),
            content: DashMap::new(),
            next_user_id: AtomicI64::new(1),
            next_content_id: AtomicI64::new(1),
        }
    }

    /// Number of registered users.
    pub fn user_count(&self) -> usize {
        self.users.len()
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl CredentialStore for MemoryStore {
    async fn find_credential_by_subject(
        &self,
        subject: &str,
    ) -> Result<Option<Credential>, StoreError> {
        Ok(self.users.get(subject).map(|c| c.value().clone()))
    }

    async fn email_exists(&self, email: &str) -> Result<bool, StoreError> {
        Ok(self.users.contains_key(email))
    }

    async fn create_user(&self, user: NewUser) -> Result<Credential, StoreError> {
        match self.users.entry(user.email.clone()) {
            Entry::Occupied(_) => Err(StoreError::Conflict(format!(
                "email '{}' is already registered",
                user.email
            ))),
            Entry::Vacant(slot) => {
                let credential = Credential {
                    user_id: self.next_user_id.fetch_add(1, Ordering::SeqCst),
                    username: user.username,
                    email: user.email,
                    password_hash: user.password_hash,
                };
                slot.insert(credential.clone());
                Ok(credential)
            }
        }
    }
}

#[async_trait]
impl ContentStore for MemoryStore {
    async fn create_content(
        &self,
        content: NewContent,
        now: DateTime<Utc>,
    ) -> Result<ContentRecord, StoreError> {
        let id = self.next_content_id.fetch_add(1, Ordering::SeqCst);
        let record = ContentRecord {
            id,
            kind: content.kind,
            owner_id: content.owner_id,
            title: content.title,
            body: content.body,
            audio_url: content.audio_url,
            status: content.status,
            created_at: now,
            published_at: (content.status == PublicationStatus::Published).then_some(now),
            view_count: 0,
            like_count: 0,
        };
        self.content.insert(
            (content.kind, id),
            StoredContent {
                record: record.clone(),
                deleted: false,
            },
        );
        Ok(record)
    }

    async fn find_content(
        &self,
        kind: ContentKind,
        id: i64,
    ) -> Result<Option<ContentRecord>, StoreError> {
        Ok(self
            .content
            .get(&(kind, id))
            .filter(|c| !c.deleted)
            .map(|c| c.record.clone()))
    }

    async fn list_content(
        &self,
        kind: ContentKind,
        filter: ContentFilter,
        page: PageRequest,
    ) -> Result<Page<ContentRecord>, StoreError> {
        let mut matching: Vec<ContentRecord> = self
            .content
            .iter()
            .filter(|entry| {
                entry.key().0 == kind && !entry.deleted && filter.matches(&entry.record)
            })
            .map(|entry| entry.record.clone())
            .collect();
        matching.sort_by(|a, b| {
            b.created_at
                .cmp(&a.created_at)
                .then_with(|| b.id.cmp(&a.id))
        });

        let total = matching.len() as u64;
        let offset = usize::try_from(page.offset()).unwrap_or(usize::MAX);
        let items = matching
            .into_iter()
            .skip(offset)
            .take(page.size as usize)
            .collect();

        Ok(Page {
            items,
            request: page,
            total,
        })
    }

    async fn update_status(
        &self,
        kind: ContentKind,
        id: i64,
        status: PublicationStatus,
        now: DateTime<Utc>,
    ) -> Result<Option<ContentRecord>, StoreError> {
        let Some(mut stored) = self.content.get_mut(&(kind, id)) else {
            return Ok(None);
        };
        if stored.deleted {
            return Ok(None);
        }
        stored.record.status = status;
        if status == PublicationStatus::Published && stored.record.published_at.is_none() {
            stored.record.published_at = Some(now);
        }
        Ok(Some(stored.record.clone()))
    }

    async fn soft_delete(&self, kind: ContentKind, id: i64) -> Result<bool, StoreError> {
        let Some(mut stored) = self.content.get_mut(&(kind, id)) else {
            return Ok(false);
        };
        if stored.deleted {
            return Ok(false);
        }
        stored.deleted = true;
        Ok(true)
    }

    async fn increment_view_count(&self, kind: ContentKind, id: i64) -> Result<bool, StoreError> {
        let Some(mut stored) = self.content.get_mut(&(kind, id)) else {
            return Ok(false);
        };
        if stored.deleted {
            return Ok(false);
        }
        stored.record.view_count += 1;
        Ok(true)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use chrono::Duration;

    use super::*;

    fn new_user(email: &str) -> NewUser {
        NewUser {
            username: "owl".into(),
            email: email.into(),
            password_hash: "$2b$10$hash".into(),
        }
    }

    fn new_poem(owner_id: i64, status: PublicationStatus) -> NewContent {
        NewContent {
            kind: ContentKind::Poem,
            owner_id,
            title: Some("Nocturne".into()),
            body: "the streetlights hum".into(),
            audio_url: None,
            status,
        }
    }

    #[tokio::test]
    async fn duplicate_email_is_a_conflict() {
        let store = MemoryStore::new();
        let first = store.create_user(new_user("owl@example.com")).await.unwrap();
        assert_eq!(first.user_id, 1);

        let err = store
            .create_user(new_user("owl@example.com"))
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::Conflict(_)));
        assert_eq!(store.user_count(), 1);
    }

    #[tokio::test]
    async fn credentials_are_found_by_subject() {
        let store = MemoryStore::new();
        store.create_user(new_user("owl@example.com")).await.unwrap();

        let found = store
            .find_credential_by_subject("owl@example.com")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(found.username, "owl");
        assert!(store.email_exists("owl@example.com").await.unwrap());
        assert!(
            store
                .find_credential_by_subject("lark@example.com")
                .await
                .unwrap()
                .is_none()
        );
    }

    #[tokio::test]
    async fn publishing_sets_published_at_once() {
        let store = MemoryStore::new();
        let t0 = Utc::now();
        let draft = store
            .create_content(new_poem(1, PublicationStatus::Draft), t0)
            .await
            .unwrap();
        assert!(draft.published_at.is_none());

        let t1 = t0 + Duration::minutes(5);
        let published = store
            .update_status(ContentKind::Poem, draft.id, PublicationStatus::Published, t1)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(published.published_at, Some(t1));

        let t2 = t1 + Duration::minutes(5);
        store
            .update_status(ContentKind::Poem, draft.id, PublicationStatus::Draft, t2)
            .await
            .unwrap();
        let republished = store
            .update_status(ContentKind::Poem, draft.id, PublicationStatus::Published, t2)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(republished.published_at, Some(t1));
    }

    #[tokio::test]
    async fn soft_deleted_records_disappear() {
        let store = MemoryStore::new();
        let poem = store
            .create_content(new_poem(1, PublicationStatus::Published), Utc::now())
            .await
            .unwrap();

        assert!(store.soft_delete(ContentKind::Poem, poem.id).await.unwrap());
        assert!(!store.soft_delete(ContentKind::Poem, poem.id).await.unwrap());
        assert!(
            store
                .find_content(ContentKind::Poem, poem.id)
                .await
                .unwrap()
                .is_none()
        );
        assert!(
            !store
                .increment_view_count(ContentKind::Poem, poem.id)
                .await
                .unwrap()
        );
        let page = store
            .list_content(ContentKind::Poem, ContentFilter::Published, PageRequest::default())
            .await
            .unwrap();
        assert_eq!(page.total, 0);
    }

    #[tokio::test]
    async fn kinds_do_not_share_records() {
        let store = MemoryStore::new();
        let poem = store
            .create_content(new_poem(1, PublicationStatus::Published), Utc::now())
            .await
            .unwrap();
        assert!(
            store
                .find_content(ContentKind::Song, poem.id)
                .await
                .unwrap()
                .is_none()
        );
    }

    #[tokio::test]
    async fn listing_is_newest_first_and_paginated() {
        let store = MemoryStore::new();
        let t0 = Utc::now();
        for i in 0..5 {
            store
                .create_content(
                    new_poem(1, PublicationStatus::Published),
                    t0 + Duration::seconds(i),
                )
                .await
                .unwrap();
        }
        store
            .create_content(new_poem(2, PublicationStatus::Draft), t0)
            .await
            .unwrap();

        let first = store
            .list_content(ContentKind::Poem, ContentFilter::Published, PageRequest::new(0, 2))
            .await
            .unwrap();
        assert_eq!(first.total, 5);
        assert_eq!(first.items.len(), 2);
        assert!(first.items[0].created_at > first.items[1].created_at);

        let last = store
            .list_content(ContentKind::Poem, ContentFilter::Published, PageRequest::new(2, 2))
            .await
            .unwrap();
        assert_eq!(last.items.len(), 1);
        assert!(last.is_last());

        let own_drafts = store
            .list_content(
                ContentKind::Poem,
                ContentFilter::Owner {
                    owner_id: 2,
                    status: Some(PublicationStatus::Draft),
                },
                PageRequest::default(),
            )
            .await
            .unwrap();
        assert_eq!(own_drafts.total, 1);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn concurrent_view_increments_are_not_lost() {
        let store = Arc::new(MemoryStore::new());
        let poem = store
            .create_content(new_poem(1, PublicationStatus::Published), Utc::now())
            .await
            .unwrap();
        let id = poem.id;

        let tasks: Vec<_> = (0..200)
            .map(|_| {
                let store = Arc::clone(&store);
                tokio::spawn(async move {
                    store
                        .increment_view_count(ContentKind::Poem, id)
                        .await
                        .unwrap()
                })
            })
            .collect();
        for task in tasks {
            assert!(task.await.unwrap());
        }

        let poem = store
            .find_content(ContentKind::Poem, id)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(poem.view_count, 200);
    }
}
