//! PostgreSQL store.
//!
//! Each content kind has its own table (`poems`, `songs`, `thoughts`) whose
//! body column differs; the per-kind SQL fragments below alias them onto the
//! shared [`ContentRow`] shape.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;

use super::{ContentStore, CredentialStore, StoreError};
use crate::models::auth::{Credential, NewUser};
use crate::models::content::{
    ContentFilter, ContentKind, ContentRecord, NewContent, Page, PageRequest, PublicationStatus,
};

/// sqlx-backed [`Store`](super::Store) implementation.
#[derive(Debug, Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}

/// Row returned by content queries.
#[derive(Debug, Clone, sqlx::FromRow)]
struct ContentRow {
    id: i64,
    user_id: i64,
    title: Option<String>,
    body: String,
    audio_url: Option<String>,
    status: String,
    created_at: DateTime<Utc>,
    published_at: Option<DateTime<Utc>>,
    view_count: i64,
    like_count: i64,
}

impl ContentRow {
    fn into_record(self, kind: ContentKind) -> Result<ContentRecord, StoreError> {
        let status = self
            .status
            .parse::<PublicationStatus>()
            .map_err(StoreError::Corrupt)?;
        Ok(ContentRecord {
            id: self.id,
            kind,
            owner_id: self.user_id,
            title: self.title,
            body: self.body,
            audio_url: self.audio_url,
            status,
            created_at: self.created_at,
            published_at: self.published_at,
            view_count: self.view_count,
            like_count: self.like_count,
        })
    }
}

/// Columns selected for a kind, aliased onto [`ContentRow`].
fn select_columns(kind: ContentKind) -> &'static str {
    match kind {
        ContentKind::Poem => {
            "id, user_id, title, content AS body, NULL::text AS audio_url, status, \
             created_at, published_at, view_count, like_count"
        }
        ContentKind::Song => {
            "id, user_id, title, lyrics AS body, audio_url, status, \
             created_at, published_at, view_count, like_count"
        }
        ContentKind::Thought => {
            "id, user_id, NULL::text AS title, content AS body, NULL::text AS audio_url, status, \
             created_at, published_at, view_count, like_count"
        }
    }
}

/// `INSERT` statement for a kind.
///
/// Binds, in order: user_id, then the kind's own columns, then status and
/// creation time. `published_at` starts out equal to `created_at` for
/// records created published.
fn insert_sql(kind: ContentKind) -> String {
    let columns = select_columns(kind);
    match kind {
        ContentKind::Poem => format!(
            "INSERT INTO poems (user_id, title, content, status, created_at, published_at) \
             VALUES ($1, $2, $3, $4, $5, CASE WHEN $4 = 'PUBLISHED' THEN $5 END) \
             RETURNING {columns}"
        ),
        ContentKind::Song => format!(
            "INSERT INTO songs (user_id, title, lyrics, audio_url, status, created_at, published_at) \
             VALUES ($1, $2, $3, $4, $5, $6, CASE WHEN $5 = 'PUBLISHED' THEN $6 END) \
             RETURNING {columns}"
        ),
        ContentKind::Thought => format!(
            "INSERT INTO thoughts (user_id, content, status, created_at, published_at) \
             VALUES ($1, $2, $3, $4, CASE WHEN $3 = 'PUBLISHED' THEN $4 END) \
             RETURNING {columns}"
        ),
    }
}

fn map_insert_error(e: sqlx::Error, email: &str) -> StoreError {
    match e {
        sqlx::Error::Database(db) if db.is_unique_violation() => {
            StoreError::Conflict(format!("email '{email}' is already registered"))
        }
        other => StoreError::DbError(other),
    }
}

#[async_trait]
impl CredentialStore for PgStore {
    async fn find_credential_by_subject(
        &self,
        subject: &str,
    ) -> Result<Option<Credential>, StoreError> {
        let row = sqlx::query_as::<_, (i64, String, String, String)>(
            "SELECT id, username, email, password FROM users WHERE email = $1",
        )
        .bind(subject)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row.map(|(user_id, username, email, password_hash)| Credential {
            user_id,
            username,
            email,
            password_hash,
        }))
    }

    async fn email_exists(&self, email: &str) -> Result<bool, StoreError> {
        let exists =
            sqlx::query_scalar::<_, bool>("SELECT EXISTS(SELECT 1 FROM users WHERE email = $1)")
                .bind(email)
                .fetch_one(&self.pool)
                .await?;
        Ok(exists)
    }

    async fn create_user(&self, user: NewUser) -> Result<Credential, StoreError> {
        let user_id = sqlx::query_scalar::<_, i64>(
            "INSERT INTO users (username, email, password) VALUES ($1, $2, $3) RETURNING id",
        )
        .bind(&user.username)
        .bind(&user.email)
        .bind(&user.password_hash)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| map_insert_error(e, &user.email))?;
        Ok(Credential {
            user_id,
            username: user.username,
            email: user.email,
            password_hash: user.password_hash,
        })
    }
}

#[async_trait]
impl ContentStore for PgStore {
    async fn create_content(
        &self,
        content: NewContent,
        now: DateTime<Utc>,
    ) -> Result<ContentRecord, StoreError> {
        let sql = insert_sql(content.kind);
        let mut query = sqlx::query_as::<_, ContentRow>(&sql).bind(content.owner_id);
        query = match content.kind {
            ContentKind::Poem => query.bind(&content.title).bind(&content.body),
            ContentKind::Song => query
                .bind(&content.title)
                .bind(&content.body)
                .bind(&content.audio_url),
            ContentKind::Thought => query.bind(&content.body),
        };
        let row = query
            .bind(content.status.as_str())
            .bind(now)
            .fetch_one(&self.pool)
            .await?;
        row.into_record(content.kind)
    }

    async fn find_content(
        &self,
        kind: ContentKind,
        id: i64,
    ) -> Result<Option<ContentRecord>, StoreError> {
        let sql = format!(
            "SELECT {} FROM {} WHERE id = $1 AND deleted = FALSE",
            select_columns(kind),
            kind.table()
        );
        let row = sqlx::query_as::<_, ContentRow>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        row.map(|r| r.into_record(kind)).transpose()
    }

    async fn list_content(
        &self,
        kind: ContentKind,
        filter: ContentFilter,
        page: PageRequest,
    ) -> Result<Page<ContentRecord>, StoreError> {
        // $1 owner (NULL = any), $2 status (NULL = any).
        let (owner, status) = match filter {
            ContentFilter::Owner { owner_id, status } => {
                (Some(owner_id), status.map(|s| s.as_str()))
            }
            ContentFilter::Published => (None, Some(PublicationStatus::Published.as_str())),
        };
        let predicate = "deleted = FALSE \
             AND ($1::bigint IS NULL OR user_id = $1) \
             AND ($2::text IS NULL OR status = $2)";

        let count_sql = format!("SELECT COUNT(*) FROM {} WHERE {predicate}", kind.table());
        let total = sqlx::query_scalar::<_, i64>(&count_sql)
            .bind(owner)
            .bind(status)
            .fetch_one(&self.pool)
            .await?;

        let page_sql = format!(
            "SELECT {} FROM {} WHERE {predicate} \
             ORDER BY created_at DESC, id DESC LIMIT $3 OFFSET $4",
            select_columns(kind),
            kind.table()
        );
        let rows = sqlx::query_as::<_, ContentRow>(&page_sql)
            .bind(owner)
            .bind(status)
            .bind(i64::from(page.size))
            .bind(i64::try_from(page.offset()).unwrap_or(i64::MAX))
            .fetch_all(&self.pool)
            .await?;

        let items = rows
            .into_iter()
            .map(|r| r.into_record(kind))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Page {
            items,
            request: page,
            total: u64::try_from(total).unwrap_or_default(),
        })
    }

    async fn update_status(
        &self,
        kind: ContentKind,
        id: i64,
        status: PublicationStatus,
        now: DateTime<Utc>,
    ) -> Result<Option<ContentRecord>, StoreError> {
        let sql = format!(
            "UPDATE {} SET status = $2, \
             published_at = CASE WHEN $2 = 'PUBLISHED' AND published_at IS NULL THEN $3 ELSE published_at END \
             WHERE id = $1 AND deleted = FALSE \
             RETURNING {}",
            kind.table(),
            select_columns(kind)
        );
        let row = sqlx::query_as::<_, ContentRow>(&sql)
            .bind(id)
            .bind(status.as_str())
            .bind(now)
            .fetch_optional(&self.pool)
            .await?;
        row.map(|r| r.into_record(kind)).transpose()
    }

    async fn soft_delete(&self, kind: ContentKind, id: i64) -> Result<bool, StoreError> {
        let sql = format!(
            "UPDATE {} SET deleted = TRUE WHERE id = $1 AND deleted = FALSE",
            kind.table()
        );
        let result = sqlx::query(&sql).bind(id).execute(&self.pool).await?;
        Ok(result.rows_affected() > 0)
    }

    async fn increment_view_count(&self, kind: ContentKind, id: i64) -> Result<bool, StoreError> {
        // Single-statement increment: concurrent callers never lose updates.
        let sql = format!(
            "UPDATE {} SET view_count = view_count + 1 WHERE id = $1 AND deleted = FALSE",
            kind.table()
        );
        let result = sqlx::query(&sql).bind(id).execute(&self.pool).await?;
        Ok(result.rows_affected() > 0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_kind_selects_the_same_shape() {
        for kind in ContentKind::ALL {
            let columns = select_columns(kind);
            for alias in ["id", "user_id", "title", "body", "audio_url", "status", "view_count"] {
                assert!(columns.contains(alias), "{kind}: missing {alias}");
            }
        }
    }

    #[test]
    fn insert_targets_the_kind_table() {
        assert!(insert_sql(ContentKind::Poem).starts_with("INSERT INTO poems"));
        assert!(insert_sql(ContentKind::Song).contains("lyrics"));
        assert!(insert_sql(ContentKind::Thought).starts_with("INSERT INTO thoughts (user_id, content,"));
    }
}
