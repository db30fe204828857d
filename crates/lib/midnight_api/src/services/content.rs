//! Poem, song and thought operations with their authorization rules.
//!
//! Lookups happen before any ownership or visibility check, so a missing
//! record is always 404 regardless of who asks.

use chrono::Utc;
use midnight_core::models::auth::Identity;
use midnight_core::models::content::{
    ContentFilter, ContentKind, ContentRecord, Page, PageRequest, PublicationStatus,
};
use midnight_core::store::ContentStore;
use tracing::info;

use crate::error::{AppError, AppResult};
use crate::models::ContentRequest;

fn not_found(kind: ContentKind) -> AppError {
    AppError::NotFound(format!("{} not found", kind.label()))
}

async fn load<S>(store: &S, kind: ContentKind, id: i64) -> AppResult<ContentRecord>
where
    S: ContentStore + ?Sized,
{
    store
        .find_content(kind, id)
        .await?
        .ok_or_else(|| not_found(kind))
}

/// Create a record owned by `owner`.
pub async fn create<S>(
    store: &S,
    kind: ContentKind,
    owner: &Identity,
    request: ContentRequest,
) -> AppResult<ContentRecord>
where
    S: ContentStore + ?Sized,
{
    let new = request
        .validate(kind, owner.user_id)
        .map_err(AppError::invalid_fields)?;
    let record = store.create_content(new, Utc::now()).await?;
    info!(%kind, id = record.id, user_id = owner.user_id, status = %record.status, "content created");
    Ok(record)
}

/// The caller's own records, or everyone's published records for anonymous callers.
pub async fn list<S>(
    store: &S,
    kind: ContentKind,
    caller: Option<&Identity>,
    status: Option<PublicationStatus>,
    page: PageRequest,
) -> AppResult<Page<ContentRecord>>
where
    S: ContentStore + ?Sized,
{
    let filter = match caller {
        Some(identity) => ContentFilter::Owner {
            owner_id: identity.user_id,
            status,
        },
        None => ContentFilter::Published,
    };
    Ok(store.list_content(kind, filter, page).await?)
}

/// Fetch one record. Drafts are only visible to their owner.
pub async fn get<S>(
    store: &S,
    kind: ContentKind,
    id: i64,
    caller: Option<&Identity>,
) -> AppResult<ContentRecord>
where
    S: ContentStore + ?Sized,
{
    let record = load(store, kind, id).await?;
    if !record.is_visible_to(caller.map(|c| c.user_id)) {
        return Err(AppError::Unauthorized(
            "Unauthorized access to draft content".into(),
        ));
    }
    Ok(record)
}

/// Owner-only status change.
pub async fn update_status<S>(
    store: &S,
    kind: ContentKind,
    id: i64,
    status: PublicationStatus,
    caller: &Identity,
) -> AppResult<ContentRecord>
where
    S: ContentStore + ?Sized,
{
    let record = load(store, kind, id).await?;
    if !record.is_owned_by(caller.user_id) {
        return Err(AppError::Unauthorized("Unauthorized to update status".into()));
    }
    let updated = store
        .update_status(kind, id, status, Utc::now())
        .await?
        .ok_or_else(|| not_found(kind))?;
    info!(%kind, id, %status, "content status updated");
    Ok(updated)
}

/// Owner-only soft delete.
pub async fn delete<S>(store: &S, kind: ContentKind, id: i64, caller: &Identity) -> AppResult<()>
where
    S: ContentStore + ?Sized,
{
    let record = load(store, kind, id).await?;
    if !record.is_owned_by(caller.user_id) {
        return Err(AppError::Unauthorized(format!(
            "Unauthorized to delete {}",
            kind.noun()
        )));
    }
    if !store.soft_delete(kind, id).await? {
        return Err(not_found(kind));
    }
    info!(%kind, id, "content deleted");
    Ok(())
}

/// Count one view.
pub async fn record_view<S>(store: &S, kind: ContentKind, id: i64) -> AppResult<()>
where
    S: ContentStore + ?Sized,
{
    if store.increment_view_count(kind, id).await? {
        Ok(())
    } else {
        Err(not_found(kind))
    }
}
