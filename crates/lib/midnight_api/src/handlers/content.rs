//! Poem, song and thought handlers.
//!
//! The same handlers serve all three kinds; [`routes`] mounts them once per
//! kind with the kind in an [`Extension`].

use axum::extract::rejection::{JsonRejection, PathRejection, QueryRejection};
use axum::extract::{Path, Query, State};
use axum::routing::{get, patch, post};
use axum::{Extension, Json, Router};
use midnight_core::models::content::ContentKind;

use crate::AppState;
use crate::error::AppResult;
use crate::middleware::auth::{AuthUser, CurrentUser};
use crate::models::{ApiResponse, ContentRequest, ContentResponse, ListQuery, PageResponse, StatusQuery};
use crate::routes;
use crate::services::content;

/// Routes for one content kind.
pub fn routes(kind: ContentKind) -> Router<AppState> {
    Router::new()
        .route(
            &routes::content_collection(kind),
            get(list_handler).post(create_handler),
        )
        .route(
            &routes::content_item(kind),
            get(get_handler).delete(delete_handler),
        )
        .route(&routes::content_status(kind), patch(update_status_handler))
        .route(&routes::content_view(kind), post(view_handler))
        .layer(Extension(kind))
}

/// `POST /api/v1/{kind}`: create a record owned by the caller.
pub async fn create_handler(
    State(state): State<AppState>,
    Extension(kind): Extension<ContentKind>,
    AuthUser(user): AuthUser,
    body: Result<Json<ContentRequest>, JsonRejection>,
) -> AppResult<Json<ApiResponse<ContentResponse>>> {
    let Json(body) = body?;
    let record = content::create(state.store.as_ref(), kind, &user, body).await?;
    Ok(Json(ApiResponse::success(
        record.into(),
        format!("{} created successfully", kind.label()),
    )))
}

/// `GET /api/v1/{kind}`: own records when authenticated, published records otherwise.
pub async fn list_handler(
    State(state): State<AppState>,
    Extension(kind): Extension<ContentKind>,
    CurrentUser(user): CurrentUser,
    query: Result<Query<ListQuery>, QueryRejection>,
) -> AppResult<Json<ApiResponse<PageResponse<ContentResponse>>>> {
    let Query(query) = query?;
    let page = content::list(
        state.store.as_ref(),
        kind,
        user.as_ref(),
        query.status,
        query.page_request(),
    )
    .await?;
    Ok(Json(ApiResponse::success(
        PageResponse::from_page(page),
        format!("{} retrieved successfully", kind.plural_label()),
    )))
}

/// `GET /api/v1/{kind}/{id}`
pub async fn get_handler(
    State(state): State<AppState>,
    Extension(kind): Extension<ContentKind>,
    CurrentUser(user): CurrentUser,
    id: Result<Path<i64>, PathRejection>,
) -> AppResult<Json<ApiResponse<ContentResponse>>> {
    let Path(id) = id?;
    let record = content::get(state.store.as_ref(), kind, id, user.as_ref()).await?;
    Ok(Json(ApiResponse::success(
        record.into(),
        format!("{} retrieved successfully", kind.label()),
    )))
}

/// `PATCH /api/v1/{kind}/{id}/status?status=DRAFT|PUBLISHED`: owner only.
pub async fn update_status_handler(
    State(state): State<AppState>,
    Extension(kind): Extension<ContentKind>,
    AuthUser(user): AuthUser,
    id: Result<Path<i64>, PathRejection>,
    query: Result<Query<StatusQuery>, QueryRejection>,
) -> AppResult<Json<ApiResponse<ContentResponse>>> {
    let Path(id) = id?;
    let Query(query) = query?;
    let record = content::update_status(state.store.as_ref(), kind, id, query.status, &user).await?;
    Ok(Json(ApiResponse::success(
        record.into(),
        format!("{} status updated successfully", kind.label()),
    )))
}

/// `DELETE /api/v1/{kind}/{id}`: owner only, soft delete.
pub async fn delete_handler(
    State(state): State<AppState>,
    Extension(kind): Extension<ContentKind>,
    AuthUser(user): AuthUser,
    id: Result<Path<i64>, PathRejection>,
) -> AppResult<Json<ApiResponse<()>>> {
    let Path(id) = id?;
    content::delete(state.store.as_ref(), kind, id, &user).await?;
    Ok(Json(ApiResponse::ok(format!(
        "{} deleted successfully",
        kind.label()
    ))))
}

/// `POST /api/v1/{kind}/{id}/view`
pub async fn view_handler(
    State(state): State<AppState>,
    Extension(kind): Extension<ContentKind>,
    AuthUser(_user): AuthUser,
    id: Result<Path<i64>, PathRejection>,
) -> AppResult<Json<ApiResponse<()>>> {
    let Path(id) = id?;
    content::record_view(state.store.as_ref(), kind, id).await?;
    Ok(Json(ApiResponse::ok("View count incremented")))
}
