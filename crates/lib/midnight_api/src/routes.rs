//! Route paths.

use midnight_core::models::content::ContentKind;

pub const GET_HEALTH: &str = "/api/v1/health";
pub const POST_AUTH_REGISTER: &str = "/api/v1/auth/register";
pub const POST_AUTH_LOGIN: &str = "/api/v1/auth/login";

/// Collection path of a content kind, e.g. `/api/v1/poems`.
pub fn content_collection(kind: ContentKind) -> String {
    format!("/api/v1/{}", kind.table())
}

/// Item path of a content kind, e.g. `/api/v1/poems/{id}`.
pub fn content_item(kind: ContentKind) -> String {
    format!("{}/{{id}}", content_collection(kind))
}

/// Status path of a content kind, e.g. `/api/v1/poems/{id}/status`.
pub fn content_status(kind: ContentKind) -> String {
    format!("{}/status", content_item(kind))
}

/// View-count path of a content kind, e.g. `/api/v1/poems/{id}/view`.
pub fn content_view(kind: ContentKind) -> String {
    format!("{}/view", content_item(kind))
}
