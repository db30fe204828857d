//! Request and response bodies of the HTTP API.
//!
//! Every response is wrapped in [`ApiResponse`]. Field names are camelCase on
//! the wire.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use midnight_core::models::content::{
    ContentKind, ContentRecord, DEFAULT_PAGE_SIZE, NewContent, Page, PageRequest,
    PublicationStatus,
};
use serde::{Deserialize, Serialize};

use crate::error::ErrorCode;

/// Field name → validation message.
pub type FieldErrors = BTreeMap<String, String>;

/// Standard response envelope.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiResponse<T> {
    pub success: bool,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_code: Option<ErrorCode>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
    pub timestamp: DateTime<Utc>,
}

impl<T> ApiResponse<T> {
    pub fn success(data: T, message: impl Into<String>) -> Self {
        Self {
            success: true,
            message: message.into(),
            error_code: None,
            data: Some(data),
            timestamp: Utc::now(),
        }
    }

    pub fn error(message: impl Into<String>, error_code: ErrorCode) -> Self {
        Self {
            success: false,
            message: message.into(),
            error_code: Some(error_code),
            data: None,
            timestamp: Utc::now(),
        }
    }

    pub fn with_data(mut self, data: T) -> Self {
        self.data = Some(data);
        self
    }
}

impl ApiResponse<()> {
    /// Success without a payload.
    pub fn ok(message: impl Into<String>) -> Self {
        Self {
            success: true,
            message: message.into(),
            error_code: None,
            data: None,
            timestamp: Utc::now(),
        }
    }
}

// ---------------------------------------------------------------------------
// Auth
// ---------------------------------------------------------------------------

/// `POST /api/v1/auth/register` body.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct RegisterRequest {
    pub username: Option<String>,
    pub email: Option<String>,
    pub password: Option<String>,
}

/// Register input after validation.
#[derive(Debug, Clone)]
pub struct ValidRegistration {
    pub username: String,
    pub email: String,
    pub password: String,
}

impl RegisterRequest {
    pub fn validate(self) -> Result<ValidRegistration, FieldErrors> {
        let mut errors = FieldErrors::new();

        let username = required(&mut errors, "username", self.username, "Username is required");
        if let Some(name) = &username {
            let len = name.chars().count();
            if !(3..=20).contains(&len) {
                errors.insert(
                    "username".into(),
                    "Username must be between 3 and 20 characters".into(),
                );
            }
        }

        let email = required(&mut errors, "email", self.email, "Email is required");
        if let Some(email) = &email
            && !is_valid_email(email)
        {
            errors.insert("email".into(), "Email should be valid".into());
        }

        let password = required(&mut errors, "password", self.password, "Password is required");
        if let Some(password) = &password
            && password.chars().count() < 6
        {
            errors.insert(
                "password".into(),
                "Password must be at least 6 characters".into(),
            );
        }

        match (username, email, password) {
            (Some(username), Some(email), Some(password)) if errors.is_empty() => {
                Ok(ValidRegistration {
                    username,
                    email,
                    password,
                })
            }
            _ => Err(errors),
        }
    }
}

/// `POST /api/v1/auth/login` body.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct LoginRequest {
    pub email: Option<String>,
    pub password: Option<String>,
}

impl LoginRequest {
    /// Returns `(email, password)`.
    pub fn validate(self) -> Result<(String, String), FieldErrors> {
        let mut errors = FieldErrors::new();
        let email = required(&mut errors, "email", self.email, "Email is required");
        if let Some(email) = &email
            && !is_valid_email(email)
        {
            errors.insert("email".into(), "Email should be valid".into());
        }
        let password = required(&mut errors, "password", self.password, "Password is required");
        match (email, password) {
            (Some(email), Some(password)) if errors.is_empty() => Ok((email, password)),
            _ => Err(errors),
        }
    }
}

/// Payload of a successful login or registration.
#[derive(Debug, Clone, Serialize)]
pub struct AuthResponse {
    pub message: String,
    pub token: String,
}

// ---------------------------------------------------------------------------
// Content
// ---------------------------------------------------------------------------

/// Create body shared by the three content kinds.
///
/// Poems use `title` + `content`, songs `title` + `lyrics` + `audioUrl`,
/// thoughts `content`. Fields that do not belong to the kind are ignored.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ContentRequest {
    pub title: Option<String>,
    pub content: Option<String>,
    pub lyrics: Option<String>,
    pub audio_url: Option<String>,
    pub status: Option<PublicationStatus>,
}

impl ContentRequest {
    pub fn validate(self, kind: ContentKind, owner_id: i64) -> Result<NewContent, FieldErrors> {
        let mut errors = FieldErrors::new();
        let (title, body, audio_url) = match kind {
            ContentKind::Poem => (
                required(&mut errors, "title", self.title, "Title is required"),
                required(&mut errors, "content", self.content, "Content is required"),
                None,
            ),
            ContentKind::Song => (
                required(&mut errors, "title", self.title, "Title is required"),
                required(&mut errors, "lyrics", self.lyrics, "Lyrics are required"),
                self.audio_url.filter(|u| !u.trim().is_empty()),
            ),
            ContentKind::Thought => (
                None,
                required(&mut errors, "content", self.content, "Content is required"),
                None,
            ),
        };
        match body {
            Some(body) if errors.is_empty() => Ok(NewContent {
                kind,
                owner_id,
                title,
                body,
                audio_url,
                status: self.status.unwrap_or_default(),
            }),
            _ => Err(errors),
        }
    }
}

/// Query string of the list endpoints.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct ListQuery {
    pub status: Option<PublicationStatus>,
    pub page: Option<u32>,
    pub size: Option<u32>,
}

impl ListQuery {
    pub fn page_request(&self) -> PageRequest {
        PageRequest::new(self.page.unwrap_or(0), self.size.unwrap_or(DEFAULT_PAGE_SIZE))
    }
}

/// Query string of `PATCH /{id}/status`.
#[derive(Debug, Clone, Deserialize)]
pub struct StatusQuery {
    pub status: PublicationStatus,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PoemResponse {
    pub id: i64,
    pub title: String,
    pub content: String,
    pub created_at: DateTime<Utc>,
    pub status: PublicationStatus,
    pub published_at: Option<DateTime<Utc>>,
    pub view_count: i64,
    pub like_count: i64,
    pub user_id: i64,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SongResponse {
    pub id: i64,
    pub title: String,
    pub lyrics: String,
    pub audio_url: Option<String>,
    pub created_at: DateTime<Utc>,
    pub status: PublicationStatus,
    pub published_at: Option<DateTime<Utc>>,
    pub view_count: i64,
    pub like_count: i64,
    pub user_id: i64,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ThoughtResponse {
    pub id: i64,
    pub content: String,
    pub created_at: DateTime<Utc>,
    pub status: PublicationStatus,
    pub published_at: Option<DateTime<Utc>>,
    pub view_count: i64,
    pub like_count: i64,
    pub user_id: i64,
}

/// A content record shaped for its kind.
#[derive(Debug, Clone, Serialize)]
#[serde(untagged)]
pub enum ContentResponse {
    Poem(PoemResponse),
    Song(SongResponse),
    Thought(ThoughtResponse),
}

impl From<ContentRecord> for ContentResponse {
    fn from(r: ContentRecord) -> Self {
        match r.kind {
            ContentKind::Poem => ContentResponse::Poem(PoemResponse {
                id: r.id,
                title: r.title.unwrap_or_default(),
                content: r.body,
                created_at: r.created_at,
                status: r.status,
                published_at: r.published_at,
                view_count: r.view_count,
                like_count: r.like_count,
                user_id: r.owner_id,
            }),
            ContentKind::Song => ContentResponse::Song(SongResponse {
                id: r.id,
                title: r.title.unwrap_or_default(),
                lyrics: r.body,
                audio_url: r.audio_url,
                created_at: r.created_at,
                status: r.status,
                published_at: r.published_at,
                view_count: r.view_count,
                like_count: r.like_count,
                user_id: r.owner_id,
            }),
            ContentKind::Thought => ContentResponse::Thought(ThoughtResponse {
                id: r.id,
                content: r.body,
                created_at: r.created_at,
                status: r.status,
                published_at: r.published_at,
                view_count: r.view_count,
                like_count: r.like_count,
                user_id: r.owner_id,
            }),
        }
    }
}

/// Paginated list payload.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PageResponse<T> {
    pub content: Vec<T>,
    pub page_number: u32,
    pub page_size: u32,
    pub total_elements: u64,
    pub total_pages: u64,
    pub last: bool,
}

impl<T> PageResponse<T> {
    pub fn from_page<U>(page: Page<U>) -> Self
    where
        T: From<U>,
    {
        let total_pages = page.total_pages();
        let last = page.is_last();
        Self {
            page_number: page.request.page,
            page_size: page.request.size,
            total_elements: page.total,
            total_pages,
            last,
            content: page.items.into_iter().map(T::from).collect(),
        }
    }
}

// ---------------------------------------------------------------------------
// Health
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize)]
pub struct HealthStatus {
    pub status: String,
    pub message: String,
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

/// Take a non-blank value or record `message` under `field`.
fn required(
    errors: &mut FieldErrors,
    field: &str,
    value: Option<String>,
    message: &str,
) -> Option<String> {
    match value {
        Some(v) if !v.trim().is_empty() => Some(v),
        _ => {
            errors.insert(field.to_string(), message.to_string());
            None
        }
    }
}

/// Lenient address check: one `@`, non-empty local part and domain, no whitespace.
pub fn is_valid_email(email: &str) -> bool {
    let Some((local, domain)) = email.split_once('@') else {
        return false;
    };
    !local.is_empty()
        && !domain.is_empty()
        && !domain.contains('@')
        && !domain.starts_with('.')
        && !domain.ends_with('.')
        && !email.chars().any(char::is_whitespace)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn register_reports_every_bad_field() {
        let errors = RegisterRequest {
            username: Some("ab".into()),
            email: Some("not-an-email".into()),
            password: Some("123".into()),
        }
        .validate()
        .unwrap_err();
        assert_eq!(errors["username"], "Username must be between 3 and 20 characters");
        assert_eq!(errors["email"], "Email should be valid");
        assert_eq!(errors["password"], "Password must be at least 6 characters");
    }

    #[test]
    fn register_missing_fields_are_required() {
        let errors = RegisterRequest::default().validate().unwrap_err();
        assert_eq!(errors["username"], "Username is required");
        assert_eq!(errors["email"], "Email is required");
        assert_eq!(errors["password"], "Password is required");
    }

    #[test]
    fn valid_registration_passes() {
        let valid = RegisterRequest {
            username: Some("nightowl".into()),
            email: Some("owl@example.com".into()),
            password: Some("moonlight".into()),
        }
        .validate()
        .unwrap();
        assert_eq!(valid.email, "owl@example.com");
    }

    #[test]
    fn email_check_is_lenient_but_not_blind() {
        assert!(is_valid_email("owl@example.com"));
        assert!(is_valid_email("owl@localhost"));
        assert!(!is_valid_email("owl"));
        assert!(!is_valid_email("@example.com"));
        assert!(!is_valid_email("owl@"));
        assert!(!is_valid_email("owl@@example.com"));
        assert!(!is_valid_email("o wl@example.com"));
    }

    #[test]
    fn song_requires_title_and_lyrics() {
        let errors = ContentRequest {
            content: Some("wrong field".into()),
            ..Default::default()
        }
        .validate(ContentKind::Song, 1)
        .unwrap_err();
        assert_eq!(errors["title"], "Title is required");
        assert_eq!(errors["lyrics"], "Lyrics are required");
    }

    #[test]
    fn thought_defaults_to_draft() {
        let new = ContentRequest {
            content: Some("3am and wide awake".into()),
            ..Default::default()
        }
        .validate(ContentKind::Thought, 9)
        .unwrap();
        assert_eq!(new.status, PublicationStatus::Draft);
        assert_eq!(new.owner_id, 9);
        assert!(new.title.is_none());
    }

    #[test]
    fn envelope_omits_absent_fields() {
        let json = serde_json::to_value(ApiResponse::ok("done")).unwrap();
        assert_eq!(json["success"], true);
        assert!(json.get("errorCode").is_none());
        assert!(json.get("data").is_none());
        assert!(json["timestamp"].is_string());

        let json =
            serde_json::to_value(ApiResponse::<()>::error("nope", ErrorCode::Unauthorized)).unwrap();
        assert_eq!(json["errorCode"], "UNAUTHORIZED");
    }
}
