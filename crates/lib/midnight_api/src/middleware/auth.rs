//! Bearer token authentication.
//!
//! Every request passes through [`attach_identity`], which resolves an
//! optional identity and stores it in a fresh [`RequestContext`] in the
//! request extensions. Handlers then state their policy through the
//! extractor they take: [`AuthUser`] for protected routes, [`CurrentUser`]
//! where an identity is optional.

use axum::{
    extract::{FromRequestParts, Request, State},
    http::{header::AUTHORIZATION, request::Parts},
    middleware::Next,
    response::Response,
};
use chrono::{DateTime, Utc};
use midnight_core::auth::jwt::{TokenCheck, check_token, extract_subject};
use midnight_core::models::auth::Identity;
use midnight_core::store::{CredentialStore, StoreError};
use tracing::debug;

use crate::AppState;
use crate::error::AppError;

/// Why a presented token did not yield an identity.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Rejection {
    /// Not a well-formed, correctly signed token.
    Malformed,
    /// No credential exists for the token's subject.
    UnknownSubject,
    /// The token's subject does not match the stored credential.
    SubjectMismatch,
    Expired,
}

/// Result of inspecting the `Authorization` header of one request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Authentication {
    /// No bearer token was presented.
    Anonymous,
    /// A token was presented and refused. The request continues anonymously.
    Rejected(Rejection),
    Authenticated(Identity),
}

impl Authentication {
    pub fn into_identity(self) -> Option<Identity> {
        match self {
            Authentication::Authenticated(identity) => Some(identity),
            Authentication::Anonymous | Authentication::Rejected(_) => None,
        }
    }
}

/// Resolve the caller from an `Authorization` header value.
///
/// Only the `Bearer ` scheme is recognised; anything else is treated as no
/// token at all. Storage failures are returned as errors, never as
/// anonymous.
pub async fn authenticate<S>(
    header: Option<&str>,
    store: &S,
    secret: &[u8],
    now: DateTime<Utc>,
) -> Result<Authentication, StoreError>
where
    S: CredentialStore + ?Sized,
{
    let Some(token) = header.and_then(|h| h.strip_prefix("Bearer ")) else {
        return Ok(Authentication::Anonymous);
    };
    let Some(subject) = extract_subject(token, secret) else {
        return Ok(Authentication::Rejected(Rejection::Malformed));
    };
    let Some(credential) = store.find_credential_by_subject(&subject).await? else {
        return Ok(Authentication::Rejected(Rejection::UnknownSubject));
    };
    Ok(match check_token(token, &credential.email, secret, now) {
        TokenCheck::Valid(_) => Authentication::Authenticated(Identity::from(&credential)),
        TokenCheck::Expired => Authentication::Rejected(Rejection::Expired),
        TokenCheck::SubjectMismatch => Authentication::Rejected(Rejection::SubjectMismatch),
        TokenCheck::Invalid => Authentication::Rejected(Rejection::Malformed),
    })
}

/// Per-request security context. Created for every request and dropped with it.
#[derive(Debug, Clone, Default)]
pub struct RequestContext {
    pub identity: Option<Identity>,
}

/// Axum middleware: authenticates the bearer token, if any, and inserts a
/// [`RequestContext`] into the request extensions.
///
/// Never rejects a request on its own; route policy is enforced by the
/// extractors.
pub async fn attach_identity(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Result<Response, AppError> {
    let header = request
        .headers()
        .get(AUTHORIZATION)
        .and_then(|v| v.to_str().ok());

    let outcome = authenticate(
        header,
        state.store.as_ref(),
        state.config.jwt_secret.as_bytes(),
        Utc::now(),
    )
    .await?;

    if let Authentication::Rejected(reason) = &outcome {
        debug!(?reason, path = %request.uri().path(), "bearer token rejected");
    }

    request.extensions_mut().insert(RequestContext {
        identity: outcome.into_identity(),
    });

    Ok(next.run(request).await)
}

fn identity_from(parts: &Parts) -> Option<Identity> {
    parts
        .extensions
        .get::<RequestContext>()
        .and_then(|ctx| ctx.identity.clone())
}

/// Extractor for routes that require an authenticated caller.
///
/// Rejects anonymous callers with 403 `UNAUTHORIZED`.
#[derive(Debug, Clone)]
pub struct AuthUser(pub Identity);

impl<S: Send + Sync> FromRequestParts<S> for AuthUser {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        identity_from(parts)
            .map(AuthUser)
            .ok_or_else(|| AppError::Unauthorized("Authentication required".into()))
    }
}

/// Extractor for routes open to everyone; carries the identity when present.
#[derive(Debug, Clone)]
pub struct CurrentUser(pub Option<Identity>);

impl<S: Send + Sync> FromRequestParts<S> for CurrentUser {
    type Rejection = std::convert::Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        Ok(CurrentUser(identity_from(parts)))
    }
}
