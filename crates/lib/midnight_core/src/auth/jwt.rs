//! JWT token generation and verification.
//!
//! Tokens are HS256-signed and carry only the subject (the user's email),
//! the issue time and the expiry. Nothing is persisted server-side: a token
//! is valid iff its signature verifies, it has not expired and its subject
//! matches the identity it is checked against.

use std::path::{Path, PathBuf};

use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode};
use rand::distr::Alphanumeric;
use rand::{Rng, rng};
use tracing::{info, warn};

use super::AuthError;
use crate::models::auth::TokenClaims;

/// Default token lifetime: 24 hours.
pub const DEFAULT_TOKEN_VALIDITY_SECS: i64 = 24 * 60 * 60;

/// Outcome of checking a token against an expected subject.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TokenCheck {
    /// Signature verifies, subject matches and the token is not expired.
    Valid(TokenClaims),
    /// Signature verifies but `now >= exp`.
    Expired,
    /// Signature verifies but the token belongs to someone else.
    SubjectMismatch,
    /// Malformed, wrongly signed or missing required claims.
    Invalid,
}

impl TokenCheck {
    pub fn is_valid(&self) -> bool {
        matches!(self, TokenCheck::Valid(_))
    }
}

/// Generate a signed token for `subject`, valid for `validity` from now.
pub fn generate_token(subject: &str, secret: &[u8], validity: Duration) -> Result<String, AuthError> {
    generate_token_at(subject, secret, validity, Utc::now())
}

/// Generate a signed token as if issued at `issued_at`.
pub fn generate_token_at(
    subject: &str,
    secret: &[u8],
    validity: Duration,
    issued_at: DateTime<Utc>,
) -> Result<String, AuthError> {
    let claims = TokenClaims {
        sub: subject.to_string(),
        iat: issued_at.timestamp(),
        exp: (issued_at + validity).timestamp(),
    };
    encode(
        &Header::new(Algorithm::HS256),
        &claims,
        &EncodingKey::from_secret(secret),
    )
    .map_err(|e| AuthError::TokenError(format!("jwt encode: {e}")))
}

/// Verify the signature and decode the claims, without judging expiry.
///
/// Expiry is checked separately against an explicit clock so that the
/// boundary (`now >= exp` means expired) is exact and has no leeway.
pub fn decode_claims(token: &str, secret: &[u8]) -> Option<TokenClaims> {
    let key = DecodingKey::from_secret(secret);
    let mut validation = Validation::new(Algorithm::HS256);
    validation.validate_exp = false;
    validation.leeway = 0;
    decode::<TokenClaims>(token, &key, &validation)
        .ok()
        .map(|data| data.claims)
}

/// Extract the subject of a correctly signed token.
pub fn extract_subject(token: &str, secret: &[u8]) -> Option<String> {
    decode_claims(token, secret).map(|claims| claims.sub)
}

/// A token is expired iff `now >= exp`.
pub fn is_expired(claims: &TokenClaims, now: DateTime<Utc>) -> bool {
    now.timestamp() >= claims.exp
}

/// Check `token` against `subject` at time `now`.
pub fn check_token(token: &str, subject: &str, secret: &[u8], now: DateTime<Utc>) -> TokenCheck {
    let Some(claims) = decode_claims(token, secret) else {
        return TokenCheck::Invalid;
    };
    if claims.sub != subject {
        return TokenCheck::SubjectMismatch;
    }
    if is_expired(&claims, now) {
        return TokenCheck::Expired;
    }
    TokenCheck::Valid(claims)
}

/// Convenience wrapper: is `token` valid for `subject` right now?
pub fn validate_token(token: &str, subject: &str, secret: &[u8]) -> bool {
    check_token(token, subject, secret, Utc::now()).is_valid()
}

/// Resolve the JWT secret: env var `JWT_SECRET` → `AUTH_SECRET` → persisted file.
pub fn resolve_jwt_secret() -> String {
    if let Ok(secret) = std::env::var("JWT_SECRET")
        && !secret.is_empty()
    {
        return secret;
    }
    if let Ok(secret) = std::env::var("AUTH_SECRET")
        && !secret.is_empty()
    {
        return secret;
    }
    load_or_create_secret(&jwt_secret_path())
}

/// Read the secret stored at `path`, generating and persisting one if absent.
pub fn load_or_create_secret(path: &Path) -> String {
    if let Ok(existing) = std::fs::read_to_string(path) {
        let trimmed = existing.trim();
        if !trimmed.is_empty() {
            return trimmed.to_string();
        }
    }
    let secret: String = rng()
        .sample_iter(&Alphanumeric)
        .take(64)
        .map(char::from)
        .collect();
    if let Some(parent) = path.parent() {
        let _ = std::fs::create_dir_all(parent);
    }
    match std::fs::write(path, &secret) {
        Ok(()) => info!(path = %path.display(), "generated new JWT secret"),
        Err(e) => warn!(path = %path.display(), "could not persist JWT secret: {e}"),
    }
    secret
}

/// Path to the persisted JWT secret file.
fn jwt_secret_path() -> PathBuf {
    dirs::data_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("after-midnight")
        .join("jwt-secret")
}
