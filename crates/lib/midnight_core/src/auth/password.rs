//! Account password storage.
//!
//! Passwords are stored as salted bcrypt digests. Login checks always run
//! exactly one bcrypt verification, even for an unknown email, so response
//! time does not reveal which emails are registered.

use std::sync::OnceLock;

use super::AuthError;

/// Work factor for new digests.
pub const COST: u32 = 10;

static DUMMY_DIGEST: OnceLock<Option<String>> = OnceLock::new();

/// Digest verified in place of a missing account's. `None` only if bcrypt
/// itself failed at first use, in which case the dummy check is skipped.
fn dummy_digest() -> Option<&'static str> {
    DUMMY_DIGEST
        .get_or_init(|| bcrypt::hash("no account has this password", COST).ok())
        .as_deref()
}

/// Produce a salted digest of `plain` for storage.
pub fn hash_password(plain: &str) -> Result<String, AuthError> {
    bcrypt::hash(plain, COST)
        .map_err(|e| AuthError::Internal(format!("password digest failed: {e}")))
}

/// Whether `plain` matches `digest`. A digest that is not bcrypt is an error.
pub fn verify_password(plain: &str, digest: &str) -> Result<bool, AuthError> {
    bcrypt::verify(plain, digest)
        .map_err(|e| AuthError::Internal(format!("stored digest unreadable: {e}")))
}

/// Login check against the digest of the account found for the email, if any.
///
/// With no account the dummy digest is verified instead and the result is
/// always `false`.
pub fn verify_login(plain: &str, digest: Option<&str>) -> Result<bool, AuthError> {
    match digest {
        Some(digest) => verify_password(plain, digest),
        None => {
            if let Some(dummy) = dummy_digest() {
                let _ = bcrypt::verify(plain, dummy);
            }
            Ok(false)
        }
    }
}
