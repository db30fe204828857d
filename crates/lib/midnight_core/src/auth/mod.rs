//! Authentication primitives.
//!
//! Provides password hashing and JWT issuance/verification shared by the
//! HTTP layer in `midnight_api`.

pub mod jwt;
pub mod password;

use thiserror::Error;

/// Authentication errors.
#[derive(Debug, Error)]
pub enum AuthError {
    #[error("Token error: {0}")]
    TokenError(String),

    #[error("Internal error: {0}")]
    Internal(String),
}
