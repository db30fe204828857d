//! Authentication domain models.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Stored credential: the user record as the authenticator sees it.
///
/// Keyed on `email`, which is also the token subject.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Credential {
    pub user_id: i64,
    pub username: String,
    pub email: String,
    pub password_hash: String,
}

/// Input for creating a user. The password is already hashed.
#[derive(Debug, Clone)]
pub struct NewUser {
    pub username: String,
    pub email: String,
    pub password_hash: String,
}

/// JWT claims embedded in bearer tokens.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenClaims {
    /// Subject: the user email (standard JWT `sub` claim).
    pub sub: String,
    /// Issued at (unix timestamp).
    pub iat: i64,
    /// Expiry (unix timestamp).
    pub exp: i64,
}

/// Authorization role. Every authenticated user currently holds `User`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Role {
    #[serde(rename = "ROLE_USER")]
    User,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::User => "ROLE_USER",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Identity established for one request by a successful token check.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Identity {
    pub user_id: i64,
    pub username: String,
    /// Token subject (email).
    pub subject: String,
    pub role: Role,
}

impl From<&Credential> for Identity {
    fn from(c: &Credential) -> Self {
        Self {
            user_id: c.user_id,
            username: c.username.clone(),
            subject: c.email.clone(),
            role: Role::User,
        }
    }
}
