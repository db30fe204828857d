//! # midnight_core
//!
//! Core domain logic for After Midnight: token issuance and verification,
//! password hashing, per-client rate limiting and the persistence interface.

pub mod auth;
pub mod migrate;
pub mod models;
pub mod rate_limit;
pub mod store;

/// Returns the crate version.
pub fn version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
