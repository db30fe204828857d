//! Domain models shared by the store implementations and the HTTP layer.
//!
//! These are internal domain models, distinct from the API envelope types in
//! `midnight_api::models` (which carry `#[serde(rename)]` for camelCase etc.).

pub mod auth;
pub mod content;
