//! API server configuration.

use std::str::FromStr;
use std::time::Duration;

use midnight_core::auth::jwt::{DEFAULT_TOKEN_VALIDITY_SECS, resolve_jwt_secret};
use midnight_core::rate_limit::RateLimitConfig;
use tracing::warn;

/// Origins allowed by CORS when `CORS_ALLOWED_ORIGINS` is unset.
pub const DEFAULT_CORS_ORIGINS: [&str; 2] = ["http://localhost:3000", "http://localhost:5173"];

/// Configuration for the API server. Loaded once at startup.
#[derive(Clone, Debug)]
pub struct ApiConfig {
    /// Address to bind the HTTP listener (e.g. "127.0.0.1:8080").
    pub bind_addr: String,
    /// PostgreSQL connection URL. `None` runs on the in-memory store.
    pub database_url: Option<String>,
    /// JWT signing secret.
    pub jwt_secret: String,
    /// How long an issued token stays valid.
    pub token_validity: chrono::Duration,
    /// Per-client request throttle.
    pub rate_limit: RateLimitConfig,
    /// Origins allowed by CORS.
    pub cors_allowed_origins: Vec<String>,
}

impl ApiConfig {
    /// Reads configuration from environment variables with sensible defaults.
    ///
    /// | Variable                   | Default                                      |
    /// |----------------------------|----------------------------------------------|
    /// | `BIND_ADDR`                | `127.0.0.1:8080`                             |
    /// | `DATABASE_URL`             | unset (in-memory store)                      |
    /// | `JWT_SECRET` / `AUTH_SECRET` | generated & persisted to file              |
    /// | `JWT_EXPIRATION_SECS`      | `86400`                                      |
    /// | `RATE_LIMIT_MAX_REQUESTS`  | `100`                                        |
    /// | `RATE_LIMIT_WINDOW_SECS`   | `60`                                         |
    /// | `RATE_LIMIT_IDLE_SECS`     | `600`                                        |
    /// | `CORS_ALLOWED_ORIGINS`     | `http://localhost:3000,http://localhost:5173` |
    pub fn from_env() -> Self {
        let defaults = RateLimitConfig::default();
        Self {
            bind_addr: std::env::var("BIND_ADDR").unwrap_or_else(|_| "127.0.0.1:8080".into()),
            database_url: std::env::var("DATABASE_URL")
                .ok()
                .filter(|url| !url.is_empty()),
            jwt_secret: resolve_jwt_secret(),
            token_validity: chrono::Duration::seconds(env_or(
                "JWT_EXPIRATION_SECS",
                DEFAULT_TOKEN_VALIDITY_SECS,
            )),
            rate_limit: RateLimitConfig {
                max_requests: env_or("RATE_LIMIT_MAX_REQUESTS", defaults.max_requests),
                window: Duration::from_secs(env_or(
                    "RATE_LIMIT_WINDOW_SECS",
                    defaults.window.as_secs(),
                )),
                idle_ttl: Duration::from_secs(env_or(
                    "RATE_LIMIT_IDLE_SECS",
                    defaults.idle_ttl.as_secs(),
                )),
                sweep_interval: defaults.sweep_interval,
            }
            .normalized(),
            cors_allowed_origins: std::env::var("CORS_ALLOWED_ORIGINS")
                .map(|v| parse_origins(&v))
                .unwrap_or_else(|_| default_origins()),
        }
    }

    /// Configuration for tests and embedding: fixed secret, defaults elsewhere.
    pub fn with_secret(jwt_secret: impl Into<String>) -> Self {
        Self {
            bind_addr: "127.0.0.1:0".into(),
            database_url: None,
            jwt_secret: jwt_secret.into(),
            token_validity: chrono::Duration::seconds(DEFAULT_TOKEN_VALIDITY_SECS),
            rate_limit: RateLimitConfig::default(),
            cors_allowed_origins: default_origins(),
        }
    }
}

fn default_origins() -> Vec<String> {
    DEFAULT_CORS_ORIGINS.iter().map(|o| o.to_string()).collect()
}

/// Split a comma-separated origin list, dropping blanks.
pub fn parse_origins(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|o| !o.is_empty())
        .map(str::to_string)
        .collect()
}

/// Parse `key` from the environment, falling back to `default` when unset or invalid.
fn env_or<T: FromStr + Copy + std::fmt::Display>(key: &str, default: T) -> T {
    match std::env::var(key) {
        Ok(raw) => raw.trim().parse().unwrap_or_else(|_| {
            warn!(key, value = %raw, %default, "invalid value, using default");
            default
        }),
        Err(_) => default,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn origins_are_trimmed_and_blanks_dropped() {
        assert_eq!(
            parse_origins(" https://a.example , ,https://b.example,"),
            vec!["https://a.example", "https://b.example"]
        );
    }

    #[test]
    fn test_config_uses_documented_defaults() {
        let config = ApiConfig::with_secret("s3cret");
        assert_eq!(config.token_validity, chrono::Duration::hours(24));
        assert_eq!(config.rate_limit.max_requests, 100);
        assert_eq!(config.rate_limit.window, Duration::from_secs(60));
        assert_eq!(config.cors_allowed_origins.len(), 2);
        assert!(config.database_url.is_none());
    }

    #[test]
    fn unset_env_key_falls_back() {
        assert_eq!(env_or("MIDNIGHT_TEST_SURELY_UNSET_KEY", 42u32), 42);
    }
}
