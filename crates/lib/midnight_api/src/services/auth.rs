//! Authentication service: register/login flows delegating to `midnight_core::auth`.

use chrono::Duration;
use midnight_core::auth::{jwt, password};
use midnight_core::models::auth::NewUser;
use midnight_core::store::CredentialStore;
use tracing::info;

use crate::error::{AppError, AppResult};
use crate::models::{AuthResponse, ValidRegistration};

// ---------------------------------------------------------------------------
// Password hashing (bcrypt is CPU-bound; run it on the blocking pool)
// ---------------------------------------------------------------------------

/// Hash a password with bcrypt off the async executor.
pub async fn hash_password(password: String) -> AppResult<String> {
    tokio::task::spawn_blocking(move || password::hash_password(&password))
        .await
        .map_err(|e| AppError::Internal(format!("hash task failed: {e}")))?
        .map_err(AppError::from)
}

/// Check a login password off the async executor. `hash` is `None` when no
/// account matched the email.
pub async fn verify_login(password: String, hash: Option<String>) -> AppResult<bool> {
    tokio::task::spawn_blocking(move || password::verify_login(&password, hash.as_deref()))
        .await
        .map_err(|e| AppError::Internal(format!("verify task failed: {e}")))?
        .map_err(AppError::from)
}

// ---------------------------------------------------------------------------
// Public auth operations
// ---------------------------------------------------------------------------

/// Register a new account and issue a token for it.
pub async fn register<S>(
    store: &S,
    registration: ValidRegistration,
    jwt_secret: &[u8],
    validity: Duration,
) -> AppResult<AuthResponse>
where
    S: CredentialStore + ?Sized,
{
    if store.email_exists(&registration.email).await? {
        return Err(AppError::validation("Email already exists"));
    }

    let password_hash = hash_password(registration.password).await?;
    let credential = store
        .create_user(NewUser {
            username: registration.username,
            email: registration.email,
            password_hash,
        })
        .await?;

    let token = jwt::generate_token(&credential.email, jwt_secret, validity)?;
    info!(user_id = credential.user_id, "user registered");

    Ok(AuthResponse {
        message: "User registered successfully".into(),
        token,
    })
}

/// Authenticate with email + password.
///
/// Unknown email and wrong password fail identically, and both cost one
/// bcrypt verification.
pub async fn login<S>(
    store: &S,
    email: &str,
    password: String,
    jwt_secret: &[u8],
    validity: Duration,
) -> AppResult<AuthResponse>
where
    S: CredentialStore + ?Sized,
{
    let credential = store.find_credential_by_subject(email).await?;
    let hash = credential.as_ref().map(|c| c.password_hash.clone());
    let verified = verify_login(password, hash).await?;
    let Some(credential) = credential.filter(|_| verified) else {
        return Err(AppError::InvalidCredentials);
    };

    let token = jwt::generate_token(&credential.email, jwt_secret, validity)?;
    info!(user_id = credential.user_id, "user logged in");

    Ok(AuthResponse {
        message: "User logged in successfully".into(),
        token,
    })
}
