use std::sync::Arc;

use shared::models::SetupRequest;
use thiserror::Error;
use tracing::{info, instrument};

use crate::{
    app_state::AppState,
    auth::credentials::{
        AdminCredentials, CredentialError, generate_api_token, hash_password, verify_password,
    },
};

pub const MIN_USERNAME_CHARS: usize = 3;
pub const MIN_PASSWORD_CHARS: usize = 6;

#[derive(Debug, Error)]
pub enum SetupError {
    #[error("setup has already been completed")]
    AlreadyConfigured,
    #[error("{0}")]
    Invalid(String),
    #[error(transparent)]
    Credentials(#[from] CredentialError),
    #[error("background task failed: {0}")]
    Task(#[from] tokio::task::JoinError),
}

/// Whether an admin account exists.
pub async fn is_setup(state: &AppState) -> bool {
    state.admin.read().await.is_some()
}

/// Creates the admin account exactly once.
///
/// The API token comes from `TORADMIN_API_TOKEN` when configured, otherwise
/// it is generated.
///
/// # Errors
/// [`SetupError::AlreadyConfigured`] once an account exists,
/// [`SetupError::Invalid`] for a too short username or password, or a
/// persistence failure.
#[instrument(skip(state, request), fields(username = %request.username))]
pub async fn init_setup(
    state: &AppState,
    request: &SetupRequest,
) -> Result<Arc<AdminCredentials>, SetupError> {
    let username = request.username.trim().to_string();
    if username.chars().count() < MIN_USERNAME_CHARS {
        return Err(SetupError::Invalid(format!(
            "username must be at least {MIN_USERNAME_CHARS} characters"
        )));
    }
    if request.password.chars().count() < MIN_PASSWORD_CHARS {
        return Err(SetupError::Invalid(format!(
            "password must be at least {MIN_PASSWORD_CHARS} characters"
        )));
    }

    let mut admin = state.admin.write().await;
    if admin.is_some() {
        return Err(SetupError::AlreadyConfigured);
    }

    let store = state.credentials.clone();
    let password = request.password.clone();
    let api_token = state.config.auth.api_token.clone();
    let credentials = tokio::task::spawn_blocking(move || -> Result<_, CredentialError> {
        let credentials = AdminCredentials {
            username,
            password_hash: hash_password(&password)?,
            api_token: api_token.unwrap_or_else(generate_api_token),
        };
        store.save(&credentials)?;
        Ok(credentials)
    })
    .await??;

    let credentials = Arc::new(credentials);
    *admin = Some(credentials.clone());
    info!("setup completed");
    Ok(credentials)
}

/// Checks a login attempt. Unknown users and wrong passwords look the same.
///
/// # Errors
/// Fails only when the hashing task cannot run.
pub async fn authenticate(
    state: &AppState,
    username: &str,
    password: &str,
) -> Result<bool, SetupError> {
    let Some(admin) = state.admin().await else {
        return Ok(false);
    };
    let username_matches = admin.username == username.trim();
    let password = password.to_string();
    let password_matches =
        tokio::task::spawn_blocking(move || verify_password(&password, &admin.password_hash))
            .await?;
    Ok(username_matches && password_matches)
}
