//! The admin account, persisted as a small JSON file.

use std::{
    fmt, fs, io,
    path::{Path, PathBuf},
};

use argon2::{
    Argon2,
    password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
};
use base64::{Engine as _, engine::general_purpose::URL_SAFE_NO_PAD};
use password_hash::rand_core::{OsRng, RngCore};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, info};

#[derive(Debug, Error)]
pub enum CredentialError {
    #[error("credentials file I/O failure: {0}")]
    Io(#[from] io::Error),
    #[error("credentials file is malformed: {0}")]
    Malformed(#[from] serde_json::Error),
    #[error("password hashing failed: {0}")]
    PasswordHash(String),
}

#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AdminCredentials {
    pub username: String,
    pub password_hash: String,
    pub api_token: String,
}

impl fmt::Debug for AdminCredentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AdminCredentials")
            .field("username", &self.username)
            .field("password_hash", &"<redacted>")
            .field("api_token", &"<redacted>")
            .finish()
    }
}

/// Location of the credentials file. Absent file means setup has not run yet.
#[derive(Debug, Clone)]
pub struct CredentialStore {
    path: PathBuf,
}

impl CredentialStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// # Errors
    /// Fails when the file exists but cannot be read or parsed.
    pub fn load(&self) -> Result<Option<AdminCredentials>, CredentialError> {
        let content = match fs::read_to_string(&self.path) {
            Ok(content) => content,
            Err(err) if err.kind() == io::ErrorKind::NotFound => {
                debug!(path = %self.path.display(), "no credentials file, setup required");
                return Ok(None);
            }
            Err(err) => return Err(err.into()),
        };
        Ok(Some(serde_json::from_str(&content)?))
    }

    /// Writes the credentials as pretty JSON, creating the parent directory.
    ///
    /// # Errors
    /// Fails when the directory or file cannot be written.
    pub fn save(&self, credentials: &AdminCredentials) -> Result<(), CredentialError> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            create_private_dir(parent)?;
        }
        let mut body = serde_json::to_string_pretty(credentials)?;
        body.push('\n');
        write_private_file(&self.path, body.as_bytes())?;
        info!(path = %self.path.display(), username = %credentials.username, "saved admin credentials");
        Ok(())
    }
}

#[cfg(unix)]
fn create_private_dir(dir: &Path) -> io::Result<()> {
    use std::os::unix::fs::DirBuilderExt;
    fs::DirBuilder::new().recursive(true).mode(0o700).create(dir)
}

#[cfg(not(unix))]
fn create_private_dir(dir: &Path) -> io::Result<()> {
    fs::create_dir_all(dir)
}

#[cfg(unix)]
fn write_private_file(path: &Path, body: &[u8]) -> io::Result<()> {
    use std::io::Write;
    use std::os::unix::fs::OpenOptionsExt;
    let mut file = fs::OpenOptions::new()
        .write(true)
        .create(true)
        .truncate(true)
        .mode(0o600)
        .open(path)?;
    file.write_all(body)
}

#[cfg(not(unix))]
fn write_private_file(path: &Path, body: &[u8]) -> io::Result<()> {
    fs::write(path, body)
}

/// Hashes a password with Argon2id and a random salt.
///
/// # Errors
/// Returns [`CredentialError::PasswordHash`] if hashing fails.
pub fn hash_password(password: &str) -> Result<String, CredentialError> {
    let salt = SaltString::generate(&mut OsRng);
    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|err| CredentialError::PasswordHash(err.to_string()))
}

/// Checks a password against a stored hash. A malformed hash never matches.
pub fn verify_password(password: &str, hash: &str) -> bool {
    PasswordHash::new(hash).is_ok_and(|parsed| {
        Argon2::default()
            .verify_password(password.as_bytes(), &parsed)
            .is_ok()
    })
}

/// 32 random bytes, URL-safe base64 without padding.
pub fn generate_api_token() -> String {
    let mut raw = [0u8; 32];
    OsRng.fill_bytes(&mut raw);
    URL_SAFE_NO_PAD.encode(raw)
}
