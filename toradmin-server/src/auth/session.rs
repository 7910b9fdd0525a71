//! Stateless login sessions carried in an encrypted cookie.

use axum::http::{HeaderMap, header};
use base64::{
    Engine as _,
    engine::general_purpose::{STANDARD, URL_SAFE_NO_PAD},
};
use cookie::{Cookie, CookieJar, Key, SameSite};
use serde::{Deserialize, Serialize};
use shared::config::server::{SESSION_KEY_ENV, SessionSection};
use thiserror::Error;
use time::{Duration, OffsetDateTime};
use tracing::{debug, warn};

/// Minimum decoded length of a session key.
pub const MIN_KEY_BYTES: usize = 64;

#[derive(Debug, Error)]
pub enum SessionError {
    #[error("TORADMIN_SESSION_KEY is not valid base64")]
    KeyEncoding,
    #[error("TORADMIN_SESSION_KEY must decode to at least 64 bytes, got {0}")]
    KeyTooShort(usize),
    #[error("failed to encode session: {0}")]
    Encode(#[from] serde_json::Error),
}

#[derive(Debug, Serialize, Deserialize)]
struct SessionPayload {
    username: String,
    expires_at: i64,
}

/// Issues and verifies session cookies.
#[derive(Clone)]
pub struct SessionManager {
    key: Key,
    cookie_name: String,
    secure: bool,
    max_age: Duration,
}

impl std::fmt::Debug for SessionManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionManager")
            .field("cookie_name", &self.cookie_name)
            .field("secure", &self.secure)
            .field("max_age", &self.max_age)
            .finish_non_exhaustive()
    }
}

impl SessionManager {
    /// Builds the manager from configuration.
    ///
    /// Without a configured secret a random key is generated, so sessions do
    /// not survive a restart.
    ///
    /// # Errors
    /// Returns [`SessionError`] when the configured secret is unusable.
    pub fn from_config(section: &SessionSection) -> Result<Self, SessionError> {
        let key = match section.secret.as_deref() {
            Some(secret) => decode_key(secret)?,
            None => {
                warn!(
                    "{SESSION_KEY_ENV} is not set; using a random session key, sessions will not survive a restart"
                );
                Key::generate()
            }
        };
        Ok(Self::new(key, section))
    }

    pub fn new(key: Key, section: &SessionSection) -> Self {
        Self {
            key,
            cookie_name: section.cookie_name.clone(),
            secure: section.secure,
            max_age: Duration::seconds(i64::try_from(section.max_age_seconds).unwrap_or(i64::MAX)),
        }
    }

    pub fn cookie_name(&self) -> &str {
        &self.cookie_name
    }

    /// Encrypted cookie naming `username`, valid for the configured max age.
    ///
    /// # Errors
    /// Returns [`SessionError::Encode`] if the payload cannot be serialized.
    pub fn issue(&self, username: &str) -> Result<Cookie<'static>, SessionError> {
        let expires_at = OffsetDateTime::now_utc().saturating_add(self.max_age);
        let payload = serde_json::to_string(&SessionPayload {
            username: username.to_string(),
            expires_at: expires_at.unix_timestamp(),
        })?;

        let cookie = self
            .base_cookie(payload)
            .max_age(self.max_age)
            .expires(expires_at)
            .build();

        let mut jar = CookieJar::new();
        jar.private_mut(&self.key).add(cookie);
        let encrypted = jar
            .get(&self.cookie_name)
            .cloned()
            .unwrap_or_else(|| Cookie::new(self.cookie_name.clone(), String::new()));
        Ok(encrypted)
    }

    /// Cookie that makes the browser drop the session.
    pub fn clear(&self) -> Cookie<'static> {
        let mut cookie = self.base_cookie(String::new()).build();
        cookie.make_removal();
        cookie
    }

    /// Username of a valid, unexpired session cookie in `headers`.
    ///
    /// Tampered, foreign-key and expired cookies are all treated as absent.
    pub fn username(&self, headers: &HeaderMap) -> Option<String> {
        let mut jar = CookieJar::new();
        for value in headers.get_all(header::COOKIE) {
            let Ok(value) = value.to_str() else { continue };
            for cookie in Cookie::split_parse(value).flatten() {
                if cookie.name() == self.cookie_name {
                    jar.add_original(cookie.into_owned());
                }
            }
        }

        let cookie = jar.private(&self.key).get(&self.cookie_name)?;
        let payload: SessionPayload = serde_json::from_str(cookie.value()).ok()?;
        if payload.expires_at <= OffsetDateTime::now_utc().unix_timestamp() {
            debug!(username = %payload.username, "session cookie expired");
            return None;
        }
        Some(payload.username)
    }

    fn base_cookie(&self, value: String) -> cookie::CookieBuilder<'static> {
        Cookie::build((self.cookie_name.clone(), value))
            .path("/")
            .http_only(true)
            .secure(self.secure)
            .same_site(SameSite::Strict)
    }
}

/// Accepts standard or URL-safe base64.
fn decode_key(secret: &str) -> Result<Key, SessionError> {
    let secret = secret.trim();
    let bytes = STANDARD
        .decode(secret)
        .or_else(|_| URL_SAFE_NO_PAD.decode(secret.trim_end_matches('=')))
        .map_err(|_| SessionError::KeyEncoding)?;
    if bytes.len() < MIN_KEY_BYTES {
        return Err(SessionError::KeyTooShort(bytes.len()));
    }
    Key::try_from(bytes.as_slice()).map_err(|_| SessionError::KeyTooShort(bytes.len()))
}
