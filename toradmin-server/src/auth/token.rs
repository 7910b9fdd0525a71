//! API token checks for scripted access.

use axum::http::{HeaderMap, header};
use base64::{Engine as _, engine::general_purpose::STANDARD};
use sha2::{Digest, Sha256};

/// Token presented in an `Authorization` header.
///
/// Accepted forms are `Bearer <token>`, `Token <token>` and
/// `Basic base64(<token>:)`, the token standing in for the user name with an
/// empty password.
pub fn presented_token(headers: &HeaderMap) -> Option<String> {
    let value = headers.get(header::AUTHORIZATION)?.to_str().ok()?.trim();

    if let Some(token) = value.strip_prefix("Bearer ") {
        return Some(token.trim().to_string());
    }
    if let Some(token) = value.strip_prefix("Token ") {
        return Some(token.trim().to_string());
    }
    if let Some(encoded) = value.strip_prefix("Basic ") {
        let decoded = STANDARD.decode(encoded.trim()).ok()?;
        let decoded = String::from_utf8(decoded).ok()?;
        return decoded.strip_suffix(':').map(ToString::to_string);
    }
    None
}

/// Compares digests so the running time does not depend on where the tokens differ.
pub fn tokens_match(presented: &str, expected: &str) -> bool {
    !expected.is_empty() && Sha256::digest(presented.as_bytes()) == Sha256::digest(expected.as_bytes())
}
