//! Bearer session tokens.
//!
//! Tokens are random and shown once when issued; only their SHA-256 hash is
//! stored. A request authenticates with `Authorization: Bearer <token>`.

use axum::extract::FromRequestParts;
use axum::http::header::AUTHORIZATION;
use axum::http::request::Parts;
use sha2::{Digest, Sha256};

use super::error::ApiError;
use super::AppState;
use crate::error::{Error, Result};
use crate::storage::SqliteStorage;

/// Session lifetime.
pub const SESSION_TTL_DAYS: i64 = 30;

const TOKEN_PREFIX: &str = "vt_";

/// Hex SHA-256 of a token.
#[must_use]
pub fn hash_token(token: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(token.as_bytes());
    format!("{:x}", hasher.finalize())
}

/// A new random token.
#[must_use]
pub fn generate_token() -> String {
    format!(
        "{TOKEN_PREFIX}{}{}",
        uuid::Uuid::new_v4().simple(),
        uuid::Uuid::new_v4().simple()
    )
}

/// Issue a session for `email`, returning the plaintext token.
///
/// # Errors
///
/// Returns an error if the user doesn't exist or the insert fails.
pub fn issue_session(storage: &mut SqliteStorage, email: &str, actor: &str) -> Result<String> {
    let token = generate_token();
    let expires_at =
        (chrono::Utc::now() + chrono::Duration::days(SESSION_TTL_DAYS)).timestamp_millis();
    storage.create_user_session(email, &hash_token(&token), expires_at, actor)?;
    tracing::info!(email, "issued session token");
    Ok(token)
}

/// Pull the token out of an `Authorization: Bearer` header value.
fn bearer_token(header: &str) -> Option<&str> {
    let (scheme, token) = header.split_once(' ')?;
    let token = token.trim();
    (scheme.eq_ignore_ascii_case("bearer") && !token.is_empty()).then_some(token)
}

/// Email of the user owning a valid session.
#[derive(Debug, Clone)]
pub struct AuthUser(pub String);

impl FromRequestParts<AppState> for AuthUser {
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> std::result::Result<Self, Self::Rejection> {
        let token = parts
            .headers
            .get(AUTHORIZATION)
            .and_then(|v| v.to_str().ok())
            .and_then(bearer_token)
            .ok_or(Error::Unauthorized)?;

        let hash = hash_token(token);
        let now = chrono::Utc::now().timestamp_millis();
        let email = {
            let storage = state.storage()?;
            storage.session_user(&hash, now)?
        };

        email.map(AuthUser).ok_or_else(|| Error::Unauthorized.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::User;

    #[test]
    fn test_bearer_token() {
        assert_eq!(bearer_token("Bearer abc"), Some("abc"));
        assert_eq!(bearer_token("bearer  abc "), Some("abc"));
        assert_eq!(bearer_token("Basic abc"), None);
        assert_eq!(bearer_token("Bearer "), None);
        assert_eq!(bearer_token("abc"), None);
    }

    #[test]
    fn test_tokens_are_unique_and_hashed() {
        let a = generate_token();
        let b = generate_token();
        assert_ne!(a, b);
        assert!(a.starts_with(TOKEN_PREFIX));
        assert_eq!(hash_token(&a).len(), 64);
        assert_eq!(hash_token(&a), hash_token(&a));
    }

    #[test]
    fn test_issue_session_resolves() {
        let mut storage = SqliteStorage::open_memory().unwrap();
        storage.create_user(&User::new("ana@acme.io"), "ana@acme.io").unwrap();

        let token = issue_session(&mut storage, "ana@acme.io", "ana@acme.io").unwrap();
        let now = chrono::Utc::now().timestamp_millis();
        assert_eq!(
            storage.session_user(&hash_token(&token), now).unwrap().as_deref(),
            Some("ana@acme.io")
        );
        assert!(storage.session_user(&hash_token("vt_other"), now).unwrap().is_none());

        assert!(issue_session(&mut storage, "ghost@acme.io", "ana@acme.io").is_err());
    }
}
