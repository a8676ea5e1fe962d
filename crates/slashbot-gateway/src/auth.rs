//! Bearer-token authentication.
//!
//! The configured token is hashed once at startup; requests are checked
//! by hashing the presented token to a fixed-length digest and comparing
//! in constant time, so neither the token value nor its length leaks.

use axum::http::HeaderMap;
use sha2::{Digest, Sha256};
use subtle::ConstantTimeEq;

/// Cached digest of the configured gateway token.
#[derive(Clone)]
pub(crate) struct TokenGuard {
    expected: Option<[u8; 32]>,
}

impl TokenGuard {
    /// Build a guard. With no configured token every authenticated
    /// request is rejected — the gateway never runs open.
    pub(crate) fn new(token: Option<&str>) -> Self {
        let expected = token
            .filter(|t| !t.is_empty())
            .map(|t| Sha256::digest(t.as_bytes()).into());
        Self { expected }
    }

    /// Check the `Authorization: Bearer <token>` header.
    pub(crate) fn check(&self, headers: &HeaderMap) -> bool {
        let Some(expected) = &self.expected else {
            return false;
        };
        let provided = headers
            .get("authorization")
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.strip_prefix("Bearer "))
            .unwrap_or("");
        let provided_hash: [u8; 32] = Sha256::digest(provided.as_bytes()).into();
        bool::from(provided_hash.as_slice().ct_eq(expected.as_slice()))
    }
}

impl std::fmt::Debug for TokenGuard {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenGuard")
            .field("has_token", &self.expected.is_some())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    fn headers(value: Option<&str>) -> HeaderMap {
        let mut headers = HeaderMap::new();
        if let Some(value) = value {
            headers.insert("authorization", HeaderValue::from_str(value).unwrap());
        }
        headers
    }

    #[test]
    fn accepts_the_right_token_only() {
        let guard = TokenGuard::new(Some("secret"));
        assert!(guard.check(&headers(Some("Bearer secret"))));
        assert!(!guard.check(&headers(Some("Bearer wrong"))));
        assert!(!guard.check(&headers(Some("secret"))));
        assert!(!guard.check(&headers(None)));
    }

    #[test]
    fn no_configured_token_rejects_everything() {
        let guard = TokenGuard::new(None);
        assert!(!guard.check(&headers(Some("Bearer anything"))));
        let guard = TokenGuard::new(Some(""));
        assert!(!guard.check(&headers(Some("Bearer "))));
    }
}
