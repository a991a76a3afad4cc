//! Client identity verification.
//!
//! The connection gate consumes identity through the [`IdentityVerifier`]
//! trait; [`firebase::FirebaseVerifier`] is the production implementation.

pub mod firebase;

use async_trait::async_trait;
use axum::http::HeaderMap;

use crate::errors::auth_error::{AuthError, AuthResult};

pub use firebase::{FirebaseVerifier, KeyCache};

/// Verified client identity.
#[derive(Debug, Clone)]
pub struct Identity {
    /// Stable user id (the token subject).
    pub uid: String,
    pub email: Option<String>,
}

/// Verifies an identity token into an [`Identity`].
#[async_trait]
pub trait IdentityVerifier: Send + Sync {
    async fn verify(&self, token: &str) -> AuthResult<Identity>;
}

/// Extract the identity token from a WebSocket upgrade request.
///
/// Browser WebSocket clients cannot set request headers, so the `?token=`
/// query parameter is checked first, then the `Authorization: Bearer`
/// header.
pub fn extract_token(query: Option<&str>, headers: &HeaderMap) -> AuthResult<String> {
    if let Some(query) = query {
        for (key, value) in url::form_urlencoded::parse(query.as_bytes()) {
            if key == "token" && !value.is_empty() {
                return Ok(value.into_owned());
            }
        }
    }

    if let Some(auth_header) = headers.get("authorization") {
        let auth_str = auth_header
            .to_str()
            .map_err(|_| AuthError::MalformedToken("non-ASCII authorization header".into()))?;
        if let Some(token) = auth_str.strip_prefix("Bearer ") {
            return Ok(token.to_string());
        }
    }

    Err(AuthError::MissingToken)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn query_param_wins_over_header() {
        let mut headers = HeaderMap::new();
        headers.insert("authorization", "Bearer header-token".parse().unwrap());
        let token = extract_token(Some("a=1&token=query-token"), &headers).unwrap();
        assert_eq!(token, "query-token");
    }

    #[test]
    fn bearer_header_is_a_fallback() {
        let mut headers = HeaderMap::new();
        headers.insert("authorization", "Bearer header-token".parse().unwrap());
        let token = extract_token(Some("a=1"), &headers).unwrap();
        assert_eq!(token, "header-token");
    }

    #[test]
    fn missing_token_is_an_error() {
        let headers = HeaderMap::new();
        assert!(matches!(
            extract_token(None, &headers),
            Err(AuthError::MissingToken)
        ));
    }
}
