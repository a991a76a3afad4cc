//! Authentication error types.

use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde_json::json;
use thiserror::Error;

/// Errors produced while verifying a client identity token.
#[derive(Debug, Error)]
pub enum AuthError {
    /// No token was supplied on the request
    #[error("Missing auth token")]
    MissingToken,

    /// The token could not be decoded at all
    #[error("Malformed token: {0}")]
    MalformedToken(String),

    /// The token is signed with a key we do not know
    #[error("Token signed with unknown key")]
    UnknownKey,

    /// The token has expired
    #[error("Token has expired")]
    Expired,

    /// A standard claim (iss/aud/sub) did not match
    #[error("Invalid token claims: {0}")]
    InvalidClaims(String),

    /// The signing keys could not be fetched
    #[error("Failed to fetch signing keys: {0}")]
    KeyFetch(String),
}

/// Result type for authentication operations.
pub type AuthResult<T> = Result<T, AuthError>;

impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        let status = match self {
            AuthError::KeyFetch(_) => StatusCode::SERVICE_UNAVAILABLE,
            _ => StatusCode::UNAUTHORIZED,
        };
        (status, Json(json!({"error": self.to_string()}))).into_response()
    }
}
