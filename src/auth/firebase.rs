//! Firebase ID-token verification.
//!
//! Tokens are RS256-signed by Google's rotating `securetoken` service
//! account keys, published as a JWK set. [`KeyCache`] holds the fetched set
//! with a TTL and refreshes it with a double-checked lock so concurrent
//! sessions trigger at most one fetch; a stale set is reused if a refresh
//! fails. No service-account credentials are required.

use std::collections::HashMap;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use jsonwebtoken::{Algorithm, DecodingKey, Validation, decode, decode_header, errors::ErrorKind};
use serde::Deserialize;
use tokio::sync::{Mutex, RwLock};
use tracing::{info, warn};

use super::{Identity, IdentityVerifier};
use crate::errors::auth_error::{AuthError, AuthResult};

/// Google's JWK set for Firebase ID tokens.
const GOOGLE_JWKS_URL: &str =
    "https://www.googleapis.com/service_accounts/v1/jwk/securetoken@system.gserviceaccount.com";

/// How long a fetched key set stays fresh.
const KEY_CACHE_TTL: Duration = Duration::from_secs(3600);

/// One RSA public key from the JWK set.
#[derive(Debug, Clone, Deserialize)]
pub struct Jwk {
    pub kid: String,
    pub n: String,
    pub e: String,
}

#[derive(Debug, Deserialize)]
struct JwkSet {
    keys: Vec<Jwk>,
}

struct CachedKeys {
    keys: HashMap<String, Jwk>,
    fetched_at: Instant,
}

/// TTL'd cache of Google's public signing keys.
pub struct KeyCache {
    url: String,
    ttl: Duration,
    http: reqwest::Client,
    state: RwLock<Option<CachedKeys>>,
    /// Serializes refreshes; readers never hold this.
    refresh: Mutex<()>,
}

impl KeyCache {
    pub fn new(url: impl Into<String>, ttl: Duration) -> Self {
        Self {
            url: url.into(),
            ttl,
            http: reqwest::Client::new(),
            state: RwLock::new(None),
            refresh: Mutex::new(()),
        }
    }

    /// Get the current key set, refreshing it if the TTL has lapsed.
    ///
    /// On a failed refresh a stale set is returned when one exists.
    pub async fn get(&self) -> AuthResult<HashMap<String, Jwk>> {
        if let Some(cached) = self.state.read().await.as_ref()
            && cached.fetched_at.elapsed() < self.ttl
        {
            return Ok(cached.keys.clone());
        }

        let _guard = self.refresh.lock().await;

        // Another task may have refreshed while we waited for the lock.
        if let Some(cached) = self.state.read().await.as_ref()
            && cached.fetched_at.elapsed() < self.ttl
        {
            return Ok(cached.keys.clone());
        }

        match self.fetch().await {
            Ok(keys) => {
                info!("Refreshed Firebase signing keys ({} keys)", keys.len());
                *self.state.write().await = Some(CachedKeys {
                    keys: keys.clone(),
                    fetched_at: Instant::now(),
                });
                Ok(keys)
            }
            Err(e) => {
                if let Some(cached) = self.state.read().await.as_ref() {
                    warn!("Key refresh failed, reusing stale set: {}", e);
                    return Ok(cached.keys.clone());
                }
                Err(e)
            }
        }
    }

    /// Drop the cached set so the next lookup fetches a fresh one.
    pub async fn invalidate(&self) {
        *self.state.write().await = None;
    }

    async fn fetch(&self) -> AuthResult<HashMap<String, Jwk>> {
        let set: JwkSet = self
            .http
            .get(&self.url)
            .timeout(Duration::from_secs(10))
            .send()
            .await
            .map_err(|e| AuthError::KeyFetch(e.to_string()))?
            .error_for_status()
            .map_err(|e| AuthError::KeyFetch(e.to_string()))?
            .json()
            .await
            .map_err(|e| AuthError::KeyFetch(e.to_string()))?;

        Ok(set.keys.into_iter().map(|k| (k.kid.clone(), k)).collect())
    }
}

#[derive(Debug, Deserialize)]
struct Claims {
    sub: String,
    #[serde(default)]
    email: Option<String>,
}

/// Verifies Firebase ID tokens for one project.
pub struct FirebaseVerifier {
    project_id: String,
    cache: KeyCache,
}

impl FirebaseVerifier {
    pub fn new(project_id: impl Into<String>) -> Self {
        Self {
            project_id: project_id.into(),
            cache: KeyCache::new(GOOGLE_JWKS_URL, KEY_CACHE_TTL),
        }
    }

    /// Override the JWK set endpoint (used by tests).
    pub fn with_jwks_url(project_id: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            project_id: project_id.into(),
            cache: KeyCache::new(url, KEY_CACHE_TTL),
        }
    }

    fn validation(&self) -> Validation {
        let mut validation = Validation::new(Algorithm::RS256);
        validation.set_audience(&[&self.project_id]);
        validation.set_issuer(&[format!(
            "https://securetoken.google.com/{}",
            self.project_id
        )]);
        validation.set_required_spec_claims(&["exp", "iat", "sub"]);
        validation
    }
}

#[async_trait]
impl IdentityVerifier for FirebaseVerifier {
    async fn verify(&self, token: &str) -> AuthResult<Identity> {
        let header =
            decode_header(token).map_err(|e| AuthError::MalformedToken(e.to_string()))?;
        let kid = header.kid.ok_or(AuthError::UnknownKey)?;

        let keys = self.cache.get().await?;
        let jwk = match keys.get(&kid) {
            Some(jwk) => jwk.clone(),
            None => {
                // The signing keys rotate; one forced refresh before giving up.
                self.cache.invalidate().await;
                self.cache
                    .get()
                    .await?
                    .get(&kid)
                    .cloned()
                    .ok_or(AuthError::UnknownKey)?
            }
        };

        let key = DecodingKey::from_rsa_components(&jwk.n, &jwk.e)
            .map_err(|e| AuthError::KeyFetch(format!("unusable signing key: {e}")))?;

        let data = decode::<Claims>(token, &key, &self.validation()).map_err(|e| match e.kind() {
            ErrorKind::ExpiredSignature => AuthError::Expired,
            ErrorKind::InvalidAudience => AuthError::InvalidClaims("audience mismatch".into()),
            ErrorKind::InvalidIssuer => AuthError::InvalidClaims("issuer mismatch".into()),
            _ => AuthError::MalformedToken(e.to_string()),
        })?;

        if data.claims.sub.is_empty() {
            return Err(AuthError::InvalidClaims("missing subject".into()));
        }

        Ok(Identity {
            uid: data.claims.sub,
            email: data.claims.email,
        })
    }
}
