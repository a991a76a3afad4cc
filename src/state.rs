//! Shared application state.

use std::sync::Arc;

use crate::auth::{FirebaseVerifier, IdentityVerifier};
use crate::config::ServerConfig;
use crate::core::live::base::UpstreamConnector;
use crate::core::live::gemini::GeminiConnector;

/// Application state shared across handlers.
///
/// Collaborators live behind trait objects so tests can substitute stubs
/// for the Firebase verifier and the Gemini connector.
pub struct AppState {
    pub config: ServerConfig,
    pub verifier: Arc<dyn IdentityVerifier>,
    pub connector: Arc<dyn UpstreamConnector>,
}

impl AppState {
    /// Build the production state from configuration.
    pub fn new(config: ServerConfig) -> Arc<Self> {
        let verifier: Arc<dyn IdentityVerifier> = Arc::new(FirebaseVerifier::new(
            config.firebase_project_id.clone().unwrap_or_default(),
        ));
        let connector: Arc<dyn UpstreamConnector> = Arc::new(GeminiConnector::new(
            config.gemini_api_key.clone().unwrap_or_default(),
            config.live_model.clone(),
        ));
        Arc::new(Self {
            config,
            verifier,
            connector,
        })
    }

    /// Build state with explicit collaborators (used by tests).
    pub fn with_collaborators(
        config: ServerConfig,
        verifier: Arc<dyn IdentityVerifier>,
        connector: Arc<dyn UpstreamConnector>,
    ) -> Arc<Self> {
        Arc::new(Self {
            config,
            verifier,
            connector,
        })
    }
}
