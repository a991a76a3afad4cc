//! Configuration module for the CookAI gateway.
//!
//! Configuration comes from environment variables (a `.env` file is loaded
//! in `main` before anything reads the environment) with an optional YAML
//! file on top. Priority: YAML > environment > defaults.

use std::env;
use std::path::Path;
use std::str::FromStr;
use std::time::Duration;

use serde::Deserialize;
use thiserror::Error;

/// Default Gemini Live model.
const DEFAULT_LIVE_MODEL: &str = "gemini-2.5-flash-native-audio-preview-12-2025";

/// Errors raised while loading or validating configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Invalid configuration: {0}")]
    Invalid(String),

    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse config file: {0}")]
    Yaml(#[from] serde_yaml::Error),
}

/// Server configuration
///
/// Contains all configuration needed to run the gateway: bind address,
/// upstream Gemini settings, session limits, and authentication settings.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    // Server settings
    pub host: String,
    pub port: u16,

    // Upstream Gemini settings
    pub gemini_api_key: Option<String>,
    pub live_model: String,
    /// Sample rate of client input audio (Hz).
    pub input_sample_rate: u32,

    // Session limits
    /// Wall-clock budget for one session's Active phase.
    pub session_time_limit: Duration,
    /// How long the gate waits for the client's setup frame.
    pub setup_timeout: Duration,

    // Authentication
    pub auth_required: bool,
    pub firebase_project_id: Option<String>,

    // Security
    pub cors_allowed_origins: Option<String>,
}

/// YAML overlay; every field optional.
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct YamlConfig {
    host: Option<String>,
    port: Option<u16>,
    gemini_api_key: Option<String>,
    live_model: Option<String>,
    input_sample_rate: Option<u32>,
    /// Seconds.
    session_time_limit: Option<u64>,
    /// Seconds.
    setup_timeout: Option<u64>,
    auth_required: Option<bool>,
    firebase_project_id: Option<String>,
    cors_allowed_origins: Option<String>,
}

impl ServerConfig {
    /// Load configuration from environment variables only.
    pub fn from_env() -> Result<Self, ConfigError> {
        let config = Self::from_env_unvalidated()?;
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from a YAML file with environment variables as
    /// the fallback layer.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let yaml: YamlConfig = serde_yaml::from_str(&std::fs::read_to_string(path)?)?;
        let mut config = Self::from_env_unvalidated()?;
        config.apply_yaml(yaml);
        config.validate()?;
        Ok(config)
    }

    fn from_env_unvalidated() -> Result<Self, ConfigError> {
        Ok(Self {
            host: env_or("HOST", "0.0.0.0".to_string())?,
            port: env_or("PORT", 8080)?,
            gemini_api_key: env::var("GEMINI_API_KEY").ok().filter(|v| !v.is_empty()),
            live_model: env_or("LIVE_MODEL", DEFAULT_LIVE_MODEL.to_string())?,
            input_sample_rate: env_or("INPUT_SAMPLE_RATE", 16_000)?,
            session_time_limit: Duration::from_secs(env_or("SESSION_TIME_LIMIT", 600)?),
            setup_timeout: Duration::from_secs(env_or("SETUP_TIMEOUT", 15)?),
            auth_required: env_or("AUTH_REQUIRED", true)?,
            firebase_project_id: env::var("FIREBASE_PROJECT_ID")
                .ok()
                .filter(|v| !v.is_empty()),
            cors_allowed_origins: env::var("CORS_ALLOWED_ORIGINS").ok(),
        })
    }

    fn apply_yaml(&mut self, yaml: YamlConfig) {
        if let Some(host) = yaml.host {
            self.host = host;
        }
        if let Some(port) = yaml.port {
            self.port = port;
        }
        if let Some(key) = yaml.gemini_api_key {
            self.gemini_api_key = Some(key);
        }
        if let Some(model) = yaml.live_model {
            self.live_model = model;
        }
        if let Some(rate) = yaml.input_sample_rate {
            self.input_sample_rate = rate;
        }
        if let Some(secs) = yaml.session_time_limit {
            self.session_time_limit = Duration::from_secs(secs);
        }
        if let Some(secs) = yaml.setup_timeout {
            self.setup_timeout = Duration::from_secs(secs);
        }
        if let Some(required) = yaml.auth_required {
            self.auth_required = required;
        }
        if let Some(project) = yaml.firebase_project_id {
            self.firebase_project_id = Some(project);
        }
        if let Some(origins) = yaml.cors_allowed_origins {
            self.cors_allowed_origins = Some(origins);
        }
    }

    /// Check cross-field consistency.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.gemini_api_key.is_none() {
            return Err(ConfigError::Invalid(
                "GEMINI_API_KEY is not set; the gateway cannot reach the Live API".into(),
            ));
        }
        if self.auth_required && self.firebase_project_id.is_none() {
            return Err(ConfigError::Invalid(
                "AUTH_REQUIRED is set but FIREBASE_PROJECT_ID is missing".into(),
            ));
        }
        if self.input_sample_rate == 0 {
            return Err(ConfigError::Invalid(
                "INPUT_SAMPLE_RATE must be positive".into(),
            ));
        }
        Ok(())
    }

    /// Socket address string for binding.
    pub fn address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

fn env_or<T>(key: &str, default: T) -> Result<T, ConfigError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match env::var(key) {
        Ok(value) if !value.is_empty() => value
            .parse()
            .map_err(|e| ConfigError::Invalid(format!("{key}: {e}"))),
        _ => Ok(default),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn base_config() -> ServerConfig {
        ServerConfig {
            host: "127.0.0.1".to_string(),
            port: 0,
            gemini_api_key: Some("test-key".to_string()),
            live_model: DEFAULT_LIVE_MODEL.to_string(),
            input_sample_rate: 16_000,
            session_time_limit: Duration::from_secs(600),
            setup_timeout: Duration::from_secs(15),
            auth_required: false,
            firebase_project_id: None,
            cors_allowed_origins: None,
        }
    }

    #[test]
    fn yaml_overrides_take_priority() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(
            file,
            "gemini_api_key: yaml-key\nsession_time_limit: 42\nauth_required: false\nhost: 127.0.0.1"
        )
        .unwrap();

        let config = ServerConfig::from_file(file.path()).unwrap();
        assert_eq!(config.gemini_api_key.as_deref(), Some("yaml-key"));
        assert_eq!(config.session_time_limit, Duration::from_secs(42));
        assert!(!config.auth_required);
        assert_eq!(config.host, "127.0.0.1");
    }

    #[test]
    fn unknown_yaml_keys_are_rejected() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "gemini_api_keyy: oops").unwrap();
        assert!(ServerConfig::from_file(file.path()).is_err());
    }

    #[test]
    fn missing_api_key_fails_validation() {
        let mut config = base_config();
        config.gemini_api_key = None;
        assert!(config.validate().is_err());
    }

    #[test]
    fn auth_without_project_fails_validation() {
        let mut config = base_config();
        config.auth_required = true;
        assert!(config.validate().is_err());
        config.firebase_project_id = Some("demo-project".to_string());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn address_joins_host_and_port() {
        let mut config = base_config();
        config.port = 9000;
        assert_eq!(config.address(), "127.0.0.1:9000");
    }
}
