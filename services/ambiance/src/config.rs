//! Configuration types and loading
//!
//! The file path comes from `--config`, then `CONFIG`, then `config.json`.
//! All settings are read from that JSON file; only `OPENAI_API_KEY` and
//! `SPOTIFY_CLIENT_SECRET` are taken from the environment, overriding the
//! file values so the secrets can stay out of it. Optional fields fall back
//! to defaults.

use common::Secret;
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;

const DEFAULT_CONFIG_PATH: &str = "config.json";
const DEFAULT_TOKEN_PATH: &str = "token.json";
const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 15;

/// Validated runtime configuration
#[derive(Debug)]
pub struct Config {
    pub bridge_ip: String,
    pub username: String,
    pub default_light: String,
    pub openai_api_key: Secret<String>,
    pub openai_model: String,
    pub spotify_client_id: String,
    pub spotify_client_secret: Secret<String>,
    pub spotify_redirect_uri: String,
    pub token_path: PathBuf,
    /// Bound on the browser wait; `None` waits until a callback arrives
    pub callback_timeout: Option<Duration>,
    pub request_timeout: Duration,
}

/// File shape. Required fields are checked after env overrides are applied.
#[derive(Debug, Default, Deserialize)]
struct RawConfig {
    #[serde(default)]
    bridge_ip: String,
    #[serde(default)]
    username: String,
    #[serde(default)]
    default_light: String,
    #[serde(default)]
    openai_api_key: String,
    #[serde(default)]
    openai_model: Option<String>,
    #[serde(default)]
    spotify_client_id: String,
    #[serde(default)]
    spotify_client_secret: String,
    #[serde(default)]
    spotify_redirect_uri: Option<String>,
    #[serde(default)]
    token_path: Option<PathBuf>,
    #[serde(default)]
    callback_timeout_secs: Option<u64>,
    #[serde(default)]
    request_timeout_secs: Option<u64>,
}

impl Config {
    /// Load configuration from a JSON file, then overlay environment variables.
    pub fn load(path: &Path) -> common::Result<Self> {
        let contents = std::fs::read_to_string(path)?;
        let mut raw: RawConfig = serde_json::from_str(&contents)?;

        if let Some(key) = env_non_empty("OPENAI_API_KEY") {
            raw.openai_api_key = key;
        }
        if let Some(secret) = env_non_empty("SPOTIFY_CLIENT_SECRET") {
            raw.spotify_client_secret = secret;
        }

        raw.validate()
    }

    /// Resolve config file path from CLI arg or CONFIG env var.
    pub fn resolve_path(cli_path: Option<&str>) -> PathBuf {
        if let Some(p) = cli_path {
            return PathBuf::from(p);
        }
        if let Some(p) = env_non_empty("CONFIG") {
            return PathBuf::from(p);
        }
        PathBuf::from(DEFAULT_CONFIG_PATH)
    }
}

impl RawConfig {
    fn validate(self) -> common::Result<Config> {
        let missing: Vec<&str> = [
            ("bridge_ip", &self.bridge_ip),
            ("username", &self.username),
            ("default_light", &self.default_light),
            ("openai_api_key", &self.openai_api_key),
            ("spotify_client_id", &self.spotify_client_id),
            ("spotify_client_secret", &self.spotify_client_secret),
        ]
        .into_iter()
        .filter(|(_, value)| value.trim().is_empty())
        .map(|(name, _)| name)
        .collect();
        if !missing.is_empty() {
            return Err(common::Error::Config(format!(
                "config file missing required fields: {}",
                missing.join(", ")
            )));
        }

        if self.callback_timeout_secs == Some(0) {
            return Err(common::Error::Config(
                "callback_timeout_secs must be greater than 0".into(),
            ));
        }
        let request_timeout_secs = self
            .request_timeout_secs
            .unwrap_or(DEFAULT_REQUEST_TIMEOUT_SECS);
        if request_timeout_secs == 0 {
            return Err(common::Error::Config(
                "request_timeout_secs must be greater than 0".into(),
            ));
        }

        let spotify_redirect_uri = self
            .spotify_redirect_uri
            .unwrap_or_else(|| spotify_auth::DEFAULT_REDIRECT_URI.to_string());
        if !spotify_redirect_uri.starts_with("http://") {
            return Err(common::Error::Config(format!(
                "spotify_redirect_uri must be a loopback http:// URL, got: {spotify_redirect_uri}"
            )));
        }

        Ok(Config {
            bridge_ip: self.bridge_ip,
            username: self.username,
            default_light: self.default_light,
            openai_api_key: Secret::new(self.openai_api_key),
            openai_model: self
                .openai_model
                .filter(|m| !m.trim().is_empty())
                .unwrap_or_else(|| intent::DEFAULT_MODEL.to_string()),
            spotify_client_id: self.spotify_client_id,
            spotify_client_secret: Secret::new(self.spotify_client_secret),
            spotify_redirect_uri,
            token_path: self
                .token_path
                .unwrap_or_else(|| PathBuf::from(DEFAULT_TOKEN_PATH)),
            callback_timeout: self.callback_timeout_secs.map(Duration::from_secs),
            request_timeout: Duration::from_secs(request_timeout_secs),
        })
    }
}

fn env_non_empty(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|v| !v.is_empty())
}
