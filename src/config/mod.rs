//! Configuration system (layered: defaults < TOML file < environment).

use std::collections::HashMap;
use std::fmt;
use std::path::{Path, PathBuf};
use std::time::Duration;

use bon::Builder;
use serde::Deserialize;

use crate::conversation::MAX_HISTORY;
use crate::error::{ChatError, Result};

pub const DEFAULT_BIND_ADDR: &str = "127.0.0.1:8787";
pub const DEFAULT_SERVICE_NAME: &str = "walkwithme-api";
pub const DEFAULT_UPSTREAM_BASE_URL: &str = "https://api.openai.com/v1";
pub const DEFAULT_MODEL: &str = "gpt-5-mini";
pub const DEFAULT_ENDPOINT: &str = "http://127.0.0.1:8787/";
pub const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// Origins allowed to call the relay out of the box.
///
/// `"null"` is what browsers send for pages opened from `file://`; drop it
/// from production deployments.
pub const DEFAULT_ALLOWED_ORIGINS: [&str; 4] = [
    "https://walkwithme.kr",
    "https://walkwithme.archerlab.dev",
    "http://localhost:3000",
    "null",
];

/// Relay service configuration.
#[derive(Clone, Deserialize)]
#[serde(default)]
pub struct RelayConfig {
    pub bind_addr: String,
    pub service_name: String,
    pub upstream_base_url: String,
    pub api_key: Option<String>,
    pub allowed_origins: Vec<String>,
    pub default_model: String,
}

impl fmt::Debug for RelayConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RelayConfig")
            .field("bind_addr", &self.bind_addr)
            .field("service_name", &self.service_name)
            .field("upstream_base_url", &self.upstream_base_url)
            .field("api_key", &self.api_key.as_ref().map(|_| ".."))
            .field("allowed_origins", &self.allowed_origins)
            .field("default_model", &self.default_model)
            .finish()
    }
}

impl Default for RelayConfig {
    fn default() -> Self {
        Self {
            bind_addr: DEFAULT_BIND_ADDR.to_string(),
            service_name: DEFAULT_SERVICE_NAME.to_string(),
            upstream_base_url: DEFAULT_UPSTREAM_BASE_URL.to_string(),
            api_key: None,
            allowed_origins: DEFAULT_ALLOWED_ORIGINS
                .iter()
                .map(|o| o.to_string())
                .collect(),
            default_model: DEFAULT_MODEL.to_string(),
        }
    }
}

impl RelayConfig {
    /// Defaults overlaid with environment variables (`.env` is loaded first).
    pub fn from_env() -> Self {
        let _ = dotenvy::dotenv(); // load .env if present, ignore error
        let mut config = Self::default();
        config.apply_env_with(|key| std::env::var(key).ok());
        config
    }

    /// Overlay values from an environment-like lookup.
    pub fn apply_env_with(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(key) = lookup("OPENAI_API_KEY") {
            self.api_key = Some(key);
        }
        if let Some(url) = lookup("OPENAI_BASE_URL") {
            self.upstream_base_url = url;
        }
        if let Some(addr) = lookup("WALKWITHME_BIND") {
            self.bind_addr = addr;
        }
        if let Some(name) = lookup("WALKWITHME_SERVICE_NAME") {
            self.service_name = name;
        }
        if let Some(model) = lookup("WALKWITHME_DEFAULT_MODEL") {
            self.default_model = model;
        }
        if let Some(origins) = lookup("WALKWITHME_ALLOWED_ORIGINS") {
            self.allowed_origins = split_list(&origins);
        }
    }

    /// The upstream key, treating an empty string as absent.
    pub fn api_key(&self) -> Option<&str> {
        self.api_key.as_deref().filter(|k| !k.trim().is_empty())
    }

    pub fn set_api_key(&mut self, key: impl Into<String>) {
        self.api_key = Some(key.into());
    }

    /// Full URL of the upstream chat-completion endpoint.
    pub fn completions_url(&self) -> String {
        format!(
            "{}/chat/completions",
            self.upstream_base_url.trim_end_matches('/')
        )
    }
}

/// Conversation client configuration.
///
/// ```
/// use walkwithme::config::ClientConfig;
///
/// let config = ClientConfig::builder()
///     .endpoint("http://localhost:8787/")
///     .max_history(6)
///     .build();
/// assert_eq!(config.timeout().as_secs(), 30);
/// ```
#[derive(Debug, Clone, Builder, Deserialize)]
#[serde(default)]
pub struct ClientConfig {
    #[builder(into, default = DEFAULT_ENDPOINT.to_string())]
    pub endpoint: String,
    #[builder(default = DEFAULT_TIMEOUT_SECS)]
    pub timeout_secs: u64,
    #[builder(default = MAX_HISTORY)]
    pub max_history: usize,
    #[builder(into)]
    pub model: Option<String>,
    #[builder(into)]
    pub snapshot_path: Option<PathBuf>,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self::builder().build()
    }
}

impl ClientConfig {
    /// Defaults overlaid with environment variables (`.env` is loaded first).
    pub fn from_env() -> Result<Self> {
        let _ = dotenvy::dotenv();
        let mut config = Self::default();
        config.apply_env_with(|key| std::env::var(key).ok())?;
        Ok(config)
    }

    /// Overlay values from an environment-like lookup.
    pub fn apply_env_with(&mut self, lookup: impl Fn(&str) -> Option<String>) -> Result<()> {
        if let Some(endpoint) = lookup("WALKWITHME_ENDPOINT") {
            self.endpoint = endpoint;
        }
        if let Some(secs) = lookup("WALKWITHME_TIMEOUT_SECS") {
            self.timeout_secs = parse_number("WALKWITHME_TIMEOUT_SECS", &secs)?;
        }
        if let Some(pairs) = lookup("WALKWITHME_MAX_HISTORY") {
            self.max_history = parse_number("WALKWITHME_MAX_HISTORY", &pairs)?;
        }
        if let Some(model) = lookup("WALKWITHME_MODEL") {
            self.model = Some(model);
        }
        if let Some(path) = lookup("WALKWITHME_SNAPSHOT") {
            self.snapshot_path = Some(PathBuf::from(path));
        }
        Ok(())
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    /// Where the conversation snapshot lives, falling back to the user's
    /// data directory.
    pub fn resolved_snapshot_path(&self) -> PathBuf {
        self.snapshot_path
            .clone()
            .unwrap_or_else(default_snapshot_path)
    }
}

/// Both halves of the configuration as read from one TOML file.
///
/// ```toml
/// [relay]
/// bind_addr = "0.0.0.0:8787"
/// allowed_origins = ["https://walkwithme.kr"]
///
/// [client]
/// endpoint = "https://walkwithme-api.example.dev/"
/// max_history = 8
/// ```
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub relay: RelayConfig,
    pub client: ClientConfig,
}

impl Settings {
    pub fn from_toml_str(raw: &str) -> Result<Self> {
        toml::from_str(raw).map_err(|e| ChatError::Configuration(e.to_string()))
    }

    /// Read a TOML file, then overlay the process environment.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let _ = dotenvy::dotenv();
        let mut settings = match path {
            Some(path) => {
                let raw = std::fs::read_to_string(path).map_err(|e| {
                    ChatError::Configuration(format!("cannot read {}: {e}", path.display()))
                })?;
                Self::from_toml_str(&raw)?
            }
            None => Self::default(),
        };
        let env: HashMap<String, String> = std::env::vars().collect();
        settings.apply_env(&env)?;
        Ok(settings)
    }

    pub fn apply_env(&mut self, env: &HashMap<String, String>) -> Result<()> {
        self.relay.apply_env_with(|key| env.get(key).cloned());
        self.client.apply_env_with(|key| env.get(key).cloned())
    }
}

fn default_snapshot_path() -> PathBuf {
    directories::ProjectDirs::from("kr", "walkwithme", "walkwithme")
        .map(|dirs| dirs.data_dir().join("conversation.json"))
        .unwrap_or_else(|| PathBuf::from(".walkwithme").join("conversation.json"))
}

fn split_list(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

fn parse_number<T: std::str::FromStr>(key: &str, raw: &str) -> Result<T> {
    raw.trim()
        .parse()
        .map_err(|_| ChatError::Configuration(format!("{key} must be a number, got '{raw}'")))
}
