//! Configuration for the hearth bridge.
//!
//! TOML file + environment layering, credential resolution (env var →
//! keyring → plaintext), and translation to `hearth_core::BridgeConfig`.
//! The binary adds CLI-flag overrides on top.

use std::path::{Path, PathBuf};
use std::time::Duration;

use directories::ProjectDirs;
use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use secrecy::SecretString;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use hearth_core::config::{DEFAULT_BASE_TOPIC, DEFAULT_DISCOVERY_PREFIX, DEFAULT_NODE_ID};
use hearth_core::{BridgeConfig, SessionStore, TlsVerification, TopicConfig};

/// Keyring service name for stored secrets.
pub const KEYRING_SERVICE: &str = "hearth";
/// Environment prefix; nested keys use `__` (e.g. `HEARTH_API__API_KEY`).
pub const ENV_PREFIX: &str = "HEARTH_";

const DEFAULT_BASE_URL: &str = "https://api.appliance-cloud.example/api/v1";

// ── Error ───────────────────────────────────────────────────────────

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid {field}: {reason}")]
    Validation { field: String, reason: String },

    #[error("no {what} configured")]
    MissingCredential { what: &'static str },

    #[error("failed to serialize config: {0}")]
    Serialization(#[from] toml::ser::Error),

    #[error("config loading failed: {0}")]
    Figment(Box<figment::Error>),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<figment::Error> for ConfigError {
    fn from(err: figment::Error) -> Self {
        Self::Figment(Box::new(err))
    }
}

// ── TOML config structs ─────────────────────────────────────────────

/// Top-level TOML configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
pub struct Config {
    #[serde(default)]
    pub api: ApiSection,
    #[serde(default)]
    pub bus: BusSection,
    #[serde(default)]
    pub polling: PollingSection,
    #[serde(default)]
    pub state: StateSection,
}

/// `[api]`: appliance cloud endpoint and credentials.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct ApiSection {
    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// API key (plaintext; prefer keyring or env var).
    pub api_key: Option<String>,

    /// Environment variable name containing the API key.
    pub api_key_env: Option<String>,

    /// Initial refresh token (plaintext; prefer keyring or env var).
    /// Only used when the session state file holds none.
    pub refresh_token: Option<String>,

    /// Environment variable name containing the initial refresh token.
    pub refresh_token_env: Option<String>,

    /// Path to an additional CA certificate.
    pub ca_cert: Option<PathBuf>,

    #[serde(default = "default_timeout")]
    pub timeout_secs: u64,
}

impl Default for ApiSection {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            api_key: None,
            api_key_env: None,
            refresh_token: None,
            refresh_token_env: None,
            ca_cert: None,
            timeout_secs: default_timeout(),
        }
    }
}

/// `[bus]`: topic layout.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct BusSection {
    #[serde(default = "default_base_topic")]
    pub base_topic: String,
    #[serde(default = "default_discovery_prefix")]
    pub discovery_prefix: String,
    #[serde(default = "default_true")]
    pub discovery_enabled: bool,
    #[serde(default = "default_node_id")]
    pub node_id: String,
}

impl Default for BusSection {
    fn default() -> Self {
        Self {
            base_topic: default_base_topic(),
            discovery_prefix: default_discovery_prefix(),
            discovery_enabled: true,
            node_id: default_node_id(),
        }
    }
}

/// `[polling]`
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct PollingSection {
    #[serde(default = "default_interval")]
    pub interval_secs: u64,
}

impl Default for PollingSection {
    fn default() -> Self {
        Self {
            interval_secs: default_interval(),
        }
    }
}

/// `[state]`
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
pub struct StateSection {
    /// Session state file. Defaults to `<data dir>/session.json`.
    pub path: Option<PathBuf>,
}

fn default_base_url() -> String {
    DEFAULT_BASE_URL.into()
}
fn default_timeout() -> u64 {
    30
}
fn default_base_topic() -> String {
    DEFAULT_BASE_TOPIC.into()
}
fn default_discovery_prefix() -> String {
    DEFAULT_DISCOVERY_PREFIX.into()
}
fn default_node_id() -> String {
    DEFAULT_NODE_ID.into()
}
fn default_true() -> bool {
    true
}
fn default_interval() -> u64 {
    60
}

impl Config {
    /// Copy with every plaintext secret replaced by a marker.
    pub fn redacted(&self) -> Self {
        let mut copy = self.clone();
        let mask = |s: &mut Option<String>| {
            if s.is_some() {
                *s = Some("<redacted>".into());
            }
        };
        mask(&mut copy.api.api_key);
        mask(&mut copy.api.refresh_token);
        copy
    }

    /// Pretty TOML with secrets redacted.
    pub fn to_redacted_toml(&self) -> Result<String, ConfigError> {
        Ok(toml::to_string_pretty(&self.redacted())?)
    }
}

// ── Paths ───────────────────────────────────────────────────────────

fn project_dirs() -> Option<ProjectDirs> {
    ProjectDirs::from("dev", "hearth", "hearth")
}

/// Resolve the config file path via XDG / platform conventions.
pub fn config_path() -> PathBuf {
    project_dirs().map_or_else(
        || home_fallback(".config").join("config.toml"),
        |dirs| dirs.config_dir().join("config.toml"),
    )
}

/// Default session state file.
pub fn default_state_path() -> PathBuf {
    project_dirs().map_or_else(
        || home_fallback(".local/share").join("session.json"),
        |dirs| dirs.data_dir().join("session.json"),
    )
}

fn home_fallback(sub: &str) -> PathBuf {
    let mut p = PathBuf::from(std::env::var("HOME").unwrap_or_else(|_| ".".into()));
    p.push(sub);
    p.push("hearth");
    p
}

// ── Loading ─────────────────────────────────────────────────────────

/// Layered figment: defaults → TOML file → `HEARTH_` environment.
pub fn figment(path: &Path) -> Figment {
    Figment::new()
        .merge(Serialized::defaults(Config::default()))
        .merge(Toml::file(path))
        .merge(Env::prefixed(ENV_PREFIX).split("__"))
}

/// Load the config from `path` (or the platform default) plus environment.
///
/// A missing file is not an error; defaults and environment still apply.
pub fn load_config(path: Option<&Path>) -> Result<Config, ConfigError> {
    let path = path.map_or_else(config_path, Path::to_path_buf);
    Ok(figment(&path).extract()?)
}

// ── Credential resolution ───────────────────────────────────────────

fn keyring_secret(account: &str) -> Option<SecretString> {
    let entry = keyring::Entry::new(KEYRING_SERVICE, account).ok()?;
    entry.get_password().ok().map(SecretString::from)
}

fn env_secret(var: Option<&String>) -> Option<SecretString> {
    var.and_then(|name| std::env::var(name).ok())
        .filter(|v| !v.is_empty())
        .map(SecretString::from)
}

/// API key: `api_key_env` → keyring → plaintext.
pub fn resolve_api_key(api: &ApiSection) -> Result<SecretString, ConfigError> {
    // 1. Named env var
    if let Some(secret) = env_secret(api.api_key_env.as_ref()) {
        return Ok(secret);
    }

    // 2. System keyring
    if let Some(secret) = keyring_secret("api-key") {
        return Ok(secret);
    }

    // 3. Plaintext in config
    api.api_key
        .as_ref()
        .filter(|k| !k.is_empty())
        .map(|k| SecretString::from(k.clone()))
        .ok_or(ConfigError::MissingCredential { what: "API key" })
}

/// Initial refresh token: `refresh_token_env` → keyring → plaintext.
///
/// Optional: a persisted session may already carry one.
pub fn resolve_refresh_token(api: &ApiSection) -> Option<SecretString> {
    env_secret(api.refresh_token_env.as_ref())
        .or_else(|| keyring_secret("refresh-token"))
        .or_else(|| {
            api.refresh_token
                .as_ref()
                .filter(|t| !t.is_empty())
                .map(|t| SecretString::from(t.clone()))
        })
}

// ── Translation ─────────────────────────────────────────────────────

fn validate_topic_level(field: &str, value: &str) -> Result<(), ConfigError> {
    if value.trim().is_empty() {
        return Err(ConfigError::Validation {
            field: field.into(),
            reason: "must not be empty".into(),
        });
    }
    if value.contains(['+', '#']) {
        return Err(ConfigError::Validation {
            field: field.into(),
            reason: format!("'{value}' contains a topic wildcard"),
        });
    }
    Ok(())
}

/// Build the runtime config, resolving secrets.
pub fn to_bridge_config(cfg: &Config) -> Result<BridgeConfig, ConfigError> {
    let api_url: url::Url = cfg
        .api
        .base_url
        .parse()
        .map_err(|_| ConfigError::Validation {
            field: "api.base_url".into(),
            reason: format!("invalid URL: {}", cfg.api.base_url),
        })?;
    if !matches!(api_url.scheme(), "http" | "https") {
        return Err(ConfigError::Validation {
            field: "api.base_url".into(),
            reason: format!("unsupported scheme '{}'", api_url.scheme()),
        });
    }

    validate_topic_level("bus.base_topic", &cfg.bus.base_topic)?;
    validate_topic_level("bus.discovery_prefix", &cfg.bus.discovery_prefix)?;
    validate_topic_level("bus.node_id", &cfg.bus.node_id)?;

    if cfg.api.timeout_secs == 0 {
        return Err(ConfigError::Validation {
            field: "api.timeout_secs".into(),
            reason: "must be greater than zero".into(),
        });
    }

    let api_key = resolve_api_key(&cfg.api)?;
    let initial_refresh_token = resolve_refresh_token(&cfg.api);

    let tls = cfg
        .api
        .ca_cert
        .clone()
        .map_or(TlsVerification::SystemDefaults, TlsVerification::CustomCa);

    Ok(BridgeConfig {
        api_url,
        api_key,
        initial_refresh_token,
        tls,
        timeout: Duration::from_secs(cfg.api.timeout_secs),
        poll_interval: Duration::from_secs(cfg.polling.interval_secs),
        topics: TopicConfig {
            base_topic: cfg.bus.base_topic.trim_end_matches('/').to_owned(),
            discovery_prefix: cfg.bus.discovery_prefix.trim_end_matches('/').to_owned(),
            node_id: cfg.bus.node_id.clone(),
        },
        discovery_enabled: cfg.bus.discovery_enabled,
        state_path: cfg.state.path.clone().unwrap_or_else(default_state_path),
    })
}

/// Fail unless a refresh token is available from configuration or the
/// session state file.
pub fn require_refresh_token(bridge: &BridgeConfig) -> Result<(), ConfigError> {
    if bridge.initial_refresh_token.is_some() {
        return Ok(());
    }
    match SessionStore::new(&bridge.state_path).load() {
        Ok(Some(session)) if !session.refresh_token.is_empty() => Ok(()),
        _ => Err(ConfigError::MissingCredential {
            what: "refresh token (set api.refresh_token or provide a session state file)",
        }),
    }
}
