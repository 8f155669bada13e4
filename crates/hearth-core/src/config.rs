// ── Runtime bridge configuration ──
//
// These types describe how the bridge talks to the appliance cloud and
// which bus topics it writes. They carry credential data and polling
// tuning, but never touch disk. The binary builds a `BridgeConfig` from
// hearth-config and hands it in.

use std::path::PathBuf;
use std::time::Duration;

use secrecy::SecretString;
use tracing::warn;
use url::Url;

/// Smallest poll interval honoured. Shorter values fall back to the default.
pub const MIN_POLL_INTERVAL: Duration = Duration::from_secs(10);
/// Poll interval used when none (or an invalid one) is configured.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(60);

pub const DEFAULT_BASE_TOPIC: &str = "hearth";
pub const DEFAULT_DISCOVERY_PREFIX: &str = "homeassistant";
pub const DEFAULT_NODE_ID: &str = "hearth_bridge";

/// TLS verification strategy.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum TlsVerification {
    /// System CA store.
    #[default]
    SystemDefaults,
    /// Custom CA certificate file.
    CustomCa(PathBuf),
}

/// Everything the bridge needs at runtime.
#[derive(Debug, Clone)]
pub struct BridgeConfig {
    /// Base URL of the appliance cloud API, e.g. `https://host/api/v1`.
    pub api_url: Url,
    pub api_key: SecretString,
    /// Refresh token from configuration. A persisted token wins over this.
    pub initial_refresh_token: Option<SecretString>,
    pub tls: TlsVerification,
    /// Per-request timeout.
    pub timeout: Duration,
    pub poll_interval: Duration,
    pub topics: TopicConfig,
    pub discovery_enabled: bool,
    /// Session state file.
    pub state_path: PathBuf,
}

impl BridgeConfig {
    /// Poll interval with the floor applied.
    pub fn effective_interval(&self) -> Duration {
        effective_interval(self.poll_interval)
    }
}

/// Clamp a requested poll interval: anything below [`MIN_POLL_INTERVAL`]
/// is replaced by [`DEFAULT_POLL_INTERVAL`].
pub fn effective_interval(requested: Duration) -> Duration {
    if requested < MIN_POLL_INTERVAL {
        warn!(
            requested_secs = requested.as_secs(),
            min_secs = MIN_POLL_INTERVAL.as_secs(),
            "poll interval below minimum, using default of {}s",
            DEFAULT_POLL_INTERVAL.as_secs()
        );
        DEFAULT_POLL_INTERVAL
    } else {
        requested
    }
}

// ── Topics ───────────────────────────────────────────────────────────

/// Topic layout on the bus.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TopicConfig {
    /// Prefix for availability, per-device, and summary topics.
    pub base_topic: String,
    /// Prefix the hub watches for discovery documents.
    pub discovery_prefix: String,
    /// Identifier of the bridge's own device.
    pub node_id: String,
}

impl Default for TopicConfig {
    fn default() -> Self {
        Self {
            base_topic: DEFAULT_BASE_TOPIC.into(),
            discovery_prefix: DEFAULT_DISCOVERY_PREFIX.into(),
            node_id: DEFAULT_NODE_ID.into(),
        }
    }
}

impl TopicConfig {
    /// Shared availability topic (`online` / `offline`).
    pub fn status_topic(&self) -> String {
        format!("{}/status", self.base_topic)
    }

    /// Aggregate summary topic.
    pub fn data_topic(&self) -> String {
        format!("{}/data", self.base_topic)
    }

    /// Full canonical record for one appliance.
    pub fn record_topic(&self, topic_id: &str) -> String {
        format!("{}/{topic_id}", self.base_topic)
    }

    /// Flat state payload for one appliance.
    pub fn state_topic(&self, topic_id: &str) -> String {
        format!("{}/{topic_id}/state", self.base_topic)
    }

    pub fn discovery_topic(&self, component: &str, topic_id: &str, unique_id: &str) -> String {
        format!(
            "{}/{component}/{topic_id}/{unique_id}/config",
            self.discovery_prefix
        )
    }

    /// State topic of the bridge's own device.
    pub fn bridge_state_topic(&self) -> String {
        format!("{}/state", self.node_id)
    }
}
