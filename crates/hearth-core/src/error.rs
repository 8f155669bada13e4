// ── Core error types ──
//
// Cycle-level errors from hearth-core. Consumers never see raw HTTP
// status codes or JSON decode failures directly; the
// `From<hearth_api::Error>` impl translates transport-layer errors into
// the bridge's taxonomy (auth / inventory / device / publish / persistence).

use std::path::PathBuf;

use thiserror::Error;

/// Unified error type for the core crate.
#[derive(Debug, Error)]
pub enum CoreError {
    // ── Startup ──────────────────────────────────────────────────────
    #[error("Configuration error: {message}")]
    Config { message: String },

    // ── Cycle-fatal ──────────────────────────────────────────────────
    #[error(transparent)]
    Auth(#[from] AuthError),

    #[error("Cannot reach the appliance cloud at {url}: {reason}")]
    ConnectionFailed { url: String, reason: String },

    #[error("Appliance cloud request timed out")]
    Timeout,

    #[error("API error: {message}")]
    Api {
        message: String,
        code: Option<String>,
        status: Option<u16>,
    },

    // ── Contained ────────────────────────────────────────────────────
    #[error(transparent)]
    Publish(#[from] PublishError),

    #[error(transparent)]
    Persistence(#[from] PersistenceError),

    #[error("Internal error: {0}")]
    Internal(String),
}

// ── Authentication ───────────────────────────────────────────────────

/// Session acquisition or renewal failed.
///
/// Fatal for the current cycle only. `Clone` so that callers waiting on an
/// in-flight renewal can all observe the same failure.
#[derive(Debug, Clone, Error)]
pub enum AuthError {
    #[error("no refresh token available (configure api.refresh_token or restore the session file)")]
    NoRefreshToken,

    #[error("token renewal failed: {message}")]
    RenewalFailed { message: String },

    #[error("access token rejected by the appliance cloud")]
    Rejected,
}

// ── Per-device ───────────────────────────────────────────────────────

/// Info or state fetch failed for a single appliance.
///
/// Isolated to that appliance: siblings and the aggregate summary are
/// unaffected, and the appliance is reported with `connected: false`.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("appliance '{name}' ({appliance_id}): {message}")]
pub struct DeviceError {
    pub appliance_id: String,
    pub name: String,
    pub message: String,
}

// ── Bus ──────────────────────────────────────────────────────────────

/// A single publish to the bus failed. Logged; the cycle continues.
#[derive(Debug, Clone, Error)]
pub enum PublishError {
    #[error("failed to encode payload for {topic}: {message}")]
    Encode { topic: String, message: String },

    #[error("publish to {topic} failed: {message}")]
    Transport { topic: String, message: String },
}

// ── Durable state ────────────────────────────────────────────────────

/// Reading or writing the session state file failed.
///
/// Writes are logged and the bridge continues with in-memory state;
/// the next restart loses the update.
#[derive(Debug, Error)]
pub enum PersistenceError {
    #[error("failed to {action} session state at {}: {source}", path.display())]
    Io {
        action: &'static str,
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("session state at {} is not valid JSON: {source}", path.display())]
    Corrupt {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("failed to encode session state: {0}")]
    Encode(#[source] serde_json::Error),
}

// ── Conversion from transport-layer errors ───────────────────────────

impl From<hearth_api::Error> for CoreError {
    fn from(err: hearth_api::Error) -> Self {
        match err {
            hearth_api::Error::Authentication { message } => {
                Self::Auth(AuthError::RenewalFailed { message })
            }
            hearth_api::Error::SessionExpired => Self::Auth(AuthError::Rejected),
            hearth_api::Error::InvalidApiKey => Self::Config {
                message: "API key rejected by the appliance cloud".into(),
            },
            hearth_api::Error::Transport(ref e) => {
                if e.is_timeout() {
                    Self::Timeout
                } else if e.is_connect() {
                    Self::ConnectionFailed {
                        url: e
                            .url()
                            .map_or_else(|| "<unknown>".into(), ToString::to_string),
                        reason: e.to_string(),
                    }
                } else {
                    Self::Api {
                        message: e.to_string(),
                        code: None,
                        status: e.status().map(|s| s.as_u16()),
                    }
                }
            }
            hearth_api::Error::InvalidHeader { .. } => Self::Config {
                message: err.to_string(),
            },
            hearth_api::Error::InvalidUrl(e) => Self::Config {
                message: format!("Invalid URL: {e}"),
            },
            hearth_api::Error::Tls(msg) => Self::ConnectionFailed {
                url: String::new(),
                reason: format!("TLS error: {msg}"),
            },
            hearth_api::Error::RateLimited { retry_after_secs } => Self::Api {
                message: format!("Rate limited -- retry after {retry_after_secs}s"),
                code: Some("rate_limited".into()),
                status: Some(429),
            },
            hearth_api::Error::Api {
                message,
                code,
                status,
            } => Self::Api {
                message,
                code,
                status: Some(status),
            },
            hearth_api::Error::Deserialization { message, body: _ } => {
                Self::Internal(format!("Deserialization error: {message}"))
            }
        }
    }
}
