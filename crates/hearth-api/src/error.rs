use thiserror::Error;

/// Top-level error type for the `hearth-api` crate.
///
/// Covers every failure mode of the appliance cloud API: token exchange,
/// transport, HTTP status errors, and payload decoding.
/// `hearth-core` maps these into cycle-level diagnostics.
#[derive(Debug, Error)]
pub enum Error {
    // ── Authentication ──────────────────────────────────────────────
    /// Token exchange rejected (refresh token revoked, already used, etc.)
    #[error("Authentication failed: {message}")]
    Authentication { message: String },

    /// Access token expired or revoked (HTTP 401 on an authenticated call).
    #[error("Session expired -- token renewal required")]
    SessionExpired,

    /// API key rejected (HTTP 403).
    #[error("Invalid API key")]
    InvalidApiKey,

    // ── Transport ───────────────────────────────────────────────────
    /// HTTP transport error (connection refused, DNS failure, timeout, etc.)
    #[error("HTTP transport error: {0}")]
    Transport(#[from] reqwest::Error),

    /// URL parsing error.
    #[error("Invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    /// A configured value cannot be sent as an HTTP header.
    #[error("Invalid {header} header value: {reason}")]
    InvalidHeader {
        header: &'static str,
        reason: String,
    },

    /// TLS setup or certificate error.
    #[error("TLS error: {0}")]
    Tls(String),

    // ── API ─────────────────────────────────────────────────────────
    /// Rate limited by the cloud API. Includes retry-after in seconds.
    #[error("Rate limited -- retry after {retry_after_secs}s")]
    RateLimited { retry_after_secs: u64 },

    /// Structured error response from the cloud API.
    #[error("API error (HTTP {status}): {message}")]
    Api {
        message: String,
        code: Option<String>,
        status: u16,
    },

    // ── Data ────────────────────────────────────────────────────────
    /// JSON deserialization failed, with the raw body for debugging.
    #[error("Deserialization error: {message}")]
    Deserialization { message: String, body: String },
}

impl Error {
    /// Returns `true` if this error indicates the session is no longer
    /// accepted and a token renewal might resolve it.
    pub fn is_auth_expired(&self) -> bool {
        matches!(self, Self::Authentication { .. } | Self::SessionExpired)
    }
}
