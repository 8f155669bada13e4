//! CLI error types with miette diagnostics.
//!
//! Maps `CoreError` and `ConfigError` into user-facing errors with
//! actionable help text and stable exit codes.

use miette::Diagnostic;
use thiserror::Error;

use hearth_config::ConfigError;
use hearth_core::{CoreError, PersistenceError};

/// Process exit codes.
pub mod exit_code {
    pub const GENERAL: i32 = 1;
    /// Shared with clap's usage errors.
    pub const CONFIG: i32 = 2;
    pub const AUTH: i32 = 3;
    pub const CONNECTION: i32 = 7;
    pub const TIMEOUT: i32 = 8;
}

#[derive(Debug, Error, Diagnostic)]
pub enum CliError {
    // ── Configuration ────────────────────────────────────────────────
    #[error("Invalid configuration: {message}")]
    #[diagnostic(
        code(hearth::config),
        help(
            "Inspect the effective settings with: hearth config\n\
             Environment overrides use HEARTH_<SECTION>__<KEY>, e.g. HEARTH_BUS__BASE_TOPIC."
        )
    )]
    Config { message: String },

    #[error("No {what} configured")]
    #[diagnostic(
        code(hearth::no_credentials),
        help(
            "Set it in the [api] section of the config file, point api_key_env /\n\
             refresh_token_env at an environment variable, or store it in the\n\
             system keyring under service \"hearth\"."
        )
    )]
    MissingCredential { what: &'static str },

    // ── Authentication ───────────────────────────────────────────────
    #[error("Authentication failed: {message}")]
    #[diagnostic(
        code(hearth::auth_failed),
        help(
            "The refresh token may have been revoked. Obtain a new one and set\n\
             api.refresh_token, then remove the stale session state file."
        )
    )]
    AuthFailed { message: String },

    // ── Connectivity ─────────────────────────────────────────────────
    #[error("Could not reach the appliance cloud at {url}")]
    #[diagnostic(
        code(hearth::connection_failed),
        help("Check network access and api.base_url.\nCause: {reason}")
    )]
    ConnectionFailed { url: String, reason: String },

    #[error("Request to the appliance cloud timed out")]
    #[diagnostic(
        code(hearth::timeout),
        help("Raise api.timeout_secs if the cloud is slow to respond.")
    )]
    Timeout,

    #[error("Appliance cloud error: {message}")]
    #[diagnostic(code(hearth::api_error))]
    Api { message: String },

    // ── Local state ──────────────────────────────────────────────────
    #[error(transparent)]
    #[diagnostic(
        code(hearth::state),
        help("Delete the session state file to start over from api.refresh_token.")
    )]
    State(#[from] PersistenceError),

    #[error("{0}")]
    #[diagnostic(code(hearth::internal))]
    Internal(String),

    #[error(transparent)]
    #[diagnostic(code(hearth::io))]
    Io(#[from] std::io::Error),
}

impl CliError {
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::Config { .. } | Self::MissingCredential { .. } => exit_code::CONFIG,
            Self::AuthFailed { .. } => exit_code::AUTH,
            Self::ConnectionFailed { .. } => exit_code::CONNECTION,
            Self::Timeout => exit_code::TIMEOUT,
            Self::Api { .. } | Self::State(_) | Self::Internal(_) | Self::Io(_) => {
                exit_code::GENERAL
            }
        }
    }
}

// ── Conversions ──────────────────────────────────────────────────────

impl From<ConfigError> for CliError {
    fn from(err: ConfigError) -> Self {
        match err {
            ConfigError::MissingCredential { what } => Self::MissingCredential { what },
            ConfigError::Io(e) => Self::Io(e),
            other => Self::Config {
                message: other.to_string(),
            },
        }
    }
}

impl From<CoreError> for CliError {
    fn from(err: CoreError) -> Self {
        match err {
            CoreError::Config { message } => Self::Config { message },
            CoreError::Auth(e) => Self::AuthFailed {
                message: e.to_string(),
            },
            CoreError::ConnectionFailed { url, reason } => Self::ConnectionFailed { url, reason },
            CoreError::Timeout => Self::Timeout,
            CoreError::Api { message, .. } => Self::Api { message },
            CoreError::Persistence(e) => Self::State(e),
            CoreError::Publish(e) => Self::Internal(e.to_string()),
            CoreError::Internal(message) => Self::Internal(message),
        }
    }
}
