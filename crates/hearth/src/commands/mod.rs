//! Command handlers.

pub mod config_cmd;
pub mod once;
pub mod run;
pub mod status;

use std::path::Path;

use hearth_core::BridgeConfig;

use crate::error::CliError;

/// Load, validate, and resolve secrets for a cloud-bound command.
///
/// Fails before any network traffic when the API key or a refresh token
/// is missing.
fn bridge_config(config_path: Option<&Path>) -> Result<BridgeConfig, CliError> {
    let cfg = hearth_config::load_config(config_path)?;
    let bridge = hearth_config::to_bridge_config(&cfg)?;
    hearth_config::require_refresh_token(&bridge)?;

    tracing::debug!(
        api_url = %bridge.api_url,
        state_path = %bridge.state_path.display(),
        "configuration loaded"
    );
    Ok(bridge)
}
