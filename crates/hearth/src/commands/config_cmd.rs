//! `hearth config`: print the effective configuration.

use std::path::Path;

use crate::error::CliError;

pub fn handle(config_path: Option<&Path>) -> Result<(), CliError> {
    let cfg = hearth_config::load_config(config_path)?;
    print!("{}", cfg.to_redacted_toml()?);
    Ok(())
}
