//! `hearth status`: summarize the persisted session.

use std::path::Path;

use chrono::Utc;

use hearth_core::{PersistedSession, SAFETY_MARGIN, SessionStore};

use crate::error::CliError;

pub fn handle(config_path: Option<&Path>) -> Result<(), CliError> {
    let cfg = hearth_config::load_config(config_path)?;
    let path = cfg
        .state
        .path
        .clone()
        .unwrap_or_else(hearth_config::default_state_path);
    let store = SessionStore::new(path);

    match store.load()? {
        Some(session) => print!("{}", render(store.path(), &session)),
        None => println!("No session state at {}", store.path().display()),
    }
    Ok(())
}

fn render(path: &Path, session: &PersistedSession) -> String {
    use std::fmt::Write as _;

    let mut out = String::new();
    let _ = writeln!(out, "Session state:  {}", path.display());
    let _ = writeln!(out, "Updated:        {}", session.updated_at.to_rfc3339());
    let _ = writeln!(
        out,
        "Refresh token:  {}",
        if session.refresh_token.is_empty() { "missing" } else { "present" }
    );

    let access = match (session.access_token.as_ref(), session.token_expiry_at()) {
        (None, _) => "none".to_owned(),
        (Some(_), None) => "present (no expiry recorded)".to_owned(),
        (Some(_), Some(expiry)) => {
            let margin = chrono::Duration::from_std(SAFETY_MARGIN).unwrap_or_default();
            let state = if expiry - margin > Utc::now() { "valid" } else { "expired" };
            format!("{state}, expires {}", expiry.to_rfc3339())
        }
    };
    let _ = writeln!(out, "Access token:   {access}");

    let known = session.appliances.as_deref().unwrap_or_default();
    let _ = writeln!(out, "Known appliances ({}):", known.len());
    for appliance in known {
        let _ = writeln!(out, "  {:<24} {}", appliance.appliance_id, appliance.appliance_name);
    }
    out
}
