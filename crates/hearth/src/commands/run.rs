//! `hearth run`: the long-lived bridge.

use std::path::Path;
use std::sync::Arc;

use tracing::{info, warn};

use hearth_core::Poller;

use crate::error::CliError;
use crate::publisher::LinePublisher;

pub async fn handle(config_path: Option<&Path>) -> Result<(), CliError> {
    let bridge = super::bridge_config(config_path)?;
    let poller = Poller::from_config(&bridge, Arc::new(LinePublisher::stdout())).await?;

    info!(
        interval_secs = poller.interval().as_secs(),
        discovery = bridge.discovery_enabled,
        "starting bridge"
    );
    poller.start().await;

    shutdown_signal().await;

    info!("shutting down");
    poller.shutdown().await;
    Ok(())
}

/// Resolve on Ctrl-C, or SIGTERM on unix.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!(error = %e, "cannot listen for Ctrl-C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{SignalKind, signal};

        match signal(SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                warn!(error = %e, "cannot listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => info!("received Ctrl-C"),
        () = terminate => info!("received SIGTERM"),
    }
}
