//! `hearth once`: a single poll cycle.

use std::path::Path;
use std::sync::Arc;

use hearth_core::{CycleReport, Poller};

use crate::error::CliError;
use crate::publisher::LinePublisher;

pub async fn handle(config_path: Option<&Path>) -> Result<(), CliError> {
    let bridge = super::bridge_config(config_path)?;
    let poller = Poller::from_config(&bridge, Arc::new(LinePublisher::stdout())).await?;

    let report = poller.run_cycle().await?;
    print_report(&report);
    Ok(())
}

/// The report goes to stderr so stdout stays a clean message stream.
fn print_report(report: &CycleReport) {
    eprintln!(
        "cycle at {}: {} appliance(s), {} ok, {} degraded, {} newly registered",
        report.timestamp.to_rfc3339(),
        report.devices,
        report.succeeded,
        report.failed.len(),
        report.newly_registered,
    );
    for failure in &report.failed {
        eprintln!("  degraded: {failure}");
    }
    if report.publish_failures > 0 {
        eprintln!("  {} publish(es) failed", report.publish_failures);
    }
}
