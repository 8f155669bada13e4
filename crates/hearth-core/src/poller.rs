// ── Polling orchestrator ──
//
// Drives the fetch → register → publish cycle on a fixed interval and
// owns the start/stop lifecycle. At most one cycle runs at a time: the
// timer task takes the cycle lock with `try_lock`, so a tick that lands
// while a cycle is outstanding is skipped.

use std::sync::Arc;
use std::time::{Duration, Instant};

use chrono::{DateTime, Utc};
use serde_json::{Value, json};
use strum::Display;
use tokio::sync::{Mutex, watch};
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use hearth_api::{CloudClient, TlsMode, TransportConfig};

use crate::config::{BridgeConfig, TlsVerification, TopicConfig, effective_interval};
use crate::credentials::{CredentialManager, SessionStore};
use crate::discovery::DiscoveryRegistry;
use crate::discovery::document::{PAYLOAD_AVAILABLE, PAYLOAD_NOT_AVAILABLE};
use crate::error::{CoreError, DeviceError};
use crate::gateway::ApplianceGateway;
use crate::model::{ApplianceIdentity, degraded_record_payload, format_timestamp};
use crate::publish::{Publisher, publish_json};

/// Lifecycle state of the orchestrator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
pub enum PollerState {
    Stopped,
    Running,
}

/// Outcome of one completed cycle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CycleReport {
    pub timestamp: DateTime<Utc>,
    /// Appliances in the inventory.
    pub devices: usize,
    /// Appliances whose info and state were fetched.
    pub succeeded: usize,
    /// Appliances reported degraded.
    pub failed: Vec<DeviceError>,
    /// Appliances registered with the hub during this cycle.
    pub newly_registered: usize,
    /// Publishes that failed (logged, not fatal).
    pub publish_failures: usize,
}

impl CycleReport {
    fn new(timestamp: DateTime<Utc>) -> Self {
        Self {
            timestamp,
            devices: 0,
            succeeded: 0,
            failed: Vec::new(),
            newly_registered: 0,
            publish_failures: 0,
        }
    }
}

// ── Poller ──────────────────────────────────────────────────────────

/// Cheaply cloneable handle to the orchestrator.
#[derive(Clone)]
pub struct Poller {
    inner: Arc<PollerInner>,
}

struct PollerInner {
    gateway: ApplianceGateway,
    /// `None` when discovery is disabled.
    registry: Option<DiscoveryRegistry>,
    publisher: Arc<dyn Publisher>,
    topics: TopicConfig,
    interval: Duration,
    state: watch::Sender<PollerState>,
    /// Timer task and its cancellation token while running.
    timer: Mutex<Option<(JoinHandle<()>, CancellationToken)>>,
    /// Held for the duration of every cycle.
    cycle_lock: Arc<Mutex<()>>,
    started_at: Instant,
}

impl Poller {
    pub fn new(
        gateway: ApplianceGateway,
        registry: Option<DiscoveryRegistry>,
        publisher: Arc<dyn Publisher>,
        topics: TopicConfig,
        interval: Duration,
    ) -> Self {
        let (state, _) = watch::channel(PollerState::Stopped);
        Self {
            inner: Arc::new(PollerInner {
                gateway,
                registry,
                publisher,
                topics,
                interval: effective_interval(interval),
                state,
                timer: Mutex::new(None),
                cycle_lock: Arc::new(Mutex::new(())),
                started_at: Instant::now(),
            }),
        }
    }

    /// Wire the full stack from configuration and restore the persisted
    /// session.
    pub async fn from_config(
        config: &BridgeConfig,
        publisher: Arc<dyn Publisher>,
    ) -> Result<Self, CoreError> {
        let transport = TransportConfig {
            tls: match &config.tls {
                TlsVerification::SystemDefaults => TlsMode::System,
                TlsVerification::CustomCa(path) => TlsMode::CustomCa(path.clone()),
            },
            timeout: config.timeout,
        };
        let client = Arc::new(CloudClient::new(
            config.api_url.as_str(),
            &config.api_key,
            &transport,
        )?);

        let credentials = Arc::new(CredentialManager::new(
            client.clone(),
            SessionStore::new(&config.state_path),
            config.initial_refresh_token.clone(),
        ));
        credentials.restore().await;

        let gateway = ApplianceGateway::new(client, credentials);
        let registry = config
            .discovery_enabled
            .then(|| DiscoveryRegistry::new(publisher.clone(), config.topics.clone()));

        Ok(Self::new(
            gateway,
            registry,
            publisher,
            config.topics.clone(),
            config.poll_interval,
        ))
    }

    pub fn state(&self) -> PollerState {
        *self.inner.state.borrow()
    }

    /// Effective poll interval (after the floor is applied).
    pub fn interval(&self) -> Duration {
        self.inner.interval
    }

    // ── Lifecycle ────────────────────────────────────────────────────

    /// `Stopped → Running`: announce availability, run one cycle, then
    /// schedule cycles on the interval. No-op if already running.
    pub async fn start(&self) {
        let mut timer = self.inner.timer.lock().await;
        if timer.is_some() {
            warn!("poller already running, ignoring start");
            return;
        }

        self.publish_availability(PAYLOAD_AVAILABLE).await;

        {
            let _cycle = self.inner.cycle_lock.lock().await;
            if let Err(e) = self.execute_cycle().await {
                warn!(error = %e, "initial cycle failed");
            }
        }

        let cancel = CancellationToken::new();
        let handle = tokio::spawn(poll_task(self.clone(), cancel.clone()));
        *timer = Some((handle, cancel));
        self.inner.state.send_replace(PollerState::Running);
        info!(interval_secs = self.inner.interval.as_secs(), "poller started");
    }

    /// `Running → Stopped`: cancel the timer and wait for any in-flight
    /// cycle. No-op if already stopped.
    pub async fn stop(&self) {
        let Some((handle, cancel)) = self.inner.timer.lock().await.take() else {
            warn!("poller already stopped, ignoring stop");
            return;
        };

        cancel.cancel();
        if let Err(e) = handle.await {
            warn!(error = %e, "poll task ended abnormally");
        }
        let _cycle = self.inner.cycle_lock.lock().await;

        self.inner.state.send_replace(PollerState::Stopped);
        info!("poller stopped");
    }

    /// Stop, then announce `offline` before returning.
    pub async fn shutdown(&self) {
        self.stop().await;
        self.publish_availability(PAYLOAD_NOT_AVAILABLE).await;
    }

    // ── Cycle ────────────────────────────────────────────────────────

    /// Run one cycle now, waiting for any cycle already in flight.
    pub async fn run_cycle(&self) -> Result<CycleReport, CoreError> {
        let _cycle = self.inner.cycle_lock.lock().await;
        self.execute_cycle().await
    }

    /// Cycle body. Caller must hold the cycle lock.
    async fn execute_cycle(&self) -> Result<CycleReport, CoreError> {
        let inner = &self.inner;
        let mut report = CycleReport::new(Utc::now());

        let results = match inner.gateway.fetch_all().await {
            Ok(results) => results,
            Err(e) => {
                let known = inner.gateway.credentials().known_appliances().await;
                warn!(
                    error = %e,
                    known_appliances = known.len(),
                    "cycle aborted, nothing published"
                );
                for appliance in &known {
                    debug!(
                        appliance_id = %appliance.appliance_id,
                        name = %appliance.appliance_name,
                        "last known appliance"
                    );
                }
                return Err(e);
            }
        };

        report.devices = results.len();
        let mut summary: Vec<Value> = Vec::with_capacity(results.len());

        for result in results {
            match result {
                Ok(record) => {
                    if let Some(registry) = &inner.registry {
                        if registry.ensure_registered(&record).await {
                            report.newly_registered += 1;
                        }
                        if let Err(e) = registry.publish_state(&record).await {
                            warn!(error = %e, "state publish failed");
                            report.publish_failures += 1;
                        }
                    }

                    let topic = inner.topics.record_topic(&record.topic_id());
                    self.publish_counted(&mut report, &topic, &record.to_record_payload(), false)
                        .await;

                    summary.push(json!({
                        "id": record.identity.id,
                        "name": record.identity.display_name(),
                        "connected": record.connected,
                    }));
                    report.succeeded += 1;
                }
                Err(err) => {
                    let identity = ApplianceIdentity {
                        id: err.appliance_id.clone(),
                        name: err.name.clone(),
                        created_at: None,
                    };
                    let topic = inner.topics.record_topic(&identity.topic_id());
                    let payload = degraded_record_payload(&identity, &err.message, report.timestamp);
                    self.publish_counted(&mut report, &topic, &payload, false)
                        .await;

                    summary.push(json!({
                        "id": identity.id,
                        "name": identity.display_name(),
                        "connected": false,
                    }));
                    report.failed.push(err);
                }
            }
        }

        let data = json!({
            "timestamp": format_timestamp(report.timestamp),
            "devices": report.devices,
            "appliances": summary,
        });
        self.publish_counted(&mut report, &inner.topics.data_topic(), &data, false)
            .await;

        if let Some(registry) = &inner.registry {
            // No-op once registered; retries after a failed first attempt.
            registry.register_bridge().await;
            if let Err(e) = registry
                .publish_bridge_state(inner.started_at.elapsed())
                .await
            {
                warn!(error = %e, "bridge state publish failed");
                report.publish_failures += 1;
            }
        }

        info!(
            devices = report.devices,
            failed = report.failed.len(),
            newly_registered = report.newly_registered,
            "cycle complete"
        );
        Ok(report)
    }

    async fn publish_counted(
        &self,
        report: &mut CycleReport,
        topic: &str,
        payload: &Value,
        retain: bool,
    ) {
        if let Err(e) = publish_json(self.inner.publisher.as_ref(), topic, payload, retain).await {
            warn!(topic = %topic, error = %e, "publish failed");
            report.publish_failures += 1;
        }
    }

    async fn publish_availability(&self, payload: &str) {
        let topic = self.inner.topics.status_topic();
        if let Err(e) = self
            .inner
            .publisher
            .publish(&topic, payload.to_owned(), true)
            .await
        {
            warn!(topic = %topic, error = %e, "availability publish failed");
        }
    }
}

// ── Background task ─────────────────────────────────────────────────

async fn poll_task(poller: Poller, cancel: CancellationToken) {
    let mut interval = tokio::time::interval(poller.inner.interval);
    interval.set_missed_tick_behavior(MissedTickBehavior::Skip);
    interval.tick().await; // consume the immediate first tick

    loop {
        tokio::select! {
            biased;
            () = cancel.cancelled() => break,
            _ = interval.tick() => {
                let Ok(guard) = poller.inner.cycle_lock.clone().try_lock_owned() else {
                    warn!("previous cycle still running, skipping tick");
                    continue;
                };
                let poller = poller.clone();
                tokio::spawn(async move {
                    let _guard = guard;
                    if let Err(e) = poller.execute_cycle().await {
                        warn!(error = %e, "cycle failed");
                    }
                });
            }
        }
    }
}
