// ── Discovery registry ──
//
// Publishes discovery documents once per appliance per process lifetime
// and state payloads every cycle. The ledger is a concurrent set with
// atomic insert, so two racing registrations of the same appliance
// publish exactly once. A registration whose documents did not all reach
// the bus is dropped from the ledger and retried on the next cycle.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use dashmap::DashSet;
use serde_json::json;
use tracing::{debug, info, warn};

use super::derive::{bridge_documents, derive_documents};
use super::document::DiscoveryDocument;
use crate::config::TopicConfig;
use crate::error::PublishError;
use crate::model::ApplianceRecord;
use crate::publish::{Publisher, publish_json};

pub struct DiscoveryRegistry {
    publisher: Arc<dyn Publisher>,
    topics: TopicConfig,
    /// Sanitized appliance ids already registered.
    ledger: DashSet<String>,
    bridge_registered: AtomicBool,
}

impl DiscoveryRegistry {
    pub fn new(publisher: Arc<dyn Publisher>, topics: TopicConfig) -> Self {
        Self {
            publisher,
            topics,
            ledger: DashSet::new(),
            bridge_registered: AtomicBool::new(false),
        }
    }

    /// Publish every discovery document for `record` on first sight.
    ///
    /// Returns `true` if this call performed the registration. If any
    /// document fails to publish the appliance is left unregistered and
    /// `false` is returned, so a later call publishes the full set again.
    pub async fn ensure_registered(&self, record: &ApplianceRecord) -> bool {
        let topic_id = record.topic_id();
        if !self.ledger.insert(topic_id.clone()) {
            return false;
        }

        let docs = derive_documents(record, &self.topics);
        info!(
            appliance_id = %record.identity.id,
            topic_id = %topic_id,
            category = %record.category(),
            documents = docs.len(),
            "registering appliance"
        );
        let failed = self.publish_documents(&docs).await;
        if failed > 0 {
            warn!(
                appliance_id = %record.identity.id,
                failed,
                "registration incomplete, will retry next cycle"
            );
            self.ledger.remove(&topic_id);
            return false;
        }
        true
    }

    /// Publish the flat state payload for `record`.
    pub async fn publish_state(&self, record: &ApplianceRecord) -> Result<(), PublishError> {
        let topic = self.topics.state_topic(&record.topic_id());
        publish_json(
            self.publisher.as_ref(),
            &topic,
            &record.to_state_payload(),
            false,
        )
        .await
    }

    /// Whether an appliance (by sanitized id) is in the ledger.
    pub fn is_registered(&self, topic_id: &str) -> bool {
        self.ledger.contains(topic_id)
    }

    pub fn registered_count(&self) -> usize {
        self.ledger.len()
    }

    /// Publish the bridge's own device documents once.
    pub async fn register_bridge(&self) -> bool {
        if self.bridge_registered.swap(true, Ordering::AcqRel) {
            return false;
        }
        let failed = self.publish_documents(&bridge_documents(&self.topics)).await;
        if failed > 0 {
            warn!(failed, "bridge registration incomplete, will retry");
            self.bridge_registered.store(false, Ordering::Release);
            return false;
        }
        true
    }

    /// Publish the bridge's uptime and version.
    pub async fn publish_bridge_state(&self, uptime: Duration) -> Result<(), PublishError> {
        let payload = json!({
            "uptime": uptime.as_secs(),
            "version": env!("CARGO_PKG_VERSION"),
        });
        publish_json(
            self.publisher.as_ref(),
            &self.topics.bridge_state_topic(),
            &payload,
            false,
        )
        .await
    }

    /// Publish each document once; returns how many failed.
    async fn publish_documents(&self, docs: &[DiscoveryDocument]) -> usize {
        let mut failed = 0;
        for doc in docs {
            let topic = doc.topic(&self.topics.discovery_prefix);
            match publish_json(self.publisher.as_ref(), &topic, doc, true).await {
                Ok(()) => debug!(topic = %topic, "discovery document published"),
                Err(e) => {
                    warn!(topic = %topic, error = %e, "discovery publish failed");
                    failed += 1;
                }
            }
        }
        failed
    }
}
