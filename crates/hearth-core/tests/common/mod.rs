// Shared fakes for hearth-core integration tests.
#![allow(clippy::unwrap_used, dead_code)]

use std::collections::{HashMap, HashSet};
use std::path::Path;
use std::sync::atomic::{AtomicBool, AtomicI64, AtomicU64, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use secrecy::{ExposeSecret, SecretString};
use serde_json::{Value, json};

use hearth_api::{
    ApplianceInfoBody, ApplianceInfoResponse, ApplianceStateResponse, ApplianceSummary, TokenGrant,
};
use hearth_core::{
    ApplianceApi, ApplianceGateway, CredentialManager, PublishError, Publisher, SessionStore,
    TokenExchange,
};

// ── Fake cloud ──────────────────────────────────────────────────────

/// In-memory appliance cloud implementing both collaborator traits.
#[derive(Default)]
pub struct FakeCloud {
    exchanges: AtomicUsize,
    list_calls: AtomicUsize,
    pub fail_exchange: AtomicBool,
    /// Answer the next inventory listing with 401.
    pub reject_next_list: AtomicBool,
    exchange_delay_ms: AtomicU64,
    /// Access token lifetime granted by `exchange`; 0 means one hour.
    grant_lifetime_secs: AtomicI64,
    list_delay_ms: AtomicU64,
    seen_refresh_tokens: Mutex<Vec<String>>,
    appliances: Mutex<Vec<ApplianceSummary>>,
    device_types: Mutex<HashMap<String, String>>,
    reported: Mutex<HashMap<String, Value>>,
    failing_info: Mutex<HashSet<String>>,
}

impl FakeCloud {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn add_appliance(&self, id: &str, name: &str, device_type: &str, reported: Value) {
        self.appliances.lock().unwrap().push(ApplianceSummary {
            appliance_id: id.into(),
            appliance_name: name.into(),
            appliance_type: Some(device_type.into()),
            created: None,
        });
        self.device_types
            .lock()
            .unwrap()
            .insert(id.into(), device_type.into());
        self.reported.lock().unwrap().insert(id.into(), reported);
    }

    pub fn fail_info_for(&self, id: &str) {
        self.failing_info.lock().unwrap().insert(id.into());
    }

    pub fn set_exchange_delay(&self, delay: Duration) {
        self.exchange_delay_ms
            .store(u64::try_from(delay.as_millis()).unwrap(), Ordering::SeqCst);
    }

    pub fn set_grant_lifetime(&self, secs: i64) {
        self.grant_lifetime_secs.store(secs, Ordering::SeqCst);
    }

    pub fn set_list_delay(&self, delay: Duration) {
        self.list_delay_ms
            .store(u64::try_from(delay.as_millis()).unwrap(), Ordering::SeqCst);
    }

    pub fn exchanges(&self) -> usize {
        self.exchanges.load(Ordering::SeqCst)
    }

    pub fn list_calls(&self) -> usize {
        self.list_calls.load(Ordering::SeqCst)
    }

    pub fn seen_refresh_tokens(&self) -> Vec<String> {
        self.seen_refresh_tokens.lock().unwrap().clone()
    }
}

#[async_trait]
impl TokenExchange for FakeCloud {
    async fn exchange(&self, refresh_token: &SecretString) -> Result<TokenGrant, hearth_api::Error> {
        let n = self.exchanges.fetch_add(1, Ordering::SeqCst) + 1;
        self.seen_refresh_tokens
            .lock()
            .unwrap()
            .push(refresh_token.expose_secret().to_owned());

        let delay = self.exchange_delay_ms.load(Ordering::SeqCst);
        if delay > 0 {
            tokio::time::sleep(Duration::from_millis(delay)).await;
        }

        if self.fail_exchange.load(Ordering::SeqCst) {
            return Err(hearth_api::Error::Authentication {
                message: "refresh token rejected (HTTP 400): already used".into(),
            });
        }

        Ok(TokenGrant {
            access_token: SecretString::from(format!("at-{n}")),
            refresh_token: SecretString::from(format!("rt-{n}")),
            expires_in_secs: match self.grant_lifetime_secs.load(Ordering::SeqCst) {
                0 => 3600,
                secs => secs,
            },
            token_type: Some("Bearer".into()),
        })
    }
}

#[async_trait]
impl ApplianceApi for FakeCloud {
    async fn list_appliances(
        &self,
        _access_token: &SecretString,
    ) -> Result<Vec<ApplianceSummary>, hearth_api::Error> {
        self.list_calls.fetch_add(1, Ordering::SeqCst);

        let delay = self.list_delay_ms.load(Ordering::SeqCst);
        if delay > 0 {
            tokio::time::sleep(Duration::from_millis(delay)).await;
        }

        if self.reject_next_list.swap(false, Ordering::SeqCst) {
            return Err(hearth_api::Error::SessionExpired);
        }
        Ok(self.appliances.lock().unwrap().clone())
    }

    async fn appliance_info(
        &self,
        _access_token: &SecretString,
        appliance_id: &str,
    ) -> Result<ApplianceInfoResponse, hearth_api::Error> {
        if self.failing_info.lock().unwrap().contains(appliance_id) {
            return Err(hearth_api::Error::Api {
                message: "internal error".into(),
                code: None,
                status: 500,
            });
        }

        let device_type = self.device_types.lock().unwrap().get(appliance_id).cloned();
        Ok(ApplianceInfoResponse {
            appliance_info: ApplianceInfoBody {
                serial_number: Some(format!("SN-{appliance_id}")),
                brand: Some("Acme".into()),
                device_type,
                model: Some("M1".into()),
                ..ApplianceInfoBody::default()
            },
            extra: serde_json::Map::new(),
        })
    }

    async fn appliance_state(
        &self,
        _access_token: &SecretString,
        appliance_id: &str,
    ) -> Result<ApplianceStateResponse, hearth_api::Error> {
        let reported = self
            .reported
            .lock()
            .unwrap()
            .get(appliance_id)
            .cloned()
            .unwrap_or_else(|| json!({}));
        Ok(serde_json::from_value(json!({
            "applianceId": appliance_id,
            "connectionState": "Connected",
            "properties": { "reported": reported }
        }))
        .unwrap())
    }
}

// ── Recording publisher ─────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Published {
    pub topic: String,
    pub payload: String,
    pub retain: bool,
}

impl Published {
    pub fn json(&self) -> Value {
        serde_json::from_str(&self.payload).unwrap()
    }
}

#[derive(Default)]
pub struct RecordingPublisher {
    messages: Mutex<Vec<Published>>,
    /// While set, every publish fails and nothing is recorded.
    pub offline: AtomicBool,
}

impl RecordingPublisher {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn messages(&self) -> Vec<Published> {
        self.messages.lock().unwrap().clone()
    }

    pub fn on_topic(&self, topic: &str) -> Vec<Published> {
        self.messages()
            .into_iter()
            .filter(|m| m.topic == topic)
            .collect()
    }

    pub fn topics_with_prefix(&self, prefix: &str) -> Vec<String> {
        self.messages()
            .into_iter()
            .filter(|m| m.topic.starts_with(prefix))
            .map(|m| m.topic)
            .collect()
    }

    pub fn clear(&self) {
        self.messages.lock().unwrap().clear();
    }
}

#[async_trait]
impl Publisher for RecordingPublisher {
    async fn publish(&self, topic: &str, payload: String, retain: bool) -> Result<(), PublishError> {
        if self.offline.load(Ordering::SeqCst) {
            return Err(PublishError::Transport {
                topic: topic.to_owned(),
                message: "bus unavailable".into(),
            });
        }
        self.messages.lock().unwrap().push(Published {
            topic: topic.to_owned(),
            payload,
            retain,
        });
        Ok(())
    }
}

// ── Wiring ──────────────────────────────────────────────────────────

pub fn token(value: &str) -> SecretString {
    SecretString::from(value.to_owned())
}

pub fn credentials(cloud: &Arc<FakeCloud>, state_dir: &Path, initial: Option<&str>) -> Arc<CredentialManager> {
    Arc::new(CredentialManager::new(
        cloud.clone(),
        SessionStore::new(state_dir.join("session.json")),
        initial.map(token),
    ))
}

pub async fn gateway(cloud: &Arc<FakeCloud>, state_dir: &Path) -> ApplianceGateway {
    let credentials = credentials(cloud, state_dir, Some("rt-0"));
    credentials.restore().await;
    ApplianceGateway::new(cloud.clone(), credentials)
}
