#![allow(clippy::unwrap_used)]
// Discovery derivation and registry behaviour.

mod common;

use std::collections::HashSet;
use std::sync::Arc;
use std::sync::atomic::Ordering;

use chrono::Utc;
use pretty_assertions::assert_eq;
use serde_json::{Value, json};

use hearth_core::{
    ApplianceIdentity, ApplianceInfo, ApplianceRecord, CapabilityMap, Component,
    DiscoveryRegistry, TopicConfig, derive_documents,
};

use common::RecordingPublisher;

fn record(id: &str, device_type: &str, reported: Value) -> ApplianceRecord {
    let Value::Object(map) = reported else {
        panic!("reported state must be an object")
    };
    ApplianceRecord {
        identity: ApplianceIdentity {
            id: id.into(),
            name: "Kitchen fridge #1".into(),
            created_at: None,
        },
        info: ApplianceInfo {
            serial_number: Some("SN1".into()),
            model: Some("RF900".into()),
            variant: Some("EU".into()),
            device_type: Some(device_type.into()),
            brand: Some("Acme".into()),
        },
        connected: true,
        capabilities: CapabilityMap::from_json(map),
        timestamp: Utc::now(),
    }
}

// ── Derivation ──────────────────────────────────────────────────────

#[test]
fn refrigeration_with_temperature_yields_three_documents() {
    let rec = record("fridge 1", "REFRIGERATOR", json!({ "temperature": 5.2 }));
    let topics = TopicConfig::default();

    let docs = derive_documents(&rec, &topics);

    let names: Vec<&str> = docs.iter().map(|d| d.name.as_str()).collect();
    assert_eq!(names, vec!["Connectivity", "Status", "Temperature"]);
    assert_eq!(docs[0].component, Component::BinarySensor);
    assert_eq!(docs[2].unit_of_measurement.as_deref(), Some("°C"));
    assert_eq!(docs[2].value_template, "{{ value_json.temperature }}");
    assert_eq!(docs[2].state_topic, "hearth/fridge_1/state");
    assert_eq!(docs[2].unique_id, "hearth_fridge_1_temperature");
    assert_eq!(
        docs[2].topic(&topics.discovery_prefix),
        "homeassistant/sensor/fridge_1/hearth_fridge_1_temperature/config"
    );

    let state = rec.to_state_payload();
    assert_eq!(state["connected"], json!(true));
    assert_eq!(state["temperature"], json!(5.2));
}

#[test]
fn every_document_shares_availability_and_device() {
    let rec = record("a1", "WASHER", json!({ "programName": "ECO", "spin": 1200 }));
    let docs = derive_documents(&rec, &TopicConfig::default());

    for doc in &docs {
        assert_eq!(doc.availability_topic, "hearth/status");
        assert_eq!(doc.payload_available, "online");
        assert_eq!(doc.payload_not_available, "offline");
        assert_eq!(doc.device.identifiers, vec!["hearth_a1".to_owned()]);
        assert_eq!(doc.device.name, "Kitchen fridge #1");
        assert_eq!(doc.device.via_device.as_deref(), Some("hearth_bridge"));
    }
}

#[test]
fn laundry_time_is_converted_to_minutes() {
    let washer = record("w", "WASHER_DRYER", json!({ "timeToEnd": 3600 }));
    let dishwasher = record("d", "DISHWASHER", json!({ "timeToEnd": 60 }));
    let topics = TopicConfig::default();

    let washer_doc = derive_documents(&washer, &topics).pop().unwrap();
    let dish_doc = derive_documents(&dishwasher, &topics).pop().unwrap();

    assert_eq!(
        washer_doc.value_template,
        "{{ ((value_json.timeToEnd | float(0)) / 60) | round(0) | int }}"
    );
    assert_eq!(dish_doc.value_template, "{{ value_json.timeToEnd }}");
    assert_eq!(washer_doc.unit_of_measurement.as_deref(), Some("min"));
    assert_eq!(dish_doc.unit_of_measurement.as_deref(), Some("min"));
}

#[test]
fn generic_sensors_cover_remaining_scalars_in_sorted_order() {
    let rec = record(
        "x",
        "AIR_PURIFIER",
        json!({
            "zLevel": 3,
            "childLock": true,
            "applianceState": "RUNNING",
            "connectionState": "connected",
            "filter": { "life": 80 },
            "modes": ["auto", "sleep"],
            "mode": "auto"
        }),
    );

    let docs = derive_documents(&rec, &TopicConfig::default());

    let names: Vec<&str> = docs.iter().map(|d| d.name.as_str()).collect();
    assert_eq!(
        names,
        vec!["Connectivity", "Status", "Child lock", "Mode", "Z level"]
    );
    let child_lock = &docs[2];
    assert_eq!(child_lock.component, Component::BinarySensor);
    assert_eq!(child_lock.payload_on.as_deref(), Some("ON"));
    assert_eq!(child_lock.payload_off.as_deref(), Some("OFF"));
    assert_eq!(docs[4].state_class.as_deref(), Some("measurement"));
    assert_eq!(docs[3].state_class, None);
}

#[test]
fn rule_key_with_compound_value_is_skipped() {
    let rec = record(
        "f",
        "FREEZER",
        json!({ "temperature": { "zone1": -18 }, "humidity": 40 }),
    );

    let docs = derive_documents(&rec, &TopicConfig::default());

    let names: Vec<&str> = docs.iter().map(|d| d.name.as_str()).collect();
    assert_eq!(names, vec!["Connectivity", "Status", "Humidity"]);
}

#[test]
fn derivation_is_deterministic() {
    let reported = json!({ "b": 1, "a": "x", "doorState": "OPEN", "temperature": 3 });
    let first = record("fr", "FRIDGE_FREEZER", reported.clone());
    let second = record("fr", "FRIDGE_FREEZER", reported);
    let topics = TopicConfig::default();

    let a = serde_json::to_string(&derive_documents(&first, &topics)).unwrap();
    let b = serde_json::to_string(&derive_documents(&second, &topics)).unwrap();

    assert_eq!(a, b);
}

#[test]
fn colliding_keys_never_repeat_a_unique_id() {
    let rec = record(
        "o1",
        "OVEN",
        json!({
            "status": "x",
            "connectivity": true,
            "door_state": "b",
            "door state": "a"
        }),
    );
    let topics = TopicConfig::default();

    let docs = derive_documents(&rec, &topics);

    let ids: HashSet<&str> = docs.iter().map(|d| d.unique_id.as_str()).collect();
    let config_topics: HashSet<String> = docs
        .iter()
        .map(|d| d.topic(&topics.discovery_prefix))
        .collect();
    assert_eq!(ids.len(), docs.len());
    assert_eq!(config_topics.len(), docs.len());

    let names: Vec<&str> = docs.iter().map(|d| d.name.as_str()).collect();
    assert_eq!(names, vec!["Connectivity", "Status", "Door state"]);
    assert_eq!(
        docs[1].value_template,
        "{{ value_json.applianceState | default('unknown') }}"
    );
    assert_eq!(docs[2].value_template, "{{ value_json['door state'] }}");
}

#[test]
fn null_values_are_published_but_not_derived() {
    let reported = json!({ "fault": null, "zones": [1, null, 2], "level": 2 });
    let rec = record("w1", "WASHER", reported.clone());

    assert_eq!(rec.to_record_payload()["state"], reported);
    let state = rec.to_state_payload();
    assert_eq!(state["fault"], Value::Null);
    assert_eq!(state["zones"], json!([1, null, 2]));

    let docs = derive_documents(&rec, &TopicConfig::default());
    let names: Vec<&str> = docs.iter().map(|d| d.name.as_str()).collect();
    assert_eq!(names, vec!["Connectivity", "Status", "Level"]);
}

// ── Registry ────────────────────────────────────────────────────────

#[tokio::test]
async fn ensure_registered_publishes_each_document_once() {
    let publisher = RecordingPublisher::new();
    let registry = DiscoveryRegistry::new(publisher.clone(), TopicConfig::default());
    let rec = record("a1", "REFRIGERATOR", json!({ "temperature": 5.2, "humidity": 41 }));

    assert!(registry.ensure_registered(&rec).await);
    assert!(!registry.ensure_registered(&rec).await);

    let messages = publisher.messages();
    assert_eq!(messages.len(), 4);
    assert!(messages.iter().all(|m| m.retain));
    assert!(messages.iter().all(|m| m.topic.starts_with("homeassistant/")));
    let mut topics: Vec<&str> = messages.iter().map(|m| m.topic.as_str()).collect();
    topics.dedup();
    assert_eq!(topics.len(), 4);
    assert!(registry.is_registered("a1"));

    let doc = messages[0].json();
    assert_eq!(doc["unique_id"], "hearth_a1_connectivity");
    assert_eq!(doc["device_class"], "connectivity");
    assert!(doc.get("component").is_none());
}

#[tokio::test]
async fn failed_registration_is_retried() {
    let publisher = RecordingPublisher::new();
    let registry = DiscoveryRegistry::new(publisher.clone(), TopicConfig::default());
    let rec = record("a1", "REFRIGERATOR", json!({ "temperature": 5.2 }));

    publisher.offline.store(true, Ordering::SeqCst);
    assert!(!registry.ensure_registered(&rec).await);
    assert!(!registry.is_registered("a1"));
    assert!(publisher.messages().is_empty());

    publisher.offline.store(false, Ordering::SeqCst);
    assert!(registry.ensure_registered(&rec).await);
    assert!(registry.is_registered("a1"));
    assert_eq!(publisher.topics_with_prefix("homeassistant/").len(), 3);
}

#[tokio::test]
async fn failed_bridge_registration_is_retried() {
    let publisher = RecordingPublisher::new();
    let registry = DiscoveryRegistry::new(publisher.clone(), TopicConfig::default());

    publisher.offline.store(true, Ordering::SeqCst);
    assert!(!registry.register_bridge().await);

    publisher.offline.store(false, Ordering::SeqCst);
    assert!(registry.register_bridge().await);
    assert_eq!(publisher.topics_with_prefix("homeassistant/").len(), 2);
}

#[tokio::test]
async fn racing_registrations_publish_once() {
    let publisher = RecordingPublisher::new();
    let registry = Arc::new(DiscoveryRegistry::new(
        publisher.clone(),
        TopicConfig::default(),
    ));
    let rec = record("a1", "OVEN", json!({}));

    let (first, second) = tokio::join!(
        registry.ensure_registered(&rec),
        registry.ensure_registered(&rec)
    );

    assert!(first ^ second);
    assert_eq!(publisher.messages().len(), 2);
    assert_eq!(registry.registered_count(), 1);
}

#[tokio::test]
async fn state_is_published_every_time() {
    let publisher = RecordingPublisher::new();
    let registry = DiscoveryRegistry::new(publisher.clone(), TopicConfig::default());
    let rec = record("a1", "OVEN", json!({ "cavityTemp": 180 }));

    registry.publish_state(&rec).await.unwrap();
    registry.publish_state(&rec).await.unwrap();

    let states = publisher.on_topic("hearth/a1/state");
    assert_eq!(states.len(), 2);
    assert!(!states[0].retain);
    assert_eq!(states[0].json()["cavityTemp"], 180);
}

#[tokio::test]
async fn bridge_registers_once_with_node_state_topic() {
    let publisher = RecordingPublisher::new();
    let registry = DiscoveryRegistry::new(publisher.clone(), TopicConfig::default());

    assert!(registry.register_bridge().await);
    assert!(!registry.register_bridge().await);
    registry
        .publish_bridge_state(std::time::Duration::from_secs(90))
        .await
        .unwrap();

    let docs = publisher.topics_with_prefix("homeassistant/");
    assert_eq!(
        docs,
        vec![
            "homeassistant/sensor/hearth_bridge/hearth_bridge_uptime/config".to_owned(),
            "homeassistant/sensor/hearth_bridge/hearth_bridge_version/config".to_owned(),
        ]
    );
    let state = publisher.on_topic("hearth_bridge/state");
    assert_eq!(state[0].json()["uptime"], 90);
}
