// ── Discovery derivation ──
//
// Pure function from a record (category + capabilities) and the static
// topic layout to the ordered list of discovery documents. Identical
// input yields identical output.

use std::collections::HashSet;

use tracing::debug;

use super::document::{
    Component, DeviceBinding, DiscoveryDocument, PAYLOAD_AVAILABLE, PAYLOAD_NOT_AVAILABLE,
    PAYLOAD_OFF, PAYLOAD_ON, SensorSpec,
};
use super::rules::{ValueTransform, rules_for};
use crate::config::TopicConfig;
use crate::model::{ApplianceRecord, CapabilityValue};
use crate::sanitize::unique_id_token;

/// Capability keys represented by the always-present sensors.
const RESERVED_KEYS: &[&str] = &["connected", "connectionState", "applianceState", "timestamp"];

/// Per-record context shared by every document of one appliance.
struct DocumentContext<'a> {
    topics: &'a TopicConfig,
    topic_id: String,
    /// Prefix of every unique id under this device.
    id_prefix: String,
    state_topic: String,
    device: DeviceBinding,
}

impl DocumentContext<'_> {
    fn unique_id(&self, key: &str) -> String {
        unique_id_token(&format!("{}_{key}", self.id_prefix))
    }

    fn document(
        &self,
        component: Component,
        key: &str,
        name: &str,
        value_template: String,
        spec: SensorSpec,
    ) -> DiscoveryDocument {
        let unique_id = self.unique_id(key);
        let (payload_on, payload_off) = match component {
            Component::BinarySensor => (Some(PAYLOAD_ON.into()), Some(PAYLOAD_OFF.into())),
            Component::Sensor => (None, None),
        };

        DiscoveryDocument {
            component,
            topic_id: self.topic_id.clone(),
            object_id: unique_id.clone(),
            unique_id,
            name: name.to_owned(),
            state_topic: self.state_topic.clone(),
            value_template,
            availability_topic: self.topics.status_topic(),
            payload_available: PAYLOAD_AVAILABLE.into(),
            payload_not_available: PAYLOAD_NOT_AVAILABLE.into(),
            payload_on,
            payload_off,
            unit_of_measurement: spec.unit.map(Into::into),
            device_class: spec.device_class.map(Into::into),
            state_class: spec.state_class.map(Into::into),
            icon: spec.icon.map(Into::into),
            entity_category: spec.entity_category.map(Into::into),
            device: self.device.clone(),
        }
    }
}

/// Derive every discovery document for one appliance.
///
/// Order: connectivity, status, category rules in table order, then one
/// generic sensor per remaining scalar key in sorted key order.
///
/// Unique ids never repeat within one appliance. A key whose sanitized id
/// is already taken (such as `status`, or `door_state` next to `door state`)
/// is skipped; sorted iteration makes the survivor deterministic.
pub fn derive_documents(record: &ApplianceRecord, topics: &TopicConfig) -> Vec<DiscoveryDocument> {
    let topic_id = record.topic_id();
    let ctx = DocumentContext {
        topics,
        id_prefix: format!("{}_{topic_id}", topics.base_topic),
        state_topic: topics.state_topic(&topic_id),
        device: device_binding(record, topics, &topic_id),
        topic_id,
    };

    let mut docs = vec![
        ctx.document(
            Component::BinarySensor,
            "connectivity",
            "Connectivity",
            bool_template("connected"),
            SensorSpec::plain().device_class("connectivity").diagnostic(),
        ),
        ctx.document(
            Component::Sensor,
            "status",
            "Status",
            format!("{{{{ {} | default('unknown') }}}}", value_ref("applianceState")),
            SensorSpec::plain().icon("mdi:information-outline"),
        ),
    ];

    let mut covered: HashSet<&str> = RESERVED_KEYS.iter().copied().collect();
    let mut taken: HashSet<String> = docs.iter().map(|d| d.unique_id.clone()).collect();

    for rule in rules_for(record.category()) {
        if record.capabilities.scalar(rule.key).is_none() {
            continue;
        }
        covered.insert(rule.key);
        if !taken.insert(ctx.unique_id(rule.key)) {
            continue;
        }
        let template = match rule.transform {
            ValueTransform::Raw => raw_template(rule.key),
            ValueTransform::SecondsToMinutes => format!(
                "{{{{ (({} | float(0)) / 60) | round(0) | int }}}}",
                value_ref(rule.key)
            ),
        };
        docs.push(ctx.document(Component::Sensor, rule.key, rule.name, template, rule.spec));
    }

    for (key, value) in record.capabilities.iter() {
        if covered.contains(key.as_str()) || !value.is_scalar() {
            continue;
        }
        if !taken.insert(ctx.unique_id(key)) {
            debug!(key = %key, "capability key collides with an existing sensor id, skipped");
            continue;
        }
        let name = humanize(key);
        match value {
            CapabilityValue::Bool(_) => docs.push(ctx.document(
                Component::BinarySensor,
                key,
                &name,
                bool_template(key),
                SensorSpec::plain(),
            )),
            CapabilityValue::Number(_) => docs.push(ctx.document(
                Component::Sensor,
                key,
                &name,
                raw_template(key),
                SensorSpec::plain().measurement(),
            )),
            CapabilityValue::Text(_) => docs.push(ctx.document(
                Component::Sensor,
                key,
                &name,
                raw_template(key),
                SensorSpec::plain(),
            )),
            CapabilityValue::Null | CapabilityValue::List(_) | CapabilityValue::Nested(_) => {}
        }
    }

    docs
}

/// Documents for the bridge's own device.
pub fn bridge_documents(topics: &TopicConfig) -> Vec<DiscoveryDocument> {
    let node = unique_id_token(&topics.node_id);
    let ctx = DocumentContext {
        topics,
        topic_id: node.clone(),
        id_prefix: node.clone(),
        state_topic: topics.bridge_state_topic(),
        device: DeviceBinding {
            identifiers: vec![node.clone()],
            name: "Hearth bridge".into(),
            manufacturer: Some("hearth".into()),
            model: Some("Appliance cloud bridge".into()),
            serial_number: None,
            hw_version: None,
            sw_version: Some(env!("CARGO_PKG_VERSION").into()),
            via_device: None,
        },
    };

    vec![
        ctx.document(
            Component::Sensor,
            "uptime",
            "Uptime",
            raw_template("uptime"),
            SensorSpec::plain()
                .unit("s")
                .device_class("duration")
                .diagnostic(),
        ),
        ctx.document(
            Component::Sensor,
            "version",
            "Version",
            raw_template("version"),
            SensorSpec::plain().icon("mdi:tag-outline").diagnostic(),
        ),
    ]
}

fn device_binding(record: &ApplianceRecord, topics: &TopicConfig, topic_id: &str) -> DeviceBinding {
    DeviceBinding {
        identifiers: vec![unique_id_token(&format!("{}_{topic_id}", topics.base_topic))],
        name: record.identity.display_name().to_owned(),
        manufacturer: record.info.brand.clone(),
        model: record.info.model.clone(),
        serial_number: record.info.serial_number.clone(),
        hw_version: record.info.variant.clone(),
        sw_version: None,
        via_device: Some(unique_id_token(&topics.node_id)),
    }
}

// ── Templates ───────────────────────────────────────────────────────

/// Jinja reference to a key of the state payload.
///
/// Identifier-like keys use attribute access; anything else uses
/// subscript access with the key quoted.
fn value_ref(key: &str) -> String {
    let is_identifier = key
        .chars()
        .next()
        .is_some_and(|c| c.is_ascii_alphabetic() || c == '_')
        && key.chars().all(|c| c.is_ascii_alphanumeric() || c == '_');

    if is_identifier {
        format!("value_json.{key}")
    } else {
        let escaped = key.replace('\\', "\\\\").replace('\'', "\\'");
        format!("value_json['{escaped}']")
    }
}

fn raw_template(key: &str) -> String {
    format!("{{{{ {} }}}}", value_ref(key))
}

fn bool_template(key: &str) -> String {
    format!(
        "{{{{ '{PAYLOAD_ON}' if {} else '{PAYLOAD_OFF}' }}}}",
        value_ref(key)
    )
}

/// `doorOpen` → `Door open`, `filter_life` → `Filter life`.
fn humanize(key: &str) -> String {
    let mut words: Vec<String> = Vec::new();
    let mut current = String::new();
    let mut prev_lower = false;

    for c in key.chars() {
        if !c.is_alphanumeric() {
            if !current.is_empty() {
                words.push(std::mem::take(&mut current));
            }
            prev_lower = false;
            continue;
        }
        if c.is_uppercase() && prev_lower && !current.is_empty() {
            words.push(std::mem::take(&mut current));
        }
        prev_lower = c.is_lowercase() || c.is_ascii_digit();
        current.extend(c.to_lowercase());
    }
    if !current.is_empty() {
        words.push(current);
    }

    let joined = words.join(" ");
    let mut chars = joined.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => key.to_owned(),
    }
}
