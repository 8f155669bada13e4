// ── Discovery documents ──
//
// Hub-facing sensor definitions. Serialized field order follows struct
// declaration order, which keeps published payloads byte-stable.

use serde::Serialize;
use strum::{Display, IntoStaticStr};

pub const PAYLOAD_AVAILABLE: &str = "online";
pub const PAYLOAD_NOT_AVAILABLE: &str = "offline";
pub const PAYLOAD_ON: &str = "ON";
pub const PAYLOAD_OFF: &str = "OFF";

/// Hub entity platform; also the second level of the discovery topic.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Display, IntoStaticStr)]
#[strum(serialize_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum Component {
    Sensor,
    BinarySensor,
}

/// The hub device every entity of one appliance attaches to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DeviceBinding {
    pub identifiers: Vec<String>,
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub manufacturer: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub serial_number: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hw_version: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sw_version: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub via_device: Option<String>,
}

/// One retained discovery document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DiscoveryDocument {
    #[serde(skip)]
    pub component: Component,
    /// Sanitized topic id of the owning device.
    #[serde(skip)]
    pub topic_id: String,
    pub unique_id: String,
    pub object_id: String,
    pub name: String,
    pub state_topic: String,
    pub value_template: String,
    pub availability_topic: String,
    pub payload_available: String,
    pub payload_not_available: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub payload_on: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub payload_off: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub unit_of_measurement: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub device_class: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub state_class: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub icon: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub entity_category: Option<String>,
    pub device: DeviceBinding,
}

impl DiscoveryDocument {
    /// `{discoveryPrefix}/{component}/{topicId}/{uniqueId}/config`
    pub fn topic(&self, discovery_prefix: &str) -> String {
        format!(
            "{discovery_prefix}/{}/{}/{}/config",
            self.component, self.topic_id, self.unique_id
        )
    }
}

/// Presentation hints shared by rule-derived and generic sensors.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SensorSpec {
    pub unit: Option<&'static str>,
    pub device_class: Option<&'static str>,
    pub state_class: Option<&'static str>,
    pub icon: Option<&'static str>,
    pub entity_category: Option<&'static str>,
}

impl SensorSpec {
    pub const fn plain() -> Self {
        Self {
            unit: None,
            device_class: None,
            state_class: None,
            icon: None,
            entity_category: None,
        }
    }

    pub const fn unit(mut self, unit: &'static str) -> Self {
        self.unit = Some(unit);
        self
    }

    pub const fn device_class(mut self, class: &'static str) -> Self {
        self.device_class = Some(class);
        self
    }

    pub const fn measurement(mut self) -> Self {
        self.state_class = Some("measurement");
        self
    }

    pub const fn icon(mut self, icon: &'static str) -> Self {
        self.icon = Some(icon);
        self
    }

    pub const fn diagnostic(mut self) -> Self {
        self.entity_category = Some("diagnostic");
        self
    }
}
