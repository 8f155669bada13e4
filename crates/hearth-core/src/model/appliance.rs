// ── Appliance domain types ──

use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use strum::{Display, EnumString};

use super::capability::CapabilityMap;
use crate::sanitize;

/// Appliance family, normalized from the cloud's free-form device type.
///
/// Drives which category rules the discovery generator applies.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumString)]
#[strum(serialize_all = "snake_case")]
#[serde(rename_all = "snake_case")]
#[non_exhaustive]
pub enum DeviceCategory {
    Refrigeration,
    Washer,
    Dryer,
    WasherDryer,
    Dishwasher,
    Other,
}

impl DeviceCategory {
    /// Classify a raw device type string.
    ///
    /// Case-insensitive; `-` and spaces are treated as `_`.
    pub fn from_device_type(raw: &str) -> Self {
        let normalized: String = raw
            .trim()
            .chars()
            .map(|c| match c {
                '-' | ' ' => '_',
                other => other.to_ascii_uppercase(),
            })
            .collect();

        match normalized.as_str() {
            "REFRIGERATOR" | "FRIDGE" | "FREEZER" | "FRIDGE_FREEZER" | "WINE_COOLER" => {
                Self::Refrigeration
            }
            "WASHER" | "WASHING_MACHINE" => Self::Washer,
            "DRYER" | "TUMBLE_DRYER" => Self::Dryer,
            "WASHER_DRYER" => Self::WasherDryer,
            "DISHWASHER" => Self::Dishwasher,
            _ => Self::Other,
        }
    }
}

/// Inventory entry: who the appliance is.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApplianceIdentity {
    pub id: String,
    pub name: String,
    pub created_at: Option<DateTime<Utc>>,
}

impl ApplianceIdentity {
    /// Name for display and discovery, falling back to the id.
    pub fn display_name(&self) -> &str {
        if self.name.trim().is_empty() {
            &self.id
        } else {
            &self.name
        }
    }

    /// Topic-safe form of the appliance id.
    pub fn topic_id(&self) -> String {
        sanitize::topic_token(&self.id)
    }
}

/// Static metadata, fetched fresh each cycle.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApplianceInfo {
    pub serial_number: Option<String>,
    pub model: Option<String>,
    pub variant: Option<String>,
    pub device_type: Option<String>,
    pub brand: Option<String>,
}

impl ApplianceInfo {
    pub fn category(&self) -> DeviceCategory {
        self.device_type
            .as_deref()
            .map_or(DeviceCategory::Other, DeviceCategory::from_device_type)
    }
}

/// Canonical per-cycle view of one appliance.
///
/// Built fresh every cycle and never mutated afterwards.
#[derive(Debug, Clone, PartialEq)]
pub struct ApplianceRecord {
    pub identity: ApplianceIdentity,
    pub info: ApplianceInfo,
    pub connected: bool,
    /// Full reported state, unfiltered.
    pub capabilities: CapabilityMap,
    pub timestamp: DateTime<Utc>,
}

impl ApplianceRecord {
    pub fn topic_id(&self) -> String {
        self.identity.topic_id()
    }

    pub fn category(&self) -> DeviceCategory {
        self.info.category()
    }

    /// Payload for `{prefix}/{topicId}`.
    pub fn to_record_payload(&self) -> Value {
        json!({
            "timestamp": format_timestamp(self.timestamp),
            "applianceId": self.identity.id,
            "name": self.identity.display_name(),
            "info": {
                "modelName": self.info.model,
                "variant": self.info.variant,
                "serialNumber": self.info.serial_number,
                "deviceType": self.info.device_type,
                "connected": self.connected,
            },
            "state": self.capabilities.to_json(),
        })
    }

    /// Payload for `{prefix}/{topicId}/state`: capabilities plus
    /// `connected` and `timestamp`, which win over same-named keys.
    pub fn to_state_payload(&self) -> Value {
        let mut map = self.capabilities.to_json_map();
        map.insert("connected".into(), Value::Bool(self.connected));
        map.insert(
            "timestamp".into(),
            Value::String(format_timestamp(self.timestamp)),
        );
        Value::Object(map)
    }
}

/// Payload for an appliance whose info or state could not be fetched.
pub fn degraded_record_payload(
    identity: &ApplianceIdentity,
    error: &str,
    timestamp: DateTime<Utc>,
) -> Value {
    json!({
        "timestamp": format_timestamp(timestamp),
        "applianceId": identity.id,
        "name": identity.display_name(),
        "info": { "connected": false },
        "state": {},
        "error": error,
    })
}

/// RFC 3339 with millisecond precision and a `Z` suffix.
pub fn format_timestamp(ts: DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Millis, true)
}
