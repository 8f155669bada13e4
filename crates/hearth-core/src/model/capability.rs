// ── Capability values ──
//
// An appliance's reported state is an open record: no fixed schema, and
// keys vary by family and firmware. `CapabilityValue` is the explicit
// tagged form the discovery rules pattern-match on.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// One reported state value.
///
/// `Null` is kept so the published state matches what the appliance
/// reported, array positions included. Only scalars become sensors.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum CapabilityValue {
    Null,
    Bool(bool),
    Number(serde_json::Number),
    Text(String),
    List(Vec<CapabilityValue>),
    Nested(CapabilityMap),
}

impl CapabilityValue {
    pub fn from_json(value: Value) -> Self {
        match value {
            Value::Null => Self::Null,
            Value::Bool(b) => Self::Bool(b),
            Value::Number(n) => Self::Number(n),
            Value::String(s) => Self::Text(s),
            Value::Array(items) => Self::List(items.into_iter().map(Self::from_json).collect()),
            Value::Object(map) => Self::Nested(CapabilityMap::from_json(map)),
        }
    }

    /// Bool, number, or text.
    pub fn is_scalar(&self) -> bool {
        matches!(self, Self::Bool(_) | Self::Number(_) | Self::Text(_))
    }

    pub fn to_json(&self) -> Value {
        match self {
            Self::Null => Value::Null,
            Self::Bool(b) => Value::Bool(*b),
            Self::Number(n) => Value::Number(n.clone()),
            Self::Text(s) => Value::String(s.clone()),
            Self::List(items) => Value::Array(items.iter().map(Self::to_json).collect()),
            Self::Nested(map) => map.to_json(),
        }
    }
}

impl From<bool> for CapabilityValue {
    fn from(b: bool) -> Self {
        Self::Bool(b)
    }
}

impl From<&str> for CapabilityValue {
    fn from(s: &str) -> Self {
        Self::Text(s.to_owned())
    }
}

impl From<i64> for CapabilityValue {
    fn from(n: i64) -> Self {
        Self::Number(n.into())
    }
}

// ── CapabilityMap ───────────────────────────────────────────────────

/// Ordered key → value map of an appliance's reported state.
///
/// Backed by a `BTreeMap`, so iteration is always in sorted key order.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CapabilityMap(BTreeMap<String, CapabilityValue>);

impl CapabilityMap {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_json(map: serde_json::Map<String, Value>) -> Self {
        Self(
            map.into_iter()
                .map(|(k, v)| (k, CapabilityValue::from_json(v)))
                .collect(),
        )
    }

    pub fn get(&self, key: &str) -> Option<&CapabilityValue> {
        self.0.get(key)
    }

    /// Value at `key` if present and scalar.
    pub fn scalar(&self, key: &str) -> Option<&CapabilityValue> {
        self.0.get(key).filter(|v| v.is_scalar())
    }

    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<CapabilityValue>) {
        self.0.insert(key.into(), value.into());
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.0.contains_key(key)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &CapabilityValue)> {
        self.0.iter()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// JSON object view, keys in sorted order.
    pub fn to_json(&self) -> Value {
        Value::Object(self.to_json_map())
    }

    pub fn to_json_map(&self) -> serde_json::Map<String, Value> {
        self.0.iter().map(|(k, v)| (k.clone(), v.to_json())).collect()
    }
}

impl FromIterator<(String, CapabilityValue)> for CapabilityMap {
    fn from_iter<I: IntoIterator<Item = (String, CapabilityValue)>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}
