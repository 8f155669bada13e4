// ── Hub discovery ──
//
// Turns canonical appliance records into self-describing sensor
// definitions for the home-automation hub.

pub mod derive;
pub mod document;
pub mod registry;
pub mod rules;

pub use derive::{bridge_documents, derive_documents};
pub use document::{Component, DeviceBinding, DiscoveryDocument};
pub use registry::DiscoveryRegistry;
pub use rules::{SensorRule, ValueTransform, rules_for};
