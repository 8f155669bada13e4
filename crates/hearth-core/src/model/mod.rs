// ── Domain model ──
//
// Canonical types the gateway produces and the discovery registry and
// orchestrator consume. Converted from hearth-api wire types in
// `crate::convert`.

pub mod appliance;
pub mod capability;

pub use appliance::{
    ApplianceIdentity, ApplianceInfo, ApplianceRecord, DeviceCategory, degraded_record_payload,
    format_timestamp,
};
pub use capability::{CapabilityMap, CapabilityValue};
