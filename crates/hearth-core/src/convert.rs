// ── API-to-domain type conversions ──
//
// Bridges raw `hearth_api` response types into canonical
// `hearth_core::model` domain types. Blank strings from the cloud are
// treated as missing.

use chrono::{DateTime, Utc};

use hearth_api::{ApplianceInfoBody, ApplianceInfoResponse, ApplianceStateResponse, ApplianceSummary};

use crate::model::{ApplianceIdentity, ApplianceInfo, ApplianceRecord, CapabilityMap};

// ── Helpers ────────────────────────────────────────────────────────

fn non_blank(raw: Option<String>) -> Option<String> {
    raw.filter(|s| !s.trim().is_empty())
}

// ── Inventory ──────────────────────────────────────────────────────

impl From<ApplianceSummary> for ApplianceIdentity {
    fn from(s: ApplianceSummary) -> Self {
        Self {
            id: s.appliance_id,
            name: s.appliance_name.trim().to_owned(),
            created_at: s.created,
        }
    }
}

// ── Info ───────────────────────────────────────────────────────────

impl From<ApplianceInfoBody> for ApplianceInfo {
    fn from(b: ApplianceInfoBody) -> Self {
        Self {
            serial_number: non_blank(b.serial_number),
            model: non_blank(b.model),
            variant: non_blank(b.variant),
            device_type: non_blank(b.device_type),
            brand: non_blank(b.brand),
        }
    }
}

impl From<ApplianceInfoResponse> for ApplianceInfo {
    fn from(r: ApplianceInfoResponse) -> Self {
        r.appliance_info.into()
    }
}

// ── Record assembly ────────────────────────────────────────────────

/// Merge one appliance's identity, info, and state into a canonical record.
pub fn build_record(
    identity: ApplianceIdentity,
    info: ApplianceInfoResponse,
    state: ApplianceStateResponse,
    timestamp: DateTime<Utc>,
) -> ApplianceRecord {
    let connected = state.is_connected();
    ApplianceRecord {
        identity,
        info: info.into(),
        connected,
        capabilities: CapabilityMap::from_json(state.properties.reported),
        timestamp,
    }
}
