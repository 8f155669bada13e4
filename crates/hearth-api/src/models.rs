// Cloud API response types
//
// Wire models for the appliance cloud's JSON API. Fields use
// `#[serde(default)]` liberally because field presence varies by
// appliance family and firmware; unknown fields land in `extra`.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

// ── Token ────────────────────────────────────────────────────────────

/// Raw body of `POST token/refresh`.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct TokenResponse {
    pub access_token: String,
    pub refresh_token: String,
    /// Lifetime of the access token in seconds.
    pub expires_in: i64,
    #[serde(default)]
    pub token_type: Option<String>,
}

// ── Inventory ────────────────────────────────────────────────────────

/// One entry of `GET appliances`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApplianceSummary {
    pub appliance_id: String,
    #[serde(default)]
    pub appliance_name: String,
    #[serde(default)]
    pub appliance_type: Option<String>,
    #[serde(default)]
    pub created: Option<DateTime<Utc>>,
}

// ── Info ─────────────────────────────────────────────────────────────

/// Body of `GET appliances/{id}/info`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApplianceInfoResponse {
    #[serde(default)]
    pub appliance_info: ApplianceInfoBody,
    /// Catch-all for undocumented fields (capability descriptors etc.).
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

/// Static appliance metadata nested in [`ApplianceInfoResponse`].
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApplianceInfoBody {
    #[serde(default)]
    pub serial_number: Option<String>,
    #[serde(default)]
    pub brand: Option<String>,
    #[serde(default)]
    pub device_type: Option<String>,
    #[serde(default)]
    pub model: Option<String>,
    #[serde(default)]
    pub variant: Option<String>,
}

// ── State ────────────────────────────────────────────────────────────

/// Body of `GET appliances/{id}/state`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApplianceStateResponse {
    #[serde(default)]
    pub appliance_id: Option<String>,
    /// `"connected"` / `"disconnected"`; casing varies by backend.
    #[serde(default)]
    pub connection_state: Option<String>,
    #[serde(default)]
    pub properties: StateProperties,
}

impl ApplianceStateResponse {
    /// Whether the cloud reports a live connection to the appliance.
    pub fn is_connected(&self) -> bool {
        self.connection_state
            .as_deref()
            .is_some_and(|s| s.eq_ignore_ascii_case("connected"))
    }
}

/// Property container inside the state body. Only `reported` is read.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StateProperties {
    #[serde(default)]
    pub reported: serde_json::Map<String, serde_json::Value>,
}
