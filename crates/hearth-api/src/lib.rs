// hearth-api: Async Rust client for the appliance cloud REST API
//
// Covers the three surfaces the bridge needs: refresh-token exchange,
// appliance inventory, and per-appliance info/state reads. Everything
// above raw HTTP (session lifetime, persistence, fan-out) lives in
// `hearth-core`.

pub mod appliances;
pub mod auth;
pub mod client;
pub mod error;
pub mod models;
pub mod transport;

pub use auth::TokenGrant;
pub use client::CloudClient;
pub use error::Error;
pub use models::{ApplianceInfoBody, ApplianceInfoResponse, ApplianceStateResponse, ApplianceSummary};
pub use transport::{TlsMode, TransportConfig};
