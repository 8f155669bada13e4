//! Bridge logic between `hearth-api` and the message bus.
//!
//! This crate owns the session lifecycle, the appliance data path, and the
//! hub-facing discovery generator:
//!
//! - **[`CredentialManager`]**: Holds the single session per process.
//!   [`ensure_valid()`](CredentialManager::ensure_valid) renews when the access
//!   token is missing or close to expiry; renewal is single-flight and every
//!   new token pair is persisted to the [`SessionStore`] before it is used.
//!
//! - **[`ApplianceGateway`]**: Lists the inventory and fetches info + state
//!   for every appliance concurrently, producing canonical
//!   [`ApplianceRecord`]s. A failure for one appliance becomes a
//!   [`DeviceError`] in its slot without touching the others.
//!
//! - **[`DiscoveryRegistry`]**: Derives discovery documents from a record's
//!   category and capabilities, publishes them once per appliance, and
//!   publishes state payloads every cycle.
//!
//! - **[`Poller`]**: Drives the fetch → register → publish cycle on a timer
//!   with start/stop/shutdown lifecycle and no overlapping cycles.
//!
//! The bus and the cloud API are reached only through the [`Publisher`],
//! [`ApplianceApi`], and [`TokenExchange`] traits.

pub mod config;
pub mod convert;
pub mod credentials;
pub mod discovery;
pub mod error;
pub mod gateway;
pub mod model;
pub mod poller;
pub mod publish;
pub mod sanitize;

// ── Primary re-exports ──────────────────────────────────────────────
pub use config::{BridgeConfig, TlsVerification, TopicConfig};
pub use credentials::{
    CredentialManager, KnownAppliance, PersistedSession, SAFETY_MARGIN, Session, SessionSource,
    SessionStore, TokenExchange,
};
pub use discovery::{Component, DiscoveryDocument, DiscoveryRegistry, derive_documents};
pub use error::{AuthError, CoreError, DeviceError, PersistenceError, PublishError};
pub use gateway::{ApplianceApi, ApplianceGateway, FetchResult};
pub use model::{
    ApplianceIdentity, ApplianceInfo, ApplianceRecord, CapabilityMap, CapabilityValue,
    DeviceCategory,
};
pub use poller::{CycleReport, Poller, PollerState};
pub use publish::Publisher;
