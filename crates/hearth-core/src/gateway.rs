// ── Appliance gateway ──
//
// Fetches the inventory and per-appliance info/state, normalizes them into
// canonical records, and contains per-appliance failures. Authentication
// always goes through the credential manager first.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use futures_util::future::join_all;
use secrecy::SecretString;
use tracing::{debug, warn};

use hearth_api::{ApplianceInfoResponse, ApplianceStateResponse, ApplianceSummary, CloudClient};

use crate::convert::build_record;
use crate::credentials::CredentialManager;
use crate::error::{AuthError, CoreError, DeviceError};
use crate::model::{ApplianceIdentity, ApplianceRecord};

// ── Appliance API seam ──────────────────────────────────────────────

/// Read-only appliance endpoints of the cloud API.
#[async_trait]
pub trait ApplianceApi: Send + Sync {
    async fn list_appliances(
        &self,
        access_token: &SecretString,
    ) -> Result<Vec<ApplianceSummary>, hearth_api::Error>;

    async fn appliance_info(
        &self,
        access_token: &SecretString,
        appliance_id: &str,
    ) -> Result<ApplianceInfoResponse, hearth_api::Error>;

    async fn appliance_state(
        &self,
        access_token: &SecretString,
        appliance_id: &str,
    ) -> Result<ApplianceStateResponse, hearth_api::Error>;
}

#[async_trait]
impl ApplianceApi for CloudClient {
    async fn list_appliances(
        &self,
        access_token: &SecretString,
    ) -> Result<Vec<ApplianceSummary>, hearth_api::Error> {
        CloudClient::list_appliances(self, access_token).await
    }

    async fn appliance_info(
        &self,
        access_token: &SecretString,
        appliance_id: &str,
    ) -> Result<ApplianceInfoResponse, hearth_api::Error> {
        self.get_appliance_info(access_token, appliance_id).await
    }

    async fn appliance_state(
        &self,
        access_token: &SecretString,
        appliance_id: &str,
    ) -> Result<ApplianceStateResponse, hearth_api::Error> {
        self.get_appliance_state(access_token, appliance_id).await
    }
}

// ── Gateway ─────────────────────────────────────────────────────────

/// Outcome for one appliance in a cycle.
pub type FetchResult = Result<ApplianceRecord, DeviceError>;

pub struct ApplianceGateway {
    api: Arc<dyn ApplianceApi>,
    credentials: Arc<CredentialManager>,
}

impl ApplianceGateway {
    pub fn new(api: Arc<dyn ApplianceApi>, credentials: Arc<CredentialManager>) -> Self {
        Self { api, credentials }
    }

    pub fn credentials(&self) -> &Arc<CredentialManager> {
        &self.credentials
    }

    /// Fetch the account's inventory. Any failure is fatal for the cycle.
    pub async fn list_appliances(&self) -> Result<Vec<ApplianceIdentity>, CoreError> {
        let session = self.credentials.ensure_valid().await?;
        let Some(token) = session.access_token else {
            return Err(AuthError::Rejected.into());
        };

        let identities: Vec<ApplianceIdentity> = match self.api.list_appliances(&token).await {
            Ok(list) => list.into_iter().map(ApplianceIdentity::from).collect(),
            Err(e) if e.is_auth_expired() => {
                self.credentials.invalidate_access_token().await;
                return Err(AuthError::Rejected.into());
            }
            Err(e) => return Err(e.into()),
        };

        debug!(count = identities.len(), "inventory listed");
        self.credentials.remember_appliances(&identities).await;
        Ok(identities)
    }

    /// Fetch every appliance's info and state concurrently.
    ///
    /// Results keep inventory order. A failure for one appliance becomes a
    /// [`DeviceError`] in its slot and leaves the others untouched.
    pub async fn fetch_all(&self) -> Result<Vec<FetchResult>, CoreError> {
        let identities = self.list_appliances().await?;
        if identities.is_empty() {
            return Ok(Vec::new());
        }

        // list_appliances just validated the session; reuse it.
        let session = self.credentials.ensure_valid().await?;
        let Some(token) = session.access_token else {
            return Err(AuthError::Rejected.into());
        };

        let futures = identities
            .into_iter()
            .map(|identity| self.fetch_one(identity, &token));
        let results = join_all(futures).await;

        if results
            .iter()
            .any(|r| matches!(r, Err((_, true))))
        {
            self.credentials.invalidate_access_token().await;
        }

        Ok(results
            .into_iter()
            .map(|r| r.map_err(|(err, _)| err))
            .collect())
    }

    /// Info and state for one appliance. The error side carries whether
    /// the failure was an expired session.
    async fn fetch_one(
        &self,
        identity: ApplianceIdentity,
        token: &SecretString,
    ) -> Result<ApplianceRecord, (DeviceError, bool)> {
        let fetched = tokio::try_join!(
            self.api.appliance_info(token, &identity.id),
            self.api.appliance_state(token, &identity.id),
        );

        match fetched {
            Ok((info, state)) => Ok(build_record(identity, info, state, Utc::now())),
            Err(e) => {
                warn!(appliance_id = %identity.id, error = %e, "appliance fetch failed");
                let auth_expired = e.is_auth_expired();
                Err((
                    DeviceError {
                        name: identity.display_name().to_owned(),
                        appliance_id: identity.id,
                        message: e.to_string(),
                    },
                    auth_expired,
                ))
            }
        }
    }
}
