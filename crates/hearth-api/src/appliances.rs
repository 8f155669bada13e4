// Appliance read endpoints
//
// Inventory listing plus per-appliance info and state. All three require
// a bearer access token obtained through `refresh_token`.

use secrecy::SecretString;
use tracing::debug;

use crate::client::CloudClient;
use crate::error::Error;
use crate::models::{ApplianceInfoResponse, ApplianceStateResponse, ApplianceSummary};

impl CloudClient {
    /// List every appliance registered to the account.
    ///
    /// `GET appliances`
    pub async fn list_appliances(
        &self,
        access_token: &SecretString,
    ) -> Result<Vec<ApplianceSummary>, Error> {
        let url = self.url("appliances")?;
        debug!("listing appliances");
        self.get_authed(url, access_token).await
    }

    /// Static metadata for one appliance.
    ///
    /// `GET appliances/{id}/info`
    pub async fn get_appliance_info(
        &self,
        access_token: &SecretString,
        appliance_id: &str,
    ) -> Result<ApplianceInfoResponse, Error> {
        let url = self.appliance_url(appliance_id, "info")?;
        debug!(appliance_id, "fetching appliance info");
        self.get_authed(url, access_token).await
    }

    /// Current reported state for one appliance.
    ///
    /// `GET appliances/{id}/state`
    pub async fn get_appliance_state(
        &self,
        access_token: &SecretString,
        appliance_id: &str,
    ) -> Result<ApplianceStateResponse, Error> {
        let url = self.appliance_url(appliance_id, "state")?;
        debug!(appliance_id, "fetching appliance state");
        self.get_authed(url, access_token).await
    }
}
