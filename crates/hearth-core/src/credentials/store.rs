// ── Durable session state ──
//
// JSON file holding the latest refresh token (single-use, so it must
// survive restarts), the current access token with its expiry, and the
// last successful inventory listing. Written via temp file + rename with
// mode 0600 on Unix.

use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::PersistenceError;
use crate::model::ApplianceIdentity;

/// On-disk layout of the session state file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PersistedSession {
    pub refresh_token: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub access_token: Option<String>,
    /// Access token expiry, epoch milliseconds.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub token_expiry: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub appliances: Option<Vec<KnownAppliance>>,
    pub updated_at: DateTime<Utc>,
}

impl PersistedSession {
    pub fn token_expiry_at(&self) -> Option<DateTime<Utc>> {
        self.token_expiry.and_then(DateTime::from_timestamp_millis)
    }
}

/// Inventory entry remembered across restarts.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct KnownAppliance {
    pub appliance_id: String,
    #[serde(default)]
    pub appliance_name: String,
}

impl From<&ApplianceIdentity> for KnownAppliance {
    fn from(identity: &ApplianceIdentity) -> Self {
        Self {
            appliance_id: identity.id.clone(),
            appliance_name: identity.name.clone(),
        }
    }
}

/// File-backed store for [`PersistedSession`].
#[derive(Debug, Clone)]
pub struct SessionStore {
    path: PathBuf,
}

impl SessionStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Read the state file. A missing file is `Ok(None)`.
    pub fn load(&self) -> Result<Option<PersistedSession>, PersistenceError> {
        let data = match std::fs::read_to_string(&self.path) {
            Ok(data) => data,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(source) => {
                return Err(PersistenceError::Io {
                    action: "read",
                    path: self.path.clone(),
                    source,
                });
            }
        };

        serde_json::from_str(&data)
            .map(Some)
            .map_err(|source| PersistenceError::Corrupt {
                path: self.path.clone(),
                source,
            })
    }

    /// Atomically replace the state file.
    pub fn save(&self, session: &PersistedSession) -> Result<(), PersistenceError> {
        let io_err = |action: &'static str, path: &Path| {
            let path = path.to_path_buf();
            move |source: std::io::Error| PersistenceError::Io {
                action,
                path,
                source,
            }
        };

        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(io_err("create directory for", parent))?;
        }

        let data = serde_json::to_string_pretty(session).map_err(PersistenceError::Encode)?;

        let mut tmp = self.path.clone().into_os_string();
        tmp.push(".tmp");
        let tmp = PathBuf::from(tmp);

        std::fs::write(&tmp, data).map_err(io_err("write", &tmp))?;

        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            std::fs::set_permissions(&tmp, std::fs::Permissions::from_mode(0o600))
                .map_err(io_err("set permissions on", &tmp))?;
        }

        std::fs::rename(&tmp, &self.path).map_err(io_err("replace", &self.path))?;
        debug!(path = %self.path.display(), "session state saved");
        Ok(())
    }
}
