// ── Credential manager ──
//
// Owns the one session per process. Renewal is single-flight: the
// session lives behind an async mutex and renewal runs while holding it,
// so concurrent callers queue on the lock and pick up the fresh session
// (or the shared failure) instead of spending the refresh token twice.

pub mod store;

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use secrecy::{ExposeSecret, SecretString};
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use hearth_api::{CloudClient, TokenGrant};

use crate::error::AuthError;
use crate::model::ApplianceIdentity;

pub use store::{KnownAppliance, PersistedSession, SessionStore};

/// A session must stay valid at least this long past now to be reused.
pub const SAFETY_MARGIN: Duration = Duration::from_secs(120);

// ── Token exchange seam ─────────────────────────────────────────────

/// Refresh-token exchange against the appliance cloud.
#[async_trait]
pub trait TokenExchange: Send + Sync {
    async fn exchange(&self, refresh_token: &SecretString) -> Result<TokenGrant, hearth_api::Error>;
}

#[async_trait]
impl TokenExchange for CloudClient {
    async fn exchange(&self, refresh_token: &SecretString) -> Result<TokenGrant, hearth_api::Error> {
        self.refresh_token(refresh_token).await
    }
}

// ── Session ─────────────────────────────────────────────────────────

/// Current token pair.
#[derive(Debug, Clone)]
pub struct Session {
    pub access_token: Option<SecretString>,
    /// Always the most recently issued refresh token.
    pub refresh_token: SecretString,
    /// Access token expiry, epoch milliseconds.
    pub expires_at_ms: i64,
}

impl Session {
    fn from_grant(grant: TokenGrant, now: DateTime<Utc>) -> Self {
        let lifetime_ms = grant.expires_in_secs.max(0).saturating_mul(1000);
        Self {
            access_token: Some(grant.access_token),
            refresh_token: grant.refresh_token,
            expires_at_ms: now.timestamp_millis().saturating_add(lifetime_ms),
        }
    }

    fn refresh_only(refresh_token: SecretString) -> Self {
        Self {
            access_token: None,
            refresh_token,
            expires_at_ms: 0,
        }
    }

    /// Whether the access token is usable for at least `margin` past `now`.
    pub fn is_valid_at(&self, now: DateTime<Utc>, margin: Duration) -> bool {
        let margin_ms = i64::try_from(margin.as_millis()).unwrap_or(i64::MAX);
        self.access_token.is_some()
            && self.expires_at_ms > now.timestamp_millis().saturating_add(margin_ms)
    }

    pub fn is_valid_for(&self, margin: Duration) -> bool {
        self.is_valid_at(Utc::now(), margin)
    }

    pub fn expires_at(&self) -> Option<DateTime<Utc>> {
        self.access_token
            .as_ref()
            .and_then(|_| DateTime::from_timestamp_millis(self.expires_at_ms))
    }
}

/// Where the startup session came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionSource {
    /// Session state file.
    Persisted,
    /// Initial refresh token from configuration.
    Configured,
    /// Nothing available; the first renewal will fail.
    Empty,
}

// ── Manager ─────────────────────────────────────────────────────────

#[derive(Default)]
struct CredentialState {
    session: Option<Session>,
    known: Vec<KnownAppliance>,
    last_failure: Option<AuthError>,
}

/// Session lifecycle: acquisition, single-flight renewal, persistence.
pub struct CredentialManager {
    exchange: Arc<dyn TokenExchange>,
    store: SessionStore,
    initial_refresh_token: Option<SecretString>,
    state: Mutex<CredentialState>,
    /// Bumped after every completed renewal attempt.
    generation: AtomicU64,
    renewals: AtomicU64,
}

impl CredentialManager {
    pub fn new(
        exchange: Arc<dyn TokenExchange>,
        store: SessionStore,
        initial_refresh_token: Option<SecretString>,
    ) -> Self {
        Self {
            exchange,
            store,
            initial_refresh_token,
            state: Mutex::new(CredentialState::default()),
            generation: AtomicU64::new(0),
            renewals: AtomicU64::new(0),
        }
    }

    pub fn store(&self) -> &SessionStore {
        &self.store
    }

    /// Load the persisted session, falling back to the configured
    /// initial refresh token. A persisted token always wins.
    pub async fn restore(&self) -> SessionSource {
        let persisted = match self.store.load() {
            Ok(p) => p,
            Err(e) => {
                warn!(error = %e, "could not read session state, ignoring it");
                None
            }
        };

        let mut state = self.state.lock().await;

        if let Some(p) = persisted.filter(|p| !p.refresh_token.is_empty()) {
            state.known = p.appliances.unwrap_or_default();
            state.session = Some(Session {
                access_token: p.access_token.map(SecretString::from),
                refresh_token: SecretString::from(p.refresh_token),
                expires_at_ms: p.token_expiry.unwrap_or(0),
            });
            info!(
                path = %self.store.path().display(),
                known_appliances = state.known.len(),
                "restored persisted session"
            );
            return SessionSource::Persisted;
        }

        if let Some(token) = &self.initial_refresh_token {
            state.session = Some(Session::refresh_only(token.clone()));
            info!("using configured refresh token");
            return SessionSource::Configured;
        }

        warn!("no refresh token in configuration or session state");
        SessionSource::Empty
    }

    /// Return a session valid for at least [`SAFETY_MARGIN`], renewing if
    /// needed.
    pub async fn ensure_valid(&self) -> Result<Session, AuthError> {
        let observed = self.generation.load(Ordering::Acquire);
        let mut state = self.state.lock().await;

        if let Some(session) = state
            .session
            .as_ref()
            .filter(|s| s.is_valid_for(SAFETY_MARGIN))
        {
            return Ok(session.clone());
        }

        // A renewal completed while we waited on the lock: share its
        // outcome, even a grant shorter than the margin, rather than
        // renewing again.
        if self.generation.load(Ordering::Acquire) != observed {
            if let Some(err) = state.last_failure.clone() {
                return Err(err);
            }
            if let Some(session) = state.session.as_ref().filter(|s| s.access_token.is_some()) {
                return Ok(session.clone());
            }
        }

        self.renew_locked(&mut state).await
    }

    /// Exchange the current refresh token for a new pair, unconditionally.
    pub async fn renew(&self) -> Result<Session, AuthError> {
        let mut state = self.state.lock().await;
        self.renew_locked(&mut state).await
    }

    async fn renew_locked(&self, state: &mut CredentialState) -> Result<Session, AuthError> {
        let Some(refresh_token) = self.recover_refresh_token(state) else {
            state.last_failure = Some(AuthError::NoRefreshToken);
            self.generation.fetch_add(1, Ordering::Release);
            return Err(AuthError::NoRefreshToken);
        };

        self.renewals.fetch_add(1, Ordering::Relaxed);
        debug!("renewing session");
        let result = self.exchange.exchange(&refresh_token).await;
        self.generation.fetch_add(1, Ordering::Release);

        match result {
            Ok(grant) => {
                let session = Session::from_grant(grant, Utc::now());
                state.session = Some(session.clone());
                state.last_failure = None;
                self.persist_locked(state);
                info!(
                    expires_at = ?session.expires_at(),
                    "session renewed"
                );
                Ok(session)
            }
            Err(e) => {
                warn!(error = %e, "session renewal failed, clearing tokens");
                state.session = None;
                let err = AuthError::RenewalFailed {
                    message: e.to_string(),
                };
                state.last_failure = Some(err.clone());
                Err(err)
            }
        }
    }

    /// In-memory token, then the state file, then configuration.
    fn recover_refresh_token(&self, state: &CredentialState) -> Option<SecretString> {
        if let Some(session) = &state.session {
            return Some(session.refresh_token.clone());
        }

        match self.store.load() {
            Ok(Some(p)) if !p.refresh_token.is_empty() => {
                debug!("recovered refresh token from session state");
                return Some(SecretString::from(p.refresh_token));
            }
            Ok(_) => {}
            Err(e) => warn!(error = %e, "could not read session state"),
        }

        self.initial_refresh_token.clone()
    }

    /// Mark the access token as expired, keeping the refresh token.
    ///
    /// Called when the cloud answers 401 so the next cycle renews instead
    /// of replaying a revoked token.
    pub async fn invalidate_access_token(&self) {
        let mut state = self.state.lock().await;
        if let Some(session) = state.session.as_mut() {
            session.access_token = None;
            session.expires_at_ms = 0;
            debug!("access token invalidated");
            self.persist_locked(&state);
        }
    }

    /// Record the latest inventory listing and persist it.
    pub async fn remember_appliances(&self, appliances: &[ApplianceIdentity]) {
        let mut state = self.state.lock().await;
        state.known = appliances.iter().map(KnownAppliance::from).collect();
        self.persist_locked(&state);
    }

    /// Last successful inventory listing (possibly from a previous run).
    pub async fn known_appliances(&self) -> Vec<KnownAppliance> {
        self.state.lock().await.known.clone()
    }

    /// Snapshot of the current session, if any.
    pub async fn session(&self) -> Option<Session> {
        self.state.lock().await.session.clone()
    }

    /// Number of token exchanges attempted.
    pub fn renewal_count(&self) -> u64 {
        self.renewals.load(Ordering::Relaxed)
    }

    /// Write state to disk. Failures are logged; in-memory state stands.
    fn persist_locked(&self, state: &CredentialState) {
        let Some(session) = &state.session else {
            return;
        };

        let persisted = PersistedSession {
            refresh_token: session.refresh_token.expose_secret().to_owned(),
            access_token: session
                .access_token
                .as_ref()
                .map(|t| t.expose_secret().to_owned()),
            token_expiry: session.access_token.as_ref().map(|_| session.expires_at_ms),
            appliances: Some(state.known.clone()),
            updated_at: Utc::now(),
        };

        if let Err(e) = self.store.save(&persisted) {
            warn!(error = %e, "failed to persist session state");
        }
    }
}
