// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Session token store: the access/refresh pair, the cached user, and both
//! refresh paths (reactive single-flight and proactive pre-expiry timer).
//!
//! One [`Session`] is built per process and handed to every component that
//! needs it. All token mutations go through it.

pub mod claims;
pub mod refresh;
pub mod scheduler;
pub mod storage;

use std::sync::{Arc, Weak};
use std::time::{Duration, SystemTime};

use parking_lot::{Mutex, RwLock};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::session::refresh::{RefreshExecutor, RefreshGate, RefreshedTokens};
use crate::session::scheduler::Scheduler;
use crate::session::storage::{PersistedSession, SessionStorage};

/// Identity of the signed-in back-office user, as returned by login.
#[derive(Debug, Default, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct UserProfile {
    pub id: u64,
    pub username: String,
    pub email: String,
    pub is_email_validated: bool,
    pub role: String,
    pub document_type: String,
    pub document_number: String,
    pub name: String,
    pub birth_date: String,
    pub phone_number: String,
    pub is_active: bool,
}

/// Read-only view of the session.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct SessionSnapshot {
    pub access_token: Option<String>,
    pub refresh_token: Option<String>,
    pub user: Option<UserProfile>,
    pub is_hydrated: bool,
}

impl SessionSnapshot {
    fn record(&self) -> Option<PersistedSession> {
        let access = self.access_token.clone()?;
        Some(PersistedSession {
            access,
            refresh: self.refresh_token.clone(),
            user: self.user.clone(),
        })
    }

    fn clear(&mut self) {
        self.access_token = None;
        self.refresh_token = None;
        self.user = None;
    }
}

/// Where a timer arming comes from. Only a fresh login or a restored
/// session may fire at once; re-arming after a refresh is floored.
#[derive(Debug, Clone, Copy)]
enum Arming {
    Initial,
    AfterRefresh,
}

struct Inner {
    state: Mutex<SessionSnapshot>,
    storage: Arc<dyn SessionStorage>,
    scheduler: Scheduler,
    gate: RefreshGate,
    refresher: RwLock<Option<Arc<dyn RefreshExecutor>>>,
    lead: Duration,
}

/// Shared handle to the process session. Cloning is cheap.
#[derive(Clone)]
pub struct Session {
    inner: Arc<Inner>,
}

impl std::fmt::Debug for Session {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = self.inner.state.lock();
        f.debug_struct("Session")
            .field("authenticated", &state.access_token.is_some())
            .field("is_hydrated", &state.is_hydrated)
            .finish()
    }
}

impl Session {
    /// Create an empty, not yet hydrated session.
    ///
    /// `lead` is how long before access token expiry the proactive refresh
    /// fires.
    pub fn new(storage: Arc<dyn SessionStorage>, lead: Duration) -> Self {
        Self {
            inner: Arc::new(Inner {
                state: Mutex::new(SessionSnapshot::default()),
                storage,
                scheduler: Scheduler::new(),
                gate: RefreshGate::new(),
                refresher: RwLock::new(None),
                lead,
            }),
        }
    }

    /// Load the persisted record once. Missing or unreadable records leave
    /// the session cleared; hydration is marked complete either way.
    pub fn hydrate(&self) {
        let access = {
            let mut state = self.inner.state.lock();
            if state.is_hydrated {
                return;
            }
            match self.inner.storage.load() {
                Ok(Some(record)) if !record.access.is_empty() => {
                    state.access_token = Some(record.access);
                    state.refresh_token = record.refresh.filter(|r| !r.is_empty());
                    state.user = record.user;
                    debug!("session hydrated from storage");
                }
                Ok(Some(_)) => {
                    warn!("persisted session has no access token, ignoring");
                    state.clear();
                }
                Ok(None) => {
                    debug!("no persisted session");
                }
                Err(e) => {
                    warn!(err = %e, "session hydration failed");
                    state.clear();
                }
            }
            state.is_hydrated = true;
            state.access_token.clone()
        };

        if let Some(access) = access {
            self.arm_proactive_refresh(&access, Arming::Initial);
        }
    }

    /// Install a fresh login: tokens and user together.
    pub fn set_auth(&self, access: String, refresh: String, user: Option<UserProfile>) {
        {
            let mut state = self.inner.state.lock();
            state.access_token = Some(access.clone());
            state.refresh_token = Some(refresh);
            state.user = user;
            self.persist(&state);
        }
        info!("session authenticated");
        self.arm_proactive_refresh(&access, Arming::Initial);
    }

    /// Apply a refresh result. The refresh token is replaced only when a new
    /// one is supplied.
    pub fn set_tokens(&self, access: String, refresh: Option<String>) {
        {
            let mut state = self.inner.state.lock();
            state.access_token = Some(access.clone());
            if let Some(refresh) = refresh {
                state.refresh_token = Some(refresh);
            }
            self.persist(&state);
        }
        debug!("session tokens updated");
        self.arm_proactive_refresh(&access, Arming::AfterRefresh);
    }

    /// Clear everything: tokens, user, pending timer, persisted record.
    /// Calling it while logged out is harmless.
    pub fn logout(&self) {
        self.inner.scheduler.cancel();
        let was_authenticated = {
            let mut state = self.inner.state.lock();
            let was = state.access_token.is_some() || state.refresh_token.is_some();
            state.clear();
            if let Err(e) = self.inner.storage.clear() {
                warn!(err = %e, "failed to remove persisted session");
            }
            was
        };
        if was_authenticated {
            info!("session cleared");
        }
    }

    /// `Bearer <access>` for the current access token, if any.
    pub fn auth_header(&self) -> Option<String> {
        self.access_token().map(|token| format!("Bearer {token}"))
    }

    pub fn access_token(&self) -> Option<String> {
        self.inner.state.lock().access_token.clone()
    }

    pub fn refresh_token(&self) -> Option<String> {
        self.inner.state.lock().refresh_token.clone()
    }

    pub fn user(&self) -> Option<UserProfile> {
        self.inner.state.lock().user.clone()
    }

    pub fn is_hydrated(&self) -> bool {
        self.inner.state.lock().is_hydrated
    }

    pub fn is_authenticated(&self) -> bool {
        self.inner.state.lock().access_token.is_some()
    }

    pub fn snapshot(&self) -> SessionSnapshot {
        self.inner.state.lock().clone()
    }

    /// Expiry of the current access token, if it carries a readable claim.
    pub fn access_expiry(&self) -> Option<SystemTime> {
        self.access_token().as_deref().and_then(claims::token_expiry)
    }

    /// Whether a proactive refresh is currently scheduled.
    pub fn has_pending_refresh_timer(&self) -> bool {
        self.inner.scheduler.is_pending()
    }

    /// Number of refresh attempts started (reactive and proactive).
    pub fn refresh_attempts(&self) -> u64 {
        self.inner.gate.flights_started()
    }

    /// Register the executor used by both refresh paths.
    pub fn register_refresher(&self, refresher: Arc<dyn RefreshExecutor>) {
        *self.inner.refresher.write() = Some(refresher);
    }

    /// Obtain a fresh access token through the single-flight gate.
    ///
    /// Concurrent callers share one refresh. Returns `None` when no token
    /// could be obtained; failures are logged, never raised. Tokens are
    /// stored before any caller sees the result.
    pub async fn refresh(&self) -> Option<String> {
        let session = self.clone();
        let outcome = self.inner.gate.join_or_start(async move { session.run_refresh().await });
        outcome.await
    }

    /// Wait for background refresh work that is already due or running, so
    /// rotated tokens are stored before a short-lived process exits.
    pub async fn settle(&self) {
        self.inner.scheduler.wait_due().await;
        let flight = self.inner.gate.in_flight();
        if let Some(outcome) = flight {
            outcome.await;
        }
    }

    async fn run_refresh(&self) -> Option<String> {
        let Some(refresh_token) = self.refresh_token().filter(|t| !t.is_empty()) else {
            debug!("no refresh token, skipping refresh");
            return None;
        };
        let Some(refresher) = self.inner.refresher.read().clone() else {
            warn!("no refresh executor registered");
            return None;
        };

        match refresher.refresh(refresh_token.clone()).await {
            Ok(RefreshedTokens { access, .. }) if access.is_empty() => {
                warn!("refresh returned an empty access token");
                self.superseded_access(&refresh_token)
            }
            Ok(RefreshedTokens { access, refresh }) => {
                let refresh = refresh.filter(|r| !r.is_empty());
                if let Err(current) = self.apply_refresh(&refresh_token, &access, refresh) {
                    debug!("session changed during refresh, result discarded");
                    return current;
                }
                info!("access token refreshed");
                self.arm_proactive_refresh(&access, Arming::AfterRefresh);
                Some(access)
            }
            Err(e) => {
                warn!(err = %e, "token refresh failed");
                self.superseded_access(&refresh_token)
            }
        }
    }

    /// Store a refresh result only if the session still holds the refresh
    /// token it was obtained with. A logout or new login during the flight
    /// wins; the error carries the access token now in place, if any.
    fn apply_refresh(
        &self,
        used: &str,
        access: &str,
        refresh: Option<String>,
    ) -> Result<(), Option<String>> {
        let mut state = self.inner.state.lock();
        if state.refresh_token.as_deref() != Some(used) {
            return Err(state.access_token.clone());
        }
        state.access_token = Some(access.to_owned());
        if let Some(refresh) = refresh {
            state.refresh_token = Some(refresh);
        }
        self.persist(&state);
        Ok(())
    }

    /// After a failed flight: the access token of a session that replaced
    /// the one the flight started from. `None` while that session is
    /// still current, so the failure stands.
    fn superseded_access(&self, used: &str) -> Option<String> {
        let state = self.inner.state.lock();
        if state.refresh_token.as_deref() == Some(used) {
            return None;
        }
        debug!("session changed during failed refresh");
        state.access_token.clone()
    }

    /// Write the current state under the state lock so the stored record
    /// never lags a newer mutation.
    fn persist(&self, state: &SessionSnapshot) {
        let result = match state.record() {
            Some(record) => self.inner.storage.save(&record),
            None => self.inner.storage.clear(),
        };
        if let Err(e) = result {
            warn!(err = %e, "failed to persist session");
        }
    }

    /// (Re)arm the proactive timer for `access`. Tokens without a readable
    /// expiry leave no timer; the reactive path covers them.
    fn arm_proactive_refresh(&self, access: &str, arming: Arming) {
        let Some(expiry) = claims::token_expiry(access) else {
            debug!("access token has no readable expiry, proactive refresh disabled");
            self.inner.scheduler.cancel();
            return;
        };
        let now = SystemTime::now();
        let delay = match arming {
            Arming::Initial => claims::refresh_delay(expiry, now, self.inner.lead),
            Arming::AfterRefresh => claims::rearm_delay(expiry, now, self.inner.lead),
        };
        let weak = Arc::downgrade(&self.inner);
        if self.inner.scheduler.schedule(delay, proactive_refresh(weak)).is_some() {
            debug!(delay_secs = delay.as_secs(), "proactive refresh scheduled");
        }
    }
}

async fn proactive_refresh(inner: Weak<Inner>) {
    let Some(inner) = inner.upgrade() else {
        return;
    };
    let session = Session { inner };
    let has_refresh = session.refresh_token().is_some_and(|t| !t.is_empty());
    if !has_refresh || session.inner.refresher.read().is_none() {
        debug!("proactive refresh skipped");
        return;
    }
    if session.refresh().await.is_none() {
        debug!("proactive refresh failed, leaving recovery to the next request");
    }
}

#[cfg(test)]
#[path = "mod_tests.rs"]
mod tests;
