// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Single-flight token refresh.
//!
//! The gate is either `Idle` or holding one in-flight refresh whose outcome
//! every concurrent caller shares. The check and the transition happen under
//! one synchronous lock, so two callers can never both start a refresh.

use std::future::Future;
use std::pin::Pin;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use futures_util::future::{BoxFuture, FutureExt, Shared};
use parking_lot::Mutex;
use tracing::warn;

/// Tokens returned by the refresh endpoint.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RefreshedTokens {
    pub access: String,
    /// Present only when the backend rotates refresh tokens.
    pub refresh: Option<String>,
}

/// Exchanges a refresh token for a new access token.
pub trait RefreshExecutor: Send + Sync + 'static {
    fn refresh(
        &self,
        refresh_token: String,
    ) -> Pin<Box<dyn Future<Output = anyhow::Result<RefreshedTokens>> + Send + '_>>;
}

/// Shared outcome of one refresh: the new access token, or `None`.
pub type RefreshOutcome = Shared<BoxFuture<'static, Option<String>>>;

enum FlightState {
    Idle,
    InFlight { id: u64, outcome: RefreshOutcome },
}

/// Resets the gate to `Idle` when its flight finishes, even by panic.
struct FlightGuard {
    slot: Arc<Mutex<FlightState>>,
    id: u64,
}

impl Drop for FlightGuard {
    fn drop(&mut self) {
        let mut state = self.slot.lock();
        if matches!(*state, FlightState::InFlight { id, .. } if id == self.id) {
            *state = FlightState::Idle;
        }
    }
}

/// Admits at most one refresh at a time.
pub struct RefreshGate {
    state: Arc<Mutex<FlightState>>,
    started: AtomicU64,
}

impl Default for RefreshGate {
    fn default() -> Self {
        Self { state: Arc::new(Mutex::new(FlightState::Idle)), started: AtomicU64::new(0) }
    }
}

impl RefreshGate {
    pub fn new() -> Self {
        Self::default()
    }

    /// Join the in-flight refresh, or start `work` as a new one.
    ///
    /// `work` runs on its own task, so it completes even if every waiter is
    /// dropped. The gate is back to `Idle` before the outcome is published.
    /// Must be called from within a tokio runtime.
    pub fn join_or_start<F>(&self, work: F) -> RefreshOutcome
    where
        F: Future<Output = Option<String>> + Send + 'static,
    {
        let mut state = self.state.lock();
        if let FlightState::InFlight { outcome, .. } = &*state {
            return outcome.clone();
        }

        let id = self.started.fetch_add(1, Ordering::Relaxed) + 1;
        let guard = FlightGuard { slot: Arc::clone(&self.state), id };
        let task = tokio::spawn(async move {
            let _guard = guard;
            work.await
        });
        let outcome = async move {
            match task.await {
                Ok(token) => token,
                Err(e) => {
                    warn!(err = %e, "refresh task failed");
                    None
                }
            }
        }
        .boxed()
        .shared();

        *state = FlightState::InFlight { id, outcome: outcome.clone() };
        outcome
    }

    /// The outcome of the refresh currently running, if any.
    pub fn in_flight(&self) -> Option<RefreshOutcome> {
        match &*self.state.lock() {
            FlightState::InFlight { outcome, .. } => Some(outcome.clone()),
            FlightState::Idle => None,
        }
    }

    pub fn is_in_flight(&self) -> bool {
        matches!(*self.state.lock(), FlightState::InFlight { .. })
    }

    /// Number of refreshes started since creation.
    pub fn flights_started(&self) -> u64 {
        self.started.load(Ordering::Relaxed)
    }
}

#[cfg(test)]
#[path = "refresh_tests.rs"]
mod tests;
