// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Unverified reading of the access token's `exp` claim.
//!
//! The client never validates signatures; it only needs to know when the
//! backend will start rejecting the token.

use std::time::{Duration, SystemTime, UNIX_EPOCH};

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use serde::Deserialize;
use serde_json::Value;

#[derive(Debug, Deserialize)]
struct ExpiryClaim {
    #[serde(default)]
    exp: Option<Value>,
}

/// Expiry time embedded in a JWT-shaped access token, if decodable.
pub fn token_expiry(token: &str) -> Option<SystemTime> {
    let mut segments = token.split('.');
    let (_header, payload) = (segments.next()?, segments.next()?);
    // Signature segment must be present, even if empty.
    segments.next()?;

    let bytes = URL_SAFE_NO_PAD.decode(payload.trim_end_matches('=')).ok()?;
    let claim: ExpiryClaim = serde_json::from_slice(&bytes).ok()?;
    let secs = match claim.exp? {
        Value::Number(n) => n
            .as_u64()
            .or_else(|| n.as_f64().filter(|f| f.is_finite() && *f >= 0.0).map(|f| f as u64))?,
        _ => return None,
    };
    UNIX_EPOCH.checked_add(Duration::from_secs(secs))
}

/// Delay until `lead` before `expiry`, clamped to zero when already inside
/// the lead window (or past expiry).
pub fn refresh_delay(expiry: SystemTime, now: SystemTime, lead: Duration) -> Duration {
    expiry
        .checked_sub(lead)
        .and_then(|fire_at| fire_at.duration_since(now).ok())
        .unwrap_or(Duration::ZERO)
}

/// Shortest delay between a refresh and the next proactive one.
pub const MIN_REARM_DELAY: Duration = Duration::from_secs(5);

/// Delay for re-arming right after a refresh. A token that is already
/// inside the lead window waits half its remaining lifetime, never less
/// than [`MIN_REARM_DELAY`], instead of firing again at once.
pub fn rearm_delay(expiry: SystemTime, now: SystemTime, lead: Duration) -> Duration {
    let delay = refresh_delay(expiry, now, lead);
    if !delay.is_zero() {
        return delay;
    }
    let remaining = expiry.duration_since(now).unwrap_or(Duration::ZERO);
    (remaining / 2).max(MIN_REARM_DELAY)
}

#[cfg(test)]
#[path = "claims_tests.rs"]
mod tests;
