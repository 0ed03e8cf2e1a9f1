// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Rentdesk: authenticated API client for the rental back office.
//!
//! The [`session::Session`] owns the access/refresh token pair. The
//! [`api::ApiClient`] attaches it to outgoing requests and recovers from
//! expired credentials through a single shared refresh.

pub mod api;
pub mod cli;
pub mod config;
pub mod error;
pub mod session;

use std::sync::Once;

static CRYPTO_INIT: Once = Once::new();

/// Install the ring crypto provider for reqwest/rustls.
/// Safe to call multiple times; only the first call has effect.
pub fn ensure_crypto() {
    CRYPTO_INIT.call_once(|| {
        let _ = rustls::crypto::ring::default_provider().install_default();
    });
}
