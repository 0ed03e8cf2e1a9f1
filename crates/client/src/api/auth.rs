// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Authentication endpoints: login, logout, and token refresh.

use std::future::Future;
use std::pin::Pin;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::api::{check_status, http_client, ApiClient};
use crate::error::ApiError;
use crate::session::refresh::{RefreshExecutor, RefreshedTokens};
use crate::session::UserProfile;

/// Path of the refresh endpoint, relative to the API base URL.
pub const REFRESH_PATH: &str = "auth/refresh";
pub const LOGIN_PATH: &str = "auth/login/";
pub const LOGOUT_PATH: &str = "auth/logout/";

/// Login credentials.
#[derive(Debug, Clone, Serialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

/// Successful login payload.
#[derive(Debug, Clone, Deserialize)]
pub struct AuthResponse {
    pub access: String,
    pub refresh: String,
    #[serde(default)]
    pub user: Option<UserProfile>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct RefreshRequest<'a> {
    refresh_token: &'a str,
}

/// Refresh endpoint payload. `refresh` is present only when the backend
/// rotates refresh tokens.
#[derive(Debug, Clone, Deserialize)]
pub struct RefreshResponse {
    pub access: String,
    #[serde(default)]
    pub refresh: Option<String>,
}

#[derive(Debug, Serialize)]
struct LogoutRequest<'a> {
    refresh: &'a str,
}

/// Bare transport for the refresh call. It attaches no credentials and never
/// goes through `401` recovery, so a rejected refresh cannot recurse.
#[derive(Debug, Clone)]
pub struct RefreshClient {
    url: String,
    http: reqwest::Client,
}

impl RefreshClient {
    pub fn new(base_url: &str, timeout: Duration) -> Self {
        let url = format!("{}/{REFRESH_PATH}", base_url.trim_end_matches('/'));
        Self { url, http: http_client(timeout) }
    }

    /// Exchange a refresh token for a new access token.
    pub async fn refresh_access(&self, refresh_token: &str) -> Result<RefreshResponse, ApiError> {
        let response = self
            .http
            .post(&self.url)
            .json(&RefreshRequest { refresh_token })
            .send()
            .await
            .map_err(ApiError::from_transport)?;
        let response = check_status(response).await?;
        response.json().await.map_err(|e| ApiError::Decode(e.to_string()))
    }
}

impl RefreshExecutor for RefreshClient {
    fn refresh(
        &self,
        refresh_token: String,
    ) -> Pin<Box<dyn Future<Output = anyhow::Result<RefreshedTokens>> + Send + '_>> {
        Box::pin(async move {
            let body = self.refresh_access(&refresh_token).await?;
            Ok(RefreshedTokens { access: body.access, refresh: body.refresh })
        })
    }
}

impl ApiClient {
    /// Authenticate and install the returned tokens and user.
    pub async fn login(&self, credentials: &LoginRequest) -> Result<Option<UserProfile>, ApiError> {
        let auth: AuthResponse = self.post_json(LOGIN_PATH, credentials).await?;
        if auth.access.is_empty() || auth.refresh.is_empty() {
            return Err(ApiError::Decode("login response is missing tokens".to_owned()));
        }
        let user = auth.user.clone();
        self.session().set_auth(auth.access, auth.refresh, auth.user);
        Ok(user)
    }

    /// Tell the backend (best effort), then clear the local session.
    pub async fn logout(&self) {
        if let Some(refresh) = self.session().refresh_token() {
            let result: Result<serde_json::Value, ApiError> =
                self.post_json(LOGOUT_PATH, &LogoutRequest { refresh: &refresh }).await;
            match result {
                Ok(_) => debug!("backend session revoked"),
                Err(e) => warn!(err = %e, "backend logout failed"),
            }
        }
        self.session().logout();
    }
}
