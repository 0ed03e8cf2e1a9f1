// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Authenticated HTTP transport.
//!
//! Every request gets the session's current bearer token attached at
//! dispatch time. A `401` triggers one shared refresh and a single retry of
//! the original request; anything else propagates unchanged.

pub mod auth;
pub mod endpoints;

use std::sync::Arc;
use std::time::Duration;

use reqwest::header::{HeaderValue, AUTHORIZATION};
use reqwest::{Method, Request, Response, Url};
use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::{debug, info};

use crate::api::auth::RefreshClient;
use crate::config::ClientConfig;
use crate::error::ApiError;
use crate::session::storage::FileStorage;
use crate::session::Session;

/// Build a reqwest client with the given transport timeout.
pub(crate) fn http_client(timeout: Duration) -> reqwest::Client {
    crate::ensure_crypto();
    reqwest::Client::builder().timeout(timeout).build().unwrap_or_default()
}

/// Authenticated API client. Cloning shares the connection pool and session.
#[derive(Debug, Clone)]
pub struct ApiClient {
    base_url: String,
    http: reqwest::Client,
    session: Session,
}

impl ApiClient {
    pub fn new(base_url: impl Into<String>, session: Session, timeout: Duration) -> Self {
        let base_url = base_url.into().trim_end_matches('/').to_owned();
        Self { base_url, http: http_client(timeout), session }
    }

    /// Wire a hydrated session, the refresh transport, and the client from
    /// configuration.
    pub fn from_config(config: &ClientConfig) -> Self {
        let storage = Arc::new(FileStorage::new(config.session_path()));
        let session = Session::new(storage, config.refresh_lead());
        let refresher = RefreshClient::new(config.base_url(), config.request_timeout());
        session.register_refresher(Arc::new(refresher));
        session.hydrate();
        Self::new(config.base_url(), session, config.request_timeout())
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Absolute URL for an API path.
    pub fn url(&self, path: &str) -> Result<Url, ApiError> {
        let raw = format!("{}/{}", self.base_url, path.trim_start_matches('/'));
        Url::parse(&raw).map_err(|e| ApiError::Request(format!("{raw}: {e}")))
    }

    /// Start a request for `path`. Auth is added later, at dispatch.
    pub fn request(&self, method: Method, path: &str) -> Result<reqwest::RequestBuilder, ApiError> {
        Ok(self.http.request(method, self.url(path)?))
    }

    pub async fn get_json<T: DeserializeOwned>(&self, path: &str) -> Result<T, ApiError> {
        let request = self.request(Method::GET, path)?;
        self.send_json(request).await
    }

    pub async fn post_json<B, T>(&self, path: &str, body: &B) -> Result<T, ApiError>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        let request = self.request(Method::POST, path)?.json(body);
        self.send_json(request).await
    }

    /// Send a built request and decode a JSON body. An empty body decodes
    /// as JSON `null`.
    pub async fn send_json<T: DeserializeOwned>(
        &self,
        request: reqwest::RequestBuilder,
    ) -> Result<T, ApiError> {
        let request = request.build().map_err(ApiError::from_transport)?;
        let response = self.execute(request).await?;
        let bytes = response.bytes().await.map_err(ApiError::from_transport)?;
        let value = if bytes.is_empty() { b"null".as_slice() } else { &bytes };
        serde_json::from_slice(value).map_err(|e| ApiError::Decode(e.to_string()))
    }

    /// Dispatch with authentication and one-shot `401` recovery.
    ///
    /// Returns the successful response, or the error of the last attempt.
    /// When recovery cannot obtain a token the session is terminated and the
    /// original `401` is returned.
    pub async fn execute(&self, request: Request) -> Result<Response, ApiError> {
        let replay = request.try_clone();
        let sent = self.dispatch(request, None).await;

        let err = match sent {
            Ok(response) => return Ok(response),
            Err(err) if !err.is_unauthorized() => return Err(err),
            Err(err) => err,
        };
        let Some(replay) = replay else {
            debug!("request body cannot be replayed, not retrying");
            return Err(err);
        };

        debug!(url = %replay.url(), "unauthorized, recovering session");
        let Some(token) = self.session.refresh().await else {
            info!("session could not be recovered, signing out");
            self.session.logout();
            return Err(err);
        };

        // Second 401 (or any other failure) ends here: retried once already.
        self.dispatch(replay, Some(token)).await
    }

    /// Send once. `token` overrides the session's token (used for the retry,
    /// which must carry the token the refresh produced).
    async fn dispatch(
        &self,
        mut request: Request,
        token: Option<String>,
    ) -> Result<Response, ApiError> {
        let header = match token {
            Some(token) => Some(format!("Bearer {token}")),
            None => self.session.auth_header(),
        };
        if let Some(header) = header {
            let value = HeaderValue::from_str(&header)
                .map_err(|e| ApiError::Request(format!("authorization header: {e}")))?;
            request.headers_mut().insert(AUTHORIZATION, value);
        }

        let response = self.http.execute(request).await.map_err(ApiError::from_transport)?;
        check_status(response).await
    }
}

/// Turn a non-success response into [`ApiError::Status`].
pub(crate) async fn check_status(response: Response) -> Result<Response, ApiError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body = response.text().await.unwrap_or_default();
    Err(ApiError::Status { status: status.as_u16(), body })
}
