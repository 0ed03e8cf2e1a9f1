// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use std::fmt;

/// Errors surfaced to callers of the authenticated API client.
///
/// Only a received `401` counts as an authentication failure; a request that
/// never got a response is always [`ApiError::Network`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ApiError {
    /// No response was received (connect, timeout, or body read failure).
    Network(String),
    /// The backend answered with a non-success status.
    Status { status: u16, body: String },
    /// A success response whose body did not match the expected shape.
    Decode(String),
    /// The request could not be built.
    Request(String),
}

impl ApiError {
    /// HTTP status of the failed response, if one was received.
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Status { status, .. } => Some(*status),
            _ => None,
        }
    }

    pub fn is_unauthorized(&self) -> bool {
        self.status() == Some(401)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Network(_) => "NETWORK",
            Self::Status { status: 401, .. } => "UNAUTHORIZED",
            Self::Status { .. } => "HTTP_STATUS",
            Self::Decode(_) => "DECODE",
            Self::Request(_) => "REQUEST",
        }
    }

    /// Classify a transport error from reqwest.
    pub fn from_transport(err: reqwest::Error) -> Self {
        if err.is_builder() {
            return Self::Request(err.to_string());
        }
        if let Some(status) = err.status() {
            return Self::Status { status: status.as_u16(), body: String::new() };
        }
        if err.is_decode() {
            return Self::Decode(err.to_string());
        }
        Self::Network(err.to_string())
    }
}

impl fmt::Display for ApiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Network(msg) => write!(f, "network error: {msg}"),
            Self::Status { status, body } if body.is_empty() => write!(f, "HTTP {status}"),
            Self::Status { status, body } => write!(f, "HTTP {status}: {body}"),
            Self::Decode(msg) => write!(f, "invalid response body: {msg}"),
            Self::Request(msg) => write!(f, "invalid request: {msg}"),
        }
    }
}

impl std::error::Error for ApiError {}

#[cfg(test)]
#[path = "error_tests.rs"]
mod tests;
