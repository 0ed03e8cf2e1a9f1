// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use std::path::PathBuf;
use std::time::Duration;

/// Default lead time before access token expiry to refresh proactively.
pub const DEFAULT_REFRESH_LEAD_SECS: u64 = 60;

/// Connection settings shared by every command.
#[derive(Debug, Clone, clap::Args)]
pub struct ClientConfig {
    /// Backend API base URL.
    #[arg(long, env = "RENTDESK_API_URL", default_value = "http://localhost:8000/api")]
    pub api_url: String,

    /// Path of the persisted session record.
    #[arg(long, env = "RENTDESK_SESSION_FILE")]
    pub session_file: Option<PathBuf>,

    /// Seconds before access token expiry to refresh proactively.
    #[arg(long, env = "RENTDESK_REFRESH_LEAD_SECS", default_value_t = DEFAULT_REFRESH_LEAD_SECS)]
    pub refresh_lead_secs: u64,

    /// Transport timeout in seconds for every request.
    #[arg(long, env = "RENTDESK_REQUEST_TIMEOUT_SECS", default_value_t = 30)]
    pub request_timeout_secs: u64,

    /// Log level (trace, debug, info, warn, error).
    #[arg(long, env = "RENTDESK_LOG_LEVEL", default_value = "warn")]
    pub log_level: String,

    /// Log format (json or text).
    #[arg(long, env = "RENTDESK_LOG_FORMAT", default_value = "text")]
    pub log_format: String,
}

impl ClientConfig {
    /// Validate the configuration after parsing.
    pub fn validate(&self) -> anyhow::Result<()> {
        let url = self.api_url.trim();
        if url.is_empty() {
            anyhow::bail!("--api-url must not be empty");
        }
        if !url.starts_with("http://") && !url.starts_with("https://") {
            anyhow::bail!("--api-url must be an http(s) URL: {url}");
        }
        if self.request_timeout_secs == 0 {
            anyhow::bail!("--request-timeout-secs must be greater than zero");
        }
        match self.log_format.as_str() {
            "json" | "text" => {}
            other => anyhow::bail!("invalid log format: {other}"),
        }
        Ok(())
    }

    /// Base URL without a trailing slash.
    pub fn base_url(&self) -> &str {
        self.api_url.trim().trim_end_matches('/')
    }

    pub fn refresh_lead(&self) -> Duration {
        Duration::from_secs(self.refresh_lead_secs)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    /// Resolved session file: explicit flag, else the state directory.
    pub fn session_path(&self) -> PathBuf {
        match self.session_file {
            Some(ref path) => path.clone(),
            None => state_dir().join("session.json"),
        }
    }
}

/// Resolve the state directory for persisted client data.
pub fn state_dir() -> PathBuf {
    if let Ok(xdg) = std::env::var("XDG_STATE_HOME") {
        return PathBuf::from(xdg).join("rentdesk");
    }
    if let Ok(home) = std::env::var("HOME") {
        return PathBuf::from(home).join(".local/state/rentdesk");
    }
    PathBuf::from(".rentdesk")
}

#[cfg(test)]
#[path = "config_tests.rs"]
mod tests;
