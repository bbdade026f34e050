// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use std::time::Duration;

use crate::completion::CompletionDetector;
use crate::controller::ReconnectPolicy;
use crate::retry::RetryPolicy;

/// Configuration for the sync core.
#[derive(Debug, Clone, clap::Args)]
pub struct SyncConfig {
    /// Base URL of the authoring REST API (e.g. `http://localhost:8000/api`).
    #[arg(long, default_value = "http://127.0.0.1:8000", env = "TOMESYNC_API_URL")]
    pub api_url: String,

    /// Base URL for push channels. Derived from `--api-url` when unset.
    #[arg(long, env = "TOMESYNC_WS_URL")]
    pub ws_url: Option<String>,

    /// Bearer token attached to REST calls and push channel URLs.
    #[arg(long, env = "TOMESYNC_AUTH_TOKEN")]
    pub auth_token: Option<String>,

    /// REST request timeout in milliseconds.
    #[arg(long, default_value_t = 10000, env = "TOMESYNC_REQUEST_TIMEOUT_MS")]
    pub request_timeout_ms: u64,

    /// First reconnect delay in milliseconds.
    #[arg(long, default_value_t = 1000, env = "TOMESYNC_RETRY_FLOOR_MS")]
    pub retry_floor_ms: u64,

    /// Maximum reconnect delay in milliseconds.
    #[arg(long, default_value_t = 8000, env = "TOMESYNC_RETRY_CEILING_MS")]
    pub retry_ceiling_ms: u64,

    /// Message pattern marking the last content-generation event of a job.
    #[arg(long, default_value = "(?i)for all lessons", env = "TOMESYNC_COMPLETION_PATTERN")]
    pub completion_pattern: String,

    /// Reconnect policy for syllabus streams.
    #[arg(long, value_enum, default_value_t = ReconnectPolicy::WhileExpecting, env = "TOMESYNC_SYLLABUS_RECONNECT")]
    pub syllabus_reconnect: ReconnectPolicy,

    /// Reconnect policy for content streams.
    #[arg(long, value_enum, default_value_t = ReconnectPolicy::Never, env = "TOMESYNC_CONTENT_RECONNECT")]
    pub content_reconnect: ReconnectPolicy,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            api_url: "http://127.0.0.1:8000".to_owned(),
            ws_url: None,
            auth_token: None,
            request_timeout_ms: 10000,
            retry_floor_ms: 1000,
            retry_ceiling_ms: 8000,
            completion_pattern: "(?i)for all lessons".to_owned(),
            syllabus_reconnect: ReconnectPolicy::WhileExpecting,
            content_reconnect: ReconnectPolicy::Never,
        }
    }
}

impl SyncConfig {
    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms)
    }

    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy::new(
            Duration::from_millis(self.retry_floor_ms),
            Duration::from_millis(self.retry_ceiling_ms),
        )
    }

    pub fn completion_detector(&self) -> anyhow::Result<CompletionDetector> {
        CompletionDetector::new(&self.completion_pattern)
    }

    /// Push channel base URL: explicit `--ws-url`, or the API URL with its
    /// scheme swapped to `ws`/`wss`.
    pub fn ws_base(&self) -> String {
        let base = match self.ws_url {
            Some(ref url) => url.clone(),
            None => {
                if self.api_url.starts_with("https://") {
                    self.api_url.replacen("https://", "wss://", 1)
                } else {
                    self.api_url.replacen("http://", "ws://", 1)
                }
            }
        };
        base.trim_end_matches('/').to_owned()
    }

    pub fn api_base(&self) -> String {
        self.api_url.trim_end_matches('/').to_owned()
    }
}

#[cfg(test)]
#[path = "config_tests.rs"]
mod tests;
