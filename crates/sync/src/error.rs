// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use serde::{Deserialize, Serialize};
use std::fmt;

/// Error codes surfaced to callers of the sync core.
///
/// Only submission failures (feedback, approve) reach the caller. Transport
/// and snapshot failures are absorbed by the controllers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ErrorCode {
    BadRequest,
    Busy,
    NotFound,
    Upstream,
    Transport,
    Internal,
}

impl ErrorCode {
    pub fn http_status(&self) -> u16 {
        match self {
            Self::BadRequest => 400,
            Self::Busy => 409,
            Self::NotFound => 404,
            Self::Upstream => 502,
            Self::Transport => 503,
            Self::Internal => 500,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::BadRequest => "BAD_REQUEST",
            Self::Busy => "BUSY",
            Self::NotFound => "NOT_FOUND",
            Self::Upstream => "UPSTREAM_ERROR",
            Self::Transport => "TRANSPORT_ERROR",
            Self::Internal => "INTERNAL",
        }
    }

    /// Map an upstream HTTP status to the closest error code.
    pub fn from_http_status(status: u16) -> Self {
        match status {
            400 | 422 => Self::BadRequest,
            404 => Self::NotFound,
            409 => Self::Busy,
            500..=599 => Self::Upstream,
            _ => Self::Internal,
        }
    }

    pub fn to_error(&self, message: impl Into<String>) -> SyncError {
        SyncError { code: *self, message: message.into() }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// User-visible error with a machine-readable code and a human-readable message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SyncError {
    pub code: ErrorCode,
    pub message: String,
}

impl SyncError {
    /// Classify an error from the REST client.
    pub fn from_request(err: &anyhow::Error) -> Self {
        if let Some(e) = err.downcast_ref::<reqwest::Error>() {
            if let Some(status) = e.status() {
                return ErrorCode::from_http_status(status.as_u16()).to_error(format!("{e}"));
            }
            if e.is_connect() || e.is_timeout() {
                return ErrorCode::Transport.to_error(format!("{e}"));
            }
        }
        ErrorCode::Internal.to_error(format!("{err:#}"))
    }
}

impl fmt::Display for SyncError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.code, self.message)
    }
}

impl std::error::Error for SyncError {}

#[cfg(test)]
#[path = "error_tests.rs"]
mod tests;
