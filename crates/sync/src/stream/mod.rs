// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Push channel plumbing: stream identities, URLs, and connection lifecycle.

pub mod connection;

use std::fmt;

use serde::{Deserialize, Serialize};

/// Which logical stream a connection serves.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StreamKind {
    Syllabus,
    Content,
}

impl StreamKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Syllabus => "syllabus",
            Self::Content => "content",
        }
    }
}

impl fmt::Display for StreamKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A stream kind bound to a resource id. At most one live connection exists
/// per identity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct StreamIdentity {
    pub kind: StreamKind,
    pub resource_id: i64,
}

impl StreamIdentity {
    pub fn syllabus(resource_id: i64) -> Self {
        Self { kind: StreamKind::Syllabus, resource_id }
    }

    pub fn content(resource_id: i64) -> Self {
        Self { kind: StreamKind::Content, resource_id }
    }
}

impl fmt::Display for StreamIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.kind, self.resource_id)
    }
}

/// Externally visible lifecycle of a connection.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConnectionState {
    #[default]
    Closed,
    Connecting,
    Open,
    Closing,
}

impl ConnectionState {
    pub fn is_live(&self) -> bool {
        matches!(self, Self::Connecting | Self::Open)
    }
}

/// Build the push channel URL for `identity` from a `ws://`/`wss://` base.
pub fn build_stream_url(ws_base: &str, identity: StreamIdentity, auth_token: Option<&str>) -> String {
    let mut url = format!(
        "{}/ws/{}/{}",
        ws_base.trim_end_matches('/'),
        identity.kind.as_str(),
        identity.resource_id
    );
    if let Some(token) = auth_token {
        url.push_str(&format!("?token={token}"));
    }
    url
}
