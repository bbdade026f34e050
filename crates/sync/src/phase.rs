// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use serde::{Deserialize, Serialize};

use crate::wire::FrameStatus;

/// Status of the coarse prompt-generation phase.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PhaseStatus {
    #[default]
    Idle,
    Started,
    Completed,
    Failed,
}

impl PhaseStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::Started => "started",
            Self::Completed => "completed",
            Self::Failed => "failed",
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PhaseState {
    pub status: PhaseStatus,
    pub message: String,
}

impl PhaseState {
    /// Record a prompt-generation frame. Unknown statuses leave the phase untouched.
    ///
    /// Returns whether the status changed.
    pub fn apply(&mut self, status: FrameStatus, message: &str) -> bool {
        let next = match status {
            FrameStatus::Started => PhaseStatus::Started,
            FrameStatus::Completed => PhaseStatus::Completed,
            FrameStatus::Failed => PhaseStatus::Failed,
            FrameStatus::Other => return false,
        };
        let changed = self.status != next;
        self.status = next;
        if !message.is_empty() {
            self.message = message.to_owned();
        }
        changed
    }
}
