// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Per-resource sync state machines.
//!
//! Controllers hold no sockets or timers. Every transition returns the
//! [`Effect`]s the session driver must carry out, so the whole state machine
//! can be exercised without a live connection.

pub mod content;
pub mod syllabus;

use std::time::Duration;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::document::SyllabusDocument;
use crate::error::SyncError;
use crate::phase::PhaseState;
use crate::progress::{LessonProgressEntry, ProgressCounts};
use crate::retry::{RetryPolicy, RetryState};
use crate::snapshot::SnapshotOutcome;
use crate::stream::{ConnectionState, StreamIdentity};

pub use content::ContentController;
pub use syllabus::SyllabusController;

/// Instruction for the session driver.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Effect {
    /// Attach to the push channel (idempotent for a live connection).
    OpenStream,
    CloseStream,
    FetchSnapshot,
    ScheduleReconnect(Duration),
    CancelReconnect,
    Submit(Submission),
}

/// A side-effecting REST call that restarts server-side generation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Submission {
    Feedback(String),
    Approve,
}

impl Submission {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Feedback(_) => "feedback",
            Self::Approve => "approve",
        }
    }
}

/// When a closed stream is reopened.
///
/// Syllabus streams reconnect while a job is expected; content streams do
/// not. Both are configurable so the asymmetry is a visible setting rather
/// than a hidden branch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "snake_case")]
pub enum ReconnectPolicy {
    WhileExpecting,
    Never,
}

/// Coarse controller lifecycle.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ControllerPhase {
    #[default]
    Idle,
    Bootstrapping,
    Streaming,
}

/// Everything a UI needs to render sync progress.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SyncView {
    pub identity: StreamIdentity,
    pub phase_state: ControllerPhase,
    pub streaming: bool,
    pub expecting: bool,
    pub last_message: String,
    pub connection: ConnectionState,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub phase: Option<PhaseState>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub lessons: Vec<LessonProgressEntry>,
    pub counts: ProgressCounts,
    #[serde(skip_serializing_if = "IndexMap::is_empty")]
    pub payloads: IndexMap<String, Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub document: Option<SyllabusDocument>,
}

impl SyncView {
    pub fn new(identity: StreamIdentity) -> Self {
        Self {
            identity,
            phase_state: ControllerPhase::Idle,
            streaming: false,
            expecting: false,
            last_message: String::new(),
            connection: ConnectionState::Closed,
            phase: None,
            lessons: Vec::new(),
            counts: ProgressCounts::default(),
            payloads: IndexMap::new(),
            document: None,
        }
    }
}

/// A per-resource sync state machine driven by [`crate::session`].
pub trait Controller: Send + 'static {
    fn identity(&self) -> StreamIdentity;

    /// Activate the controller.
    fn start(&mut self) -> Vec<Effect>;

    fn on_open(&mut self) -> Vec<Effect>;

    /// Handle a raw text frame received at `now_ms`. Malformed frames are dropped.
    fn on_message(&mut self, text: &str, now_ms: u64) -> Vec<Effect>;

    fn on_close(&mut self) -> Vec<Effect>;

    fn on_snapshot(&mut self, outcome: SnapshotOutcome) -> Vec<Effect>;

    /// A scheduled reconnect timer fired.
    fn on_reconnect_due(&mut self) -> Vec<Effect>;

    fn set_visible(&mut self, visible: bool) -> Vec<Effect>;

    /// Begin a submission. Rejected submissions leave state untouched.
    fn submit(&mut self, submission: Submission) -> Result<Vec<Effect>, SyncError>;

    /// The REST call for the in-flight submission finished.
    fn on_submitted(&mut self, result: &Result<(), SyncError>) -> Vec<Effect>;

    /// Tear down: close the stream, drop expectations, cancel timers.
    fn stop(&mut self) -> Vec<Effect>;

    fn view(&self) -> SyncView;
}

/// Connection bookkeeping shared by both controller variants.
#[derive(Debug, Clone)]
pub(crate) struct StreamLink {
    pub connection: ConnectionState,
    pub retry: RetryState,
    pub retry_policy: RetryPolicy,
    pub reconnect_policy: ReconnectPolicy,
    pub visible: bool,
    pub reconnect_pending: bool,
}

impl StreamLink {
    pub fn new(retry_policy: RetryPolicy, reconnect_policy: ReconnectPolicy) -> Self {
        Self {
            connection: ConnectionState::Closed,
            retry: RetryState::default(),
            retry_policy,
            reconnect_policy,
            visible: true,
            reconnect_pending: false,
        }
    }

    /// Request a connection unless one is already live.
    pub fn open(&mut self, effects: &mut Vec<Effect>) {
        if self.connection.is_live() {
            return;
        }
        self.connection = ConnectionState::Connecting;
        effects.push(Effect::OpenStream);
    }

    pub fn opened(&mut self) {
        self.connection = ConnectionState::Open;
        self.retry = self.retry_policy.reset();
    }

    /// Record a close and schedule a reconnect if policy allows.
    ///
    /// Returns whether a reconnect was scheduled.
    pub fn closed(&mut self, expecting: bool, effects: &mut Vec<Effect>) -> bool {
        self.connection = ConnectionState::Closed;
        let wanted = match self.reconnect_policy {
            ReconnectPolicy::WhileExpecting => expecting && self.visible,
            ReconnectPolicy::Never => false,
        };
        if !wanted {
            return false;
        }
        if !self.reconnect_pending {
            let (delay, next) = self.retry_policy.next(self.retry);
            self.retry = next;
            self.reconnect_pending = true;
            effects.push(Effect::ScheduleReconnect(delay));
        }
        true
    }

    /// A reconnect timer fired. Returns whether to reopen.
    pub fn reconnect_due(&mut self, expecting: bool) -> bool {
        self.reconnect_pending = false;
        expecting && self.visible && !self.connection.is_live()
    }

    /// Coming back to the foreground reopens a wanted stream right away.
    pub fn set_visible(&mut self, visible: bool, expecting: bool, effects: &mut Vec<Effect>) {
        let was_visible = std::mem::replace(&mut self.visible, visible);
        let wanted = matches!(self.reconnect_policy, ReconnectPolicy::WhileExpecting);
        if visible && !was_visible && wanted && expecting && !self.connection.is_live() {
            if self.reconnect_pending {
                self.reconnect_pending = false;
                effects.push(Effect::CancelReconnect);
            }
            self.open(effects);
        }
    }

    pub fn teardown(&mut self, effects: &mut Vec<Effect>) {
        if self.reconnect_pending {
            self.reconnect_pending = false;
            effects.push(Effect::CancelReconnect);
        }
        effects.push(Effect::CloseStream);
        self.connection = ConnectionState::Closed;
    }
}

/// Pre-submission values restored when a submission fails.
#[derive(Debug, Clone)]
pub(crate) struct Rollback {
    pub expecting: bool,
    pub streaming: bool,
    pub last_message: String,
    pub phase_state: ControllerPhase,
}
