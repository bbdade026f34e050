// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Syllabus generation sync.
//!
//! Lifecycle is `Idle -> Bootstrapping -> Streaming -> Idle`. Any frame that
//! carries a document ends the cycle, with or without a `completed` status,
//! because the server does not always send one.

use tracing::{debug, info, warn};

use super::{
    Controller, ControllerPhase, Effect, ReconnectPolicy, Rollback, StreamLink, Submission,
    SyncView,
};
use crate::document::SyllabusDocument;
use crate::error::{ErrorCode, SyncError};
use crate::retry::RetryPolicy;
use crate::snapshot::SnapshotOutcome;
use crate::stream::StreamIdentity;
use crate::wire::{parse_syllabus_frame, FrameStatus};

const MSG_GENERATING: &str = "Generating syllabus...";
const MSG_WAITING: &str = "Waiting for syllabus generation...";
const MSG_REGENERATING: &str = "Regenerating syllabus from feedback...";
const MSG_READY: &str = "Syllabus ready";
const MSG_FAILED: &str = "Syllabus generation failed";

pub struct SyllabusController {
    resource_id: i64,
    link: StreamLink,
    start_expecting: bool,
    expecting: bool,
    streaming: bool,
    phase: ControllerPhase,
    last_message: String,
    document: Option<SyllabusDocument>,
    /// A stream frame already published a document this activation, so a
    /// late snapshot must not overwrite it.
    stream_document_seen: bool,
    /// Feedback restarted generation; the persisted document is now stale.
    regenerating: bool,
    in_flight: Option<Rollback>,
}

impl SyllabusController {
    /// `expecting` is true when the caller just triggered generation itself.
    pub fn new(
        resource_id: i64,
        expecting: bool,
        retry_policy: RetryPolicy,
        reconnect_policy: ReconnectPolicy,
    ) -> Self {
        Self {
            resource_id,
            link: StreamLink::new(retry_policy, reconnect_policy),
            start_expecting: expecting,
            expecting: false,
            streaming: false,
            phase: ControllerPhase::Idle,
            last_message: String::new(),
            document: None,
            stream_document_seen: false,
            regenerating: false,
            in_flight: None,
        }
    }

    pub fn expecting(&self) -> bool {
        self.expecting
    }

    pub fn streaming(&self) -> bool {
        self.streaming
    }

    pub fn document(&self) -> Option<&SyllabusDocument> {
        self.document.as_ref()
    }

    fn publish(&mut self, document: SyllabusDocument, message: Option<String>) {
        info!(
            resource_id = self.resource_id,
            units = document.units.len(),
            lessons = document.lesson_count(),
            "syllabus document published"
        );
        self.document = Some(document);
        self.finish(message.unwrap_or_else(|| MSG_READY.to_owned()));
    }

    fn finish(&mut self, message: String) {
        self.regenerating = false;
        self.streaming = false;
        self.expecting = false;
        self.phase = ControllerPhase::Idle;
        self.last_message = message;
    }

    fn begin_streaming(&mut self, message: &str) {
        self.streaming = true;
        self.phase = ControllerPhase::Streaming;
        self.last_message = message.to_owned();
    }
}

impl Controller for SyllabusController {
    fn identity(&self) -> StreamIdentity {
        StreamIdentity::syllabus(self.resource_id)
    }

    fn start(&mut self) -> Vec<Effect> {
        let mut effects = Vec::new();
        self.expecting = self.start_expecting;
        self.phase = ControllerPhase::Bootstrapping;
        self.stream_document_seen = false;
        if self.expecting {
            self.streaming = true;
            self.last_message = MSG_GENERATING.to_owned();
        }
        self.link.open(&mut effects);
        effects.push(Effect::FetchSnapshot);
        effects
    }

    fn on_open(&mut self) -> Vec<Effect> {
        self.link.opened();
        debug!(resource_id = self.resource_id, "syllabus stream open");
        Vec::new()
    }

    fn on_message(&mut self, text: &str, _now_ms: u64) -> Vec<Effect> {
        let Some(frame) = parse_syllabus_frame(text) else {
            debug!(resource_id = self.resource_id, "dropping malformed syllabus frame");
            return Vec::new();
        };

        if frame.status == Some(FrameStatus::Started) {
            self.expecting = true;
            let message = frame.message.clone().unwrap_or_else(|| MSG_GENERATING.to_owned());
            self.begin_streaming(&message);
        }

        if let Some(document) = frame.document {
            self.stream_document_seen = true;
            self.publish(document, frame.message);
            return Vec::new();
        }

        match frame.status {
            Some(FrameStatus::Completed) => {
                self.finish(frame.message.unwrap_or_else(|| MSG_READY.to_owned()));
            }
            Some(FrameStatus::Failed) => {
                warn!(resource_id = self.resource_id, "syllabus generation failed");
                self.finish(frame.message.unwrap_or_else(|| MSG_FAILED.to_owned()));
            }
            _ => {}
        }
        Vec::new()
    }

    fn on_close(&mut self) -> Vec<Effect> {
        let mut effects = Vec::new();
        if self.link.closed(self.expecting, &mut effects) {
            debug!(resource_id = self.resource_id, "syllabus stream closed, reconnect scheduled");
        } else {
            debug!(resource_id = self.resource_id, "syllabus stream closed");
            self.streaming = false;
            self.phase = ControllerPhase::Idle;
        }
        effects
    }

    fn on_snapshot(&mut self, outcome: SnapshotOutcome) -> Vec<Effect> {
        match outcome {
            SnapshotOutcome::Document(document) => {
                if self.stream_document_seen || self.regenerating {
                    debug!(resource_id = self.resource_id, "snapshot superseded");
                } else {
                    self.publish(document, None);
                }
            }
            SnapshotOutcome::Absent | SnapshotOutcome::Failed(_) => {
                if let SnapshotOutcome::Failed(ref err) = outcome {
                    warn!(resource_id = self.resource_id, err = %err, "syllabus snapshot failed");
                }
                let stream_wanted = self.link.connection.is_live() || self.link.reconnect_pending;
                if self.document.is_none() && stream_wanted {
                    self.begin_streaming(MSG_WAITING);
                }
            }
        }
        Vec::new()
    }

    fn on_reconnect_due(&mut self) -> Vec<Effect> {
        let mut effects = Vec::new();
        if self.link.reconnect_due(self.expecting) {
            info!(resource_id = self.resource_id, "reconnecting syllabus stream");
            self.link.open(&mut effects);
        }
        effects
    }

    fn set_visible(&mut self, visible: bool) -> Vec<Effect> {
        let mut effects = Vec::new();
        self.link.set_visible(visible, self.expecting, &mut effects);
        effects
    }

    fn submit(&mut self, submission: Submission) -> Result<Vec<Effect>, SyncError> {
        let text = match submission {
            Submission::Feedback(ref text) => text.trim().to_owned(),
            Submission::Approve => {
                return Err(ErrorCode::BadRequest.to_error("approve is not a syllabus submission"))
            }
        };
        if text.is_empty() {
            return Err(ErrorCode::BadRequest.to_error("feedback must not be empty"));
        }
        if self.in_flight.is_some() {
            return Err(ErrorCode::Busy.to_error("a submission is already in flight"));
        }

        self.in_flight = Some(Rollback {
            expecting: self.expecting,
            streaming: self.streaming,
            last_message: self.last_message.clone(),
            phase_state: self.phase,
        });
        self.expecting = true;
        self.regenerating = true;
        self.begin_streaming(MSG_REGENERATING);

        // Attach before the POST so no early frame is missed.
        let mut effects = Vec::new();
        self.link.open(&mut effects);
        effects.push(Effect::Submit(Submission::Feedback(text)));
        Ok(effects)
    }

    fn on_submitted(&mut self, result: &Result<(), SyncError>) -> Vec<Effect> {
        let Some(rollback) = self.in_flight.take() else {
            return Vec::new();
        };
        if let Err(e) = result {
            warn!(resource_id = self.resource_id, err = %e, "feedback submission failed");
            self.expecting = rollback.expecting;
            self.streaming = rollback.streaming;
            self.last_message = rollback.last_message;
            self.phase = rollback.phase_state;
            self.regenerating = false;
        }
        Vec::new()
    }

    fn stop(&mut self) -> Vec<Effect> {
        let mut effects = Vec::new();
        self.expecting = false;
        self.streaming = false;
        self.phase = ControllerPhase::Idle;
        self.in_flight = None;
        self.regenerating = false;
        self.link.teardown(&mut effects);
        effects
    }

    fn view(&self) -> SyncView {
        SyncView {
            phase_state: self.phase,
            streaming: self.streaming,
            expecting: self.expecting,
            last_message: self.last_message.clone(),
            connection: self.link.connection,
            document: self.document.clone(),
            ..SyncView::new(self.identity())
        }
    }
}

#[cfg(test)]
#[path = "syllabus_tests.rs"]
mod tests;
