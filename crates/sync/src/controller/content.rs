// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Lesson content generation sync.
//!
//! Frames are routed by stage: `prompt_generation` drives the coarse
//! [`PhaseState`], `content_generation` merges into the [`ProgressIndex`].
//! Whole-job completion is inferred by [`CompletionDetector`].

use tracing::{debug, info, warn};

use super::{
    Controller, ControllerPhase, Effect, ReconnectPolicy, Rollback, StreamLink, Submission,
    SyncView,
};
use crate::completion::CompletionDetector;
use crate::error::{ErrorCode, SyncError};
use crate::phase::PhaseState;
use crate::progress::ProgressIndex;
use crate::retry::RetryPolicy;
use crate::snapshot::SnapshotOutcome;
use crate::stream::StreamIdentity;
use crate::wire::{parse_content_frame, ContentStage, FrameStatus};

const MSG_GENERATING: &str = "Generating lesson content...";
const MSG_FAILED: &str = "Content generation failed";

pub struct ContentController {
    resource_id: i64,
    link: StreamLink,
    detector: CompletionDetector,
    start_expecting: bool,
    expecting: bool,
    streaming: bool,
    state: ControllerPhase,
    last_message: String,
    phase: PhaseState,
    progress: ProgressIndex,
    in_flight: Option<Rollback>,
    /// Progress of the run an in-flight approve replaced.
    prior_run: Option<(PhaseState, ProgressIndex)>,
}

impl ContentController {
    pub fn new(
        resource_id: i64,
        expecting: bool,
        retry_policy: RetryPolicy,
        reconnect_policy: ReconnectPolicy,
        detector: CompletionDetector,
    ) -> Self {
        Self {
            resource_id,
            link: StreamLink::new(retry_policy, reconnect_policy),
            detector,
            start_expecting: expecting,
            expecting: false,
            streaming: false,
            state: ControllerPhase::Idle,
            last_message: String::new(),
            phase: PhaseState::default(),
            progress: ProgressIndex::new(),
            in_flight: None,
            prior_run: None,
        }
    }

    pub fn expecting(&self) -> bool {
        self.expecting
    }

    pub fn streaming(&self) -> bool {
        self.streaming
    }

    pub fn phase(&self) -> &PhaseState {
        &self.phase
    }

    pub fn progress(&self) -> &ProgressIndex {
        &self.progress
    }

    fn begin_streaming(&mut self) {
        self.expecting = true;
        self.streaming = true;
        self.state = ControllerPhase::Streaming;
    }

    fn stop_streaming(&mut self) {
        self.streaming = false;
        self.expecting = false;
        self.state = ControllerPhase::Idle;
    }
}

impl Controller for ContentController {
    fn identity(&self) -> StreamIdentity {
        StreamIdentity::content(self.resource_id)
    }

    fn start(&mut self) -> Vec<Effect> {
        let mut effects = Vec::new();
        self.expecting = self.start_expecting;
        if self.expecting {
            self.begin_streaming();
            self.last_message = MSG_GENERATING.to_owned();
        }
        self.link.open(&mut effects);
        effects
    }

    fn on_open(&mut self) -> Vec<Effect> {
        self.link.opened();
        debug!(resource_id = self.resource_id, "content stream open");
        Vec::new()
    }

    fn on_message(&mut self, text: &str, now_ms: u64) -> Vec<Effect> {
        let Some(frame) = parse_content_frame(text) else {
            debug!(resource_id = self.resource_id, "dropping malformed content frame");
            return Vec::new();
        };

        match frame.stage {
            ContentStage::PromptGeneration => {
                self.phase.apply(frame.status, &frame.message);
                if frame.status == FrameStatus::Started {
                    self.begin_streaming();
                }
            }
            ContentStage::ContentGeneration => {
                if let Some(identity) = self.progress.merge(&frame, now_ms) {
                    debug!(
                        resource_id = self.resource_id,
                        lesson = %identity,
                        status = frame.status.as_str(),
                        "lesson progress"
                    );
                }
                if frame.status == FrameStatus::Started {
                    self.begin_streaming();
                }
            }
            ContentStage::Other(ref stage) => {
                debug!(resource_id = self.resource_id, stage = %stage, "unrouted content frame");
            }
        }

        if !frame.message.is_empty() {
            self.last_message = frame.message.clone();
        }

        if self.detector.stops_waiting(&frame) {
            if frame.status == FrameStatus::Failed {
                warn!(
                    resource_id = self.resource_id,
                    unit = %frame.unit,
                    lesson = %frame.lesson,
                    "content generation failed"
                );
                if frame.message.is_empty() {
                    self.last_message = MSG_FAILED.to_owned();
                }
            } else {
                info!(
                    resource_id = self.resource_id,
                    lessons = self.progress.len(),
                    "content generation complete"
                );
            }
            self.stop_streaming();
        }
        Vec::new()
    }

    fn on_close(&mut self) -> Vec<Effect> {
        let mut effects = Vec::new();
        if self.link.closed(self.expecting, &mut effects) {
            debug!(resource_id = self.resource_id, "content stream closed, reconnect scheduled");
        } else {
            debug!(resource_id = self.resource_id, "content stream closed");
            self.streaming = false;
            self.state = ControllerPhase::Idle;
        }
        effects
    }

    fn on_snapshot(&mut self, _outcome: SnapshotOutcome) -> Vec<Effect> {
        Vec::new()
    }

    fn on_reconnect_due(&mut self) -> Vec<Effect> {
        let mut effects = Vec::new();
        if self.link.reconnect_due(self.expecting) {
            info!(resource_id = self.resource_id, "reconnecting content stream");
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
        if submission != Submission::Approve {
            return Err(ErrorCode::BadRequest.to_error("content streams only accept approve"));
        }
        if self.in_flight.is_some() {
            return Err(ErrorCode::Busy.to_error("a submission is already in flight"));
        }

        self.in_flight = Some(Rollback {
            expecting: self.expecting,
            streaming: self.streaming,
            last_message: self.last_message.clone(),
            phase_state: self.state,
        });
        // Approve starts a new run; its progress starts empty.
        let phase = std::mem::take(&mut self.phase);
        let progress = std::mem::take(&mut self.progress);
        self.prior_run = Some((phase, progress));
        self.begin_streaming();
        self.last_message = MSG_GENERATING.to_owned();

        let mut effects = Vec::new();
        self.link.open(&mut effects);
        effects.push(Effect::Submit(Submission::Approve));
        Ok(effects)
    }

    fn on_submitted(&mut self, result: &Result<(), SyncError>) -> Vec<Effect> {
        let Some(rollback) = self.in_flight.take() else {
            return Vec::new();
        };
        let prior_run = self.prior_run.take();
        if let Err(e) = result {
            warn!(resource_id = self.resource_id, err = %e, "approve submission failed");
            if let Some((phase, progress)) = prior_run {
                self.phase = phase;
                self.progress = progress;
            }
            self.expecting = rollback.expecting;
            self.streaming = rollback.streaming;
            self.last_message = rollback.last_message;
            self.state = rollback.phase_state;
        }
        Vec::new()
    }

    fn stop(&mut self) -> Vec<Effect> {
        let mut effects = Vec::new();
        self.expecting = false;
        self.streaming = false;
        self.state = ControllerPhase::Idle;
        self.in_flight = None;
        self.prior_run = None;
        self.link.teardown(&mut effects);
        effects
    }

    fn view(&self) -> SyncView {
        SyncView {
            phase_state: self.state,
            streaming: self.streaming,
            expecting: self.expecting,
            last_message: self.last_message.clone(),
            connection: self.link.connection,
            phase: Some(self.phase.clone()),
            lessons: self.progress.ordered(),
            counts: self.progress.counts(),
            payloads: self.progress.payloads().clone(),
            ..SyncView::new(self.identity())
        }
    }
}

#[cfg(test)]
#[path = "content_tests.rs"]
mod tests;
