// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Async driver for a [`Controller`].
//!
//! One task owns the controller. Commands arrive over an mpsc channel, push
//! channel signals over the connection's broadcast channel, and REST results
//! from short-lived helper tasks. Every turn of the loop publishes the
//! controller's [`SyncView`] on a watch channel.

use std::collections::VecDeque;
use std::pin::Pin;
use std::sync::Arc;

use tokio::sync::{broadcast, mpsc, oneshot, watch};
use tokio::task::JoinHandle;
use tokio::time::Sleep;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::api::CourseApi;
use crate::controller::{Controller, Effect, Submission, SyncView};
use crate::error::{ErrorCode, SyncError};
use crate::snapshot::{SnapshotBootstrapper, SnapshotOutcome};
use crate::stream::connection::{ConnectionRegistry, StreamEvent, StreamSignal};
use crate::stream::{build_stream_url, ConnectionState, StreamIdentity};

/// Milliseconds since the Unix epoch.
pub fn epoch_ms() -> u64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .unwrap_or_default()
        .as_millis() as u64
}

/// Shared collaborators for every session.
#[derive(Clone)]
pub struct SessionDeps {
    pub registry: Arc<ConnectionRegistry>,
    pub api: Arc<dyn CourseApi>,
    pub ws_base: String,
    pub auth_token: Option<String>,
}

enum Command {
    Submit(Submission, oneshot::Sender<Result<(), SyncError>>),
    SetVisible(bool),
}

enum TaskResult {
    Snapshot(SnapshotOutcome),
    Submitted(Result<(), SyncError>),
}

struct Attached {
    generation: u64,
    signals: broadcast::Receiver<StreamSignal>,
}

/// Spawn a session task driving `controller` until stopped.
pub fn spawn_session<C: Controller>(controller: C, deps: SessionDeps) -> SessionHandle {
    let identity = controller.identity();
    let (cmd_tx, cmd_rx) = mpsc::channel(32);
    let (result_tx, result_rx) = mpsc::channel(32);
    let (view_tx, view_rx) = watch::channel(controller.view());
    let cancel = CancellationToken::new();

    let driver = Driver {
        identity,
        controller,
        deps,
        cancel: cancel.clone(),
        stream: None,
        reconnect: None,
        results: result_tx,
        pending_reply: None,
        view: view_tx,
    };
    let task = tokio::spawn(driver.run(cmd_rx, result_rx));

    SessionHandle { identity, commands: cmd_tx, view: view_rx, cancel, task: Some(task) }
}

/// Handle to a running session. Dropping it stops the session.
pub struct SessionHandle {
    identity: StreamIdentity,
    commands: mpsc::Sender<Command>,
    view: watch::Receiver<SyncView>,
    cancel: CancellationToken,
    task: Option<JoinHandle<()>>,
}

fn session_stopped() -> SyncError {
    ErrorCode::Internal.to_error("session stopped")
}

impl SessionHandle {
    pub fn identity(&self) -> StreamIdentity {
        self.identity
    }

    /// Submit and wait for the REST call to finish.
    ///
    /// Rejected submissions return immediately without touching state.
    pub async fn submit(&self, submission: Submission) -> Result<(), SyncError> {
        let (tx, rx) = oneshot::channel();
        self.commands.send(Command::Submit(submission, tx)).await.map_err(|_| session_stopped())?;
        rx.await.map_err(|_| session_stopped())?
    }

    pub async fn send_feedback(&self, text: &str) -> Result<(), SyncError> {
        self.submit(Submission::Feedback(text.to_owned())).await
    }

    pub async fn approve(&self) -> Result<(), SyncError> {
        self.submit(Submission::Approve).await
    }

    pub async fn set_visible(&self, visible: bool) {
        let _ = self.commands.send(Command::SetVisible(visible)).await;
    }

    /// Latest published view.
    pub fn view(&self) -> SyncView {
        self.view.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<SyncView> {
        self.view.clone()
    }

    /// Wait until a published view satisfies `predicate`.
    pub async fn wait_for(
        &self,
        predicate: impl FnMut(&SyncView) -> bool,
    ) -> Result<SyncView, SyncError> {
        let mut rx = self.view.clone();
        let view = rx.wait_for(predicate).await.map_err(|_| session_stopped())?;
        Ok(SyncView::clone(&view))
    }

    /// Signal the session to stop. Returns immediately.
    pub fn stop(&self) {
        self.cancel.cancel();
    }

    /// Stop the session and wait for teardown to finish.
    pub async fn shutdown(mut self) {
        self.cancel.cancel();
        if let Some(task) = self.task.take() {
            let _ = task.await;
        }
    }
}

impl Drop for SessionHandle {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}

struct Driver<C> {
    identity: StreamIdentity,
    controller: C,
    deps: SessionDeps,
    cancel: CancellationToken,
    stream: Option<Attached>,
    reconnect: Option<Pin<Box<Sleep>>>,
    results: mpsc::Sender<TaskResult>,
    pending_reply: Option<oneshot::Sender<Result<(), SyncError>>>,
    view: watch::Sender<SyncView>,
}

impl<C: Controller> Driver<C> {
    async fn run(
        mut self,
        mut commands: mpsc::Receiver<Command>,
        mut results: mpsc::Receiver<TaskResult>,
    ) {
        info!(stream = %self.identity, "session started");
        let cancel = self.cancel.clone();

        let effects = self.controller.start();
        self.apply(effects);
        self.publish();

        loop {
            tokio::select! {
                _ = cancel.cancelled() => break,
                cmd = commands.recv() => match cmd {
                    Some(Command::Submit(submission, reply)) => self.submit(submission, reply),
                    Some(Command::SetVisible(visible)) => {
                        let effects = self.controller.set_visible(visible);
                        self.apply(effects);
                    }
                    None => break,
                },
                signal = next_signal(&mut self.stream) => self.on_signal(signal),
                Some(result) = results.recv() => self.on_result(result),
                _ = reconnect_timer(&mut self.reconnect) => {
                    self.reconnect = None;
                    let effects = self.controller.on_reconnect_due();
                    self.apply(effects);
                }
            }
            self.publish();
        }

        let effects = self.controller.stop();
        self.apply(effects);
        self.publish();
        info!(stream = %self.identity, "session stopped");
    }

    fn publish(&self) {
        let next = self.controller.view();
        self.view.send_if_modified(|current| {
            if *current == next {
                return false;
            }
            *current = next;
            true
        });
    }

    fn submit(&mut self, submission: Submission, reply: oneshot::Sender<Result<(), SyncError>>) {
        let kind = submission.as_str();
        match self.controller.submit(submission) {
            Ok(effects) => {
                debug!(stream = %self.identity, kind, "submission accepted");
                self.pending_reply = Some(reply);
                self.apply(effects);
            }
            Err(e) => {
                debug!(stream = %self.identity, kind, err = %e, "submission rejected");
                let _ = reply.send(Err(e));
            }
        }
    }

    fn on_signal(&mut self, signal: Option<StreamSignal>) {
        let Some(ref attached) = self.stream else {
            return;
        };
        let event = match signal {
            Some(s) if s.generation == attached.generation => s.event,
            Some(s) => {
                debug!(stream = %self.identity, generation = s.generation, "dropping signal from superseded connection");
                return;
            }
            // Channel gone without a close signal; treat as closed.
            None => StreamEvent::Close,
        };

        let effects = match event {
            StreamEvent::Open => self.controller.on_open(),
            StreamEvent::Message(text) => self.controller.on_message(&text, epoch_ms()),
            StreamEvent::Error(detail) => {
                debug!(stream = %self.identity, err = %detail, "stream error");
                Vec::new()
            }
            StreamEvent::Close => {
                self.stream = None;
                self.controller.on_close()
            }
        };
        self.apply(effects);
    }

    fn on_result(&mut self, result: TaskResult) {
        match result {
            TaskResult::Snapshot(outcome) => {
                let effects = self.controller.on_snapshot(outcome);
                self.apply(effects);
            }
            TaskResult::Submitted(result) => {
                let effects = self.controller.on_submitted(&result);
                self.apply(effects);
                // Callers read the view right after the reply.
                self.publish();
                if let Some(reply) = self.pending_reply.take() {
                    let _ = reply.send(result);
                }
            }
        }
    }

    fn apply(&mut self, effects: Vec<Effect>) {
        let mut queue: VecDeque<Effect> = effects.into();
        while let Some(effect) = queue.pop_front() {
            match effect {
                Effect::OpenStream => {
                    let url = build_stream_url(
                        &self.deps.ws_base,
                        self.identity,
                        self.deps.auth_token.as_deref(),
                    );
                    let attachment = self.deps.registry.open(self.identity, &url);
                    self.stream = Some(Attached {
                        generation: attachment.generation,
                        signals: attachment.signals,
                    });
                    // The Open signal went out before we subscribed.
                    if attachment.reused && attachment.state == ConnectionState::Open {
                        queue.extend(self.controller.on_open());
                    }
                }
                Effect::CloseStream => {
                    self.stream = None;
                    self.deps.registry.close(self.identity);
                }
                Effect::FetchSnapshot => self.spawn_snapshot(),
                Effect::ScheduleReconnect(delay) => {
                    debug!(stream = %self.identity, delay_ms = delay.as_millis() as u64, "reconnect scheduled");
                    self.reconnect = Some(Box::pin(tokio::time::sleep(delay)));
                }
                Effect::CancelReconnect => self.reconnect = None,
                Effect::Submit(submission) => self.spawn_submission(submission),
            }
        }
    }

    fn spawn_snapshot(&self) {
        let boot = SnapshotBootstrapper::new(Arc::clone(&self.deps.api));
        let results = self.results.clone();
        let cancel = self.cancel.child_token();
        let resource_id = self.identity.resource_id;
        tokio::spawn(async move {
            tokio::select! {
                _ = cancel.cancelled() => {}
                outcome = boot.fetch_snapshot(resource_id) => {
                    let _ = results.send(TaskResult::Snapshot(outcome)).await;
                }
            }
        });
    }

    fn spawn_submission(&self, submission: Submission) {
        let api = Arc::clone(&self.deps.api);
        let results = self.results.clone();
        let cancel = self.cancel.child_token();
        let identity = self.identity;
        tokio::spawn(async move {
            let call = async {
                match submission {
                    Submission::Feedback(ref text) => {
                        api.submit_feedback(identity.resource_id, text).await
                    }
                    Submission::Approve => api.approve_syllabus(identity.resource_id).await,
                }
            };
            let result = tokio::select! {
                _ = cancel.cancelled() => return,
                result = call => result,
            };
            let result = result.map_err(|e| {
                let err = SyncError::from_request(&e);
                warn!(stream = %identity, kind = submission.as_str(), err = %err, "submission failed");
                err
            });
            let _ = results.send(TaskResult::Submitted(result)).await;
        });
    }
}

/// Next signal for the attached connection, or pending forever when detached.
async fn next_signal(stream: &mut Option<Attached>) -> Option<StreamSignal> {
    let Some(attached) = stream else {
        return std::future::pending().await;
    };
    loop {
        match attached.signals.recv().await {
            Ok(signal) => return Some(signal),
            Err(broadcast::error::RecvError::Lagged(n)) => {
                warn!(generation = attached.generation, skipped = n, "stream signals lagged");
            }
            Err(broadcast::error::RecvError::Closed) => return None,
        }
    }
}

async fn reconnect_timer(timer: &mut Option<Pin<Box<Sleep>>>) {
    match timer {
        Some(sleep) => sleep.as_mut().await,
        None => std::future::pending().await,
    }
}

#[cfg(test)]
#[path = "session_tests.rs"]
mod tests;
