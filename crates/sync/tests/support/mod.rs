// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! In-process fake of the authoring API: REST endpoints plus scripted push channels.

#![allow(dead_code)]

use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use futures_util::{SinkExt, StreamExt};
use parking_lot::Mutex;
use serde_json::Value;
use tokio::sync::broadcast;
use tokio::task::JoinHandle;

use tomesync::config::SyncConfig;

pub const WAIT: Duration = Duration::from_secs(5);

#[derive(Debug, Clone)]
enum Push {
    Frame(String, String),
    Drop(String),
    Reset(String),
}

struct FakeState {
    push: broadcast::Sender<Push>,
    accepted: AtomicUsize,
    live: AtomicUsize,
    fail_submissions: AtomicBool,
    syllabi: Mutex<HashMap<i64, Value>>,
    feedback: Mutex<Vec<(i64, String)>>,
    approvals: Mutex<Vec<i64>>,
}

pub struct FakeServer {
    pub addr: SocketAddr,
    state: Arc<FakeState>,
    task: JoinHandle<()>,
}

impl FakeServer {
    pub async fn start() -> anyhow::Result<Self> {
        let _ = rustls::crypto::ring::default_provider().install_default();

        let (push, _) = broadcast::channel(256);
        let state = Arc::new(FakeState {
            push,
            accepted: AtomicUsize::new(0),
            live: AtomicUsize::new(0),
            fail_submissions: AtomicBool::new(false),
            syllabi: Mutex::new(HashMap::new()),
            feedback: Mutex::new(Vec::new()),
            approvals: Mutex::new(Vec::new()),
        });

        let router = Router::new()
            .route("/ws/{kind}/{id}", get(ws_handler))
            .route("/syllabus/{id}", get(get_syllabus))
            .route("/syllabus/{id}/feedback", post(post_feedback))
            .route("/syllabus/{id}/approve", post(post_approve))
            .with_state(Arc::clone(&state));

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await?;
        let addr = listener.local_addr()?;
        let task = tokio::spawn(async move {
            let _ = axum::serve(listener, router).await;
        });
        Ok(Self { addr, state, task })
    }

    /// Sync config pointed at this server, with short reconnect delays.
    pub fn config(&self) -> SyncConfig {
        SyncConfig {
            api_url: format!("http://{}", self.addr),
            retry_floor_ms: 50,
            retry_ceiling_ms: 200,
            ..SyncConfig::default()
        }
    }

    pub fn ws_base(&self) -> String {
        format!("ws://{}", self.addr)
    }

    pub fn set_syllabus(&self, id: i64, body: Value) {
        self.state.syllabi.lock().insert(id, body);
    }

    pub fn fail_submissions(&self) {
        self.state.fail_submissions.store(true, Ordering::Relaxed);
    }

    /// Send a text frame to every connection on `stream` (e.g. `"syllabus/1"`).
    pub fn push(&self, stream: &str, frame: Value) {
        let _ = self.state.push.send(Push::Frame(stream.to_owned(), frame.to_string()));
    }

    /// Close every connection on `stream` from the server side.
    pub fn drop_stream(&self, stream: &str) {
        let _ = self.state.push.send(Push::Drop(stream.to_owned()));
    }

    /// Drop every connection on `stream` without a close handshake.
    pub fn reset_stream(&self, stream: &str) {
        let _ = self.state.push.send(Push::Reset(stream.to_owned()));
    }

    /// Push channel connections accepted so far.
    pub fn accepted(&self) -> usize {
        self.state.accepted.load(Ordering::SeqCst)
    }

    pub fn live(&self) -> usize {
        self.state.live.load(Ordering::SeqCst)
    }

    pub async fn wait_accepted(&self, n: usize) -> anyhow::Result<()> {
        self.wait_until(|s| s.accepted() >= n).await
    }

    pub async fn wait_live(&self, n: usize) -> anyhow::Result<()> {
        self.wait_until(|s| s.live() == n).await
    }

    async fn wait_until(&self, cond: impl Fn(&Self) -> bool) -> anyhow::Result<()> {
        let deadline = tokio::time::Instant::now() + WAIT;
        while !cond(self) {
            if tokio::time::Instant::now() > deadline {
                anyhow::bail!(
                    "fake server condition not met (accepted={}, live={})",
                    self.accepted(),
                    self.live()
                );
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        Ok(())
    }

    pub fn feedback(&self) -> Vec<(i64, String)> {
        self.state.feedback.lock().clone()
    }

    pub fn approvals(&self) -> Vec<i64> {
        self.state.approvals.lock().clone()
    }
}

impl Drop for FakeServer {
    fn drop(&mut self) {
        self.task.abort();
    }
}

async fn ws_handler(
    State(state): State<Arc<FakeState>>,
    Path((kind, id)): Path<(String, i64)>,
    ws: WebSocketUpgrade,
) -> Response {
    let key = format!("{kind}/{id}");
    // Subscribe before upgrading so nothing pushed after accept is missed.
    let pushes = state.push.subscribe();
    ws.on_upgrade(move |socket| serve_stream(state, key, socket, pushes))
}

async fn serve_stream(
    state: Arc<FakeState>,
    key: String,
    socket: WebSocket,
    mut pushes: broadcast::Receiver<Push>,
) {
    state.live.fetch_add(1, Ordering::SeqCst);
    state.accepted.fetch_add(1, Ordering::SeqCst);

    let (mut tx, mut rx) = socket.split();
    loop {
        tokio::select! {
            push = pushes.recv() => match push {
                Ok(Push::Frame(stream, text)) if stream == key => {
                    if tx.send(Message::Text(text.into())).await.is_err() {
                        break;
                    }
                }
                Ok(Push::Drop(stream)) if stream == key => {
                    let _ = tx.send(Message::Close(None)).await;
                    break;
                }
                // Dropping both halves tears down the TCP stream with no close frame.
                Ok(Push::Reset(stream)) if stream == key => break,
                Ok(_) | Err(broadcast::error::RecvError::Lagged(_)) => {}
                Err(broadcast::error::RecvError::Closed) => break,
            },
            msg = rx.next() => match msg {
                Some(Ok(Message::Close(_))) | Some(Err(_)) | None => break,
                Some(Ok(_)) => {}
            },
        }
    }

    state.live.fetch_sub(1, Ordering::SeqCst);
}

async fn get_syllabus(State(state): State<Arc<FakeState>>, Path(id): Path<i64>) -> Response {
    match state.syllabi.lock().get(&id).cloned() {
        Some(body) => Json(body).into_response(),
        None => StatusCode::NOT_FOUND.into_response(),
    }
}

async fn post_feedback(
    State(state): State<Arc<FakeState>>,
    Path(id): Path<i64>,
    Json(body): Json<Value>,
) -> StatusCode {
    let text = body.get("feedback").and_then(Value::as_str).unwrap_or_default().to_owned();
    state.feedback.lock().push((id, text));
    submission_status(&state)
}

async fn post_approve(State(state): State<Arc<FakeState>>, Path(id): Path<i64>) -> StatusCode {
    state.approvals.lock().push(id);
    submission_status(&state)
}

fn submission_status(state: &FakeState) -> StatusCode {
    if state.fail_submissions.load(Ordering::Relaxed) {
        StatusCode::BAD_GATEWAY
    } else {
        StatusCode::OK
    }
}
