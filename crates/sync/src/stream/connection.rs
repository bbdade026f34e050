// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Push channel connections, at most one live per [`StreamIdentity`].
//!
//! Each connection is a single WebSocket attempt: it connects, forwards text
//! frames, and ends with exactly one [`StreamEvent::Close`]. It never retries
//! on its own; reconnecting means calling [`ConnectionRegistry::open`] again,
//! which starts a new generation.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use futures_util::{SinkExt, StreamExt};
use parking_lot::Mutex;
use tokio::sync::broadcast;
use tokio_tungstenite::tungstenite::Message;
use tokio_util::sync::CancellationToken;

use super::{ConnectionState, StreamIdentity};

/// Lifecycle event of one connection generation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StreamEvent {
    Open,
    Message(String),
    Error(String),
    Close,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StreamSignal {
    pub identity: StreamIdentity,
    pub generation: u64,
    pub event: StreamEvent,
}

/// Result of [`ConnectionRegistry::open`].
pub struct Attachment {
    pub generation: u64,
    /// `true` when an existing live connection was reused.
    pub reused: bool,
    /// Connection state at the moment of attaching.
    pub state: ConnectionState,
    pub signals: broadcast::Receiver<StreamSignal>,
}

struct LiveConnection {
    generation: u64,
    state: Arc<Mutex<ConnectionState>>,
    cancel: CancellationToken,
    tx: broadcast::Sender<StreamSignal>,
}

/// Registry of push channel connections keyed by identity.
pub struct ConnectionRegistry {
    connections: Mutex<HashMap<StreamIdentity, LiveConnection>>,
    next_generation: AtomicU64,
}

impl Default for ConnectionRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl ConnectionRegistry {
    pub fn new() -> Self {
        Self { connections: Mutex::new(HashMap::new()), next_generation: AtomicU64::new(0) }
    }

    /// Attach to the connection for `identity`, opening one if needed.
    ///
    /// A live (`Connecting`/`Open`) connection is reused. A stale one is
    /// closed before the new connection is requested.
    pub fn open(&self, identity: StreamIdentity, url: &str) -> Attachment {
        let mut connections = self.connections.lock();

        if let Some(existing) = connections.get(&identity) {
            // Subscribe before reading the state: the connection task flips to
            // Open without the registry lock, so either the state reads Open or
            // the Open signal lands in this receiver.
            let signals = existing.tx.subscribe();
            let state = *existing.state.lock();
            if state.is_live() && !existing.cancel.is_cancelled() {
                tracing::debug!(stream = %identity, generation = existing.generation, "reusing live connection");
                return Attachment { generation: existing.generation, reused: true, state, signals };
            }
        }

        if let Some(stale) = connections.remove(&identity) {
            shut(&stale);
        }

        let generation = self.next_generation.fetch_add(1, Ordering::Relaxed) + 1;
        let state = Arc::new(Mutex::new(ConnectionState::Connecting));
        let cancel = CancellationToken::new();
        let (tx, signals) = broadcast::channel(256);

        connections.insert(
            identity,
            LiveConnection {
                generation,
                state: Arc::clone(&state),
                cancel: cancel.clone(),
                tx: tx.clone(),
            },
        );
        drop(connections);

        tracing::debug!(stream = %identity, generation, "opening connection");
        tokio::spawn(run_connection(identity, generation, url.to_owned(), state, cancel, tx));

        Attachment { generation, reused: false, state: ConnectionState::Connecting, signals }
    }

    /// Close the connection for `identity`. No-op when absent or already closed.
    pub fn close(&self, identity: StreamIdentity) {
        if let Some(conn) = self.connections.lock().remove(&identity) {
            tracing::debug!(stream = %identity, generation = conn.generation, "closing connection");
            shut(&conn);
        }
    }

    pub fn state(&self, identity: StreamIdentity) -> ConnectionState {
        self.connections
            .lock()
            .get(&identity)
            .map(|c| *c.state.lock())
            .unwrap_or(ConnectionState::Closed)
    }

    /// Number of connections currently `Connecting` or `Open`.
    pub fn live_count(&self) -> usize {
        self.connections.lock().values().filter(|c| c.state.lock().is_live()).count()
    }

    /// Close every connection.
    pub fn close_all(&self) {
        let drained: Vec<_> = self.connections.lock().drain().map(|(_, c)| c).collect();
        for conn in &drained {
            shut(conn);
        }
    }
}

fn shut(conn: &LiveConnection) {
    {
        let mut state = conn.state.lock();
        if state.is_live() {
            *state = ConnectionState::Closing;
        }
    }
    conn.cancel.cancel();
}

fn set_state(state: &Mutex<ConnectionState>, next: ConnectionState) {
    *state.lock() = next;
}

/// Drive one connection attempt until it closes.
async fn run_connection(
    identity: StreamIdentity,
    generation: u64,
    url: String,
    state: Arc<Mutex<ConnectionState>>,
    cancel: CancellationToken,
    tx: broadcast::Sender<StreamSignal>,
) {
    let emit = |event: StreamEvent| {
        // No subscribers left is fine.
        let _ = tx.send(StreamSignal { identity, generation, event });
    };

    let connected = tokio::select! {
        _ = cancel.cancelled() => None,
        result = tokio_tungstenite::connect_async(&url) => Some(result),
    };

    match connected {
        None => {}
        Some(Err(e)) => {
            tracing::debug!(stream = %identity, generation, err = %e, "connect failed");
            emit(StreamEvent::Error(e.to_string()));
        }
        Some(Ok((ws_stream, _))) => {
            set_state(&state, ConnectionState::Open);
            tracing::debug!(stream = %identity, generation, "connected");
            emit(StreamEvent::Open);

            let (mut write, mut read) = ws_stream.split();
            loop {
                tokio::select! {
                    _ = cancel.cancelled() => {
                        let _ = write.send(Message::Close(None)).await;
                        break;
                    }
                    msg = read.next() => {
                        match msg {
                            Some(Ok(Message::Text(text))) => {
                                emit(StreamEvent::Message(text.to_string()));
                            }
                            Some(Ok(Message::Close(_))) | None => {
                                tracing::debug!(stream = %identity, generation, "closed by peer");
                                break;
                            }
                            Some(Err(e)) => {
                                tracing::debug!(stream = %identity, generation, err = %e, "stream error");
                                emit(StreamEvent::Error(e.to_string()));
                                // Never leave a half-open socket behind an error.
                                set_state(&state, ConnectionState::Closing);
                                let _ = write.close().await;
                                break;
                            }
                            _ => {} // ping/pong/binary ignored
                        }
                    }
                }
            }
        }
    }

    set_state(&state, ConnectionState::Closed);
    emit(StreamEvent::Close);
}
