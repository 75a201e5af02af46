// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! SSE fan-out hub with replay planning.
//!
//! Each connected client gets a bounded queue; a client that cannot keep up
//! is dropped on the sending path, under the same mutex that guards the
//! client set. Frame ids come from the process-wide event counter, so they
//! are strictly monotonic and identical to the durable row ids; that is
//! what makes `Last-Event-ID` replay a plain range query.

use parking_lot::Mutex;
use serde::Serialize;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::mpsc;
use vigil_core::event::Event;
use vigil_core::workspace::WorkspaceId;
use vigil_storage::{Store, StoredEvent};

/// Queue capacity per SSE client.
const CLIENT_QUEUE_CAPACITY: usize = 200;

/// One outbound live frame.
#[derive(Debug, Clone)]
pub struct SseFrame {
    pub id: u64,
    pub event: Event,
}

/// Fan-out hub for one workspace's SSE clients.
#[derive(Default)]
pub struct SseHub {
    clients: Mutex<HashMap<u64, mpsc::Sender<SseFrame>>>,
    next_client_id: AtomicU64,
}

impl SseHub {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a client; returns its id and frame queue.
    pub fn register(&self) -> (u64, mpsc::Receiver<SseFrame>) {
        let (tx, rx) = mpsc::channel(CLIENT_QUEUE_CAPACITY);
        let client_id = self.next_client_id.fetch_add(1, Ordering::SeqCst);
        self.clients.lock().insert(client_id, tx);
        (client_id, rx)
    }

    pub fn unregister(&self, client_id: u64) {
        self.clients.lock().remove(&client_id);
    }

    pub fn client_count(&self) -> usize {
        self.clients.lock().len()
    }

    /// Send a frame to every client, dropping the ones that are full or
    /// gone.
    pub fn broadcast(&self, frame: SseFrame) {
        let mut clients = self.clients.lock();
        clients.retain(|client_id, tx| match tx.try_send(frame.clone()) {
            Ok(()) => true,
            Err(mpsc::error::TrySendError::Full(_)) => {
                tracing::warn!(client_id, "SSE client queue full, dropping client");
                false
            }
            Err(mpsc::error::TrySendError::Closed(_)) => false,
        });
    }
}

/// Unregisters a client when its stream is dropped.
pub struct ClientGuard {
    hub: Arc<SseHub>,
    client_id: u64,
}

impl ClientGuard {
    pub fn new(hub: Arc<SseHub>, client_id: u64) -> Self {
        Self { hub, client_id }
    }
}

impl Drop for ClientGuard {
    fn drop(&mut self) {
        self.hub.unregister(self.client_id);
    }
}

/// Synthetic `_gap` frame payload sent when replay was truncated.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GapInfo {
    pub from_id: i64,
    pub to_id: i64,
    pub dropped_count: i64,
    pub replayed: usize,
    pub message: String,
}

/// What a reconnecting client gets before live frames resume.
#[derive(Debug, Default)]
pub struct ReplayPlan {
    pub gap: Option<GapInfo>,
    /// Ascending by id; live frames continue strictly above the last one.
    pub events: Vec<StoredEvent>,
}

impl ReplayPlan {
    /// Highest replayed id, if anything was replayed.
    pub fn max_replayed_id(&self) -> Option<i64> {
        self.events.last().map(|e| e.id)
    }
}

/// Plan the replay for a client that last saw `last_event_id`.
///
/// Replays the newest `limit` missed events in ascending order. When more
/// than `limit` were missed, the older ones are summarized by a `_gap`
/// frame so the client can fall back to paginated history.
pub fn plan_replay(
    store: &Store,
    workspace_id: &WorkspaceId,
    last_event_id: i64,
    limit: usize,
) -> ReplayPlan {
    let mut events = match store.recent_events(workspace_id, Some(last_event_id), limit) {
        Ok(events) => events,
        Err(e) => {
            tracing::warn!(error = %e, "replay query failed");
            return ReplayPlan::default();
        }
    };
    events.reverse();

    let missed = store
        .count_events_after(workspace_id, last_event_id)
        .unwrap_or(events.len() as i64);

    let gap = if missed > limit as i64 {
        let first_replayed = events.first().map(|e| e.id).unwrap_or(last_event_id);
        Some(GapInfo {
            from_id: last_event_id,
            to_id: first_replayed - 1,
            dropped_count: missed - limit as i64,
            replayed: events.len(),
            message: format!(
                "{} events could not be replayed; use the history API to catch up",
                missed - limit as i64
            ),
        })
    } else {
        None
    };

    ReplayPlan { gap, events }
}

#[cfg(test)]
#[path = "sse_tests.rs"]
mod tests;
