// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Event emitter: memory -> durable store -> SSE clients, in that order.
//!
//! One process-wide counter assigns each emitted event its id, which is
//! also the durable row id and the SSE frame id. Store write failures are
//! logged and swallowed; the loop never stops because a row could not be
//! written.

use crate::sse::{SseFrame, SseHub};
use parking_lot::Mutex;
use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::Arc;
use vigil_core::event::Event;
use vigil_engine::AgentMemory;
use vigil_storage::Store;

/// Process-wide monotonic event id source, seeded from the store so ids
/// keep increasing across restarts.
pub struct EventCounter {
    next: AtomicI64,
}

impl EventCounter {
    pub fn seeded(last_id: i64) -> Self {
        Self {
            next: AtomicI64::new(last_id),
        }
    }

    pub fn next(&self) -> i64 {
        self.next.fetch_add(1, Ordering::SeqCst) + 1
    }
}

/// Multiplexes every emitted event to the three sinks.
pub struct EventEmitter {
    memory: Arc<Mutex<AgentMemory>>,
    store: Arc<Store>,
    hub: Arc<SseHub>,
    counter: Arc<EventCounter>,
}

impl EventEmitter {
    pub fn new(
        memory: Arc<Mutex<AgentMemory>>,
        store: Arc<Store>,
        hub: Arc<SseHub>,
        counter: Arc<EventCounter>,
    ) -> Self {
        Self {
            memory,
            store,
            hub,
            counter,
        }
    }

    /// Emit one event; returns its assigned id.
    pub fn emit(&self, event: &Event) -> i64 {
        let id = self.counter.next();
        tracing::debug!(id, event = %event.log_summary(), "emit");

        self.memory.lock().record_event(event.clone());

        if let Err(e) = self.store.insert_event(id, event) {
            tracing::warn!(id, error = %e, "event store write failed");
        }

        self.hub.broadcast(SseFrame {
            id: id as u64,
            event: event.clone(),
        });
        id
    }
}

#[cfg(test)]
#[path = "emitter_tests.rs"]
mod tests;
