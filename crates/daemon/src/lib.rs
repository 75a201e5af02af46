// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! vigil-daemon: the `vigild` process
//!
//! Hosts one agent per workspace: the Observe-Reason-Act loop, the SSE
//! fan-out, the HTTP API, and the per-workspace singleton lock. The binary
//! in `main.rs` wires a primary workspace plus any registered extras and
//! serves the API until signalled.

pub mod agent;
pub mod emitter;
pub mod env;
pub mod lifecycle;
pub mod listener;
pub mod registry;
pub mod singleton;
pub mod sse;

pub use agent::{Agent, AgentStatus, ScanRequestOutcome, StartOutcome};
pub use emitter::{EventCounter, EventEmitter};
pub use lifecycle::{LifecycleError, Paths};
pub use listener::AppState;
pub use singleton::SingletonLock;
pub use sse::{plan_replay, GapInfo, ReplayPlan, SseFrame, SseHub};
