// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! vigil-storage: durable event store for the Vigil agent
//!
//! A single SQLite database (WAL journaling, one writer / many readers)
//! holds four workspace-tagged tables: `scan_history`, `agent_events`,
//! `llm_analyses`, and `agent_insights`. Writes are small, single-row, and
//! best-effort; callers log and swallow failures rather than stopping the
//! agent loop.

mod context;
mod purge;
mod store;

pub use context::{LlmContext, RegressionEntry, ReportSnapshot};
pub use purge::PurgeOutcome;
pub use store::{ScanRow, Store, StoreError, StoredAnalysis, StoredEvent, StoredInsight};
