// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Retention purge for the durable store.
//!
//! Runs at agent start and periodically during the loop. Idempotent for a
//! fixed clock: a second purge with the same `now` deletes nothing.

use crate::store::{Store, StoreError};
use chrono::{DateTime, Duration, Utc};
use rusqlite::params;
use serde::Serialize;
use vigil_core::config::RetentionConfig;

/// Per-table deletion counts from one purge pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct PurgeOutcome {
    pub events_removed: u64,
    pub analyses_removed: u64,
    pub insights_removed: u64,
}

impl PurgeOutcome {
    pub fn total(&self) -> u64 {
        self.events_removed + self.analyses_removed + self.insights_removed
    }
}

impl Store {
    /// Delete rows beyond the retention bounds.
    ///
    /// `agent_events` is bounded both by row count and by age;
    /// `llm_analyses` and `agent_insights` by age only.
    pub fn purge(
        &self,
        retention: &RetentionConfig,
        now: DateTime<Utc>,
    ) -> Result<PurgeOutcome, StoreError> {
        let event_cutoff = (now - Duration::days(retention.event_max_days as i64)).to_rfc3339();
        let analysis_cutoff =
            (now - Duration::days(retention.analysis_max_days as i64)).to_rfc3339();

        let conn = self.conn.lock();
        let mut outcome = PurgeOutcome::default();

        // Age bound first, then the row cap over what survives.
        conn.execute(
            "DELETE FROM agent_events WHERE timestamp < ?1",
            params![event_cutoff],
        )?;
        outcome.events_removed += conn.changes();
        conn.execute(
            "DELETE FROM agent_events WHERE id NOT IN
             (SELECT id FROM agent_events ORDER BY id DESC LIMIT ?1)",
            params![retention.event_max_rows as i64],
        )?;
        outcome.events_removed += conn.changes();

        conn.execute(
            "DELETE FROM llm_analyses WHERE timestamp < ?1",
            params![analysis_cutoff],
        )?;
        outcome.analyses_removed = conn.changes();

        conn.execute(
            "DELETE FROM agent_insights WHERE timestamp < ?1",
            params![event_cutoff],
        )?;
        outcome.insights_removed = conn.changes();

        if outcome.total() > 0 {
            tracing::info!(
                events = outcome.events_removed,
                analyses = outcome.analyses_removed,
                insights = outcome.insights_removed,
                "retention purge removed rows"
            );
        }
        Ok(outcome)
    }
}

#[cfg(test)]
#[path = "purge_tests.rs"]
mod tests;
