// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Rich context assembly for the LLM analysis path.
//!
//! Pulls together what the model needs to reason about one checker: its
//! recent reports, the regression diff against the previous report, recent
//! file-change batches, and aggregate event counts.

use crate::store::{Store, StoreError};
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::BTreeMap;
use vigil_core::check::{CheckStatus, PhaseReport};
use vigil_core::event::EventPayload;
use vigil_core::workspace::WorkspaceId;

/// One historical report with when it was taken.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ReportSnapshot {
    pub timestamp: DateTime<Utc>,
    pub report: PhaseReport,
}

/// A check that moved from PASS to FAIL/WARN between the two most recent
/// reports.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RegressionEntry {
    pub check: String,
    pub prev_status: CheckStatus,
    pub cur_status: CheckStatus,
}

/// Everything the prompt builder gets to see for one checker.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct LlmContext {
    /// Up to 3 most recent reports for the checker, newest first.
    pub recent_reports: Vec<ReportSnapshot>,
    pub regression: Vec<RegressionEntry>,
    /// Up to 10 recent file-change batch summaries, newest first.
    pub recent_changes: Vec<String>,
    pub event_counts: BTreeMap<String, i64>,
}

impl LlmContext {
    /// Render the context as the prompt's evidence block.
    pub fn render(&self) -> String {
        let mut out = String::new();
        if !self.regression.is_empty() {
            out.push_str("Regressions since the previous report:\n");
            for entry in &self.regression {
                out.push_str(&format!(
                    "- {}: {} -> {}\n",
                    entry.check,
                    entry.prev_status.as_str(),
                    entry.cur_status.as_str()
                ));
            }
        }
        if !self.recent_changes.is_empty() {
            out.push_str("Recent file changes:\n");
            for change in &self.recent_changes {
                out.push_str(&format!("- {change}\n"));
            }
        }
        if !self.event_counts.is_empty() {
            let counts: Vec<String> = self
                .event_counts
                .iter()
                .map(|(k, v)| format!("{k}={v}"))
                .collect();
            out.push_str(&format!("Event totals: {}\n", counts.join(", ")));
        }
        out
    }
}

const MAX_REPORTS: usize = 3;
const MAX_CHANGES: usize = 10;

impl Store {
    /// Build the LLM context for one checker in one workspace.
    pub fn llm_context(
        &self,
        workspace_id: &WorkspaceId,
        project_name: &str,
        checker: &str,
    ) -> Result<LlmContext, StoreError> {
        let mut context = LlmContext::default();

        // Recent reports: scan history rows that include this checker.
        for row in self.scan_history(workspace_id, project_name, 25, 0)? {
            if let Some(report) = row.reports.get(checker) {
                context.recent_reports.push(ReportSnapshot {
                    timestamp: row.timestamp,
                    report: report.clone(),
                });
                if context.recent_reports.len() == MAX_REPORTS {
                    break;
                }
            }
        }

        // Regression diff between the two newest reports.
        if let [cur, prev, ..] = context.recent_reports.as_slice() {
            context.regression = regression_diff(&prev.report, &cur.report);
        }

        // Recent file-change batches, summarized.
        let events = self.recent_events(workspace_id, None, 200)?;
        for stored in events {
            if let EventPayload::FileChanged {
                changes,
                affected_checkers,
                file_count,
            } = &stored.event.payload
            {
                let paths: Vec<&str> = changes
                    .iter()
                    .take(5)
                    .map(|c| c.relative_path.as_str())
                    .collect();
                context.recent_changes.push(format!(
                    "{}: {} file(s) [{}] -> {}",
                    stored.event.timestamp.format("%Y-%m-%d %H:%M:%S"),
                    file_count,
                    paths.join(", "),
                    affected_checkers.join(", "),
                ));
                if context.recent_changes.len() == MAX_CHANGES {
                    break;
                }
            }
        }

        context.event_counts = self.count_events(workspace_id)?;
        Ok(context)
    }
}

/// Checks that were PASS in `prev` and FAIL/WARN in `cur`.
pub fn regression_diff(prev: &PhaseReport, cur: &PhaseReport) -> Vec<RegressionEntry> {
    let mut entries = Vec::new();
    for result in &cur.results {
        if !matches!(result.status, CheckStatus::Fail | CheckStatus::Warn) {
            continue;
        }
        if prev.check_status(&result.name) == Some(CheckStatus::Pass) {
            entries.push(RegressionEntry {
                check: result.name.clone(),
                prev_status: CheckStatus::Pass,
                cur_status: result.status,
            });
        }
    }
    entries
}

#[cfg(test)]
#[path = "context_tests.rs"]
mod tests;
