// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Event types for the Vigil agent loop.
//!
//! Every event is an envelope `{type, data, timestamp, source, workspace_id}`
//! on the wire; cross-workspace leakage is forbidden, so the workspace tag is
//! mandatory on every variant.

use crate::agent::AgentPhase;
use crate::analysis::LlmAnalysis;
use crate::check::{PhaseReport, ScanResult};
use crate::insight::Insight;
use crate::workspace::WorkspaceId;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// What kind of change the observer saw for a single path
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FileChangeKind {
    Created,
    Modified,
    Deleted,
}

impl FileChangeKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            FileChangeKind::Created => "created",
            FileChangeKind::Modified => "modified",
            FileChangeKind::Deleted => "deleted",
        }
    }
}

/// A single file change observed in the workspace tree
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileChange {
    pub path: PathBuf,
    pub change_type: FileChangeKind,
    /// Lowercased extension including the leading dot (e.g. `.py`, `.env`).
    pub extension: String,
    /// Path relative to the workspace root.
    pub relative_path: String,
}

/// Where an event originated
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventSource {
    Observer,
    Api,
    Agent,
    System,
}

impl EventSource {
    pub fn as_str(&self) -> &'static str {
        match self {
            EventSource::Observer => "observer",
            EventSource::Api => "api",
            EventSource::Agent => "agent",
            EventSource::System => "system",
        }
    }
}

/// Outcome carried by a `scan_completed` event.
///
/// Either a full scan result, or a skip marker when the scan lock was busy.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScanOutcome {
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub skipped: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
    #[serde(flatten)]
    pub scan: Option<ScanResult>,
}

impl ScanOutcome {
    pub fn completed(scan: ScanResult) -> Self {
        Self {
            skipped: false,
            reason: None,
            scan: Some(scan),
        }
    }

    pub fn skipped(reason: impl Into<String>) -> Self {
        Self {
            skipped: true,
            reason: Some(reason.into()),
            scan: None,
        }
    }
}

/// Event payload, tagged `type` with variant fields under `data`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "data", rename_all = "snake_case")]
pub enum EventPayload {
    /// Batched outcome of one debounce window
    FileChanged {
        changes: Vec<FileChange>,
        affected_checkers: Vec<String>,
        file_count: usize,
    },

    FileCreated { change: FileChange },

    FileDeleted { change: FileChange },

    ScanRequested {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        checker_names: Option<Vec<String>>,
        /// Set when the manual-scan rate limiter rejected this request.
        #[serde(default, skip_serializing_if = "std::ops::Not::not")]
        rate_limited: bool,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        retry_after: Option<f64>,
    },

    ScanCompleted(ScanOutcome),

    CriticalDetected {
        scan_id: i64,
        failing_checkers: Vec<String>,
    },

    LlmAnalysisRequested { checker_name: String },

    LlmAnalysisCompleted {
        checker_name: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        analysis: Option<LlmAnalysis>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        error: Option<String>,
    },

    FixRequested {
        checker_name: String,
        check_name: String,
    },

    FixCompleted {
        checker_name: String,
        check_name: String,
        success: bool,
        message: String,
    },

    AgentStateChanged { old: AgentPhase, new: AgentPhase },

    InsightGenerated { insights: Vec<Insight> },
}

impl EventPayload {
    /// Wire name of this event type.
    pub fn name(&self) -> &'static str {
        match self {
            EventPayload::FileChanged { .. } => "file_changed",
            EventPayload::FileCreated { .. } => "file_created",
            EventPayload::FileDeleted { .. } => "file_deleted",
            EventPayload::ScanRequested { .. } => "scan_requested",
            EventPayload::ScanCompleted { .. } => "scan_completed",
            EventPayload::CriticalDetected { .. } => "critical_detected",
            EventPayload::LlmAnalysisRequested { .. } => "llm_analysis_requested",
            EventPayload::LlmAnalysisCompleted { .. } => "llm_analysis_completed",
            EventPayload::FixRequested { .. } => "fix_requested",
            EventPayload::FixCompleted { .. } => "fix_completed",
            EventPayload::AgentStateChanged { .. } => "agent_state_changed",
            EventPayload::InsightGenerated { .. } => "insight_generated",
        }
    }
}

/// An event flowing through the agent loop.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Event {
    pub timestamp: DateTime<Utc>,
    pub source: EventSource,
    pub workspace_id: WorkspaceId,
    #[serde(flatten)]
    pub payload: EventPayload,
}

impl Event {
    pub fn new(workspace_id: WorkspaceId, source: EventSource, payload: EventPayload) -> Self {
        Self {
            timestamp: Utc::now(),
            source,
            workspace_id,
            payload,
        }
    }

    /// Override the timestamp (used by tests and replayed fixtures).
    pub fn with_timestamp(mut self, timestamp: DateTime<Utc>) -> Self {
        self.timestamp = timestamp;
        self
    }

    pub fn name(&self) -> &'static str {
        self.payload.name()
    }

    /// One-line summary for the daemon log.
    pub fn log_summary(&self) -> String {
        let t = self.name();
        let ws = self.workspace_id.short(10);
        match &self.payload {
            EventPayload::FileChanged {
                file_count,
                affected_checkers,
                ..
            } => format!(
                "{t} ws={ws} files={file_count} checkers={}",
                affected_checkers.len()
            ),
            EventPayload::FileCreated { change } | EventPayload::FileDeleted { change } => {
                format!("{t} ws={ws} path={}", change.relative_path)
            }
            EventPayload::ScanRequested {
                checker_names,
                rate_limited,
                ..
            } => {
                let n = checker_names.as_ref().map(|c| c.len());
                match (n, rate_limited) {
                    (_, true) => format!("{t} ws={ws} rate_limited"),
                    (Some(n), _) => format!("{t} ws={ws} checkers={n}"),
                    (None, _) => format!("{t} ws={ws} checkers=all"),
                }
            }
            EventPayload::ScanCompleted(outcome) => {
                if outcome.skipped {
                    format!(
                        "{t} ws={ws} skipped reason={}",
                        outcome.reason.as_deref().unwrap_or("unknown")
                    )
                } else if let Some(scan) = &outcome.scan {
                    format!(
                        "{t} ws={ws} id={} overall={} fail={}",
                        scan.scan_id, scan.overall, scan.totals.fail
                    )
                } else {
                    format!("{t} ws={ws}")
                }
            }
            EventPayload::CriticalDetected {
                scan_id,
                failing_checkers,
            } => format!(
                "{t} ws={ws} scan={scan_id} failing={}",
                failing_checkers.join(",")
            ),
            EventPayload::LlmAnalysisRequested { checker_name } => {
                format!("{t} ws={ws} checker={checker_name}")
            }
            EventPayload::LlmAnalysisCompleted {
                checker_name,
                analysis,
                error,
            } => match (analysis, error) {
                (Some(a), _) => format!(
                    "{t} ws={ws} checker={checker_name} model={} cost={:.4}",
                    a.model_used, a.cost_usd
                ),
                (None, Some(e)) => format!("{t} ws={ws} checker={checker_name} error={e}"),
                (None, None) => format!("{t} ws={ws} checker={checker_name}"),
            },
            EventPayload::FixRequested {
                checker_name,
                check_name,
            } => format!("{t} ws={ws} checker={checker_name} check={check_name}"),
            EventPayload::FixCompleted {
                checker_name,
                check_name,
                success,
                ..
            } => format!("{t} ws={ws} checker={checker_name} check={check_name} success={success}"),
            EventPayload::AgentStateChanged { old, new } => {
                format!("{t} ws={ws} {old} -> {new}")
            }
            EventPayload::InsightGenerated { insights } => {
                format!("{t} ws={ws} insights={}", insights.len())
            }
        }
    }

    /// The report a completed scan produced for one checker, if any.
    pub fn scan_report(&self, checker: &str) -> Option<&PhaseReport> {
        match &self.payload {
            EventPayload::ScanCompleted(outcome) => {
                outcome.scan.as_ref().and_then(|s| s.reports.get(checker))
            }
            _ => None,
        }
    }
}

#[cfg(test)]
#[path = "event_tests.rs"]
mod tests;
