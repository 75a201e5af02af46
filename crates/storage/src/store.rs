// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! SQLite-backed durable store.
//!
//! `agent_events.id` is assigned by the caller from the process-wide event
//! counter, so SSE frame ids and durable row ids are the same number; the
//! other tables autoincrement. All timestamps are RFC 3339 UTC text, which
//! keeps lexicographic and chronological order identical for range scans.

use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use rusqlite::{params, Connection, OptionalExtension};
use serde::Serialize;
use std::collections::BTreeMap;
use std::path::Path;
use thiserror::Error;
use vigil_core::check::{PhaseReport, ScanResult};
use vigil_core::event::{Event, EventPayload, EventSource};
use vigil_core::insight::Insight;
use vigil_core::workspace::WorkspaceId;
use vigil_core::LlmAnalysis;

/// Storage errors
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("failed to open store at {path}: {source}")]
    Open {
        path: std::path::PathBuf,
        #[source]
        source: rusqlite::Error,
    },

    #[error("sqlite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("row encoding error: {0}")]
    Encoding(#[from] serde_json::Error),
}

const SCHEMA: &str = "
CREATE TABLE IF NOT EXISTS scan_history (
    id             INTEGER PRIMARY KEY AUTOINCREMENT,
    timestamp      TEXT NOT NULL,
    project_name   TEXT NOT NULL,
    overall_status TEXT NOT NULL,
    total_pass     INTEGER NOT NULL,
    total_warn     INTEGER NOT NULL,
    total_fail     INTEGER NOT NULL,
    health_pct     REAL NOT NULL,
    phases_json    TEXT NOT NULL,
    duration_ms    INTEGER NOT NULL,
    workspace_id   TEXT NOT NULL
);
CREATE INDEX IF NOT EXISTS idx_scan_history_ws ON scan_history(workspace_id, project_name, id);

CREATE TABLE IF NOT EXISTS agent_events (
    id           INTEGER PRIMARY KEY,
    timestamp    TEXT NOT NULL,
    event_type   TEXT NOT NULL,
    source       TEXT NOT NULL,
    data_json    TEXT NOT NULL,
    workspace_id TEXT NOT NULL
);
CREATE INDEX IF NOT EXISTS idx_agent_events_ws ON agent_events(workspace_id, id);

CREATE TABLE IF NOT EXISTS llm_analyses (
    id                   INTEGER PRIMARY KEY AUTOINCREMENT,
    timestamp            TEXT NOT NULL,
    checker_name         TEXT NOT NULL,
    model_used           TEXT NOT NULL,
    prompt_tokens        INTEGER NOT NULL,
    completion_tokens    INTEGER NOT NULL,
    cost_usd             REAL NOT NULL,
    analysis_text        TEXT NOT NULL,
    root_causes_json     TEXT NOT NULL,
    fix_suggestions_json TEXT NOT NULL,
    evidence_json        TEXT NOT NULL,
    workspace_id         TEXT NOT NULL
);
CREATE INDEX IF NOT EXISTS idx_llm_analyses_ws ON llm_analyses(workspace_id, id);

CREATE TABLE IF NOT EXISTS agent_insights (
    id            INTEGER PRIMARY KEY AUTOINCREMENT,
    timestamp     TEXT NOT NULL,
    insight_type  TEXT NOT NULL,
    severity      TEXT NOT NULL,
    message       TEXT NOT NULL,
    checkers_json TEXT NOT NULL,
    workspace_id  TEXT NOT NULL
);
CREATE INDEX IF NOT EXISTS idx_agent_insights_ws ON agent_insights(workspace_id, id);
";

/// A persisted event with its durable (= SSE frame) id.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StoredEvent {
    pub id: i64,
    #[serde(flatten)]
    pub event: Event,
}

/// A persisted analysis row.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StoredAnalysis {
    pub id: i64,
    #[serde(flatten)]
    pub analysis: LlmAnalysis,
}

/// A persisted insight row.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StoredInsight {
    pub id: i64,
    pub timestamp: DateTime<Utc>,
    #[serde(flatten)]
    pub insight: Insight,
}

/// A persisted scan with its parsed per-checker reports.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScanRow {
    pub id: i64,
    pub timestamp: DateTime<Utc>,
    pub project_name: String,
    pub overall_status: String,
    pub total_pass: u32,
    pub total_warn: u32,
    pub total_fail: u32,
    pub health_pct: f64,
    pub duration_ms: u64,
    pub reports: BTreeMap<String, PhaseReport>,
}

/// The durable store. One writer, many readers (WAL).
pub struct Store {
    pub(crate) conn: Mutex<Connection>,
}

impl Store {
    /// Open (or create) the store at `path`.
    pub fn open(path: &Path) -> Result<Self, StoreError> {
        if let Some(parent) = path.parent() {
            let _ = std::fs::create_dir_all(parent);
        }
        let conn = Connection::open(path).map_err(|source| StoreError::Open {
            path: path.to_path_buf(),
            source,
        })?;
        Self::init(conn)
    }

    /// Open an in-memory store (tests).
    pub fn open_in_memory() -> Result<Self, StoreError> {
        Self::init(Connection::open_in_memory()?)
    }

    fn init(conn: Connection) -> Result<Self, StoreError> {
        // journal_mode returns a row, so it can't go through execute_batch
        // with the other pragmas on some sqlite builds; query it explicitly.
        let _mode: String =
            conn.query_row("PRAGMA journal_mode=WAL", [], |row| row.get(0))?;
        conn.execute_batch("PRAGMA synchronous=NORMAL;")?;
        conn.execute_batch(SCHEMA)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// Highest event id ever assigned, 0 when empty.
    ///
    /// Seeds the process-wide SSE counter so frame ids stay strictly
    /// monotonic across restarts.
    pub fn max_event_id(&self) -> Result<i64, StoreError> {
        let conn = self.conn.lock();
        let max: Option<i64> =
            conn.query_row("SELECT MAX(id) FROM agent_events", [], |row| row.get(0))?;
        Ok(max.unwrap_or(0))
    }

    // === agent_events ===

    /// Persist one event under a caller-assigned id.
    pub fn insert_event(&self, id: i64, event: &Event) -> Result<(), StoreError> {
        let data_json = serde_json::to_string(&event.payload)?;
        let conn = self.conn.lock();
        conn.execute(
            "INSERT INTO agent_events (id, timestamp, event_type, source, data_json, workspace_id)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            params![
                id,
                event.timestamp.to_rfc3339(),
                event.name(),
                event.source.as_str(),
                data_json,
                event.workspace_id.as_str(),
            ],
        )?;
        Ok(())
    }

    /// Recent events for one workspace, newest first.
    pub fn recent_events(
        &self,
        workspace_id: &WorkspaceId,
        since_id: Option<i64>,
        limit: usize,
    ) -> Result<Vec<StoredEvent>, StoreError> {
        let conn = self.conn.lock();
        let mut stmt = conn.prepare(
            "SELECT id, timestamp, source, data_json FROM agent_events
             WHERE workspace_id = ?1 AND id > ?2
             ORDER BY id DESC LIMIT ?3",
        )?;
        let rows = stmt.query_map(
            params![workspace_id.as_str(), since_id.unwrap_or(0), limit as i64],
            |row| Self::event_from_row(workspace_id, row),
        )?;
        collect_rows(rows)
    }

    /// Events after `after_id` for one workspace, oldest first (SSE replay).
    pub fn events_after(
        &self,
        workspace_id: &WorkspaceId,
        after_id: i64,
        limit: usize,
    ) -> Result<Vec<StoredEvent>, StoreError> {
        let conn = self.conn.lock();
        let mut stmt = conn.prepare(
            "SELECT id, timestamp, source, data_json FROM agent_events
             WHERE workspace_id = ?1 AND id > ?2
             ORDER BY id ASC LIMIT ?3",
        )?;
        let rows = stmt.query_map(
            params![workspace_id.as_str(), after_id, limit as i64],
            |row| Self::event_from_row(workspace_id, row),
        )?;
        collect_rows(rows)
    }

    /// Count of stored events after `after_id` for one workspace.
    pub fn count_events_after(
        &self,
        workspace_id: &WorkspaceId,
        after_id: i64,
    ) -> Result<i64, StoreError> {
        let conn = self.conn.lock();
        let count = conn.query_row(
            "SELECT COUNT(*) FROM agent_events WHERE workspace_id = ?1 AND id > ?2",
            params![workspace_id.as_str(), after_id],
            |row| row.get(0),
        )?;
        Ok(count)
    }

    fn event_from_row(
        workspace_id: &WorkspaceId,
        row: &rusqlite::Row<'_>,
    ) -> rusqlite::Result<StoredEvent> {
        let id: i64 = row.get(0)?;
        let timestamp: String = row.get(1)?;
        let source: String = row.get(2)?;
        let data_json: String = row.get(3)?;

        let payload: EventPayload = serde_json::from_str(&data_json).map_err(|e| {
            rusqlite::Error::FromSqlConversionFailure(3, rusqlite::types::Type::Text, Box::new(e))
        })?;
        let source = match source.as_str() {
            "observer" => EventSource::Observer,
            "api" => EventSource::Api,
            "agent" => EventSource::Agent,
            _ => EventSource::System,
        };
        Ok(StoredEvent {
            id,
            event: Event {
                timestamp: parse_timestamp(&timestamp),
                source,
                workspace_id: workspace_id.clone(),
                payload,
            },
        })
    }

    // === scan_history ===

    pub fn insert_scan(
        &self,
        workspace_id: &WorkspaceId,
        project_name: &str,
        scan: &ScanResult,
    ) -> Result<(), StoreError> {
        let phases_json = serde_json::to_string(&scan.reports)?;
        let conn = self.conn.lock();
        conn.execute(
            "INSERT INTO scan_history
             (timestamp, project_name, overall_status, total_pass, total_warn, total_fail,
              health_pct, phases_json, duration_ms, workspace_id)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)",
            params![
                scan.scan_timestamp.to_rfc3339(),
                project_name,
                scan.overall.as_str(),
                scan.totals.pass,
                scan.totals.warn,
                scan.totals.fail,
                scan.health_pct(),
                phases_json,
                scan.duration_ms as i64,
                workspace_id.as_str(),
            ],
        )?;
        Ok(())
    }

    pub fn latest_scan(
        &self,
        workspace_id: &WorkspaceId,
        project_name: &str,
    ) -> Result<Option<ScanRow>, StoreError> {
        let conn = self.conn.lock();
        let row = conn
            .query_row(
                "SELECT id, timestamp, project_name, overall_status, total_pass, total_warn,
                        total_fail, health_pct, phases_json, duration_ms
                 FROM scan_history WHERE workspace_id = ?1 AND project_name = ?2
                 ORDER BY id DESC LIMIT 1",
                params![workspace_id.as_str(), project_name],
                Self::scan_from_row,
            )
            .optional()?;
        Ok(row)
    }

    pub fn scan_history(
        &self,
        workspace_id: &WorkspaceId,
        project_name: &str,
        limit: usize,
        offset: usize,
    ) -> Result<Vec<ScanRow>, StoreError> {
        let conn = self.conn.lock();
        let mut stmt = conn.prepare(
            "SELECT id, timestamp, project_name, overall_status, total_pass, total_warn,
                    total_fail, health_pct, phases_json, duration_ms
             FROM scan_history WHERE workspace_id = ?1 AND project_name = ?2
             ORDER BY id DESC LIMIT ?3 OFFSET ?4",
        )?;
        let rows = stmt.query_map(
            params![workspace_id.as_str(), project_name, limit as i64, offset as i64],
            Self::scan_from_row,
        )?;
        collect_rows(rows)
    }

    fn scan_from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<ScanRow> {
        let phases_json: String = row.get(8)?;
        let reports: BTreeMap<String, PhaseReport> = serde_json::from_str(&phases_json)
            .map_err(|e| {
                rusqlite::Error::FromSqlConversionFailure(
                    8,
                    rusqlite::types::Type::Text,
                    Box::new(e),
                )
            })?;
        let timestamp: String = row.get(1)?;
        Ok(ScanRow {
            id: row.get(0)?,
            timestamp: parse_timestamp(&timestamp),
            project_name: row.get(2)?,
            overall_status: row.get(3)?,
            total_pass: row.get(4)?,
            total_warn: row.get(5)?,
            total_fail: row.get(6)?,
            health_pct: row.get(7)?,
            duration_ms: row.get::<_, i64>(9)? as u64,
            reports,
        })
    }

    // === llm_analyses ===

    pub fn insert_analysis(
        &self,
        workspace_id: &WorkspaceId,
        analysis: &LlmAnalysis,
    ) -> Result<(), StoreError> {
        let evidence = serde_json::json!({
            "summary": analysis.evidence_summary,
            "request_id": analysis.request_id,
            "report_hash": analysis.report_hash,
            "report_was_fresh": analysis.report_was_fresh,
        });
        let conn = self.conn.lock();
        conn.execute(
            "INSERT INTO llm_analyses
             (timestamp, checker_name, model_used, prompt_tokens, completion_tokens, cost_usd,
              analysis_text, root_causes_json, fix_suggestions_json, evidence_json, workspace_id)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)",
            params![
                analysis.timestamp.to_rfc3339(),
                analysis.checker_name,
                analysis.model_used,
                analysis.prompt_tokens as i64,
                analysis.completion_tokens as i64,
                analysis.cost_usd,
                analysis.analysis_text,
                serde_json::to_string(&analysis.root_causes)?,
                serde_json::to_string(&analysis.fix_suggestions)?,
                evidence.to_string(),
                workspace_id.as_str(),
            ],
        )?;
        Ok(())
    }

    pub fn recent_analyses(
        &self,
        workspace_id: &WorkspaceId,
        limit: usize,
    ) -> Result<Vec<StoredAnalysis>, StoreError> {
        let conn = self.conn.lock();
        let mut stmt = conn.prepare(
            "SELECT id, timestamp, checker_name, model_used, prompt_tokens, completion_tokens,
                    cost_usd, analysis_text, root_causes_json, fix_suggestions_json, evidence_json
             FROM llm_analyses WHERE workspace_id = ?1
             ORDER BY id DESC LIMIT ?2",
        )?;
        let rows = stmt.query_map(params![workspace_id.as_str(), limit as i64], |row| {
            let timestamp: String = row.get(1)?;
            let root_causes_json: String = row.get(8)?;
            let fix_suggestions_json: String = row.get(9)?;
            let evidence_json: String = row.get(10)?;
            let evidence: serde_json::Value =
                serde_json::from_str(&evidence_json).unwrap_or_default();

            Ok(StoredAnalysis {
                id: row.get(0)?,
                analysis: LlmAnalysis {
                    request_id: evidence
                        .get("request_id")
                        .and_then(|v| v.as_str())
                        .unwrap_or_default()
                        .to_string(),
                    checker_name: row.get(2)?,
                    model_used: row.get(3)?,
                    prompt_tokens: row.get::<_, i64>(4)? as u64,
                    completion_tokens: row.get::<_, i64>(5)? as u64,
                    cost_usd: row.get(6)?,
                    analysis_text: row.get(7)?,
                    root_causes: serde_json::from_str(&root_causes_json).unwrap_or_default(),
                    fix_suggestions: serde_json::from_str(&fix_suggestions_json)
                        .unwrap_or_default(),
                    evidence_summary: evidence
                        .get("summary")
                        .and_then(|v| v.as_str())
                        .unwrap_or_default()
                        .to_string(),
                    timestamp: parse_timestamp(&timestamp),
                    report_hash: evidence
                        .get("report_hash")
                        .and_then(|v| v.as_str())
                        .unwrap_or_default()
                        .to_string(),
                    report_was_fresh: evidence
                        .get("report_was_fresh")
                        .and_then(|v| v.as_bool())
                        .unwrap_or(false),
                },
            })
        })?;
        collect_rows(rows)
    }

    // === agent_insights ===

    pub fn insert_insight(
        &self,
        workspace_id: &WorkspaceId,
        timestamp: DateTime<Utc>,
        insight: &Insight,
    ) -> Result<(), StoreError> {
        let conn = self.conn.lock();
        conn.execute(
            "INSERT INTO agent_insights
             (timestamp, insight_type, severity, message, checkers_json, workspace_id)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            params![
                timestamp.to_rfc3339(),
                insight.kind.as_str(),
                insight.severity.as_str(),
                insight.message,
                serde_json::to_string(&insight.checkers)?,
                workspace_id.as_str(),
            ],
        )?;
        Ok(())
    }

    pub fn recent_insights(
        &self,
        workspace_id: &WorkspaceId,
        limit: usize,
    ) -> Result<Vec<StoredInsight>, StoreError> {
        use vigil_core::insight::{InsightKind, Severity};

        let conn = self.conn.lock();
        let mut stmt = conn.prepare(
            "SELECT id, timestamp, insight_type, severity, message, checkers_json
             FROM agent_insights WHERE workspace_id = ?1
             ORDER BY id DESC LIMIT ?2",
        )?;
        let rows = stmt.query_map(params![workspace_id.as_str(), limit as i64], |row| {
            let timestamp: String = row.get(1)?;
            let kind: String = row.get(2)?;
            let severity: String = row.get(3)?;
            let checkers_json: String = row.get(5)?;

            let kind = match kind.as_str() {
                "regression" => InsightKind::Regression,
                "improvement" => InsightKind::Improvement,
                "correlation" => InsightKind::Correlation,
                "rate_limited" => InsightKind::RateLimited,
                _ => InsightKind::RetentionPurge,
            };
            let severity = match severity.as_str() {
                "critical" => Severity::Critical,
                "high" => Severity::High,
                "warning" => Severity::Warning,
                _ => Severity::Info,
            };
            let mut insight = Insight::new(kind, severity, row.get::<_, String>(4)?);
            insight.checkers = serde_json::from_str(&checkers_json).unwrap_or_default();
            Ok(StoredInsight {
                id: row.get(0)?,
                timestamp: parse_timestamp(&timestamp),
                insight,
            })
        })?;
        collect_rows(rows)
    }

    /// Aggregate event counts per type for one workspace.
    pub fn count_events(
        &self,
        workspace_id: &WorkspaceId,
    ) -> Result<BTreeMap<String, i64>, StoreError> {
        let conn = self.conn.lock();
        let mut stmt = conn.prepare(
            "SELECT event_type, COUNT(*) FROM agent_events
             WHERE workspace_id = ?1 GROUP BY event_type",
        )?;
        let rows = stmt.query_map(params![workspace_id.as_str()], |row| {
            Ok((row.get::<_, String>(0)?, row.get::<_, i64>(1)?))
        })?;
        let mut counts = BTreeMap::new();
        for row in rows {
            let (event_type, count) = row?;
            counts.insert(event_type, count);
        }
        Ok(counts)
    }
}

fn parse_timestamp(raw: &str) -> DateTime<Utc> {
    DateTime::parse_from_rfc3339(raw)
        .map(|dt| dt.with_timezone(&Utc))
        .unwrap_or_default()
}

fn collect_rows<T>(
    rows: impl Iterator<Item = rusqlite::Result<T>>,
) -> Result<Vec<T>, StoreError> {
    let mut out = Vec::new();
    for row in rows {
        out.push(row?);
    }
    Ok(out)
}

#[cfg(test)]
#[path = "store_tests.rs"]
mod tests;
