// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Checker results, per-checker reports, and aggregated scan results

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Outcome of a single check within a checker run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum CheckStatus {
    Pass,
    Warn,
    Fail,
    Skip,
}

impl CheckStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            CheckStatus::Pass => "PASS",
            CheckStatus::Warn => "WARN",
            CheckStatus::Fail => "FAIL",
            CheckStatus::Skip => "SKIP",
        }
    }
}

/// A single check outcome with its evidence bag.
///
/// `details` is open-schema; conventional keys are `file`, `line_start`,
/// `line_end`, `snippet`, and `rule_id`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CheckResult {
    pub name: String,
    pub status: CheckStatus,
    pub message: String,
    #[serde(default, skip_serializing_if = "serde_json::Map::is_empty")]
    pub details: serde_json::Map<String, serde_json::Value>,
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub fixable: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fix_desc: Option<String>,
}

impl CheckResult {
    /// Build a result with just a status and message.
    pub fn new(name: impl Into<String>, status: CheckStatus, message: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            status,
            message: message.into(),
            details: serde_json::Map::new(),
            fixable: false,
            fix_desc: None,
        }
    }
}

/// Result of one checker run: an ordered list of checks plus timing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PhaseReport {
    pub checker_name: String,
    pub results: Vec<CheckResult>,
    pub duration_ms: u64,
}

impl PhaseReport {
    pub fn new(checker_name: impl Into<String>, results: Vec<CheckResult>) -> Self {
        Self {
            checker_name: checker_name.into(),
            results,
            duration_ms: 0,
        }
    }

    pub fn count(&self, status: CheckStatus) -> usize {
        self.results.iter().filter(|r| r.status == status).count()
    }

    pub fn pass_count(&self) -> usize {
        self.count(CheckStatus::Pass)
    }

    pub fn warn_count(&self) -> usize {
        self.count(CheckStatus::Warn)
    }

    pub fn fail_count(&self) -> usize {
        self.count(CheckStatus::Fail)
    }

    pub fn skip_count(&self) -> usize {
        self.count(CheckStatus::Skip)
    }

    /// Number of checks that actually ran (everything except SKIP).
    pub fn total_active(&self) -> usize {
        self.results.len() - self.skip_count()
    }

    /// Percentage of active checks that passed; 100 when nothing ran.
    pub fn health_pct(&self) -> f64 {
        let active = self.total_active();
        if active == 0 {
            return 100.0;
        }
        self.pass_count() as f64 * 100.0 / active as f64
    }

    /// Look up a single check outcome by name.
    pub fn check_status(&self, name: &str) -> Option<CheckStatus> {
        self.results.iter().find(|r| r.name == name).map(|r| r.status)
    }
}

/// Overall project health derived from scan totals
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum OverallStatus {
    Healthy,
    Degraded,
    Critical,
}

impl OverallStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            OverallStatus::Healthy => "HEALTHY",
            OverallStatus::Degraded => "DEGRADED",
            OverallStatus::Critical => "CRITICAL",
        }
    }
}

impl std::fmt::Display for OverallStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Check counts summed across every report in a scan
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScanTotals {
    pub pass: u32,
    pub warn: u32,
    pub fail: u32,
    pub skip: u32,
}

/// Aggregated outcome of one scan.
///
/// Constructed only through [`ScanResult::new`] so the overall-status rule
/// (`CRITICAL` iff any FAIL, `DEGRADED` iff no FAIL but some WARN) cannot
/// drift from the totals.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScanResult {
    /// Monotonic scan identifier (epoch milliseconds at scan start).
    pub scan_id: i64,
    pub scan_timestamp: DateTime<Utc>,
    pub reports: BTreeMap<String, PhaseReport>,
    pub overall: OverallStatus,
    pub totals: ScanTotals,
    pub has_critical: bool,
    pub failing_checkers: Vec<String>,
    /// Checker names in execution order.
    pub checker_names: Vec<String>,
    pub duration_ms: u64,
}

impl ScanResult {
    pub fn new(
        scan_id: i64,
        scan_timestamp: DateTime<Utc>,
        checker_names: Vec<String>,
        reports: BTreeMap<String, PhaseReport>,
        duration_ms: u64,
    ) -> Self {
        let mut totals = ScanTotals::default();
        for report in reports.values() {
            totals.pass += report.pass_count() as u32;
            totals.warn += report.warn_count() as u32;
            totals.fail += report.fail_count() as u32;
            totals.skip += report.skip_count() as u32;
        }

        let overall = if totals.fail > 0 {
            OverallStatus::Critical
        } else if totals.warn > 0 {
            OverallStatus::Degraded
        } else {
            OverallStatus::Healthy
        };

        let failing_checkers: Vec<String> = checker_names
            .iter()
            .filter(|name| {
                reports
                    .get(name.as_str())
                    .is_some_and(|r| r.fail_count() > 0)
            })
            .cloned()
            .collect();

        Self {
            scan_id,
            scan_timestamp,
            reports,
            overall,
            totals,
            has_critical: overall == OverallStatus::Critical,
            failing_checkers,
            checker_names,
            duration_ms,
        }
    }

    /// Percentage of active checks that passed across the whole scan.
    pub fn health_pct(&self) -> f64 {
        let active = self.totals.pass + self.totals.warn + self.totals.fail;
        if active == 0 {
            return 100.0;
        }
        self.totals.pass as f64 * 100.0 / active as f64
    }
}

#[cfg(test)]
#[path = "check_tests.rs"]
mod tests;
