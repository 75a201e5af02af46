// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Insights derived by the reasoner from scan snapshots

use serde::{Deserialize, Serialize};

/// Kind of cross-checker insight
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InsightKind {
    /// A check that passed in the previous snapshot now fails or warns
    Regression,
    /// A check that failed in the previous snapshot now passes
    Improvement,
    /// Several checkers failing at once, likely one root cause
    Correlation,
    /// A manual scan request was rejected by the rate limiter
    RateLimited,
    /// The retention purge deleted rows
    RetentionPurge,
}

impl InsightKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            InsightKind::Regression => "regression",
            InsightKind::Improvement => "improvement",
            InsightKind::Correlation => "correlation",
            InsightKind::RateLimited => "rate_limited",
            InsightKind::RetentionPurge => "retention_purge",
        }
    }
}

/// How urgent an insight is for the UI
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    Info,
    Warning,
    High,
    Critical,
}

impl Severity {
    pub fn as_str(&self) -> &'static str {
        match self {
            Severity::Info => "info",
            Severity::Warning => "warning",
            Severity::High => "high",
            Severity::Critical => "critical",
        }
    }
}

/// A single derived observation about the workspace's diagnostic state
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Insight {
    #[serde(rename = "type")]
    pub kind: InsightKind,
    pub severity: Severity,
    pub message: String,
    /// Checkers this insight refers to.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub checkers: Vec<String>,
    /// Structured extras (e.g. `retry_after`, purge counts).
    #[serde(default, skip_serializing_if = "serde_json::Map::is_empty")]
    pub data: serde_json::Map<String, serde_json::Value>,
}

impl Insight {
    pub fn new(kind: InsightKind, severity: Severity, message: impl Into<String>) -> Self {
        Self {
            kind,
            severity,
            message: message.into(),
            checkers: Vec::new(),
            data: serde_json::Map::new(),
        }
    }

    pub fn with_checker(mut self, checker: impl Into<String>) -> Self {
        self.checkers.push(checker.into());
        self
    }

    pub fn with_data(mut self, key: impl Into<String>, value: serde_json::Value) -> Self {
        self.data.insert(key.into(), value);
        self
    }
}
