// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Deep-analysis results produced by the LLM tier

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One completed LLM analysis of a checker report.
///
/// `report_hash` and `report_was_fresh` tie the analysis to the exact
/// diagnostic state it saw, so a UI can flag stale analyses after the
/// workspace changes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LlmAnalysis {
    pub request_id: String,
    pub checker_name: String,
    pub prompt_tokens: u64,
    pub completion_tokens: u64,
    pub cost_usd: f64,
    pub model_used: String,
    pub analysis_text: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub root_causes: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub fix_suggestions: Vec<String>,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub evidence_summary: String,
    pub timestamp: DateTime<Utc>,
    /// Redacted 16-hex fingerprint of the report that was analyzed.
    pub report_hash: String,
    /// True when the checker was re-run to produce the analyzed report.
    pub report_was_fresh: bool,
}
