// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Actions the reasoner schedules for the executor

use crate::check::PhaseReport;
use crate::insight::Insight;
use serde::{Deserialize, Serialize};

/// Work the reasoner decided to do in response to an event.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Action {
    /// Run the named checkers in dependency order
    RunCheckers { checker_names: Vec<String> },

    /// Deep-analyze one checker's report with the LLM tier
    LlmAnalyze {
        checker_name: String,
        /// Report to analyze; when absent the checker is re-run first.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        report: Option<PhaseReport>,
    },

    /// Surface derived insights without running anything
    EmitInsights { insights: Vec<Insight> },
}

impl Action {
    /// Action name for log spans (e.g. "run_checkers")
    pub fn name(&self) -> &'static str {
        match self {
            Action::RunCheckers { .. } => "run_checkers",
            Action::LlmAnalyze { .. } => "llm_analyze",
            Action::EmitInsights { .. } => "emit_insights",
        }
    }

    /// Key-value pairs for structured logging
    pub fn fields(&self) -> Vec<(&'static str, String)> {
        match self {
            Action::RunCheckers { checker_names } => {
                vec![("checkers", checker_names.join(","))]
            }
            Action::LlmAnalyze {
                checker_name,
                report,
            } => vec![
                ("checker", checker_name.clone()),
                ("has_report", report.is_some().to_string()),
            ],
            Action::EmitInsights { insights } => {
                vec![("count", insights.len().to_string())]
            }
        }
    }
}
