// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Scriptable fake provider for tests.

use super::cost::{CostTracker, DailySummary};
use super::{AnalysisRequest, LlmError, LlmProvider};
use async_trait::async_trait;
use chrono::Utc;
use parking_lot::Mutex;
use std::collections::VecDeque;
use vigil_core::config::LlmConfig;
use vigil_core::LlmAnalysis;

/// Scripted outcome for the next call.
pub enum FakeOutcome {
    Text(String),
    Error(String),
}

/// Fake provider: returns scripted outcomes and records calls.
pub struct FakeLlm {
    script: Mutex<VecDeque<FakeOutcome>>,
    calls: Mutex<Vec<String>>,
    cost: CostTracker,
    available: bool,
}

impl Default for FakeLlm {
    fn default() -> Self {
        Self::new()
    }
}

impl FakeLlm {
    pub fn new() -> Self {
        Self {
            script: Mutex::new(VecDeque::new()),
            calls: Mutex::new(Vec::new()),
            cost: CostTracker::new(5.0),
            available: true,
        }
    }

    pub fn unavailable() -> Self {
        let mut fake = Self::new();
        fake.available = false;
        fake
    }

    /// Queue a canned response text for the next call.
    pub fn respond_with(&self, text: &str) {
        self.script
            .lock()
            .push_back(FakeOutcome::Text(text.to_string()));
    }

    /// Queue an error for the next call.
    pub fn fail_with(&self, message: &str) {
        self.script
            .lock()
            .push_back(FakeOutcome::Error(message.to_string()));
    }

    /// Checker names analyzed so far, in call order.
    pub fn analyzed_checkers(&self) -> Vec<String> {
        self.calls.lock().clone()
    }
}

const DEFAULT_RESPONSE: &str = "### Root Causes\n- canned cause\n\n### Fix Plan\n1. canned fix\n\n### Risks\n- none\n\n### Summary\nAll canned.\n";

#[async_trait]
impl LlmProvider for FakeLlm {
    async fn analyze_report(&self, request: AnalysisRequest) -> Result<LlmAnalysis, LlmError> {
        self.calls.lock().push(request.checker_name.clone());

        let outcome = self
            .script
            .lock()
            .pop_front()
            .unwrap_or_else(|| FakeOutcome::Text(DEFAULT_RESPONSE.to_string()));

        let text = match outcome {
            FakeOutcome::Text(text) => text,
            FakeOutcome::Error(message) => {
                return Err(LlmError::Request {
                    model: request.config.model,
                    message,
                })
            }
        };

        let parsed = super::prompts::parse_analysis_response(&text);
        self.cost.record(0.001, &request.config.model);
        Ok(LlmAnalysis {
            request_id: format!("fake-{}", self.calls.lock().len()),
            checker_name: request.checker_name,
            prompt_tokens: 100,
            completion_tokens: 50,
            cost_usd: 0.001,
            model_used: request.config.model,
            analysis_text: text,
            root_causes: parsed.root_causes,
            fix_suggestions: parsed.fix_suggestions,
            evidence_summary: "fake".to_string(),
            timestamp: Utc::now(),
            report_hash: String::new(),
            report_was_fresh: false,
        })
    }

    async fn generate_report(
        &self,
        _project_name: &str,
        _scan_summary: &str,
        _config: &LlmConfig,
    ) -> Result<String, LlmError> {
        Ok("### Summary\nCanned report.\n".to_string())
    }

    fn is_available(&self) -> bool {
        self.available
    }

    fn daily_summary(&self) -> DailySummary {
        self.cost.daily_summary()
    }
}
