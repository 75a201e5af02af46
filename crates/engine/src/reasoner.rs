// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Rule-based reasoner: event + memory -> actions.
//!
//! Pure decision logic; no I/O. The reasoner never schedules a checker that
//! is not in the workspace's checker set, and all time arithmetic goes
//! through the injected clock so rules are testable.

use crate::insights;
use crate::memory::AgentMemory;
use std::time::Duration;
use vigil_core::action::Action;
use vigil_core::config::AgentConfig;
use vigil_core::event::{Event, EventPayload};
use vigil_core::insight::{Insight, InsightKind, Severity};
use vigil_core::Clock;

/// At most this many auto-triggered LLM analyses per critical scan.
const MAX_AUTO_ANALYSES: usize = 3;

/// Decides what the executor should do about one event.
pub struct Reasoner<C: Clock> {
    config: AgentConfig,
    clock: C,
}

impl<C: Clock> Reasoner<C> {
    pub fn new(config: AgentConfig, clock: C) -> Self {
        Self { config, clock }
    }

    /// Evaluate one event against memory and the workspace checker set.
    pub fn evaluate(
        &self,
        event: &Event,
        memory: &AgentMemory,
        workspace_checkers: &[String],
    ) -> Vec<Action> {
        match &event.payload {
            EventPayload::FileChanged {
                affected_checkers, ..
            } => self.on_file_changed(affected_checkers, memory, workspace_checkers),

            EventPayload::ScanRequested {
                checker_names,
                rate_limited,
                retry_after,
            } => self.on_scan_requested(
                checker_names.as_deref(),
                *rate_limited,
                *retry_after,
                workspace_checkers,
            ),

            EventPayload::LlmAnalysisRequested { checker_name } => {
                if checker_name.is_empty()
                    || !workspace_checkers.iter().any(|c| c == checker_name)
                {
                    return Vec::new();
                }
                vec![Action::LlmAnalyze {
                    checker_name: checker_name.clone(),
                    report: None,
                }]
            }

            EventPayload::ScanCompleted(outcome) => {
                if outcome.skipped {
                    return Vec::new();
                }
                self.on_scan_completed(memory, workspace_checkers)
            }

            _ => Vec::new(),
        }
    }

    fn on_file_changed(
        &self,
        affected_checkers: &[String],
        memory: &AgentMemory,
        workspace_checkers: &[String],
    ) -> Vec<Action> {
        if !self.config.auto_scan_on_change || workspace_checkers.is_empty() {
            return Vec::new();
        }

        // Auto-scan cooldown against the last recorded scan
        if let Some(last) = memory.last_scan_at() {
            let cooldown = Duration::from_secs_f64(self.config.scan_cooldown_seconds.max(0.0));
            if self.clock.now().duration_since(last) < cooldown {
                tracing::debug!("auto-scan suppressed by cooldown");
                return Vec::new();
            }
        }

        // Intersect with the workspace set, preserving workspace order
        let affected: Vec<String> = workspace_checkers
            .iter()
            .filter(|c| affected_checkers.contains(*c))
            .cloned()
            .collect();
        if affected.is_empty() {
            return Vec::new();
        }

        // Promote to a full scan when most checkers are touched anyway;
        // partial results over a mostly-affected workspace confuse more
        // than they save.
        let threshold = self.config.full_scan_ratio * workspace_checkers.len() as f64;
        let checker_names = if affected.len() as f64 >= threshold {
            workspace_checkers.to_vec()
        } else {
            affected
        };

        vec![Action::RunCheckers { checker_names }]
    }

    fn on_scan_requested(
        &self,
        requested: Option<&[String]>,
        rate_limited: bool,
        retry_after: Option<f64>,
        workspace_checkers: &[String],
    ) -> Vec<Action> {
        if rate_limited {
            let retry = retry_after.unwrap_or(self.config.manual_scan_min_interval);
            let insight = Insight::new(
                InsightKind::RateLimited,
                Severity::Info,
                format!("scan request rate-limited; retry in {retry:.1}s"),
            )
            .with_data("rate_limited", serde_json::json!(true))
            .with_data("retry_after", serde_json::json!(retry));
            return vec![Action::EmitInsights {
                insights: vec![insight],
            }];
        }

        let checker_names: Vec<String> = match requested {
            Some(names) => names
                .iter()
                .filter(|n| workspace_checkers.iter().any(|c| c == *n))
                .cloned()
                .collect(),
            None => workspace_checkers.to_vec(),
        };
        if checker_names.is_empty() {
            return Vec::new();
        }
        vec![Action::RunCheckers { checker_names }]
    }

    fn on_scan_completed(
        &self,
        memory: &AgentMemory,
        workspace_checkers: &[String],
    ) -> Vec<Action> {
        let mut actions = Vec::new();

        if let (Some(cur), Some(prev)) = (memory.latest_snapshot(), memory.previous_snapshot()) {
            let insights = insights::cross_checker(cur, prev);
            if !insights.is_empty() {
                actions.push(Action::EmitInsights { insights });
            }
        }

        if self.config.auto_llm_on_critical {
            if let Some(cur) = memory.latest_snapshot() {
                for checker in cur
                    .failing_checkers
                    .iter()
                    .filter(|c| workspace_checkers.iter().any(|w| w == *c))
                    .take(MAX_AUTO_ANALYSES)
                {
                    actions.push(Action::LlmAnalyze {
                        checker_name: checker.clone(),
                        report: None,
                    });
                }
            }
        }

        actions
    }
}

#[cfg(test)]
#[path = "reasoner_tests.rs"]
mod tests;
