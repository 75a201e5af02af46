// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Action executor.
//!
//! Scans run under a non-blocking per-workspace lock: a request arriving
//! while a scan is in flight gets `scan_completed{skipped}` immediately
//! instead of queueing. Checkers run strictly sequentially in graph order; a
//! checker error becomes a single FAIL result, never a loop failure. The
//! LLM path runs outside the scan lock and may overlap a subsequent scan.

use crate::graph::DependencyGraph;
use crate::redact;
use crate::registry::CheckerRegistry;
use chrono::{DateTime, Utc};
use std::collections::BTreeMap;
use std::sync::Arc;
use vigil_adapters::llm::{AnalysisRequest, LlmProvider};
use vigil_core::action::Action;
use vigil_core::check::{CheckResult, CheckStatus, PhaseReport, ScanResult};
use vigil_core::event::{Event, EventPayload, EventSource, ScanOutcome};
use vigil_core::workspace::Workspace;
use vigil_core::Clock;
use vigil_storage::Store;

/// Executes actions decided by the reasoner.
pub struct Executor<C: Clock> {
    workspace: Arc<Workspace>,
    registry: Arc<CheckerRegistry>,
    graph: DependencyGraph,
    scan_lock: Arc<tokio::sync::Mutex<()>>,
    llm: Option<Arc<dyn LlmProvider>>,
    store: Arc<Store>,
    clock: C,
}

impl<C: Clock> Executor<C> {
    pub fn new(
        workspace: Arc<Workspace>,
        registry: Arc<CheckerRegistry>,
        llm: Option<Arc<dyn LlmProvider>>,
        store: Arc<Store>,
        clock: C,
    ) -> Self {
        let graph = registry.build_graph();
        Self {
            workspace,
            registry,
            graph,
            scan_lock: Arc::new(tokio::sync::Mutex::new(())),
            llm,
            store,
            clock,
        }
    }

    /// Whether a scan currently holds the lock.
    pub fn is_scanning(&self) -> bool {
        self.scan_lock.try_lock().is_err()
    }

    pub fn llm_available(&self) -> bool {
        self.llm.as_ref().is_some_and(|p| p.is_available())
    }

    /// Execute one action and return its result event.
    ///
    /// Never fails out of the loop: every outcome, including internal
    /// errors, is an event.
    pub async fn execute(&self, action: Action) -> Event {
        let op_name = action.name();
        tracing::info!(action = op_name, fields = ?action.fields(), "executing");

        let start = self.clock.now();
        let event = match action {
            Action::RunCheckers { checker_names } => self.run_checkers(checker_names).await,
            Action::LlmAnalyze {
                checker_name,
                report,
            } => self.llm_analyze(checker_name, report).await,
            Action::EmitInsights { insights } => self.event(EventPayload::InsightGenerated {
                insights,
            }),
        };
        tracing::info!(
            action = op_name,
            elapsed_ms = self.clock.now().duration_since(start).as_millis() as u64,
            result = event.name(),
            "completed"
        );
        event
    }

    fn event(&self, payload: EventPayload) -> Event {
        Event::new(self.workspace.id.clone(), EventSource::Agent, payload)
    }

    fn scan_timestamp(&self) -> (i64, DateTime<Utc>) {
        let scan_id = self.clock.epoch_ms() as i64;
        let timestamp = DateTime::<Utc>::from_timestamp_millis(scan_id).unwrap_or_default();
        (scan_id, timestamp)
    }

    async fn run_checkers(&self, checker_names: Vec<String>) -> Event {
        let Ok(_guard) = Arc::clone(&self.scan_lock).try_lock_owned() else {
            tracing::info!("scan already in progress, skipping");
            return self.event(EventPayload::ScanCompleted(ScanOutcome::skipped(
                "scan_in_progress",
            )));
        };

        let known = self.registry.filter_known(&checker_names);
        // The closure may pull in prerequisites that are not registered here
        let ordered: Vec<String> = self
            .graph
            .resolve_order(&known)
            .into_iter()
            .filter(|name| self.registry.contains(name))
            .collect();

        let (scan_id, scan_timestamp) = self.scan_timestamp();
        let scan_started = self.clock.now();
        let mut reports: BTreeMap<String, PhaseReport> = BTreeMap::new();

        for name in &ordered {
            let Some(checker) = self.registry.get(name) else {
                continue;
            };

            let checker_started = self.clock.now();
            let mut report = if !checker.is_applicable(&self.workspace.config) {
                PhaseReport::new(
                    name.clone(),
                    vec![CheckResult::new(
                        "applicability",
                        CheckStatus::Skip,
                        "checker not applicable to this project",
                    )],
                )
            } else {
                match checker.run(&self.workspace.root, &self.workspace.config).await {
                    Ok(report) => report,
                    Err(e) => {
                        tracing::error!(checker = %name, error = %e, "checker failed");
                        PhaseReport::new(
                            name.clone(),
                            vec![CheckResult::new("error", CheckStatus::Fail, e.to_string())],
                        )
                    }
                }
            };
            report.duration_ms = self
                .clock
                .now()
                .duration_since(checker_started)
                .as_millis() as u64;
            reports.insert(name.clone(), report);
        }

        let scan = ScanResult::new(
            scan_id,
            scan_timestamp,
            ordered,
            reports,
            self.clock.now().duration_since(scan_started).as_millis() as u64,
        );
        self.event(EventPayload::ScanCompleted(ScanOutcome::completed(scan)))
    }

    async fn llm_analyze(&self, checker_name: String, report: Option<PhaseReport>) -> Event {
        let Some(provider) = &self.llm else {
            tracing::warn!("LLM analysis requested but no provider configured");
            return self.analysis_error(checker_name, "No LLM provider configured");
        };

        // No report supplied: run the checker now so the analysis sees the
        // current state, and say so.
        let (report, report_was_fresh) = match report {
            Some(report) => (report, false),
            None => {
                let Some(checker) = self.registry.get(&checker_name) else {
                    return self
                        .analysis_error(checker_name.clone(), "checker not registered");
                };
                match checker
                    .run(&self.workspace.root, &self.workspace.config)
                    .await
                {
                    Ok(report) => (report, true),
                    Err(e) => {
                        return self.analysis_error(
                            checker_name,
                            format!("checker run failed: {e}"),
                        )
                    }
                }
            }
        };

        let report_hash = redact::report_hash(&report);

        let evidence_context = match self.store.llm_context(
            &self.workspace.id,
            &self.workspace.name,
            &checker_name,
        ) {
            Ok(context) => Some(context.render()),
            Err(e) => {
                tracing::warn!(error = %e, "llm context query failed");
                None
            }
        };

        let request = AnalysisRequest {
            project_name: self.workspace.name.clone(),
            checker_name: checker_name.clone(),
            report,
            config: self.workspace.config.llm.clone().unwrap_or_default(),
            evidence_context,
        };

        match provider.analyze_report(request).await {
            Ok(mut analysis) => {
                analysis.report_hash = report_hash;
                analysis.report_was_fresh = report_was_fresh;
                self.event(EventPayload::LlmAnalysisCompleted {
                    checker_name,
                    analysis: Some(analysis),
                    error: None,
                })
            }
            Err(e) => {
                tracing::error!(checker = %checker_name, error = %e, "LLM analysis failed");
                self.analysis_error(checker_name, e.to_string())
            }
        }
    }

    fn analysis_error(&self, checker_name: String, message: impl Into<String>) -> Event {
        self.event(EventPayload::LlmAnalysisCompleted {
            checker_name,
            analysis: None,
            error: Some(message.into()),
        })
    }
}

#[cfg(test)]
#[path = "executor_tests.rs"]
mod tests;
