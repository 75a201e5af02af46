// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Canned checkers for engine and daemon tests.

use async_trait::async_trait;
use parking_lot::Mutex;
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use vigil_core::check::{CheckResult, CheckStatus, PhaseReport};
use vigil_core::checker::{Checker, CheckerError};
use vigil_core::config::WorkspaceConfig;

/// A checker that returns a fixed list of statuses and counts its runs.
pub struct StaticChecker {
    name: String,
    statuses: Vec<CheckStatus>,
    depends_on: Vec<String>,
    fail_with: Option<String>,
    applicable: bool,
    delay: Option<std::time::Duration>,
    runs: AtomicUsize,
    /// Order log shared across checkers to assert execution order.
    run_log: Option<Arc<Mutex<Vec<String>>>>,
}

impl StaticChecker {
    pub fn new(name: &str, statuses: &[CheckStatus]) -> Self {
        Self {
            name: name.to_string(),
            statuses: statuses.to_vec(),
            depends_on: Vec::new(),
            fail_with: None,
            applicable: true,
            delay: None,
            runs: AtomicUsize::new(0),
            run_log: None,
        }
    }

    pub fn passing(name: &str) -> Self {
        Self::new(name, &[CheckStatus::Pass])
    }

    pub fn failing(name: &str) -> Self {
        Self::new(name, &[CheckStatus::Fail])
    }

    /// Make `run` return an error instead of a report.
    pub fn erroring(name: &str, message: &str) -> Self {
        let mut checker = Self::new(name, &[]);
        checker.fail_with = Some(message.to_string());
        checker
    }

    pub fn with_depends_on(mut self, deps: &[&str]) -> Self {
        self.depends_on = deps.iter().map(|s| s.to_string()).collect();
        self
    }

    pub fn not_applicable(mut self) -> Self {
        self.applicable = false;
        self
    }

    pub fn with_run_log(mut self, log: Arc<Mutex<Vec<String>>>) -> Self {
        self.run_log = Some(log);
        self
    }

    /// Make `run` sleep before returning (scan-lock tests).
    pub fn with_delay(mut self, delay: std::time::Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub fn run_count(&self) -> usize {
        self.runs.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Checker for StaticChecker {
    fn name(&self) -> &str {
        &self.name
    }

    fn depends_on(&self) -> Vec<String> {
        self.depends_on.clone()
    }

    fn is_applicable(&self, _config: &WorkspaceConfig) -> bool {
        self.applicable
    }

    async fn run(
        &self,
        _project_root: &Path,
        _config: &WorkspaceConfig,
    ) -> Result<PhaseReport, CheckerError> {
        self.runs.fetch_add(1, Ordering::SeqCst);
        if let Some(log) = &self.run_log {
            log.lock().push(self.name.clone());
        }
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        if let Some(message) = &self.fail_with {
            return Err(CheckerError::Other(message.clone()));
        }
        let results = self
            .statuses
            .iter()
            .enumerate()
            .map(|(i, s)| CheckResult::new(format!("check_{i}"), *s, "canned"))
            .collect();
        Ok(PhaseReport::new(self.name.clone(), results))
    }
}

/// A minimal workspace config for tests.
pub fn test_config(checkers: &[&str]) -> WorkspaceConfig {
    WorkspaceConfig {
        project: vigil_core::config::ProjectConfig {
            name: "test-project".to_string(),
            root: ".".into(),
        },
        checkers: checkers.iter().map(|s| s.to_string()).collect(),
        agent: Default::default(),
        llm: None,
        server: Default::default(),
    }
}
