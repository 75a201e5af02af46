// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Checker plug-in interface
//!
//! Checkers are read-only inspectors: they look at a project tree and report
//! PASS/WARN/FAIL/SKIP outcomes. The core never implements checkers; it
//! consumes them through this trait. A checker may declare prerequisite
//! checkers, which feed the executor's dependency graph.

use crate::check::PhaseReport;
use crate::config::WorkspaceConfig;
use async_trait::async_trait;
use std::path::Path;
use thiserror::Error;

/// Errors from a checker run.
///
/// The executor converts any of these into a single FAIL result inside the
/// checker's report; they never escape a scan.
#[derive(Debug, Error)]
pub enum CheckerError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("invalid project layout: {0}")]
    InvalidProject(String),
    #[error("{0}")]
    Other(String),
}

/// Outcome of a safe fix attempt
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct FixOutcome {
    pub success: bool,
    pub message: String,
}

/// A read-only project inspector.
///
/// `fix` is bounded to "safe" edits (TODO markers, placeholder env keys,
/// cache sweeps, index rebuilds); destructive mutations are out of contract.
#[async_trait]
pub trait Checker: Send + Sync {
    /// Unique checker id (e.g. `code_quality`)
    fn name(&self) -> &str;

    fn display_name(&self) -> &str {
        self.name()
    }

    fn description(&self) -> &str {
        ""
    }

    /// Additional prerequisite checkers beyond the builtin edge table.
    fn depends_on(&self) -> Vec<String> {
        Vec::new()
    }

    /// Whether this checker applies to the configured project at all.
    fn is_applicable(&self, _config: &WorkspaceConfig) -> bool {
        true
    }

    /// Inspect the project and report check outcomes.
    async fn run(
        &self,
        project_root: &Path,
        config: &WorkspaceConfig,
    ) -> Result<PhaseReport, CheckerError>;

    /// Apply a safe fix for one named check.
    async fn fix(
        &self,
        check_name: &str,
        _project_root: &Path,
        _config: &WorkspaceConfig,
    ) -> FixOutcome {
        FixOutcome {
            success: false,
            message: format!("no fix available for {check_name}"),
        }
    }
}
