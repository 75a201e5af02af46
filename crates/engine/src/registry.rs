// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Per-workspace checker registry.
//!
//! Holds the checkers available to one workspace and the load errors
//! collected while assembling them. Native code cannot import arbitrary
//! plugin files at runtime, so discovery is host-driven: embedders register
//! trait objects and record `{file, error}` entries for anything that failed
//! to produce one. Load failures surface to the UI; they never abort
//! startup.

use crate::graph::DependencyGraph;
use serde::Serialize;
use std::collections::BTreeMap;
use std::sync::Arc;
use vigil_core::Checker;

/// A checker source that could not be loaded.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LoadError {
    pub file: String,
    pub error: String,
}

/// The checkers one workspace can run.
#[derive(Default)]
pub struct CheckerRegistry {
    checkers: BTreeMap<String, Arc<dyn Checker>>,
    load_errors: Vec<LoadError>,
}

impl CheckerRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a checker. Re-registering a name replaces the previous
    /// checker and records the collision as a load error.
    pub fn register(&mut self, checker: Arc<dyn Checker>) {
        let name = checker.name().to_string();
        if self.checkers.insert(name.clone(), checker).is_some() {
            tracing::warn!(checker = %name, "duplicate checker registration replaced");
            self.load_errors.push(LoadError {
                file: name.clone(),
                error: "duplicate registration replaced earlier checker".to_string(),
            });
        }
    }

    pub fn record_load_error(&mut self, file: impl Into<String>, error: impl Into<String>) {
        self.load_errors.push(LoadError {
            file: file.into(),
            error: error.into(),
        });
    }

    pub fn get(&self, name: &str) -> Option<Arc<dyn Checker>> {
        self.checkers.get(name).cloned()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.checkers.contains_key(name)
    }

    /// Registered checker names, sorted.
    pub fn names(&self) -> Vec<String> {
        self.checkers.keys().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.checkers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.checkers.is_empty()
    }

    pub fn load_errors(&self) -> &[LoadError] {
        &self.load_errors
    }

    /// Keep only the requested names that are actually registered,
    /// preserving request order.
    pub fn filter_known(&self, requested: &[String]) -> Vec<String> {
        requested
            .iter()
            .filter(|name| self.contains(name))
            .cloned()
            .collect()
    }

    /// Build the dependency graph: builtin edges plus every registered
    /// checker's declared `depends_on`.
    pub fn build_graph(&self) -> DependencyGraph {
        let mut graph = DependencyGraph::new();
        for (name, checker) in &self.checkers {
            for prereq in checker.depends_on() {
                graph.add_dependency(name, &prereq);
            }
        }
        graph
    }
}

#[cfg(test)]
#[path = "registry_tests.rs"]
mod tests;
