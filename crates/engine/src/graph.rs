// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Checker dependency graph.
//!
//! Edges mean "must run before". Ordering is Kahn's algorithm with a sorted
//! ready-set, so the result is fully deterministic: alphabetical within the
//! same in-degree class. Cycles cannot normally occur (edges come from small
//! static tables), but if one survives, its members are appended in sorted
//! order so a scan still makes progress.

use std::collections::{BTreeMap, BTreeSet};

/// Builtin "must run before" edges: (checker, prerequisites).
const DEFAULT_EDGES: &[(&str, &[&str])] = &[
    ("database", &["environment"]),
    ("performance", &["environment", "database"]),
    ("knowledge_graph", &["database"]),
    ("citation_integrity", &["database", "knowledge_graph"]),
];

/// Directed acyclic graph over checker names.
#[derive(Debug, Clone)]
pub struct DependencyGraph {
    /// checker -> its prerequisite checkers
    prerequisites: BTreeMap<String, BTreeSet<String>>,
}

impl Default for DependencyGraph {
    fn default() -> Self {
        Self::new()
    }
}

impl DependencyGraph {
    /// Graph seeded with the builtin edge table.
    pub fn new() -> Self {
        let mut graph = Self {
            prerequisites: BTreeMap::new(),
        };
        for (checker, prereqs) in DEFAULT_EDGES {
            for prereq in *prereqs {
                graph.add_dependency(checker, prereq);
            }
        }
        graph
    }

    /// Empty graph (tests).
    pub fn empty() -> Self {
        Self {
            prerequisites: BTreeMap::new(),
        }
    }

    /// Declare that `checker` must run after `prerequisite`.
    pub fn add_dependency(&mut self, checker: &str, prerequisite: &str) {
        if checker == prerequisite {
            return;
        }
        self.prerequisites
            .entry(checker.to_string())
            .or_default()
            .insert(prerequisite.to_string());
    }

    /// Prerequisites declared for one checker.
    pub fn prerequisites_of(&self, checker: &str) -> BTreeSet<String> {
        self.prerequisites.get(checker).cloned().unwrap_or_default()
    }

    /// Expand `requested` to its transitive prerequisite closure.
    fn closure(&self, requested: &[String]) -> BTreeSet<String> {
        let mut seen: BTreeSet<String> = BTreeSet::new();
        let mut stack: Vec<String> = requested.to_vec();
        while let Some(name) = stack.pop() {
            if !seen.insert(name.clone()) {
                continue;
            }
            if let Some(prereqs) = self.prerequisites.get(&name) {
                stack.extend(prereqs.iter().cloned());
            }
        }
        seen
    }

    /// Execution order for the requested checkers plus their transitive
    /// prerequisites.
    pub fn resolve_order(&self, requested: &[String]) -> Vec<String> {
        let nodes = self.closure(requested);

        // In-degree restricted to the closure set
        let mut in_degree: BTreeMap<&str, usize> = BTreeMap::new();
        for node in &nodes {
            let degree = self
                .prerequisites
                .get(node)
                .map(|p| p.iter().filter(|d| nodes.contains(*d)).count())
                .unwrap_or(0);
            in_degree.insert(node, degree);
        }

        // Sorted ready-set gives the alphabetical tie-break
        let mut ready: BTreeSet<&str> = in_degree
            .iter()
            .filter(|(_, d)| **d == 0)
            .map(|(n, _)| *n)
            .collect();

        let mut order: Vec<String> = Vec::with_capacity(nodes.len());
        while let Some(&next) = ready.iter().next() {
            ready.remove(next);
            order.push(next.to_string());

            for node in &nodes {
                if self
                    .prerequisites
                    .get(node)
                    .is_some_and(|p| p.contains(next))
                {
                    let degree = in_degree.entry(node).or_insert(0);
                    if *degree > 0 {
                        *degree -= 1;
                        if *degree == 0 {
                            ready.insert(node);
                        }
                    }
                }
            }
        }

        // Cycle fallback: append whatever never reached in-degree 0, sorted
        if order.len() < nodes.len() {
            let placed: BTreeSet<&str> = order.iter().map(String::as_str).collect();
            let remaining: Vec<String> = nodes
                .iter()
                .filter(|node| !placed.contains(node.as_str()))
                .cloned()
                .collect();
            drop(placed);
            order.extend(remaining);
        }

        order
    }
}

#[cfg(test)]
#[path = "graph_tests.rs"]
mod tests;
