// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Cross-checker insight detection over the snapshot window.
//!
//! Compares the two most recent scan snapshots: regressions (PASS ->
//! FAIL/WARN), improvements (FAIL -> PASS), and correlated failures across
//! many checkers at once.

use vigil_core::check::{CheckStatus, ScanResult};
use vigil_core::insight::{Insight, InsightKind, Severity};

/// How many checkers must fail simultaneously before we call it correlated.
const CORRELATION_THRESHOLD: usize = 3;

/// Derive insights from the two most recent snapshots.
pub fn cross_checker(cur: &ScanResult, prev: &ScanResult) -> Vec<Insight> {
    let mut insights = Vec::new();

    for (checker, cur_report) in &cur.reports {
        let Some(prev_report) = prev.reports.get(checker) else {
            continue;
        };

        let mut regressed: Vec<&str> = Vec::new();
        let mut improved: Vec<&str> = Vec::new();
        for result in &cur_report.results {
            match (prev_report.check_status(&result.name), result.status) {
                (Some(CheckStatus::Pass), CheckStatus::Fail | CheckStatus::Warn) => {
                    regressed.push(&result.name);
                }
                (Some(CheckStatus::Fail), CheckStatus::Pass) => {
                    improved.push(&result.name);
                }
                _ => {}
            }
        }

        if !regressed.is_empty() {
            insights.push(
                Insight::new(
                    InsightKind::Regression,
                    Severity::High,
                    format!("{checker} regressed: {}", regressed.join(", ")),
                )
                .with_checker(checker.clone())
                .with_data("checks", serde_json::json!(regressed)),
            );
        }
        if !improved.is_empty() {
            insights.push(
                Insight::new(
                    InsightKind::Improvement,
                    Severity::Info,
                    format!("{checker} improved: {}", improved.join(", ")),
                )
                .with_checker(checker.clone())
                .with_data("checks", serde_json::json!(improved)),
            );
        }
    }

    let failing: Vec<&str> = cur
        .checker_names
        .iter()
        .filter(|name| {
            cur.reports
                .get(name.as_str())
                .is_some_and(|r| r.fail_count() > 0)
        })
        .map(String::as_str)
        .collect();
    if failing.len() >= CORRELATION_THRESHOLD {
        let mut insight = Insight::new(
            InsightKind::Correlation,
            Severity::Critical,
            format!(
                "{} checkers failing together ({}): likely a shared root cause",
                failing.len(),
                failing.join(", ")
            ),
        );
        insight.checkers = failing.iter().map(|s| s.to_string()).collect();
        insights.push(insight);
    }

    insights
}

#[cfg(test)]
#[path = "insights_tests.rs"]
mod tests;
