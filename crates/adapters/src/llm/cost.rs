// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Daily-budget cost tracking for LLM calls.

use chrono::{DateTime, NaiveDate, Utc};
use parking_lot::Mutex;
use serde::Serialize;
use std::collections::BTreeMap;

/// One recorded call.
#[derive(Debug, Clone)]
struct CostEntry {
    amount_usd: f64,
    timestamp: DateTime<Utc>,
    model: String,
}

/// Today's totals for the cost API.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DailySummary {
    pub date: NaiveDate,
    pub total_usd: f64,
    pub calls: usize,
    pub budget_usd: f64,
    pub remaining_usd: f64,
    pub all_time_usd: f64,
    pub by_model: BTreeMap<String, f64>,
}

/// Tracks spend and enforces the daily budget.
pub struct CostTracker {
    daily_limit: f64,
    entries: Mutex<Vec<CostEntry>>,
}

impl CostTracker {
    pub fn new(daily_limit: f64) -> Self {
        Self {
            daily_limit,
            entries: Mutex::new(Vec::new()),
        }
    }

    fn total_on(&self, day: NaiveDate) -> f64 {
        self.entries
            .lock()
            .iter()
            .filter(|e| e.timestamp.date_naive() == day)
            .map(|e| e.amount_usd)
            .sum()
    }

    pub fn remaining_today(&self) -> f64 {
        (self.daily_limit - self.total_on(Utc::now().date_naive())).max(0.0)
    }

    /// Whether `amount` still fits in today's budget.
    pub fn can_spend(&self, amount: f64) -> bool {
        self.remaining_today() >= amount
    }

    /// Record one call's cost.
    pub fn record(&self, amount_usd: f64, model: &str) {
        self.entries.lock().push(CostEntry {
            amount_usd,
            timestamp: Utc::now(),
            model: model.to_string(),
        });
    }

    pub fn daily_summary(&self) -> DailySummary {
        let today = Utc::now().date_naive();
        let entries = self.entries.lock();

        let mut total_usd = 0.0;
        let mut calls = 0;
        let mut all_time_usd = 0.0;
        let mut by_model: BTreeMap<String, f64> = BTreeMap::new();
        for entry in entries.iter() {
            all_time_usd += entry.amount_usd;
            if entry.timestamp.date_naive() == today {
                total_usd += entry.amount_usd;
                calls += 1;
                *by_model.entry(entry.model.clone()).or_insert(0.0) += entry.amount_usd;
            }
        }

        DailySummary {
            date: today,
            total_usd,
            calls,
            budget_usd: self.daily_limit,
            remaining_usd: (self.daily_limit - total_usd).max(0.0),
            all_time_usd,
            by_model,
        }
    }
}

#[cfg(test)]
#[path = "cost_tests.rs"]
mod tests;
