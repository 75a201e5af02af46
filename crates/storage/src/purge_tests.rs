// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use crate::store::Store;
use vigil_core::event::{Event, EventPayload, EventSource};
use vigil_core::insight::{Insight, InsightKind, Severity};
use vigil_core::workspace::WorkspaceId;

fn ws() -> WorkspaceId {
    WorkspaceId::new("aaaa111122")
}

fn event_at(workspace: &WorkspaceId, when: DateTime<Utc>) -> Event {
    Event::new(
        workspace.clone(),
        EventSource::System,
        EventPayload::LlmAnalysisRequested {
            checker_name: "security".to_string(),
        },
    )
    .with_timestamp(when)
}

fn retention(rows: u64, event_days: u64, analysis_days: u64) -> RetentionConfig {
    RetentionConfig {
        event_max_rows: rows,
        event_max_days: event_days,
        analysis_max_days: analysis_days,
    }
}

fn sample_analysis() -> vigil_core::LlmAnalysis {
    vigil_core::LlmAnalysis {
        request_id: "req-1".to_string(),
        checker_name: "security".to_string(),
        prompt_tokens: 100,
        completion_tokens: 50,
        cost_usd: 0.001,
        model_used: "anthropic/claude-3-5-haiku-20241022".to_string(),
        analysis_text: "ok".to_string(),
        root_causes: Vec::new(),
        fix_suggestions: Vec::new(),
        evidence_summary: String::new(),
        timestamp: Utc::now(),
        report_hash: "0000000000000000".to_string(),
        report_was_fresh: false,
    }
}

#[test]
fn purge_removes_old_events_and_reports_counts() {
    let store = Store::open_in_memory().unwrap();
    let workspace = ws();
    let now = Utc::now();

    store
        .insert_event(1, &event_at(&workspace, now - Duration::days(10)))
        .unwrap();
    store
        .insert_event(2, &event_at(&workspace, now - Duration::days(1)))
        .unwrap();

    let outcome = store.purge(&retention(1000, 7, 90), now).unwrap();
    assert_eq!(outcome.events_removed, 1);
    assert_eq!(outcome.total(), 1);

    let remaining = store.recent_events(&workspace, None, 10).unwrap();
    assert_eq!(remaining.len(), 1);
    assert_eq!(remaining[0].id, 2);
}

#[test]
fn purge_enforces_row_cap_keeping_newest() {
    let store = Store::open_in_memory().unwrap();
    let workspace = ws();
    let now = Utc::now();
    for id in 1..=10 {
        store.insert_event(id, &event_at(&workspace, now)).unwrap();
    }

    let outcome = store.purge(&retention(4, 7, 90), now).unwrap();
    assert_eq!(outcome.events_removed, 6);

    let ids: Vec<i64> = store
        .recent_events(&workspace, None, 20)
        .unwrap()
        .iter()
        .map(|e| e.id)
        .collect();
    assert_eq!(ids, vec![10, 9, 8, 7]);
}

#[test]
fn purge_is_idempotent_for_fixed_clock() {
    let store = Store::open_in_memory().unwrap();
    let workspace = ws();
    let now = Utc::now();
    for id in 1..=6 {
        let age = Duration::days(if id % 2 == 0 { 10 } else { 0 });
        store
            .insert_event(id, &event_at(&workspace, now - age))
            .unwrap();
    }

    let policy = retention(100, 7, 90);
    let first = store.purge(&policy, now).unwrap();
    assert!(first.total() > 0);
    let second = store.purge(&policy, now).unwrap();
    assert_eq!(second.total(), 0);
}

#[test]
fn purge_ages_out_analyses_and_insights() {
    let store = Store::open_in_memory().unwrap();
    let workspace = ws();
    let now = Utc::now();

    let mut old_analysis = sample_analysis();
    old_analysis.timestamp = now - Duration::days(120);
    store.insert_analysis(&workspace, &old_analysis).unwrap();
    let mut fresh_analysis = sample_analysis();
    fresh_analysis.timestamp = now - Duration::days(5);
    store.insert_analysis(&workspace, &fresh_analysis).unwrap();

    let insight = Insight::new(InsightKind::Correlation, Severity::Critical, "many failures");
    store
        .insert_insight(&workspace, now - Duration::days(30), &insight)
        .unwrap();
    store.insert_insight(&workspace, now, &insight).unwrap();

    let outcome = store.purge(&retention(1000, 7, 90), now).unwrap();
    assert_eq!(outcome.analyses_removed, 1);
    assert_eq!(outcome.insights_removed, 1);

    assert_eq!(store.recent_analyses(&workspace, 10).unwrap().len(), 1);
    assert_eq!(store.recent_insights(&workspace, 10).unwrap().len(), 1);
}

#[test]
fn purge_on_empty_store_is_a_noop() {
    let store = Store::open_in_memory().unwrap();
    let outcome = store
        .purge(&RetentionConfig::default(), Utc::now())
        .unwrap();
    assert_eq!(outcome, PurgeOutcome::default());
}
