// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use crate::test_support::{test_config, StaticChecker};
use parking_lot::Mutex;
use std::time::Duration;
use vigil_adapters::FakeLlm;
use vigil_core::workspace::WorkspaceId;
use vigil_core::{Checker, FakeClock, OverallStatus};

fn workspace(checkers: &[&str]) -> Arc<Workspace> {
    Arc::new(Workspace {
        id: WorkspaceId::new("aaaa111122"),
        name: "test-project".to_string(),
        root: std::env::temp_dir(),
        config_path: std::env::temp_dir().join("vigil.toml"),
        config: test_config(checkers),
    })
}

fn executor_with(
    checkers: Vec<StaticChecker>,
    llm: Option<Arc<dyn LlmProvider>>,
) -> Executor<FakeClock> {
    let mut registry = CheckerRegistry::new();
    let mut registered = Vec::new();
    for checker in checkers {
        registered.push(checker.name().to_string());
        registry.register(Arc::new(checker));
    }
    let names_ref: Vec<&str> = registered.iter().map(String::as_str).collect();
    Executor::new(
        workspace(&names_ref),
        Arc::new(registry),
        llm,
        Arc::new(Store::open_in_memory().unwrap()),
        FakeClock::new(),
    )
}

fn run_action(names: &[&str]) -> Action {
    Action::RunCheckers {
        checker_names: names.iter().map(|s| s.to_string()).collect(),
    }
}

fn scan_of(event: &Event) -> &ScanResult {
    match &event.payload {
        EventPayload::ScanCompleted(outcome) => outcome.scan.as_ref().unwrap(),
        other => panic!("expected ScanCompleted, got {other:?}"),
    }
}

#[tokio::test]
async fn scan_runs_checkers_in_dependency_order() {
    let log = Arc::new(Mutex::new(Vec::new()));
    let executor = executor_with(
        vec![
            StaticChecker::passing("performance").with_run_log(Arc::clone(&log)),
            StaticChecker::passing("database").with_run_log(Arc::clone(&log)),
            StaticChecker::passing("environment").with_run_log(Arc::clone(&log)),
        ],
        None,
    );

    let event = executor
        .execute(run_action(&["performance", "database", "environment"]))
        .await;

    let scan = scan_of(&event);
    assert_eq!(scan.overall, OverallStatus::Healthy);
    assert_eq!(
        *log.lock(),
        vec!["environment", "database", "performance"]
    );
    assert_eq!(
        scan.checker_names,
        vec!["environment", "database", "performance"]
    );
}

#[tokio::test]
async fn checker_error_becomes_single_fail_result() {
    let executor = executor_with(
        vec![
            StaticChecker::erroring("database", "connection refused"),
            StaticChecker::passing("environment"),
        ],
        None,
    );

    let event = executor
        .execute(run_action(&["database", "environment"]))
        .await;
    let scan = scan_of(&event);

    // The erroring checker contributes exactly one FAIL; the rest ran
    let report = &scan.reports["database"];
    assert_eq!(report.results.len(), 1);
    assert_eq!(report.fail_count(), 1);
    assert!(report.results[0].message.contains("connection refused"));
    assert_eq!(scan.reports["environment"].pass_count(), 1);
    assert_eq!(scan.overall, OverallStatus::Critical);
    assert_eq!(scan.failing_checkers, vec!["database"]);
}

#[tokio::test]
async fn unregistered_checkers_are_filtered_out() {
    let executor = executor_with(vec![StaticChecker::passing("environment")], None);
    let event = executor
        .execute(run_action(&["environment", "ghost_checker"]))
        .await;
    let scan = scan_of(&event);
    assert_eq!(scan.checker_names, vec!["environment"]);
}

#[tokio::test]
async fn inapplicable_checker_reports_skip() {
    let executor = executor_with(
        vec![StaticChecker::passing("whisper_health").not_applicable()],
        None,
    );
    let event = executor.execute(run_action(&["whisper_health"])).await;
    let scan = scan_of(&event);
    let report = &scan.reports["whisper_health"];
    assert_eq!(report.skip_count(), 1);
    assert_eq!(scan.overall, OverallStatus::Healthy);
}

#[tokio::test(flavor = "multi_thread")]
async fn concurrent_scan_is_skipped_not_queued() {
    let executor = executor_with(
        vec![StaticChecker::passing("environment").with_delay(Duration::from_millis(150))],
        None,
    );

    let (first, second) = tokio::join!(
        executor.execute(run_action(&["environment"])),
        executor.execute(run_action(&["environment"])),
    );

    let outcomes: Vec<bool> = [&first, &second]
        .iter()
        .map(|e| match &e.payload {
            EventPayload::ScanCompleted(outcome) => outcome.skipped,
            other => panic!("expected ScanCompleted, got {other:?}"),
        })
        .collect();

    // Exactly one ran, the other was skipped with the busy reason
    assert_eq!(outcomes.iter().filter(|s| **s).count(), 1);
    let skipped = if outcomes[0] { &first } else { &second };
    match &skipped.payload {
        EventPayload::ScanCompleted(outcome) => {
            assert_eq!(outcome.reason.as_deref(), Some("scan_in_progress"));
            assert!(outcome.scan.is_none());
        }
        _ => unreachable!(),
    }
}

#[tokio::test]
async fn lock_is_released_after_scan() {
    let executor = executor_with(vec![StaticChecker::passing("environment")], None);
    let first = executor.execute(run_action(&["environment"])).await;
    assert!(!scan_of(&first).checker_names.is_empty());
    assert!(!executor.is_scanning());

    let second = executor.execute(run_action(&["environment"])).await;
    assert!(scan_of(&second).reports.contains_key("environment"));
}

#[tokio::test]
async fn llm_without_provider_reports_structured_error() {
    let executor = executor_with(vec![StaticChecker::failing("security")], None);
    let event = executor
        .execute(Action::LlmAnalyze {
            checker_name: "security".to_string(),
            report: None,
        })
        .await;

    match &event.payload {
        EventPayload::LlmAnalysisCompleted {
            checker_name,
            analysis,
            error,
        } => {
            assert_eq!(checker_name, "security");
            assert!(analysis.is_none());
            assert_eq!(error.as_deref(), Some("No LLM provider configured"));
        }
        other => panic!("expected LlmAnalysisCompleted, got {other:?}"),
    }
}

#[tokio::test]
async fn llm_without_report_runs_checker_fresh() {
    let fake = Arc::new(FakeLlm::new());
    let executor = executor_with(
        vec![StaticChecker::failing("security")],
        Some(Arc::clone(&fake) as Arc<dyn LlmProvider>),
    );

    let event = executor
        .execute(Action::LlmAnalyze {
            checker_name: "security".to_string(),
            report: None,
        })
        .await;

    match &event.payload {
        EventPayload::LlmAnalysisCompleted { analysis, error, .. } => {
            assert!(error.is_none());
            let analysis = analysis.as_ref().unwrap();
            assert!(analysis.report_was_fresh);
            assert_eq!(analysis.report_hash.len(), 16);
            assert_eq!(analysis.root_causes, vec!["canned cause"]);
        }
        other => panic!("expected LlmAnalysisCompleted, got {other:?}"),
    }
    assert_eq!(fake.analyzed_checkers(), vec!["security"]);
}

#[tokio::test]
async fn llm_with_supplied_report_is_not_fresh() {
    let fake = Arc::new(FakeLlm::new());
    let executor = executor_with(
        vec![StaticChecker::failing("security")],
        Some(Arc::clone(&fake) as Arc<dyn LlmProvider>),
    );

    let report = PhaseReport::new(
        "security",
        vec![CheckResult::new("probe", CheckStatus::Fail, "bad")],
    );
    let event = executor
        .execute(Action::LlmAnalyze {
            checker_name: "security".to_string(),
            report: Some(report),
        })
        .await;

    match &event.payload {
        EventPayload::LlmAnalysisCompleted { analysis, .. } => {
            assert!(!analysis.as_ref().unwrap().report_was_fresh);
        }
        other => panic!("expected LlmAnalysisCompleted, got {other:?}"),
    }
}

#[tokio::test]
async fn llm_provider_error_surfaces_in_event() {
    let fake = Arc::new(FakeLlm::new());
    fake.fail_with("upstream 500");
    let executor = executor_with(
        vec![StaticChecker::failing("security")],
        Some(Arc::clone(&fake) as Arc<dyn LlmProvider>),
    );

    let event = executor
        .execute(Action::LlmAnalyze {
            checker_name: "security".to_string(),
            report: None,
        })
        .await;
    match &event.payload {
        EventPayload::LlmAnalysisCompleted { analysis, error, .. } => {
            assert!(analysis.is_none());
            assert!(error.as_ref().unwrap().contains("upstream 500"));
        }
        other => panic!("expected LlmAnalysisCompleted, got {other:?}"),
    }
}

#[tokio::test]
async fn emit_insights_passes_through() {
    use vigil_core::insight::{Insight, InsightKind, Severity};
    let executor = executor_with(vec![], None);
    let insights = vec![Insight::new(
        InsightKind::Correlation,
        Severity::Critical,
        "everything is broken",
    )];

    let event = executor
        .execute(Action::EmitInsights {
            insights: insights.clone(),
        })
        .await;
    match &event.payload {
        EventPayload::InsightGenerated { insights: got } => assert_eq!(*got, insights),
        other => panic!("expected InsightGenerated, got {other:?}"),
    }
}
