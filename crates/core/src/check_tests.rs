// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use yare::parameterized;

fn report(name: &str, statuses: &[CheckStatus]) -> PhaseReport {
    let results = statuses
        .iter()
        .enumerate()
        .map(|(i, s)| CheckResult::new(format!("check_{i}"), *s, "msg"))
        .collect();
    PhaseReport::new(name, results)
}

fn scan_of(reports: Vec<PhaseReport>) -> ScanResult {
    let names: Vec<String> = reports.iter().map(|r| r.checker_name.clone()).collect();
    let map: BTreeMap<String, PhaseReport> = reports
        .into_iter()
        .map(|r| (r.checker_name.clone(), r))
        .collect();
    ScanResult::new(1_700_000_000_000, Utc::now(), names, map, 42)
}

#[test]
fn report_counts_and_health() {
    use CheckStatus::*;
    let r = report("env", &[Pass, Pass, Warn, Fail, Skip]);
    assert_eq!(r.pass_count(), 2);
    assert_eq!(r.warn_count(), 1);
    assert_eq!(r.fail_count(), 1);
    assert_eq!(r.skip_count(), 1);
    assert_eq!(r.total_active(), 4);
    assert_eq!(r.health_pct(), 50.0);
}

#[test]
fn empty_report_is_fully_healthy() {
    let r = report("env", &[]);
    assert_eq!(r.health_pct(), 100.0);
    assert_eq!(r.total_active(), 0);
}

#[parameterized(
    critical = { &[CheckStatus::Pass, CheckStatus::Fail], OverallStatus::Critical },
    critical_with_warn = { &[CheckStatus::Warn, CheckStatus::Fail], OverallStatus::Critical },
    degraded = { &[CheckStatus::Pass, CheckStatus::Warn], OverallStatus::Degraded },
    healthy = { &[CheckStatus::Pass, CheckStatus::Pass], OverallStatus::Healthy },
    healthy_skips_only = { &[CheckStatus::Skip], OverallStatus::Healthy },
)]
fn overall_follows_totals(statuses: &[CheckStatus], expected: OverallStatus) {
    let scan = scan_of(vec![report("env", statuses)]);
    assert_eq!(scan.overall, expected);
    assert_eq!(scan.has_critical, expected == OverallStatus::Critical);
}

#[test]
fn failing_checkers_preserve_execution_order() {
    use CheckStatus::*;
    let scan = scan_of(vec![
        report("environment", &[Pass]),
        report("database", &[Fail]),
        report("api_health", &[Fail, Pass]),
    ]);
    // checker_names order came from the vec above
    assert_eq!(scan.failing_checkers, vec!["database", "api_health"]);
    assert_eq!(scan.totals.fail, 2);
}

#[test]
fn status_serializes_uppercase() {
    let json = serde_json::to_string(&CheckStatus::Warn).unwrap();
    assert_eq!(json, "\"WARN\"");
    let json = serde_json::to_string(&OverallStatus::Degraded).unwrap();
    assert_eq!(json, "\"DEGRADED\"");
}

#[test]
fn check_result_round_trips_with_details() {
    let mut result = CheckResult::new("todo_scan", CheckStatus::Warn, "3 TODOs found");
    result.details.insert(
        "file".to_string(),
        serde_json::Value::String("src/app.py".to_string()),
    );
    result.fixable = true;
    result.fix_desc = Some("remove stale TODO markers".to_string());

    let json = serde_json::to_string(&result).unwrap();
    let back: CheckResult = serde_json::from_str(&json).unwrap();
    assert_eq!(back, result);
}

#[test]
fn plain_result_omits_empty_fields() {
    let result = CheckResult::new("ping", CheckStatus::Pass, "ok");
    let json = serde_json::to_string(&result).unwrap();
    assert!(!json.contains("details"));
    assert!(!json.contains("fixable"));
    assert!(!json.contains("fix_desc"));
}
