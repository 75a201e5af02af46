// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use crate::check::{CheckResult, CheckStatus, PhaseReport, ScanResult};
use std::collections::BTreeMap;

fn ws() -> WorkspaceId {
    WorkspaceId::new("abc123def0")
}

fn change(path: &str) -> FileChange {
    FileChange {
        path: PathBuf::from(format!("/project/{path}")),
        change_type: FileChangeKind::Modified,
        extension: ".py".to_string(),
        relative_path: path.to_string(),
    }
}

fn sample_scan() -> ScanResult {
    let mut reports = BTreeMap::new();
    reports.insert(
        "environment".to_string(),
        PhaseReport::new(
            "environment",
            vec![CheckResult::new("env_file", CheckStatus::Fail, "missing .env")],
        ),
    );
    ScanResult::new(
        1_700_000_000_000,
        Utc::now(),
        vec!["environment".to_string()],
        reports,
        12,
    )
}

#[test]
fn wire_shape_has_type_and_data_keys() {
    let event = Event::new(
        ws(),
        EventSource::Observer,
        EventPayload::FileChanged {
            changes: vec![change("src/app.py")],
            affected_checkers: vec!["code_quality".to_string()],
            file_count: 1,
        },
    );

    let value: serde_json::Value = serde_json::to_value(&event).unwrap();
    assert_eq!(value["type"], "file_changed");
    assert_eq!(value["workspace_id"], "abc123def0");
    assert_eq!(value["source"], "observer");
    assert_eq!(value["data"]["file_count"], 1);
    assert_eq!(value["data"]["changes"][0]["relative_path"], "src/app.py");
    assert!(value.get("timestamp").is_some());
}

#[test]
fn event_round_trips_through_json() {
    let event = Event::new(
        ws(),
        EventSource::Api,
        EventPayload::ScanRequested {
            checker_names: Some(vec!["database".to_string()]),
            rate_limited: false,
            retry_after: None,
        },
    );
    let json = serde_json::to_string(&event).unwrap();
    let back: Event = serde_json::from_str(&json).unwrap();
    assert_eq!(back, event);
}

#[test]
fn scan_completed_round_trips_with_full_result() {
    let event = Event::new(
        ws(),
        EventSource::Agent,
        EventPayload::ScanCompleted(ScanOutcome::completed(sample_scan())),
    );
    let json = serde_json::to_string(&event).unwrap();
    let back: Event = serde_json::from_str(&json).unwrap();
    assert_eq!(back, event);

    // Scan fields are inlined into data, not nested under "scan"
    let value: serde_json::Value = serde_json::to_value(&event).unwrap();
    assert_eq!(value["data"]["overall"], "CRITICAL");
    assert_eq!(value["data"]["failing_checkers"][0], "environment");
    assert!(value["data"].get("scan").is_none());
}

#[test]
fn skipped_scan_serializes_reason_only() {
    let event = Event::new(
        ws(),
        EventSource::Agent,
        EventPayload::ScanCompleted(ScanOutcome::skipped("scan_in_progress")),
    );
    let value: serde_json::Value = serde_json::to_value(&event).unwrap();
    assert_eq!(value["data"]["skipped"], true);
    assert_eq!(value["data"]["reason"], "scan_in_progress");
    assert!(value["data"].get("overall").is_none());

    let back: Event = serde_json::from_value(value).unwrap();
    assert_eq!(back, event);
}

#[test]
fn every_payload_name_matches_wire_tag() {
    let payloads = vec![
        EventPayload::FileCreated {
            change: change("new.py"),
        },
        EventPayload::FileDeleted {
            change: change("old.py"),
        },
        EventPayload::CriticalDetected {
            scan_id: 7,
            failing_checkers: vec!["database".to_string()],
        },
        EventPayload::LlmAnalysisRequested {
            checker_name: "security".to_string(),
        },
        EventPayload::FixRequested {
            checker_name: "code_quality".to_string(),
            check_name: "todo_scan".to_string(),
        },
        EventPayload::FixCompleted {
            checker_name: "code_quality".to_string(),
            check_name: "todo_scan".to_string(),
            success: true,
            message: "removed".to_string(),
        },
        EventPayload::AgentStateChanged {
            old: AgentPhase::Observing,
            new: AgentPhase::Reasoning,
        },
        EventPayload::InsightGenerated { insights: vec![] },
    ];

    for payload in payloads {
        let name = payload.name().to_string();
        let event = Event::new(ws(), EventSource::System, payload);
        let value: serde_json::Value = serde_json::to_value(&event).unwrap();
        assert_eq!(value["type"], name);
    }
}

#[test]
fn state_change_uses_snake_case_phases() {
    let event = Event::new(
        ws(),
        EventSource::Agent,
        EventPayload::AgentStateChanged {
            old: AgentPhase::WaitingLlm,
            new: AgentPhase::Observing,
        },
    );
    let value: serde_json::Value = serde_json::to_value(&event).unwrap();
    assert_eq!(value["data"]["old"], "waiting_llm");
    assert_eq!(value["data"]["new"], "observing");
}

#[test]
fn log_summary_is_single_line() {
    let event = Event::new(
        ws(),
        EventSource::Observer,
        EventPayload::FileChanged {
            changes: vec![change("a.py"), change("b.py")],
            affected_checkers: vec!["code_quality".to_string(), "security".to_string()],
            file_count: 2,
        },
    );
    let summary = event.log_summary();
    assert!(summary.starts_with("file_changed"));
    assert!(summary.contains("files=2"));
    assert!(!summary.contains('\n'));
}

#[test]
fn scan_report_lookup() {
    let event = Event::new(
        ws(),
        EventSource::Agent,
        EventPayload::ScanCompleted(ScanOutcome::completed(sample_scan())),
    );
    assert!(event.scan_report("environment").is_some());
    assert!(event.scan_report("database").is_none());
}
