// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use crate::lifecycle::build_agent;
use axum::body::Body;
use axum::http::{Request, StatusCode};
use serde_json::Value;
use tower::ServiceExt;
use vigil_core::event::{Event, EventPayload, EventSource};

struct TestApp {
    router: Router,
    store: Arc<Store>,
    workspace_id: WorkspaceId,
    _dir: tempfile::TempDir,
}

fn test_app() -> TestApp {
    let dir = tempfile::tempdir().unwrap();
    let config_path = dir.path().join("vigil.toml");
    std::fs::write(&config_path, "[project]\nname = \"demo\"\n").unwrap();

    let workspace = Arc::new(Workspace::load(&config_path).unwrap());
    let workspace_id = workspace.id.clone();
    let store = Arc::new(Store::open_in_memory().unwrap());
    let counter = Arc::new(EventCounter::seeded(0));
    let agent = build_agent(
        workspace,
        Arc::clone(&store),
        Arc::clone(&counter),
        &dir.path().join("locks"),
    );

    let mut agents = HashMap::new();
    agents.insert(workspace_id.clone(), agent);
    let state = AppState {
        inner: Arc::new(AppShared {
            default_workspace: workspace_id.clone(),
            agents: Mutex::new(agents),
            store: Arc::clone(&store),
            counter,
            locks_dir: dir.path().join("locks"),
            registry: Mutex::new(WorkspaceRegistry::load(
                &dir.path().join("workspaces.json"),
            )),
        }),
    };

    TestApp {
        router: router(state),
        store,
        workspace_id,
        _dir: dir,
    }
}

async fn get_json(app: &TestApp, uri: &str) -> (StatusCode, Value) {
    let response = app
        .router
        .clone()
        .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
        .await
        .unwrap();
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let value = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
    (status, value)
}

async fn post_json(app: &TestApp, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
    let mut builder = Request::builder().method("POST").uri(uri);
    let body = match body {
        Some(value) => {
            builder = builder.header("content-type", "application/json");
            Body::from(value.to_string())
        }
        None => Body::empty(),
    };
    let response = app
        .router
        .clone()
        .oneshot(builder.body(body).unwrap())
        .await
        .unwrap();
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let value = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
    (status, value)
}

#[tokio::test]
async fn status_defaults_to_primary_workspace() {
    let app = test_app();
    let (status, body) = get_json(&app, "/api/agent/status").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["workspace_id"], app.workspace_id.as_str());
    assert_eq!(body["state"], "idle");
    assert_eq!(body["enabled"], true);
    assert_eq!(body["sse_clients"], 0);
}

#[tokio::test]
async fn unknown_workspace_is_404() {
    let app = test_app();
    let (status, body) = get_json(&app, "/api/agent/status?workspace=ffff000011").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert!(body["error"].as_str().unwrap().contains("ffff000011"));
}

#[tokio::test]
async fn history_returns_persisted_events() {
    let app = test_app();
    for id in 1..=3 {
        let event = Event::new(
            app.workspace_id.clone(),
            EventSource::Api,
            EventPayload::LlmAnalysisRequested {
                checker_name: format!("checker_{id}"),
            },
        );
        app.store.insert_event(id, &event).unwrap();
    }

    let (status, body) = get_json(&app, "/api/agent/history?limit=2").await;
    assert_eq!(status, StatusCode::OK);
    let events = body["events"].as_array().unwrap();
    assert_eq!(events.len(), 2);
    // Newest first, ids attached
    assert_eq!(events[0]["id"], 3);
    assert_eq!(events[0]["type"], "llm_analysis_requested");

    let (_, body) = get_json(&app, "/api/agent/history?since_id=2").await;
    assert_eq!(body["events"].as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn events_never_leak_across_workspaces() {
    let app = test_app();
    let foreign = Event::new(
        WorkspaceId::new("bbbb333344"),
        EventSource::Api,
        EventPayload::LlmAnalysisRequested {
            checker_name: "security".to_string(),
        },
    );
    app.store.insert_event(1, &foreign).unwrap();

    let (_, body) = get_json(&app, "/api/agent/history").await;
    assert!(body["events"].as_array().unwrap().is_empty());
}

#[tokio::test]
async fn scan_without_body_queues() {
    let app = test_app();
    let (status, body) = post_json(&app, "/api/agent/scan", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["queued"], true);
}

#[tokio::test]
async fn second_scan_is_rate_limited_with_retry_after() {
    let app = test_app();
    let (_, first) = post_json(&app, "/api/agent/scan", None).await;
    assert_eq!(first["queued"], true);

    let (status, second) = post_json(
        &app,
        "/api/agent/scan",
        Some(serde_json::json!({ "checkers": ["environment"] })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(second["rate_limited"], true);
    assert!(second["retry_after"].as_f64().unwrap() > 0.0);
}

#[tokio::test]
async fn analyze_requires_checker() {
    let app = test_app();
    let (status, body) = post_json(
        &app,
        "/api/agent/analyze",
        Some(serde_json::json!({ "checker": "" })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].as_str().is_some());

    let (status, body) = post_json(
        &app,
        "/api/agent/analyze",
        Some(serde_json::json!({ "checker": "security" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["queued"], true);
}

#[tokio::test]
async fn cost_without_provider_reports_unavailable() {
    let app = test_app();
    let (status, body) = get_json(&app, "/api/agent/cost").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["available"], false);
}

#[tokio::test]
async fn report_without_provider_is_rejected() {
    let app = test_app();
    let (status, body) = post_json(&app, "/api/agent/report", None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].as_str().unwrap().contains("LLM"));
}

#[tokio::test]
async fn workspaces_list_and_add() {
    let app = test_app();
    let (_, body) = get_json(&app, "/api/workspaces").await;
    assert_eq!(body["workspaces"].as_array().unwrap().len(), 1);

    let extra_dir = tempfile::tempdir().unwrap();
    let extra_config = extra_dir.path().join("vigil.toml");
    std::fs::write(&extra_config, "[project]\nname = \"extra\"\n").unwrap();

    let (status, added) = post_json(
        &app,
        "/api/workspaces",
        Some(serde_json::json!({ "config_path": extra_config })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(added["already_registered"], false);
    assert_eq!(added["name"], "extra");

    let (_, body) = get_json(&app, "/api/workspaces").await;
    assert_eq!(body["workspaces"].as_array().unwrap().len(), 2);

    // Re-adding the same workspace is reported, not duplicated
    let (_, again) = post_json(
        &app,
        "/api/workspaces",
        Some(serde_json::json!({ "config_path": extra_config })),
    )
    .await;
    assert_eq!(again["already_registered"], true);
}

#[tokio::test]
async fn add_workspace_with_bad_config_is_400() {
    let app = test_app();
    let (status, body) = post_json(
        &app,
        "/api/workspaces",
        Some(serde_json::json!({ "config_path": "/nonexistent/vigil.toml" })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].as_str().is_some());
}

#[tokio::test]
async fn cookie_resolves_workspace() {
    let app = test_app();
    let response = app
        .router
        .clone()
        .oneshot(
            Request::builder()
                .uri("/api/agent/status")
                .header("cookie", format!("theme=dark; workspace_id={}", app.workspace_id))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let response = app
        .router
        .clone()
        .oneshot(
            Request::builder()
                .uri("/api/agent/status")
                .header("cookie", "workspace_id=ffff000011")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}
