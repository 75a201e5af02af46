// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! HTTP listener: the `/api/agent/*` surface plus workspace management.
//!
//! Each request resolves its workspace explicitly (query param, then the
//! `workspace_id` cookie, then the primary workspace) and looks the agent
//! up on the app state; there is no module-global agent.

use crate::agent::{Agent, ScanRequestOutcome, StartOutcome};
use crate::emitter::EventCounter;
use crate::registry::WorkspaceRegistry;
use crate::sse::{plan_replay, ClientGuard, ReplayPlan};
use axum::extract::{Query, State};
use axum::http::{HeaderMap, StatusCode};
use axum::response::sse::{Event as SseEvent, KeepAlive, Sse};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use futures_util::StreamExt;
use parking_lot::Mutex;
use serde::Deserialize;
use serde_json::json;
use std::collections::HashMap;
use std::convert::Infallible;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use vigil_adapters::llm::LlmProvider;
use vigil_core::workspace::{Workspace, WorkspaceId};
use vigil_storage::{ScanRow, Store};

/// Shared state behind every handler.
pub struct AppShared {
    pub default_workspace: WorkspaceId,
    pub agents: Mutex<HashMap<WorkspaceId, Arc<Agent>>>,
    pub store: Arc<Store>,
    pub counter: Arc<EventCounter>,
    pub locks_dir: PathBuf,
    pub registry: Mutex<WorkspaceRegistry>,
}

/// Cloneable handle for axum.
#[derive(Clone)]
pub struct AppState {
    pub inner: Arc<AppShared>,
}

impl AppState {
    pub fn agent(&self, workspace_id: &WorkspaceId) -> Option<Arc<Agent>> {
        self.inner.agents.lock().get(workspace_id).cloned()
    }

    pub fn insert_agent(&self, agent: Arc<Agent>) {
        self.inner
            .agents
            .lock()
            .insert(agent.workspace().id.clone(), agent);
    }
}

/// Build the API router.
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/api/agent/status", get(agent_status))
        .route("/api/agent/start", post(agent_start))
        .route("/api/agent/stop", post(agent_stop))
        .route("/api/agent/scan", post(agent_scan))
        .route("/api/agent/analyze", post(agent_analyze))
        .route("/api/agent/events", get(agent_events))
        .route("/api/agent/history", get(agent_history))
        .route("/api/agent/analyses", get(agent_analyses))
        .route("/api/agent/insights", get(agent_insights))
        .route("/api/agent/cost", get(agent_cost))
        .route("/api/agent/report", post(agent_report))
        .route("/api/workspaces", get(list_workspaces).post(add_workspace))
        .with_state(state)
}

/// Structured API failure.
struct ApiError {
    status: StatusCode,
    message: String,
}

impl ApiError {
    fn not_found(message: impl Into<String>) -> Self {
        Self {
            status: StatusCode::NOT_FOUND,
            message: message.into(),
        }
    }

    fn bad_request(message: impl Into<String>) -> Self {
        Self {
            status: StatusCode::BAD_REQUEST,
            message: message.into(),
        }
    }

    fn internal(message: impl Into<String>) -> Self {
        Self {
            status: StatusCode::INTERNAL_SERVER_ERROR,
            message: message.into(),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status, Json(json!({ "error": self.message }))).into_response()
    }
}

/// Extract `workspace_id` from a Cookie header.
fn workspace_from_cookie(headers: &HeaderMap) -> Option<String> {
    let cookies = headers.get("cookie")?.to_str().ok()?;
    cookies.split(';').find_map(|pair| {
        let (key, value) = pair.trim().split_once('=')?;
        (key == "workspace_id").then(|| value.to_string())
    })
}

/// Resolve the target agent: explicit query param, cookie, then primary.
fn resolve_agent(
    state: &AppState,
    headers: &HeaderMap,
    explicit: Option<&str>,
) -> Result<Arc<Agent>, ApiError> {
    let workspace_id = explicit
        .map(String::from)
        .or_else(|| workspace_from_cookie(headers))
        .map(WorkspaceId::new)
        .unwrap_or_else(|| state.inner.default_workspace.clone());

    state
        .agent(&workspace_id)
        .ok_or_else(|| ApiError::not_found(format!("unknown workspace: {workspace_id}")))
}

#[derive(Debug, Default, Deserialize)]
struct WorkspaceQuery {
    workspace: Option<String>,
}

#[derive(Debug, Deserialize)]
struct HistoryQuery {
    workspace: Option<String>,
    limit: Option<usize>,
    since_id: Option<i64>,
}

#[derive(Debug, Deserialize)]
struct LimitQuery {
    workspace: Option<String>,
    limit: Option<usize>,
}

#[derive(Debug, Default, Deserialize)]
struct ScanBody {
    checkers: Option<Vec<String>>,
}

#[derive(Debug, Deserialize)]
struct AnalyzeBody {
    checker: String,
}

#[derive(Debug, Deserialize)]
struct AddWorkspaceBody {
    config_path: PathBuf,
}

const MAX_PAGE: usize = 500;

fn page_limit(requested: Option<usize>, default: usize) -> usize {
    requested.unwrap_or(default).clamp(1, MAX_PAGE)
}

async fn agent_status(
    State(state): State<AppState>,
    Query(query): Query<WorkspaceQuery>,
    headers: HeaderMap,
) -> Result<impl IntoResponse, ApiError> {
    let agent = resolve_agent(&state, &headers, query.workspace.as_deref())?;
    Ok(Json(agent.status()))
}

async fn agent_start(
    State(state): State<AppState>,
    Query(query): Query<WorkspaceQuery>,
    headers: HeaderMap,
) -> Result<impl IntoResponse, ApiError> {
    let agent = resolve_agent(&state, &headers, query.workspace.as_deref())?;
    let body = match agent.start() {
        StartOutcome::Started | StartOutcome::AlreadyRunning => {
            json!({ "success": true, "state": agent.status().state })
        }
        StartOutcome::Disabled => {
            json!({ "success": false, "error": "agent_disabled" })
        }
        StartOutcome::LockHeld => {
            json!({ "success": false, "error": "singleton_held" })
        }
    };
    Ok(Json(body))
}

async fn agent_stop(
    State(state): State<AppState>,
    Query(query): Query<WorkspaceQuery>,
    headers: HeaderMap,
) -> Result<impl IntoResponse, ApiError> {
    let agent = resolve_agent(&state, &headers, query.workspace.as_deref())?;
    agent.stop().await;
    Ok(Json(json!({ "success": true, "state": agent.status().state })))
}

async fn agent_scan(
    State(state): State<AppState>,
    Query(query): Query<WorkspaceQuery>,
    headers: HeaderMap,
    body: Option<Json<ScanBody>>,
) -> Result<impl IntoResponse, ApiError> {
    let agent = resolve_agent(&state, &headers, query.workspace.as_deref())?;
    let checkers = body.and_then(|Json(body)| body.checkers);
    let response = match agent.request_scan(checkers) {
        ScanRequestOutcome::Queued => json!({ "queued": true }),
        ScanRequestOutcome::RateLimited { retry_after } => {
            json!({ "rate_limited": true, "retry_after": retry_after })
        }
    };
    Ok(Json(response))
}

async fn agent_analyze(
    State(state): State<AppState>,
    Query(query): Query<WorkspaceQuery>,
    headers: HeaderMap,
    Json(body): Json<AnalyzeBody>,
) -> Result<impl IntoResponse, ApiError> {
    let agent = resolve_agent(&state, &headers, query.workspace.as_deref())?;
    if !agent.request_analysis(body.checker) {
        return Err(ApiError::bad_request("checker must not be empty"));
    }
    Ok(Json(json!({ "queued": true })))
}

async fn agent_events(
    State(state): State<AppState>,
    Query(query): Query<WorkspaceQuery>,
    headers: HeaderMap,
) -> Result<impl IntoResponse, ApiError> {
    let agent = resolve_agent(&state, &headers, query.workspace.as_deref())?;

    let last_event_id = headers
        .get("last-event-id")
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.trim().parse::<i64>().ok());

    let (client_id, live_rx) = agent.hub().register();
    let guard = ClientGuard::new(Arc::clone(agent.hub()), client_id);

    let replay = match last_event_id {
        Some(last) => plan_replay(
            agent.store(),
            &agent.workspace().id,
            last,
            agent.workspace().config.agent.sse_replay_limit,
        ),
        None => ReplayPlan::default(),
    };
    let max_replayed = replay
        .max_replayed_id()
        .or(last_event_id)
        .unwrap_or(0);

    let mut backlog: Vec<Result<SseEvent, Infallible>> = Vec::new();
    if let Some(gap) = &replay.gap {
        let frame = json!({ "type": "_gap", "data": gap });
        backlog.push(Ok(SseEvent::default().data(frame.to_string())));
    }
    for stored in &replay.events {
        let data = serde_json::to_string(&stored.event).unwrap_or_default();
        backlog.push(Ok(SseEvent::default().id(stored.id.to_string()).data(data)));
    }

    // Live frames resume strictly above the replayed range; the client
    // dedupes by id anyway, this just avoids the overlap in the common case
    let live = tokio_stream::wrappers::ReceiverStream::new(live_rx)
        .filter(move |frame| futures_util::future::ready(frame.id as i64 > max_replayed))
        .map(move |frame| {
            let _keep_registered = &guard;
            let data = serde_json::to_string(&frame.event).unwrap_or_default();
            Ok(SseEvent::default().id(frame.id.to_string()).data(data))
        });

    let stream = futures_util::stream::iter(backlog).chain(live);
    Ok(Sse::new(stream).keep_alive(
        KeepAlive::new()
            .interval(Duration::from_secs(30))
            .text("heartbeat"),
    ))
}

async fn agent_history(
    State(state): State<AppState>,
    Query(query): Query<HistoryQuery>,
    headers: HeaderMap,
) -> Result<impl IntoResponse, ApiError> {
    let agent = resolve_agent(&state, &headers, query.workspace.as_deref())?;
    let events = agent
        .store()
        .recent_events(
            &agent.workspace().id,
            query.since_id,
            page_limit(query.limit, 100),
        )
        .map_err(|e| ApiError::internal(e.to_string()))?;
    Ok(Json(json!({ "events": events })))
}

async fn agent_analyses(
    State(state): State<AppState>,
    Query(query): Query<LimitQuery>,
    headers: HeaderMap,
) -> Result<impl IntoResponse, ApiError> {
    let agent = resolve_agent(&state, &headers, query.workspace.as_deref())?;
    let analyses = agent
        .store()
        .recent_analyses(&agent.workspace().id, page_limit(query.limit, 20))
        .map_err(|e| ApiError::internal(e.to_string()))?;
    Ok(Json(json!({ "analyses": analyses })))
}

async fn agent_insights(
    State(state): State<AppState>,
    Query(query): Query<LimitQuery>,
    headers: HeaderMap,
) -> Result<impl IntoResponse, ApiError> {
    let agent = resolve_agent(&state, &headers, query.workspace.as_deref())?;
    let insights = agent
        .store()
        .recent_insights(&agent.workspace().id, page_limit(query.limit, 50))
        .map_err(|e| ApiError::internal(e.to_string()))?;
    Ok(Json(json!({ "insights": insights })))
}

async fn agent_cost(
    State(state): State<AppState>,
    Query(query): Query<WorkspaceQuery>,
    headers: HeaderMap,
) -> Result<impl IntoResponse, ApiError> {
    let agent = resolve_agent(&state, &headers, query.workspace.as_deref())?;
    let body = match agent.llm() {
        Some(provider) => {
            let summary = provider.daily_summary();
            json!({
                "available": provider.is_available(),
                "summary": summary,
                "budget_exceeded": summary.remaining_usd <= 0.0,
            })
        }
        None => json!({ "available": false }),
    };
    Ok(Json(body))
}

async fn agent_report(
    State(state): State<AppState>,
    Query(query): Query<WorkspaceQuery>,
    headers: HeaderMap,
) -> Result<impl IntoResponse, ApiError> {
    let agent = resolve_agent(&state, &headers, query.workspace.as_deref())?;
    let Some(provider) = agent.llm() else {
        return Err(ApiError::bad_request("no LLM provider configured"));
    };

    let scan = agent
        .store()
        .latest_scan(&agent.workspace().id, &agent.workspace().name)
        .map_err(|e| ApiError::internal(e.to_string()))?
        .ok_or_else(|| ApiError::not_found("no scan recorded yet"))?;

    let config = agent.workspace().config.llm.clone().unwrap_or_default();
    let report = provider
        .generate_report(&agent.workspace().name, &scan_summary_text(&scan), &config)
        .await
        .map_err(|e| ApiError::internal(e.to_string()))?;
    Ok(Json(json!({ "report": report })))
}

/// Compact text summary of a scan for the narrative prompt.
fn scan_summary_text(scan: &ScanRow) -> String {
    let mut out = format!(
        "Overall: {} | PASS {} / WARN {} / FAIL {} | health {:.1}%\n",
        scan.overall_status, scan.total_pass, scan.total_warn, scan.total_fail, scan.health_pct
    );
    for (checker, report) in &scan.reports {
        if report.fail_count() == 0 && report.warn_count() == 0 {
            continue;
        }
        out.push_str(&format!(
            "\n{checker} (PASS:{} WARN:{} FAIL:{})\n",
            report.pass_count(),
            report.warn_count(),
            report.fail_count()
        ));
        for check in &report.results {
            if matches!(
                check.status,
                vigil_core::check::CheckStatus::Fail | vigil_core::check::CheckStatus::Warn
            ) {
                out.push_str(&format!(
                    "- {} [{}]: {}\n",
                    check.name,
                    check.status.as_str(),
                    check.message
                ));
            }
        }
    }
    out
}

async fn list_workspaces(State(state): State<AppState>) -> impl IntoResponse {
    let workspaces: Vec<serde_json::Value> = state
        .inner
        .agents
        .lock()
        .values()
        .map(|agent| {
            let workspace = agent.workspace();
            json!({
                "workspace_id": workspace.id,
                "name": workspace.name,
                "root": workspace.root,
                "running": agent.is_running(),
            })
        })
        .collect();
    Json(json!({ "workspaces": workspaces }))
}

async fn add_workspace(
    State(state): State<AppState>,
    Json(body): Json<AddWorkspaceBody>,
) -> Result<impl IntoResponse, ApiError> {
    let workspace =
        Workspace::load(&body.config_path).map_err(|e| ApiError::bad_request(e.to_string()))?;

    if let Some(existing) = state.agent(&workspace.id) {
        return Ok(Json(json!({
            "workspace_id": existing.workspace().id,
            "name": existing.workspace().name,
            "already_registered": true,
        })));
    }

    let agent = crate::lifecycle::build_agent(
        Arc::new(workspace),
        Arc::clone(&state.inner.store),
        Arc::clone(&state.inner.counter),
        &state.inner.locks_dir,
    );
    state.insert_agent(Arc::clone(&agent));

    // Persist so the workspace survives restart
    {
        let mut registry = state.inner.registry.lock();
        registry.add(body.config_path.clone());
        if let Err(e) = registry.save() {
            tracing::warn!(error = %e, "failed to persist workspace registry");
        }
    }

    if agent.workspace().config.agent.auto_start {
        agent.start();
    }

    Ok(Json(json!({
        "workspace_id": agent.workspace().id,
        "name": agent.workspace().name,
        "already_registered": false,
    })))
}

#[cfg(test)]
#[path = "listener_tests.rs"]
mod tests;
