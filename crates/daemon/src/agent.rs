// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The per-workspace agent: state machine + Observe-Reason-Act loop.
//!
//! One cooperative worker task per workspace drains the event queue. Each
//! dequeued event is emitted (memory -> store -> SSE), reasoned over, and
//! the resulting actions executed; result events feed back through the same
//! cycle so post-scan rules see them. The dequeue timeout doubles as the
//! maintenance tick that drives the periodic retention purge.

use crate::emitter::{EventCounter, EventEmitter};
use crate::singleton::SingletonLock;
use crate::sse::SseHub;
use chrono::Utc;
use parking_lot::Mutex;
use serde::Serialize;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Weak};
use std::time::{Duration, Instant};
use tokio::sync::mpsc;
use vigil_adapters::llm::LlmProvider;
use vigil_adapters::observer::{FileObserver, ObserverConfig};
use vigil_core::action::Action;
use vigil_core::agent::AgentPhase;
use vigil_core::event::{Event, EventPayload, EventSource};
use vigil_core::insight::{Insight, InsightKind, Severity};
use vigil_core::workspace::{Workspace, WorkspaceId};
use vigil_core::SystemClock;
use vigil_engine::{AgentMemory, CheckerRegistry, Executor, Reasoner};
use vigil_storage::Store;

const EVENT_QUEUE_CAPACITY: usize = 256;

/// Result of a start request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StartOutcome {
    Started,
    /// The loop is already running; starting again is a no-op.
    AlreadyRunning,
    /// The workspace config disables the agent.
    Disabled,
    /// Another process holds the workspace's singleton lock.
    LockHeld,
}

/// Result of a manual scan request.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ScanRequestOutcome {
    Queued,
    RateLimited { retry_after: f64 },
}

/// Status snapshot for the API.
#[derive(Debug, Clone, Serialize)]
pub struct AgentStatus {
    pub enabled: bool,
    pub state: AgentPhase,
    pub workspace_id: WorkspaceId,
    pub observer_running: bool,
    pub executor_busy: bool,
    pub llm_available: bool,
    pub event_queue_size: usize,
    pub sse_clients: usize,
}

/// One workspace's agent instance.
pub struct Agent {
    workspace: Arc<Workspace>,
    store: Arc<Store>,
    hub: Arc<SseHub>,
    emitter: Arc<EventEmitter>,
    memory: Arc<Mutex<AgentMemory>>,
    reasoner: Reasoner<SystemClock>,
    executor: Arc<Executor<SystemClock>>,
    llm: Option<Arc<dyn LlmProvider>>,
    phase: Mutex<AgentPhase>,
    queue_tx: Mutex<mpsc::Sender<Event>>,
    queue_rx: Mutex<Option<mpsc::Receiver<Event>>>,
    /// Manual-scan rate limit state; check-and-set happens eagerly at the
    /// request boundary, before the event is enqueued.
    last_manual_scan: Mutex<Option<Instant>>,
    singleton: Mutex<SingletonLock>,
    observer: Mutex<Option<FileObserver>>,
    worker: Mutex<Option<tokio::task::JoinHandle<mpsc::Receiver<Event>>>>,
    shutdown: Arc<AtomicBool>,
    /// Back-reference handed to the worker task (set by `Arc::new_cyclic`).
    self_ref: Weak<Agent>,
}

impl Agent {
    pub fn new(
        workspace: Arc<Workspace>,
        registry: Arc<CheckerRegistry>,
        llm: Option<Arc<dyn LlmProvider>>,
        store: Arc<Store>,
        counter: Arc<EventCounter>,
        lock_dir: &std::path::Path,
    ) -> Arc<Self> {
        let memory = Arc::new(Mutex::new(AgentMemory::new(
            workspace.config.agent.max_memory_events,
        )));
        let hub = Arc::new(SseHub::new());
        let emitter = Arc::new(EventEmitter::new(
            Arc::clone(&memory),
            Arc::clone(&store),
            Arc::clone(&hub),
            counter,
        ));
        let executor = Arc::new(Executor::new(
            Arc::clone(&workspace),
            registry,
            llm.clone(),
            Arc::clone(&store),
            SystemClock,
        ));
        let reasoner = Reasoner::new(workspace.config.agent.clone(), SystemClock);
        let singleton = SingletonLock::new(
            lock_dir,
            workspace.id.clone(),
            Duration::from_secs(workspace.config.agent.singleton_max_age_seconds),
        );
        let (queue_tx, queue_rx) = mpsc::channel(EVENT_QUEUE_CAPACITY);

        Arc::new_cyclic(|self_ref| Self {
            workspace,
            store,
            hub,
            emitter,
            memory,
            reasoner,
            executor,
            llm,
            phase: Mutex::new(AgentPhase::Idle),
            queue_tx: Mutex::new(queue_tx),
            queue_rx: Mutex::new(Some(queue_rx)),
            last_manual_scan: Mutex::new(None),
            singleton: Mutex::new(singleton),
            observer: Mutex::new(None),
            worker: Mutex::new(None),
            shutdown: Arc::new(AtomicBool::new(false)),
            self_ref: self_ref.clone(),
        })
    }

    pub fn workspace(&self) -> &Arc<Workspace> {
        &self.workspace
    }

    pub fn store(&self) -> &Arc<Store> {
        &self.store
    }

    pub fn hub(&self) -> &Arc<SseHub> {
        &self.hub
    }

    pub fn llm(&self) -> Option<&Arc<dyn LlmProvider>> {
        self.llm.as_ref()
    }

    pub fn is_running(&self) -> bool {
        self.worker
            .lock()
            .as_ref()
            .is_some_and(|handle| !handle.is_finished())
    }

    /// Start the agent loop. Idempotent; holds the singleton lock while
    /// running.
    pub fn start(&self) -> StartOutcome {
        // Always present while any caller holds the Arc
        let Some(me) = self.self_ref.upgrade() else {
            return StartOutcome::Disabled;
        };
        if !self.workspace.config.agent.enabled {
            return StartOutcome::Disabled;
        }
        if self.is_running() {
            tracing::info!(workspace = %self.workspace.id, "agent already running");
            return StartOutcome::AlreadyRunning;
        }
        if !self.singleton.lock().acquire() {
            tracing::warn!(
                workspace = %self.workspace.id,
                "another agent instance holds this workspace"
            );
            return StartOutcome::LockHeld;
        }

        self.shutdown.store(false, Ordering::SeqCst);

        // Startup purge keeps the store bounded even across long downtimes
        match self
            .store
            .purge(&self.workspace.config.agent.retention, Utc::now())
        {
            Ok(outcome) if outcome.total() > 0 => {
                tracing::info!(removed = outcome.total(), "startup retention purge");
            }
            Ok(_) => {}
            Err(e) => tracing::warn!(error = %e, "startup purge failed"),
        }

        // A fresh channel if the previous receiver was lost to a timed-out
        // join
        let queue_rx = self.queue_rx.lock().take().unwrap_or_else(|| {
            let (tx, rx) = mpsc::channel(EVENT_QUEUE_CAPACITY);
            *self.queue_tx.lock() = tx;
            rx
        });

        let agent_config = &self.workspace.config.agent;
        match FileObserver::start(
            ObserverConfig {
                workspace_root: self.workspace.root.clone(),
                watch_dirs: agent_config.watch_dirs.clone(),
                debounce: Duration::from_secs_f64(agent_config.debounce_seconds.max(0.0)),
                extra_ignore_patterns: agent_config.ignore_patterns.clone(),
                extra_ignore_extensions: agent_config.ignore_extensions.clone(),
            },
            self.workspace.id.clone(),
            self.queue_tx.lock().clone(),
        ) {
            Ok(observer) => *self.observer.lock() = Some(observer),
            Err(e) => {
                tracing::warn!(error = %e, "file observer disabled for this workspace")
            }
        }

        let worker = tokio::spawn(worker_loop(me, queue_rx));
        *self.worker.lock() = Some(worker);
        tracing::info!(workspace = %self.workspace.id, "agent loop started");
        StartOutcome::Started
    }

    /// Graceful stop: signal shutdown, stop the observer, join the worker
    /// with a bounded timeout, release the singleton lock.
    pub async fn stop(&self) {
        self.shutdown.store(true, Ordering::SeqCst);

        let observer = self.observer.lock().take();
        if let Some(mut observer) = observer {
            observer.stop().await;
        }

        let worker = self.worker.lock().take();
        if let Some(mut worker) = worker {
            match tokio::time::timeout(crate::env::worker_join_timeout(), &mut worker).await {
                Ok(Ok(queue_rx)) => {
                    *self.queue_rx.lock() = Some(queue_rx);
                }
                Ok(Err(e)) => tracing::warn!(error = %e, "agent worker join failed"),
                Err(_) => {
                    tracing::warn!("agent worker join timed out, aborting");
                    worker.abort();
                }
            }
        }

        self.singleton.lock().release();
        self.set_phase(AgentPhase::Idle);
        tracing::info!(workspace = %self.workspace.id, "agent loop stopped");
    }

    /// Non-blocking manual scan request.
    ///
    /// The rate limiter is checked-and-set here, eagerly, so repeated API
    /// calls cannot race past the minimum interval while the worker drains.
    /// A rejected request still enqueues a tagged `scan_requested` event so
    /// the reasoner surfaces the structured rate-limit insight.
    pub fn request_scan(&self, checker_names: Option<Vec<String>>) -> ScanRequestOutcome {
        let min_interval =
            Duration::from_secs_f64(self.workspace.config.agent.manual_scan_min_interval.max(0.0));
        let now = Instant::now();

        let retry_after = {
            let mut last = self.last_manual_scan.lock();
            match *last {
                Some(prev) if now.duration_since(prev) < min_interval => {
                    let remaining = min_interval - now.duration_since(prev);
                    Some((remaining.as_secs_f64() * 10.0).round() / 10.0)
                }
                _ => {
                    *last = Some(now);
                    None
                }
            }
        };

        match retry_after {
            Some(retry_after) => {
                self.enqueue(EventPayload::ScanRequested {
                    checker_names,
                    rate_limited: true,
                    retry_after: Some(retry_after),
                });
                ScanRequestOutcome::RateLimited { retry_after }
            }
            None => {
                self.enqueue(EventPayload::ScanRequested {
                    checker_names,
                    rate_limited: false,
                    retry_after: None,
                });
                ScanRequestOutcome::Queued
            }
        }
    }

    /// Non-blocking deep-analysis request.
    pub fn request_analysis(&self, checker_name: String) -> bool {
        if checker_name.is_empty() {
            return false;
        }
        self.enqueue(EventPayload::LlmAnalysisRequested { checker_name });
        true
    }

    fn enqueue(&self, payload: EventPayload) {
        let event = Event::new(self.workspace.id.clone(), EventSource::Api, payload);
        let tx = self.queue_tx.lock().clone();
        if let Err(e) = tx.try_send(event) {
            tracing::warn!(error = %e, "event queue full, dropping request");
        }
    }

    pub fn status(&self) -> AgentStatus {
        let queue_tx = self.queue_tx.lock().clone();
        AgentStatus {
            enabled: self.workspace.config.agent.enabled,
            state: *self.phase.lock(),
            workspace_id: self.workspace.id.clone(),
            observer_running: self
                .observer
                .lock()
                .as_ref()
                .is_some_and(|o| o.is_running()),
            executor_busy: self.executor.is_scanning(),
            llm_available: self.executor.llm_available(),
            event_queue_size: queue_tx.max_capacity() - queue_tx.capacity(),
            sse_clients: self.hub.client_count(),
        }
    }

    fn set_phase(&self, new: AgentPhase) {
        let old = {
            let mut phase = self.phase.lock();
            if *phase == new {
                return;
            }
            let old = *phase;
            *phase = new;
            old
        };
        let event = Event::new(
            self.workspace.id.clone(),
            EventSource::Agent,
            EventPayload::AgentStateChanged { old, new },
        );
        self.emitter.emit(&event);
    }

    /// One full Observe-Reason-Act cycle, including result-event feedback.
    async fn process_event(&self, event: Event) -> Result<(), String> {
        let mut pending = vec![event];
        while let Some(event) = pending.pop() {
            // Cross-workspace leakage is an invariant breach, not a normal
            // outcome
            if event.workspace_id != self.workspace.id {
                return Err(format!(
                    "dropped {} for workspace {} (this agent serves {})",
                    event.name(),
                    event.workspace_id,
                    self.workspace.id
                ));
            }

            self.set_phase(AgentPhase::Observing);
            self.emitter.emit(&event);
            self.persist_artifacts(&event);

            self.set_phase(AgentPhase::Reasoning);
            let actions = {
                let memory = self.memory.lock();
                self.reasoner
                    .evaluate(&event, &memory, self.workspace.checker_names())
            };

            for action in actions {
                let phase = match &action {
                    Action::LlmAnalyze { .. } => AgentPhase::WaitingLlm,
                    _ => AgentPhase::Executing,
                };
                self.set_phase(phase);
                let result = self.executor.execute(action).await;
                pending.push(result);
            }

            self.set_phase(AgentPhase::Observing);
        }
        Ok(())
    }

    /// Persist the durable artifacts a result event carries.
    ///
    /// Failures are logged and swallowed; the loop keeps going.
    fn persist_artifacts(&self, event: &Event) {
        match &event.payload {
            EventPayload::ScanCompleted(outcome) => {
                if let Some(scan) = &outcome.scan {
                    self.memory.lock().record_scan(scan.clone(), Instant::now());
                    if let Err(e) =
                        self.store
                            .insert_scan(&self.workspace.id, &self.workspace.name, scan)
                    {
                        tracing::warn!(error = %e, "failed to save scan");
                    }
                }
            }
            EventPayload::LlmAnalysisCompleted {
                analysis: Some(analysis),
                ..
            } => {
                if let Err(e) = self.store.insert_analysis(&self.workspace.id, analysis) {
                    tracing::warn!(error = %e, "failed to save analysis");
                }
            }
            EventPayload::InsightGenerated { insights } => {
                for insight in insights {
                    if let Err(e) =
                        self.store
                            .insert_insight(&self.workspace.id, event.timestamp, insight)
                    {
                        tracing::warn!(error = %e, "failed to save insight");
                    }
                }
            }
            _ => {}
        }
    }

    /// Periodic retention purge; emits an insight event when rows were
    /// actually deleted so UIs can show a notification.
    fn maybe_purge(&self, last_purge: &mut Instant) {
        let interval = Duration::from_secs(self.workspace.config.agent.purge_interval_seconds);
        if last_purge.elapsed() < interval {
            return;
        }
        *last_purge = Instant::now();

        match self
            .store
            .purge(&self.workspace.config.agent.retention, Utc::now())
        {
            Ok(outcome) if outcome.total() > 0 => {
                let insight = Insight::new(
                    InsightKind::RetentionPurge,
                    Severity::Info,
                    format!("retention purge removed {} rows", outcome.total()),
                )
                .with_data("events_removed", serde_json::json!(outcome.events_removed))
                .with_data(
                    "analyses_removed",
                    serde_json::json!(outcome.analyses_removed),
                )
                .with_data(
                    "insights_removed",
                    serde_json::json!(outcome.insights_removed),
                );
                let event = Event::new(
                    self.workspace.id.clone(),
                    EventSource::System,
                    EventPayload::InsightGenerated {
                        insights: vec![insight],
                    },
                );
                self.emitter.emit(&event);
                self.persist_artifacts(&event);
            }
            Ok(_) => tracing::debug!("runtime purge: nothing to clean"),
            Err(e) => tracing::warn!(error = %e, "runtime purge failed"),
        }
    }
}

/// The worker task: drains the queue until shutdown.
async fn worker_loop(agent: Arc<Agent>, mut queue_rx: mpsc::Receiver<Event>) -> mpsc::Receiver<Event> {
    agent.set_phase(AgentPhase::Observing);
    let mut last_purge = Instant::now();

    loop {
        if agent.shutdown.load(Ordering::SeqCst) {
            break;
        }
        match tokio::time::timeout(crate::env::dequeue_timeout(), queue_rx.recv()).await {
            Err(_) => {
                // Idle tick doubles as the maintenance heartbeat
                agent.maybe_purge(&mut last_purge);
            }
            Ok(None) => break,
            Ok(Some(event)) => {
                if let Err(message) = agent.process_event(event).await {
                    tracing::error!(error = %message, "agent loop error");
                    agent.set_phase(AgentPhase::Error);
                    tokio::time::sleep(crate::env::error_pause()).await;
                    agent.set_phase(AgentPhase::Observing);
                }
            }
        }
    }

    queue_rx
}

#[cfg(test)]
#[path = "agent_tests.rs"]
mod tests;
