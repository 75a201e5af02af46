// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Debounced file observer.
//!
//! Wraps the platform's native FS notifications. Raw events are filtered,
//! keyed by path into a pending map, and flushed as one batched
//! `file_changed` event once the tree has been quiet for the debounce
//! window. The debouncer is explicit rather than relying on the watch
//! library's coalescing, because the two-stage mapping must see the union
//! of the whole batch.

pub mod filter;
pub mod mapping;

use filter::PathFilter;
use notify::{RecommendedWatcher, RecursiveMode, Watcher};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::sync::{mpsc, oneshot};
use vigil_core::event::{Event, EventPayload, EventSource, FileChange, FileChangeKind};
use vigil_core::workspace::WorkspaceId;

/// Observer construction errors
#[derive(Debug, Error)]
pub enum ObserverError {
    #[error("watch setup failed: {0}")]
    Watch(#[from] notify::Error),

    #[error("no valid watch directories under {0}")]
    NoWatchDirs(PathBuf),
}

/// What the observer needs to know about one workspace.
#[derive(Debug, Clone)]
pub struct ObserverConfig {
    pub workspace_root: PathBuf,
    pub watch_dirs: Vec<String>,
    pub debounce: Duration,
    pub extra_ignore_patterns: Vec<String>,
    pub extra_ignore_extensions: Vec<String>,
}

/// Handle to a running observer.
pub struct FileObserver {
    shutdown_tx: Option<oneshot::Sender<()>>,
    task: Option<tokio::task::JoinHandle<()>>,
    running: Arc<AtomicBool>,
}

impl FileObserver {
    /// Start watching and emitting batched `file_changed` events into
    /// `event_tx`.
    pub fn start(
        config: ObserverConfig,
        workspace_id: WorkspaceId,
        event_tx: mpsc::Sender<Event>,
    ) -> Result<Self, ObserverError> {
        let debounce = crate::env::debounce_override().unwrap_or(config.debounce);
        let filter = PathFilter::new(
            &config.extra_ignore_patterns,
            &config.extra_ignore_extensions,
        );

        let (raw_tx, raw_rx) = mpsc::channel::<(PathBuf, FileChangeKind)>(256);
        let mut watcher = create_watcher(raw_tx)?;

        let mut scheduled = 0;
        for dir in &config.watch_dirs {
            let target = config.workspace_root.join(dir);
            if target.is_dir() {
                watcher.watch(&target, RecursiveMode::Recursive)?;
                tracing::info!(dir = %target.display(), "watching");
                scheduled += 1;
            }
        }
        if scheduled == 0 {
            return Err(ObserverError::NoWatchDirs(config.workspace_root));
        }

        let (shutdown_tx, shutdown_rx) = oneshot::channel();
        let running = Arc::new(AtomicBool::new(true));
        let task = tokio::spawn(debounce_loop(DebounceParams {
            // Keeps the native watcher alive for the task's lifetime
            watcher,
            workspace_id,
            workspace_root: config.workspace_root,
            debounce,
            filter,
            raw_rx,
            event_tx,
            shutdown_rx,
            running: Arc::clone(&running),
        }));

        Ok(Self {
            shutdown_tx: Some(shutdown_tx),
            task: Some(task),
            running,
        })
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    /// Stop the observer, joining the debounce task with a bounded timeout.
    pub async fn stop(&mut self) {
        if let Some(tx) = self.shutdown_tx.take() {
            let _ = tx.send(());
        }
        if let Some(task) = self.task.take() {
            if tokio::time::timeout(crate::env::observer_join_ms(), task)
                .await
                .is_err()
            {
                tracing::warn!("observer join timed out");
            }
        }
        self.running.store(false, Ordering::SeqCst);
    }
}

fn create_watcher(
    raw_tx: mpsc::Sender<(PathBuf, FileChangeKind)>,
) -> Result<RecommendedWatcher, notify::Error> {
    notify::recommended_watcher(move |res: Result<notify::Event, notify::Error>| {
        let Ok(event) = res else {
            return;
        };
        let kind = match event.kind {
            notify::EventKind::Create(_) => FileChangeKind::Created,
            notify::EventKind::Remove(_) => FileChangeKind::Deleted,
            notify::EventKind::Modify(_) | notify::EventKind::Any => FileChangeKind::Modified,
            notify::EventKind::Access(_) | notify::EventKind::Other => return,
        };
        for path in event.paths {
            // Full channel means a burst is already pending; dropping is fine
            let _ = raw_tx.blocking_send((path, kind));
        }
    })
}

struct DebounceParams {
    watcher: RecommendedWatcher,
    workspace_id: WorkspaceId,
    workspace_root: PathBuf,
    debounce: Duration,
    filter: PathFilter,
    raw_rx: mpsc::Receiver<(PathBuf, FileChangeKind)>,
    event_tx: mpsc::Sender<Event>,
    shutdown_rx: oneshot::Receiver<()>,
    running: Arc<AtomicBool>,
}

async fn debounce_loop(params: DebounceParams) {
    let DebounceParams {
        watcher: _watcher,
        workspace_id,
        workspace_root,
        debounce,
        filter,
        mut raw_rx,
        event_tx,
        mut shutdown_rx,
        running,
    } = params;

    let mut pending: HashMap<PathBuf, FileChange> = HashMap::new();
    let mut deadline: Option<tokio::time::Instant> = None;

    loop {
        tokio::select! {
            raw = raw_rx.recv() => {
                let Some((path, kind)) = raw else { break };
                if path.is_dir() || !filter.accepts(&path) {
                    continue;
                }
                let change = file_change(&workspace_root, &path, kind);
                pending.insert(path, change);
                // Re-arm: flush fires debounce after the *latest* raw event
                deadline = Some(tokio::time::Instant::now() + debounce);
            }

            _ = sleep_until_or_forever(deadline) => {
                deadline = None;
                flush(&workspace_id, &mut pending, &event_tx).await;
            }

            _ = &mut shutdown_rx => break,
        }
    }

    running.store(false, Ordering::SeqCst);
    tracing::debug!("observer loop exited");
}

async fn sleep_until_or_forever(deadline: Option<tokio::time::Instant>) {
    match deadline {
        Some(deadline) => tokio::time::sleep_until(deadline).await,
        None => std::future::pending().await,
    }
}

fn file_change(root: &Path, path: &Path, kind: FileChangeKind) -> FileChange {
    let name = path
        .file_name()
        .and_then(|n| n.to_str())
        .unwrap_or_default();
    let relative_path = path
        .strip_prefix(root)
        .unwrap_or(path)
        .to_string_lossy()
        .into_owned();
    FileChange {
        path: path.to_path_buf(),
        change_type: kind,
        extension: mapping::extension_of(name),
        relative_path,
    }
}

async fn flush(
    workspace_id: &WorkspaceId,
    pending: &mut HashMap<PathBuf, FileChange>,
    event_tx: &mpsc::Sender<Event>,
) {
    if pending.is_empty() {
        return;
    }
    let mut changes: Vec<FileChange> = pending.drain().map(|(_, c)| c).collect();
    changes.sort_by(|a, b| a.relative_path.cmp(&b.relative_path));
    let affected_checkers = mapping::affected_checkers(&changes);
    let file_count = changes.len();

    tracing::info!(
        files = file_count,
        checkers = affected_checkers.len(),
        "file change batch"
    );

    let event = Event::new(
        workspace_id.clone(),
        EventSource::Observer,
        EventPayload::FileChanged {
            changes,
            affected_checkers,
            file_count,
        },
    );
    if event_tx.send(event).await.is_err() {
        tracing::warn!("event queue closed, dropping file change batch");
    }
}

#[cfg(test)]
#[path = "observer_tests.rs"]
mod tests;
