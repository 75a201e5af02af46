// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Daemon lifecycle: paths, startup, workspace wiring.

use crate::agent::Agent;
use crate::emitter::EventCounter;
use crate::listener::{AppShared, AppState};
use crate::registry::WorkspaceRegistry;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use thiserror::Error;
use vigil_adapters::llm::{HttpLlmProvider, LlmProvider};
use vigil_core::config::ConfigError;
use vigil_core::workspace::Workspace;
use vigil_engine::CheckerRegistry;
use vigil_storage::{Store, StoreError};

/// Lifecycle errors
#[derive(Debug, Error)]
pub enum LifecycleError {
    #[error("Could not determine state directory")]
    NoStateDir,

    #[error("workspace config error: {0}")]
    Config(#[from] ConfigError),

    #[error("store error: {0}")]
    Store(#[from] StoreError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Host-local daemon paths
#[derive(Debug, Clone)]
pub struct Paths {
    /// Root state directory (e.g. ~/.local/state/vigil)
    pub state_dir: PathBuf,
    /// SQLite database shared by all workspaces
    pub db_path: PathBuf,
    /// Daemon log file
    pub log_path: PathBuf,
    /// Per-workspace singleton lock files
    pub locks_dir: PathBuf,
    /// Persisted extra-workspace registry
    pub registry_path: PathBuf,
}

impl Paths {
    /// Resolve paths under the user's state directory.
    ///
    /// `VIGIL_STATE_DIR` takes priority (tests use it for isolation), then
    /// `$XDG_STATE_HOME/vigil`, then `~/.local/state/vigil`.
    pub fn load() -> Result<Self, LifecycleError> {
        let state_dir = state_dir()?;
        Ok(Self {
            db_path: state_dir.join("vigil.db"),
            log_path: state_dir.join("vigild.log"),
            locks_dir: state_dir.join("locks"),
            registry_path: state_dir.join("workspaces.json"),
            state_dir,
        })
    }
}

fn state_dir() -> Result<PathBuf, LifecycleError> {
    if let Some(dir) = crate::env::state_dir_override() {
        return Ok(dir);
    }
    if let Ok(xdg) = std::env::var("XDG_STATE_HOME") {
        return Ok(PathBuf::from(xdg).join("vigil"));
    }
    dirs::home_dir()
        .map(|home| home.join(".local/state/vigil"))
        .ok_or(LifecycleError::NoStateDir)
}

/// The builtin checker set.
///
/// Checker implementations live outside this crate; embedders extend the
/// registry before handing it to [`Agent`]. The daemon binary starts with
/// an empty set and surfaces whatever load errors hosts record.
pub fn builtin_checkers() -> CheckerRegistry {
    CheckerRegistry::new()
}

/// Wire one workspace's agent.
pub fn build_agent(
    workspace: Arc<Workspace>,
    store: Arc<Store>,
    counter: Arc<EventCounter>,
    locks_dir: &Path,
) -> Arc<Agent> {
    let llm: Option<Arc<dyn LlmProvider>> = workspace
        .config
        .llm
        .as_ref()
        .map(|config| Arc::new(HttpLlmProvider::new(config)) as Arc<dyn LlmProvider>);

    Agent::new(
        workspace,
        Arc::new(builtin_checkers()),
        llm,
        store,
        counter,
        locks_dir,
    )
}

/// Everything `main` needs after startup.
pub struct StartupResult {
    pub state: AppState,
    /// Listen address from the primary workspace's server config.
    pub listen: String,
}

/// Open the store, load the primary workspace plus registered extras, and
/// assemble the app state.
///
/// A config error in the primary workspace fails startup; a config error in
/// an extra workspace is logged and that workspace is skipped.
pub fn startup(config_path: &Path, paths: &Paths) -> Result<StartupResult, LifecycleError> {
    std::fs::create_dir_all(&paths.state_dir)?;
    std::fs::create_dir_all(&paths.locks_dir)?;

    let store = Arc::new(Store::open(&paths.db_path)?);
    let counter = Arc::new(EventCounter::seeded(store.max_event_id()?));

    let primary = Arc::new(Workspace::load(config_path)?);
    let listen = primary.config.server.listen.clone();
    let default_workspace = primary.id.clone();
    tracing::info!(
        workspace = %primary.id,
        name = %primary.name,
        root = %primary.root.display(),
        "primary workspace loaded"
    );

    let mut agents: HashMap<_, _> = HashMap::new();
    let primary_agent = build_agent(
        Arc::clone(&primary),
        Arc::clone(&store),
        Arc::clone(&counter),
        &paths.locks_dir,
    );
    agents.insert(primary.id.clone(), primary_agent);

    let registry = WorkspaceRegistry::load(&paths.registry_path);
    for entry in registry.entries() {
        match Workspace::load(entry) {
            Ok(workspace) => {
                if agents.contains_key(&workspace.id) {
                    continue;
                }
                tracing::info!(
                    workspace = %workspace.id,
                    name = %workspace.name,
                    "registered workspace loaded"
                );
                let workspace = Arc::new(workspace);
                let agent = build_agent(
                    Arc::clone(&workspace),
                    Arc::clone(&store),
                    Arc::clone(&counter),
                    &paths.locks_dir,
                );
                agents.insert(workspace.id.clone(), agent);
            }
            Err(e) => {
                // One bad config must not take down the others
                tracing::warn!(
                    config = %entry.display(),
                    error = %e,
                    "skipping registered workspace"
                );
            }
        }
    }

    let state = AppState {
        inner: Arc::new(AppShared {
            default_workspace,
            agents: Mutex::new(agents),
            store,
            counter,
            locks_dir: paths.locks_dir.clone(),
            registry: Mutex::new(registry),
        }),
    };

    Ok(StartupResult { state, listen })
}

#[cfg(test)]
#[path = "lifecycle_tests.rs"]
mod tests;
