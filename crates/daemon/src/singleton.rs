// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Per-workspace singleton lock.
//!
//! Prevents two agent instances from binding the same workspace on one host
//! (multi-worker servers, hot reload). The lock file holds
//! `PID:unix_seconds:workspace_id`; acquisition follows a decision table
//! that reclaims dead-PID and aged-out locks. A dead PID always wins over
//! the TTL: the TTL only matters when the PID *appears* alive but has
//! likely been recycled by the OS.

use nix::sys::signal::kill;
use nix::unistd::Pid;
use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime, UNIX_EPOCH};
use vigil_core::workspace::WorkspaceId;

/// File-based singleton lock for one workspace.
pub struct SingletonLock {
    lock_file: PathBuf,
    workspace_id: WorkspaceId,
    max_age: Duration,
    acquired: bool,
}

impl SingletonLock {
    pub fn new(lock_dir: &Path, workspace_id: WorkspaceId, max_age: Duration) -> Self {
        let lock_file = lock_dir.join(format!("agent_{workspace_id}.lock"));
        Self {
            lock_file,
            workspace_id,
            max_age,
            acquired: false,
        }
    }

    pub fn is_acquired(&self) -> bool {
        self.acquired
    }

    pub fn lock_path(&self) -> &Path {
        &self.lock_file
    }

    /// Try to acquire the lock. Returns true on success.
    pub fn acquire(&mut self) -> bool {
        if let Some(parent) = self.lock_file.parent() {
            let _ = std::fs::create_dir_all(parent);
        }

        if self.lock_file.exists() {
            match parse_lock_content(&std::fs::read_to_string(&self.lock_file).unwrap_or_default())
            {
                Some((pid, locked_at)) => {
                    let age = lock_age(locked_at);

                    if !pid_alive(pid) {
                        // Case 1: holder crashed or was killed
                        tracing::info!(pid, workspace = %self.workspace_id, "stale lock (PID dead), reclaiming");
                        let _ = std::fs::remove_file(&self.lock_file);
                    } else if age > self.max_age {
                        // Case 2: PID likely recycled to an unrelated process
                        tracing::warn!(
                            pid,
                            age_secs = age.as_secs(),
                            workspace = %self.workspace_id,
                            "lock aged out (PID likely recycled), reclaiming"
                        );
                        let _ = std::fs::remove_file(&self.lock_file);
                    } else {
                        // Case 3: genuine live holder
                        tracing::warn!(
                            pid,
                            age_secs = age.as_secs(),
                            workspace = %self.workspace_id,
                            "agent already running for workspace"
                        );
                        return false;
                    }
                }
                None => {
                    tracing::warn!(workspace = %self.workspace_id, "malformed lock file, overwriting");
                    let _ = std::fs::remove_file(&self.lock_file);
                }
            }
        }

        let content = format!(
            "{}:{}:{}",
            std::process::id(),
            unix_now().as_secs(),
            self.workspace_id
        );
        match std::fs::write(&self.lock_file, content) {
            Ok(()) => {
                self.acquired = true;
                tracing::info!(
                    pid = std::process::id(),
                    workspace = %self.workspace_id,
                    "agent lock acquired"
                );
                true
            }
            Err(e) => {
                tracing::error!(error = %e, "failed to write lock file");
                false
            }
        }
    }

    /// Release the lock if this process owns it.
    pub fn release(&mut self) {
        if self.acquired && self.lock_file.exists() {
            let ours = format!("{}:", std::process::id());
            let owned = std::fs::read_to_string(&self.lock_file)
                .map(|content| content.starts_with(&ours))
                .unwrap_or(false);
            if owned {
                let _ = std::fs::remove_file(&self.lock_file);
                tracing::info!(workspace = %self.workspace_id, "agent lock released");
            }
        }
        self.acquired = false;
    }
}

impl Drop for SingletonLock {
    fn drop(&mut self) {
        self.release();
    }
}

fn parse_lock_content(content: &str) -> Option<(i32, u64)> {
    let mut parts = content.trim().split(':');
    let pid = parts.next()?.parse::<i32>().ok()?;
    let locked_at = parts.next()?.parse::<f64>().ok()? as u64;
    Some((pid, locked_at))
}

fn unix_now() -> Duration {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
}

fn lock_age(locked_at: u64) -> Duration {
    unix_now().saturating_sub(Duration::from_secs(locked_at))
}

fn pid_alive(pid: i32) -> bool {
    // Signal 0 probes existence without sending anything
    kill(Pid::from_raw(pid), None).is_ok()
}

#[cfg(test)]
#[path = "singleton_tests.rs"]
mod tests;
