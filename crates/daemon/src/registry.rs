// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Persisted registry of extra workspaces.
//!
//! The primary workspace comes from the CLI; anything added through the API
//! lands here so it survives a daemon restart. Saves are atomic
//! (temp file + rename).

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

#[derive(Debug, Default, Serialize, Deserialize)]
struct RegistryFile {
    workspaces: Vec<PathBuf>,
}

/// Extra-workspace config paths, persisted under the state dir.
pub struct WorkspaceRegistry {
    path: PathBuf,
    entries: Vec<PathBuf>,
}

impl WorkspaceRegistry {
    /// Load the registry; a missing or unreadable file is an empty registry.
    pub fn load(path: &Path) -> Self {
        let entries = std::fs::read_to_string(path)
            .ok()
            .and_then(|raw| serde_json::from_str::<RegistryFile>(&raw).ok())
            .map(|file| file.workspaces)
            .unwrap_or_default();
        Self {
            path: path.to_path_buf(),
            entries,
        }
    }

    pub fn entries(&self) -> &[PathBuf] {
        &self.entries
    }

    /// Add a config path; returns false when already present.
    pub fn add(&mut self, config_path: PathBuf) -> bool {
        if self.entries.contains(&config_path) {
            return false;
        }
        self.entries.push(config_path);
        true
    }

    pub fn remove(&mut self, config_path: &Path) -> bool {
        let before = self.entries.len();
        self.entries.retain(|entry| entry != config_path);
        self.entries.len() != before
    }

    /// Write the registry atomically.
    pub fn save(&self) -> std::io::Result<()> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let file = RegistryFile {
            workspaces: self.entries.clone(),
        };
        let raw = serde_json::to_string_pretty(&file).unwrap_or_default();
        let tmp = self.path.with_extension("json.tmp");
        std::fs::write(&tmp, raw)?;
        std::fs::rename(&tmp, &self.path)?;
        Ok(())
    }
}

#[cfg(test)]
#[path = "registry_tests.rs"]
mod tests;
