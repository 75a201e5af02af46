// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Workspace identity and loading

use crate::config::{ConfigError, WorkspaceConfig};
use crate::define_id;
use sha2::{Digest, Sha256};
use std::path::{Path, PathBuf};

define_id! {
    /// Stable 10-hex workspace fingerprint derived from the canonical
    /// config path.
    pub struct WorkspaceId;
}

impl WorkspaceId {
    /// Fingerprint a workspace by its config path.
    ///
    /// The path is canonicalized first so symlinked and relative spellings
    /// of the same config map to the same workspace.
    pub fn fingerprint(config_path: &Path) -> Self {
        let canonical = std::fs::canonicalize(config_path)
            .unwrap_or_else(|_| config_path.to_path_buf());
        let digest = Sha256::digest(canonical.to_string_lossy().as_bytes());
        let hex: String = digest.iter().map(|b| format!("{b:02x}")).collect();
        Self(hex[..10].to_string())
    }
}

/// A configured project: identity, root, config, and enabled checkers.
#[derive(Debug, Clone)]
pub struct Workspace {
    pub id: WorkspaceId,
    pub name: String,
    pub root: PathBuf,
    pub config_path: PathBuf,
    pub config: WorkspaceConfig,
}

impl Workspace {
    /// Load a workspace from its config file.
    pub fn load(config_path: &Path) -> Result<Self, ConfigError> {
        let config = WorkspaceConfig::load(config_path)?;
        let id = WorkspaceId::fingerprint(config_path);
        let root = config.resolved_root(config_path);
        Ok(Self {
            id,
            name: config.project.name.clone(),
            root,
            config_path: config_path.to_path_buf(),
            config,
        })
    }

    /// Enabled checker names in declaration order.
    pub fn checker_names(&self) -> &[String] {
        &self.config.checkers
    }

    pub fn has_checker(&self, name: &str) -> bool {
        self.config.checkers.iter().any(|c| c == name)
    }
}

#[cfg(test)]
#[path = "workspace_tests.rs"]
mod tests;
