// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Ignore policy for raw file events.
//!
//! Merge semantics are ADD-only: user config patterns union with the
//! builtin sets, never replace them. Removing a builtin would reopen the
//! self-trigger loop (.db, .lock, __pycache__, ...), so it is intentionally
//! unsupported.

use super::mapping;
use std::collections::BTreeSet;
use std::path::Path;

/// Directories to always ignore, including the agent's own output dirs.
const IGNORE_DIRS: &[&str] = &[
    ".git",
    "__pycache__",
    ".venv",
    "venv",
    "env",
    "node_modules",
    ".tox",
    "dist",
    "build",
    ".eggs",
    ".mypy_cache",
    ".ruff_cache",
    ".pytest_cache",
    ".ipynb_checkpoints",
    "chroma_db",
    ".vigil",
];

/// Files to always ignore.
const IGNORE_FILES: &[&str] = &[".DS_Store", "Thumbs.db", ".gitkeep"];

/// Hidden files that are still interesting.
const HIDDEN_ALLOWLIST: &[&str] = &[".env", ".gitignore", ".flake8"];

/// Extensions the agent itself writes; watching them would re-trigger us.
const SELF_TRIGGER_EXTENSIONS: &[&str] = &[
    ".db", ".sqlite", ".sqlite3", ".lock", ".pid", ".log", ".pyc", ".pyo", ".swp", ".swo",
];

/// Decides which raw paths survive into the debounce batch.
pub struct PathFilter {
    ignore_dirs: BTreeSet<String>,
    ignore_extensions: BTreeSet<String>,
}

impl PathFilter {
    /// Build the filter, unioning user additions into the builtin sets.
    pub fn new(extra_patterns: &[String], extra_extensions: &[String]) -> Self {
        let mut ignore_dirs: BTreeSet<String> =
            IGNORE_DIRS.iter().map(|s| s.to_string()).collect();
        for pattern in extra_patterns {
            let clean = pattern.trim().trim_matches('*');
            if !clean.is_empty() {
                ignore_dirs.insert(clean.to_string());
            }
        }

        let mut ignore_extensions: BTreeSet<String> = SELF_TRIGGER_EXTENSIONS
            .iter()
            .map(|s| s.to_string())
            .collect();
        for ext in extra_extensions {
            let ext = ext.trim();
            if ext.is_empty() {
                continue;
            }
            if ext.starts_with('.') {
                ignore_extensions.insert(ext.to_lowercase());
            } else {
                ignore_extensions.insert(format!(".{}", ext.to_lowercase()));
            }
        }

        Self {
            ignore_dirs,
            ignore_extensions,
        }
    }

    /// Whether a raw event path should enter the pending batch.
    pub fn accepts(&self, path: &Path) -> bool {
        let Some(name) = path.file_name().and_then(|n| n.to_str()) else {
            return false;
        };

        if IGNORE_FILES.contains(&name) {
            return false;
        }

        for component in path.components() {
            if let Some(part) = component.as_os_str().to_str() {
                if self.ignore_dirs.contains(part) {
                    return false;
                }
            }
        }

        if name.starts_with('.') {
            return HIDDEN_ALLOWLIST.contains(&name);
        }

        let extension = mapping::extension_of(name);
        if self.ignore_extensions.contains(&extension) {
            return false;
        }

        // Unmapped extensions are noise; extensionless files stay in
        // (Makefile, Dockerfile, ...).
        if !extension.is_empty() && !mapping::is_known_extension(&extension) {
            return false;
        }

        true
    }
}

#[cfg(test)]
#[path = "filter_tests.rs"]
mod tests;
