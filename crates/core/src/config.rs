// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Workspace configuration (TOML)
//!
//! Every section tolerates partial files: unknown keys are ignored and
//! missing keys fall back to defaults, so a workspace config can be a
//! two-line `[project]` block.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Config load/parse errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    #[error("invalid config: {0}")]
    Invalid(String),
}

/// Project identity block
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProjectConfig {
    pub name: String,
    /// Project root, relative to the config file unless absolute.
    #[serde(default = "default_root")]
    pub root: PathBuf,
}

fn default_root() -> PathBuf {
    PathBuf::from(".")
}

/// Retention bounds for the durable store
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RetentionConfig {
    pub event_max_rows: u64,
    pub event_max_days: u64,
    pub analysis_max_days: u64,
}

impl Default for RetentionConfig {
    fn default() -> Self {
        Self {
            event_max_rows: 10_000,
            event_max_days: 7,
            analysis_max_days: 90,
        }
    }
}

/// Agent loop, observer, and reasoner tuning
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AgentConfig {
    pub enabled: bool,
    pub auto_start: bool,
    pub auto_scan_on_change: bool,
    pub auto_llm_on_critical: bool,
    pub debounce_seconds: f64,
    pub scan_cooldown_seconds: f64,
    pub manual_scan_min_interval: f64,
    /// Fraction of the workspace checker set above which a partial scan is
    /// promoted to a full scan.
    pub full_scan_ratio: f64,
    pub purge_interval_seconds: u64,
    pub singleton_max_age_seconds: u64,
    pub sse_replay_limit: usize,
    pub max_memory_events: usize,
    /// Subtrees of the workspace root to watch.
    pub watch_dirs: Vec<String>,
    /// Extra directory/file names to ignore (ADD-only; builtins stay).
    pub ignore_patterns: Vec<String>,
    /// Extra extensions to ignore (ADD-only; builtins stay).
    pub ignore_extensions: Vec<String>,
    pub retention: RetentionConfig,
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            auto_start: false,
            auto_scan_on_change: true,
            auto_llm_on_critical: false,
            debounce_seconds: 2.0,
            scan_cooldown_seconds: 30.0,
            manual_scan_min_interval: 2.0,
            full_scan_ratio: 0.6,
            purge_interval_seconds: 3600,
            singleton_max_age_seconds: 24 * 60 * 60,
            sse_replay_limit: 50,
            max_memory_events: 500,
            watch_dirs: vec![".".to_string()],
            ignore_patterns: Vec::new(),
            ignore_extensions: Vec::new(),
            retention: RetentionConfig::default(),
        }
    }
}

/// LLM tier configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LlmConfig {
    /// Catalog id as `provider/model`.
    pub model: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fallback_model: Option<String>,
    pub temperature: f64,
    pub max_tokens: u32,
    pub timeout_seconds: u64,
    pub daily_budget_usd: f64,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            model: "anthropic/claude-3-5-sonnet-20241022".to_string(),
            fallback_model: Some("anthropic/claude-3-5-haiku-20241022".to_string()),
            temperature: 0.2,
            max_tokens: 2048,
            timeout_seconds: 30,
            daily_budget_usd: 5.0,
        }
    }
}

/// HTTP listener configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub listen: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            listen: "127.0.0.1:7177".to_string(),
        }
    }
}

/// Full per-workspace configuration file
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkspaceConfig {
    pub project: ProjectConfig,
    /// Enabled checker names, in declaration order.
    #[serde(default)]
    pub checkers: Vec<String>,
    #[serde(default)]
    pub agent: AgentConfig,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub llm: Option<LlmConfig>,
    #[serde(default)]
    pub server: ServerConfig,
}

impl WorkspaceConfig {
    /// Parse a config file from disk.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let raw = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let config: Self = toml::from_str(&raw).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.project.name.trim().is_empty() {
            return Err(ConfigError::Invalid("project.name must not be empty".into()));
        }
        if !(0.0..=1.0).contains(&self.agent.full_scan_ratio) {
            return Err(ConfigError::Invalid(
                "agent.full_scan_ratio must be between 0 and 1".into(),
            ));
        }
        if self.agent.debounce_seconds < 0.0 {
            return Err(ConfigError::Invalid(
                "agent.debounce_seconds must not be negative".into(),
            ));
        }
        Ok(())
    }

    /// Resolve the project root against the config file's directory.
    pub fn resolved_root(&self, config_path: &Path) -> PathBuf {
        if self.project.root.is_absolute() {
            self.project.root.clone()
        } else {
            config_path
                .parent()
                .unwrap_or_else(|| Path::new("."))
                .join(&self.project.root)
        }
    }
}

#[cfg(test)]
#[path = "config_tests.rs"]
mod tests;
