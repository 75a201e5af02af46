// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! LLM provider abstraction.
//!
//! The provider is pluggable over a catalog of `provider/model` ids. The
//! HTTP implementation speaks each vendor's chat API directly; tests use
//! [`fake::FakeLlm`]. Budget enforcement lives here too: every analyze call
//! goes through the provider's cost tracker before any network I/O.

pub mod catalog;
pub mod cost;
pub mod http;
pub mod prompts;

#[cfg(any(test, feature = "test-support"))]
pub mod fake;

pub use cost::{CostTracker, DailySummary};
pub use http::HttpLlmProvider;

use async_trait::async_trait;
use thiserror::Error;
use vigil_core::check::PhaseReport;
use vigil_core::config::LlmConfig;
use vigil_core::LlmAnalysis;

/// Provider-level errors
#[derive(Debug, Error)]
pub enum LlmError {
    #[error("unknown model: {0}")]
    UnknownModel(String),

    #[error("missing API key: set {env_key} for {model}")]
    MissingApiKey { model: String, env_key: String },

    #[error("request to {model} failed: {message}")]
    Request { model: String, message: String },

    #[error("{model} returned {status}: {message}")]
    Api {
        model: String,
        status: u16,
        message: String,
    },

    #[error("unparseable response from {model}: {message}")]
    BadResponse { model: String, message: String },
}

/// One analyze call: the report plus everything the prompt needs.
#[derive(Debug, Clone)]
pub struct AnalysisRequest {
    pub project_name: String,
    pub checker_name: String,
    pub report: PhaseReport,
    pub config: LlmConfig,
    /// Pre-rendered evidence block (recent changes, regression diff, counts).
    pub evidence_context: Option<String>,
}

/// Deep-analysis provider over the model catalog.
#[async_trait]
pub trait LlmProvider: Send + Sync {
    /// Analyze one checker report. Falls back to the configured secondary
    /// model once on any primary error; the second error surfaces.
    async fn analyze_report(&self, request: AnalysisRequest) -> Result<LlmAnalysis, LlmError>;

    /// Narrate a whole scan summary for humans.
    async fn generate_report(
        &self,
        project_name: &str,
        scan_summary: &str,
        config: &LlmConfig,
    ) -> Result<String, LlmError>;

    /// Whether the provider can serve requests at all.
    fn is_available(&self) -> bool;

    /// Today's spend and remaining budget.
    fn daily_summary(&self) -> DailySummary;
}
