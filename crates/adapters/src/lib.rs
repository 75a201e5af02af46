// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! vigil-adapters: integrations with the outside world
//!
//! Two adapter families: the file observer (native FS notifications,
//! debounced and mapped onto checkers) and the LLM provider (HTTP clients
//! for the model catalog, with cost tracking).

pub mod env;
pub mod llm;
pub mod observer;

pub use llm::{
    AnalysisRequest, CostTracker, DailySummary, HttpLlmProvider, LlmError, LlmProvider,
};
pub use observer::{FileObserver, ObserverConfig, ObserverError};

#[cfg(any(test, feature = "test-support"))]
pub use llm::fake::FakeLlm;
