// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Agent state machine phases

use serde::{Deserialize, Serialize};

/// Lifecycle phase of a workspace agent.
///
/// The loop rests in `Observing` between events and cycles
/// `Observing -> Reasoning -> {Executing | WaitingLlm} -> Observing`
/// per dequeued event. `Error` is transient: the loop pauses briefly and
/// returns to `Observing`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AgentPhase {
    Idle,
    Observing,
    Reasoning,
    Executing,
    WaitingLlm,
    Error,
}

impl AgentPhase {
    pub fn as_str(&self) -> &'static str {
        match self {
            AgentPhase::Idle => "idle",
            AgentPhase::Observing => "observing",
            AgentPhase::Reasoning => "reasoning",
            AgentPhase::Executing => "executing",
            AgentPhase::WaitingLlm => "waiting_llm",
            AgentPhase::Error => "error",
        }
    }
}

impl std::fmt::Display for AgentPhase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
