// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Centralized environment variable access for the daemon crate.

use std::path::PathBuf;
use std::time::Duration;

/// State directory override (tests use this for isolation).
pub fn state_dir_override() -> Option<PathBuf> {
    std::env::var("VIGIL_STATE_DIR").ok().map(PathBuf::from)
}

fn parse_duration_ms(var: &str) -> Option<Duration> {
    std::env::var(var)
        .ok()
        .and_then(|s| s.parse::<u64>().ok())
        .map(Duration::from_millis)
}

/// Worker dequeue timeout, which also paces periodic maintenance
/// (default: 500ms).
pub fn dequeue_timeout() -> Duration {
    parse_duration_ms("VIGIL_DEQUEUE_TIMEOUT_MS").unwrap_or(Duration::from_millis(500))
}

/// Worker join timeout on stop (default: 5000ms).
pub fn worker_join_timeout() -> Duration {
    parse_duration_ms("VIGIL_WORKER_JOIN_MS").unwrap_or(Duration::from_secs(5))
}

/// Pause after an unhandled loop error before resuming (default: 2000ms).
pub fn error_pause() -> Duration {
    parse_duration_ms("VIGIL_ERROR_PAUSE_MS").unwrap_or(Duration::from_secs(2))
}
