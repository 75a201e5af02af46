// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Centralized environment variable access for the adapters crate.

use std::time::Duration;

fn parse_duration_ms(var: &str) -> Option<Duration> {
    std::env::var(var)
        .ok()
        .and_then(|s| s.parse::<u64>().ok())
        .map(Duration::from_millis)
}

/// Override for the observer debounce window (tests use a short one).
pub fn debounce_override() -> Option<Duration> {
    parse_duration_ms("VIGIL_DEBOUNCE_MS")
}

/// Observer shutdown join timeout (default: 3000ms).
pub fn observer_join_ms() -> Duration {
    parse_duration_ms("VIGIL_OBSERVER_JOIN_MS").unwrap_or(Duration::from_secs(3))
}
