// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Secret redaction and report fingerprinting.
//!
//! The report hash identifies diagnostic state, not content: timing fields
//! are stripped and secrets are redacted before hashing, so two reports that
//! differ only in duration or in a secret's value fingerprint identically.
//! Collisions induced by redaction are acceptable.

use regex::Regex;
use serde_json::Value;
use sha2::{Digest, Sha256};
use std::sync::OnceLock;
use vigil_core::check::PhaseReport;

const REDACTED: &str = "[REDACTED]";

/// Fields that never participate in the fingerprint.
const TIMING_KEYS: &[&str] = &["duration_ms", "timestamp", "scan_timestamp"];

fn compile(pattern: &str) -> Regex {
    // Patterns are compile-time constants, exercised by the tests below
    #[allow(clippy::unwrap_used)]
    let re = Regex::new(pattern).unwrap();
    re
}

fn secret_key_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        compile(
            r"(?i)^(api[_-]?key|secret[_-]?key|auth[_-]?token|access[_-]?key|private[_-]?key|credentials?|token|password|passwd|secret)$",
        )
    })
}

fn secret_value_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    // A run of 8+ non-delimiter characters adjoining a secret key
    RE.get_or_init(|| compile(r#"[^\s:=,;"']{8,}"#))
}

fn token_prefix_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    // Known token shapes redacted regardless of surrounding key
    RE.get_or_init(|| {
        compile(
            r"(sk-[A-Za-z0-9_\-]{8,}|AIza[A-Za-z0-9_\-]{10,}|Bearer\s+[A-Za-z0-9._\-=]+|gh[po]_[A-Za-z0-9]{16,}|xox[bp]-[A-Za-z0-9\-]+)",
        )
    })
}

/// Redact secrets in-place throughout a JSON value.
///
/// Two layers: key-based (values adjoining common secret key names) and
/// prefix-based (known token shapes anywhere in any string).
pub fn redact_value(value: &mut Value) {
    match value {
        Value::Object(map) => {
            for (key, child) in map.iter_mut() {
                if secret_key_re().is_match(key) {
                    if let Value::String(s) = child {
                        if secret_value_re().is_match(s) {
                            *child = Value::String(REDACTED.to_string());
                            continue;
                        }
                    }
                }
                redact_value(child);
            }
        }
        Value::Array(items) => {
            for item in items {
                redact_value(item);
            }
        }
        Value::String(s) => {
            if token_prefix_re().is_match(s) {
                *s = token_prefix_re().replace_all(s, REDACTED).into_owned();
            }
        }
        _ => {}
    }
}

/// Strip timing fields in-place so fingerprints ignore them.
fn strip_timing(value: &mut Value) {
    match value {
        Value::Object(map) => {
            for key in TIMING_KEYS {
                map.remove(*key);
            }
            for child in map.values_mut() {
                strip_timing(child);
            }
        }
        Value::Array(items) => {
            for item in items {
                strip_timing(item);
            }
        }
        _ => {}
    }
}

/// Serialize a value with recursively sorted object keys.
///
/// Not dependent on serde_json's map ordering, which flips with the
/// `preserve_order` feature that another dependency may enable.
fn canonical_json(value: &Value, out: &mut String) {
    match value {
        Value::Object(map) => {
            let mut keys: Vec<&String> = map.keys().collect();
            keys.sort();
            out.push('{');
            for (i, key) in keys.iter().enumerate() {
                if i > 0 {
                    out.push(',');
                }
                out.push_str(&Value::String((*key).clone()).to_string());
                out.push(':');
                if let Some(child) = map.get(*key) {
                    canonical_json(child, out);
                }
            }
            out.push('}');
        }
        Value::Array(items) => {
            out.push('[');
            for (i, item) in items.iter().enumerate() {
                if i > 0 {
                    out.push(',');
                }
                canonical_json(item, out);
            }
            out.push(']');
        }
        other => out.push_str(&other.to_string()),
    }
}

/// Short fingerprint of a report's diagnostic state.
///
/// 16 hex chars of SHA-256 over the canonical JSON encoding, after timing
/// strip and secret redaction.
pub fn report_hash(report: &PhaseReport) -> String {
    let mut value = serde_json::to_value(report).unwrap_or(Value::Null);
    strip_timing(&mut value);
    redact_value(&mut value);

    let mut canonical = String::new();
    canonical_json(&value, &mut canonical);

    let digest = Sha256::digest(canonical.as_bytes());
    digest
        .iter()
        .take(8)
        .map(|b| format!("{b:02x}"))
        .collect()
}

#[cfg(test)]
#[path = "redact_tests.rs"]
mod tests;
