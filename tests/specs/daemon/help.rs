//! Daemon help and version specs
//!
//! Verify vigild --help, --version, and related flags work without
//! touching any state directory (no startup attempt).

use crate::prelude::*;
use std::process::Command;

fn vigild() -> Command {
    Command::new(vigild_binary())
}

#[test]
fn vigild_version_shows_version() {
    let output = vigild().arg("--version").output().unwrap();
    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(
        stdout.starts_with("vigild 0.1.0"),
        "expected version line, got: {stdout}"
    );
}

#[test]
fn vigild_short_version_flags_work() {
    for flag in ["-v", "-V"] {
        let output = vigild().arg(flag).output().unwrap();
        assert!(output.status.success());
        let stdout = String::from_utf8_lossy(&output.stdout);
        assert!(
            stdout.starts_with("vigild 0.1.0"),
            "expected version line for {flag}, got: {stdout}"
        );
    }
}

#[test]
fn vigild_help_shows_usage() {
    let output = vigild().arg("--help").output().unwrap();
    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(
        stdout.contains("USAGE:"),
        "expected USAGE section, got: {stdout}"
    );
    assert!(stdout.contains("--help"), "expected --help in output");
    assert!(stdout.contains("--version"), "expected --version in output");
    assert!(stdout.contains("vigil.toml"), "expected default config name");
}

#[test]
fn vigild_short_help_shows_usage() {
    let output = vigild().arg("-h").output().unwrap();
    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(
        stdout.contains("USAGE:"),
        "expected USAGE section, got: {stdout}"
    );
}

#[test]
fn vigild_rejects_unknown_flags() {
    let output = vigild().arg("--bogus").output().unwrap();
    assert!(!output.status.success());
    assert_eq!(output.status.code(), Some(2));
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(
        stderr.contains("unexpected argument"),
        "expected unexpected-argument error, got: {stderr}"
    );
}
