//! Daemon startup failure specs
//!
//! Startup errors must be readable and must not leave state behind.

use crate::prelude::*;
use serial_test::serial;
use std::process::Command;

#[test]
#[serial]
fn missing_config_fails_with_readable_error() {
    let state_dir = tempfile::tempdir().unwrap();
    let output = Command::new(vigild_binary())
        .arg("/nonexistent/vigil.toml")
        .env("VIGIL_STATE_DIR", state_dir.path())
        .output()
        .unwrap();

    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(
        stderr.contains("vigil.toml"),
        "error should name the config file, got: {stderr}"
    );

    // The failure was recorded in the daemon log for operators
    let log = std::fs::read_to_string(state_dir.path().join("vigild.log")).unwrap();
    assert!(log.contains("--- vigild: starting (pid:"));
    assert!(log.contains("ERROR failed to start daemon"));
}

#[test]
#[serial]
fn invalid_config_fails_startup() {
    let state_dir = tempfile::tempdir().unwrap();
    let project_dir = tempfile::tempdir().unwrap();
    let config = project_dir.path().join("vigil.toml");
    std::fs::write(&config, "[project]\nname = \"\"\n").unwrap();

    let output = Command::new(vigild_binary())
        .arg(&config)
        .env("VIGIL_STATE_DIR", state_dir.path())
        .output()
        .unwrap();

    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(
        stderr.contains("project.name"),
        "error should explain the invalid key, got: {stderr}"
    );
}
