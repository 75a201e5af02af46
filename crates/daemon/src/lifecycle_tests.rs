// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use serial_test::serial;

fn write_workspace(dir: &Path, name: &str) -> PathBuf {
    let config_path = dir.join(format!("{name}.toml"));
    std::fs::write(
        &config_path,
        format!("[project]\nname = \"{name}\"\nchecked = 1\n"),
    )
    .unwrap();
    config_path
}

#[test]
#[serial]
fn paths_honor_state_dir_override() {
    let dir = tempfile::tempdir().unwrap();
    std::env::set_var("VIGIL_STATE_DIR", dir.path());
    let paths = Paths::load().unwrap();
    std::env::remove_var("VIGIL_STATE_DIR");

    assert_eq!(paths.state_dir, dir.path());
    assert_eq!(paths.db_path, dir.path().join("vigil.db"));
    assert_eq!(paths.locks_dir, dir.path().join("locks"));
    assert_eq!(paths.registry_path, dir.path().join("workspaces.json"));
}

#[tokio::test]
#[serial]
async fn startup_loads_primary_and_registered_extras() {
    let state_dir = tempfile::tempdir().unwrap();
    let project_dir = tempfile::tempdir().unwrap();
    std::env::set_var("VIGIL_STATE_DIR", state_dir.path());

    let primary = write_workspace(project_dir.path(), "primary");
    let extra = write_workspace(project_dir.path(), "extra");
    let broken = project_dir.path().join("broken.toml");
    std::fs::write(&broken, "[[not toml").unwrap();

    let paths = Paths::load().unwrap();
    let mut registry = WorkspaceRegistry::load(&paths.registry_path);
    registry.add(extra.clone());
    registry.add(broken.clone());
    registry.save().unwrap();

    let result = startup(&primary, &paths).unwrap();
    std::env::remove_var("VIGIL_STATE_DIR");

    let agents = result.state.inner.agents.lock();
    // Primary + valid extra; the broken config was skipped, not fatal
    assert_eq!(agents.len(), 2);
    assert!(agents.contains_key(&result.state.inner.default_workspace));
    assert_eq!(result.listen, "127.0.0.1:7177");
}

#[tokio::test]
#[serial]
async fn startup_fails_on_broken_primary() {
    let state_dir = tempfile::tempdir().unwrap();
    let project_dir = tempfile::tempdir().unwrap();
    std::env::set_var("VIGIL_STATE_DIR", state_dir.path());

    let broken = project_dir.path().join("broken.toml");
    std::fs::write(&broken, "???").unwrap();

    let paths = Paths::load().unwrap();
    let err = startup(&broken, &paths).err().unwrap();
    std::env::remove_var("VIGIL_STATE_DIR");
    assert!(matches!(err, LifecycleError::Config(_)));
}

#[test]
fn build_agent_wires_llm_only_when_configured() {
    let dir = tempfile::tempdir().unwrap();
    let config_path = write_workspace(dir.path(), "demo");
    let workspace = Arc::new(Workspace::load(&config_path).unwrap());
    let store = Arc::new(Store::open_in_memory().unwrap());
    let counter = Arc::new(EventCounter::seeded(0));

    let agent = build_agent(workspace, store, counter, dir.path());
    assert!(agent.llm().is_none());
    assert!(!agent.status().llm_available);
}
