// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;

fn config_file(dir: &tempfile::TempDir, name: &str) -> PathBuf {
    let path = dir.path().join("vigil.toml");
    std::fs::write(&path, format!("[project]\nname = \"{name}\"\n")).unwrap();
    path
}

#[test]
fn fingerprint_is_ten_hex_chars() {
    let dir = tempfile::tempdir().unwrap();
    let path = config_file(&dir, "demo");
    let id = WorkspaceId::fingerprint(&path);
    assert_eq!(id.as_str().len(), 10);
    assert!(id.as_str().chars().all(|c| c.is_ascii_hexdigit()));
}

#[test]
fn fingerprint_is_stable_across_spellings() {
    let dir = tempfile::tempdir().unwrap();
    let path = config_file(&dir, "demo");

    // A dotted respelling of the same file canonicalizes identically
    let dotted = dir.path().join(".").join("vigil.toml");
    assert_eq!(
        WorkspaceId::fingerprint(&path),
        WorkspaceId::fingerprint(&dotted)
    );
}

#[test]
fn distinct_paths_get_distinct_ids() {
    let a = tempfile::tempdir().unwrap();
    let b = tempfile::tempdir().unwrap();
    let id_a = WorkspaceId::fingerprint(&config_file(&a, "one"));
    let id_b = WorkspaceId::fingerprint(&config_file(&b, "two"));
    assert_ne!(id_a, id_b);
}

#[test]
fn workspace_load_resolves_root_and_checkers() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("vigil.toml");
    std::fs::write(
        &path,
        "[project]\nname = \"demo\"\nroot = \"app\"\nchlist = 1\nchecker_typo = 2\nchecklist = 3\n",
    )
    .unwrap();
    // Unknown top-level keys are tolerated
    let ws = Workspace::load(&path).unwrap();
    assert_eq!(ws.name, "demo");
    assert_eq!(ws.root, dir.path().join("app"));
    assert!(ws.checker_names().is_empty());
    assert!(!ws.has_checker("database"));
}

#[test]
fn workspace_load_surfaces_config_errors() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("vigil.toml");
    std::fs::write(&path, "not toml at all [[").unwrap();
    assert!(Workspace::load(&path).is_err());
}
