// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use crate::test_support::StaticChecker;

fn registry_with(names: &[&str]) -> CheckerRegistry {
    let mut registry = CheckerRegistry::new();
    for name in names {
        registry.register(Arc::new(StaticChecker::passing(name)));
    }
    registry
}

#[test]
fn register_and_lookup() {
    let registry = registry_with(&["environment", "database"]);
    assert_eq!(registry.len(), 2);
    assert!(registry.contains("environment"));
    assert!(!registry.contains("security"));
    assert!(registry.get("database").is_some());
    assert_eq!(registry.names(), vec!["database", "environment"]);
}

#[test]
fn duplicate_registration_replaces_and_records_error() {
    let mut registry = registry_with(&["environment"]);
    registry.register(Arc::new(StaticChecker::failing("environment")));

    assert_eq!(registry.len(), 1);
    assert_eq!(registry.load_errors().len(), 1);
    assert_eq!(registry.load_errors()[0].file, "environment");
}

#[test]
fn load_errors_accumulate_without_aborting() {
    let mut registry = registry_with(&["environment"]);
    registry.record_load_error("plugins/broken.rs", "unresolved import");
    registry.record_load_error("plugins/empty.rs", "no checker exported");

    assert_eq!(registry.load_errors().len(), 2);
    assert_eq!(registry.len(), 1);
}

#[test]
fn filter_known_preserves_request_order() {
    let registry = registry_with(&["a", "b", "c"]);
    let requested = vec![
        "c".to_string(),
        "missing".to_string(),
        "a".to_string(),
    ];
    assert_eq!(registry.filter_known(&requested), vec!["c", "a"]);
}

#[test]
fn build_graph_includes_declared_dependencies() {
    let mut registry = CheckerRegistry::new();
    registry.register(Arc::new(StaticChecker::passing("search_index")));
    registry.register(Arc::new(
        StaticChecker::passing("rag_pipeline").with_depends_on(&["search_index"]),
    ));

    let graph = registry.build_graph();
    let order = graph.resolve_order(&["rag_pipeline".to_string()]);
    let index = |name: &str| order.iter().position(|n| n == name);
    assert!(index("search_index") < index("rag_pipeline"));

    // Builtin edges still present
    let order = graph.resolve_order(&["database".to_string()]);
    assert_eq!(order, vec!["environment", "database"]);
}
