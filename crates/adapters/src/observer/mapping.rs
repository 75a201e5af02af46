// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Two-stage file-change -> checker mapping.
//!
//! Stage 1 maps extensions to checkers; stage 2 refines by path keyword.
//! The emitted set is the union across the whole debounce batch.

use std::collections::BTreeSet;
use vigil_core::event::FileChange;

/// Stage 1: extension -> checkers.
const EXTENSION_CHECKERS: &[(&str, &[&str])] = &[
    (
        ".py",
        &["code_quality", "security", "performance", "api_health", "dependency"],
    ),
    (".sql", &["database", "schema_migration"]),
    (".db", &["database", "schema_migration"]),
    (".sqlite", &["database", "schema_migration"]),
    (".yaml", &["config_drift", "environment"]),
    (".yml", &["config_drift"]),
    (".env", &["environment", "security"]),
    (".txt", &["dependency"]),
    (".toml", &["dependency"]),
    (".cfg", &["dependency"]),
    (".md", &["skill_template"]),
    (".json", &["config_drift"]),
    (".html", &["code_quality"]),
    (".js", &["code_quality"]),
    (".css", &["code_quality"]),
];

/// Stage 2: path keyword -> checkers (substring match, lowercased path).
const PATH_KEYWORD_CHECKERS: &[(&str, &[&str])] = &[
    ("test", &["test_coverage"]),
    ("tests", &["test_coverage"]),
    ("migration", &["schema_migration"]),
    ("migrations", &["schema_migration"]),
    ("alembic", &["schema_migration"]),
    ("skills", &["skill_template"]),
    ("rag", &["rag_pipeline"]),
    ("agent", &["agent_budget"]),
    ("whisper", &["whisper_health"]),
    ("ytdlp", &["ytdlp_pipeline"]),
    ("yt_dlp", &["ytdlp_pipeline"]),
    ("ontology", &["ontology_sync"]),
    ("knowledge", &["knowledge_graph"]),
    ("golden", &["golden_quality"]),
    ("citation", &["citation_integrity"]),
    ("search", &["search_index"]),
    ("url", &["url_pattern"]),
];

/// Extension of a file name, lowercased, with the leading dot.
///
/// Dotfiles with a single dot are their own extension (`.env` -> `.env`),
/// which is what lets the `.env` mapping fire. Names without a dot map to
/// the empty string.
pub fn extension_of(file_name: &str) -> String {
    match file_name.rfind('.') {
        Some(0) => file_name.to_lowercase(),
        Some(idx) => file_name[idx..].to_lowercase(),
        None => String::new(),
    }
}

/// Whether stage 1 knows this extension.
pub fn is_known_extension(extension: &str) -> bool {
    EXTENSION_CHECKERS.iter().any(|(ext, _)| *ext == extension)
}

fn extension_checkers(extension: &str) -> &'static [&'static str] {
    EXTENSION_CHECKERS
        .iter()
        .find(|(ext, _)| *ext == extension)
        .map(|(_, checkers)| *checkers)
        .unwrap_or(&[])
}

/// Union of affected checkers across a batch, sorted.
pub fn affected_checkers(changes: &[FileChange]) -> Vec<String> {
    let mut affected: BTreeSet<&str> = BTreeSet::new();

    for change in changes {
        for checker in extension_checkers(&change.extension) {
            affected.insert(checker);
        }
        let path_lower = change.relative_path.to_lowercase();
        for (keyword, checkers) in PATH_KEYWORD_CHECKERS {
            if path_lower.contains(keyword) {
                for checker in *checkers {
                    affected.insert(checker);
                }
            }
        }
    }

    affected.into_iter().map(String::from).collect()
}

#[cfg(test)]
#[path = "mapping_tests.rs"]
mod tests;
