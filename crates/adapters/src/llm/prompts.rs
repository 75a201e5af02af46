// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Prompt construction and response parsing.
//!
//! Prompts are deterministic for a given report + context so that repeated
//! analyses of the same diagnostic state are comparable. Responses are
//! parsed by section headers into structured root causes and fixes.

use vigil_core::check::{CheckStatus, PhaseReport};

const MAX_DETAILS_CHARS: usize = 1500;

/// Build the deep-analysis prompt for one checker report.
pub fn build_analysis_prompt(
    project_name: &str,
    checker_name: &str,
    report: &PhaseReport,
    evidence_context: Option<&str>,
) -> String {
    let failing: Vec<_> = report
        .results
        .iter()
        .filter(|c| matches!(c.status, CheckStatus::Fail | CheckStatus::Warn))
        .collect();

    let mut prompt = format!(
        "You are a software diagnostics expert. Analyze the \"{checker_name}\" checker \
         results for the project \"{project_name}\".\n\n\
         ## Report Summary\n\
         - Total checks: {}\n\
         - Passed: {}\n\
         - Failed/warned: {}\n\
         - Health: {:.1}%\n\n\
         ## Failing Checks\n",
        report.results.len(),
        report.pass_count(),
        failing.len(),
        report.health_pct(),
    );

    for check in &failing {
        prompt.push_str(&format!(
            "\n### {} [{}]\nMessage: {}\n",
            check.name,
            check.status.as_str(),
            check.message
        ));
        if !check.details.is_empty() {
            let mut details = serde_json::to_string_pretty(&check.details).unwrap_or_default();
            if details.len() > MAX_DETAILS_CHARS {
                details.truncate(MAX_DETAILS_CHARS);
                details.push_str("\n... (truncated)");
            }
            prompt.push_str(&format!("Evidence:\n```json\n{details}\n```\n"));
        }
        if let Some(fix) = &check.fix_desc {
            prompt.push_str(&format!("Auto-fix available: {fix}\n"));
        }
    }

    if let Some(context) = evidence_context {
        if !context.is_empty() {
            prompt.push_str("\n## Recent Activity\n");
            prompt.push_str(context);
            prompt.push('\n');
        }
    }

    prompt.push_str(&format!(
        "\n## Environment\n- OS: {} {}\n",
        std::env::consts::OS,
        std::env::consts::ARCH
    ));

    prompt.push_str(
        "\n## Instructions\n\
         1. Identify the root cause, not the symptom.\n\
         2. Judge whether the failures are correlated.\n\
         3. Propose fixes in order of impact.\n\
         4. Call out risks of each fix.\n\
         5. Reference the concrete files and lines from the evidence.\n\n\
         ## Response Format (follow exactly)\n\
         ### Root Causes\n\
         - [cause, with evidence reference]\n\n\
         ### Fix Plan\n\
         1. [highest-impact fix, concrete action]\n\n\
         ### Risks\n\
         - [caveat]\n\n\
         ### Summary\n\
         [one paragraph]\n",
    );

    prompt
}

/// Build the whole-scan narrative prompt.
pub fn build_report_prompt(project_name: &str, scan_summary: &str) -> String {
    format!(
        "You are a software diagnostics expert. Write a comprehensive health \
         report for the project \"{project_name}\" from this scan summary.\n\n\
         {scan_summary}\n\n\
         Cover: overall health, per-checker analysis of every issue, \
         correlations between issues, prioritized remediation steps, and \
         which findings can be auto-fixed safely.\n\n\
         ## Response Format (follow exactly)\n\
         ### Root Causes\n### Fix Plan\n### Risks\n### Summary\n"
    )
}

/// Structured sections parsed out of a model response.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ParsedAnalysis {
    pub root_causes: Vec<String>,
    pub fix_suggestions: Vec<String>,
    pub risks: Vec<String>,
}

/// Parse a response by its section headers.
pub fn parse_analysis_response(text: &str) -> ParsedAnalysis {
    #[derive(PartialEq)]
    enum Section {
        None,
        RootCauses,
        FixPlan,
        Risks,
        Summary,
    }

    let mut parsed = ParsedAnalysis::default();
    let mut section = Section::None;

    for line in text.lines() {
        let stripped = line.trim();
        let lower = stripped.to_lowercase();

        if stripped.starts_with('#') {
            section = if lower.contains("root cause") {
                Section::RootCauses
            } else if lower.contains("fix plan") {
                Section::FixPlan
            } else if lower.contains("risk") {
                Section::Risks
            } else if lower.contains("summary") {
                Section::Summary
            } else {
                Section::None
            };
            continue;
        }

        let bullet = stripped
            .trim_start_matches(['-', '*'])
            .trim_start_matches(|c: char| c.is_ascii_digit() || c == '.' || c == ')')
            .trim();
        if bullet.is_empty() {
            continue;
        }
        let is_item = stripped.starts_with('-')
            || stripped.starts_with('*')
            || stripped.starts_with(|c: char| c.is_ascii_digit());

        match section {
            Section::RootCauses if is_item => parsed.root_causes.push(bullet.to_string()),
            Section::FixPlan if is_item => parsed.fix_suggestions.push(bullet.to_string()),
            Section::Risks if is_item => parsed.risks.push(bullet.to_string()),
            _ => {}
        }
    }

    parsed
}

#[cfg(test)]
#[path = "prompts_tests.rs"]
mod tests;
