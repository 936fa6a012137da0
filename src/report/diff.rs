// SPDX-License-Identifier: PMPL-1.0-or-later

//! Diff utilities for analysis reports.

use crate::types::*;
use anyhow::{Context, Result};
use serde_json;
use serde_yaml;
use std::collections::BTreeSet;
use std::fs;
use std::path::Path;

pub fn load_report(path: &Path) -> Result<AnalysisResult> {
    let content =
        fs::read_to_string(path).with_context(|| format!("reading report {}", path.display()))?;
    match path.extension().and_then(|ext| ext.to_str()) {
        Some("yaml") | Some("yml") => serde_yaml::from_str(&content)
            .with_context(|| format!("parsing yaml report {}", path.display())),
        _ => serde_json::from_str(&content)
            .with_context(|| format!("parsing json report {}", path.display())),
    }
}

pub fn format_diff(
    base: &AnalysisResult,
    compare: &AnalysisResult,
    base_label: &str,
    compare_label: &str,
) -> String {
    let mut lines = Vec::new();
    lines.push("=== NSGUARD REPORT DIFF ===".to_string());
    lines.push(format!("Base: {}", base_label));
    lines.push(format!("Compare: {}", compare_label));
    lines.push(String::new());

    let base_total = base.stats.issues.total();
    let cmp_total = compare.stats.issues.total();
    lines.push(format!(
        "Total issues: {} -> {} ({})",
        base_total,
        cmp_total,
        fmt_delta_i64(cmp_total as i64 - base_total as i64)
    ));
    for kind in IssueKind::all() {
        let base_count = base.stats.issues.get(kind);
        let cmp_count = compare.stats.issues.get(kind);
        if base_count > 0 || cmp_count > 0 {
            lines.push(format!(
                "  {}: {} -> {} ({})",
                kind,
                base_count,
                cmp_count,
                fmt_delta_i64(cmp_count as i64 - base_count as i64)
            ));
        }
    }
    lines.push(format!(
        "Files with issues: {} -> {}",
        base.stats.files_with_issues, compare.stats.files_with_issues
    ));
    lines.push(format!(
        "Primary keys: {} -> {} ({})",
        base.stats.primary_keys,
        compare.stats.primary_keys,
        fmt_delta_i64(compare.stats.primary_keys as i64 - base.stats.primary_keys as i64)
    ));

    lines.push(String::new());
    lines.extend(format_id_changes(base, compare));
    lines.join("\n")
}

fn format_id_changes(base: &AnalysisResult, compare: &AnalysisResult) -> Vec<String> {
    let mut lines = Vec::new();
    let base_ids = entry_ids(base);
    let cmp_ids = entry_ids(compare);

    let introduced: Vec<&String> = cmp_ids.difference(&base_ids).collect();
    let resolved: Vec<&String> = base_ids.difference(&cmp_ids).collect();

    lines.push(format!("Introduced: {}", introduced.len()));
    for id in &introduced {
        lines.push(format!("  + {}", describe(compare, id)));
    }
    lines.push(format!("Resolved: {}", resolved.len()));
    for id in &resolved {
        lines.push(format!("  - {}", describe(base, id)));
    }
    lines
}

fn entry_ids(result: &AnalysisResult) -> BTreeSet<String> {
    result
        .issues
        .iter()
        .map(|i| i.id.clone())
        .chain(result.duplicate_groups.iter().map(|g| g.id.clone()))
        .collect()
}

fn describe(result: &AnalysisResult, id: &str) -> String {
    if let Some(issue) = result.issue(id) {
        return format!(
            "{} {} {}:{} {}(\"{}\")",
            id, issue.kind, issue.file, issue.line, issue.accessor, issue.key
        );
    }
    if let Some(group) = result.duplicate_group(id) {
        return format!("{} duplicate_value {:?} x{}", id, group.value, group.members.len());
    }
    id.to_string()
}

fn fmt_delta_i64(delta: i64) -> String {
    if delta > 0 {
        format!("+{}", delta)
    } else {
        delta.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn result(ids: &[&str]) -> AnalysisResult {
        let mut stats = Stats::default();
        let issues: Vec<Issue> = ids
            .iter()
            .map(|id| {
                stats.issues.record(IssueKind::MissingKey);
                Issue {
                    id: id.to_string(),
                    kind: IssueKind::MissingKey,
                    file: "a.tsx".to_string(),
                    line: 1,
                    column: 1,
                    offset: 0,
                    accessor: "t".to_string(),
                    key: "k".to_string(),
                    current_namespace: Some("blog".to_string()),
                    suggested_namespace: None,
                    suggested_key: None,
                    candidates: Vec::new(),
                    fixable: false,
                    message: String::new(),
                }
            })
            .collect();
        AnalysisResult {
            created_at: String::new(),
            primary_locale: "en".to_string(),
            source_roots: Vec::new(),
            issues,
            duplicate_groups: Vec::new(),
            stats,
            errors: Vec::new(),
        }
    }

    #[test]
    fn diff_lists_introduced_and_resolved_ids() {
        let out = format_diff(&result(&["aa", "bb"]), &result(&["bb", "cc"]), "old", "new");
        assert!(out.contains("Total issues: 2 -> 2 (0)"));
        assert!(out.contains("Introduced: 1\n  + cc missing_key"));
        assert!(out.contains("Resolved: 1\n  - aa missing_key"));
    }
}
