// SPDX-License-Identifier: PMPL-1.0-or-later

//! Report formatting and output

use crate::report::output::ReportOutputFormat;
use crate::types::*;
use anyhow::{Context, Result};
use colored::*;
use std::fs;
use std::path::Path;

/// How many issues of one kind are listed before eliding the rest
const LIST_LIMIT: usize = 50;

pub struct ReportFormatter {
    quiet: bool,
}

impl ReportFormatter {
    pub fn new() -> Self {
        Self { quiet: false }
    }

    /// Summary and counts only, no per-issue listing.
    pub fn quiet() -> Self {
        Self { quiet: true }
    }

    pub fn print(&self, result: &AnalysisResult) {
        println!("\n{}", "=== NSGUARD ANALYSIS ===".bold().cyan());
        println!();

        self.print_statistics(&result.stats, &result.primary_locale);
        println!();

        if !self.quiet {
            self.print_issues(result);
            self.print_duplicates(&result.duplicate_groups);
        }
        self.print_errors(&result.errors);

        let total = result.stats.issues.total();
        if total == 0 {
            println!("{}", "No namespace issues found".green());
        } else {
            println!("  Total issues: {}", total.to_string().bold());
        }
        println!();
    }

    fn print_statistics(&self, stats: &Stats, primary: &str) {
        println!("{}", "CORPUS".bold().yellow());
        println!("  Primary locale: {}", primary);
        println!("  Locales: {}", stats.locales);
        println!("  Namespaces: {}", stats.namespaces);
        println!("  Primary keys: {}", stats.primary_keys);
        if stats.orphan_keys > 0 {
            println!("  Orphan keys: {}", stats.orphan_keys.to_string().yellow());
        }
        println!();

        println!("  Files scanned: {}", stats.files_scanned);
        println!("  Files with issues: {}", stats.files_with_issues);
        println!("  Bindings: {}", stats.bindings);
        println!(
            "  Calls: {} ({} resolved, {} unresolved)",
            stats.calls, stats.resolved_calls, stats.unresolved_calls
        );
        println!();

        println!("  Issues by kind:");
        for kind in IssueKind::all() {
            let count = stats.issues.get(kind);
            let shown = if count == 0 {
                count.to_string().green()
            } else {
                count.to_string().color(kind_color(kind))
            };
            println!("    {}: {}", kind, shown);
        }
    }

    fn print_issues(&self, result: &AnalysisResult) {
        for kind in [
            IssueKind::WrongNamespace,
            IssueKind::UndeclaredVariable,
            IssueKind::MissingKey,
        ] {
            let issues: Vec<&Issue> = result.issues_of(kind).collect();
            if issues.is_empty() {
                continue;
            }
            println!(
                "{}",
                kind.as_str().to_uppercase().replace('_', " ").bold().color(kind_color(kind))
            );
            for issue in issues.iter().take(LIST_LIMIT) {
                let fix = match (&issue.suggested_namespace, &issue.suggested_key) {
                    (Some(ns), Some(key)) => format!(" -> {}.{}", ns, key),
                    _ => String::new(),
                };
                println!(
                    "  {} {}:{}:{} {}(\"{}\"){}",
                    issue.id.dimmed(),
                    issue.file,
                    issue.line,
                    issue.column,
                    issue.accessor,
                    issue.key,
                    fix.green()
                );
                println!("      {}", issue.message.dimmed());
            }
            if issues.len() > LIST_LIMIT {
                println!("  ... and {} more", issues.len() - LIST_LIMIT);
            }
            println!();
        }
    }

    fn print_duplicates(&self, groups: &[DuplicateGroup]) {
        if groups.is_empty() {
            return;
        }
        println!("{}", "DUPLICATE VALUES".bold().blue());
        for group in groups.iter().take(LIST_LIMIT) {
            let members: Vec<String> = group.members.iter().map(|m| m.to_string()).collect();
            let note = if group.context_dependent {
                " (context dependent, kept)".yellow().to_string()
            } else {
                String::new()
            };
            println!(
                "  {} {:?} -> {}{}",
                group.id.dimmed(),
                group.value,
                group.target.to_string().green(),
                note
            );
            println!("      {}", members.join(", ").dimmed());
        }
        if groups.len() > LIST_LIMIT {
            println!("  ... and {} more", groups.len() - LIST_LIMIT);
        }
        println!();
    }

    fn print_errors(&self, errors: &[crate::error::FileError]) {
        if errors.is_empty() {
            return;
        }
        println!("{}", "ERRORS".bold().red());
        for err in errors {
            println!("  - {}", err.message.red());
        }
        println!();
    }

    pub fn print_apply(&self, result: &ApplyResult) {
        let title = if result.dry_run {
            "=== NSGUARD FIX (DRY RUN) ==="
        } else {
            "=== NSGUARD FIX ==="
        };
        println!("\n{}", title.bold().cyan());
        println!();
        println!("  Keys moved: {}", result.keys_moved);
        println!("  Keys deleted: {}", result.keys_deleted);
        println!("  Source files updated: {}", result.source_files_updated);
        println!("  Source calls fixed: {}", result.source_calls_fixed);
        println!();

        if !self.quiet && !result.changes.is_empty() {
            println!("{}", "CHANGES".bold().yellow());
            for change in &result.changes {
                println!("  - {}", describe_change(change));
            }
            println!();
        }

        if !result.skipped.is_empty() {
            println!("{}", "SKIPPED".bold().yellow());
            for skipped in &result.skipped {
                println!("  - {} {}", skipped.id.dimmed(), skipped.reason);
            }
            println!();
        }
        self.print_errors(&result.errors);
    }

    pub fn save<P: AsRef<Path>>(&self, result: &AnalysisResult, path: P, format: ReportOutputFormat) -> Result<()> {
        let body = format.serialize(result)?;
        fs::write(path.as_ref(), body)
            .with_context(|| format!("writing report {}", path.as_ref().display()))?;
        println!("Report saved to: {}", path.as_ref().display());
        Ok(())
    }
}

impl Default for ReportFormatter {
    fn default() -> Self {
        Self::new()
    }
}

fn kind_color(kind: IssueKind) -> &'static str {
    match kind {
        IssueKind::MissingKey => "red",
        IssueKind::WrongNamespace => "yellow",
        IssueKind::UndeclaredVariable => "magenta",
        IssueKind::DuplicateValue => "blue",
    }
}

pub fn describe_change(change: &Change) -> String {
    match change {
        Change::KeyMoved { from, to } => format!("moved {} -> {}", from, to),
        Change::KeyDeleted { location } => format!("deleted {}", location),
        Change::BindingAdded {
            file,
            line,
            name,
            namespace,
        } => format!("{}:{} added {} for {}", file, line, name, namespace),
        Change::BindingRemoved {
            file,
            line,
            name,
            namespace,
        } => format!("{}:{} removed {} ({})", file, line, name, namespace),
        Change::CallRewritten { file, line, from, to } => {
            format!("{}:{} {} -> {}", file, line, from, to)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::locale::KeyLocation;

    #[test]
    fn changes_read_as_one_line() {
        let moved = Change::KeyMoved {
            from: KeyLocation::new("ext_admin", "save_btn"),
            to: KeyLocation::new("common", "save"),
        };
        assert_eq!(describe_change(&moved), "moved ext_admin.save_btn -> common.save");
        let call = Change::CallRewritten {
            file: "src/a.tsx".to_string(),
            line: 4,
            from: "t(\"title\")".to_string(),
            to: "tCommon(\"title\")".to_string(),
        };
        assert_eq!(describe_change(&call), "src/a.tsx:4 t(\"title\") -> tCommon(\"title\")");
    }
}
