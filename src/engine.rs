// SPDX-License-Identifier: PMPL-1.0-or-later

//! Engine: corpus walk plus the `analyze` / `apply_fixes` surface
//!
//! File scans are independent and run on the rayon pool. Fix application
//! computes every file's edit list first, then writes files one at a time
//! and finally moves locale keys and saves the store.

use crate::config::Config;
use crate::detect::detect_file;
use crate::error::{FileError, NsError};
use crate::locale::LocaleStore;
use crate::plan::{find_duplicate_groups, plan_file, ContextPolicy, ContextWords, FileFix, FixPlan};
use crate::rewrite::{apply_moves, rewrite_file};
use crate::scope::{read_source, FileScan, SourceText};
use crate::types::{AnalysisResult, ApplyResult, Issue, IssueCounts, IssueKind, Stats};
use anyhow::Result;
use rayon::prelude::*;
use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};
use walkdir::WalkDir;

/// One source file found under a source root.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceFile {
    pub path: PathBuf,
    /// Path shown in reports: relative to the root's parent, `/`-separated
    pub display: String,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ApplyOptions {
    pub dry_run: bool,
}

pub struct Engine {
    config: Config,
    store: LocaleStore,
    policy: Box<dyn ContextPolicy>,
}

impl Engine {
    /// Load the locale store named by `config`. A missing primary locale
    /// is the one fatal error.
    pub fn open(config: Config) -> Result<Self> {
        let store = LocaleStore::load(&config.locales_dir, &config.primary_locale)?;
        Ok(Self::with_store(config, store))
    }

    pub fn with_store(config: Config, store: LocaleStore) -> Self {
        let policy = Box::new(ContextWords::new(&config.context_dependent_values));
        Self {
            config,
            store,
            policy,
        }
    }

    /// Replace the duplicate context-dependence predicate.
    pub fn with_policy(mut self, policy: Box<dyn ContextPolicy>) -> Self {
        self.policy = policy;
        self
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn store(&self) -> &LocaleStore {
        &self.store
    }

    pub fn store_mut(&mut self) -> &mut LocaleStore {
        &mut self.store
    }

    pub fn source_files(&self) -> Vec<SourceFile> {
        collect_source_files(&self.config)
    }

    pub fn analyze(&self) -> Result<AnalysisResult> {
        let files = self.source_files();
        info!(files = files.len(), "scanning sources");

        let scans: Vec<Result<FileReport, NsError>> = if self.config.parallel {
            files.par_iter().map(|f| self.analyze_file(f)).collect()
        } else {
            files.iter().map(|f| self.analyze_file(f)).collect()
        };

        let mut stats = Stats::default();
        let mut issues: Vec<Issue> = Vec::new();
        let mut errors: Vec<FileError> = self.store.load_errors().to_vec();
        for scan in scans {
            match scan {
                Ok(report) => {
                    stats.files_scanned += 1;
                    stats.bindings += report.bindings;
                    stats.calls += report.calls;
                    stats.resolved_calls += report.resolved;
                    stats.unresolved_calls += report.calls - report.resolved;
                    if !report.issues.is_empty() {
                        stats.files_with_issues += 1;
                    }
                    issues.extend(report.issues);
                }
                Err(err) => {
                    warn!(error = %err, "source file skipped");
                    errors.push(FileError::from(&err));
                }
            }
        }
        issues.sort_by(|a, b| a.file.cmp(&b.file).then(a.offset.cmp(&b.offset)));

        let duplicate_groups = find_duplicate_groups(
            &self.store,
            self.policy.as_ref(),
            &self.config.fallback_namespace,
        );

        let mut counts = IssueCounts::default();
        for issue in &issues {
            counts.record(issue.kind);
        }
        for _ in &duplicate_groups {
            counts.record(IssueKind::DuplicateValue);
        }
        stats.issues = counts;
        stats.duplicate_groups = duplicate_groups.len();
        stats.locales = self.store.locales().len();
        stats.namespaces = self.store.namespace_count();
        stats.primary_keys = self.store.key_count();
        stats.orphan_keys = self.store.orphan_keys().len();

        info!(
            files = stats.files_scanned,
            issues = issues.len(),
            duplicates = duplicate_groups.len(),
            errors = errors.len(),
            "analysis finished"
        );

        Ok(AnalysisResult {
            created_at: chrono::Utc::now().to_rfc3339(),
            primary_locale: self.config.primary_locale.clone(),
            source_roots: self.config.source_roots.clone(),
            issues,
            duplicate_groups,
            stats,
            errors,
        })
    }

    pub fn apply_fixes(&mut self, selected: &[String], analysis: &AnalysisResult) -> Result<ApplyResult> {
        self.apply_fixes_with(selected, analysis, ApplyOptions::default())
    }

    pub fn apply_fixes_with(
        &mut self,
        selected: &[String],
        analysis: &AnalysisResult,
        options: ApplyOptions,
    ) -> Result<ApplyResult> {
        let plan = FixPlan::from_selection(selected, analysis, &self.store);
        let mut result = ApplyResult {
            dry_run: options.dry_run,
            skipped: plan.skipped.clone(),
            ..ApplyResult::default()
        };
        if plan.is_empty() {
            info!("nothing to apply");
            return Ok(result);
        }

        let files: Vec<SourceFile> = self
            .source_files()
            .into_iter()
            .filter(|f| plan.touches(&f.display))
            .collect();

        // Every edit list is computed before anything is written.
        let planned: Vec<Result<PlannedFile, NsError>> = if self.config.parallel {
            files.par_iter().map(|f| self.plan_source(f, &plan)).collect()
        } else {
            files.iter().map(|f| self.plan_source(f, &plan)).collect()
        };

        for planned in planned {
            let planned = match planned {
                Ok(p) if p.fix.is_empty() => continue,
                Ok(p) => p,
                Err(err) => {
                    warn!(error = %err, "file not planned");
                    result.errors.push(FileError::from(&err));
                    continue;
                }
            };
            match rewrite_file(&planned.file.path, &planned.source, &planned.fix.edits, options.dry_run) {
                Ok(outcome) => {
                    for skipped in &outcome.skipped {
                        let err = NsError::TextMismatch {
                            path: planned.file.path.clone(),
                            offset: skipped.offset,
                            expected: skipped.expected.clone(),
                        };
                        result.errors.push(FileError::from(&err));
                    }
                    if outcome.changed {
                        result.source_files_updated += 1;
                        result.source_calls_fixed += planned.fix.calls_fixed;
                        result.changes.extend(planned.fix.changes);
                    }
                }
                Err(err) => {
                    warn!(error = %err, "file not rewritten");
                    result.errors.push(FileError::from(&err));
                }
            }
        }

        let moves = apply_moves(&mut self.store, &plan.moves, options.dry_run);
        result.keys_moved = moves.keys_moved;
        result.keys_deleted = moves.keys_deleted;
        result.changes.extend(moves.changes);
        if !options.dry_run && !plan.moves.is_empty() {
            if let Err(err) = self.store.save() {
                warn!(error = %err, "locale store not saved");
                match err.downcast_ref::<NsError>() {
                    Some(ns) => result.errors.push(FileError::from(ns)),
                    None => result.errors.push(FileError::new(
                        self.config.locales_dir.clone(),
                        crate::error::ErrorKind::FileWrite,
                        err.to_string(),
                    )),
                }
            }
        }

        info!(
            files = result.source_files_updated,
            calls = result.source_calls_fixed,
            moved = result.keys_moved,
            deleted = result.keys_deleted,
            dry_run = options.dry_run,
            "fixes applied"
        );
        Ok(result)
    }

    fn analyze_file(&self, file: &SourceFile) -> Result<FileReport, NsError> {
        let source = load(&file.path)?;
        let scan = FileScan::scan(&source.text, |f| self.config.is_binding_function(f));
        if scan.is_empty() {
            return Ok(FileReport::default());
        }
        let issues = detect_file(&file.display, &scan, &self.store, &self.config.fallback_namespace);
        let resolved = scan.calls.iter().filter(|c| c.binding.is_some()).count();
        debug!(
            file = %file.display,
            bindings = scan.bindings.len(),
            calls = scan.calls.len(),
            issues = issues.len(),
            "scanned"
        );
        Ok(FileReport {
            issues,
            bindings: scan.bindings.len(),
            calls: scan.calls.len(),
            resolved,
        })
    }

    fn plan_source(&self, file: &SourceFile, plan: &FixPlan) -> Result<PlannedFile, NsError> {
        let source = load(&file.path)?;
        let scan = FileScan::scan(&source.text, |f| self.config.is_binding_function(f));
        let fix = plan_file(&file.display, &source.text, &scan, plan, &self.config);
        Ok(PlannedFile {
            file: file.clone(),
            source,
            fix,
        })
    }
}

#[derive(Debug, Default)]
struct FileReport {
    issues: Vec<Issue>,
    bindings: usize,
    calls: usize,
    resolved: usize,
}

struct PlannedFile {
    file: SourceFile,
    source: SourceText,
    fix: FileFix,
}

fn load(path: &Path) -> Result<SourceText, NsError> {
    read_source(path).map_err(|err| match err.downcast::<NsError>() {
        Ok(ns) => ns,
        Err(other) => NsError::FileRead {
            path: path.to_path_buf(),
            reason: other.to_string(),
        },
    })
}

/// Every source file under the configured roots, sorted, ignoring the
/// configured directories.
pub fn collect_source_files(config: &Config) -> Vec<SourceFile> {
    let mut seen = BTreeSet::new();
    let mut files = Vec::new();
    for root in &config.source_roots {
        if !root.exists() {
            warn!(root = %root.display(), "source root does not exist");
            continue;
        }
        let base = root.parent().unwrap_or(root);
        let walker = WalkDir::new(root)
            .sort_by_file_name()
            .into_iter()
            .filter_entry(|entry| {
                entry.depth() == 0
                    || !entry.file_type().is_dir()
                    || !config.is_ignored_dir(&entry.file_name().to_string_lossy())
            });
        for entry in walker.filter_map(|e| e.ok()) {
            let path = entry.path();
            if !entry.file_type().is_file() || !config.wants_extension(path) {
                continue;
            }
            if !seen.insert(path.to_path_buf()) {
                continue;
            }
            let relative = path.strip_prefix(base).unwrap_or(path);
            let display = relative
                .components()
                .map(|c| c.as_os_str().to_string_lossy())
                .collect::<Vec<_>>()
                .join("/");
            files.push(SourceFile {
                path: path.to_path_buf(),
                display,
            });
        }
    }
    files
}
