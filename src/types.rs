// SPDX-License-Identifier: PMPL-1.0-or-later

//! Core type definitions for nsguard
//!
//! Issues and duplicate groups are produced per analysis run and never
//! persisted by the engine itself; they carry stable ids so a saved report
//! can drive a later fix run.

use crate::error::FileError;
use crate::locale::KeyLocation;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IssueKind {
    /// Key exists, but not in the namespace the governing binding names
    WrongNamespace,
    /// Key exists in no namespace at all
    MissingKey,
    /// Call has no governing binding
    UndeclaredVariable,
    /// Same normalized value stored under several namespaces
    DuplicateValue,
}

impl IssueKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            IssueKind::WrongNamespace => "wrong_namespace",
            IssueKind::MissingKey => "missing_key",
            IssueKind::UndeclaredVariable => "undeclared_variable",
            IssueKind::DuplicateValue => "duplicate_value",
        }
    }

    pub fn all() -> [IssueKind; 4] {
        [
            IssueKind::WrongNamespace,
            IssueKind::MissingKey,
            IssueKind::UndeclaredVariable,
            IssueKind::DuplicateValue,
        ]
    }
}

impl fmt::Display for IssueKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Issue {
    pub id: String,
    pub kind: IssueKind,
    /// Path relative to the scanned source root, `/`-separated
    pub file: String,
    pub line: usize,
    pub column: usize,
    pub offset: usize,
    pub accessor: String,
    pub key: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub current_namespace: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub suggested_namespace: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub suggested_key: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub candidates: Vec<String>,
    pub fixable: bool,
    pub message: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DuplicateGroup {
    pub id: String,
    pub normalized_value: String,
    /// Primary-locale value of the target entry
    pub value: String,
    pub members: Vec<KeyLocation>,
    pub target: KeyLocation,
    /// Excluded from consolidation by the context-dependence policy
    pub context_dependent: bool,
}

impl DuplicateGroup {
    /// Members that will be deleted once their value lives at the target.
    pub fn sources(&self) -> impl Iterator<Item = &KeyLocation> {
        self.members.iter().filter(move |m| **m != self.target)
    }

    pub fn namespace_count(&self) -> usize {
        let mut namespaces: Vec<&str> = self.members.iter().map(|m| m.namespace.as_str()).collect();
        namespaces.sort_unstable();
        namespaces.dedup();
        namespaces.len()
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct IssueCounts {
    pub wrong_namespace: usize,
    pub missing_key: usize,
    pub undeclared_variable: usize,
    pub duplicate_value: usize,
}

impl IssueCounts {
    pub fn record(&mut self, kind: IssueKind) {
        *self.slot(kind) += 1;
    }

    pub fn get(&self, kind: IssueKind) -> usize {
        match kind {
            IssueKind::WrongNamespace => self.wrong_namespace,
            IssueKind::MissingKey => self.missing_key,
            IssueKind::UndeclaredVariable => self.undeclared_variable,
            IssueKind::DuplicateValue => self.duplicate_value,
        }
    }

    pub fn total(&self) -> usize {
        IssueKind::all().iter().map(|k| self.get(*k)).sum()
    }

    fn slot(&mut self, kind: IssueKind) -> &mut usize {
        match kind {
            IssueKind::WrongNamespace => &mut self.wrong_namespace,
            IssueKind::MissingKey => &mut self.missing_key,
            IssueKind::UndeclaredVariable => &mut self.undeclared_variable,
            IssueKind::DuplicateValue => &mut self.duplicate_value,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Stats {
    pub files_scanned: usize,
    pub files_with_issues: usize,
    pub bindings: usize,
    pub calls: usize,
    pub resolved_calls: usize,
    pub unresolved_calls: usize,
    pub issues: IssueCounts,
    pub duplicate_groups: usize,
    pub locales: usize,
    pub namespaces: usize,
    pub primary_keys: usize,
    pub orphan_keys: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisResult {
    pub created_at: String,
    pub primary_locale: String,
    pub source_roots: Vec<PathBuf>,
    pub issues: Vec<Issue>,
    pub duplicate_groups: Vec<DuplicateGroup>,
    pub stats: Stats,
    #[serde(default)]
    pub errors: Vec<FileError>,
}

impl AnalysisResult {
    pub fn issue(&self, id: &str) -> Option<&Issue> {
        self.issues.iter().find(|i| i.id == id)
    }

    pub fn duplicate_group(&self, id: &str) -> Option<&DuplicateGroup> {
        self.duplicate_groups.iter().find(|g| g.id == id)
    }

    pub fn issues_of(&self, kind: IssueKind) -> impl Iterator<Item = &Issue> {
        self.issues.iter().filter(move |i| i.kind == kind)
    }

    /// Every id that `apply_fixes` would act on.
    pub fn fixable_ids(&self) -> Vec<String> {
        self.issues
            .iter()
            .filter(|i| i.fixable)
            .map(|i| i.id.clone())
            .chain(
                self.duplicate_groups
                    .iter()
                    .filter(|g| !g.context_dependent)
                    .map(|g| g.id.clone()),
            )
            .collect()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Change {
    KeyMoved {
        from: KeyLocation,
        to: KeyLocation,
    },
    KeyDeleted {
        location: KeyLocation,
    },
    BindingAdded {
        file: String,
        line: usize,
        name: String,
        namespace: String,
    },
    BindingRemoved {
        file: String,
        line: usize,
        name: String,
        namespace: String,
    },
    CallRewritten {
        file: String,
        line: usize,
        from: String,
        to: String,
    },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SkippedFix {
    pub id: String,
    pub reason: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ApplyResult {
    pub dry_run: bool,
    pub keys_moved: usize,
    pub keys_deleted: usize,
    pub source_files_updated: usize,
    pub source_calls_fixed: usize,
    pub changes: Vec<Change>,
    pub skipped: Vec<SkippedFix>,
    pub errors: Vec<FileError>,
}

/// Stable 16-hex-char id from identifying fields.
pub fn stable_id(parts: &[&str]) -> String {
    let mut hasher = blake3::Hasher::new();
    for part in parts {
        hasher.update(part.as_bytes());
        hasher.update(&[0]);
    }
    hex::encode(&hasher.finalize().as_bytes()[..8])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stable_ids_depend_on_every_part() {
        let a = stable_id(&["wrong_namespace", "a.tsx", "10", "title"]);
        assert_eq!(a, stable_id(&["wrong_namespace", "a.tsx", "10", "title"]));
        assert_ne!(a, stable_id(&["wrong_namespace", "a.tsx", "11", "title"]));
        assert_ne!(stable_id(&["ab", "c"]), stable_id(&["a", "bc"]));
        assert_eq!(a.len(), 16);
    }

    #[test]
    fn counts_track_each_kind() {
        let mut counts = IssueCounts::default();
        counts.record(IssueKind::MissingKey);
        counts.record(IssueKind::MissingKey);
        counts.record(IssueKind::DuplicateValue);
        assert_eq!(counts.get(IssueKind::MissingKey), 2);
        assert_eq!(counts.total(), 3);
    }
}
