// SPDX-License-Identifier: PMPL-1.0-or-later

//! Fix planner
//!
//! Turns a selection of issue and duplicate-group ids into locale moves and
//! call retarget rules, and from those into per-file edit lists.

pub mod batch;
pub mod duplicates;

pub use batch::{plan_file, FileFix};
pub use duplicates::{find_duplicate_groups, rank_keys, ContextPolicy, ContextWords, NoContext};

use crate::locale::{normalize_value, KeyLocation, LocaleStore};
use crate::scope::CallSite;
use crate::types::{AnalysisResult, DuplicateGroup, IssueKind, SkippedFix};
use std::collections::{BTreeMap, HashMap, HashSet};
use tracing::{debug, warn};

/// Selector that picks every fixable issue and group.
pub const SELECT_ALL: &str = "all";

/// Which calls of one file a retarget rule applies to.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum CallSelector {
    /// Calls resolved to a binding of `namespace`
    Bound { namespace: String, key: String },
    /// Calls with no binding, through accessor `accessor`
    Unbound { accessor: String, key: String },
}

/// A locale-store move, `from` deleted once its value is at `to`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyMove {
    pub from: KeyLocation,
    pub to: KeyLocation,
}

#[derive(Debug, Clone, Default)]
pub struct FixPlan {
    /// Distinct by source
    pub moves: Vec<KeyMove>,
    /// Corpus-wide rules from consolidated duplicates
    pub global_rules: HashMap<KeyLocation, KeyLocation>,
    /// Per-file rules from selected issues, keyed by report path
    pub file_rules: HashMap<String, HashMap<CallSelector, KeyLocation>>,
    pub skipped: Vec<SkippedFix>,
    /// Number of ids that produced a rule or move
    pub accepted: usize,
}

impl FixPlan {
    /// `store` is the corpus the plan will be applied to. A group whose
    /// target holds a different value there, or was already taken by another
    /// selected group, is skipped rather than merged into it.
    pub fn from_selection(selected: &[String], analysis: &AnalysisResult, store: &LocaleStore) -> Self {
        let ids = expand_selection(selected, analysis);
        let mut plan = FixPlan::default();
        let mut moves: BTreeMap<KeyLocation, KeyLocation> = BTreeMap::new();
        let mut claimed: HashMap<&KeyLocation, &str> = HashMap::new();

        // Groups first so issue targets can be chained through them.
        for id in &ids {
            let Some(group) = analysis.duplicate_group(id) else {
                continue;
            };
            if group.context_dependent {
                plan.skip(id, "context-dependent value is not consolidated");
                continue;
            }
            if let Some(reason) = target_conflict(group, &claimed, store) {
                plan.skip(id, reason);
                continue;
            }
            claimed.insert(&group.target, &group.normalized_value);
            for source in group.sources() {
                moves.entry(source.clone()).or_insert_with(|| group.target.clone());
            }
            plan.accepted += 1;
        }
        plan.global_rules = moves.iter().map(|(f, t)| (f.clone(), t.clone())).collect();
        plan.moves = moves
            .into_iter()
            .map(|(from, to)| KeyMove { from, to })
            .collect();

        for id in &ids {
            if analysis.duplicate_group(id).is_some() {
                continue;
            }
            let Some(issue) = analysis.issue(id) else {
                plan.skip(id, "unknown id");
                continue;
            };
            if issue.kind == IssueKind::MissingKey {
                plan.skip(id, "missing key needs a value before it can be fixed");
                continue;
            }
            let (Some(namespace), Some(key), true) = (
                issue.suggested_namespace.as_ref(),
                issue.suggested_key.as_ref(),
                issue.fixable,
            ) else {
                plan.skip(id, "issue has no applicable fix");
                continue;
            };

            let selector = match &issue.current_namespace {
                Some(current) => CallSelector::Bound {
                    namespace: current.clone(),
                    key: issue.key.clone(),
                },
                None => CallSelector::Unbound {
                    accessor: issue.accessor.clone(),
                    key: issue.key.clone(),
                },
            };
            let target = KeyLocation::new(namespace.as_str(), key.as_str());
            let target = plan.global_rules.get(&target).cloned().unwrap_or(target);
            plan.file_rules
                .entry(issue.file.clone())
                .or_default()
                .insert(selector, target);
            plan.accepted += 1;
        }

        debug!(
            accepted = plan.accepted,
            moves = plan.moves.len(),
            skipped = plan.skipped.len(),
            "fix plan built"
        );
        plan
    }

    pub fn is_empty(&self) -> bool {
        self.moves.is_empty() && self.file_rules.is_empty()
    }

    /// Whether `file` can need edits under this plan.
    pub fn touches(&self, file: &str) -> bool {
        !self.global_rules.is_empty() || self.file_rules.contains_key(file)
    }

    /// New location for a call, if the plan moves it. `bound` is the
    /// namespace of the call's binding.
    pub fn target_for(&self, file: &str, call: &CallSite, bound: Option<&str>) -> Option<KeyLocation> {
        let selector = match bound {
            Some(namespace) => CallSelector::Bound {
                namespace: namespace.to_string(),
                key: call.key.clone(),
            },
            None => CallSelector::Unbound {
                accessor: call.accessor.clone(),
                key: call.key.clone(),
            },
        };
        if let Some(target) = self.file_rules.get(file).and_then(|rules| rules.get(&selector)) {
            return Some(target.clone());
        }
        let namespace = bound?;
        self.global_rules
            .get(&KeyLocation::new(namespace, call.key.as_str()))
            .cloned()
    }

    fn skip(&mut self, id: &str, reason: &str) {
        warn!(id, reason, "fix skipped");
        self.skipped.push(SkippedFix {
            id: id.to_string(),
            reason: reason.to_string(),
        });
    }
}

fn target_conflict(
    group: &DuplicateGroup,
    claimed: &HashMap<&KeyLocation, &str>,
    store: &LocaleStore,
) -> Option<&'static str> {
    if claimed
        .get(&group.target)
        .is_some_and(|owner| *owner != group.normalized_value)
    {
        return Some("target slot already taken by another consolidated value");
    }
    let held = store.value(&group.target.namespace, &group.target.key)?;
    if normalize_value(held) != group.normalized_value {
        return Some("target slot holds a different value");
    }
    None
}

fn expand_selection(selected: &[String], analysis: &AnalysisResult) -> Vec<String> {
    let mut seen = HashSet::new();
    let mut ids = Vec::new();
    for id in selected {
        let batch = if id == SELECT_ALL {
            analysis.fixable_ids()
        } else {
            vec![id.clone()]
        };
        for id in batch {
            if seen.insert(id.clone()) {
                ids.push(id);
            }
        }
    }
    ids
}
