// SPDX-License-Identifier: PMPL-1.0-or-later

//! Duplicate-value consolidation
//!
//! Groups primary-locale entries sharing a normalized value across at
//! least two namespaces and picks the one location every member should
//! collapse into.

use crate::locale::namespace::common_ancestor;
use crate::locale::{normalize_value, KeyLocation, LocaleStore};
use crate::types::{stable_id, DuplicateGroup};
use std::collections::{BTreeSet, HashMap, HashSet};

/// Decides whether a duplicate group must be left alone because the same
/// words mean different things in different places.
pub trait ContextPolicy: Send + Sync {
    fn is_context_dependent(&self, normalized: &str, members: &[KeyLocation]) -> bool;
}

/// Never context dependent.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoContext;

impl ContextPolicy for NoContext {
    fn is_context_dependent(&self, _normalized: &str, _members: &[KeyLocation]) -> bool {
        false
    }
}

/// Context dependent when the normalized value is in a fixed word list.
#[derive(Debug, Clone, Default)]
pub struct ContextWords {
    words: HashSet<String>,
}

impl ContextWords {
    pub fn new<I, S>(words: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Self {
            words: words
                .into_iter()
                .map(|w| normalize_value(w.as_ref()))
                .filter(|w| !w.is_empty())
                .collect(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.words.is_empty()
    }
}

impl ContextPolicy for ContextWords {
    fn is_context_dependent(&self, normalized: &str, _members: &[KeyLocation]) -> bool {
        self.words.contains(normalized)
    }
}

/// Every duplicate group of the store's primary locale, ordered by
/// normalized value. No two consolidated groups share a target slot.
pub fn find_duplicate_groups(
    store: &LocaleStore,
    policy: &dyn ContextPolicy,
    fallback: &str,
) -> Vec<DuplicateGroup> {
    // target slot -> normalized value of the group that took it
    let mut claimed: HashMap<KeyLocation, String> = HashMap::new();
    let mut groups = Vec::new();
    for (normalized, members) in store.value_index().iter() {
        if distinct_namespaces(members) < 2 {
            continue;
        }
        let group = build_group(store, policy, fallback, normalized, members, &claimed);
        if !group.context_dependent {
            claimed.insert(group.target.clone(), normalized.clone());
        }
        groups.push(group);
    }
    groups
}

fn distinct_namespaces(members: &[KeyLocation]) -> usize {
    members
        .iter()
        .map(|m| m.namespace.as_str())
        .collect::<BTreeSet<_>>()
        .len()
}

fn build_group(
    store: &LocaleStore,
    policy: &dyn ContextPolicy,
    fallback: &str,
    normalized: &str,
    members: &[KeyLocation],
    claimed: &HashMap<KeyLocation, String>,
) -> DuplicateGroup {
    let namespaces: BTreeSet<&str> = members.iter().map(|m| m.namespace.as_str()).collect();
    let target_namespace = common_ancestor(
        namespaces.iter().copied(),
        |ns| store.namespace_exists(ns),
        fallback,
    );
    let target_key = pick_target_key(store, claimed, normalized, &target_namespace, members);
    let target = KeyLocation::new(target_namespace, target_key);

    let value = store
        .value(&target.namespace, &target.key)
        .or_else(|| members.first().and_then(|m| store.value(&m.namespace, &m.key)))
        .unwrap_or_default()
        .to_string();

    let mut sorted = members.to_vec();
    sorted.sort();
    DuplicateGroup {
        id: stable_id(&["duplicate_value", normalized]),
        normalized_value: normalized.to_string(),
        value,
        context_dependent: policy.is_context_dependent(normalized, &sorted),
        members: sorted,
        target,
    }
}

/// Key names ranked by frequency in the group, shorter first on ties.
pub fn rank_keys(members: &[KeyLocation]) -> Vec<String> {
    let mut counts: HashMap<&str, usize> = HashMap::new();
    for member in members {
        *counts.entry(member.key.as_str()).or_default() += 1;
    }
    let mut ranked: Vec<(&str, usize)> = counts.into_iter().collect();
    ranked.sort_by(|(ka, ca), (kb, cb)| {
        cb.cmp(ca)
            .then_with(|| ka.len().cmp(&kb.len()))
            .then_with(|| ka.cmp(kb))
    });
    ranked.into_iter().map(|(k, _)| k.to_string()).collect()
}

/// First ranked key whose slot in `namespace` is free or already holds this
/// value; then `<best>_2`, `<best>_3`, ... A slot taken by another group
/// counts as occupied.
fn pick_target_key(
    store: &LocaleStore,
    claimed: &HashMap<KeyLocation, String>,
    normalized: &str,
    namespace: &str,
    members: &[KeyLocation],
) -> String {
    let slot_ok = |key: &str| {
        let taken = claimed
            .get(&KeyLocation::new(namespace, key))
            .is_some_and(|owner| owner != normalized);
        !taken
            && match store.value(namespace, key) {
                None => true,
                Some(existing) => normalize_value(existing) == normalized,
            }
    };

    let ranked = rank_keys(members);
    if let Some(key) = ranked.iter().find(|k| slot_ok(k)) {
        return key.clone();
    }
    let base = ranked.first().map(String::as_str).unwrap_or("value");
    (2..)
        .map(|n| format!("{}_{}", base, n))
        .find(|k| slot_ok(k))
        .unwrap_or_else(|| base.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::locale::Locale;

    fn store(entries: &[(&str, &str, &str)]) -> LocaleStore {
        LocaleStore::from_locales(Locale::from_entries("en", entries.iter().copied()), Vec::new())
    }

    #[test]
    fn save_collapses_into_common() {
        let store = store(&[("common", "save", "Save"), ("ext_admin", "save_btn", "Save")]);
        let groups = find_duplicate_groups(&store, &NoContext, "common");
        assert_eq!(groups.len(), 1);
        let group = &groups[0];
        assert_eq!(group.target, KeyLocation::new("common", "save"));
        let sources: Vec<&KeyLocation> = group.sources().collect();
        assert_eq!(sources, vec![&KeyLocation::new("ext_admin", "save_btn")]);
        assert!(!group.context_dependent);
    }

    #[test]
    fn shared_root_picks_deepest_existing_prefix() {
        let store = store(&[
            ("ext_admin", "other", "x"),
            ("ext_admin_users", "delete", "Delete"),
            ("ext_admin_roles", "delete", "delete "),
        ]);
        let groups = find_duplicate_groups(&store, &NoContext, "common");
        assert_eq!(groups[0].target, KeyLocation::new("ext_admin", "delete"));
    }

    #[test]
    fn same_namespace_repeats_are_not_groups() {
        let store = store(&[("blog", "a", "Same"), ("blog", "b", "same")]);
        assert!(find_duplicate_groups(&store, &NoContext, "common").is_empty());
    }

    #[test]
    fn occupied_target_slot_moves_to_next_key() {
        let store = store(&[
            ("common", "ok", "Fine"),
            ("blog", "ok", "Okay"),
            ("shop", "ok", "Okay"),
        ]);
        let groups = find_duplicate_groups(&store, &NoContext, "common");
        let okay = groups.iter().find(|g| g.normalized_value == "okay").expect("group");
        assert_eq!(okay.target, KeyLocation::new("common", "ok_2"));
    }

    #[test]
    fn groups_never_share_a_target_slot() {
        let store = store(&[
            ("common", "x", "y"),
            ("blog", "label", "Open"),
            ("shop", "label", "Open"),
            ("news", "label", "Close"),
            ("forum", "label", "Close"),
        ]);
        let groups = find_duplicate_groups(&store, &NoContext, "common");
        let targets: Vec<(&str, String)> = groups
            .iter()
            .map(|g| (g.normalized_value.as_str(), g.target.to_string()))
            .collect();
        assert_eq!(
            targets,
            vec![
                ("close", "common.label".to_string()),
                ("open", "common.label_2".to_string()),
            ]
        );
    }

    #[test]
    fn key_ranking_prefers_frequency_then_length() {
        let members = vec![
            KeyLocation::new("a", "cancel_button"),
            KeyLocation::new("b", "cancel"),
            KeyLocation::new("c", "cancel_button"),
            KeyLocation::new("d", "abort"),
        ];
        assert_eq!(rank_keys(&members), vec!["cancel_button", "abort", "cancel"]);
    }

    #[test]
    fn word_list_marks_context_dependent_groups() {
        let store = store(&[("common", "name", "Name"), ("users", "name", "Name")]);
        let policy = ContextWords::new(["NAME"]);
        let groups = find_duplicate_groups(&store, &policy, "common");
        assert!(groups[0].context_dependent);
    }
}
