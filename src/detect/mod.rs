// SPDX-License-Identifier: PMPL-1.0-or-later

//! Issue detector
//!
//! Classifies every call of one scanned file against the locale store:
//! resolved calls whose key is absent from the bound namespace become
//! `wrong_namespace` or `missing_key`, unresolved calls whose key exists
//! somewhere become `undeclared_variable`.

use crate::error::NsError;
use crate::locale::LocaleStore;
use crate::scope::{FileScan, ResolvedCall, ROOT};
use crate::types::{stable_id, Issue, IssueKind};
use tracing::debug;

/// Pick one namespace out of `candidates`.
///
/// Order of preference: a namespace already bound in the file, the fallback
/// namespace, the shortest name, then alphabetical.
pub fn select_namespace(candidates: &[String], bound_in_file: &[&str], fallback: &str) -> Option<String> {
    let bound: Vec<&String> = candidates
        .iter()
        .filter(|c| bound_in_file.contains(&c.as_str()))
        .collect();
    let pool: Vec<&String> = if bound.is_empty() {
        candidates.iter().collect()
    } else {
        bound
    };

    if let Some(hit) = pool.iter().find(|c| c.as_str() == fallback) {
        return Some((*hit).clone());
    }
    pool.into_iter()
        .min_by(|a, b| a.len().cmp(&b.len()).then_with(|| a.cmp(b)))
        .cloned()
}

/// Detect issues in one file. `file` is the report path of the source.
pub fn detect_file(file: &str, scan: &FileScan, store: &LocaleStore, fallback: &str) -> Vec<Issue> {
    let bound = scan.bound_namespaces();
    let mut issues = Vec::new();

    for resolved in &scan.calls {
        let issue = match scan.resolved_binding(resolved) {
            Some(binding) => check_resolved(file, resolved, &binding.namespace, store, &bound, fallback),
            None => check_unresolved(file, scan, resolved, store, &bound, fallback),
        };
        if let Some(issue) = issue {
            debug!(file, line = issue.line, kind = %issue.kind, key = %issue.key, "issue");
            issues.push(issue);
        }
    }
    issues
}

fn check_resolved(
    file: &str,
    resolved: &ResolvedCall,
    namespace: &str,
    store: &LocaleStore,
    bound: &[&str],
    fallback: &str,
) -> Option<Issue> {
    let call = &resolved.call;
    if store.has_key(namespace, &call.key) {
        return None;
    }
    if store.is_opaque_namespace(namespace) {
        // Nested namespaces are outside the key index; nothing to judge.
        return None;
    }

    if let Some((prefix, rest)) = call.key.split_once('.') {
        if store.has_key(prefix, rest) {
            let message = format!(
                "key `{}` embeds namespace `{}`; use `{}` from `{}`",
                call.key, prefix, rest, prefix
            );
            return Some(build_issue(
                IssueKind::WrongNamespace,
                file,
                resolved,
                Some(namespace),
                Some((prefix.to_string(), rest.to_string())),
                vec![prefix.to_string()],
                true,
                message,
            ));
        }
    }

    let candidates = store.find_namespaces_containing(&call.key);
    match select_namespace(&candidates, bound, fallback) {
        None => Some(build_issue(
            IssueKind::MissingKey,
            file,
            resolved,
            Some(namespace),
            None,
            Vec::new(),
            false,
            format!("key `{}` exists in no namespace", call.key),
        )),
        Some(target) => {
            let message = format!(
                "`{}` is bound to `{}` but key `{}` lives in `{}`",
                call.accessor, namespace, call.key, target
            );
            Some(build_issue(
                IssueKind::WrongNamespace,
                file,
                resolved,
                Some(namespace),
                Some((target, call.key.clone())),
                candidates,
                true,
                message,
            ))
        }
    }
}

fn check_unresolved(
    file: &str,
    scan: &FileScan,
    resolved: &ResolvedCall,
    store: &LocaleStore,
    bound: &[&str],
    fallback: &str,
) -> Option<Issue> {
    let call = &resolved.call;
    let (candidates, key) = {
        let direct = store.find_namespaces_containing(&call.key);
        if !direct.is_empty() {
            (direct, call.key.clone())
        } else {
            match call.key.split_once('.') {
                Some((prefix, rest)) if store.has_key(prefix, rest) => {
                    (vec![prefix.to_string()], rest.to_string())
                }
                _ => {
                    debug!(file, line = call.line, key = %call.key, "unbound call with unknown key dropped");
                    return None;
                }
            }
        }
    };
    let target = select_namespace(&candidates, bound, fallback)?;

    let is_param = scan
        .tree
        .ancestors(call.scope)
        .any(|s| scan.tree.get(s).has_param(&call.accessor));
    let is_local = scan.declares_local(&call.accessor, call.scope);
    let no_body = scan.tree.function_of(call.scope) == ROOT && scan.in_concise_arrow(call);
    let shadowed_elsewhere = scan.bindings.iter().any(|b| b.name == call.accessor);

    let mut message = format!(
        "`{}` has no binding here; key `{}` exists in `{}`",
        call.accessor,
        key,
        candidates.join("`, `")
    );
    let note = if is_param {
        Some(" (accessor is a function parameter)")
    } else if is_local {
        Some(" (accessor is declared here by something other than a namespace binding)")
    } else if no_body {
        Some(" (call is in an arrow function without a block body)")
    } else if shadowed_elsewhere {
        Some(" (bound only in an unrelated scope)")
    } else {
        None
    };
    if let Some(note) = note {
        let ambiguity = NsError::UnresolvableAmbiguity {
            path: file.into(),
            accessor: call.accessor.clone(),
            line: call.line,
        };
        debug!(error = %ambiguity, "scope not determined with confidence");
        message.push_str(note);
    }
    let fixable = !(is_param || is_local || no_body);

    Some(build_issue(
        IssueKind::UndeclaredVariable,
        file,
        resolved,
        None,
        Some((target, key)),
        candidates,
        fixable,
        message,
    ))
}

#[allow(clippy::too_many_arguments)]
fn build_issue(
    kind: IssueKind,
    file: &str,
    resolved: &ResolvedCall,
    current: Option<&str>,
    suggestion: Option<(String, String)>,
    candidates: Vec<String>,
    fixable: bool,
    message: String,
) -> Issue {
    let call = &resolved.call;
    let offset = call.start.to_string();
    let id = stable_id(&[
        kind.as_str(),
        file,
        &offset,
        &call.key,
        current.unwrap_or(&call.accessor),
    ]);
    let (suggested_namespace, suggested_key) = match suggestion {
        Some((ns, key)) => (Some(ns), Some(key)),
        None => (None, None),
    };
    Issue {
        id,
        kind,
        file: file.to_string(),
        line: call.line,
        column: call.column,
        offset: call.start,
        accessor: call.accessor.clone(),
        key: call.key.clone(),
        current_namespace: current.map(str::to_string),
        suggested_namespace,
        suggested_key,
        candidates,
        fixable,
        message,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::locale::Locale;

    fn store() -> LocaleStore {
        LocaleStore::from_locales(
            Locale::from_entries(
                "en",
                [
                    ("common", "title", "Title"),
                    ("common", "save", "Save"),
                    ("blog", "heading", "Blog"),
                    ("ext_admin", "save", "Save it"),
                    ("ext_admin_users", "title", "Users"),
                ],
            ),
            Vec::new(),
        )
    }

    fn detect(src: &str) -> Vec<Issue> {
        let scan = FileScan::scan(src, |f| f == "useTranslations");
        detect_file("page.tsx", &scan, &store(), "common")
    }

    fn names(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn selection_prefers_bound_then_fallback_then_shortest() {
        let candidates = names(&["ext_admin", "common", "blog"]);
        assert_eq!(select_namespace(&candidates, &["blog"], "common").as_deref(), Some("blog"));
        assert_eq!(select_namespace(&candidates, &[], "common").as_deref(), Some("common"));
        let candidates = names(&["ext_admin", "zed", "abc"]);
        assert_eq!(select_namespace(&candidates, &[], "common").as_deref(), Some("abc"));
        assert_eq!(select_namespace(&[], &[], "common"), None);
    }

    #[test]
    fn key_in_bound_namespace_is_clean() {
        let issues = detect("function P() { const t = useTranslations(\"blog\"); t(\"heading\"); }");
        assert!(issues.is_empty());
    }

    #[test]
    fn wrong_namespace_suggests_fallback() {
        let issues = detect("function P() { const t = useTranslations(\"blog\"); t(\"title\"); }");
        assert_eq!(issues.len(), 1);
        let issue = &issues[0];
        assert_eq!(issue.kind, IssueKind::WrongNamespace);
        assert_eq!(issue.current_namespace.as_deref(), Some("blog"));
        assert_eq!(issue.suggested_namespace.as_deref(), Some("common"));
        assert!(issue.fixable);
    }

    #[test]
    fn embedded_prefix_is_stripped() {
        let issues = detect("function P() { const t = useTranslations(\"blog\"); t(\"ext_admin.save\"); }");
        assert_eq!(issues[0].kind, IssueKind::WrongNamespace);
        assert_eq!(issues[0].suggested_namespace.as_deref(), Some("ext_admin"));
        assert_eq!(issues[0].suggested_key.as_deref(), Some("save"));
    }

    #[test]
    fn unknown_key_is_missing_and_not_fixable() {
        let issues = detect("function P() { const t = useTranslations(\"blog\"); t(\"nope\"); }");
        assert_eq!(issues[0].kind, IssueKind::MissingKey);
        assert!(!issues[0].fixable);
    }

    #[test]
    fn unbound_calls_report_candidates_or_drop() {
        let issues = detect("function P() { t(\"title\"); t(\"nope\"); }");
        assert_eq!(issues.len(), 1);
        assert_eq!(issues[0].kind, IssueKind::UndeclaredVariable);
        assert_eq!(issues[0].candidates, names(&["common", "ext_admin_users"]));
        assert_eq!(issues[0].suggested_namespace.as_deref(), Some("common"));
        assert!(issues[0].fixable);
    }

    #[test]
    fn parameter_accessor_is_not_fixable() {
        let issues = detect("function row(t) { return t(\"title\"); }");
        assert_eq!(issues[0].kind, IssueKind::UndeclaredVariable);
        assert!(!issues[0].fixable);
    }

    #[test]
    fn destructured_or_imported_accessor_is_not_fixable() {
        let issues = detect("function P() { const { t } = useTranslation(); return t(\"title\"); }");
        assert_eq!(issues[0].kind, IssueKind::UndeclaredVariable);
        assert!(!issues[0].fixable);

        let issues = detect("import { t } from \"i18n\";\nfunction P() { return t(\"title\"); }");
        assert!(!issues[0].fixable);
    }

    #[test]
    fn module_level_arrow_without_block_is_not_fixable() {
        let issues = detect("export const Label = () => t(\"title\");\nfunction P() { return t(\"save\"); }");
        assert_eq!(issues.len(), 2);
        assert!(!issues[0].fixable);
        assert!(issues[0].message.contains("without a block body"));
        assert!(issues[1].fixable);
    }

    #[test]
    fn ids_are_stable_across_runs() {
        let src = "function P() { const t = useTranslations(\"blog\"); t(\"title\"); }";
        assert_eq!(detect(src)[0].id, detect(src)[0].id);
    }
}
