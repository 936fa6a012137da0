// SPDX-License-Identifier: PMPL-1.0-or-later

//! Per-file fix batching
//!
//! For one file: find the calls the plan retargets, group them by host
//! scope and target namespace, then derive bindings to add, bindings that
//! fall out of use, and call-site replacements. Everything lands in one
//! [`EditList`] against the file's original text.

use super::FixPlan;
use crate::config::Config;
use crate::locale::namespace::accessor_name;
use crate::locale::KeyLocation;
use crate::rewrite::EditList;
use crate::scope::{Binding, CallSite, FileScan, ScopeId, ROOT};
use crate::scope::lexer::TokenKind;
use crate::types::Change;
use std::collections::{BTreeMap, BTreeSet, HashSet};
use tracing::debug;

/// Everything one file needs, ready for the rewriter.
#[derive(Debug, Clone, Default)]
pub struct FileFix {
    pub edits: EditList,
    pub changes: Vec<Change>,
    pub calls_fixed: usize,
}

impl FileFix {
    pub fn is_empty(&self) -> bool {
        self.edits.is_empty()
    }
}

struct Retarget {
    call: usize,
    binding: Option<usize>,
    target: KeyLocation,
    host: ScopeId,
}

enum Placement {
    /// Own line at `at`, with this indentation
    Line { at: usize, indent: String },
    /// Same line, right after `at`
    Inline { at: usize },
}

pub fn plan_file(file: &str, src: &str, scan: &FileScan, plan: &FixPlan, config: &Config) -> FileFix {
    let mut fix = FileFix::default();
    let retargets = collect_retargets(file, scan, plan);
    if retargets.is_empty() {
        return fix;
    }

    let mut groups: BTreeMap<(ScopeId, String), Vec<&Retarget>> = BTreeMap::new();
    for retarget in &retargets {
        groups
            .entry((retarget.host, retarget.target.namespace.clone()))
            .or_default()
            .push(retarget);
    }

    // accessor name chosen for each retargeted call, by call index
    let mut names: BTreeMap<usize, String> = BTreeMap::new();
    let mut added: HashSet<(ScopeId, String)> = HashSet::new();

    for ((host, namespace), members) in &groups {
        let calls: Vec<&CallSite> = members.iter().map(|r| &scan.calls[r.call].call).collect();
        let earliest = calls.iter().map(|c| c.start).min().unwrap_or(0);

        let name = match reusable_binding(scan, namespace, &calls) {
            Some(idx) => scan.binding(idx).name.clone(),
            None => {
                let name = new_binding_name(src, scan, *host, namespace, members, &added);
                add_binding(file, src, scan, config, *host, namespace, &name, earliest, &mut fix);
                added.insert((*host, name.clone()));
                name
            }
        };
        for member in members {
            names.insert(member.call, name.clone());
        }
    }

    for retarget in &retargets {
        let call = &scan.calls[retarget.call].call;
        let Some(name) = names.get(&retarget.call) else {
            continue;
        };
        fix.calls_fixed += 1;
        if *name == call.accessor && call.key == retarget.target.key {
            continue;
        }
        let old = &src[call.start..call.end];
        let new = format!(
            "{}({}{}{}",
            name,
            call.quote,
            escape_key(&retarget.target.key, call.quote),
            call.quote
        );
        fix.edits.replace(call.start, call.end, old, new);
        fix.changes.push(Change::CallRewritten {
            file: file.to_string(),
            line: call.line,
            from: format!("{}(\"{}\")", call.accessor, call.key),
            to: format!("{}(\"{}\")", name, retarget.target.key),
        });
    }

    remove_unused_bindings(file, src, scan, &retargets, &names, &mut fix);

    debug!(
        file,
        edits = fix.edits.len(),
        calls = fix.calls_fixed,
        "file fix planned"
    );
    fix
}

fn collect_retargets(file: &str, scan: &FileScan, plan: &FixPlan) -> Vec<Retarget> {
    let mut retargets = Vec::new();
    for (idx, resolved) in scan.calls.iter().enumerate() {
        let binding = scan.resolved_binding(resolved);
        let Some(target) = plan.target_for(file, &resolved.call, binding.map(|b| b.namespace.as_str()))
        else {
            continue;
        };
        if let Some(b) = binding {
            if b.namespace == target.namespace && resolved.call.key == target.key {
                continue;
            }
        }
        let host = match binding {
            Some(b) => b.scope,
            None => scan.tree.function_of(resolved.call.scope),
        };
        if binding.is_none() && host == ROOT && scan.in_concise_arrow(&resolved.call) {
            debug!(file, line = resolved.call.line, "call in arrow without block body left alone");
            continue;
        }
        retargets.push(Retarget {
            call: idx,
            binding: resolved.binding,
            target,
            host,
        });
    }
    retargets
}

/// An existing binding of `namespace` that governs every one of `calls`.
fn reusable_binding(scan: &FileScan, namespace: &str, calls: &[&CallSite]) -> Option<usize> {
    scan.bindings
        .iter()
        .enumerate()
        .filter(|(_, b)| b.namespace == namespace)
        .find(|(idx, b)| {
            calls
                .iter()
                .all(|c| scan.resolve(&b.name, c.scope, c.start) == Some(*idx))
        })
        .map(|(idx, _)| idx)
}

fn new_binding_name(
    src: &str,
    scan: &FileScan,
    host: ScopeId,
    namespace: &str,
    members: &[&Retarget],
    added: &HashSet<(ScopeId, String)>,
) -> String {
    // Unbound calls keep the accessor they already use when possible.
    let accessors: BTreeSet<&str> = members
        .iter()
        .map(|r| scan.calls[r.call].call.accessor.as_str())
        .collect();
    if members.iter().all(|r| r.binding.is_none()) && accessors.len() == 1 {
        if let Some(accessor) = accessors.into_iter().next() {
            let declared_here = scan
                .bindings
                .iter()
                .any(|b| b.scope == host && b.name == accessor);
            let declared_locally = members
                .iter()
                .any(|r| scan.declares_local(accessor, scan.calls[r.call].call.scope));
            if !declared_here && !declared_locally && !added.contains(&(host, accessor.to_string())) {
                return accessor.to_string();
            }
        }
    }

    let base = accessor_name(namespace);
    let free = std::iter::once(base.clone())
        .chain((2..).map(|n| format!("{}{}", base, n)))
        .find(|candidate| name_is_free(src, scan, host, candidate, added));
    free.unwrap_or(base)
}

fn name_is_free(
    src: &str,
    scan: &FileScan,
    host: ScopeId,
    name: &str,
    added: &HashSet<(ScopeId, String)>,
) -> bool {
    !added.contains(&(host, name.to_string()))
        && !scan.declares_local(name, host)
        && scan.references(src, name, host, 0).is_empty()
        && !scan
            .bindings
            .iter()
            .any(|b| b.name == name && scan.tree.contains(b.scope, host))
        && !scan
            .tree
            .ancestors(host)
            .any(|s| scan.tree.get(s).has_param(name))
}

#[allow(clippy::too_many_arguments)]
fn add_binding(
    file: &str,
    src: &str,
    scan: &FileScan,
    config: &Config,
    host: ScopeId,
    namespace: &str,
    name: &str,
    earliest: usize,
    fix: &mut FileFix,
) {
    let in_host: Vec<&Binding> = scan.bindings.iter().filter(|b| b.scope == host).collect();
    let anchor = in_host
        .iter()
        .filter(|b| b.decl_end <= earliest)
        .max_by_key(|b| b.decl_start)
        .copied();
    let style = anchor.or_else(|| in_host.iter().max_by_key(|b| b.decl_start).copied());
    let (binding_fn, awaited) = match style {
        Some(b) => (b.binding_fn.as_str(), b.awaited),
        None => (config.default_binding_function.as_str(), false),
    };
    let declaration = format!(
        "const {} = {}{}(\"{}\");",
        name,
        if awaited { "await " } else { "" },
        binding_fn,
        namespace
    );

    let placement = match anchor {
        Some(b) => after_declaration(src, b, earliest),
        None if host == ROOT => Placement::Line {
            at: after_imports(src, scan).min(line_start_of(src, earliest)),
            indent: String::new(),
        },
        None => top_of_body(src, scan, host),
    };
    let at = match placement {
        Placement::Line { at, indent } => {
            fix.edits.insert(at, format!("{}{}\n", indent, declaration));
            at
        }
        Placement::Inline { at } => {
            fix.edits.insert(at, format!(" {}", declaration));
            at
        }
    };
    fix.changes.push(Change::BindingAdded {
        file: file.to_string(),
        line: scan.lines.line(at),
        name: name.to_string(),
        namespace: namespace.to_string(),
    });
}

fn after_declaration(src: &str, anchor: &Binding, earliest: usize) -> Placement {
    match src[anchor.decl_end..].find('\n').map(|i| anchor.decl_end + i + 1) {
        Some(next_line) if next_line <= earliest => Placement::Line {
            at: next_line,
            indent: line_indent(src, anchor.decl_start).to_string(),
        },
        _ => Placement::Inline { at: anchor.decl_end },
    }
}

fn top_of_body(src: &str, scan: &FileScan, host: ScopeId) -> Placement {
    let scope = scan.tree.get(host);
    let body = scope.body_start();
    let Some(newline) = src[body..].find('\n').map(|i| body + i) else {
        return Placement::Inline { at: body };
    };
    if !src[body..newline].trim().is_empty() {
        return Placement::Inline { at: body };
    }
    let at = newline + 1;
    let first_line = src[at..]
        .lines()
        .find(|line| !line.trim().is_empty())
        .unwrap_or("");
    let indent = if first_line.trim_start().starts_with('}') || at > scope.close {
        format!("{}  ", line_indent(src, scope.open))
    } else {
        leading_whitespace(first_line).to_string()
    };
    Placement::Line { at, indent }
}

/// Start of the line after the last import (or leading directive).
fn after_imports(src: &str, scan: &FileScan) -> usize {
    let tokens = &scan.tokens;
    let mut end = 0;
    for (i, tok) in tokens.iter().enumerate() {
        if scan.tree.scope_of_token(i) != ROOT {
            continue;
        }
        let statement_start = i == 0
            || tokens[i - 1].is_punct(';')
            || tokens[i - 1].kind == TokenKind::CloseBrace
            || scan.lines.line(tokens[i - 1].start) < scan.lines.line(tok.start);
        if !statement_start {
            continue;
        }
        let specifier = if tok.is_ident(src, "import") {
            tokens[i + 1..]
                .iter()
                .take(256)
                .find(|t| matches!(t.kind, TokenKind::Str { .. }))
        } else if i == 0 && matches!(tok.kind, TokenKind::Str { .. }) {
            Some(tok)
        } else {
            None
        };
        if let Some(tok) = specifier {
            end = end.max(tok.end);
        }
    }
    if end == 0 {
        return 0;
    }
    match src[end..].find('\n') {
        Some(i) => end + i + 1,
        None => src.len(),
    }
}

fn remove_unused_bindings(
    file: &str,
    src: &str,
    scan: &FileScan,
    retargets: &[Retarget],
    names: &BTreeMap<usize, String>,
    fix: &mut FileFix,
) {
    let mut candidates: BTreeMap<usize, HashSet<usize>> = BTreeMap::new();
    for retarget in retargets {
        let Some(idx) = retarget.binding else {
            continue;
        };
        let binding = scan.binding(idx);
        if names.get(&retarget.call).is_some_and(|n| *n != binding.name) {
            candidates
                .entry(idx)
                .or_default()
                .insert(scan.calls[retarget.call].call.token_index);
        }
    }

    for (idx, rewritten) in candidates {
        let binding = scan.binding(idx);
        let still_used = scan
            .references(src, &binding.name, binding.scope, binding.decl_end)
            .into_iter()
            .any(|token| !rewritten.contains(&token));
        if still_used {
            continue;
        }

        let line_start = line_start_of(src, binding.decl_start);
        let line_end = src[binding.decl_end..]
            .find('\n')
            .map(|i| binding.decl_end + i + 1)
            .unwrap_or(src.len());
        let whole_line = src[line_start..binding.decl_start].trim().is_empty()
            && src[binding.decl_end..line_end].trim().is_empty();
        // Mid-line removals take one adjoining space with them.
        let (start, end) = if whole_line {
            (line_start, line_end)
        } else if src[..binding.decl_start].ends_with(' ') && src[binding.decl_end..].starts_with(' ') {
            (binding.decl_start - 1, binding.decl_end)
        } else {
            (binding.decl_start, binding.decl_end)
        };
        fix.edits.remove(start, end, &src[start..end]);
        fix.changes.push(Change::BindingRemoved {
            file: file.to_string(),
            line: binding.line,
            name: binding.name.clone(),
            namespace: binding.namespace.clone(),
        });
    }
}

fn line_start_of(src: &str, offset: usize) -> usize {
    src[..offset].rfind('\n').map(|i| i + 1).unwrap_or(0)
}

fn line_indent(src: &str, offset: usize) -> &str {
    leading_whitespace(&src[line_start_of(src, offset)..])
}

fn leading_whitespace(line: &str) -> &str {
    let len = line.len() - line.trim_start_matches([' ', '\t']).len();
    &line[..len]
}

fn escape_key(key: &str, quote: char) -> String {
    let mut out = String::with_capacity(key.len());
    for c in key.chars() {
        if c == '\\' || c == quote {
            out.push('\\');
        }
        out.push(c);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::plan::CallSelector;
    use std::collections::HashMap;

    fn config() -> Config {
        Config::default()
    }

    fn rule(selector: CallSelector, ns: &str, key: &str) -> FixPlan {
        let mut rules = HashMap::new();
        rules.insert(selector, KeyLocation::new(ns, key));
        let mut file_rules = HashMap::new();
        file_rules.insert("a.tsx".to_string(), rules);
        FixPlan {
            file_rules,
            ..FixPlan::default()
        }
    }

    fn run(src: &str, plan: &FixPlan) -> String {
        let config = config();
        let scan = FileScan::scan(src, |f| config.is_binding_function(f));
        let fix = plan_file("a.tsx", src, &scan, plan, &config);
        fix.edits.apply(src).expect("no overlap").text
    }

    fn bound(ns: &str, key: &str) -> CallSelector {
        CallSelector::Bound {
            namespace: ns.to_string(),
            key: key.to_string(),
        }
    }

    #[test]
    fn wrong_namespace_adds_binding_and_drops_unused_one() {
        let src = "export function Post() {\n  const t = useTranslations(\"blog\");\n  return <h1>{t(\"title\")}</h1>;\n}\n";
        let out = run(src, &rule(bound("blog", "title"), "common", "title"));
        assert_eq!(
            out,
            "export function Post() {\n  const tCommon = useTranslations(\"common\");\n  return <h1>{tCommon(\"title\")}</h1>;\n}\n"
        );
    }

    #[test]
    fn binding_kept_while_other_calls_use_it() {
        let src = "function Post() {\n  const t = useTranslations(\"blog\");\n  t(\"title\");\n  t(\"body\");\n}\n";
        let out = run(src, &rule(bound("blog", "title"), "common", "title"));
        assert_eq!(
            out,
            "function Post() {\n  const t = useTranslations(\"blog\");\n  const tCommon = useTranslations(\"common\");\n  tCommon(\"title\");\n  t(\"body\");\n}\n"
        );
    }

    #[test]
    fn existing_binding_is_reused() {
        let src = "function Post() {\n  const t = useTranslations(\"blog\");\n  const tCommon = useTranslations(\"common\");\n  t(\"title\");\n  t(\"body\");\n  tCommon(\"x\");\n}\n";
        let out = run(src, &rule(bound("blog", "title"), "common", "title"));
        assert!(out.contains("  tCommon(\"title\");\n"));
        assert_eq!(out.matches("useTranslations(\"common\")").count(), 1);
    }

    fn unbound(accessor: &str, key: &str) -> CallSelector {
        CallSelector::Unbound {
            accessor: accessor.to_string(),
            key: key.to_string(),
        }
    }

    #[test]
    fn unbound_call_gets_declaration_under_its_own_name() {
        let src = "function Card() {\n    return <p>{t(\"title\")}</p>;\n}\n";
        let plan = rule(unbound("t", "title"), "common", "title");
        let out = run(src, &plan);
        assert_eq!(
            out,
            "function Card() {\n    const t = useTranslations(\"common\");\n    return <p>{t(\"title\")}</p>;\n}\n"
        );
    }

    #[test]
    fn sibling_functions_get_their_own_bindings() {
        let src = "function A() {\n  const t = useTranslations(\"blog\");\n  return t(\"title\");\n}\nfunction B() {\n  const t = useTranslations(\"shop\");\n  return t(\"title\");\n}\n";
        let mut plan = rule(bound("blog", "title"), "common", "title");
        plan.file_rules
            .get_mut("a.tsx")
            .expect("rules")
            .insert(bound("shop", "title"), KeyLocation::new("common", "title"));
        let out = run(src, &plan);
        assert_eq!(out.matches("const tCommon = useTranslations(\"common\");").count(), 2);
        assert!(!out.contains("useTranslations(\"blog\")"));
        assert!(!out.contains("useTranslations(\"shop\")"));
    }

    #[test]
    fn awaited_binding_style_is_copied() {
        let src = "export default async function Page() {\n  const t = await getTranslations(\"blog\");\n  t(\"body\");\n  return t(\"title\");\n}\n";
        let out = run(src, &rule(bound("blog", "title"), "common", "title"));
        assert!(out.contains("  const tCommon = await getTranslations(\"common\");\n"));
        assert!(out.contains("return tCommon(\"title\");"));
    }

    #[test]
    fn one_line_function_gets_inline_declaration() {
        let src = "const f = () => { const t = useTranslations(\"blog\"); return t(\"title\"); };\n";
        let out = run(src, &rule(bound("blog", "title"), "common", "title"));
        assert_eq!(
            out,
            "const f = () => { const tCommon = useTranslations(\"common\"); return tCommon(\"title\"); };\n"
        );
    }

    #[test]
    fn destructured_accessor_is_never_redeclared() {
        let src = "function Card() {\n  const { t } = useTranslation();\n  return t(\"title\");\n}\n";
        let plan = rule(unbound("t", "title"), "common", "title");
        let out = run(src, &plan);
        assert_eq!(out.matches("const t =").count(), 0);
        assert_eq!(
            out,
            "function Card() {\n  const tCommon = useTranslations(\"common\");\n  const { t } = useTranslation();\n  return tCommon(\"title\");\n}\n"
        );
    }

    #[test]
    fn bodiless_module_arrow_is_left_alone() {
        let src = "import x from \"x\";\nexport const Label = () => t(\"title\");\n";
        let plan = rule(unbound("t", "title"), "common", "title");
        assert_eq!(run(src, &plan), src);
    }

    #[test]
    fn mid_line_removal_leaves_single_space() {
        let src = "function A() { const t = useTranslations(\"blog\"); const u = 1; t(\"title\"); }\n";
        let out = run(src, &rule(bound("blog", "title"), "common", "title"));
        assert_eq!(
            out,
            "function A() { const tCommon = useTranslations(\"common\"); const u = 1; tCommon(\"title\"); }\n"
        );
    }

    #[test]
    fn name_collision_gets_numeric_suffix() {
        let src = "function A() {\n  const tCommon = useTranslations(\"other\");\n  const t = useTranslations(\"blog\");\n  tCommon(\"a\");\n  t(\"title\");\n}\n";
        let out = run(src, &rule(bound("blog", "title"), "common", "title"));
        assert!(out.contains("const tCommon2 = useTranslations(\"common\");"));
        assert!(out.contains("tCommon2(\"title\")"));
    }
}
