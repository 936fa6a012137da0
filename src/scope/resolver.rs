// SPDX-License-Identifier: PMPL-1.0-or-later

//! Binding and call-site discovery plus scope resolution

use super::lexer::{tokenize, Token, TokenKind};
use super::tree::{ScopeId, ScopeTree, ROOT};
use regex::Regex;
use std::sync::LazyLock;

/// `t`, or `t` followed by an uppercase-led suffix (`tCommon`, `tExtAdmin`)
static ACCESSOR: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^t(?:[A-Z][A-Za-z0-9_]*)?$").expect("accessor regex is valid"));

pub fn is_accessor_name(name: &str) -> bool {
    ACCESSOR.is_match(name)
}

/// `const <name> = [await] <binding_fn>("namespace")`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Binding {
    pub name: String,
    pub namespace: String,
    pub binding_fn: String,
    pub awaited: bool,
    /// Offset of the `const`/`let`/`var` keyword
    pub decl_start: usize,
    /// Offset just past the declaration, including a trailing `;`
    pub decl_end: usize,
    pub token_index: usize,
    pub scope: ScopeId,
    pub line: usize,
}

/// `<accessor>("key"` followed by `)` or `,`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CallSite {
    pub accessor: String,
    pub key: String,
    pub quote: char,
    /// Offset of the accessor identifier
    pub start: usize,
    /// Offset just past the key's closing quote
    pub end: usize,
    pub token_index: usize,
    pub scope: ScopeId,
    pub line: usize,
    pub column: usize,
}

#[derive(Debug, Clone)]
pub struct ResolvedCall {
    pub call: CallSite,
    /// Index into [`FileScan::bindings`]
    pub binding: Option<usize>,
}

/// An accessor-named identifier declared by something other than a
/// recognised binding: `const { t } = ...`, `let t = ...`, `import t`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LocalDecl {
    pub name: String,
    pub scope: ScopeId,
    pub token_index: usize,
}

/// Line/column lookup over one source text (both 1-based).
#[derive(Debug, Clone)]
pub struct LineIndex {
    starts: Vec<usize>,
}

impl LineIndex {
    pub fn new(src: &str) -> Self {
        let mut starts = vec![0];
        starts.extend(src.match_indices('\n').map(|(i, _)| i + 1));
        Self { starts }
    }

    pub fn line(&self, offset: usize) -> usize {
        self.starts.partition_point(|&s| s <= offset)
    }

    pub fn line_col(&self, offset: usize) -> (usize, usize) {
        let line = self.line(offset);
        (line, offset - self.starts[line - 1] + 1)
    }
}

/// Scope model of one file.
#[derive(Debug, Clone)]
pub struct FileScan {
    pub tokens: Vec<Token>,
    pub tree: ScopeTree,
    pub bindings: Vec<Binding>,
    pub locals: Vec<LocalDecl>,
    pub calls: Vec<ResolvedCall>,
    pub lines: LineIndex,
}

impl FileScan {
    pub fn scan<F>(src: &str, is_binding_fn: F) -> Self
    where
        F: Fn(&str) -> bool,
    {
        let tokens = tokenize(src);
        let tree = ScopeTree::build(src, &tokens);
        let lines = LineIndex::new(src);
        let bindings = find_bindings(src, &tokens, &tree, &lines, &is_binding_fn);
        let locals = find_locals(src, &tokens, &tree, &bindings);
        let mut scan = Self {
            calls: Vec::new(),
            tokens,
            tree,
            bindings,
            locals,
            lines,
        };
        let calls = find_calls(src, &scan.tokens, &scan.tree, &scan.lines);
        scan.calls = calls
            .into_iter()
            .map(|call| {
                let binding = scan.resolve(&call.accessor, call.scope, call.start);
                ResolvedCall { call, binding }
            })
            .collect();
        scan
    }

    pub fn is_empty(&self) -> bool {
        self.bindings.is_empty() && self.calls.is_empty()
    }

    /// Binding that governs `name` at `offset` inside `scope`: the first
    /// ancestor scope declaring it before `offset`, nearest declaration wins.
    pub fn resolve(&self, name: &str, scope: ScopeId, offset: usize) -> Option<usize> {
        self.tree.ancestors(scope).find_map(|ancestor| {
            self.bindings
                .iter()
                .enumerate()
                .filter(|(_, b)| b.scope == ancestor && b.name == name && b.decl_start < offset)
                .max_by_key(|(_, b)| b.decl_start)
                .map(|(idx, _)| idx)
        })
    }

    pub fn binding(&self, idx: usize) -> &Binding {
        &self.bindings[idx]
    }

    pub fn resolved_binding(&self, call: &ResolvedCall) -> Option<&Binding> {
        call.binding.map(|idx| &self.bindings[idx])
    }

    /// Namespaces bound anywhere in the file.
    pub fn bound_namespaces(&self) -> Vec<&str> {
        let mut namespaces: Vec<&str> = self.bindings.iter().map(|b| b.namespace.as_str()).collect();
        namespaces.sort_unstable();
        namespaces.dedup();
        namespaces
    }

    /// Whether a non-binding declaration of `name` is visible from `scope`.
    pub fn declares_local(&self, name: &str, scope: ScopeId) -> bool {
        self.locals
            .iter()
            .any(|l| l.name == name && self.tree.contains(l.scope, scope))
    }

    /// Whether `call` sits in the expression body of an arrow function,
    /// `() => t("x")`, which has no block to declare a binding in.
    pub fn in_concise_arrow(&self, call: &CallSite) -> bool {
        let host = self.tree.function_of(call.scope);
        let floor = match host {
            ROOT => 0,
            id => self.tree.get(id).open,
        };
        let mut depth = 0usize;
        for j in (0..call.token_index).rev() {
            let tok = &self.tokens[j];
            if tok.start <= floor && host != ROOT {
                break;
            }
            match &tok.kind {
                TokenKind::CloseBrace | TokenKind::Punct(')') | TokenKind::Punct(']') => depth += 1,
                TokenKind::OpenBrace | TokenKind::Punct('(') | TokenKind::Punct('[') => {
                    depth = depth.saturating_sub(1)
                }
                TokenKind::Punct(';') if depth == 0 => break,
                TokenKind::Arrow if depth == 0 => {
                    return self
                        .tokens
                        .get(j + 1)
                        .is_some_and(|next| next.kind != TokenKind::OpenBrace);
                }
                _ => {}
            }
        }
        false
    }

    /// Identifier tokens named `name` inside `scope` (or nested scopes) at or
    /// after `after`, excluding property accesses like `obj.name`.
    pub fn references(&self, src: &str, name: &str, scope: ScopeId, after: usize) -> Vec<usize> {
        self.tokens
            .iter()
            .enumerate()
            .filter(|(i, tok)| {
                tok.start >= after
                    && tok.kind == TokenKind::Ident
                    && tok.text(src) == name
                    && !(*i > 0 && self.tokens[i - 1].is_punct('.'))
                    && self.tree.contains(scope, self.tree.scope_of_token(*i))
            })
            .map(|(i, _)| i)
            .collect()
    }
}

fn find_bindings<F>(
    src: &str,
    tokens: &[Token],
    tree: &ScopeTree,
    lines: &LineIndex,
    is_binding_fn: &F,
) -> Vec<Binding>
where
    F: Fn(&str) -> bool,
{
    let mut bindings = Vec::new();
    for (i, tok) in tokens.iter().enumerate() {
        if tok.kind != TokenKind::Ident {
            continue;
        }
        let keyword = tok.text(src);
        if !matches!(keyword, "const" | "let" | "var") {
            continue;
        }
        let Some(binding) = match_binding(src, tokens, i, is_binding_fn) else {
            continue;
        };
        let (name, namespace, binding_fn, awaited, end_token) = binding;

        let mut decl_end = tokens[end_token].end;
        if tokens.get(end_token + 1).is_some_and(|t| t.is_punct(';')) {
            decl_end = tokens[end_token + 1].end;
        }
        let innermost = tree.scope_of_token(i);
        let scope = if keyword == "var" {
            tree.function_of(innermost)
        } else {
            innermost
        };
        bindings.push(Binding {
            name,
            namespace,
            binding_fn,
            awaited,
            decl_start: tok.start,
            decl_end,
            token_index: i,
            scope,
            line: lines.line(tok.start),
        });
    }
    bindings
}

fn find_locals(src: &str, tokens: &[Token], tree: &ScopeTree, bindings: &[Binding]) -> Vec<LocalDecl> {
    let mut locals = Vec::new();
    for (i, tok) in tokens.iter().enumerate() {
        if tok.kind != TokenKind::Ident || !is_accessor_name(tok.text(src)) {
            continue;
        }
        if i > 0 && tokens[i - 1].is_punct('.') {
            continue;
        }
        if bindings.iter().any(|b| b.token_index + 1 == i) {
            continue;
        }
        // `import { t as tLib }` declares only the alias
        if tokens.get(i + 1).is_some_and(|next| next.is_ident(src, "as")) {
            continue;
        }
        let Some(scope) = declaring_scope(src, tokens, tree, i) else {
            continue;
        };
        locals.push(LocalDecl {
            name: tok.text(src).to_string(),
            scope,
            token_index: i,
        });
    }
    locals
}

/// Scope that identifier token `i` is declared into, if it sits in a
/// declaration position: after `const`/`let`/`var`/`function`/`class`,
/// inside a destructuring pattern, or in an import clause.
fn declaring_scope(src: &str, tokens: &[Token], tree: &ScopeTree, i: usize) -> Option<ScopeId> {
    let mut depth = 0usize;
    for j in (i.saturating_sub(128)..i).rev() {
        let tok = &tokens[j];
        match &tok.kind {
            TokenKind::Ident => match tok.text(src) {
                "import" | "as" if depth == 0 => return Some(ROOT),
                "const" | "let" if depth == 0 => return Some(tree.scope_of_token(j)),
                "var" if depth == 0 => return Some(tree.function_of(tree.scope_of_token(j))),
                "function" | "class" if j + 1 == i => return Some(tree.scope_of_token(j)),
                _ => {}
            },
            TokenKind::CloseBrace | TokenKind::Punct(']') | TokenKind::Punct(')') => depth += 1,
            TokenKind::OpenBrace | TokenKind::Punct('[') => depth = depth.saturating_sub(1),
            TokenKind::Punct('(') if depth == 0 => return None,
            TokenKind::Punct('(') => depth -= 1,
            TokenKind::Punct(';') | TokenKind::Punct('=') | TokenKind::Arrow if depth == 0 => {
                return None
            }
            _ => {}
        }
    }
    None
}

type BindingMatch = (String, String, String, bool, usize);

/// Match the declaration starting at keyword token `i`. Returns the
/// accessor name, namespace, binding function, await flag and the index of
/// the call's closing `)`.
fn match_binding<F>(src: &str, tokens: &[Token], i: usize, is_binding_fn: &F) -> Option<BindingMatch>
where
    F: Fn(&str) -> bool,
{
    let name_tok = tokens.get(i + 1)?;
    if name_tok.kind != TokenKind::Ident || !tokens.get(i + 2)?.is_punct('=') {
        return None;
    }
    let mut k = i + 3;
    let awaited = tokens.get(k)?.is_ident(src, "await");
    if awaited {
        k += 1;
    }
    let fn_tok = tokens.get(k)?;
    if fn_tok.kind != TokenKind::Ident || !is_binding_fn(fn_tok.text(src)) {
        return None;
    }
    if !tokens.get(k + 1)?.is_punct('(') {
        return None;
    }

    let arg = tokens.get(k + 2)?;
    let (namespace, after_arg) = match (&arg.kind, arg.str_value()) {
        (_, Some(value)) => (value.to_string(), k + 3),
        (TokenKind::OpenBrace, _) => object_namespace(src, tokens, k + 2)?,
        _ => return None,
    };
    let close = (after_arg..tokens.len())
        .take(32)
        .find(|&j| tokens[j].is_punct(')'))?;

    Some((
        name_tok.text(src).to_string(),
        namespace,
        fn_tok.text(src).to_string(),
        awaited,
        close,
    ))
}

/// `({ locale, namespace: "ns" })`: the namespace and the index
/// after the closing brace.
fn object_namespace(src: &str, tokens: &[Token], open: usize) -> Option<(String, usize)> {
    let mut depth = 0usize;
    let mut namespace = None;
    for j in open..tokens.len() {
        match tokens[j].kind {
            TokenKind::OpenBrace => depth += 1,
            TokenKind::CloseBrace => {
                depth -= 1;
                if depth == 0 {
                    return namespace.map(|ns| (ns, j + 1));
                }
            }
            TokenKind::Ident if depth == 1 && tokens[j].text(src) == "namespace" => {
                if tokens.get(j + 1).is_some_and(|t| t.is_punct(':')) {
                    namespace = tokens.get(j + 2).and_then(Token::str_value).map(str::to_string);
                }
            }
            _ => {}
        }
    }
    None
}

fn find_calls(src: &str, tokens: &[Token], tree: &ScopeTree, lines: &LineIndex) -> Vec<CallSite> {
    let mut calls = Vec::new();
    for (i, tok) in tokens.iter().enumerate() {
        if tok.kind != TokenKind::Ident || !is_accessor_name(tok.text(src)) {
            continue;
        }
        if i > 0 && (tokens[i - 1].is_punct('.') || tokens[i - 1].is_ident(src, "function")) {
            continue;
        }
        let (Some(open), Some(arg), Some(after)) =
            (tokens.get(i + 1), tokens.get(i + 2), tokens.get(i + 3))
        else {
            continue;
        };
        if !open.is_punct('(') || !(after.is_punct(')') || after.is_punct(',')) {
            continue;
        }
        let TokenKind::Str { quote, value } = &arg.kind else {
            continue;
        };
        let (line, column) = lines.line_col(tok.start);
        calls.push(CallSite {
            accessor: tok.text(src).to_string(),
            key: value.clone(),
            quote: *quote,
            start: tok.start,
            end: arg.end,
            token_index: i,
            scope: tree.scope_of_token(i),
            line,
            column,
        });
    }
    calls
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scan(src: &str) -> FileScan {
        FileScan::scan(src, |f| f == "useTranslations" || f == "getTranslations")
    }

    fn resolved_ns<'a>(scan: &'a FileScan, key: &str) -> Option<&'a str> {
        scan.calls
            .iter()
            .find(|c| c.call.key == key)
            .and_then(|c| scan.resolved_binding(c))
            .map(|b| b.namespace.as_str())
    }

    #[test]
    fn accessor_naming_convention() {
        assert!(is_accessor_name("t"));
        assert!(is_accessor_name("tCommon"));
        assert!(!is_accessor_name("tx"));
        assert!(!is_accessor_name("translate"));
    }

    #[test]
    fn sibling_functions_do_not_share_bindings() {
        let src = r#"
function A() {
  const t = useTranslations("blog");
  return t("title");
}
function B() {
  const t = useTranslations("shop");
  return t("price");
}
"#;
        let scan = scan(src);
        assert_eq!(scan.bindings.len(), 2);
        assert_eq!(resolved_ns(&scan, "title"), Some("blog"));
        assert_eq!(resolved_ns(&scan, "price"), Some("shop"));
    }

    #[test]
    fn nested_function_shadows_outer_binding() {
        let src = r#"
export default async function Page() {
  const t = await getTranslations("page");
  const Inner = () => {
    const t = useTranslations("inner");
    return t("deep");
  };
  return t("outer");
}
"#;
        let scan = scan(src);
        assert_eq!(resolved_ns(&scan, "deep"), Some("inner"));
        assert_eq!(resolved_ns(&scan, "outer"), Some("page"));
        assert!(scan.bindings[0].awaited);
    }

    #[test]
    fn deeply_nested_calls_see_outermost_binding() {
        let src = r#"
const t = useTranslations("top");
function a() { function b() { return () => { if (x) { t("k"); } }; } }
"#;
        assert_eq!(resolved_ns(&scan(src), "k"), Some("top"));
    }

    #[test]
    fn calls_before_the_binding_are_unresolved() {
        let src = r#"
function A() {
  t("early");
  const t = useTranslations("ns");
}
"#;
        let scan = scan(src);
        assert_eq!(scan.calls.len(), 1);
        assert!(scan.calls[0].binding.is_none());
    }

    #[test]
    fn object_argument_binding() {
        let src = r#"const tMeta = await getTranslations({ locale, namespace: "meta" });
tMeta("title", { x: 1 });"#;
        let scan = scan(src);
        assert_eq!(scan.bindings[0].name, "tMeta");
        assert_eq!(resolved_ns(&scan, "title"), Some("meta"));
        assert_eq!(scan.bindings[0].decl_end, src.find('\n').unwrap());
    }

    #[test]
    fn member_calls_and_dynamic_keys_are_ignored() {
        let src = r#"
const t = useTranslations("ns");
obj.t("member");
t(`dyn-${id}`);
t(key);
t("ok");
"#;
        let keys: Vec<String> = scan(src).calls.into_iter().map(|c| c.call.key).collect();
        assert_eq!(keys, vec!["ok".to_string()]);
    }

    #[test]
    fn non_binding_declarations_are_locals() {
        let src = r#"
import { t as tLib } from "lib";
function A() {
  const { t } = useTranslation();
  if (x) { const y = 1; }
  return t("a") + tOther("b");
}
function B() {
  return t("c");
}
"#;
        let scan = scan(src);
        let names: Vec<&str> = scan.locals.iter().map(|l| l.name.as_str()).collect();
        assert_eq!(names, vec!["tLib", "t"]);
        let a = scan.calls.iter().find(|c| c.call.key == "a").expect("call a");
        let c = scan.calls.iter().find(|c| c.call.key == "c").expect("call c");
        assert!(scan.declares_local("t", a.call.scope));
        assert!(!scan.declares_local("t", c.call.scope));
        assert!(scan.declares_local("tLib", c.call.scope));
    }

    #[test]
    fn bindings_and_calls_are_not_locals() {
        let src = "function A() {\n  const t = useTranslations(\"ns\");\n  let x = t(\"k\");\n}\n";
        assert!(scan(src).locals.is_empty());
    }

    #[test]
    fn expression_bodied_arrows_are_detected() {
        let src = r#"
export const Label = () => t("title");
export const Para = () => <p>{t("body")}</p>;
export function Card() {
  return items.map((i) => t("item"));
}
export const Block = () => {
  return t("block");
};
"#;
        let scan = scan(src);
        let concise: Vec<&str> = scan
            .calls
            .iter()
            .filter(|c| scan.in_concise_arrow(&c.call))
            .map(|c| c.call.key.as_str())
            .collect();
        assert_eq!(concise, vec!["title", "body", "item"]);
    }

    #[test]
    fn line_and_column_are_one_based() {
        let src = "const t = useTranslations(\"a\");\n  t(\"x\");";
        let scan = scan(src);
        assert_eq!(scan.calls[0].call.line, 2);
        assert_eq!(scan.calls[0].call.column, 3);
        assert_eq!(scan.bindings[0].line, 1);
    }
}
