// SPDX-License-Identifier: PMPL-1.0-or-later

//! Scope tree built from brace tokens
//!
//! Every `{ ... }` pair becomes a node. A node is a function scope when the
//! brace opens a function body (arrow, `function`, method shorthand),
//! otherwise a plain block. Nodes live in an arena indexed by [`ScopeId`].

use super::lexer::{Token, TokenKind};

pub type ScopeId = usize;

pub const ROOT: ScopeId = 0;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScopeKind {
    Root,
    Function {
        name: Option<String>,
        /// Identifiers appearing in the parameter list
        params: Vec<String>,
    },
    Block,
}

#[derive(Debug, Clone)]
pub struct Scope {
    pub id: ScopeId,
    pub kind: ScopeKind,
    pub parent: Option<ScopeId>,
    /// Offset of the opening brace (0 for the root)
    pub open: usize,
    /// Offset of the closing brace (source length if unclosed or root)
    pub close: usize,
}

impl Scope {
    pub fn is_function(&self) -> bool {
        matches!(self.kind, ScopeKind::Function { .. })
    }

    /// First offset inside the body
    pub fn body_start(&self) -> usize {
        match self.kind {
            ScopeKind::Root => 0,
            _ => self.open + 1,
        }
    }

    pub fn function_name(&self) -> Option<&str> {
        match &self.kind {
            ScopeKind::Function { name, .. } => name.as_deref(),
            _ => None,
        }
    }

    pub fn has_param(&self, ident: &str) -> bool {
        match &self.kind {
            ScopeKind::Function { params, .. } => params.iter().any(|p| p == ident),
            _ => false,
        }
    }
}

const CONTROL_KEYWORDS: &[&str] = &["if", "for", "while", "switch", "catch", "with"];

#[derive(Debug, Clone)]
pub struct ScopeTree {
    scopes: Vec<Scope>,
    /// Innermost scope of each token, parallel to the token list
    token_scopes: Vec<ScopeId>,
}

impl ScopeTree {
    pub fn build(src: &str, tokens: &[Token]) -> Self {
        let parens = match_parens(tokens);
        let mut scopes = vec![Scope {
            id: ROOT,
            kind: ScopeKind::Root,
            parent: None,
            open: 0,
            close: src.len(),
        }];
        let mut stack = vec![ROOT];
        let mut token_scopes = Vec::with_capacity(tokens.len());

        for (i, token) in tokens.iter().enumerate() {
            let current = *stack.last().unwrap_or(&ROOT);
            match token.kind {
                TokenKind::OpenBrace => {
                    token_scopes.push(current);
                    let id = scopes.len();
                    scopes.push(Scope {
                        id,
                        kind: classify_brace(src, tokens, &parens, i),
                        parent: Some(current),
                        open: token.start,
                        close: src.len(),
                    });
                    stack.push(id);
                }
                TokenKind::CloseBrace => {
                    token_scopes.push(current);
                    if stack.len() > 1 {
                        scopes[current].close = token.start;
                        stack.pop();
                    }
                }
                _ => token_scopes.push(current),
            }
        }

        Self {
            scopes,
            token_scopes,
        }
    }

    pub fn get(&self, id: ScopeId) -> &Scope {
        &self.scopes[id]
    }

    pub fn len(&self) -> usize {
        self.scopes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.scopes.is_empty()
    }

    pub fn scope_of_token(&self, index: usize) -> ScopeId {
        self.token_scopes.get(index).copied().unwrap_or(ROOT)
    }

    /// `id` itself, then each parent up to the root.
    pub fn ancestors(&self, id: ScopeId) -> impl Iterator<Item = ScopeId> + '_ {
        std::iter::successors(Some(id), move |&s| self.scopes[s].parent)
    }

    pub fn contains(&self, outer: ScopeId, inner: ScopeId) -> bool {
        self.ancestors(inner).any(|s| s == outer)
    }

    /// Nearest enclosing function scope, or the root.
    pub fn function_of(&self, id: ScopeId) -> ScopeId {
        self.ancestors(id)
            .find(|&s| self.scopes[s].is_function())
            .unwrap_or(ROOT)
    }
}

/// Map each `)` token index to its matching `(` token index.
fn match_parens(tokens: &[Token]) -> Vec<Option<usize>> {
    let mut matches = vec![None; tokens.len()];
    let mut open = Vec::new();
    for (i, token) in tokens.iter().enumerate() {
        if token.is_punct('(') {
            open.push(i);
        } else if token.is_punct(')') {
            matches[i] = open.pop();
        }
    }
    matches
}

fn classify_brace(src: &str, tokens: &[Token], parens: &[Option<usize>], brace: usize) -> ScopeKind {
    let Some(prev) = brace.checked_sub(1) else {
        return ScopeKind::Block;
    };
    if tokens[prev].kind == TokenKind::Arrow {
        return ScopeKind::Function {
            name: arrow_name(src, tokens, parens, prev),
            params: arrow_params(src, tokens, parens, prev),
        };
    }

    let close_paren = if tokens[prev].is_punct(')') {
        Some(prev)
    } else {
        return_type_paren(tokens, prev)
    };
    let Some(open) = close_paren.and_then(|c| parens[c]) else {
        return ScopeKind::Block;
    };

    let mut callee = match open.checked_sub(1) {
        Some(idx) => idx,
        None => return ScopeKind::Block,
    };
    // Skip generic parameters: `function f<T>(...)`
    if tokens[callee].is_punct('>') {
        match skip_back_angles(tokens, callee) {
            Some(idx) => callee = idx,
            None => return ScopeKind::Block,
        }
    }

    let token = &tokens[callee];
    if token.kind != TokenKind::Ident {
        return ScopeKind::Block;
    }
    let word = token.text(src);
    if CONTROL_KEYWORDS.contains(&word) {
        return ScopeKind::Block;
    }
    let params = idents_between(src, tokens, open, close_paren.unwrap_or(open));
    if word == "function" {
        return ScopeKind::Function {
            name: assigned_name(src, tokens, callee),
            params,
        };
    }
    // Named function declaration or method shorthand
    ScopeKind::Function {
        name: Some(word.to_string()),
        params,
    }
}

fn idents_between(src: &str, tokens: &[Token], open: usize, close: usize) -> Vec<String> {
    tokens[open..=close.max(open)]
        .iter()
        .filter(|t| t.kind == TokenKind::Ident)
        .map(|t| t.text(src).to_string())
        .collect()
}

fn arrow_params(src: &str, tokens: &[Token], parens: &[Option<usize>], arrow: usize) -> Vec<String> {
    let Some(before) = arrow.checked_sub(1) else {
        return Vec::new();
    };
    let close = if tokens[before].is_punct(')') {
        Some(before)
    } else {
        return_type_paren(tokens, before)
    };
    match close.and_then(|c| parens[c].map(|o| (o, c))) {
        Some((open, close)) => idents_between(src, tokens, open, close),
        None if tokens[before].kind == TokenKind::Ident => vec![tokens[before].text(src).to_string()],
        None => Vec::new(),
    }
}

/// For `(...): Type {`, find the `)` before the return-type annotation.
fn return_type_paren(tokens: &[Token], from: usize) -> Option<usize> {
    let mut i = from;
    for _ in 0..64 {
        let token = &tokens[i];
        let type_like = match &token.kind {
            TokenKind::Ident | TokenKind::Number | TokenKind::Str { .. } => true,
            TokenKind::Punct(c) => matches!(c, '.' | '|' | '&' | '<' | '>' | '[' | ']' | ',' | '?'),
            _ => false,
        };
        if token.is_punct(':') {
            let before = i.checked_sub(1)?;
            return tokens[before].is_punct(')').then_some(before);
        }
        if !type_like {
            return None;
        }
        i = i.checked_sub(1)?;
    }
    None
}

fn skip_back_angles(tokens: &[Token], close: usize) -> Option<usize> {
    let mut depth = 0usize;
    let mut i = close;
    loop {
        if tokens[i].is_punct('>') {
            depth += 1;
        } else if tokens[i].is_punct('<') {
            depth -= 1;
            if depth == 0 {
                return i.checked_sub(1);
            }
        }
        i = i.checked_sub(1)?;
    }
}

/// Name of an arrow function from its assignment or property context:
/// `const Foo = (...) =>`, `const Foo = memo((...) =>`, `foo: async x =>`.
fn arrow_name(src: &str, tokens: &[Token], parens: &[Option<usize>], arrow: usize) -> Option<String> {
    let before_arrow = arrow.checked_sub(1)?;
    let mut params_start = if tokens[before_arrow].is_punct(')') {
        parens[before_arrow]?
    } else {
        before_arrow
    };
    // Skip a return-type annotation `(): Foo =>`
    if !tokens[before_arrow].is_punct(')') {
        if let Some(paren) = return_type_paren(tokens, before_arrow) {
            params_start = parens[paren]?;
        }
    }
    assigned_name(src, tokens, params_start)
}

/// Walk back from the start of a function expression to the name it is
/// bound to, looking through `async` and wrapper calls like `memo(`.
fn assigned_name(src: &str, tokens: &[Token], start: usize) -> Option<String> {
    let mut i = start.checked_sub(1)?;
    if tokens[start].is_ident(src, "function") {
        if let Some(next) = tokens.get(start + 1) {
            if next.kind == TokenKind::Ident {
                return Some(next.text(src).to_string());
            }
        }
    }
    for _ in 0..8 {
        let token = &tokens[i];
        if token.is_ident(src, "async") || token.is_punct('(') {
            i = i.checked_sub(1)?;
            continue;
        }
        if token.is_punct('=') || token.is_punct(':') {
            let name = &tokens[i.checked_sub(1)?];
            return (name.kind == TokenKind::Ident).then(|| name.text(src).to_string());
        }
        if token.kind == TokenKind::Ident || token.is_punct('.') {
            // wrapper callee such as `React.memo`
            i = i.checked_sub(1)?;
            continue;
        }
        return None;
    }
    None
}
