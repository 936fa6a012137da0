// SPDX-License-Identifier: PMPL-1.0-or-later

//! Tolerant tokenizer for JavaScript/TypeScript source
//!
//! Produces just enough structure for scope analysis: identifiers, string
//! literals with their decoded value, braces, `=>` and single-character
//! punctuation. Comments, regex literals and template text are skipped;
//! `${...}` interpolations are lexed as ordinary code so calls inside them
//! are seen and their braces do not unbalance the scope tree.
//!
//! The lexer never fails. Unterminated `'`/`"` strings (apostrophes in
//! markup text, mostly) degrade to a stray punctuation token.

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TokenKind {
    Ident,
    /// String literal, or a template literal without interpolation
    Str { quote: char, value: String },
    /// A text chunk of an interpolated template literal
    Template,
    Number,
    Arrow,
    OpenBrace,
    CloseBrace,
    Punct(char),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Token {
    pub kind: TokenKind,
    /// Byte offset of the first character
    pub start: usize,
    /// Byte offset one past the last character
    pub end: usize,
}

impl Token {
    pub fn text<'a>(&self, src: &'a str) -> &'a str {
        &src[self.start..self.end]
    }

    pub fn is_punct(&self, c: char) -> bool {
        self.kind == TokenKind::Punct(c)
    }

    pub fn is_ident(&self, src: &str, word: &str) -> bool {
        self.kind == TokenKind::Ident && self.text(src) == word
    }

    pub fn str_value(&self) -> Option<&str> {
        match &self.kind {
            TokenKind::Str { value, .. } => Some(value),
            _ => None,
        }
    }
}

/// Keywords after which a `/` starts a regex literal rather than a division.
const REGEX_PREFIX_KEYWORDS: &[&str] = &[
    "return",
    "typeof",
    "instanceof",
    "in",
    "of",
    "new",
    "delete",
    "void",
    "throw",
    "case",
    "do",
    "else",
    "yield",
    "await",
];

pub fn tokenize(src: &str) -> Vec<Token> {
    Lexer::new(src).run()
}

struct Lexer<'a> {
    src: &'a str,
    bytes: &'a [u8],
    pos: usize,
    tokens: Vec<Token>,
    /// One entry per open `${`, holding the brace depth inside it
    interpolations: Vec<usize>,
}

impl<'a> Lexer<'a> {
    fn new(src: &'a str) -> Self {
        Self {
            src,
            bytes: src.as_bytes(),
            pos: 0,
            tokens: Vec::new(),
            interpolations: Vec::new(),
        }
    }

    fn run(mut self) -> Vec<Token> {
        while let Some(c) = self.peek() {
            match c {
                c if c.is_whitespace() => self.bump(c),
                '/' if self.peek_at(1) == Some('/') => self.skip_line_comment(),
                '/' if self.peek_at(1) == Some('*') => self.skip_block_comment(),
                '/' if self.regex_allowed() => self.lex_regex(),
                '\'' | '"' => self.lex_string(c),
                '`' => {
                    let start = self.pos;
                    self.pos += 1;
                    self.lex_template_from(start);
                }
                '{' => {
                    if let Some(depth) = self.interpolations.last_mut() {
                        *depth += 1;
                    }
                    self.push_single(TokenKind::OpenBrace, 1);
                }
                '}' => match self.interpolations.last_mut() {
                    Some(0) => {
                        self.interpolations.pop();
                        let start = self.pos;
                        self.pos += 1;
                        self.lex_template_from(start);
                    }
                    Some(depth) => {
                        *depth -= 1;
                        self.push_single(TokenKind::CloseBrace, 1);
                    }
                    None => self.push_single(TokenKind::CloseBrace, 1),
                },
                '=' if self.peek_at(1) == Some('>') => self.push_single(TokenKind::Arrow, 2),
                c if is_ident_start(c) => self.lex_ident(),
                c if c.is_ascii_digit() => self.lex_number(),
                c => self.push_single(TokenKind::Punct(c), c.len_utf8()),
            }
        }
        self.tokens
    }

    fn peek(&self) -> Option<char> {
        self.src[self.pos..].chars().next()
    }

    fn peek_at(&self, ahead: usize) -> Option<char> {
        self.src[self.pos..].chars().nth(ahead)
    }

    fn bump(&mut self, c: char) {
        self.pos += c.len_utf8();
    }

    fn push(&mut self, kind: TokenKind, start: usize, end: usize) {
        self.tokens.push(Token { kind, start, end });
    }

    fn push_single(&mut self, kind: TokenKind, len: usize) {
        let start = self.pos;
        self.pos += len;
        self.push(kind, start, self.pos);
    }

    fn skip_line_comment(&mut self) {
        match self.src[self.pos..].find('\n') {
            Some(idx) => self.pos += idx,
            None => self.pos = self.src.len(),
        }
    }

    fn skip_block_comment(&mut self) {
        match self.src[self.pos + 2..].find("*/") {
            Some(idx) => self.pos += idx + 4,
            None => self.pos = self.src.len(),
        }
    }

    fn regex_allowed(&self) -> bool {
        if self.peek_at(1) == Some('>') {
            // `/>` closes a markup element
            return false;
        }
        match self.tokens.last() {
            None => true,
            Some(tok) => match &tok.kind {
                TokenKind::Punct(c) => !matches!(c, ')' | ']' | '<' | '>'),
                TokenKind::Arrow | TokenKind::OpenBrace => true,
                TokenKind::Ident => REGEX_PREFIX_KEYWORDS.contains(&tok.text(self.src)),
                _ => false,
            },
        }
    }

    fn lex_regex(&mut self) {
        let start = self.pos;
        let mut i = self.pos + 1;
        let mut in_class = false;
        while i < self.bytes.len() {
            match self.bytes[i] {
                b'\\' => i += 2,
                b'\n' => break,
                b'[' => {
                    in_class = true;
                    i += 1;
                }
                b']' => {
                    in_class = false;
                    i += 1;
                }
                b'/' if !in_class => {
                    i += 1;
                    while i < self.bytes.len() && self.bytes[i].is_ascii_alphabetic() {
                        i += 1;
                    }
                    self.pos = i;
                    return;
                }
                _ => i += 1,
            }
        }
        // Not a regex after all: keep the slash as punctuation.
        self.pos = start;
        self.push_single(TokenKind::Punct('/'), 1);
    }

    fn lex_string(&mut self, quote: char) {
        let start = self.pos;
        let glued = start > 0 && is_ident_part(self.src[..start].chars().next_back().unwrap_or(' '));
        if !glued {
            if let Some((end, value)) = scan_quoted(self.src, start, quote) {
                self.pos = end;
                self.push(TokenKind::Str { quote, value }, start, end);
                return;
            }
        }
        self.push_single(TokenKind::Punct(quote), 1);
    }

    /// Scan template text starting at `self.pos`; `start` is where the
    /// chunk began (the backtick or the `}` closing an interpolation).
    fn lex_template_from(&mut self, start: usize) {
        let opened_with_backtick = self.bytes[start] == b'`';
        let mut value = String::new();
        let mut chars = self.src[self.pos..].char_indices();
        while let Some((idx, c)) = chars.next() {
            match c {
                '\\' => {
                    if let Some((_, escaped)) = chars.next() {
                        value.push(unescape(escaped));
                    }
                }
                '`' => {
                    let end = self.pos + idx + 1;
                    self.pos = end;
                    if opened_with_backtick {
                        self.push(TokenKind::Str { quote: '`', value }, start, end);
                    } else {
                        self.push(TokenKind::Template, start, end);
                    }
                    return;
                }
                '$' if self.src[self.pos + idx + 1..].starts_with('{') => {
                    let end = self.pos + idx + 2;
                    self.pos = end;
                    self.push(TokenKind::Template, start, end);
                    self.interpolations.push(0);
                    return;
                }
                c => value.push(c),
            }
        }
        self.pos = self.src.len();
        self.push(TokenKind::Template, start, self.pos);
    }

    fn lex_ident(&mut self) {
        let start = self.pos;
        let len: usize = self.src[start..]
            .chars()
            .take_while(|c| is_ident_part(*c))
            .map(char::len_utf8)
            .sum();
        self.pos += len;
        self.push(TokenKind::Ident, start, self.pos);
    }

    fn lex_number(&mut self) {
        let start = self.pos;
        let len = self.bytes[start..]
            .iter()
            .take_while(|b| b.is_ascii_alphanumeric() || **b == b'.' || **b == b'_')
            .count();
        self.pos += len;
        self.push(TokenKind::Number, start, self.pos);
    }
}

/// Scan a single-line quoted string starting at the opening quote.
/// Returns the end offset and decoded value, or `None` if unterminated.
fn scan_quoted(src: &str, start: usize, quote: char) -> Option<(usize, String)> {
    let mut value = String::new();
    let mut chars = src[start + 1..].char_indices();
    while let Some((idx, c)) = chars.next() {
        match c {
            '\\' => match chars.next() {
                Some((_, '\n')) => {}
                Some((_, escaped)) => value.push(unescape(escaped)),
                None => return None,
            },
            '\n' => return None,
            c if c == quote => return Some((start + 1 + idx + 1, value)),
            c => value.push(c),
        }
    }
    None
}

fn unescape(c: char) -> char {
    match c {
        'n' => '\n',
        't' => '\t',
        'r' => '\r',
        '0' => '\0',
        other => other,
    }
}

fn is_ident_start(c: char) -> bool {
    c.is_alphabetic() || c == '_' || c == '$'
}

fn is_ident_part(c: char) -> bool {
    c.is_alphanumeric() || c == '_' || c == '$'
}
