#![forbid(unsafe_code)]
#![allow(unused_assignments)]

use logos::Logos;
use miette::Diagnostic;
use sharpc_ast::{Span, span_between};
use thiserror::Error;
use tracing::trace;

use crate::token::{
    BracketKind, Category, CommentKind, Kind, LiteralKind, SpaceKind, Token, TokenId,
    context_keyword, keyword,
};

#[derive(Debug, Error, Diagnostic)]
#[error("lex error: {message}")]
#[diagnostic(code(sharpc::lex))]
#[allow(unused_assignments)]
pub struct LexError {
    pub message: String,
    #[label]
    pub span: Span,
}

#[derive(Logos, Debug, Clone, Copy, PartialEq)]
enum RawToken {
    #[regex(r"[A-Za-z0-9_]+")]
    Word,

    #[regex(r"\r\n|\r|\n")]
    LineBreak,

    #[regex(r"[ \t\x0B\x0C]+")]
    Space,

    #[token(".")]
    #[token("..")]
    #[token(";")]
    #[token(",")]
    #[token("(")]
    #[token(")")]
    #[token("{")]
    #[token("}")]
    #[token("?")]
    #[token(":")]
    #[token("::")]
    #[token("=")]
    #[token("+")]
    #[token("+=")]
    #[token("++")]
    #[token("-")]
    #[token("-=")]
    #[token("--")]
    #[token("*")]
    #[token("*=")]
    #[token("/")]
    #[token("/=")]
    #[token("%")]
    #[token("%=")]
    #[token("??")]
    #[token("??=")]
    #[token("?.")]
    #[token("!.")]
    #[token("<<")]
    #[token("<<=")]
    #[token(">>")]
    #[token(">>=")]
    #[token(">>>")]
    #[token(">>>=")]
    #[token("&")]
    #[token("&=")]
    #[token("^")]
    #[token("^=")]
    #[token("|")]
    #[token("|=")]
    #[token("==")]
    #[token("!=")]
    #[token("<=")]
    #[token(">=")]
    #[token("<")]
    #[token(">")]
    #[token("&&")]
    #[token("||")]
    #[token("=>")]
    #[token("!")]
    #[token("~")]
    #[token("#")]
    #[token("@")]
    #[token("$")]
    Operator,
}

/// Operators that end a quoteless string or char literal when they follow it.
const QUOTELESS_TERMINATORS: [&str; 8] = ["+", "==", "!=", "<=", ">=", "=>", "\r", "\n"];

/// One scanned token before it receives an id.
struct Scanned {
    len: usize,
    text: String,
    category: Category,
    kind: Option<Kind>,
}

impl Scanned {
    fn verbatim(rest: &str, len: usize, category: Category, kind: Kind) -> Self {
        Self {
            len,
            text: rest[..len].to_string(),
            category,
            kind: Some(kind),
        }
    }
}

pub struct Lexer<'a> {
    src: &'a str,
}

impl<'a> Lexer<'a> {
    pub fn new(src: &'a str) -> Self {
        Self { src }
    }

    /// Splits the whole source into classified tokens.
    ///
    /// Token spans partition the input: every byte belongs to exactly one token.
    pub fn lex(&self) -> Result<Vec<Token>, LexError> {
        let mut tokens = Vec::new();
        let mut next_id = 0u32;
        let mut pos = 0usize;

        while pos < self.src.len() {
            let rest = &self.src[pos..];
            let scanned = self.scan_at(pos, rest)?;
            debug_assert!(scanned.len > 0);
            tokens.push(Token::new(
                TokenId(next_id),
                scanned.text,
                pos,
                pos + scanned.len,
                scanned.category,
                scanned.kind,
            ));
            next_id += 1;
            pos += scanned.len;
        }

        trace!(count = tokens.len(), "lexed source");
        Ok(tokens)
    }

    fn scan_at(&self, pos: usize, rest: &str) -> Result<Scanned, LexError> {
        let error = |offset: usize, len: usize, message: String| LexError {
            message,
            span: span_between(pos + offset, pos + offset + len),
        };

        if let Some(s) = scan_comment(rest).map_err(|m| error(0, rest.len(), m))? {
            return Ok(s);
        }
        if let Some(s) = scan_string(rest) {
            return Ok(s);
        }
        if let Some(s) = scan_raw_string(rest).map_err(|m| error(0, rest.len(), m))? {
            return Ok(s);
        }
        if let Some(s) = scan_char(rest) {
            return Ok(s);
        }

        let mut lex = RawToken::lexer(rest);
        let raw = match lex.next() {
            Some(Ok(raw)) => raw,
            _ => {
                let ch = rest.chars().next().unwrap_or('\0');
                return Err(error(
                    0,
                    ch.len_utf8(),
                    format!("Unexpected character: {ch}"),
                ));
            }
        };
        let len = lex.span().end;

        let scanned = match raw {
            RawToken::Word => {
                let word = &rest[..len];
                if word.as_bytes()[0].is_ascii_digit() {
                    let len = number_len(rest, len)
                        .map_err(|offset| error(offset, 1, "Unexpected decimal point".into()))?;
                    Scanned::verbatim(
                        rest,
                        len,
                        Category::NumberLiteral,
                        Kind::Literal(LiteralKind::Number),
                    )
                } else if let Some(kind) = keyword(word) {
                    Scanned::verbatim(rest, len, Category::Keyword, kind)
                } else if let Some(kind) = context_keyword(word) {
                    Scanned::verbatim(rest, len, Category::ContextKeyword, kind)
                } else {
                    Scanned {
                        len,
                        text: word.to_string(),
                        category: Category::Identifier,
                        kind: None,
                    }
                }
            }
            RawToken::LineBreak => Scanned::verbatim(
                rest,
                len,
                Category::LineBreak,
                Kind::Space(SpaceKind::LineBreak),
            ),
            RawToken::Space => {
                Scanned::verbatim(rest, len, Category::Space, Kind::Space(SpaceKind::Space))
            }
            RawToken::Operator => {
                let text = &rest[..len];
                let kind = match text {
                    "(" | ")" => Some(Kind::Bracket(BracketKind::Parenthesis)),
                    "{" | "}" => Some(Kind::Bracket(BracketKind::Brace)),
                    _ => None,
                };
                Scanned {
                    len,
                    text: text.to_string(),
                    category: Category::Operator,
                    kind,
                }
            }
        };
        Ok(scanned)
    }
}

fn word_len(s: &str) -> usize {
    s.bytes()
        .take_while(|b| b.is_ascii_alphanumeric() || *b == b'_')
        .count()
}

fn starts_with_digit(s: &str) -> bool {
    s.as_bytes().first().is_some_and(u8::is_ascii_digit)
}

/// Extends `1e` / `1.5e` with a signed exponent (`1e-3`).
fn exponent_len(rest: &str, end: usize, word_start: usize) -> usize {
    let word = &rest[word_start..end];
    let mantissa_ok = word.len() > 1
        && word.ends_with(['e', 'E'])
        && word[..word.len() - 1]
            .bytes()
            .all(|b| b.is_ascii_digit() || b == b'_');
    if !mantissa_ok {
        return end;
    }
    let after = &rest[end..];
    if after.starts_with(['+', '-']) && starts_with_digit(&after[1..]) {
        end + 1 + word_len(&after[1..])
    } else {
        end
    }
}

/// Length of a number literal starting at a digit word of `word_end` bytes.
///
/// Errors with the offset of a second decimal point.
fn number_len(rest: &str, word_end: usize) -> Result<usize, usize> {
    let mut end = exponent_len(rest, word_end, 0);
    if rest[end..].starts_with('.') && starts_with_digit(&rest[end + 1..]) {
        let fraction_start = end + 1;
        end = fraction_start + word_len(&rest[fraction_start..]);
        end = exponent_len(rest, end, fraction_start);
        if rest[end..].starts_with('.') && starts_with_digit(&rest[end + 1..]) {
            return Err(end);
        }
    }
    Ok(end)
}

fn scan_comment(rest: &str) -> Result<Option<Scanned>, String> {
    if rest.starts_with("//") {
        let len = rest.find(['\r', '\n']).unwrap_or(rest.len());
        return Ok(Some(Scanned::verbatim(
            rest,
            len,
            Category::Comment,
            Kind::Comment(CommentKind::Line),
        )));
    }
    if rest.starts_with("/*") {
        let Some(close) = rest[2..].find("*/") else {
            return Err("Unterminated block comment".to_string());
        };
        return Ok(Some(Scanned::verbatim(
            rest,
            close + 4,
            Category::Comment,
            Kind::Comment(CommentKind::Block),
        )));
    }
    Ok(None)
}

fn starts_with_terminator(bytes: &[u8]) -> bool {
    QUOTELESS_TERMINATORS
        .iter()
        .any(|t| bytes.starts_with(t.as_bytes()))
}

fn quote_run(s: &str) -> usize {
    s.bytes().take_while(|b| *b == b'"').count()
}

/// End of a literal that is missing its closing delimiter.
///
/// Stops before an unescaped `;` or `,`, before optional spaces followed by one of
/// the terminator operators or a line break, or at the end of input.
fn quoteless_end(rest: &str, from: usize, escapes: bool) -> usize {
    let bytes = rest.as_bytes();
    let mut p = from;
    while p < bytes.len() {
        let c = bytes[p];
        if escapes && c == b'\\' {
            p = (p + 2).min(bytes.len());
            continue;
        }
        if c == b';' || c == b',' {
            return p;
        }
        let spaces = bytes[p..].iter().take_while(|b| **b == b' ').count();
        let after_spaces = &bytes[p + spaces..];
        if after_spaces.is_empty() || starts_with_terminator(after_spaces) {
            return p;
        }
        p += 1;
    }
    bytes.len()
}

fn scan_string(rest: &str) -> Option<Scanned> {
    let (prefix, verbatim) = if rest.starts_with("$@\"") || rest.starts_with("@$\"") {
        (2, true)
    } else if rest.starts_with("@\"") {
        (1, true)
    } else if rest.starts_with("$\"") {
        (1, false)
    } else if rest.starts_with('"') {
        (0, false)
    } else {
        return None;
    };
    if quote_run(&rest[prefix..]) >= 3 {
        return None;
    }

    let bytes = rest.as_bytes();
    let body = prefix + 1;
    let mut i = body;
    let mut closed = None;
    while i < bytes.len() {
        match bytes[i] {
            b'"' if verbatim && bytes.get(i + 1) == Some(&b'"') => i += 2,
            b'"' => {
                closed = Some(i + 1);
                break;
            }
            b'\\' if !verbatim => {
                if matches!(bytes.get(i + 1), Some(b'\r' | b'\n') | None) {
                    break;
                }
                i += 2;
            }
            b'\r' | b'\n' if !verbatim => break,
            _ => i += 1,
        }
    }

    let scanned = match closed {
        Some(len) => Scanned::verbatim(
            rest,
            len,
            Category::StringLiteral,
            Kind::Literal(LiteralKind::String),
        ),
        None => {
            let len = quoteless_end(rest, body, !verbatim);
            Scanned {
                len,
                text: format!("{}\"", &rest[..len]),
                category: Category::StringLiteral,
                kind: Some(Kind::Literal(LiteralKind::String)),
            }
        }
    };
    Some(scanned)
}

fn scan_raw_string(rest: &str) -> Result<Option<Scanned>, String> {
    let bytes = rest.as_bytes();
    let mut i = 0;
    if bytes.first() == Some(&b'@') {
        i = 1;
        while bytes.get(i) == Some(&b'$') {
            i += 1;
        }
    } else {
        while bytes.get(i) == Some(&b'$') {
            i += 1;
        }
        if bytes.get(i) == Some(&b'@') {
            i += 1;
        }
    }
    let prefix = &rest[..i];

    if bytes.get(i) == Some(&b'`') {
        let mut j = i + 1;
        let close = loop {
            match bytes.get(j) {
                None => return Ok(None),
                Some(b'`') if bytes[j - 1] != b'\\' => break j,
                Some(_) => j += 1,
            }
        };
        let content = rest[i + 1..close].replace("\\`", "`");
        let mut count = 3;
        while content.contains(&"\"".repeat(count)) {
            count += 1;
        }
        let quotes = "\"".repeat(count);
        return Ok(Some(Scanned {
            len: close + 1,
            text: format!("{prefix}{quotes}{content}{quotes}"),
            category: Category::RawStringLiteral,
            kind: Some(Kind::Literal(LiteralKind::RawString)),
        }));
    }

    let count = quote_run(&rest[i..]);
    if count < 3 {
        return Ok(None);
    }
    let mut p = i + count;
    while p + count <= bytes.len() {
        let run_closes = bytes[p..p + count].iter().all(|b| *b == b'"')
            && bytes.get(p + count) != Some(&b'"');
        if run_closes {
            return Ok(Some(Scanned::verbatim(
                rest,
                p + count,
                Category::RawStringLiteral,
                Kind::Literal(LiteralKind::RawString),
            )));
        }
        p += 1;
    }
    Err("Unterminated raw string literal".to_string())
}

fn scan_char(rest: &str) -> Option<Scanned> {
    let bytes = rest.as_bytes();
    if bytes.first() != Some(&b'\'') || matches!(bytes.get(1), None | Some(b' ' | b'\r' | b'\n')) {
        return None;
    }

    let mut i = 1;
    loop {
        let Some(&c) = bytes.get(i) else {
            break;
        };
        if c == b'\\' {
            i = (i + 2).min(bytes.len());
            continue;
        }
        if i > 1 {
            if c == b'\'' {
                return Some(Scanned::verbatim(
                    rest,
                    i + 1,
                    Category::CharLiteral,
                    Kind::Literal(LiteralKind::Char),
                ));
            }
            if matches!(c, b' ' | b',' | b';') || starts_with_terminator(&bytes[i..]) {
                break;
            }
        }
        i += 1;
    }

    Some(Scanned {
        len: i,
        text: format!("{}'", &rest[..i]),
        category: Category::CharLiteral,
        kind: Some(Kind::Literal(LiteralKind::Char)),
    })
}
