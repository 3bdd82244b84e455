#![forbid(unsafe_code)]

//! Output buffer with deferred spacing.
//!
//! Converters append pieces tagged with a spacing class and may splice text in
//! at earlier marks (tuple and lambda parentheses). Spaces between pieces are
//! decided once, in [`Emitter::finish`].

use crate::ConvertConfig;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum Spacing {
    /// Pre-formatted text; never receives spaces from the spacing pass.
    Raw,
    /// Names, literals.
    Word,
    /// Keywords: like words, but spaced before a following `(`.
    Keyword,
    /// Binary and assignment operators: spaced on both sides.
    Binary,
    /// `,` and `;`: spaced after only.
    Trailing,
    /// `(`: never spaced after.
    Open,
    /// `)`, postfix `++`/`--`: never spaced before.
    Close,
    /// `.`, `?.`, `::`: never spaced.
    Dot,
    /// Unary prefix operators.
    Prefix,
    /// Closing `}` inside an expression: spaced before.
    Leading,
}

fn needs_space(prev: Spacing, next: Spacing) -> bool {
    use Spacing::*;
    match (prev, next) {
        (Raw, _) | (_, Raw) => false,
        (_, Trailing | Close | Dot) => false,
        (Open | Dot | Prefix, _) => false,
        (Binary | Trailing, _) => true,
        (_, Binary | Leading) => true,
        (Keyword, Open) => true,
        (_, Open) => false,
        (_, Prefix | Word | Keyword) => true,
    }
}

/// Position in the piece buffer.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord)]
pub(crate) struct Mark(usize);

#[derive(Clone, Debug)]
struct Piece {
    text: String,
    spacing: Spacing,
}

#[derive(Clone, Debug)]
pub(crate) struct Emitter {
    pieces: Vec<Piece>,
    indent_unit: String,
    newline: &'static str,
}

impl Emitter {
    pub(crate) fn new(config: &ConvertConfig) -> Self {
        Self {
            pieces: Vec::new(),
            indent_unit: " ".repeat(config.indent_width),
            newline: config.line_ending.as_str(),
        }
    }

    pub(crate) fn newline_str(&self) -> &'static str {
        self.newline
    }

    pub(crate) fn push(&mut self, text: impl Into<String>, spacing: Spacing) {
        self.pieces.push(Piece {
            text: text.into(),
            spacing,
        });
    }

    pub(crate) fn raw(&mut self, text: impl Into<String>) {
        self.push(text, Spacing::Raw);
    }

    pub(crate) fn word(&mut self, text: impl Into<String>) {
        self.push(text, Spacing::Word);
    }

    pub(crate) fn keyword(&mut self, text: impl Into<String>) {
        self.push(text, Spacing::Keyword);
    }

    pub(crate) fn indent(&mut self, level: usize) {
        if level > 0 {
            let text = self.indent_unit.repeat(level);
            self.raw(text);
        }
    }

    pub(crate) fn newline(&mut self) {
        self.raw(self.newline);
    }

    /// Emits `text` followed by a line break.
    pub(crate) fn line(&mut self, text: impl Into<String>) {
        let mut text = text.into();
        text.push_str(self.newline);
        self.raw(text);
    }

    /// Emits an operator, choosing the unary or postfix class from what precedes it.
    pub(crate) fn operator(&mut self, text: &str) {
        let after_operand = matches!(
            self.last_spacing(),
            Some(Spacing::Word | Spacing::Close | Spacing::Leading)
        );
        let spacing = match text {
            "." | "?." | "!." | "::" | ".." => Spacing::Dot,
            "," | ";" => Spacing::Trailing,
            "(" | "[" => Spacing::Open,
            ")" | "]" => Spacing::Close,
            "{" => Spacing::Binary,
            "}" => Spacing::Leading,
            "!" | "$" | "@" => Spacing::Prefix,
            "++" | "--" if after_operand => Spacing::Close,
            "++" | "--" => Spacing::Prefix,
            "+" | "-" | "*" | "&" if !after_operand => Spacing::Prefix,
            _ => Spacing::Binary,
        };
        self.push(text, spacing);
    }

    pub(crate) fn mark(&self) -> Mark {
        Mark(self.pieces.len())
    }

    pub(crate) fn insert(&mut self, at: Mark, text: impl Into<String>, spacing: Spacing) {
        let at = at.0.min(self.pieces.len());
        self.pieces.insert(
            at,
            Piece {
                text: text.into(),
                spacing,
            },
        );
    }

    /// Drops every piece emitted since `mark`.
    pub(crate) fn truncate(&mut self, mark: Mark) {
        self.pieces.truncate(mark.0);
    }

    pub(crate) fn last_spacing(&self) -> Option<Spacing> {
        self.pieces.last().map(|p| p.spacing)
    }

    pub(crate) fn finish(self) -> String {
        render(&self.pieces)
    }
}

fn render(pieces: &[Piece]) -> String {
    let mut out = String::with_capacity(pieces.iter().map(|p| p.text.len() + 1).sum());
    let mut prev: Option<Spacing> = None;
    for piece in pieces.iter().filter(|p| !p.text.is_empty()) {
        if prev.is_some_and(|prev| needs_space(prev, piece.spacing)) {
            out.push(' ');
        }
        out.push_str(&piece.text);
        prev = Some(piece.spacing);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn emitter() -> Emitter {
        Emitter::new(&ConvertConfig::default())
    }

    #[test]
    fn spacing_pass_separates_words_and_binary_operators() {
        let mut e = emitter();
        e.raw("var x = ");
        e.word("a");
        e.operator("+");
        e.word("f");
        e.operator("(");
        e.word("b");
        e.operator(",");
        e.operator("-");
        e.word("1");
        e.operator(")");
        e.operator(".");
        e.word("Length");
        e.raw(";");
        assert_eq!(e.finish(), "var x = a + f(b, -1).Length;");
    }

    #[test]
    fn postfix_and_prefix_increments() {
        let mut e = emitter();
        e.word("i");
        e.operator("++");
        e.operator("+");
        e.operator("++");
        e.word("j");
        assert_eq!(e.finish(), "i++ + ++j");
    }

    #[test]
    fn insert_splices_at_an_earlier_mark() {
        let mut e = emitter();
        let start = e.mark();
        e.word("a");
        e.operator(",");
        e.word("b");
        e.insert(start, "(", Spacing::Open);
        e.operator(")");
        assert_eq!(e.finish(), "(a, b)");
    }

    #[test]
    fn keyword_before_negation_keeps_its_space() {
        let mut e = emitter();
        e.keyword("return");
        e.operator("!");
        e.word("done");
        e.operator("||");
        e.keyword("await");
        e.operator("(");
        e.word("t");
        e.operator(")");
        assert_eq!(e.finish(), "return !done || await (t)");
    }
}
