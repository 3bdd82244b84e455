#![forbid(unsafe_code)]

use sharpc_lex::{Kind, KeywordKind, OperatorKind, Token};

use crate::convert::{Converter, Scope};
use crate::error::ConvertError;
use crate::expr::Mode;
use crate::scan::{find_top_level, matching_close, next_significant};

/// One `pattern => body` arm; positions index the enclosing token slice.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) struct Arm {
    pub(crate) pattern: (usize, usize),
    pub(crate) arrow: usize,
    /// Body range, excluding the separator that ends it.
    pub(crate) body: (usize, usize),
    /// Set when the body is a `{ ... }` block; `body` is then the inside.
    pub(crate) block: bool,
}

impl Arm {
    pub(crate) fn is_default(&self, tokens: &[&Token]) -> bool {
        let pattern = &tokens[self.pattern.0..self.pattern.1];
        let mut words = pattern.iter().filter(|t| !t.is_trivia());
        matches!((words.next(), words.next()), (Some(t), None) if t.text == "_")
    }
}

/// Position of the `{` opening a switch body and the `}` closing it.
pub(crate) fn switch_braces(
    tokens: &[&Token],
    keyword: usize,
    to: usize,
) -> Result<(usize, usize), ConvertError> {
    let switch = tokens[keyword];
    let open = find_top_level(&tokens[..to], keyword + 1, |t| t.is_op("{"))
        .ok_or_else(|| ConvertError::syntax(switch, "Missing left brace"))?;
    if next_significant(&tokens[..open], keyword + 1).is_none() {
        return Err(ConvertError::syntax(switch, "Missing switch subject"));
    }
    let close = matching_close(&tokens[..to], open)
        .ok_or_else(|| ConvertError::syntax(tokens[open], "Missing right brace"))?;
    Ok((open, close))
}

/// Splits `tokens[from..to]` into arms.
///
/// Expression bodies end at a top-level `,` or `;`; with `blocks`, a body may
/// also be a `{ ... }` block.
pub(crate) fn split_arms(
    tokens: &[&Token],
    from: usize,
    to: usize,
    blocks: bool,
) -> Result<Vec<Arm>, ConvertError> {
    let range = &tokens[..to];
    let mut arms = Vec::new();
    let mut i = from;
    while let Some(start) = next_significant(range, i) {
        let first = tokens[start];
        if first.is_op(",") || first.is_op(";") {
            i = start + 1;
            continue;
        }
        let arrow = find_top_level(range, start, |t| t.is_op("=>"))
            .ok_or_else(|| ConvertError::syntax(first, "Missing => in switch arm"))?;
        tokens[arrow].set_kind(Kind::Operator(OperatorKind::Lambda));
        if next_significant(&tokens[..arrow], start).is_none_or(|p| p >= arrow) {
            return Err(ConvertError::syntax(tokens[arrow], "Missing pattern"));
        }
        let body_start = next_significant(range, arrow + 1)
            .ok_or_else(|| ConvertError::syntax(tokens[arrow], "Missing switch arm body"))?;

        if blocks && tokens[body_start].is_op("{") {
            let close = matching_close(range, body_start)
                .ok_or_else(|| ConvertError::syntax(tokens[body_start], "Missing right brace"))?;
            arms.push(Arm {
                pattern: (start, arrow),
                arrow,
                body: (body_start + 1, close),
                block: true,
            });
            i = close + 1;
            continue;
        }

        let end = find_top_level(range, body_start, |t| t.is_op(",") || t.is_op(";")).unwrap_or(to);
        if end == body_start {
            return Err(ConvertError::syntax(tokens[arrow], "Missing switch arm body"));
        }
        arms.push(Arm {
            pattern: (start, arrow),
            arrow,
            body: (body_start, end),
            block: false,
        });
        i = end + 1;
    }
    Ok(arms)
}

impl Converter {
    /// `switch subject { pattern => value, ... }` as `subject switch { ... }`.
    pub(crate) fn convert_switch_expression(
        &mut self,
        tokens: &[&Token],
        at: usize,
        to: usize,
        scope: Scope,
    ) -> Result<usize, ConvertError> {
        tokens[at].set_kind(Kind::Keyword(KeywordKind::BlockWithExpr));
        let (open, close) = switch_braces(tokens, at, to)?;
        let mut scratch = false;
        self.convert_expression(tokens, at + 1, open, Mode::Group, scope, &mut scratch)?;
        self.out.keyword("switch");
        self.out.line(" {");

        for arm in split_arms(tokens, open + 1, close, false)? {
            self.out.indent(scope.indent + 1);
            self.convert_expression(tokens, arm.pattern.0, arm.pattern.1, Mode::Group, scope, &mut scratch)?;
            self.out.operator("=>");
            self.convert_expression(tokens, arm.body.0, arm.body.1, Mode::Group, scope, &mut scratch)?;
            self.out.raw(",");
            self.out.newline();
        }
        self.out.indent(scope.indent);
        self.out.raw("}");
        Ok(close + 1)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::convert;
    use pretty_assertions::assert_eq;
    use sharpc_lex::Lexer;

    #[test]
    fn arms_split_on_commas_and_blocks() {
        let tokens = Lexer::new("1 => a, _ => { b; }").lex().unwrap();
        let refs: Vec<&Token> = tokens.iter().collect();
        let arms = split_arms(&refs, 0, refs.len(), true).unwrap();
        assert_eq!(arms.len(), 2);
        assert!(!arms[0].block);
        assert!(arms[1].block);
        assert!(arms[1].is_default(&refs));
        assert!(!arms[0].is_default(&refs));
    }

    #[test]
    fn switch_expression_puts_subject_first() {
        let src = "fn Name n: int => string {\n  return switch n {\n    1 => \"one\",\n    > 9 => \"many\",\n    _ => \"some\"\n  };\n}";
        assert_eq!(
            convert(src).unwrap(),
            "string Name(int n) {\r\n  return n switch {\r\n    1 => \"one\",\r\n    > 9 => \"many\",\r\n    _ => \"some\",\r\n  };\r\n}\r\n"
        );
    }

    #[test]
    fn switch_expression_requires_arrows() {
        let err = convert("fn F {\n  let x = switch n { 1, 2 };\n}").unwrap_err();
        assert_eq!(err.message(), "Missing => in switch arm");
    }
}
