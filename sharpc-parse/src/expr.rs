#![forbid(unsafe_code)]

//! Right-hand-side converter.
//!
//! Expressions are emitted token by token; the surface sugar (`#`, `~`, method
//! keywords, typed lambdas, `switch`) is rewritten on the way. Tuple and lambda
//! parentheses are spliced in at marks recorded earlier in the same frame.

use sharpc_lex::{Category, Kind, KeywordKind, OperatorKind, Token};
use tracing::trace;

use crate::convert::{Converter, Scope};
use crate::emit::{Mark, Spacing};
use crate::error::ConvertError;
use crate::render::{TypePosition, convert_parameter, convert_type};
use crate::scan::{find_top_level, index_of, is_assignment, matching_close, next_significant, significant};
use crate::types::{TypeOptions, parse_complete_type, parse_type, parse_variables};

/// Where an expression sits, which decides what `;` and `,` mean.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum Mode {
    /// Right side of a statement: `;` ends it, `,` separates.
    Statement,
    /// Inside `(...)` or `{...}`: `,` separates, `;` is an error.
    Group,
    /// One argument of a method keyword or indexer: `;` and `,` end it.
    Args,
}

#[derive(Clone, Copy, Debug)]
pub(crate) struct RightSide {
    /// First token after the terminating `;`.
    pub(crate) end: usize,
    pub(crate) is_const: bool,
}

enum Flow {
    Next(usize),
    /// The expression ends at this position.
    Stop(usize),
}

/// Per-call splice points.
struct Frame {
    start: Mark,
    /// Start of the current tuple segment.
    segment: Mark,
    tuple_open: bool,
    /// The enclosing group's parentheses also delimit a tuple starting at `start`.
    shares_group: bool,
    /// The open tuple uses the group's parentheses.
    tuple_shared: bool,
    /// First token and output mark of a possible lambda parameter list.
    lambda: (usize, Mark),
}

impl Frame {
    fn new(start: Mark, first: usize, shares_group: bool) -> Self {
        Self {
            start,
            segment: start,
            tuple_open: false,
            shares_group,
            tuple_shared: false,
            lambda: (first, start),
        }
    }
}

/// Whether the group `open..=close` is exactly one tuple literal.
fn holds_one_tuple(tokens: &[&Token], open: usize, close: usize) -> bool {
    let inner = &tokens[..close];
    find_top_level(inner, open + 1, |t| t.is_op("~")).is_some()
        && find_top_level(inner, open + 1, |t| t.is_op(",") || is_assignment(t)).is_none()
}

/// Operators that can appear inside a lambda parameter list.
const LAMBDA_CONNECTORS: [&str; 7] = [".", "?", ":", "-", "/", "::", "#"];

/// Tokens after `#` that mean an empty `[]`.
const EMPTY_INDEX_FOLLOWERS: [&str; 11] = [";", ",", ")", "}", "#", ".", "?.", "!.", "=>", "{", "?"];

/// Tokens after `default` that make it the `default` literal.
const DEFAULT_LITERAL_FOLLOWERS: [&str; 7] = [";", ",", ")", "}", ":", "=>", "?"];

/// Tokens ending the type written after `new`.
const NEW_TYPE_END: [&str; 9] = ["(", "{", ";", ",", ")", "}", "#", "=", "=>"];

const STATEMENT_DECLARATORS: [&str; 10] = [
    "let", "const", "prop", "class", "struct", "using", "namespace", "enum", "interface", "record",
];

/// Keywords spaced like operators: `return (x)`, `await (t)`, `is (int)`.
const SPACED_KEYWORDS: [&str; 15] = [
    "return", "await", "throw", "goto", "break", "continue", "yield", "is", "as", "in", "out",
    "ref", "not", "and", "or",
];

fn is_op_in(token: &Token, set: &[&str]) -> bool {
    token.category == Category::Operator && set.contains(&token.text.as_str())
}

impl Converter {
    /// Converts the expression starting at `start` through its `;`.
    pub(crate) fn convert_right_side(
        &mut self,
        tokens: &[&Token],
        start: usize,
        scope: Scope,
    ) -> Result<RightSide, ConvertError> {
        let mut is_const = true;
        let before = self.out.mark();
        let stop =
            self.convert_expression(tokens, start, tokens.len(), Mode::Statement, scope, &mut is_const)?;

        let Some(semicolon) = tokens.get(stop).filter(|t| t.is_op(";")) else {
            let anchor = tokens[..stop.min(tokens.len())]
                .iter()
                .rev()
                .find(|t| !t.is_trivia())
                .or_else(|| tokens.get(start))
                .copied();
            return Err(match anchor {
                Some(anchor) => ConvertError::syntax(anchor, "Missing semicolon"),
                None => ConvertError::syntax_at(None, "Missing semicolon"),
            });
        };
        if self.out.mark() == before {
            return Err(ConvertError::syntax(semicolon, "Missing expression"));
        }
        self.out.raw(";");
        self.out.newline();
        trace!(is_const, "right side converted");
        Ok(RightSide {
            end: stop + 1,
            is_const,
        })
    }

    /// Converts `tokens[from..to]` up to the terminator `mode` defines.
    ///
    /// Returns the terminator position, or `to` when the range ran out.
    pub(crate) fn convert_expression(
        &mut self,
        tokens: &[&Token],
        from: usize,
        to: usize,
        mode: Mode,
        scope: Scope,
        is_const: &mut bool,
    ) -> Result<usize, ConvertError> {
        let mut frame = Frame::new(self.out.mark(), from, false);
        self.run_expression(tokens, from, to, mode, scope, &mut frame, is_const)
    }

    #[allow(clippy::too_many_arguments)]
    fn run_expression(
        &mut self,
        tokens: &[&Token],
        from: usize,
        to: usize,
        mode: Mode,
        scope: Scope,
        frame: &mut Frame,
        is_const: &mut bool,
    ) -> Result<usize, ConvertError> {
        let mut i = from;

        while i < to {
            let t = tokens[i];
            if t.is_trivia() {
                i += 1;
                continue;
            }
            let flow = match t.category {
                Category::Operator => self.operator(tokens, i, to, mode, scope, frame, is_const)?,
                Category::Keyword | Category::ContextKeyword => {
                    self.keyword(tokens, i, to, mode, scope, frame, is_const)?
                }
                Category::Identifier => {
                    self.out.word(t.text.clone());
                    *is_const = false;
                    Flow::Next(i + 1)
                }
                _ => {
                    self.out.word(t.text.clone());
                    Flow::Next(i + 1)
                }
            };
            match flow {
                Flow::Next(next) => i = next,
                Flow::Stop(at) => {
                    self.close_tuple(frame);
                    return Ok(at);
                }
            }
        }

        self.close_tuple(frame);
        Ok(to)
    }

    fn close_tuple(&mut self, frame: &mut Frame) {
        if frame.tuple_open && !frame.tuple_shared {
            self.out.operator(")");
        }
        frame.tuple_open = false;
        frame.tuple_shared = false;
    }

    #[allow(clippy::too_many_arguments)]
    fn operator(
        &mut self,
        tokens: &[&Token],
        at: usize,
        to: usize,
        mode: Mode,
        scope: Scope,
        frame: &mut Frame,
        is_const: &mut bool,
    ) -> Result<Flow, ConvertError> {
        let t = tokens[at];
        match t.text.as_str() {
            ";" => match mode {
                Mode::Group => Err(ConvertError::unexpected(t)),
                Mode::Statement | Mode::Args => Ok(Flow::Stop(at)),
            },
            "," => {
                if mode == Mode::Args {
                    return Ok(Flow::Stop(at));
                }
                self.close_tuple(frame);
                self.out.operator(",");
                frame.segment = self.out.mark();
                if mode == Mode::Group {
                    frame.lambda = (at + 1, self.out.mark());
                }
                Ok(Flow::Next(at + 1))
            }
            "(" => Ok(Flow::Next(self.group(tokens, at, to, scope, is_const)?)),
            "{" => {
                let close = matching_close(&tokens[..to], at)
                    .ok_or_else(|| ConvertError::syntax(t, "Missing right brace"))?;
                self.out.operator("{");
                self.convert_expression(tokens, at + 1, close, Mode::Group, scope, is_const)?;
                self.out.operator("}");
                *is_const = false;
                Ok(Flow::Next(close + 1))
            }
            ")" | "}" => Err(ConvertError::unexpected(t)),
            "#" => self.indexer(tokens, at, to, mode, scope, is_const),
            "~" => {
                t.set_kind(Kind::Operator(OperatorKind::TupleConnector));
                *is_const = false;
                if !frame.tuple_open {
                    if frame.shares_group && frame.segment == frame.start {
                        frame.tuple_shared = true;
                    } else {
                        self.out.insert(frame.segment, "(", Spacing::Open);
                    }
                    frame.tuple_open = true;
                }
                self.out.operator(",");
                frame.lambda = (at + 1, self.out.mark());
                Ok(Flow::Next(at + 1))
            }
            "=>" => self.lambda(tokens, at, to, scope, frame, is_const),
            "@" if tokens.get(at + 1).is_some_and(|n| n.is_word()) => {
                // Verbatim identifier such as `@class`.
                self.out.word(format!("@{}", tokens[at + 1].text));
                *is_const = false;
                Ok(Flow::Next(at + 2))
            }
            text => {
                if is_assignment(t) {
                    t.set_kind(Kind::Operator(OperatorKind::Assignment));
                    self.close_tuple(frame);
                    self.out.operator(text);
                    frame.segment = self.out.mark();
                    frame.lambda = (at + 1, self.out.mark());
                    return Ok(Flow::Next(at + 1));
                }
                self.out.operator(text);
                if !LAMBDA_CONNECTORS.contains(&text) {
                    frame.lambda = (at + 1, self.out.mark());
                }
                Ok(Flow::Next(at + 1))
            }
        }
    }

    /// `( ... )`; a group whose whole content is another group is emitted once,
    /// and a group holding one tuple literal lends it its parentheses.
    fn group(
        &mut self,
        tokens: &[&Token],
        open: usize,
        to: usize,
        scope: Scope,
        is_const: &mut bool,
    ) -> Result<usize, ConvertError> {
        let close = matching_close(&tokens[..to], open)
            .ok_or_else(|| ConvertError::syntax(tokens[open], "Missing right parenthesis"))?;
        let inner = &tokens[..close];
        let doubled = next_significant(inner, open + 1)
            .filter(|&first| tokens[first].is_op("("))
            .and_then(|first| matching_close(inner, first).map(|inner_close| (first, inner_close)))
            .is_some_and(|(first, inner_close)| {
                next_significant(inner, inner_close + 1).is_none()
                    && !holds_one_tuple(tokens, first, inner_close)
            });

        if doubled {
            self.convert_expression(tokens, open + 1, close, Mode::Group, scope, is_const)?;
        } else {
            self.out.operator("(");
            let mut frame = Frame::new(self.out.mark(), open + 1, holds_one_tuple(tokens, open, close));
            self.run_expression(tokens, open + 1, close, Mode::Group, scope, &mut frame, is_const)?;
            self.out.operator(")");
        }
        Ok(close + 1)
    }

    fn indexer(
        &mut self,
        tokens: &[&Token],
        at: usize,
        to: usize,
        mode: Mode,
        scope: Scope,
        is_const: &mut bool,
    ) -> Result<Flow, ConvertError> {
        tokens[at].set_kind(Kind::Operator(OperatorKind::Indexer));
        *is_const = false;
        let next = next_significant(&tokens[..to], at + 1);
        if let Some(open) = next.filter(|&n| tokens[n].is_op("(")) {
            let close = next_significant(&tokens[..to], open + 1);
            if close.is_some_and(|c| tokens[c].is_op(")")) {
                return Err(ConvertError::unexpected(tokens[open]));
            }
        }
        let empty = next.is_none_or(|n| {
            is_op_in(tokens[n], &EMPTY_INDEX_FOLLOWERS) || is_assignment(tokens[n])
        });
        self.out.operator("[");
        if empty {
            self.out.operator("]");
            return Ok(Flow::Next(at + 1));
        }
        self.sugar_arguments(tokens, at + 1, to, mode, scope, "]", None)
    }

    /// Arguments of a method keyword or indexer: `arg, arg;` then `close`.
    #[allow(clippy::too_many_arguments)]
    fn sugar_arguments(
        &mut self,
        tokens: &[&Token],
        from: usize,
        to: usize,
        mode: Mode,
        scope: Scope,
        close: &str,
        type_anchor: Option<&Token>,
    ) -> Result<Flow, ConvertError> {
        let mut j = from;
        loop {
            let stop = match type_anchor {
                Some(anchor) => {
                    let end = find_top_level(&tokens[..to], j, |t| t.is_op(",") || t.is_op(";"))
                        .unwrap_or(to);
                    let ty = parse_complete_type(&significant(&tokens[j..end]), anchor)?;
                    self.out.word(convert_type(&ty, TypePosition::Plain));
                    end
                }
                None => {
                    let before = self.out.mark();
                    let mut scratch = false;
                    let stop =
                        self.convert_expression(tokens, j, to, Mode::Args, scope, &mut scratch)?;
                    if self.out.mark() == before {
                        let anchor = tokens.get(stop).unwrap_or(&tokens[j - 1]);
                        return Err(ConvertError::syntax(anchor, "Missing argument"));
                    }
                    stop
                }
            };

            match tokens.get(stop).filter(|_| stop < to) {
                Some(t) if t.is_op(",") => {
                    self.out.operator(",");
                    j = stop + 1;
                }
                Some(_) => {
                    self.out.operator(close);
                    return Ok(self.after_sugar(tokens, stop, to, mode));
                }
                None => {
                    self.out.operator(close);
                    return Ok(Flow::Next(to));
                }
            }
        }
    }

    /// Continues after the `;` closing sugar arguments.
    ///
    /// A name glued to the `;` chains with `.`; in a statement, a `;` ending its
    /// line also ends the statement.
    fn after_sugar(&mut self, tokens: &[&Token], semicolon: usize, to: usize, mode: Mode) -> Flow {
        let next = semicolon + 1;
        if next < to && tokens[next].is_word() {
            self.out.operator(".");
            return Flow::Next(next);
        }
        if mode == Mode::Statement {
            let ends_line = match next_significant(&tokens[..to], next) {
                None => true,
                Some(n) => tokens[next..n].iter().any(|t| t.is_line_break()),
            };
            if ends_line {
                return Flow::Stop(semicolon);
            }
        }
        Flow::Next(next)
    }

    #[allow(clippy::too_many_arguments)]
    fn keyword(
        &mut self,
        tokens: &[&Token],
        at: usize,
        to: usize,
        mode: Mode,
        scope: Scope,
        frame: &mut Frame,
        is_const: &mut bool,
    ) -> Result<Flow, ConvertError> {
        let t = tokens[at];
        let text = t.text.as_str();

        if t.is_literal() {
            self.out.word(text);
            return Ok(Flow::Next(at + 1));
        }
        *is_const = false;

        if STATEMENT_DECLARATORS.contains(&text)
            || matches!(
                t.keyword_kind(),
                Some(KeywordKind::BlockWithExpr | KeywordKind::BlockWithoutExpr)
            ) && text != "switch"
        {
            return Err(ConvertError::syntax(t, format!("Missing semicolon before {text}")));
        }

        match text {
            "nameof" | "sizeof" | "typeof" | "default" | "checked" | "unchecked" => {
                return self.method_keyword(tokens, at, to, mode, scope);
            }
            "fn" => {
                let sig = significant(&tokens[at..to]);
                let (ty, used) = parse_type(&sig, TypeOptions::declaration())?;
                let ty = ty.ok_or_else(|| ConvertError::syntax(t, "Missing type"))?;
                self.out.word(convert_type(&ty, TypePosition::Plain));
                let next = match sig.get(used) {
                    Some(next) => index_of(tokens, next)?,
                    None => to,
                };
                return Ok(Flow::Next(next));
            }
            "switch" => {
                let next = self.convert_switch_expression(tokens, at, to, scope)?;
                return Ok(Flow::Next(next));
            }
            "new" => {
                self.out.word("new");
                return Ok(Flow::Next(self.new_type(tokens, at, to)?));
            }
            "async" | "static" => {
                self.out.keyword(text);
                frame.lambda = (at + 1, self.out.mark());
                return Ok(Flow::Next(at + 1));
            }
            _ => {}
        }

        if t.keyword_kind() == Some(KeywordKind::Expr) || text == "yield" {
            t.set_kind(Kind::Keyword(KeywordKind::Expr));
            self.out.keyword(text);
            frame.segment = self.out.mark();
            frame.lambda = (at + 1, self.out.mark());
            return Ok(Flow::Next(at + 1));
        }

        if SPACED_KEYWORDS.contains(&text) {
            self.out.keyword(text);
            frame.lambda = (at + 1, self.out.mark());
        } else {
            self.out.word(text);
        }
        Ok(Flow::Next(at + 1))
    }

    fn method_keyword(
        &mut self,
        tokens: &[&Token],
        at: usize,
        to: usize,
        mode: Mode,
        scope: Scope,
    ) -> Result<Flow, ConvertError> {
        let keyword = tokens[at];
        let next = next_significant(&tokens[..to], at + 1).map(|n| tokens[n]);

        if keyword.text == "default" && next.is_none_or(|n| is_op_in(n, &DEFAULT_LITERAL_FOLLOWERS)) {
            self.out.word("default");
            return Ok(Flow::Next(at + 1));
        }
        self.out.word(keyword.text.clone());
        if next.is_some_and(|n| n.is_op("(")) {
            return Ok(Flow::Next(at + 1));
        }

        keyword.set_kind(Kind::Keyword(KeywordKind::Method));
        self.out.operator("(");
        let takes_type = matches!(keyword.text.as_str(), "typeof" | "sizeof" | "default");
        self.sugar_arguments(
            tokens,
            at + 1,
            to,
            mode,
            scope,
            ")",
            takes_type.then_some(keyword),
        )
    }

    /// Type written after `new`, rendered through the type grammar.
    fn new_type(&mut self, tokens: &[&Token], at: usize, to: usize) -> Result<usize, ConvertError> {
        let Some(first) = next_significant(&tokens[..to], at + 1) else {
            return Ok(at + 1);
        };
        if !tokens[first].is_word() {
            return Ok(at + 1);
        }
        let end = find_top_level(&tokens[..to], first, |t| is_op_in(t, &NEW_TYPE_END)).unwrap_or(to);
        let type_tokens = significant(&tokens[first..end]);
        let ty = parse_complete_type(&type_tokens, tokens[at])?;
        self.out.word(convert_type(&ty, TypePosition::Plain));
        Ok(end)
    }

    fn lambda(
        &mut self,
        tokens: &[&Token],
        at: usize,
        to: usize,
        scope: Scope,
        frame: &mut Frame,
        is_const: &mut bool,
    ) -> Result<Flow, ConvertError> {
        let arrow = tokens[at];
        arrow.set_kind(Kind::Operator(OperatorKind::Lambda));
        *is_const = false;

        let (first, mark) = frame.lambda;
        let params = significant(&tokens[first..at]);
        let Some(&head) = params.first() else {
            return Err(ConvertError::syntax(arrow, "Missing lambda parameters"));
        };
        let last = params.len() - 1;
        let grouped = head.is_op("(") && matching_close(&params, 0) == Some(last);
        let list = if grouped { &params[1..last] } else { &params[..] };
        let typed = find_top_level(list, 0, |t| t.is_op(":")).is_some();

        if typed {
            let vars = parse_variables(list)?;
            self.out.truncate(mark);
            self.out.operator("(");
            for (k, var) in vars.iter().enumerate() {
                if k > 0 {
                    self.out.operator(",");
                }
                self.out.word(convert_parameter(var));
            }
            self.out.operator(")");
        } else if !grouped {
            self.out.insert(mark, "(", Spacing::Open);
            self.out.operator(")");
        }
        self.out.operator("=>");

        let body = next_significant(&tokens[..to], at + 1);
        if let Some(open) = body.filter(|&b| tokens[b].is_op("{")) {
            let close = matching_close(&tokens[..to], open)
                .ok_or_else(|| ConvertError::syntax(tokens[open], "Missing right brace"))?;
            self.out.line(" {");
            self.convert_block(&tokens[open + 1..close], scope.enter_fn(false))?;
            self.out.indent(scope.indent);
            self.out.raw("}");
            frame.lambda = (close + 1, self.out.mark());
            return Ok(Flow::Next(close + 1));
        }

        frame.segment = self.out.mark();
        frame.lambda = (at + 1, self.out.mark());
        Ok(Flow::Next(at + 1))
    }
}

#[cfg(test)]
mod tests {
    use super::RightSide;
    use crate::convert::{Converter, Scope};
    use crate::{ConvertConfig, convert};
    use pretty_assertions::assert_eq;
    use sharpc_lex::{Lexer, Token};

    fn right_side(src: &str) -> RightSide {
        let owned = Lexer::new(src).lex().unwrap();
        let tokens: Vec<&Token> = owned.iter().collect();
        let mut converter = Converter::new(&ConvertConfig::default());
        converter.convert_right_side(&tokens, 0, Scope::root()).unwrap()
    }

    fn body(src: &str) -> String {
        let out = convert(&format!("fn T {{\n{src}\n}}")).unwrap();
        out.trim_start_matches("void T() {\r\n")
            .trim_end_matches("}\r\n")
            .trim()
            .to_string()
    }

    #[test]
    fn constant_right_sides() {
        assert!(right_side("1;").is_const);
        assert!(right_side("1 + 2;").is_const);
        assert!(right_side("\"a\" + \"b\";").is_const);
        assert!(!right_side("f();").is_const);
        assert!(!right_side("x + 1;").is_const);
        assert!(!right_side("items#0;").is_const);
        assert_eq!(right_side("1;").end, 2);
    }

    #[test]
    fn method_keywords() {
        assert_eq!(body("let n = nameof value;"), "var n = nameof(value);");
        assert_eq!(body("let t = typeof List-int;"), "var t = typeof(List<int>);");
        assert_eq!(body("let t = typeof(int);"), "var t = typeof(int);");
        assert_eq!(body("let s = typeof int;Name;"), "var s = typeof(int).Name;");
        assert_eq!(body("let d = default;"), "var d = default;");
        assert_eq!(body("let d = default int;"), "var d = default(int);");
    }

    #[test]
    fn indexer_sugar() {
        assert_eq!(body("let a = items#0;"), "var a = items[0];");
        assert_eq!(body("let b = grid#x, y;;"), "var b = grid[x, y];");
        assert_eq!(body("let c = rows#i;Length;"), "var c = rows[i].Length;");
        assert_eq!(body("let d = new int#3;"), "var d = new int[3];");
        assert_eq!(body("let e = new int#{ 1, 2 };"), "var e = new int[] { 1, 2 };");
    }

    #[test]
    fn tuples() {
        assert_eq!(body("let t = 1 ~ \"a\";"), "var t = (1, \"a\");");
        assert_eq!(body("return a ~ b;"), "return (a, b);");
        assert_eq!(body("x ~ y = y ~ x;"), "(x, y) = (y, x);");
    }

    #[test]
    fn parenthesised_tuple_keeps_one_pair() {
        assert_eq!(body("return (a ~ b);"), "return (a, b);");
        assert_eq!(body("let t = (a ~ b);"), "var t = (a, b);");
        assert_eq!(body("f((a ~ b));"), "f((a, b));");
        assert_eq!(body("let u = (x => a ~ b);"), "var u = ((x) => (a, b));");
    }

    #[test]
    fn tuple_closes_after_lambda_element() {
        assert_eq!(body("let t = 1 ~ x => x;"), "var t = (1, (x) => x);");
    }

    #[test]
    fn empty_parentheses_after_indexer_are_rejected() {
        let err = convert("fn T {\n  let a = new List-int#();\n}").unwrap_err();
        assert_eq!(err.message(), "Unexpected token: (");
        assert_eq!(body("let b = items#(i + 1);"), "var b = items[(i + 1)];");
    }

    #[test]
    fn lambdas() {
        assert_eq!(body("let f = x => x * 2;"), "var f = (x) => x * 2;");
        assert_eq!(body("let g = a, b => a + b;"), "var g = (a, b) => a + b;");
        assert_eq!(
            body("let h = a: int, b: int => a + b;"),
            "var h = (int a, int b) => a + b;"
        );
        assert_eq!(body("let k = (a, b) => a;"), "var k = (a, b) => a;");
        assert_eq!(
            body("let c = list.Where(x => x > 0).Count();"),
            "var c = list.Where((x) => x > 0).Count();"
        );
        assert_eq!(
            body("Run(async () => await Task.Delay(1));"),
            "Run(async () => await Task.Delay(1));"
        );
    }

    #[test]
    fn lambda_block_bodies_are_indented() {
        assert_eq!(
            body("let f = x => {\n  return x;\n};"),
            "var f = (x) => {\r\n    return x;\r\n  };"
        );
    }

    #[test]
    fn groups_are_not_doubled() {
        assert_eq!(body("let x = ((a + b)) * c;"), "var x = (a + b) * c;");
        assert_eq!(body("f(-1, !ok, i++);"), "f(-1, !ok, i++);");
    }

    #[test]
    fn inline_function_types_and_new() {
        assert_eq!(
            body("let f = default fn: int => bool;"),
            "var f = default(Func<int, bool>);"
        );
        assert_eq!(
            body("let m = new Dictionary-string/int();"),
            "var m = new Dictionary<string, int>();"
        );
    }

    #[test]
    fn declarator_inside_expression_needs_semicolon() {
        let err = convert("fn T {\n  let x = 1\n  let y = 2;\n}").unwrap_err();
        assert_eq!(err.message(), "Missing semicolon before let");
    }

    #[test]
    fn missing_semicolon_and_expression() {
        let err = convert("fn T {\n  f()\n}").unwrap_err();
        assert_eq!(err.message(), "Missing semicolon");
        let err = convert("let x: int = ;").unwrap_err();
        assert_eq!(err.message(), "Missing expression");
    }
}
