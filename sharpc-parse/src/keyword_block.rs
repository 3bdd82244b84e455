#![forbid(unsafe_code)]

//! Control-flow statements: `if`/`elif`/`else`, loops, `try`, `switch`, `lock`,
//! `fixed`, `checked` and `unchecked` blocks.

use sharpc_lex::{Category, Kind, NameKind, Token};
use tracing::trace;

use crate::convert::{Converter, Scope};
use crate::error::ConvertError;
use crate::expr::Mode;
use crate::modifiers::Modifiers;
use crate::render::{TypePosition, convert_type};
use crate::scan::{find_top_level, matching_close, next_significant, significant, skip_semicolons};
use crate::switch::{split_arms, switch_braces};
use crate::types::parse_complete_type;

const JUMPS: [&str; 5] = ["return", "throw", "break", "continue", "goto"];

/// `{` or, when `single` is set, `;` ending a keyword header.
fn header_end(
    tokens: &[&Token],
    keyword: usize,
    single: bool,
) -> Result<usize, ConvertError> {
    find_top_level(tokens, keyword + 1, |t| t.is_op("{") || (single && t.is_op(";")))
        .ok_or_else(|| ConvertError::syntax(tokens[keyword], "Missing left brace"))
}

/// Renders `[let] name[: Type]` as `var name` / `Type name`.
fn loop_variable(
    tokens: &[&Token],
    from: usize,
    to: usize,
    anchor: &Token,
) -> Result<String, ConvertError> {
    let sig = significant(&tokens[from..to]);
    let sig = match sig.first() {
        Some(first) if first.is_keyword("let") => &sig[1..],
        _ => &sig[..],
    };
    let name = sig
        .first()
        .filter(|t| t.is_name_like())
        .ok_or_else(|| ConvertError::syntax(anchor, "Missing variable name"))?;
    name.set_kind(Kind::Name(NameKind::Var));
    match sig.get(1) {
        None => Ok(format!("var {}", name.text)),
        Some(colon) if colon.is_op(":") => {
            let ty = parse_complete_type(&sig[2..], colon)?;
            Ok(format!("{} {}", convert_type(&ty, TypePosition::Plain), name.text))
        }
        Some(extra) => Err(ConvertError::unexpected(extra)),
    }
}

/// Whether the last statement in `tokens[from..to]` leaves the switch section.
fn ends_with_jump(tokens: &[&Token], from: usize, to: usize) -> bool {
    let sig = significant(&tokens[from..to]);
    let mut end = sig.len();
    while end > 0 && sig[end - 1].is_op(";") {
        end -= 1;
    }
    let mut depth = 0usize;
    let mut last_start = 0;
    for (k, t) in sig[..end].iter().enumerate() {
        if t.is_op("(") || t.is_op("{") {
            depth += 1;
        } else if t.is_op(")") || t.is_op("}") {
            depth = depth.saturating_sub(1);
            if depth == 0 && t.is_op("}") {
                last_start = k + 1;
            }
        } else if depth == 0 && t.is_op(";") {
            last_start = k + 1;
        }
    }
    sig[..end]
        .get(last_start)
        .is_some_and(|t| t.category == Category::Keyword && JUMPS.contains(&t.text.as_str()))
}

impl Converter {
    pub(crate) fn convert_keyword_block(
        &mut self,
        tokens: &[&Token],
        start: usize,
        scope: Scope,
    ) -> Result<usize, ConvertError> {
        let keyword = tokens[start];
        let text = keyword.text.as_str();
        trace!(keyword = text, indent = scope.indent, "keyword block");

        match text {
            "if" => self.convert_if(tokens, start, scope),
            "elif" | "else" => Err(ConvertError::syntax(keyword, format!("{text} without if"))),
            "catch" | "finally" => {
                Err(ConvertError::syntax(keyword, format!("{text} without try")))
            }
            "while" | "lock" | "fixed" => {
                let head = header_end(tokens, start, true)?;
                self.out.indent(scope.indent);
                self.out.raw(format!("{text} "));
                self.condition(tokens, start + 1, head, scope, keyword)?;
                self.keyword_body(tokens, head, scope)
            }
            "for" => self.convert_for(tokens, start, scope),
            "foreach" => self.convert_foreach(tokens, start, scope),
            "do" => self.convert_do(tokens, start, scope),
            "try" => self.convert_try(tokens, start, scope),
            "switch" => self.convert_switch_statement(tokens, start, scope),
            "checked" | "unchecked" => {
                let open = header_end(tokens, start, false)?;
                if let Some(extra) = next_significant(&tokens[..open], start + 1) {
                    return Err(ConvertError::unexpected(tokens[extra]));
                }
                self.out.indent(scope.indent);
                self.out.raw(text.to_string());
                self.convert_braced(tokens, open, scope, scope.enter_body())
            }
            _ => Err(ConvertError::unexpected(keyword)),
        }
    }

    /// `(cond)` for a keyword header; a condition already in parentheses is kept as is.
    fn condition(
        &mut self,
        tokens: &[&Token],
        from: usize,
        to: usize,
        scope: Scope,
        keyword: &Token,
    ) -> Result<(), ConvertError> {
        let Some(first) = next_significant(&tokens[..to], from) else {
            return Err(ConvertError::syntax(keyword, "Missing condition"));
        };
        let grouped = tokens[first].is_op("(")
            && matching_close(&tokens[..to], first)
                .is_some_and(|close| next_significant(&tokens[..to], close + 1).is_none());
        let mut scratch = false;
        if grouped {
            self.convert_expression(tokens, from, to, Mode::Group, scope, &mut scratch)?;
        } else {
            self.out.raw("(");
            self.convert_expression(tokens, from, to, Mode::Group, scope, &mut scratch)?;
            self.out.raw(")");
        }
        Ok(())
    }

    /// Body after a keyword header: a `{ ... }` block, or one statement after `;`.
    fn keyword_body(
        &mut self,
        tokens: &[&Token],
        at: usize,
        scope: Scope,
    ) -> Result<usize, ConvertError> {
        if tokens[at].is_op("{") {
            return self.convert_braced(tokens, at, scope, scope.enter_body());
        }
        self.out.newline();
        let first = next_significant(tokens, at + 1)
            .ok_or_else(|| ConvertError::syntax(tokens[at], "Missing statement"))?;
        let statement =
            self.convert_statement(tokens, first, scope.enter_body(), Modifiers::default())?;
        statement.pending.ensure_empty()?;
        Ok(skip_semicolons(tokens, statement.end))
    }

    fn convert_if(
        &mut self,
        tokens: &[&Token],
        start: usize,
        scope: Scope,
    ) -> Result<usize, ConvertError> {
        let mut keyword_at = start;
        let mut prefix = "if";
        loop {
            let keyword = tokens[keyword_at];
            let head = header_end(tokens, keyword_at, true)?;
            self.out.indent(scope.indent);
            self.out.raw(format!("{prefix} "));
            self.condition(tokens, keyword_at + 1, head, scope, keyword)?;
            let end = self.keyword_body(tokens, head, scope)?;

            let Some(next) = next_significant(tokens, end) else {
                return Ok(end);
            };
            let follower = tokens[next];
            if follower.is_keyword("elif") {
                keyword_at = next;
                prefix = "else if";
                continue;
            }
            if !follower.is_keyword("else") {
                return Ok(end);
            }
            let after = next_significant(tokens, next + 1);
            if let Some(nested_if) = after.filter(|&a| tokens[a].is_keyword("if")) {
                keyword_at = nested_if;
                prefix = "else if";
                continue;
            }
            let body = after
                .filter(|&a| tokens[a].is_op("{") || tokens[a].is_op(";"))
                .ok_or_else(|| ConvertError::syntax(follower, "Missing left brace"))?;
            self.out.indent(scope.indent);
            self.out.raw("else");
            return self.keyword_body(tokens, body, scope);
        }
    }

    fn convert_for(
        &mut self,
        tokens: &[&Token],
        start: usize,
        scope: Scope,
    ) -> Result<usize, ConvertError> {
        let keyword = tokens[start];
        let head = header_end(tokens, start, false)?;
        let header = &tokens[..head];
        let clauses = find_top_level(header, start + 1, |t| t.is_op(";")).and_then(|first| {
            find_top_level(header, first + 1, |t| t.is_op(";")).map(|second| (first, second))
        });
        let Some((first, second)) = clauses else {
            return Err(ConvertError::syntax(keyword, "For needs three clauses"));
        };
        if let Some(extra) = find_top_level(header, second + 1, |t| t.is_op(";")) {
            return Err(ConvertError::unexpected(tokens[extra]));
        }

        let mut scratch = false;
        self.out.indent(scope.indent);
        self.out.raw("for (");
        let init = next_significant(&tokens[..first], start + 1);
        if let Some(init) = init.filter(|&i| tokens[i].is_keyword("let")) {
            let assign = find_top_level(&tokens[..first], init, |t| t.is_op("="))
                .ok_or_else(|| ConvertError::syntax(tokens[init], "Missing assignment"))?;
            let declared = loop_variable(tokens, init, assign, tokens[init])?;
            self.out.raw(format!("{declared} = "));
            self.convert_expression(tokens, assign + 1, first, Mode::Group, scope, &mut scratch)?;
        } else {
            self.convert_expression(tokens, start + 1, first, Mode::Group, scope, &mut scratch)?;
        }
        for (from, to) in [(first + 1, second), (second + 1, head)] {
            if next_significant(&tokens[..to], from).is_some() {
                self.out.raw("; ");
                self.convert_expression(tokens, from, to, Mode::Group, scope, &mut scratch)?;
            } else {
                self.out.raw(";");
            }
        }
        self.out.raw(")");
        self.keyword_body(tokens, head, scope)
    }

    fn convert_foreach(
        &mut self,
        tokens: &[&Token],
        start: usize,
        scope: Scope,
    ) -> Result<usize, ConvertError> {
        let keyword = tokens[start];
        let head = header_end(tokens, start, true)?;
        let in_at = find_top_level(&tokens[..head], start + 1, |t| t.is_keyword("in"))
            .ok_or_else(|| ConvertError::syntax(keyword, "Missing in"))?;
        let declared = loop_variable(tokens, start + 1, in_at, keyword)?;
        if next_significant(&tokens[..head], in_at + 1).is_none() {
            return Err(ConvertError::syntax(tokens[in_at], "Missing collection"));
        }

        let mut scratch = false;
        self.out.indent(scope.indent);
        self.out.raw(format!("foreach ({declared} in "));
        self.convert_expression(tokens, in_at + 1, head, Mode::Group, scope, &mut scratch)?;
        self.out.raw(")");
        self.keyword_body(tokens, head, scope)
    }

    fn convert_do(
        &mut self,
        tokens: &[&Token],
        start: usize,
        scope: Scope,
    ) -> Result<usize, ConvertError> {
        let keyword = tokens[start];
        let while_at = next_significant(tokens, start + 1)
            .filter(|&w| tokens[w].is_keyword("while"))
            .ok_or_else(|| ConvertError::syntax(keyword, "Missing while after do"))?;
        let open = header_end(tokens, while_at, false)?;
        let close = matching_close(tokens, open)
            .ok_or_else(|| ConvertError::syntax(tokens[open], "Missing right brace"))?;

        self.out.indent(scope.indent);
        self.out.line("do {");
        self.convert_block(&tokens[open + 1..close], scope.enter_body())?;
        self.out.indent(scope.indent);
        self.out.raw("} while ");
        self.condition(tokens, while_at + 1, open, scope, tokens[while_at])?;
        self.out.raw(";");
        self.out.newline();
        Ok(close + 1)
    }

    fn convert_try(
        &mut self,
        tokens: &[&Token],
        start: usize,
        scope: Scope,
    ) -> Result<usize, ConvertError> {
        let keyword = tokens[start];
        let open = next_significant(tokens, start + 1)
            .filter(|&o| tokens[o].is_op("{"))
            .ok_or_else(|| ConvertError::syntax(keyword, "Missing left brace"))?;
        self.out.indent(scope.indent);
        self.out.raw("try");
        let mut end = self.convert_braced(tokens, open, scope, scope.enter_body())?;
        let mut handled = false;

        while let Some(next) = next_significant(tokens, end) {
            let clause = tokens[next];
            if clause.is_keyword("catch") {
                let head = header_end(tokens, next, false)?;
                self.out.indent(scope.indent);
                self.out.raw("catch");
                self.catch_header(tokens, next, head, scope)?;
                end = self.convert_braced(tokens, head, scope, scope.enter_body())?;
                handled = true;
            } else if clause.is_keyword("finally") {
                let open = next_significant(tokens, next + 1)
                    .filter(|&o| tokens[o].is_op("{"))
                    .ok_or_else(|| ConvertError::syntax(clause, "Missing left brace"))?;
                self.out.indent(scope.indent);
                self.out.raw("finally");
                end = self.convert_braced(tokens, open, scope, scope.enter_body())?;
                handled = true;
                break;
            } else {
                break;
            }
        }

        if !handled {
            return Err(ConvertError::syntax(keyword, "Missing catch or finally"));
        }
        Ok(end)
    }

    /// ` (Type name) when (filter)` after `catch`.
    fn catch_header(
        &mut self,
        tokens: &[&Token],
        keyword: usize,
        head: usize,
        scope: Scope,
    ) -> Result<(), ConvertError> {
        let filter = find_top_level(&tokens[..head], keyword + 1, |t| t.is_op("*"));
        let declaration = significant(&tokens[keyword + 1..filter.unwrap_or(head)]);
        match declaration.as_slice() {
            [] => {}
            [name, colon, ty @ ..] if colon.is_op(":") => {
                if !name.is_name_like() {
                    return Err(ConvertError::unexpected(name));
                }
                name.set_kind(Kind::Name(NameKind::Var));
                let ty = parse_complete_type(ty, colon)?;
                self.out
                    .raw(format!(" ({} {})", convert_type(&ty, TypePosition::Plain), name.text));
            }
            ty => {
                let ty = parse_complete_type(ty, tokens[keyword])?;
                self.out.raw(format!(" ({})", convert_type(&ty, TypePosition::Plain)));
            }
        }
        if let Some(star) = filter {
            self.out.raw(" when ");
            self.condition(tokens, star + 1, head, scope, tokens[star])?;
        }
        Ok(())
    }

    fn convert_switch_statement(
        &mut self,
        tokens: &[&Token],
        start: usize,
        scope: Scope,
    ) -> Result<usize, ConvertError> {
        let keyword = tokens[start];
        let (open, close) = switch_braces(tokens, start, tokens.len())?;
        self.out.indent(scope.indent);
        self.out.raw("switch ");
        self.condition(tokens, start + 1, open, scope, keyword)?;
        self.out.line(" {");

        let section = scope.enter_body();
        let statements = section.enter_body();
        for arm in split_arms(tokens, open + 1, close, true)? {
            self.out.indent(section.indent);
            if arm.is_default(tokens) {
                self.out.raw("default:");
            } else {
                let mut scratch = false;
                self.out.raw("case ");
                self.convert_expression(tokens, arm.pattern.0, arm.pattern.1, Mode::Group, scope, &mut scratch)?;
                self.out.raw(":");
            }
            self.out.newline();

            let (from, to) = arm.body;
            if arm.block {
                self.convert_block(&tokens[from..to], statements)?;
            } else {
                let terminated = (to + 1).min(close);
                let statement = self.convert_statement(
                    &tokens[..terminated],
                    from,
                    statements,
                    Modifiers::default(),
                )?;
                statement.pending.ensure_empty()?;
            }
            if !ends_with_jump(tokens, from, to) {
                self.out.indent(statements.indent);
                self.out.line("break;");
            }
        }

        self.close_brace(scope.indent);
        Ok(close + 1)
    }
}

#[cfg(test)]
mod tests {
    use crate::convert;
    use pretty_assertions::assert_eq;

    fn in_fn(body: &str) -> String {
        convert(&format!("fn F {{\n{body}\n}}")).unwrap()
    }

    #[test]
    fn if_elif_else_chain() {
        let out = in_fn("if a > 0 {\n  f();\n} elif (b) {\n  g();\n} else {\n  h();\n}");
        assert_eq!(
            out,
            "void F() {\r\n  if (a > 0) {\r\n    f();\r\n  }\r\n  else if (b) {\r\n    g();\r\n  }\r\n  else {\r\n    h();\r\n  }\r\n}\r\n"
        );
    }

    #[test]
    fn single_statement_body() {
        let out = in_fn("if done; return;");
        assert_eq!(out, "void F() {\r\n  if (done)\r\n    return;\r\n}\r\n");
    }

    #[test]
    fn loops() {
        let out = in_fn("for let i = 0; i < n; i++ {\n  f(i);\n}");
        assert_eq!(
            out,
            "void F() {\r\n  for (var i = 0; i < n; i++) {\r\n    f(i);\r\n  }\r\n}\r\n"
        );
        let out = in_fn("foreach item: string in items {}");
        assert_eq!(out, "void F() {\r\n  foreach (string item in items) {\r\n  }\r\n}\r\n");
        let out = in_fn("do while more() {\n  step();\n}");
        assert_eq!(
            out,
            "void F() {\r\n  do {\r\n    step();\r\n  } while (more());\r\n}\r\n"
        );
    }

    #[test]
    fn try_catch_finally() {
        let out = in_fn("try {\n} catch e: IOException * e.HResult == 5 {\n} catch {\n} finally {\n}");
        assert_eq!(
            out,
            "void F() {\r\n  try {\r\n  }\r\n  catch (IOException e) when (e.HResult == 5) {\r\n  }\r\n  catch {\r\n  }\r\n  finally {\r\n  }\r\n}\r\n"
        );
        let err = convert("fn F {\n  try {}\n}").unwrap_err();
        assert_eq!(err.message(), "Missing catch or finally");
    }

    #[test]
    fn switch_statement_appends_break() {
        let out = in_fn("switch x {\n  1 => f();\n  2 => { return; }\n  _ => g();\n}");
        assert_eq!(
            out,
            "void F() {\r\n  switch (x) {\r\n    case 1:\r\n      f();\r\n      break;\r\n    case 2:\r\n      return;\r\n    default:\r\n      g();\r\n      break;\r\n  }\r\n}\r\n"
        );
    }

    #[test]
    fn orphan_else_is_rejected() {
        let err = convert("fn F {\n  else {}\n}").unwrap_err();
        assert_eq!(err.message(), "else without if");
    }
}
