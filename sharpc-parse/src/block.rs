#![forbid(unsafe_code)]

//! Statement driver: walks a block's tokens and dispatches on the leading keyword.

use sharpc_lex::{Category, Kind, KeywordKind, ModifierKind, Token};
use tracing::trace;

use crate::convert::{Container, Converter, Scope};
use crate::decl::VariableKind;
use crate::error::ConvertError;
use crate::modifiers::Modifiers;
use crate::scan::{next_significant, skip_semicolons};

/// Result of converting one statement.
pub(crate) struct Statement<'t> {
    /// First token after the statement.
    pub(crate) end: usize,
    /// Modifier state handed to the next statement.
    pub(crate) pending: Modifiers<'t>,
    /// Set by a file-scoped `namespace`: the rest of the block is its body.
    pub(crate) enters: Option<Container>,
}

impl<'t> Statement<'t> {
    pub(crate) fn done(end: usize) -> Self {
        Self {
            end,
            pending: Modifiers::default(),
            enters: None,
        }
    }
}

const CONTROL_FLOW: [&str; 15] = [
    "if", "elif", "else", "while", "for", "foreach", "do", "try", "catch", "finally", "switch",
    "lock", "fixed", "checked", "unchecked",
];

fn is_declarator_or_modifier(token: &Token) -> bool {
    token.keyword_kind() == Some(KeywordKind::Declarator) || token.modifier_kind().is_some()
}

impl Converter {
    pub(crate) fn convert_block<'t>(
        &mut self,
        tokens: &[&'t Token],
        scope: Scope,
    ) -> Result<(), ConvertError> {
        trace!(container = ?scope.container, indent = scope.indent, "converting block");
        let mut scope = scope;
        let mut pending = Modifiers::default();
        let mut i = 0;

        while i < tokens.len() {
            let t = tokens[i];
            match t.category {
                Category::LineBreak => {
                    i = self.blank_lines(tokens, i);
                    continue;
                }
                Category::Space => {
                    i += 1;
                    continue;
                }
                Category::Comment => {
                    self.out.indent(scope.indent);
                    self.out.raw(t.text.clone());
                    self.out.newline();
                    i += 1;
                    continue;
                }
                _ => {}
            }

            let statement = self.convert_statement(tokens, i, scope, pending)?;
            pending = statement.pending;
            if let Some(container) = statement.enters {
                scope = scope.with_container(container);
            }
            i = skip_semicolons(tokens, statement.end);
        }

        pending.ensure_empty()
    }

    /// Emits one blank line per extra line break in the run starting at `from`.
    fn blank_lines(&mut self, tokens: &[&Token], from: usize) -> usize {
        let mut breaks = 0;
        let mut i = from;
        while let Some(t) = tokens.get(i) {
            match t.category {
                Category::LineBreak => breaks += 1,
                Category::Space => {}
                _ => break,
            }
            i += 1;
        }
        for _ in 1..breaks {
            self.out.newline();
        }
        i
    }

    pub(crate) fn convert_statement<'t>(
        &mut self,
        tokens: &[&'t Token],
        start: usize,
        scope: Scope,
        pending: Modifiers<'t>,
    ) -> Result<Statement<'t>, ConvertError> {
        let t = tokens[start];
        trace!(token = %t.text, container = ?scope.container, "statement");

        if t.is_op("}") {
            return Err(ConvertError::unexpected(t));
        }
        if t.is_op(";") {
            return Ok(Statement {
                end: start + 1,
                pending,
                enters: None,
            });
        }
        if t.category != Category::Keyword {
            pending.ensure_empty()?;
            let end = self.convert_expression_statement(tokens, start, scope)?;
            return Ok(Statement::done(end));
        }

        let next = next_significant(tokens, start + 1).map(|n| tokens[n]);
        let text = t.text.as_str();
        match text {
            "class" | "struct" => {
                let end = self.convert_type_declaration(tokens, start, scope, pending)?;
                return Ok(Statement::done(end));
            }
            "fn" => {
                let end = self.convert_fn(tokens, start, scope, pending)?;
                return Ok(Statement::done(end));
            }
            "let" | "const" => {
                let kind = if text == "let" {
                    VariableKind::Let
                } else {
                    VariableKind::Const
                };
                let end = self.convert_variable(tokens, start, scope, pending, kind)?;
                return Ok(Statement::done(end));
            }
            "immut"
                if scope.container.is_type_body() && next.is_some_and(|n| n.is_name_like()) =>
            {
                let end = self.convert_variable(tokens, start, scope, pending, VariableKind::Field)?;
                return Ok(Statement::done(end));
            }
            "immut" => {
                if let Some(name) = next.filter(|n| n.is_name_like()) {
                    return Err(ConvertError::syntax(name, "Immutable is only allowed for fields"));
                }
            }
            "prop" => {
                let end = self.convert_prop(tokens, start, scope, pending)?;
                return Ok(Statement::done(end));
            }
            "using" => {
                pending.ensure_empty()?;
                let end = self.convert_using(tokens, start, scope)?;
                return Ok(Statement::done(end));
            }
            "namespace" => {
                pending.ensure_empty()?;
                return self.convert_namespace(tokens, start, scope);
            }
            "new" if !next.is_some_and(is_declarator_or_modifier) => {
                pending.ensure_empty()?;
                let end = self.convert_expression_statement(tokens, start, scope)?;
                return Ok(Statement::done(end));
            }
            "new" => {
                let pending = pending.apply(t)?;
                return Ok(Statement {
                    end: start + 1,
                    pending,
                    enters: None,
                });
            }
            "return" if scope.yield_fn => {
                pending.ensure_empty()?;
                let end = self.convert_yield_return(tokens, start, scope)?;
                return Ok(Statement::done(end));
            }
            "checked" | "unchecked" if !next.is_some_and(|n| n.is_op("{")) => {
                pending.ensure_empty()?;
                let end = self.convert_expression_statement(tokens, start, scope)?;
                return Ok(Statement::done(end));
            }
            _ => {}
        }

        if CONTROL_FLOW.contains(&text) {
            pending.ensure_empty()?;
            let end = self.convert_keyword_block(tokens, start, scope)?;
            return Ok(Statement::done(end));
        }

        match t.modifier_kind() {
            Some(ModifierKind::Other) => {
                if next.is_none() {
                    return Err(ConvertError::syntax(t, format!("Dangling modifier: {text}")));
                }
                let pending = pending.apply(t)?;
                return Ok(Statement {
                    end: start + 1,
                    pending,
                    enters: None,
                });
            }
            Some(ModifierKind::AfterAt) => {
                return Err(ConvertError::syntax(
                    t,
                    format!("{text} must be written after @"),
                ));
            }
            None => {}
        }

        if t.keyword_kind() == Some(KeywordKind::Declarator) {
            return Err(ConvertError::syntax(t, format!("{text} declaration is not supported")));
        }

        pending.ensure_empty()?;
        let end = self.convert_expression_statement(tokens, start, scope)?;
        Ok(Statement::done(end))
    }

    fn convert_expression_statement(
        &mut self,
        tokens: &[&Token],
        start: usize,
        scope: Scope,
    ) -> Result<usize, ConvertError> {
        self.out.indent(scope.indent);
        let rhs = self.convert_right_side(tokens, start, scope)?;
        Ok(rhs.end)
    }

    fn convert_yield_return(
        &mut self,
        tokens: &[&Token],
        start: usize,
        scope: Scope,
    ) -> Result<usize, ConvertError> {
        let keyword = tokens[start];
        keyword.set_kind(Kind::Keyword(KeywordKind::Expr));
        let next = next_significant(tokens, start + 1);
        if let Some(semicolon) = next.filter(|&n| tokens[n].is_op(";")) {
            self.out.indent(scope.indent);
            self.out.line("yield break;");
            return Ok(semicolon + 1);
        }
        self.out.indent(scope.indent);
        self.out.keyword("yield");
        let rhs = self.convert_right_side(tokens, start, scope)?;
        Ok(rhs.end)
    }
}

#[cfg(test)]
mod tests {
    use crate::convert;
    use pretty_assertions::assert_eq;

    #[test]
    fn blank_lines_and_comments_are_kept() {
        let src = "// leading\nlet a: int = 1;\n\n\nlet b: int = 2; // trailing\n";
        assert_eq!(
            convert(src).unwrap(),
            "// leading\r\nint a = 1;\r\n\r\n\r\nint b = 2;\r\n// trailing\r\n"
        );
    }

    #[test]
    fn output_ends_with_one_line_break() {
        assert_eq!(convert("f();\n\n\n").unwrap(), "f();\r\n");
        assert_eq!(convert("f();").unwrap(), "f();\r\n");
    }

    #[test]
    fn extra_semicolons_are_skipped() {
        assert_eq!(convert("f();;;\ng();").unwrap(), "f();\r\ng();\r\n");
    }

    #[test]
    fn stray_closing_brace_is_rejected() {
        let err = convert("f();\n}").unwrap_err();
        assert_eq!(err.message(), "Unexpected token: }");
    }

    #[test]
    fn modifier_without_declarator_dangles() {
        let err = convert("partial f();").unwrap_err();
        assert_eq!(err.message(), "Dangling modifier: partial");
        let err = convert("async").unwrap_err();
        assert_eq!(err.message(), "Dangling modifier: async");
    }

    #[test]
    fn after_at_modifier_in_statement_position() {
        let err = convert("public class Foo {}").unwrap_err();
        assert_eq!(err.message(), "public must be written after @");
    }

    #[test]
    fn immut_local_is_rejected() {
        let err = convert("fn Run {\n  immut total = 1;\n}").unwrap_err();
        assert_eq!(err.message(), "Immutable is only allowed for fields");
        let err = convert("immut limit: int = 3;").unwrap_err();
        assert_eq!(err.message(), "Immutable is only allowed for fields");
    }

    #[test]
    fn yield_function_rewrites_returns() {
        let src = "yield fn Numbers _ => IEnumerable-int {\n  return 1;\n  return;\n}";
        assert_eq!(
            convert(src).unwrap(),
            "IEnumerable<int> Numbers() {\r\n  yield return 1;\r\n  yield break;\r\n}\r\n"
        );
    }
}
