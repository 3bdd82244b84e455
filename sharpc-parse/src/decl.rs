#![forbid(unsafe_code)]

//! `class`, `struct`, `fn`, variable, `using` and `namespace` declarations.

use sharpc_ast::Type;
use sharpc_lex::{Category, Kind, LiteralKind, ModifierKind, NameKind, OperatorKind, Token};
use tracing::trace;

use crate::block::Statement;
use crate::convert::{Container, Converter, Scope};
use crate::error::ConvertError;
use crate::modifiers::{Inheritance, Modifiers};
use crate::render::{TypePosition, convert_parameter, convert_type};
use crate::scan::{find_top_level, is_assignment, matching_close, significant};
use crate::types::{FnTypeOptions, TypeOptions, parse_complete_type, parse_function_type, parse_type};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum VariableKind {
    Let,
    Const,
    /// `immut name: T` inside a class or struct.
    Field,
}

/// Parses `@ mod mod ...` starting at the `@` in a trivia-free slice.
///
/// Returns the modifiers and the position after them.
pub(crate) fn parse_accessibility(
    tokens: &[&Token],
    at: usize,
) -> Result<(Vec<String>, usize), ConvertError> {
    let marker = tokens[at];
    marker.set_kind(Kind::Operator(OperatorKind::AccessibilityAnnotation));
    let mut mods: Vec<String> = Vec::new();
    let mut i = at + 1;
    while let Some(t) = tokens.get(i) {
        if t.modifier_kind() != Some(ModifierKind::AfterAt) {
            break;
        }
        if mods.iter().any(|m| *m == t.text) {
            return Err(ConvertError::syntax(t, format!("Duplicate {}", t.text)));
        }
        t.set_kind(Kind::Modifier(ModifierKind::AfterAt));
        mods.push(t.text.clone());
        i += 1;
    }
    if mods.is_empty() {
        return Err(ConvertError::syntax(marker, "Missing accessibility modifier"));
    }
    Ok((mods, i))
}

/// `public static ` for a modifier list, empty for none.
pub(crate) fn prefix_of(mods: &[String]) -> String {
    mods.iter().map(|m| format!("{m} ")).collect()
}

fn reject_in_fn(scope: Scope, marker: &Token) -> Result<(), ConvertError> {
    if scope.container == Container::Fn {
        return Err(ConvertError::syntax(
            marker,
            "Accessibility modifier is not allowed in function",
        ));
    }
    Ok(())
}

/// `-T/U` generics parameter names in a declaration header; `at` is the `-`.
fn parse_generics_params(tokens: &[&Token], at: usize) -> Result<(Vec<String>, usize), ConvertError> {
    tokens[at].set_kind(Kind::Operator(OperatorKind::GenericsParamsAnnotation));
    let mut params = Vec::new();
    let mut i = at + 1;
    loop {
        let name = tokens
            .get(i)
            .filter(|t| t.is_name_like())
            .ok_or_else(|| ConvertError::syntax(tokens[i - 1], "Missing generics parameter"))?;
        name.set_kind(Kind::Name(NameKind::GenericsParam));
        params.push(name.text.clone());
        i += 1;
        match tokens.get(i) {
            Some(t) if t.is_op("/") => {
                t.set_kind(Kind::Operator(OperatorKind::GenericsParamsSeparator));
                i += 1;
            }
            _ => break,
        }
    }
    Ok((params, i))
}

fn generics_suffix(params: &[String]) -> String {
    if params.is_empty() {
        String::new()
    } else {
        format!("<{}>", params.join(", "))
    }
}

/// Type written for a `const` without annotation, inferred from its literal.
fn literal_type(token: &Token) -> Option<&'static str> {
    match token.category {
        Category::StringLiteral | Category::RawStringLiteral => Some("string"),
        Category::CharLiteral => Some("char"),
        Category::NumberLiteral => Some(number_type(&token.text)),
        Category::Keyword => match token.table_kind() {
            Some(Kind::Literal(LiteralKind::Bool)) => Some("bool"),
            _ => None,
        },
        _ => None,
    }
}

fn number_type(text: &str) -> &'static str {
    let lower = text.to_ascii_lowercase();
    let hex = lower.starts_with("0x") || lower.starts_with("0b");
    if lower.ends_with("ul") || lower.ends_with("lu") {
        "ulong"
    } else if lower.ends_with('u') {
        "uint"
    } else if lower.ends_with('l') {
        "long"
    } else if hex {
        "int"
    } else if lower.ends_with('m') {
        "decimal"
    } else if lower.ends_with('f') {
        "float"
    } else if lower.ends_with('d') || lower.contains('.') || lower.contains('e') {
        "double"
    } else {
        "int"
    }
}

/// Type of the single (optionally negated) literal initializing an untyped `const`.
fn const_literal(
    tokens: &[&Token],
    assign: usize,
    name: &Token,
) -> Result<&'static str, ConvertError> {
    let end = find_top_level(tokens, assign + 1, |t| t.is_op(";")).unwrap_or(tokens.len());
    let rhs = significant(&tokens[assign + 1..end]);
    let literal = match rhs.as_slice() {
        [literal] => Some(*literal),
        [sign, literal] if sign.is_op("-") && literal.category == Category::NumberLiteral => {
            Some(*literal)
        }
        _ => None,
    };
    literal.and_then(literal_type).ok_or_else(|| {
        ConvertError::syntax(name, "Const without a type must be initialized with a literal")
    })
}

impl Converter {
    /// Writes `}` closing a declaration body at `indent`.
    pub(crate) fn close_brace(&mut self, indent: usize) {
        self.out.indent(indent);
        self.out.line("}");
    }

    /// Converts the `{ ... }` block opening at `open`, returning the position after `}`.
    pub(crate) fn convert_braced(
        &mut self,
        tokens: &[&Token],
        open: usize,
        outer: Scope,
        inner: Scope,
    ) -> Result<usize, ConvertError> {
        let close = matching_close(tokens, open)
            .ok_or_else(|| ConvertError::syntax(tokens[open], "Missing right brace"))?;
        self.out.line(" {");
        self.convert_block(&tokens[open + 1..close], inner)?;
        self.close_brace(outer.indent);
        Ok(close + 1)
    }

    pub(crate) fn convert_type_declaration<'t>(
        &mut self,
        tokens: &[&'t Token],
        start: usize,
        scope: Scope,
        pending: Modifiers<'t>,
    ) -> Result<usize, ConvertError> {
        let keyword = tokens[start];
        let is_struct = keyword.text == "struct";
        if scope.container == Container::Fn {
            return Err(ConvertError::syntax(
                keyword,
                format!("Cannot declare {} in function", keyword.text),
            ));
        }
        let (prefix, partial) = if is_struct {
            let mods = pending.into_struct()?;
            (mods.prefix(), mods.partial)
        } else {
            let mods = pending.into_class()?;
            (if mods.is_abstract { "abstract " } else { "" }, mods.partial)
        };

        let open = find_top_level(tokens, start + 1, |t| t.is_op("{") || t.is_op(";"))
            .filter(|&i| tokens[i].is_op("{"))
            .ok_or_else(|| ConvertError::syntax(keyword, "Missing left brace"))?;
        let header = significant(&tokens[start + 1..open]);

        let name = header
            .first()
            .filter(|t| t.is_name_like())
            .ok_or_else(|| ConvertError::syntax(keyword, format!("Missing {} name", keyword.text)))?;
        name.set_kind(Kind::Name(if is_struct {
            NameKind::Struct
        } else {
            NameKind::Class
        }));

        let mut i = 1;
        let mut generics = Vec::new();
        if header.get(i).is_some_and(|t| t.is_op("-")) {
            (generics, i) = parse_generics_params(&header, i)?;
        }

        let mut bases = Vec::new();
        if let Some(colon) = header.get(i).filter(|t| t.is_op(":")) {
            colon.set_kind(Kind::Operator(OperatorKind::TypeAnnotation));
            i += 1;
            loop {
                let (base, used) = parse_type(&header[i..], TypeOptions::declaration())?;
                let base = base.ok_or_else(|| ConvertError::syntax(colon, "Missing type"))?;
                bases.push(convert_type(&base, TypePosition::Plain));
                i += used;
                match header.get(i) {
                    Some(t) if t.is_op(",") => i += 1,
                    _ => break,
                }
            }
        }

        let mut access = Vec::new();
        if header.get(i).is_some_and(|t| t.is_op("@")) {
            (access, i) = parse_accessibility(&header, i)?;
        }
        if let Some(extra) = header.get(i) {
            return Err(ConvertError::unexpected(extra));
        }

        trace!(name = %name.text, is_struct, "type declaration");
        self.out.indent(scope.indent);
        let mut text = prefix_of(&access);
        text.push_str(prefix);
        if partial {
            text.push_str("partial ");
        }
        text.push_str(&keyword.text);
        text.push(' ');
        text.push_str(&name.text);
        text.push_str(&generics_suffix(&generics));
        if !bases.is_empty() {
            text.push_str(" : ");
            text.push_str(&bases.join(", "));
        }
        self.out.raw(text);

        let container = if is_struct {
            Container::Struct
        } else {
            Container::Class
        };
        self.convert_braced(tokens, open, scope, scope.enter(container))
    }

    pub(crate) fn convert_fn<'t>(
        &mut self,
        tokens: &[&'t Token],
        start: usize,
        scope: Scope,
        pending: Modifiers<'t>,
    ) -> Result<usize, ConvertError> {
        let keyword = tokens[start];
        let mods = pending.into_fn(scope.container)?;

        let stop = find_top_level(tokens, start + 1, |t| t.is_op("{") || t.is_op(";"))
            .ok_or_else(|| ConvertError::syntax(keyword, "Missing function body"))?;
        let header = significant(&tokens[start + 1..stop]);

        let name = header
            .first()
            .filter(|t| t.is_name_like())
            .ok_or_else(|| ConvertError::syntax(keyword, "Missing function name"))?;
        name.set_kind(Kind::Name(NameKind::Fn));

        let mut i = 1;
        let mut generics = Vec::new();
        if header.get(i).is_some_and(|t| t.is_op("-")) {
            (generics, i) = parse_generics_params(&header, i)?;
        }

        let at = find_top_level(&header, i, |t| t.is_op("@")).unwrap_or(header.len());
        let signature = &header[i..at];
        let (args, returned) = if signature.is_empty() {
            (Vec::new(), Type::normal("void"))
        } else {
            let (function, used) = parse_function_type(
                signature,
                FnTypeOptions {
                    has_arg_names: true,
                    at_fn_decl: true,
                    early_return: false,
                    next_early_return: false,
                },
            )?;
            if let Some(extra) = signature.get(used) {
                return Err(ConvertError::unexpected(extra));
            }
            match function.kind {
                sharpc_ast::TypeKind::Function(f) => (f.args, *f.returned),
                _ => {
                    return Err(ConvertError::unhandled(
                        Some(keyword),
                        "Function signature did not produce a function type",
                    ));
                }
            }
        };

        let mut access = Vec::new();
        if at < header.len() {
            reject_in_fn(scope, header[at])?;
            let (mods, end) = parse_accessibility(&header, at)?;
            if let Some(extra) = header.get(end) {
                return Err(ConvertError::unexpected(extra));
            }
            access = mods;
        }

        let mut text = prefix_of(&access);
        if let Some(inheritance) = mods.inheritance {
            text.push_str(inheritance.as_str());
            text.push(' ');
        }
        if mods.is_async {
            text.push_str("async ");
        }
        if mods.partial {
            text.push_str("partial ");
        }
        let params: Vec<String> = args.iter().map(convert_parameter).collect();
        text.push_str(&format!(
            "{} {}{}({})",
            convert_type(&returned, TypePosition::Return),
            name.text,
            generics_suffix(&generics),
            params.join(", ")
        ));
        trace!(name = %name.text, args = args.len(), "function declaration");

        let is_abstract = mods.inheritance == Some(Inheritance::Abstract);
        self.out.indent(scope.indent);
        if tokens[stop].is_op(";") {
            if !(mods.partial || is_abstract) {
                return Err(ConvertError::syntax(tokens[stop], "Missing function body"));
            }
            text.push(';');
            self.out.line(text);
            return Ok(stop + 1);
        }
        if is_abstract {
            return Err(ConvertError::syntax(
                tokens[stop],
                "Abstract function cannot have a body",
            ));
        }
        self.out.raw(text);
        self.convert_braced(tokens, stop, scope, scope.enter_fn(mods.is_yield))
    }

    pub(crate) fn convert_variable<'t>(
        &mut self,
        tokens: &[&'t Token],
        start: usize,
        scope: Scope,
        pending: Modifiers<'t>,
        kind: VariableKind,
    ) -> Result<usize, ConvertError> {
        let keyword = tokens[start];
        pending.into_variable()?;

        let stop = find_top_level(tokens, start + 1, |t| is_assignment(t) || t.is_op(";"));
        let header_end = stop.unwrap_or(tokens.len());
        let header = significant(&tokens[start + 1..header_end]);

        let name = header
            .first()
            .filter(|t| t.is_name_like())
            .ok_or_else(|| ConvertError::syntax(keyword, "Missing variable name"))?;
        name.set_kind(Kind::Name(match (kind, scope.container) {
            (VariableKind::Const, _) => NameKind::Const,
            (_, Container::Class | Container::Struct) => NameKind::Field,
            _ => NameKind::Var,
        }));

        let at = find_top_level(&header, 1, |t| t.is_op("@")).unwrap_or(header.len());
        let ty = match header.get(1) {
            Some(colon) if colon.is_op(":") => {
                colon.set_kind(Kind::Operator(OperatorKind::TypeAnnotation));
                Some(parse_complete_type(&header[2..at], colon)?)
            }
            Some(extra) if at > 1 => return Err(ConvertError::unexpected(extra)),
            _ => None,
        };

        let mut access = Vec::new();
        if at < header.len() {
            reject_in_fn(scope, header[at])?;
            let (mods, end) = parse_accessibility(&header, at)?;
            if let Some(extra) = header.get(end) {
                return Err(ConvertError::unexpected(extra));
            }
            access = mods;
        }

        let Some(stop) = stop else {
            let last = header.last().copied().unwrap_or(keyword);
            return Err(ConvertError::syntax(last, "Missing semicolon"));
        };
        let terminator = tokens[stop];
        if !(terminator.is_op("=") || terminator.is_op(";")) {
            return Err(ConvertError::unexpected(terminator));
        }

        if kind == VariableKind::Field && ty.is_none() {
            return Err(ConvertError::syntax(name, "Immutable field requires a type"));
        }

        let type_text = match (&ty, kind) {
            (Some(ty), _) => convert_type(ty, TypePosition::Plain),
            (None, VariableKind::Const) => {
                const_literal(tokens, stop, name)?.to_string()
            }
            (None, _) if terminator.is_op(";") => {
                return Err(ConvertError::syntax(name, "Missing type"));
            }
            (None, _) if scope.container == Container::Fn => "var".to_string(),
            (None, _) => {
                return Err(ConvertError::syntax(
                    name,
                    "Type inference is only allowed for local variables",
                ));
            }
        };

        let mut text = prefix_of(&access);
        match kind {
            VariableKind::Const => text.push_str("const "),
            VariableKind::Field => text.push_str("readonly "),
            VariableKind::Let => {}
        }
        text.push_str(&type_text);
        text.push(' ');
        text.push_str(&name.text);

        self.out.indent(scope.indent);
        if terminator.is_op(";") {
            if kind == VariableKind::Const {
                return Err(ConvertError::syntax(
                    name,
                    "Const must be initialized with constant value",
                ));
            }
            text.push(';');
            self.out.line(text);
            return Ok(stop + 1);
        }

        terminator.set_kind(Kind::Operator(OperatorKind::Assignment));
        text.push_str(" = ");
        self.out.raw(text);
        let rhs = self.convert_right_side(tokens, stop + 1, scope)?;
        if kind == VariableKind::Const && !rhs.is_const {
            return Err(ConvertError::syntax(
                name,
                "Const must be initialized with constant value",
            ));
        }
        Ok(rhs.end)
    }

    pub(crate) fn convert_using(
        &mut self,
        tokens: &[&Token],
        start: usize,
        scope: Scope,
    ) -> Result<usize, ConvertError> {
        let keyword = tokens[start];
        if !matches!(scope.container, Container::TopLevel | Container::Namespace) {
            return Err(ConvertError::syntax(
                keyword,
                "Using is only allowed at top level or in a namespace",
            ));
        }
        let stop = find_top_level(tokens, start + 1, |t| t.is_op(";"))
            .ok_or_else(|| ConvertError::syntax(keyword, "Missing semicolon"))?;
        let body = significant(&tokens[start + 1..stop]);

        let mut names = Vec::new();
        let mut any_static = false;
        let mut any_global = false;
        let mut i = 0;
        while i < body.len() {
            let mut name = String::new();
            loop {
                let segment = body
                    .get(i)
                    .filter(|t| t.is_word())
                    .ok_or_else(|| ConvertError::syntax(body[i.saturating_sub(1)], "Missing namespace name"))?;
                segment.set_kind(Kind::Name(NameKind::Namespace));
                name.push_str(&segment.text);
                i += 1;
                match body.get(i) {
                    Some(dot) if dot.is_op(".") => {
                        dot.set_kind(Kind::Operator(OperatorKind::Accessor));
                        name.push('.');
                        i += 1;
                    }
                    _ => break,
                }
            }

            if let Some(marker) = body.get(i).filter(|t| t.is_op("@")) {
                marker.set_kind(Kind::Operator(OperatorKind::AccessibilityAnnotation));
                i += 1;
                let mut is_static = false;
                let mut is_global = false;
                while let Some(flag) = body.get(i) {
                    let seen = if flag.is_keyword("static") {
                        &mut is_static
                    } else if flag.is_keyword("global") {
                        &mut is_global
                    } else {
                        break;
                    };
                    if *seen {
                        return Err(ConvertError::syntax(flag, format!("Duplicate {}", flag.text)));
                    }
                    *seen = true;
                    i += 1;
                }
                if !(is_static || is_global) {
                    return Err(ConvertError::syntax(marker, "Missing using modifier"));
                }
                any_static |= is_static;
                any_global |= is_global;
            }
            names.push(name);

            match body.get(i) {
                None => break,
                Some(t) if t.is_op(",") && i + 1 < body.len() => i += 1,
                Some(t) => return Err(ConvertError::unexpected(t)),
            }
        }
        if names.is_empty() {
            return Err(ConvertError::syntax(keyword, "Missing namespace name"));
        }

        let global = if any_global { "global " } else { "" };
        let is_static = if any_static { "static " } else { "" };
        for name in names {
            self.out.indent(scope.indent);
            self.out.line(format!("{global}using {is_static}{name};"));
        }
        Ok(stop + 1)
    }

    pub(crate) fn convert_namespace<'t>(
        &mut self,
        tokens: &[&'t Token],
        start: usize,
        scope: Scope,
    ) -> Result<Statement<'t>, ConvertError> {
        let keyword = tokens[start];
        if !matches!(scope.container, Container::TopLevel | Container::Namespace) {
            return Err(ConvertError::syntax(
                keyword,
                "Namespace is only allowed at top level or in a namespace",
            ));
        }
        let stop = find_top_level(tokens, start + 1, |t| t.is_op("{") || t.is_op(";"))
            .ok_or_else(|| ConvertError::syntax(keyword, "Missing left brace"))?;
        let header = significant(&tokens[start + 1..stop]);
        if header.is_empty() {
            return Err(ConvertError::syntax(keyword, "Missing namespace name"));
        }
        let mut name = String::new();
        for (i, t) in header.iter().enumerate() {
            let valid = if i % 2 == 0 { t.is_word() } else { t.is_op(".") };
            if !valid {
                return Err(ConvertError::unexpected(t));
            }
            if i % 2 == 0 {
                t.set_kind(Kind::Name(NameKind::Namespace));
            }
            name.push_str(&t.text);
        }
        if header.len() % 2 == 0 {
            return Err(ConvertError::syntax(header[header.len() - 1], "Missing namespace name"));
        }

        self.out.indent(scope.indent);
        if tokens[stop].is_op(";") {
            if scope.container != Container::TopLevel {
                return Err(ConvertError::syntax(
                    tokens[stop],
                    "File-scoped namespace must be at top level",
                ));
            }
            self.out.line(format!("namespace {name};"));
            return Ok(Statement {
                end: stop + 1,
                pending: Modifiers::default(),
                enters: Some(Container::Namespace),
            });
        }
        self.out.raw(format!("namespace {name}"));
        let end = self.convert_braced(tokens, stop, scope, scope.enter(Container::Namespace))?;
        Ok(Statement::done(end))
    }
}

#[cfg(test)]
mod tests {
    use crate::convert;
    use pretty_assertions::assert_eq;

    #[test]
    fn class_with_generics_bases_and_access() {
        let src = "abstract partial class Repo-T/U: Base-T, IDisposable @public {\n}";
        assert_eq!(
            convert(src).unwrap(),
            "public abstract partial class Repo<T, U> : Base<T>, IDisposable {\r\n}\r\n"
        );
    }

    #[test]
    fn struct_modifiers() {
        assert_eq!(
            convert("immut ref struct Span @public {}").unwrap(),
            "public readonly ref struct Span {\r\n}\r\n"
        );
        let err = convert("fn Main {\n  class Inner {}\n}").unwrap_err();
        assert_eq!(err.message(), "Cannot declare class in function");
    }

    #[test]
    fn function_headers() {
        assert_eq!(convert("fn Run {}").unwrap(), "void Run() {\r\n}\r\n");
        assert_eq!(
            convert("async fn Load-T path: string, ref count: int => Task-T @public {}").unwrap(),
            "public async Task<T> Load<T>(string path, ref int count) {\r\n}\r\n"
        );
        assert_eq!(
            convert("class A {\n  abstract fn Area _ => double @public;\n}").unwrap(),
            "class A {\r\n  public abstract double Area();\r\n}\r\n"
        );
    }

    #[test]
    fn function_legality() {
        let err = convert("fn Outer {\n  fn Inner @private {}\n}").unwrap_err();
        assert_eq!(err.message(), "Accessibility modifier is not allowed in function");
        let err = convert("fn Run;").unwrap_err();
        assert_eq!(err.message(), "Missing function body");
        let err = convert("override fn Run {}").unwrap_err();
        assert_eq!(err.message(), "override is not allowed for function");
    }

    #[test]
    fn variables_and_fields() {
        let src = "class Counter {\n  immut step: int @private = 1;\n  let total: long;\n}";
        assert_eq!(
            convert(src).unwrap(),
            "class Counter {\r\n  private readonly int step = 1;\r\n  long total;\r\n}\r\n"
        );
        let err = convert("let x = 1;").unwrap_err();
        assert_eq!(err.message(), "Type inference is only allowed for local variables");
    }

    #[test]
    fn const_infers_literal_types() {
        assert_eq!(convert("const Max = 10;").unwrap(), "const int Max = 10;\r\n");
        assert_eq!(convert("const Ratio = 0.5f;").unwrap(), "const float Ratio = 0.5f;\r\n");
        assert_eq!(
            convert("const Name = \"sharp\";").unwrap(),
            "const string Name = \"sharp\";\r\n"
        );
        let err = convert("const Now: long = Clock.Ticks();").unwrap_err();
        assert_eq!(err.message(), "Const must be initialized with constant value");
    }

    #[test]
    fn typed_const_accepts_operator_expression() {
        assert_eq!(
            convert("const Total: int = 1 + 2 * 3;").unwrap(),
            "const int Total = 1 + 2 * 3;\r\n"
        );
    }

    #[test]
    fn using_flags_apply_to_every_entry() {
        assert_eq!(
            convert("using System.Math @static, System.Linq;").unwrap(),
            "using static System.Math;\r\nusing static System.Linq;\r\n"
        );
        assert_eq!(
            convert("using System @global @static;").unwrap_err().message(),
            "Unexpected token: @"
        );
        let err = convert("fn Run {\n  using System;\n}").unwrap_err();
        assert_eq!(err.message(), "Using is only allowed at top level or in a namespace");
    }

    #[test]
    fn namespaces() {
        assert_eq!(
            convert("namespace App.Core {\n  class A {}\n}").unwrap(),
            "namespace App.Core {\r\n  class A {\r\n  }\r\n}\r\n"
        );
        assert_eq!(
            convert("namespace App;\nusing System;").unwrap(),
            "namespace App;\r\nusing System;\r\n"
        );
    }
}
