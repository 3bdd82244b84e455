#![forbid(unsafe_code)]

//! Recursive-descent parser for the surface type grammar.
//!
//! Every function here works on trivia-free token slices and returns the parsed
//! value together with the number of tokens it consumed.

use sharpc_ast::{
    Accessor, ParamModifier, QualifiedName, TupleElement, Type, TypeKind, Variable, span_between,
};
use sharpc_lex::{Category, Kind, KeywordKind, NameKind, OperatorKind, Token};
use tracing::trace;

use crate::error::ConvertError;
use crate::scan::{find_top_level, matching_close};

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub(crate) struct TypeOptions {
    /// Stop at a tuple connector instead of building a tuple.
    pub early_return: bool,
    /// Passed down to function and generics terms.
    pub next_early_return: bool,
    /// Nested generics take a single parameter.
    pub in_generics: bool,
}

impl TypeOptions {
    /// Options for a type written in a declaration (`let x: T`, property types).
    pub(crate) fn declaration() -> Self {
        Self {
            early_return: false,
            next_early_return: true,
            in_generics: false,
        }
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub(crate) struct FnTypeOptions {
    /// Arguments are `name: Type` variables rather than bare types.
    pub has_arg_names: bool,
    /// Declaration signature: the arrow and return type may be omitted.
    pub at_fn_decl: bool,
    pub early_return: bool,
    pub next_early_return: bool,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Shape {
    Normal,
    Array,
    Tuple,
    /// A complete parenthesised term.
    Group,
}

const TERMINATORS: [&str; 7] = [",", "/", "=>", "{", ";", "=", "@"];

fn annotate(token: &Token, kind: OperatorKind) {
    token.set_kind(Kind::Operator(kind));
}

fn accessor_of(token: Option<&&Token>) -> Option<Accessor> {
    token
        .filter(|t| t.category == Category::Operator)
        .and_then(|t| Accessor::from_text(&t.text))
}

/// Word tokens that can name a type.
fn is_type_name(token: &Token) -> bool {
    token.is_name_like() || token.keyword_kind() == Some(KeywordKind::BuiltinType)
}

fn annotate_name(token: &Token) {
    if token.text == "_" {
        token.set_kind(Kind::Name(NameKind::Discard));
    } else if token.category == Category::Identifier {
        token.set_kind(Kind::Name(NameKind::Other));
    }
}

fn is_op(token: Option<&&Token>, text: &str) -> bool {
    token.is_some_and(|t| t.is_op(text))
}

/// `a.b.c` written with plain `.` accessors only.
fn dotted_name(tokens: &[&Token]) -> Option<String> {
    if tokens.len() < 3 || tokens.len() % 2 == 0 {
        return None;
    }
    let alternates = tokens.iter().enumerate().all(|(i, t)| {
        if i % 2 == 0 {
            is_type_name(t)
        } else {
            t.is_op(".")
        }
    });
    if !alternates {
        return None;
    }
    for (i, t) in tokens.iter().enumerate() {
        if i % 2 == 0 {
            annotate_name(t);
        } else {
            annotate(t, OperatorKind::Accessor);
        }
    }
    Some(tokens.iter().map(|t| t.text.as_str()).collect())
}

/// A new term may start only at the beginning or right after a `~`.
fn can_start_term(shape: Option<Shape>, open_connector: Option<&Token>) -> bool {
    shape.is_none() || open_connector.is_some()
}

fn last_element(ty: &mut Type) -> Option<&mut Type> {
    match &mut ty.kind {
        TypeKind::Tuple(elements) => elements.last_mut().map(TupleElement::ty_mut),
        _ => None,
    }
}

/// Replaces the type stored in `slot` with an array of it.
fn wrap_in_array(slot: &mut Type) {
    let inner = std::mem::replace(slot, Type::normal(String::new()));
    *slot = Type::array(inner);
}

pub(crate) fn parse_type(
    tokens: &[&Token],
    opts: TypeOptions,
) -> Result<(Option<Type>, usize), ConvertError> {
    let Some(&first) = tokens.first() else {
        return Ok((None, 0));
    };

    if let Some(name) = dotted_name(tokens) {
        return Ok((Some(Type::normal(name)), tokens.len()));
    }

    let mut ty: Option<Type> = None;
    let mut shape: Option<Shape> = None;
    let mut pending: Vec<QualifiedName> = Vec::new();
    // The `~` whose element has not been parsed yet.
    let mut open_connector: Option<&Token> = None;
    let mut i = 0;

    while i < tokens.len() {
        let t = tokens[i];

        if t.is_op("(") {
            // `Foo(` in `new Foo(...)`: the type ends before the argument list.
            if !can_start_term(shape, open_connector) {
                break;
            }
            let close = matching_close(tokens, i)
                .ok_or_else(|| ConvertError::syntax(t, "Missing right parenthesis"))?;
            if close == i + 1 {
                return Err(ConvertError::syntax(t, "Cannot have empty parentheses"));
            }
            let inner_tokens = &tokens[i + 1..close];
            let (inner, used) = parse_type(
                inner_tokens,
                TypeOptions {
                    early_return: false,
                    next_early_return: opts.next_early_return,
                    in_generics: false,
                },
            )?;
            if let Some(extra) = inner_tokens.get(used) {
                return Err(ConvertError::unexpected(extra));
            }
            let inner = inner.ok_or_else(|| ConvertError::syntax(t, "Missing type"))?;

            if let Some(accessor) = accessor_of(tokens.get(close + 1)) {
                if !matches!(inner.kind, TypeKind::Normal { .. } | TypeKind::Generics(_)) {
                    return Err(ConvertError::syntax(t, "Only names can be qualified"));
                }
                let accessor_token = tokens[close + 1];
                annotate(accessor_token, OperatorKind::Accessor);
                pending.push(QualifiedName {
                    segment: inner,
                    accessor,
                    segment_span: span_between(t.start, tokens[close].end),
                    accessor_span: accessor_token.span(),
                });
                i = close + 2;
                continue;
            }

            let inner = inner.with_qualifiers(std::mem::take(&mut pending));
            if let Some(Type { kind: TypeKind::Tuple(elements), .. }) = ty.as_mut() {
                elements.push(TupleElement::Unnamed(inner));
                open_connector = None;
            } else {
                ty = Some(inner);
                shape = Some(Shape::Group);
            }
            i = close + 1;
            continue;
        }

        if t.category == Category::Operator {
            match t.text.as_str() {
                "?" => {
                    let current = ty.as_mut().ok_or_else(|| ConvertError::unexpected(t))?;
                    if open_connector.is_some() {
                        return Err(ConvertError::unexpected(t));
                    }
                    let target = if shape == Some(Shape::Tuple) {
                        last_element(current).ok_or_else(|| ConvertError::unexpected(t))?
                    } else {
                        current
                    };
                    if target.nullable {
                        return Err(ConvertError::syntax(t, "Duplicate nullable"));
                    }
                    target.nullable = true;
                    i += 1;
                }
                "~" => {
                    if opts.early_return {
                        break;
                    }
                    if open_connector.is_some() {
                        return Err(ConvertError::unexpected(t));
                    }
                    annotate(t, OperatorKind::TupleConnector);
                    match shape {
                        Some(Shape::Tuple) => {}
                        Some(_) => {
                            let head = ty.take().ok_or_else(|| ConvertError::unexpected(t))?;
                            ty = Some(Type::tuple(vec![TupleElement::Unnamed(head)]));
                            shape = Some(Shape::Tuple);
                        }
                        None => return Err(ConvertError::unexpected(t)),
                    }
                    open_connector = Some(t);
                    i += 1;
                }
                "#" => {
                    let current = ty.as_mut().ok_or_else(|| ConvertError::unexpected(t))?;
                    if open_connector.is_some() {
                        return Err(ConvertError::unexpected(t));
                    }
                    annotate(t, OperatorKind::ArrayMarker);
                    if shape == Some(Shape::Tuple) {
                        let last =
                            last_element(current).ok_or_else(|| ConvertError::unexpected(t))?;
                        wrap_in_array(last);
                    } else {
                        wrap_in_array(current);
                        shape = Some(Shape::Array);
                    }
                    i += 1;
                }
                text if TERMINATORS.contains(&text) => break,
                _ => return Err(ConvertError::unexpected(t)),
            }
            continue;
        }

        if t.is_keyword("fn") {
            let mut j = i + 1;
            let nullable = is_op(tokens.get(j), "?");
            if nullable {
                j += 1;
            }
            let colon = tokens
                .get(j)
                .filter(|c| c.is_op(":"))
                .ok_or_else(|| ConvertError::syntax(t, "Missing colon"))?;
            annotate(colon, OperatorKind::TypeAnnotation);
            if let Some(q) = pending.last() {
                return Err(ConvertError::syntax_at(
                    Some(q.accessor_span),
                    "Function type cannot be qualified",
                ));
            }
            if !can_start_term(shape, open_connector) {
                return Err(ConvertError::syntax(t, "Unexpected function type"));
            }
            let (mut function, used) = parse_function_type(
                &tokens[j + 1..],
                FnTypeOptions {
                    has_arg_names: false,
                    at_fn_decl: false,
                    early_return: opts.early_return,
                    next_early_return: opts.next_early_return,
                },
            )?;
            function.nullable = nullable;
            i = j + 1 + used;
            if let Some(Type { kind: TypeKind::Tuple(elements), .. }) = ty.as_mut() {
                elements.push(TupleElement::Unnamed(function));
                open_connector = None;
                continue;
            }
            ty = Some(function);
            break;
        }

        if !is_type_name(t) {
            return Err(ConvertError::unexpected(t));
        }
        let next = tokens.get(i + 1);

        if is_op(next, "-") && i + 2 < tokens.len() {
            if !can_start_term(shape, open_connector) {
                return Err(ConvertError::syntax(t, "Unexpected generics type"));
            }
            let (generics, used) = parse_generics_type(
                &tokens[i..],
                opts.next_early_return,
                true,
                opts.in_generics,
            )?;
            let generics = generics.with_qualifiers(std::mem::take(&mut pending));
            i += used;
            if let Some(Type { kind: TypeKind::Tuple(elements), .. }) = ty.as_mut() {
                elements.push(TupleElement::Unnamed(generics));
                open_connector = None;
                continue;
            }
            ty = Some(generics);
            break;
        }

        if let Some(accessor) = accessor_of(next) {
            let accessor_token = tokens[i + 1];
            if i + 2 >= tokens.len() {
                return Err(ConvertError::syntax(accessor_token, "Missing type"));
            }
            annotate_name(t);
            annotate(accessor_token, OperatorKind::Accessor);
            pending.push(QualifiedName {
                segment: Type::normal(t.text.clone()),
                accessor,
                segment_span: t.span(),
                accessor_span: accessor_token.span(),
            });
            i += 2;
            continue;
        }

        if is_op(next, ":") && i + 2 < tokens.len() {
            if let Some(q) = pending.last() {
                return Err(ConvertError::syntax_at(
                    Some(q.accessor_span),
                    "Unexpected accessor",
                ));
            }
            if !can_start_term(shape, open_connector) {
                return Err(ConvertError::unexpected(t));
            }
            let (var, used) = parse_variable(&tokens[i..], false, true, false)?;
            let var = var.ok_or_else(|| ConvertError::unexpected(t))?;
            let element = TupleElement::Named(var);
            match ty.as_mut() {
                Some(Type { kind: TypeKind::Tuple(elements), .. }) => elements.push(element),
                _ => {
                    ty = Some(Type::tuple(vec![element]));
                    shape = Some(Shape::Tuple);
                }
            }
            open_connector = None;
            i += used;
            continue;
        }

        if !can_start_term(shape, open_connector) {
            return Err(ConvertError::unexpected(t));
        }
        annotate_name(t);
        let normal = Type::normal(t.text.clone()).with_qualifiers(std::mem::take(&mut pending));
        match ty.as_mut() {
            Some(Type { kind: TypeKind::Tuple(elements), .. }) => {
                elements.push(TupleElement::Unnamed(normal));
                open_connector = None;
            }
            _ => {
                ty = Some(normal);
                shape = Some(Shape::Normal);
            }
        }
        i += 1;
    }

    if let Some(connector) = open_connector {
        return Err(ConvertError::syntax(connector, "Missing type"));
    }
    if let Some(q) = pending.last() {
        return Err(ConvertError::syntax_at(Some(q.accessor_span), "Missing type"));
    }
    let ty = ty.ok_or_else(|| ConvertError::syntax(first, "Missing type"))?;
    trace!(consumed = i, "parsed type");
    Ok((Some(ty), i))
}

pub(crate) fn parse_function_type(
    tokens: &[&Token],
    opts: FnTypeOptions,
) -> Result<(Type, usize), ConvertError> {
    let Some(&first) = tokens.first() else {
        return Err(ConvertError::syntax_at(None, "Missing function type"));
    };

    let mut args = Vec::new();
    let mut i = 0;

    if first.text == "_" && first.category == Category::Identifier {
        first.set_kind(Kind::Name(NameKind::Discard));
        if !is_op(tokens.get(1), "=>") {
            return Err(ConvertError::syntax(first, "Missing function arrow"));
        }
        i = 1;
    } else {
        loop {
            if opts.has_arg_names {
                let (var, used) =
                    parse_variable(&tokens[i..], true, opts.early_return, opts.next_early_return)?;
                let var = var.ok_or_else(|| ConvertError::unexpected(tokens[i]))?;
                args.push(var);
                i += used;
            } else {
                let (ty, used) = parse_type(
                    &tokens[i..],
                    TypeOptions {
                        early_return: opts.early_return,
                        next_early_return: opts.next_early_return,
                        in_generics: false,
                    },
                )?;
                let ty = ty.ok_or_else(|| ConvertError::syntax(tokens[i - 1], "Missing type"))?;
                args.push(Variable::new("", ty));
                i += used;
            }

            match tokens.get(i) {
                None if opts.at_fn_decl => {
                    return Ok((Type::function(args, Type::normal("void")), i));
                }
                None => {
                    return Err(ConvertError::syntax(tokens[i - 1], "Missing returned type"));
                }
                Some(t) if opts.at_fn_decl && (t.is_op("@") || t.is_op("{")) => {
                    return Ok((Type::function(args, Type::normal("void")), i));
                }
                Some(t) if t.is_op(",") => {
                    annotate(t, OperatorKind::FnArgsSeparator);
                    i += 1;
                    if i >= tokens.len() {
                        return Err(ConvertError::syntax(t, "Missing type"));
                    }
                }
                Some(t) if t.is_op("=>") => break,
                Some(t) => return Err(ConvertError::unexpected(t)),
            }
        }
    }

    let arrow = tokens[i];
    annotate(arrow, OperatorKind::FnArrow);
    let (returned, used) = parse_type(&tokens[i + 1..], TypeOptions::declaration())?;
    let returned =
        returned.ok_or_else(|| ConvertError::syntax(arrow, "Missing returned type"))?;
    Ok((Type::function(args, returned), i + 1 + used))
}

/// Parses `[ref [immut] | in | out | params] name: Type`.
///
/// A lone `_` is a discard and yields no variable.
pub(crate) fn parse_variable(
    tokens: &[&Token],
    is_fn_arg: bool,
    early_return: bool,
    next_early_return: bool,
) -> Result<(Option<Variable>, usize), ConvertError> {
    let Some(&first) = tokens.first() else {
        return Err(ConvertError::syntax_at(None, "Missing variable name"));
    };
    if first.text == "_" && first.category == Category::Identifier {
        first.set_kind(Kind::Name(NameKind::Discard));
        return Ok((None, 1));
    }
    if tokens.len() == 1 {
        return Err(ConvertError::syntax(first, "Missing type"));
    }

    let (modifier, mut i) = if first.is_keyword("ref") {
        if tokens.get(1).is_some_and(|t| t.is_keyword("immut")) {
            (Some(ParamModifier::RefReadonly), 2)
        } else {
            (Some(ParamModifier::Ref), 1)
        }
    } else if first.is_keyword("in") {
        (Some(ParamModifier::In), 1)
    } else if first.is_keyword("out") {
        (Some(ParamModifier::Out), 1)
    } else if first.is_keyword("params") {
        (Some(ParamModifier::Params), 1)
    } else {
        (None, 0)
    };
    if modifier.is_some() && !is_fn_arg {
        return Err(ConvertError::syntax(
            first,
            format!("{} is only allowed for function arguments", first.text),
        ));
    }

    let name = tokens
        .get(i)
        .ok_or_else(|| ConvertError::syntax(tokens[i - 1], "Missing variable name"))?;
    if !name.is_name_like() {
        return Err(ConvertError::unexpected(name));
    }
    let colon = tokens
        .get(i + 1)
        .filter(|t| t.is_op(":"))
        .ok_or_else(|| ConvertError::syntax(name, "Missing colon"))?;
    name.set_kind(Kind::Name(if is_fn_arg {
        NameKind::FnArg
    } else {
        NameKind::Var
    }));
    annotate(colon, OperatorKind::TypeAnnotation);
    i += 2;

    let (ty, used) = parse_type(
        &tokens[i..],
        TypeOptions {
            early_return,
            next_early_return,
            in_generics: false,
        },
    )?;
    let ty = ty.ok_or_else(|| ConvertError::syntax(colon, "Missing type"))?;
    let var = Variable {
        name: name.text.clone(),
        ty,
        modifier,
    };
    Ok((Some(var), i + used))
}

/// Comma-separated `name: Type` list filling the whole slice (lambda parameters).
pub(crate) fn parse_variables(tokens: &[&Token]) -> Result<Vec<Variable>, ConvertError> {
    let mut vars = Vec::new();
    let mut i = 0;
    while i < tokens.len() {
        let (var, used) = parse_variable(&tokens[i..], true, false, true)?;
        let var = var.ok_or_else(|| ConvertError::unexpected(tokens[i]))?;
        vars.push(var);
        i += used;
        match tokens.get(i) {
            None => break,
            Some(t) if t.is_op(",") && i + 1 < tokens.len() => {
                annotate(t, OperatorKind::FnArgsSeparator);
                i += 1;
            }
            Some(t) => return Err(ConvertError::unexpected(t)),
        }
    }
    Ok(vars)
}

/// Parses `Head - P1 / P2 ...`; `tokens[0]` is the head name.
pub(crate) fn parse_generics_type(
    tokens: &[&Token],
    early_return: bool,
    next_early_return: bool,
    in_generics: bool,
) -> Result<(Type, usize), ConvertError> {
    let Some(&head) = tokens.first() else {
        return Err(ConvertError::syntax_at(None, "Missing type"));
    };
    let dash = tokens
        .get(1)
        .filter(|t| t.is_op("-"))
        .ok_or_else(|| ConvertError::syntax(head, "Missing generics parameter"))?;
    annotate_name(head);
    annotate(dash, OperatorKind::GenericsParamsAnnotation);

    let param_opts = TypeOptions {
        early_return: false,
        next_early_return,
        in_generics: true,
    };
    let mut params = Vec::new();
    let mut i = 2;
    let mut last_separator = *dash;

    loop {
        if i >= tokens.len() {
            return Err(ConvertError::syntax(last_separator, "Missing generics parameter"));
        }

        let grouped_close = if tokens[i].is_op("(") {
            matching_close(tokens, i).filter(|&close| {
                find_top_level(&tokens[i + 1..close], 0, |t| t.is_op("/")).is_some()
            })
        } else {
            None
        };

        if let Some(close) = grouped_close {
            let inner = &tokens[i + 1..close];
            let mut j = 0;
            loop {
                let (param, used) = parse_type(&inner[j..], param_opts)?;
                let param = param.ok_or_else(|| {
                    ConvertError::syntax(tokens[i], "Missing generics parameter")
                })?;
                params.push(param);
                j += used;
                match inner.get(j) {
                    None => break,
                    Some(t) if t.is_op("/") => {
                        annotate(t, OperatorKind::GenericsParamsSeparator);
                        j += 1;
                        if j >= inner.len() {
                            return Err(ConvertError::syntax(t, "Missing generics parameter"));
                        }
                    }
                    Some(t) => return Err(ConvertError::unexpected(t)),
                }
            }
            i = close + 1;
        } else {
            let (param, used) = parse_type(&tokens[i..], param_opts)?;
            let param = param.ok_or_else(|| {
                ConvertError::syntax(last_separator, "Missing generics parameter")
            })?;
            params.push(param);
            i += used;
        }

        match tokens.get(i) {
            Some(t) if t.is_op("/") && !(early_return && in_generics) => {
                annotate(t, OperatorKind::GenericsParamsSeparator);
                last_separator = t;
                i += 1;
            }
            _ => break,
        }
    }

    Ok((Type::generics(Type::normal(head.text.clone()), params), i))
}

/// Parses a declaration type that must span the whole slice.
pub(crate) fn parse_complete_type(
    tokens: &[&Token],
    anchor: &Token,
) -> Result<Type, ConvertError> {
    let (ty, used) = parse_type(tokens, TypeOptions::declaration())?;
    if let Some(extra) = tokens.get(used) {
        return Err(ConvertError::unexpected(extra));
    }
    ty.ok_or_else(|| ConvertError::syntax(anchor, "Missing type"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::render::{TypePosition, convert_type};
    use sharpc_lex::Lexer;

    fn render(src: &str) -> String {
        let tokens = Lexer::new(src).lex().unwrap();
        let refs: Vec<&Token> = tokens.iter().filter(|t| !t.is_trivia()).collect();
        let ty = parse_complete_type(&refs, refs[0]).unwrap();
        convert_type(&ty, TypePosition::Plain)
    }

    fn error(src: &str) -> String {
        let tokens = Lexer::new(src).lex().unwrap();
        let refs: Vec<&Token> = tokens.iter().filter(|t| !t.is_trivia()).collect();
        parse_complete_type(&refs, refs[0])
            .unwrap_err()
            .message()
            .to_string()
    }

    #[test]
    fn array_marker_renders_brackets() {
        assert_eq!(render("int#"), "int[]");
        assert_eq!(render("int##"), "int[][]");
        assert_eq!(render("int?#"), "int?[]");
        assert_eq!(render("int#?"), "int[]?");
    }

    #[test]
    fn generics_parameters() {
        assert_eq!(render("Name-int/string"), "Name<int, string>");
        assert_eq!(
            render("Dictionary-string/List-int"),
            "Dictionary<string, List<int>>"
        );
        assert_eq!(render("A-B-c/d"), "A<B<c>, d>");
        assert_eq!(
            render("Array-int/Array-(string/int)"),
            "Array<int, Array<string, int>>"
        );
        assert_eq!(render("List-int#"), "List<int[]>");
        assert_eq!(render("(List-int)#"), "List<int>[]");
    }

    #[test]
    fn function_types() {
        assert_eq!(render("fn: int, string => bool"), "Func<int, string, bool>");
        assert_eq!(render("fn: int => _"), "Action<int>");
        assert_eq!(render("fn: _ => _"), "Action");
        assert_eq!(render("fn: _ => int"), "Func<int>");
        assert_eq!(render("fn?: int => void"), "Action<int>?");
    }

    #[test]
    fn tuple_types() {
        assert_eq!(render("a: int ~ b: string"), "(int a, string b)");
        assert_eq!(render("int ~ string?"), "(int, string?)");
        assert_eq!(render("int ~ string#"), "(int, string[])");
        assert_eq!(render("a: int"), "Tuple<int>");
        assert_eq!(render("(int ~ bool) ~ char"), "((int, bool), char)");
    }

    #[test]
    fn qualified_names() {
        assert_eq!(
            render("System.Text.StringBuilder"),
            "System.Text.StringBuilder"
        );
        assert_eq!(render("System.Text.StringBuilder?"), "System.Text.StringBuilder?");
        assert_eq!(render("(List-int).Enumerator"), "List<int>.Enumerator");
        assert_eq!(
            render("System.Collections.Generic.List-int"),
            "System.Collections.Generic.List<int>"
        );
    }

    #[test]
    fn malformed_types_are_rejected() {
        assert_eq!(error("int? ?"), "Duplicate nullable");
        assert_eq!(error("()"), "Cannot have empty parentheses");
        assert_eq!(error("(int"), "Missing right parenthesis");
        assert_eq!(error("int ~"), "Missing type");
        assert_eq!(error("fn int => bool"), "Missing colon");
        assert_eq!(error("fn: int"), "Missing returned type");
        assert_eq!(error("List-"), "Unexpected token: -");
        assert_eq!(error("int string"), "Unexpected token: string");
    }
}
