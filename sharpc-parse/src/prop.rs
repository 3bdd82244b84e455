#![forbid(unsafe_code)]

//! `prop` declarations.
//!
//! A property is either expression-bodied (`=> expr;` or `=> { ... }`) or
//! carries an accessor block with an optional initializer. The declaration's
//! own `@` modifiers go before the body or after the accessor block, never both.

use sharpc_lex::{Kind, KeywordKind, ModifierKind, NameKind, OperatorKind, Token};
use tracing::trace;

use crate::convert::{Container, Converter, Scope};
use crate::decl::{parse_accessibility, prefix_of};
use crate::error::ConvertError;
use crate::modifiers::Modifiers;
use crate::render::{TypePosition, convert_type};
use crate::scan::{find_top_level, index_of, matching_close, next_significant, significant};
use crate::types::parse_complete_type;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum AccessorBody {
    /// `get;`
    Auto,
    /// `get => expr;`, holding the `=>` position.
    Expression(usize),
    /// `get { ... }`, holding the `{` position.
    Block(usize),
}

#[derive(Debug)]
struct Accessor<'t> {
    keyword: &'t Token,
    readonly: bool,
    access: Vec<String>,
    body: AccessorBody,
}

impl Accessor<'_> {
    fn header(&self) -> String {
        let readonly = if self.readonly { "readonly " } else { "" };
        format!("{}{readonly}{}", prefix_of(&self.access), self.keyword.text)
    }
}

fn ends_prop_header(t: &Token) -> bool {
    t.is_op("@") || t.is_op("{") || t.is_op("=>") || t.is_op("=") || t.is_op(";")
}

/// `@ mods` starting at `at` and ending before `to`.
///
/// Returns the modifiers and the position of the token that ended them.
fn trailing_accessibility(
    tokens: &[&Token],
    at: usize,
    to: usize,
) -> Result<(Vec<String>, Option<usize>), ConvertError> {
    let rest = significant(&tokens[at..to]);
    let (mods, used) = parse_accessibility(&rest, 0)?;
    let next = match rest.get(used) {
        Some(next) => Some(index_of(tokens, next)?),
        None => None,
    };
    Ok((mods, next))
}

/// Parses the accessors between the braces at `open` and `close`.
fn parse_accessors<'t>(
    tokens: &[&'t Token],
    open: usize,
    close: usize,
) -> Result<Vec<Accessor<'t>>, ConvertError> {
    let inside = &tokens[..close];
    let mut accessors: Vec<Accessor<'t>> = Vec::new();
    let mut i = open + 1;

    while let Some(mut at) = next_significant(inside, i) {
        let mut readonly = false;
        if tokens[at].is_keyword("immut") {
            tokens[at].set_kind(Kind::Modifier(ModifierKind::Other));
            readonly = true;
            at = next_significant(inside, at + 1)
                .ok_or_else(|| ConvertError::syntax(tokens[at], "Missing accessor"))?;
        }
        let keyword = tokens[at];
        if !["get", "set", "init"].iter().any(|k| keyword.is_keyword(k)) {
            return Err(ConvertError::unexpected(keyword));
        }
        keyword.set_kind(Kind::Keyword(KeywordKind::Accessor));
        if let Some(seen) = accessors.iter().find(|a| {
            a.keyword.text == keyword.text || (a.keyword.text != "get" && keyword.text != "get")
        }) {
            return Err(if seen.keyword.text == keyword.text {
                ConvertError::syntax(keyword, format!("Duplicate {}", keyword.text))
            } else {
                ConvertError::syntax(
                    keyword,
                    format!("{} cannot be used with {}", keyword.text, seen.keyword.text),
                )
            });
        }

        let missing_semicolon = || ConvertError::syntax(keyword, "Missing semicolon");
        let mut next = next_significant(inside, at + 1).ok_or_else(missing_semicolon)?;
        let mut access = Vec::new();
        if tokens[next].is_op("@") {
            let (mods, after) = trailing_accessibility(tokens, next, close)?;
            access = mods;
            next = after.ok_or_else(missing_semicolon)?;
        }

        let marker = tokens[next];
        let body = if marker.is_op(";") {
            i = next + 1;
            AccessorBody::Auto
        } else if marker.is_op("=>") {
            marker.set_kind(Kind::Operator(OperatorKind::Lambda));
            let semicolon = find_top_level(inside, next + 1, |t| t.is_op(";"))
                .ok_or_else(|| ConvertError::syntax(marker, "Missing semicolon"))?;
            i = semicolon + 1;
            AccessorBody::Expression(next)
        } else if marker.is_op("{") {
            let end = matching_close(inside, next)
                .ok_or_else(|| ConvertError::syntax(marker, "Missing right brace"))?;
            i = end + 1;
            AccessorBody::Block(next)
        } else {
            return Err(ConvertError::unexpected(marker));
        };

        accessors.push(Accessor {
            keyword,
            readonly,
            access,
            body,
        });
    }

    if accessors.is_empty() {
        return Err(ConvertError::syntax(tokens[open], "Missing accessor"));
    }
    Ok(accessors)
}

impl Converter {
    pub(crate) fn convert_prop<'t>(
        &mut self,
        tokens: &[&'t Token],
        start: usize,
        scope: Scope,
        pending: Modifiers<'t>,
    ) -> Result<usize, ConvertError> {
        let keyword = tokens[start];
        keyword.set_kind(Kind::Keyword(KeywordKind::Declarator));
        if scope.container == Container::Fn {
            return Err(ConvertError::syntax(keyword, "Cannot declare property in function"));
        }
        let inheritance = pending.into_prop(scope.container)?;

        let name_at = next_significant(tokens, start + 1)
            .filter(|&n| tokens[n].is_name_like())
            .ok_or_else(|| ConvertError::syntax(keyword, "Missing property name"))?;
        let name = tokens[name_at];
        name.set_kind(Kind::Name(NameKind::Prop));
        let colon_at = next_significant(tokens, name_at + 1)
            .filter(|&c| tokens[c].is_op(":"))
            .ok_or_else(|| ConvertError::syntax(keyword, "Missing colon"))?;
        let colon = tokens[colon_at];
        colon.set_kind(Kind::Operator(OperatorKind::TypeAnnotation));

        let missing_body = || ConvertError::syntax(name, "Missing assignment or lambda expression");
        let mut at = find_top_level(tokens, colon_at + 1, ends_prop_header).ok_or_else(missing_body)?;
        let ty = parse_complete_type(&significant(&tokens[colon_at + 1..at]), colon)?;

        let mut access = Vec::new();
        if tokens[at].is_op("@") {
            let end = find_top_level(tokens, at + 1, |t| !t.is_op("@") && ends_prop_header(t))
                .ok_or_else(missing_body)?;
            let (mods, next) = trailing_accessibility(tokens, at, end)?;
            if let Some(extra) = next {
                return Err(ConvertError::unexpected(tokens[extra]));
            }
            access = mods;
            at = end;
        }
        trace!(name = %name.text, shape = %tokens[at].text, "property");

        let head = |access: &[String]| {
            let inheritance = inheritance.map(|i| format!("{} ", i.as_str())).unwrap_or_default();
            format!(
                "{}{inheritance}{} {}",
                prefix_of(access),
                convert_type(&ty, TypePosition::Plain),
                name.text
            )
        };

        let marker = tokens[at];
        match marker.text.as_str() {
            "=>" => {
                marker.set_kind(Kind::Operator(OperatorKind::Lambda));
                let body = next_significant(tokens, at + 1)
                    .ok_or_else(|| ConvertError::syntax(marker, "Missing expression"))?;
                self.out.indent(scope.indent);
                if !tokens[body].is_op("{") {
                    self.out.raw(format!("{} => ", head(&access)));
                    return Ok(self.convert_right_side(tokens, at + 1, scope)?.end);
                }
                // `=> { ... }` is a getter block.
                self.out.line(format!("{} {{", head(&access)));
                let getter = scope.enter_fn(false);
                self.out.indent(getter.indent);
                self.out.raw("get");
                let end = self.convert_braced(tokens, body, getter, getter.enter_body())?;
                self.close_brace(scope.indent);
                Ok(end)
            }
            "{" => {
                let close = matching_close(tokens, at)
                    .ok_or_else(|| ConvertError::syntax(marker, "Missing right brace"))?;
                let accessors = parse_accessors(tokens, at, close)?;

                let mut after = next_significant(tokens, close + 1);
                if let Some(at_mark) = after.filter(|&a| tokens[a].is_op("@")) {
                    if !access.is_empty() {
                        return Err(ConvertError::syntax(
                            tokens[at_mark],
                            "Duplicate accessibility modifier",
                        ));
                    }
                    let end = find_top_level(tokens, at_mark + 1, |t| {
                        t.is_op("=") || t.is_op("=>") || t.is_op(";")
                    })
                    .unwrap_or(tokens.len());
                    let (mods, next) = trailing_accessibility(tokens, at_mark, end)?;
                    if let Some(extra) = next {
                        return Err(ConvertError::unexpected(tokens[extra]));
                    }
                    access = mods;
                    after = next_significant(tokens, end);
                }

                self.out.indent(scope.indent);
                self.out.raw(head(&access));
                self.accessor_block(tokens, &accessors, scope)?;

                match after.map(|a| (a, tokens[a])) {
                    Some((assign, t)) if t.is_op("=") => {
                        t.set_kind(Kind::Operator(OperatorKind::Assignment));
                        self.out.raw(" = ");
                        Ok(self.convert_right_side(tokens, assign + 1, scope)?.end)
                    }
                    Some((_, t)) if t.is_op("=>") => Err(ConvertError::syntax(
                        t,
                        "With accessors, expression body is not allowed",
                    )),
                    Some((semicolon, t)) if t.is_op(";") => {
                        self.out.newline();
                        Ok(semicolon + 1)
                    }
                    _ => {
                        self.out.newline();
                        Ok(close + 1)
                    }
                }
            }
            "=" => Err(ConvertError::syntax(
                marker,
                "Without accessors, expression body is required",
            )),
            _ => Err(missing_body()),
        }
    }

    /// Writes ` { get; set; }` on one line, or one accessor per line when any has a body.
    fn accessor_block(
        &mut self,
        tokens: &[&Token],
        accessors: &[Accessor<'_>],
        scope: Scope,
    ) -> Result<(), ConvertError> {
        if accessors.iter().all(|a| a.body == AccessorBody::Auto) {
            let list: String = accessors.iter().map(|a| format!("{}; ", a.header())).collect();
            self.out.raw(format!(" {{ {list}}}"));
            return Ok(());
        }

        self.out.line(" {");
        let inner = scope.enter_fn(false);
        for accessor in accessors {
            self.out.indent(inner.indent);
            self.out.raw(accessor.header());
            match accessor.body {
                AccessorBody::Auto => self.out.line(";"),
                AccessorBody::Expression(arrow) => {
                    self.out.raw(" => ");
                    self.convert_right_side(tokens, arrow + 1, inner)?;
                }
                AccessorBody::Block(open) => {
                    self.convert_braced(tokens, open, inner, inner.enter_body())?;
                }
            }
        }
        self.out.indent(scope.indent);
        self.out.raw("}");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use crate::convert;
    use pretty_assertions::assert_eq;

    #[test]
    fn auto_property_with_initializer() {
        assert_eq!(
            convert("prop Value: int { get; set; } = 0;").unwrap(),
            "int Value { get; set; } = 0;\r\n"
        );
    }

    #[test]
    fn expression_bodied_property() {
        let src = "class Person {\n  prop Name: string @public => first + \" \" + last;\n}";
        assert_eq!(
            convert(src).unwrap(),
            "class Person {\r\n  public string Name => first + \" \" + last;\r\n}\r\n"
        );
    }

    #[test]
    fn getter_block_after_arrow() {
        let src = "class C {\n  prop Total: int => {\n    return a + b;\n  }\n}";
        assert_eq!(
            convert(src).unwrap(),
            "class C {\r\n  int Total {\r\n    get {\r\n      return a + b;\r\n    }\r\n  }\r\n}\r\n"
        );
    }

    #[test]
    fn accessor_modifiers_and_trailing_access() {
        let src = "class C {\n  prop Id: Guid { immut get; init @private; } @public;\n}";
        assert_eq!(
            convert(src).unwrap(),
            "class C {\r\n  public Guid Id { readonly get; private init; }\r\n}\r\n"
        );
    }

    #[test]
    fn accessor_bodies_with_nested_braces() {
        let src = "class C {\n  prop Count: int @public {\n    get => count;\n    set {\n      if value > 0 {\n        count = value;\n      }\n    }\n  }\n}";
        assert_eq!(
            convert(src).unwrap(),
            "class C {\r\n  public int Count {\r\n    get => count;\r\n    set {\r\n      if (value > 0) {\r\n        count = value;\r\n      }\r\n    }\r\n  }\r\n}\r\n"
        );
    }

    #[test]
    fn inheritance_modifier_leads_the_type() {
        let src = "class C {\n  override prop Size: int @public => 4;\n}";
        assert_eq!(
            convert(src).unwrap(),
            "class C {\r\n  public override int Size => 4;\r\n}\r\n"
        );
    }

    #[test]
    fn shape_errors() {
        let message = |src: &str| convert(src).unwrap_err().message().to_string();
        assert_eq!(
            message("prop X: int = 1;"),
            "Without accessors, expression body is required"
        );
        assert_eq!(
            message("prop X: int { get; } => 1;"),
            "With accessors, expression body is not allowed"
        );
        assert_eq!(
            message("prop X: int @public { get; } @private;"),
            "Duplicate accessibility modifier"
        );
        assert_eq!(message("prop X: int;"), "Missing assignment or lambda expression");
        assert_eq!(message("prop X int => 1;"), "Missing colon");
        assert_eq!(message("prop X: int { get; get; }"), "Duplicate get");
        assert_eq!(message("prop X: int { set; init; }"), "init cannot be used with set");
    }
}
