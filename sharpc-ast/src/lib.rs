#![forbid(unsafe_code)]

use std::fmt;

use miette::SourceSpan;

pub type Span = SourceSpan;

pub fn span(start: usize, len: usize) -> Span {
    SourceSpan::new(start.into(), len)
}

pub fn span_between(start: usize, end: usize) -> Span {
    debug_assert!(end >= start);
    span(start, end - start)
}

/// Member-access operator joining a qualified name segment to the next one.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Accessor {
    /// `.`
    Dot,
    /// `?.`
    Question,
    /// `!.`
    Bang,
}

impl Accessor {
    pub fn from_text(text: &str) -> Option<Self> {
        match text {
            "." => Some(Self::Dot),
            "?." => Some(Self::Question),
            "!." => Some(Self::Bang),
            _ => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Dot => ".",
            Self::Question => "?.",
            Self::Bang => "!.",
        }
    }
}

impl fmt::Display for Accessor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One `Name.` prefix of a qualified type name.
///
/// The segment is either a plain name or a generics type (`(List-int).Enumerator`).
#[derive(Clone, Debug, PartialEq)]
pub struct QualifiedName {
    pub segment: Type,
    pub accessor: Accessor,
    pub segment_span: Span,
    pub accessor_span: Span,
}

/// Parameter-passing modifier of a function argument.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ParamModifier {
    Ref,
    RefReadonly,
    In,
    Out,
    Params,
}

impl ParamModifier {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Ref => "ref",
            Self::RefReadonly => "ref readonly",
            Self::In => "in",
            Self::Out => "out",
            Self::Params => "params",
        }
    }
}

/// A named, typed slot: function argument or named tuple element.
#[derive(Clone, Debug, PartialEq)]
pub struct Variable {
    pub name: String,
    pub ty: Type,
    pub modifier: Option<ParamModifier>,
}

impl Variable {
    pub fn new(name: impl Into<String>, ty: Type) -> Self {
        Self {
            name: name.into(),
            ty,
            modifier: None,
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct FunctionType {
    pub args: Vec<Variable>,
    pub returned: Box<Type>,
}

#[derive(Clone, Debug, PartialEq)]
pub struct GenericsType {
    /// Always a `TypeKind::Normal` head.
    pub head: Box<Type>,
    pub params: Vec<Type>,
}

#[derive(Clone, Debug, PartialEq)]
pub enum TupleElement {
    Unnamed(Type),
    Named(Variable),
}

impl TupleElement {
    pub fn ty(&self) -> &Type {
        match self {
            Self::Unnamed(ty) => ty,
            Self::Named(var) => &var.ty,
        }
    }

    pub fn ty_mut(&mut self) -> &mut Type {
        match self {
            Self::Unnamed(ty) => ty,
            Self::Named(var) => &mut var.ty,
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub enum TypeKind {
    Normal { name: String },
    Array(Box<Type>),
    Function(FunctionType),
    Generics(GenericsType),
    Tuple(Vec<TupleElement>),
}

/// A type term of the surface grammar.
///
/// Qualified-name prefixes and nullability are an overlay shared by every variant.
#[derive(Clone, Debug, PartialEq)]
pub struct Type {
    pub kind: TypeKind,
    pub qualified_names: Vec<QualifiedName>,
    pub nullable: bool,
}

impl Type {
    pub fn new(kind: TypeKind) -> Self {
        Self {
            kind,
            qualified_names: Vec::new(),
            nullable: false,
        }
    }

    pub fn normal(name: impl Into<String>) -> Self {
        Self::new(TypeKind::Normal { name: name.into() })
    }

    pub fn array(parent: Type) -> Self {
        Self::new(TypeKind::Array(Box::new(parent)))
    }

    pub fn function(args: Vec<Variable>, returned: Type) -> Self {
        Self::new(TypeKind::Function(FunctionType {
            args,
            returned: Box::new(returned),
        }))
    }

    pub fn generics(head: Type, params: Vec<Type>) -> Self {
        Self::new(TypeKind::Generics(GenericsType {
            head: Box::new(head),
            params,
        }))
    }

    pub fn tuple(elements: Vec<TupleElement>) -> Self {
        Self::new(TypeKind::Tuple(elements))
    }

    pub fn with_qualifiers(mut self, qualified_names: Vec<QualifiedName>) -> Self {
        self.qualified_names = qualified_names;
        self
    }

    pub fn nullable(mut self) -> Self {
        self.nullable = true;
        self
    }

    /// Name of a `Normal` type, `None` for every other variant.
    pub fn normal_name(&self) -> Option<&str> {
        match &self.kind {
            TypeKind::Normal { name } => Some(name),
            _ => None,
        }
    }

    /// `_` or `void`: the function-type return that selects `Action`.
    pub fn is_void_like(&self) -> bool {
        matches!(self.normal_name(), Some("_" | "void"))
    }

    /// Pre-order traversal over this type and every type nested in it,
    /// including qualified-name segments.
    pub fn walk<'a>(&'a self, visit: &mut impl FnMut(&'a Type)) {
        visit(self);
        for q in &self.qualified_names {
            q.segment.walk(visit);
        }
        match &self.kind {
            TypeKind::Normal { .. } => {}
            TypeKind::Array(parent) => parent.walk(visit),
            TypeKind::Function(f) => {
                for arg in &f.args {
                    arg.ty.walk(visit);
                }
                f.returned.walk(visit);
            }
            TypeKind::Generics(g) => {
                g.head.walk(visit);
                for p in &g.params {
                    p.walk(visit);
                }
            }
            TypeKind::Tuple(elements) => {
                for e in elements {
                    e.ty().walk(visit);
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn walk_visits_nested_types_in_order() {
        let ty = Type::generics(
            Type::normal("Dictionary"),
            vec![
                Type::normal("string"),
                Type::array(Type::normal("int")),
            ],
        );
        let mut names = Vec::new();
        ty.walk(&mut |t| {
            if let Some(n) = t.normal_name() {
                names.push(n.to_string());
            }
        });
        assert_eq!(names, vec!["Dictionary", "string", "int"]);
    }

    #[test]
    fn void_like_covers_discard_and_void() {
        assert!(Type::normal("_").is_void_like());
        assert!(Type::normal("void").is_void_like());
        assert!(!Type::normal("int").is_void_like());
        assert!(!Type::array(Type::normal("void")).is_void_like());
    }

    #[test]
    fn tuple_element_exposes_its_type() {
        let named = TupleElement::Named(Variable::new("a", Type::normal("int")));
        assert_eq!(named.ty().normal_name(), Some("int"));
        let unnamed = TupleElement::Unnamed(Type::normal("string").nullable());
        assert!(unnamed.ty().nullable);
    }
}
