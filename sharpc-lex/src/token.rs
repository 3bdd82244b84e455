#![forbid(unsafe_code)]

use std::cell::Cell;
use std::fmt;

use sharpc_ast::{Span, span_between};

#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct TokenId(pub u32);

/// Lexical class assigned once by the lexer.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Category {
    LineBreak,
    Space,
    Operator,
    Keyword,
    ContextKeyword,
    Comment,
    StringLiteral,
    RawStringLiteral,
    CharLiteral,
    NumberLiteral,
    /// Plain names; everything the lexer has no finer class for.
    Identifier,
}

impl Category {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::LineBreak => "line_break",
            Self::Space => "space",
            Self::Operator => "operator",
            Self::Keyword => "keyword",
            Self::ContextKeyword => "context_keyword",
            Self::Comment => "comment",
            Self::StringLiteral => "string_literal",
            Self::RawStringLiteral => "raw_string_literal",
            Self::CharLiteral => "char_literal",
            Self::NumberLiteral => "number_literal",
            Self::Identifier => "identifier",
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum CommentKind {
    Line,
    Block,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum SpaceKind {
    LineBreak,
    Space,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum LiteralKind {
    String,
    RawString,
    Char,
    Number,
    Bool,
    Null,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum BracketKind {
    Parenthesis,
    Brace,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum OperatorKind {
    TypeAnnotation,
    AccessibilityAnnotation,
    FnArrow,
    FnArgsSeparator,
    TupleConnector,
    ArrayMarker,
    GenericsParamsAnnotation,
    GenericsParamsSeparator,
    Accessor,
    Assignment,
    Indexer,
    Lambda,
    Other,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum KeywordKind {
    Declarator,
    BuiltinType,
    BlockWithExpr,
    BlockWithoutExpr,
    Var,
    Method,
    Expr,
    BlockOrMethod,
    MethodOrOther,
    Accessor,
    Other,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ModifierKind {
    /// Accessibility-style modifiers written after `@`.
    AfterAt,
    Other,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum NameKind {
    Class,
    Struct,
    Fn,
    Var,
    Const,
    FnArg,
    Field,
    Prop,
    GenericsParam,
    Namespace,
    Discard,
    Other,
}

/// Fine-grained syntactic role, annotated as parsing discovers it.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Kind {
    Comment(CommentKind),
    Space(SpaceKind),
    Literal(LiteralKind),
    Bracket(BracketKind),
    Operator(OperatorKind),
    Keyword(KeywordKind),
    Modifier(ModifierKind),
    Name(NameKind),
}

impl fmt::Display for Kind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let (group, role) = match self {
            Kind::Comment(k) => (
                "comment",
                match k {
                    CommentKind::Line => "line",
                    CommentKind::Block => "block",
                },
            ),
            Kind::Space(k) => (
                "space",
                match k {
                    SpaceKind::LineBreak => "line-break",
                    SpaceKind::Space => "space",
                },
            ),
            Kind::Literal(k) => (
                "literal",
                match k {
                    LiteralKind::String => "string",
                    LiteralKind::RawString => "raw-string",
                    LiteralKind::Char => "char",
                    LiteralKind::Number => "number",
                    LiteralKind::Bool => "bool",
                    LiteralKind::Null => "null",
                },
            ),
            Kind::Bracket(k) => (
                "bracket",
                match k {
                    BracketKind::Parenthesis => "parenthesis",
                    BracketKind::Brace => "brace",
                },
            ),
            Kind::Operator(k) => (
                "operator",
                match k {
                    OperatorKind::TypeAnnotation => "type-annotation",
                    OperatorKind::AccessibilityAnnotation => "accessibility-annotation",
                    OperatorKind::FnArrow => "fn-arrow",
                    OperatorKind::FnArgsSeparator => "fn-args-separator",
                    OperatorKind::TupleConnector => "tuple-connector",
                    OperatorKind::ArrayMarker => "array-marker",
                    OperatorKind::GenericsParamsAnnotation => "generics-params-annotation",
                    OperatorKind::GenericsParamsSeparator => "generics-params-separator",
                    OperatorKind::Accessor => "accessor",
                    OperatorKind::Assignment => "assignment",
                    OperatorKind::Indexer => "indexer",
                    OperatorKind::Lambda => "lambda",
                    OperatorKind::Other => "other",
                },
            ),
            Kind::Keyword(k) => (
                "keyword",
                match k {
                    KeywordKind::Declarator => "declarator",
                    KeywordKind::BuiltinType => "builtin-type",
                    KeywordKind::BlockWithExpr => "block-with-expr",
                    KeywordKind::BlockWithoutExpr => "block-without-expr",
                    KeywordKind::Var => "var",
                    KeywordKind::Method => "method",
                    KeywordKind::Expr => "expr",
                    KeywordKind::BlockOrMethod => "block-or-method",
                    KeywordKind::MethodOrOther => "method-or-other",
                    KeywordKind::Accessor => "accessor",
                    KeywordKind::Other => "other",
                },
            ),
            Kind::Modifier(k) => (
                "modifier",
                match k {
                    ModifierKind::AfterAt => "after-at",
                    ModifierKind::Other => "other",
                },
            ),
            Kind::Name(k) => (
                "name",
                match k {
                    NameKind::Class => "class",
                    NameKind::Struct => "struct",
                    NameKind::Fn => "fn",
                    NameKind::Var => "var",
                    NameKind::Const => "const",
                    NameKind::FnArg => "fn-arg",
                    NameKind::Field => "field",
                    NameKind::Prop => "prop",
                    NameKind::GenericsParam => "generics-param",
                    NameKind::Namespace => "namespace",
                    NameKind::Discard => "discard",
                    NameKind::Other => "other",
                },
            ),
        };
        write!(f, "{group}.{role}")
    }
}

/// Keyword table: reserved words of the surface language.
pub fn keyword(text: &str) -> Option<Kind> {
    use KeywordKind as K;
    let kind = match text {
        "class" | "const" | "ctor" | "delegate" | "enum" | "event" | "finalizer" | "fn"
        | "interface" | "let" | "prop" | "record" | "struct" => Kind::Keyword(K::Declarator),
        "bool" | "byte" | "char" | "decimal" | "double" | "dynamic" | "float" | "int" | "long"
        | "nint" | "nuint" | "object" | "sbyte" | "short" | "string" | "uint" | "ulong"
        | "ushort" | "void" => Kind::Keyword(K::BuiltinType),
        "for" | "foreach" | "while" | "elif" | "if" | "catch" | "switch" | "fixed" | "lock"
        | "do" => Kind::Keyword(K::BlockWithExpr),
        "try" | "finally" | "else" => Kind::Keyword(K::BlockWithoutExpr),
        "base" | "this" => Kind::Keyword(K::Var),
        "nameof" | "sizeof" | "typeof" => Kind::Keyword(K::Method),
        "break" | "continue" | "goto" | "return" | "await" | "throw" => Kind::Keyword(K::Expr),
        "checked" | "unchecked" => Kind::Keyword(K::BlockOrMethod),
        "default" => Kind::Keyword(K::MethodOrOther),
        "explicit" | "extern" | "implicit" | "namespace" | "operator" | "new" | "stackalloc"
        | "using" | "with" | "as" | "is" | "and" | "or" | "not" => Kind::Keyword(K::Other),
        "internal" | "private" | "protected" | "public" | "sealed" | "static" | "unsafe"
        | "volatile" => Kind::Modifier(ModifierKind::AfterAt),
        "abstract" | "async" | "immut" | "in" | "out" | "override" | "params" | "partial"
        | "ref" | "virtual" | "yield" => Kind::Modifier(ModifierKind::Other),
        "true" | "false" => Kind::Literal(LiteralKind::Bool),
        "null" => Kind::Literal(LiteralKind::Null),
        _ => return None,
    };
    Some(kind)
}

/// Context keywords: reserved only in particular positions, usable as names elsewhere.
pub fn context_keyword(text: &str) -> Option<Kind> {
    let kind = match text {
        "add" | "get" | "init" | "remove" | "set" => Kind::Keyword(KeywordKind::Accessor),
        "args" | "field" | "value" => Kind::Keyword(KeywordKind::Var),
        "global" | "notnull" => Kind::Keyword(KeywordKind::Other),
        _ => return None,
    };
    Some(kind)
}

#[derive(Clone, Debug, PartialEq)]
pub struct Token {
    pub id: TokenId,
    pub text: String,
    pub start: usize,
    pub end: usize,
    pub category: Category,
    kind: Cell<Option<Kind>>,
}

impl Token {
    pub fn new(
        id: TokenId,
        text: impl Into<String>,
        start: usize,
        end: usize,
        category: Category,
        kind: Option<Kind>,
    ) -> Self {
        Self {
            id,
            text: text.into(),
            start,
            end,
            category,
            kind: Cell::new(kind),
        }
    }

    pub fn kind(&self) -> Option<Kind> {
        self.kind.get()
    }

    /// Annotates the token's role; later annotations win.
    pub fn set_kind(&self, kind: Kind) {
        self.kind.set(Some(kind));
    }

    pub fn span(&self) -> Span {
        span_between(self.start, self.end)
    }

    pub fn is_trivia(&self) -> bool {
        matches!(
            self.category,
            Category::LineBreak | Category::Space | Category::Comment
        )
    }

    pub fn is_line_break(&self) -> bool {
        self.category == Category::LineBreak
    }

    pub fn is_op(&self, text: &str) -> bool {
        self.category == Category::Operator && self.text == text
    }

    pub fn is_keyword(&self, text: &str) -> bool {
        matches!(self.category, Category::Keyword | Category::ContextKeyword) && self.text == text
    }

    /// Identifiers and context keywords, i.e. anything usable as a declared name.
    pub fn is_name_like(&self) -> bool {
        matches!(self.category, Category::Identifier | Category::ContextKeyword)
    }

    /// Any word-shaped token: names, keywords and context keywords.
    pub fn is_word(&self) -> bool {
        matches!(
            self.category,
            Category::Identifier | Category::Keyword | Category::ContextKeyword
        )
    }

    pub fn is_literal(&self) -> bool {
        matches!(
            self.category,
            Category::StringLiteral
                | Category::RawStringLiteral
                | Category::CharLiteral
                | Category::NumberLiteral
        ) || matches!(
            self.table_kind(),
            Some(Kind::Literal(LiteralKind::Bool | LiteralKind::Null))
        )
    }

    /// Kind from the keyword tables, independent of later annotations.
    pub fn table_kind(&self) -> Option<Kind> {
        match self.category {
            Category::Keyword => keyword(&self.text),
            Category::ContextKeyword => context_keyword(&self.text),
            _ => None,
        }
    }

    pub fn keyword_kind(&self) -> Option<KeywordKind> {
        match self.table_kind() {
            Some(Kind::Keyword(k)) => Some(k),
            _ => None,
        }
    }

    pub fn modifier_kind(&self) -> Option<ModifierKind> {
        match self.table_kind() {
            Some(Kind::Modifier(k)) => Some(k),
            _ => None,
        }
    }
}
