#![forbid(unsafe_code)]
#![allow(unused_assignments)]

use miette::Diagnostic;
use sharpc_ast::Span;
use sharpc_lex::{LexError, Token};
use thiserror::Error;

#[derive(Debug, Error, Diagnostic)]
#[allow(unused_assignments)]
pub enum ConvertError {
    /// Malformed or illegal source construct.
    #[error("syntax error: {message}")]
    #[diagnostic(code(sharpc::syntax))]
    Syntax {
        message: String,
        #[label]
        span: Option<Span>,
    },

    /// Internal inconsistency reached while converting.
    #[error("unhandled error: {message}")]
    #[diagnostic(code(sharpc::unhandled))]
    Unhandled {
        message: String,
        #[label]
        span: Option<Span>,
    },
}

impl ConvertError {
    pub fn syntax(token: &Token, message: impl Into<String>) -> Self {
        Self::Syntax {
            message: message.into(),
            span: Some(token.span()),
        }
    }

    pub fn syntax_at(span: Option<Span>, message: impl Into<String>) -> Self {
        Self::Syntax {
            message: message.into(),
            span,
        }
    }

    pub fn unexpected(token: &Token) -> Self {
        Self::syntax(token, format!("Unexpected token: {}", token.text))
    }

    pub fn unhandled(token: Option<&Token>, message: impl Into<String>) -> Self {
        Self::Unhandled {
            message: message.into(),
            span: token.map(Token::span),
        }
    }

    pub fn message(&self) -> &str {
        match self {
            Self::Syntax { message, .. } | Self::Unhandled { message, .. } => message,
        }
    }

    pub fn span(&self) -> Option<Span> {
        match self {
            Self::Syntax { span, .. } | Self::Unhandled { span, .. } => *span,
        }
    }

    pub fn is_syntax(&self) -> bool {
        matches!(self, Self::Syntax { .. })
    }
}

impl From<LexError> for ConvertError {
    fn from(err: LexError) -> Self {
        Self::Syntax {
            message: err.message,
            span: Some(err.span),
        }
    }
}
