#![forbid(unsafe_code)]

mod block;
mod convert;
mod decl;
mod emit;
mod error;
mod expr;
mod keyword_block;
mod modifiers;
mod prop;
mod render;
mod scan;
mod switch;
mod types;

use sharpc_ast::Type;
use sharpc_lex::{Lexer, Token};
use tracing::debug;

use crate::convert::{Converter, Scope};

pub use convert::Container;
pub use error::ConvertError;
pub use render::{TypePosition, convert_parameter, convert_type};

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum LineEnding {
    #[default]
    CrLf,
    Lf,
}

impl LineEnding {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::CrLf => "\r\n",
            Self::Lf => "\n",
        }
    }

    /// Accepts `crlf` / `lf`, case-insensitively.
    pub fn from_name(name: &str) -> Option<Self> {
        if name.eq_ignore_ascii_case("crlf") {
            Some(Self::CrLf)
        } else if name.eq_ignore_ascii_case("lf") {
            Some(Self::Lf)
        } else {
            None
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ConvertConfig {
    /// Spaces per indentation level.
    pub indent_width: usize,
    pub line_ending: LineEnding,
}

impl Default for ConvertConfig {
    fn default() -> Self {
        Self {
            indent_width: 2,
            line_ending: LineEnding::CrLf,
        }
    }
}

/// Output of a conversion together with the annotated tokens it was built from.
#[derive(Debug)]
pub struct Conversion {
    pub output: String,
    pub tokens: Vec<Token>,
}

pub fn convert(src: &str) -> Result<String, ConvertError> {
    convert_with_config(src, &ConvertConfig::default())
}

pub fn convert_with_config(src: &str, config: &ConvertConfig) -> Result<String, ConvertError> {
    Ok(convert_with_tokens(src, config)?.output)
}

pub fn convert_with_tokens(src: &str, config: &ConvertConfig) -> Result<Conversion, ConvertError> {
    let tokens = Lexer::new(src).lex()?;
    debug!(tokens = tokens.len(), "converting source");

    let output = {
        let refs: Vec<&Token> = tokens.iter().collect();
        let mut converter = Converter::new(config);
        converter.convert_block(&refs, Scope::root())?;
        converter.finish()
    };
    debug!(bytes = output.len(), "conversion finished");
    Ok(Conversion { output, tokens })
}

pub fn convert_source(src: &str) -> miette::Result<String> {
    convert(src).map_err(miette::Report::new)
}

/// Parses a standalone surface type such as `Dictionary-string/int#`.
pub fn parse_type_source(src: &str) -> Result<Type, ConvertError> {
    let tokens = Lexer::new(src).lex()?;
    let refs = scan::significant(&tokens.iter().collect::<Vec<_>>());
    let Some(&first) = refs.first() else {
        return Err(ConvertError::syntax_at(None, "Missing type"));
    };
    types::parse_complete_type(&refs, first)
}
