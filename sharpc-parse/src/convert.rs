#![forbid(unsafe_code)]

use crate::ConvertConfig;
use crate::emit::Emitter;

/// Kind of the block whose statements are being converted.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Container {
    /// File level, outside any declaration.
    TopLevel,
    Namespace,
    Class,
    Struct,
    Fn,
}

impl Container {
    pub fn is_type_body(self) -> bool {
        matches!(self, Self::Class | Self::Struct)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) struct Scope {
    pub(crate) container: Container,
    pub(crate) indent: usize,
    /// Inside a `yield fn` body: `return` becomes `yield return`.
    pub(crate) yield_fn: bool,
}

impl Scope {
    pub(crate) fn root() -> Self {
        Self {
            container: Container::TopLevel,
            indent: 0,
            yield_fn: false,
        }
    }

    /// Body of a nested declaration.
    pub(crate) fn enter(self, container: Container) -> Self {
        Self {
            container,
            indent: self.indent + 1,
            yield_fn: false,
        }
    }

    pub(crate) fn enter_fn(self, yield_fn: bool) -> Self {
        Self {
            container: Container::Fn,
            indent: self.indent + 1,
            yield_fn,
        }
    }

    /// Body of a control-flow statement: local statements at one deeper indent.
    pub(crate) fn enter_body(self) -> Self {
        Self {
            container: Container::Fn,
            indent: self.indent + 1,
            yield_fn: self.yield_fn,
        }
    }

    pub(crate) fn with_container(self, container: Container) -> Self {
        Self { container, ..self }
    }
}

pub(crate) struct Converter {
    pub(crate) out: Emitter,
}

impl Converter {
    pub(crate) fn new(config: &ConvertConfig) -> Self {
        Self {
            out: Emitter::new(config),
        }
    }

    /// Renders the output with exactly one trailing line break.
    pub(crate) fn finish(self) -> String {
        let newline = self.out.newline_str();
        let mut text = self.out.finish();
        while text.ends_with(newline) {
            text.truncate(text.len() - newline.len());
        }
        text.push_str(newline);
        text
    }
}
