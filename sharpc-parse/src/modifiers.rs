#![forbid(unsafe_code)]

//! Modifier keywords written before a declarator.
//!
//! A block keeps one [`Modifiers`] accumulator. Each modifier keyword produces the
//! next accumulator value; the following declarator consumes it exactly once and
//! turns it into the typed set it accepts.

use sharpc_lex::{Kind, ModifierKind, Token};

use crate::convert::Container;
use crate::error::ConvertError;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum Inheritance {
    Abstract,
    New,
    Override,
    Virtual,
}

impl Inheritance {
    fn from_text(text: &str) -> Option<Self> {
        match text {
            "abstract" => Some(Self::Abstract),
            "new" => Some(Self::New),
            "override" => Some(Self::Override),
            "virtual" => Some(Self::Virtual),
            _ => None,
        }
    }

    pub(crate) fn as_str(self) -> &'static str {
        match self {
            Self::Abstract => "abstract",
            Self::New => "new",
            Self::Override => "override",
            Self::Virtual => "virtual",
        }
    }
}

/// Order in which `ref` and `immut` were written.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum RefImmut {
    Ref,
    Immut,
    /// `ref immut`
    RefImmut,
    /// `immut ref`
    ImmutRef,
}

#[derive(Clone, Copy, Debug, Default)]
pub(crate) struct Modifiers<'t> {
    inheritance: Option<(Inheritance, &'t Token)>,
    ref_immut: Option<(RefImmut, &'t Token)>,
    is_async: Option<&'t Token>,
    is_yield: Option<&'t Token>,
    partial: Option<&'t Token>,
    latest: Option<&'t Token>,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub(crate) struct ClassModifiers {
    pub(crate) is_abstract: bool,
    pub(crate) partial: bool,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub(crate) struct StructModifiers {
    pub(crate) ref_immut: Option<RefImmut>,
    pub(crate) partial: bool,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub(crate) struct FnModifiers {
    pub(crate) inheritance: Option<Inheritance>,
    pub(crate) is_async: bool,
    pub(crate) is_yield: bool,
    pub(crate) partial: bool,
}

fn not_allowed(token: &Token, target: &str) -> ConvertError {
    ConvertError::syntax(token, format!("{} is not allowed for {target}", token.text))
}

fn duplicate(token: &Token) -> ConvertError {
    ConvertError::syntax(token, format!("Duplicate {}", token.text))
}

impl<'t> Modifiers<'t> {
    /// Applies one modifier keyword and returns the updated state.
    pub(crate) fn apply(self, token: &'t Token) -> Result<Self, ConvertError> {
        token.set_kind(Kind::Modifier(
            token.modifier_kind().unwrap_or(ModifierKind::Other),
        ));
        let latest_is = |text: &str| self.latest.is_some_and(|t| t.text == text);
        let mut next = self;

        match token.text.as_str() {
            "ref" => {
                next.ref_immut = match self.ref_immut {
                    None => Some((RefImmut::Ref, token)),
                    Some((RefImmut::Immut, first)) if latest_is("immut") => {
                        Some((RefImmut::ImmutRef, first))
                    }
                    Some((RefImmut::Immut, _)) => {
                        return Err(ConvertError::syntax(
                            token,
                            "ref and immut must be used together",
                        ));
                    }
                    Some(_) => return Err(duplicate(token)),
                };
            }
            "immut" => {
                next.ref_immut = match self.ref_immut {
                    None => Some((RefImmut::Immut, token)),
                    Some((RefImmut::Ref, first)) if latest_is("ref") => {
                        Some((RefImmut::RefImmut, first))
                    }
                    Some((RefImmut::Ref, _)) => {
                        return Err(ConvertError::syntax(
                            token,
                            "ref and immut must be used together",
                        ));
                    }
                    Some(_) => return Err(duplicate(token)),
                };
            }
            "async" => {
                if self.is_async.is_some() {
                    return Err(duplicate(token));
                }
                next.is_async = Some(token);
            }
            "yield" => {
                if self.is_yield.is_some() {
                    return Err(duplicate(token));
                }
                next.is_yield = Some(token);
            }
            "partial" => {
                if self.partial.is_some() {
                    return Err(duplicate(token));
                }
                next.partial = Some(token);
            }
            text => {
                let Some(kind) = Inheritance::from_text(text) else {
                    return Err(ConvertError::syntax(
                        token,
                        format!("{text} is only allowed for function arguments"),
                    ));
                };
                if let Some((existing, first)) = self.inheritance {
                    if existing == kind {
                        return Err(duplicate(token));
                    }
                    return Err(ConvertError::syntax(
                        token,
                        format!("{text} cannot be used with {}", first.text),
                    ));
                }
                next.inheritance = Some((kind, token));
            }
        }

        next.latest = Some(token);
        Ok(next)
    }

    /// Errors when a modifier was written but no declarator consumed it.
    pub(crate) fn ensure_empty(&self) -> Result<(), ConvertError> {
        match self.latest {
            Some(token) => Err(ConvertError::syntax(
                token,
                format!("Dangling modifier: {}", token.text),
            )),
            None => Ok(()),
        }
    }

    fn reject_ref_immut(&self, target: &str) -> Result<(), ConvertError> {
        match self.ref_immut {
            Some((_, token)) => Err(not_allowed(token, target)),
            None => Ok(()),
        }
    }

    fn reject_async_yield(&self, target: &str) -> Result<(), ConvertError> {
        if let Some(token) = self.is_async {
            return Err(not_allowed(token, target));
        }
        if let Some(token) = self.is_yield {
            return Err(not_allowed(token, target));
        }
        Ok(())
    }

    /// Inheritance modifiers legal on members of `container`.
    fn member_inheritance(
        &self,
        container: Container,
        target: &str,
    ) -> Result<Option<Inheritance>, ConvertError> {
        let Some((kind, token)) = self.inheritance else {
            return Ok(None);
        };
        let legal = match container {
            Container::Class => true,
            Container::Struct => matches!(kind, Inheritance::Override | Inheritance::New),
            _ => false,
        };
        if legal {
            Ok(Some(kind))
        } else {
            Err(not_allowed(token, target))
        }
    }

    pub(crate) fn into_class(self) -> Result<ClassModifiers, ConvertError> {
        self.reject_ref_immut("class")?;
        self.reject_async_yield("class")?;
        let is_abstract = match self.inheritance {
            Some((Inheritance::Abstract, _)) => true,
            Some((_, token)) => return Err(not_allowed(token, "class")),
            None => false,
        };
        Ok(ClassModifiers {
            is_abstract,
            partial: self.partial.is_some(),
        })
    }

    pub(crate) fn into_struct(self) -> Result<StructModifiers, ConvertError> {
        self.reject_async_yield("struct")?;
        if let Some((_, token)) = self.inheritance {
            return Err(not_allowed(token, "struct"));
        }
        let ref_immut = match self.ref_immut {
            Some((RefImmut::RefImmut, token)) => {
                return Err(ConvertError::syntax(
                    token,
                    "ref immut is not allowed for struct; write immut ref",
                ));
            }
            other => other.map(|(kind, _)| kind),
        };
        Ok(StructModifiers {
            ref_immut,
            partial: self.partial.is_some(),
        })
    }

    pub(crate) fn into_fn(self, container: Container) -> Result<FnModifiers, ConvertError> {
        self.reject_ref_immut("function")?;
        let inheritance = self.member_inheritance(container, "function")?;
        Ok(FnModifiers {
            inheritance,
            is_async: self.is_async.is_some(),
            is_yield: self.is_yield.is_some(),
            partial: self.partial.is_some(),
        })
    }

    pub(crate) fn into_prop(self, container: Container) -> Result<Option<Inheritance>, ConvertError> {
        self.reject_ref_immut("property")?;
        self.reject_async_yield("property")?;
        if let Some(token) = self.partial {
            return Err(not_allowed(token, "property"));
        }
        self.member_inheritance(container, "property")
    }

    pub(crate) fn into_variable(self) -> Result<(), ConvertError> {
        match self.latest {
            Some(token) => Err(not_allowed(token, "variable")),
            None => Ok(()),
        }
    }
}

impl StructModifiers {
    pub(crate) fn prefix(&self) -> &'static str {
        match self.ref_immut {
            Some(RefImmut::Ref) => "ref ",
            Some(RefImmut::Immut) => "readonly ",
            Some(RefImmut::ImmutRef) => "readonly ref ",
            Some(RefImmut::RefImmut) | None => "",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sharpc_lex::Lexer;

    fn words(src: &str) -> Vec<Token> {
        Lexer::new(src)
            .lex()
            .unwrap()
            .into_iter()
            .filter(|t| !t.is_trivia())
            .collect()
    }

    fn accumulate(tokens: &[Token]) -> Result<Modifiers<'_>, ConvertError> {
        tokens
            .iter()
            .try_fold(Modifiers::default(), |acc, t| acc.apply(t))
    }

    #[test]
    fn immut_ref_renders_readonly_ref_struct() {
        let tokens = words("immut ref");
        let mods = accumulate(&tokens).unwrap().into_struct().unwrap();
        assert_eq!(mods.prefix(), "readonly ref ");
    }

    #[test]
    fn ref_immut_is_rejected_for_struct() {
        let tokens = words("ref immut");
        let err = accumulate(&tokens).unwrap().into_struct().unwrap_err();
        assert!(err.message().contains("ref immut is not allowed for struct"));
    }

    #[test]
    fn ref_and_immut_must_be_adjacent() {
        let tokens = words("ref async immut");
        let err = accumulate(&tokens).unwrap_err();
        assert_eq!(err.message(), "ref and immut must be used together");
    }

    #[test]
    fn conflicting_inheritance_is_reported() {
        let tokens = words("virtual override");
        let err = accumulate(&tokens).unwrap_err();
        assert_eq!(err.message(), "override cannot be used with virtual");

        let tokens = words("async async");
        let err = accumulate(&tokens).unwrap_err();
        assert_eq!(err.message(), "Duplicate async");
    }

    #[test]
    fn function_inheritance_depends_on_container() {
        let tokens = words("override async");
        let mods = accumulate(&tokens).unwrap();
        let fn_mods = mods.into_fn(Container::Class).unwrap();
        assert_eq!(fn_mods.inheritance, Some(Inheritance::Override));
        assert!(fn_mods.is_async);

        let err = mods.into_fn(Container::TopLevel).unwrap_err();
        assert_eq!(err.message(), "override is not allowed for function");
    }

    #[test]
    fn leftover_modifier_is_dangling() {
        let tokens = words("partial");
        let err = accumulate(&tokens).unwrap().ensure_empty().unwrap_err();
        assert_eq!(err.message(), "Dangling modifier: partial");
    }
}
