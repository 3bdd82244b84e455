#![forbid(unsafe_code)]

use sharpc_ast::{TupleElement, Type, TypeKind, Variable};

/// Where a type is written; decides how the discard `_` renders.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TypePosition {
    Plain,
    /// Function-type argument: `_` renders as nothing.
    Argument,
    /// Return type: `_` renders as `void`.
    Return,
}

fn qualifiers(ty: &Type) -> String {
    ty.qualified_names
        .iter()
        .map(|q| format!("{}{}", convert_type(&q.segment, TypePosition::Plain), q.accessor))
        .collect()
}

fn nullable(ty: &Type) -> &'static str {
    if ty.nullable { "?" } else { "" }
}

/// Renders a type in C# syntax.
pub fn convert_type(ty: &Type, position: TypePosition) -> String {
    let body = match &ty.kind {
        TypeKind::Normal { name } => match (position, name.as_str()) {
            (TypePosition::Argument, "_") => return String::new(),
            (TypePosition::Return, "_") => "void".to_string(),
            _ => name.clone(),
        },
        TypeKind::Array(parent) => format!("{}[]", convert_type(parent, TypePosition::Plain)),
        TypeKind::Function(function) => {
            let mut params: Vec<String> = function
                .args
                .iter()
                .map(|a| convert_type(&a.ty, TypePosition::Argument))
                .filter(|a| !a.is_empty())
                .collect();
            if function.returned.is_void_like() {
                if params.is_empty() {
                    "Action".to_string()
                } else {
                    format!("Action<{}>", params.join(", "))
                }
            } else {
                params.push(convert_type(&function.returned, TypePosition::Return));
                format!("Func<{}>", params.join(", "))
            }
        }
        TypeKind::Generics(generics) => {
            let params: Vec<String> = generics
                .params
                .iter()
                .map(|p| convert_type(p, TypePosition::Plain))
                .collect();
            format!(
                "{}<{}>",
                convert_type(&generics.head, TypePosition::Plain),
                params.join(", ")
            )
        }
        TypeKind::Tuple(elements) => match elements.as_slice() {
            [] => "Tuple".to_string(),
            [single] => format!("Tuple<{}>", convert_type(single.ty(), TypePosition::Plain)),
            many => {
                let parts: Vec<String> = many
                    .iter()
                    .map(|e| match e {
                        TupleElement::Unnamed(ty) => convert_type(ty, TypePosition::Plain),
                        TupleElement::Named(var) => {
                            format!("{} {}", convert_type(&var.ty, TypePosition::Plain), var.name)
                        }
                    })
                    .collect();
                format!("({})", parts.join(", "))
            }
        },
    };
    format!("{}{}{}", qualifiers(ty), body, nullable(ty))
}

/// Renders a declaration parameter: `[modifier ]Type name`.
pub fn convert_parameter(var: &Variable) -> String {
    let ty = convert_type(&var.ty, TypePosition::Plain);
    match var.modifier {
        Some(modifier) => format!("{} {ty} {}", modifier.as_str(), var.name),
        None => format!("{ty} {}", var.name),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sharpc_ast::ParamModifier;

    #[test]
    fn discard_depends_on_position() {
        let discard = Type::normal("_");
        assert_eq!(convert_type(&discard, TypePosition::Argument), "");
        assert_eq!(convert_type(&discard, TypePosition::Return), "void");
        assert_eq!(convert_type(&discard, TypePosition::Plain), "_");
    }

    #[test]
    fn parameters_carry_their_modifier() {
        let mut var = Variable::new("buffer", Type::array(Type::normal("byte")));
        assert_eq!(convert_parameter(&var), "byte[] buffer");
        var.modifier = Some(ParamModifier::RefReadonly);
        assert_eq!(convert_parameter(&var), "ref readonly byte[] buffer");
    }

    #[test]
    fn nested_function_types() {
        let inner = Type::function(vec![Variable::new("", Type::normal("int"))], Type::normal("bool"));
        let outer = Type::function(vec![Variable::new("", inner)], Type::normal("_"));
        assert_eq!(
            convert_type(&outer, TypePosition::Plain),
            "Action<Func<int, bool>>"
        );
    }
}
