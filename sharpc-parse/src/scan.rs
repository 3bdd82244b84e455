#![forbid(unsafe_code)]

//! Position helpers over token slices.
//!
//! Every helper takes a slice and a position and returns a position; no cursor
//! state is hidden inside the tokens.

use sharpc_lex::Token;

use crate::error::ConvertError;

pub(crate) const ASSIGNMENT_OPERATORS: [&str; 13] = [
    "=", "+=", "-=", "*=", "/=", "%=", "??=", "<<=", ">>=", ">>>=", "&=", "^=", "|=",
];

pub(crate) fn is_assignment(token: &Token) -> bool {
    token.category == sharpc_lex::Category::Operator
        && ASSIGNMENT_OPERATORS.contains(&token.text.as_str())
}

/// First non-trivia position at or after `from`.
pub(crate) fn next_significant(tokens: &[&Token], from: usize) -> Option<usize> {
    (from..tokens.len()).find(|&i| !tokens[i].is_trivia())
}

pub(crate) fn significant<'a>(tokens: &[&'a Token]) -> Vec<&'a Token> {
    tokens.iter().copied().filter(|t| !t.is_trivia()).collect()
}

fn closer_of(open: &str) -> Option<&'static str> {
    match open {
        "(" => Some(")"),
        "{" => Some("}"),
        _ => None,
    }
}

/// Position of the bracket closing the one at `open`, counting only the same pair.
pub(crate) fn matching_close(tokens: &[&Token], open: usize) -> Option<usize> {
    let open_text = tokens.get(open)?.text.as_str();
    let close_text = closer_of(open_text)?;
    let mut depth = 0usize;
    for (i, t) in tokens.iter().enumerate().skip(open) {
        if t.is_op(open_text) {
            depth += 1;
        } else if t.is_op(close_text) {
            depth -= 1;
            if depth == 0 {
                return Some(i);
            }
        }
    }
    None
}

/// First position in `from..` outside any `()` / `{}` nesting that satisfies `pred`.
///
/// A closer that would leave the starting level ends the search.
pub(crate) fn find_top_level(
    tokens: &[&Token],
    from: usize,
    mut pred: impl FnMut(&Token) -> bool,
) -> Option<usize> {
    let mut depth = 0usize;
    for (i, t) in tokens.iter().enumerate().skip(from) {
        if depth == 0 && pred(t) {
            return Some(i);
        }
        if t.is_op("(") || t.is_op("{") {
            depth += 1;
        } else if t.is_op(")") || t.is_op("}") {
            if depth == 0 {
                return None;
            }
            depth -= 1;
        }
    }
    None
}

/// Position of `token` inside `tokens`, located by id.
pub(crate) fn index_of(tokens: &[&Token], token: &Token) -> Result<usize, ConvertError> {
    tokens
        .iter()
        .position(|t| t.id == token.id)
        .ok_or_else(|| ConvertError::unhandled(Some(token), "Token is outside the converted range"))
}

/// Skips `;` tokens directly following `from`.
pub(crate) fn skip_semicolons(tokens: &[&Token], mut from: usize) -> usize {
    while tokens.get(from).is_some_and(|t| t.is_op(";")) {
        from += 1;
    }
    from
}

#[cfg(test)]
mod tests {
    use super::*;
    use sharpc_lex::Lexer;

    #[test]
    fn brackets_and_top_level_search() {
        // f ( a , _ ( b ) ) ; _ g
        let owned = Lexer::new("f(a, (b)); g").lex().unwrap();
        let tokens: Vec<&Token> = owned.iter().collect();
        assert_eq!(matching_close(&tokens, 1), Some(8));
        assert_eq!(matching_close(&tokens, 5), Some(7));
        assert_eq!(matching_close(&tokens, 0), None);

        assert_eq!(find_top_level(&tokens, 0, |t| t.is_op(";")), Some(9));
        assert_eq!(find_top_level(&tokens, 2, |t| t.is_op(",")), Some(3));
        assert_eq!(find_top_level(&tokens, 4, |t| t.is_op(";")), None);
        assert_eq!(next_significant(&tokens, 10), Some(11));
        assert_eq!(skip_semicolons(&tokens, 9), 10);
    }

    #[test]
    fn unbalanced_group_has_no_match() {
        let owned = Lexer::new("{ { }").lex().unwrap();
        let tokens: Vec<&Token> = owned.iter().collect();
        assert_eq!(matching_close(&tokens, 0), None);
        assert_eq!(matching_close(&tokens, 2), Some(4));
    }
}
