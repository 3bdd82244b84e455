#![forbid(unsafe_code)]

mod lexer;
mod token;

pub use lexer::{LexError, Lexer};
pub use token::{
    BracketKind, Category, CommentKind, Kind, KeywordKind, LiteralKind, ModifierKind, NameKind,
    OperatorKind, SpaceKind, Token, TokenId, context_keyword, keyword,
};

#[cfg(test)]
mod tests {
    use super::*;

    fn texts(src: &str) -> Vec<String> {
        Lexer::new(src)
            .lex()
            .unwrap()
            .into_iter()
            .map(|t| t.text)
            .collect()
    }

    fn significant(src: &str) -> Vec<(String, Category)> {
        Lexer::new(src)
            .lex()
            .unwrap()
            .into_iter()
            .filter(|t| !t.is_trivia())
            .map(|t| (t.text, t.category))
            .collect()
    }

    #[test]
    fn lex_spans_cover_the_source() {
        let src = "let x: int = 12.5; // note\r\nfn Foo {\n}\n";
        let tokens = Lexer::new(src).lex().unwrap();
        let mut pos = 0;
        for t in &tokens {
            assert_eq!(t.start, pos);
            assert!(t.start <= t.end);
            pos = t.end;
        }
        assert_eq!(pos, src.len());
        assert!(tokens.windows(2).all(|w| w[0].id < w[1].id));
    }

    #[test]
    fn lex_coalesces_decimal_numbers() {
        let tokens = significant("x = 12.34;");
        assert_eq!(tokens[2], ("12.34".to_string(), Category::NumberLiteral));
        assert_eq!(tokens.len(), 4);
    }

    #[test]
    fn lex_leaves_member_access_after_integer() {
        assert_eq!(texts("12.foo"), vec!["12", ".", "foo"]);
        assert_eq!(texts("1..5"), vec!["1", "..", "5"]);
    }

    #[test]
    fn lex_keeps_signed_exponent_in_number() {
        assert_eq!(texts("1.5e-3"), vec!["1.5e-3"]);
        assert_eq!(texts("2e+8"), vec!["2e+8"]);
    }

    #[test]
    fn lex_rejects_second_decimal_point() {
        let err = Lexer::new("x = 1.2.3;").lex().unwrap_err();
        assert!(err.message.contains("Unexpected decimal point"));
        assert_eq!(err.span.offset(), 7);
    }

    #[test]
    fn lex_classifies_keywords() {
        let tokens = Lexer::new("let get true value").lex().unwrap();
        assert_eq!(tokens[0].category, Category::Keyword);
        assert_eq!(
            tokens[0].kind(),
            Some(Kind::Keyword(KeywordKind::Declarator))
        );
        assert_eq!(tokens[2].category, Category::ContextKeyword);
        assert_eq!(tokens[2].kind(), Some(Kind::Keyword(KeywordKind::Accessor)));
        assert_eq!(tokens[4].kind(), Some(Kind::Literal(LiteralKind::Bool)));
        assert!(tokens[4].is_literal());
        assert!(tokens[6].is_name_like());
    }

    #[test]
    fn lex_line_breaks_are_single_tokens() {
        let tokens = Lexer::new("a\r\nb\rc\n").lex().unwrap();
        let breaks: Vec<_> = tokens
            .iter()
            .filter(|t| t.is_line_break())
            .map(|t| t.text.as_str())
            .collect();
        assert_eq!(breaks, vec!["\r\n", "\r", "\n"]);
    }

    #[test]
    fn lex_operators_use_longest_match() {
        assert_eq!(
            texts("a>>>=b?.c??=d=>e"),
            vec!["a", ">>>=", "b", "?.", "c", "??=", "d", "=>", "e"]
        );
    }

    #[test]
    fn lex_closed_and_interpolated_strings() {
        assert_eq!(
            significant(r#"x = "a;b" + $"{y}\"";"#),
            vec![
                ("x".to_string(), Category::Identifier),
                ("=".to_string(), Category::Operator),
                ("\"a;b\"".to_string(), Category::StringLiteral),
                ("+".to_string(), Category::Operator),
                (r#"$"{y}\"""#.to_string(), Category::StringLiteral),
                (";".to_string(), Category::Operator),
            ]
        );
    }

    #[test]
    fn lex_quoteless_string_gets_closing_quote() {
        let tokens = Lexer::new("x = \"abc; y").lex().unwrap();
        let s = tokens
            .iter()
            .find(|t| t.category == Category::StringLiteral)
            .unwrap();
        assert_eq!(s.text, "\"abc\"");
        assert_eq!((s.start, s.end), (4, 8));

        let tokens = Lexer::new("x = \"abc  + y").lex().unwrap();
        let s = tokens
            .iter()
            .find(|t| t.category == Category::StringLiteral)
            .unwrap();
        assert_eq!(s.text, "\"abc\"");
        assert_eq!(s.end, 8);
    }

    #[test]
    fn lex_verbatim_strings_double_their_quotes() {
        assert_eq!(texts("@\"a\"\"b\""), vec!["@\"a\"\"b\""]);
        assert_eq!(texts("$@\"x\ny\""), vec!["$@\"x\ny\""]);
    }

    #[test]
    fn lex_backquote_raw_string_becomes_triple_quoted() {
        let tokens = Lexer::new("`say \"hi\"`").lex().unwrap();
        assert_eq!(tokens.len(), 1);
        assert_eq!(tokens[0].category, Category::RawStringLiteral);
        assert_eq!(tokens[0].text, "\"\"\"say \"hi\"\"\"\"");

        let tokens = Lexer::new("$`a\"\"\"b`").lex().unwrap();
        assert_eq!(tokens[0].text, "$\"\"\"\"a\"\"\"b\"\"\"\"");
    }

    #[test]
    fn lex_quoted_raw_string_is_kept() {
        let src = "\"\"\"a \"\" b\"\"\"";
        assert_eq!(texts(src), vec![src]);
    }

    #[test]
    fn lex_char_literals() {
        assert_eq!(
            significant(r"c = 'a'; d = '\n'"),
            vec![
                ("c".to_string(), Category::Identifier),
                ("=".to_string(), Category::Operator),
                ("'a'".to_string(), Category::CharLiteral),
                (";".to_string(), Category::Operator),
                ("d".to_string(), Category::Identifier),
                ("=".to_string(), Category::Operator),
                (r"'\n'".to_string(), Category::CharLiteral),
            ]
        );
        assert_eq!(texts("'x;"), vec!["'x'", ";"]);
    }

    #[test]
    fn lex_comments() {
        let tokens = Lexer::new("a // c\n/* b\n */ d").lex().unwrap();
        let comments: Vec<_> = tokens
            .iter()
            .filter(|t| t.category == Category::Comment)
            .map(|t| (t.text.as_str(), t.kind()))
            .collect();
        assert_eq!(
            comments,
            vec![
                ("// c", Some(Kind::Comment(CommentKind::Line))),
                ("/* b\n */", Some(Kind::Comment(CommentKind::Block))),
            ]
        );
    }

    #[test]
    fn lex_rejects_unterminated_block_comment() {
        let err = Lexer::new("a /* b").lex().unwrap_err();
        assert!(err.message.contains("Unterminated block comment"));
        assert_eq!(err.span.offset(), 2);
    }

    #[test]
    fn lex_rejects_unknown_character() {
        let err = Lexer::new("x = a[0];").lex().unwrap_err();
        assert_eq!(err.message, "Unexpected character: [");
        assert_eq!(err.span.offset(), 5);
    }
}
