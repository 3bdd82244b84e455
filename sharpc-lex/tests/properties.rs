use proptest::prelude::*;
use sharpc_lex::{Category, Lexer};

// Sources without quotes or back-quotes: every token text equals its source slice.
fn plain_source() -> impl Strategy<Value = String> {
    proptest::string::string_regex(r"[a-z0-9_ ;,(){}.:=+\-*/#~@$?!<>&|\r\n]{0,48}")
        .expect("valid regex")
}

// Adds string, char and raw-string delimiters, escapes and non-ASCII text.
fn literal_source() -> impl Strategy<Value = String> {
    proptest::string::string_regex(r#"[a-z0-9_ ;,(){}.:=+\-*/#~@$?!<>&|"'`\\é\r\n]{0,48}"#)
        .expect("valid regex")
}

proptest! {
    #[test]
    fn spans_partition_the_source(src in plain_source()) {
        let Ok(tokens) = Lexer::new(&src).lex() else {
            return Ok(());
        };
        let mut pos = 0;
        for t in &tokens {
            prop_assert_eq!(t.start, pos);
            prop_assert!(t.start < t.end);
            prop_assert_eq!(&src[t.start..t.end], t.text.as_str());
            pos = t.end;
        }
        prop_assert_eq!(pos, src.len());
    }

    #[test]
    fn literal_spans_partition_the_source(src in literal_source()) {
        let Ok(tokens) = Lexer::new(&src).lex() else {
            return Ok(());
        };
        let mut pos = 0;
        for t in &tokens {
            prop_assert_eq!(t.start, pos);
            prop_assert!(t.start < t.end);
            prop_assert!(src.is_char_boundary(t.end));
            pos = t.end;
        }
        prop_assert_eq!(pos, src.len());
    }

    #[test]
    fn relexing_token_texts_is_idempotent(src in plain_source()) {
        let Ok(tokens) = Lexer::new(&src).lex() else {
            return Ok(());
        };
        let joined: String = tokens.iter().map(|t| t.text.as_str()).collect();
        let again = Lexer::new(&joined).lex().expect("re-lex succeeds");
        let first: Vec<(&str, Category)> =
            tokens.iter().map(|t| (t.text.as_str(), t.category)).collect();
        let second: Vec<(&str, Category)> =
            again.iter().map(|t| (t.text.as_str(), t.category)).collect();
        prop_assert_eq!(first, second);
    }
}

#[test]
fn relexing_normalised_literals_is_stable() {
    let src = "x = \"open; y = `raw`;";
    let tokens = Lexer::new(src).lex().unwrap();
    let joined: String = tokens.iter().map(|t| t.text.as_str()).collect();
    assert_eq!(joined, "x = \"open\"; y = \"\"\"raw\"\"\";");

    let again = Lexer::new(&joined).lex().unwrap();
    let rejoined: String = again.iter().map(|t| t.text.as_str()).collect();
    assert_eq!(rejoined, joined);
}
