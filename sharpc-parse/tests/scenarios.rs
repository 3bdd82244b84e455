use pretty_assertions::assert_eq;
use sharpc_parse::{
    ConvertConfig, LineEnding, TypePosition, convert, convert_type, convert_with_config,
    convert_with_tokens, parse_type_source,
};

#[test]
fn typed_let_becomes_declaration() {
    assert_eq!(convert("let x: int = 1;").unwrap(), "int x = 1;\r\n");
}

#[test]
fn illegal_class_modifiers_name_the_modifier() {
    let err = convert("async class Foo {}").expect_err("async class must fail");
    assert!(err.is_syntax());
    assert!(err.message().contains("async"), "unexpected message: {}", err.message());

    let err = convert("ref class Foo {}").expect_err("ref class must fail");
    assert!(err.message().contains("ref"), "unexpected message: {}", err.message());
}

#[test]
fn missing_right_brace_points_at_opening_brace() {
    let src = "class Foo {";
    let err = convert(src).expect_err("unterminated class must fail");
    assert_eq!(err.message(), "Missing right brace");
    let span = err.span().expect("error carries a span");
    assert_eq!(span.offset(), src.find('{').unwrap());
    assert_eq!(span.len(), 1);
}

#[test]
fn auto_property_keeps_initializer() {
    let out = convert("prop Value: int { get; set; } = 0;").unwrap();
    assert_eq!(out, "int Value { get; set; } = 0;\r\n");
}

#[test]
fn using_flags_are_hoisted() {
    let out = convert("using System.Console @static, System.Math;").unwrap();
    assert_eq!(out, "using static System.Console;\r\nusing static System.Math;\r\n");
}

#[test]
fn class_with_members() {
    let src = r#"namespace Shop;

class Cart-T : IEnumerable-T @public {
  immut items: List-T @private = new List-T();

  prop Count: int @public => items.Count;

  fn Add item: T => _ @public {
    if item == null; throw new ArgumentNullException(nameof(item));
    items.Add(item);
  }

  async fn Total prices: Func-T/decimal => Task-decimal @public {
    let sum: decimal = 0;
    foreach item in items {
      sum += prices(item);
    }
    return await Task.FromResult(sum);
  }
}
"#;
    let expected = [
        "namespace Shop;",
        "",
        "public class Cart<T> : IEnumerable<T> {",
        "  private readonly List<T> items = new List<T>();",
        "",
        "  public int Count => items.Count;",
        "",
        "  public void Add(T item) {",
        "    if (item == null)",
        "      throw new ArgumentNullException(nameof(item));",
        "    items.Add(item);",
        "  }",
        "",
        "  public async Task<decimal> Total(Func<T, decimal> prices) {",
        "    decimal sum = 0;",
        "    foreach (var item in items) {",
        "      sum += prices(item);",
        "    }",
        "    return await Task.FromResult(sum);",
        "  }",
        "}",
        "",
    ]
    .join("\r\n");
    assert_eq!(convert(src).unwrap(), expected);
}

#[test]
fn control_flow_inside_function() {
    let src = "fn Classify n: int => string {\n  switch n {\n    0 => return \"zero\";\n    _ => {\n      log(n);\n    }\n  }\n  return \"other\";\n}";
    let expected = "string Classify(int n) {\r\n  switch (n) {\r\n    case 0:\r\n      return \"zero\";\r\n    default:\r\n      log(n);\r\n      break;\r\n  }\r\n  return \"other\";\r\n}\r\n";
    assert_eq!(convert(src).unwrap(), expected);
}

#[test]
fn line_ending_and_indent_width_follow_config() {
    let config = ConvertConfig {
        indent_width: 4,
        line_ending: LineEnding::Lf,
    };
    let out = convert_with_config("class A {\n  fn Run {\n    Go();\n  }\n}", &config).unwrap();
    assert_eq!(out, "class A {\n    void Run() {\n        Go();\n    }\n}\n");
}

#[test]
fn conversion_exposes_annotated_tokens() {
    let conversion = convert_with_tokens("let x: int = 1;", &ConvertConfig::default()).unwrap();
    assert_eq!(conversion.output, "int x = 1;\r\n");
    let texts: Vec<&str> = conversion
        .tokens
        .iter()
        .filter(|t| !t.is_trivia())
        .map(|t| t.text.as_str())
        .collect();
    assert_eq!(texts, ["let", "x", ":", "int", "=", "1", ";"]);
}

#[test]
fn standalone_types() {
    let ty = parse_type_source("(Dictionary-string/int)#").unwrap();
    assert_eq!(convert_type(&ty, TypePosition::Plain), "Dictionary<string, int>[]");
    let ty = parse_type_source("fn: int => _").unwrap();
    assert_eq!(convert_type(&ty, TypePosition::Plain), "Action<int>");
    assert!(parse_type_source("").is_err());
}

#[test]
fn errors_render_as_diagnostics() {
    let report = sharpc_parse::convert_source("let = 1;").expect_err("missing name must fail");
    assert!(report.to_string().contains("Missing variable name"));
}
