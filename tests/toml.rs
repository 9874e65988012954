//! TOML decoder conformance: seeded scenarios, grammar coverage, and the
//! redefinition discipline.

use coffer::config::toml::{dumps, parse, TomlErrorKind, TomlValue};
use rstest::rstest;

#[test]
fn table_array_discipline() {
    let root = parse("[[a.b]]\nx = 1\n\n[a]\ny = 2\n").expect("parses");
    let b = root.get("a").and_then(|a| a.get("b")).expect("a.b exists");
    let array = b.as_array().expect("a.b is an array of tables");
    assert_eq!(array.len(), 1);
    assert_eq!(
        b.at(0).and_then(|t| t.get("x")).and_then(TomlValue::as_integer),
        Some(1)
    );
    assert_eq!(
        root.get("a").and_then(|a| a.get("y")).and_then(TomlValue::as_integer),
        Some(2)
    );
}

#[test]
fn inline_table_immutability() {
    let err = parse("t = { x = 1 }\n[t]\ny = 2\n").expect_err("must fail");
    assert_eq!(err.kind, TomlErrorKind::ExtendInlineTable);
    assert_eq!(err.line, 2);
}

#[test]
fn array_of_tables_accumulates() {
    let source = "\
[[fruit]]
name = \"apple\"

[fruit.physical]
color = \"red\"

[[fruit]]
name = \"banana\"
";
    let root = parse(source).expect("parses");
    let fruit = root.get("fruit").and_then(TomlValue::as_array).expect("array");
    assert_eq!(fruit.len(), 2);
    assert_eq!(
        fruit
            .get(0)
            .and_then(|t| t.get("physical"))
            .and_then(|p| p.get("color"))
            .and_then(TomlValue::as_str),
        Some("red"),
        "[fruit.physical] attaches to the latest element"
    );
    assert_eq!(
        fruit.get(1).and_then(|t| t.get("name")).and_then(TomlValue::as_str),
        Some("banana")
    );
}

#[rstest]
#[case("[t]\nx = 1\n[t]\n", TomlErrorKind::Redefinition)]
#[case("[[a]]\n[a]\n", TomlErrorKind::Redefinition)]
#[case("[a]\n[[a]]\n", TomlErrorKind::Redefinition)]
#[case("x = 1\nx = 2\n", TomlErrorKind::DuplicateKey)]
#[case("x = 1\n[x.y]\n", TomlErrorKind::KeyConflict)]
#[case("a = [1]\n[[a]]\n", TomlErrorKind::ExtendLockedArray)]
#[case("[a.b]\n[a]\nb.c = 1\n", TomlErrorKind::Redefinition)]
fn redefinition_rules(#[case] source: &str, #[case] expected: TomlErrorKind) {
    let err = parse(source).expect_err("must fail");
    assert_eq!(err.kind, expected, "for source: {source:?}");
}

#[test]
fn dotted_keys_create_implicit_tables() {
    let root = parse("a.b.c = 1\na.b.d = 2\n\n[a.e]\nf = 3\n").expect("parses");
    assert_eq!(
        root.get("a")
            .and_then(|a| a.get("b"))
            .and_then(|b| b.get("c"))
            .and_then(TomlValue::as_integer),
        Some(1)
    );
    assert_eq!(
        root.get("a")
            .and_then(|a| a.get("e"))
            .and_then(|e| e.get("f"))
            .and_then(TomlValue::as_integer),
        Some(3)
    );
}

#[rstest]
#[case("x = 0xDEADBEEF\n", 0xDEAD_BEEF)]
#[case("x = 0o755\n", 0o755)]
#[case("x = 0b11010110\n", 0b1101_0110)]
#[case("x = 1_000_000\n", 1_000_000)]
#[case("x = -17\n", -17)]
#[case("x = +99\n", 99)]
#[case("x = 0\n", 0)]
fn integer_forms(#[case] source: &str, #[case] expected: i64) {
    let root = parse(source).expect("parses");
    assert_eq!(root.get("x").and_then(TomlValue::as_integer), Some(expected));
}

#[rstest]
#[case("x = 3.14\n", 3.14)]
#[case("x = -0.01\n", -0.01)]
#[case("x = 5e+22\n", 5e22)]
#[case("x = 1e06\n", 1e6)]
#[case("x = -2E-2\n", -0.02)]
#[case("x = 3_141.5927\n", 3141.5927)]
fn float_forms(#[case] source: &str, #[case] expected: f64) {
    let root = parse(source).expect("parses");
    let x = root.get("x").and_then(TomlValue::as_float).expect("float");
    assert!((x - expected).abs() < 1e-9, "{x} != {expected}");
}

#[test]
fn special_floats() {
    let root = parse("a = inf\nb = -inf\nc = nan\nd = -nan\n").expect("parses");
    assert_eq!(root.get("a").and_then(TomlValue::as_float), Some(f64::INFINITY));
    assert_eq!(root.get("b").and_then(TomlValue::as_float), Some(f64::NEG_INFINITY));
    assert!(root.get("c").and_then(TomlValue::as_float).is_some_and(f64::is_nan));
    assert!(root
        .get("d")
        .and_then(TomlValue::as_float)
        .is_some_and(|f| f.is_nan() && f.is_sign_negative()));
}

#[rstest]
#[case("x = 01\n")]
#[case("x = 1__0\n")]
#[case("x = _1\n")]
#[case("x = 1_\n")]
#[case("x = .5\n")]
#[case("x = 5.\n")]
#[case("x = infinity\n")]
fn malformed_numbers(#[case] source: &str) {
    assert!(parse(source).is_err(), "{source:?} must fail");
}

#[test]
fn string_forms() {
    let source = "basic = \"a\\tb\\u00E9\"\nliteral = 'C:\\path\\no\\escape'\n";
    let root = parse(source).expect("parses");
    assert_eq!(root.get("basic").and_then(TomlValue::as_str), Some("a\tbé"));
    assert_eq!(
        root.get("literal").and_then(TomlValue::as_str),
        Some("C:\\path\\no\\escape")
    );
}

#[test]
fn multiline_basic_trims_and_continues() {
    let source = "s = \"\"\"\nRoses are red\nViolets are blue\"\"\"\n";
    let root = parse(source).expect("parses");
    assert_eq!(
        root.get("s").and_then(TomlValue::as_str),
        Some("Roses are red\nViolets are blue")
    );

    let source = "s = \"\"\"\\\n    The quick brown \\\n    fox.\"\"\"\n";
    let root = parse(source).expect("parses");
    assert_eq!(
        root.get("s").and_then(TomlValue::as_str),
        Some("The quick brown fox.")
    );
}

#[test]
fn multiline_quote_greediness() {
    // Two quotes inside, and up to five at the close.
    let root = parse("a = \"\"\"two \"\" inside\"\"\"\n").expect("parses");
    assert_eq!(root.get("a").and_then(TomlValue::as_str), Some("two \"\" inside"));

    let root = parse("a = \"\"\"ends with quotes\"\"\"\"\"\n").expect("parses");
    assert_eq!(
        root.get("a").and_then(TomlValue::as_str),
        Some("ends with quotes\"\"")
    );

    let root = parse("a = '''that's a literal '' ok'''\n").expect("parses");
    assert_eq!(
        root.get("a").and_then(TomlValue::as_str),
        Some("that's a literal '' ok")
    );
}

#[test]
fn datetimes() {
    let source = "\
odt = 1979-05-27T07:32:00Z
ldt = 1979-05-27T00:32:00.999999
ld = 1979-05-27
lt = 07:32:00
neg = 1979-05-27 00:32:00-07:00
";
    let root = parse(source).expect("parses");
    let odt = root.get("odt").and_then(TomlValue::as_datetime).expect("odt");
    assert!(odt.is_offset_date_time());
    assert!(root.get("ldt").and_then(TomlValue::as_datetime).expect("ldt").is_local_date_time());
    assert!(root.get("ld").and_then(TomlValue::as_datetime).expect("ld").is_local_date());
    assert!(root.get("lt").and_then(TomlValue::as_datetime).expect("lt").is_local_time());
    let neg = root.get("neg").and_then(TomlValue::as_datetime).expect("neg");
    assert_eq!(neg.to_string(), "1979-05-27T00:32:00-07:00");
}

#[test]
fn arrays_span_lines_and_nest() {
    let source = "a = [\n  1,\n  2, # comment\n  [3, 4],\n]\n";
    let root = parse(source).expect("parses");
    let a = root.get("a").and_then(TomlValue::as_array).expect("array");
    assert!(a.is_locked());
    assert_eq!(a.len(), 3);
    assert_eq!(a.get(2).and_then(|v| v.at(1)).and_then(TomlValue::as_integer), Some(4));
}

#[test]
fn inline_tables_with_dotted_keys() {
    let root = parse("p = { x.a = 1, y = \"s\" }\n").expect("parses");
    let p = root.get("p").expect("p");
    assert_eq!(
        p.get("x").and_then(|x| x.get("a")).and_then(TomlValue::as_integer),
        Some(1)
    );
    assert_eq!(p.get("y").and_then(TomlValue::as_str), Some("s"));
}

#[test]
fn comments_and_blank_lines() {
    let source = "# header comment\n\nx = 1 # trailing\n\n# footer\n";
    let root = parse(source).expect("parses");
    assert_eq!(root.get("x").and_then(TomlValue::as_integer), Some(1));
}

#[test]
fn quoted_and_dotted_keys() {
    let source = "\"quoted key\" = 1\n'literal key' = 2\nsite.\"google.com\" = true\n";
    let root = parse(source).expect("parses");
    assert_eq!(root.get("quoted key").and_then(TomlValue::as_integer), Some(1));
    assert_eq!(root.get("literal key").and_then(TomlValue::as_integer), Some(2));
    assert_eq!(
        root.get("site")
            .and_then(|s| s.get("google.com"))
            .and_then(TomlValue::as_boolean),
        Some(true)
    );
}

#[test]
fn render_then_reparse_is_identity() {
    let source = "\
title = \"example\"
[owner]
name = \"tom\"
dob = 1979-05-27T07:32:00Z

[database]
ports = [8000, 8001, 8002]
enabled = true

[[servers]]
host = \"alpha\"

[[servers]]
host = \"beta\"
";
    let first = parse(source).expect("source parses");
    let rendered = dumps(&first);
    let second = parse(&rendered)
        .unwrap_or_else(|e| panic!("rendered output failed to parse: {e}\n{rendered}"));
    assert_eq!(first, second);
}

#[test]
fn errors_report_the_line() {
    let err = parse("good = 1\nalso_good = 2\nbad =\n").expect_err("must fail");
    assert_eq!(err.line, 3);
}
