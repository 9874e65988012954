//! Cross-conversion round trips between the two value models.

use coffer::config::convert::{json_to_toml, toml_to_json};
use coffer::config::{json, toml};

#[test]
fn toml_to_json_and_back_is_identity_modulo_datetimes() {
    let source = "\
name = \"round trip\"
count = 3
ratio = 0.5
flags = [true, false]

[nested]
deep = { a = 1 }

[[items]]
id = 1

[[items]]
id = 2
";
    let original = toml::parse(source).expect("source parses");
    let as_json = toml_to_json(&original);
    let back = json_to_toml(&as_json);
    let reparsed = toml::parse(&toml::dumps(&back)).expect("re-rendered parses");
    assert_eq!(original, reparsed);
}

#[test]
fn json_to_toml_and_back_is_identity_modulo_null() {
    let source = r#"{"a": 1, "b": [true, "x", 2.5], "c": {"d": "e"}, "n": null}"#;
    let original = json::loads(source);
    assert!(original.is_ok());

    let as_toml = json_to_toml(&original);
    let back = toml_to_json(&as_toml);

    // null became the string "null"; everything else survives.
    assert_eq!(back.get("a"), original.get("a"));
    assert_eq!(back.get("b"), original.get("b"));
    assert_eq!(back.get("c"), original.get("c"));
    assert_eq!(
        back.get("n").and_then(json::JsonValue::as_str),
        Some("null")
    );
}

#[test]
fn number_subkinds_survive() {
    let original = json::loads(r#"{"i": -3, "f": 0.25}"#);
    let as_toml = json_to_toml(&original);
    assert_eq!(as_toml.get("i").and_then(toml::TomlValue::as_integer), Some(-3));
    assert_eq!(as_toml.get("f").and_then(toml::TomlValue::as_float), Some(0.25));

    let back = toml_to_json(&as_toml);
    assert_eq!(back.get("i"), original.get("i"));
    assert_eq!(back.get("f"), original.get("f"));
}

#[test]
fn toml_source_to_json_text() {
    let rendered = coffer::config::convert::toml_source_to_json("x = 1\n").expect("parses");
    let value = json::loads(&rendered);
    assert_eq!(
        value.get("x").and_then(json::JsonValue::as_number),
        Some(json::Number::Signed(1))
    );
}
