//! Structural conversion between the two value models.
//!
//! TOML → JSON is lossless except that datetimes become their RFC 3339
//! strings. JSON → TOML is total but lossy on `null`, which becomes the
//! string `"null"` (TOML has no null alternative).

use super::json::{self, JsonValue, Number};
use super::toml::value::{Array as TomlArray, Table as TomlTable, TomlValue};

pub fn toml_to_json(value: &TomlValue) -> JsonValue {
    match value {
        TomlValue::Boolean(_) => JsonValue::from(value.as_boolean().unwrap_or_default()),
        TomlValue::Integer(_) => JsonValue::from(value.as_integer().unwrap_or_default()),
        TomlValue::Float(_) => JsonValue::from(value.as_float().unwrap_or_default()),
        TomlValue::String(_) => JsonValue::from(value.as_str().unwrap_or_default()),
        TomlValue::Datetime(_) => JsonValue::from(
            value
                .as_datetime()
                .map(ToString::to_string)
                .unwrap_or_default(),
        ),
        TomlValue::Array(_) => {
            let items = value
                .as_array()
                .map(|a| a.iter().map(toml_to_json).collect())
                .unwrap_or_default();
            JsonValue::from_array(items)
        }
        TomlValue::Table(_) => {
            let entries = value
                .as_table()
                .map(|t| {
                    t.iter()
                        .map(|(k, v)| (k.clone(), toml_to_json(v)))
                        .collect()
                })
                .unwrap_or_default();
            JsonValue::from_object(entries)
        }
    }
}

pub fn json_to_toml(value: &JsonValue) -> TomlValue {
    match value {
        JsonValue::Null => TomlValue::from("null"),
        JsonValue::Boolean(_) => TomlValue::from(value.as_boolean().unwrap_or_default()),
        JsonValue::Number(_) => match value.as_number() {
            Some(Number::Signed(i)) => TomlValue::from(i),
            Some(Number::Unsigned(u)) => {
                // TOML integers are signed 64-bit; larger magnitudes fall
                // back to floats.
                i64::try_from(u).map_or_else(|_| TomlValue::from(u as f64), TomlValue::from)
            }
            Some(Number::Float(f)) => TomlValue::from(f),
            None => TomlValue::from(0i64),
        },
        JsonValue::String(_) => TomlValue::from(value.as_str().unwrap_or_default()),
        JsonValue::Array(_) => {
            let items = value
                .as_array()
                .map(|a| a.iter().map(json_to_toml).collect())
                .unwrap_or_default();
            TomlValue::from_array(TomlArray::locked(items))
        }
        JsonValue::Object(_) => {
            let mut table = TomlTable::new();
            if let Some(object) = value.as_object() {
                for (key, item) in object {
                    let _ = table.try_insert(key.clone(), json_to_toml(item));
                }
            }
            TomlValue::from_table(table)
        }
        JsonValue::Error(_) => TomlValue::from("null"),
    }
}

/// Convenience: parse a TOML document and re-express it as JSON text.
pub fn toml_source_to_json(source: &str) -> Result<String, super::toml::TomlError> {
    let value = super::toml::parse(source)?;
    Ok(json::dumps(&toml_to_json(&value)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{json, toml};

    #[test]
    fn scalars_map_by_kind() {
        let root = toml::parse("b = true\ni = 3\nf = 0.5\ns = \"x\"\n").expect("parses");
        let object = toml_to_json(&root);
        assert_eq!(object.get("b"), Some(&JsonValue::from(true)));
        assert_eq!(
            object.get("i").and_then(JsonValue::as_number),
            Some(Number::Signed(3))
        );
        assert_eq!(
            object.get("f").and_then(JsonValue::as_number),
            Some(Number::Float(0.5))
        );
        assert_eq!(object.get("s").and_then(JsonValue::as_str), Some("x"));
    }

    #[test]
    fn datetime_becomes_string() {
        let root = toml::parse("when = 1979-05-27T07:32:00Z\n").expect("parses");
        let object = toml_to_json(&root);
        assert_eq!(
            object.get("when").and_then(JsonValue::as_str),
            Some("1979-05-27T07:32:00Z")
        );
    }

    #[test]
    fn null_becomes_the_string_null() {
        let value = json::loads(r#"{"missing": null}"#);
        let table = json_to_toml(&value);
        assert_eq!(
            table.get("missing").and_then(TomlValue::as_str),
            Some("null")
        );
    }

    #[test]
    fn json_arrays_become_locked() {
        let value = json::loads("[1, 2]");
        let array = json_to_toml(&value);
        assert!(array.as_array().is_some_and(TomlArray::is_locked));
    }
}
