//! TOML renderer.
//!
//! Walks a table tree top-down: scalar entries first, then every
//! array-of-tables as `[[path]]` blocks, then sub-tables as `[path]`
//! sections. The output parses back to a structurally equal value (the
//! bookkeeping flags are not part of equality).

use std::sync::OnceLock;

use regex::Regex;

use super::value::{Table, TomlValue};

pub fn dumps(value: &TomlValue) -> String {
    let mut out = String::new();
    if let Some(table) = value.as_table() {
        write_table(&mut out, &mut Vec::new(), table);
    } else {
        out.push_str(&render_inline(value));
    }
    out
}

/// An unlocked array whose elements are all tables renders as
/// `[[section]]` blocks; everything else renders inline.
fn is_table_array(value: &TomlValue) -> bool {
    match value.as_array() {
        Some(array) => {
            !array.is_locked() && !array.is_empty() && array.iter().all(TomlValue::is_table)
        }
        None => false,
    }
}

fn write_table(out: &mut String, path: &mut Vec<String>, table: &Table) {
    let mut scalars: Vec<(&String, &TomlValue)> = Vec::new();
    let mut table_arrays: Vec<(&String, &TomlValue)> = Vec::new();
    let mut subtables: Vec<(&String, &TomlValue)> = Vec::new();
    for (key, value) in table.iter() {
        if value.is_table() {
            subtables.push((key, value));
        } else if is_table_array(value) {
            table_arrays.push((key, value));
        } else {
            scalars.push((key, value));
        }
    }

    if !path.is_empty() && (!scalars.is_empty() || table.is_empty()) {
        out.push('[');
        out.push_str(&join_path(path));
        out.push_str("]\n");
    }
    for (key, value) in scalars {
        out.push_str(&render_key(key));
        out.push_str(" = ");
        out.push_str(&render_inline(value));
        out.push('\n');
    }

    for (key, value) in table_arrays {
        let array = value.as_array().expect("classified as a table array");
        path.push(key.clone());
        let header = join_path(path);
        for element in array.iter() {
            out.push_str("\n[[");
            out.push_str(&header);
            out.push_str("]]\n");
            let element = element.as_table().expect("table-array element");
            write_table_array_element(out, path, element);
        }
        path.pop();
    }

    for (key, value) in subtables {
        let sub = value.as_table().expect("classified as a table");
        path.push(key.clone());
        if !sub.iter().any(|(_, v)| !v.is_table() && !is_table_array(v)) && !sub.is_empty() {
            // No direct scalars: the section header is implied by the
            // children.
            write_table(out, path, sub);
        } else {
            out.push('\n');
            write_table(out, path, sub);
        }
        path.pop();
    }
}

/// Contents of one `[[...]]` element: scalars inline, nested structure as
/// sections scoped under the element's path (they attach to the latest
/// appended element on re-parse).
fn write_table_array_element(out: &mut String, path: &mut Vec<String>, table: &Table) {
    for (key, value) in table.iter() {
        if !value.is_table() && !is_table_array(value) {
            out.push_str(&render_key(key));
            out.push_str(" = ");
            out.push_str(&render_inline(value));
            out.push('\n');
        }
    }
    for (key, value) in table.iter() {
        if is_table_array(value) {
            let array = value.as_array().expect("classified as a table array");
            path.push(key.clone());
            let header = join_path(path);
            for element in array.iter() {
                out.push_str("\n[[");
                out.push_str(&header);
                out.push_str("]]\n");
                let element = element.as_table().expect("table-array element");
                write_table_array_element(out, path, element);
            }
            path.pop();
        } else if let Some(sub) = value.as_table() {
            path.push(key.clone());
            out.push('\n');
            write_table(out, path, sub);
            path.pop();
        }
    }
}

fn bare_key_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"^[A-Za-z0-9_-]+$").expect("bare key pattern compiles"))
}

fn render_key(key: &str) -> String {
    if bare_key_pattern().is_match(key) {
        key.to_string()
    } else {
        render_string(key)
    }
}

fn join_path(path: &[String]) -> String {
    path.iter()
        .map(|segment| render_key(segment))
        .collect::<Vec<_>>()
        .join(".")
}

pub(super) fn render_inline(value: &TomlValue) -> String {
    match value {
        TomlValue::Boolean(_) => match value.as_boolean() {
            Some(true) => "true".to_string(),
            _ => "false".to_string(),
        },
        TomlValue::Integer(_) => value.as_integer().unwrap_or_default().to_string(),
        TomlValue::Float(_) => render_float(value.as_float().unwrap_or_default()),
        TomlValue::String(_) => render_string(value.as_str().unwrap_or_default()),
        TomlValue::Datetime(_) => value
            .as_datetime()
            .map(ToString::to_string)
            .unwrap_or_default(),
        TomlValue::Array(_) => {
            let items: Vec<String> = value
                .as_array()
                .map(|a| a.iter().map(render_inline).collect())
                .unwrap_or_default();
            format!("[{}]", items.join(", "))
        }
        TomlValue::Table(_) => {
            let entries: Vec<String> = value
                .as_table()
                .map(|t| {
                    t.iter()
                        .map(|(k, v)| format!("{} = {}", render_key(k), render_inline(v)))
                        .collect()
                })
                .unwrap_or_default();
            format!("{{{}}}", entries.join(", "))
        }
    }
}

fn render_float(f: f64) -> String {
    if f.is_nan() {
        if f.is_sign_negative() {
            "-nan".to_string()
        } else {
            "nan".to_string()
        }
    } else if f.is_infinite() {
        if f < 0.0 {
            "-inf".to_string()
        } else {
            "inf".to_string()
        }
    } else if f == f.trunc() && f.abs() < 1e16 {
        format!("{f:.1}")
    } else {
        f.to_string()
    }
}

fn render_string(text: &str) -> String {
    let mut out = String::with_capacity(text.len() + 2);
    out.push('"');
    for ch in text.chars() {
        match ch {
            '"' => out.push_str("\\\""),
            '\\' => out.push_str("\\\\"),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\t' => out.push_str("\\t"),
            '\u{0008}' => out.push_str("\\b"),
            '\u{000C}' => out.push_str("\\f"),
            c if (c as u32) < 0x20 || c == '\u{7F}' => {
                out.push_str(&format!("\\u{:04X}", c as u32));
            }
            c => out.push(c),
        }
    }
    out.push('"');
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::toml::parse;

    #[test]
    fn sections_round_trip() {
        let source = "x = 1\n\n[server]\nhost = \"localhost\"\nport = 8080\n\n[server.tls]\nenabled = true\n";
        let first = parse(source).expect("source parses");
        let second = parse(&dumps(&first)).expect("rendered output parses");
        assert_eq!(first, second);
    }

    #[test]
    fn table_arrays_round_trip() {
        let source = "[[fruit]]\nname = \"apple\"\n\n[[fruit]]\nname = \"pear\"\ncount = 2\n";
        let first = parse(source).expect("source parses");
        let second = parse(&dumps(&first)).expect("rendered output parses");
        assert_eq!(first, second);
    }

    #[test]
    fn inline_values_render_parseably() {
        let source = "t = { a = 1, b = [1, 2, 3] }\ns = \"quote \\\" here\"\nf = -0.5\ni = inf\n";
        let first = parse(source).expect("source parses");
        let second = parse(&dumps(&first)).expect("rendered output parses");
        assert_eq!(first, second);
    }

    #[test]
    fn quoted_keys_are_escaped() {
        let source = "\"odd key\" = 1\n";
        let first = parse(source).expect("source parses");
        let second = parse(&dumps(&first)).expect("rendered output parses");
        assert_eq!(first, second);
    }
}
