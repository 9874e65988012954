//! TOML v1.0 decoder.
//!
//! A byte cursor with a line counter drives a hand-written recursive
//! parser. Lines enter in three shapes: `[section]` / `[[section]]`
//! headers, `key = value` pairs, and blank/comment lines; the
//! [`Collector`](super::collector) owns where parsed entries land. Scalars
//! are recognized by shape first (datetime candidates match a compiled
//! pattern), then classified as boolean, integer, or float.

use std::fmt;
use std::sync::OnceLock;

use regex::Regex;

use super::collector::{insert_path, Collector};
use super::datetime;
use super::value::{Array, Table, TomlValue};
use crate::config::encode::decode_hex;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TomlErrorKind {
    UnexpectedEof,
    IllegalKey,
    IllegalString,
    IllegalDatetime,
    IllegalCharacter,
    IllegalValue,
    IllegalArray,
    IllegalInlineTable,
    TrailingContent,
    Redefinition,
    DuplicateKey,
    KeyConflict,
    ExtendInlineTable,
    ExtendLockedArray,
}

impl fmt::Display for TomlErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let info = match self {
            TomlErrorKind::UnexpectedEof => "unexpected end of input",
            TomlErrorKind::IllegalKey => "illegal key",
            TomlErrorKind::IllegalString => "illegal string",
            TomlErrorKind::IllegalDatetime => "illegal date-time",
            TomlErrorKind::IllegalCharacter => "illegal character",
            TomlErrorKind::IllegalValue => "unrecognized value",
            TomlErrorKind::IllegalArray => "malformed array",
            TomlErrorKind::IllegalInlineTable => "malformed inline table",
            TomlErrorKind::TrailingContent => "trailing characters on the line",
            TomlErrorKind::Redefinition => "table defined more than once",
            TomlErrorKind::DuplicateKey => "duplicate key",
            TomlErrorKind::KeyConflict => "key conflicts with an existing value",
            TomlErrorKind::ExtendInlineTable => "inline table cannot be extended",
            TomlErrorKind::ExtendLockedArray => "inline array cannot be extended",
        };
        f.write_str(info)
    }
}

/// A parse failure: what went wrong and the 1-based line it went wrong on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TomlError {
    pub kind: TomlErrorKind,
    pub line: usize,
}

impl fmt::Display for TomlError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "parse error at line {}: {}", self.line, self.kind)
    }
}

impl std::error::Error for TomlError {}

pub fn parse(source: &str) -> Result<TomlValue, TomlError> {
    let mut decoder = Decoder::new(source);
    match decoder.run() {
        Ok(()) => Ok(decoder.collector.into_root()),
        Err(kind) => Err(TomlError {
            kind,
            line: decoder.line,
        }),
    }
}

fn datetime_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(
            r"^(\d{4}-\d{2}-\d{2}([Tt ]\d{2}:\d{2}(:\d{2}(\.\d+)?)?([Zz]|[+-]\d{2}:\d{2})?)?|\d{2}:\d{2}(:\d{2}(\.\d+)?)?)",
        )
        .expect("datetime pattern compiles")
    })
}

struct Decoder {
    input: Vec<u8>,
    pos: usize,
    line: usize,
    collector: Collector,
}

impl Decoder {
    fn new(source: &str) -> Self {
        // Normalize Windows line endings once instead of special-casing \r
        // everywhere in the scanner.
        let normalized = source.replace("\r\n", "\n");
        Decoder {
            input: normalized.into_bytes(),
            pos: 0,
            line: 1,
            collector: Collector::new(),
        }
    }

    fn run(&mut self) -> Result<(), TomlErrorKind> {
        loop {
            self.skip_ws();
            match self.peek() {
                None => break,
                Some(b'\n') => self.bump(),
                Some(b'#') => self.consume_comment()?,
                Some(b'[') => self.parse_table_header()?,
                Some(_) => self.parse_keyval()?,
            }
        }
        Ok(())
    }

    fn peek(&self) -> Option<u8> {
        self.input.get(self.pos).copied()
    }

    fn peek_at(&self, n: usize) -> Option<u8> {
        self.input.get(self.pos + n).copied()
    }

    fn bump(&mut self) {
        if self.peek() == Some(b'\n') {
            self.line += 1;
        }
        self.pos += 1;
    }

    fn eat(&mut self, byte: u8) -> bool {
        if self.peek() == Some(byte) {
            self.bump();
            true
        } else {
            false
        }
    }

    fn skip_ws(&mut self) {
        while matches!(self.peek(), Some(b' ' | b'\t')) {
            self.bump();
        }
    }

    /// Whitespace, newlines, and comments; legal between array elements.
    fn skip_blank(&mut self) -> Result<(), TomlErrorKind> {
        loop {
            self.skip_ws();
            match self.peek() {
                Some(b'\n') => self.bump(),
                Some(b'#') => self.consume_comment()?,
                _ => return Ok(()),
            }
        }
    }

    fn consume_comment(&mut self) -> Result<(), TomlErrorKind> {
        self.bump(); // '#'
        while let Some(byte) = self.peek() {
            if byte == b'\n' {
                break;
            }
            if (byte < 0x20 && byte != b'\t') || byte == 0x7F {
                return Err(TomlErrorKind::IllegalCharacter);
            }
            self.bump();
        }
        Ok(())
    }

    /// Whitespace and an optional comment, then a newline or end of input.
    fn expect_line_end(&mut self) -> Result<(), TomlErrorKind> {
        self.skip_ws();
        if self.peek() == Some(b'#') {
            self.consume_comment()?;
        }
        match self.peek() {
            None => Ok(()),
            Some(b'\n') => {
                self.bump();
                Ok(())
            }
            Some(_) => Err(TomlErrorKind::TrailingContent),
        }
    }

    fn parse_table_header(&mut self) -> Result<(), TomlErrorKind> {
        self.bump(); // '['
        let array = self.eat(b'[');
        let keys = self.parse_dotted_key()?;
        if !self.eat(b']') {
            return Err(TomlErrorKind::IllegalKey);
        }
        if array && !self.eat(b']') {
            return Err(TomlErrorKind::IllegalKey);
        }
        if array {
            self.collector.switch_array_table(keys)?;
        } else {
            self.collector.switch_std_table(keys)?;
        }
        self.expect_line_end()
    }

    fn parse_keyval(&mut self) -> Result<(), TomlErrorKind> {
        let keys = self.parse_dotted_key()?;
        if !self.eat(b'=') {
            return Err(TomlErrorKind::IllegalKey);
        }
        self.skip_ws();
        let value = self.parse_value()?;
        self.collector.add_entry(keys, value)?;
        self.expect_line_end()
    }

    fn parse_dotted_key(&mut self) -> Result<Vec<String>, TomlErrorKind> {
        let mut keys = Vec::new();
        loop {
            self.skip_ws();
            keys.push(self.parse_simple_key()?);
            self.skip_ws();
            if !self.eat(b'.') {
                break;
            }
        }
        Ok(keys)
    }

    fn parse_simple_key(&mut self) -> Result<String, TomlErrorKind> {
        match self.peek() {
            Some(b'"') => self.parse_basic_string().map_err(key_error),
            Some(b'\'') => self.parse_literal_string().map_err(key_error),
            _ => {
                let start = self.pos;
                while let Some(byte) = self.peek() {
                    if byte.is_ascii_alphanumeric() || byte == b'_' || byte == b'-' {
                        self.bump();
                    } else {
                        break;
                    }
                }
                if self.pos == start {
                    return Err(TomlErrorKind::IllegalKey);
                }
                Ok(String::from_utf8_lossy(&self.input[start..self.pos]).into_owned())
            }
        }
    }

    fn parse_value(&mut self) -> Result<TomlValue, TomlErrorKind> {
        match self.peek() {
            None => Err(TomlErrorKind::UnexpectedEof),
            Some(b'"') => {
                if self.peek_at(1) == Some(b'"') && self.peek_at(2) == Some(b'"') {
                    self.parse_multiline_basic().map(TomlValue::from)
                } else {
                    self.parse_basic_string().map(TomlValue::from)
                }
            }
            Some(b'\'') => {
                if self.peek_at(1) == Some(b'\'') && self.peek_at(2) == Some(b'\'') {
                    self.parse_multiline_literal().map(TomlValue::from)
                } else {
                    self.parse_literal_string().map(TomlValue::from)
                }
            }
            Some(b'[') => self.parse_inline_array(),
            Some(b'{') => self.parse_inline_table(),
            Some(_) => self.parse_scalar(),
        }
    }

    fn parse_inline_array(&mut self) -> Result<TomlValue, TomlErrorKind> {
        self.bump(); // '['
        let mut items = Vec::new();
        loop {
            self.skip_blank()?;
            if self.eat(b']') {
                break;
            }
            items.push(self.parse_value()?);
            self.skip_blank()?;
            if self.eat(b',') {
                continue;
            }
            if self.eat(b']') {
                break;
            }
            return Err(TomlErrorKind::IllegalArray);
        }
        Ok(TomlValue::from_array(Array::locked(items)))
    }

    fn parse_inline_table(&mut self) -> Result<TomlValue, TomlErrorKind> {
        self.bump(); // '{'
        let mut table = Table::inline();
        self.skip_ws();
        if self.eat(b'}') {
            return Ok(TomlValue::from_table(table));
        }
        loop {
            let keys = self.parse_dotted_key()?;
            if !self.eat(b'=') {
                return Err(TomlErrorKind::IllegalInlineTable);
            }
            self.skip_ws();
            let value = self.parse_value()?;
            insert_path(&mut table, keys, value)?;
            self.skip_ws();
            if self.eat(b',') {
                continue;
            }
            if self.eat(b'}') {
                break;
            }
            return Err(TomlErrorKind::IllegalInlineTable);
        }
        Ok(TomlValue::from_table(table))
    }

    fn parse_basic_string(&mut self) -> Result<String, TomlErrorKind> {
        self.bump(); // '"'
        let mut out = String::new();
        loop {
            match self.peek() {
                None | Some(b'\n') => return Err(TomlErrorKind::IllegalString),
                Some(b'"') => {
                    self.bump();
                    return Ok(out);
                }
                Some(b'\\') => self.parse_escape(&mut out)?,
                Some(byte) if (byte < 0x20 && byte != b'\t') || byte == 0x7F => {
                    return Err(TomlErrorKind::IllegalString);
                }
                Some(_) => self.copy_verbatim_run(&mut out, &[b'"', b'\\', b'\n']),
            }
        }
    }

    fn parse_literal_string(&mut self) -> Result<String, TomlErrorKind> {
        self.bump(); // '\''
        let mut out = String::new();
        loop {
            match self.peek() {
                None | Some(b'\n') => return Err(TomlErrorKind::IllegalString),
                Some(b'\'') => {
                    self.bump();
                    return Ok(out);
                }
                Some(byte) if (byte < 0x20 && byte != b'\t') || byte == 0x7F => {
                    return Err(TomlErrorKind::IllegalString);
                }
                Some(_) => self.copy_verbatim_run(&mut out, &[b'\'', b'\n']),
            }
        }
    }

    /// `"""..."""`: a newline directly after the opening delimiter is
    /// trimmed; a backslash at the end of a line swallows the following
    /// whitespace and newlines; one or two quotes may appear in the body,
    /// and three to five close the string (the surplus belongs to the
    /// content).
    fn parse_multiline_basic(&mut self) -> Result<String, TomlErrorKind> {
        self.pos += 3; // opening delimiter contains no newline
        if self.peek() == Some(b'\n') {
            self.bump();
        }
        let mut out = String::new();
        loop {
            match self.peek() {
                None => return Err(TomlErrorKind::IllegalString),
                Some(b'"') => {
                    let quotes = self.quote_run(b'"');
                    if quotes >= 3 {
                        if quotes > 5 {
                            return Err(TomlErrorKind::IllegalString);
                        }
                        for _ in 0..quotes - 3 {
                            out.push('"');
                        }
                        self.pos += quotes;
                        return Ok(out);
                    }
                    for _ in 0..quotes {
                        out.push('"');
                    }
                    self.pos += quotes;
                }
                Some(b'\\') => {
                    if self.is_line_continuation() {
                        self.bump(); // '\\'
                        self.skip_ws();
                        // At least one newline follows by construction.
                        while matches!(self.peek(), Some(b'\n' | b' ' | b'\t')) {
                            self.bump();
                        }
                    } else {
                        self.parse_escape(&mut out)?;
                    }
                }
                Some(b'\n') => {
                    out.push('\n');
                    self.bump();
                }
                Some(byte) if (byte < 0x20 && byte != b'\t') || byte == 0x7F => {
                    return Err(TomlErrorKind::IllegalString);
                }
                Some(_) => self.copy_verbatim_run(&mut out, &[b'"', b'\\', b'\n']),
            }
        }
    }

    fn parse_multiline_literal(&mut self) -> Result<String, TomlErrorKind> {
        self.pos += 3;
        if self.peek() == Some(b'\n') {
            self.bump();
        }
        let mut out = String::new();
        loop {
            match self.peek() {
                None => return Err(TomlErrorKind::IllegalString),
                Some(b'\'') => {
                    let quotes = self.quote_run(b'\'');
                    if quotes >= 3 {
                        if quotes > 5 {
                            return Err(TomlErrorKind::IllegalString);
                        }
                        for _ in 0..quotes - 3 {
                            out.push('\'');
                        }
                        self.pos += quotes;
                        return Ok(out);
                    }
                    for _ in 0..quotes {
                        out.push('\'');
                    }
                    self.pos += quotes;
                }
                Some(b'\n') => {
                    out.push('\n');
                    self.bump();
                }
                Some(byte) if (byte < 0x20 && byte != b'\t') || byte == 0x7F => {
                    return Err(TomlErrorKind::IllegalString);
                }
                Some(_) => self.copy_verbatim_run(&mut out, &[b'\'', b'\n']),
            }
        }
    }

    fn quote_run(&self, quote: u8) -> usize {
        self.input[self.pos..]
            .iter()
            .take_while(|&&b| b == quote)
            .count()
    }

    /// Backslash at end of line (possibly with trailing whitespace) starts
    /// a line continuation in multi-line basic strings.
    fn is_line_continuation(&self) -> bool {
        let mut i = self.pos + 1;
        while matches!(self.input.get(i), Some(b' ' | b'\t')) {
            i += 1;
        }
        matches!(self.input.get(i), Some(b'\n'))
    }

    fn parse_escape(&mut self, out: &mut String) -> Result<(), TomlErrorKind> {
        self.bump(); // '\\'
        let Some(escape) = self.peek() else {
            return Err(TomlErrorKind::IllegalString);
        };
        match escape {
            b'b' => out.push('\u{0008}'),
            b't' => out.push('\t'),
            b'n' => out.push('\n'),
            b'f' => out.push('\u{000C}'),
            b'r' => out.push('\r'),
            b'"' => out.push('"'),
            b'\\' => out.push('\\'),
            b'u' => {
                self.bump();
                return self.push_unicode_escape(out, 4);
            }
            b'U' => {
                self.bump();
                return self.push_unicode_escape(out, 8);
            }
            _ => return Err(TomlErrorKind::IllegalString),
        }
        self.bump();
        Ok(())
    }

    fn push_unicode_escape(&mut self, out: &mut String, n: usize) -> Result<(), TomlErrorKind> {
        let Some(code) = decode_hex(&self.input[self.pos..], n) else {
            return Err(TomlErrorKind::IllegalString);
        };
        // Escapes must name scalar values; surrogates are not representable.
        let Some(ch) = char::from_u32(code) else {
            return Err(TomlErrorKind::IllegalString);
        };
        out.push(ch);
        self.pos += n;
        Ok(())
    }

    /// Copy bytes verbatim until a stop byte or a control byte; the input
    /// is valid UTF-8, so whole runs are.
    fn copy_verbatim_run(&mut self, out: &mut String, stops: &[u8]) {
        let start = self.pos;
        while let Some(byte) = self.peek() {
            if stops.contains(&byte) || (byte < 0x20 && byte != b'\t') || byte == 0x7F {
                break;
            }
            self.pos += 1;
        }
        out.push_str(&String::from_utf8_lossy(&self.input[start..self.pos]));
    }

    /// Non-string scalars: datetime candidates by shape first, then
    /// boolean / integer / float by token.
    fn parse_scalar(&mut self) -> Result<TomlValue, TomlErrorKind> {
        let line_end = self.input[self.pos..]
            .iter()
            .position(|&b| b == b'\n')
            .map_or(self.input.len(), |n| self.pos + n);
        let rest = String::from_utf8_lossy(&self.input[self.pos..line_end]).into_owned();

        if let Some(found) = datetime_pattern().find(&rest) {
            let text = found.as_str();
            let parsed = datetime::parse(text).ok_or(TomlErrorKind::IllegalDatetime)?;
            self.pos += text.len();
            return Ok(TomlValue::from(parsed));
        }

        let token: String = rest
            .chars()
            .take_while(|&c| !matches!(c, ' ' | '\t' | ',' | ']' | '}' | '#'))
            .collect();
        if token.is_empty() {
            return Err(TomlErrorKind::IllegalValue);
        }
        self.pos += token.len();

        match token.as_str() {
            "true" => return Ok(TomlValue::from(true)),
            "false" => return Ok(TomlValue::from(false)),
            _ => {}
        }
        if let Some(integer) = parse_integer(&token) {
            return Ok(TomlValue::from(integer));
        }
        if let Some(float) = parse_float(&token) {
            return Ok(TomlValue::from(float));
        }
        Err(TomlErrorKind::IllegalValue)
    }
}

fn key_error(kind: TomlErrorKind) -> TomlErrorKind {
    match kind {
        TomlErrorKind::IllegalString => TomlErrorKind::IllegalKey,
        other => other,
    }
}

/// Underscores must separate digits: not leading, not trailing, never
/// doubled. Returns the text with them removed.
fn remove_underscores(text: &str) -> Option<String> {
    if text.is_empty() {
        return None;
    }
    if text.starts_with('_') || text.ends_with('_') || text.contains("__") {
        return None;
    }
    Some(text.chars().filter(|&c| c != '_').collect())
}

pub(super) fn parse_integer(token: &str) -> Option<i64> {
    let cleaned = remove_underscores(token)?;
    let body = cleaned.strip_prefix('+').unwrap_or(&cleaned);
    if body.is_empty() {
        return None;
    }

    for (prefix, radix) in [("0x", 16), ("0X", 16), ("0o", 8), ("0O", 8), ("0b", 2), ("0B", 2)] {
        if let Some(digits) = body.strip_prefix(prefix) {
            if digits.is_empty() || digits.contains(['+', '-']) {
                return None;
            }
            return i64::from_str_radix(digits, radix).ok();
        }
    }

    let digits = body.strip_prefix('-').unwrap_or(body);
    if digits.len() > 1 && digits.starts_with('0') {
        return None;
    }
    body.parse::<i64>().ok()
}

pub(super) fn parse_float(token: &str) -> Option<f64> {
    let cleaned = remove_underscores(token)?;
    let (sign, body) = if let Some(rest) = cleaned.strip_prefix('+') {
        (1.0f64, rest)
    } else if let Some(rest) = cleaned.strip_prefix('-') {
        (-1.0f64, rest)
    } else {
        (1.0f64, cleaned.as_str())
    };

    match body {
        "inf" => return Some(f64::INFINITY.copysign(sign)),
        "nan" => return Some(f64::NAN.copysign(sign)),
        _ => {}
    }
    if body.is_empty() || body.starts_with('.') || body.ends_with('.') {
        return None;
    }
    if body
        .chars()
        .any(|c| c.is_alphabetic() && !matches!(c, 'e' | 'E'))
    {
        return None;
    }
    let int_part: String = body.chars().take_while(|c| c.is_ascii_digit()).collect();
    if int_part.is_empty() || (int_part.len() > 1 && int_part.starts_with('0')) {
        return None;
    }
    body.parse::<f64>().ok().map(|f| f.copysign(sign))
}
