//! RFC 8259 decoder.
//!
//! The decoder is total: every failure is folded into the returned value as
//! an [`ErrorCode`]. Dispatch looks at the first non-whitespace byte;
//! arrays and objects recurse through `parse_value`.

use super::value::{ErrorCode, JsonValue, Object};
use crate::config::encode::{decode_hex, push_codepoint, REPLACEMENT};

pub(super) struct Decoder<'a> {
    input: &'a [u8],
    pos: usize,
}

const NUMBER_BYTES: &[u8] = b"0123456789+-.eE";

impl<'a> Decoder<'a> {
    pub fn new(source: &'a str) -> Self {
        Decoder {
            input: source.as_bytes(),
            pos: 0,
        }
    }

    /// Parse a complete document; trailing non-whitespace is `MultiValue`.
    pub fn decode(mut self) -> JsonValue {
        let root = self.parse_value();
        if !root.is_ok() {
            return root;
        }
        self.skip_whitespace();
        if self.at_end() {
            root
        } else {
            ErrorCode::MultiValue.into()
        }
    }

    /// Strict-payload variant: the root must be an object or array.
    pub fn decode_payload(mut self) -> JsonValue {
        self.skip_whitespace();
        match self.peek() {
            Some(b'{') | Some(b'[') => self.decode(),
            _ => ErrorCode::ErrorPayload.into(),
        }
    }

    fn at_end(&self) -> bool {
        self.pos >= self.input.len()
    }

    fn peek(&self) -> Option<u8> {
        self.input.get(self.pos).copied()
    }

    fn bump(&mut self) {
        self.pos += 1;
    }

    fn skip_whitespace(&mut self) {
        while matches!(self.peek(), Some(b' ' | b'\t' | b'\n' | b'\r')) {
            self.bump();
        }
    }

    fn eat_literal(&mut self, literal: &str) -> bool {
        if self.input[self.pos..].starts_with(literal.as_bytes()) {
            self.pos += literal.len();
            true
        } else {
            false
        }
    }

    fn parse_value(&mut self) -> JsonValue {
        self.skip_whitespace();
        match self.peek() {
            None => ErrorCode::UnexpectedEof.into(),
            Some(b't') | Some(b'f') => self.parse_boolean(),
            Some(b'n') => self.parse_null(),
            Some(b'[') => self.parse_array(),
            Some(b'{') => self.parse_object(),
            Some(b'"') => self.parse_string(),
            Some(_) => self.parse_number(),
        }
    }

    fn parse_null(&mut self) -> JsonValue {
        if self.eat_literal("null") {
            JsonValue::Null
        } else {
            ErrorCode::IllegalLiteral.into()
        }
    }

    fn parse_boolean(&mut self) -> JsonValue {
        if self.eat_literal("true") {
            JsonValue::from(true)
        } else if self.eat_literal("false") {
            JsonValue::from(false)
        } else {
            ErrorCode::IllegalLiteral.into()
        }
    }

    fn parse_array(&mut self) -> JsonValue {
        self.bump(); // '['
        self.skip_whitespace();

        let mut items = Vec::new();
        if self.peek() == Some(b']') {
            self.bump();
            return JsonValue::from_array(items);
        }
        loop {
            let value = self.parse_value();
            if !value.is_ok() {
                return value;
            }
            items.push(value);
            self.skip_whitespace();
            match self.peek() {
                Some(b']') => {
                    self.bump();
                    return JsonValue::from_array(items);
                }
                Some(b',') => {
                    self.bump();
                    self.skip_whitespace();
                }
                _ => return ErrorCode::IllegalArray.into(),
            }
        }
    }

    fn parse_object(&mut self) -> JsonValue {
        self.bump(); // '{'
        self.skip_whitespace();

        let mut object = Object::new();
        match self.peek() {
            Some(b'}') => {
                self.bump();
                return JsonValue::from_object(object);
            }
            Some(b'"') => {}
            _ => return ErrorCode::IllegalObject.into(),
        }
        loop {
            let key = self.parse_string();
            if !key.is_ok() {
                return key;
            }
            self.skip_whitespace();
            if self.peek() != Some(b':') {
                return ErrorCode::IllegalObject.into();
            }
            self.bump();
            self.skip_whitespace();
            let value = self.parse_value();
            if !value.is_ok() {
                return value;
            }
            if let JsonValue::String(key) = key {
                // The first occurrence of a duplicated key wins.
                object.entry(*key).or_insert(value);
            }
            self.skip_whitespace();
            match self.peek() {
                Some(b'}') => {
                    self.bump();
                    return JsonValue::from_object(object);
                }
                Some(b',') => {
                    self.bump();
                    self.skip_whitespace();
                    if self.peek() != Some(b'"') {
                        return ErrorCode::IllegalObject.into();
                    }
                }
                _ => return ErrorCode::IllegalObject.into(),
            }
        }
    }

    fn parse_string(&mut self) -> JsonValue {
        self.bump(); // '"'
        let mut out = String::new();

        loop {
            let Some(byte) = self.peek() else {
                return ErrorCode::IllegalString.into();
            };
            match byte {
                b'"' => {
                    self.bump();
                    return JsonValue::from(out);
                }
                b'\\' => {
                    self.bump();
                    let Some(escape) = self.peek() else {
                        return ErrorCode::IllegalString.into();
                    };
                    match escape {
                        b'"' => out.push('"'),
                        b'\\' => out.push('\\'),
                        b'/' => out.push('/'),
                        b'b' => out.push('\u{0008}'),
                        b'f' => out.push('\u{000C}'),
                        b'n' => out.push('\n'),
                        b'r' => out.push('\r'),
                        b't' => out.push('\t'),
                        b'u' => {
                            self.bump();
                            if let Some(code) = self.parse_unicode_escape(&mut out) {
                                return code.into();
                            }
                            continue;
                        }
                        _ => return ErrorCode::IllegalString.into(),
                    }
                    self.bump();
                }
                0x00..=0x1F => return ErrorCode::IllegalString.into(),
                _ => {
                    // Multi-byte UTF-8 flows through verbatim.
                    let start = self.pos;
                    while let Some(b) = self.peek() {
                        if b == b'"' || b == b'\\' || b < 0x20 {
                            break;
                        }
                        self.bump();
                    }
                    // The input is a &str, so any byte run copied whole is
                    // valid UTF-8.
                    out.push_str(unsafe {
                        std::str::from_utf8_unchecked(&self.input[start..self.pos])
                    });
                }
            }
        }
    }

    /// Decode `\uXXXX` (the `u` is already consumed) as UTF-16. A malformed
    /// surrogate is not a parse error (RFC 8259 §8.2): it turns into a
    /// single U+FFFD and parsing continues. Non-hex digits are.
    fn parse_unicode_escape(&mut self, out: &mut String) -> Option<ErrorCode> {
        let Some(first) = decode_hex(&self.input[self.pos..], 4) else {
            return Some(ErrorCode::IllegalUnicode);
        };
        self.pos += 4;

        let mut unit = first;
        loop {
            if !(0xD800..0xE000).contains(&unit) {
                push_codepoint(out, unit);
                return None;
            }
            if unit >= 0xDC00 {
                // A lone low surrogate.
                out.push(REPLACEMENT);
                return None;
            }
            // A high surrogate needs a trailing \uXXXX low surrogate.
            if self.peek() != Some(b'\\') || self.input.get(self.pos + 1) != Some(&b'u') {
                out.push(REPLACEMENT);
                return None;
            }
            let Some(second) = decode_hex(&self.input[self.pos + 2..], 4) else {
                return Some(ErrorCode::IllegalUnicode);
            };
            self.pos += 6;
            if (0xDC00..0xE000).contains(&second) {
                let codepoint = 0x10000 + ((unit - 0xD800) << 10) + (second - 0xDC00);
                push_codepoint(out, codepoint);
                return None;
            }
            // Not a low surrogate: replace the orphan and reprocess the
            // second unit on its own.
            out.push(REPLACEMENT);
            unit = second;
        }
    }

    /// Numbers: take the maximal run of number bytes, validate the RFC 8259
    /// shape, then try `i64`, `u64`, `f64` in order. Literals with a `.` or
    /// exponent go straight to `f64`.
    fn parse_number(&mut self) -> JsonValue {
        let Some(first) = self.peek() else {
            return ErrorCode::UnexpectedEof.into();
        };
        if first != b'-' && !first.is_ascii_digit() {
            return ErrorCode::UnknownCharacter.into();
        }

        let start = self.pos;
        while let Some(b) = self.peek() {
            if NUMBER_BYTES.contains(&b) {
                self.bump();
            } else {
                break;
            }
        }
        let token = &self.input[start..self.pos];
        if !valid_number_shape(token) {
            return ErrorCode::IllegalNumber.into();
        }
        // Shape-valid tokens are ASCII.
        let text = unsafe { std::str::from_utf8_unchecked(token) };

        let floating = token.iter().any(|b| matches!(b, b'.' | b'e' | b'E'));
        if !floating {
            if let Ok(i) = text.parse::<i64>() {
                return JsonValue::from(i);
            }
            if first != b'-' {
                if let Ok(u) = text.parse::<u64>() {
                    return JsonValue::from(u);
                }
            }
        }
        match text.parse::<f64>() {
            Ok(f) if f.is_finite() => JsonValue::from(f),
            _ => ErrorCode::IllegalNumber.into(),
        }
    }
}

/// `-? (0 | [1-9][0-9]*) ('.' [0-9]+)? ([eE] [+-]? [0-9]+)?`
fn valid_number_shape(token: &[u8]) -> bool {
    let mut i = 0;
    if token.first() == Some(&b'-') {
        i += 1;
    }
    match token.get(i) {
        Some(b'0') => i += 1,
        Some(b) if b.is_ascii_digit() => {
            while matches!(token.get(i), Some(b) if b.is_ascii_digit()) {
                i += 1;
            }
        }
        _ => return false,
    }
    if token.get(i) == Some(&b'.') {
        i += 1;
        if !matches!(token.get(i), Some(b) if b.is_ascii_digit()) {
            return false;
        }
        while matches!(token.get(i), Some(b) if b.is_ascii_digit()) {
            i += 1;
        }
    }
    if matches!(token.get(i), Some(b'e' | b'E')) {
        i += 1;
        if matches!(token.get(i), Some(b'+' | b'-')) {
            i += 1;
        }
        if !matches!(token.get(i), Some(b) if b.is_ascii_digit()) {
            return false;
        }
        while matches!(token.get(i), Some(b) if b.is_ascii_digit()) {
            i += 1;
        }
    }
    i == token.len()
}

#[cfg(test)]
mod tests {
    use super::*;
    use super::super::number::Number;

    fn loads(source: &str) -> JsonValue {
        Decoder::new(source).decode()
    }

    #[test]
    fn number_shapes() {
        assert!(valid_number_shape(b"0"));
        assert!(valid_number_shape(b"-0"));
        assert!(valid_number_shape(b"0.25"));
        assert!(valid_number_shape(b"10e-3"));
        assert!(!valid_number_shape(b"01"));
        assert!(!valid_number_shape(b"+1"));
        assert!(!valid_number_shape(b"1."));
        assert!(!valid_number_shape(b"1e"));
        assert!(!valid_number_shape(b".5"));
    }

    #[test]
    fn surrogate_pair_decodes() {
        let value = loads(r#""😀""#);
        assert_eq!(value.as_str(), Some("\u{1F600}"));
    }

    #[test]
    fn lone_high_surrogate_becomes_replacement() {
        let value = loads(r#""a\ud83db""#);
        assert_eq!(value.as_str(), Some("a\u{FFFD}b"));
    }

    #[test]
    fn unescaped_control_characters_are_rejected() {
        let value = loads("\"a\nb\"");
        assert_eq!(value.error(), Some(ErrorCode::IllegalString));
    }

    #[test]
    fn trailing_content_is_multi_value() {
        let value = loads("1 2");
        assert_eq!(value.error(), Some(ErrorCode::MultiValue));
    }

    #[test]
    fn number_subkind_fallback() {
        assert_eq!(
            loads("9223372036854775807").as_number(),
            Some(Number::Signed(i64::MAX))
        );
        assert_eq!(
            loads("18446744073709551615").as_number(),
            Some(Number::Unsigned(u64::MAX))
        );
        assert!(matches!(
            loads("19000000000000000001").as_number(),
            Some(Number::Float(_))
        ));
    }

    #[test]
    fn strict_payload_rejects_scalars() {
        let value = Decoder::new("42").decode_payload();
        assert_eq!(value.error(), Some(ErrorCode::ErrorPayload));
        assert!(Decoder::new("[42]").decode_payload().is_ok());
    }
}
