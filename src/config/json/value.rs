//! The JSON value type.
//!
//! `JsonValue` is a tagged union over the seven JSON alternatives. Large
//! alternatives (string, array, object) are stored boxed through the
//! [`Store`](crate::config::store::Store) adapter; the accessors hide the
//! box. The last alternative carries an [`ErrorCode`]: parsing is total, a
//! failed parse simply returns a value that answers `is_ok() == false`.

use std::collections::HashMap;
use std::fmt;

use super::number::Number;
use crate::config::store::{store_boxed, Store};

pub type Array = Vec<JsonValue>;

/// Objects map strings to values with unspecified iteration order; `&str`
/// lookups go through the map's borrowed-key path.
pub type Object = HashMap<String, JsonValue>;

store_boxed!(Array, Object);

/// Parse error kinds. Each is a distinct alternative tag, so a value can
/// carry its failure in-band.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCode {
    Uninitialized,
    UnexpectedEof,
    IllegalString,
    IllegalArray,
    IllegalObject,
    IllegalNumber,
    IllegalLiteral,
    IllegalBoolean,
    IllegalUnicode,
    /// Strict mode only: the top-level payload is not an object or array.
    ErrorPayload,
    /// Trailing content after the top-level value.
    MultiValue,
    UnknownCharacter,
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let info = match self {
            ErrorCode::Uninitialized => "uninitialized",
            ErrorCode::UnexpectedEof => "unexpected end of input",
            ErrorCode::IllegalString => "illegal string",
            ErrorCode::IllegalArray => "illegal array",
            ErrorCode::IllegalObject => "illegal object",
            ErrorCode::IllegalNumber => "illegal number",
            ErrorCode::IllegalLiteral => "illegal literal",
            ErrorCode::IllegalBoolean => "illegal boolean",
            ErrorCode::IllegalUnicode => "illegal unicode escape",
            ErrorCode::ErrorPayload => "payload is not an object or array",
            ErrorCode::MultiValue => "trailing content after the value",
            ErrorCode::UnknownCharacter => "unknown character",
        };
        f.write_str(info)
    }
}

impl std::error::Error for ErrorCode {}

#[derive(Debug, PartialEq)]
pub enum JsonValue {
    Null,
    Boolean(<bool as Store>::Repr),
    Number(<Number as Store>::Repr),
    String(<String as Store>::Repr),
    Array(<Array as Store>::Repr),
    Object(<Object as Store>::Repr),
    Error(ErrorCode),
}

impl JsonValue {
    /// Position of the active alternative. Equal indices are necessary but
    /// not sufficient for value equality.
    pub fn index(&self) -> usize {
        match self {
            JsonValue::Null => 0,
            JsonValue::Boolean(_) => 1,
            JsonValue::Number(_) => 2,
            JsonValue::String(_) => 3,
            JsonValue::Array(_) => 4,
            JsonValue::Object(_) => 5,
            JsonValue::Error(_) => 6,
        }
    }

    /// A value is truthy unless it holds the error alternative.
    pub fn is_ok(&self) -> bool {
        !matches!(self, JsonValue::Error(_))
    }

    pub fn error(&self) -> Option<ErrorCode> {
        match self {
            JsonValue::Error(code) => Some(*code),
            _ => None,
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, JsonValue::Null)
    }

    pub fn is_boolean(&self) -> bool {
        matches!(self, JsonValue::Boolean(_))
    }

    pub fn is_number(&self) -> bool {
        matches!(self, JsonValue::Number(_))
    }

    pub fn is_integer(&self) -> bool {
        matches!(self, JsonValue::Number(n) if <Number as Store>::peek(n).is_integer())
    }

    pub fn is_string(&self) -> bool {
        matches!(self, JsonValue::String(_))
    }

    pub fn is_array(&self) -> bool {
        matches!(self, JsonValue::Array(_))
    }

    pub fn is_object(&self) -> bool {
        matches!(self, JsonValue::Object(_))
    }

    pub fn as_boolean(&self) -> Option<bool> {
        match self {
            JsonValue::Boolean(b) => Some(*<bool as Store>::peek(b)),
            _ => None,
        }
    }

    pub fn as_number(&self) -> Option<Number> {
        match self {
            JsonValue::Number(n) => Some(*<Number as Store>::peek(n)),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            JsonValue::String(s) => Some(<String as Store>::peek(s)),
            _ => None,
        }
    }

    pub fn as_array(&self) -> Option<&Array> {
        match self {
            JsonValue::Array(a) => Some(<Array as Store>::peek(a)),
            _ => None,
        }
    }

    pub fn as_array_mut(&mut self) -> Option<&mut Array> {
        match self {
            JsonValue::Array(a) => Some(<Array as Store>::peek_mut(a)),
            _ => None,
        }
    }

    pub fn as_object(&self) -> Option<&Object> {
        match self {
            JsonValue::Object(o) => Some(<Object as Store>::peek(o)),
            _ => None,
        }
    }

    pub fn as_object_mut(&mut self) -> Option<&mut Object> {
        match self {
            JsonValue::Object(o) => Some(<Object as Store>::peek_mut(o)),
            _ => None,
        }
    }

    /// Member lookup by key path.
    pub fn get(&self, key: &str) -> Option<&JsonValue> {
        self.as_object().and_then(|o| o.get(key))
    }

    /// Index into an array alternative.
    pub fn at(&self, index: usize) -> Option<&JsonValue> {
        self.as_array().and_then(|a| a.get(index))
    }

    /// Walk `keys` through nested objects, creating empty objects for the
    /// missing ones, and return the leaf.
    ///
    /// # Panics
    ///
    /// When a non-object value sits on the path.
    pub fn path_mut(&mut self, keys: &[&str]) -> &mut JsonValue {
        let mut target = self;
        for key in keys {
            let object = match target {
                JsonValue::Object(o) => <Object as Store>::peek_mut(o),
                _ => panic!("path walks through a non-object value"),
            };
            target = object
                .entry((*key).to_string())
                .or_insert_with(|| JsonValue::from_object(Object::new()));
        }
        target
    }

    /// Explicit deep copy; `JsonValue` itself is move-only.
    pub fn deep_clone(&self) -> JsonValue {
        match self {
            JsonValue::Null => JsonValue::Null,
            JsonValue::Boolean(b) => JsonValue::Boolean(*b),
            JsonValue::Number(n) => JsonValue::Number(*n),
            JsonValue::String(s) => JsonValue::from(<String as Store>::peek(s).clone()),
            JsonValue::Array(a) => {
                let items = <Array as Store>::peek(a).iter().map(JsonValue::deep_clone).collect();
                JsonValue::from_array(items)
            }
            JsonValue::Object(o) => {
                let entries = <Object as Store>::peek(o)
                    .iter()
                    .map(|(k, v)| (k.clone(), v.deep_clone()))
                    .collect();
                JsonValue::from_object(entries)
            }
            JsonValue::Error(code) => JsonValue::Error(*code),
        }
    }

    pub fn from_array(array: Array) -> JsonValue {
        JsonValue::Array(Store::store(array))
    }

    pub fn from_object(object: Object) -> JsonValue {
        JsonValue::Object(Store::store(object))
    }
}

impl From<bool> for JsonValue {
    fn from(value: bool) -> Self {
        JsonValue::Boolean(Store::store(value))
    }
}

impl From<Number> for JsonValue {
    fn from(value: Number) -> Self {
        JsonValue::Number(Store::store(value))
    }
}

impl From<i64> for JsonValue {
    fn from(value: i64) -> Self {
        Number::from(value).into()
    }
}

impl From<u64> for JsonValue {
    fn from(value: u64) -> Self {
        Number::from(value).into()
    }
}

impl From<f64> for JsonValue {
    fn from(value: f64) -> Self {
        Number::from(value).into()
    }
}

impl From<String> for JsonValue {
    fn from(value: String) -> Self {
        JsonValue::String(Store::store(value))
    }
}

impl From<&str> for JsonValue {
    fn from(value: &str) -> Self {
        value.to_string().into()
    }
}

impl From<ErrorCode> for JsonValue {
    fn from(code: ErrorCode) -> Self {
        JsonValue::Error(code)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_values_are_falsy() {
        let value = JsonValue::from(ErrorCode::IllegalNumber);
        assert!(!value.is_ok());
        assert_eq!(value.error(), Some(ErrorCode::IllegalNumber));
        assert!(JsonValue::Null.is_ok());
    }

    #[test]
    fn path_mut_autocreates_objects() {
        let mut root = JsonValue::from_object(Object::new());
        *root.path_mut(&["a", "b", "c"]) = JsonValue::from(1i64);
        assert_eq!(
            root.get("a").and_then(|a| a.get("b")).and_then(|b| b.get("c")),
            Some(&JsonValue::from(1i64))
        );
    }

    #[test]
    fn deep_clone_is_structural() {
        let mut root = JsonValue::from_object(Object::new());
        *root.path_mut(&["xs"]) = JsonValue::from_array(vec![
            JsonValue::from(true),
            JsonValue::from("s"),
        ]);
        let copy = root.deep_clone();
        assert_eq!(root, copy);
    }

    #[test]
    fn number_subkind_equality_carries_through() {
        assert_eq!(JsonValue::from(3i64), JsonValue::from(3u64));
        assert_ne!(JsonValue::from(3i64), JsonValue::from("3"));
    }
}
