//! The TOML value type.
//!
//! Arrays and tables carry the bookkeeping the format's layering discipline
//! needs: an array is *locked* when it came from inline `[...]` syntax (a
//! fixed array, never an array-of-tables target); a table is *inline* when
//! it came from `{...}` (frozen after construction) and *defined* once an
//! explicit `[section]` or `[[section]]` header names it. Structural
//! equality ignores the flags.

use std::collections::HashMap;
use std::fmt;

use super::datetime::Datetime;
use crate::config::store::{store_boxed, Store};

#[derive(Debug, Default)]
pub struct Array {
    items: Vec<TomlValue>,
    locked: bool,
}

impl Array {
    /// A growable array-of-tables target.
    pub fn new() -> Self {
        Array {
            items: Vec::new(),
            locked: false,
        }
    }

    /// A fixed inline array.
    pub fn locked(items: Vec<TomlValue>) -> Self {
        Array {
            items,
            locked: true,
        }
    }

    pub fn is_locked(&self) -> bool {
        self.locked
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&TomlValue> {
        self.items.get(index)
    }

    pub fn last_mut(&mut self) -> Option<&mut TomlValue> {
        self.items.last_mut()
    }

    pub fn push(&mut self, value: TomlValue) {
        self.items.push(value);
    }

    pub fn iter(&self) -> std::slice::Iter<'_, TomlValue> {
        self.items.iter()
    }

    pub fn as_slice(&self) -> &[TomlValue] {
        &self.items
    }
}

impl PartialEq for Array {
    fn eq(&self, other: &Self) -> bool {
        self.items == other.items
    }
}

impl<'a> IntoIterator for &'a Array {
    type Item = &'a TomlValue;
    type IntoIter = std::slice::Iter<'a, TomlValue>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

#[derive(Debug, Default)]
pub struct Table {
    entries: HashMap<String, TomlValue>,
    inline: bool,
    defined: bool,
}

impl Table {
    pub fn new() -> Self {
        Table::default()
    }

    pub fn inline() -> Self {
        Table {
            entries: HashMap::new(),
            inline: true,
            defined: true,
        }
    }

    pub fn is_inline(&self) -> bool {
        self.inline
    }

    /// Whether an explicit `[section]`/`[[section]]` header named this
    /// table, as opposed to creation through a dotted key or super-path.
    pub fn is_defined(&self) -> bool {
        self.defined
    }

    pub fn define(&mut self) {
        self.defined = true;
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.entries.contains_key(key)
    }

    pub fn get(&self, key: &str) -> Option<&TomlValue> {
        self.entries.get(key)
    }

    pub fn get_mut(&mut self, key: &str) -> Option<&mut TomlValue> {
        self.entries.get_mut(key)
    }

    /// Insert a fresh key; an occupied key rejects the value.
    pub fn try_insert(&mut self, key: String, value: TomlValue) -> Result<(), TomlValue> {
        match self.entries.entry(key) {
            std::collections::hash_map::Entry::Occupied(_) => Err(value),
            std::collections::hash_map::Entry::Vacant(slot) => {
                slot.insert(value);
                Ok(())
            }
        }
    }

    /// Fetch `key`, inserting `make()` when absent.
    pub fn entry_or_insert_with<F>(&mut self, key: &str, make: F) -> &mut TomlValue
    where
        F: FnOnce() -> TomlValue,
    {
        self.entries
            .entry(key.to_string())
            .or_insert_with(make)
    }

    pub fn iter(&self) -> std::collections::hash_map::Iter<'_, String, TomlValue> {
        self.entries.iter()
    }

    pub fn keys(&self) -> impl Iterator<Item = &String> {
        self.entries.keys()
    }
}

impl PartialEq for Table {
    fn eq(&self, other: &Self) -> bool {
        self.entries == other.entries
    }
}

impl<'a> IntoIterator for &'a Table {
    type Item = (&'a String, &'a TomlValue);
    type IntoIter = std::collections::hash_map::Iter<'a, String, TomlValue>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

store_boxed!(Array, Table, Datetime);

#[derive(Debug, PartialEq)]
pub enum TomlValue {
    Boolean(<bool as Store>::Repr),
    Integer(<i64 as Store>::Repr),
    Float(<f64 as Store>::Repr),
    String(<String as Store>::Repr),
    Datetime(<Datetime as Store>::Repr),
    Array(<Array as Store>::Repr),
    Table(<Table as Store>::Repr),
}

impl TomlValue {
    pub fn index(&self) -> usize {
        match self {
            TomlValue::Boolean(_) => 0,
            TomlValue::Integer(_) => 1,
            TomlValue::Float(_) => 2,
            TomlValue::String(_) => 3,
            TomlValue::Datetime(_) => 4,
            TomlValue::Array(_) => 5,
            TomlValue::Table(_) => 6,
        }
    }

    pub fn is_boolean(&self) -> bool {
        matches!(self, TomlValue::Boolean(_))
    }

    pub fn is_integer(&self) -> bool {
        matches!(self, TomlValue::Integer(_))
    }

    pub fn is_float(&self) -> bool {
        matches!(self, TomlValue::Float(_))
    }

    pub fn is_string(&self) -> bool {
        matches!(self, TomlValue::String(_))
    }

    pub fn is_datetime(&self) -> bool {
        matches!(self, TomlValue::Datetime(_))
    }

    pub fn is_array(&self) -> bool {
        matches!(self, TomlValue::Array(_))
    }

    pub fn is_table(&self) -> bool {
        matches!(self, TomlValue::Table(_))
    }

    pub fn as_boolean(&self) -> Option<bool> {
        match self {
            TomlValue::Boolean(b) => Some(*<bool as Store>::peek(b)),
            _ => None,
        }
    }

    pub fn as_integer(&self) -> Option<i64> {
        match self {
            TomlValue::Integer(i) => Some(*<i64 as Store>::peek(i)),
            _ => None,
        }
    }

    pub fn as_float(&self) -> Option<f64> {
        match self {
            TomlValue::Float(f) => Some(*<f64 as Store>::peek(f)),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            TomlValue::String(s) => Some(<String as Store>::peek(s)),
            _ => None,
        }
    }

    pub fn as_datetime(&self) -> Option<&Datetime> {
        match self {
            TomlValue::Datetime(dt) => Some(<Datetime as Store>::peek(dt)),
            _ => None,
        }
    }

    pub fn as_array(&self) -> Option<&Array> {
        match self {
            TomlValue::Array(a) => Some(<Array as Store>::peek(a)),
            _ => None,
        }
    }

    pub fn as_array_mut(&mut self) -> Option<&mut Array> {
        match self {
            TomlValue::Array(a) => Some(<Array as Store>::peek_mut(a)),
            _ => None,
        }
    }

    pub fn as_table(&self) -> Option<&Table> {
        match self {
            TomlValue::Table(t) => Some(<Table as Store>::peek(t)),
            _ => None,
        }
    }

    pub fn as_table_mut(&mut self) -> Option<&mut Table> {
        match self {
            TomlValue::Table(t) => Some(<Table as Store>::peek_mut(t)),
            _ => None,
        }
    }

    /// Member lookup by key, for table alternatives.
    pub fn get(&self, key: &str) -> Option<&TomlValue> {
        self.as_table().and_then(|t| t.get(key))
    }

    /// Index into an array alternative.
    pub fn at(&self, index: usize) -> Option<&TomlValue> {
        self.as_array().and_then(|a| a.get(index))
    }

    pub fn from_array(array: Array) -> TomlValue {
        TomlValue::Array(Store::store(array))
    }

    pub fn from_table(table: Table) -> TomlValue {
        TomlValue::Table(Store::store(table))
    }

    /// Explicit deep copy; `TomlValue` itself is move-only.
    pub fn deep_clone(&self) -> TomlValue {
        match self {
            TomlValue::Boolean(b) => TomlValue::Boolean(*b),
            TomlValue::Integer(i) => TomlValue::Integer(*i),
            TomlValue::Float(f) => TomlValue::Float(*f),
            TomlValue::String(s) => TomlValue::from(<String as Store>::peek(s).clone()),
            TomlValue::Datetime(dt) => TomlValue::from(*<Datetime as Store>::peek(dt)),
            TomlValue::Array(a) => {
                let src = <Array as Store>::peek(a);
                let mut items = Vec::with_capacity(src.len());
                items.extend(src.iter().map(TomlValue::deep_clone));
                TomlValue::from_array(Array {
                    items,
                    locked: src.locked,
                })
            }
            TomlValue::Table(t) => {
                let src = <Table as Store>::peek(t);
                let mut copy = Table {
                    entries: HashMap::with_capacity(src.len()),
                    inline: src.inline,
                    defined: src.defined,
                };
                for (k, v) in src.iter() {
                    copy.entries.insert(k.clone(), v.deep_clone());
                }
                TomlValue::from_table(copy)
            }
        }
    }
}

impl From<bool> for TomlValue {
    fn from(value: bool) -> Self {
        TomlValue::Boolean(Store::store(value))
    }
}

impl From<i64> for TomlValue {
    fn from(value: i64) -> Self {
        TomlValue::Integer(Store::store(value))
    }
}

impl From<f64> for TomlValue {
    fn from(value: f64) -> Self {
        TomlValue::Float(Store::store(value))
    }
}

impl From<String> for TomlValue {
    fn from(value: String) -> Self {
        TomlValue::String(Store::store(value))
    }
}

impl From<&str> for TomlValue {
    fn from(value: &str) -> Self {
        value.to_string().into()
    }
}

impl From<Datetime> for TomlValue {
    fn from(value: Datetime) -> Self {
        TomlValue::Datetime(Store::store(value))
    }
}

impl fmt::Display for TomlValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&super::encoder::render_inline(self))
    }
}
