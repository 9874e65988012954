//! Section layering state machine.
//!
//! The collector owns the growing root table and tracks where key/value
//! lines land: the root itself (`Global`), the table named by the last
//! `[section]` header (`StdTable`), or the latest element appended by a
//! `[[section]]` header (`ArrayTable`). It enforces the redefinition
//! discipline: defined tables cannot be re-declared, inline tables and
//! locked arrays cannot be extended, and dotted keys may not reopen a table
//! that a header explicitly defined.

use super::decoder::TomlErrorKind;
use super::value::{Array, Table, TomlValue};

enum Mode {
    Global,
    StdTable,
    ArrayTable,
}

pub(super) struct Collector {
    root: Table,
    section: Vec<String>,
    mode: Mode,
}

impl Collector {
    pub fn new() -> Self {
        let mut root = Table::new();
        root.define();
        Collector {
            root,
            section: Vec::new(),
            mode: Mode::Global,
        }
    }

    pub fn into_root(self) -> TomlValue {
        TomlValue::from_table(self.root)
    }

    /// `[a.b.c]`: walk/create the intermediate path, then declare the final
    /// table.
    pub fn switch_std_table(&mut self, keys: Vec<String>) -> Result<(), TomlErrorKind> {
        let (parents, last) = split_last(&keys);
        let parent = walk_path(&mut self.root, parents)?;

        if !parent.contains_key(last) {
            let mut table = Table::new();
            table.define();
            let _ = parent.try_insert(last.clone(), TomlValue::from_table(table));
        } else {
            let slot = parent.get_mut(last).expect("occupancy just checked");
            if slot.is_array() {
                // A std-table header may not name an array-of-tables.
                return Err(TomlErrorKind::Redefinition);
            }
            match slot.as_table_mut() {
                Some(table) => {
                    if table.is_inline() {
                        return Err(TomlErrorKind::ExtendInlineTable);
                    }
                    if table.is_defined() {
                        return Err(TomlErrorKind::Redefinition);
                    }
                    table.define();
                }
                None => return Err(TomlErrorKind::KeyConflict),
            }
        }

        self.section = keys;
        self.mode = Mode::StdTable;
        Ok(())
    }

    /// `[[a.b.c]]`: append a fresh table to the array-of-tables at the
    /// path, creating it on first sight.
    pub fn switch_array_table(&mut self, keys: Vec<String>) -> Result<(), TomlErrorKind> {
        let (parents, last) = split_last(&keys);
        let parent = walk_path(&mut self.root, parents)?;

        let slot = parent.entry_or_insert_with(last, || TomlValue::from_array(Array::new()));
        if slot.is_table() {
            return Err(TomlErrorKind::Redefinition);
        }
        let array = slot.as_array_mut().ok_or(TomlErrorKind::KeyConflict)?;
        if array.is_locked() {
            return Err(TomlErrorKind::ExtendLockedArray);
        }
        let mut element = Table::new();
        element.define();
        array.push(TomlValue::from_table(element));

        self.section = keys;
        self.mode = Mode::ArrayTable;
        Ok(())
    }

    /// A key/value line: dotted keys create implicit intermediate tables
    /// inside the current section target.
    pub fn add_entry(&mut self, keys: Vec<String>, value: TomlValue) -> Result<(), TomlErrorKind> {
        let target = self.current_target()?;
        insert_path(target, keys, value)
    }

    fn current_target(&mut self) -> Result<&mut Table, TomlErrorKind> {
        match self.mode {
            Mode::Global => Ok(&mut self.root),
            Mode::StdTable => {
                let table = walk_path(&mut self.root, &self.section)?;
                Ok(table)
            }
            Mode::ArrayTable => {
                let (parents, last) = split_last(&self.section);
                let parent = walk_path(&mut self.root, parents)?;
                parent
                    .get_mut(last)
                    .and_then(TomlValue::as_array_mut)
                    .and_then(Array::last_mut)
                    .and_then(TomlValue::as_table_mut)
                    .ok_or(TomlErrorKind::KeyConflict)
            }
        }
    }
}

fn split_last(keys: &[String]) -> (&[String], &String) {
    let (last, parents) = keys.split_last().expect("keys are never empty");
    (parents, last)
}

/// Descend `keys`, creating implicit tables and stepping into the last
/// element of any array-of-tables met along the way.
fn walk_path<'a>(root: &'a mut Table, keys: &[String]) -> Result<&'a mut Table, TomlErrorKind> {
    let mut current = root;
    for key in keys {
        let slot =
            Table::entry_or_insert_with(current, key, || TomlValue::from_table(Table::new()));
        current = if slot.is_table() {
            let table = slot.as_table_mut().expect("just matched a table");
            if table.is_inline() {
                return Err(TomlErrorKind::ExtendInlineTable);
            }
            table
        } else if slot.is_array() {
            let array = slot.as_array_mut().expect("just matched an array");
            if array.is_locked() {
                return Err(TomlErrorKind::ExtendLockedArray);
            }
            array
                .last_mut()
                .and_then(TomlValue::as_table_mut)
                .ok_or(TomlErrorKind::KeyConflict)?
        } else {
            return Err(TomlErrorKind::KeyConflict);
        };
    }
    Ok(current)
}

/// Place `value` at the dotted path inside `table`. Intermediates created
/// here are implicit (extendable by later sections, but a header may not
/// re-declare them as fresh); intermediates declared by a header may not be
/// reopened from a key/value line.
pub(super) fn insert_path(
    table: &mut Table,
    keys: Vec<String>,
    value: TomlValue,
) -> Result<(), TomlErrorKind> {
    let (parents, last) = split_last(&keys);

    let mut current = table;
    for key in parents {
        let slot =
            Table::entry_or_insert_with(current, key, || TomlValue::from_table(Table::new()));
        current = match slot.as_table_mut() {
            Some(sub) => {
                if sub.is_inline() {
                    return Err(TomlErrorKind::ExtendInlineTable);
                }
                if sub.is_defined() {
                    return Err(TomlErrorKind::Redefinition);
                }
                sub
            }
            None => return Err(TomlErrorKind::KeyConflict),
        };
    }

    current
        .try_insert(last.clone(), value)
        .map_err(|_| TomlErrorKind::DuplicateKey)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn keys(parts: &[&str]) -> Vec<String> {
        parts.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn array_table_then_super_table() {
        let mut collector = Collector::new();
        collector.switch_array_table(keys(&["a", "b"])).expect("[[a.b]]");
        collector
            .add_entry(keys(&["x"]), TomlValue::from(1i64))
            .expect("x = 1");
        collector.switch_std_table(keys(&["a"])).expect("[a]");
        collector
            .add_entry(keys(&["y"]), TomlValue::from(2i64))
            .expect("y = 2");

        let root = collector.into_root();
        let b = root.get("a").and_then(|a| a.get("b")).expect("a.b");
        assert!(b.is_array());
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
    fn redefining_a_defined_table_fails() {
        let mut collector = Collector::new();
        collector.switch_std_table(keys(&["t"])).expect("[t]");
        assert_eq!(
            collector.switch_std_table(keys(&["t"])),
            Err(TomlErrorKind::Redefinition)
        );
    }

    #[test]
    fn implicit_super_table_can_be_defined_later() {
        let mut collector = Collector::new();
        collector.switch_std_table(keys(&["x", "y"])).expect("[x.y]");
        collector.switch_std_table(keys(&["x"])).expect("[x] later");
        assert_eq!(
            collector.switch_std_table(keys(&["x"])),
            Err(TomlErrorKind::Redefinition)
        );
    }

    #[test]
    fn inline_table_cannot_be_extended() {
        let mut collector = Collector::new();
        collector
            .add_entry(keys(&["t"]), TomlValue::from_table(Table::inline()))
            .expect("t = {}");
        assert_eq!(
            collector.switch_std_table(keys(&["t"])),
            Err(TomlErrorKind::ExtendInlineTable)
        );
        assert_eq!(
            collector.switch_array_table(keys(&["t", "u"])),
            Err(TomlErrorKind::ExtendInlineTable)
        );
    }

    #[test]
    fn scalar_conflicts_are_detected() {
        let mut collector = Collector::new();
        collector
            .add_entry(keys(&["x"]), TomlValue::from(1i64))
            .expect("x = 1");
        assert_eq!(
            collector.switch_std_table(keys(&["x", "y"])),
            Err(TomlErrorKind::KeyConflict)
        );
        assert_eq!(
            collector.add_entry(keys(&["x"]), TomlValue::from(2i64)),
            Err(TomlErrorKind::DuplicateKey)
        );
    }

    #[test]
    fn locked_array_is_not_a_table_array_target() {
        let mut collector = Collector::new();
        collector
            .add_entry(
                keys(&["a"]),
                TomlValue::from_array(Array::locked(vec![TomlValue::from(1i64)])),
            )
            .expect("a = [1]");
        assert_eq!(
            collector.switch_array_table(keys(&["a"])),
            Err(TomlErrorKind::ExtendLockedArray)
        );
    }
}
