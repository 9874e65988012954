//! TOML v1.0.
//!
//! [`parse`] turns a source document into a [`TomlValue`] whose root is a
//! table, or a [`TomlError`] naming the violation and its line. [`dumps`]
//! renders a value back into a document that re-parses structurally equal.

mod collector;
pub mod datetime;
mod decoder;
mod encoder;
pub mod value;

use std::io;
use std::path::Path;

pub use datetime::Datetime;
pub use decoder::{parse, TomlError, TomlErrorKind};
pub use encoder::dumps;
pub use value::{Array, Table, TomlValue};

use crate::config::source::read_file_contents;

/// Read and parse a file; I/O failures surface as `io::Error`.
pub fn load_file<P: AsRef<Path>>(path: P) -> io::Result<Result<TomlValue, TomlError>> {
    Ok(parse(&read_file_contents(path)?))
}
