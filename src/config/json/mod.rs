//! RFC 8259 JSON.
//!
//! Parsing is total: [`loads`] always returns a [`JsonValue`]; on malformed
//! input the value holds an [`ErrorCode`] and is falsy. [`dumps`] renders a
//! document that parses back structurally equal.

mod decoder;
mod encoder;
pub mod number;
pub mod value;

use std::io;
use std::path::Path;

pub use encoder::dumps;
pub use number::Number;
pub use value::{Array, ErrorCode, JsonValue, Object};

use crate::config::source::read_file_contents;

/// Parse a document from source text.
pub fn loads(source: &str) -> JsonValue {
    decoder::Decoder::new(source).decode()
}

/// Parse requiring an object or array payload at the top level.
pub fn loads_payload(source: &str) -> JsonValue {
    decoder::Decoder::new(source).decode_payload()
}

/// Read and parse a file; I/O failures surface as `io::Error`, parse
/// failures travel inside the returned value.
pub fn load_file<P: AsRef<Path>>(path: P) -> io::Result<JsonValue> {
    Ok(loads(&read_file_contents(path)?))
}
