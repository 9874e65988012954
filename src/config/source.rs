//! Filesystem collaborator: the one environmental dependency of the parsers.

use std::io;
use std::path::Path;

/// Read a file as UTF-8 text.
pub fn read_file_contents<P: AsRef<Path>>(path: P) -> io::Result<String> {
    std::fs::read_to_string(path)
}
