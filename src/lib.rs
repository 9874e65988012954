//! coffer: allocator-aware containers and a configuration value model.
//!
//! The crate has two halves that share a design vocabulary:
//!
//! - [`collections`]: containers parameterized over a comparator (or
//!   hasher) and an [`alloc::Allocator`] with explicit propagation
//!   capabilities. A header-sentinel AVL tree with node-handle extraction,
//!   a probabilistic skip list, a "trucked" sorted list, an
//!   open-addressing hash table with an indirect index slab, and the raw
//!   growable buffer the others build on.
//! - [`config`]: a tagged-union value model that transparently boxes
//!   large alternatives, with an RFC 8259 JSON parser, a TOML v1.0 parser,
//!   and structural conversion between the two.
//!
//! ```rust
//! use coffer::collections::avl::AvlSet;
//! use coffer::config::{json, toml};
//!
//! let mut set: AvlSet<i32> = (0..8).collect();
//! set.remove(&3);
//! assert!(set.iter().copied().eq([0, 1, 2, 4, 5, 6, 7]));
//!
//! let doc = json::loads(r#"{"port": 8080}"#);
//! assert!(doc.is_ok());
//!
//! let table = toml::parse("x = 1\n").expect("valid document");
//! assert_eq!(table.get("x").and_then(|v| v.as_integer()), Some(1));
//! ```

pub mod alloc;
pub mod collections;
pub mod config;

pub use alloc::{AllocError, Allocator, Global};
pub use collections::avl::AvlSet;
pub use collections::buffer::RawBuffer;
pub use collections::hash_table::{HashMap, HashSet};
pub use collections::skip_list::SkipSet;
pub use collections::sorted_list::SortedSet;
pub use collections::{Compare, Natural};
pub use config::json::JsonValue;
pub use config::toml::TomlValue;
