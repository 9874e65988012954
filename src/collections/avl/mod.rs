//! A header-sentinel AVL tree with node-handle extraction.
//!
//! The tree stores unique keys, rebalances with single/double rotations on
//! insert and erase, and iterates bidirectionally through a sentinel header
//! that makes the structure cyclic at its boundaries.

mod handle;
mod node;
mod tree;

pub use handle::NodeHandle;
pub use tree::{AvlSet, Iter};
