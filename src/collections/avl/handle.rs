//! Detached tree nodes.
//!
//! Extraction hands the caller an owning handle over the node's storage plus
//! the allocator that produced it. Re-inserting the handle into a tree on
//! the same resource links the node back without touching the allocator.

use std::ptr::NonNull;

use super::node::Node;
use crate::alloc::{deallocate_one, Allocator};

pub struct NodeHandle<T, A: Allocator> {
    pub(super) node: NonNull<Node<T>>,
    pub(super) alloc: A,
}

impl<T, A: Allocator> NodeHandle<T, A> {
    pub(super) fn new(node: NonNull<Node<T>>, alloc: A) -> Self {
        NodeHandle { node, alloc }
    }

    pub fn value(&self) -> &T {
        unsafe { &self.node.as_ref().value }
    }

    /// Mutable access to the carried value. Changing the part of the value
    /// the comparator observes before re-insertion is allowed; the insert
    /// re-searches from the root.
    pub fn value_mut(&mut self) -> &mut T {
        unsafe { &mut self.node.as_mut().value }
    }

    pub fn allocator(&self) -> &A {
        &self.alloc
    }

    /// Consume the handle, releasing the node storage.
    pub fn into_value(self) -> T {
        let this = std::mem::ManuallyDrop::new(self);
        unsafe {
            let value = std::ptr::read(&this.node.as_ref().value);
            deallocate_one(&this.alloc, this.node);
            value
        }
    }

    /// Give up ownership of the raw node; used by re-insertion.
    pub(super) fn into_raw(self) -> (NonNull<Node<T>>, A) {
        let this = std::mem::ManuallyDrop::new(self);
        (this.node, unsafe { std::ptr::read(&this.alloc) })
    }
}

impl<T, A: Allocator> Drop for NodeHandle<T, A> {
    fn drop(&mut self) {
        unsafe {
            std::ptr::drop_in_place(&mut self.node.as_mut().value);
            deallocate_one(&self.alloc, self.node);
        }
    }
}
