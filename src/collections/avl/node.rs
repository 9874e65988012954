//! Intrusive AVL node algebra.
//!
//! Nodes link through raw pointers whose lifetime is bounded by the owning
//! tree. A sentinel header with `height == -1` closes the structure into a
//! cycle: `header.parent` is the root, `header.left`/`header.right` track the
//! leftmost/rightmost nodes, so `end()` can step back to the maximum without
//! special cases.

use std::ptr;

pub(super) struct NodeBase {
    pub parent: *mut NodeBase,
    pub left: *mut NodeBase,
    pub right: *mut NodeBase,
    pub height: i32,
}

/// A value node. `repr(C)` so a `*mut NodeBase` to the first field can be
/// cast back to the full node.
#[repr(C)]
pub(super) struct Node<T> {
    pub base: NodeBase,
    pub value: T,
}

impl NodeBase {
    /// Header state for an empty tree: left/right cycle back to the header.
    pub fn reset(&mut self) {
        self.parent = ptr::null_mut();
        self.left = self as *mut NodeBase;
        self.right = self as *mut NodeBase;
        self.height = -1;
    }
}

pub(super) fn height(x: *mut NodeBase) -> i32 {
    if x.is_null() {
        0
    } else {
        unsafe { (*x).height }
    }
}

pub(super) unsafe fn minimum(mut x: *mut NodeBase) -> *mut NodeBase {
    debug_assert!(!x.is_null());
    while !(*x).left.is_null() {
        x = (*x).left;
    }
    x
}

pub(super) unsafe fn maximum(mut x: *mut NodeBase) -> *mut NodeBase {
    debug_assert!(!x.is_null());
    while !(*x).right.is_null() {
        x = (*x).right;
    }
    x
}

/// In-order successor of a value node. Stepping past the maximum lands on
/// the header (the one node whose `right` chain cycles).
pub(super) unsafe fn increment(mut x: *mut NodeBase) -> *mut NodeBase {
    debug_assert!(!x.is_null());
    if !(*x).right.is_null() {
        return minimum((*x).right);
    }
    let mut y = (*x).parent;
    while x == (*y).right {
        x = y;
        y = (*y).parent;
    }
    if (*x).right != y {
        x = y;
    }
    x
}

pub(super) unsafe fn decrement(mut x: *mut NodeBase) -> *mut NodeBase {
    debug_assert!(!x.is_null());
    if !(*x).left.is_null() {
        return maximum((*x).left);
    }
    let mut y = (*x).parent;
    while x == (*y).left {
        x = y;
        y = (*y).parent;
    }
    if (*x).left != y {
        x = y;
    }
    x
}

unsafe fn update_height(x: *mut NodeBase) {
    debug_assert!(!x.is_null());
    (*x).height = height((*x).left).max(height((*x).right)) + 1;
}

unsafe fn rotate_left(x: *mut NodeBase, header: *mut NodeBase) {
    let y = (*x).right;

    (*x).right = (*y).left;
    if !(*y).left.is_null() {
        (*(*y).left).parent = x;
    }
    (*y).parent = (*x).parent;

    // x always has a parent: the root's parent is the header.
    if x == (*header).parent {
        (*header).parent = y;
    } else if x == (*(*x).parent).left {
        (*(*x).parent).left = y;
    } else {
        (*(*x).parent).right = y;
    }
    (*y).left = x;
    (*x).parent = y;
}

unsafe fn rotate_right(x: *mut NodeBase, header: *mut NodeBase) {
    let y = (*x).left;

    (*x).left = (*y).right;
    if !(*y).right.is_null() {
        (*(*y).right).parent = x;
    }
    (*y).parent = (*x).parent;

    if x == (*header).parent {
        (*header).parent = y;
    } else if x == (*(*x).parent).right {
        (*(*x).parent).right = y;
    } else {
        (*(*x).parent).left = y;
    }
    (*y).right = x;
    (*x).parent = y;
}

/// `x` leans right by two: rotate left, with a preparatory right rotation of
/// the right child when that child leans left (double rotation).
unsafe fn fix_left(x: *mut NodeBase, header: *mut NodeBase) {
    let r = (*x).right;
    if height((*r).left) > height((*r).right) {
        rotate_right(r, header);
        update_height(r);
        update_height((*r).parent);
    }
    rotate_left(x, header);
    update_height(x);
    update_height((*x).parent);
}

unsafe fn fix_right(x: *mut NodeBase, header: *mut NodeBase) {
    let l = (*x).left;
    if height((*l).left) < height((*l).right) {
        rotate_left(l, header);
        update_height(l);
        update_height((*l).parent);
    }
    rotate_right(x, header);
    update_height(x);
    update_height((*x).parent);
}

/// Walk ancestors after an insert: stop as soon as a height is unchanged,
/// rotate when a balance factor reaches ±2.
unsafe fn rebalance_after_insert(x: *mut NodeBase, header: *mut NodeBase) {
    let mut x = (*x).parent;
    while x != header {
        let lh = height((*x).left);
        let rh = height((*x).right);
        let h = lh.max(rh) + 1;
        if (*x).height == h {
            break;
        }
        (*x).height = h;

        let diff = lh - rh;
        if diff <= -2 {
            fix_left(x, header);
        } else if diff >= 2 {
            fix_right(x, header);
        }
        x = (*x).parent;
    }
}

/// Walk ancestors after an unlink: keep going while heights change or a
/// balance factor is out of range. A rotation may shrink the subtree, so
/// the walk resumes above the rotated-up node.
unsafe fn rebalance_after_erase(mut x: *mut NodeBase, header: *mut NodeBase) {
    while x != header {
        let lh = height((*x).left);
        let rh = height((*x).right);
        let h = lh.max(rh) + 1;
        let changed = (*x).height != h;
        (*x).height = h;

        let diff = lh - rh;
        if diff <= -2 {
            fix_left(x, header);
            x = (*(*x).parent).parent;
        } else if diff >= 2 {
            fix_right(x, header);
            x = (*(*x).parent).parent;
        } else if !changed {
            break;
        } else {
            x = (*x).parent;
        }
    }
}

/// Link `x` under leaf position `p` and restore balance. `insert_left`
/// decides the side; the header's leftmost/rightmost shortcuts follow.
pub(super) unsafe fn insert_and_rebalance(
    insert_left: bool,
    x: *mut NodeBase,
    p: *mut NodeBase,
    header: *mut NodeBase,
) {
    (*x).parent = p;
    (*x).left = ptr::null_mut();
    (*x).right = ptr::null_mut();
    (*x).height = 1;

    if insert_left {
        (*p).left = x;
        if p == header {
            (*header).parent = x;
            (*header).right = x;
        } else if p == (*header).left {
            (*header).left = x;
        }
    } else {
        (*p).right = x;
        if p == (*header).right {
            (*header).right = x;
        }
    }

    rebalance_after_insert(x, header);
}

/// Unlink `x` from the tree and rebalance. The node itself is untouched and
/// still owns its value; the caller decides whether to drop or rehome it.
pub(super) unsafe fn unlink_and_rebalance(x: *mut NodeBase, header: *mut NodeBase) {
    debug_assert!(!x.is_null());

    let mut child: *mut NodeBase = ptr::null_mut();
    let parent: *mut NodeBase;

    if !(*x).left.is_null() && !(*x).right.is_null() {
        // Two children: splice the in-order successor into x's place.
        let successor = minimum((*x).right);
        child = (*successor).right;
        let mut reb = (*successor).parent;
        if !child.is_null() {
            (*child).parent = reb;
        }
        if (*(*successor).parent).left == successor {
            (*(*successor).parent).left = child;
        } else {
            (*(*successor).parent).right = child;
        }
        if (*successor).parent == x {
            reb = successor;
        }

        (*successor).left = (*x).left;
        (*successor).right = (*x).right;
        (*successor).parent = (*x).parent;
        (*successor).height = (*x).height;

        if x == (*header).parent {
            (*header).parent = successor;
        } else if (*(*x).parent).left == x {
            (*(*x).parent).left = successor;
        } else {
            (*(*x).parent).right = successor;
        }

        (*(*x).left).parent = successor;
        if !(*x).right.is_null() {
            (*(*x).right).parent = successor;
        }
        parent = reb;
    } else {
        if (*x).left.is_null() && (*x).right.is_null() {
            if x == (*header).left {
                (*header).left = (*x).parent;
            }
            if x == (*header).right {
                (*header).right = (*x).parent;
            }
        } else if !(*x).left.is_null() {
            child = (*x).left;
            if x == (*header).right {
                (*header).right = maximum(child);
            }
        } else {
            child = (*x).right;
            if x == (*header).left {
                (*header).left = minimum(child);
            }
        }

        if !child.is_null() {
            (*child).parent = (*x).parent;
        }
        if x == (*header).parent {
            (*header).parent = child;
        } else if (*(*x).parent).left == x {
            (*(*x).parent).left = child;
        } else {
            (*(*x).parent).right = child;
        }
        parent = (*x).parent;
    }

    rebalance_after_erase(parent, header);
}
