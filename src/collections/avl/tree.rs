//! The AVL tree core behind [`AvlSet`].

use std::fmt;
use std::marker::PhantomData;
use std::ptr::{self, NonNull};

use super::handle::NodeHandle;
use super::node::{self, Node, NodeBase};
use crate::alloc::{allocate_one, deallocate_one, Allocator, Global};
use crate::collections::{Compare, Natural};

/// An ordered set over a height-balanced binary tree.
///
/// Keys are unique. The comparator decides the order (and, through extra
/// [`Compare`] impls, which query types lookups accept); the allocator owns
/// every node. Iteration is in comparator order in both directions.
pub struct AvlSet<T, C = Natural, A = Global>
where
    A: Allocator,
{
    header: NonNull<NodeBase>,
    size: usize,
    cmp: C,
    alloc: A,
    _marker: PhantomData<T>,
}

unsafe impl<T: Send, C: Send, A: Allocator + Send> Send for AvlSet<T, C, A> {}
unsafe impl<T: Sync, C: Sync, A: Allocator + Sync> Sync for AvlSet<T, C, A> {}

impl<T> AvlSet<T, Natural, Global> {
    pub fn new() -> Self {
        Self::with_comparator_in(Natural, Global)
    }
}

impl<T> Default for AvlSet<T, Natural, Global> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T, C, A: Allocator> AvlSet<T, C, A> {
    pub fn with_comparator_in(cmp: C, alloc: A) -> Self {
        let header = allocate_one::<NodeBase, A>(&alloc);
        unsafe {
            (*header.as_ptr()).reset();
        }
        AvlSet {
            header,
            size: 0,
            cmp,
            alloc,
            _marker: PhantomData,
        }
    }

    pub fn len(&self) -> usize {
        self.size
    }

    pub fn is_empty(&self) -> bool {
        self.size == 0
    }

    pub fn comparator(&self) -> &C {
        &self.cmp
    }

    pub fn allocator(&self) -> &A {
        &self.alloc
    }

    fn header_ptr(&self) -> *mut NodeBase {
        self.header.as_ptr()
    }

    fn root(&self) -> *mut NodeBase {
        unsafe { (*self.header_ptr()).parent }
    }

    unsafe fn value_of<'a>(x: *mut NodeBase) -> &'a T {
        &(*(x as *mut Node<T>)).value
    }

    pub fn iter(&self) -> Iter<'_, T> {
        unsafe {
            Iter {
                next: (*self.header_ptr()).left,
                end: self.header_ptr(),
                _marker: PhantomData,
            }
        }
    }

    pub fn first(&self) -> Option<&T> {
        if self.is_empty() {
            None
        } else {
            unsafe { Some(Self::value_of((*self.header_ptr()).left)) }
        }
    }

    pub fn last(&self) -> Option<&T> {
        if self.is_empty() {
            None
        } else {
            unsafe { Some(Self::value_of((*self.header_ptr()).right)) }
        }
    }

    pub fn clear(&mut self) {
        unsafe {
            Self::drop_subtree(&self.alloc, self.root());
            (*self.header_ptr()).reset();
        }
        self.size = 0;
    }

    unsafe fn drop_subtree(alloc: &A, x: *mut NodeBase) {
        if x.is_null() {
            return;
        }
        Self::drop_subtree(alloc, (*x).left);
        Self::drop_subtree(alloc, (*x).right);
        let node = x as *mut Node<T>;
        ptr::drop_in_place(&mut (*node).value);
        deallocate_one(alloc, NonNull::new_unchecked(node));
    }

    /// Keep only the elements the predicate accepts. Unlinking never moves
    /// surviving nodes, so the in-order walk collects first and erases
    /// after.
    pub fn retain<F>(&mut self, mut keep: F)
    where
        F: FnMut(&T) -> bool,
    {
        unsafe {
            let header = self.header_ptr();
            let mut doomed = Vec::new();
            let mut x = (*header).left;
            while x != header {
                if !keep(Self::value_of(x)) {
                    doomed.push(x);
                }
                x = node::increment(x);
            }
            for x in doomed {
                node::unlink_and_rebalance(x, header);
                let n = x as *mut Node<T>;
                ptr::drop_in_place(&mut (*n).value);
                deallocate_one(&self.alloc, NonNull::new_unchecked(n));
                self.size -= 1;
            }
        }
    }

    /// Whether every node satisfies the AVL shape: stored heights are
    /// consistent and each balance factor is within ±1.
    pub fn is_height_balanced(&self) -> bool {
        unsafe fn check(x: *mut NodeBase) -> Option<i32> {
            if x.is_null() {
                return Some(0);
            }
            let lh = check((*x).left)?;
            let rh = check((*x).right)?;
            let h = lh.max(rh) + 1;
            if (*x).height == h && (lh - rh).abs() <= 1 {
                Some(h)
            } else {
                None
            }
        }
        unsafe { check(self.root()).is_some() }
    }
}

impl<T, C, A> AvlSet<T, C, A>
where
    C: Compare<T>,
    A: Allocator,
{
    pub fn insert(&mut self, value: T) -> bool {
        unsafe {
            match self.insert_position(&value) {
                Err(_existing) => false,
                Ok(parent) => {
                    let node = self.create_node(value);
                    self.link(node, parent);
                    true
                }
            }
        }
    }

    /// Insert a detached node, reusing its storage. Returns the handle when
    /// an equal key already occupies the tree. The handle's allocator must
    /// share this tree's resource.
    pub fn insert_handle(&mut self, handle: NodeHandle<T, A>) -> Option<NodeHandle<T, A>> {
        assert!(
            self.alloc.same_resource(handle.allocator()),
            "node handle from a different allocator resource"
        );
        unsafe {
            match self.insert_position(handle.value()) {
                Err(_existing) => Some(handle),
                Ok(parent) => {
                    let (node, _alloc) = handle.into_raw();
                    self.link(node.as_ptr() as *mut NodeBase, parent);
                    None
                }
            }
        }
    }

    /// Detach the node holding a key equal to `query` without dropping its
    /// value.
    pub fn extract<Q: ?Sized>(&mut self, query: &Q) -> Option<NodeHandle<T, A>>
    where
        C: Compare<T, Q>,
    {
        let x = unsafe { self.find_node(query) };
        if x.is_null() {
            return None;
        }
        unsafe {
            node::unlink_and_rebalance(x, self.header_ptr());
        }
        self.size -= 1;
        let node = unsafe { NonNull::new_unchecked(x as *mut Node<T>) };
        Some(NodeHandle::new(node, self.alloc.clone()))
    }

    pub fn remove<Q: ?Sized>(&mut self, query: &Q) -> bool
    where
        C: Compare<T, Q>,
    {
        self.take(query).is_some()
    }

    pub fn take<Q: ?Sized>(&mut self, query: &Q) -> Option<T>
    where
        C: Compare<T, Q>,
    {
        self.extract(query).map(NodeHandle::into_value)
    }

    pub fn get<Q: ?Sized>(&self, query: &Q) -> Option<&T>
    where
        C: Compare<T, Q>,
    {
        let x = unsafe { self.find_node(query) };
        if x.is_null() {
            None
        } else {
            unsafe { Some(Self::value_of(x)) }
        }
    }

    pub fn contains<Q: ?Sized>(&self, query: &Q) -> bool
    where
        C: Compare<T, Q>,
    {
        self.get(query).is_some()
    }

    pub fn count<Q: ?Sized>(&self, query: &Q) -> usize
    where
        C: Compare<T, Q>,
    {
        usize::from(self.contains(query))
    }

    /// Iterate from the first element not less than `query`.
    pub fn lower_bound<Q: ?Sized>(&self, query: &Q) -> Iter<'_, T>
    where
        C: Compare<T, Q>,
    {
        Iter {
            next: unsafe { self.lower_bound_node(query) },
            end: self.header_ptr(),
            _marker: PhantomData,
        }
    }

    /// Iterate from the first element strictly greater than `query`.
    pub fn upper_bound<Q: ?Sized>(&self, query: &Q) -> Iter<'_, T>
    where
        C: Compare<T, Q>,
    {
        Iter {
            next: unsafe { self.upper_bound_node(query) },
            end: self.header_ptr(),
            _marker: PhantomData,
        }
    }

    /// The run of elements equal to `query`: at most one, keys being unique.
    pub fn equal_range<Q: ?Sized>(&self, query: &Q) -> Iter<'_, T>
    where
        C: Compare<T, Q>,
    {
        Iter {
            next: unsafe { self.lower_bound_node(query) },
            end: unsafe { self.upper_bound_node(query) },
            _marker: PhantomData,
        }
    }

    /// Swap contents. Honors `PROPAGATE_ON_SWAP`; without propagation the
    /// two allocators must share a resource.
    pub fn swap(&mut self, other: &mut Self) {
        if A::PROPAGATE_ON_SWAP {
            std::mem::swap(self, other);
        } else {
            assert!(
                self.alloc.same_resource(&other.alloc),
                "swap without propagation requires a shared allocator resource"
            );
            std::mem::swap(&mut self.header, &mut other.header);
            std::mem::swap(&mut self.size, &mut other.size);
            std::mem::swap(&mut self.cmp, &mut other.cmp);
        }
    }

    unsafe fn lower_bound_node<Q: ?Sized>(&self, query: &Q) -> *mut NodeBase
    where
        C: Compare<T, Q>,
    {
        let mut y = self.header_ptr();
        let mut x = self.root();
        while !x.is_null() {
            if self.cmp.compare(Self::value_of(x), query).is_ge() {
                y = x;
                x = (*x).left;
            } else {
                x = (*x).right;
            }
        }
        y
    }

    unsafe fn upper_bound_node<Q: ?Sized>(&self, query: &Q) -> *mut NodeBase
    where
        C: Compare<T, Q>,
    {
        let mut y = self.header_ptr();
        let mut x = self.root();
        while !x.is_null() {
            if self.cmp.compare(Self::value_of(x), query).is_gt() {
                y = x;
                x = (*x).left;
            } else {
                x = (*x).right;
            }
        }
        y
    }

    /// Null when absent.
    unsafe fn find_node<Q: ?Sized>(&self, query: &Q) -> *mut NodeBase
    where
        C: Compare<T, Q>,
    {
        let lower = self.lower_bound_node(query);
        if lower != self.header_ptr() && self.cmp.compare(Self::value_of(lower), query).is_eq() {
            lower
        } else {
            ptr::null_mut()
        }
    }

    /// The leaf to hang a new key under, or the node already holding it.
    unsafe fn insert_position(&self, key: &T) -> Result<*mut NodeBase, *mut NodeBase> {
        let header = self.header_ptr();
        let mut y = header;
        let mut x = self.root();
        let mut went_left = true;
        while !x.is_null() {
            y = x;
            went_left = self.cmp.compare(Self::value_of(x), key).is_gt();
            x = if went_left { (*x).left } else { (*x).right };
        }

        // y is the attachment leaf; the only candidate for an equal key is
        // the in-order predecessor of the would-be position.
        let mut j = y;
        if went_left {
            if j == (*header).left || j == header {
                return Ok(y);
            }
            j = node::decrement(j);
        }
        if self.cmp.compare(Self::value_of(j), key).is_lt() {
            Ok(y)
        } else {
            Err(j)
        }
    }

    unsafe fn create_node(&self, value: T) -> *mut NodeBase {
        let node = allocate_one::<Node<T>, A>(&self.alloc);
        ptr::addr_of_mut!((*node.as_ptr()).value).write(value);
        node.as_ptr() as *mut NodeBase
    }

    unsafe fn link(&mut self, x: *mut NodeBase, p: *mut NodeBase) {
        let header = self.header_ptr();
        let insert_left =
            p == header || self.cmp.compare(Self::value_of(p), Self::value_of(x)).is_gt();
        node::insert_and_rebalance(insert_left, x, p, header);
        self.size += 1;
    }
}

impl<T, C, A> AvlSet<T, C, A>
where
    T: Clone,
    C: Compare<T> + Clone,
    A: Allocator,
{
    /// Structure-preserving deep copy into `alloc`.
    fn clone_into(&self, alloc: A) -> Self {
        let mut copy = Self::with_comparator_in(self.cmp.clone(), alloc);
        unsafe {
            let header = copy.header_ptr();
            let root = Self::clone_subtree(&copy.alloc, self.root(), header);
            (*header).parent = root;
            if !root.is_null() {
                (*header).left = node::minimum(root);
                (*header).right = node::maximum(root);
            }
        }
        copy.size = self.size;
        copy
    }

    unsafe fn clone_subtree(alloc: &A, src: *mut NodeBase, parent: *mut NodeBase) -> *mut NodeBase {
        if src.is_null() {
            return ptr::null_mut();
        }
        let node = allocate_one::<Node<T>, A>(alloc).as_ptr();
        ptr::addr_of_mut!((*node).value).write(Self::value_of(src).clone());
        (*node).base.parent = parent;
        (*node).base.height = (*src).height;
        let base = node as *mut NodeBase;
        (*node).base.left = Self::clone_subtree(alloc, (*src).left, base);
        (*node).base.right = Self::clone_subtree(alloc, (*src).right, base);
        base
    }
}

impl<T, C, A> Clone for AvlSet<T, C, A>
where
    T: Clone,
    C: Compare<T> + Clone,
    A: Allocator,
{
    fn clone(&self) -> Self {
        self.clone_into(self.alloc.clone())
    }

    /// Copy-assignment path: consults `PROPAGATE_ON_CLONE_FROM` explicitly.
    /// Without propagation the destination keeps its allocator and rebuilds
    /// element-wise through it.
    fn clone_from(&mut self, source: &Self) {
        self.clear();
        if A::PROPAGATE_ON_CLONE_FROM && !self.alloc.same_resource(&source.alloc) {
            // The header must return to the resource that produced it
            // before the allocator is replaced.
            unsafe {
                deallocate_one(&self.alloc, self.header);
            }
            self.alloc = source.alloc.clone();
            self.header = allocate_one::<NodeBase, A>(&self.alloc);
            unsafe {
                (*self.header.as_ptr()).reset();
            }
        } else if A::PROPAGATE_ON_CLONE_FROM {
            self.alloc = source.alloc.clone();
        }
        self.cmp = source.cmp.clone();
        unsafe {
            let header = self.header_ptr();
            let root = Self::clone_subtree(&self.alloc, source.root(), header);
            (*header).parent = root;
            if !root.is_null() {
                (*header).left = node::minimum(root);
                (*header).right = node::maximum(root);
            }
        }
        self.size = source.size;
    }
}

impl<T, C, A: Allocator> Drop for AvlSet<T, C, A> {
    fn drop(&mut self) {
        self.clear();
        unsafe {
            deallocate_one(&self.alloc, self.header);
        }
    }
}

impl<T, C, A> Extend<T> for AvlSet<T, C, A>
where
    C: Compare<T>,
    A: Allocator,
{
    fn extend<I: IntoIterator<Item = T>>(&mut self, iter: I) {
        for value in iter {
            self.insert(value);
        }
    }
}

impl<T: Ord> FromIterator<T> for AvlSet<T> {
    fn from_iter<I: IntoIterator<Item = T>>(iter: I) -> Self {
        let mut set = AvlSet::new();
        set.extend(iter);
        set
    }
}

impl<'a, T, C, A: Allocator> IntoIterator for &'a AvlSet<T, C, A> {
    type Item = &'a T;
    type IntoIter = Iter<'a, T>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

impl<T: fmt::Debug, C, A: Allocator> fmt::Debug for AvlSet<T, C, A> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_set().entries(self.iter()).finish()
    }
}

impl<T, C, A> PartialEq for AvlSet<T, C, A>
where
    T: PartialEq,
    A: Allocator,
{
    fn eq(&self, other: &Self) -> bool {
        self.size == other.size && self.iter().eq(other.iter())
    }
}

/// Bidirectional in-order iterator. `next` is the next node to yield going
/// forward; `end` is the exclusive bound (the header for full iteration).
pub struct Iter<'a, T> {
    pub(super) next: *mut NodeBase,
    pub(super) end: *mut NodeBase,
    pub(super) _marker: PhantomData<&'a T>,
}

impl<'a, T> Iterator for Iter<'a, T> {
    type Item = &'a T;

    fn next(&mut self) -> Option<&'a T> {
        if self.next == self.end {
            return None;
        }
        unsafe {
            let value = &(*(self.next as *mut Node<T>)).value;
            self.next = node::increment(self.next);
            Some(value)
        }
    }
}

impl<'a, T> DoubleEndedIterator for Iter<'a, T> {
    fn next_back(&mut self) -> Option<&'a T> {
        if self.next == self.end {
            return None;
        }
        unsafe {
            // Stepping back from the header wraps to the rightmost node.
            self.end = if (*self.end).height == -1 {
                (*self.end).right
            } else {
                node::decrement(self.end)
            };
            Some(&(*(self.end as *mut Node<T>)).value)
        }
    }
}

impl<T> Clone for Iter<'_, T> {
    fn clone(&self) -> Self {
        Iter {
            next: self.next,
            end: self.end,
            _marker: PhantomData,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn insert_keeps_order_and_balance() {
        let mut set = AvlSet::new();
        for k in [5, 3, 8, 1, 4, 7, 9, 6] {
            assert!(set.insert(k));
            assert!(set.is_height_balanced());
        }
        assert!(!set.insert(5));
        assert_eq!(set.len(), 8);
        let inorder: Vec<_> = set.iter().copied().collect();
        assert_eq!(inorder, [1, 3, 4, 5, 6, 7, 8, 9]);
    }

    #[test]
    fn erase_two_child_node_uses_successor() {
        let mut set: AvlSet<i32> = [5, 3, 8, 1, 4, 7, 9, 6].into_iter().collect();
        assert!(set.remove(&5));
        let inorder: Vec<_> = set.iter().copied().collect();
        assert_eq!(inorder, [1, 3, 4, 6, 7, 8, 9]);
        assert!(set.is_height_balanced());
    }

    #[test]
    fn reverse_iteration_wraps_from_the_header() {
        let set: AvlSet<i32> = (0..10).collect();
        let reversed: Vec<_> = set.iter().rev().copied().collect();
        assert_eq!(reversed, (0..10).rev().collect::<Vec<_>>());
    }

    #[test]
    fn bounds_and_equal_range() {
        let set: AvlSet<i32> = [10, 20, 30].into_iter().collect();
        assert_eq!(set.lower_bound(&15).next(), Some(&20));
        assert_eq!(set.lower_bound(&20).next(), Some(&20));
        assert_eq!(set.upper_bound(&20).next(), Some(&30));
        assert_eq!(set.upper_bound(&30).next(), None);
        assert_eq!(set.equal_range(&20).count(), 1);
        assert_eq!(set.equal_range(&15).count(), 0);
    }

    #[test]
    fn transparent_lookup_with_str_queries() {
        let mut set: AvlSet<String> = AvlSet::new();
        set.insert("apple".to_string());
        set.insert("pear".to_string());
        assert!(set.contains("apple"));
        assert!(!set.contains("plum"));
        assert!(set.remove("pear"));
        assert_eq!(set.len(), 1);
    }

    #[test]
    fn extract_and_reinsert_round_trips() {
        let mut set: AvlSet<i32> = (0..16).collect();
        let handle = set.extract(&7).expect("7 is present");
        assert_eq!(*handle.value(), 7);
        assert_eq!(set.len(), 15);
        assert!(!set.contains(&7));
        assert!(set.insert_handle(handle).is_none());
        assert_eq!(set.len(), 16);
        assert!(set.contains(&7));
        assert!(set.is_height_balanced());
    }

    #[test]
    fn insert_handle_with_duplicate_returns_it() {
        let mut set: AvlSet<i32> = (0..4).collect();
        let handle = set.extract(&2).expect("2 is present");
        set.insert(2);
        let rejected = set.insert_handle(handle).expect("key already present");
        assert_eq!(rejected.into_value(), 2);
    }

    #[test]
    fn clone_is_deep_and_balanced() {
        let set: AvlSet<i32> = (0..100).collect();
        let copy = set.clone();
        assert_eq!(set, copy);
        assert!(copy.is_height_balanced());
    }

    #[test]
    fn clone_from_rebuilds() {
        let source: AvlSet<i32> = (0..10).collect();
        let mut dest: AvlSet<i32> = (100..105).collect();
        dest.clone_from(&source);
        assert_eq!(dest, source);
    }

    #[test]
    fn retain_erases_a_range() {
        let mut set: AvlSet<i32> = (0..32).collect();
        set.retain(|&k| !(8..24).contains(&k));
        let contents: Vec<_> = set.iter().copied().collect();
        assert_eq!(contents, (0..8).chain(24..32).collect::<Vec<_>>());
        assert!(set.is_height_balanced());
        assert_eq!(set.len(), 16);
    }

    #[test]
    fn first_and_last_follow_the_sentinel_shortcuts() {
        let mut set: AvlSet<i32> = [4, 2, 9].into_iter().collect();
        assert_eq!(set.first(), Some(&2));
        assert_eq!(set.last(), Some(&9));
        set.remove(&9);
        assert_eq!(set.last(), Some(&4));
        set.clear();
        assert_eq!(set.first(), None);
    }
}
