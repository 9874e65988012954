//! A probabilistic skip list over unique keys.
//!
//! Each node carries a forward array whose length is drawn at insertion:
//! starting at one, the level steps up while a uniform draw lands below
//! `1/ratio`, clamped to `max_level`. The bottom level doubles as a cyclic
//! doubly-linked list through a header of maximal level, so iteration needs
//! no special end handling. The random source is injected at construction,
//! which keeps tests deterministic.

use std::alloc::{handle_alloc_error, Layout};
use std::fmt;
use std::marker::PhantomData;
use std::mem::MaybeUninit;
use std::ptr::{self, NonNull};

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::alloc::{Allocator, Global};
use crate::collections::{Compare, Natural};

pub const DEFAULT_MAX_LEVEL: usize = 24;
pub const DEFAULT_RATIO: u32 = 4;

struct SkipNode<T> {
    value: MaybeUninit<T>,
    level: usize,
    prev: *mut SkipNode<T>,
    // `level` forward pointers trail the node in the same allocation.
}

fn node_layout<T>(level: usize) -> (Layout, usize) {
    let head = Layout::new::<SkipNode<T>>();
    let links = Layout::array::<*mut SkipNode<T>>(level).expect("level is small");
    let (layout, offset) = head.extend(links).expect("node layout fits");
    (layout.pad_to_align(), offset)
}

unsafe fn forward_slot<T>(node: *mut SkipNode<T>, i: usize) -> *mut *mut SkipNode<T> {
    debug_assert!(i < (*node).level);
    let (_, offset) = node_layout::<T>(0);
    (node.cast::<u8>().add(offset) as *mut *mut SkipNode<T>).add(i)
}

unsafe fn forward<T>(node: *mut SkipNode<T>, i: usize) -> *mut SkipNode<T> {
    *forward_slot(node, i)
}

pub struct SkipSet<T, C = Natural, R = StdRng, A = Global>
where
    A: Allocator,
{
    header: NonNull<SkipNode<T>>,
    size: usize,
    level: usize,
    max_level: usize,
    ratio: u32,
    cmp: C,
    rng: R,
    alloc: A,
    _marker: PhantomData<T>,
}

unsafe impl<T: Send, C: Send, R: Send, A: Allocator + Send> Send for SkipSet<T, C, R, A> {}
unsafe impl<T: Sync, C: Sync, R: Sync, A: Allocator + Sync> Sync for SkipSet<T, C, R, A> {}

impl<T> SkipSet<T, Natural, StdRng, Global> {
    pub fn new() -> Self {
        Self::with_config_in(
            Natural,
            DEFAULT_MAX_LEVEL,
            DEFAULT_RATIO,
            StdRng::from_entropy(),
            Global,
        )
    }
}

impl<T> Default for SkipSet<T, Natural, StdRng, Global> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T, R: Rng> SkipSet<T, Natural, R, Global> {
    /// A set with the default shape but a caller-supplied random source.
    pub fn with_rng(rng: R) -> Self {
        Self::with_config_in(Natural, DEFAULT_MAX_LEVEL, DEFAULT_RATIO, rng, Global)
    }
}

impl<T, C, R, A> SkipSet<T, C, R, A>
where
    R: Rng,
    A: Allocator,
{
    pub fn with_config_in(cmp: C, max_level: usize, ratio: u32, rng: R, alloc: A) -> Self {
        assert!(max_level >= 1, "max_level must be at least 1");
        assert!(ratio >= 2, "ratio must be at least 2");
        let header = Self::allocate_node(&alloc, max_level);
        unsafe {
            (*header.as_ptr()).prev = header.as_ptr();
            for i in 0..max_level {
                *forward_slot(header.as_ptr(), i) = header.as_ptr();
            }
        }
        SkipSet {
            header,
            size: 0,
            level: 1,
            max_level,
            ratio,
            cmp,
            rng,
            alloc,
            _marker: PhantomData,
        }
    }

    fn random_level(&mut self) -> usize {
        let threshold = u32::MAX / self.ratio;
        let mut level = 1;
        while level < self.max_level && self.rng.gen::<u32>() < threshold {
            level += 1;
        }
        level
    }
}

impl<T, C, R, A> SkipSet<T, C, R, A>
where
    A: Allocator,
{
    fn allocate_node(alloc: &A, level: usize) -> NonNull<SkipNode<T>> {
        let (layout, _) = node_layout::<T>(level);
        let ptr = match alloc.allocate(layout) {
            Ok(ptr) => ptr.cast::<SkipNode<T>>(),
            Err(_) => handle_alloc_error(layout),
        };
        unsafe {
            ptr::addr_of_mut!((*ptr.as_ptr()).level).write(level);
        }
        ptr
    }

    unsafe fn free_node(alloc: &A, node: *mut SkipNode<T>) {
        let (layout, _) = node_layout::<T>((*node).level);
        alloc.deallocate(NonNull::new_unchecked(node.cast()), layout);
    }

    pub fn len(&self) -> usize {
        self.size
    }

    pub fn is_empty(&self) -> bool {
        self.size == 0
    }

    /// Number of levels currently in use.
    pub fn current_level(&self) -> usize {
        self.level
    }

    pub fn max_level(&self) -> usize {
        self.max_level
    }

    fn header_ptr(&self) -> *mut SkipNode<T> {
        self.header.as_ptr()
    }

    unsafe fn value_of<'a>(node: *mut SkipNode<T>) -> &'a T {
        (*node).value.assume_init_ref()
    }

    pub fn iter(&self) -> Iter<'_, T> {
        Iter {
            next: unsafe { forward(self.header_ptr(), 0) },
            end: self.header_ptr(),
            _marker: PhantomData,
        }
    }

    pub fn first(&self) -> Option<&T> {
        if self.is_empty() {
            None
        } else {
            unsafe { Some(Self::value_of(forward(self.header_ptr(), 0))) }
        }
    }

    pub fn last(&self) -> Option<&T> {
        if self.is_empty() {
            None
        } else {
            unsafe { Some(Self::value_of((*self.header_ptr()).prev)) }
        }
    }

    pub fn clear(&mut self) {
        unsafe {
            let header = self.header_ptr();
            let mut node = forward(header, 0);
            while node != header {
                let next = forward(node, 0);
                ptr::drop_in_place((*node).value.as_mut_ptr());
                Self::free_node(&self.alloc, node);
                node = next;
            }
            (*header).prev = header;
            for i in 0..self.max_level {
                *forward_slot(header, i) = header;
            }
        }
        self.level = 1;
        self.size = 0;
    }

    /// Keys present at `level`, in order. Level 0 is the full key set; each
    /// higher level must be a subsequence of the one below.
    pub fn keys_at_level(&self, level: usize) -> Vec<&T> {
        assert!(level < self.max_level);
        let mut keys = Vec::new();
        unsafe {
            let header = self.header_ptr();
            let mut node = forward(header, level);
            while node != header {
                keys.push(Self::value_of(node));
                node = forward(node, level);
            }
        }
        keys
    }
}

impl<T, C, R, A> SkipSet<T, C, R, A>
where
    C: Compare<T>,
    R: Rng,
    A: Allocator,
{
    pub fn insert(&mut self, value: T) -> bool {
        let mut prev = vec![self.header_ptr(); self.max_level];
        unsafe {
            let (before, exists) = self.find_with_prev(&value, &mut prev);
            if exists {
                return false;
            }

            // Allocation happens before any pointer is rewired; a failure
            // here leaves the list untouched.
            let level = self.random_level();
            let node = Self::allocate_node(&self.alloc, level).as_ptr();
            ptr::addr_of_mut!((*node).value).write(MaybeUninit::new(value));

            let header = self.header_ptr();
            (*node).prev = before;
            for i in 0..level {
                *forward_slot(node, i) = header;
            }
            (*forward(before, 0)).prev = node;
            for (i, &p) in prev.iter().enumerate().take(level) {
                if i >= self.level {
                    *forward_slot(header, i) = node;
                } else {
                    *forward_slot(node, i) = forward(p, i);
                    *forward_slot(p, i) = node;
                }
            }
            self.level = self.level.max(level);
        }
        self.size += 1;
        true
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
        let mut prev = vec![self.header_ptr(); self.max_level];
        unsafe {
            let (before, exists) = self.find_with_prev(query, &mut prev);
            if !exists {
                return None;
            }
            let target = forward(before, 0);
            (*forward(target, 0)).prev = before;
            for (i, &p) in prev.iter().enumerate().take((*target).level) {
                *forward_slot(p, i) = forward(target, i);
            }
            let header = self.header_ptr();
            while self.level > 1 && forward(header, self.level - 1) == header {
                self.level -= 1;
            }
            let value = (*target).value.assume_init_read();
            Self::free_node(&self.alloc, target);
            self.size -= 1;
            Some(value)
        }
    }

    pub fn get<Q: ?Sized>(&self, query: &Q) -> Option<&T>
    where
        C: Compare<T, Q>,
    {
        let node = unsafe { self.find_node(query) };
        node.map(|n| unsafe { Self::value_of(n) })
    }

    pub fn contains<Q: ?Sized>(&self, query: &Q) -> bool
    where
        C: Compare<T, Q>,
    {
        self.get(query).is_some()
    }

    /// Iterate from the first element not less than `query`.
    pub fn lower_bound<Q: ?Sized>(&self, query: &Q) -> Iter<'_, T>
    where
        C: Compare<T, Q>,
    {
        let before = unsafe { self.predecessor(query) };
        Iter {
            next: unsafe { forward(before, 0) },
            end: self.header_ptr(),
            _marker: PhantomData,
        }
    }

    /// The strict predecessor position of `query` at level 0.
    unsafe fn predecessor<Q: ?Sized>(&self, query: &Q) -> *mut SkipNode<T>
    where
        C: Compare<T, Q>,
    {
        let header = self.header_ptr();
        let mut cur = header;
        for i in (0..self.level).rev() {
            loop {
                let next = forward(cur, i);
                if next != header && self.cmp.compare(Self::value_of(next), query).is_lt() {
                    cur = next;
                } else {
                    break;
                }
            }
        }
        cur
    }

    unsafe fn find_node<Q: ?Sized>(&self, query: &Q) -> Option<*mut SkipNode<T>>
    where
        C: Compare<T, Q>,
    {
        let header = self.header_ptr();
        let candidate = forward(self.predecessor(query), 0);
        if candidate != header && self.cmp.compare(Self::value_of(candidate), query).is_eq() {
            Some(candidate)
        } else {
            None
        }
    }

    /// Descend remembering the predecessor at every live level; reports
    /// whether the key already exists after the level-0 predecessor.
    unsafe fn find_with_prev<Q: ?Sized>(
        &self,
        query: &Q,
        prev: &mut [*mut SkipNode<T>],
    ) -> (*mut SkipNode<T>, bool)
    where
        C: Compare<T, Q>,
    {
        let header = self.header_ptr();
        let mut cur = header;
        for i in (0..self.level).rev() {
            loop {
                let next = forward(cur, i);
                if next != header && self.cmp.compare(Self::value_of(next), query).is_lt() {
                    cur = next;
                } else {
                    break;
                }
            }
            prev[i] = cur;
        }
        let candidate = forward(cur, 0);
        let exists =
            candidate != header && self.cmp.compare(Self::value_of(candidate), query).is_eq();
        (cur, exists)
    }
}

impl<T, C, R, A> Clone for SkipSet<T, C, R, A>
where
    T: Clone,
    C: Compare<T> + Clone,
    R: Rng + Clone,
    A: Allocator,
{
    fn clone(&self) -> Self {
        let mut copy = Self::with_config_in(
            self.cmp.clone(),
            self.max_level,
            self.ratio,
            self.rng.clone(),
            self.alloc.clone(),
        );
        for value in self.iter() {
            copy.insert(value.clone());
        }
        copy
    }
}

impl<T, C, R, A: Allocator> Drop for SkipSet<T, C, R, A> {
    fn drop(&mut self) {
        self.clear();
        unsafe {
            Self::free_node(&self.alloc, self.header_ptr());
        }
    }
}

impl<'a, T, C, R, A: Allocator> IntoIterator for &'a SkipSet<T, C, R, A> {
    type Item = &'a T;
    type IntoIter = Iter<'a, T>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

impl<T: fmt::Debug, C, R, A: Allocator> fmt::Debug for SkipSet<T, C, R, A> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_set().entries(self.iter()).finish()
    }
}

/// Bidirectional iterator over the cyclic bottom level.
pub struct Iter<'a, T> {
    next: *mut SkipNode<T>,
    end: *mut SkipNode<T>,
    _marker: PhantomData<&'a T>,
}

impl<'a, T> Iterator for Iter<'a, T> {
    type Item = &'a T;

    fn next(&mut self) -> Option<&'a T> {
        if self.next == self.end {
            return None;
        }
        unsafe {
            let value = (*self.next).value.assume_init_ref();
            self.next = forward(self.next, 0);
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
            self.end = (*self.end).prev;
            Some((*self.end).value.assume_init_ref())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn seeded() -> SkipSet<i32> {
        SkipSet::with_rng(StdRng::seed_from_u64(0x5EED))
    }

    #[test]
    fn insert_find_remove() {
        let mut set = seeded();
        for k in [30, 10, 20, 50, 40] {
            assert!(set.insert(k));
        }
        assert!(!set.insert(20));
        assert_eq!(set.len(), 5);
        assert!(set.contains(&40));
        assert!(!set.contains(&41));
        assert!(set.remove(&30));
        assert!(!set.remove(&30));
        assert_eq!(set.len(), 4);
    }

    #[test]
    fn iteration_is_sorted_both_ways() {
        let mut set = seeded();
        for k in [5, 1, 9, 3, 7, 2, 8] {
            set.insert(k);
        }
        let forward: Vec<_> = set.iter().copied().collect();
        assert_eq!(forward, [1, 2, 3, 5, 7, 8, 9]);
        let backward: Vec<_> = set.iter().rev().copied().collect();
        assert_eq!(backward, [9, 8, 7, 5, 3, 2, 1]);
    }

    #[test]
    fn upper_levels_are_subsequences() {
        let mut set = seeded();
        for k in 0..500 {
            set.insert(k);
        }
        let bottom = set.keys_at_level(0);
        assert_eq!(bottom.len(), 500);
        for level in 1..set.current_level() {
            let keys = set.keys_at_level(level);
            let mut bottom_iter = bottom.iter();
            for key in &keys {
                assert!(
                    bottom_iter.any(|b| b == key),
                    "level {level} key missing below"
                );
            }
        }
    }

    #[test]
    fn level_shrinks_when_emptied() {
        let mut set = seeded();
        for k in 0..200 {
            set.insert(k);
        }
        assert!(set.current_level() > 1);
        for k in 0..200 {
            set.remove(&k);
        }
        assert!(set.is_empty());
        assert_eq!(set.current_level(), 1);
        assert_eq!(set.first(), None);
    }

    #[test]
    fn lower_bound_starts_mid_list() {
        let mut set = seeded();
        for k in [10, 20, 30] {
            set.insert(k);
        }
        assert_eq!(set.lower_bound(&15).next(), Some(&20));
        assert_eq!(set.lower_bound(&30).next(), Some(&30));
        assert_eq!(set.lower_bound(&31).next(), None);
    }

    #[test]
    fn transparent_string_queries() {
        let mut set: SkipSet<String> = SkipSet::with_rng(StdRng::seed_from_u64(7));
        set.insert("left".to_string());
        set.insert("right".to_string());
        assert!(set.contains("left"));
        assert_eq!(set.take("right").as_deref(), Some("right"));
    }
}
