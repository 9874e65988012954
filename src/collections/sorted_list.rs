//! An ordered set stored as a sequence of bounded chunks ("trucks").
//!
//! Concatenating the trucks in order yields the sorted sequence. Lookup
//! binary-searches the truck maxima, then the chosen truck, costing
//! `O(log(n/T) + log T)`; in-truck insertion and deletion cost `O(T)`.
//! Between operations no truck is empty, no truck holds more than `2T`
//! elements, and truck maxima are non-decreasing.

use std::fmt;

use crate::alloc::{Allocator, Global};
use crate::collections::buffer::RawBuffer;
use crate::collections::{Compare, Natural};

pub const DEFAULT_TRUCK_SIZE: usize = 1024;

pub struct SortedSet<T, C = Natural, A = Global>
where
    A: Allocator,
{
    trucks: RawBuffer<RawBuffer<T>>,
    size: usize,
    truck_size: usize,
    cmp: C,
    alloc: A,
}

impl<T> SortedSet<T, Natural, Global> {
    pub fn new() -> Self {
        Self::with_config_in(Natural, DEFAULT_TRUCK_SIZE, Global)
    }

    /// A set with the natural order and a custom truck target size.
    pub fn with_truck_size(truck_size: usize) -> Self {
        Self::with_config_in(Natural, truck_size, Global)
    }
}

impl<T> Default for SortedSet<T, Natural, Global> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T, C, A: Allocator> SortedSet<T, C, A> {
    pub fn with_config_in(cmp: C, truck_size: usize, alloc: A) -> Self {
        assert!(truck_size >= 1, "truck size must be at least 1");
        SortedSet {
            trucks: RawBuffer::new(),
            size: 0,
            truck_size,
            cmp,
            alloc,
        }
    }

    pub fn len(&self) -> usize {
        self.size
    }

    pub fn is_empty(&self) -> bool {
        self.size == 0
    }

    pub fn truck_count(&self) -> usize {
        self.trucks.len()
    }

    pub fn truck_lens(&self) -> Vec<usize> {
        self.trucks.iter().map(RawBuffer::len).collect()
    }

    pub fn truck_target(&self) -> usize {
        self.truck_size
    }

    pub fn iter(&self) -> Iter<'_, T> {
        Iter {
            trucks: self.trucks.as_slice(),
            front: (0, 0),
            back: (self.trucks.len(), 0),
        }
    }

    pub fn first(&self) -> Option<&T> {
        self.trucks.first().and_then(RawBuffer::first)
    }

    pub fn last(&self) -> Option<&T> {
        self.trucks.last().and_then(RawBuffer::last)
    }

    pub fn clear(&mut self) {
        for truck in self.trucks.iter_mut() {
            truck.dispose(&self.alloc);
        }
        self.trucks.clear();
        self.size = 0;
    }
}

impl<T, C, A> SortedSet<T, C, A>
where
    C: Compare<T>,
    A: Allocator,
{
    pub fn insert(&mut self, value: T) -> bool {
        if self.trucks.is_empty() {
            let mut truck = RawBuffer::with_capacity(&self.alloc, 4);
            truck.push(&self.alloc, value);
            self.trucks.push(&self.alloc, truck);
            self.size = 1;
            return true;
        }

        let (mut ti, mut ii) = self.locate(&value);
        if ti == self.trucks.len() {
            // Greater than every truck maximum: append to the last truck.
            ti -= 1;
            ii = self.trucks[ti].len();
        } else if ii < self.trucks[ti].len()
            && self.cmp.compare(&self.trucks[ti][ii], &value).is_eq()
        {
            return false;
        }

        self.trucks[ti].insert(&self.alloc, ii, value);
        self.size += 1;
        self.split_if_oversized(ti);
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
        let (ti, ii) = self.locate(query);
        if !self.holds(ti, ii, query) {
            return None;
        }
        let value = self.trucks[ti].remove(ii);
        if self.trucks[ti].is_empty() {
            self.trucks[ti].dispose(&self.alloc);
            self.trucks.remove(ti);
        }
        self.size -= 1;
        Some(value)
    }

    pub fn get<Q: ?Sized>(&self, query: &Q) -> Option<&T>
    where
        C: Compare<T, Q>,
    {
        let (ti, ii) = self.locate(query);
        if self.holds(ti, ii, query) {
            Some(&self.trucks[ti][ii])
        } else {
            None
        }
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
        let front = self.locate(query);
        Iter {
            trucks: self.trucks.as_slice(),
            front,
            back: (self.trucks.len(), 0),
        }
    }

    fn holds<Q: ?Sized>(&self, ti: usize, ii: usize, query: &Q) -> bool
    where
        C: Compare<T, Q>,
    {
        ti < self.trucks.len()
            && ii < self.trucks[ti].len()
            && self.cmp.compare(&self.trucks[ti][ii], query).is_eq()
    }

    /// Lower-bound position: the first truck whose maximum is not less than
    /// the query, then the first element in it not less than the query.
    fn locate<Q: ?Sized>(&self, query: &Q) -> (usize, usize)
    where
        C: Compare<T, Q>,
    {
        let mut lo = 0;
        let mut hi = self.trucks.len();
        while lo < hi {
            let mid = lo + (hi - lo) / 2;
            let truck = &self.trucks[mid];
            let max = &truck[truck.len() - 1];
            if self.cmp.compare(max, query).is_lt() {
                lo = mid + 1;
            } else {
                hi = mid;
            }
        }
        if lo == self.trucks.len() {
            return (lo, 0);
        }

        let truck = &self.trucks[lo];
        let mut a = 0;
        let mut b = truck.len();
        while a < b {
            let mid = a + (b - a) / 2;
            if self.cmp.compare(&truck[mid], query).is_lt() {
                a = mid + 1;
            } else {
                b = mid;
            }
        }
        (lo, a)
    }

    fn split_if_oversized(&mut self, ti: usize) {
        if self.trucks[ti].len() > self.truck_size * 2 {
            let half = self.trucks[ti].len() / 2;
            let tail = self.trucks[ti].split_off(&self.alloc, half);
            self.trucks.insert(&self.alloc, ti + 1, tail);
        }
    }
}

impl<T, C, A> Clone for SortedSet<T, C, A>
where
    T: Clone,
    C: Compare<T> + Clone,
    A: Allocator,
{
    fn clone(&self) -> Self {
        let mut copy = Self::with_config_in(self.cmp.clone(), self.truck_size, self.alloc.clone());
        copy.copy_trucks_from(self);
        copy
    }

    /// Copy-assignment path: consults `PROPAGATE_ON_CLONE_FROM`. Existing
    /// storage always returns to the allocator that produced it before any
    /// propagation happens.
    fn clone_from(&mut self, source: &Self) {
        self.clear();
        self.trucks.dispose(&self.alloc);
        if A::PROPAGATE_ON_CLONE_FROM {
            self.alloc = source.alloc.clone();
        }
        self.cmp = source.cmp.clone();
        self.truck_size = source.truck_size;
        self.copy_trucks_from(source);
    }
}

impl<T, C, A> SortedSet<T, C, A>
where
    T: Clone,
    A: Allocator,
{
    fn copy_trucks_from<C2>(&mut self, source: &SortedSet<T, C2, A>) {
        for truck in source.trucks.iter() {
            let mut copy = RawBuffer::with_capacity(&self.alloc, truck.len());
            copy.extend(&self.alloc, truck.iter().cloned());
            self.trucks.push(&self.alloc, copy);
        }
        self.size = source.size;
    }
}

impl<T, C, A> SortedSet<T, C, A>
where
    C: Compare<T>,
    A: Allocator,
{
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
            self.trucks.swap(&mut other.trucks);
            std::mem::swap(&mut self.size, &mut other.size);
            std::mem::swap(&mut self.truck_size, &mut other.truck_size);
            std::mem::swap(&mut self.cmp, &mut other.cmp);
        }
    }
}

impl<T, C, A: Allocator> Drop for SortedSet<T, C, A> {
    fn drop(&mut self) {
        self.clear();
        self.trucks.dispose(&self.alloc);
    }
}

impl<T, C, A> Extend<T> for SortedSet<T, C, A>
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

impl<T: Ord> FromIterator<T> for SortedSet<T> {
    fn from_iter<I: IntoIterator<Item = T>>(iter: I) -> Self {
        let mut set = SortedSet::new();
        set.extend(iter);
        set
    }
}

impl<'a, T, C, A: Allocator> IntoIterator for &'a SortedSet<T, C, A> {
    type Item = &'a T;
    type IntoIter = Iter<'a, T>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

impl<T: fmt::Debug, C, A: Allocator> fmt::Debug for SortedSet<T, C, A> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_set().entries(self.iter()).finish()
    }
}

/// Position-based iterator: a (truck, offset) pair at each end.
pub struct Iter<'a, T> {
    trucks: &'a [RawBuffer<T>],
    front: (usize, usize),
    back: (usize, usize),
}

impl<'a, T> Iterator for Iter<'a, T> {
    type Item = &'a T;

    fn next(&mut self) -> Option<&'a T> {
        if self.front == self.back {
            return None;
        }
        let (ti, ii) = self.front;
        let value = &self.trucks[ti][ii];
        self.front = if ii + 1 == self.trucks[ti].len() {
            (ti + 1, 0)
        } else {
            (ti, ii + 1)
        };
        Some(value)
    }
}

impl<'a, T> DoubleEndedIterator for Iter<'a, T> {
    fn next_back(&mut self) -> Option<&'a T> {
        if self.front == self.back {
            return None;
        }
        let (ti, ii) = self.back;
        self.back = if ii == 0 {
            let prev = ti - 1;
            (prev, self.trucks[prev].len() - 1)
        } else {
            (ti, ii - 1)
        };
        Some(&self.trucks[self.back.0][self.back.1])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn insert_keeps_sorted_unique() {
        let mut set = SortedSet::with_truck_size(4);
        for k in [9, 1, 5, 3, 7, 5, 1] {
            set.insert(k);
        }
        assert_eq!(set.len(), 5);
        let contents: Vec<_> = set.iter().copied().collect();
        assert_eq!(contents, [1, 3, 5, 7, 9]);
    }

    #[test]
    fn trucks_split_and_stay_bounded() {
        let mut set = SortedSet::with_truck_size(4);
        for k in 0..100 {
            set.insert(k);
            for len in set.truck_lens() {
                assert!(len >= 1);
                assert!(len <= 8);
            }
        }
        assert!(set.truck_count() > 1);
        let contents: Vec<_> = set.iter().copied().collect();
        assert_eq!(contents, (0..100).collect::<Vec<_>>());
    }

    #[test]
    fn remove_drops_empty_trucks() {
        let mut set = SortedSet::with_truck_size(2);
        for k in 0..20 {
            set.insert(k);
        }
        for k in 0..20 {
            assert!(set.remove(&k));
            for len in set.truck_lens() {
                assert!(len >= 1);
            }
        }
        assert!(set.is_empty());
        assert_eq!(set.truck_count(), 0);
    }

    #[test]
    fn truck_maxima_non_decreasing() {
        let mut set = SortedSet::with_truck_size(3);
        for k in [42, 17, 99, 3, 56, 88, 21, 71, 10, 64, 35] {
            set.insert(k);
        }
        let maxima: Vec<_> = set
            .truck_lens()
            .iter()
            .scan(set.iter(), |iter, &len| {
                iter.nth(len - 1).copied()
            })
            .collect();
        let mut sorted = maxima.clone();
        sorted.sort_unstable();
        assert_eq!(maxima, sorted);
    }

    #[test]
    fn lower_bound_and_reverse_iteration() {
        let set: SortedSet<i32> = [10, 20, 30, 40].into_iter().collect();
        assert_eq!(set.lower_bound(&25).next(), Some(&30));
        let backward: Vec<_> = set.iter().rev().copied().collect();
        assert_eq!(backward, [40, 30, 20, 10]);
    }

    #[test]
    fn transparent_queries() {
        let mut set: SortedSet<String> = SortedSet::new();
        set.insert("alpha".into());
        set.insert("beta".into());
        assert!(set.contains("alpha"));
        assert_eq!(set.get("beta").map(String::as_str), Some("beta"));
    }
}
