//! An open-addressing hash table with an indirect index slab.
//!
//! Storage is two parallel arrays. `indices` carries the probe structure:
//! each entry is either `UNUSED`, `DELETED` (a tombstone), or the position
//! of an entry in `slots`. `slots` holds the entries themselves in insertion
//! order, populated from index 0 upward through the append cursor `used`.
//! Deletion only tombstones the index entry; the slot value stays alive
//! until the next rehash reclaims it, which keeps iteration and deletion
//! cheap. Every slot caches its hash code so rehashing never re-runs the
//! hasher and lookups can reject mismatches before touching the key.

pub mod probe;

use std::borrow::Borrow;
use std::fmt;
use std::collections::hash_map::RandomState;
use std::hash::{BuildHasher, Hash};
use std::marker::PhantomData;
use std::ptr::{self, NonNull};

use crate::alloc::{allocate_array, deallocate_array, Allocator, Global};
use probe::ProbeSequence;

const UNUSED: usize = usize::MAX;
const DELETED: usize = usize::MAX - 1;

pub const DEFAULT_CAPACITY: usize = 8;

/// Entry shape: a set stores bare values, a map stores key/value pairs.
pub trait EntryKind {
    type Key;
    type Value;
    fn key(value: &Self::Value) -> &Self::Key;
}

pub struct SetEntry<T>(PhantomData<T>);

impl<T> EntryKind for SetEntry<T> {
    type Key = T;
    type Value = T;
    fn key(value: &T) -> &T {
        value
    }
}

pub struct MapEntry<K, V>(PhantomData<(K, V)>);

impl<K, V> EntryKind for MapEntry<K, V> {
    type Key = K;
    type Value = (K, V);
    fn key(value: &(K, V)) -> &K {
        &value.0
    }
}

struct Slot<V> {
    hash: u64,
    dead: bool,
    value: V,
}

struct RawHashTable<E: EntryKind, S, A: Allocator> {
    indices: *mut usize,
    slots: *mut Slot<E::Value>,
    size: usize,
    capacity: usize,
    used: usize,
    hasher: S,
    alloc: A,
    _marker: PhantomData<E>,
}

impl<E, S, A> RawHashTable<E, S, A>
where
    E: EntryKind,
    A: Allocator,
{
    fn with_hasher_in(hasher: S, alloc: A) -> Self {
        RawHashTable {
            indices: ptr::null_mut(),
            slots: ptr::null_mut(),
            size: 0,
            capacity: 0,
            used: 0,
            hasher,
            alloc,
            _marker: PhantomData,
        }
    }

    unsafe fn slot(&self, pos: usize) -> *mut Slot<E::Value> {
        debug_assert!(pos < self.used);
        self.slots.add(pos)
    }

    unsafe fn index(&self, offset: usize) -> usize {
        debug_assert!(offset < self.capacity);
        *self.indices.add(offset)
    }

    fn allocate_arrays(&mut self, capacity: usize) {
        debug_assert!(capacity.is_power_of_two());
        let indices = allocate_array::<usize, A>(&self.alloc, capacity);
        let slots = allocate_array::<Slot<E::Value>, A>(&self.alloc, capacity);
        unsafe {
            for i in 0..capacity {
                indices.as_ptr().add(i).write(UNUSED);
            }
        }
        self.indices = indices.as_ptr();
        self.slots = slots.as_ptr();
        self.capacity = capacity;
    }

    /// Grow (or first-allocate) so one more insertion cannot exceed the 2/3
    /// load threshold on `used`.
    fn ensure_room(&mut self, initial: usize) {
        if self.capacity == 0 {
            self.allocate_arrays(initial);
        } else if self.used * 3 > self.capacity * 2 {
            self.resize(self.capacity << 1);
        }
    }

    /// Replay live slots in insertion order into fresh arrays; tombstoned
    /// slots are dropped here. Cached hashes make this loop free of user
    /// code, so no panic can interrupt it mid-structure.
    fn resize(&mut self, new_capacity: usize) {
        let old_indices = self.indices;
        let old_slots = self.slots;
        let old_capacity = self.capacity;
        let old_used = self.used;

        self.allocate_arrays(new_capacity);
        self.size = 0;
        self.used = 0;

        unsafe {
            for pos in 0..old_used {
                let slot = old_slots.add(pos);
                if (*slot).dead {
                    ptr::drop_in_place(ptr::addr_of_mut!((*slot).value));
                    continue;
                }
                let hash = (*slot).hash;
                let value = ptr::read(ptr::addr_of!((*slot).value));
                self.rehash_place(value, hash);
            }
            deallocate_array(&self.alloc, NonNull::new_unchecked(old_indices), old_capacity);
            deallocate_array(&self.alloc, NonNull::new_unchecked(old_slots), old_capacity);
        }
    }

    /// Placement during rehash: slots are only `UNUSED` or active, never
    /// deleted, and the key is known unique.
    unsafe fn rehash_place(&mut self, value: E::Value, hash: u64) {
        let mut probe = ProbeSequence::new(hash, self.capacity);
        let mut offset = probe.current();
        loop {
            if self.index(offset) == UNUSED {
                self.place(offset, value, hash);
                return;
            }
            offset = probe.advance();
        }
    }

    unsafe fn place(&mut self, offset: usize, value: E::Value, hash: u64) {
        self.slots.add(self.used).write(Slot {
            hash,
            dead: false,
            value,
        });
        *self.indices.add(offset) = self.used;
        self.used += 1;
        self.size += 1;
    }

    fn clear(&mut self) {
        if self.capacity == 0 {
            return;
        }
        unsafe {
            for pos in 0..self.used {
                ptr::drop_in_place(ptr::addr_of_mut!((*self.slots.add(pos)).value));
            }
            deallocate_array(&self.alloc, NonNull::new_unchecked(self.indices), self.capacity);
            deallocate_array(&self.alloc, NonNull::new_unchecked(self.slots), self.capacity);
        }
        self.indices = ptr::null_mut();
        self.slots = ptr::null_mut();
        self.size = 0;
        self.capacity = 0;
        self.used = 0;
    }

}

impl<E, S, A> RawHashTable<E, S, A>
where
    E: EntryKind,
    S: BuildHasher,
    A: Allocator,
{
    fn hash_query<Q>(&self, query: &Q) -> u64
    where
        Q: Hash + ?Sized,
    {
        self.hasher.hash_one(query)
    }

    unsafe fn slot_matches<Q>(&self, pos: usize, hash: u64, query: &Q) -> bool
    where
        E::Key: Borrow<Q>,
        Q: Eq + ?Sized,
    {
        let slot = self.slot(pos);
        (*slot).hash == hash && E::key(&(*slot).value).borrow() == query
    }

    /// Walk the probe sequence for `query`: the offset of the matching
    /// active entry, or of the `UNUSED` stop.
    fn find_offset_aux<Q>(&self, hash: u64, query: &Q) -> usize
    where
        E::Key: Borrow<Q>,
        Q: Eq + ?Sized,
    {
        debug_assert!(self.capacity > 0);
        let mut probe = ProbeSequence::new(hash, self.capacity);
        let mut offset = probe.current();
        loop {
            let pos = unsafe { self.index(offset) };
            if pos != DELETED {
                if pos == UNUSED || unsafe { self.slot_matches(pos, hash, query) } {
                    return offset;
                }
            }
            offset = probe.advance();
        }
    }

    /// Position in `slots` of the entry for `query`, if present.
    fn find_pos<Q>(&self, query: &Q) -> Option<usize>
    where
        E::Key: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        if self.capacity == 0 {
            return None;
        }
        let hash = self.hash_query(query);
        let offset = self.find_offset_aux(hash, query);
        let pos = unsafe { self.index(offset) };
        if pos == UNUSED {
            None
        } else {
            Some(pos)
        }
    }

    /// Insert unless an equal key exists: `Ok(pos)` on insertion, or
    /// `Err((pos, value))` handing the rejected entry back alongside the
    /// position of the occupant.
    fn insert_value(
        &mut self,
        value: E::Value,
        initial: usize,
    ) -> Result<usize, (usize, E::Value)>
    where
        E::Key: Hash + Eq,
    {
        self.ensure_room(initial);
        let hash = self.hash_query(E::key(&value));
        let offset = self.find_offset_aux(hash, E::key(&value));
        let pos = unsafe { self.index(offset) };
        if pos == UNUSED {
            unsafe {
                self.place(offset, value, hash);
            }
            Ok(self.used - 1)
        } else {
            Err((pos, value))
        }
    }
}

impl<E, S, A> Drop for RawHashTable<E, S, A>
where
    E: EntryKind,
    A: Allocator,
{
    fn drop(&mut self) {
        self.clear();
    }
}

/// A hash set over the index-slab table.
pub struct HashSet<T, S = RandomState, A = Global>
where
    A: Allocator,
{
    table: RawHashTable<SetEntry<T>, S, A>,
    initial_capacity: usize,
}

unsafe impl<T: Send, S: Send, A: Allocator + Send> Send for HashSet<T, S, A> {}
unsafe impl<T: Sync, S: Sync, A: Allocator + Sync> Sync for HashSet<T, S, A> {}

impl<T> HashSet<T, RandomState, Global> {
    pub fn new() -> Self {
        Self::with_hasher_in(RandomState::new(), Global)
    }

    pub fn with_capacity(capacity: usize) -> Self {
        let mut set = Self::new();
        set.initial_capacity = capacity.next_power_of_two().max(2);
        set
    }
}

impl<T> Default for HashSet<T, RandomState, Global> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T, S, A: Allocator> HashSet<T, S, A> {
    pub fn with_hasher_in(hasher: S, alloc: A) -> Self {
        HashSet {
            table: RawHashTable::with_hasher_in(hasher, alloc),
            initial_capacity: DEFAULT_CAPACITY,
        }
    }

    pub fn len(&self) -> usize {
        self.table.size
    }

    pub fn is_empty(&self) -> bool {
        self.table.size == 0
    }

    /// Length of the index slab; zero before the first insertion, a power
    /// of two afterwards.
    pub fn capacity(&self) -> usize {
        self.table.capacity
    }

    /// The append cursor: slots consumed since the last rehash, tombstones
    /// included.
    pub fn used(&self) -> usize {
        self.table.used
    }

    pub fn clear(&mut self) {
        self.table.clear();
    }

    pub fn iter(&self) -> Iter<'_, T> {
        Iter {
            indices: self.table.indices,
            slots: self.table.slots as *const Slot<T>,
            front: 0,
            back: self.table.capacity,
            _marker: PhantomData,
        }
    }
}

impl<T, S, A> HashSet<T, S, A>
where
    T: Hash + Eq,
    S: BuildHasher,
    A: Allocator,
{
    pub fn insert(&mut self, value: T) -> bool {
        self.table
            .insert_value(value, self.initial_capacity)
            .is_ok()
    }

    pub fn contains<Q>(&self, query: &Q) -> bool
    where
        T: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        self.get(query).is_some()
    }

    pub fn get<Q>(&self, query: &Q) -> Option<&T>
    where
        T: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        let pos = self.table.find_pos(query)?;
        unsafe { Some(&(*self.table.slot(pos)).value) }
    }

    /// Tombstone the entry for `query`. The slot itself is reclaimed by the
    /// next rehash.
    pub fn remove<Q>(&mut self, query: &Q) -> bool
    where
        T: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        if self.table.capacity == 0 {
            return false;
        }
        let hash = self.table.hash_query(query);
        let offset = self.table.find_offset_aux(hash, query);
        unsafe {
            let pos = self.table.index(offset);
            if pos == UNUSED {
                return false;
            }
            *self.table.indices.add(offset) = DELETED;
            (*self.table.slot(pos)).dead = true;
        }
        self.table.size -= 1;
        true
    }
}

impl<T, S, A> Extend<T> for HashSet<T, S, A>
where
    T: Hash + Eq,
    S: BuildHasher,
    A: Allocator,
{
    fn extend<I: IntoIterator<Item = T>>(&mut self, iter: I) {
        for value in iter {
            self.insert(value);
        }
    }
}

impl<T: Hash + Eq> FromIterator<T> for HashSet<T> {
    fn from_iter<I: IntoIterator<Item = T>>(iter: I) -> Self {
        let mut set = HashSet::new();
        set.extend(iter);
        set
    }
}

impl<T, S, A> Clone for HashSet<T, S, A>
where
    T: Hash + Eq + Clone,
    S: BuildHasher + Clone,
    A: Allocator,
{
    fn clone(&self) -> Self {
        let mut copy = Self::with_hasher_in(self.table.hasher.clone(), self.table.alloc.clone());
        copy.initial_capacity = self.initial_capacity;
        copy.extend(self.iter().cloned());
        copy
    }

    /// Copy-assignment path: consults `PROPAGATE_ON_CLONE_FROM`; storage is
    /// released through the allocator that produced it before propagation.
    fn clone_from(&mut self, source: &Self) {
        self.table.clear();
        if A::PROPAGATE_ON_CLONE_FROM {
            self.table.alloc = source.table.alloc.clone();
        }
        self.table.hasher = source.table.hasher.clone();
        self.initial_capacity = source.initial_capacity;
        self.extend(source.iter().cloned());
    }
}

impl<T, S, A> HashSet<T, S, A>
where
    A: Allocator,
{
    /// Swap contents. Honors `PROPAGATE_ON_SWAP`; without propagation the
    /// two allocators must share a resource.
    pub fn swap(&mut self, other: &mut Self) {
        if A::PROPAGATE_ON_SWAP {
            std::mem::swap(self, other);
        } else {
            assert!(
                self.table.alloc.same_resource(&other.table.alloc),
                "swap without propagation requires a shared allocator resource"
            );
            std::mem::swap(&mut self.table.indices, &mut other.table.indices);
            std::mem::swap(&mut self.table.slots, &mut other.table.slots);
            std::mem::swap(&mut self.table.size, &mut other.table.size);
            std::mem::swap(&mut self.table.capacity, &mut other.table.capacity);
            std::mem::swap(&mut self.table.used, &mut other.table.used);
            std::mem::swap(&mut self.table.hasher, &mut other.table.hasher);
            std::mem::swap(&mut self.initial_capacity, &mut other.initial_capacity);
        }
    }
}

impl<'a, T, S, A: Allocator> IntoIterator for &'a HashSet<T, S, A> {
    type Item = &'a T;
    type IntoIter = Iter<'a, T>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

impl<T: fmt::Debug, S, A: Allocator> fmt::Debug for HashSet<T, S, A> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_set().entries(self.iter()).finish()
    }
}

/// Iterator over active index entries: probe-sequence order, not insertion
/// order.
pub struct Iter<'a, T> {
    indices: *const usize,
    slots: *const Slot<T>,
    front: usize,
    back: usize,
    _marker: PhantomData<&'a T>,
}

impl<'a, T> Iterator for Iter<'a, T> {
    type Item = &'a T;

    fn next(&mut self) -> Option<&'a T> {
        while self.front < self.back {
            let pos = unsafe { *self.indices.add(self.front) };
            self.front += 1;
            if pos < DELETED {
                return Some(unsafe { &(*self.slots.add(pos)).value });
            }
        }
        None
    }
}

impl<'a, T> DoubleEndedIterator for Iter<'a, T> {
    fn next_back(&mut self) -> Option<&'a T> {
        while self.back > self.front {
            self.back -= 1;
            let pos = unsafe { *self.indices.add(self.back) };
            if pos < DELETED {
                return Some(unsafe { &(*self.slots.add(pos)).value });
            }
        }
        None
    }
}

/// A hash map over the same table, keyed on the first pair component.
pub struct HashMap<K, V, S = RandomState, A = Global>
where
    A: Allocator,
{
    table: RawHashTable<MapEntry<K, V>, S, A>,
    initial_capacity: usize,
}

unsafe impl<K: Send, V: Send, S: Send, A: Allocator + Send> Send for HashMap<K, V, S, A> {}
unsafe impl<K: Sync, V: Sync, S: Sync, A: Allocator + Sync> Sync for HashMap<K, V, S, A> {}

impl<K, V> HashMap<K, V, RandomState, Global> {
    pub fn new() -> Self {
        Self::with_hasher_in(RandomState::new(), Global)
    }

    pub fn with_capacity(capacity: usize) -> Self {
        let mut map = Self::new();
        map.initial_capacity = capacity.next_power_of_two().max(2);
        map
    }
}

impl<K, V> Default for HashMap<K, V, RandomState, Global> {
    fn default() -> Self {
        Self::new()
    }
}

impl<K, V, S, A: Allocator> HashMap<K, V, S, A> {
    pub fn with_hasher_in(hasher: S, alloc: A) -> Self {
        HashMap {
            table: RawHashTable::with_hasher_in(hasher, alloc),
            initial_capacity: DEFAULT_CAPACITY,
        }
    }

    pub fn len(&self) -> usize {
        self.table.size
    }

    pub fn is_empty(&self) -> bool {
        self.table.size == 0
    }

    pub fn capacity(&self) -> usize {
        self.table.capacity
    }

    pub fn clear(&mut self) {
        self.table.clear();
    }

    pub fn iter(&self) -> MapIter<'_, K, V> {
        MapIter {
            indices: self.table.indices,
            slots: self.table.slots as *const Slot<(K, V)>,
            front: 0,
            back: self.table.capacity,
            _marker: PhantomData,
        }
    }

    pub fn keys(&self) -> impl Iterator<Item = &K> {
        self.iter().map(|(k, _)| k)
    }

    pub fn values(&self) -> impl Iterator<Item = &V> {
        self.iter().map(|(_, v)| v)
    }
}

impl<K, V, S, A> HashMap<K, V, S, A>
where
    K: Hash + Eq,
    S: BuildHasher,
    A: Allocator,
{
    /// Insert or assign: an existing key keeps its slot, its value is
    /// replaced and returned.
    pub fn insert(&mut self, key: K, value: V) -> Option<V> {
        match self.table.insert_value((key, value), self.initial_capacity) {
            Ok(_) => None,
            Err((pos, (_key, value))) => unsafe {
                let slot = self.table.slot(pos);
                Some(std::mem::replace(&mut (*slot).value.1, value))
            },
        }
    }

    pub fn get<Q>(&self, query: &Q) -> Option<&V>
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        let pos = self.table.find_pos(query)?;
        unsafe { Some(&(*self.table.slot(pos)).value.1) }
    }

    pub fn get_mut<Q>(&mut self, query: &Q) -> Option<&mut V>
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        let pos = self.table.find_pos(query)?;
        unsafe { Some(&mut (*self.table.slot(pos)).value.1) }
    }

    pub fn contains_key<Q>(&self, query: &Q) -> bool
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        self.get(query).is_some()
    }

    /// The `try_emplace` shape: the value is only produced when the key is
    /// absent.
    pub fn get_or_insert_with<F>(&mut self, key: K, make: F) -> &mut V
    where
        F: FnOnce() -> V,
    {
        self.table.ensure_room(self.initial_capacity);
        let hash = self.table.hash_query(&key);
        let offset = self.table.find_offset_aux(hash, &key);
        unsafe {
            let pos = self.table.index(offset);
            let pos = if pos == UNUSED {
                self.table.place(offset, (key, make()), hash);
                self.table.used - 1
            } else {
                pos
            };
            &mut (*self.table.slot(pos)).value.1
        }
    }

    /// The `operator[]` shape: default-construct on absence.
    pub fn get_or_default(&mut self, key: K) -> &mut V
    where
        V: Default,
    {
        self.get_or_insert_with(key, V::default)
    }

    pub fn remove<Q>(&mut self, query: &Q) -> bool
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        if self.table.capacity == 0 {
            return false;
        }
        let hash = self.table.hash_query(query);
        let offset = self.table.find_offset_aux(hash, query);
        unsafe {
            let pos = self.table.index(offset);
            if pos == UNUSED {
                return false;
            }
            *self.table.indices.add(offset) = DELETED;
            (*self.table.slot(pos)).dead = true;
        }
        self.table.size -= 1;
        true
    }
}

impl<K, V, S, A> Extend<(K, V)> for HashMap<K, V, S, A>
where
    K: Hash + Eq,
    S: BuildHasher,
    A: Allocator,
{
    fn extend<I: IntoIterator<Item = (K, V)>>(&mut self, iter: I) {
        for (k, v) in iter {
            self.insert(k, v);
        }
    }
}

impl<K: Hash + Eq, V> FromIterator<(K, V)> for HashMap<K, V> {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut map = HashMap::new();
        map.extend(iter);
        map
    }
}

impl<K: fmt::Debug, V: fmt::Debug, S, A: Allocator> fmt::Debug for HashMap<K, V, S, A> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_map().entries(self.iter()).finish()
    }
}

pub struct MapIter<'a, K, V> {
    indices: *const usize,
    slots: *const Slot<(K, V)>,
    front: usize,
    back: usize,
    _marker: PhantomData<(&'a K, &'a V)>,
}

impl<'a, K, V> Iterator for MapIter<'a, K, V> {
    type Item = (&'a K, &'a V);

    fn next(&mut self) -> Option<(&'a K, &'a V)> {
        while self.front < self.back {
            let pos = unsafe { *self.indices.add(self.front) };
            self.front += 1;
            if pos < DELETED {
                let pair = unsafe { &(*self.slots.add(pos)).value };
                return Some((&pair.0, &pair.1));
            }
        }
        None
    }
}

impl<'a, K, V> DoubleEndedIterator for MapIter<'a, K, V> {
    fn next_back(&mut self) -> Option<(&'a K, &'a V)> {
        while self.back > self.front {
            self.back -= 1;
            let pos = unsafe { *self.indices.add(self.back) };
            if pos < DELETED {
                let pair = unsafe { &(*self.slots.add(pos)).value };
                return Some((&pair.0, &pair.1));
            }
        }
        None
    }
}
