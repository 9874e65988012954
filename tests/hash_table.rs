//! Index-slab hash table: rehash behavior, probe determinism, and
//! reference-model agreement.

use std::collections::HashSet as StdHashSet;

use coffer::collections::hash_table::probe::ProbeSequence;
use coffer::collections::hash_table::DEFAULT_CAPACITY;
use coffer::{HashMap, HashSet};
use proptest::prelude::*;

#[test]
fn rehash_preserves_set_semantics() {
    let mut set = HashSet::new();
    let n = 64;
    let mut rehashed = false;
    for k in 0..n {
        assert!(set.insert(k));
        assert_eq!(set.len(), (k + 1) as usize);
        if set.capacity() > DEFAULT_CAPACITY {
            rehashed = true;
        }
        for probe in 0..=k {
            assert!(set.contains(&probe), "lost {probe} after inserting {k}");
        }
    }
    assert!(rehashed, "capacity must have doubled at least once");
    assert!(set.capacity() >= 2 * DEFAULT_CAPACITY);
    assert!(set.capacity().is_power_of_two());
}

#[test]
fn probe_sequence_is_a_pure_function_of_hash_and_capacity() {
    for hash in [0u64, 42, 0xDEAD_BEEF, u64::MAX] {
        for capacity in [8usize, 64, 1024] {
            let walk = |mut probe: ProbeSequence| {
                let mut visited = vec![probe.current()];
                for _ in 0..20 {
                    visited.push(probe.advance());
                }
                visited
            };
            let a = walk(ProbeSequence::new(hash, capacity));
            let b = walk(ProbeSequence::new(hash, capacity));
            assert_eq!(a, b);
            assert!(a.iter().all(|&slot| slot < capacity));
        }
    }
}

#[test]
fn used_counts_tombstones_until_rehash() {
    let mut set = HashSet::new();
    for k in 0..5 {
        set.insert(k);
    }
    for k in 0..4 {
        set.remove(&k);
    }
    assert_eq!(set.len(), 1);
    assert_eq!(set.used(), 5, "tombstones hold their slots");

    for k in 10..14 {
        set.insert(k);
    }
    // Growth replayed live slots only.
    if set.used() == set.len() {
        assert_eq!(set.len(), 5);
    }
    assert!(set.contains(&4));
    for k in 0..4 {
        assert!(!set.contains(&k));
    }
}

#[test]
fn iteration_is_bidirectional_over_the_index_slab() {
    let mut set = HashSet::new();
    for k in 0..20 {
        set.insert(k);
    }
    let forward: Vec<_> = set.iter().copied().collect();
    let mut backward: Vec<_> = set.iter().rev().copied().collect();
    backward.reverse();
    assert_eq!(forward, backward);
    assert_eq!(forward.len(), 20);
}

#[test]
fn map_front_operations() {
    let mut map: HashMap<String, Vec<i32>> = HashMap::new();
    map.get_or_default("a".to_string()).push(1);
    map.get_or_default("a".to_string()).push(2);
    assert_eq!(map.get("a"), Some(&vec![1, 2]));

    assert_eq!(map.insert("b".to_string(), vec![9]), None);
    assert_eq!(map.insert("b".to_string(), vec![7]), Some(vec![9]));

    let slot = map.get_or_insert_with("c".to_string(), || vec![5]);
    slot.push(6);
    assert_eq!(map.get("c"), Some(&vec![5, 6]));

    assert!(map.remove("b"));
    assert_eq!(map.len(), 2);
    assert_eq!(map.get("b"), None);
}

proptest! {
    #[test]
    fn agrees_with_std_hashset(ops in proptest::collection::vec((0u8..3, 0i32..64), 0..400)) {
        let mut set = HashSet::new();
        let mut model = StdHashSet::new();

        for (op, key) in ops {
            match op {
                0 => prop_assert_eq!(set.insert(key), model.insert(key)),
                1 => prop_assert_eq!(set.contains(&key), model.contains(&key)),
                _ => prop_assert_eq!(set.remove(&key), model.remove(&key)),
            }
            prop_assert_eq!(set.len(), model.len());
            prop_assert!(set.capacity() == 0 || set.capacity().is_power_of_two());
            prop_assert!(set.used() <= set.capacity());
        }
        let mut contents: Vec<_> = set.iter().copied().collect();
        let mut expected: Vec<_> = model.iter().copied().collect();
        contents.sort_unstable();
        expected.sort_unstable();
        prop_assert_eq!(contents, expected);
    }
}
