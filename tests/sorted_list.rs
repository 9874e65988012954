//! Trucked sorted-list invariants and reference-model agreement.

use std::collections::BTreeSet;

use coffer::SortedSet;
use proptest::prelude::*;

fn assert_truck_invariants<T: Ord>(set: &SortedSet<T>, target: usize) {
    let lens = set.truck_lens();
    for len in &lens {
        assert!(*len >= 1, "no truck may be empty");
        assert!(*len <= target * 2, "no truck may exceed twice the target");
    }
    assert_eq!(lens.iter().sum::<usize>(), set.len());
}

#[test]
fn split_keeps_order_across_trucks() {
    let mut set = SortedSet::with_truck_size(8);
    for k in (0..500).rev() {
        set.insert(k);
    }
    assert!(set.truck_count() > 1);
    assert!(set.iter().copied().eq(0..500));
}

#[test]
fn maxima_are_non_decreasing() {
    let mut set = SortedSet::with_truck_size(4);
    for k in [88, 12, 45, 3, 99, 61, 27, 54, 70, 8, 33, 91, 17, 42] {
        set.insert(k);
    }
    let mut iter = set.iter();
    let mut maxima = Vec::new();
    for len in set.truck_lens() {
        let max = iter.nth(len - 1).expect("truck is non-empty");
        maxima.push(*max);
    }
    assert!(maxima.windows(2).all(|w| w[0] <= w[1]));
}

proptest! {
    #[test]
    fn agrees_with_btreeset(
        target in 1usize..8,
        ops in proptest::collection::vec((0u8..3, 0i32..64), 0..300),
    ) {
        let mut set = SortedSet::with_truck_size(target);
        let mut model = BTreeSet::new();

        for (op, key) in ops {
            match op {
                0 => prop_assert_eq!(set.insert(key), model.insert(key)),
                1 => prop_assert_eq!(set.contains(&key), model.contains(&key)),
                _ => prop_assert_eq!(set.remove(&key), model.remove(&key)),
            }
            prop_assert_eq!(set.len(), model.len());
            assert_truck_invariants(&set, target);
        }
        prop_assert!(set.iter().eq(model.iter()));
    }
}
