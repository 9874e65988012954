//! Skip-list contract tests with a seeded random source.

use std::collections::BTreeSet;

use coffer::SkipSet;
use proptest::prelude::*;
use rand::rngs::StdRng;
use rand::SeedableRng;

fn seeded(seed: u64) -> SkipSet<i32> {
    SkipSet::with_rng(StdRng::seed_from_u64(seed))
}

#[test]
fn bottom_level_holds_every_key_in_order() {
    let mut set = seeded(1);
    for k in [9, 2, 7, 4, 1, 8, 3] {
        set.insert(k);
    }
    let bottom: Vec<_> = set.keys_at_level(0).into_iter().copied().collect();
    assert_eq!(bottom, [1, 2, 3, 4, 7, 8, 9]);
}

#[test]
fn higher_levels_are_subsequences_of_the_bottom() {
    let mut set = seeded(2);
    for k in 0..1000 {
        set.insert(k);
    }
    let bottom: Vec<_> = set.keys_at_level(0).into_iter().copied().collect();
    for level in 1..set.current_level() {
        let keys: Vec<_> = set.keys_at_level(level).into_iter().copied().collect();
        let mut cursor = bottom.iter();
        for key in &keys {
            assert!(
                cursor.any(|b| b == key),
                "level {level} is not a subsequence at key {key}"
            );
        }
    }
}

#[test]
fn level_never_exceeds_the_configured_maximum() {
    let mut set = seeded(3);
    for k in 0..5000 {
        set.insert(k);
    }
    assert!(set.current_level() <= set.max_level());
}

#[test]
fn duplicate_keys_are_reported() {
    let mut set = seeded(4);
    assert!(set.insert(5));
    assert!(!set.insert(5));
    assert_eq!(set.len(), 1);
}

proptest! {
    #[test]
    fn agrees_with_btreeset(
        seed in any::<u64>(),
        ops in proptest::collection::vec((0u8..3, 0i32..64), 0..300),
    ) {
        let mut set = seeded(seed);
        let mut model = BTreeSet::new();

        for (op, key) in ops {
            match op {
                0 => prop_assert_eq!(set.insert(key), model.insert(key)),
                1 => prop_assert_eq!(set.contains(&key), model.contains(&key)),
                _ => prop_assert_eq!(set.remove(&key), model.remove(&key)),
            }
            prop_assert_eq!(set.len(), model.len());
        }
        prop_assert!(set.iter().eq(model.iter()));
        prop_assert!(set.iter().rev().eq(model.iter().rev()));
    }
}
