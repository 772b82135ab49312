//! Randomised differential tests against `std::collections::BTreeMap`.

use std::collections::BTreeMap;

use bptree_map::BPlusTreeMap;
use paste::paste;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};

/// Every `CHECK_EVERY` operations the full structure is validated.
const CHECK_EVERY: usize = 97;

fn assert_same(tree: &BPlusTreeMap<i32, i32>, model: &BTreeMap<i32, i32>) {
    assert_eq!(tree.len(), model.len());
    assert!(tree.iter().eq(model.iter()), "iteration order diverged");
    assert_eq!(tree.first(), model.first_key_value());
    assert_eq!(tree.last(), model.last_key_value());
}

fn insert_then_erase_shuffled(capacity: usize, n: i32, seed: u64) {
    let mut rng = StdRng::seed_from_u64(seed);
    let mut tree = BPlusTreeMap::new(capacity).unwrap();
    let mut model = BTreeMap::new();

    let mut keys: Vec<i32> = (0..n).collect();
    keys.shuffle(&mut rng);
    for (step, &k) in keys.iter().enumerate() {
        let (_, inserted) = tree.insert(k, k * 7);
        assert_eq!(inserted, model.insert(k, k * 7).is_none());
        if step % CHECK_EVERY == 0 {
            tree.check_invariants_detailed().unwrap();
        }
    }
    tree.check_invariants_detailed().unwrap();
    assert_same(&tree, &model);

    keys.shuffle(&mut rng);
    for (step, &k) in keys.iter().enumerate() {
        assert_eq!(tree.remove(&k), model.remove(&k));
        if step % CHECK_EVERY == 0 {
            tree.check_invariants_detailed().unwrap();
            assert_same(&tree, &model);
        }
    }
    tree.check_invariants_detailed().unwrap();
    assert!(tree.is_empty());
    assert_eq!(tree.height(), 1);
}

fn mixed_operations(capacity: usize, ops: usize, seed: u64) {
    let mut rng = StdRng::seed_from_u64(seed);
    let mut tree = BPlusTreeMap::new(capacity).unwrap();
    let mut model = BTreeMap::new();
    let key_space = (ops / 4).max(16) as i32;

    for step in 0..ops {
        let k = rng.gen_range(0..key_space);
        match rng.gen_range(0..10) {
            0..=4 => {
                let v = rng.gen::<i32>();
                let was_present = model.contains_key(&k);
                let (cursor, inserted) = tree.insert(k, v);
                let expected = *model.entry(k).or_insert(v);
                assert_eq!(inserted, !was_present);
                assert_eq!(tree.entry_at(cursor).unwrap(), (&k, &expected));
            }
            5..=7 => {
                assert_eq!(tree.erase(&k), usize::from(model.remove(&k).is_some()));
            }
            8 => {
                let lower = tree.lower_bound(&k);
                let expected = model.range(k..).next();
                assert_eq!(tree.entry_at(lower).ok(), expected);
                let upper = tree.upper_bound(&k);
                let expected = model.range(k + 1..).next();
                assert_eq!(tree.entry_at(upper).ok(), expected);
            }
            _ => {
                let end = k + rng.gen_range(0..32);
                let removed = tree.erase_range(k..end);
                let doomed: Vec<i32> = model.range(k..end).map(|(k, _)| *k).collect();
                assert_eq!(removed, doomed.len());
                for d in doomed {
                    model.remove(&d);
                }
            }
        }
        assert_eq!(tree.len(), model.len());
        if step % CHECK_EVERY == 0 {
            tree.check_invariants_detailed().unwrap();
            assert_same(&tree, &model);
        }
    }
    tree.check_invariants_detailed().unwrap();
    assert_same(&tree, &model);
}

fn range_queries(capacity: usize, seed: u64) {
    let mut rng = StdRng::seed_from_u64(seed);
    let mut tree = BPlusTreeMap::new(capacity).unwrap();
    let mut model = BTreeMap::new();
    for _ in 0..2_000 {
        let k = rng.gen_range(-5_000..5_000);
        tree.insert(k, k);
        model.insert(k, k);
    }

    for _ in 0..200 {
        let a = rng.gen_range(-6_000..6_000);
        let b = a + rng.gen_range(0..1_500);
        assert!(tree.range(a..b).eq(model.range(a..b)));
        assert!(tree.range(a..=b).eq(model.range(a..=b)));
        assert!(tree.range(..b).eq(model.range(..b)));
        assert!(tree.range(a..).eq(model.range(a..)));
    }
}

macro_rules! capacity_tests {
    ($($capacity:literal),* $(,)?) => {
        paste! {
            $(
                #[test]
                fn [<insert_then_erase_shuffled_capacity_ $capacity>]() {
                    insert_then_erase_shuffled($capacity, 2_000, 0xB7EE + $capacity);
                }

                #[test]
                fn [<mixed_operations_capacity_ $capacity>]() {
                    mixed_operations($capacity, 10_000, 0x5EED + $capacity);
                }

                #[test]
                fn [<range_queries_capacity_ $capacity>]() {
                    range_queries($capacity, 0xA11 + $capacity);
                }
            )*
        }
    };
}

capacity_tests!(2, 3, 4, 5, 8, 16, 64);

#[test]
fn large_sequential_workload() {
    let mut tree = BPlusTreeMap::with_default_capacity();
    let mut model = BTreeMap::new();
    for i in 0..10_000 {
        tree.insert(i, i);
        model.insert(i, i);
    }
    for i in (0..10_000).step_by(3) {
        assert_eq!(tree.remove(&i), model.remove(&i));
    }
    tree.check_invariants_detailed().unwrap();
    assert_same(&tree, &model);

    while let Some(entry) = tree.pop_last() {
        assert_eq!(Some(entry), model.pop_last());
    }
    assert!(model.is_empty());
    tree.check_invariants_detailed().unwrap();
}
