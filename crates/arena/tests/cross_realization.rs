use proptest::collection;
use proptest::prelude::*;

use cmt::Tree as TransientTree;
use cmt_arena::Tree as ArenaTree;
use cmt_core::Field;

fn roots_match(keys: &[u64]) -> bool {
    let mut transient: TransientTree = TransientTree::new();
    let mut arena: ArenaTree = ArenaTree::new();

    for &k in keys {
        let key = Field::from_u64(k);
        transient.insert(key);
        arena.insert(key);
    }

    transient.root_hash() == arena.root_hash()
}

#[test]
fn empty_trees_agree() {
    assert!(roots_match(&[]));
}

#[test]
fn concrete_insert_sequence_agrees() {
    assert!(roots_match(&[50, 30, 70, 10, 40, 60, 90]));
}

#[test]
fn insert_then_remove_then_reinsert_agrees() {
    let mut transient: TransientTree = TransientTree::new();
    let mut arena: ArenaTree = ArenaTree::new();

    for k in [50, 30, 70, 10, 40, 60, 90] {
        let key = Field::from_u64(k);
        transient.insert(key);
        arena.insert(key);
    }

    assert!(transient.remove(Field::from_u64(40)));
    assert!(arena.remove(Field::from_u64(40)));
    assert_eq!(transient.root_hash(), arena.root_hash());

    transient.insert(Field::from_u64(40));
    arena.insert(Field::from_u64(40));
    assert_eq!(transient.root_hash(), arena.root_hash());
}

#[test]
fn duplicate_keys_agree() {
    assert!(roots_match(&[50, 50, 30, 50, 70]));
}

proptest! {
    #[test]
    fn random_insert_sequences_produce_identical_roots(
        keys in collection::vec(0u64..1_000u64, 0..60)
    ) {
        prop_assert!(roots_match(&keys));
    }

    #[test]
    fn random_insert_and_remove_sequences_produce_identical_roots(
        keys in collection::vec(1u64..200u64, 1..40),
    ) {
        let mut transient: TransientTree = TransientTree::new();
        let mut arena: ArenaTree = ArenaTree::new();

        for &k in &keys {
            let key = Field::from_u64(k);
            transient.insert(key);
            arena.insert(key);
        }
        prop_assert_eq!(transient.root_hash(), arena.root_hash());

        for &k in keys.iter().step_by(2) {
            let key = Field::from_u64(k);
            let t_removed = transient.remove(key);
            let a_removed = arena.remove(key);
            prop_assert_eq!(t_removed, a_removed);
        }

        prop_assert_eq!(transient.root_hash(), arena.root_hash());
    }
}
