use primitive_types::U256;
use serde::{Deserialize, Serialize};

use cmt_core::{canonical_pair, Field, Hasher, FIELD_MODULUS};

use crate::storage::{NodeRecord, Storage, NIL};
use crate::Tree;

/// A membership or non-membership proof, identical in shape and wire
/// layout to the transient realization's proof type (see that crate's
/// design notes for the encoding) so the two realizations are
/// interchangeable at the verification boundary.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Proof {
    /// The root hash this proof was minted under.
    pub root: Field,
    /// Flat sibling sequence: `[leaf_left_h, leaf_right_h, anc1_key,
    /// anc1_sib_h, ...]`.
    pub siblings: Vec<Field>,
    /// Packed per-level direction bits.
    pub direction_bits: Field,
    /// `true` if `key` was found in the committed set.
    pub existence: bool,
    /// The key this proof was built for.
    pub key: Field,
    /// The vantage node's key for a non-existence proof; `0` otherwise.
    pub non_existence_key: Field,
}

impl Proof {
    /// Number of field elements in [`Proof::siblings`].
    pub fn siblings_length(&self) -> usize {
        self.siblings.len()
    }
}

impl<H: Hasher, S: Storage> Tree<H, S> {
    /// Builds a proof for `key` against the arena's current root hash.
    pub fn prove(&self, key: Field) -> Proof {
        if self.root_index == NIL {
            return Proof {
                root: Field::ZERO,
                siblings: Vec::new(),
                direction_bits: Field::ZERO,
                existence: false,
                key,
                non_existence_key: Field::ZERO,
            };
        }

        let (siblings, swaps, existence, non_existence_key) =
            self.prove_rec(self.root_index, key);

        let mut acc = U256::zero();
        for swap in &swaps {
            acc = (acc << 1) | U256::from(*swap as u64);
        }

        Proof {
            root: self.root_hash(),
            siblings,
            direction_bits: Field(acc),
            existence,
            key,
            non_existence_key,
        }
    }

    fn prove_rec(&self, idx: u64, key: Field) -> (Vec<Field>, Vec<bool>, bool, Field) {
        let n: NodeRecord = self.node(idx);

        if key < n.key {
            if n.left == NIL {
                let l = Field::ZERO;
                let r = self.child_hash(n.right);
                let swap = canonical_pair(l, r).2;

                (vec![l, r], vec![swap], false, n.key)
            } else {
                let (mut siblings, mut swaps, existence, nek) = self.prove_rec(n.left, key);

                let left_hash = self.child_hash(n.left);
                let sibling = self.child_hash(n.right);
                let swap = canonical_pair(left_hash, sibling).2;

                siblings.push(n.key);
                siblings.push(sibling);
                swaps.push(swap);

                (siblings, swaps, existence, nek)
            }
        } else if key > n.key {
            if n.right == NIL {
                let l = self.child_hash(n.left);
                let r = Field::ZERO;
                let swap = canonical_pair(l, r).2;

                (vec![l, r], vec![swap], false, n.key)
            } else {
                let (mut siblings, mut swaps, existence, nek) = self.prove_rec(n.right, key);

                let right_hash = self.child_hash(n.right);
                let sibling = self.child_hash(n.left);
                let swap = canonical_pair(right_hash, sibling).2;

                siblings.push(n.key);
                siblings.push(sibling);
                swaps.push(swap);

                (siblings, swaps, existence, nek)
            }
        } else {
            let l = self.child_hash(n.left);
            let r = self.child_hash(n.right);
            let swap = canonical_pair(l, r).2;

            (vec![l, r], vec![swap], true, Field::ZERO)
        }
    }
}

/// Reconstructs the root hash implied by `proof` and checks it against
/// `expected_root` for `key`. Byte-for-byte the same algorithm as the
/// transient realization's verifier, since the wire format is shared.
///
/// Panics on a structurally malformed proof (a caller bug, not a
/// verification failure).
pub fn verify<H: Hasher>(proof: &Proof, expected_root: Field, key: Field) -> bool {
    if proof.root != expected_root {
        return false;
    }

    if proof.siblings.is_empty() {
        return !proof.existence;
    }

    assert!(
        proof.siblings.len() >= 2,
        "malformed proof: siblings shorter than the leaf-context pair"
    );
    assert!(
        proof.siblings.len() % 2 == 0,
        "malformed proof: odd siblings length"
    );

    let leaf_key = if proof.existence {
        key
    } else {
        proof.non_existence_key
    };

    let mut h = H::node_hash(leaf_key, proof.siblings[0], proof.siblings[1]);
    let mut bits = proof.direction_bits.0 % FIELD_MODULUS;

    let mut i = 2;
    while i + 1 < proof.siblings.len() {
        let anc_key = proof.siblings[i];
        let sibling_hash = proof.siblings[i + 1];

        let bit_set = (bits & U256::one()) == U256::one();
        bits >>= 1;

        h = if !bit_set {
            H::node_hash(anc_key, h, sibling_hash)
        } else {
            H::node_hash(anc_key, sibling_hash, h)
        };

        i += 2;
    }

    h == expected_root
}

#[cfg(test)]
mod tests {
    use cmt_core::Blake3FieldHasher;

    use super::*;
    use crate::storage::InMemoryStorage;

    fn t() -> Tree<Blake3FieldHasher, InMemoryStorage> {
        Tree::new()
    }

    #[test]
    fn empty_arena_proof() {
        let tree = t();
        let proof = tree.prove(Field::from_u64(42));

        assert!(!proof.existence);
        assert_eq!(proof.siblings_length(), 0);
        assert!(verify::<Blake3FieldHasher>(&proof, Field::ZERO, Field::from_u64(42)));
    }

    #[test]
    fn existence_and_non_existence_roundtrip() {
        let mut tree = t();
        tree.insert(Field::from_u64(50));
        tree.insert(Field::from_u64(30));
        tree.insert(Field::from_u64(70));

        for k in [50, 30, 70] {
            let proof = tree.prove(Field::from_u64(k));
            assert!(proof.existence);
            assert!(verify::<Blake3FieldHasher>(
                &proof,
                tree.root_hash(),
                Field::from_u64(k)
            ));
        }

        let proof = tree.prove(Field::from_u64(40));
        assert!(!proof.existence);
        assert!(verify::<Blake3FieldHasher>(
            &proof,
            tree.root_hash(),
            Field::from_u64(40)
        ));
    }
}
