use cmt_core::{canonical_pair, Field, Hasher, FIELD_MODULUS};
use primitive_types::U256;
use serde::{Deserialize, Serialize};

use crate::node::{child_hash, Node};

/// A membership or non-membership proof for a single key against a single
/// root hash.
///
/// The wire layout is public: `siblings` is a flat sequence laid out as
/// `[leaf_left_h, leaf_right_h, anc1_key, anc1_sib_h, anc2_key,
/// anc2_sib_h, ...]`, with `siblings.len()` standing in for a separate
/// `siblings_length` wire field (deriving it from the vector avoids
/// keeping two lengths in sync). `direction_bits`
/// packs one bit per recorded pair, LSB produced last; see
/// [`Tree::prove`](crate::Tree::prove) and [`verify`] for the exact
/// encode/decode order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Proof {
    /// The root hash this proof was minted under.
    pub root: Field,
    /// Flat sibling sequence; see the struct-level docs for the layout.
    pub siblings: Vec<Field>,
    /// Packed per-level direction bits. Functionally redundant under a
    /// symmetric [`Hasher::node_hash`], but part of the normative wire
    /// format (see the crate's design notes).
    pub direction_bits: Field,
    /// `true` if `key` was found in the committed set.
    pub existence: bool,
    /// The key this proof was built for.
    pub key: Field,
    /// The vantage node's key for a non-existence proof; `0` when
    /// `existence` is `true` or the tree was empty.
    pub non_existence_key: Field,
}

impl Proof {
    /// Number of field elements in [`Proof::siblings`].
    pub fn siblings_length(&self) -> usize {
        self.siblings.len()
    }
}

/// Builds a proof for `key` by descending from `root`, recording the
/// leaf-context pair and then, unwinding the recursion, one `(key,
/// sibling_hash)` pair per ancestor — skipping the terminating node
/// itself, existence or not (see the crate's design notes on the
/// non-existence ambiguity).
pub(crate) fn build_proof<H: Hasher>(root: &Option<Box<Node<H>>>, key: Field) -> Proof {
    let Some(root_node) = root else {
        return Proof {
            root: Field::ZERO,
            siblings: Vec::new(),
            direction_bits: Field::ZERO,
            existence: false,
            key,
            non_existence_key: Field::ZERO,
        };
    };

    let (siblings, swaps, existence, non_existence_key) = prove_rec(root_node, key);

    let mut acc = U256::zero();
    for swap in &swaps {
        acc = (acc << 1) | U256::from(*swap as u64);
    }

    Proof {
        root: root_node.hash,
        siblings,
        direction_bits: Field(acc),
        existence,
        key,
        non_existence_key,
    }
}

fn prove_rec<H: Hasher>(node: &Node<H>, key: Field) -> (Vec<Field>, Vec<bool>, bool, Field) {
    if key < node.key {
        match &node.left {
            None => {
                let l = Field::ZERO;
                let r = child_hash(&node.right);
                let swap = canonical_pair(l, r).2;

                (vec![l, r], vec![swap], false, node.key)
            }
            Some(left_child) => {
                let (mut siblings, mut swaps, existence, nek) = prove_rec(left_child, key);

                let sibling = child_hash(&node.right);
                let swap = canonical_pair(left_child.hash, sibling).2;

                siblings.push(node.key);
                siblings.push(sibling);
                swaps.push(swap);

                (siblings, swaps, existence, nek)
            }
        }
    } else if key > node.key {
        match &node.right {
            None => {
                let l = child_hash(&node.left);
                let r = Field::ZERO;
                let swap = canonical_pair(l, r).2;

                (vec![l, r], vec![swap], false, node.key)
            }
            Some(right_child) => {
                let (mut siblings, mut swaps, existence, nek) = prove_rec(right_child, key);

                let sibling = child_hash(&node.left);
                let swap = canonical_pair(right_child.hash, sibling).2;

                siblings.push(node.key);
                siblings.push(sibling);
                swaps.push(swap);

                (siblings, swaps, existence, nek)
            }
        }
    } else {
        let l = child_hash(&node.left);
        let r = child_hash(&node.right);
        let swap = canonical_pair(l, r).2;

        (vec![l, r], vec![swap], true, Field::ZERO)
    }
}

/// Reconstructs the root hash implied by `proof` and checks it against
/// `expected_root` for `key`.
///
/// Panics if `proof` is structurally malformed (an odd sibling count, or
/// a nonzero count below 2) — that is a caller bug, not a verification
/// failure (see the crate's error handling notes).
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
