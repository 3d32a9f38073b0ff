#![warn(missing_docs)]

//! A Cartesian Merkle Tree: a treap-shaped authenticated dynamic set.
//!
//! Every node simultaneously satisfies a binary-search ordering on keys,
//! a max-heap ordering on key-derived priorities, and a Merkle commitment
//! on its subtree. Because priorities are a pure function of the key
//! alone and the node hash is canonically symmetric in its two child
//! hashes, any permutation of the same key set commits to the same root
//! hash regardless of insertion order.
//!
//! ```
//! use cmt::Tree;
//! use cmt_core::Field;
//!
//! let mut tree: Tree = Tree::new();
//! tree.insert(Field::from_u64(50));
//! tree.insert(Field::from_u64(30));
//! tree.insert(Field::from_u64(70));
//!
//! let proof = tree.prove(Field::from_u64(30));
//! assert!(cmt::verify::<cmt_core::Blake3FieldHasher>(&proof, tree.root_hash(), Field::from_u64(30)));
//! ```

mod node;
mod proof;
mod rotate;
mod tree;

pub use proof::{verify, Proof};
pub use tree::{Tree, DEFAULT_DEPTH_WARN};
