#![warn(missing_docs)]

//! The persistent, index-addressed realization of the Cartesian Merkle
//! Tree.
//!
//! [`Tree`] reimplements the same treap engine as `cmt::Tree` — the same
//! insert/remove rotations, the same canonical hashing, the same proof
//! protocol — over a `u64`-indexed node table with a free list, so that a
//! host can persist the tree across process restarts (a smart-contract
//! storage layer, an embedded KV store) instead of keeping it on the heap.
//! Given the same sequence of inserted keys, both realizations commit to
//! the same root hash.
//!
//! ```
//! use cmt_arena::Tree;
//! use cmt_core::Field;
//!
//! let mut tree: Tree = Tree::new();
//! tree.insert(Field::from_u64(50));
//! tree.insert(Field::from_u64(30));
//! tree.insert(Field::from_u64(70));
//!
//! let proof = tree.prove(Field::from_u64(30));
//! assert!(cmt_arena::verify::<cmt_core::Blake3FieldHasher>(&proof, tree.root_hash(), Field::from_u64(30)));
//! ```

mod engine;
mod proof;
mod storage;

pub use engine::{Tree, DEFAULT_DEPTH_WARN};
pub use proof::{verify, Proof};
pub use storage::{ArenaError, InMemoryStorage, NodeRecord, Storage, NIL};
