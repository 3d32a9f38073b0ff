use hashbrown::HashMap;
use serde::{Deserialize, Serialize};

use cmt_core::Field;

/// Sentinel index meaning "no child" / "no node here".
pub const NIL: u64 = 0;

/// A single arena-resident node: the same `(key, priority, hash)` triple as
/// the transient realization, with child links as `u64` indices instead of
/// owned pointers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct NodeRecord {
    /// The stored key.
    pub key: Field,
    /// `H(key)`, cached at insert time.
    pub priority: Field,
    /// The Merkle commitment of this node's subtree.
    pub hash: Field,
    /// Left child index, or [`NIL`].
    pub left: u64,
    /// Right child index, or [`NIL`].
    pub right: u64,
}

/// Errors surfaced at the storage boundary.
///
/// The engine's own algorithms treat every read of a live index as
/// infallible by contract (an index the engine holds was always written
/// before being read back); these variants exist for embedders plugging in
/// a fallible backend (an on-disk map, a remote KV store) where corruption
/// or an unexpected miss is a real possibility.
#[derive(Debug, thiserror::Error)]
pub enum ArenaError {
    /// A lookup for `index` found no record.
    #[error("arena storage has no node at index {0}")]
    NodeNotFound(u64),
    /// The backend detected a structural inconsistency it cannot recover
    /// from on its own (a truncated record, a checksum mismatch, ...).
    #[error("arena storage corrupt: {0}")]
    Corrupt(&'static str),
}

/// The pluggable backend behind [`crate::Tree`].
///
/// Mirrors the split between a backend trait and a concrete in-memory
/// implementation used elsewhere in this codebase for tree storage: the
/// engine's rotation, insert and remove logic is written entirely against
/// this trait, so swapping [`InMemoryStorage`] for an on-disk or
/// network-backed map never touches the algorithmic core.
pub trait Storage {
    /// Looks up the record at `index`.
    fn get(&self, index: u64) -> Result<NodeRecord, ArenaError>;

    /// Writes (or overwrites) the record at `index`.
    fn set(&mut self, index: u64, record: NodeRecord);

    /// Removes the record at `index`, if any.
    fn remove(&mut self, index: u64);
}

/// The default, always-available [`Storage`] realization: a plain in-memory
/// map. This is what [`crate::Tree`] uses unless an embedder supplies a
/// different backend.
#[derive(Debug, Default, Clone)]
pub struct InMemoryStorage {
    nodes: HashMap<u64, NodeRecord>,
}

impl Storage for InMemoryStorage {
    fn get(&self, index: u64) -> Result<NodeRecord, ArenaError> {
        self.nodes
            .get(&index)
            .copied()
            .ok_or(ArenaError::NodeNotFound(index))
    }

    fn set(&mut self, index: u64, record: NodeRecord) {
        self.nodes.insert(index, record);
    }

    fn remove(&mut self, index: u64) {
        self.nodes.remove(&index);
    }
}
