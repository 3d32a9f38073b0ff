use core::marker::PhantomData;

use cmt_core::{Field, Hasher};

/// A node of the Cartesian Merkle Tree.
///
/// Children are owned exclusively by their parent (see the ownership
/// discussion in the crate's design notes): a `Box<Node<H>>` can only ever
/// be reached through one parent link at a time, so rotations are free to
/// rewire pointers locally without ever creating a cycle or aliasing.
pub(crate) struct Node<H: Hasher> {
    pub(crate) key: Field,
    pub(crate) priority: Field,
    pub(crate) hash: Field,
    pub(crate) left: Option<Box<Node<H>>>,
    pub(crate) right: Option<Box<Node<H>>>,
    _hasher: PhantomData<H>,
}

impl<H: Hasher> Node<H> {
    /// Creates a new, childless node for `key`, with its hash already
    /// refreshed so it is valid the moment it becomes reachable.
    pub(crate) fn new(key: Field, priority: Field) -> Box<Self> {
        let mut node = Box::new(Node {
            key,
            priority,
            hash: Field::ZERO,
            left: None,
            right: None,
            _hasher: PhantomData,
        });

        node.refresh_hash();
        node
    }

    /// Recomputes `self.hash` from `self.key` and the current children's
    /// hashes. Must be called bottom-up after any structural change.
    pub(crate) fn refresh_hash(&mut self) {
        self.hash = H::node_hash(self.key, child_hash(&self.left), child_hash(&self.right));
    }
}

/// The hash of a child link, or [`Field::ZERO`] for an absent child.
pub(crate) fn child_hash<H: Hasher>(child: &Option<Box<Node<H>>>) -> Field {
    child.as_ref().map(|n| n.hash).unwrap_or(Field::ZERO)
}
