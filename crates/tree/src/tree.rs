use cmt_core::{Blake3FieldHasher, Field, Hasher};

use crate::node::{child_hash, Node};
use crate::proof::Proof;
use crate::rotate::{rotate_left, rotate_right};

/// A Cartesian Merkle Tree: an authenticated dynamic set that is
/// simultaneously BST-ordered on keys, max-heap-ordered on key-derived
/// priorities, and Merkle-committed on every subtree.
///
/// Generic over the [`Hasher`] so a different permutation can be plugged
/// in without forking the engine; [`Blake3FieldHasher`] is the default.
pub struct Tree<H: Hasher = Blake3FieldHasher> {
    pub(crate) root: Option<Box<Node<H>>>,
    len: usize,
}

/// Recursion past this depth emits a `tracing::warn!` as a diagnostic
/// signal that the key distribution may be adversarial; priorities are a
/// cryptographic hash of the key so expected depth is `O(log n)`, but the
/// core does not enforce a hard limit (see the crate's resource notes).
pub const DEFAULT_DEPTH_WARN: usize = 160;

impl<H: Hasher> Default for Tree<H> {
    fn default() -> Self {
        Tree {
            root: None,
            len: 0,
        }
    }
}

impl<H: Hasher> Tree<H> {
    /// Creates an empty tree.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of keys currently stored, counting duplicates.
    pub fn len(&self) -> usize {
        self.len
    }

    /// `true` if the tree holds no keys.
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// The Merkle commitment of the whole tree: `0` when empty, otherwise
    /// the root node's hash.
    pub fn root_hash(&self) -> Field {
        child_hash(&self.root)
    }

    /// Inserts `key`. Duplicate insertions are admitted: a second node is
    /// created for an already-present key rather than being deduplicated
    /// (see the crate's design notes on duplicates).
    #[tracing::instrument(level = "debug", skip(self))]
    pub fn insert(&mut self, key: Field) {
        let priority = H::priority(key);
        let node = Node::new(key, priority);

        self.root = Some(insert_rec(self.root.take(), node, 0));
        self.len += 1;

        tracing::debug!(root = ?self.root_hash(), "inserted key");
    }

    /// Standard BST lookup. With duplicates tie-broken to the right, an
    /// exact match is found at the shallowest node carrying that key.
    pub fn search(&self, key: Field) -> bool {
        let mut cursor = self.root.as_deref();

        while let Some(node) = cursor {
            if key == node.key {
                return true;
            } else if key < node.key {
                cursor = node.left.as_deref();
            } else {
                cursor = node.right.as_deref();
            }
        }

        false
    }

    /// Removes one occurrence of `key`. Returns `true` iff a node was
    /// found and removed; a key absent from the tree is a no-op that
    /// leaves the tree byte-identical and returns `false`.
    #[tracing::instrument(level = "debug", skip(self))]
    pub fn remove(&mut self, key: Field) -> bool {
        let (new_root, removed) = remove_rec(self.root.take(), key);
        self.root = new_root;

        if removed {
            self.len -= 1;
            tracing::debug!(root = ?self.root_hash(), "removed key");
        }

        removed
    }

    /// Builds a membership or non-membership proof for `key` against the
    /// tree's current root hash.
    pub fn prove(&self, key: Field) -> Proof {
        crate::proof::build_proof::<H>(&self.root, key)
    }

    /// An in-order walk over the stored keys. Not a first-class engine
    /// primitive (range queries and ordered iteration are out of scope);
    /// provided read-only, for tests and debugging that want to confirm
    /// BST order holds.
    pub fn iter(&self) -> impl Iterator<Item = Field> + '_ {
        let mut stack = Vec::new();
        let mut cursor = self.root.as_deref();

        core::iter::from_fn(move || loop {
            if let Some(node) = cursor {
                stack.push(node);
                cursor = node.left.as_deref();
                continue;
            }

            let node = stack.pop()?;
            cursor = node.right.as_deref();
            return Some(node.key);
        })
    }

    /// Walks the whole tree once, asserting that the BST, heap and Merkle
    /// invariants all hold. Intended for property tests, not the release
    /// API surface.
    #[cfg(any(test, debug_assertions))]
    pub fn check_invariants(&self) {
        fn walk<H: Hasher>(
            node: &Option<Box<Node<H>>>,
            lower: Option<Field>,
            upper: Option<Field>,
        ) {
            let Some(n) = node else { return };

            if let Some(lower) = lower {
                assert!(n.key >= lower, "BST invariant violated on the left bound");
            }
            if let Some(upper) = upper {
                assert!(n.key < upper, "BST invariant violated on the right bound");
            }

            if let Some(l) = &n.left {
                assert!(l.priority <= n.priority, "heap invariant violated");
            }
            if let Some(r) = &n.right {
                assert!(r.priority <= n.priority, "heap invariant violated");
            }

            let expected = H::node_hash(n.key, child_hash(&n.left), child_hash(&n.right));
            assert_eq!(n.hash, expected, "Merkle invariant violated");

            walk(&n.left, lower, Some(n.key));
            walk(&n.right, Some(n.key), upper);
        }

        walk::<H>(&self.root, None, None);
    }
}

fn insert_rec<H: Hasher>(
    node: Option<Box<Node<H>>>,
    new_node: Box<Node<H>>,
    depth: usize,
) -> Box<Node<H>> {
    if depth == DEFAULT_DEPTH_WARN {
        tracing::warn!(depth, "tree descent exceeded the soft depth warning threshold");
    }

    let Some(mut n) = node else {
        return new_node;
    };

    if new_node.key < n.key {
        let child = insert_rec(n.left.take(), new_node, depth + 1);
        n.left = Some(child);
        n.refresh_hash();

        if n.left.as_ref().unwrap().priority > n.priority {
            n = rotate_right(n);
        }
    } else {
        let child = insert_rec(n.right.take(), new_node, depth + 1);
        n.right = Some(child);
        n.refresh_hash();

        if n.right.as_ref().unwrap().priority > n.priority {
            n = rotate_left(n);
        }
    }

    n
}

fn remove_rec<H: Hasher>(
    node: Option<Box<Node<H>>>,
    key: Field,
) -> (Option<Box<Node<H>>>, bool) {
    let Some(mut n) = node else {
        return (None, false);
    };

    if key < n.key {
        let (new_left, found) = remove_rec(n.left.take(), key);
        n.left = new_left;
        if found {
            n.refresh_hash();
        }
        (Some(n), found)
    } else if key > n.key {
        let (new_right, found) = remove_rec(n.right.take(), key);
        n.right = new_right;
        if found {
            n.refresh_hash();
        }
        (Some(n), found)
    } else {
        (remove_target(n), true)
    }
}

/// Removes `n` itself via rotate-to-leaf deletion: the two-children case
/// rotates the higher-priority child up and recurses on `n` at its new,
/// deeper position until it has at most one child.
fn remove_target<H: Hasher>(mut n: Box<Node<H>>) -> Option<Box<Node<H>>> {
    match (n.left.take(), n.right.take()) {
        (None, None) => None,
        (Some(l), None) => Some(l),
        (None, Some(r)) => Some(r),
        (Some(l), Some(r)) => {
            if l.priority >= r.priority {
                n.left = Some(l);
                n.right = Some(r);

                let mut y = rotate_right(n);
                let sunk = y.right.take().expect("rotate_right places n as the right child");
                y.right = remove_target(sunk);
                y.refresh_hash();

                Some(y)
            } else {
                n.left = Some(l);
                n.right = Some(r);

                let mut y = rotate_left(n);
                let sunk = y.left.take().expect("rotate_left places n as the left child");
                y.left = remove_target(sunk);
                y.refresh_hash();

                Some(y)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn t() -> Tree {
        Tree::new()
    }

    #[test]
    fn empty_tree_boundary_behaviors() {
        let tree = t();

        assert_eq!(tree.root_hash(), Field::ZERO);
        assert!(!tree.search(Field::from_u64(1)));

        let mut mutable = t();
        assert!(!mutable.remove(Field::from_u64(1)));
    }

    #[test]
    fn single_node_root_hash() {
        let mut tree = t();
        tree.insert(Field::from_u64(50));

        let expected =
            Blake3FieldHasher::node_hash(Field::from_u64(50), Field::ZERO, Field::ZERO);
        assert_eq!(tree.root_hash(), expected);
    }

    #[test]
    fn s1_basic_inserts_and_search() {
        let mut tree = t();
        tree.insert(Field::from_u64(50));
        tree.insert(Field::from_u64(30));
        tree.insert(Field::from_u64(70));

        assert!(tree.search(Field::from_u64(50)));
        assert!(tree.search(Field::from_u64(30)));
        assert!(tree.search(Field::from_u64(70)));
        assert!(!tree.search(Field::from_u64(100)));
        assert_ne!(tree.root_hash(), Field::ZERO);

        tree.check_invariants();
    }

    #[test]
    fn s2_remove_changes_root_hash() {
        let mut tree = t();
        tree.insert(Field::from_u64(50));
        tree.insert(Field::from_u64(30));
        tree.insert(Field::from_u64(70));

        let root_before = tree.root_hash();

        assert!(tree.remove(Field::from_u64(70)));
        assert!(!tree.search(Field::from_u64(70)));
        assert_ne!(tree.root_hash(), root_before);

        tree.check_invariants();
    }

    #[test]
    fn s3_canonical_form_is_insertion_order_independent() {
        let mut a = t();
        a.insert(Field::from_u64(50));
        a.insert(Field::from_u64(30));
        a.insert(Field::from_u64(70));

        let mut b = t();
        b.insert(Field::from_u64(30));
        b.insert(Field::from_u64(70));
        b.insert(Field::from_u64(50));

        assert_eq!(a.root_hash(), b.root_hash());
    }

    #[test]
    fn remove_then_insert_idempotence() {
        let mut tree = t();
        for k in [50, 30, 70, 10, 40, 60, 90] {
            tree.insert(Field::from_u64(k));
        }

        let before = tree.root_hash();

        assert!(tree.remove(Field::from_u64(40)));
        tree.insert(Field::from_u64(40));

        assert_eq!(tree.root_hash(), before);
    }

    #[test]
    fn duplicate_insert_creates_second_node_and_changes_root() {
        let mut tree = t();
        tree.insert(Field::from_u64(50));

        let before = tree.root_hash();
        tree.insert(Field::from_u64(50));

        assert_ne!(tree.root_hash(), before);
        assert_eq!(tree.len(), 2);
        assert!(tree.search(Field::from_u64(50)));

        assert!(tree.remove(Field::from_u64(50)));
        assert_eq!(tree.len(), 1);
        assert!(tree.search(Field::from_u64(50)));
    }

    #[test]
    fn remove_absent_key_is_noop() {
        let mut tree = t();
        tree.insert(Field::from_u64(50));
        tree.insert(Field::from_u64(30));

        let before = tree.root_hash();
        assert!(!tree.remove(Field::from_u64(999)));
        assert_eq!(tree.root_hash(), before);
    }

    #[test]
    fn iter_yields_sorted_keys() {
        let mut tree = t();
        for k in [50, 30, 70, 10, 40] {
            tree.insert(Field::from_u64(k));
        }

        let collected: Vec<_> = tree.iter().collect();
        let mut sorted = collected.clone();
        sorted.sort();

        assert_eq!(collected, sorted);
    }
}
