use core::marker::PhantomData;

use cmt_core::{Blake3FieldHasher, Field, Hasher};

use crate::storage::{InMemoryStorage, NodeRecord, Storage, NIL};

/// Recursion past this depth emits a `tracing::warn!`, mirroring the
/// transient realization's soft depth warning.
pub const DEFAULT_DEPTH_WARN: usize = 160;

/// The persistent, index-addressed realization of the Cartesian Merkle
/// Tree: the same treap engine as [`cmt::Tree`], reimplemented over an
/// index-keyed node table with a free list so nodes can be written to and
/// reclaimed from long-lived storage rather than the process heap.
///
/// Given the same sequence of keys, `Tree::root_hash` is bit-identical to
/// the transient realization's, because both share the same [`Hasher`]
/// contract and the same rotation algorithms — only the representation of
/// child links (owned pointers vs. `u64` indices) differs.
pub struct Tree<H: Hasher = Blake3FieldHasher, S: Storage = InMemoryStorage> {
    storage: S,
    pub(crate) root_index: u64,
    next_node_index: u64,
    deleted_indices_head: u64,
    deleted_indices: hashbrown::HashMap<u64, u64>,
    len: usize,
    _hasher: PhantomData<H>,
}

impl<H: Hasher, S: Storage + Default> Default for Tree<H, S> {
    fn default() -> Self {
        Tree {
            storage: S::default(),
            root_index: NIL,
            next_node_index: 1,
            deleted_indices_head: NIL,
            deleted_indices: hashbrown::HashMap::new(),
            len: 0,
            _hasher: PhantomData,
        }
    }
}

impl<H: Hasher, S: Storage + Default> Tree<H, S> {
    /// Creates an empty arena-backed tree using `S`'s default construction.
    pub fn new() -> Self {
        Self::default()
    }
}

impl<H: Hasher, S: Storage> Tree<H, S> {
    /// Creates an empty tree over an already-constructed storage backend.
    pub fn with_storage(storage: S) -> Self {
        Tree {
            storage,
            root_index: NIL,
            next_node_index: 1,
            deleted_indices_head: NIL,
            deleted_indices: hashbrown::HashMap::new(),
            len: 0,
            _hasher: PhantomData,
        }
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
        self.child_hash(self.root_index)
    }

    /// Inserts `key`. Duplicate insertions are admitted, exactly as in the
    /// transient realization.
    #[tracing::instrument(level = "debug", skip(self))]
    pub fn insert(&mut self, key: Field) {
        let priority = H::priority(key);
        let hash = H::node_hash(key, Field::ZERO, Field::ZERO);

        let idx = self.alloc(NodeRecord {
            key,
            priority,
            hash,
            left: NIL,
            right: NIL,
        });

        self.root_index = self.insert_rec(self.root_index, idx, 0);
        self.len += 1;

        tracing::debug!(root = ?self.root_hash(), "inserted key");
    }

    /// Standard BST lookup over the index-addressed table.
    pub fn search(&self, key: Field) -> bool {
        let mut cursor = self.root_index;

        while cursor != NIL {
            let n = self.node(cursor);

            if key == n.key {
                return true;
            } else if key < n.key {
                cursor = n.left;
            } else {
                cursor = n.right;
            }
        }

        false
    }

    /// Removes one occurrence of `key`, reclaiming its slot onto the free
    /// list. Returns `true` iff a node was found and removed.
    #[tracing::instrument(level = "debug", skip(self))]
    pub fn remove(&mut self, key: Field) -> bool {
        let (new_root, removed) = self.remove_rec(self.root_index, key);
        self.root_index = new_root;

        if removed {
            self.len -= 1;
            tracing::debug!(root = ?self.root_hash(), "removed key");
        }

        removed
    }

    /// An in-order walk over the stored keys, for tests and debugging.
    pub fn iter(&self) -> impl Iterator<Item = Field> + '_ {
        let mut stack = Vec::new();
        let mut cursor = self.root_index;

        core::iter::from_fn(move || loop {
            if cursor != NIL {
                stack.push(cursor);
                cursor = self.node(cursor).left;
                continue;
            }

            let idx = stack.pop()?;
            let n = self.node(idx);
            cursor = n.right;
            return Some(n.key);
        })
    }

    /// Walks the whole tree once, asserting that the BST, heap and Merkle
    /// invariants all hold, and that every reachable index round-trips
    /// through storage. Intended for property tests, not the release API
    /// surface.
    #[cfg(any(test, debug_assertions))]
    pub fn check_invariants(&self) {
        fn walk<H: Hasher, S: Storage>(
            tree: &Tree<H, S>,
            idx: u64,
            lower: Option<Field>,
            upper: Option<Field>,
        ) {
            if idx == NIL {
                return;
            }

            let n = tree.node(idx);

            if let Some(lower) = lower {
                assert!(n.key >= lower, "BST invariant violated on the left bound");
            }
            if let Some(upper) = upper {
                assert!(n.key < upper, "BST invariant violated on the right bound");
            }

            if n.left != NIL {
                assert!(
                    tree.node(n.left).priority <= n.priority,
                    "heap invariant violated"
                );
            }
            if n.right != NIL {
                assert!(
                    tree.node(n.right).priority <= n.priority,
                    "heap invariant violated"
                );
            }

            let expected = H::node_hash(n.key, tree.child_hash(n.left), tree.child_hash(n.right));
            assert_eq!(n.hash, expected, "Merkle invariant violated");

            walk(tree, n.left, lower, Some(n.key));
            walk(tree, n.right, Some(n.key), upper);
        }

        walk(self, self.root_index, None, None);
    }

    pub(crate) fn node(&self, idx: u64) -> NodeRecord {
        self.storage
            .get(idx)
            .expect("arena storage corrupt: engine holds a live index with no backing record")
    }

    pub(crate) fn child_hash(&self, idx: u64) -> Field {
        if idx == NIL {
            Field::ZERO
        } else {
            self.node(idx).hash
        }
    }

    fn set_node(&mut self, idx: u64, record: NodeRecord) {
        self.storage.set(idx, record);
    }

    fn refresh_hash(&mut self, idx: u64) {
        let mut n = self.node(idx);
        n.hash = H::node_hash(n.key, self.child_hash(n.left), self.child_hash(n.right));
        self.set_node(idx, n);
    }

    /// Pops a slot from the free list when non-empty, otherwise
    /// post-increments the high-water mark. `O(1)` either way.
    fn alloc(&mut self, record: NodeRecord) -> u64 {
        let idx = if self.deleted_indices_head != NIL {
            let idx = self.deleted_indices_head;
            self.deleted_indices_head = self.deleted_indices.remove(&idx).unwrap_or(NIL);
            idx
        } else {
            let idx = self.next_node_index;
            self.next_node_index += 1;
            idx
        };

        // Fully overwriting the slot (rather than patching fields) is what
        // keeps a popped slot free of the stale left/right links its
        // previous occupant left behind.
        self.storage.set(idx, record);
        idx
    }

    fn free(&mut self, idx: u64) {
        self.storage.remove(idx);
        self.deleted_indices.insert(idx, self.deleted_indices_head);
        self.deleted_indices_head = idx;
    }

    fn insert_rec(&mut self, node_idx: u64, new_idx: u64, depth: usize) -> u64 {
        if depth == DEFAULT_DEPTH_WARN {
            tracing::warn!(depth, "arena descent exceeded the soft depth warning threshold");
        }

        if node_idx == NIL {
            return new_idx;
        }

        let mut n = self.node(node_idx);
        let new_key = self.node(new_idx).key;

        if new_key < n.key {
            let child = self.insert_rec(n.left, new_idx, depth + 1);
            n.left = child;
            self.set_node(node_idx, n);
            self.refresh_hash(node_idx);

            let n = self.node(node_idx);
            if self.node(n.left).priority > n.priority {
                self.rotate_right(node_idx)
            } else {
                node_idx
            }
        } else {
            let child = self.insert_rec(n.right, new_idx, depth + 1);
            n.right = child;
            self.set_node(node_idx, n);
            self.refresh_hash(node_idx);

            let n = self.node(node_idx);
            if self.node(n.right).priority > n.priority {
                self.rotate_left(node_idx)
            } else {
                node_idx
            }
        }
    }

    /// Rotates `x`'s left child up; see `cmt::rotate::rotate_right`'s
    /// ASCII-art doc for the shape. Panics if `x` has no left child.
    fn rotate_right(&mut self, x_idx: u64) -> u64 {
        let mut x = self.node(x_idx);
        let y_idx = x.left;
        assert_ne!(y_idx, NIL, "rotate_right requires a left child");
        let mut y = self.node(y_idx);

        x.left = y.right;
        self.set_node(x_idx, x);
        self.refresh_hash(x_idx);

        y.right = x_idx;
        self.set_node(y_idx, y);
        self.refresh_hash(y_idx);

        y_idx
    }

    /// Mirror of [`Tree::rotate_right`]. Panics if `x` has no right child.
    fn rotate_left(&mut self, x_idx: u64) -> u64 {
        let mut x = self.node(x_idx);
        let y_idx = x.right;
        assert_ne!(y_idx, NIL, "rotate_left requires a right child");
        let mut y = self.node(y_idx);

        x.right = y.left;
        self.set_node(x_idx, x);
        self.refresh_hash(x_idx);

        y.left = x_idx;
        self.set_node(y_idx, y);
        self.refresh_hash(y_idx);

        y_idx
    }

    fn remove_rec(&mut self, node_idx: u64, key: Field) -> (u64, bool) {
        if node_idx == NIL {
            return (NIL, false);
        }

        let mut n = self.node(node_idx);

        if key < n.key {
            let (new_left, found) = self.remove_rec(n.left, key);
            if found {
                n.left = new_left;
                self.set_node(node_idx, n);
                self.refresh_hash(node_idx);
            }
            (node_idx, found)
        } else if key > n.key {
            let (new_right, found) = self.remove_rec(n.right, key);
            if found {
                n.right = new_right;
                self.set_node(node_idx, n);
                self.refresh_hash(node_idx);
            }
            (node_idx, found)
        } else {
            (self.remove_target(node_idx), true)
        }
    }

    /// Removes the node at `idx` itself via rotate-to-leaf deletion,
    /// reclaiming its slot once it reaches a childless position.
    fn remove_target(&mut self, idx: u64) -> u64 {
        let n = self.node(idx);

        match (n.left, n.right) {
            (NIL, NIL) => {
                self.free(idx);
                NIL
            }
            (l, NIL) => {
                self.free(idx);
                l
            }
            (NIL, r) => {
                self.free(idx);
                r
            }
            (l, r) => {
                let l_priority = self.node(l).priority;
                let r_priority = self.node(r).priority;

                if l_priority >= r_priority {
                    let y_idx = self.rotate_right(idx);
                    let mut y = self.node(y_idx);
                    let sunk = y.right;
                    y.right = self.remove_target(sunk);
                    self.set_node(y_idx, y);
                    self.refresh_hash(y_idx);
                    y_idx
                } else {
                    let y_idx = self.rotate_left(idx);
                    let mut y = self.node(y_idx);
                    let sunk = y.left;
                    y.left = self.remove_target(sunk);
                    self.set_node(y_idx, y);
                    self.refresh_hash(y_idx);
                    y_idx
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::InMemoryStorage;

    fn t() -> Tree<Blake3FieldHasher, InMemoryStorage> {
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
    fn basic_inserts_and_search() {
        let mut tree = t();
        tree.insert(Field::from_u64(50));
        tree.insert(Field::from_u64(30));
        tree.insert(Field::from_u64(70));

        assert!(tree.search(Field::from_u64(50)));
        assert!(tree.search(Field::from_u64(30)));
        assert!(tree.search(Field::from_u64(70)));
        assert!(!tree.search(Field::from_u64(100)));

        tree.check_invariants();
    }

    #[test]
    fn canonical_form_is_insertion_order_independent() {
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
    fn remove_reclaims_slot_via_free_list() {
        let mut tree = t();
        tree.insert(Field::from_u64(50));
        tree.insert(Field::from_u64(30));

        assert_eq!(tree.next_node_index, 3);
        assert!(tree.remove(Field::from_u64(30)));
        assert_eq!(tree.deleted_indices_head, 2);

        tree.insert(Field::from_u64(90));
        // the freed slot (index 2) is reused instead of growing the table
        assert_eq!(tree.next_node_index, 3);
        assert_eq!(tree.deleted_indices_head, NIL);

        tree.check_invariants();
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

        assert!(tree.remove(Field::from_u64(50)));
        assert_eq!(tree.len(), 1);
        assert!(tree.search(Field::from_u64(50)));
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
