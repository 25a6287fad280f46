use core::borrow::Borrow;
use core::cell::Cell;

use crate::error::TreeError;

use super::arena::Arena;
use super::handle::Handle;
use super::node::{InternalNode, LeafNode, MAX_KEYS, Node, SearchResult};

/// The core B+Tree implementation backing `BpTreeMap`.
pub(crate) struct RawBpTreeMap<K, V> {
    /// Arena storing all tree nodes.
    nodes: Arena<Node<K>>,
    /// Arena storing all values (separate from nodes for cache efficiency).
    values: Arena<V>,
    /// Handle to the root node, if the tree is non-empty.
    root: Option<Handle>,
    /// Total number of key-value pairs in the tree.
    len: usize,
    /// Handle to the first (leftmost) leaf, where forward iteration starts.
    first_leaf: Option<Handle>,
    /// Handle to the last (rightmost) leaf, for O(1) largest-key queries.
    last_leaf: Option<Handle>,
    /// Diagnostic counter: nodes touched by `search` descents. Interior
    /// mutability keeps lookups `&self`; the counter carries no semantics.
    node_visits: Cell<u64>,
}

/// What an insertion reported back to the level above.
///
/// A splitting child hands its parent a promotion: the divider key (largest
/// key remaining in the left half) and the new right sibling. This replaces
/// any ad hoc carrier node; structural outcomes are values, not tree nodes.
pub(crate) enum InsertResult<K> {
    /// Insertion completed without structural change.
    Done,
    /// The key was already present; nothing changed.
    Rejected,
    /// A node split; the parent must absorb the promotion.
    Split {
        /// The divider key for the new sibling (largest-left).
        divider: K,
        /// Handle to the new right sibling.
        right: Handle,
    },
}

impl<K, V> RawBpTreeMap<K, V> {
    /// Creates a new, empty tree.
    pub(crate) const fn new() -> Self {
        Self {
            nodes: Arena::new(),
            values: Arena::new(),
            root: None,
            len: 0,
            first_leaf: None,
            last_leaf: None,
            node_visits: Cell::new(0),
        }
    }

    /// Creates a new tree with the specified capacity.
    pub(crate) fn with_capacity(capacity: usize) -> Self {
        Self {
            nodes: Arena::with_capacity(capacity.div_ceil(MAX_KEYS)),
            values: Arena::with_capacity(capacity),
            root: None,
            len: 0,
            first_leaf: None,
            last_leaf: None,
            node_visits: Cell::new(0),
        }
    }

    /// Returns the number of key-value pairs in the tree.
    pub(crate) const fn len(&self) -> usize {
        self.len
    }

    /// Returns true if the tree contains no elements.
    pub(crate) const fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Returns the capacity of the tree.
    pub(crate) fn capacity(&self) -> usize {
        self.values.capacity()
    }

    /// Clears all elements from the tree.
    pub(crate) fn clear(&mut self) {
        self.nodes.clear();
        self.values.clear();
        self.root = None;
        self.len = 0;
        self.first_leaf = None;
        self.last_leaf = None;
    }

    /// Returns the handle to the first leaf, if any.
    pub(crate) fn first_leaf(&self) -> Option<Handle> {
        self.first_leaf
    }

    /// Returns a reference to a node by handle.
    pub(crate) fn node(&self, handle: Handle) -> &Node<K> {
        self.nodes.get(handle)
    }

    /// Returns a reference to a value by handle.
    pub(crate) fn value(&self, handle: Handle) -> &V {
        self.values.get(handle)
    }

    /// Returns the number of nodes visited by `search` descents so far.
    pub(crate) fn node_visits(&self) -> u64 {
        self.node_visits.get()
    }

    /// Resets the node-visit counter to zero.
    pub(crate) fn reset_node_visits(&self) {
        self.node_visits.set(0);
    }

    /// Drains all key-value pairs from the tree by walking the leaf chain.
    /// O(n): the multi-level index is simply discarded afterwards.
    pub(crate) fn drain_to_vec(&mut self) -> alloc::vec::Vec<(K, V)> {
        let mut result = alloc::vec::Vec::with_capacity(self.len);
        let mut current = self.first_leaf;

        while let Some(leaf_handle) = current {
            let leaf = self.nodes.get_mut(leaf_handle).as_leaf_mut();
            let next = leaf.next();
            let (keys, value_handles) = leaf.take_all();

            for (key, vh) in keys.into_iter().zip(value_handles) {
                let value = self.values.take(vh);
                result.push((key, value));
            }

            current = next;
        }

        self.clear();
        result
    }
}

impl<K: Clone + Ord, V> RawBpTreeMap<K, V> {
    /// Single top-down descent resolving a key to its leaf position.
    /// Returns the leaf handle and the index within it, or `None` on a miss.
    /// Every node touched bumps the diagnostic visit counter.
    pub(crate) fn search<Q>(&self, key: &Q) -> Option<(Handle, usize)>
    where
        K: Borrow<Q>,
        Q: ?Sized + Ord,
    {
        let mut current = self.root?;

        loop {
            self.node_visits.set(self.node_visits.get() + 1);
            match self.nodes.get(current) {
                Node::Internal(internal) => {
                    current = internal.child(internal.locate(key));
                }
                Node::Leaf(leaf) => {
                    return match leaf.search(key) {
                        SearchResult::Found(idx) => Some((current, idx)),
                        SearchResult::NotFound(_) => None,
                    };
                }
            }
        }
    }

    /// Returns a reference to the value corresponding to the key.
    pub(crate) fn get<Q>(&self, key: &Q) -> Option<&V>
    where
        K: Borrow<Q>,
        Q: ?Sized + Ord,
    {
        let (leaf_handle, idx) = self.search(key)?;
        let leaf = self.nodes.get(leaf_handle).as_leaf();
        Some(self.values.get(leaf.value(idx)))
    }

    /// Returns the key-value pair corresponding to the key.
    pub(crate) fn get_key_value<Q>(&self, key: &Q) -> Option<(&K, &V)>
    where
        K: Borrow<Q>,
        Q: ?Sized + Ord,
    {
        let (leaf_handle, idx) = self.search(key)?;
        let leaf = self.nodes.get(leaf_handle).as_leaf();
        Some((leaf.key(idx), self.values.get(leaf.value(idx))))
    }

    /// Returns true if the tree contains the specified key.
    pub(crate) fn contains_key<Q>(&self, key: &Q) -> bool
    where
        K: Borrow<Q>,
        Q: ?Sized + Ord,
    {
        self.search(key).is_some()
    }

    /// Returns the first (smallest-key) pair in the tree.
    pub(crate) fn first_key_value(&self) -> Option<(&K, &V)> {
        let leaf = self.nodes.get(self.first_leaf?).as_leaf();
        debug_assert!(leaf.key_count() > 0);
        Some((leaf.key(0), self.values.get(leaf.value(0))))
    }

    /// Returns the last (largest-key) pair in the tree.
    pub(crate) fn last_key_value(&self) -> Option<(&K, &V)> {
        let leaf = self.nodes.get(self.last_leaf?).as_leaf();
        let count = leaf.key_count();
        debug_assert!(count > 0);
        Some((leaf.key(count - 1), self.values.get(leaf.value(count - 1))))
    }

    /// Inserts a key-value pair into the tree.
    ///
    /// An already-present key is rejected: the stored value is retained, `len`
    /// is unchanged, and `Err(TreeError::DuplicateKey)` reports the outcome.
    /// The duplicate check happens at the leaf before any structural change,
    /// so a duplicate never triggers a split.
    pub(crate) fn insert(&mut self, key: K, value: V) -> Result<(), TreeError> {
        let Some(root) = self.root else {
            // Empty tree: the new leaf is root, first, and last at once.
            let value_handle = self.values.alloc(value);
            let mut leaf = LeafNode::new();
            leaf.push(key, value_handle);
            let leaf_handle = self.nodes.alloc(Node::Leaf(leaf));
            self.root = Some(leaf_handle);
            self.first_leaf = Some(leaf_handle);
            self.last_leaf = Some(leaf_handle);
            self.len = 1;
            return Ok(());
        };

        match self.insert_into(root, key, value) {
            InsertResult::Done => Ok(()),
            InsertResult::Rejected => Err(TreeError::DuplicateKey),
            InsertResult::Split { divider, right } => {
                // Root promotion: a brand-new internal root with exactly two
                // children separated by the promoted divider. The promotion
                // stops here; there is no parent to report to.
                let mut new_root = InternalNode::new();
                new_root.set_first_child(root);
                new_root.push_child(divider, right);
                self.root = Some(self.nodes.alloc(Node::Internal(new_root)));
                Ok(())
            }
        }
    }

    /// Recursive insertion descent. Leaf-level placement happens at the
    /// bottom; splits propagate back up as `InsertResult::Split` promotions.
    fn insert_into(&mut self, node: Handle, key: K, value: V) -> InsertResult<K> {
        let (child_idx, child) = match self.nodes.get(node) {
            Node::Leaf(_) => return self.insert_into_leaf(node, key, value),
            Node::Internal(internal) => {
                let idx = internal.locate(&key);
                (idx, internal.child(idx))
            }
        };

        match self.insert_into(child, key, value) {
            InsertResult::Split { divider, right } => {
                // The child split: its divider and new sibling wedge in here,
                // the sibling immediately right of the divider.
                let internal = self.nodes.get_mut(node).as_internal_mut();
                internal.insert_child(child_idx, divider, right);
                if internal.key_count() <= MAX_KEYS {
                    return InsertResult::Done;
                }

                let (promoted, right_half) = internal.split();
                let right_handle = self.nodes.alloc(Node::Internal(right_half));
                InsertResult::Split {
                    divider: promoted,
                    right: right_handle,
                }
            }
            other => other,
        }
    }

    fn insert_into_leaf(&mut self, node: Handle, key: K, value: V) -> InsertResult<K> {
        let leaf = self.nodes.get_mut(node).as_leaf_mut();
        let idx = match leaf.search(&key) {
            SearchResult::Found(_) => return InsertResult::Rejected,
            SearchResult::NotFound(idx) => idx,
        };

        let value_handle = self.values.alloc(value);
        let leaf = self.nodes.get_mut(node).as_leaf_mut();
        leaf.insert(idx, key, value_handle);
        self.len += 1;

        if leaf.key_count() <= MAX_KEYS {
            InsertResult::Done
        } else {
            self.split_leaf(node)
        }
    }

    /// Splits an overfull leaf and splices the new right sibling into the
    /// leaf chain immediately after it.
    fn split_leaf(&mut self, node: Handle) -> InsertResult<K> {
        let leaf = self.nodes.get_mut(node).as_leaf_mut();
        let (divider, mut right) = leaf.split();
        // The sibling inherits the left leaf's old next pointer.
        right.set_next(leaf.next());

        let right_handle = self.nodes.alloc(Node::Leaf(right));
        self.nodes.get_mut(node).as_leaf_mut().set_next(Some(right_handle));

        if self.last_leaf == Some(node) {
            self.last_leaf = Some(right_handle);
        }

        InsertResult::Split {
            divider,
            right: right_handle,
        }
    }

    /// Finds the first position with key `>` the given key. Same descent as
    /// [`Self::lower_bound`], stepping past an exact match.
    pub(crate) fn upper_bound<Q>(&self, key: &Q) -> Option<(Handle, usize)>
    where
        K: Borrow<Q>,
        Q: ?Sized + Ord,
    {
        let mut current = self.root?;

        loop {
            match self.nodes.get(current) {
                Node::Internal(internal) => {
                    current = internal.child(internal.locate(key));
                }
                Node::Leaf(leaf) => {
                    let idx = match leaf.search(key) {
                        SearchResult::Found(idx) => idx + 1,
                        SearchResult::NotFound(idx) => idx,
                    };
                    if idx < leaf.key_count() {
                        return Some((current, idx));
                    }
                    return leaf.next().map(|next| (next, 0));
                }
            }
        }
    }

    /// Finds the first position with key `>=` the given key, descending at
    /// each internal node into the leftmost child whose divider is `>=` it.
    /// Returns `(leaf_handle, index)`, or `None` if every stored key is
    /// smaller. This is where bounded range scans start.
    pub(crate) fn lower_bound<Q>(&self, key: &Q) -> Option<(Handle, usize)>
    where
        K: Borrow<Q>,
        Q: ?Sized + Ord,
    {
        let mut current = self.root?;

        loop {
            match self.nodes.get(current) {
                Node::Internal(internal) => {
                    current = internal.child(internal.locate(key));
                }
                Node::Leaf(leaf) => {
                    let idx = match leaf.search(key) {
                        SearchResult::Found(idx) | SearchResult::NotFound(idx) => idx,
                    };
                    if idx < leaf.key_count() {
                        return Some((current, idx));
                    }
                    // Every key here is smaller; the next leaf (if any)
                    // starts with the first larger key.
                    return leaf.next().map(|next| (next, 0));
                }
            }
        }
    }
}
