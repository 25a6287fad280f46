use core::borrow::Borrow;

use smallvec::SmallVec;

use super::handle::Handle;

/// The maximum fanout (number of children) for a B+Tree node. Small under
/// test so unit tests exercise multi-level trees and splits cheaply.
#[cfg(test)]
pub(crate) const ORDER: usize = 5;
#[cfg(not(test))]
pub(crate) const ORDER: usize = 64;

pub(crate) const MAX_CHILDREN: usize = ORDER;
pub(crate) const MAX_KEYS: usize = MAX_CHILDREN - 1;
/// The minimum split boundary: a split leaves `MID` keys (leaf) or `MID`
/// children (internal) in the left node.
pub(crate) const MID: usize = ORDER.div_ceil(2);

#[allow(clippy::large_enum_variant)]
pub(crate) enum Node<K> {
    Internal(InternalNode<K>),
    Leaf(LeafNode<K>),
}

// B+Tree: internal nodes store divider keys and child handles. We define
// dividers such that keys[i] equals the largest key in children[i]'s subtree
// (largest left); children[len - 1] roots the keys greater than every divider.
pub(crate) struct InternalNode<K> {
    // +1 allows an overflowing key/child to be staged in place before a split.
    keys: SmallVec<[K; MAX_KEYS + 1]>,
    children: SmallVec<[Handle; MAX_CHILDREN + 1]>,
}

// B+Tree: leaf nodes store keys, value handles, and the link to the next leaf
// in key order. The link is an explicit field rather than a trailing ref slot
// so key/value shifting can never clobber it.
pub(crate) struct LeafNode<K> {
    next: Option<Handle>,
    // +1 allows the overflowing pair to be staged in place before a split.
    keys: SmallVec<[K; MAX_KEYS + 1]>,
    values: SmallVec<[Handle; MAX_KEYS + 1]>,
}

/// Result of searching for a key in a leaf.
pub(crate) enum SearchResult {
    /// Key was found at the given index.
    Found(usize),
    /// Key was not found; index is where it would be inserted.
    NotFound(usize),
}

impl<K> Node<K> {
    /// Returns the leaf node, panicking if this is not a leaf.
    pub(crate) fn as_leaf(&self) -> &LeafNode<K> {
        match self {
            Node::Leaf(leaf) => leaf,
            Node::Internal(_) => panic!("expected leaf node"),
        }
    }

    /// Returns the leaf node mutably, panicking if this is not a leaf.
    pub(crate) fn as_leaf_mut(&mut self) -> &mut LeafNode<K> {
        match self {
            Node::Leaf(leaf) => leaf,
            Node::Internal(_) => panic!("expected leaf node"),
        }
    }

    /// Returns the internal node mutably, panicking if this is not internal.
    pub(crate) fn as_internal_mut(&mut self) -> &mut InternalNode<K> {
        match self {
            Node::Internal(internal) => internal,
            Node::Leaf(_) => panic!("expected internal node"),
        }
    }
}

impl<K> InternalNode<K> {
    /// Creates a new empty internal node.
    pub(crate) fn new() -> Self {
        Self {
            keys: SmallVec::new(),
            children: SmallVec::new(),
        }
    }

    /// Returns the number of divider keys in this node.
    pub(crate) fn key_count(&self) -> usize {
        self.keys.len()
    }

    /// Returns the number of children in this node.
    #[cfg(test)]
    pub(crate) fn child_count(&self) -> usize {
        self.children.len()
    }

    /// Returns the divider key at the given index.
    #[cfg(test)]
    #[inline]
    pub(crate) fn key(&self, index: usize) -> &K {
        &self.keys[index]
    }

    /// Returns the child handle at the given index.
    #[inline]
    pub(crate) fn child(&self, index: usize) -> Handle {
        self.children[index]
    }

    /// Finds the index of the child to descend into for the given key: the
    /// smallest `i` with `key <= keys[i]`, or the last child if the key
    /// exceeds every divider.
    #[inline]
    pub(crate) fn locate<Q>(&self, key: &Q) -> usize
    where
        K: Borrow<Q>,
        Q: ?Sized + Ord,
    {
        // keys[i] is the max key in children[i]'s subtree, so the first
        // divider >= key names the correct child. Binary search returns
        // Ok(i) on an exact divider hit and Err(i) at the insertion point;
        // both are the child index we want.
        match self.keys.binary_search_by(|k| k.borrow().cmp(key)) {
            Ok(idx) | Err(idx) => idx,
        }
    }

    /// Inserts a divider key and the child to its right at the given position.
    pub(crate) fn insert_child(&mut self, index: usize, key: K, child: Handle) {
        self.keys.insert(index, key);
        self.children.insert(index + 1, child);
    }

    /// Sets the first child (to the left of every divider key).
    pub(crate) fn set_first_child(&mut self, child: Handle) {
        if self.children.is_empty() {
            self.children.push(child);
        } else {
            self.children[0] = child;
        }
    }

    /// Pushes a divider key and child to the end.
    pub(crate) fn push_child(&mut self, key: K, child: Handle) {
        self.keys.push(key);
        self.children.push(child);
    }

    /// Splits this overfull node. Returns `(promoted_key, right_sibling)`.
    ///
    /// The node must hold `ORDER` staged keys. The left (this) node keeps the
    /// first `MID` children and `MID - 1` keys, the right sibling takes the
    /// rest, and the middle key is promoted to the parent - it is removed
    /// from both halves, which is the asymmetry that distinguishes internal
    /// splits from leaf splits.
    pub(crate) fn split(&mut self) -> (K, InternalNode<K>) {
        debug_assert_eq!(self.keys.len(), MAX_KEYS + 1);

        let mut right = InternalNode::new();
        right.keys = self.keys.drain(MID..).collect();
        right.children = self.children.drain(MID..).collect();

        // The key at MID - 1 separates the halves; it moves up, not sideways.
        let promoted = self.keys.pop().unwrap();

        (promoted, right)
    }
}

impl<K> LeafNode<K> {
    /// Creates a new empty leaf node.
    pub(crate) fn new() -> Self {
        Self {
            next: None,
            keys: SmallVec::new(),
            values: SmallVec::new(),
        }
    }

    /// Returns the number of keys in this leaf.
    pub(crate) fn key_count(&self) -> usize {
        self.keys.len()
    }

    /// Returns the next leaf handle in the chain.
    pub(crate) fn next(&self) -> Option<Handle> {
        self.next
    }

    /// Sets the next leaf handle.
    pub(crate) fn set_next(&mut self, next: Option<Handle>) {
        self.next = next;
    }

    /// Returns the key at the given index.
    #[inline]
    pub(crate) fn key(&self, index: usize) -> &K {
        &self.keys[index]
    }

    /// Returns the value handle at the given index.
    #[inline]
    pub(crate) fn value(&self, index: usize) -> Handle {
        self.values[index]
    }

    /// Returns the last key, if any.
    pub(crate) fn last_key(&self) -> Option<&K> {
        self.keys.last()
    }

    /// Searches for a key in this leaf.
    #[inline]
    pub(crate) fn search<Q>(&self, key: &Q) -> SearchResult
    where
        K: Borrow<Q>,
        Q: ?Sized + Ord,
    {
        match self.keys.binary_search_by(|k| k.borrow().cmp(key)) {
            Ok(idx) => SearchResult::Found(idx),
            Err(idx) => SearchResult::NotFound(idx),
        }
    }

    /// Inserts a key and value handle at the given position, shifting later
    /// pairs one slot right.
    pub(crate) fn insert(&mut self, index: usize, key: K, value: Handle) {
        self.keys.insert(index, key);
        self.values.insert(index, value);
    }

    /// Pushes a key and value handle to the end.
    pub(crate) fn push(&mut self, key: K, value: Handle) {
        self.keys.push(key);
        self.values.push(value);
    }

    /// Takes ownership of all keys and value handles, leaving the leaf empty.
    pub(crate) fn take_all(&mut self) -> (SmallVec<[K; MAX_KEYS + 1]>, SmallVec<[Handle; MAX_KEYS + 1]>) {
        let keys = core::mem::take(&mut self.keys);
        let values = core::mem::take(&mut self.values);
        (keys, values)
    }

    /// Splits this overfull leaf. Returns `(divider_key, right_sibling)`.
    ///
    /// The leaf must hold `ORDER` staged pairs. The left (this) node keeps the
    /// first `MID` pairs and the right sibling takes the rest; the divider is
    /// the largest key remaining in the left node (largest-left convention).
    /// The caller splices the sibling into the leaf chain.
    pub(crate) fn split(&mut self) -> (K, LeafNode<K>)
    where
        K: Clone,
    {
        debug_assert_eq!(self.keys.len(), MAX_KEYS + 1);

        let mut right = LeafNode::new();
        right.keys = self.keys.drain(MID..).collect();
        right.values = self.values.drain(MID..).collect();

        let divider = self.keys.last().unwrap().clone();

        (divider, right)
    }
}
