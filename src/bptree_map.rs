use core::borrow::Borrow;
use core::fmt;
use core::iter::FusedIterator;
use core::ops::{Bound, Index, RangeBounds};

use crate::error::TreeError;
use crate::raw::{Handle, RawBpTreeMap};

mod capacity;

/// An ordered map based on a [B+Tree].
///
/// A B+Tree is a multi-level index: internal nodes hold only divider keys,
/// every key/value pair lives in a leaf, and leaves are chained in key order.
/// Point lookups descend the index in O(log n) node visits; range scans find
/// their starting leaf once and then walk the chain sequentially. Each divider
/// key equals the largest key in its left subtree (the *largest-left*
/// convention), so keys `<=` a divider are found to its left and keys `>` it
/// to its right.
///
/// Keys must implement [`Ord`]. Unlike the standard library's `BTreeMap`,
/// [`insert`](BpTreeMap::insert) rejects a key that is already present - the
/// stored value is retained and the caller is told via
/// [`TreeError::DuplicateKey`]. The map is payload-agnostic: values are
/// whatever the caller supplies (a row identifier, a tuple reference, and so
/// on) and are never inspected.
///
/// Key removal is not supported; this index only ever grows. There is no
/// internal locking - share a `BpTreeMap` across threads only behind external
/// synchronization.
///
/// # Examples
///
/// ```
/// use bptree::BpTreeMap;
///
/// let mut map = BpTreeMap::new();
/// map.insert(3, "c")?;
/// map.insert(1, "a")?;
/// map.insert(2, "b")?;
///
/// assert_eq!(map.get(&2), Some(&"b"));
/// assert_eq!(map.len(), 3);
///
/// // Iteration is in key order, courtesy of the leaf chain.
/// let keys: Vec<i32> = map.keys().copied().collect();
/// assert_eq!(keys, [1, 2, 3]);
/// # Ok::<(), bptree::TreeError>(())
/// ```
///
/// [B+Tree]: https://en.wikipedia.org/wiki/B%2B_tree
pub struct BpTreeMap<K, V> {
    raw: RawBpTreeMap<K, V>,
}

/// An iterator over the entries of a `BpTreeMap`, in ascending key order.
///
/// This `struct` is created by the [`iter`] method on [`BpTreeMap`]. It walks
/// the leaf chain without touching the tree's internal levels.
///
/// [`iter`]: BpTreeMap::iter
#[must_use = "iterators are lazy and do nothing unless consumed"]
pub struct Iter<'a, K, V> {
    tree: &'a RawBpTreeMap<K, V>,
    leaf: Option<Handle>,
    index: usize,
    remaining: usize,
}

/// An iterator over the keys of a `BpTreeMap`.
///
/// This `struct` is created by the [`keys`] method on [`BpTreeMap`].
///
/// [`keys`]: BpTreeMap::keys
#[must_use = "iterators are lazy and do nothing unless consumed"]
pub struct Keys<'a, K, V> {
    inner: Iter<'a, K, V>,
}

/// An iterator over the values of a `BpTreeMap`.
///
/// This `struct` is created by the [`values`] method on [`BpTreeMap`].
///
/// [`values`]: BpTreeMap::values
#[must_use = "iterators are lazy and do nothing unless consumed"]
pub struct Values<'a, K, V> {
    inner: Iter<'a, K, V>,
}

/// An iterator over a sub-range of entries in a `BpTreeMap`.
///
/// This `struct` is created by the [`range`] method on [`BpTreeMap`]. Both
/// endpoints are resolved to leaf positions up front; iteration is then a
/// plain leaf-chain walk with no further key comparisons.
///
/// [`range`]: BpTreeMap::range
#[must_use = "iterators are lazy and do nothing unless consumed"]
pub struct Range<'a, K, V> {
    tree: &'a RawBpTreeMap<K, V>,
    /// Next position to yield, if any.
    front: Option<(Handle, usize)>,
    /// First position past the range; `None` means "end of chain".
    stop: Option<(Handle, usize)>,
}

/// An owning iterator over the entries of a `BpTreeMap`, in ascending key
/// order, created by the [`IntoIterator`] implementation.
pub struct IntoIter<K, V> {
    inner: alloc::vec::IntoIter<(K, V)>,
}

impl<K, V> BpTreeMap<K, V> {
    /// Makes a new, empty `BpTreeMap`.
    ///
    /// Does not allocate anything on its own.
    ///
    /// # Examples
    ///
    /// ```
    /// use bptree::BpTreeMap;
    ///
    /// let mut map = BpTreeMap::new();
    /// map.insert(1, "a")?;
    /// # Ok::<(), bptree::TreeError>(())
    /// ```
    #[must_use]
    pub const fn new() -> BpTreeMap<K, V> {
        BpTreeMap {
            raw: RawBpTreeMap::new(),
        }
    }

    /// Returns the number of key-value pairs in the map.
    ///
    /// Duplicate-rejected inserts do not count.
    ///
    /// # Examples
    ///
    /// ```
    /// use bptree::BpTreeMap;
    ///
    /// let mut map = BpTreeMap::new();
    /// map.insert(1, "a")?;
    /// let _ = map.insert(1, "again");
    /// assert_eq!(map.len(), 1);
    /// # Ok::<(), bptree::TreeError>(())
    /// ```
    #[must_use]
    pub const fn len(&self) -> usize {
        self.raw.len()
    }

    /// Returns `true` if the map contains no elements.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.raw.is_empty()
    }

    /// Clears the map, removing all elements.
    pub fn clear(&mut self) {
        self.raw.clear();
    }

    /// Returns the number of tree nodes visited by lookups so far.
    ///
    /// This is a diagnostic for performance testing (e.g. average node visits
    /// per probe); it has no effect on map semantics. Only point lookups
    /// (`get`, `get_key_value`, `contains_key`) count descents.
    #[must_use]
    pub fn node_visits(&self) -> u64 {
        self.raw.node_visits()
    }

    /// Resets the node-visit diagnostic counter to zero.
    pub fn reset_node_visits(&self) {
        self.raw.reset_node_visits();
    }
}

impl<K: Clone + Ord, V> BpTreeMap<K, V> {
    /// Returns a reference to the value corresponding to the key, or `None`
    /// if the key is absent. A miss is not an error.
    ///
    /// The key may be any borrowed form of the map's key type, but the
    /// ordering on the borrowed form *must* match the ordering on the key
    /// type.
    ///
    /// # Examples
    ///
    /// ```
    /// use bptree::BpTreeMap;
    ///
    /// let mut map = BpTreeMap::new();
    /// map.insert(1, "a")?;
    /// assert_eq!(map.get(&1), Some(&"a"));
    /// assert_eq!(map.get(&2), None);
    /// # Ok::<(), bptree::TreeError>(())
    /// ```
    pub fn get<Q>(&self, key: &Q) -> Option<&V>
    where
        K: Borrow<Q>,
        Q: ?Sized + Ord,
    {
        self.raw.get(key)
    }

    /// Returns the key-value pair corresponding to the supplied key.
    pub fn get_key_value<Q>(&self, key: &Q) -> Option<(&K, &V)>
    where
        K: Borrow<Q>,
        Q: ?Sized + Ord,
    {
        self.raw.get_key_value(key)
    }

    /// Returns `true` if the map contains a value for the specified key.
    pub fn contains_key<Q>(&self, key: &Q) -> bool
    where
        K: Borrow<Q>,
        Q: ?Sized + Ord,
    {
        self.raw.contains_key(key)
    }

    /// Inserts a key-value pair into the map.
    ///
    /// If the key is already present the insert is **rejected**: the stored
    /// value is retained, the map is unchanged, and
    /// `Err(TreeError::DuplicateKey)` is returned. No previous value is ever
    /// handed back - this map does not overwrite.
    ///
    /// # Errors
    ///
    /// [`TreeError::DuplicateKey`] if the key is already present.
    ///
    /// # Examples
    ///
    /// ```
    /// use bptree::{BpTreeMap, TreeError};
    ///
    /// let mut map = BpTreeMap::new();
    /// assert_eq!(map.insert(37, "a"), Ok(()));
    /// assert_eq!(map.insert(37, "b"), Err(TreeError::DuplicateKey));
    /// assert_eq!(map.get(&37), Some(&"a"));
    /// ```
    pub fn insert(&mut self, key: K, value: V) -> Result<(), TreeError> {
        self.raw.insert(key, value)
    }

    /// Returns the smallest key in the map.
    ///
    /// O(1): reads the head of the leaf chain.
    ///
    /// # Errors
    ///
    /// [`TreeError::Empty`] if the map contains no keys.
    ///
    /// # Examples
    ///
    /// ```
    /// use bptree::{BpTreeMap, TreeError};
    ///
    /// let mut map = BpTreeMap::new();
    /// assert_eq!(map.first_key(), Err(TreeError::Empty));
    /// map.insert(2, "b")?;
    /// map.insert(1, "a")?;
    /// assert_eq!(map.first_key(), Ok(&1));
    /// # Ok::<(), bptree::TreeError>(())
    /// ```
    pub fn first_key(&self) -> Result<&K, TreeError> {
        self.raw.first_key_value().map(|(k, _)| k).ok_or(TreeError::Empty)
    }

    /// Returns the largest key in the map.
    ///
    /// O(1): reads the tail of the leaf chain.
    ///
    /// # Errors
    ///
    /// [`TreeError::Empty`] if the map contains no keys.
    pub fn last_key(&self) -> Result<&K, TreeError> {
        self.raw.last_key_value().map(|(k, _)| k).ok_or(TreeError::Empty)
    }

    /// Returns the first (smallest-key) key-value pair in the map, or `None`
    /// if it is empty.
    #[allow(clippy::must_use_candidate)]
    pub fn first_key_value(&self) -> Option<(&K, &V)> {
        self.raw.first_key_value()
    }

    /// Returns the last (largest-key) key-value pair in the map, or `None`
    /// if it is empty.
    #[allow(clippy::must_use_candidate)]
    pub fn last_key_value(&self) -> Option<(&K, &V)> {
        self.raw.last_key_value()
    }

    /// Gets an iterator over a sub-range of entries in the map, in ascending
    /// key order.
    ///
    /// A malformed range (start greater than end) yields no entries rather
    /// than panicking.
    ///
    /// # Examples
    ///
    /// ```
    /// use bptree::BpTreeMap;
    ///
    /// let mut map = BpTreeMap::new();
    /// for key in [3, 5, 8, 13] {
    ///     map.insert(key, key * 2)?;
    /// }
    ///
    /// let in_range: Vec<i32> = map.range(4..13).map(|(k, _)| *k).collect();
    /// assert_eq!(in_range, [5, 8]);
    /// # Ok::<(), bptree::TreeError>(())
    /// ```
    pub fn range<T, R>(&self, range: R) -> Range<'_, K, V>
    where
        T: ?Sized + Ord,
        K: Borrow<T>,
        R: RangeBounds<T>,
    {
        Range::new(&self.raw, &range)
    }

    /// Returns a new, independent map containing the entries with keys
    /// strictly less than `to_key`.
    ///
    /// The result is a copy, not a view: later mutation of `self` is not
    /// observable through it.
    ///
    /// # Examples
    ///
    /// ```
    /// use bptree::BpTreeMap;
    ///
    /// let mut map = BpTreeMap::new();
    /// for key in [1, 2, 3, 4] {
    ///     map.insert(key, key)?;
    /// }
    ///
    /// let head = map.head_map(&3);
    /// let keys: Vec<i32> = head.keys().copied().collect();
    /// assert_eq!(keys, [1, 2]);
    /// # Ok::<(), bptree::TreeError>(())
    /// ```
    #[must_use]
    pub fn head_map(&self, to_key: &K) -> BpTreeMap<K, V>
    where
        V: Clone,
    {
        self.collect_range(self.range((Bound::Unbounded, Bound::Excluded(to_key))))
    }

    /// Returns a new, independent map containing the entries with keys
    /// greater than or equal to `from_key`.
    #[must_use]
    pub fn tail_map(&self, from_key: &K) -> BpTreeMap<K, V>
    where
        V: Clone,
    {
        self.collect_range(self.range((Bound::Included(from_key), Bound::Unbounded)))
    }

    /// Returns a new, independent map containing the entries with keys in
    /// `[from_key, to_key)`.
    ///
    /// A malformed range (`from_key > to_key`) yields an empty map.
    ///
    /// # Examples
    ///
    /// ```
    /// use bptree::BpTreeMap;
    ///
    /// let mut map = BpTreeMap::new();
    /// for key in [1, 2, 3, 4, 5] {
    ///     map.insert(key, key * 10)?;
    /// }
    ///
    /// let sub = map.sub_map(&2, &5);
    /// let keys: Vec<i32> = sub.keys().copied().collect();
    /// assert_eq!(keys, [2, 3, 4]);
    /// assert!(map.sub_map(&5, &2).is_empty());
    /// # Ok::<(), bptree::TreeError>(())
    /// ```
    #[must_use]
    pub fn sub_map(&self, from_key: &K, to_key: &K) -> BpTreeMap<K, V>
    where
        V: Clone,
    {
        self.collect_range(self.range((Bound::Included(from_key), Bound::Excluded(to_key))))
    }

    fn collect_range(&self, range: Range<'_, K, V>) -> BpTreeMap<K, V>
    where
        V: Clone,
    {
        let mut out = BpTreeMap::new();
        for (key, value) in range {
            // Keys scanned off one tree are unique, so this cannot reject.
            let _ = out.raw.insert(key.clone(), value.clone());
        }
        out
    }

    /// Gets an iterator over the entries of the map, sorted by key.
    ///
    /// # Examples
    ///
    /// ```
    /// use bptree::BpTreeMap;
    ///
    /// let mut map = BpTreeMap::new();
    /// map.insert(3, "c")?;
    /// map.insert(1, "a")?;
    /// map.insert(2, "b")?;
    ///
    /// let first = map.iter().next();
    /// assert_eq!(first, Some((&1, &"a")));
    /// # Ok::<(), bptree::TreeError>(())
    /// ```
    pub fn iter(&self) -> Iter<'_, K, V> {
        Iter {
            tree: &self.raw,
            leaf: self.raw.first_leaf(),
            index: 0,
            remaining: self.raw.len(),
        }
    }

    /// Gets an iterator over the keys of the map, in sorted order.
    pub fn keys(&self) -> Keys<'_, K, V> {
        Keys { inner: self.iter() }
    }

    /// Gets an iterator over the values of the map, in order by key.
    pub fn values(&self) -> Values<'_, K, V> {
        Values { inner: self.iter() }
    }
}

impl<K, V> Default for BpTreeMap<K, V> {
    fn default() -> Self {
        Self::new()
    }
}

impl<K: fmt::Debug + Clone + Ord, V: fmt::Debug> fmt::Debug for BpTreeMap<K, V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_map().entries(self.iter()).finish()
    }
}

impl<K: Clone + Ord, V: Clone> Clone for BpTreeMap<K, V> {
    fn clone(&self) -> Self {
        self.iter().map(|(k, v)| (k.clone(), v.clone())).collect()
    }
}

impl<K: Clone + Ord, V: PartialEq> PartialEq for BpTreeMap<K, V> {
    fn eq(&self, other: &Self) -> bool {
        self.len() == other.len() && self.iter().eq(other.iter())
    }
}

impl<K: Clone + Ord, V: Eq> Eq for BpTreeMap<K, V> {}

/// Builds a map from a sequence of pairs. The first occurrence of each key
/// wins; later duplicates are rejected per the insert policy.
impl<K: Clone + Ord, V> FromIterator<(K, V)> for BpTreeMap<K, V> {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut map = BpTreeMap::new();
        map.extend(iter);
        map
    }
}

impl<K: Clone + Ord, V> Extend<(K, V)> for BpTreeMap<K, V> {
    fn extend<I: IntoIterator<Item = (K, V)>>(&mut self, iter: I) {
        for (key, value) in iter {
            // Duplicates are dropped, matching the insert policy.
            let _ = self.raw.insert(key, value);
        }
    }
}

impl<K: Clone + Ord, V, const N: usize> From<[(K, V); N]> for BpTreeMap<K, V> {
    fn from(entries: [(K, V); N]) -> Self {
        entries.into_iter().collect()
    }
}

impl<K, Q, V> Index<&Q> for BpTreeMap<K, V>
where
    K: Borrow<Q> + Clone + Ord,
    Q: ?Sized + Ord,
{
    type Output = V;

    /// Returns a reference to the value corresponding to the supplied key.
    ///
    /// # Panics
    ///
    /// Panics if the key is not present in the `BpTreeMap`.
    fn index(&self, key: &Q) -> &V {
        self.get(key).expect("no entry found for key")
    }
}

impl<'a, K: Clone + Ord, V> IntoIterator for &'a BpTreeMap<K, V> {
    type Item = (&'a K, &'a V);
    type IntoIter = Iter<'a, K, V>;

    fn into_iter(self) -> Iter<'a, K, V> {
        self.iter()
    }
}

impl<K: Clone + Ord, V> IntoIterator for BpTreeMap<K, V> {
    type Item = (K, V);
    type IntoIter = IntoIter<K, V>;

    fn into_iter(mut self) -> IntoIter<K, V> {
        IntoIter {
            inner: self.raw.drain_to_vec().into_iter(),
        }
    }
}

impl<'a, K, V> Iterator for Iter<'a, K, V> {
    type Item = (&'a K, &'a V);

    fn next(&mut self) -> Option<(&'a K, &'a V)> {
        let tree = self.tree;
        let leaf_handle = self.leaf?;
        let leaf = tree.node(leaf_handle).as_leaf();

        let item = (leaf.key(self.index), tree.value(leaf.value(self.index)));
        self.remaining -= 1;

        self.index += 1;
        if self.index >= leaf.key_count() {
            self.leaf = leaf.next();
            self.index = 0;
        }

        Some(item)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (self.remaining, Some(self.remaining))
    }
}

impl<K, V> ExactSizeIterator for Iter<'_, K, V> {}
impl<K, V> FusedIterator for Iter<'_, K, V> {}

impl<'a, K, V> Iterator for Keys<'a, K, V> {
    type Item = &'a K;

    fn next(&mut self) -> Option<&'a K> {
        self.inner.next().map(|(k, _)| k)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.inner.size_hint()
    }
}

impl<K, V> ExactSizeIterator for Keys<'_, K, V> {}
impl<K, V> FusedIterator for Keys<'_, K, V> {}

impl<'a, K, V> Iterator for Values<'a, K, V> {
    type Item = &'a V;

    fn next(&mut self) -> Option<&'a V> {
        self.inner.next().map(|(_, v)| v)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.inner.size_hint()
    }
}

impl<K, V> ExactSizeIterator for Values<'_, K, V> {}
impl<K, V> FusedIterator for Values<'_, K, V> {}

impl<'a, K: Clone + Ord, V> Range<'a, K, V> {
    fn new<T, R>(tree: &'a RawBpTreeMap<K, V>, range: &R) -> Self
    where
        T: ?Sized + Ord,
        K: Borrow<T>,
        R: RangeBounds<T>,
    {
        // A reversed range yields nothing; resolving its endpoints naively
        // would place `stop` before `front` and walk off the end of the chain.
        // Doubly-excluded equal bounds are empty for the same reason.
        let malformed = match (range.start_bound(), range.end_bound()) {
            (Bound::Excluded(start), Bound::Excluded(end)) => start >= end,
            (Bound::Included(start) | Bound::Excluded(start), Bound::Included(end) | Bound::Excluded(end)) => {
                start > end
            }
            _ => false,
        };
        if malformed {
            return Range {
                tree,
                front: None,
                stop: None,
            };
        }

        let front = match range.start_bound() {
            Bound::Unbounded => tree.first_leaf().map(|leaf| (leaf, 0)),
            Bound::Included(key) => tree.lower_bound(key),
            Bound::Excluded(key) => tree.upper_bound(key),
        };
        let stop = match range.end_bound() {
            Bound::Unbounded => None,
            Bound::Excluded(key) => tree.lower_bound(key),
            Bound::Included(key) => tree.upper_bound(key),
        };

        Range { tree, front, stop }
    }
}

impl<'a, K, V> Iterator for Range<'a, K, V> {
    type Item = (&'a K, &'a V);

    fn next(&mut self) -> Option<(&'a K, &'a V)> {
        let tree = self.tree;
        let (leaf_handle, index) = self.front?;
        if self.stop == Some((leaf_handle, index)) {
            self.front = None;
            return None;
        }

        let leaf = tree.node(leaf_handle).as_leaf();
        let item = (leaf.key(index), tree.value(leaf.value(index)));

        self.front = if index + 1 < leaf.key_count() {
            Some((leaf_handle, index + 1))
        } else {
            leaf.next().map(|next| (next, 0))
        };

        Some(item)
    }
}

impl<K, V> FusedIterator for Range<'_, K, V> {}

impl<K, V> Iterator for IntoIter<K, V> {
    type Item = (K, V);

    fn next(&mut self) -> Option<(K, V)> {
        self.inner.next()
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.inner.size_hint()
    }
}

impl<K, V> ExactSizeIterator for IntoIter<K, V> {}
impl<K, V> FusedIterator for IntoIter<K, V> {}
