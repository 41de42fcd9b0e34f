//! Sparse-indexed set and map.
//!
//! Both containers keep their elements in a dense `Vec` and maintain a
//! `sparse` array from each element's projected index to its dense position.
//! Insert, lookup and removal are O(1); removal swaps the last element into
//! the hole, so dense order is not stable across removals.
//!
//! Every structural change (insert, removal, clear) bumps a revision
//! counter. Cursors over the dense array compare revisions to detect
//! modification mid-iteration.

use std::fmt;

use crate::error::{Error, Result};

/// Projection from a stored value onto its sparse index.
pub trait Indexer<T: ?Sized> {
    /// Sparse index of `value`.
    fn index_of(&self, value: &T) -> usize;

    /// Exclusive upper bound on projected indices.
    fn domain(&self) -> usize {
        usize::MAX
    }
}

/// Indexes unsigned integers by their own value.
#[derive(Debug, Clone, Copy, Default)]
pub struct IdentityIndexer;

macro_rules! impl_identity_indexer {
    ($($ty:ty),*) => {
        $(
            impl Indexer<$ty> for IdentityIndexer {
                #[allow(clippy::cast_possible_truncation)]
                fn index_of(&self, value: &$ty) -> usize {
                    *value as usize
                }

                #[allow(clippy::cast_possible_truncation)]
                fn domain(&self) -> usize {
                    (<$ty>::MAX as usize).saturating_add(1)
                }
            }
        )*
    };
}

impl_identity_indexer!(u8, u16, u32, u64, usize);

/// Marker for an unused sparse slot.
const VACANT: usize = usize::MAX;

// ==================== Set ====================

/// Dense/sparse set with O(1) membership, insert and unordered removal.
#[derive(Clone)]
pub struct SparseSet<T, I = IdentityIndexer> {
    dense: Vec<T>,
    sparse: Vec<usize>,
    indexer: I,
    domain: usize,
    revision: u64,
}

impl<T, I: Default + Indexer<T>> Default for SparseSet<T, I> {
    fn default() -> Self {
        Self::with_indexer(I::default())
    }
}

impl<T> SparseSet<T, IdentityIndexer>
where
    IdentityIndexer: Indexer<T>,
{
    /// Create an empty set over unsigned integers.
    #[must_use]
    pub fn new() -> Self {
        Self::with_indexer(IdentityIndexer)
    }
}

impl<T, I: Indexer<T>> SparseSet<T, I> {
    /// Create an empty set using a custom projection.
    #[must_use]
    pub fn with_indexer(indexer: I) -> Self {
        let domain = indexer.domain();
        Self {
            dense: Vec::new(),
            sparse: Vec::new(),
            indexer,
            domain,
            revision: 0,
        }
    }

    /// Create an empty set that rejects indices at or above `domain`.
    #[must_use]
    pub fn with_domain(indexer: I, domain: usize) -> Self {
        let mut set = Self::with_indexer(indexer);
        set.domain = set.domain.min(domain);
        set
    }

    /// Reserve room for `additional` more elements.
    pub fn reserve(&mut self, additional: usize) {
        self.dense.reserve(additional);
    }

    /// Grow `sparse` so that `index` is addressable.
    fn ensure_index(&mut self, index: usize) -> Result<()> {
        if index >= self.domain {
            return Err(Error::CapacityExceeded { limit: self.domain });
        }
        if index >= self.sparse.len() {
            let required = index + 1;
            let new_len = (self.sparse.len() * 2).max(required).min(self.domain);
            self.sparse.resize(new_len, VACANT);
        }
        Ok(())
    }

    /// Dense position of `value`, if present.
    #[must_use]
    pub fn find_index(&self, value: &T) -> Option<usize>
    where
        T: PartialEq,
    {
        let slot = *self.sparse.get(self.indexer.index_of(value))?;
        (self.dense.get(slot)? == value).then_some(slot)
    }

    /// Dense position of `value`, failing with [`Error::KeyNotFound`] if absent.
    pub fn get_index(&self, value: &T) -> Result<usize>
    where
        T: PartialEq,
    {
        self.find_index(value).ok_or_else(|| Error::KeyNotFound {
            index: self.indexer.index_of(value),
        })
    }

    /// Check membership.
    #[must_use]
    pub fn has(&self, value: &T) -> bool
    where
        T: PartialEq,
    {
        self.find_index(value).is_some()
    }

    /// The stored element equal to `value`, if present.
    #[must_use]
    pub fn find(&self, value: &T) -> Option<&T>
    where
        T: PartialEq,
    {
        self.find_index(value).map(|slot| &self.dense[slot])
    }

    /// Insert `value`. Returns `false` (and drops `value`) if already present.
    ///
    /// Fails with [`Error::SlotOccupied`] if a different value projecting to
    /// the same index is stored.
    pub fn insert(&mut self, value: T) -> Result<bool>
    where
        T: PartialEq,
    {
        let index = self.indexer.index_of(&value);
        match self.sparse.get(index).and_then(|&slot| self.dense.get(slot)) {
            Some(existing) if *existing == value => return Ok(false),
            Some(_) => return Err(Error::SlotOccupied { index }),
            None => {}
        }
        self.ensure_index(index)?;
        self.sparse[index] = self.dense.len();
        self.dense.push(value);
        self.revision += 1;
        Ok(true)
    }

    /// Remove `value` by swapping the last element into its slot.
    ///
    /// Returns `false` if `value` was absent.
    pub fn unordered_erase(&mut self, value: &T) -> bool
    where
        T: PartialEq,
    {
        self.erase_index(value).is_some()
    }

    /// Remove `value`, returning the dense position it occupied.
    pub(crate) fn erase_index(&mut self, value: &T) -> Option<usize>
    where
        T: PartialEq,
    {
        let slot = self.find_index(value)?;
        self.sparse[self.indexer.index_of(value)] = VACANT;
        self.dense.swap_remove(slot);
        if let Some(moved) = self.dense.get(slot) {
            let moved_index = self.indexer.index_of(moved);
            self.sparse[moved_index] = slot;
        }
        self.revision += 1;
        Some(slot)
    }

    /// Remove every element, keeping allocated capacity.
    pub fn clear(&mut self) {
        self.dense.clear();
        self.sparse.fill(VACANT);
        self.revision += 1;
    }

    /// Number of elements.
    #[must_use]
    pub fn len(&self) -> usize {
        self.dense.len()
    }

    /// Check if the set is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.dense.is_empty()
    }

    /// Addressable index range without further growth.
    #[must_use]
    pub fn capacity(&self) -> usize {
        self.sparse.len()
    }

    /// Elements in dense order.
    #[must_use]
    pub fn as_slice(&self) -> &[T] {
        &self.dense
    }

    /// Iterate elements in dense order.
    pub fn iter(&self) -> std::slice::Iter<'_, T> {
        self.dense.iter()
    }

    /// Structural revision counter.
    #[must_use]
    pub fn revision(&self) -> u64 {
        self.revision
    }

    /// Bytes held by the dense and sparse arrays.
    #[must_use]
    pub fn memory_usage(&self) -> usize {
        self.dense.capacity() * size_of::<T>() + self.sparse.capacity() * size_of::<usize>()
    }
}

impl<T: fmt::Debug, I> fmt::Debug for SparseSet<T, I> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_set().entries(&self.dense).finish()
    }
}

impl<'a, T, I: Indexer<T>> IntoIterator for &'a SparseSet<T, I> {
    type Item = &'a T;
    type IntoIter = std::slice::Iter<'a, T>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

// ==================== Map ====================

/// Sparse set of keys with a parallel dense array of values.
///
/// `values[i]` always belongs to `keys()[i]`; removals swap both arrays in
/// lockstep.
#[derive(Clone)]
pub struct SparseMap<K, V, I = IdentityIndexer> {
    keys: SparseSet<K, I>,
    values: Vec<V>,
}

impl<K, V, I: Default + Indexer<K>> Default for SparseMap<K, V, I> {
    fn default() -> Self {
        Self::with_indexer(I::default())
    }
}

impl<K, V> SparseMap<K, V, IdentityIndexer>
where
    IdentityIndexer: Indexer<K>,
{
    /// Create an empty map over unsigned integer keys.
    #[must_use]
    pub fn new() -> Self {
        Self::with_indexer(IdentityIndexer)
    }
}

impl<K: PartialEq, V, I: Indexer<K>> SparseMap<K, V, I> {
    /// Insert `value` under `key`. Returns `false` and keeps the old value
    /// if `key` is already present.
    pub fn insert(&mut self, key: K, value: V) -> Result<bool> {
        if self.keys.has(&key) {
            return Ok(false);
        }
        self.keys.insert(key)?;
        self.values.push(value);
        Ok(true)
    }

    /// Insert or overwrite. Returns `true` if the key was newly inserted.
    pub fn insert_or_assign(&mut self, key: K, value: V) -> Result<bool> {
        if let Some(slot) = self.keys.find_index(&key) {
            self.values[slot] = value;
            return Ok(false);
        }
        self.insert(key, value)
    }

    /// Existing value for `key`, or construct one in place.
    pub fn get_or_insert_with(&mut self, key: K, f: impl FnOnce() -> V) -> Result<&mut V> {
        let slot = match self.keys.find_index(&key) {
            Some(slot) => slot,
            None => {
                self.keys.insert(key)?;
                self.values.push(f());
                self.values.len() - 1
            }
        };
        Ok(&mut self.values[slot])
    }

    /// Remove `key` and return its value.
    pub fn take(&mut self, key: &K) -> Option<V> {
        let slot = self.keys.erase_index(key)?;
        Some(self.values.swap_remove(slot))
    }

    /// Remove `key`. Returns `false` if it was absent.
    pub fn unordered_erase(&mut self, key: &K) -> bool {
        self.take(key).is_some()
    }

    /// Check if `key` is present.
    #[must_use]
    pub fn has(&self, key: &K) -> bool {
        self.keys.has(key)
    }

    /// Dense position of `key`, if present.
    #[must_use]
    pub fn find_index(&self, key: &K) -> Option<usize> {
        self.keys.find_index(key)
    }

    /// Value for `key`, if present.
    #[must_use]
    pub fn find(&self, key: &K) -> Option<&V> {
        self.keys.find_index(key).map(|slot| &self.values[slot])
    }

    /// Mutable value for `key`, if present.
    pub fn find_mut(&mut self, key: &K) -> Option<&mut V> {
        self.keys.find_index(key).map(|slot| &mut self.values[slot])
    }

    /// Value for `key`, failing with [`Error::KeyNotFound`] if absent.
    pub fn get(&self, key: &K) -> Result<&V> {
        let slot = self.keys.get_index(key)?;
        Ok(&self.values[slot])
    }

    /// Mutable value for `key`, failing with [`Error::KeyNotFound`] if absent.
    pub fn get_mut(&mut self, key: &K) -> Result<&mut V> {
        let slot = self.keys.get_index(key)?;
        Ok(&mut self.values[slot])
    }

    /// Remove every entry, keeping allocated capacity.
    pub fn clear(&mut self) {
        self.keys.clear();
        self.values.clear();
    }
}

impl<K, V, I: Indexer<K>> SparseMap<K, V, I> {
    /// Create an empty map using a custom key projection.
    #[must_use]
    pub fn with_indexer(indexer: I) -> Self {
        Self {
            keys: SparseSet::with_indexer(indexer),
            values: Vec::new(),
        }
    }

    /// Create an empty map that rejects key indices at or above `domain`.
    #[must_use]
    pub fn with_domain(indexer: I, domain: usize) -> Self {
        Self {
            keys: SparseSet::with_domain(indexer, domain),
            values: Vec::new(),
        }
    }

    /// Number of entries.
    #[must_use]
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// Check if the map is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Keys in dense order.
    #[must_use]
    pub fn keys(&self) -> &[K] {
        self.keys.as_slice()
    }

    /// Values in dense order.
    #[must_use]
    pub fn values(&self) -> &[V] {
        &self.values
    }

    /// Mutable values in dense order.
    pub fn values_mut(&mut self) -> &mut [V] {
        &mut self.values
    }

    /// Iterate `(key, value)` pairs in dense order.
    pub fn iter(&self) -> impl Iterator<Item = (&K, &V)> + '_ {
        self.keys.iter().zip(self.values.iter())
    }

    /// Iterate `(key, mutable value)` pairs in dense order.
    pub fn iter_mut(&mut self) -> impl Iterator<Item = (&K, &mut V)> + '_ {
        self.keys.iter().zip(self.values.iter_mut())
    }

    /// Structural revision counter of the key set.
    #[must_use]
    pub fn revision(&self) -> u64 {
        self.keys.revision()
    }

    /// Bytes held by keys and values.
    #[must_use]
    pub fn memory_usage(&self) -> usize {
        self.keys.memory_usage() + self.values.capacity() * size_of::<V>()
    }
}

impl<K: fmt::Debug, V: fmt::Debug, I> fmt::Debug for SparseMap<K, V, I> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_map()
            .entries(self.keys.dense.iter().zip(self.values.iter()))
            .finish()
    }
}
