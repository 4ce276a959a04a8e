//! A hash map for arbitrary keys over the Robin Hood table.
//!
//! This module provides a `RobinMap` that wraps the [`RobinTable`] and
//! provides a standard key-value map interface with configurable hashers,
//! including an Entry API for in-place manipulation.

use core::fmt::Debug;
use core::hash::BuildHasher;
use core::hash::Hash;
use core::hash::Hasher;
use core::mem;
use core::ops::AddAssign;

use alloc::boxed::Box;
use alloc::vec::Vec;

use crate::containers::BufferAllocationError;
use crate::mix;
use crate::pool::Cursor;
use crate::pool::IteratorPool;
use crate::robin_table::RobinTable;

/// A hash map for arbitrary keys, using Robin Hood displacement.
///
/// `RobinMap<K, V, S>` stores key-value pairs where keys implement
/// `Hash + Eq`, hashed through a caller-supplied [`BuildHasher`] and a
/// per-instance perturbation seed. Probe distances stay clustered around
/// the mean, so worst-case lookups track the average closely even under
/// hostile key streams.
///
/// # Examples
///
/// ```rust
/// # use core::hash::BuildHasher;
/// # use siphasher::sip::SipHasher;
/// #
/// # use robin_hash::RobinMap;
/// #
/// # #[derive(Default)]
/// # struct SimpleHasher;
/// # impl BuildHasher for SimpleHasher {
/// #     type Hasher = SipHasher;
/// #
/// #     fn build_hasher(&self) -> Self::Hasher {
/// #         SipHasher::new()
/// #     }
/// # }
/// #
/// let mut map = RobinMap::with_hasher(SimpleHasher);
/// assert_eq!(map.insert("a", 1), None);
/// assert_eq!(map.insert("a", 2), Some(1));
/// assert_eq!(map.get(&"a"), Some(&2));
/// ```
pub struct RobinMap<K, V, S> {
    table: RobinTable<K, V>,
    hash_builder: S,
    pool: IteratorPool<Cursor>,
}

impl<K, V, S> RobinMap<K, V, S>
where
    K: Hash + Eq,
    S: BuildHasher,
{
    /// Creates an empty map with the given hasher builder.
    pub fn with_hasher(hash_builder: S) -> Self {
        Self {
            table: RobinTable::new(),
            hash_builder,
            pool: IteratorPool::new(),
        }
    }

    /// Creates an empty map that can hold `expected` entries without
    /// reallocating, with the given hasher builder.
    pub fn with_capacity_and_hasher(expected: usize, hash_builder: S) -> Self {
        Self {
            table: RobinTable::with_capacity(expected),
            hash_builder,
            pool: IteratorPool::new(),
        }
    }

    /// Creates an empty map with the given capacity, load factor and
    /// hasher builder.
    ///
    /// # Panics
    ///
    /// Panics if `load_factor` is outside `(0, 1]`.
    pub fn with_load_factor_and_hasher(
        expected: usize,
        load_factor: f32,
        hash_builder: S,
    ) -> Self {
        Self {
            table: RobinTable::with_capacity_and_load_factor(expected, load_factor),
            hash_builder,
            pool: IteratorPool::new(),
        }
    }

    /// Returns the number of entries in the map.
    pub fn len(&self) -> usize {
        self.table.len()
    }

    /// Returns `true` if the map contains no entries.
    pub fn is_empty(&self) -> bool {
        self.table.is_empty()
    }

    /// Maximum number of entries the map holds before its next growth.
    pub fn capacity(&self) -> usize {
        self.table.capacity()
    }

    /// Removes all entries. Keeps the allocated buffers.
    pub fn clear(&mut self) {
        self.table.clear();
    }

    /// Inserts a key-value pair, returning the previous value if the key
    /// was already present.
    ///
    /// # Examples
    ///
    /// ```rust
    /// # use core::hash::BuildHasher;
    /// # use siphasher::sip::SipHasher;
    /// #
    /// # use robin_hash::RobinMap;
    /// #
    /// # #[derive(Default)]
    /// # struct SimpleHasher;
    /// # impl BuildHasher for SimpleHasher {
    /// #     type Hasher = SipHasher;
    /// #
    /// #     fn build_hasher(&self) -> Self::Hasher {
    /// #         SipHasher::new()
    /// #     }
    /// # }
    /// #
    /// let mut map = RobinMap::with_hasher(SimpleHasher);
    /// assert_eq!(map.insert(37, "a"), None);
    /// assert_eq!(map.insert(37, "b"), Some("a"));
    /// ```
    pub fn insert(&mut self, key: K, value: V) -> Option<V> {
        let hash = self.hash_builder.hash_one(&key);
        self.table.insert(hash, key, value, |a, b| a == b, |k| {
            self.hash_builder.hash_one(k)
        })
    }

    /// Inserts every pair from the iterator, returning how many keys were
    /// newly added.
    pub fn insert_all<I>(&mut self, pairs: I) -> usize
    where
        I: IntoIterator<Item = (K, V)>,
    {
        let before = self.len();
        for (key, value) in pairs {
            self.insert(key, value);
        }
        self.len() - before
    }

    /// Inserts only if the key is absent. Returns `true` if the value was
    /// inserted.
    pub fn insert_if_absent(&mut self, key: K, value: V) -> bool {
        match self.entry(key) {
            Entry::Occupied(_) => false,
            Entry::Vacant(entry) => {
                entry.insert(value);
                true
            }
        }
    }

    /// Returns a reference to the value stored for `key`.
    pub fn get(&self, key: &K) -> Option<&V> {
        let hash = self.hash_builder.hash_one(key);
        self.table.find(hash, |k| k == key).map(|(_, value)| value)
    }

    /// Returns a mutable reference to the value stored for `key`.
    pub fn get_mut(&mut self, key: &K) -> Option<&mut V> {
        let hash = self.hash_builder.hash_one(key);
        self.table
            .find_mut(hash, |k| k == key)
            .map(|(_, value)| value)
    }

    /// Returns `true` if the map contains `key`.
    pub fn contains_key(&self, key: &K) -> bool {
        let hash = self.hash_builder.hash_one(key);
        self.table.contains(hash, |k| k == key)
    }

    /// Removes `key`, returning its value if it was present.
    pub fn remove(&mut self, key: &K) -> Option<V> {
        self.remove_entry(key).map(|(_, value)| value)
    }

    /// Removes `key`, returning the stored pair if it was present.
    pub fn remove_entry(&mut self, key: &K) -> Option<(K, V)> {
        let hash = self.hash_builder.hash_one(key);
        self.table.remove(hash, |k| k == key)
    }

    /// Removes every entry matched by the predicate, returning how many
    /// were removed.
    ///
    /// The predicate must not touch the map being scanned. If it panics,
    /// the map remains consistent with whatever removals completed.
    pub fn remove_matching(&mut self, pred: impl FnMut(&K, &V) -> bool) -> usize {
        self.table.remove_matching(pred)
    }

    /// Keeps only the entries matched by the predicate.
    pub fn retain(&mut self, mut pred: impl FnMut(&K, &V) -> bool) {
        self.table.remove_matching(|key, value| !pred(key, value));
    }

    /// Reserves room for at least `additional` more entries, reporting
    /// allocation failure instead of aborting.
    pub fn try_reserve(&mut self, additional: usize) -> Result<(), BufferAllocationError> {
        self.table
            .try_reserve(additional, |k| self.hash_builder.hash_one(k))
    }

    /// Gets the entry handle for `key`, for in-place manipulation.
    ///
    /// # Examples
    ///
    /// ```rust
    /// # use core::hash::BuildHasher;
    /// # use siphasher::sip::SipHasher;
    /// #
    /// # use robin_hash::RobinMap;
    /// #
    /// # #[derive(Default)]
    /// # struct SimpleHasher;
    /// # impl BuildHasher for SimpleHasher {
    /// #     type Hasher = SipHasher;
    /// #
    /// #     fn build_hasher(&self) -> Self::Hasher {
    /// #         SipHasher::new()
    /// #     }
    /// # }
    /// #
    /// let mut map = RobinMap::with_hasher(SimpleHasher);
    /// map.entry("a").or_insert(1);
    /// *map.entry("a").or_insert(99) += 1;
    /// assert_eq!(map.get(&"a"), Some(&2));
    /// ```
    pub fn entry(&mut self, key: K) -> Entry<'_, K, V, S> {
        let hash = self.hash_builder.hash_one(&key);
        match self.table.find_slot(hash, |k| k == &key) {
            Some(slot) => Entry::Occupied(OccupiedEntry { map: self, slot }),
            None => Entry::Vacant(VacantEntry {
                map: self,
                key,
                hash,
            }),
        }
    }

    /// Returns an iterator over the entries, in descending slot order.
    pub fn iter(&self) -> Iter<'_, K, V, S> {
        let mut cursor = self.pool.borrow();
        cursor.pos = self.table.slots();
        Iter {
            map: self,
            cursor: Some(cursor),
        }
    }

    /// Returns an iterator over the keys.
    pub fn keys(&self) -> Keys<'_, K, V, S> {
        Keys { inner: self.iter() }
    }

    /// Returns an iterator over the values.
    pub fn values(&self) -> Values<'_, K, V, S> {
        Values { inner: self.iter() }
    }

    /// Clones the entries into a fresh vector.
    pub fn to_vec(&self) -> Vec<(K, V)>
    where
        K: Clone,
        V: Clone,
    {
        self.iter()
            .map(|(key, value)| (key.clone(), value.clone()))
            .collect()
    }

    /// Collects probe-distance statistics over the live entries.
    #[cfg(feature = "stats")]
    pub fn probe_stats(&self) -> crate::hash_table::ProbeStats {
        self.table.probe_stats()
    }

    #[cfg(test)]
    pub(crate) fn pool_available(&self) -> usize {
        self.pool.available()
    }

    #[cfg(test)]
    pub(crate) fn table(&self) -> &RobinTable<K, V> {
        &self.table
    }
}

impl<K, V, S> RobinMap<K, V, S>
where
    K: Hash + Eq,
    V: AddAssign + Copy,
    S: BuildHasher,
{
    /// Inserts `put_value` if the key is absent; otherwise adds
    /// `addition` to the existing value. Returns the value now stored.
    pub fn put_or_add(&mut self, key: K, put_value: V, addition: V) -> V {
        match self.entry(key) {
            Entry::Occupied(mut entry) => {
                let value = entry.get_mut();
                *value += addition;
                *value
            }
            Entry::Vacant(entry) => {
                entry.insert(put_value);
                put_value
            }
        }
    }

    /// Adds `addition` to the value stored for `key`, inserting it if the
    /// key is absent. Returns the value now stored.
    pub fn add_to(&mut self, key: K, addition: V) -> V {
        self.put_or_add(key, addition, addition)
    }
}

impl<K, V, S> RobinMap<K, V, S>
where
    K: Hash + Eq,
    S: BuildHasher + Default,
{
    /// Creates an empty map using the default hasher builder.
    pub fn new() -> Self {
        Self::with_hasher(S::default())
    }

    /// Creates an empty map that can hold `expected` entries without
    /// reallocating, using the default hasher builder.
    pub fn with_capacity(expected: usize) -> Self {
        Self::with_capacity_and_hasher(expected, S::default())
    }
}

impl<K, V, S> Default for RobinMap<K, V, S>
where
    K: Hash + Eq,
    S: BuildHasher + Default,
{
    fn default() -> Self {
        Self::new()
    }
}

impl<K, V, S> Clone for RobinMap<K, V, S>
where
    K: Hash + Eq + Clone,
    V: Clone,
    S: BuildHasher + Clone,
{
    fn clone(&self) -> Self {
        // Rebuilt under a fresh perturbation seed; slot layouts are never
        // shared between instances.
        Self {
            table: self.table.clone_with(|k| self.hash_builder.hash_one(k)),
            hash_builder: self.hash_builder.clone(),
            pool: IteratorPool::new(),
        }
    }
}

impl<K, V, S> Debug for RobinMap<K, V, S>
where
    K: Hash + Eq + Debug,
    V: Debug,
    S: BuildHasher,
{
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        let mut map = f.debug_map();
        for (key, value) in self.iter() {
            map.entry(key, value);
        }
        map.finish()
    }
}

impl<K, V, S> PartialEq for RobinMap<K, V, S>
where
    K: Hash + Eq,
    V: PartialEq,
    S: BuildHasher,
{
    fn eq(&self, other: &Self) -> bool {
        self.len() == other.len()
            && self
                .iter()
                .all(|(key, value)| other.get(key) == Some(value))
    }
}

impl<K, V, S> Eq for RobinMap<K, V, S>
where
    K: Hash + Eq,
    V: Eq,
    S: BuildHasher,
{
}

impl<K, V, S> Hash for RobinMap<K, V, S>
where
    K: Hash + Eq,
    V: Hash,
    S: BuildHasher,
{
    fn hash<H: Hasher>(&self, state: &mut H) {
        // Order-independent, and independent of the hasher builder state,
        // so equal maps agree on their hash.
        let mut acc: u64 = 0;
        for (key, value) in self.iter() {
            acc = acc.wrapping_add(mix::fold_hash(key).wrapping_add(mix::fold_hash(value)));
        }
        state.write_usize(self.len());
        state.write_u64(acc);
    }
}

impl<K, V, S> Extend<(K, V)> for RobinMap<K, V, S>
where
    K: Hash + Eq,
    S: BuildHasher,
{
    fn extend<I: IntoIterator<Item = (K, V)>>(&mut self, iter: I) {
        self.insert_all(iter);
    }
}

impl<K, V, S> FromIterator<(K, V)> for RobinMap<K, V, S>
where
    K: Hash + Eq,
    S: BuildHasher + Default,
{
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut map = Self::new();
        map.insert_all(iter);
        map
    }
}

impl<'a, K, V, S> IntoIterator for &'a RobinMap<K, V, S>
where
    K: Hash + Eq,
    S: BuildHasher,
{
    type Item = (&'a K, &'a V);
    type IntoIter = Iter<'a, K, V, S>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

/// A view into a single map entry, either vacant or occupied.
///
/// Constructed by [`RobinMap::entry`].
pub enum Entry<'a, K, V, S> {
    /// The key is present.
    Occupied(OccupiedEntry<'a, K, V, S>),
    /// The key is absent.
    Vacant(VacantEntry<'a, K, V, S>),
}

impl<'a, K, V, S> Entry<'a, K, V, S>
where
    K: Hash + Eq,
    S: BuildHasher,
{
    /// Inserts `default` if the entry is vacant and returns a mutable
    /// reference to the stored value.
    pub fn or_insert(self, default: V) -> &'a mut V {
        match self {
            Entry::Occupied(entry) => entry.into_mut(),
            Entry::Vacant(entry) => entry.insert(default),
        }
    }

    /// Inserts a computed value if the entry is vacant and returns a
    /// mutable reference to the stored value.
    pub fn or_insert_with<F>(self, default: F) -> &'a mut V
    where
        F: FnOnce() -> V,
    {
        match self {
            Entry::Occupied(entry) => entry.into_mut(),
            Entry::Vacant(entry) => entry.insert(default()),
        }
    }

    /// Mutates the value in place if the entry is occupied.
    pub fn and_modify<F>(self, f: F) -> Self
    where
        F: FnOnce(&mut V),
    {
        match self {
            Entry::Occupied(mut entry) => {
                f(entry.get_mut());
                Entry::Occupied(entry)
            }
            Entry::Vacant(entry) => Entry::Vacant(entry),
        }
    }

    /// Returns a reference to this entry's key.
    pub fn key(&self) -> &K {
        match self {
            Entry::Occupied(entry) => entry.key(),
            Entry::Vacant(entry) => entry.key(),
        }
    }
}

impl<'a, K, V, S> Entry<'a, K, V, S>
where
    K: Hash + Eq,
    V: Default,
    S: BuildHasher,
{
    /// Inserts the default value if the entry is vacant and returns a
    /// mutable reference to the stored value.
    pub fn or_default(self) -> &'a mut V {
        self.or_insert_with(Default::default)
    }
}

/// A view into an occupied map entry.
pub struct OccupiedEntry<'a, K, V, S> {
    map: &'a mut RobinMap<K, V, S>,
    slot: usize,
}

impl<'a, K, V, S> OccupiedEntry<'a, K, V, S> {
    /// Returns a reference to the entry's key.
    pub fn key(&self) -> &K {
        self.map.table.key_at(self.slot)
    }

    /// Returns a reference to the entry's value.
    pub fn get(&self) -> &V {
        self.map.table.value_at(self.slot)
    }

    /// Returns a mutable reference to the entry's value.
    pub fn get_mut(&mut self) -> &mut V {
        self.map.table.value_mut_at(self.slot)
    }

    /// Converts the handle into a mutable reference tied to the map.
    pub fn into_mut(self) -> &'a mut V {
        self.map.table.value_mut_at(self.slot)
    }

    /// Replaces the entry's value, returning the old one.
    pub fn insert(&mut self, value: V) -> V {
        mem::replace(self.get_mut(), value)
    }

    /// Removes the entry, returning its value.
    pub fn remove(self) -> V {
        self.map.table.remove_at(self.slot).1
    }

    /// Removes the entry, returning the stored pair.
    pub fn remove_entry(self) -> (K, V) {
        self.map.table.remove_at(self.slot)
    }
}

/// A view into a vacant map entry.
pub struct VacantEntry<'a, K, V, S> {
    map: &'a mut RobinMap<K, V, S>,
    key: K,
    hash: u64,
}

impl<'a, K, V, S> VacantEntry<'a, K, V, S> {
    /// Returns a reference to the key that would be inserted.
    pub fn key(&self) -> &K {
        &self.key
    }

    /// Takes ownership of the key.
    pub fn into_key(self) -> K {
        self.key
    }
}

impl<'a, K, V, S> VacantEntry<'a, K, V, S>
where
    K: Hash + Eq,
    S: BuildHasher,
{
    /// Inserts a value and returns a mutable reference to it.
    pub fn insert(self, value: V) -> &'a mut V {
        let VacantEntry { map, key, hash } = self;
        let slot = map
            .table
            .insert_unique(hash, key, value, |k| map.hash_builder.hash_one(k));
        map.table.value_mut_at(slot)
    }
}

/// An iterator over a map's entries.
///
/// The cursor is borrowed from the map's iterator pool and handed back
/// when the iterator is exhausted or dropped.
pub struct Iter<'a, K, V, S> {
    map: &'a RobinMap<K, V, S>,
    cursor: Option<Box<Cursor>>,
}

impl<'a, K, V, S> Iterator for Iter<'a, K, V, S> {
    type Item = (&'a K, &'a V);

    fn next(&mut self) -> Option<Self::Item> {
        let cursor = self.cursor.as_mut()?;
        while cursor.pos > 0 {
            cursor.pos -= 1;
            if let Some(entry) = self.map.table.entry_at(cursor.pos) {
                return Some(entry);
            }
        }

        if let Some(cursor) = self.cursor.take() {
            self.map.pool.release(cursor);
        }
        None
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (0, Some(self.map.table.len()))
    }
}

impl<K, V, S> Drop for Iter<'_, K, V, S> {
    fn drop(&mut self) {
        if let Some(cursor) = self.cursor.take() {
            self.map.pool.release(cursor);
        }
    }
}

/// An iterator over a map's keys.
pub struct Keys<'a, K, V, S> {
    inner: Iter<'a, K, V, S>,
}

impl<'a, K, V, S> Iterator for Keys<'a, K, V, S> {
    type Item = &'a K;

    fn next(&mut self) -> Option<&'a K> {
        self.inner.next().map(|(key, _)| key)
    }
}

/// An iterator over a map's values.
pub struct Values<'a, K, V, S> {
    inner: Iter<'a, K, V, S>,
}

impl<'a, K, V, S> Iterator for Values<'a, K, V, S> {
    type Item = &'a V;

    fn next(&mut self) -> Option<&'a V> {
        self.inner.next().map(|(_, value)| value)
    }
}
