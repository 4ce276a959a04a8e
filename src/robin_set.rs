//! A hash set for arbitrary keys over the Robin Hood table.
//!
//! This module provides a `RobinSet` that wraps the [`RobinTable`] with
//! `V = ()` and a configurable hasher builder, providing a standard set
//! interface for any `Hash + Eq` key type.

use core::fmt::Debug;
use core::hash::BuildHasher;
use core::hash::Hash;
use core::hash::Hasher;

use alloc::boxed::Box;
use alloc::vec::Vec;

use crate::containers::BufferAllocationError;
use crate::mix;
use crate::pool::Cursor;
use crate::pool::IteratorPool;
use crate::robin_table::RobinTable;

/// A hash set for arbitrary keys, using Robin Hood displacement.
///
/// `RobinSet<K, S>` stores keys implementing `Hash + Eq` and hashes them
/// through a caller-supplied [`BuildHasher`] — the seam to hang custom
/// hashing and equality off, in the spirit of an external hashing
/// strategy. On top of the user hash, every instance folds in its own
/// perturbation seed, so adversarial key streams do not produce
/// correlated chains across sets.
///
/// # Examples
///
/// ```rust
/// # use core::hash::BuildHasher;
/// # use siphasher::sip::SipHasher;
/// #
/// # use robin_hash::RobinSet;
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
/// let mut set = RobinSet::with_hasher(SimpleHasher);
/// assert!(set.insert("alpha"));
/// assert!(!set.insert("alpha"));
/// assert!(set.contains(&"alpha"));
/// ```
pub struct RobinSet<K, S> {
    table: RobinTable<K, ()>,
    hash_builder: S,
    pool: IteratorPool<Cursor>,
}

impl<K, S> RobinSet<K, S>
where
    K: Hash + Eq,
    S: BuildHasher,
{
    /// Creates an empty set with the given hasher builder.
    pub fn with_hasher(hash_builder: S) -> Self {
        Self {
            table: RobinTable::new(),
            hash_builder,
            pool: IteratorPool::new(),
        }
    }

    /// Creates an empty set that can hold `expected` keys without
    /// reallocating, with the given hasher builder.
    pub fn with_capacity_and_hasher(expected: usize, hash_builder: S) -> Self {
        Self {
            table: RobinTable::with_capacity(expected),
            hash_builder,
            pool: IteratorPool::new(),
        }
    }

    /// Creates an empty set with the given capacity, load factor and
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

    /// Returns the number of keys in the set.
    pub fn len(&self) -> usize {
        self.table.len()
    }

    /// Returns `true` if the set contains no keys.
    pub fn is_empty(&self) -> bool {
        self.table.is_empty()
    }

    /// Maximum number of keys the set holds before its next growth.
    pub fn capacity(&self) -> usize {
        self.table.capacity()
    }

    /// Removes all keys. Keeps the allocated buffers.
    pub fn clear(&mut self) {
        self.table.clear();
    }

    /// Adds a key to the set. Returns `true` if it was not already
    /// present.
    ///
    /// # Examples
    ///
    /// ```rust
    /// # use core::hash::BuildHasher;
    /// # use siphasher::sip::SipHasher;
    /// #
    /// # use robin_hash::RobinSet;
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
    /// let mut set = RobinSet::with_hasher(SimpleHasher);
    /// assert!(set.insert(String::from("key")));
    /// assert_eq!(set.len(), 1);
    /// ```
    pub fn insert(&mut self, key: K) -> bool {
        let hash = self.hash_builder.hash_one(&key);
        self.table
            .insert(hash, key, (), |a, b| a == b, |k| {
                self.hash_builder.hash_one(k)
            })
            .is_none()
    }

    /// Adds every key from the iterator, returning how many were newly
    /// added.
    pub fn insert_all<I>(&mut self, keys: I) -> usize
    where
        I: IntoIterator<Item = K>,
    {
        let before = self.len();
        for key in keys {
            self.insert(key);
        }
        self.len() - before
    }

    /// Returns `true` if the key is in the set.
    pub fn contains(&self, key: &K) -> bool {
        let hash = self.hash_builder.hash_one(key);
        self.table.contains(hash, |k| k == key)
    }

    /// Removes a key from the set. Returns `true` if it was present.
    pub fn remove(&mut self, key: &K) -> bool {
        self.take(key).is_some()
    }

    /// Removes a key from the set, returning the stored key if it was
    /// present.
    pub fn take(&mut self, key: &K) -> Option<K> {
        let hash = self.hash_builder.hash_one(key);
        self.table.remove(hash, |k| k == key).map(|(k, ())| k)
    }

    /// Removes every key matched by the predicate, returning how many
    /// were removed.
    ///
    /// The predicate must not touch the set being scanned. If it panics,
    /// the set remains consistent with whatever removals completed.
    pub fn remove_matching(&mut self, mut pred: impl FnMut(&K) -> bool) -> usize {
        self.table.remove_matching(|key, _| pred(key))
    }

    /// Keeps only the keys matched by the predicate.
    pub fn retain(&mut self, mut pred: impl FnMut(&K) -> bool) {
        self.table.remove_matching(|key, _| !pred(key));
    }

    /// Removes every key that is also in `other`, returning how many
    /// were removed.
    pub fn remove_all<S2: BuildHasher>(&mut self, other: &RobinSet<K, S2>) -> usize {
        self.remove_matching(|key| other.contains(key))
    }

    /// Keeps only the keys that are also in `other`, returning how many
    /// were removed.
    pub fn retain_all<S2: BuildHasher>(&mut self, other: &RobinSet<K, S2>) -> usize {
        self.remove_matching(|key| !other.contains(key))
    }

    /// Reserves room for at least `additional` more keys, reporting
    /// allocation failure instead of aborting.
    pub fn try_reserve(&mut self, additional: usize) -> Result<(), BufferAllocationError> {
        self.table
            .try_reserve(additional, |k| self.hash_builder.hash_one(k))
    }

    /// Returns an iterator over the keys, in descending slot order.
    pub fn iter(&self) -> Iter<'_, K, S> {
        let mut cursor = self.pool.borrow();
        cursor.pos = self.table.slots();
        Iter {
            set: self,
            cursor: Some(cursor),
        }
    }

    /// Clones the keys into a fresh vector.
    pub fn to_vec(&self) -> Vec<K>
    where
        K: Clone,
    {
        self.iter().cloned().collect()
    }

    /// Collects probe-distance statistics over the live keys.
    #[cfg(feature = "stats")]
    pub fn probe_stats(&self) -> crate::hash_table::ProbeStats {
        self.table.probe_stats()
    }

    #[cfg(test)]
    pub(crate) fn pool_available(&self) -> usize {
        self.pool.available()
    }

    #[cfg(test)]
    pub(crate) fn table(&self) -> &RobinTable<K, ()> {
        &self.table
    }
}

impl<K, S> RobinSet<K, S>
where
    K: Hash + Eq,
    S: BuildHasher + Default,
{
    /// Creates an empty set using the default hasher builder.
    pub fn new() -> Self {
        Self::with_hasher(S::default())
    }

    /// Creates an empty set that can hold `expected` keys without
    /// reallocating, using the default hasher builder.
    pub fn with_capacity(expected: usize) -> Self {
        Self::with_capacity_and_hasher(expected, S::default())
    }
}

impl<K, S> Default for RobinSet<K, S>
where
    K: Hash + Eq,
    S: BuildHasher + Default,
{
    fn default() -> Self {
        Self::new()
    }
}

impl<K, S> Clone for RobinSet<K, S>
where
    K: Hash + Eq + Clone,
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

impl<K, S> Debug for RobinSet<K, S>
where
    K: Hash + Eq + Debug,
    S: BuildHasher,
{
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_set().entries(self.iter()).finish()
    }
}

impl<K, S> PartialEq for RobinSet<K, S>
where
    K: Hash + Eq,
    S: BuildHasher,
{
    fn eq(&self, other: &Self) -> bool {
        self.len() == other.len() && self.iter().all(|key| other.contains(key))
    }
}

impl<K, S> Eq for RobinSet<K, S>
where
    K: Hash + Eq,
    S: BuildHasher,
{
}

impl<K, S> Hash for RobinSet<K, S>
where
    K: Hash + Eq,
    S: BuildHasher,
{
    fn hash<H: Hasher>(&self, state: &mut H) {
        // Order-independent, and independent of the hasher builder state,
        // so equal sets agree on their hash.
        let mut acc: u64 = 0;
        for key in self.iter() {
            acc = acc.wrapping_add(mix::fold_hash(key));
        }
        state.write_usize(self.len());
        state.write_u64(acc);
    }
}

impl<K, S> Extend<K> for RobinSet<K, S>
where
    K: Hash + Eq,
    S: BuildHasher,
{
    fn extend<I: IntoIterator<Item = K>>(&mut self, iter: I) {
        self.insert_all(iter);
    }
}

impl<K, S> FromIterator<K> for RobinSet<K, S>
where
    K: Hash + Eq,
    S: BuildHasher + Default,
{
    fn from_iter<I: IntoIterator<Item = K>>(iter: I) -> Self {
        let mut set = Self::new();
        set.insert_all(iter);
        set
    }
}

impl<'a, K, S> IntoIterator for &'a RobinSet<K, S>
where
    K: Hash + Eq,
    S: BuildHasher,
{
    type Item = &'a K;
    type IntoIter = Iter<'a, K, S>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

/// An iterator over a set's keys.
///
/// The cursor is borrowed from the set's iterator pool and handed back
/// when the iterator is exhausted or dropped.
pub struct Iter<'a, K, S> {
    set: &'a RobinSet<K, S>,
    cursor: Option<Box<Cursor>>,
}

impl<'a, K, S> Iterator for Iter<'a, K, S> {
    type Item = &'a K;

    fn next(&mut self) -> Option<&'a K> {
        let cursor = self.cursor.as_mut()?;
        while cursor.pos > 0 {
            cursor.pos -= 1;
            if let Some((key, ())) = self.set.table.entry_at(cursor.pos) {
                return Some(key);
            }
        }

        if let Some(cursor) = self.cursor.take() {
            self.set.pool.release(cursor);
        }
        None
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (0, Some(self.set.table.len()))
    }
}

impl<K, S> Drop for Iter<'_, K, S> {
    fn drop(&mut self) {
        if let Some(cursor) = self.cursor.take() {
            self.set.pool.release(cursor);
        }
    }
}

#[cfg(test)]
mod tests {
    use core::hash::BuildHasher;

    use rand::TryRngCore;
    use rand::rngs::OsRng;
    use siphasher::sip::SipHasher;

    use std::string::String;
    use std::string::ToString;
    use std::vec::Vec;

    use super::*;

    #[derive(Clone)]
    struct SipHashBuilder {
        k1: u64,
        k2: u64,
    }

    impl BuildHasher for SipHashBuilder {
        type Hasher = SipHasher;

        fn build_hasher(&self) -> Self::Hasher {
            SipHasher::new_with_keys(self.k1, self.k2)
        }
    }

    impl Default for SipHashBuilder {
        fn default() -> Self {
            let mut rng = OsRng;
            Self {
                k1: rng.try_next_u64().unwrap_or(0),
                k2: rng.try_next_u64().unwrap_or(0),
            }
        }
    }

    /// Maps every key to the same hash; the table gets no help at all
    /// from the hash function.
    struct ConstantHasher;

    impl core::hash::Hasher for ConstantHasher {
        fn finish(&self) -> u64 {
            42
        }

        fn write(&mut self, _bytes: &[u8]) {}
    }

    #[derive(Clone, Default)]
    struct DegenerateHasher;

    impl BuildHasher for DegenerateHasher {
        type Hasher = ConstantHasher;

        fn build_hasher(&self) -> Self::Hasher {
            ConstantHasher
        }
    }

    #[test]
    fn insert_contains_remove() {
        let mut set: RobinSet<String, SipHashBuilder> = RobinSet::new();
        assert!(set.insert("alpha".to_string()));
        assert!(set.insert("beta".to_string()));
        assert!(!set.insert("alpha".to_string()));
        assert_eq!(set.len(), 2);

        assert!(set.contains(&"alpha".to_string()));
        assert!(!set.contains(&"gamma".to_string()));

        assert!(set.remove(&"alpha".to_string()));
        assert!(!set.remove(&"alpha".to_string()));
        assert_eq!(set.len(), 1);
    }

    #[test]
    fn take_returns_the_stored_key() {
        let mut set: RobinSet<String, SipHashBuilder> = RobinSet::new();
        set.insert("key".to_string());
        assert_eq!(set.take(&"key".to_string()), Some("key".to_string()));
        assert_eq!(set.take(&"key".to_string()), None);
    }

    #[test]
    fn many_keys_through_growth() {
        let mut set: RobinSet<u64, SipHashBuilder> = RobinSet::new();
        for key in 0..5000u64 {
            assert!(set.insert(key));
        }
        assert_eq!(set.len(), 5000);
        for key in 0..5000u64 {
            assert!(set.contains(&key));
        }
    }

    #[test]
    fn set_algebra() {
        let mut a: RobinSet<u64, SipHashBuilder> = (1..=10).collect();
        let b: RobinSet<u64, SipHashBuilder> = (6..=15).collect();

        assert_eq!(a.remove_all(&b), 5);
        assert_eq!(a.len(), 5);

        let mut c: RobinSet<u64, SipHashBuilder> = (1..=10).collect();
        assert_eq!(c.retain_all(&b), 5);
        for key in 6..=10u64 {
            assert!(c.contains(&key));
        }
    }

    #[test]
    fn retain_and_remove_matching() {
        let mut set: RobinSet<u64, SipHashBuilder> = (0..100).collect();
        assert_eq!(set.remove_matching(|&k| k < 50), 50);
        set.retain(|&k| k % 2 == 0);
        assert_eq!(set.len(), 25);
    }

    #[test]
    fn degenerate_hasher_still_works() {
        // Every key hashes identically, producing one maximal collision
        // chain; only linear probing and displacement hold it together.
        let mut set: RobinSet<u64, DegenerateHasher> = RobinSet::new();
        for key in 0..300u64 {
            assert!(set.insert(key));
        }
        assert_eq!(set.len(), 300);
        for key in 0..300u64 {
            assert!(set.contains(&key));
            assert!(!set.contains(&(key + 300)));
        }
        for key in 0..300u64 {
            assert!(set.remove(&key));
        }
        assert!(set.is_empty());
    }

    #[test]
    fn iterator_pool_round_trips() {
        let set: RobinSet<u64, SipHashBuilder> = (0..50).collect();
        let baseline = set.pool_available();

        for _ in set.iter() {}
        assert_eq!(set.pool_available(), baseline + 1);

        let before = set.pool_available();
        for key in set.iter() {
            if *key < 1000 {
                break;
            }
        }
        assert_eq!(set.pool_available(), before);
    }

    #[test]
    fn equality_and_hash_ignore_order_and_hasher_state() {
        let a: RobinSet<u64, SipHashBuilder> = (1..=100).collect();
        let mut b: RobinSet<u64, SipHashBuilder> = RobinSet::new();
        for key in (1..=100u64).rev() {
            b.insert(key);
        }

        assert_eq!(a, b);
        assert_eq!(crate::mix::fold_hash(&a), crate::mix::fold_hash(&b));

        b.insert(101);
        assert_ne!(a, b);
    }

    #[test]
    fn clone_divergence() {
        let mut a: RobinSet<String, SipHashBuilder> = RobinSet::new();
        a.insert_all(["one".to_string(), "two".to_string(), "three".to_string()]);

        let mut b = a.clone();
        assert_eq!(a, b);
        assert_ne!(a.table().perturbation(), b.table().perturbation());

        assert!(!b.insert("two".to_string()));
        assert_eq!(a, b);

        b.insert("four".to_string());
        assert!(!a.contains(&"four".to_string()));

        let mut from_a = a.to_vec();
        let mut from_b: Vec<String> = b.iter().filter(|k| *k != "four").cloned().collect();
        from_a.sort();
        from_b.sort();
        assert_eq!(from_a, from_b);
    }

    #[test]
    fn to_vec_round_trips() {
        let set: RobinSet<u64, SipHashBuilder> = (1..=200).collect();
        let rebuilt: RobinSet<u64, SipHashBuilder> = set.to_vec().into_iter().collect();
        assert_eq!(set, rebuilt);
    }
}
