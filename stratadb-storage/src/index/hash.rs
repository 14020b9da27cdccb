//! Open-addressing hash index.
//!
//! A fixed-capacity slot array probed linearly with wraparound. Growth
//! reallocates to three times the capacity and reinserts every live
//! entry once the load factor crosses the threshold. [`HashMap`] derives
//! a key-value association from the same table by hashing and comparing
//! only the key half of each entry.

use crate::config::{DEFAULT_HASH_CAPACITY, DEFAULT_HASH_LOAD_FACTOR};
use std::collections::hash_map::RandomState;
use std::fmt;
use std::hash::{BuildHasher, Hash, Hasher};

/// Open-addressing hash set with linear probing.
pub struct HashTable<K, S = RandomState> {
    slots: Box<[Option<K>]>,
    len: usize,
    threshold: f64,
    hash_builder: S,
}

impl<K: Hash + Eq> HashTable<K> {
    #[inline]
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_HASH_CAPACITY)
    }

    #[inline]
    pub fn with_capacity(capacity: usize) -> Self {
        Self::with_capacity_and_hasher(capacity, RandomState::new())
    }
}

impl<K: Hash + Eq, S: BuildHasher> HashTable<K, S> {
    pub fn with_capacity_and_hasher(capacity: usize, hash_builder: S) -> Self {
        let capacity = capacity.max(1);
        let mut slots = Vec::with_capacity(capacity);
        slots.resize_with(capacity, || None);
        HashTable {
            slots: slots.into_boxed_slice(),
            len: 0,
            threshold: DEFAULT_HASH_LOAD_FACTOR,
            hash_builder,
        }
    }

    /// Override the load factor that triggers growth.
    #[inline]
    pub fn with_load_factor(mut self, threshold: f64) -> Self {
        debug_assert!(threshold > 0.0 && threshold < 1.0);
        self.threshold = threshold;
        self
    }

    /// Number of live entries.
    #[inline]
    pub fn len(&self) -> usize {
        self.len
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Number of slots.
    #[inline]
    pub fn capacity(&self) -> usize {
        self.slots.len()
    }

    /// Ratio of occupied slots to capacity.
    #[inline]
    pub fn load_factor(&self) -> f64 {
        self.len as f64 / self.capacity() as f64
    }

    #[inline]
    fn hash_of<Q: Hash + ?Sized>(&self, key: &Q) -> u64 {
        let mut hasher = self.hash_builder.build_hasher();
        key.hash(&mut hasher);
        hasher.finish()
    }

    /// Probe from the hash position of `hash` until a slot satisfying
    /// `eq` (hit) or an empty slot (miss).
    fn find_index<F>(&self, hash: u64, eq: F) -> Option<usize>
    where
        F: Fn(&K) -> bool,
    {
        let cap = self.capacity();
        let mut idx = (hash % cap as u64) as usize;
        loop {
            match &self.slots[idx] {
                Some(key) if eq(key) => return Some(idx),
                Some(_) => idx = (idx + 1) % cap,
                None => return None,
            }
        }
    }

    /// Insert `key` unless an equal key is present.
    ///
    /// Returns the slot index and whether the key was newly inserted;
    /// inserting an existing key leaves the table unchanged. Growth is
    /// checked before probing, so the slot index is valid afterwards.
    pub fn insert(&mut self, key: K) -> (usize, bool) {
        if self.load_factor() > self.threshold {
            self.grow();
        }
        self.insert_no_grow(key)
    }

    fn insert_no_grow(&mut self, key: K) -> (usize, bool) {
        let cap = self.capacity();
        let mut idx = (self.hash_of(&key) % cap as u64) as usize;
        loop {
            match &self.slots[idx] {
                Some(existing) if *existing == key => return (idx, false),
                Some(_) => idx = (idx + 1) % cap,
                None => {
                    self.slots[idx] = Some(key);
                    self.len += 1;
                    return (idx, true);
                }
            }
        }
    }

    /// Reallocate to three times the capacity and reinsert every live
    /// entry. Reinsertion order only affects slot layout, not
    /// correctness.
    fn grow(&mut self) {
        let new_cap = self.capacity() * 3;
        let mut slots = Vec::with_capacity(new_cap);
        slots.resize_with(new_cap, || None);
        let old = std::mem::replace(&mut self.slots, slots.into_boxed_slice());
        self.len = 0;
        for key in old.into_vec().into_iter().flatten() {
            self.insert_no_grow(key);
        }
    }

    /// Point lookup; probes the sequence an insert would have used.
    #[inline]
    pub fn get(&self, key: &K) -> Option<&K> {
        let idx = self.find_index(self.hash_of(key), |k| k == key)?;
        self.slots[idx].as_ref()
    }

    #[inline]
    pub fn contains(&self, key: &K) -> bool {
        self.get(key).is_some()
    }

    /// Iterate live entries in slot order. The order is an artifact of
    /// hashing and growth history and carries no meaning.
    #[inline]
    pub fn iter(&self) -> impl Iterator<Item = &K> {
        self.slots.iter().filter_map(|s| s.as_ref())
    }

    #[inline]
    fn slot(&self, idx: usize) -> &K {
        self.slots[idx].as_ref().unwrap()
    }
}

impl<K: Hash + Eq> Default for HashTable<K> {
    #[inline]
    fn default() -> Self {
        Self::new()
    }
}

impl<K: Hash + Eq, S: BuildHasher> fmt::Debug for HashTable<K, S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HashTable")
            .field("len", &self.len)
            .field("capacity", &self.capacity())
            .finish()
    }
}

/// Key-value entry hashed and compared by its key half only.
struct MapEntry<K, V> {
    key: K,
    value: V,
}

impl<K: Hash, V> Hash for MapEntry<K, V> {
    #[inline]
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.key.hash(state)
    }
}

impl<K: Eq, V> PartialEq for MapEntry<K, V> {
    #[inline]
    fn eq(&self, other: &Self) -> bool {
        self.key == other.key
    }
}

impl<K: Eq, V> Eq for MapEntry<K, V> {}

/// Hash map composed over [`HashTable`].
pub struct HashMap<K, V, S = RandomState> {
    table: HashTable<MapEntry<K, V>, S>,
}

impl<K: Hash + Eq, V> HashMap<K, V> {
    #[inline]
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_HASH_CAPACITY)
    }

    #[inline]
    pub fn with_capacity(capacity: usize) -> Self {
        HashMap {
            table: HashTable::with_capacity_and_hasher(capacity, RandomState::new()),
        }
    }
}

impl<K: Hash + Eq, V, S: BuildHasher> HashMap<K, V, S> {
    #[inline]
    pub fn with_capacity_and_hasher(capacity: usize, hash_builder: S) -> Self {
        HashMap {
            table: HashTable::with_capacity_and_hasher(capacity, hash_builder),
        }
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.table.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.table.is_empty()
    }

    #[inline]
    pub fn capacity(&self) -> usize {
        self.table.capacity()
    }

    /// Insert a pair unless the key is present; returns whether the pair
    /// was newly inserted.
    #[inline]
    pub fn insert(&mut self, key: K, value: V) -> bool {
        self.table.insert(MapEntry { key, value }).1
    }

    #[inline]
    pub fn get(&self, key: &K) -> Option<&V> {
        // MapEntry hashes its key only, so hashing the bare key probes
        // the same sequence
        let idx = self
            .table
            .find_index(self.table.hash_of(key), |e| e.key == *key)?;
        Some(&self.table.slot(idx).value)
    }

    #[inline]
    pub fn contains_key(&self, key: &K) -> bool {
        self.get(key).is_some()
    }

    /// Value for `key`, inserting one built by `make` when absent.
    pub fn get_or_insert_with<F>(&mut self, key: K, make: F) -> &V
    where
        F: FnOnce() -> V,
    {
        let hash = self.table.hash_of(&key);
        match self.table.find_index(hash, |e| e.key == key) {
            Some(idx) => &self.table.slot(idx).value,
            None => {
                let (idx, _) = self.table.insert(MapEntry {
                    key,
                    value: make(),
                });
                &self.table.slot(idx).value
            }
        }
    }

    /// Iterate entries in slot order.
    #[inline]
    pub fn iter(&self) -> impl Iterator<Item = (&K, &V)> {
        self.table.iter().map(|e| (&e.key, &e.value))
    }
}

impl<K: Hash + Eq, V> Default for HashMap<K, V> {
    #[inline]
    fn default() -> Self {
        Self::new()
    }
}

impl<K: Hash + Eq, V, S: BuildHasher> fmt::Debug for HashMap<K, V, S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HashMap")
            .field("len", &self.len())
            .field("capacity", &self.capacity())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::value::FixedStr;
    use rand::prelude::*;

    #[test]
    fn test_insert_then_find() {
        let mut table: HashTable<u64> = HashTable::with_capacity(64);
        for i in 0..32u64 {
            let (_, inserted) = table.insert(i * 7);
            assert!(inserted);
            assert!(table.contains(&(i * 7)));
        }
        assert_eq!(table.len(), 32);
        assert!(!table.contains(&1));
    }

    #[test]
    fn test_duplicate_insert_is_noop() {
        let mut table: HashTable<i32> = HashTable::with_capacity(16);
        let (slot_a, inserted) = table.insert(42);
        assert!(inserted);
        let (slot_b, inserted) = table.insert(42);
        assert!(!inserted);
        assert_eq!(slot_a, slot_b);
        assert_eq!(table.len(), 1);
    }

    #[test]
    fn test_growth_preserves_membership() {
        let mut table: HashTable<u32> = HashTable::with_capacity(8);
        // push far past 8 * 0.85 to force several rehashes
        for i in 0..1000u32 {
            table.insert(i);
        }
        assert_eq!(table.len(), 1000);
        assert!(table.capacity() > 8);
        assert!(table.load_factor() <= 1.0);
        for i in 0..1000u32 {
            assert!(table.contains(&i), "key {} lost in rehash", i);
        }
    }

    #[test]
    fn test_randomized_membership() {
        let mut rng = rand::rng();
        let mut table: HashTable<u64> = HashTable::with_capacity(32);
        let mut reference = std::collections::HashSet::new();
        for _ in 0..2000 {
            let key = rng.random_range(0..500u64);
            let (_, inserted) = table.insert(key);
            assert_eq!(inserted, reference.insert(key));
        }
        assert_eq!(table.len(), reference.len());
        for key in &reference {
            assert!(table.contains(key));
        }
        let mut seen: Vec<u64> = table.iter().copied().collect();
        seen.sort_unstable();
        let mut expected: Vec<u64> = reference.into_iter().collect();
        expected.sort_unstable();
        assert_eq!(seen, expected);
    }

    #[test]
    fn test_map_insert_get() {
        let mut map: HashMap<FixedStr<11>, u64> = HashMap::with_capacity(16);
        assert!(map.insert(FixedStr::new("TRUCK"), 10));
        assert!(map.insert(FixedStr::new("MAIL"), 20));
        // second insert with equal key keeps the first value
        assert!(!map.insert(FixedStr::new("TRUCK"), 99));
        assert_eq!(map.len(), 2);
        assert_eq!(map.get(&FixedStr::new("TRUCK")), Some(&10));
        assert_eq!(map.get(&FixedStr::new("SHIP")), None);
    }

    #[test]
    fn test_map_get_or_insert_with() {
        let mut map: HashMap<u32, u32> = HashMap::with_capacity(8);
        assert_eq!(*map.get_or_insert_with(5, || 50), 50);
        assert_eq!(*map.get_or_insert_with(5, || 99), 50);
        assert_eq!(map.len(), 1);
    }

    #[test]
    fn test_map_growth_keeps_values() {
        let mut map: HashMap<u32, String> = HashMap::with_capacity(4);
        for i in 0..300u32 {
            map.insert(i, format!("v{i}"));
        }
        assert_eq!(map.len(), 300);
        for i in 0..300u32 {
            assert_eq!(map.get(&i).map(String::as_str), Some(format!("v{i}").as_str()));
        }
    }
}
