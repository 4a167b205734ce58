//! Memo tables for the automaton algebra.
//!
//! Keys are reduced to a `u64` with a perfect hash ([`MyHash`]), so lookups never
//! collide and the table never evicts. The domain keeps one cache per memoized
//! operation (Büchi-intersection emptiness, tuple closures).

use std::cell::Cell;
use std::collections::HashMap;
use std::marker::PhantomData;

use crate::utils::MyHash;

pub struct Cache<K, V> {
    map: HashMap<u64, V>,
    hits: Cell<usize>,
    misses: Cell<usize>,
    _phantom: PhantomData<K>,
}

impl<K, V> Default for Cache<K, V> {
    fn default() -> Self {
        Self::new()
    }
}

impl<K, V> Cache<K, V> {
    pub fn new() -> Self {
        Self {
            map: HashMap::new(),
            hits: Cell::new(0),
            misses: Cell::new(0),
            _phantom: PhantomData,
        }
    }

    /// Returns the number of entries in the cache.
    pub fn len(&self) -> usize {
        self.map.len()
    }

    /// Returns true if the cache is empty.
    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }

    /// Get the number of cache hits.
    pub fn hits(&self) -> usize {
        self.hits.get()
    }
    /// Get the number of cache misses.
    pub fn misses(&self) -> usize {
        self.misses.get()
    }

    /// Reset the cache.
    pub fn clear(&mut self) {
        self.map.clear();
        self.hits.set(0);
        self.misses.set(0);
    }

    /// Get the cached result.
    pub fn get(&self, key: &K) -> Option<&V>
    where
        K: MyHash,
    {
        match self.map.get(&key.hash()) {
            Some(value) => {
                self.hits.set(self.hits.get() + 1);
                Some(value)
            }
            None => {
                self.misses.set(self.misses.get() + 1);
                None
            }
        }
    }

    /// Insert a result into the cache.
    pub fn insert(&mut self, key: &K, value: V)
    where
        K: MyHash,
    {
        self.map.insert(key.hash(), value);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_log::test;

    #[test]
    fn test_cache() {
        let mut cache = Cache::<(u64, u64), i32>::new();

        cache.insert(&(1, 2), 3);
        cache.insert(&(2, 3), 1);
        cache.insert(&(1, 3), 2);

        assert_eq!(cache.get(&(1, 2)), Some(&3));
        assert_eq!(cache.get(&(2, 3)), Some(&1));
        assert_eq!(cache.get(&(1, 3)), Some(&2));
        assert_eq!(cache.get(&(2, 1)), None);
        assert_eq!(cache.get(&(3, 3)), None);
        assert_eq!(cache.len(), 3);
    }

    #[test]
    fn test_hits_and_misses() {
        let mut cache = Cache::<u64, bool>::new();
        assert!(cache.get(&7).is_none());
        cache.insert(&7, true);
        assert_eq!(cache.get(&7), Some(&true));
        assert_eq!(cache.get(&7), Some(&true));
        assert_eq!(cache.hits(), 2);
        assert_eq!(cache.misses(), 1);

        cache.clear();
        assert!(cache.is_empty());
        assert_eq!(cache.hits(), 0);
    }
}
