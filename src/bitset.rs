//! Compact bit sets over small indices.
//!
//! Used for sets of monoid classes, sets of stable class pairs, and the
//! worklist of the forward dataflow solver.

use std::cmp::Ordering;
use std::hash::{Hash, Hasher};

/// A bit set backed by a vector of u64 words.
///
/// Two bit sets are equal when they contain the same indices, regardless of
/// how many trailing zero words either of them has allocated. Ordering is the
/// lexicographic order of their ascending index sequences.
#[derive(Debug, Clone, Default)]
pub struct BitSet {
    /// Storage: each u64 holds 64 bits
    words: Vec<u64>,
    /// Number of set bits (cached for O(1) len())
    count: usize,
}

impl BitSet {
    /// Number of bits per word.
    const BITS_PER_WORD: usize = 64;

    /// Creates a new empty bit set with the given capacity (in bits).
    pub fn new(capacity: usize) -> Self {
        let num_words = capacity.div_ceil(Self::BITS_PER_WORD);
        Self {
            words: vec![0; num_words],
            count: 0,
        }
    }

    /// Creates an empty bit set with no pre-allocated capacity.
    pub fn empty() -> Self {
        Self {
            words: Vec::new(),
            count: 0,
        }
    }

    /// Creates a bit set containing exactly one index.
    pub fn singleton(index: usize) -> Self {
        let mut bs = Self::empty();
        bs.insert(index);
        bs
    }

    /// Creates a bit set with all indices in `0..n` set.
    pub fn full(n: usize) -> Self {
        let mut bs = Self::new(n);
        bs.extend(0..n);
        bs
    }

    /// Returns the number of set bits.
    #[inline]
    pub fn len(&self) -> usize {
        self.count
    }

    /// Returns true if no bits are set.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.count == 0
    }

    #[inline]
    fn word_and_bit(index: usize) -> (usize, usize) {
        (index / Self::BITS_PER_WORD, index % Self::BITS_PER_WORD)
    }

    /// Returns true if the bit at the given index is set.
    #[inline]
    pub fn contains(&self, index: usize) -> bool {
        let (word_idx, bit_idx) = Self::word_and_bit(index);
        match self.words.get(word_idx) {
            Some(word) => (word & (1u64 << bit_idx)) != 0,
            None => false,
        }
    }

    /// Sets the bit at the given index. Returns true if the bit was not previously set.
    #[inline]
    pub fn insert(&mut self, index: usize) -> bool {
        let (word_idx, bit_idx) = Self::word_and_bit(index);

        if word_idx >= self.words.len() {
            self.words.resize(word_idx + 1, 0);
        }

        let mask = 1u64 << bit_idx;
        let was_clear = (self.words[word_idx] & mask) == 0;
        if was_clear {
            self.words[word_idx] |= mask;
            self.count += 1;
        }
        was_clear
    }

    /// Clears the bit at the given index. Returns true if the bit was previously set.
    #[inline]
    pub fn remove(&mut self, index: usize) -> bool {
        let (word_idx, bit_idx) = Self::word_and_bit(index);
        if word_idx >= self.words.len() {
            return false;
        }

        let mask = 1u64 << bit_idx;
        let was_set = (self.words[word_idx] & mask) != 0;
        if was_set {
            self.words[word_idx] &= !mask;
            self.count -= 1;
        }
        was_set
    }

    /// Returns the smallest set index that is `>= from`, if any.
    pub fn next_set_bit(&self, from: usize) -> Option<usize> {
        let (mut word_idx, bit_idx) = Self::word_and_bit(from);
        if word_idx >= self.words.len() {
            return None;
        }

        // Mask off the bits below `from` in the first word.
        let mut word = self.words[word_idx] & (u64::MAX << bit_idx);
        loop {
            if word != 0 {
                return Some(word_idx * Self::BITS_PER_WORD + word.trailing_zeros() as usize);
            }
            word_idx += 1;
            if word_idx >= self.words.len() {
                return None;
            }
            word = self.words[word_idx];
        }
    }

    /// Returns true if every index of `self` is also in `other`.
    pub fn is_subset(&self, other: &BitSet) -> bool {
        self.words.iter().enumerate().all(|(i, &w)| {
            let o = other.words.get(i).copied().unwrap_or(0);
            w & !o == 0
        })
    }

    /// Adds every index of `other` to `self`. Returns true if `self` changed.
    pub fn union_with(&mut self, other: &BitSet) -> bool {
        if other.words.len() > self.words.len() {
            self.words.resize(other.words.len(), 0);
        }
        let before = self.count;
        for (w, &o) in self.words.iter_mut().zip(other.words.iter()) {
            *w |= o;
        }
        self.count = self.words.iter().map(|w| w.count_ones() as usize).sum();
        self.count != before
    }

    /// Clears all bits.
    pub fn clear(&mut self) {
        for word in &mut self.words {
            *word = 0;
        }
        self.count = 0;
    }

    /// Extends the bit set by setting all bits from an iterator.
    pub fn extend(&mut self, iter: impl IntoIterator<Item = usize>) {
        for index in iter {
            self.insert(index);
        }
    }

    /// Returns an iterator over all set bit indices.
    pub fn iter(&self) -> BitSetIter<'_> {
        BitSetIter {
            bitset: self,
            word_idx: 0,
            current_word: self.words.first().copied().unwrap_or(0),
        }
    }
}

impl PartialEq for BitSet {
    fn eq(&self, other: &Self) -> bool {
        self.count == other.count && self.is_subset(other)
    }
}

impl Eq for BitSet {}

impl Hash for BitSet {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.count.hash(state);
        for index in self.iter() {
            index.hash(state);
        }
    }
}

impl PartialOrd for BitSet {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for BitSet {
    fn cmp(&self, other: &Self) -> Ordering {
        self.iter().cmp(other.iter())
    }
}

impl FromIterator<usize> for BitSet {
    fn from_iter<T: IntoIterator<Item = usize>>(iter: T) -> Self {
        let mut bs = BitSet::empty();
        bs.extend(iter);
        bs
    }
}

/// Iterator over set bits in a BitSet.
pub struct BitSetIter<'a> {
    bitset: &'a BitSet,
    word_idx: usize,
    current_word: u64,
}

impl Iterator for BitSetIter<'_> {
    type Item = usize;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            if self.current_word != 0 {
                let bit_idx = self.current_word.trailing_zeros() as usize;
                self.current_word &= self.current_word - 1; // Clear lowest set bit
                return Some(self.word_idx * BitSet::BITS_PER_WORD + bit_idx);
            }

            self.word_idx += 1;
            if self.word_idx >= self.bitset.words.len() {
                return None;
            }
            self.current_word = self.bitset.words[self.word_idx];
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_log::test;

    #[test]
    fn test_empty() {
        let bs = BitSet::empty();
        assert!(bs.is_empty());
        assert_eq!(bs.len(), 0);
        assert!(!bs.contains(0));
        assert!(!bs.contains(100));
    }

    #[test]
    fn test_insert_remove() {
        let mut bs = BitSet::new(100);
        assert!(bs.insert(42));
        assert!(!bs.insert(42)); // Already set
        assert!(bs.contains(42));
        assert!(bs.remove(42));
        assert!(!bs.remove(42));
        assert!(bs.is_empty());
    }

    #[test]
    fn test_equality_ignores_capacity() {
        let mut a = BitSet::new(1000);
        let mut b = BitSet::empty();
        a.insert(3);
        b.insert(3);
        assert_eq!(a, b);

        b.insert(700);
        b.remove(700);
        assert_eq!(a, b);
    }

    #[test]
    fn test_ordering() {
        let a: BitSet = [1, 5].into_iter().collect();
        let b: BitSet = [1, 6].into_iter().collect();
        let c: BitSet = [1].into_iter().collect();
        assert!(a < b);
        assert!(c < a);
        assert!(BitSet::empty() < c);
    }

    #[test]
    fn test_next_set_bit() {
        let bs: BitSet = [3, 64, 130].into_iter().collect();
        assert_eq!(bs.next_set_bit(0), Some(3));
        assert_eq!(bs.next_set_bit(3), Some(3));
        assert_eq!(bs.next_set_bit(4), Some(64));
        assert_eq!(bs.next_set_bit(65), Some(130));
        assert_eq!(bs.next_set_bit(131), None);
        assert_eq!(bs.next_set_bit(10_000), None);
    }

    #[test]
    fn test_subset_and_union() {
        let mut a: BitSet = [1, 2].into_iter().collect();
        let b: BitSet = [1, 2, 100].into_iter().collect();
        assert!(a.is_subset(&b));
        assert!(!b.is_subset(&a));

        assert!(a.union_with(&b));
        assert_eq!(a, b);
        assert_eq!(a.len(), 3);
        assert!(!a.union_with(&b));
    }

    #[test]
    fn test_iter() {
        let bs: BitSet = [5, 10, 3, 64, 65].into_iter().collect();
        let indices: Vec<_> = bs.iter().collect();
        assert_eq!(indices, vec![3, 5, 10, 64, 65]);
    }

    #[test]
    fn test_full_and_clear() {
        let mut bs = BitSet::full(70);
        assert_eq!(bs.len(), 70);
        assert!(bs.contains(69));
        bs.clear();
        assert!(bs.is_empty());
        assert!(!bs.contains(1));
    }
}
