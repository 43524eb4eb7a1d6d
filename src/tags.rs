//! Arbitrary-width category flags attached to boxes.

use std::fmt;

use smallvec::SmallVec;

const WORD_BITS: usize = u64::BITS as usize;

/// A category flag that maps to a bit index.
///
/// Implement this for a game's tag enum, e.g.
/// `impl Tag for Kind { fn bit(self) -> usize { self as usize } }`.
pub trait Tag: Copy {
    fn bit(self) -> usize;
}

impl Tag for usize {
    fn bit(self) -> usize {
        self
    }
}

impl Tag for u32 {
    fn bit(self) -> usize {
        self as usize
    }
}

impl Tag for u16 {
    fn bit(self) -> usize {
        self as usize
    }
}

impl Tag for u8 {
    fn bit(self) -> usize {
        self as usize
    }
}

/// Growable bitset of tags. The first 128 bits live inline.
///
/// Trailing zero words are always trimmed, so equal sets compare and hash equal
/// regardless of how many bits they once held.
#[derive(Clone, Default, PartialEq, Eq, Hash)]
pub struct TagSet {
    words: SmallVec<[u64; 2]>,
}

impl TagSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets `tag`; returns true if it was not already set.
    pub fn insert<T: Tag>(&mut self, tag: T) -> bool {
        let (w, mask) = split(tag.bit());
        if self.words.len() <= w {
            self.words.resize(w + 1, 0);
        }
        let was = self.words[w] & mask != 0;
        self.words[w] |= mask;
        !was
    }

    /// Clears `tag`; returns true if it was set.
    pub fn remove<T: Tag>(&mut self, tag: T) -> bool {
        let (w, mask) = split(tag.bit());
        let Some(word) = self.words.get_mut(w) else {
            return false;
        };
        let was = *word & mask != 0;
        *word &= !mask;
        self.trim();
        was
    }

    pub fn contains<T: Tag>(&self, tag: T) -> bool {
        let (w, mask) = split(tag.bit());
        self.words.get(w).is_some_and(|word| word & mask != 0)
    }

    /// Adds every tag of `other`.
    pub fn union_with(&mut self, other: &TagSet) {
        if self.words.len() < other.words.len() {
            self.words.resize(other.words.len(), 0);
        }
        for (a, b) in self.words.iter_mut().zip(other.words.iter()) {
            *a |= *b;
        }
    }

    /// Removes every tag of `other`.
    pub fn subtract(&mut self, other: &TagSet) {
        for (a, b) in self.words.iter_mut().zip(other.words.iter()) {
            *a &= !*b;
        }
        self.trim();
    }

    /// At least one tag in common. False when `other` is empty.
    pub fn has_any(&self, other: &TagSet) -> bool {
        self.words
            .iter()
            .zip(other.words.iter())
            .any(|(a, b)| a & b != 0)
    }

    /// Every tag of `other` is present. True when `other` is empty.
    pub fn has_all(&self, other: &TagSet) -> bool {
        other.words.iter().enumerate().all(|(i, b)| {
            let a = self.words.get(i).copied().unwrap_or(0);
            a & b == *b
        })
    }

    pub fn is_empty(&self) -> bool {
        self.words.is_empty()
    }

    pub fn len(&self) -> usize {
        self.words.iter().map(|w| w.count_ones() as usize).sum()
    }

    /// Set bit indices in ascending order.
    pub fn iter(&self) -> impl Iterator<Item = usize> + '_ {
        self.words.iter().enumerate().flat_map(|(i, &word)| {
            (0..WORD_BITS)
                .filter(move |b| word & (1u64 << b) != 0)
                .map(move |b| i * WORD_BITS + b)
        })
    }

    fn trim(&mut self) {
        while self.words.last() == Some(&0) {
            self.words.pop();
        }
    }
}

fn split(bit: usize) -> (usize, u64) {
    (bit / WORD_BITS, 1u64 << (bit % WORD_BITS))
}

impl<T: Tag> FromIterator<T> for TagSet {
    fn from_iter<I: IntoIterator<Item = T>>(iter: I) -> Self {
        let mut set = TagSet::new();
        set.extend(iter);
        set
    }
}

impl<T: Tag> Extend<T> for TagSet {
    fn extend<I: IntoIterator<Item = T>>(&mut self, iter: I) {
        for tag in iter {
            self.insert(tag);
        }
    }
}

impl fmt::Debug for TagSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_set().entries(self.iter()).finish()
    }
}
