//! Fixed-size key set used for held keys and hotkey bindings.

use std::fmt;
use std::str::FromStr;

use crate::keys::{KEY_ID_COUNT, KeyId, ParseKeyError};

const WORD_BITS: usize = u64::BITS as usize;
const WORDS: usize = KEY_ID_COUNT.div_ceil(WORD_BITS);

/// Unordered set of keys and mouse buttons held at the same time.
///
/// Backed by a bitset with one bit per [`KeyId`], so membership changes are
/// constant time and equality is exact set equality.
#[derive(Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct Chord {
    bits: [u64; WORDS],
}

impl Chord {
    #[inline]
    pub const fn new() -> Self {
        Self { bits: [0; WORDS] }
    }

    #[inline(always)]
    fn slot(key: KeyId) -> (usize, u64) {
        let index = key.index();
        (index / WORD_BITS, 1u64 << (index % WORD_BITS))
    }

    #[inline]
    pub fn contains(&self, key: KeyId) -> bool {
        let (word, mask) = Self::slot(key);
        self.bits[word] & mask != 0
    }

    /// Adds `key`, returning `false` if it was already present.
    #[inline]
    pub fn insert(&mut self, key: KeyId) -> bool {
        let (word, mask) = Self::slot(key);
        let added = self.bits[word] & mask == 0;
        self.bits[word] |= mask;
        added
    }

    /// Removes `key`, returning `false` if it was not present.
    #[inline]
    pub fn remove(&mut self, key: KeyId) -> bool {
        let (word, mask) = Self::slot(key);
        let removed = self.bits[word] & mask != 0;
        self.bits[word] &= !mask;
        removed
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.bits.iter().all(|&w| w == 0)
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.bits.iter().map(|w| w.count_ones() as usize).sum()
    }

    #[inline]
    pub fn clear(&mut self) {
        self.bits = [0; WORDS];
    }

    /// Iterates members in ascending index order (keyboard keys first).
    pub fn iter(&self) -> impl Iterator<Item = KeyId> + '_ {
        self.bits.iter().enumerate().flat_map(|(word, &bits)| {
            let mut remaining = bits;
            std::iter::from_fn(move || {
                if remaining == 0 {
                    return None;
                }
                let bit = remaining.trailing_zeros() as usize;
                remaining &= remaining - 1;
                KeyId::from_index(word * WORD_BITS + bit)
            })
        })
    }
}

impl FromIterator<KeyId> for Chord {
    fn from_iter<I: IntoIterator<Item = KeyId>>(iter: I) -> Self {
        let mut chord = Chord::new();
        for key in iter {
            chord.insert(key);
        }
        chord
    }
}

impl<const N: usize> From<[KeyId; N]> for Chord {
    fn from(keys: [KeyId; N]) -> Self {
        keys.into_iter().collect()
    }
}

impl fmt::Display for Chord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, key) in self.iter().enumerate() {
            if i > 0 {
                f.write_str("+")?;
            }
            write!(f, "{}", key)?;
        }
        Ok(())
    }
}

impl fmt::Debug for Chord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_set().entries(self.iter()).finish()
    }
}

/// Parses `+`-separated key names such as `LCTRL+LSHIFT+F1`.
impl FromStr for Chord {
    type Err = ParseKeyError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.trim().is_empty() {
            return Err(ParseKeyError::Empty);
        }
        s.split('+').map(str::parse::<KeyId>).collect()
    }
}
