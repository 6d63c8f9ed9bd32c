//! # Sliding-Window K-mer Extractor
//!
//! Streams characters in, streams encoded keys out. The window is a rolling
//! 2-bit buffer: each base shifts in at the low end and the oldest base falls
//! off the high end under the `2k`-bit mask, so every window position is
//! encoded incrementally without re-scanning input.
//!
//! ## Input handling
//!
//! | Input class        | Effect                                        |
//! |--------------------|-----------------------------------------------|
//! | A/C/G/T (any case) | shifted into the window                       |
//! | N (any case)       | window cleared; spanning k-mers invalidated   |
//! | anything else      | skipped silently, window unchanged            |
//!
//! A key is produced once k valid bases have accumulated since the last
//! reset, then one more per subsequent base. The sequence of keys is lazy and
//! finite; there is no rewind — construct a new extractor to restart.

use crate::error::IndexError;
use crate::kmer::codec::{Key, Symbol, MAX_K};

/// Incremental extractor over a character stream.
#[derive(Debug, Clone)]
pub struct KmerExtractor {
    k: usize,
    /// Mask covering the low `2k` bits of the window.
    mask: u64,
    /// Rolling 2-bit-per-base window; only the low `2k` bits are live.
    window: u64,
    /// Valid bases accumulated since the last reset, capped at k.
    filled: usize,
}

impl KmerExtractor {
    pub fn new(k: usize) -> Result<Self, IndexError> {
        if k < 1 || k > MAX_K {
            return Err(IndexError::InvalidKmerLength(k as u32));
        }
        Ok(Self {
            k,
            mask: u64::MAX >> (64 - 2 * k),
            window: 0,
            filled: 0,
        })
    }

    pub fn k(&self) -> usize {
        self.k
    }

    /// Feed one character; returns the encoded key when the window is full.
    #[inline]
    pub fn feed(&mut self, c: char) -> Option<Key> {
        let sym = Symbol::classify(c);
        match sym.code() {
            Some(code) => {
                self.window = ((self.window << 2) | code as u64) & self.mask;
                if self.filled < self.k {
                    self.filled += 1;
                }
                (self.filled == self.k).then_some(self.window)
            }
            None => {
                if sym == Symbol::N {
                    self.reset();
                }
                None
            }
        }
    }

    /// Clear the window, as if an ambiguous base had just been seen.
    pub fn reset(&mut self) {
        self.window = 0;
        self.filled = 0;
    }

    /// Adapt a character iterator into a lazy key iterator.
    pub fn keys<I>(self, chars: I) -> Keys<I::IntoIter>
    where
        I: IntoIterator<Item = char>,
    {
        Keys {
            extractor: self,
            chars: chars.into_iter(),
        }
    }
}

/// Lazy key sequence over a character stream. See [`KmerExtractor::keys`].
#[derive(Debug)]
pub struct Keys<I> {
    extractor: KmerExtractor,
    chars: I,
}

impl<I: Iterator<Item = char>> Iterator for Keys<I> {
    type Item = Key;

    fn next(&mut self) -> Option<Key> {
        loop {
            let c = self.chars.next()?;
            if let Some(key) = self.extractor.feed(c) {
                return Some(key);
            }
        }
    }
}
