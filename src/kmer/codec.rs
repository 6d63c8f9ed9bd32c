//! # Symbol Alphabet and 2-bit Key Codec
//!
//! A k-mer key packs k bases into a `u64`, two bits per base, first base in
//! the most significant occupied bits:
//!
//! ```text
//! "ATC" (k=3)  ->  00 11 01  ->  0b001101  ->  13
//! ```
//!
//! Code table (fixed, load-bearing for on-disk compatibility):
//!
//! | Base | Code |
//! |------|------|
//! | A    | 00   |
//! | C    | 01   |
//! | G    | 10   |
//! | T    | 11   |
//!
//! Classification is a single exhaustive match from `char` to the closed
//! [`Symbol`] alphabet; everything downstream dispatches on the enum, never
//! on raw characters.

use eyre::Result;

use crate::error::IndexError;

/// Packed 2-bit-per-base k-mer encoding. Holds any k-mer with k <= 32.
pub type Key = u64;

/// Largest supported k-mer length: 32 bases fill all 64 bits of a [`Key`].
pub const MAX_K: usize = 32;

/// One classified input character.
///
/// `N` is the ambiguity marker (unknown base); `Other` covers every character
/// that is not part of a sequence (digits, whitespace, punctuation).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Symbol {
    A,
    C,
    G,
    T,
    N,
    Other,
}

impl Symbol {
    /// Classify a raw character, case-insensitively.
    #[inline]
    pub const fn classify(c: char) -> Self {
        match c {
            'A' | 'a' => Symbol::A,
            'C' | 'c' => Symbol::C,
            'G' | 'g' => Symbol::G,
            'T' | 't' => Symbol::T,
            'N' | 'n' => Symbol::N,
            _ => Symbol::Other,
        }
    }

    /// The 2-bit code of a base; `None` for `N` and `Other`.
    #[inline]
    pub const fn code(self) -> Option<u8> {
        match self {
            Symbol::A => Some(0b00),
            Symbol::C => Some(0b01),
            Symbol::G => Some(0b10),
            Symbol::T => Some(0b11),
            Symbol::N | Symbol::Other => None,
        }
    }

    /// Inverse of [`Symbol::code`] for the two low bits.
    #[inline]
    pub const fn from_code(bits: u8) -> Self {
        match bits & 0b11 {
            0b00 => Symbol::A,
            0b01 => Symbol::C,
            0b10 => Symbol::G,
            _ => Symbol::T,
        }
    }

    /// Uppercase display character.
    #[inline]
    pub const fn to_char(self) -> char {
        match self {
            Symbol::A => 'A',
            Symbol::C => 'C',
            Symbol::G => 'G',
            Symbol::T => 'T',
            Symbol::N => 'N',
            Symbol::Other => '?',
        }
    }
}

/// Encode a window of symbols into its packed key.
///
/// Fails with [`IndexError::InvalidSymbol`] if any element is not one of
/// {A, C, G, T}. Callers must never pass a window containing N: the
/// extractor resets its window on ambiguity instead of encoding it.
pub fn encode(window: &[Symbol]) -> Result<Key> {
    if window.is_empty() || window.len() > MAX_K {
        return Err(IndexError::InvalidKmerLength(window.len() as u32).into());
    }

    let mut key: Key = 0;
    for &sym in window {
        let code = sym
            .code()
            .ok_or(IndexError::InvalidSymbol(sym.to_char()))?;
        key = (key << 2) | code as Key;
    }
    Ok(key)
}

/// Decode a key back into its k symbols. Diagnostics and testing only;
/// the index itself never needs to reverse a key.
pub fn decode(key: Key, k: usize) -> Vec<Symbol> {
    debug_assert!(k >= 1 && k <= MAX_K);
    (0..k)
        .map(|i| {
            let shift = 2 * (k - 1 - i);
            Symbol::from_code((key >> shift) as u8)
        })
        .collect()
}

/// Render a key as its base string, for diagnostics.
pub fn to_string(key: Key, k: usize) -> String {
    decode(key, k).iter().map(|s| s.to_char()).collect()
}
