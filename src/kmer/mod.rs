//! # K-mer Extraction Pipeline
//!
//! This module turns a stream of raw sequence characters into a lazy sequence
//! of encoded k-mer keys:
//!
//! ```text
//! chars ──> Symbol::classify ──> KmerExtractor::feed ──> Key (u64)
//! ```
//!
//! - [`codec`]: the closed `Symbol` alphabet and the 2-bit packing between a
//!   window of symbols and its integer key.
//! - [`extractor`]: the sliding-window state machine that handles overlapping
//!   windows, case folding, and ambiguous-base resets without re-scanning
//!   input.
//!
//! ## Key ordering
//!
//! Keys order by unsigned integer value. With the fixed code table
//! (A=00, C=01, G=10, T=11) this order is an artifact of bit packing, not
//! alphabetical symbol order; it exists purely to give the B-tree a total
//! order and must stay byte-for-byte stable across versions so tree shapes
//! are reproducible.

pub mod codec;
pub mod extractor;

pub use codec::{decode, encode, Key, Symbol, MAX_K};
pub use extractor::{Keys, KmerExtractor};
