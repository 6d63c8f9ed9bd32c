//! # kmerdb - Embedded K-mer Frequency Index
//!
//! kmerdb indexes DNA sequence data: it extracts every fixed-length
//! subsequence (k-mer) from a symbol stream, encodes each as a compact 2-bit
//! packed integer key, and maintains a persistent occurrence count per unique
//! key in an on-disk B-tree, so downstream analysis can ask "how many times
//! does k-mer X occur in this genome" without holding occurrences in memory.
//!
//! ## Quick Start
//!
//! ```ignore
//! use kmerdb::{KmerExtractor, KmerIndex};
//!
//! let mut index = KmerIndex::open("genome.kdx", 21, 64)?;
//!
//! let extractor = KmerExtractor::new(21)?;
//! index.upsert_all(extractor.keys(sequence.chars()))?;
//!
//! for entry in index.range_scan(low, high) {
//!     let entry = entry?;
//!     println!("{:#x} -> {}", entry.key, entry.count);
//! }
//! index.close()?;
//! ```
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────┐
//! │  genbank (ORIGIN..// record scan)    │
//! ├─────────────────────────────────────┤
//! │  kmer (Symbol codec + extractor)     │
//! ├─────────────────────────────────────┤
//! │  btree (KmerIndex: upsert/lookup/    │
//! │         range scan, node splits)     │
//! ├─────────────────────────────────────┤
//! │  storage (PageStore: header, node    │
//! │           pages, allocation)         │
//! ├─────────────────────────────────────┤
//! │  memory-mapped file I/O              │
//! └─────────────────────────────────────┘
//! ```
//!
//! ## File Format
//!
//! One file per index: a 64-byte header (magic, version, k, t, root page,
//! next free page) followed by fixed-size node pages. The page size is a
//! function of the minimum degree `t`; see [`storage`] for the exact layout.
//! All multi-byte fields are little-endian.
//!
//! ## Ownership and Concurrency
//!
//! Single-writer, single-process: `KmerIndex` owns one `PageStore`, which
//! owns one file handle and mapping, for their whole lifetime. The mutation
//! path is synchronous with no suspension points. Concurrent use requires an
//! external mutual-exclusion wrapper; nothing here locks.
//!
//! ## Error Handling
//!
//! Operations return `eyre::Result`; the typed taxonomy lives in
//! [`error::IndexError`] and can be recovered with
//! `Report::downcast_ref::<IndexError>()`. Malformed sequence data is never
//! an error (unknown characters are skipped, ambiguous bases reset the
//! window); malformed storage always is.
//!
//! ## Module Overview
//!
//! - [`kmer`]: symbol classification, 2-bit key codec, sliding-window
//!   extractor
//! - [`storage`]: paged storage over a memory-mapped file
//! - [`btree`]: the on-disk B-tree index
//! - [`genbank`]: GenBank-style record scanning into an index
//! - [`error`]: the error taxonomy

pub mod btree;
pub mod error;
pub mod genbank;
pub mod kmer;
pub mod storage;

pub use btree::{KmerIndex, RangeScan};
pub use error::IndexError;
pub use genbank::index_records;
pub use kmer::{decode, encode, Key, KmerExtractor, Symbol, MAX_K};
pub use storage::{IndexEntry, PageId, PageStore};
