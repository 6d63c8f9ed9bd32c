//! # On-Disk B-tree Index
//!
//! The ordering/search/insert logic over [`crate::storage::PageStore`]: a
//! classic B-tree (counts live in every node, not just leaves) keyed by
//! encoded k-mer values.
//!
//! ```text
//! caller ──> KmerIndex::upsert(key) ──> PageStore::read/write(page)
//!        ──> KmerIndex::lookup(key)
//!        ──> KmerIndex::range_scan(low, high)
//! ```
//!
//! Inserts use the split-on-the-way-down policy: a full child is split
//! before the descent enters it, so the current node always has room for the
//! promoted median and no second upward pass is ever needed. A full root is
//! split first, growing the tree by one level.
//!
//! The tree never shrinks: counts only increase and keys are never deleted.

mod tree;

pub use tree::{KmerIndex, RangeScan};
