//! # Storage Layer
//!
//! Durable paged storage for B-tree nodes over a single random-access file,
//! accessed through a memory mapping.
//!
//! ## File Layout
//!
//! ```text
//! +--------------------+
//! | File Header (64B)  |  magic, version, k, t, root page, next free page
//! +--------------------+
//! | Page 1             |  one B-tree node, fixed size
//! +--------------------+
//! | Page 2             |
//! +--------------------+
//! | ...                |
//! +--------------------+
//! ```
//!
//! The page size is constant per store and computable from the minimum
//! degree `t`:
//!
//! ```text
//! page_size = 8 + (2t-1) * 16 + 2t * 8
//! offset(page) = FILE_HEADER_SIZE + (page - 1) * page_size
//! ```
//!
//! Page ids are 1-based; id 0 is reserved as the null child reference, so a
//! zero-filled child slot always reads as "absent".
//!
//! ## Durability Model
//!
//! There is no WAL. A node write copies the full fixed-size record from a
//! staging buffer into the mapping in one operation, and the header is
//! rewritten after every allocation and root change, so a crash mid-split
//! leaks at worst an orphaned allocated page — never a reference to an
//! unwritten one. `sync` flushes the mapping; drop syncs best-effort.
//!
//! ## Module Organization
//!
//! - `header`: the zerocopy 64-byte file header
//! - `mmap`: low-level mapped byte storage with grow/remap
//! - `node`: the fixed-width node page codec
//! - `pager`: `PageStore` — allocation, node read/write, metadata
//!
//! ## Thread Safety
//!
//! `PageStore` is single-owner, single-writer. External synchronization is
//! required if an index must be shared; nothing in this layer locks.

mod header;
mod mmap;
mod node;
mod pager;

pub use header::{IndexFileHeader, CURRENT_VERSION, INDEX_MAGIC};
pub use mmap::MmapStorage;
pub use node::{node_page_size, IndexEntry, Node, PageId, NODE_HEADER_SIZE};
pub use pager::PageStore;

/// Size of the fixed header region at the start of every index file.
pub const FILE_HEADER_SIZE: usize = 64;
