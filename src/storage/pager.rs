//! # Page Store
//!
//! `PageStore` owns the index file for its lifetime: it allocates pages,
//! reads and writes nodes at stable page ids, and keeps the persisted header
//! metadata (k, t, root page, next free page) in sync with the file.
//!
//! ## Allocation
//!
//! Pages are never freed (counts only accumulate, deletion is out of scope),
//! so allocation is a bump of `next_free`. The mapping grows in fixed chunks
//! to amortize remaps. The header is rewritten after every allocation and
//! root change: a crash between a child write and its parent write then
//! leaks at most an orphaned page — a reopen can never hand the same id out
//! twice under a live reference.
//!
//! ## Write Atomicity
//!
//! `write_node` encodes into an internal staging buffer and copies the full
//! fixed-size record into the mapping in one operation, so a page is never
//! observable with mixed old/new bytes at record granularity. Best-effort:
//! there is no WAL.

use std::path::Path;

use eyre::Result;
use tracing::debug;
use zerocopy::IntoBytes;

use super::header::IndexFileHeader;
use super::mmap::MmapStorage;
use super::node::{node_page_size, Node, PageId};
use super::FILE_HEADER_SIZE;
use crate::error::IndexError;
use crate::kmer::MAX_K;

/// Pages added per file extension.
const GROW_CHUNK_PAGES: u64 = 64;

#[derive(Debug)]
pub struct PageStore {
    storage: MmapStorage,
    page_size: usize,
    k: u32,
    degree: u32,
    root_page: PageId,
    next_free: PageId,
    /// Staging buffer for whole-page writes, one page long.
    scratch: Vec<u8>,
}

impl PageStore {
    /// Open a store, creating it (header plus an empty leaf root) when the
    /// file is missing or empty.
    ///
    /// Fails with [`IndexError::InvalidKmerLength`] / [`IndexError::InvalidDegree`]
    /// for out-of-range parameters, and [`IndexError::ParameterMismatch`]
    /// when an existing file was created with different ones.
    pub fn open<P: AsRef<Path>>(path: P, k: u32, degree: u32) -> Result<Self> {
        if k < 1 || k as usize > MAX_K {
            return Err(IndexError::InvalidKmerLength(k).into());
        }
        if degree < 2 {
            return Err(IndexError::InvalidDegree(degree).into());
        }

        let path = path.as_ref();
        let exists = path.metadata().map(|m| m.len() > 0).unwrap_or(false);
        if exists {
            Self::open_existing(path, k, degree)
        } else {
            Self::create(path, k, degree)
        }
    }

    fn create(path: &Path, k: u32, degree: u32) -> Result<Self> {
        let page_size = node_page_size(degree);
        let initial_len = FILE_HEADER_SIZE as u64 + GROW_CHUNK_PAGES * page_size as u64;

        let storage = MmapStorage::create(path, initial_len)?;
        let mut store = Self {
            storage,
            page_size,
            k,
            degree,
            root_page: 0,
            next_free: 1,
            scratch: vec![0u8; page_size],
        };

        let root = store.allocate()?;
        store.write_node(root, &Node::new_leaf())?;
        store.set_root(root)?;
        store.sync()?;

        debug!(path = %path.display(), k, degree, page_size, "created index store");
        Ok(store)
    }

    fn open_existing(path: &Path, k: u32, degree: u32) -> Result<Self> {
        let storage = MmapStorage::open(path)?;

        let (file_k, file_degree, root_page, next_free) = {
            let header = IndexFileHeader::from_bytes(storage.region(0, FILE_HEADER_SIZE)?)?;
            (
                header.k(),
                header.degree(),
                header.root_page(),
                header.next_free(),
            )
        };

        if file_k != k || file_degree != degree {
            return Err(IndexError::ParameterMismatch {
                file_k,
                file_t: file_degree,
                k,
                t: degree,
            }
            .into());
        }

        if root_page == 0 || root_page >= next_free {
            return Err(IndexError::CorruptHeader(format!(
                "root page {root_page} out of range (next free {next_free})"
            ))
            .into());
        }

        let page_size = node_page_size(degree);
        debug!(path = %path.display(), k, degree, root_page, next_free, "opened index store");

        Ok(Self {
            storage,
            page_size,
            k,
            degree,
            root_page,
            next_free,
            scratch: vec![0u8; page_size],
        })
    }

    pub fn k(&self) -> u32 {
        self.k
    }

    pub fn degree(&self) -> u32 {
        self.degree
    }

    pub fn page_size(&self) -> usize {
        self.page_size
    }

    pub fn root_page(&self) -> PageId {
        self.root_page
    }

    fn offset(&self, page: PageId) -> u64 {
        FILE_HEADER_SIZE as u64 + (page - 1) * self.page_size as u64
    }

    /// Hand out the next unused page id, growing the file if needed. The
    /// fresh page is zero-initialized.
    pub fn allocate(&mut self) -> Result<PageId> {
        let page = self.next_free;
        let end = self.offset(page) + self.page_size as u64;

        if end > self.storage.len() {
            let new_len =
                FILE_HEADER_SIZE as u64 + (page - 1 + GROW_CHUNK_PAGES) * self.page_size as u64;
            self.storage.grow(new_len)?;
            debug!(new_len, page, "grew index file");
        }

        let offset = self.offset(page);
        self.storage.region_mut(offset, self.page_size)?.fill(0);

        self.next_free = page + 1;
        self.write_header()?;
        Ok(page)
    }

    /// Read and validate the node stored at `page`.
    pub fn read_node(&self, page: PageId) -> Result<Node> {
        self.check_page(page)?;
        let buf = self.storage.region(self.offset(page), self.page_size)?;
        Node::decode(page, self.degree, buf)
    }

    /// Overwrite `page` with `node` in a single full-page copy.
    pub fn write_node(&mut self, page: PageId, node: &Node) -> Result<()> {
        self.check_page(page)?;
        node.encode_into(self.degree, &mut self.scratch);
        let region = self.storage.region_mut(self.offset(page), self.page_size)?;
        region.copy_from_slice(&self.scratch);
        Ok(())
    }

    fn check_page(&self, page: PageId) -> Result<()> {
        if page == 0 || page >= self.next_free {
            return Err(IndexError::CorruptPage {
                page,
                reason: format!("page reference out of range (next free {})", self.next_free),
            }
            .into());
        }
        let end = self.offset(page) + self.page_size as u64;
        if end > self.storage.len() {
            return Err(IndexError::CorruptPage {
                page,
                reason: format!(
                    "page extends past end of file ({} > {})",
                    end,
                    self.storage.len()
                ),
            }
            .into());
        }
        Ok(())
    }

    /// Install a new root page and persist the header.
    pub fn set_root(&mut self, page: PageId) -> Result<()> {
        self.root_page = page;
        self.write_header()
    }

    fn write_header(&mut self) -> Result<()> {
        let header = IndexFileHeader::new(self.k, self.degree, self.root_page, self.next_free);
        self.storage
            .region_mut(0, FILE_HEADER_SIZE)?
            .copy_from_slice(header.as_bytes());
        Ok(())
    }

    /// Flush all pages and metadata to disk.
    pub fn sync(&self) -> Result<()> {
        self.storage.sync()
    }
}

impl Drop for PageStore {
    fn drop(&mut self) {
        // Header is persisted on every change; flushing is best-effort here.
        let _ = self.storage.sync();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::node::IndexEntry;

    fn temp_store(k: u32, t: u32) -> (PageStore, tempfile::TempDir) {
        let dir = tempfile::tempdir().unwrap();
        let store = PageStore::open(dir.path().join("index.kdx"), k, t).unwrap();
        (store, dir)
    }

    #[test]
    fn create_initializes_empty_leaf_root() {
        let (store, _dir) = temp_store(3, 2);
        assert_eq!(store.root_page(), 1);

        let root = store.read_node(store.root_page()).unwrap();
        assert!(root.leaf);
        assert!(root.entries.is_empty());
    }

    #[test]
    fn rejects_invalid_parameters() {
        let dir = tempfile::tempdir().unwrap();

        let err = PageStore::open(dir.path().join("a.kdx"), 3, 1).unwrap_err();
        assert!(matches!(
            err.downcast_ref::<IndexError>(),
            Some(IndexError::InvalidDegree(1))
        ));

        let err = PageStore::open(dir.path().join("b.kdx"), 0, 2).unwrap_err();
        assert!(matches!(
            err.downcast_ref::<IndexError>(),
            Some(IndexError::InvalidKmerLength(0))
        ));

        let err = PageStore::open(dir.path().join("c.kdx"), 33, 2).unwrap_err();
        assert!(matches!(
            err.downcast_ref::<IndexError>(),
            Some(IndexError::InvalidKmerLength(33))
        ));
    }

    #[test]
    fn nodes_round_trip_through_pages() {
        let (mut store, _dir) = temp_store(3, 2);

        let page = store.allocate().unwrap();
        let node = Node {
            leaf: true,
            entries: vec![IndexEntry { key: 7, count: 2 }],
            children: vec![],
        };
        store.write_node(page, &node).unwrap();
        assert_eq!(store.read_node(page).unwrap(), node);
    }

    #[test]
    fn allocation_survives_chunk_boundary() {
        let (mut store, _dir) = temp_store(3, 2);

        // Force at least one grow past the initial chunk.
        let pages: Vec<PageId> = (0..GROW_CHUNK_PAGES * 2 + 3)
            .map(|_| store.allocate().unwrap())
            .collect();

        for (i, pair) in pages.windows(2).enumerate() {
            assert_eq!(pair[1], pair[0] + 1, "ids not contiguous at {i}");
        }

        let node = Node::new_leaf();
        let last = *pages.last().unwrap();
        store.write_node(last, &node).unwrap();
        assert_eq!(store.read_node(last).unwrap(), node);
    }

    #[test]
    fn metadata_persists_across_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("index.kdx");

        let (root, next) = {
            let mut store = PageStore::open(&path, 5, 3).unwrap();
            let page = store.allocate().unwrap();
            store
                .write_node(
                    page,
                    &Node {
                        leaf: true,
                        entries: vec![IndexEntry { key: 1, count: 1 }],
                        children: vec![],
                    },
                )
                .unwrap();
            store.set_root(page).unwrap();
            store.sync().unwrap();
            (page, page + 1)
        };

        let store = PageStore::open(&path, 5, 3).unwrap();
        assert_eq!(store.root_page(), root);
        let node = store.read_node(root).unwrap();
        assert_eq!(node.entries[0].key, 1);
        assert!(store.read_node(next).is_err());
    }

    #[test]
    fn reopen_with_different_parameters_fails() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("index.kdx");
        drop(PageStore::open(&path, 5, 3).unwrap());

        let err = PageStore::open(&path, 5, 4).unwrap_err();
        assert!(matches!(
            err.downcast_ref::<IndexError>(),
            Some(IndexError::ParameterMismatch {
                file_k: 5,
                file_t: 3,
                k: 5,
                t: 4
            })
        ));

        let err = PageStore::open(&path, 6, 3).unwrap_err();
        assert!(matches!(
            err.downcast_ref::<IndexError>(),
            Some(IndexError::ParameterMismatch { .. })
        ));
    }

    #[test]
    fn out_of_range_page_reference_is_corrupt() {
        let (store, _dir) = temp_store(3, 2);
        let err = store.read_node(99).unwrap_err();
        assert!(matches!(
            err.downcast_ref::<IndexError>(),
            Some(IndexError::CorruptPage { page: 99, .. })
        ));

        let err = store.read_node(0).unwrap_err();
        assert!(matches!(
            err.downcast_ref::<IndexError>(),
            Some(IndexError::CorruptPage { page: 0, .. })
        ));
    }

    #[test]
    fn garbage_file_fails_header_validation() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("index.kdx");
        std::fs::write(&path, vec![0xabu8; 256]).unwrap();

        let err = PageStore::open(&path, 3, 2).unwrap_err();
        assert!(matches!(
            err.downcast_ref::<IndexError>(),
            Some(IndexError::CorruptHeader(_))
        ));
    }
}
