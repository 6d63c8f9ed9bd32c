//! # K-mer Frequency Index
//!
//! `KmerIndex` maintains the persistent key -> occurrence-count mapping. All
//! node access goes through page ids; no node ever holds an in-memory
//! reference to another, which is what lets the structure survive process
//! restarts.
//!
//! ## Insert Algorithm
//!
//! Descend from the root, binary-searching each node:
//!
//! 1. Key present: increment its count in place, write the node back, done.
//! 2. At a leaf: insert `(key, 1)` at the sorted position, write back, done.
//! 3. Before descending into a full child, split it: the median entry moves
//!    up into the current node (guaranteed non-full by induction) and the
//!    upper half moves to a freshly allocated sibling. Both child pages are
//!    written before the parent so a crash mid-split leaks an orphaned page
//!    rather than dangling a reference.
//!
//! A full root is split before the descent starts by allocating a new empty
//! root above it; this is the only way the tree gains height, so all leaves
//! stay at the same depth.
//!
//! ## Failure Semantics
//!
//! Any storage error aborts the operation and propagates unchanged. Nothing
//! is retried and nothing is swallowed; retry policy belongs to the caller.

use std::cmp::Ordering;
use std::path::Path;

use eyre::{ensure, Result};
use smallvec::SmallVec;
use tracing::debug;

use crate::kmer::Key;
use crate::storage::{IndexEntry, Node, PageId, PageStore};

/// Stack capacity for range scans; a tree this deep holds far more k-mers
/// than 2*32 bits can express, so the SmallVec never spills in practice.
const MAX_TREE_DEPTH: usize = 16;

/// Persistent k-mer frequency index. See the module docs for the insert
/// algorithm and the crate docs for the file format.
#[derive(Debug)]
pub struct KmerIndex {
    store: PageStore,
}

impl KmerIndex {
    /// Open an index at `path`, creating it when missing or empty.
    ///
    /// `k` is the k-mer length (1..=32), `degree` the B-tree minimum degree
    /// t (>= 2). Both are persisted; reopening with different values fails
    /// with `ParameterMismatch`.
    pub fn open<P: AsRef<Path>>(path: P, k: u32, degree: u32) -> Result<Self> {
        Ok(Self {
            store: PageStore::open(path, k, degree)?,
        })
    }

    pub fn k(&self) -> u32 {
        self.store.k()
    }

    pub fn degree(&self) -> u32 {
        self.store.degree()
    }

    /// Insert `key` with count 1, or increment its existing count.
    pub fn upsert(&mut self, key: Key) -> Result<()> {
        if self
            .store
            .read_node(self.store.root_page())?
            .is_full(self.store.degree())
        {
            self.split_root()?;
        }

        let mut page = self.store.root_page();
        let mut node = self.store.read_node(page)?;

        loop {
            match node.search(key) {
                Ok(i) => {
                    node.entries[i].count += 1;
                    return self.store.write_node(page, &node);
                }
                Err(i) if node.leaf => {
                    node.entries.insert(i, IndexEntry { key, count: 1 });
                    return self.store.write_node(page, &node);
                }
                Err(i) => {
                    let child_page = node.children[i];
                    let child = self.store.read_node(child_page)?;

                    if child.is_full(self.store.degree()) {
                        let median = self.split_child(page, &mut node, i, child)?;
                        page = match key.cmp(&median) {
                            Ordering::Equal => {
                                node.entries[i].count += 1;
                                return self.store.write_node(page, &node);
                            }
                            Ordering::Less => node.children[i],
                            Ordering::Greater => node.children[i + 1],
                        };
                        node = self.store.read_node(page)?;
                    } else {
                        page = child_page;
                        node = child;
                    }
                }
            }
        }
    }

    /// Upsert every key from an iterator (the extractor -> index pipeline).
    /// Returns the number of keys consumed.
    pub fn upsert_all<I>(&mut self, keys: I) -> Result<u64>
    where
        I: IntoIterator<Item = Key>,
    {
        let mut n = 0;
        for key in keys {
            self.upsert(key)?;
            n += 1;
        }
        Ok(n)
    }

    /// Split the full child at `parent.children[idx]`, promoting its median
    /// entry into `parent`. Returns the median key. `parent` must not be
    /// full; it is updated in memory and on disk.
    fn split_child(
        &mut self,
        parent_page: PageId,
        parent: &mut Node,
        idx: usize,
        mut child: Node,
    ) -> Result<Key> {
        let t = self.store.degree() as usize;
        debug_assert!(child.is_full(self.store.degree()));
        debug_assert!(!parent.is_full(self.store.degree()));

        let child_page = parent.children[idx];
        let median = child.entries[t - 1];

        let right = Node {
            leaf: child.leaf,
            entries: child.entries.split_off(t),
            children: if child.leaf {
                Vec::new()
            } else {
                child.children.split_off(t)
            },
        };
        child.entries.truncate(t - 1);

        let right_page = self.store.allocate()?;

        // Child pages land on disk before the parent references them.
        self.store.write_node(right_page, &right)?;
        self.store.write_node(child_page, &child)?;

        parent.entries.insert(idx, median);
        parent.children.insert(idx + 1, right_page);
        self.store.write_node(parent_page, parent)?;

        debug!(child_page, right_page, median_key = median.key, "split node");
        Ok(median.key)
    }

    /// Grow the tree by one level: a new empty root is allocated above the
    /// current (full) root, which is then split as an ordinary child.
    fn split_root(&mut self) -> Result<()> {
        let old_root = self.store.root_page();
        let child = self.store.read_node(old_root)?;

        let new_root_page = self.store.allocate()?;
        let mut new_root = Node {
            leaf: false,
            entries: Vec::new(),
            children: vec![old_root],
        };
        self.split_child(new_root_page, &mut new_root, 0, child)?;
        self.store.set_root(new_root_page)?;

        debug!(new_root_page, "root split, tree height grew by one");
        Ok(())
    }

    /// Point lookup: the number of times `key` has been upserted, or `None`.
    pub fn lookup(&self, key: Key) -> Result<Option<u64>> {
        let mut node = self.store.read_node(self.store.root_page())?;
        loop {
            match node.search(key) {
                Ok(i) => return Ok(Some(node.entries[i].count)),
                Err(_) if node.leaf => return Ok(None),
                Err(i) => node = self.store.read_node(node.children[i])?,
            }
        }
    }

    /// Lazy in-order scan of all entries with keys in `low..=high`.
    ///
    /// Subtrees entirely below `low` are never read; the scan stops at the
    /// first key past `high`. Page errors surface as `Err` items, after
    /// which the iterator is exhausted.
    pub fn range_scan(&self, low: Key, high: Key) -> RangeScan<'_> {
        RangeScan::new(&self.store, low, high)
    }

    /// Scan the full key space.
    pub fn scan_all(&self) -> RangeScan<'_> {
        self.range_scan(Key::MIN, Key::MAX)
    }

    /// Walk the whole tree checking structural invariants: strict key order
    /// within and across nodes, occupancy bounds, child counts, and equal
    /// leaf depth. Diagnostic surface; cost is a full tree read.
    pub fn verify(&self) -> Result<()> {
        let root_page = self.store.root_page();
        let root = self.store.read_node(root_page)?;
        if !root.leaf {
            ensure!(
                !root.entries.is_empty(),
                "internal root of page {root_page} has no entries"
            );
        }
        self.verify_node(root_page, &root, None, None, true)?;
        Ok(())
    }

    /// Returns the leaf depth of the subtree, 1 for a leaf.
    fn verify_node(
        &self,
        page: PageId,
        node: &Node,
        low: Option<Key>,
        high: Option<Key>,
        is_root: bool,
    ) -> Result<usize> {
        let t = self.store.degree() as usize;

        ensure!(
            is_root || node.entries.len() >= t - 1,
            "page {page} underfull: {} entries, minimum {}",
            node.entries.len(),
            t - 1
        );

        for entry in &node.entries {
            if let Some(low) = low {
                ensure!(
                    entry.key > low,
                    "page {page} key {:#x} at or below subtree bound {low:#x}",
                    entry.key
                );
            }
            if let Some(high) = high {
                ensure!(
                    entry.key < high,
                    "page {page} key {:#x} at or above subtree bound {high:#x}",
                    entry.key
                );
            }
        }

        if node.leaf {
            return Ok(1);
        }

        ensure!(
            node.children.len() == node.entries.len() + 1,
            "page {page} has {} children for {} entries",
            node.children.len(),
            node.entries.len()
        );

        let mut depth = None;
        for (i, &child_page) in node.children.iter().enumerate() {
            let child_low = if i == 0 { low } else { Some(node.entries[i - 1].key) };
            let child_high = node.entries.get(i).map(|e| e.key).or(high);

            let child = self.store.read_node(child_page)?;
            let d = self.verify_node(child_page, &child, child_low, child_high, false)?;

            match depth {
                None => depth = Some(d),
                Some(prev) => ensure!(
                    prev == d,
                    "page {page}: leaves at unequal depth under children ({prev} vs {d})"
                ),
            }
        }

        Ok(depth.unwrap_or(0) + 1)
    }

    /// Flush all pages and metadata to disk.
    pub fn sync(&self) -> Result<()> {
        self.store.sync()
    }

    /// Flush and release the index. Dropping without `close` also flushes,
    /// best-effort.
    pub fn close(self) -> Result<()> {
        self.store.sync()
    }
}

struct Frame {
    node: Node,
    /// Next entry position to consider within `node`.
    idx: usize,
    /// Whether `children[idx]` has already been descended into.
    child_visited: bool,
}

impl Frame {
    /// Enter a node positioned at the lower bound: entries below `low` are
    /// skipped, and on an exact hit the left subtree (all keys < low) is
    /// pruned.
    fn enter(node: Node, low: Key) -> Self {
        let (idx, child_visited) = match node.search(low) {
            Ok(i) => (i, true),
            Err(i) => (i, false),
        };
        Self {
            node,
            idx,
            child_visited,
        }
    }
}

enum Step {
    Descend(PageId),
    Yield(IndexEntry),
    Pop,
}

/// In-order iterator over `low..=high`. See [`KmerIndex::range_scan`].
pub struct RangeScan<'a> {
    store: &'a PageStore,
    low: Key,
    high: Key,
    stack: SmallVec<[Frame; MAX_TREE_DEPTH]>,
}

impl<'a> RangeScan<'a> {
    fn new(store: &'a PageStore, low: Key, high: Key) -> Self {
        let mut scan = Self {
            store,
            low,
            high,
            stack: SmallVec::new(),
        };
        if low <= high {
            match store.read_node(store.root_page()) {
                Ok(root) => scan.stack.push(Frame::enter(root, low)),
                // Surface the failed root read as the first item.
                Err(_) => scan.stack.push(Frame {
                    node: Node {
                        leaf: false,
                        entries: Vec::new(),
                        children: vec![store.root_page()],
                    },
                    idx: 0,
                    child_visited: false,
                }),
            }
        }
        scan
    }
}

impl Iterator for RangeScan<'_> {
    type Item = Result<IndexEntry>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            let step = {
                let frame = self.stack.last_mut()?;
                if !frame.node.leaf && !frame.child_visited {
                    frame.child_visited = true;
                    Step::Descend(frame.node.children[frame.idx])
                } else if frame.idx < frame.node.entries.len() {
                    let entry = frame.node.entries[frame.idx];
                    frame.idx += 1;
                    frame.child_visited = false;
                    Step::Yield(entry)
                } else {
                    Step::Pop
                }
            };

            match step {
                Step::Descend(page) => match self.store.read_node(page) {
                    Ok(node) => self.stack.push(Frame::enter(node, self.low)),
                    Err(e) => {
                        self.stack.clear();
                        return Some(Err(e));
                    }
                },
                Step::Yield(entry) => {
                    if entry.key > self.high {
                        self.stack.clear();
                        return None;
                    }
                    return Some(Ok(entry));
                }
                Step::Pop => {
                    self.stack.pop();
                }
            }
        }
    }
}
