//! # Node Page Codec
//!
//! The fixed-size on-disk representation of one B-tree node. For minimum
//! degree `t`, every page is laid out as:
//!
//! ```text
//! Offset              Size        Field
//! ------------------  ----------  --------------------------------
//! 0                   1           leaf flag (0 or 1)
//! 1                   3           reserved
//! 4                   4           entry count (u32 LE)
//! 8                   (2t-1)*16   entries: (key u64 LE, count u64 LE)
//! 8+(2t-1)*16         2t*8        child page ids (u64 LE, 0 = absent)
//! ```
//!
//! Unused entry and child slots are zero-filled. Decoding validates
//! structure aggressively — flag, entry count, child occupancy, key order —
//! and fails with [`IndexError::CorruptPage`] so that a damaged file is never
//! silently traversed.
//!
//! Nodes are decoded into owned values rather than borrowed views: pages here
//! are small (88 bytes at t=2) and the copy keeps the mutation path free of
//! mapping lifetimes.

use eyre::Result;

use crate::error::IndexError;
use crate::kmer::Key;

/// Stable handle to one page in the backing store. 1-based; 0 means
/// "no child".
pub type PageId = u64;

/// Size of the per-node header: leaf flag, padding, entry count.
pub const NODE_HEADER_SIZE: usize = 8;

const ENTRY_SIZE: usize = 16;
const CHILD_SIZE: usize = 8;

/// Page size for a store of minimum degree `t`.
pub fn node_page_size(degree: u32) -> usize {
    let t = degree as usize;
    NODE_HEADER_SIZE + (2 * t - 1) * ENTRY_SIZE + 2 * t * CHILD_SIZE
}

/// One (key, count) pair. The count is positive and only ever increases.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IndexEntry {
    pub key: Key,
    pub count: u64,
}

/// In-memory form of one node page.
///
/// Invariants (enforced by decode, preserved by the tree):
/// - entries are strictly increasing by key;
/// - a leaf has no children; an internal node has `entries.len() + 1`;
/// - `entries.len() <= 2t - 1`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Node {
    pub leaf: bool,
    pub entries: Vec<IndexEntry>,
    pub children: Vec<PageId>,
}

impl Node {
    pub fn new_leaf() -> Self {
        Self {
            leaf: true,
            entries: Vec::new(),
            children: Vec::new(),
        }
    }

    pub fn is_full(&self, degree: u32) -> bool {
        self.entries.len() == 2 * degree as usize - 1
    }

    /// Binary search over the node's entries.
    ///
    /// `Ok(i)` if `entries[i].key == key`; `Err(i)` gives the child slot to
    /// descend into (equivalently, the sorted insertion position).
    pub fn search(&self, key: Key) -> std::result::Result<usize, usize> {
        self.entries.binary_search_by_key(&key, |e| e.key)
    }

    /// Serialize into a full page buffer. `buf` must be exactly one page;
    /// slack slots are zeroed so a page write never leaks stale bytes.
    pub fn encode_into(&self, degree: u32, buf: &mut [u8]) {
        debug_assert_eq!(buf.len(), node_page_size(degree));
        debug_assert!(self.entries.len() <= 2 * degree as usize - 1);
        debug_assert!(self.children.len() == if self.leaf { 0 } else { self.entries.len() + 1 });

        buf.fill(0);
        buf[0] = self.leaf as u8;
        buf[4..8].copy_from_slice(&(self.entries.len() as u32).to_le_bytes());

        let mut at = NODE_HEADER_SIZE;
        for entry in &self.entries {
            buf[at..at + 8].copy_from_slice(&entry.key.to_le_bytes());
            buf[at + 8..at + 16].copy_from_slice(&entry.count.to_le_bytes());
            at += ENTRY_SIZE;
        }

        let mut at = NODE_HEADER_SIZE + (2 * degree as usize - 1) * ENTRY_SIZE;
        for &child in &self.children {
            buf[at..at + 8].copy_from_slice(&child.to_le_bytes());
            at += CHILD_SIZE;
        }
    }

    /// Deserialize and validate one page. `page` is the id being read, used
    /// only for error reporting.
    pub fn decode(page: PageId, degree: u32, buf: &[u8]) -> Result<Self> {
        debug_assert_eq!(buf.len(), node_page_size(degree));

        let corrupt = |reason: String| IndexError::CorruptPage { page, reason };

        let leaf = match buf[0] {
            0 => false,
            1 => true,
            flag => return Err(corrupt(format!("invalid leaf flag {flag:#x}")).into()),
        };

        let max_entries = 2 * degree as usize - 1;
        let entry_count = u32::from_le_bytes(buf[4..8].try_into().unwrap()) as usize;
        if entry_count > max_entries {
            return Err(corrupt(format!(
                "entry count {entry_count} exceeds maximum {max_entries}"
            ))
            .into());
        }

        let mut entries = Vec::with_capacity(entry_count);
        let mut at = NODE_HEADER_SIZE;
        for _ in 0..entry_count {
            let key = u64::from_le_bytes(buf[at..at + 8].try_into().unwrap());
            let count = u64::from_le_bytes(buf[at + 8..at + 16].try_into().unwrap());
            if count == 0 {
                return Err(corrupt(format!("zero count for key {key:#x}")).into());
            }
            entries.push(IndexEntry { key, count });
            at += ENTRY_SIZE;
        }

        for pair in entries.windows(2) {
            if pair[0].key >= pair[1].key {
                return Err(corrupt(format!(
                    "keys out of order: {:#x} >= {:#x}",
                    pair[0].key, pair[1].key
                ))
                .into());
            }
        }

        let child_base = NODE_HEADER_SIZE + max_entries * ENTRY_SIZE;
        let mut children = Vec::new();
        if !leaf {
            children.reserve(entry_count + 1);
            for i in 0..entry_count + 1 {
                let at = child_base + i * CHILD_SIZE;
                let child = u64::from_le_bytes(buf[at..at + 8].try_into().unwrap());
                if child == 0 {
                    return Err(corrupt(format!("null child reference in slot {i}")).into());
                }
                children.push(child);
            }
        }

        Ok(Self {
            leaf,
            entries,
            children,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn round_trip(node: &Node, degree: u32) -> Node {
        let mut buf = vec![0u8; node_page_size(degree)];
        node.encode_into(degree, &mut buf);
        Node::decode(1, degree, &buf).unwrap()
    }

    #[test]
    fn page_size_matches_layout() {
        // t=2: 8 + 3*16 + 4*8
        assert_eq!(node_page_size(2), 88);
        // t=64: 8 + 127*16 + 128*8
        assert_eq!(node_page_size(64), 3064);
    }

    #[test]
    fn empty_leaf_round_trips() {
        let node = Node::new_leaf();
        assert_eq!(round_trip(&node, 2), node);
    }

    #[test]
    fn populated_nodes_round_trip() {
        let leaf = Node {
            leaf: true,
            entries: vec![
                IndexEntry { key: 3, count: 1 },
                IndexEntry { key: 9, count: 4 },
                IndexEntry { key: 12, count: 2 },
            ],
            children: vec![],
        };
        assert_eq!(round_trip(&leaf, 2), leaf);

        let interior = Node {
            leaf: false,
            entries: vec![IndexEntry { key: 40, count: 7 }],
            children: vec![2, 3],
        };
        assert_eq!(round_trip(&interior, 2), interior);
    }

    #[test]
    fn detects_invalid_leaf_flag() {
        let mut buf = vec![0u8; node_page_size(2)];
        Node::new_leaf().encode_into(2, &mut buf);
        buf[0] = 7;

        let err = Node::decode(4, 2, &buf).unwrap_err();
        assert!(matches!(
            err.downcast_ref::<IndexError>(),
            Some(IndexError::CorruptPage { page: 4, .. })
        ));
    }

    #[test]
    fn detects_oversized_entry_count() {
        let mut buf = vec![0u8; node_page_size(2)];
        Node::new_leaf().encode_into(2, &mut buf);
        buf[4..8].copy_from_slice(&100u32.to_le_bytes());

        let err = Node::decode(1, 2, &buf).unwrap_err();
        assert!(matches!(
            err.downcast_ref::<IndexError>(),
            Some(IndexError::CorruptPage { .. })
        ));
    }

    #[test]
    fn detects_unsorted_keys() {
        let node = Node {
            leaf: true,
            entries: vec![IndexEntry { key: 5, count: 1 }, IndexEntry { key: 9, count: 1 }],
            children: vec![],
        };
        let mut buf = vec![0u8; node_page_size(2)];
        node.encode_into(2, &mut buf);
        // Swap the two keys on disk.
        buf[NODE_HEADER_SIZE..NODE_HEADER_SIZE + 8].copy_from_slice(&9u64.to_le_bytes());
        buf[NODE_HEADER_SIZE + 16..NODE_HEADER_SIZE + 24].copy_from_slice(&5u64.to_le_bytes());

        let err = Node::decode(1, 2, &buf).unwrap_err();
        assert!(matches!(
            err.downcast_ref::<IndexError>(),
            Some(IndexError::CorruptPage { .. })
        ));
    }

    #[test]
    fn detects_null_child_in_interior() {
        let node = Node {
            leaf: false,
            entries: vec![IndexEntry { key: 5, count: 1 }],
            children: vec![2, 3],
        };
        let mut buf = vec![0u8; node_page_size(2)];
        node.encode_into(2, &mut buf);
        let child_base = NODE_HEADER_SIZE + 3 * 16;
        buf[child_base..child_base + 8].copy_from_slice(&0u64.to_le_bytes());

        let err = Node::decode(1, 2, &buf).unwrap_err();
        assert!(matches!(
            err.downcast_ref::<IndexError>(),
            Some(IndexError::CorruptPage { .. })
        ));
    }
}
