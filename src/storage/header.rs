//! # Index File Header
//!
//! Every index file begins with a 64-byte header holding the parameters the
//! store cannot operate without:
//!
//! ```text
//! Offset  Size  Field       Description
//! ------  ----  ----------  ------------------------------------
//! 0       16    magic       b"kmerdb index\0\0\0\0"
//! 16      4     version     format version, currently 1
//! 20      4     k           k-mer length (1..=32)
//! 24      4     degree      B-tree minimum degree t (>= 2)
//! 28      4     reserved
//! 32      8     root_page   page id of the root node
//! 40      8     next_free   next unallocated page id
//! 48      16    reserved
//! ```
//!
//! All multi-byte fields are little-endian. The struct is read and written
//! through zerocopy, so the in-memory layout is the on-disk layout and the
//! size is asserted at compile time.

use eyre::Result;
use zerocopy::little_endian::{U32, U64};
use zerocopy::{FromBytes, Immutable, IntoBytes, KnownLayout, Unaligned};

use super::FILE_HEADER_SIZE;
use crate::error::IndexError;

pub const INDEX_MAGIC: &[u8; 16] = b"kmerdb index\x00\x00\x00\x00";
pub const CURRENT_VERSION: u32 = 1;

#[repr(C)]
#[derive(Debug, Clone, Copy, FromBytes, IntoBytes, Immutable, KnownLayout, Unaligned)]
pub struct IndexFileHeader {
    magic: [u8; 16],
    version: U32,
    k: U32,
    degree: U32,
    reserved0: U32,
    root_page: U64,
    next_free: U64,
    reserved1: [u8; 16],
}

const _: () = assert!(std::mem::size_of::<IndexFileHeader>() == FILE_HEADER_SIZE);

impl IndexFileHeader {
    pub fn new(k: u32, degree: u32, root_page: u64, next_free: u64) -> Self {
        Self {
            magic: *INDEX_MAGIC,
            version: U32::new(CURRENT_VERSION),
            k: U32::new(k),
            degree: U32::new(degree),
            reserved0: U32::new(0),
            root_page: U64::new(root_page),
            next_free: U64::new(next_free),
            reserved1: [0u8; 16],
        }
    }

    pub fn from_bytes(bytes: &[u8]) -> Result<&Self> {
        if bytes.len() < FILE_HEADER_SIZE {
            return Err(IndexError::CorruptHeader(format!(
                "file too small for header: {} < {}",
                bytes.len(),
                FILE_HEADER_SIZE
            ))
            .into());
        }

        let header = Self::ref_from_bytes(&bytes[..FILE_HEADER_SIZE])
            .map_err(|e| IndexError::CorruptHeader(format!("unparsable header: {e:?}")))?;

        if &header.magic != INDEX_MAGIC {
            return Err(IndexError::CorruptHeader("bad magic bytes".into()).into());
        }

        if header.version.get() != CURRENT_VERSION {
            return Err(IndexError::CorruptHeader(format!(
                "unsupported version {} (expected {})",
                header.version.get(),
                CURRENT_VERSION
            ))
            .into());
        }

        Ok(header)
    }

    pub fn k(&self) -> u32 {
        self.k.get()
    }

    pub fn degree(&self) -> u32 {
        self.degree.get()
    }

    pub fn root_page(&self) -> u64 {
        self.root_page.get()
    }

    pub fn next_free(&self) -> u64 {
        self.next_free.get()
    }
}
