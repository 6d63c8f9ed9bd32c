//! # Memory-Mapped Byte Storage
//!
//! Low-level storage primitive: one file, one mutable mapping, byte-range
//! access. The pager layers page arithmetic on top; this module knows nothing
//! about pages or nodes.
//!
//! ## Safety Model
//!
//! A mapping becomes invalid when the file is grown and remapped. Rather than
//! runtime guards, the borrow checker enforces safety at compile time:
//! `region()` borrows `&self`, `grow()` takes `&mut self`, so no region
//! reference can be held across a remap.

use std::fs::{File, OpenOptions};
use std::path::Path;

use eyre::{Result, WrapErr};
use memmap2::MmapMut;

use crate::error::IndexError;

#[derive(Debug)]
pub struct MmapStorage {
    file: File,
    mmap: MmapMut,
    len: u64,
}

impl MmapStorage {
    /// Open an existing non-empty file and map it read-write.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();

        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .open(path)
            .map_err(IndexError::StorageFailure)
            .wrap_err_with(|| format!("failed to open index file '{}'", path.display()))?;

        let len = file
            .metadata()
            .map_err(IndexError::StorageFailure)
            .wrap_err_with(|| format!("failed to stat '{}'", path.display()))?
            .len();

        if len == 0 {
            return Err(IndexError::CorruptHeader(format!(
                "index file '{}' is empty",
                path.display()
            ))
            .into());
        }

        // SAFETY: MmapMut::map_mut is unsafe because a mapped file modified
        // by another process leads to undefined behavior. This is safe
        // because:
        // 1. The store assumes exclusive ownership of the file (single-writer
        //    model; external access is out of contract).
        // 2. The mmap lifetime is tied to MmapStorage, preventing
        //    use-after-unmap.
        // 3. All access goes through region()/region_mut() which bounds-check.
        let mmap = unsafe {
            MmapMut::map_mut(&file)
                .map_err(IndexError::StorageFailure)
                .wrap_err_with(|| format!("failed to memory-map '{}'", path.display()))?
        };

        Ok(Self { file, mmap, len })
    }

    /// Create (or truncate) a file of `initial_len` bytes and map it.
    pub fn create<P: AsRef<Path>>(path: P, initial_len: u64) -> Result<Self> {
        let path = path.as_ref();

        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(true)
            .open(path)
            .map_err(IndexError::StorageFailure)
            .wrap_err_with(|| format!("failed to create index file '{}'", path.display()))?;

        file.set_len(initial_len)
            .map_err(IndexError::StorageFailure)
            .wrap_err_with(|| format!("failed to size '{}' to {} bytes", path.display(), initial_len))?;

        // SAFETY: see open(). Additionally, the file was just created with
        // truncate=true and sized before mapping.
        let mmap = unsafe {
            MmapMut::map_mut(&file)
                .map_err(IndexError::StorageFailure)
                .wrap_err_with(|| format!("failed to memory-map '{}'", path.display()))?
        };

        Ok(Self {
            file,
            mmap,
            len: initial_len,
        })
    }

    pub fn region(&self, offset: u64, len: usize) -> Result<&[u8]> {
        self.check_bounds(offset, len)?;
        let start = offset as usize;
        Ok(&self.mmap[start..start + len])
    }

    pub fn region_mut(&mut self, offset: u64, len: usize) -> Result<&mut [u8]> {
        self.check_bounds(offset, len)?;
        let start = offset as usize;
        Ok(&mut self.mmap[start..start + len])
    }

    fn check_bounds(&self, offset: u64, len: usize) -> Result<()> {
        let end = offset.checked_add(len as u64);
        match end {
            Some(end) if end <= self.len => Ok(()),
            _ => eyre::bail!(
                "region {}+{} out of bounds (file length {})",
                offset,
                len,
                self.len
            ),
        }
    }

    /// Extend the file and remap. No-op if the file is already large enough.
    pub fn grow(&mut self, new_len: u64) -> Result<()> {
        if new_len <= self.len {
            return Ok(());
        }

        self.mmap
            .flush()
            .map_err(IndexError::StorageFailure)
            .wrap_err("failed to flush mapping before grow")?;

        self.file
            .set_len(new_len)
            .map_err(IndexError::StorageFailure)
            .wrap_err_with(|| format!("failed to extend index file to {new_len} bytes"))?;

        // SAFETY: grow() takes &mut self, so no region references exist
        // (borrow checker). The old mapping was flushed and the file extended
        // before remapping; the old mapping is dropped on assignment.
        self.mmap = unsafe {
            MmapMut::map_mut(&self.file)
                .map_err(IndexError::StorageFailure)
                .wrap_err("failed to remap index file after grow")?
        };

        self.len = new_len;
        Ok(())
    }

    pub fn sync(&self) -> Result<()> {
        self.mmap
            .flush()
            .map_err(IndexError::StorageFailure)
            .wrap_err("failed to sync mapping to disk")
    }

    pub fn len(&self) -> u64 {
        self.len
    }
}
