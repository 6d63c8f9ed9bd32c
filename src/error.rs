//! # Error Taxonomy
//!
//! All failure modes of the crate, as a single typed enum. Operations return
//! `eyre::Result` and raise these variants with `bail!`/`Err(..into())`;
//! callers that need to discriminate use `Report::downcast_ref::<IndexError>()`.
//!
//! The taxonomy draws a hard line between sequence data and storage:
//! malformed *sequence* input (unknown characters, ambiguous bases) is never
//! an error — the extractor skips or resets as appropriate. Malformed
//! *storage* is never tolerated: a page or header that fails validation
//! aborts the operation that touched it, unretried and unswallowed.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum IndexError {
    /// The codec was handed a symbol outside {A, C, G, T}. The extractor
    /// never encodes a window spanning an N (it resets instead), so this
    /// indicates a contract violation in the caller.
    #[error("invalid symbol '{0}' passed to the k-mer codec")]
    InvalidSymbol(char),

    /// k-mer length outside 1..=32; keys are packed 2 bits per base into a
    /// u64.
    #[error("invalid k-mer length {0} (must be in 1..=32)")]
    InvalidKmerLength(u32),

    /// B-tree minimum degree below 2. Rejected at construction; the store is
    /// not created.
    #[error("invalid minimum degree {0} (must be >= 2)")]
    InvalidDegree(u32),

    /// An existing index file was opened with a different (k, t) than it was
    /// created with.
    #[error(
        "index file was created with k={file_k}, t={file_t} but opened with k={k}, t={t}"
    )]
    ParameterMismatch {
        file_k: u32,
        file_t: u32,
        k: u32,
        t: u32,
    },

    /// The file header failed structural validation (bad magic, unsupported
    /// version, truncated file).
    #[error("corrupt index header: {0}")]
    CorruptHeader(String),

    /// A page failed structural validation on read. The index is unusable
    /// until rebuilt; there is no auto-repair.
    #[error("corrupt page {page}: {reason}")]
    CorruptPage { page: u64, reason: String },

    /// An underlying I/O error, propagated unchanged.
    #[error("storage failure: {0}")]
    StorageFailure(#[from] std::io::Error),
}
