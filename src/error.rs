//! Error kinds surfaced by index construction and loading.
//!
//! Out-of-range access on the corpus or a suffix array is deliberately
//! not represented here: it panics with the offending index, since it
//! can only happen when the index is corrupt or the code is buggy.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum IgxError {
    /// A single document exceeded the chunk buffer during SA construction.
    /// Not recoverable without a larger `--max_mem`.
    #[error("chunk too small: a document exceeds the {0} byte chunk buffer")]
    ChunkTooSmall(usize),

    /// The token stream ended without a terminating sentinel run.
    #[error("file does not end with sentinal")]
    SentinelMissing,

    /// A persisted artifact failed validation at load time.
    #[error("corrupt artifact: {0}")]
    CorruptArtifact(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}
