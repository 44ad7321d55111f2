use std::collections::TryReserveError;
use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("invalid piece index: {index} ({count} pieces)")]
    InvalidPieceIndex { index: usize, count: usize },

    #[error("invalid block index: piece {piece}, block {block} ({count} blocks)")]
    InvalidBlockIndex {
        piece: usize,
        block: usize,
        count: usize,
    },

    #[error("io error on `{}`: {source}", path.display())]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("piece {0} has not passed hash verification")]
    NotValid(usize),

    #[error("data length {actual} does not match piece size {expected}")]
    LengthMismatch { expected: usize, actual: usize },

    #[error("could not allocate piece buffers: {0}")]
    Allocation(#[from] TryReserveError),

    #[error("piece {index} of {size} bytes does not fit in memory")]
    PieceTooLarge { index: usize, size: u64 },

    #[error("block size must be greater than zero")]
    ZeroBlockSize,

    #[error("path traversal detected in file path: {0}")]
    PathTraversal(String),

    #[error("blocking storage task failed: {0}")]
    Task(#[from] tokio::task::JoinError),
}

impl StorageError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}
