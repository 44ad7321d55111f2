use std::path::PathBuf;

use thiserror::Error;

use crate::bencode::BencodeError;

/// Errors raised while building, loading or creating torrent metadata.
#[derive(Debug, Error)]
pub enum MetainfoError {
    /// The input is not valid bencode.
    #[error("bencode error: {0}")]
    Bencode(#[from] BencodeError),

    /// A required field is absent.
    #[error("missing field: {0}")]
    MissingField(&'static str),

    /// A field has the wrong node kind or an out-of-range value.
    #[error("invalid field: {0}")]
    InvalidField(&'static str),

    /// Length fields disagree with each other.
    #[error("inconsistent metadata: {0}")]
    Inconsistent(String),

    /// A piece index at or beyond the piece count.
    #[error("piece index {index} out of range ({count} pieces)")]
    PieceIndexOutOfRange { index: usize, count: usize },

    /// Reading a torrent or its source data failed.
    #[error("io error on `{}`: {source}", path.display())]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
}

impl MetainfoError {
    /// True for the errors that mean the metadata itself is malformed.
    pub fn is_malformed(&self) -> bool {
        matches!(
            self,
            Self::Bencode(_) | Self::MissingField(_) | Self::InvalidField(_) | Self::Inconsistent(_)
        )
    }

    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}
