use sha1::{Digest, Sha1};

use super::bitfield::Bitfield;
use super::error::StorageError;

/// Integrity state of a piece as seen by callers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PieceStatus {
    /// At least one block has not been received.
    Downloading,
    /// Every block arrived and the digest matched. Terminal.
    Valid,
    /// Every block arrived but the digest did not match. The piece has
    /// already been reset and is downloading again.
    Invalid,
}

/// Reconstruction buffer for one piece.
pub(crate) struct Piece {
    index: usize,
    data: Vec<u8>,
    received: Bitfield,
    block_size: usize,
    verified: bool,
}

impl Piece {
    /// Allocates a zeroed buffer of `size` bytes, failing instead of aborting
    /// when memory is short.
    pub(crate) fn new(index: usize, size: usize, block_size: usize) -> Result<Self, StorageError> {
        let mut data = Vec::new();
        data.try_reserve_exact(size)?;
        data.resize(size, 0);

        Ok(Self {
            index,
            data,
            received: Bitfield::new(size.div_ceil(block_size)),
            block_size,
            verified: false,
        })
    }

    pub(crate) fn size(&self) -> usize {
        self.data.len()
    }

    pub(crate) fn block_count(&self) -> usize {
        self.received.len()
    }

    pub(crate) fn data(&self) -> &[u8] {
        &self.data
    }

    pub(crate) fn received(&self) -> &Bitfield {
        &self.received
    }

    pub(crate) fn is_verified(&self) -> bool {
        self.verified
    }

    pub(crate) fn check_block(&self, block: usize) -> Result<(), StorageError> {
        if block >= self.block_count() {
            return Err(StorageError::InvalidBlockIndex {
                piece: self.index,
                block,
                count: self.block_count(),
            });
        }
        Ok(())
    }

    /// Copies `data` to the start of `block`, clamped to the end of the
    /// piece. Returns the number of bytes copied.
    pub(crate) fn write_block(&mut self, block: usize, data: &[u8]) -> Result<usize, StorageError> {
        self.check_block(block)?;
        if self.verified || data.is_empty() {
            return Ok(0);
        }

        let start = block * self.block_size;
        let len = data.len().min(self.data.len() - start);
        self.data[start..start + len].copy_from_slice(&data[..len]);
        self.received.set(block);
        Ok(len)
    }

    /// Copies `data` from the start of the piece and marks every block it
    /// covers as received.
    pub(crate) fn set_data(&mut self, data: &[u8]) -> usize {
        if self.verified {
            return 0;
        }

        let len = data.len().min(self.data.len());
        self.data[..len].copy_from_slice(&data[..len]);
        for block in 0..len.div_ceil(self.block_size) {
            self.received.set(block);
        }
        len
    }

    pub(crate) fn set_received(&mut self, block: usize, received: bool) -> Result<(), StorageError> {
        self.check_block(block)?;
        if self.verified {
            return Ok(());
        }
        if received {
            self.received.set(block);
        } else {
            self.received.clear(block);
        }
        Ok(())
    }

    /// Runs the state machine: once every block is present the buffer is
    /// hashed and compared with `expected`. A mismatch resets the piece.
    pub(crate) fn status(&mut self, expected: &[u8]) -> PieceStatus {
        if self.verified {
            return PieceStatus::Valid;
        }
        if !self.received.is_complete() {
            return PieceStatus::Downloading;
        }

        let digest = Sha1::digest(&self.data);
        if digest.as_slice() == expected {
            self.verified = true;
            tracing::debug!(piece = self.index, size = self.size(), "piece verified");
            PieceStatus::Valid
        } else {
            tracing::warn!(
                piece = self.index,
                blocks = self.block_count(),
                "piece failed hash check, resetting"
            );
            self.reset();
            PieceStatus::Invalid
        }
    }

    fn reset(&mut self) {
        self.received.clear_all();
        self.data.fill(0);
    }
}
