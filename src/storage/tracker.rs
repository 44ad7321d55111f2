use std::fmt;
use std::ops::Deref;

use bytes::Bytes;
use parking_lot::{Mutex, MutexGuard};

use super::bitfield::Bitfield;
use super::error::StorageError;
use super::piece::{Piece, PieceStatus};
use crate::buffer::ByteView;
use crate::constants::{BLOCK_SIZE, SHA1_LEN};
use crate::metainfo::Torrent;

/// Per-piece reconstruction state for one torrent.
///
/// Every piece sits behind its own lock, so blocks of different pieces can
/// be written from different threads without contending. Calls on the same
/// piece are serialized, which means a hash check never sees a buffer that
/// is being written to.
pub struct PieceTracker {
    pieces: Vec<Mutex<Piece>>,
    hashes: Bytes,
    block_size: usize,
}

impl PieceTracker {
    /// Sizes one buffer per piece of `torrent` using the standard 16 KiB
    /// block.
    pub fn new(torrent: &Torrent) -> Result<Self, StorageError> {
        Self::with_block_size(torrent, BLOCK_SIZE)
    }

    /// Like [`PieceTracker::new`] with a custom block granularity.
    ///
    /// Either every buffer is allocated or none is: a failed reservation
    /// drops the buffers built so far and returns
    /// [`StorageError::Allocation`].
    pub fn with_block_size(torrent: &Torrent, block_size: u32) -> Result<Self, StorageError> {
        if block_size == 0 {
            return Err(StorageError::ZeroBlockSize);
        }
        let block_size = block_size as usize;
        let count = torrent.piece_count();

        let mut pieces = Vec::new();
        pieces.try_reserve_exact(count)?;

        for index in 0..count {
            let size = torrent
                .piece_size(index)
                .map_err(|_| StorageError::InvalidPieceIndex { index, count })?;
            let size = usize::try_from(size)
                .map_err(|_| StorageError::PieceTooLarge { index, size })?;
            pieces.push(Mutex::new(Piece::new(index, size, block_size)?));
        }

        tracing::debug!(
            pieces = count,
            block_size,
            total_length = torrent.total_length(),
            "piece tracker allocated"
        );

        Ok(Self {
            pieces,
            hashes: torrent.pieces().clone(),
            block_size,
        })
    }

    pub fn piece_count(&self) -> usize {
        self.pieces.len()
    }

    pub fn block_size(&self) -> usize {
        self.block_size
    }

    /// Actual size of piece `index`; only the last piece may be short.
    pub fn piece_size(&self, index: usize) -> Result<usize, StorageError> {
        Ok(self.lock(index)?.size())
    }

    pub fn block_count(&self, index: usize) -> Result<usize, StorageError> {
        Ok(self.lock(index)?.block_count())
    }

    /// Copies `data` into piece `index` at `block * block_size` and marks the
    /// block received.
    ///
    /// Data running past the end of the piece is truncated. Empty data is a
    /// no-op, as is any write to a piece that has already been verified.
    ///
    /// # Errors
    ///
    /// [`StorageError::InvalidPieceIndex`] or
    /// [`StorageError::InvalidBlockIndex`]; the piece is left untouched.
    pub fn write_block(&self, index: usize, block: usize, data: &[u8]) -> Result<(), StorageError> {
        let written = self.lock(index)?.write_block(block, data)?;
        tracing::trace!(piece = index, block, written, "block written");
        Ok(())
    }

    pub fn block_received(&self, index: usize, block: usize) -> Result<bool, StorageError> {
        let piece = self.lock(index)?;
        piece.check_block(block)?;
        Ok(piece.received().has(block))
    }

    /// Overrides the received flag of one block. Ignored once the piece is
    /// verified.
    pub fn set_block_received(
        &self,
        index: usize,
        block: usize,
        received: bool,
    ) -> Result<(), StorageError> {
        self.lock(index)?.set_received(block, received)
    }

    /// Copies a whole piece at once, clamped to the piece size, and marks the
    /// covered blocks received.
    pub fn set_piece_data(&self, index: usize, data: &[u8]) -> Result<(), StorageError> {
        let copied = self.lock(index)?.set_data(data);
        tracing::trace!(piece = index, copied, "piece data set");
        Ok(())
    }

    pub fn received_count(&self, index: usize) -> Result<usize, StorageError> {
        Ok(self.lock(index)?.received().count())
    }

    /// Reports the integrity state of piece `index`.
    ///
    /// When every block has arrived this hashes the buffer under the piece
    /// lock. On a mismatch the piece is reset (all blocks unreceived, buffer
    /// zeroed) before [`PieceStatus::Invalid`] is returned, so the next call
    /// reports [`PieceStatus::Downloading`].
    pub fn status(&self, index: usize) -> Result<PieceStatus, StorageError> {
        let mut piece = self.lock(index)?;
        let expected = self.expected_hash(index)?;
        Ok(piece.status(expected))
    }

    /// True once piece `index` has passed its hash check.
    pub fn is_verified(&self, index: usize) -> Result<bool, StorageError> {
        Ok(self.lock(index)?.is_verified())
    }

    /// Borrows the buffer of piece `index`. The piece stays locked while the
    /// guard is alive.
    pub fn piece_data(&self, index: usize) -> Result<PieceData<'_>, StorageError> {
        Ok(PieceData {
            guard: self.lock(index)?,
        })
    }

    /// Owned copy of the buffer of piece `index`.
    pub fn piece_bytes(&self, index: usize) -> Result<Bytes, StorageError> {
        Ok(Bytes::copy_from_slice(self.lock(index)?.data()))
    }

    /// One bit per piece, set for the verified ones.
    pub fn bitfield(&self) -> Bitfield {
        let mut bitfield = Bitfield::new(self.pieces.len());
        for (index, piece) in self.pieces.iter().enumerate() {
            if piece.lock().is_verified() {
                bitfield.set(index);
            }
        }
        bitfield
    }

    /// Writes a block and runs the state machine under a single lock, so
    /// exactly one caller observes the transition to [`PieceStatus::Valid`].
    /// Returns `None` if the piece was already verified.
    pub(crate) fn write_and_check(
        &self,
        index: usize,
        block: usize,
        data: &[u8],
    ) -> Result<Option<PieceStatus>, StorageError> {
        let mut piece = self.lock(index)?;
        if piece.is_verified() {
            piece.check_block(block)?;
            return Ok(None);
        }

        piece.write_block(block, data)?;
        let expected = self.expected_hash(index)?;
        Ok(Some(piece.status(expected)))
    }

    pub(crate) fn lock(&self, index: usize) -> Result<MutexGuard<'_, Piece>, StorageError> {
        self.pieces
            .get(index)
            .map(|piece| piece.lock())
            .ok_or(StorageError::InvalidPieceIndex {
                index,
                count: self.pieces.len(),
            })
    }

    fn expected_hash(&self, index: usize) -> Result<&[u8], StorageError> {
        let start = index * SHA1_LEN;
        self.hashes
            .get(start..start + SHA1_LEN)
            .ok_or(StorageError::InvalidPieceIndex {
                index,
                count: self.pieces.len(),
            })
    }
}

/// Read-only access to a locked piece buffer.
pub struct PieceData<'a> {
    guard: MutexGuard<'a, Piece>,
}

impl PieceData<'_> {
    pub fn as_view(&self) -> ByteView<'_> {
        ByteView::new(self.guard.data())
    }
}

impl fmt::Debug for PieceData<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PieceData")
            .field("len", &self.guard.size())
            .finish()
    }
}

impl Deref for PieceData<'_> {
    type Target = [u8];

    fn deref(&self) -> &[u8] {
        self.guard.data()
    }
}

impl fmt::Debug for PieceTracker {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PieceTracker")
            .field("pieces", &self.pieces.len())
            .field("block_size", &self.block_size)
            .finish()
    }
}
