use std::path::PathBuf;
use std::sync::Arc;

use bytes::Bytes;

use super::bitfield::Bitfield;
use super::error::StorageError;
use super::piece::PieceStatus;
use super::tracker::PieceTracker;
use super::writer::FileWriter;
use crate::config::StorageConfig;
use crate::metainfo::Torrent;

/// What happened to a block handed to [`Download::receive_block`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BlockOutcome {
    /// Stored; the piece still has missing blocks.
    Pending,
    /// This block completed the piece, which verified and was flushed.
    Completed,
    /// This block completed the piece but the hash did not match. The piece
    /// was reset and must be downloaded again.
    Rejected,
    /// The piece was already verified; the block was dropped.
    Ignored,
}

/// Glues a torrent, its tracker and a writer into the path a downloaded
/// block takes: write, check, flush.
///
/// Cloning is cheap and clones share state, so a clone can be handed to
/// every peer connection.
#[derive(Debug, Clone)]
pub struct Download {
    torrent: Arc<Torrent>,
    tracker: Arc<PieceTracker>,
    writer: Arc<FileWriter>,
}

impl Download {
    /// Starts a session writing below `root` with the standard block size.
    pub fn new(torrent: Arc<Torrent>, root: impl Into<PathBuf>) -> Result<Self, StorageError> {
        let tracker = PieceTracker::new(&torrent)?;
        Ok(Self::from_parts(torrent, tracker, FileWriter::new(root)))
    }

    /// Starts a session with the block size and download directory of
    /// `config`.
    pub fn from_config(torrent: Arc<Torrent>, config: &StorageConfig) -> Result<Self, StorageError> {
        let tracker = PieceTracker::with_block_size(&torrent, config.block_size)?;
        Ok(Self::from_parts(torrent, tracker, FileWriter::from_config(config)))
    }

    pub fn from_parts(torrent: Arc<Torrent>, tracker: PieceTracker, writer: FileWriter) -> Self {
        tracing::debug!(
            name = torrent.name(),
            pieces = torrent.piece_count(),
            root = %writer.root().display(),
            "download started"
        );
        Self {
            torrent,
            tracker: Arc::new(tracker),
            writer: Arc::new(writer),
        }
    }

    pub fn torrent(&self) -> &Torrent {
        &self.torrent
    }

    pub fn tracker(&self) -> &PieceTracker {
        &self.tracker
    }

    pub fn writer(&self) -> &FileWriter {
        &self.writer
    }

    /// Stores one block and, if it completed its piece, verifies and
    /// flushes the piece.
    ///
    /// Only the call that completes a piece sees
    /// [`BlockOutcome::Completed`]; later blocks for it are
    /// [`BlockOutcome::Ignored`].
    ///
    /// # Errors
    ///
    /// Index errors leave the piece untouched. A [`StorageError::Io`] from
    /// the flush arrives after the piece was verified, so resending its
    /// blocks does nothing; call [`Download::flush`] to retry the write.
    pub fn receive_block(
        &self,
        piece: usize,
        block: usize,
        data: &[u8],
    ) -> Result<BlockOutcome, StorageError> {
        let status = match self.tracker.write_and_check(piece, block, data)? {
            Some(status) => status,
            None => return Ok(BlockOutcome::Ignored),
        };

        match status {
            PieceStatus::Downloading => Ok(BlockOutcome::Pending),
            PieceStatus::Invalid => Ok(BlockOutcome::Rejected),
            PieceStatus::Valid => {
                self.writer.flush_piece(&self.torrent, &self.tracker, piece)?;
                Ok(BlockOutcome::Completed)
            }
        }
    }

    /// Writes verified piece `piece` to disk again, e.g. after a failed
    /// flush in [`Download::receive_block`].
    pub fn flush(&self, piece: usize) -> Result<(), StorageError> {
        self.writer.flush_piece(&self.torrent, &self.tracker, piece)
    }

    /// [`Download::receive_block`] on the blocking thread pool, for callers
    /// running on the async runtime.
    pub async fn receive_block_async(
        &self,
        piece: usize,
        block: usize,
        data: Bytes,
    ) -> Result<BlockOutcome, StorageError> {
        let this = self.clone();
        tokio::task::spawn_blocking(move || this.receive_block(piece, block, &data)).await?
    }

    /// Verified pieces, one bit each.
    pub fn bitfield(&self) -> Bitfield {
        self.tracker.bitfield()
    }

    pub fn is_complete(&self) -> bool {
        self.bitfield().is_complete()
    }

    /// Bytes belonging to verified pieces.
    pub fn verified_bytes(&self) -> u64 {
        let bitfield = self.bitfield();
        (0..self.torrent.piece_count())
            .filter(|&i| bitfield.has(i))
            .filter_map(|i| self.torrent.piece_size(i).ok())
            .sum()
    }

    /// Fraction of the content verified, from 0.0 to 1.0.
    pub fn progress(&self) -> f64 {
        let total = self.torrent.total_length();
        if total == 0 {
            return 1.0;
        }
        self.verified_bytes() as f64 / total as f64
    }
}
