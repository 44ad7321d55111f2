use std::fs::{self, OpenOptions};
use std::io::{Read, Seek, SeekFrom, Write};
use std::path::{Component, Path, PathBuf};

use bytes::Bytes;

use super::error::StorageError;
use super::file::{piece_range, piece_spans};
use super::tracker::PieceTracker;
use crate::config::StorageConfig;
use crate::metainfo::Torrent;

/// Rejects relative paths that could leave the download root.
pub(crate) fn validate_file_path(file_path: &Path) -> Result<(), StorageError> {
    for component in file_path.components() {
        match component {
            Component::ParentDir | Component::RootDir | Component::Prefix(_) => {
                return Err(StorageError::PathTraversal(file_path.display().to_string()));
            }
            _ => {}
        }
    }
    Ok(())
}

/// Converts a piece-relative length or offset to an in-memory index.
pub(crate) fn checked_len(index: usize, value: u64) -> Result<usize, StorageError> {
    usize::try_from(value).map_err(|_| StorageError::PieceTooLarge { index, size: value })
}

fn ensure_parent_dirs(path: &Path) -> Result<(), StorageError> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).map_err(|e| StorageError::io(parent, e))?;
    }
    Ok(())
}

/// Creates the file if needed; existing content is never discarded.
fn open_for_write(path: &Path) -> Result<fs::File, StorageError> {
    ensure_parent_dirs(path)?;
    OpenOptions::new()
        .create(true)
        .write(true)
        .truncate(false)
        .open(path)
        .map_err(|e| StorageError::io(path, e))
}

/// Persists verified pieces into the torrent's files under a download root.
///
/// Single-file torrents are written to `root/<name>`, multi-file torrents to
/// `root/<name>/<path...>`. All I/O is synchronous; async callers should go
/// through [`Download::receive_block_async`](super::Download::receive_block_async)
/// or their own `spawn_blocking`.
#[derive(Debug, Clone)]
pub struct FileWriter {
    root: PathBuf,
}

impl FileWriter {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn from_config(config: &StorageConfig) -> Self {
        Self::new(&config.download_dir)
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// On-disk location of file `file_index` of `torrent`.
    pub fn destination(&self, torrent: &Torrent, file_index: usize) -> Result<PathBuf, StorageError> {
        let relative = torrent
            .file_destination(file_index)
            .ok_or_else(|| StorageError::PathTraversal(format!("no file at index {file_index}")))?;
        validate_file_path(&relative)?;
        Ok(self.root.join(relative))
    }

    /// Writes verified piece `index` from `tracker` into its files.
    ///
    /// The piece stays locked for the whole flush, so concurrent flushes of
    /// the same piece run one after the other while different pieces flush
    /// in parallel.
    ///
    /// # Errors
    ///
    /// - [`StorageError::NotValid`] if the piece has not passed its hash
    ///   check. The piece is not re-verified here.
    /// - [`StorageError::Io`] with the failing path. Files written before
    ///   the failure keep their new content; retrying the flush is safe.
    pub fn flush_piece(
        &self,
        torrent: &Torrent,
        tracker: &PieceTracker,
        index: usize,
    ) -> Result<(), StorageError> {
        let piece = tracker.lock(index)?;
        if !piece.is_verified() {
            return Err(StorageError::NotValid(index));
        }

        self.write_piece(torrent, index, piece.data())?;
        tracing::debug!(piece = index, size = piece.size(), "piece flushed");
        Ok(())
    }

    /// Writes `data` as piece `index` without checking its integrity.
    ///
    /// `data` must be exactly the size of the piece.
    pub fn write_piece(&self, torrent: &Torrent, index: usize, data: &[u8]) -> Result<(), StorageError> {
        let (_, size) = piece_range(torrent, index)?;
        let size = checked_len(index, size)?;
        if data.len() != size {
            return Err(StorageError::LengthMismatch {
                expected: size,
                actual: data.len(),
            });
        }

        for span in piece_spans(torrent, index)? {
            let path = self.destination(torrent, span.file_index)?;
            let mut file = open_for_write(&path)?;

            let start = checked_len(index, span.data_offset)?;
            let chunk = &data[start..start + checked_len(index, span.length)?];

            file.seek(SeekFrom::Start(span.file_offset))
                .and_then(|_| file.write_all(chunk))
                .map_err(|e| StorageError::io(&path, e))?;

            tracing::trace!(
                piece = index,
                path = %path.display(),
                file_offset = span.file_offset,
                length = span.length,
                "wrote span"
            );
        }

        Ok(())
    }

    /// Reads piece `index` back from disk.
    pub fn read_piece(&self, torrent: &Torrent, index: usize) -> Result<Bytes, StorageError> {
        let (_, size) = piece_range(torrent, index)?;
        let size = checked_len(index, size)?;
        let mut data = Vec::new();
        data.try_reserve_exact(size)?;
        data.resize(size, 0);

        for span in piece_spans(torrent, index)? {
            let path = self.destination(torrent, span.file_index)?;
            let start = checked_len(index, span.data_offset)?;
            let chunk = &mut data[start..start + checked_len(index, span.length)?];

            fs::File::open(&path)
                .and_then(|mut file| {
                    file.seek(SeekFrom::Start(span.file_offset))?;
                    file.read_exact(chunk)
                })
                .map_err(|e| StorageError::io(&path, e))?;
        }

        Ok(Bytes::from(data))
    }

    /// Creates every file of `torrent` and its directories, extending files
    /// shorter than their declared length. Existing content is kept.
    pub fn allocate(&self, torrent: &Torrent) -> Result<(), StorageError> {
        for (index, entry) in torrent.files().iter().enumerate() {
            let path = self.destination(torrent, index)?;
            let file = open_for_write(&path)?;

            let current = file
                .metadata()
                .map_err(|e| StorageError::io(&path, e))?
                .len();
            if current < entry.length() {
                file.set_len(entry.length())
                    .map_err(|e| StorageError::io(&path, e))?;
            }
        }

        tracing::debug!(
            root = %self.root.display(),
            files = torrent.files().len(),
            "allocated torrent files"
        );
        Ok(())
    }
}
