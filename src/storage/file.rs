use super::error::StorageError;
use crate::metainfo::{File, Torrent};

/// The part of a piece that lands in one file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FileSpan {
    /// Position of the file in the torrent's file list.
    pub file_index: usize,
    /// Where in the file the bytes go.
    pub file_offset: u64,
    /// Where in the piece buffer the bytes start.
    pub data_offset: u64,
    pub length: u64,
}

/// Maps the byte range `[offset, offset + size)` of the flattened file space
/// onto `files`.
///
/// Files are walked in order with a running cumulative offset; every file
/// whose range overlaps the target yields one span. Zero-length files never
/// overlap anything and are skipped.
pub fn map_range(files: &[File], offset: u64, size: u64) -> Vec<FileSpan> {
    let end = offset + size;
    let mut spans = Vec::new();
    let mut remaining = size;
    let mut cumulative = 0u64;

    for (file_index, file) in files.iter().enumerate() {
        if remaining == 0 || cumulative >= end {
            break;
        }

        let file_end = cumulative + file.length();
        if cumulative < end && file_end > offset {
            let file_offset = offset.saturating_sub(cumulative);
            let data_offset = cumulative.saturating_sub(offset);
            let length = (file.length() - file_offset).min(size - data_offset);

            spans.push(FileSpan {
                file_index,
                file_offset,
                data_offset,
                length,
            });
            remaining -= length;
        }

        cumulative = file_end;
    }

    spans
}

/// Splits piece `index` of `torrent` into the file writes needed to persist
/// it. The span lengths always add up to the piece size.
pub fn piece_spans(torrent: &Torrent, index: usize) -> Result<Vec<FileSpan>, StorageError> {
    let (offset, size) = piece_range(torrent, index)?;
    Ok(map_range(torrent.files(), offset, size))
}

/// Offset and size of piece `index` in the flattened file space.
pub(crate) fn piece_range(torrent: &Torrent, index: usize) -> Result<(u64, u64), StorageError> {
    let out_of_range = || StorageError::InvalidPieceIndex {
        index,
        count: torrent.piece_count(),
    };
    let offset = torrent.piece_offset(index).map_err(|_| out_of_range())?;
    let size = torrent.piece_size(index).map_err(|_| out_of_range())?;
    Ok((offset, size))
}
