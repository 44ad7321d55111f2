//! Torrent creation from data on disk.
//!
//! The source is streamed in `piece_length` chunks; a chunk may straddle
//! several files of a directory source, exactly as pieces do when the
//! torrent is downloaded later.
//!
//! ```no_run
//! use piecemeal::metainfo::TorrentBuilder;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let (torrent, written_to) = TorrentBuilder::new("videos/")
//!     .piece_length(262144)
//!     .announce("http://tracker.example.com/announce")
//!     .write_torrent_file()?;
//!
//! println!("{} pieces, saved to {}", torrent.piece_count(), written_to.display());
//! # Ok(())
//! # }
//! ```

use std::fs;
use std::io::Read;
use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};

use sha1::{Digest, Sha1};

use super::error::MetainfoError;
use super::torrent::{File, Torrent, TorrentParts};
use crate::buffer::ByteBuf;
use crate::config::StorageConfig;
use crate::constants::{SHA1_LEN, TORRENT_EXTENSION};

/// A file found under the source, with where to read it from.
#[derive(Debug)]
struct SourceFile {
    disk_path: PathBuf,
    segments: Vec<String>,
}

/// Builder for creating a torrent from a file or directory.
#[derive(Debug)]
pub struct TorrentBuilder {
    source: PathBuf,
    name: Option<String>,
    piece_length: u64,
    announce: String,
    created_by: String,
    /// Defaults to now.
    creation_date: Option<i64>,
}

impl TorrentBuilder {
    /// Creates a builder for `source` with the default configuration.
    pub fn new(source: impl Into<PathBuf>) -> Self {
        Self::from_config(source, &StorageConfig::default())
    }

    /// Creates a builder taking piece length, announce URL and creator from
    /// `config`.
    pub fn from_config(source: impl Into<PathBuf>, config: &StorageConfig) -> Self {
        Self {
            source: source.into(),
            name: None,
            piece_length: config.piece_length,
            announce: config.announce.clone(),
            created_by: config.created_by.clone(),
            creation_date: None,
        }
    }

    pub fn piece_length(mut self, length: u64) -> Self {
        self.piece_length = length;
        self
    }

    pub fn announce(mut self, url: impl Into<String>) -> Self {
        self.announce = url.into();
        self
    }

    pub fn created_by(mut self, created_by: impl Into<String>) -> Self {
        self.created_by = created_by.into();
        self
    }

    /// Sets the creation date (Unix timestamp).
    pub fn creation_date(mut self, timestamp: i64) -> Self {
        self.creation_date = Some(timestamp);
        self
    }

    /// Overrides the torrent name, which otherwise is the source's file name.
    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Hashes the source and assembles the torrent.
    ///
    /// # Errors
    ///
    /// - [`MetainfoError::Io`] if the source cannot be opened or read.
    /// - [`MetainfoError::InvalidField`] for a zero piece length or a name
    ///   that cannot be derived from the source path.
    /// - [`MetainfoError::MissingField`] for a directory without files.
    pub fn build(&self) -> Result<Torrent, MetainfoError> {
        if self.piece_length == 0 {
            return Err(MetainfoError::InvalidField("piece length"));
        }

        let name = match &self.name {
            Some(name) => name.clone(),
            None => self
                .source
                .file_name()
                .and_then(|s| s.to_str())
                .map(String::from)
                .ok_or(MetainfoError::InvalidField("name"))?,
        };

        let metadata =
            fs::metadata(&self.source).map_err(|e| MetainfoError::io(&self.source, e))?;

        let (sources, multi_file) = if metadata.is_dir() {
            let mut sources = Vec::new();
            collect_files(&self.source, &mut Vec::new(), &mut sources)?;
            if sources.is_empty() {
                return Err(MetainfoError::MissingField("files"));
            }
            (sources, true)
        } else {
            let file = SourceFile {
                disk_path: self.source.clone(),
                segments: vec![name.clone()],
            };
            (vec![file], false)
        };

        let (pieces, lengths) = self.hash_pieces(&sources)?;

        let files: Vec<File> = sources
            .into_iter()
            .zip(lengths)
            .map(|(source, length)| File::new(source.segments, length))
            .collect();
        let total_length = files.iter().map(File::length).sum();

        let creation_date = self.creation_date.unwrap_or_else(|| {
            SystemTime::now()
                .duration_since(UNIX_EPOCH)
                .map(|d| d.as_secs() as i64)
                .unwrap_or(0)
        });

        let torrent = Torrent::new(TorrentParts {
            announce: self.announce.clone(),
            created_by: self.created_by.clone(),
            creation_date,
            piece_length: self.piece_length,
            name,
            pieces,
            total_length,
            files,
            multi_file,
        })?;

        tracing::debug!(
            source = %self.source.display(),
            pieces = torrent.piece_count(),
            total_length,
            "created torrent"
        );

        Ok(torrent)
    }

    /// Builds the torrent and writes it to `<source>.torrent` next to the
    /// source, returning the torrent and the path written.
    pub fn write_torrent_file(&self) -> Result<(Torrent, PathBuf), MetainfoError> {
        let torrent = self.build()?;
        let bytes = torrent.to_bytes()?;

        let file_name = self
            .source
            .file_name()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_else(|| torrent.name().to_string());
        let target = self
            .source
            .with_file_name(format!("{file_name}.{TORRENT_EXTENSION}"));

        fs::write(&target, bytes).map_err(|e| MetainfoError::io(&target, e))?;
        Ok((torrent, target))
    }

    /// Streams every source file in order, hashing `piece_length` chunks
    /// that run across file boundaries. Returns the hash blob and the number
    /// of bytes read from each file.
    fn hash_pieces(
        &self,
        sources: &[SourceFile],
    ) -> Result<(bytes::Bytes, Vec<u64>), MetainfoError> {
        let chunk_len = usize::try_from(self.piece_length)
            .map_err(|_| MetainfoError::InvalidField("piece length"))?;

        let mut chunk = vec![0u8; chunk_len];
        let mut filled = 0usize;
        let mut pieces = ByteBuf::new();
        let mut lengths = Vec::with_capacity(sources.len());

        for source in sources {
            let path = &source.disk_path;
            let mut file = fs::File::open(path).map_err(|e| MetainfoError::io(path, e))?;
            let mut read_total = 0u64;

            loop {
                let n = file
                    .read(&mut chunk[filled..])
                    .map_err(|e| MetainfoError::io(path, e))?;
                if n == 0 {
                    break;
                }
                filled += n;
                read_total += n as u64;

                if filled == chunk_len {
                    pieces.push_slice(&Sha1::digest(&chunk));
                    filled = 0;
                }
            }

            lengths.push(read_total);
        }

        if filled > 0 {
            pieces.push_slice(&Sha1::digest(&chunk[..filled]));
        }

        debug_assert_eq!(pieces.len() % SHA1_LEN, 0);
        Ok((pieces.freeze(), lengths))
    }
}

/// Walks `dir` depth-first in name order, recording every regular file.
fn collect_files(
    dir: &Path,
    prefix: &mut Vec<String>,
    out: &mut Vec<SourceFile>,
) -> Result<(), MetainfoError> {
    let mut entries = fs::read_dir(dir)
        .map_err(|e| MetainfoError::io(dir, e))?
        .collect::<Result<Vec<_>, _>>()
        .map_err(|e| MetainfoError::io(dir, e))?;
    entries.sort_by_key(|entry| entry.file_name());

    for entry in entries {
        let path = entry.path();
        let segment = entry
            .file_name()
            .to_str()
            .map(String::from)
            .ok_or(MetainfoError::InvalidField("file path"))?;

        prefix.push(segment);
        if path.is_dir() {
            collect_files(&path, prefix, out)?;
        } else if path.is_file() {
            out.push(SourceFile {
                disk_path: path,
                segments: prefix.clone(),
            });
        }
        prefix.pop();
    }

    Ok(())
}
