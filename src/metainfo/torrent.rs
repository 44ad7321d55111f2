use std::path::{Path, PathBuf};

use bytes::Bytes;

use super::error::MetainfoError;
use crate::bencode::{decode, encode, Value};
use crate::buffer::ByteView;
use crate::constants::SHA1_LEN;

/// Immutable description of a torrent's content.
///
/// Built once from a decoded metainfo tree (or from explicit [`TorrentParts`]
/// when creating a torrent) and only read afterwards. Files are laid out back
/// to back in declaration order; pieces partition that same flattened byte
/// space in `piece_length` steps.
///
/// # Examples
///
/// ```
/// use piecemeal::metainfo::Torrent;
///
/// let data = b"d8:announce9:http://t/10:created by4:test13:creation datei0e\
///              4:infod6:lengthi10e4:name5:a.bin12:piece lengthi4e\
///              6:pieces60:000000000000000000001111111111111111111122222222222222222222ee";
/// let torrent = Torrent::from_bytes(data).unwrap();
///
/// assert_eq!(torrent.piece_count(), 3);
/// assert_eq!(torrent.piece_size(2).unwrap(), 2);
/// assert_eq!(torrent.files()[0].path(), ["a.bin"]);
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Torrent {
    announce: String,
    created_by: String,
    creation_date: i64,
    piece_length: u64,
    name: String,
    pieces: Bytes,
    total_length: u64,
    files: Vec<File>,
    multi_file: bool,
}

/// A file within a torrent.
///
/// The path is kept as separate segments; it is only joined into a
/// platform path by [`File::relative_path`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct File {
    path: Vec<String>,
    length: u64,
}

impl File {
    pub fn new(path: Vec<String>, length: u64) -> Self {
        Self { path, length }
    }

    pub fn path(&self) -> &[String] {
        &self.path
    }

    pub fn length(&self) -> u64 {
        self.length
    }

    pub fn relative_path(&self) -> PathBuf {
        self.path.iter().collect()
    }
}

/// Field values for constructing a [`Torrent`] directly.
///
/// For a single-file torrent `files` holds one entry whose path is the
/// torrent name; for a multi-file torrent paths are relative to the
/// directory named `name`.
#[derive(Debug, Clone)]
pub struct TorrentParts {
    pub announce: String,
    pub created_by: String,
    pub creation_date: i64,
    pub piece_length: u64,
    pub name: String,
    pub pieces: Bytes,
    pub total_length: u64,
    pub files: Vec<File>,
    pub multi_file: bool,
}

impl Torrent {
    /// Validates the parts and assembles a torrent.
    ///
    /// # Errors
    ///
    /// - [`MetainfoError::InvalidField`] for a zero piece length, an empty
    ///   file list or an unsafe path segment, and for any length above
    ///   `i64::MAX`.
    /// - [`MetainfoError::Inconsistent`] if the hash blob is not a multiple of
    ///   20 bytes, the file lengths do not add up to `total_length`, or the
    ///   number of hashes does not match the number of pieces.
    pub fn new(parts: TorrentParts) -> Result<Self, MetainfoError> {
        let torrent = Self {
            announce: parts.announce,
            created_by: parts.created_by,
            creation_date: parts.creation_date,
            piece_length: parts.piece_length,
            name: parts.name,
            pieces: parts.pieces,
            total_length: parts.total_length,
            files: parts.files,
            multi_file: parts.multi_file,
        };
        torrent.validate()?;
        Ok(torrent)
    }

    /// Decodes and builds a torrent from `.torrent` bytes.
    pub fn from_bytes(data: &[u8]) -> Result<Self, MetainfoError> {
        let value = decode(data)?;
        Self::from_value(&value)
    }

    /// Reads and builds a torrent from a `.torrent` file on disk.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, MetainfoError> {
        let path = path.as_ref();
        let data = std::fs::read(path).map_err(|e| MetainfoError::io(path, e))?;
        let torrent = Self::from_bytes(&data)?;
        tracing::debug!(
            path = %path.display(),
            name = %torrent.name,
            pieces = torrent.piece_count(),
            files = torrent.files.len(),
            "loaded torrent"
        );
        Ok(torrent)
    }

    /// Builds a torrent from a decoded metainfo tree.
    ///
    /// # Errors
    ///
    /// Any absent required field, field of the wrong kind, or inconsistent
    /// length yields a malformed-metadata error (see
    /// [`MetainfoError::is_malformed`]).
    pub fn from_value(root: &Value) -> Result<Self, MetainfoError> {
        if root.as_dict().is_none() {
            return Err(MetainfoError::InvalidField("root"));
        }

        let announce = require_str(root, "announce")?.to_string();
        let created_by = require_str(root, "created by")?.to_string();
        let creation_date = require_int(root, "creation date")?;

        let info = require(root, "info")?;
        if info.as_dict().is_none() {
            return Err(MetainfoError::InvalidField("info"));
        }

        let piece_length = require_int(info, "piece length")?;
        let piece_length = u64::try_from(piece_length)
            .ok()
            .filter(|&len| len > 0)
            .ok_or(MetainfoError::InvalidField("piece length"))?;

        let pieces = require(info, "pieces")?
            .as_bytes()
            .ok_or(MetainfoError::InvalidField("pieces"))?
            .clone();

        let name = require_str(info, "name")?.to_string();

        let (files, multi_file) = match (info.get(b"length"), info.get(b"files")) {
            (Some(_), Some(_)) => {
                return Err(MetainfoError::Inconsistent(
                    "both `length` and `files` present in info".into(),
                ))
            }
            (Some(length), None) => {
                let length = parse_length(length, "length")?;
                (vec![File::new(vec![name.clone()], length)], false)
            }
            (None, Some(files)) => (parse_files(files)?, true),
            (None, None) => return Err(MetainfoError::MissingField("length or files")),
        };

        let total_length = sum_lengths(&files)?;

        if let Some(declared) = root.get(b"length") {
            let declared = parse_length(declared, "length")?;
            if declared != total_length {
                return Err(MetainfoError::Inconsistent(format!(
                    "declared length {declared} but files sum to {total_length}"
                )));
            }
        }

        Self::new(TorrentParts {
            announce,
            created_by,
            creation_date,
            piece_length,
            name,
            pieces,
            total_length,
            files,
            multi_file,
        })
    }

    /// Produces the metainfo tree this torrent was (or would be) built from.
    pub fn to_value(&self) -> Value {
        let mut info = Value::dict()
            .with("name", self.name.as_str())
            .with("piece length", self.piece_length as i64)
            .with("pieces", self.pieces.clone());

        info = if self.multi_file {
            let files: Vec<Value> = self
                .files
                .iter()
                .map(|file| {
                    let path: Vec<Value> = file.path.iter().map(|s| s.as_str().into()).collect();
                    Value::dict()
                        .with("length", file.length as i64)
                        .with("path", path)
                        .build()
                })
                .collect();
            info.with("files", files)
        } else {
            info.with("length", self.total_length as i64)
        };

        Value::dict()
            .with("announce", self.announce.as_str())
            .with("created by", self.created_by.as_str())
            .with("creation date", self.creation_date)
            .with("info", info.build())
            .with("length", self.total_length as i64)
            .build()
    }

    /// Encodes the torrent as `.torrent` bytes.
    pub fn to_bytes(&self) -> Result<Vec<u8>, MetainfoError> {
        Ok(encode(&self.to_value())?)
    }

    pub fn announce(&self) -> &str {
        &self.announce
    }

    pub fn created_by(&self) -> &str {
        &self.created_by
    }

    /// Unix timestamp of creation, in seconds.
    pub fn creation_date(&self) -> i64 {
        self.creation_date
    }

    pub fn piece_length(&self) -> u64 {
        self.piece_length
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// The concatenated 20-byte piece digests.
    pub fn pieces(&self) -> &Bytes {
        &self.pieces
    }

    pub fn total_length(&self) -> u64 {
        self.total_length
    }

    pub fn files(&self) -> &[File] {
        &self.files
    }

    /// True when the content is a directory of files rather than one file.
    pub fn is_multi_file(&self) -> bool {
        self.multi_file
    }

    pub fn piece_count(&self) -> usize {
        self.pieces.len() / SHA1_LEN
    }

    /// Expected SHA-1 digest of piece `index`.
    pub fn piece_hash(&self, index: usize) -> Result<ByteView<'_>, MetainfoError> {
        self.check_index(index)?;
        let start = index * SHA1_LEN;
        Ok(ByteView::new(&self.pieces[start..start + SHA1_LEN]))
    }

    /// Offset of piece `index` in the flattened byte space.
    pub fn piece_offset(&self, index: usize) -> Result<u64, MetainfoError> {
        self.check_index(index)?;
        Ok(index as u64 * self.piece_length)
    }

    /// Actual size of piece `index`; only the last piece may be short.
    pub fn piece_size(&self, index: usize) -> Result<u64, MetainfoError> {
        let offset = self.piece_offset(index)?;
        Ok((self.total_length - offset).min(self.piece_length))
    }

    /// Offset of file `index` in the flattened byte space.
    pub fn file_offset(&self, index: usize) -> Option<u64> {
        if index >= self.files.len() {
            return None;
        }
        Some(self.files[..index].iter().map(File::length).sum())
    }

    /// Path of file `index` relative to the download root.
    pub fn file_destination(&self, index: usize) -> Option<PathBuf> {
        let file = self.files.get(index)?;
        if self.multi_file {
            Some(Path::new(&self.name).join(file.relative_path()))
        } else {
            Some(file.relative_path())
        }
    }

    fn check_index(&self, index: usize) -> Result<(), MetainfoError> {
        let count = self.piece_count();
        if index >= count {
            return Err(MetainfoError::PieceIndexOutOfRange { index, count });
        }
        Ok(())
    }

    fn validate(&self) -> Result<(), MetainfoError> {
        if self.piece_length == 0 {
            return Err(MetainfoError::InvalidField("piece length"));
        }

        if self.pieces.len() % SHA1_LEN != 0 {
            return Err(MetainfoError::Inconsistent(format!(
                "pieces blob is {} bytes, not a multiple of {SHA1_LEN}",
                self.pieces.len()
            )));
        }

        if !is_safe_segment(&self.name) {
            return Err(MetainfoError::InvalidField("name"));
        }

        if self.files.is_empty() {
            return Err(MetainfoError::InvalidField("files"));
        }

        for file in &self.files {
            if file.path.is_empty() || !file.path.iter().all(|s| is_safe_segment(s)) {
                return Err(MetainfoError::InvalidField("file path"));
            }
        }

        // lengths are written back out as bencode integers
        if self.piece_length > MAX_LENGTH {
            return Err(MetainfoError::InvalidField("piece length"));
        }
        if self.total_length > MAX_LENGTH {
            return Err(MetainfoError::InvalidField("length"));
        }
        if self.files.iter().any(|file| file.length > MAX_LENGTH) {
            return Err(MetainfoError::InvalidField("file length"));
        }

        let sum = sum_lengths(&self.files)?;
        if sum != self.total_length {
            return Err(MetainfoError::Inconsistent(format!(
                "files sum to {sum} but total length is {}",
                self.total_length
            )));
        }

        let expected = self.total_length.div_ceil(self.piece_length);
        if self.piece_count() as u64 != expected {
            return Err(MetainfoError::Inconsistent(format!(
                "{} piece hashes for {expected} pieces",
                self.piece_count()
            )));
        }

        Ok(())
    }
}

/// Largest length that survives the trip through a bencode integer.
const MAX_LENGTH: u64 = i64::MAX as u64;

fn sum_lengths(files: &[File]) -> Result<u64, MetainfoError> {
    files.iter().try_fold(0u64, |sum, file| {
        sum.checked_add(file.length)
            .ok_or_else(|| MetainfoError::Inconsistent("file lengths overflow".into()))
    })
}

/// Rejects segments that could escape the download root once joined.
fn is_safe_segment(segment: &str) -> bool {
    !segment.is_empty()
        && segment != "."
        && segment != ".."
        && !segment.contains(['/', '\\', '\0'])
}

fn require<'a>(dict: &'a Value, key: &'static str) -> Result<&'a Value, MetainfoError> {
    dict.get(key.as_bytes())
        .ok_or(MetainfoError::MissingField(key))
}

fn require_str<'a>(dict: &'a Value, key: &'static str) -> Result<&'a str, MetainfoError> {
    require(dict, key)?
        .as_str()
        .ok_or(MetainfoError::InvalidField(key))
}

fn require_int(dict: &Value, key: &'static str) -> Result<i64, MetainfoError> {
    require(dict, key)?
        .as_integer()
        .ok_or(MetainfoError::InvalidField(key))
}

fn parse_length(value: &Value, field: &'static str) -> Result<u64, MetainfoError> {
    value
        .as_integer()
        .and_then(|n| u64::try_from(n).ok())
        .ok_or(MetainfoError::InvalidField(field))
}

fn parse_files(value: &Value) -> Result<Vec<File>, MetainfoError> {
    let list = value
        .as_list()
        .ok_or(MetainfoError::InvalidField("files"))?;

    list.iter()
        .map(|entry| {
            if entry.as_dict().is_none() {
                return Err(MetainfoError::InvalidField("files"));
            }

            let length = parse_length(require(entry, "length")?, "file length")?;

            let path = require(entry, "path")?
                .as_list()
                .ok_or(MetainfoError::InvalidField("file path"))?
                .iter()
                .map(|segment| {
                    segment
                        .as_str()
                        .map(String::from)
                        .ok_or(MetainfoError::InvalidField("file path"))
                })
                .collect::<Result<Vec<_>, _>>()?;

            Ok(File::new(path, length))
        })
        .collect()
}
