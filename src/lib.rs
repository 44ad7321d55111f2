//! piecemeal - BitTorrent piece storage
//!
//! Turns a torrent's metainfo into reconstruction buffers that accept blocks
//! in any order, verifies each completed piece against its SHA-1 digest, and
//! writes verified pieces into the files they overlap.
//!
//! # Modules
//!
//! - [`bencode`] - BEP-3 Bencode encoding/decoding
//! - [`metainfo`] - Torrent metadata: parsing, validation and creation
//! - [`storage`] - Piece tracking, verification and file writing
//! - [`buffer`] - Growable byte buffer and borrowed byte views
//! - [`config`] - TOML storage configuration
//! - [`constants`] - Block size and creation defaults

pub mod bencode;
pub mod buffer;
pub mod config;
pub mod constants;
pub mod metainfo;
pub mod storage;

pub use bencode::{decode, encode, BencodeError, Value};
pub use buffer::{ByteBuf, ByteView};
pub use config::{ConfigError, StorageConfig};
pub use metainfo::{File, MetainfoError, Torrent, TorrentBuilder, TorrentParts};
pub use storage::{
    Bitfield, BlockOutcome, Download, FileSpan, FileWriter, PieceStatus, PieceTracker,
    StorageError,
};
