//! Piece reconstruction, verification and persistence.
//!
//! # Overview
//!
//! A torrent's content is one flat byte stream cut two ways: into fixed-size
//! pieces (the integrity unit) and into files of arbitrary length (the
//! on-disk layout). Blocks arrive from peers in any order and are copied
//! into per-piece buffers; once every block of a piece is present its SHA-1
//! digest is compared with the one in the metainfo, and a matching piece is
//! written into every file it overlaps.
//!
//! # Components
//!
//! - [`PieceTracker`] - Per-piece buffers, received-block bitmaps and the
//!   [`PieceStatus`] state machine
//! - [`FileWriter`] - Writes verified pieces across file boundaries
//! - [`piece_spans`] / [`FileSpan`] - The pure piece-to-file mapping
//! - [`Download`] - Block intake for a whole torrent
//! - [`Bitfield`] - Packed flags for blocks and verified pieces
//!
//! # Examples
//!
//! ```no_run
//! use std::sync::Arc;
//! use piecemeal::metainfo::Torrent;
//! use piecemeal::storage::{BlockOutcome, Download};
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let torrent = Arc::new(Torrent::from_file("debian.iso.torrent")?);
//! let download = Download::new(torrent, "./downloads")?;
//!
//! // bytes received from a peer for piece 0, block 0
//! let block = vec![0u8; 16384];
//! match download.receive_block(0, 0, &block)? {
//!     BlockOutcome::Completed => println!("piece 0 is on disk"),
//!     BlockOutcome::Rejected => println!("piece 0 was corrupt, request it again"),
//!     BlockOutcome::Pending | BlockOutcome::Ignored => {}
//! }
//! # Ok(())
//! # }
//! ```
//!
//! # Security
//!
//! File paths come from untrusted metainfo. Segments that could escape the
//! download root are rejected when the torrent is built, and again before
//! any file is opened. Directories are created through the filesystem API,
//! never a shell.

mod bitfield;
mod error;
mod file;
mod piece;
mod session;
mod tracker;
mod writer;

pub use bitfield::Bitfield;
pub use error::StorageError;
pub use file::{map_range, piece_spans, FileSpan};
pub use piece::PieceStatus;
pub use session::{BlockOutcome, Download};
pub use tracker::{PieceData, PieceTracker};
pub use writer::FileWriter;

#[cfg(test)]
mod tests;
