//! Torrent metadata ([BEP-3]).
//!
//! A [`Torrent`] is the immutable description the storage engine is sized
//! from: announce URL, creator, piece length, expected piece digests and the
//! ordered file layout. It is built once, from a decoded `.torrent` tree or
//! by [`TorrentBuilder`] hashing data on disk, and only read afterwards.
//!
//! # Torrent Structure
//!
//! - **announce** - Tracker URL
//! - **created by** - Client that created the torrent
//! - **creation date** - Unix timestamp when created
//! - **info**
//!   - `name` - File name (single-file) or root directory (multi-file)
//!   - `piece length` - Size of each piece in bytes
//!   - `pieces` - Concatenated SHA-1 digests of each piece
//!   - `length` (single-file) OR `files` (multi-file, list of `length`/`path`)
//! - **length** - Total size, mirroring the sum of file lengths
//!
//! # Examples
//!
//! ```no_run
//! use piecemeal::metainfo::Torrent;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let torrent = Torrent::from_file("example.torrent")?;
//!
//! println!("Name: {}", torrent.name());
//! println!("Pieces: {} x {} bytes", torrent.piece_count(), torrent.piece_length());
//! for file in torrent.files() {
//!     println!("  {} ({} bytes)", file.relative_path().display(), file.length());
//! }
//! # Ok(())
//! # }
//! ```
//!
//! [BEP-3]: http://bittorrent.org/beps/bep_0003.html

mod builder;
mod error;
mod torrent;

pub use builder::TorrentBuilder;
pub use error::MetainfoError;
pub use torrent::{File, Torrent, TorrentParts};
