//! Protocol constants and storage defaults.

// ============================================================================
// Protocol
// ============================================================================

/// Size of a block, the unit peers request and deliver (16 KiB).
pub const BLOCK_SIZE: u32 = 16384;

/// Length of a SHA-1 piece digest.
pub const SHA1_LEN: usize = 20;

// ============================================================================
// Torrent creation defaults
// ============================================================================

/// Default piece length for newly created torrents (256 KiB).
pub const DEFAULT_PIECE_LENGTH: u64 = 262144;

/// Announce URL written into created torrents when none is configured.
pub const DEFAULT_ANNOUNCE: &str = "http://localhost:6969/announce";

/// Value of the `created by` field in created torrents.
pub const CLIENT_NAME: &str = concat!("piecemeal/", env!("CARGO_PKG_VERSION"));

/// Extension appended to the source path when writing a `.torrent` file.
pub const TORRENT_EXTENSION: &str = "torrent";
