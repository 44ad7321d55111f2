use std::path::PathBuf;
use std::sync::Arc;

use bytes::Bytes;
use proptest::prelude::*;
use sha1::{Digest, Sha1};
use tempfile::TempDir;

use super::writer::{checked_len, validate_file_path};
use super::*;
use crate::config::StorageConfig;
use crate::metainfo::{File, Torrent, TorrentParts};

fn pattern(len: usize) -> Vec<u8> {
    (0..len).map(|i| (i * 7 % 251) as u8).collect()
}

fn build_torrent(name: &str, piece_length: u64, files: &[(&str, &[u8])], multi_file: bool) -> Torrent {
    let content: Vec<u8> = files.iter().flat_map(|(_, data)| data.to_vec()).collect();
    let pieces: Vec<u8> = content
        .chunks(piece_length as usize)
        .flat_map(|chunk| Sha1::digest(chunk).to_vec())
        .collect();

    Torrent::new(TorrentParts {
        announce: "http://tracker.test/announce".into(),
        created_by: "tests".into(),
        creation_date: 0,
        piece_length,
        name: name.into(),
        pieces: Bytes::from(pieces),
        total_length: content.len() as u64,
        files: files
            .iter()
            .map(|(path, data)| {
                File::new(path.split('/').map(String::from).collect(), data.len() as u64)
            })
            .collect(),
        multi_file,
    })
    .unwrap()
}

fn single_file(name: &str, data: &[u8], piece_length: u64) -> Torrent {
    build_torrent(name, piece_length, &[(name, data)], false)
}

fn files_with_lengths(lengths: &[u64]) -> Vec<File> {
    lengths
        .iter()
        .enumerate()
        .map(|(i, &len)| File::new(vec![format!("f{i}")], len))
        .collect()
}

/// Feeds every block of every piece of `data` into `tracker`.
fn fill(tracker: &PieceTracker, data: &[u8], piece_length: usize) {
    for (index, piece) in data.chunks(piece_length).enumerate() {
        for (block, chunk) in piece.chunks(tracker.block_size()).enumerate() {
            tracker.write_block(index, block, chunk).unwrap();
        }
    }
}

// ============================================================================
// Span mapping
// ============================================================================

#[test]
fn test_span_straddling_two_files() {
    let files = files_with_lengths(&[100, 200]);
    let spans = map_range(&files, 50, 150);

    assert_eq!(
        spans,
        vec![
            FileSpan {
                file_index: 0,
                file_offset: 50,
                data_offset: 0,
                length: 50,
            },
            FileSpan {
                file_index: 1,
                file_offset: 0,
                data_offset: 50,
                length: 100,
            },
        ]
    );
}

#[test]
fn test_piece_ending_on_file_boundary_hits_one_file() {
    let torrent = build_torrent("d", 4, &[("a", &b"abcd"[..]), ("b", &b"efgh"[..])], true);

    let spans = piece_spans(&torrent, 0).unwrap();
    assert_eq!(spans.len(), 1);
    assert_eq!(spans[0].file_index, 0);
    assert_eq!(spans[0].length, 4);

    let spans = piece_spans(&torrent, 1).unwrap();
    assert_eq!(spans.len(), 1);
    assert_eq!(spans[0].file_index, 1);
    assert_eq!(spans[0].file_offset, 0);
}

#[test]
fn test_spans_for_six_and_four_byte_files() {
    let torrent = build_torrent("d", 4, &[("a", &b"012345"[..]), ("b", &b"6789"[..])], true);
    assert_eq!(torrent.piece_count(), 3);

    assert_eq!(
        piece_spans(&torrent, 0).unwrap(),
        vec![FileSpan {
            file_index: 0,
            file_offset: 0,
            data_offset: 0,
            length: 4,
        }]
    );

    // file 0 ends at offset 6, halfway through piece 1
    assert_eq!(
        piece_spans(&torrent, 1).unwrap(),
        vec![
            FileSpan {
                file_index: 0,
                file_offset: 4,
                data_offset: 0,
                length: 2,
            },
            FileSpan {
                file_index: 1,
                file_offset: 0,
                data_offset: 2,
                length: 2,
            },
        ]
    );

    assert_eq!(
        piece_spans(&torrent, 2).unwrap(),
        vec![FileSpan {
            file_index: 1,
            file_offset: 2,
            data_offset: 0,
            length: 2,
        }]
    );

    assert!(matches!(
        piece_spans(&torrent, 3),
        Err(StorageError::InvalidPieceIndex { index: 3, count: 3 })
    ));
}

#[test]
fn test_piece_over_many_small_files() {
    let files = files_with_lengths(&[3, 0, 2, 1, 5]);
    let spans = map_range(&files, 2, 6);

    let indices: Vec<usize> = spans.iter().map(|s| s.file_index).collect();
    assert_eq!(indices, [0, 2, 3, 4]);
    let lengths: Vec<u64> = spans.iter().map(|s| s.length).collect();
    assert_eq!(lengths, [1, 2, 1, 2]);
}

proptest! {
    #[test]
    fn prop_spans_partition_every_piece(
        lengths in prop::collection::vec(0u64..64, 1..6),
        piece_length in 1u64..48,
    ) {
        let total: u64 = lengths.iter().sum();
        prop_assume!(total > 0);
        let files = files_with_lengths(&lengths);

        let mut per_file = vec![0u64; files.len()];
        for index in 0..total.div_ceil(piece_length) {
            let offset = index * piece_length;
            let size = (total - offset).min(piece_length);
            let spans = map_range(&files, offset, size);

            let mut covered = 0;
            for span in &spans {
                prop_assert_eq!(span.data_offset, covered);
                prop_assert!(span.length > 0);
                prop_assert!(span.file_offset + span.length <= files[span.file_index].length());
                covered += span.length;
                per_file[span.file_index] += span.length;
            }
            prop_assert_eq!(covered, size);
            prop_assert!(spans.windows(2).all(|w| w[0].file_index < w[1].file_index));
        }
        prop_assert_eq!(per_file, lengths);
    }
}

// ============================================================================
// Tracker
// ============================================================================

#[test]
fn test_tracker_sizes_pieces_and_blocks() {
    let data = pattern(40000);
    let torrent = single_file("big.bin", &data, 32768);
    let tracker = PieceTracker::new(&torrent).unwrap();

    assert_eq!(tracker.piece_count(), 2);
    assert_eq!(tracker.piece_size(0).unwrap(), 32768);
    assert_eq!(tracker.block_count(0).unwrap(), 2);
    assert_eq!(tracker.piece_size(1).unwrap(), 40000 - 32768);
    assert_eq!(tracker.block_count(1).unwrap(), 1);
    assert!(tracker.piece_data(0).unwrap().iter().all(|&b| b == 0));
}

#[test]
fn test_status_valid_after_all_blocks() {
    let data = pattern(100);
    let torrent = single_file("f", &data, 40);
    let tracker = PieceTracker::with_block_size(&torrent, 16).unwrap();

    tracker.write_block(0, 0, &data[..16]).unwrap();
    assert_eq!(tracker.status(0).unwrap(), PieceStatus::Downloading);

    tracker.write_block(0, 2, &data[32..40]).unwrap();
    tracker.write_block(0, 1, &data[16..32]).unwrap();
    assert_eq!(tracker.status(0).unwrap(), PieceStatus::Valid);
    assert!(tracker.is_verified(0).unwrap());
    assert_eq!(&*tracker.piece_data(0).unwrap(), &data[..40]);
    assert_eq!(tracker.piece_bytes(0).unwrap(), Bytes::copy_from_slice(&data[..40]));
}

#[test]
fn test_single_altered_byte_resets_piece() {
    let data = pattern(48);
    let torrent = single_file("f", &data, 48);
    let tracker = PieceTracker::with_block_size(&torrent, 16).unwrap();

    let mut corrupt = data.clone();
    corrupt[30] ^= 0x01;
    fill(&tracker, &corrupt, 48);

    assert_eq!(tracker.status(0).unwrap(), PieceStatus::Invalid);
    for block in 0..3 {
        assert!(!tracker.block_received(0, block).unwrap());
    }
    assert_eq!(tracker.received_count(0).unwrap(), 0);
    assert!(tracker.piece_data(0).unwrap().iter().all(|&b| b == 0));
    assert_eq!(tracker.status(0).unwrap(), PieceStatus::Downloading);

    fill(&tracker, &data, 48);
    assert_eq!(tracker.status(0).unwrap(), PieceStatus::Valid);
}

#[test]
fn test_block_index_out_of_range_leaves_piece_unchanged() {
    let data = pattern(40);
    let torrent = single_file("f", &data, 40);
    let tracker = PieceTracker::with_block_size(&torrent, 16).unwrap();

    tracker.write_block(0, 0, &data[..16]).unwrap();
    let before = tracker.piece_bytes(0).unwrap();

    let err = tracker.write_block(0, 3, &[0xFF; 16]).unwrap_err();
    assert!(matches!(
        err,
        StorageError::InvalidBlockIndex {
            piece: 0,
            block: 3,
            count: 3
        }
    ));
    assert_eq!(tracker.received_count(0).unwrap(), 1);
    assert_eq!(tracker.piece_bytes(0).unwrap(), before);
    assert!(tracker.block_received(0, 3).is_err());
    assert!(tracker.set_block_received(0, 3, true).is_err());
}

#[test]
fn test_piece_index_out_of_range() {
    let torrent = single_file("f", &pattern(10), 4);
    let tracker = PieceTracker::new(&torrent).unwrap();

    let is_bad_index =
        |e: StorageError| matches!(e, StorageError::InvalidPieceIndex { index: 3, count: 3 });
    assert!(is_bad_index(tracker.write_block(3, 0, b"x").unwrap_err()));
    assert!(is_bad_index(tracker.status(3).unwrap_err()));
    assert!(is_bad_index(tracker.block_received(3, 0).unwrap_err()));
    assert!(is_bad_index(tracker.block_count(3).unwrap_err()));
    assert!(is_bad_index(tracker.piece_data(3).unwrap_err()));
    assert!(is_bad_index(tracker.set_piece_data(3, b"x").unwrap_err()));
}

#[test]
fn test_overlong_block_is_clamped() {
    let data = pattern(20);
    let torrent = single_file("f", &data, 20);
    let tracker = PieceTracker::with_block_size(&torrent, 8).unwrap();
    assert_eq!(tracker.block_count(0).unwrap(), 3);

    tracker.write_block(0, 0, &data[..8]).unwrap();
    tracker.write_block(0, 1, &data[8..16]).unwrap();

    let mut tail = data[16..].to_vec();
    tail.extend_from_slice(&[0xEE; 4]);
    tracker.write_block(0, 2, &tail).unwrap();

    assert_eq!(tracker.piece_bytes(0).unwrap().len(), 20);
    assert_eq!(tracker.status(0).unwrap(), PieceStatus::Valid);
}

#[test]
fn test_empty_block_is_noop() {
    let torrent = single_file("f", &pattern(10), 10);
    let tracker = PieceTracker::new(&torrent).unwrap();

    tracker.write_block(0, 0, &[]).unwrap();
    assert!(!tracker.block_received(0, 0).unwrap());
    assert_eq!(tracker.status(0).unwrap(), PieceStatus::Downloading);
}

#[test]
fn test_writes_to_verified_piece_are_ignored() {
    let data = pattern(10);
    let torrent = single_file("f", &data, 10);
    let tracker = PieceTracker::new(&torrent).unwrap();

    tracker.write_block(0, 0, &data).unwrap();
    assert_eq!(tracker.status(0).unwrap(), PieceStatus::Valid);

    tracker.write_block(0, 0, &[0u8; 10]).unwrap();
    tracker.set_block_received(0, 0, false).unwrap();
    tracker.set_piece_data(0, &[1u8; 10]).unwrap();

    assert_eq!(&*tracker.piece_data(0).unwrap(), data.as_slice());
    assert!(tracker.block_received(0, 0).unwrap());
    assert_eq!(tracker.status(0).unwrap(), PieceStatus::Valid);
}

#[test]
fn test_set_piece_data_marks_covered_blocks() {
    let data = pattern(40);
    let torrent = single_file("f", &data, 40);
    let tracker = PieceTracker::with_block_size(&torrent, 16).unwrap();

    tracker.set_piece_data(0, &data[..20]).unwrap();
    assert_eq!(tracker.received_count(0).unwrap(), 2);
    assert!(!tracker.block_received(0, 2).unwrap());

    tracker.set_piece_data(0, &data).unwrap();
    assert_eq!(tracker.status(0).unwrap(), PieceStatus::Valid);
}

#[test]
fn test_set_block_received_toggles() {
    let torrent = single_file("f", &pattern(40), 40);
    let tracker = PieceTracker::with_block_size(&torrent, 16).unwrap();

    tracker.set_block_received(0, 1, true).unwrap();
    assert!(tracker.block_received(0, 1).unwrap());
    tracker.set_block_received(0, 1, false).unwrap();
    assert!(!tracker.block_received(0, 1).unwrap());
}

#[test]
fn test_zero_block_size_rejected() {
    let torrent = single_file("f", &pattern(10), 10);
    assert!(matches!(
        PieceTracker::with_block_size(&torrent, 0),
        Err(StorageError::ZeroBlockSize)
    ));
}

#[test]
fn test_bitfield_tracks_verified_pieces() {
    let data = pattern(10);
    let torrent = single_file("f", &data, 4);
    let tracker = PieceTracker::new(&torrent).unwrap();

    tracker.write_block(2, 0, &data[8..]).unwrap();
    tracker.status(2).unwrap();

    let bitfield = tracker.bitfield();
    assert_eq!(bitfield.len(), 3);
    assert_eq!(bitfield.missing(), vec![0, 1]);
    assert_eq!(bitfield.as_bytes(), &[0b0010_0000]);
}

#[test]
fn test_piece_data_view() {
    let data = b"spam".to_vec();
    let torrent = single_file("f", &data, 4);
    let tracker = PieceTracker::new(&torrent).unwrap();
    tracker.write_block(0, 0, &data).unwrap();

    let piece = tracker.piece_data(0).unwrap();
    assert_eq!(piece.as_view().as_str(), Some("spam"));
}

proptest! {
    #[test]
    fn prop_block_order_does_not_matter(
        order in Just((0..5usize).collect::<Vec<_>>()).prop_shuffle(),
    ) {
        let data = pattern(70);
        let torrent = single_file("f", &data, 70);
        let tracker = PieceTracker::with_block_size(&torrent, 16).unwrap();

        for (n, &block) in order.iter().enumerate() {
            let start = block * 16;
            let end = (start + 16).min(data.len());
            tracker.write_block(0, block, &data[start..end]).unwrap();

            let expected = if n + 1 == order.len() {
                PieceStatus::Valid
            } else {
                PieceStatus::Downloading
            };
            prop_assert_eq!(tracker.status(0).unwrap(), expected);
        }
    }
}

// ============================================================================
// Writer
// ============================================================================

fn album() -> (Torrent, Vec<u8>) {
    let a = pattern(6);
    let b: Vec<u8> = pattern(10)[6..].to_vec();
    let torrent = build_torrent("album", 4, &[("disc/a.bin", &a[..]), ("b.bin", &b[..])], true);
    (torrent, pattern(10))
}

#[test]
fn test_flush_requires_verified_piece() {
    let temp = TempDir::new().unwrap();
    let (torrent, data) = album();
    let tracker = PieceTracker::new(&torrent).unwrap();
    let writer = FileWriter::new(temp.path());

    assert!(matches!(
        writer.flush_piece(&torrent, &tracker, 0),
        Err(StorageError::NotValid(0))
    ));

    // all blocks present but never checked
    tracker.write_block(0, 0, &data[..4]).unwrap();
    assert!(matches!(
        writer.flush_piece(&torrent, &tracker, 0),
        Err(StorageError::NotValid(0))
    ));
    assert!(!temp.path().join("album").exists());
}

#[test]
fn test_flush_pieces_across_files() {
    let temp = TempDir::new().unwrap();
    let (torrent, data) = album();
    let tracker = PieceTracker::new(&torrent).unwrap();
    let writer = FileWriter::new(temp.path());

    fill(&tracker, &data, 4);
    // reverse order: later flushes must not truncate earlier ones
    for index in (0..3).rev() {
        assert_eq!(tracker.status(index).unwrap(), PieceStatus::Valid);
        writer.flush_piece(&torrent, &tracker, index).unwrap();
    }

    let a = std::fs::read(temp.path().join("album").join("disc").join("a.bin")).unwrap();
    let b = std::fs::read(temp.path().join("album").join("b.bin")).unwrap();
    assert_eq!(a, &data[..6]);
    assert_eq!(b, &data[6..]);

    assert_eq!(writer.read_piece(&torrent, 1).unwrap(), &data[4..8]);
}

#[test]
fn test_flush_is_idempotent() {
    let temp = TempDir::new().unwrap();
    let (torrent, data) = album();
    let tracker = PieceTracker::new(&torrent).unwrap();
    let writer = FileWriter::new(temp.path());

    fill(&tracker, &data, 4);
    tracker.status(1).unwrap();

    writer.flush_piece(&torrent, &tracker, 1).unwrap();
    let a_once = std::fs::read(writer.destination(&torrent, 0).unwrap()).unwrap();
    let b_once = std::fs::read(writer.destination(&torrent, 1).unwrap()).unwrap();

    writer.flush_piece(&torrent, &tracker, 1).unwrap();
    let a_twice = std::fs::read(writer.destination(&torrent, 0).unwrap()).unwrap();
    let b_twice = std::fs::read(writer.destination(&torrent, 1).unwrap()).unwrap();

    assert_eq!(a_once, a_twice);
    assert_eq!(b_once, b_twice);
    assert_eq!(b_once, &data[6..8]);
}

#[test]
fn test_single_file_destination() {
    let temp = TempDir::new().unwrap();
    let data = pattern(10);
    let torrent = single_file("movie.mkv", &data, 4);
    let writer = FileWriter::new(temp.path());

    assert_eq!(
        writer.destination(&torrent, 0).unwrap(),
        temp.path().join("movie.mkv")
    );

    for (index, chunk) in data.chunks(4).enumerate() {
        writer.write_piece(&torrent, index, chunk).unwrap();
    }
    assert_eq!(std::fs::read(temp.path().join("movie.mkv")).unwrap(), data);
}

#[test]
fn test_write_piece_rejects_wrong_length() {
    let temp = TempDir::new().unwrap();
    let (torrent, _) = album();
    let writer = FileWriter::new(temp.path());

    assert!(matches!(
        writer.write_piece(&torrent, 2, &[0u8; 4]),
        Err(StorageError::LengthMismatch {
            expected: 2,
            actual: 4
        })
    ));
    assert!(matches!(
        writer.write_piece(&torrent, 9, &[0u8; 4]),
        Err(StorageError::InvalidPieceIndex { index: 9, .. })
    ));
}

#[test]
fn test_allocate_creates_and_extends_without_truncating() {
    let temp = TempDir::new().unwrap();
    let torrent = build_torrent(
        "pack",
        4,
        &[
            ("a.bin", &pattern(6)[..]),
            ("empty.txt", &b""[..]),
            ("nested/b.bin", &b"1234"[..]),
        ],
        true,
    );
    let writer = FileWriter::new(temp.path());

    let a_path = temp.path().join("pack").join("a.bin");
    std::fs::create_dir_all(a_path.parent().unwrap()).unwrap();
    std::fs::write(&a_path, b"xy").unwrap();

    writer.allocate(&torrent).unwrap();

    let a = std::fs::read(&a_path).unwrap();
    assert_eq!(a.len(), 6);
    assert_eq!(&a[..2], b"xy");
    assert_eq!(std::fs::metadata(temp.path().join("pack").join("empty.txt")).unwrap().len(), 0);
    assert_eq!(
        std::fs::metadata(temp.path().join("pack").join("nested").join("b.bin"))
            .unwrap()
            .len(),
        4
    );

    // a second allocation keeps everything as is
    writer.allocate(&torrent).unwrap();
    assert_eq!(&std::fs::read(&a_path).unwrap()[..2], b"xy");
}

#[test]
fn test_io_error_carries_path() {
    let temp = TempDir::new().unwrap();
    let blocker = temp.path().join("not-a-dir");
    std::fs::write(&blocker, b"file").unwrap();

    let (torrent, data) = album();
    let writer = FileWriter::new(&blocker);

    match writer.write_piece(&torrent, 0, &data[..4]).unwrap_err() {
        StorageError::Io { path, .. } => assert!(path.starts_with(&blocker)),
        other => panic!("unexpected error: {other}"),
    }

    assert!(matches!(
        writer.read_piece(&torrent, 0),
        Err(StorageError::Io { .. })
    ));
}

#[test]
fn test_validate_file_path() {
    assert!(validate_file_path(&PathBuf::from("album/a.bin")).is_ok());
    assert!(matches!(
        validate_file_path(&PathBuf::from("../etc/passwd")),
        Err(StorageError::PathTraversal(_))
    ));
    assert!(matches!(
        validate_file_path(&PathBuf::from("/etc/passwd")),
        Err(StorageError::PathTraversal(_))
    ));
}

#[test]
fn test_checked_len() {
    assert_eq!(checked_len(0, 16384).unwrap(), 16384);
    match usize::try_from(u64::MAX) {
        Ok(max) => assert_eq!(checked_len(3, u64::MAX).unwrap(), max),
        Err(_) => assert!(matches!(
            checked_len(3, u64::MAX),
            Err(StorageError::PieceTooLarge {
                index: 3,
                size: u64::MAX
            })
        )),
    }
}

// ============================================================================
// Download
// ============================================================================

#[test]
fn test_download_reverse_order() {
    let temp = TempDir::new().unwrap();
    let (torrent, data) = album();
    let download = Download::new(Arc::new(torrent), temp.path()).unwrap();

    assert_eq!(download.progress(), 0.0);
    assert_eq!(download.receive_block(2, 0, &data[8..]).unwrap(), BlockOutcome::Completed);
    assert_eq!(download.receive_block(1, 0, &data[4..8]).unwrap(), BlockOutcome::Completed);
    assert!(!download.is_complete());
    assert!((download.progress() - 0.6).abs() < 1e-9);

    assert_eq!(download.receive_block(0, 0, &data[..4]).unwrap(), BlockOutcome::Completed);
    assert!(download.is_complete());
    assert_eq!(download.verified_bytes(), 10);
    assert_eq!(download.progress(), 1.0);

    let a = std::fs::read(temp.path().join("album").join("disc").join("a.bin")).unwrap();
    assert_eq!(a, &data[..6]);
}

#[test]
fn test_flush_retries_after_io_error() {
    let temp = TempDir::new().unwrap();
    let blocker = temp.path().join("downloads");
    std::fs::write(&blocker, b"file").unwrap();

    let (torrent, data) = album();
    let download = Download::new(Arc::new(torrent), &blocker).unwrap();

    assert!(matches!(
        download.receive_block(0, 0, &data[..4]),
        Err(StorageError::Io { .. })
    ));
    // the piece verified before the write failed
    assert!(download.tracker().is_verified(0).unwrap());
    assert_eq!(download.receive_block(0, 0, &data[..4]).unwrap(), BlockOutcome::Ignored);

    std::fs::remove_file(&blocker).unwrap();
    download.flush(0).unwrap();

    let a = std::fs::read(blocker.join("album").join("disc").join("a.bin")).unwrap();
    assert_eq!(a, &data[..4]);
    assert!(matches!(download.flush(1), Err(StorageError::NotValid(1))));
}

#[test]
fn test_download_rejects_then_accepts() {
    let temp = TempDir::new().unwrap();
    let data = pattern(48);
    let torrent = Arc::new(single_file("f.bin", &data, 48));
    let config = StorageConfig {
        download_dir: temp.path().to_path_buf(),
        block_size: 16,
        ..StorageConfig::default()
    };
    let download = Download::from_config(torrent, &config).unwrap();

    assert_eq!(download.receive_block(0, 0, &data[..16]).unwrap(), BlockOutcome::Pending);
    assert_eq!(download.receive_block(0, 1, &[0u8; 16]).unwrap(), BlockOutcome::Pending);
    assert_eq!(download.receive_block(0, 2, &data[32..]).unwrap(), BlockOutcome::Rejected);
    assert_eq!(download.tracker().received_count(0).unwrap(), 0);
    assert!(!temp.path().join("f.bin").exists());

    for block in 0..3 {
        let chunk = &data[block * 16..(block + 1) * 16];
        let outcome = download.receive_block(0, block, chunk).unwrap();
        let expected = if block == 2 {
            BlockOutcome::Completed
        } else {
            BlockOutcome::Pending
        };
        assert_eq!(outcome, expected);
    }

    assert_eq!(
        download.receive_block(0, 1, &[0u8; 16]).unwrap(),
        BlockOutcome::Ignored
    );
    assert!(matches!(
        download.receive_block(0, 7, &[0u8; 16]),
        Err(StorageError::InvalidBlockIndex { .. })
    ));
    assert_eq!(std::fs::read(temp.path().join("f.bin")).unwrap(), data);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_blocks_async() {
    let temp = TempDir::new().unwrap();
    let data = pattern(8 * 64);
    let torrent = Arc::new(build_torrent(
        "set",
        64,
        &[("one.bin", &data[..100]), ("two.bin", &data[100..300]), ("three.bin", &data[300..])],
        true,
    ));
    let tracker = PieceTracker::with_block_size(&torrent, 16).unwrap();
    let download = Download::from_parts(torrent, tracker, FileWriter::new(temp.path()));

    let mut handles = Vec::new();
    for block in (0..4).rev() {
        for piece in 0..8 {
            let download = download.clone();
            let start = piece * 64 + block * 16;
            let chunk = Bytes::copy_from_slice(&data[start..start + 16]);
            handles.push(tokio::spawn(async move {
                download.receive_block_async(piece, block, chunk).await
            }));
        }
    }

    let mut completed = 0;
    for handle in handles {
        if handle.await.unwrap().unwrap() == BlockOutcome::Completed {
            completed += 1;
        }
    }

    assert_eq!(completed, 8);
    assert!(download.is_complete());

    let root = temp.path().join("set");
    let mut on_disk = std::fs::read(root.join("one.bin")).unwrap();
    on_disk.extend(std::fs::read(root.join("two.bin")).unwrap());
    on_disk.extend(std::fs::read(root.join("three.bin")).unwrap());
    assert_eq!(on_disk, data);
}
