//! Tests for OffsetIndex
//!
//! These tests verify:
//! - File pre-allocation to max_index_bytes while open
//! - Sequential writes read back by relative offset
//! - The -1 sentinel resolves to the most recent entry
//! - End-of-data on empty index and past the last entry
//! - Capacity and ordering enforcement
//! - Truncation on close and rebuild from an existing file
//! - Rebuild from frame positions

use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::PathBuf;

use logcore::index::{ENTRY_WIDTH, LAST_ENTRY};
use logcore::{IndexEntry, LogError, OffsetIndex, SegmentConfig};
use tempfile::TempDir;

// =============================================================================
// Helper Functions
// =============================================================================

fn setup_temp_index() -> (TempDir, PathBuf) {
    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().join("test.index");
    (temp_dir, path)
}

fn config_with_index_bytes(max_index_bytes: u64) -> SegmentConfig {
    SegmentConfig {
        max_index_bytes,
        ..SegmentConfig::default()
    }
}

// =============================================================================
// Open Tests
// =============================================================================

#[test]
fn test_new_index_is_preallocated_and_empty() {
    let (_temp, path) = setup_temp_index();
    let index = OffsetIndex::open(&path, &config_with_index_bytes(1024)).unwrap();

    assert_eq!(fs::metadata(&path).unwrap().len(), 1024);
    assert_eq!(index.capacity(), 1024);
    assert_eq!(index.entry_count(), 0);
    assert_eq!(index.size(), 0);
    assert_eq!(index.name(), path.as_path());
}

#[test]
fn test_empty_index_reads_are_end_of_data() {
    let (_temp, path) = setup_temp_index();
    let index = OffsetIndex::open(&path, &config_with_index_bytes(1024)).unwrap();

    assert!(matches!(index.read(LAST_ENTRY), Err(LogError::EndOfData)));
    assert!(matches!(index.read(0), Err(LogError::EndOfData)));
    assert!(index.last().unwrap_err().is_not_found());
}

#[test]
fn test_existing_file_larger_than_capacity_rejected() {
    let (_temp, path) = setup_temp_index();
    fs::write(&path, vec![0u8; 120]).unwrap();

    let result = OffsetIndex::open(&path, &config_with_index_bytes(60));
    assert!(matches!(result, Err(LogError::Config(_))));
}

#[test]
fn test_partial_trailing_entry_ignored() {
    let (_temp, path) = setup_temp_index();
    let mut bytes = IndexEntry::new(0, 0).encode().to_vec();
    bytes.extend_from_slice(&[0, 0, 0, 1, 0]);
    fs::write(&path, &bytes).unwrap();

    let mut index = OffsetIndex::open(&path, &config_with_index_bytes(1024)).unwrap();
    assert_eq!(index.entry_count(), 1);

    // The next write lands over the partial bytes
    index.write(1, 10).unwrap();
    assert_eq!(index.read(1).unwrap(), IndexEntry::new(1, 10));
}

// =============================================================================
// Write / Read Tests
// =============================================================================

#[test]
fn test_scenario_write_read_close_reopen() {
    let (_temp, path) = setup_temp_index();
    let config = config_with_index_bytes(1024);

    let mut index = OffsetIndex::open(&path, &config).unwrap();
    index.write(0, 0).unwrap();
    index.write(1, 10).unwrap();

    assert_eq!(index.read(0).unwrap(), IndexEntry::new(0, 0));
    assert_eq!(index.read(1).unwrap(), IndexEntry::new(1, 10));
    assert_eq!(index.read(LAST_ENTRY).unwrap(), IndexEntry::new(1, 10));
    assert!(matches!(index.read(2), Err(LogError::EndOfData)));

    index.close().unwrap();
    assert_eq!(fs::metadata(&path).unwrap().len(), 2 * ENTRY_WIDTH);

    let index = OffsetIndex::open(&path, &config).unwrap();
    assert_eq!(index.entry_count(), 2);
    assert_eq!(index.read(LAST_ENTRY).unwrap(), IndexEntry::new(1, 10));
    assert_eq!(index.read(0).unwrap(), IndexEntry::new(0, 0));
    // Mapped at full capacity again
    assert_eq!(fs::metadata(&path).unwrap().len(), 1024);
}

#[test]
fn test_monotonic_entries_read_back() {
    let (_temp, path) = setup_temp_index();
    let mut index = OffsetIndex::open(&path, &config_with_index_bytes(12 * 500)).unwrap();

    let positions: Vec<u64> = (0..500u64).map(|i| i * 37 + (i % 7) * 1000).collect();
    for (i, &pos) in positions.iter().enumerate() {
        index.write(i as u32, pos).unwrap();
    }

    for (i, &pos) in positions.iter().enumerate() {
        assert_eq!(index.read(i as i64).unwrap(), IndexEntry::new(i as u32, pos));
    }
    assert_eq!(index.read(LAST_ENTRY).unwrap(), index.read(499).unwrap());
    assert!(matches!(index.read(500), Err(LogError::EndOfData)));
}

#[test]
fn test_other_negative_offsets_are_end_of_data() {
    let (_temp, path) = setup_temp_index();
    let mut index = OffsetIndex::open(&path, &config_with_index_bytes(1024)).unwrap();
    index.write(0, 5).unwrap();

    assert!(matches!(index.read(-2), Err(LogError::EndOfData)));
    assert!(matches!(index.read(i64::MIN), Err(LogError::EndOfData)));
}

#[test]
fn test_out_of_order_write_rejected() {
    let (_temp, path) = setup_temp_index();
    let mut index = OffsetIndex::open(&path, &config_with_index_bytes(1024)).unwrap();

    assert!(matches!(
        index.write(1, 0),
        Err(LogError::OutOfOrder { expected: 0, got: 1 })
    ));
    index.write(0, 0).unwrap();
    assert!(matches!(
        index.write(0, 8),
        Err(LogError::OutOfOrder { expected: 1, got: 0 })
    ));
    assert_eq!(index.entry_count(), 1);
}

// =============================================================================
// Capacity Tests
// =============================================================================

#[test]
fn test_capacity_enforced_and_prior_entries_kept() {
    let (_temp, path) = setup_temp_index();
    // Room for exactly three entries
    let mut index = OffsetIndex::open(&path, &config_with_index_bytes(3 * ENTRY_WIDTH)).unwrap();

    for i in 0..3u32 {
        assert!(!index.is_full());
        index.write(i, u64::from(i) * 100).unwrap();
    }
    assert!(index.is_full());

    match index.write(3, 300) {
        Err(LogError::IndexFull { capacity }) => assert_eq!(capacity, 3 * ENTRY_WIDTH),
        other => panic!("expected IndexFull, got {:?}", other),
    }

    assert_eq!(index.entry_count(), 3);
    for i in 0..3u32 {
        assert_eq!(index.read(i64::from(i)).unwrap(), IndexEntry::new(i, u64::from(i) * 100));
    }
}

#[test]
fn test_capacity_not_multiple_of_entry_width() {
    let (_temp, path) = setup_temp_index();
    // 30 bytes: two whole entries plus 6 unusable bytes
    let mut index = OffsetIndex::open(&path, &config_with_index_bytes(30)).unwrap();

    index.write(0, 0).unwrap();
    index.write(1, 1).unwrap();
    assert!(matches!(index.write(2, 2), Err(LogError::IndexFull { .. })));
}

// =============================================================================
// Close / Restart Tests
// =============================================================================

#[test]
fn test_close_empty_index_truncates_to_zero() {
    let (_temp, path) = setup_temp_index();
    let index = OffsetIndex::open(&path, &config_with_index_bytes(1024)).unwrap();
    index.close().unwrap();

    assert_eq!(fs::metadata(&path).unwrap().len(), 0);
}

#[test]
fn test_appending_after_reopen_continues_sequence() {
    let (_temp, path) = setup_temp_index();
    let config = config_with_index_bytes(1024);

    let mut index = OffsetIndex::open(&path, &config).unwrap();
    index.write(0, 0).unwrap();
    index.close().unwrap();

    let mut index = OffsetIndex::open(&path, &config).unwrap();
    assert!(matches!(index.write(0, 50), Err(LogError::OutOfOrder { .. })));
    index.write(1, 50).unwrap();
    index.close().unwrap();

    let bytes = fs::read(&path).unwrap();
    let mut expected = IndexEntry::new(0, 0).encode().to_vec();
    expected.extend_from_slice(&IndexEntry::new(1, 50).encode());
    assert_eq!(bytes, expected);
}

#[test]
fn test_on_disk_entry_layout() {
    let (_temp, path) = setup_temp_index();
    let mut index = OffsetIndex::open(&path, &config_with_index_bytes(1024)).unwrap();
    index.write(0, 0x0102_0304_0506_0708).unwrap();
    index.close().unwrap();

    assert_eq!(
        fs::read(&path).unwrap(),
        vec![0, 0, 0, 0, 1, 2, 3, 4, 5, 6, 7, 8]
    );
}

// =============================================================================
// Rebuild Tests
// =============================================================================

#[test]
fn test_rebuild_replaces_existing_content() {
    let (_temp, path) = setup_temp_index();
    let config = config_with_index_bytes(1024);

    // Simulate a padded index left by a crash
    let mut file = OpenOptions::new().create(true).write(true).open(&path).unwrap();
    file.write_all(&[0xFF; 1024]).unwrap();
    drop(file);

    let index = OffsetIndex::rebuild(&path, &config, &[0, 19, 40]).unwrap();
    assert_eq!(index.entry_count(), 3);
    assert_eq!(index.read(0).unwrap(), IndexEntry::new(0, 0));
    assert_eq!(index.read(1).unwrap(), IndexEntry::new(1, 19));
    assert_eq!(index.read(LAST_ENTRY).unwrap(), IndexEntry::new(2, 40));

    index.close().unwrap();
    assert_eq!(fs::metadata(&path).unwrap().len(), 3 * ENTRY_WIDTH);
}

#[test]
fn test_rebuild_over_capacity_rejected() {
    let (_temp, path) = setup_temp_index();
    let config = config_with_index_bytes(2 * ENTRY_WIDTH);

    let result = OffsetIndex::rebuild(&path, &config, &[0, 10, 20]);
    assert!(matches!(result, Err(LogError::IndexFull { .. })));
}
