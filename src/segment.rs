//! Segment Module
//!
//! One record store and one offset index covering a contiguous offset range.
//!
//! ## Responsibilities
//! - Translate absolute offsets to relative ones (absolute = base + relative)
//! - Keep the write order: store append first, then index write
//! - Map index "end of data" to a per-offset "not found"
//! - Detect an index left padded by an unclean shutdown and rebuild it
//!   from the store's self-describing frames
//!
//! Rolling to a new segment, retention and multi-segment reads belong to
//! the log layer above this one.

use std::collections::BTreeSet;
use std::fs;
use std::path::{Path, PathBuf};

use crate::config::SegmentConfig;
use crate::error::{LogError, Result};
use crate::index::OffsetIndex;
use crate::store::{RecordStore, LEN_WIDTH};

/// File extension of a segment's record store
pub const STORE_EXTENSION: &str = "store";

/// File extension of a segment's offset index
pub const INDEX_EXTENSION: &str = "index";

/// A (store, index) pair
///
/// ## Concurrency:
/// - `append` takes `&mut self` (the index has no lock of its own)
/// - `read` takes `&self`; the store serializes its own file access
pub struct Segment {
    /// Length-prefixed records
    store: RecordStore,

    /// Relative offset → store position
    index: OffsetIndex,

    /// Sizing this segment was opened with
    config: SegmentConfig,

    /// First absolute offset held by this segment
    base_offset: u64,

    /// Absolute offset the next append will get
    next_offset: u64,
}

impl Segment {
    /// Open or create the segment whose base is `config.initial_offset`
    ///
    /// On open:
    /// 1. Open the store (size recomputed from disk)
    /// 2. Open the index (used length recomputed from disk)
    /// 3. If the index does not describe the store exactly, rebuild it
    /// 4. Next offset = base + entry count
    pub fn open(dir: &Path, config: &SegmentConfig) -> Result<Self> {
        config.validate()?;
        fs::create_dir_all(dir)?;

        let base_offset = config.initial_offset;
        let store = RecordStore::open(&segment_path(dir, base_offset, STORE_EXTENSION))?;

        let index_path = segment_path(dir, base_offset, INDEX_EXTENSION);
        let mut index = OffsetIndex::open(&index_path, config)?;

        if !index_matches_store(&index, &store)? {
            tracing::warn!(
                base_offset,
                index_entries = index.entry_count(),
                store_size = store.size(),
                "index does not match store, rebuilding"
            );
            drop(index);
            index = rebuild_index(&store, &index_path, config)?;
        }

        let next_offset = base_offset + index.entry_count();
        tracing::debug!(base_offset, next_offset, "opened segment");

        Ok(Self {
            store,
            index,
            config: *config,
            base_offset,
            next_offset,
        })
    }

    /// Append a record and return its absolute offset
    pub fn append(&mut self, payload: &[u8]) -> Result<u64> {
        let offset = self.next_offset;

        // Refuse before touching the store so no frame is left without an entry
        if self.index.is_full() {
            return Err(LogError::IndexFull {
                capacity: self.index.capacity(),
            });
        }
        let relative = u32::try_from(offset - self.base_offset).map_err(|_| LogError::IndexFull {
            capacity: self.index.capacity(),
        })?;

        // Step 1: store
        let (_, position) = self.store.append(payload)?;

        // Step 2: index
        self.index.write(relative, position)?;

        self.next_offset += 1;
        Ok(offset)
    }

    /// Read the record stored at an absolute offset
    ///
    /// Returns `OffsetNotFound` when the offset is outside this segment.
    pub fn read(&self, offset: u64) -> Result<Vec<u8>> {
        let relative = offset
            .checked_sub(self.base_offset)
            .filter(|r| *r <= u64::from(u32::MAX))
            .ok_or(LogError::OffsetNotFound(offset))?;

        let entry = self.index.read(relative as i64).map_err(|e| match e {
            LogError::EndOfData => LogError::OffsetNotFound(offset),
            other => other,
        })?;

        self.store.read(entry.position)
    }

    /// Whether the log layer should roll to a new segment
    ///
    /// True once the store reaches `max_store_bytes` or the index has no
    /// room for another entry.
    pub fn is_maxed(&self) -> bool {
        self.store.size() >= self.config.max_store_bytes || self.index.is_full()
    }

    /// Rebuild the index from the store, dropping a torn trailing frame
    ///
    /// Returns the number of entries in the rebuilt index.
    pub fn rebuild(self) -> Result<(Self, u64)> {
        let Self {
            store,
            index,
            config,
            base_offset,
            ..
        } = self;

        let index_path = index.name().to_path_buf();
        drop(index);
        let index = rebuild_index(&store, &index_path, &config)?;

        let entries = index.entry_count();
        let segment = Self {
            store,
            index,
            config,
            base_offset,
            next_offset: base_offset + entries,
        };
        Ok((segment, entries))
    }

    pub fn base_offset(&self) -> u64 {
        self.base_offset
    }

    pub fn next_offset(&self) -> u64 {
        self.next_offset
    }

    pub fn store(&self) -> &RecordStore {
        &self.store
    }

    pub fn index(&self) -> &OffsetIndex {
        &self.index
    }

    pub fn config(&self) -> &SegmentConfig {
        &self.config
    }

    /// Close the index (truncating it) and the store (flushing it)
    pub fn close(self) -> Result<()> {
        self.index.close()?;
        self.store.close()?;
        tracing::debug!(base_offset = self.base_offset, "closed segment");
        Ok(())
    }

    /// Close the segment and delete both of its files
    pub fn remove(self) -> Result<()> {
        let index_path = self.index.name().to_path_buf();
        let store_path = self.store.name().to_path_buf();

        self.close()?;
        fs::remove_file(&index_path)?;
        fs::remove_file(&store_path)?;
        Ok(())
    }
}

// =============================================================================
// File Naming
// =============================================================================

/// Path of a segment file: `{dir}/{base:020}.{extension}`
pub fn segment_path(dir: &Path, base_offset: u64, extension: &str) -> PathBuf {
    dir.join(format!("{:020}.{}", base_offset, extension))
}

/// Parse a segment's base offset from its file name
/// "00000000000000000042.store" → Some(42)
pub fn base_offset_from_path(path: &Path) -> Option<u64> {
    let extension = path.extension()?.to_str()?;
    if extension != STORE_EXTENSION && extension != INDEX_EXTENSION {
        return None;
    }
    path.file_stem()?.to_str()?.parse().ok()
}

/// Base offsets of every segment file in `dir`, ascending
pub fn list_base_offsets(dir: &Path) -> Result<Vec<u64>> {
    let mut bases = BTreeSet::new();
    for entry in fs::read_dir(dir)? {
        let path = entry?.path();
        if path.is_file() {
            if let Some(base) = base_offset_from_path(&path) {
                bases.insert(base);
            }
        }
    }
    Ok(bases.into_iter().collect())
}

// =============================================================================
// Private Helpers
// =============================================================================

/// The index matches when its last entry is numbered `count - 1` and points
/// at a frame ending exactly at the end of the store.
fn index_matches_store(index: &OffsetIndex, store: &RecordStore) -> Result<bool> {
    let last = match index.last() {
        Ok(entry) => entry,
        Err(LogError::EndOfData) => return Ok(store.size() == 0),
        Err(e) => return Err(e),
    };

    if u64::from(last.offset) + 1 != index.entry_count() {
        return Ok(false);
    }

    let mut len_buf = [0u8; LEN_WIDTH as usize];
    match store.read_at(&mut len_buf, last.position) {
        Ok(_) => {}
        Err(LogError::StoreEof { .. }) => return Ok(false),
        Err(e) => return Err(e),
    }
    let frame_end = last
        .position
        .checked_add(LEN_WIDTH)
        .and_then(|start| start.checked_add(u64::from_be_bytes(len_buf)));

    Ok(frame_end == Some(store.size()))
}

fn rebuild_index(store: &RecordStore, index_path: &Path, config: &SegmentConfig) -> Result<OffsetIndex> {
    let scan = store.scan_frames()?;
    if scan.is_torn() {
        tracing::warn!(
            torn_bytes = scan.torn_bytes,
            valid_len = scan.valid_len,
            "dropping torn frame at end of store"
        );
        store.truncate(scan.valid_len)?;
    }
    OffsetIndex::rebuild(index_path, config, &scan.positions)
}
