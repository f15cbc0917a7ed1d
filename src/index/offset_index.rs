//! Offset Index implementation
//!
//! Writes go straight into a mutable mapping of the pre-sized file.

use std::fs::{File, OpenOptions};
use std::path::{Path, PathBuf};

use memmap2::MmapMut;

use crate::config::SegmentConfig;
use crate::error::{LogError, Result};

use super::{IndexEntry, ENTRY_WIDTH, LAST_ENTRY};

/// Memory-mapped index of `(relative offset, position)` entries
///
/// ## Concurrency:
/// - No internal lock. `write` takes `&mut self` and `read` takes `&self`,
///   so the borrow checker serializes writers and lets readers share
/// - The mapping is owned by this index and dropped before the file is
///   truncated or closed
pub struct OffsetIndex {
    /// Backing file path
    path: PathBuf,

    /// Backing file, sized to capacity while open
    file: File,

    /// Mapping of the whole allocated file
    mmap: MmapMut,

    /// Bytes actually used by entries (always a multiple of ENTRY_WIDTH)
    size: u64,
}

impl OffsetIndex {
    /// Open or create an index file
    ///
    /// On open:
    /// 1. Record the existing length as the used size (0 for a new file)
    /// 2. Grow the file to `max_index_bytes` without writing to it
    /// 3. Map the full allocated length once
    pub fn open(path: &Path, config: &SegmentConfig) -> Result<Self> {
        config.validate()?;

        let file = OpenOptions::new()
            .create(true)
            .read(true)
            .write(true)
            .open(path)?;

        let existing = file.metadata()?.len();
        let capacity = config.max_index_bytes;

        if existing > capacity {
            return Err(LogError::Config(format!(
                "index {} holds {} bytes, more than max_index_bytes {}",
                path.display(),
                existing,
                capacity
            )));
        }

        // A partial trailing entry is not an entry
        let size = existing - existing % ENTRY_WIDTH;
        if ends_in_partial_entry(existing, capacity) {
            tracing::warn!(
                path = %path.display(),
                existing,
                kept = size,
                "index ends with a partial entry, ignoring it"
            );
        }

        file.set_len(capacity)?;

        // SAFETY: the file is exclusively owned by this index, was just sized
        // to `capacity`, and is never resized while the mapping is alive
        // (`close` drops the mapping before truncating).
        let mmap = unsafe { MmapMut::map_mut(&file)? };

        tracing::debug!(
            path = %path.display(),
            entries = size / ENTRY_WIDTH,
            capacity,
            "opened offset index"
        );

        Ok(Self {
            path: path.to_path_buf(),
            file,
            mmap,
            size,
        })
    }

    /// Recreate the index file from store frame positions
    ///
    /// Entry `i` gets relative offset `i` and `positions[i]`. Any previous
    /// content of the file is discarded.
    pub fn rebuild(path: &Path, config: &SegmentConfig, positions: &[u64]) -> Result<Self> {
        let capacity = config.index_capacity();
        if positions.len() as u64 > capacity {
            return Err(LogError::IndexFull {
                capacity: config.max_index_bytes,
            });
        }

        OpenOptions::new()
            .create(true)
            .write(true)
            .truncate(true)
            .open(path)?;

        let mut index = Self::open(path, config)?;
        for (i, &position) in positions.iter().enumerate() {
            let offset = u32::try_from(i).map_err(|_| {
                LogError::Corruption(format!("relative offset {} does not fit in u32", i))
            })?;
            index.write(offset, position)?;
        }

        tracing::warn!(
            path = %path.display(),
            entries = positions.len(),
            "rebuilt offset index"
        );
        Ok(index)
    }

    /// Append an entry at the next free slot
    ///
    /// Fails with `IndexFull` when one more entry would pass the mapped
    /// length, and with `OutOfOrder` when `offset` is not the entry count.
    pub fn write(&mut self, offset: u32, position: u64) -> Result<()> {
        let capacity = self.capacity();
        if self.size + ENTRY_WIDTH > capacity {
            return Err(LogError::IndexFull { capacity });
        }

        let expected = self.entry_count();
        if u64::from(offset) != expected {
            return Err(LogError::OutOfOrder {
                expected,
                got: offset,
            });
        }

        let start = self.size as usize;
        let end = start + ENTRY_WIDTH as usize;
        self.mmap[start..end].copy_from_slice(&IndexEntry::new(offset, position).encode());
        self.size += ENTRY_WIDTH;

        Ok(())
    }

    /// Read the entry for a relative offset
    ///
    /// `LAST_ENTRY` (-1) resolves to the most recent entry. Anything at or
    /// past the entry count, or any other negative value, is `EndOfData`.
    pub fn read(&self, relative: i64) -> Result<IndexEntry> {
        let count = self.entry_count();
        if count == 0 {
            return Err(LogError::EndOfData);
        }

        let slot = match relative {
            LAST_ENTRY => count - 1,
            r if r < 0 => return Err(LogError::EndOfData),
            r => r as u64,
        };
        if slot >= count {
            return Err(LogError::EndOfData);
        }

        let start = (slot * ENTRY_WIDTH) as usize;
        IndexEntry::decode(&self.mmap[start..start + ENTRY_WIDTH as usize])
    }

    /// Most recent entry
    pub fn last(&self) -> Result<IndexEntry> {
        self.read(LAST_ENTRY)
    }

    /// Number of valid entries
    pub fn entry_count(&self) -> u64 {
        self.size / ENTRY_WIDTH
    }

    /// Bytes used by valid entries
    pub fn size(&self) -> u64 {
        self.size
    }

    /// Allocated (mapped) length in bytes
    pub fn capacity(&self) -> u64 {
        self.mmap.len() as u64
    }

    /// Whether another entry would exceed the capacity
    pub fn is_full(&self) -> bool {
        self.size + ENTRY_WIDTH > self.capacity()
    }

    /// Path of the backing file
    pub fn name(&self) -> &Path {
        &self.path
    }

    /// Flush, unmap and truncate the file to the used length
    ///
    /// Skipping this leaves a zero-filled tail that a reopen would take for
    /// entries.
    pub fn close(self) -> Result<()> {
        let Self {
            path,
            file,
            mmap,
            size,
        } = self;

        mmap.flush()?;
        drop(mmap);

        file.sync_all()?;
        file.set_len(size)?;
        file.sync_all()?;

        tracing::debug!(
            path = %path.display(),
            entries = size / ENTRY_WIDTH,
            "closed offset index"
        );
        Ok(())
    }
}

/// True when the file ends mid-entry because of a torn write.
/// A file still at full capacity ends in pre-allocation padding instead.
fn ends_in_partial_entry(existing: u64, capacity: u64) -> bool {
    existing % ENTRY_WIDTH != 0 && existing < capacity
}
