//! Offset Index Module
//!
//! Fixed-width, memory-mapped map from relative offset to store position.
//!
//! ## Responsibilities
//! - O(1) lookup of a record's byte position by relative offset
//! - Pre-allocate the file to its capacity, map it once, never remap
//! - Track the used length separately from the allocated length
//! - Truncate to the used length on close so a reopen sees only real entries
//!
//! ## File Format
//! ```text
//! ┌───────────────────────────────────────────────┐
//! │ Entry 0   ┌──────────────┬──────────────────┐ │
//! │           │ Offset (4)   │ Position (8)     │ │
//! │           └──────────────┴──────────────────┘ │
//! ├───────────────────────────────────────────────┤
//! │ Entry 1   ┌──────────────┬──────────────────┐ │
//! │           │ Offset (4)   │ Position (8)     │ │
//! │           └──────────────┴──────────────────┘ │
//! ├───────────────────────────────────────────────┤
//! │ ... zero-filled up to max_index_bytes while   │
//! │     open, truncated away on close             │
//! └───────────────────────────────────────────────┘
//! ```
//! Both fields are big-endian. Entry `i` always holds relative offset `i`.

mod entry;
mod offset_index;

pub use entry::IndexEntry;
pub use offset_index::OffsetIndex;

/// Width of the relative offset field (u32)
pub const OFF_WIDTH: u64 = 4;

/// Width of the store position field (u64)
pub const POS_WIDTH: u64 = 8;

/// Width of one index entry: offset (4) + position (8) = 12 bytes
pub const ENTRY_WIDTH: u64 = OFF_WIDTH + POS_WIDTH;

/// Relative offset accepted by `OffsetIndex::read` meaning "most recent entry"
pub const LAST_ENTRY: i64 = -1;
