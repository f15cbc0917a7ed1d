//! Record Store Module
//!
//! Append-only file of length-prefixed records with positional reads.
//!
//! ## Responsibilities
//! - Frame and append arbitrary binary payloads
//! - Return the byte position of each frame (the index's position value)
//! - Random-access reads by position, always seeing buffered appends
//! - Recompute its size from the file on reopen (no recovery log)
//!
//! ## File Format
//! ```text
//! ┌─────────────────────────────────────────┐
//! │ Frame 1                                 │
//! │ ┌──────────────────┬──────────────────┐ │
//! │ │ Len (8, BE u64)  │ Payload (Len)    │ │
//! │ └──────────────────┴──────────────────┘ │
//! ├─────────────────────────────────────────┤
//! │ Frame 2                                 │
//! │ ┌──────────────────┬──────────────────┐ │
//! │ │ Len (8, BE u64)  │ Payload (Len)    │ │
//! │ └──────────────────┴──────────────────┘ │
//! └─────────────────────────────────────────┘
//! ```
//! Frames are contiguous: no padding, no checksum.

mod record_store;

pub use record_store::RecordStore;

/// Width of the big-endian length prefix in front of every payload
pub const LEN_WIDTH: u64 = 8;

/// Result of walking a store's frames from the start of the file
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FrameScan {
    /// Starting byte position of every complete frame, in file order
    pub positions: Vec<u64>,

    /// Length of the prefix made only of complete frames
    pub valid_len: u64,

    /// Bytes after `valid_len` (a frame cut short by a crash)
    pub torn_bytes: u64,
}

impl FrameScan {
    /// Whether the file ends with an incomplete frame
    pub fn is_torn(&self) -> bool {
        self.torn_bytes > 0
    }
}
