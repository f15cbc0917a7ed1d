//! Index entry definitions
//!
//! Defines one fixed-width index entry and its byte encoding.

use crate::error::{LogError, Result};

use super::{ENTRY_WIDTH, OFF_WIDTH};

/// A single entry in the offset index
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IndexEntry {
    /// Offset relative to the segment's initial offset
    pub offset: u32,

    /// Byte position of the record's frame in the store
    pub position: u64,
}

impl IndexEntry {
    pub fn new(offset: u32, position: u64) -> Self {
        Self { offset, position }
    }

    /// Encode as `u32 BE offset || u64 BE position`
    pub fn encode(&self) -> [u8; ENTRY_WIDTH as usize] {
        let mut buf = [0u8; ENTRY_WIDTH as usize];
        buf[..OFF_WIDTH as usize].copy_from_slice(&self.offset.to_be_bytes());
        buf[OFF_WIDTH as usize..].copy_from_slice(&self.position.to_be_bytes());
        buf
    }

    /// Decode from exactly `ENTRY_WIDTH` bytes
    pub fn decode(bytes: &[u8]) -> Result<Self> {
        if bytes.len() != ENTRY_WIDTH as usize {
            return Err(LogError::Corruption(format!(
                "index entry must be {} bytes, got {}",
                ENTRY_WIDTH,
                bytes.len()
            )));
        }

        let (off, pos) = bytes.split_at(OFF_WIDTH as usize);
        let mut off_buf = [0u8; OFF_WIDTH as usize];
        let mut pos_buf = [0u8; ENTRY_WIDTH as usize - OFF_WIDTH as usize];
        off_buf.copy_from_slice(off);
        pos_buf.copy_from_slice(pos);

        Ok(Self {
            offset: u32::from_be_bytes(off_buf),
            position: u64::from_be_bytes(pos_buf),
        })
    }
}
