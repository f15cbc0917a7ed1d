//! Error types for logcore
//!
//! Provides a unified error type for the store, the index and segments.

use thiserror::Error;

/// Result type alias using LogError
pub type Result<T> = std::result::Result<T, LogError>;

/// Unified error type for logcore operations
#[derive(Debug, Error)]
pub enum LogError {
    // -------------------------------------------------------------------------
    // I/O Errors
    // -------------------------------------------------------------------------
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    // -------------------------------------------------------------------------
    // Index Errors
    // -------------------------------------------------------------------------
    /// Requested relative offset is past the last entry (or the index is empty)
    #[error("end of index data")]
    EndOfData,

    /// Appending one more entry would run past the mapped region
    #[error("index full: capacity of {capacity} bytes reached")]
    IndexFull { capacity: u64 },

    #[error("out of order index write: expected relative offset {expected}, got {got}")]
    OutOfOrder { expected: u64, got: u32 },

    // -------------------------------------------------------------------------
    // Store Errors
    // -------------------------------------------------------------------------
    /// A raw read would extend past the written size of the store
    #[error("read past end of store: position {position}, size {size}")]
    StoreEof { position: u64, size: u64 },

    /// A failed append could not be rolled back; the store takes no more appends
    #[error("store {0} refuses appends after an unrecoverable write failure")]
    StoreFailed(String),

    // -------------------------------------------------------------------------
    // Segment Errors
    // -------------------------------------------------------------------------
    #[error("offset out of range: {0}")]
    OffsetNotFound(u64),

    #[error("corruption detected: {0}")]
    Corruption(String),

    // -------------------------------------------------------------------------
    // Configuration Errors
    // -------------------------------------------------------------------------
    #[error("Configuration error: {0}")]
    Config(String),
}

impl LogError {
    /// True for the recoverable "nothing stored there" conditions.
    ///
    /// `StoreEof` is not one of them: it signals a malformed position.
    pub fn is_not_found(&self) -> bool {
        matches!(self, LogError::EndOfData | LogError::OffsetNotFound(_))
    }
}
