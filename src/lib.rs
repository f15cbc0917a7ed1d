//! # logcore
//!
//! Storage core of an append-only commit log:
//! - Record store of length-prefixed frames with positional reads
//! - Memory-mapped offset index for O(1) offset → position lookup
//! - Stateless recovery: sizes recomputed from disk on reopen
//! - Segments pairing one store with one index
//!
//! ## Architecture Overview
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                 Log layer (external)                         │
//! │        rolling, retention, produce / consume API            │
//! └─────────────────────┬───────────────────────────────────────┘
//!                       │ absolute offset
//! ┌─────────────────────▼───────────────────────────────────────┐
//! │                      Segment                                 │
//! │          absolute = initial_offset + relative               │
//! └─────────────────────┬───────────────────────────────────────┘
//!                       │
//!          ┌────────────┴────────────┐
//!          │ 1. append               │ 2. write (rel, pos)
//!          ▼                         ▼
//!   ┌─────────────┐          ┌─────────────┐
//!   │ RecordStore │◄─────────│ OffsetIndex │
//!   │   (Mutex)   │ position │   (mmap)    │
//!   └─────────────┘          └─────────────┘
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod error;
pub mod config;

pub mod store;
pub mod index;
pub mod segment;

// =============================================================================
// Public API Re-exports
// =============================================================================

pub use error::{LogError, Result};
pub use config::{Config, SegmentConfig};
pub use store::RecordStore;
pub use index::{IndexEntry, OffsetIndex};
pub use segment::Segment;

// =============================================================================
// Version Info
// =============================================================================

/// Current version of logcore
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
