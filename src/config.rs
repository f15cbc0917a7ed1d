//! Configuration for logcore
//!
//! Centralized configuration with sensible defaults.

use std::path::PathBuf;

use crate::error::{LogError, Result};
use crate::index::ENTRY_WIDTH;

/// Main configuration for a logcore instance
#[derive(Debug, Clone)]
pub struct Config {
    // -------------------------------------------------------------------------
    // Storage Configuration
    // -------------------------------------------------------------------------
    /// Directory holding the segment files
    /// Internal structure:
    ///   {data_dir}/
    ///     ├── 00000000000000000000.store   (length-prefixed records)
    ///     └── 00000000000000000000.index   (offset → position entries)
    pub data_dir: PathBuf,

    // -------------------------------------------------------------------------
    // Segment Configuration
    // -------------------------------------------------------------------------
    pub segment: SegmentConfig,
}

/// Sizing for one (store, index) pair, supplied once at construction
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SegmentConfig {
    /// Advisory store size; consulted by rollover logic, never enforced by the store
    pub max_store_bytes: u64,

    /// Size the index file is pre-allocated and mapped at
    pub max_index_bytes: u64,

    /// First absolute offset of the segment (absolute = initial + relative)
    pub initial_offset: u64,
}

impl Default for SegmentConfig {
    fn default() -> Self {
        Self {
            max_store_bytes: 64 * 1024 * 1024, // 64 MB
            max_index_bytes: 10 * 1024 * 1024, // 10 MB
            initial_offset: 0,
        }
    }
}

impl SegmentConfig {
    /// Number of whole index entries that fit in `max_index_bytes`
    pub fn index_capacity(&self) -> u64 {
        self.max_index_bytes / ENTRY_WIDTH
    }

    /// Reject sizes the store and index cannot work with
    pub fn validate(&self) -> Result<()> {
        if self.max_index_bytes < ENTRY_WIDTH {
            return Err(LogError::Config(format!(
                "max_index_bytes must hold at least one {}-byte entry, got {}",
                ENTRY_WIDTH, self.max_index_bytes
            )));
        }
        if self.max_store_bytes == 0 {
            return Err(LogError::Config(
                "max_store_bytes must be greater than zero".to_string(),
            ));
        }
        Ok(())
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from("./logcore_data"),
            segment: SegmentConfig::default(),
        }
    }
}

impl Config {
    /// Create a new config builder
    pub fn builder() -> ConfigBuilder {
        ConfigBuilder::default()
    }

    pub fn validate(&self) -> Result<()> {
        self.segment.validate()
    }
}

/// Builder for Config
#[derive(Default)]
pub struct ConfigBuilder {
    config: Config,
}

impl ConfigBuilder {
    /// Set the data directory (root for all segment files)
    pub fn data_dir(mut self, path: impl Into<PathBuf>) -> Self {
        self.config.data_dir = path.into();
        self
    }

    /// Set the advisory maximum store size (in bytes)
    pub fn max_store_bytes(mut self, bytes: u64) -> Self {
        self.config.segment.max_store_bytes = bytes;
        self
    }

    /// Set the index pre-allocation size (in bytes)
    pub fn max_index_bytes(mut self, bytes: u64) -> Self {
        self.config.segment.max_index_bytes = bytes;
        self
    }

    /// Set the first absolute offset of the segment
    pub fn initial_offset(mut self, offset: u64) -> Self {
        self.config.segment.initial_offset = offset;
        self
    }

    /// Build and validate the config
    pub fn build(self) -> Result<Config> {
        self.config.validate()?;
        Ok(self.config)
    }
}
