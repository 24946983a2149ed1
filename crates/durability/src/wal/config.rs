//! WAL configuration.
//!
//! This module provides configuration for the segmented WAL.

use crate::format::{HEADER_LENGTH, PREFIX_LEN};
use segwal_core::ByteOrder;

/// WAL configuration parameters.
#[derive(Debug, Clone)]
pub struct WalConfig {
    /// Live records per segment before rolling to a new one (default: 10 000).
    pub max_items_per_segment: usize,

    /// Maximum segment size in bytes (default: 64MB).
    ///
    /// A write that would push a non-empty segment past this size goes to a
    /// new segment instead. A single oversized write still gets a segment.
    pub segment_size: u64,

    /// Byte order for every integer field on disk (default: big-endian).
    pub byte_order: ByteOrder,

    /// Threads used to open and index segments at startup (default: 4).
    pub bootstrap_workers: usize,
}

impl Default for WalConfig {
    fn default() -> Self {
        WalConfig {
            max_items_per_segment: 10_000,
            segment_size: 64 * 1024 * 1024, // 64MB
            byte_order: ByteOrder::Big,
            bootstrap_workers: 4,
        }
    }
}

impl WalConfig {
    /// Create a new WAL configuration with default values.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the roll threshold on live record count (builder pattern).
    pub fn with_max_items_per_segment(mut self, items: usize) -> Self {
        self.max_items_per_segment = items;
        self
    }

    /// Set the roll threshold on segment size (builder pattern).
    pub fn with_segment_size(mut self, size: u64) -> Self {
        self.segment_size = size;
        self
    }

    /// Set the on-disk byte order (builder pattern).
    pub fn with_byte_order(mut self, byte_order: ByteOrder) -> Self {
        self.byte_order = byte_order;
        self
    }

    /// Set the number of bootstrap threads (builder pattern).
    pub fn with_bootstrap_workers(mut self, workers: usize) -> Self {
        self.bootstrap_workers = workers;
        self
    }

    /// Validate configuration.
    pub fn validate(&self) -> Result<(), WalConfigError> {
        if self.max_items_per_segment == 0 {
            return Err(WalConfigError::MaxItemsZero);
        }
        if self.segment_size < HEADER_LENGTH + PREFIX_LEN as u64 {
            return Err(WalConfigError::SegmentSizeTooSmall);
        }
        if self.bootstrap_workers == 0 {
            return Err(WalConfigError::NoBootstrapWorkers);
        }
        Ok(())
    }

    /// Create a configuration optimized for testing (small segments).
    pub fn for_testing() -> Self {
        WalConfig {
            max_items_per_segment: 8,
            segment_size: 64 * 1024, // 64KB
            byte_order: ByteOrder::Big,
            bootstrap_workers: 2,
        }
    }
}

/// WAL configuration errors.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum WalConfigError {
    /// Roll threshold of zero items.
    #[error("max_items_per_segment must be at least 1")]
    MaxItemsZero,

    /// Segment cannot hold its header plus one record prefix.
    #[error("Segment size must cover the header region and one record prefix")]
    SegmentSizeTooSmall,

    /// Bootstrap needs at least one worker.
    #[error("bootstrap_workers must be at least 1")]
    NoBootstrapWorkers,
}

impl From<WalConfigError> for segwal_core::Error {
    fn from(e: WalConfigError) -> Self {
        segwal_core::Error::InvalidConfig(e.to_string())
    }
}
