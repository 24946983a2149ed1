//! Error types for segwal
//!
//! This module defines the error type shared by every engine operation.
//! We use `thiserror` for automatic `Display` and `Error` trait implementations.
//!
//! Absence is not an error: reads of unknown indices return `Ok(None)`.

use crate::types::LogIndex;
use std::io;
use thiserror::Error;

/// Result type alias for segwal operations
pub type Result<T> = std::result::Result<T, Error>;

/// Error types for the WAL engine
#[derive(Debug, Error)]
pub enum Error {
    /// I/O error (open, seek, read, write, fsync, remove)
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// On-disk bytes do not describe a valid segment
    #[error("Data corruption: {0}")]
    Corruption(String),

    /// Serialized truncate-area list does not fit in the header region
    #[error("Header overflow: {needed} bytes needed, {capacity} available")]
    HeaderOverflow {
        /// Bytes the serialized header would occupy
        needed: usize,
        /// Bytes available in the header region
        capacity: usize,
    },

    /// Serialization/deserialization error
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Write with an index that does not follow the current last index
    #[error("Index {index} is not greater than last index {last}")]
    IndexOutOfOrder {
        /// Index supplied by the caller
        index: LogIndex,
        /// Highest index already in the log (or earlier in the batch)
        last: LogIndex,
    },

    /// Rejected configuration
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
}

impl Error {
    /// Build a corruption error from anything printable.
    pub fn corruption(msg: impl Into<String>) -> Self {
        Error::Corruption(msg.into())
    }

    /// Returns true for errors caused by unreadable on-disk state.
    pub fn is_corruption(&self) -> bool {
        matches!(self, Error::Corruption(_))
    }
}
