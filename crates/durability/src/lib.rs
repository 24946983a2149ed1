//! Durability layer for segwal
//!
//! This crate handles everything that touches disk:
//!
//! - Format: record prefix codec and the segment header region
//! - Segment: one file, its record index, appends, reads, and truncation
//! - WAL: the directory of segments, roll policy, routing, ranged truncation
//! - Bootstrap: parallel open and index rebuild of existing segments

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod format; // Binary on-disk formats (record prefix, header region)
pub mod segment; // Single segment file engine
pub mod wal; // Segment directory manager

pub use format::{RecordError, SegmentHeader, TruncateArea, HEADER_CAPACITY, HEADER_LENGTH};
pub use segment::{Segment, TruncateOutcome};
pub use wal::{Wal, WalConfig, WalConfigError};
