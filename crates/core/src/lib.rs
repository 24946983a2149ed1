//! Core types for segwal
//!
//! This crate defines the foundational types shared by the engine crates:
//! - Record: location of one logged item inside a segment file
//! - ByteOrder: byte order of every integer field written to disk
//! - LogIndex: the caller-assigned logical index used as the log's key
//! - Error: Error type hierarchy

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod error;
pub mod types;

pub use error::{Error, Result};
pub use types::{ByteOrder, LogIndex, Record, RECORD_PREFIX_SIZE};
