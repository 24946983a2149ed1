//! On-disk byte formats for segment files.
//!
//! # Module Structure
//!
//! - `record`: record prefix codec (`length ‖ index ‖ payload`)
//! - `header`: fixed header region holding the truncate-area list

pub mod header;
pub mod record;

pub use header::{SegmentHeader, TruncateArea, HEADER_CAPACITY, HEADER_LENGTH};
pub use record::{decode_prefix, encode, encode_into, RecordError, PREFIX_LEN};
