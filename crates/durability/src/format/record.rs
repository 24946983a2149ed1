//! Record codec.
//!
//! # Record Layout
//!
//! ```text
//! ┌──────────────────┬──────────────────┬─────────────────────────┐
//! │ Length (8 bytes) │ Index (8 bytes)  │ Payload (Length bytes)  │
//! └──────────────────┴──────────────────┴─────────────────────────┘
//! ```
//!
//! Both prefix fields use the segment's configured [`ByteOrder`]. The index
//! is a signed logical index stored with its two's complement bit pattern.

use segwal_core::{ByteOrder, LogIndex, RECORD_PREFIX_SIZE};

/// Prefix size as a `usize` for buffer arithmetic.
pub const PREFIX_LEN: usize = RECORD_PREFIX_SIZE as usize;

/// Encode one record: `length ‖ index ‖ payload`.
pub fn encode(index: LogIndex, payload: &[u8], byte_order: ByteOrder) -> Vec<u8> {
    let mut buf = Vec::with_capacity(PREFIX_LEN + payload.len());
    encode_into(&mut buf, index, payload, byte_order);
    buf
}

/// Append one encoded record to `buf`.
///
/// Used by batch appends to build a single contiguous write.
pub fn encode_into(buf: &mut Vec<u8>, index: LogIndex, payload: &[u8], byte_order: ByteOrder) {
    let mut prefix = [0u8; PREFIX_LEN];
    byte_order.write_u64(&mut prefix[0..8], payload.len() as u64);
    byte_order.write_i64(&mut prefix[8..16], index);
    buf.extend_from_slice(&prefix);
    buf.extend_from_slice(payload);
}

/// Decode a record prefix into `(length, index)`.
pub fn decode_prefix(bytes: &[u8], byte_order: ByteOrder) -> Result<(u64, LogIndex), RecordError> {
    if bytes.len() < PREFIX_LEN {
        return Err(RecordError::InsufficientData {
            needed: PREFIX_LEN,
            actual: bytes.len(),
        });
    }

    let length = byte_order.read_u64(&bytes[0..8]);
    let index = byte_order.read_i64(&bytes[8..16]);
    Ok((length, index))
}

/// Record decoding errors.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RecordError {
    /// Not enough bytes to hold a record prefix
    #[error("Insufficient data to decode record prefix: need {needed}, have {actual}")]
    InsufficientData {
        /// Bytes required
        needed: usize,
        /// Bytes supplied
        actual: usize,
    },
}

impl From<RecordError> for segwal_core::Error {
    fn from(e: RecordError) -> Self {
        segwal_core::Error::Corruption(e.to_string())
    }
}
