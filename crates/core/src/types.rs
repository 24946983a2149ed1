//! Record location and on-disk byte order.

use byteorder::{BigEndian, ByteOrder as Endian, LittleEndian};
use serde::{Deserialize, Serialize};

/// Caller-assigned logical index of a record.
///
/// Strictly increasing within a segment, not required to be contiguous.
pub type LogIndex = i64;

/// Size of the record prefix: length (8 bytes) followed by index (8 bytes).
pub const RECORD_PREFIX_SIZE: u64 = 16;

/// Location of one logged item inside its segment file.
///
/// `pos` is the absolute offset of the first payload byte; the record's
/// prefix starts `RECORD_PREFIX_SIZE` bytes earlier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Record {
    /// Logical index
    pub index: LogIndex,
    /// Payload length in bytes
    pub length: u64,
    /// Offset of the payload's first byte within the segment file
    pub pos: u64,
}

impl Record {
    /// Create a record location.
    pub fn new(index: LogIndex, length: u64, pos: u64) -> Self {
        Record { index, length, pos }
    }

    /// Offset of the record's prefix (where the record starts on disk).
    pub fn offset(&self) -> u64 {
        self.pos - RECORD_PREFIX_SIZE
    }

    /// Offset one past the record's last payload byte.
    pub fn end(&self) -> u64 {
        self.pos + self.length
    }
}

/// Byte order of every integer field in a segment file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum ByteOrder {
    /// Most significant byte first (the engine default)
    #[default]
    Big,
    /// Least significant byte first
    Little,
}

impl ByteOrder {
    /// Write `value` into the first 8 bytes of `buf`.
    ///
    /// Panics if `buf` is shorter than 8 bytes.
    pub fn write_u64(self, buf: &mut [u8], value: u64) {
        match self {
            ByteOrder::Big => BigEndian::write_u64(buf, value),
            ByteOrder::Little => LittleEndian::write_u64(buf, value),
        }
    }

    /// Read a `u64` from the first 8 bytes of `buf`.
    ///
    /// Panics if `buf` is shorter than 8 bytes.
    pub fn read_u64(self, buf: &[u8]) -> u64 {
        match self {
            ByteOrder::Big => BigEndian::read_u64(buf),
            ByteOrder::Little => LittleEndian::read_u64(buf),
        }
    }

    /// Write a signed value; the bit pattern is stored as-is.
    pub fn write_i64(self, buf: &mut [u8], value: i64) {
        match self {
            ByteOrder::Big => BigEndian::write_i64(buf, value),
            ByteOrder::Little => LittleEndian::write_i64(buf, value),
        }
    }

    /// Read a signed value.
    pub fn read_i64(self, buf: &[u8]) -> i64 {
        match self {
            ByteOrder::Big => BigEndian::read_i64(buf),
            ByteOrder::Little => LittleEndian::read_i64(buf),
        }
    }
}
