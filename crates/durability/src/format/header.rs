//! Segment header region and truncate areas.
//!
//! Every segment file reserves a fixed region at offset 0:
//!
//! ```text
//! ┌──────────────────┬──────────────────────────────┬──────────────┐
//! │ Length (8 bytes) │ Truncate-area list (JSON)    │ Zero padding │
//! └──────────────────┴──────────────────────────────┴──────────────┘
//! 0                  8                      8 + Length      HEADER_LENGTH
//! ```
//!
//! The list is a JSON array of `{"start": u64, "end": u64}` objects. Each
//! entry is a half-open byte range `[start, end)` whose records are
//! logically deleted and skipped when the segment index is rebuilt.
//!
//! A length of zero (an all-zero region) decodes as an empty list.

use segwal_core::{ByteOrder, Error, Result};
use serde::{Deserialize, Serialize};

/// Size of the reserved header region at the start of every segment file.
pub const HEADER_LENGTH: u64 = 1024;

/// Size of the length prefix inside the header region.
const LENGTH_FIELD: usize = 8;

/// Bytes available for the serialized truncate-area list.
pub const HEADER_CAPACITY: usize = HEADER_LENGTH as usize - LENGTH_FIELD;

/// A logically deleted byte range `[start, end)` within a segment file.
///
/// Offsets are file positions and never negative, so they are stored as
/// `u64`; a negative offset in the header JSON is rejected as corruption.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TruncateArea {
    /// First deleted byte
    pub start: u64,
    /// One past the last deleted byte
    pub end: u64,
}

impl TruncateArea {
    /// Create a new area.
    pub fn new(start: u64, end: u64) -> Self {
        TruncateArea { start, end }
    }

    /// Returns true if `pos` lies inside the area.
    pub fn contains(&self, pos: u64) -> bool {
        self.start <= pos && pos < self.end
    }

    /// Returns true if the area covers no bytes.
    pub fn is_empty(&self) -> bool {
        self.end <= self.start
    }
}

/// In-memory form of a segment's header region.
///
/// Areas are kept sorted by `start` and never overlap or touch.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SegmentHeader {
    areas: Vec<TruncateArea>,
}

impl SegmentHeader {
    /// Create a header with no truncate areas.
    pub fn new() -> Self {
        Self::default()
    }

    /// Truncate areas, sorted by start offset.
    pub fn areas(&self) -> &[TruncateArea] {
        &self.areas
    }

    /// Returns true if the record whose prefix starts at `offset` has been
    /// logically deleted.
    pub fn is_truncated(&self, offset: u64) -> bool {
        // Areas are sorted and disjoint: only the last area starting at or
        // before `offset` can contain it.
        let idx = self.areas.partition_point(|a| a.start <= offset);
        idx > 0 && self.areas[idx - 1].contains(offset)
    }

    /// Record a new deleted range, merging it with overlapping or adjacent areas.
    pub fn add(&mut self, area: TruncateArea) {
        if area.is_empty() {
            return;
        }

        self.areas.push(area);
        self.areas.sort_by_key(|a| a.start);

        let mut merged: Vec<TruncateArea> = Vec::with_capacity(self.areas.len());
        for a in self.areas.drain(..) {
            match merged.last_mut() {
                Some(last) if a.start <= last.end => last.end = last.end.max(a.end),
                _ => merged.push(a),
            }
        }
        self.areas = merged;
    }

    /// Drop every byte at or beyond `cut` from the area list.
    ///
    /// Called after the file is physically shortened to `cut`, so that
    /// records appended later are never hidden by a stale area.
    /// Returns true if the list changed.
    pub fn clip(&mut self, cut: u64) -> bool {
        let before = self.areas.len();
        let mut changed = false;

        self.areas.retain(|a| a.start < cut);
        for a in &mut self.areas {
            if a.end > cut {
                a.end = cut;
                changed = true;
            }
        }

        changed || self.areas.len() != before
    }

    /// Serialize to a full `HEADER_LENGTH` region.
    pub fn to_bytes(&self, byte_order: ByteOrder) -> Result<Vec<u8>> {
        let json =
            serde_json::to_vec(&self.areas).map_err(|e| Error::Serialization(e.to_string()))?;

        if json.len() > HEADER_CAPACITY {
            return Err(Error::HeaderOverflow {
                needed: json.len(),
                capacity: HEADER_CAPACITY,
            });
        }

        let mut region = vec![0u8; HEADER_LENGTH as usize];
        byte_order.write_u64(&mut region[..LENGTH_FIELD], json.len() as u64);
        region[LENGTH_FIELD..LENGTH_FIELD + json.len()].copy_from_slice(&json);
        Ok(region)
    }

    /// Deserialize from a header region.
    pub fn from_bytes(region: &[u8], byte_order: ByteOrder) -> Result<Self> {
        if region.len() < HEADER_LENGTH as usize {
            return Err(Error::corruption(format!(
                "header region too short: {} of {} bytes",
                region.len(),
                HEADER_LENGTH
            )));
        }

        let length = byte_order.read_u64(&region[..LENGTH_FIELD]);
        if length == 0 {
            return Ok(Self::new());
        }
        if length > HEADER_CAPACITY as u64 {
            return Err(Error::corruption(format!(
                "header length {} exceeds capacity {}",
                length, HEADER_CAPACITY
            )));
        }

        let json = &region[LENGTH_FIELD..LENGTH_FIELD + length as usize];
        let areas: Vec<TruncateArea> = serde_json::from_slice(json)
            .map_err(|e| Error::corruption(format!("malformed truncate-area list: {}", e)))?;

        let mut header = Self::new();
        for area in areas {
            if area.start > area.end {
                return Err(Error::corruption(format!(
                    "inverted truncate area [{}, {})",
                    area.start, area.end
                )));
            }
            header.add(area);
        }
        Ok(header)
    }
}
