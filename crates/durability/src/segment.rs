//! Segment: one backing file plus its derived record index.
//!
//! # File Layout
//!
//! ```text
//! ┌────────────────────────────────────┐
//! │ Header region (HEADER_LENGTH)      │
//! ├────────────────────────────────────┤
//! │ Record 1                           │
//! ├────────────────────────────────────┤
//! │ Record 2                           │
//! ├────────────────────────────────────┤
//! │ ...                                │
//! └────────────────────────────────────┘
//! ```
//!
//! The in-memory index is always derived from the file: after any structural
//! change (tail cut, new truncate area) the segment rescans itself, so the
//! index and bounds only ever describe bytes that are on disk.
//!
//! # Truncation
//!
//! Removing a contiguous file tail is done physically with `set_len`.
//! Removing a range that still has live records after it is recorded as a
//! [`TruncateArea`] in the header instead, because shrinking the file would
//! move every later record.

use crate::format::{
    decode_prefix, encode, encode_into, SegmentHeader, TruncateArea, HEADER_LENGTH, PREFIX_LEN,
};
use rustc_hash::FxHashMap;
use segwal_core::{ByteOrder, Error, LogIndex, Record, Result, RECORD_PREFIX_SIZE};
use std::collections::BTreeMap;
use std::fs::{File, OpenOptions};
use std::io::{self, BufReader, Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// Result of a segment-local truncation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TruncateOutcome {
    /// The range does not overlap the segment
    NoOp,
    /// Records were removed and the index rebuilt; the segment may now be empty
    Removed,
    /// The segment is empty or fully covered; the caller must remove it
    Deleted,
}

/// A single segment file.
///
/// Records are appended at `write_cursor` and fsynced before an append
/// returns. Indices inside one segment increase with file position.
pub struct Segment {
    path: PathBuf,
    file: File,
    byte_order: ByteOrder,

    /// Offset where the next record prefix is written
    write_cursor: u64,

    /// The OS file cursor already sits at `write_cursor`
    positioned: bool,

    /// `(min_index, max_index)` of surviving records, `None` when empty
    bounds: Option<(LogIndex, LogIndex)>,

    /// Ordered index (supports predecessor/successor search)
    index: BTreeMap<LogIndex, Record>,

    /// Point lookup; always holds the same records as `index`
    lookup: FxHashMap<LogIndex, Record>,

    header: SegmentHeader,
}

impl Segment {
    /// Open a segment file, creating it if missing, and rebuild its index.
    ///
    /// A zero-length file gets a fresh header region.
    pub fn open(path: impl AsRef<Path>, byte_order: ByteOrder) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .open(&path)?;

        Self::from_file(path, file, byte_order)
    }

    /// Create a brand-new segment file. Fails if the file already exists.
    pub fn create(path: impl AsRef<Path>, byte_order: ByteOrder) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .create_new(true)
            .open(&path)?;

        debug!(target: "segwal::segment", path = %path.display(), "Created segment file");
        Self::from_file(path, file, byte_order)
    }

    fn from_file(path: PathBuf, file: File, byte_order: ByteOrder) -> Result<Self> {
        let mut segment = Segment {
            path,
            file,
            byte_order,
            write_cursor: HEADER_LENGTH,
            positioned: false,
            bounds: None,
            index: BTreeMap::new(),
            lookup: FxHashMap::default(),
            header: SegmentHeader::new(),
        };

        if segment.file.metadata()?.len() == 0 {
            segment.persist_header(&SegmentHeader::new())?;
        }

        segment.rebuild_index()?;
        Ok(segment)
    }

    /// Path of the backing file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Byte order used for every integer field in this file.
    pub fn byte_order(&self) -> ByteOrder {
        self.byte_order
    }

    /// Current logical size in bytes (offset of the next append).
    pub fn size(&self) -> u64 {
        self.write_cursor
    }

    /// Number of live records.
    pub fn len(&self) -> usize {
        self.index.len()
    }

    /// Returns true if no live records remain.
    pub fn is_empty(&self) -> bool {
        self.index.is_empty()
    }

    /// Smallest live index.
    pub fn min_index(&self) -> Option<LogIndex> {
        self.bounds.map(|(min, _)| min)
    }

    /// Largest live index.
    pub fn max_index(&self) -> Option<LogIndex> {
        self.bounds.map(|(_, max)| max)
    }

    /// `(min_index, max_index)` of live records.
    pub fn bounds(&self) -> Option<(LogIndex, LogIndex)> {
        self.bounds
    }

    /// Logically deleted byte ranges recorded in the header.
    pub fn truncate_areas(&self) -> &[TruncateArea] {
        self.header.areas()
    }

    /// Live indices in ascending order.
    pub fn indices(&self) -> impl Iterator<Item = LogIndex> + '_ {
        self.index.keys().copied()
    }

    /// Location of a live record.
    pub fn record(&self, index: LogIndex) -> Option<&Record> {
        self.lookup.get(&index)
    }

    /// Append one record and fsync.
    pub fn append(&mut self, index: LogIndex, payload: &[u8]) -> Result<Record> {
        let bytes = encode(index, payload, self.byte_order);
        self.write_at_cursor(&bytes)?;

        let record = Record::new(index, payload.len() as u64, self.write_cursor + RECORD_PREFIX_SIZE);
        self.write_cursor = record.end();
        self.track(record);
        Ok(record)
    }

    /// Append several records with a single write and a single fsync.
    ///
    /// The index is only updated after the fsync, so a failed batch leaves
    /// no partially visible records in memory. On disk, a crash mid-write
    /// leaves at most a prefix of the batch recoverable.
    pub fn append_batch<P: AsRef<[u8]>>(&mut self, entries: &[(LogIndex, P)]) -> Result<Vec<Record>> {
        let total: usize = entries
            .iter()
            .map(|(_, p)| PREFIX_LEN + p.as_ref().len())
            .sum();
        let mut buf = Vec::with_capacity(total);
        for (index, payload) in entries {
            encode_into(&mut buf, *index, payload.as_ref(), self.byte_order);
        }

        self.write_at_cursor(&buf)?;

        let mut records = Vec::with_capacity(entries.len());
        for (index, payload) in entries {
            let record = Record::new(
                *index,
                payload.as_ref().len() as u64,
                self.write_cursor + RECORD_PREFIX_SIZE,
            );
            self.write_cursor = record.end();
            self.track(record);
            records.push(record);
        }
        Ok(records)
    }

    /// Write `bytes` at the write cursor and fsync. Does not move the cursor.
    fn write_at_cursor(&mut self, bytes: &[u8]) -> Result<()> {
        if !self.positioned {
            self.file.seek(SeekFrom::Start(self.write_cursor))?;
        }

        let result = self
            .file
            .write_all(bytes)
            .and_then(|_| self.file.sync_all());

        match result {
            Ok(()) => {
                self.positioned = true;
                Ok(())
            }
            Err(e) => {
                if let Err(trim) = self.discard_unwritten() {
                    warn!(
                        target: "segwal::segment",
                        path = %self.path.display(),
                        write_cursor = self.write_cursor,
                        error = %trim,
                        "Failed to discard partial write"
                    );
                }
                Err(e.into())
            }
        }
    }

    /// Cut the file back to `write_cursor`, dropping bytes of a failed write.
    fn discard_unwritten(&mut self) -> io::Result<()> {
        self.positioned = false;
        self.file.set_len(self.write_cursor)?;
        self.file.sync_all()
    }

    fn track(&mut self, record: Record) {
        self.index.insert(record.index, record);
        self.lookup.insert(record.index, record);
        self.bounds = Some(match self.bounds {
            None => (record.index, record.index),
            Some((min, max)) => (min.min(record.index), max.max(record.index)),
        });
    }

    /// Read the payload stored under `index`.
    ///
    /// Returns `Ok(None)` for indices outside the live set.
    pub fn read(&mut self, index: LogIndex) -> Result<Option<Vec<u8>>> {
        match self.bounds {
            Some((min, max)) if index >= min && index <= max => {}
            _ => return Ok(None),
        }

        let Some(record) = self.lookup.get(&index).copied() else {
            return Ok(None);
        };

        self.positioned = false;
        self.file.seek(SeekFrom::Start(record.pos))?;

        let mut payload = vec![0u8; record.length as usize];
        self.file.read_exact(&mut payload).map_err(|e| {
            if e.kind() == io::ErrorKind::UnexpectedEof {
                Error::corruption(format!(
                    "short read for index {} at offset {} in {}",
                    index,
                    record.pos,
                    self.path.display()
                ))
            } else {
                Error::Io(e)
            }
        })?;

        Ok(Some(payload))
    }

    /// Rebuild the index by scanning the file.
    ///
    /// Reloads the header, then walks records from the end of the header
    /// region. A trailing fragment (short prefix or short payload) marks the
    /// end of the log: the scan stops there and the file is cut back to the
    /// last complete record. Records whose prefix offset falls inside a
    /// truncate area are skipped.
    pub fn rebuild_index(&mut self) -> Result<()> {
        self.header = self.load_header()?;
        self.positioned = false;

        let file_len = self.file.metadata()?.len();
        let mut reader = BufReader::new(&self.file);
        reader.seek(SeekFrom::Start(HEADER_LENGTH))?;

        let mut index = BTreeMap::new();
        let mut lookup = FxHashMap::default();
        let mut bounds: Option<(LogIndex, LogIndex)> = None;
        let mut cursor = HEADER_LENGTH;
        let mut skipped = 0usize;
        let mut prefix = [0u8; PREFIX_LEN];

        loop {
            if read_full(&mut reader, &mut prefix)? < PREFIX_LEN {
                break;
            }

            let (length, record_index) = decode_prefix(&prefix, self.byte_order)?;
            let pos = cursor + RECORD_PREFIX_SIZE;
            let end = match pos.checked_add(length) {
                Some(end) if end <= file_len => end,
                _ => break,
            };

            reader.seek_relative(length as i64)?;
            let offset = cursor;
            cursor = end;

            // Areas are tested by prefix offset so empty payloads are covered too.
            if self.header.is_truncated(offset) {
                skipped += 1;
                continue;
            }

            let record = Record::new(record_index, length, pos);
            index.insert(record_index, record);
            lookup.insert(record_index, record);
            bounds = Some(match bounds {
                None => (record_index, record_index),
                Some((min, max)) => (min.min(record_index), max.max(record_index)),
            });
        }
        drop(reader);

        if cursor < file_len {
            warn!(
                target: "segwal::segment",
                path = %self.path.display(),
                valid_end = cursor,
                file_len,
                "Dropping incomplete record at end of segment"
            );
            self.file.set_len(cursor)?;
            self.file.sync_all()?;
        }

        // A crash between a tail cut and its header update leaves areas past
        // the end of the log; appends would land inside them.
        let mut header = self.header.clone();
        if header.clip(cursor) {
            warn!(
                target: "segwal::segment",
                path = %self.path.display(),
                valid_end = cursor,
                "Clipping truncate areas past end of segment"
            );
            self.persist_header(&header)?;
        }

        self.index = index;
        self.lookup = lookup;
        self.bounds = bounds;
        self.write_cursor = cursor;

        debug!(
            target: "segwal::segment",
            path = %self.path.display(),
            records = self.index.len(),
            skipped,
            min_index = ?self.min_index(),
            max_index = ?self.max_index(),
            "Rebuilt segment index"
        );
        Ok(())
    }

    fn load_header(&mut self) -> Result<SegmentHeader> {
        let mut region = vec![0u8; HEADER_LENGTH as usize];
        self.file.seek(SeekFrom::Start(0))?;
        self.file.read_exact(&mut region).map_err(|e| {
            if e.kind() == io::ErrorKind::UnexpectedEof {
                Error::corruption(format!(
                    "segment {} is shorter than its header region",
                    self.path.display()
                ))
            } else {
                Error::Io(e)
            }
        })?;
        SegmentHeader::from_bytes(&region, self.byte_order)
    }

    /// Serialize and fsync `header`. The in-memory header is only replaced
    /// once the bytes are on disk.
    fn persist_header(&mut self, header: &SegmentHeader) -> Result<()> {
        let region = header.to_bytes(self.byte_order)?;
        self.positioned = false;
        self.file.seek(SeekFrom::Start(0))?;
        self.file.write_all(&region)?;
        self.file.sync_all()?;
        self.header = header.clone();
        Ok(())
    }

    /// Remove the inclusive index range `[start, end]` from this segment.
    pub fn truncate(&mut self, start: LogIndex, end: LogIndex) -> Result<TruncateOutcome> {
        let Some((min, max)) = self.bounds else {
            return Ok(TruncateOutcome::Deleted);
        };

        if max < start || min > end {
            return Ok(TruncateOutcome::NoOp);
        }

        if min >= start && max <= end {
            info!(
                target: "segwal::segment",
                path = %self.path.display(),
                min, max, start, end,
                "Truncation covers whole segment"
            );
            return Ok(TruncateOutcome::Deleted);
        }

        if min <= start && max <= end {
            self.truncate_tail(start)?;
        } else if start <= min && end <= max {
            self.truncate_front(end)?;
        } else if start >= min && end <= max {
            if !self.truncate_interior(start, end)? {
                return Ok(TruncateOutcome::NoOp);
            }
        } else {
            unreachable!(
                "truncate [{}, {}] against segment bounds [{}, {}]",
                start, end, min, max
            );
        }

        Ok(TruncateOutcome::Removed)
    }

    /// Physically cut the file at the first record with index >= `start`.
    fn truncate_tail(&mut self, start: LogIndex) -> Result<()> {
        let Some(first) = self.index.range(start..).next().map(|(_, r)| *r) else {
            unreachable!("no record at or after {} although max_index >= start", start);
        };
        let cut = first.offset();

        info!(
            target: "segwal::segment",
            path = %self.path.display(),
            from_index = first.index,
            cut,
            "Truncating segment tail"
        );

        self.file.set_len(cut)?;
        self.file.sync_all()?;

        let mut header = self.header.clone();
        if header.clip(cut) {
            self.persist_header(&header)?;
        }

        self.rebuild_index()
    }

    /// Soft-delete everything up to and including the last record with index <= `end`.
    fn truncate_front(&mut self, end: LogIndex) -> Result<()> {
        let Some(last) = self.index.range(..=end).next_back().map(|(_, r)| *r) else {
            unreachable!("no record at or before {} although min_index <= end", end);
        };
        let area = TruncateArea::new(HEADER_LENGTH, last.end());

        info!(
            target: "segwal::segment",
            path = %self.path.display(),
            through_index = last.index,
            area_start = area.start,
            area_end = area.end,
            "Soft-truncating segment front"
        );

        self.add_truncate_area(area)
    }

    /// Soft-delete the records with index in `[start, end]`.
    ///
    /// Returns false if no live record falls in the range.
    fn truncate_interior(&mut self, start: LogIndex, end: LogIndex) -> Result<bool> {
        let first = self.index.range(start..).next().map(|(_, r)| *r);
        let last = self.index.range(..=end).next_back().map(|(_, r)| *r);

        let (first, last) = match (first, last) {
            (Some(first), Some(last)) if first.index <= last.index => (first, last),
            _ => return Ok(false),
        };
        let area = TruncateArea::new(first.offset(), last.end());

        info!(
            target: "segwal::segment",
            path = %self.path.display(),
            from_index = first.index,
            through_index = last.index,
            area_start = area.start,
            area_end = area.end,
            "Soft-truncating segment interior"
        );

        self.add_truncate_area(area)?;
        Ok(true)
    }

    fn add_truncate_area(&mut self, area: TruncateArea) -> Result<()> {
        let mut header = self.header.clone();
        header.add(area);
        self.persist_header(&header)?;
        self.rebuild_index()
    }

    /// Flush file contents to stable storage.
    pub fn sync(&mut self) -> Result<()> {
        self.file.sync_all()?;
        Ok(())
    }

    /// Sync and release the file handle.
    pub fn close(mut self) -> Result<()> {
        self.sync()
    }

    /// Close the file and unlink it from disk.
    pub fn remove(self) -> Result<()> {
        let Segment { path, file, .. } = self;
        drop(file);
        std::fs::remove_file(&path)?;
        info!(target: "segwal::segment", path = %path.display(), "Removed segment file");
        Ok(())
    }
}

impl std::fmt::Debug for Segment {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Segment")
            .field("path", &self.path)
            .field("records", &self.index.len())
            .field("bounds", &self.bounds)
            .field("size", &self.write_cursor)
            .field("truncate_areas", &self.header.areas())
            .finish()
    }
}

/// Fill `buf` from `reader`, stopping early only at end of file.
fn read_full<R: Read>(reader: &mut R, buf: &mut [u8]) -> io::Result<usize> {
    let mut filled = 0;
    while filled < buf.len() {
        match reader.read(&mut buf[filled..]) {
            Ok(0) => break,
            Ok(n) => filled += n,
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(e),
        }
    }
    Ok(filled)
}
