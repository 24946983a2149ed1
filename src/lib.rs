//! segwal - segmented, crash-recoverable write-ahead log
//!
//! An append-only sequence of indexed, variable-length records, fsynced to
//! disk and spread across segment files, with point lookup by logical index
//! and ranged truncation for log compaction.
//!
//! # Quick Start
//!
//! ```no_run
//! use segwal::Wal;
//!
//! # fn main() -> segwal::Result<()> {
//! // Open (or recover) the log, rolling segments every 10 000 records.
//! let wal = Wal::open("./wal", 10_000)?;
//!
//! wal.write(1, b"first")?;
//! wal.write_batch(&[(2, b"second".to_vec()), (3, b"third".to_vec())])?;
//!
//! assert_eq!(wal.read(2)?, Some(b"second".to_vec()));
//!
//! // Drop everything up to index 2 once a snapshot covers it.
//! wal.truncate(0, 2)?;
//! assert_eq!(wal.read(1)?, None);
//! # Ok(())
//! # }
//! ```
//!
//! # Architecture
//!
//! All operations go through [`Wal`], which routes to [`Segment`]s. The
//! segment file format lives in [`format`].

pub use segwal_core::{ByteOrder, Error, LogIndex, Record, Result, RECORD_PREFIX_SIZE};
pub use segwal_durability::{
    format, RecordError, Segment, SegmentHeader, TruncateArea, TruncateOutcome, Wal, WalConfig,
    WalConfigError, HEADER_CAPACITY, HEADER_LENGTH,
};
