//! Directory manager: the multi-segment WAL.
//!
//! Segments are kept in a map keyed by each segment's min_index, which
//! gives predecessor search for routing an index to its segment. Only the
//! last segment is ever appended to.
//!
//! All operations run under one engine-wide lock. Truncation rebuilds
//! segment indexes and deletes files, so reads are not allowed to overlap it.

use super::bootstrap::load_segments;
use super::config::WalConfig;
use super::naming::new_segment_path;
use crate::format::PREFIX_LEN;
use crate::segment::{Segment, TruncateOutcome};
use parking_lot::Mutex;
use segwal_core::{Error, LogIndex, Result};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// Segmented write-ahead log over one directory.
///
/// `Wal` is `Send + Sync`; share it with `Arc<Wal>`.
pub struct Wal {
    dir: PathBuf,
    config: WalConfig,
    state: Mutex<WalState>,
}

struct WalState {
    segments: BTreeMap<LogIndex, Segment>,
    /// Global `(min_index, max_index)`, `None` when the log is empty
    bounds: Option<(LogIndex, LogIndex)>,
}

impl Wal {
    /// Open the WAL in `dir` with the given roll threshold and default settings.
    pub fn open(dir: impl AsRef<Path>, max_items_per_segment: usize) -> Result<Self> {
        let config = WalConfig::new().with_max_items_per_segment(max_items_per_segment);
        Self::open_with_config(dir, config)
    }

    /// Open the WAL in `dir`, creating the directory if missing.
    ///
    /// Every segment file is opened and indexed; segments with no live
    /// records are deleted.
    pub fn open_with_config(dir: impl AsRef<Path>, config: WalConfig) -> Result<Self> {
        config.validate()?;

        let dir = dir.as_ref().to_path_buf();
        std::fs::create_dir_all(&dir)?;

        let segments = load_segments(&dir, &config)?;
        let mut state = WalState {
            segments,
            bounds: None,
        };
        state.recompute_bounds();

        info!(
            target: "segwal::wal",
            dir = %dir.display(),
            segments = state.segments.len(),
            min_index = ?state.min_index(),
            max_index = ?state.max_index(),
            "Opened WAL"
        );

        Ok(Wal {
            dir,
            config,
            state: Mutex::new(state),
        })
    }

    /// Append one record and fsync before returning.
    ///
    /// An empty payload is ignored. `index` must be greater than every
    /// index already in the log.
    pub fn write(&self, index: LogIndex, payload: &[u8]) -> Result<()> {
        if payload.is_empty() {
            warn!(target: "segwal::wal", index, "Ignoring write with empty payload");
            return Ok(());
        }

        let mut state = self.state.lock();
        state.check_next(index)?;

        let bytes = (PREFIX_LEN + payload.len()) as u64;
        let record = state.append_with_roll(&self.dir, &self.config, index, bytes, |segment| {
            segment.append(index, payload)
        })?;
        state.refresh_bounds(record.index, record.index);
        Ok(())
    }

    /// Append several records with one write and one fsync.
    ///
    /// The batch always lands in a single segment. Entries with an empty
    /// payload are skipped, as [`Wal::write`] skips them; a batch with nothing
    /// left is ignored. Indices must be strictly increasing and greater than
    /// every index already in the log.
    pub fn write_batch<P: AsRef<[u8]>>(&self, entries: &[(LogIndex, P)]) -> Result<()> {
        for pair in entries.windows(2) {
            if pair[1].0 <= pair[0].0 {
                return Err(Error::IndexOutOfOrder {
                    index: pair[1].0,
                    last: pair[0].0,
                });
            }
        }

        let mut kept: Vec<(LogIndex, &[u8])> = Vec::with_capacity(entries.len());
        for (index, payload) in entries {
            let payload = payload.as_ref();
            if payload.is_empty() {
                warn!(target: "segwal::wal", index = *index, "Skipping batch entry with empty payload");
                continue;
            }
            kept.push((*index, payload));
        }

        let (Some(&(first, _)), Some(&(last, _))) = (kept.first(), kept.last()) else {
            warn!(target: "segwal::wal", "Ignoring empty write batch");
            return Ok(());
        };

        let mut state = self.state.lock();
        state.check_next(first)?;

        let bytes: u64 = kept
            .iter()
            .map(|(_, p)| (PREFIX_LEN + p.len()) as u64)
            .sum();
        state.append_with_roll(&self.dir, &self.config, first, bytes, |segment| {
            segment.append_batch(&kept)
        })?;
        state.refresh_bounds(first, last);
        Ok(())
    }

    /// Read the payload stored under `index`.
    ///
    /// Returns `Ok(None)` if the index is not in the log.
    pub fn read(&self, index: LogIndex) -> Result<Option<Vec<u8>>> {
        let mut state = self.state.lock();

        match state.bounds {
            Some((min, max)) if index >= min && index <= max => {}
            _ => return Ok(None),
        }

        let Some((_, segment)) = state.segments.range_mut(..=index).next_back() else {
            return Ok(None);
        };
        segment.read(index)
    }

    /// Remove every record with index in the inclusive range `[start, end]`.
    ///
    /// Segments emptied or fully covered by the range are deleted from disk.
    pub fn truncate(&self, start: LogIndex, end: LogIndex) -> Result<()> {
        if start > end {
            warn!(target: "segwal::wal", start, end, "Ignoring truncate with inverted range");
            return Ok(());
        }

        let mut state = self.state.lock();
        let result = state.truncate_segments(start, end);
        state.recompute_bounds();

        debug!(
            target: "segwal::wal",
            start, end,
            segments = state.segments.len(),
            min_index = ?state.min_index(),
            max_index = ?state.max_index(),
            "Truncated WAL"
        );
        result
    }

    /// Smallest index in the log.
    pub fn min_index(&self) -> Option<LogIndex> {
        self.state.lock().min_index()
    }

    /// Largest index in the log.
    pub fn max_index(&self) -> Option<LogIndex> {
        self.state.lock().max_index()
    }

    /// Number of live records across all segments.
    pub fn len(&self) -> usize {
        self.state.lock().segments.values().map(Segment::len).sum()
    }

    /// Returns true if the log holds no records.
    pub fn is_empty(&self) -> bool {
        self.state.lock().bounds.is_none()
    }

    /// Number of segment files.
    pub fn segment_count(&self) -> usize {
        self.state.lock().segments.len()
    }

    /// Segment file paths in index order.
    pub fn segment_paths(&self) -> Vec<PathBuf> {
        self.state
            .lock()
            .segments
            .values()
            .map(|s| s.path().to_path_buf())
            .collect()
    }

    /// Live record count per segment, in index order.
    pub fn segment_lengths(&self) -> Vec<usize> {
        self.state.lock().segments.values().map(Segment::len).collect()
    }

    /// WAL directory.
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Active configuration.
    pub fn config(&self) -> &WalConfig {
        &self.config
    }

    /// Sync every segment and release all file handles.
    pub fn close(self) -> Result<()> {
        let state = self.state.into_inner();
        for segment in state.segments.into_values() {
            segment.close()?;
        }
        info!(target: "segwal::wal", dir = %self.dir.display(), "Closed WAL");
        Ok(())
    }
}

impl WalState {
    fn min_index(&self) -> Option<LogIndex> {
        self.bounds.map(|(min, _)| min)
    }

    fn max_index(&self) -> Option<LogIndex> {
        self.bounds.map(|(_, max)| max)
    }

    fn check_next(&self, index: LogIndex) -> Result<()> {
        match self.max_index() {
            Some(last) if index <= last => Err(Error::IndexOutOfOrder { index, last }),
            _ => Ok(()),
        }
    }

    /// Run `append` against the segment for a write of `bytes` starting at
    /// `first_index`, rolling to a new segment when the newest one is full.
    ///
    /// A segment created by the roll is removed again if the append fails,
    /// so the map never holds an empty segment keyed above its future min.
    fn append_with_roll<T>(
        &mut self,
        dir: &Path,
        config: &WalConfig,
        first_index: LogIndex,
        bytes: u64,
        append: impl FnOnce(&mut Segment) -> Result<T>,
    ) -> Result<T> {
        let rolled = self.roll_if_full(dir, config, first_index, bytes)?;

        let result = match self.segments.values_mut().next_back() {
            Some(segment) => append(segment),
            None => unreachable!("segment map empty after roll"),
        };

        if result.is_err() && rolled {
            if let Some(segment) = self.segments.remove(&first_index) {
                warn!(
                    target: "segwal::wal",
                    path = %segment.path().display(),
                    first_index,
                    "Removing new segment after failed first append"
                );
                if let Err(e) = segment.remove() {
                    warn!(target: "segwal::wal", first_index, error = %e, "Failed to remove segment");
                }
            }
        }
        result
    }

    /// Create a new segment when the newest one cannot take `bytes` more.
    ///
    /// Returns true if a segment was created.
    fn roll_if_full(
        &mut self,
        dir: &Path,
        config: &WalConfig,
        first_index: LogIndex,
        bytes: u64,
    ) -> Result<bool> {
        let roll = match self.segments.values().next_back() {
            None => true,
            Some(last) => {
                last.len() >= config.max_items_per_segment
                    || (!last.is_empty() && last.size() + bytes > config.segment_size)
            }
        };

        if roll {
            let path = new_segment_path(dir, first_index);
            let segment = Segment::create(&path, config.byte_order)?;
            info!(
                target: "segwal::wal",
                path = %path.display(),
                first_index,
                "Rolled to new segment"
            );
            // The segment is keyed by its first index before any record exists.
            self.segments.insert(first_index, segment);
        }

        Ok(roll)
    }

    fn refresh_bounds(&mut self, first: LogIndex, last: LogIndex) {
        self.bounds = Some(match self.bounds {
            None => (first, last),
            Some((min, max)) => (min.min(first), max.max(last)),
        });
    }

    fn recompute_bounds(&mut self) {
        self.bounds = self
            .segments
            .values()
            .filter_map(Segment::bounds)
            .fold(None, |acc, (min, max)| match acc {
                None => Some((min, max)),
                Some((gmin, gmax)) => Some((gmin.min(min), gmax.max(max))),
            });
    }

    /// Walk segments overlapping `[start, end]` in key order.
    fn truncate_segments(&mut self, start: LogIndex, end: LogIndex) -> Result<()> {
        let first_key = self
            .segments
            .range(..=start)
            .next_back()
            .or_else(|| self.segments.iter().next())
            .map(|(k, _)| *k);

        let keys: Vec<LogIndex> = match first_key {
            Some(first) if first <= end => self.segments.range(first..=end).map(|(k, _)| *k).collect(),
            _ => return Ok(()),
        };

        for key in keys {
            let Some(segment) = self.segments.get_mut(&key) else {
                continue;
            };

            match segment.truncate(start, end)? {
                TruncateOutcome::NoOp => {}
                TruncateOutcome::Removed if !segment.is_empty() => {
                    if let Some(min) = segment.min_index() {
                        if min != key {
                            if let Some(segment) = self.segments.remove(&key) {
                                self.segments.insert(min, segment);
                            }
                        }
                    }
                }
                TruncateOutcome::Removed | TruncateOutcome::Deleted => {
                    if let Some(segment) = self.segments.remove(&key) {
                        segment.remove()?;
                    }
                }
            }
        }

        Ok(())
    }
}
