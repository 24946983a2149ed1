//! Startup: open and index every segment in a directory.
//!
//! # Algorithm
//!
//! 1. List segment files (other files are ignored)
//! 2. Spread them across a fixed number of scoped worker threads; each
//!    worker opens and rebuilds its segments and sends them back over a
//!    bounded channel
//! 3. On the calling thread, fold results into a map keyed by min_index,
//!    deleting segments that rebuilt empty
//! 4. Check that live ranges of different segments do not overlap
//!
//! Workers share nothing mutable; the map is only touched by the caller.

use super::config::WalConfig;
use super::naming::list_segment_files;
use crate::segment::Segment;
use segwal_core::{Error, LogIndex, Result};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::mpsc::sync_channel;
use std::thread;
use tracing::{debug, info, warn};

/// Open every segment under `dir` and return them keyed by min_index.
pub(crate) fn load_segments(dir: &Path, config: &WalConfig) -> Result<BTreeMap<LogIndex, Segment>> {
    let paths = list_segment_files(dir)?;
    let mut segments = BTreeMap::new();

    if paths.is_empty() {
        debug!(target: "segwal::bootstrap", dir = %dir.display(), "No segment files found");
        return Ok(segments);
    }

    let workers = config.bootstrap_workers.max(1).min(paths.len());
    let byte_order = config.byte_order;
    let (tx, rx) = sync_channel::<(PathBuf, Result<Segment>)>(workers);

    let mut first_error: Option<Error> = None;
    let mut removed = 0usize;

    thread::scope(|s| {
        for worker in 0..workers {
            let tx = tx.clone();
            let paths = &paths;
            s.spawn(move || {
                for path in paths.iter().skip(worker).step_by(workers) {
                    let opened = Segment::open(path, byte_order);
                    if tx.send((path.clone(), opened)).is_err() {
                        break;
                    }
                }
            });
        }
        drop(tx);

        for (path, opened) in rx {
            let segment = match opened {
                Ok(segment) => segment,
                Err(e) => {
                    warn!(target: "segwal::bootstrap", path = %path.display(), error = %e, "Failed to open segment");
                    first_error.get_or_insert(e);
                    continue;
                }
            };

            let Some(min) = segment.min_index() else {
                // Fully truncated or never written: nothing to keep.
                match segment.remove() {
                    Ok(()) => removed += 1,
                    Err(e) => {
                        first_error.get_or_insert(e);
                    }
                }
                continue;
            };

            if let Some(existing) = segments.insert(min, segment) {
                first_error.get_or_insert(Error::corruption(format!(
                    "segments {} and {} both start at index {}",
                    existing.path().display(),
                    path.display(),
                    min
                )));
            }
        }
    });

    if let Some(e) = first_error {
        return Err(e);
    }

    check_disjoint(&segments)?;

    info!(
        target: "segwal::bootstrap",
        dir = %dir.display(),
        segments = segments.len(),
        removed_empty = removed,
        workers,
        "Loaded WAL segments"
    );
    Ok(segments)
}

/// Every segment's live range must end before the next one starts.
fn check_disjoint(segments: &BTreeMap<LogIndex, Segment>) -> Result<()> {
    let mut prev: Option<&Segment> = None;

    for segment in segments.values() {
        if let Some(prev) = prev {
            if let (Some(prev_max), Some(min)) = (prev.max_index(), segment.min_index()) {
                if prev_max >= min {
                    return Err(Error::corruption(format!(
                        "segment {} (max {}) overlaps {} (min {})",
                        prev.path().display(),
                        prev_max,
                        segment.path().display(),
                        min
                    )));
                }
            }
        }
        prev = Some(segment);
    }

    Ok(())
}
