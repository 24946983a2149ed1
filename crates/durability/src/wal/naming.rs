//! Segment file naming.
//!
//! Segments are named `log.TTTTTTTTTTTTTTTTTTTT.I.dat` where `T` is the
//! zero-padded creation time in microseconds since the Unix epoch and `I`
//! is the first logical index written to the segment. Names sort by
//! creation order. They exist for uniqueness and debugging only: segment
//! bounds always come from file contents.

use chrono::{DateTime, Utc};
use segwal_core::LogIndex;
use std::path::{Path, PathBuf};

/// Prefix shared by every segment file name.
pub const SEGMENT_PREFIX: &str = "log.";

/// Suffix shared by every segment file name.
pub const SEGMENT_SUFFIX: &str = ".dat";

/// Build the file name for a segment created at `created` whose first record is `first_index`.
pub fn segment_file_name(created: DateTime<Utc>, first_index: LogIndex) -> String {
    let micros = created.timestamp_micros().max(0);
    format!(
        "{}{:020}.{}{}",
        SEGMENT_PREFIX, micros, first_index, SEGMENT_SUFFIX
    )
}

/// Path for a new segment in `dir`, stamped with the current time.
pub fn new_segment_path(dir: &Path, first_index: LogIndex) -> PathBuf {
    dir.join(segment_file_name(Utc::now(), first_index))
}

/// Returns true if `name` looks like a segment file.
pub fn is_segment_file_name(name: &str) -> bool {
    name.len() > SEGMENT_PREFIX.len() + SEGMENT_SUFFIX.len()
        && name.starts_with(SEGMENT_PREFIX)
        && name.ends_with(SEGMENT_SUFFIX)
}

/// List segment files in `dir`, sorted by name. Other files are ignored.
pub fn list_segment_files(dir: &Path) -> std::io::Result<Vec<PathBuf>> {
    let mut paths = Vec::new();

    for entry in std::fs::read_dir(dir)? {
        let entry = entry?;
        if !entry.file_type()?.is_file() {
            continue;
        }
        let name = entry.file_name().to_string_lossy().to_string();
        if is_segment_file_name(&name) {
            paths.push(entry.path());
        }
    }

    paths.sort();
    Ok(paths)
}
