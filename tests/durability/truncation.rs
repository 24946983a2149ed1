//! Ranged truncation across the four segment-local cases.
//!
//! Most tests use one segment holding indices 5..=13.

use crate::common::*;

fn single_segment() -> TestWal {
    let t = TestWal::new(100);
    t.write_range(5..=13);
    assert_eq!(t.wal().segment_count(), 1);
    t
}

fn only_segment(t: &TestWal) -> std::path::PathBuf {
    let paths = t.wal().segment_paths();
    assert_eq!(paths.len(), 1);
    paths[0].clone()
}

#[test]
fn full_cover_removes_segment_file() {
    let t = single_segment();
    let path = only_segment(&t);

    t.wal().truncate(0, 20).unwrap();

    assert!(!path.exists());
    assert_eq!(t.wal().segment_count(), 0);
    assert!(t.readable(5..=13).is_empty());
    assert_eq!(t.wal().min_index(), None);
    assert_eq!(t.wal().max_index(), None);
}

#[test]
fn exact_cover_removes_segment_file() {
    let t = single_segment();
    let path = only_segment(&t);

    t.wal().truncate(5, 13).unwrap();

    assert!(!path.exists());
    assert!(t.wal().is_empty());
}

#[test]
fn tail_truncation_shrinks_file() {
    let t = single_segment();
    let path = only_segment(&t);
    let before = file_size(&path);

    t.wal().truncate(9, 20).unwrap();

    assert_eq!(t.readable(5..=13), vec![5, 6, 7, 8]);
    assert!(file_size(&path) < before);
    assert_eq!(
        file_size(&path),
        HEADER_LENGTH + (5..=8).map(record_size).sum::<u64>()
    );
    assert_eq!(t.wal().max_index(), Some(8));
}

#[test]
fn head_truncation_is_soft_and_survives_reopen() {
    let mut t = single_segment();
    let path = only_segment(&t);
    let before = file_size(&path);

    t.wal().truncate(0, 9).unwrap();

    assert_eq!(t.readable(5..=13), vec![10, 11, 12, 13]);
    assert_eq!(file_size(&path), before);
    assert_eq!(t.wal().min_index(), Some(10));

    t.close();
    t.reopen();

    assert_eq!(t.readable(5..=13), vec![10, 11, 12, 13]);
    assert_eq!(t.wal().min_index(), Some(10));
}

#[test]
fn interior_truncation_leaves_both_ends() {
    let mut t = single_segment();

    t.wal().truncate(7, 9).unwrap();

    assert_eq!(t.readable(5..=13), vec![5, 6, 10, 11, 12, 13]);
    assert_eq!(t.wal().min_index(), Some(5));
    assert_eq!(t.wal().max_index(), Some(13));

    t.reopen();
    assert_eq!(t.readable(5..=13), vec![5, 6, 10, 11, 12, 13]);
}

#[test]
fn non_overlapping_truncation_is_noop() {
    let t = single_segment();
    let path = only_segment(&t);
    let before = file_size(&path);

    t.wal().truncate(0, 4).unwrap();
    t.wal().truncate(14, 100).unwrap();

    assert_eq!(t.readable(5..=13).len(), 9);
    assert_eq!(file_size(&path), before);
}

// Boundary cases around the physical cut point (header offset of the
// first removed record).

#[test]
fn tail_cut_at_first_record_after_min() {
    let t = single_segment();
    let path = only_segment(&t);

    t.wal().truncate(6, 13).unwrap();

    assert_eq!(t.readable(5..=13), vec![5]);
    assert_eq!(file_size(&path), HEADER_LENGTH + record_size(5));
    assert_eq!(t.wal().read(5).unwrap(), Some(payload(5)));
}

#[test]
fn tail_cut_of_last_record_only() {
    let t = single_segment();
    let path = only_segment(&t);

    t.wal().truncate(13, 13).unwrap();

    assert_eq!(t.readable(5..=13), (5..=12).collect::<Vec<_>>());
    assert_eq!(
        file_size(&path),
        HEADER_LENGTH + (5..=12).map(record_size).sum::<u64>()
    );
    assert_eq!(t.wal().read(12).unwrap(), Some(payload(12)));
}

#[test]
fn tail_cut_then_append_reuses_space() {
    let mut t = single_segment();

    t.wal().truncate(9, 13).unwrap();
    t.write_range(9..=11);

    assert_eq!(t.readable(5..=13), (5..=11).collect::<Vec<_>>());

    t.reopen();
    assert_eq!(t.readable(5..=13), (5..=11).collect::<Vec<_>>());
    assert_eq!(t.wal().read(11).unwrap(), Some(payload(11)));
}

#[test]
fn truncation_at_segment_boundaries() {
    // Segments: [1..4] [5..8] [9..12]
    let t = TestWal::new(4);
    t.write_range(1..=12);
    let paths = t.wal().segment_paths();

    // Starts exactly at the second segment's first index.
    t.wal().truncate(5, 8).unwrap();

    assert!(paths[0].exists());
    assert!(!paths[1].exists());
    assert!(paths[2].exists());
    assert_eq!(t.readable(1..=12), vec![1, 2, 3, 4, 9, 10, 11, 12]);

    // Ends exactly at the first segment's last index.
    t.wal().truncate(3, 4).unwrap();
    assert_eq!(t.readable(1..=12), vec![1, 2, 9, 10, 11, 12]);
    assert_eq!(file_size(&paths[0]), HEADER_LENGTH + record_size(1) + record_size(2));
}

#[test]
fn truncation_spanning_three_segments() {
    let mut t = TestWal::new(4);
    t.write_range(1..=12);

    t.wal().truncate(3, 10).unwrap();

    assert_eq!(t.wal().segment_count(), 2);
    assert_eq!(t.readable(1..=12), vec![1, 2, 11, 12]);
    assert_eq!(segment_files(t.path()).len(), 2);

    t.reopen();
    assert_eq!(t.readable(1..=12), vec![1, 2, 11, 12]);
    assert_eq!(t.wal().min_index(), Some(1));
    assert_eq!(t.wal().max_index(), Some(12));
}

#[test]
fn prefix_compaction_after_snapshot() {
    let mut t = TestWal::new(10);
    t.write_range(1..=55);

    // A consumer snapshots at 32 and drops everything before it.
    t.wal().truncate(0, 32).unwrap();

    assert_eq!(t.wal().min_index(), Some(33));
    assert_eq!(t.wal().max_index(), Some(55));
    assert_eq!(t.wal().len(), 23);
    assert_eq!(segment_files(t.path()).len(), 3);

    t.write_range(56..=60);
    t.reopen();
    assert_eq!(t.readable(1..=60), (33..=60).collect::<Vec<_>>());
}

#[test]
fn repeated_head_truncation_keeps_header_small() {
    let mut t = TestWal::new(1_000);
    t.write_range(1..=500);

    for end in (10..=490).step_by(10) {
        t.wal().truncate(0, end).unwrap();
    }

    assert_eq!(t.readable(480..=500), (491..=500).collect::<Vec<_>>());
    t.reopen();
    assert_eq!(t.wal().min_index(), Some(491));
}

#[test]
fn many_interior_holes_overflow_header_cleanly() {
    let t = TestWal::new(10_000);
    t.write_range(1..=400);

    // Disjoint holes cannot be merged; the header region fills up.
    let mut overflowed = false;
    for i in (2..400).step_by(4) {
        match t.wal().truncate(i, i) {
            Ok(()) => {}
            Err(Error::HeaderOverflow { .. }) => {
                overflowed = true;
                break;
            }
            Err(e) => panic!("unexpected error: {}", e),
        }
    }

    assert!(overflowed);
    // The log is still usable and consistent.
    assert_eq!(t.wal().read(1).unwrap(), Some(payload(1)));
    assert_eq!(t.wal().read(399).unwrap(), Some(payload(399)));
    t.wal().write(401, &payload(401)).unwrap();
    assert_eq!(t.wal().max_index(), Some(401));
}
