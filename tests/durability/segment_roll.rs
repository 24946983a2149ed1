//! Segment roll policy.

use crate::common::*;

#[test]
fn writing_n_plus_one_rolls_once() {
    let t = TestWal::new(5);
    t.write_range(1..=6);

    assert_eq!(t.wal().segment_count(), 2);
    assert_eq!(t.wal().segment_lengths(), vec![5, 1]);
    assert_eq!(segment_files(t.path()).len(), 2);
}

#[test]
fn exactly_n_items_stay_in_one_segment() {
    let t = TestWal::new(5);
    t.write_range(1..=5);

    assert_eq!(t.wal().segment_count(), 1);
}

#[test]
fn segment_files_sort_in_creation_order() {
    let t = TestWal::new(2);
    t.write_range(1..=8);

    // Name order matches index order.
    assert_eq!(segment_files(t.path()), t.wal().segment_paths());
}

#[test]
fn segment_file_names_carry_first_index() {
    let t = TestWal::new(3);
    t.write_range(10..=16);

    let names: Vec<String> = t
        .wal()
        .segment_paths()
        .iter()
        .map(|p| p.file_name().unwrap().to_string_lossy().to_string())
        .collect();
    assert!(names[0].ends_with(".10.dat"));
    assert!(names[1].ends_with(".13.dat"));
    assert!(names[2].ends_with(".16.dat"));
}

#[test]
fn roll_threshold_counts_live_records_only() {
    let t = TestWal::new(5);
    t.write_range(1..=5);

    // Tail truncation frees room in the newest segment.
    t.wal().truncate(4, 5).unwrap();
    t.write_range(4..=5);

    assert_eq!(t.wal().segment_count(), 1);
    assert_eq!(t.wal().segment_lengths(), vec![5]);
}

#[test]
fn size_threshold_rolls_before_overflow() {
    let per_record = record_size(1);
    let t = TestWal::with_config(
        WalConfig::new()
            .with_max_items_per_segment(1_000)
            .with_segment_size(HEADER_LENGTH + 4 * per_record),
    );
    t.write_range(1..=10);

    assert_eq!(t.wal().segment_lengths(), vec![4, 4, 2]);
    for path in t.wal().segment_paths() {
        assert!(file_size(&path) <= HEADER_LENGTH + 4 * per_record);
    }
}
