//! Batch writes: one write and one fsync, recovered as a prefix after a crash.

use crate::common::*;

fn abc() -> Vec<(LogIndex, &'static [u8])> {
    vec![(1, b"a".as_slice()), (2, b"b".as_slice()), (3, b"c".as_slice())]
}

#[test]
fn batch_is_readable_after_reopen() {
    let mut t = TestWal::new(100);
    t.wal().write_batch(&abc()).unwrap();

    assert_eq!(t.wal().read(2).unwrap(), Some(b"b".to_vec()));

    t.close();
    t.reopen();
    assert_eq!(t.wal().read(1).unwrap(), Some(b"a".to_vec()));
    assert_eq!(t.wal().read(2).unwrap(), Some(b"b".to_vec()));
    assert_eq!(t.wal().read(3).unwrap(), Some(b"c".to_vec()));
    assert_eq!(t.wal().max_index(), Some(3));
}

#[test]
fn torn_batch_recovers_a_prefix_never_a_gap() {
    let record = RECORD_PREFIX_SIZE + 1;
    let batch_len = 3 * record;

    for cut in 0..=batch_len {
        let mut t = TestWal::new(100);
        t.wal().write_batch(&abc()).unwrap();
        let path = t.wal().segment_paths()[0].clone();
        t.crash();

        truncate_file(&path, HEADER_LENGTH + cut);
        t.reopen();

        let survivors = t.readable(1..=3);
        let expected: Vec<LogIndex> = (1..=(cut / record) as LogIndex).collect();
        assert_eq!(survivors, expected, "cut {} bytes into the batch", cut);
    }
}

#[test]
fn batch_lands_in_one_segment() {
    let t = TestWal::new(4);
    t.write_range(1..=3);

    let batch: Vec<(LogIndex, Vec<u8>)> = (4..=9).map(|i| (i, payload(i))).collect();
    t.wal().write_batch(&batch).unwrap();

    // The batch started below the item limit, so it stays in the first segment.
    assert_eq!(t.wal().segment_lengths(), vec![9]);

    t.write_range(10..=10);
    assert_eq!(t.wal().segment_lengths(), vec![9, 1]);
}

#[test]
fn batch_rejects_non_increasing_indices() {
    let t = TestWal::new(100);
    let batch: Vec<(LogIndex, &[u8])> = vec![(1, b"a".as_slice()), (3, b"c".as_slice()), (2, b"b".as_slice())];

    let result = t.wal().write_batch(&batch);
    assert!(matches!(result, Err(Error::IndexOutOfOrder { index: 2, last: 3 })));
    assert!(t.wal().is_empty());
}

#[test]
fn batch_must_follow_existing_records() {
    let t = TestWal::new(100);
    t.write_range(1..=5);

    let batch: Vec<(LogIndex, &[u8])> = vec![(5, b"x".as_slice()), (6, b"y".as_slice())];
    let result = t.wal().write_batch(&batch);

    assert!(matches!(result, Err(Error::IndexOutOfOrder { index: 5, last: 5 })));
    assert_eq!(t.wal().read(5).unwrap(), Some(payload(5)));
    assert_eq!(t.wal().max_index(), Some(5));
}

#[test]
fn empty_batch_is_ignored() {
    let t = TestWal::new(100);
    let batch: Vec<(LogIndex, Vec<u8>)> = Vec::new();

    t.wal().write_batch(&batch).unwrap();

    assert!(t.wal().is_empty());
    assert_eq!(t.wal().segment_count(), 0);
}

#[test]
fn empty_payload_in_batch_is_skipped_and_stays_gone() {
    let mut t = TestWal::new(100);
    let batch = vec![(1, b"".as_slice()), (2, b"x".as_slice()), (3, b"y".as_slice())];

    t.wal().write_batch(&batch).unwrap();
    t.wal().truncate(0, 1).unwrap();

    assert_eq!(t.wal().read(1).unwrap(), None);
    assert_eq!(t.wal().min_index(), Some(2));
    assert_eq!(t.wal().len(), 2);

    t.reopen();
    assert_eq!(t.readable(1..=3), vec![2, 3]);
}
