//! Round-trip and bounds properties.

use crate::common::*;
use proptest::prelude::*;

proptest! {
    #![proptest_config(ProptestConfig::with_cases(24))]

    #[test]
    fn write_then_read_returns_payload(
        payloads in prop::collection::vec(prop::collection::vec(any::<u8>(), 1..256), 1..40),
        start in -1_000i64..1_000,
    ) {
        let t = TestWal::new(7);
        for (offset, p) in payloads.iter().enumerate() {
            t.wal().write(start + offset as i64, p).unwrap();
        }
        for (offset, p) in payloads.iter().enumerate() {
            prop_assert_eq!(t.wal().read(start + offset as i64).unwrap(), Some(p.clone()));
        }
    }

    #[test]
    fn bounds_track_surviving_indices(
        gaps in prop::collection::vec(1i64..5, 2..60),
        cut in 0usize..60,
    ) {
        let t = TestWal::new(5);
        let mut indices = Vec::new();
        let mut next = 0i64;
        for gap in gaps {
            next += gap;
            indices.push(next);
            t.wal().write(next, &payload(next)).unwrap();
        }

        prop_assert_eq!(t.wal().min_index(), indices.first().copied());
        prop_assert_eq!(t.wal().max_index(), indices.last().copied());

        // Drop a prefix; bounds follow the survivors.
        let cut = cut.min(indices.len() - 1);
        t.wal().truncate(i64::MIN, indices[cut]).unwrap();
        let survivors = &indices[cut + 1..];

        prop_assert_eq!(t.wal().min_index(), survivors.first().copied());
        prop_assert_eq!(t.wal().max_index(), survivors.last().copied());
        prop_assert_eq!(t.wal().len(), survivors.len());
    }
}

#[test]
fn round_trip_survives_reopen() {
    let mut t = TestWal::new(4);
    t.write_range(1..=20);
    t.close();
    t.reopen();

    for i in 1..=20 {
        assert_eq!(t.wal().read(i).unwrap(), Some(payload(i)));
    }
}

#[test]
fn little_endian_log_round_trips() {
    let mut t = TestWal::with_config(
        WalConfig::new()
            .with_max_items_per_segment(3)
            .with_byte_order(ByteOrder::Little),
    );
    t.write_range(1..=10);
    t.reopen();

    assert_eq!(t.wal().min_index(), Some(1));
    assert_eq!(t.wal().max_index(), Some(10));
    assert_eq!(t.wal().read(7).unwrap(), Some(payload(7)));
}
