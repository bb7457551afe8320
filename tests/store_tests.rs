use chrono::{Duration, Local, TimeZone};
use proptest::prelude::*;

use memtrend::system::{Snapshot, SnapshotStore};

fn snapshot(secs: i64) -> Snapshot {
    let base = Local.with_ymd_and_hms(2024, 3, 1, 9, 0, 0).unwrap();
    Snapshot::empty(base + Duration::seconds(secs))
}

fn seconds(store: &SnapshotStore) -> Vec<i64> {
    let base = Local.with_ymd_and_hms(2024, 3, 1, 9, 0, 0).unwrap();
    store
        .iter()
        .map(|s| (s.timestamp - base).num_seconds())
        .collect()
}

#[test]
fn ring_buffer_keeps_newest_in_order() {
    let mut store = SnapshotStore::with_capacity(3);
    for secs in 0..3 {
        assert!(store.push(snapshot(secs)).is_none());
    }
    let evicted = store.push(snapshot(3)).unwrap();
    assert_eq!(evicted, snapshot(0));
    assert_eq!(seconds(&store), vec![1, 2, 3]);
    assert_eq!(store.first(), Some(&snapshot(1)));
    assert_eq!(store.last(), Some(&snapshot(3)));
    assert_eq!(store.iter().rev().next(), Some(&snapshot(3)));
}

#[test]
fn zero_capacity_holds_one() {
    let mut store = SnapshotStore::with_capacity(0);
    store.push(snapshot(0));
    store.push(snapshot(1));
    assert_eq!(store.capacity(), Some(1));
    assert_eq!(seconds(&store), vec![1]);
}

#[test]
fn unbounded_never_evicts() {
    let store: SnapshotStore = (0..500).map(snapshot).collect();
    assert_eq!(store.len(), 500);
    assert_eq!(store.capacity(), None);
    assert_eq!(store.first(), Some(&snapshot(0)));
}

proptest! {
    #[test]
    fn bounded_store_matches_tail_of_pushes(capacity in 1usize..20, pushes in 0usize..80) {
        let mut store = SnapshotStore::with_capacity(capacity);
        let mut evictions = 0;
        for secs in 0..pushes as i64 {
            if store.push(snapshot(secs)).is_some() {
                evictions += 1;
            }
        }

        let kept = pushes.min(capacity);
        prop_assert_eq!(store.len(), kept);
        prop_assert_eq!(store.iter().len(), kept);
        prop_assert_eq!(evictions, pushes - kept);

        let expected: Vec<i64> = ((pushes - kept) as i64..pushes as i64).collect();
        prop_assert_eq!(seconds(&store), expected);
        if pushes > 0 {
            prop_assert_eq!(store.last(), Some(&snapshot(pushes as i64 - 1)));
        }
    }
}
