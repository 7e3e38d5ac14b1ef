//! Slot recycling E2E tests.
//!
//! Covers label assignment, smallest-slot-first reuse, label retirement and
//! the slot/label bijection across mixed insert and delete workloads.

use pretty_assertions::assert_eq;

use e2e_tests::TestHarness;
use flatmut_index::VectorIndex;
use flatmut_types::{Label, MetricType};

#[test]
fn test_labels_follow_insertion_order_without_deletes() {
    let mut harness = TestHarness::new(4, MetricType::L2, 7);
    let mut issued = Vec::new();
    for batch in [3, 1, 0, 5] {
        issued.extend(harness.insert_random(batch));
    }

    assert_eq!(issued, (0..9).collect::<Vec<Label>>());
    let storage = harness.index.storage();
    for slot in 0..storage.physical_count() {
        assert_eq!(storage.label_of(slot), Some(slot as Label));
    }
}

#[test]
fn test_recycling_fills_freed_slots_in_ascending_order() {
    let mut harness = TestHarness::new(3, MetricType::L2, 11);
    harness.insert_random(8);

    let pending = harness.delete(&[6, 1, 4]);
    assert_eq!(pending, 3);
    assert_eq!(
        harness.index.storage().free_slots().collect::<Vec<_>>(),
        vec![1, 4, 6]
    );

    let fresh = harness.insert_random(3);
    assert_eq!(fresh, vec![8, 9, 10]);

    let storage = harness.index.storage();
    assert_eq!(storage.slot_of(8), Some(1));
    assert_eq!(storage.slot_of(9), Some(4));
    assert_eq!(storage.slot_of(10), Some(6));
    assert_eq!(storage.pending_removals(), 0);
    assert_eq!(storage.physical_count(), 8);
}

#[test]
fn test_recycled_labels_are_retired() {
    let mut harness = TestHarness::new(2, MetricType::L2, 3);
    harness.insert_random(4);
    harness.delete(&[2]);

    // tombstoned but not yet recycled: still resolvable
    assert_eq!(harness.index.storage().slot_of(2), Some(2));

    harness.insert_random(1);
    assert_eq!(harness.index.storage().slot_of(2), None);
    assert!(harness.index.reconstruct(2).is_err());
    assert!(harness.index.mark_deleted(&[2]).is_err());
}

#[test]
fn test_overflow_after_free_list_is_appended() {
    let mut harness = TestHarness::new(2, MetricType::L2, 5);
    harness.insert_random(3);
    harness.delete(&[0]);

    let fresh = harness.insert_random(3);
    assert_eq!(fresh, vec![3, 4, 5]);

    assert_eq!(
        harness.live_slots(),
        vec![(0, 3), (1, 1), (2, 2), (3, 4), (4, 5)]
    );
}

#[test]
fn test_churn_keeps_bijection_and_contents() {
    let mut harness = TestHarness::new(5, MetricType::L2, 42);
    harness.insert_random(50);

    for round in 0..20 {
        let victims = harness.pick_live(7);
        harness.delete(&victims);
        harness.insert_random(3 + round % 5);

        let storage = harness.index.storage();
        for (slot, label) in harness.live_slots() {
            assert_eq!(storage.slot_of(label), Some(slot));
        }
        assert_eq!(harness.index.len(), harness.live.len());
        assert_eq!(
            storage.physical_count(),
            storage.len() + storage.pending_removals()
        );
    }

    for (label, original) in &harness.live {
        let back = harness.index.reconstruct(*label).unwrap();
        assert_eq!(&back, original);
    }
}

#[test]
fn test_reset_restarts_labels() {
    let mut harness = TestHarness::new(2, MetricType::InnerProduct, 9);
    harness.insert_random(5);
    harness.delete(&[1, 3]);

    harness.index.reset();
    harness.live.clear();

    assert_eq!(harness.insert_random(2), vec![0, 1]);
    assert_eq!(harness.index.storage().pending_removals(), 0);
    assert_eq!(harness.index.storage().physical_count(), 2);
}
