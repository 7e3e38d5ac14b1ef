//! Search E2E tests.
//!
//! Compares k-NN and range results from the index against a naive scan of
//! the live vectors, across metrics and after deletions and recycling.

use pretty_assertions::assert_eq;

use e2e_tests::{labels_of, score, sort_hits, TestHarness};
use flatmut_index::{SearchHit, VectorIndex};
use flatmut_kernels::{IdSelectorBitmap, IdSelectorNot};
use flatmut_types::MetricType;

fn check_against_naive(metric: MetricType, seed: u64) {
    let mut harness = TestHarness::new(6, metric, seed);
    harness.insert_random(97);
    let victims = harness.pick_live(20);
    harness.delete(&victims);
    harness.insert_random(9);

    for _ in 0..5 {
        let query = harness.random_vector();
        let got = harness.index.search(&query, 8, None).unwrap();
        let want = harness.naive_search(&query, 8);
        assert_eq!(labels_of(&got[0]), labels_of(&want), "metric {metric}");
    }
}

#[test]
fn test_l2_matches_naive_scan() {
    check_against_naive(MetricType::L2, 1);
}

#[test]
fn test_inner_product_matches_naive_scan() {
    check_against_naive(MetricType::InnerProduct, 2);
}

#[test]
fn test_extra_metrics_match_naive_scan() {
    for metric in [
        MetricType::L1,
        MetricType::Linf,
        MetricType::Lp(3.0),
        MetricType::Canberra,
        MetricType::BrayCurtis,
    ] {
        check_against_naive(metric, 3);
    }
}

#[test]
fn test_small_fixture_knn_and_range() {
    let mut harness = TestHarness::new(2, MetricType::L2, 0);
    harness.insert(&[vec![0.0, 0.0], vec![1.0, 0.0], vec![0.0, 1.0], vec![5.0, 5.0]]);

    let knn = harness.index.search(&[0.0, 0.0], 2, None).unwrap();
    assert_eq!(knn[0][0], SearchHit::new(0, 0.0));
    assert_eq!(knn[0][1].distance, 1.0);
    assert!(!labels_of(&knn[0]).contains(&3));

    let range = harness.index.range_search(&[0.0, 0.0], 1.5, None).unwrap();
    let mut found = labels_of(&range[0]);
    found.sort_unstable();
    assert_eq!(found, vec![0, 1, 2]);
}

#[test]
fn test_range_search_matches_naive_scan() {
    for metric in [MetricType::L2, MetricType::InnerProduct] {
        let mut harness = TestHarness::new(4, metric, 17);
        harness.insert_random(120);
        let victims = harness.pick_live(15);
        harness.delete(&victims);

        let radius = if metric.is_similarity() { 0.6 } else { 1.2 };
        let query = harness.random_vector();
        let got = harness.index.range_search(&query, radius, None).unwrap();

        let mut want: Vec<SearchHit> = harness
            .live
            .iter()
            .map(|(label, v)| SearchHit::new(*label, score(metric, &query, v)))
            .filter(|h| {
                if metric.is_similarity() {
                    h.distance > radius
                } else {
                    h.distance < radius
                }
            })
            .collect();
        sort_hits(metric, &mut want);

        let mut got_labels = labels_of(&got[0]);
        let mut want_labels = labels_of(&want);
        got_labels.sort_unstable();
        want_labels.sort_unstable();
        assert_eq!(got_labels, want_labels, "metric {metric}");
    }
}

#[test]
fn test_selector_restricts_by_label() {
    let mut harness = TestHarness::new(3, MetricType::L2, 23);
    harness.insert_random(40);
    harness.delete(&[0, 1, 2]);
    harness.insert_random(3);

    let allowed = [5u64, 17, 40, 41];
    let sel = IdSelectorBitmap::from_ids(allowed);
    let query = harness.random_vector();
    let hits = harness.index.search(&query, 10, Some(&sel)).unwrap();
    let mut found = labels_of(&hits[0]);
    found.sort_unstable();
    assert_eq!(found, allowed.to_vec());

    let not = IdSelectorNot(IdSelectorBitmap::from_ids(allowed));
    let hits = harness.index.search(&query, 100, Some(&not)).unwrap();
    assert_eq!(hits[0].len(), 40 - allowed.len());
}

#[test]
fn test_closure_selector() {
    let mut harness = TestHarness::new(2, MetricType::InnerProduct, 31);
    harness.insert_random(30);

    let even = |label: u64| label % 2 == 0;
    let query = harness.random_vector();
    let hits = harness.index.search(&query, 30, Some(&even)).unwrap();
    assert_eq!(hits[0].len(), 15);
    assert!(hits[0].iter().all(|h| h.label % 2 == 0));
}

#[test]
fn test_compute_distance_subset_matches_scores() {
    let mut harness = TestHarness::new(4, MetricType::L2, 29);
    harness.insert_random(10);
    let q0 = harness.random_vector();
    let q1 = harness.random_vector();
    let queries: Vec<f32> = q0.iter().chain(q1.iter()).copied().collect();

    let candidates = [Some(3), Some(9), None, Some(0), Some(3), Some(5)];
    let out = harness
        .index
        .compute_distance_subset(&queries, 3, &candidates)
        .unwrap();

    let vec_of = |label: u64| harness.live[label as usize].1.clone();
    assert_eq!(out[0], score(MetricType::L2, &q0, &vec_of(3)));
    assert_eq!(out[1], score(MetricType::L2, &q0, &vec_of(9)));
    assert_eq!(out[2], f32::INFINITY);
    assert_eq!(out[3], score(MetricType::L2, &q1, &vec_of(0)));
    assert_eq!(out[5], score(MetricType::L2, &q1, &vec_of(5)));
}
