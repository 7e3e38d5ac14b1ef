//! End-to-end test infrastructure for flatmut.
//!
//! Provides a shared TestHarness and helper functions for E2E tests
//! covering insert, delete, recycle and search across the whole stack.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use flatmut_index::{FlatIndex, SearchHit, VectorIndex};
use flatmut_kernels::{extra_distance, inner_product, l2_sqr};
use flatmut_types::{Label, MetricType, Slot};

/// Shared test harness for E2E tests.
///
/// Owns an index plus a shadow copy of every live vector keyed by label, so
/// tests can compare index answers against a naive scan.
pub struct TestHarness {
    /// Index under test
    pub index: FlatIndex,
    /// Live vectors by label, in insertion order
    pub live: Vec<(Label, Vec<f32>)>,
    rng: StdRng,
}

impl TestHarness {
    /// Create an empty harness with a seeded generator.
    pub fn new(dim: usize, metric: MetricType, seed: u64) -> Self {
        Self {
            index: FlatIndex::new(dim, metric).expect("Failed to create index"),
            live: Vec::new(),
            rng: StdRng::seed_from_u64(seed),
        }
    }

    pub fn dim(&self) -> usize {
        self.index.dimension()
    }

    /// Random vector with components in `[-1, 1)`.
    pub fn random_vector(&mut self) -> Vec<f32> {
        let dim = self.dim();
        (0..dim).map(|_| self.rng.random_range(-1.0..1.0)).collect()
    }

    /// Insert `n` random vectors and record them. Returns their labels.
    pub fn insert_random(&mut self, n: usize) -> Vec<Label> {
        let rows: Vec<Vec<f32>> = (0..n).map(|_| self.random_vector()).collect();
        self.insert(&rows)
    }

    /// Insert the given rows and record them. Returns their labels.
    pub fn insert(&mut self, rows: &[Vec<f32>]) -> Vec<Label> {
        let flat: Vec<f32> = rows.iter().flatten().copied().collect();
        let labels = self.index.add(&flat).expect("Failed to add vectors");
        self.live
            .extend(labels.iter().copied().zip(rows.iter().cloned()));
        labels
    }

    /// Delete labels from the index and from the shadow copy.
    pub fn delete(&mut self, labels: &[Label]) -> usize {
        let pending = self
            .index
            .mark_deleted(labels)
            .expect("Failed to delete labels");
        self.live.retain(|(label, _)| !labels.contains(label));
        pending
    }

    /// Pick `n` distinct live labels at random.
    pub fn pick_live(&mut self, n: usize) -> Vec<Label> {
        let mut pool: Vec<Label> = self.live.iter().map(|(l, _)| *l).collect();
        let mut picked = Vec::with_capacity(n);
        while picked.len() < n && !pool.is_empty() {
            let i = self.rng.random_range(0..pool.len());
            picked.push(pool.swap_remove(i));
        }
        picked
    }

    /// Naive top-k over the shadow copy, best first, ties by label.
    pub fn naive_search(&self, query: &[f32], k: usize) -> Vec<SearchHit> {
        let metric = self.index.metric();
        let mut scored: Vec<SearchHit> = self
            .live
            .iter()
            .map(|(label, v)| SearchHit::new(*label, score(metric, query, v)))
            .collect();
        sort_hits(metric, &mut scored);
        scored.truncate(k);
        scored
    }

    /// Slots currently holding a live vector, with their labels.
    pub fn live_slots(&self) -> Vec<(Slot, Label)> {
        let storage = self.index.storage();
        (0..storage.physical_count())
            .filter(|s| !storage.is_deleted(*s))
            .filter_map(|s| storage.label_of(s).map(|l| (s, l)))
            .collect()
    }
}

/// Score one pair the way the index does.
pub fn score(metric: MetricType, a: &[f32], b: &[f32]) -> f32 {
    match metric {
        MetricType::L2 => l2_sqr(a, b),
        MetricType::InnerProduct => inner_product(a, b),
        other => extra_distance(other, a, b),
    }
}

/// Sort hits best first for the metric, ties by label.
pub fn sort_hits(metric: MetricType, hits: &mut [SearchHit]) {
    if metric.is_similarity() {
        hits.sort_by(|a, b| {
            b.distance
                .total_cmp(&a.distance)
                .then(a.label.cmp(&b.label))
        });
    } else {
        hits.sort_by(|a, b| {
            a.distance
                .total_cmp(&b.distance)
                .then(a.label.cmp(&b.label))
        });
    }
}

/// Labels of a hit list, in order.
pub fn labels_of(hits: &[SearchHit]) -> Vec<Label> {
    hits.iter().map(|h| h.label).collect()
}
