//! Exhaustive search over flat float storage.
//!
//! Every query is scored against every candidate slot. Candidates are slots
//! in `[0, physical_count)` that pass the selector (evaluated on labels) and,
//! unless disabled, are not tombstoned. Scoring goes through the metric's
//! distance computer four slots at a time; winners are translated from slots
//! to labels before they are returned.

use flatmut_kernels::{
    inner_products_by_idx, l2_sqr_by_idx, CodePackerFlat, IdSelector, TopK,
};
use flatmut_types::{Label, MetricType, Settings, Slot};
use tracing::{debug, info};

use crate::codec::FlatCodec;
use crate::distance::{self, DistanceComputer};
use crate::error::IndexError;
use crate::index::{IndexStats, SearchHit, VectorIndex};
use crate::storage::FlatCodes;

/// Mutable brute-force index over raw float vectors.
#[derive(Debug, Clone)]
pub struct FlatIndex {
    storage: FlatCodes<FlatCodec>,
    exclude_tombstones: bool,
}

impl FlatIndex {
    /// Create an empty index. Tombstoned vectors are excluded from search.
    pub fn new(dimension: usize, metric: MetricType) -> Result<Self, IndexError> {
        Ok(Self {
            storage: FlatCodes::new(FlatCodec::new(dimension), metric)?,
            exclude_tombstones: true,
        })
    }

    /// Create an index from loaded settings.
    pub fn from_settings(settings: &Settings) -> Result<Self, IndexError> {
        settings.validate()?;
        let mut index = Self::new(settings.dimension, settings.metric)?;
        index.exclude_tombstones = settings.exclude_tombstones;
        if settings.initial_capacity > 0 {
            index.storage.reserve(settings.initial_capacity)?;
        }
        info!(
            dim = settings.dimension,
            metric = %settings.metric,
            exclude_tombstones = settings.exclude_tombstones,
            capacity = settings.initial_capacity,
            "Created flat index"
        );
        Ok(index)
    }

    /// Read-only view of the underlying storage.
    pub fn storage(&self) -> &FlatCodes<FlatCodec> {
        &self.storage
    }

    pub fn exclude_tombstones(&self) -> bool {
        self.exclude_tombstones
    }

    /// Choose whether tombstoned slots may appear in search results.
    ///
    /// When included, a deleted vector is reported under its last label
    /// until its slot is recycled.
    pub fn set_exclude_tombstones(&mut self, exclude: bool) {
        self.exclude_tombstones = exclude;
    }

    /// Decode slots `[start, start + n)`.
    pub fn reconstruct_n(&self, start: Slot, n: usize) -> Result<Vec<f32>, IndexError> {
        self.storage.reconstruct_n(start, n)
    }

    pub fn code_packer(&self) -> CodePackerFlat {
        self.storage.code_packer()
    }

    /// Distance computer for the index metric.
    pub fn distance_computer(&self) -> Box<dyn DistanceComputer + '_> {
        distance::distance_computer(&self.storage)
    }

    /// Distances between each query and its own `k` candidate labels.
    ///
    /// `candidates` holds `k` entries per query; `None` entries score `+inf`
    /// under L2 and `-inf` under inner product. No ordering is applied.
    pub fn compute_distance_subset(
        &self,
        queries: &[f32],
        k: usize,
        candidates: &[Option<Label>],
    ) -> Result<Vec<f32>, IndexError> {
        let slots = candidates
            .iter()
            .map(|c| match c {
                Some(label) => self
                    .storage
                    .slot_of(*label)
                    .map(Some)
                    .ok_or(IndexError::LabelNotFound(*label)),
                None => Ok(None),
            })
            .collect::<Result<Vec<_>, _>>()?;
        self.compute_distance_subset_slots(queries, k, &slots)
    }

    /// Same as [`compute_distance_subset`](Self::compute_distance_subset),
    /// addressed by slot.
    pub fn compute_distance_subset_slots(
        &self,
        queries: &[f32],
        k: usize,
        candidates: &[Option<Slot>],
    ) -> Result<Vec<f32>, IndexError> {
        let metric = self.metric();
        if !metric.is_primary() {
            return Err(IndexError::UnsupportedMetric {
                metric,
                operation: "compute_distance_subset",
            });
        }
        if k == 0 {
            return Err(IndexError::InvalidK(k));
        }
        let nq = self.query_count(queries)?;
        let expected = nq.checked_mul(k).ok_or(IndexError::InvalidK(k))?;
        if candidates.len() != expected {
            return Err(IndexError::CandidateCount {
                expected,
                actual: candidates.len(),
            });
        }
        let total = self.storage.physical_count();
        if let Some(slot) = candidates.iter().flatten().find(|s| **s >= total) {
            return Err(IndexError::OutOfBounds {
                start: *slot,
                len: 1,
                total,
            });
        }

        let base = self.storage.codes_range(0, total)?;
        let dim = self.dimension();
        let mut out = vec![0.0f32; expected];
        match metric {
            MetricType::InnerProduct => {
                inner_products_by_idx(&mut out, queries, base, candidates, dim, k)
            }
            _ => l2_sqr_by_idx(&mut out, queries, base, candidates, dim, k),
        }
        Ok(out)
    }

    /// Number of queries in a flat query buffer.
    fn query_count(&self, queries: &[f32]) -> Result<usize, IndexError> {
        let dim = self.dimension();
        if queries.len() % dim != 0 {
            return Err(IndexError::DimensionMismatch {
                expected: dim,
                actual: queries.len() % dim,
            });
        }
        Ok(queries.len() / dim)
    }

    fn is_candidate(&self, slot: Slot, selector: Option<&dyn IdSelector>) -> bool {
        if self.exclude_tombstones && self.storage.is_deleted(slot) {
            return false;
        }
        match (selector, self.storage.label_of(slot)) {
            (Some(sel), Some(label)) => sel.is_member(label),
            (None, Some(_)) => true,
            (_, None) => false,
        }
    }

    /// Score every candidate slot against the bound query.
    fn scan<D>(
        &self,
        dc: &mut D,
        selector: Option<&dyn IdSelector>,
        mut visit: impl FnMut(f32, Slot),
    ) -> Result<(), IndexError>
    where
        D: DistanceComputer + ?Sized,
    {
        let mut batch = [0 as Slot; 4];
        let mut filled = 0;
        for slot in 0..self.storage.physical_count() {
            if !self.is_candidate(slot, selector) {
                continue;
            }
            batch[filled] = slot;
            filled += 1;
            if filled == 4 {
                let dis = dc.distances_batch_4(batch)?;
                for (d, s) in dis.into_iter().zip(batch) {
                    visit(d, s);
                }
                filled = 0;
            }
        }
        for &slot in &batch[..filled] {
            visit(dc.distance_to_slot(slot)?, slot);
        }
        Ok(())
    }

    fn to_hits(&self, scored: impl IntoIterator<Item = (f32, Slot)>) -> Vec<SearchHit> {
        scored
            .into_iter()
            .filter_map(|(d, slot)| {
                self.storage
                    .label_of(slot)
                    .map(|label| SearchHit::new(label, d))
            })
            .collect()
    }
}

impl VectorIndex for FlatIndex {
    fn dimension(&self) -> usize {
        self.storage.dimension()
    }

    fn metric(&self) -> MetricType {
        self.storage.metric()
    }

    fn is_trained(&self) -> bool {
        self.storage.is_trained()
    }

    fn len(&self) -> usize {
        self.storage.len()
    }

    fn add(&mut self, x: &[f32]) -> Result<Vec<Label>, IndexError> {
        self.storage.add(x)
    }

    fn search(
        &self,
        queries: &[f32],
        k: usize,
        selector: Option<&dyn IdSelector>,
    ) -> Result<Vec<Vec<SearchHit>>, IndexError> {
        if k == 0 {
            return Err(IndexError::InvalidK(k));
        }
        let metric = self.metric();
        if selector.is_some() && !metric.is_primary() && !metric.is_similarity() {
            return Err(IndexError::SelectorNotSupported(metric));
        }
        let nq = self.query_count(queries)?;

        let mut dc = self.distance_computer();
        let mut results = Vec::with_capacity(nq);
        for query in queries.chunks_exact(self.dimension()) {
            dc.set_query(query)?;
            let mut top = if metric.is_similarity() {
                TopK::largest(k)
            } else {
                TopK::smallest(k)
            };
            self.scan(dc.as_mut(), selector, |d, slot| {
                top.push(d, slot);
            })?;
            results.push(self.to_hits(top.into_sorted()));
        }

        debug!(
            nq = nq,
            k = k,
            metric = %metric,
            evaluations = dc.evaluations(),
            "Search complete"
        );
        Ok(results)
    }

    fn range_search(
        &self,
        queries: &[f32],
        radius: f32,
        selector: Option<&dyn IdSelector>,
    ) -> Result<Vec<Vec<SearchHit>>, IndexError> {
        let metric = self.metric();
        if !metric.is_primary() {
            return Err(IndexError::UnsupportedMetric {
                metric,
                operation: "range_search",
            });
        }
        let nq = self.query_count(queries)?;
        let similarity = metric.is_similarity();

        let mut dc = self.distance_computer();
        let mut results = Vec::with_capacity(nq);
        for query in queries.chunks_exact(self.dimension()) {
            dc.set_query(query)?;
            let mut within = Vec::new();
            self.scan(dc.as_mut(), selector, |d, slot| {
                let hit = if similarity { d > radius } else { d < radius };
                if hit {
                    within.push((d, slot));
                }
            })?;
            if similarity {
                within.sort_by(|a, b| b.0.total_cmp(&a.0).then(a.1.cmp(&b.1)));
            } else {
                within.sort_by(|a, b| a.0.total_cmp(&b.0).then(a.1.cmp(&b.1)));
            }
            results.push(self.to_hits(within));
        }

        debug!(
            nq = nq,
            radius = radius,
            metric = %metric,
            found = results.iter().map(Vec::len).sum::<usize>(),
            "Range search complete"
        );
        Ok(results)
    }

    fn mark_deleted(&mut self, labels: &[Label]) -> Result<usize, IndexError> {
        self.storage.mark_deleted(labels)
    }

    fn reconstruct(&self, label: Label) -> Result<Vec<f32>, IndexError> {
        self.storage.reconstruct(label)
    }

    fn stats(&self) -> IndexStats {
        IndexStats {
            live: self.storage.len(),
            physical: self.storage.physical_count(),
            pending_removals: self.storage.pending_removals(),
            dimension: self.storage.dimension(),
            code_size: self.storage.code_size(),
            metric: self.storage.metric(),
        }
    }

    fn reset(&mut self) {
        self.storage.reset();
    }
}
