//! Distance computers over flat storage.
//!
//! A distance computer binds one query at a time and scores stored slots
//! against it. Searches create one per call; it is not meant to be shared
//! across threads because it owns the current query.

use flatmut_kernels::{
    extra_distance, inner_product, inner_product_batch_4, l2_sqr, l2_sqr_batch_4,
};
use flatmut_types::{MetricType, Slot};

use crate::codec::{FlatCodec, VectorCodec};
use crate::error::IndexError;
use crate::storage::FlatCodes;

/// Scores stored vectors against a bound query.
pub trait DistanceComputer {
    /// Metric the scores are expressed in.
    fn metric(&self) -> MetricType;

    /// Bind a new query, replacing the previous one.
    fn set_query(&mut self, query: &[f32]) -> Result<(), IndexError>;

    /// Score one slot against the bound query.
    fn distance_to_slot(&mut self, slot: Slot) -> Result<f32, IndexError>;

    /// Score four slots against the bound query.
    fn distances_batch_4(&mut self, slots: [Slot; 4]) -> Result<[f32; 4], IndexError> {
        Ok([
            self.distance_to_slot(slots[0])?,
            self.distance_to_slot(slots[1])?,
            self.distance_to_slot(slots[2])?,
            self.distance_to_slot(slots[3])?,
        ])
    }

    /// Score two stored vectors against each other. Needs no query.
    fn symmetric_distance(&self, i: Slot, j: Slot) -> Result<f32, IndexError>;

    /// Per-vector evaluations performed so far.
    fn evaluations(&self) -> usize;
}

/// State shared by every flat adapter.
struct Bound<'a> {
    storage: &'a FlatCodes<FlatCodec>,
    query: Vec<f32>,
    has_query: bool,
    ndis: usize,
}

impl<'a> Bound<'a> {
    fn new(storage: &'a FlatCodes<FlatCodec>) -> Self {
        Self {
            storage,
            query: Vec::new(),
            has_query: false,
            ndis: 0,
        }
    }

    fn set_query(&mut self, query: &[f32]) -> Result<(), IndexError> {
        let dim = self.storage.codec().dimension();
        if query.len() != dim {
            return Err(IndexError::DimensionMismatch {
                expected: dim,
                actual: query.len(),
            });
        }
        self.query.clear();
        self.query.extend_from_slice(query);
        self.has_query = true;
        Ok(())
    }

    fn query(&self) -> Result<&[f32], IndexError> {
        if !self.has_query {
            return Err(IndexError::QueryNotSet);
        }
        Ok(&self.query)
    }

    fn score(&mut self, slot: Slot, kernel: impl Fn(&[f32], &[f32]) -> f32) -> Result<f32, IndexError> {
        let d = kernel(self.query()?, self.storage.code(slot)?);
        self.ndis += 1;
        Ok(d)
    }

    fn score_4(
        &mut self,
        slots: [Slot; 4],
        kernel: fn(&[f32], &[f32], &[f32], &[f32], &[f32]) -> [f32; 4],
    ) -> Result<[f32; 4], IndexError> {
        let q = self.query()?;
        let y0 = self.storage.code(slots[0])?;
        let y1 = self.storage.code(slots[1])?;
        let y2 = self.storage.code(slots[2])?;
        let y3 = self.storage.code(slots[3])?;
        let out = kernel(q, y0, y1, y2, y3);
        self.ndis += 4;
        Ok(out)
    }

    fn symmetric(&self, i: Slot, j: Slot, kernel: impl Fn(&[f32], &[f32]) -> f32) -> Result<f32, IndexError> {
        Ok(kernel(self.storage.code(j)?, self.storage.code(i)?))
    }
}

/// Squared L2 against flat storage.
pub struct FlatL2Dis<'a> {
    inner: Bound<'a>,
}

impl<'a> FlatL2Dis<'a> {
    pub fn new(storage: &'a FlatCodes<FlatCodec>) -> Self {
        Self {
            inner: Bound::new(storage),
        }
    }
}

impl DistanceComputer for FlatL2Dis<'_> {
    fn metric(&self) -> MetricType {
        MetricType::L2
    }

    fn set_query(&mut self, query: &[f32]) -> Result<(), IndexError> {
        self.inner.set_query(query)
    }

    fn distance_to_slot(&mut self, slot: Slot) -> Result<f32, IndexError> {
        self.inner.score(slot, l2_sqr)
    }

    fn distances_batch_4(&mut self, slots: [Slot; 4]) -> Result<[f32; 4], IndexError> {
        self.inner.score_4(slots, l2_sqr_batch_4)
    }

    fn symmetric_distance(&self, i: Slot, j: Slot) -> Result<f32, IndexError> {
        self.inner.symmetric(i, j, l2_sqr)
    }

    fn evaluations(&self) -> usize {
        self.inner.ndis
    }
}

/// Inner product against flat storage.
pub struct FlatIpDis<'a> {
    inner: Bound<'a>,
}

impl<'a> FlatIpDis<'a> {
    pub fn new(storage: &'a FlatCodes<FlatCodec>) -> Self {
        Self {
            inner: Bound::new(storage),
        }
    }
}

impl DistanceComputer for FlatIpDis<'_> {
    fn metric(&self) -> MetricType {
        MetricType::InnerProduct
    }

    fn set_query(&mut self, query: &[f32]) -> Result<(), IndexError> {
        self.inner.set_query(query)
    }

    fn distance_to_slot(&mut self, slot: Slot) -> Result<f32, IndexError> {
        self.inner.score(slot, inner_product)
    }

    fn distances_batch_4(&mut self, slots: [Slot; 4]) -> Result<[f32; 4], IndexError> {
        self.inner.score_4(slots, inner_product_batch_4)
    }

    fn symmetric_distance(&self, i: Slot, j: Slot) -> Result<f32, IndexError> {
        self.inner.symmetric(i, j, inner_product)
    }

    fn evaluations(&self) -> usize {
        self.inner.ndis
    }
}

/// Any other metric, scored by the extra-metrics kernels.
///
/// Batches fall back to four scalar evaluations.
pub struct ExtraMetricDis<'a> {
    inner: Bound<'a>,
    metric: MetricType,
}

impl<'a> ExtraMetricDis<'a> {
    pub fn new(storage: &'a FlatCodes<FlatCodec>, metric: MetricType) -> Self {
        Self {
            inner: Bound::new(storage),
            metric,
        }
    }
}

impl DistanceComputer for ExtraMetricDis<'_> {
    fn metric(&self) -> MetricType {
        self.metric
    }

    fn set_query(&mut self, query: &[f32]) -> Result<(), IndexError> {
        self.inner.set_query(query)
    }

    fn distance_to_slot(&mut self, slot: Slot) -> Result<f32, IndexError> {
        let metric = self.metric;
        self.inner
            .score(slot, |a, b| extra_distance(metric, a, b))
    }

    fn symmetric_distance(&self, i: Slot, j: Slot) -> Result<f32, IndexError> {
        self.inner
            .symmetric(i, j, |a, b| extra_distance(self.metric, a, b))
    }

    fn evaluations(&self) -> usize {
        self.inner.ndis
    }
}

/// Distance computer for the storage's metric.
pub fn distance_computer(storage: &FlatCodes<FlatCodec>) -> Box<dyn DistanceComputer + '_> {
    match storage.metric() {
        MetricType::L2 => Box::new(FlatL2Dis::new(storage)),
        MetricType::InnerProduct => Box::new(FlatIpDis::new(storage)),
        other => Box::new(ExtraMetricDis::new(storage, other)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn storage(metric: MetricType) -> FlatCodes<FlatCodec> {
        let mut s = FlatCodes::new(FlatCodec::new(2), metric).unwrap();
        s.add(&[0.0, 0.0, 1.0, 0.0, 0.0, 1.0, 5.0, 5.0, 2.0, 2.0])
            .unwrap();
        s
    }

    #[test]
    fn test_factory_selects_by_metric() {
        let s = storage(MetricType::L2);
        assert_eq!(distance_computer(&s).metric(), MetricType::L2);

        let s = storage(MetricType::InnerProduct);
        assert_eq!(distance_computer(&s).metric(), MetricType::InnerProduct);

        let s = storage(MetricType::Lp(3.0));
        assert_eq!(distance_computer(&s).metric(), MetricType::Lp(3.0));
    }

    #[test]
    fn test_l2_distance_to_slot() {
        let s = storage(MetricType::L2);
        let mut dc = distance_computer(&s);
        dc.set_query(&[1.0, 1.0]).unwrap();
        assert_eq!(dc.distance_to_slot(0).unwrap(), 2.0);
        assert_eq!(dc.distance_to_slot(3).unwrap(), 32.0);
        assert_eq!(dc.evaluations(), 2);
    }

    #[test]
    fn test_batch_4_matches_single() {
        for metric in [MetricType::L2, MetricType::InnerProduct, MetricType::L1] {
            let s = storage(metric);
            let mut dc = distance_computer(&s);
            dc.set_query(&[0.5, -1.5]).unwrap();

            let batch = dc.distances_batch_4([4, 0, 3, 1]).unwrap();
            let single = [
                dc.distance_to_slot(4).unwrap(),
                dc.distance_to_slot(0).unwrap(),
                dc.distance_to_slot(3).unwrap(),
                dc.distance_to_slot(1).unwrap(),
            ];
            for (b, s) in batch.iter().zip(single.iter()) {
                assert!((b - s).abs() < 1e-6, "{metric}: {b} vs {s}");
            }
            assert_eq!(dc.evaluations(), 8);
        }
    }

    #[test]
    fn test_symmetric_distance_needs_no_query() {
        let s = storage(MetricType::L2);
        let dc = distance_computer(&s);
        assert_eq!(dc.symmetric_distance(1, 2).unwrap(), 2.0);
        assert_eq!(dc.symmetric_distance(2, 1).unwrap(), 2.0);

        let s = storage(MetricType::InnerProduct);
        let dc = distance_computer(&s);
        assert_eq!(dc.symmetric_distance(3, 4).unwrap(), 20.0);
        assert_eq!(dc.evaluations(), 0);
    }

    #[test]
    fn test_query_required() {
        let s = storage(MetricType::L2);
        let mut dc = distance_computer(&s);
        assert!(matches!(dc.distance_to_slot(0), Err(IndexError::QueryNotSet)));
        assert!(matches!(
            dc.distances_batch_4([0, 1, 2, 3]),
            Err(IndexError::QueryNotSet)
        ));
        assert_eq!(dc.evaluations(), 0);
    }

    #[test]
    fn test_rebinding_query() {
        let s = storage(MetricType::InnerProduct);
        let mut dc = distance_computer(&s);
        dc.set_query(&[1.0, 0.0]).unwrap();
        assert_eq!(dc.distance_to_slot(1).unwrap(), 1.0);
        dc.set_query(&[0.0, 3.0]).unwrap();
        assert_eq!(dc.distance_to_slot(1).unwrap(), 0.0);
        assert_eq!(dc.distance_to_slot(2).unwrap(), 3.0);
    }

    #[test]
    fn test_bad_query_and_slot() {
        let s = storage(MetricType::L2);
        let mut dc = distance_computer(&s);
        assert!(matches!(
            dc.set_query(&[1.0]),
            Err(IndexError::DimensionMismatch {
                expected: 2,
                actual: 1
            })
        ));
        dc.set_query(&[1.0, 1.0]).unwrap();
        assert!(matches!(
            dc.distance_to_slot(5),
            Err(IndexError::OutOfBounds { .. })
        ));
        assert!(matches!(
            dc.symmetric_distance(0, 9),
            Err(IndexError::OutOfBounds { .. })
        ));
    }
}
