//! Vector index trait and types.
//!
//! Defines the interface for mutable exhaustive search.

use flatmut_kernels::IdSelector;
use flatmut_types::{Label, MetricType};
use serde::Serialize;

use crate::error::IndexError;

/// One search result.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct SearchHit {
    /// Label of the matching vector
    pub label: Label,
    /// Distance or similarity (lower is better for L2, higher for inner product)
    pub distance: f32,
}

impl SearchHit {
    pub fn new(label: Label, distance: f32) -> Self {
        Self { label, distance }
    }
}

/// Index statistics
#[derive(Debug, Clone, Serialize)]
pub struct IndexStats {
    /// Live vectors
    pub live: usize,
    /// Slots ever allocated, including tombstones
    pub physical: usize,
    /// Tombstoned slots waiting to be recycled
    pub pending_removals: usize,
    /// Vector dimension
    pub dimension: usize,
    /// Bytes per stored vector
    pub code_size: usize,
    /// Metric used by search
    pub metric: MetricType,
}

/// Trait for mutable vector indexes.
///
/// Queries are passed as `n * dimension` floats; results come back per query.
/// Implementations are single-writer: wrap them in a lock to share across
/// threads.
pub trait VectorIndex: Send + Sync {
    /// Get the vector dimension
    fn dimension(&self) -> usize;

    /// Get the metric used for ranking
    fn metric(&self) -> MetricType;

    /// Whether the index accepts inserts
    fn is_trained(&self) -> bool;

    /// Get the number of live vectors
    fn len(&self) -> usize;

    /// Check if the index is empty
    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Add vectors, returning their labels in input order.
    fn add(&mut self, x: &[f32]) -> Result<Vec<Label>, IndexError>;

    /// k nearest neighbours per query, best first.
    fn search(
        &self,
        queries: &[f32],
        k: usize,
        selector: Option<&dyn IdSelector>,
    ) -> Result<Vec<Vec<SearchHit>>, IndexError>;

    /// Every vector within `radius` of each query, best first.
    fn range_search(
        &self,
        queries: &[f32],
        radius: f32,
        selector: Option<&dyn IdSelector>,
    ) -> Result<Vec<Vec<SearchHit>>, IndexError>;

    /// Logically delete vectors. Returns the number of slots awaiting reuse.
    fn mark_deleted(&mut self, labels: &[Label]) -> Result<usize, IndexError>;

    /// Decode the vector a label refers to.
    fn reconstruct(&self, label: Label) -> Result<Vec<f32>, IndexError>;

    /// Get index statistics
    fn stats(&self) -> IndexStats;

    /// Clear all vectors from the index
    fn reset(&mut self);
}
