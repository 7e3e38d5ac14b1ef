//! Index error types.

use flatmut_kernels::PackError;
use flatmut_types::{ConfigError, Label, MetricType, Slot};
use thiserror::Error;

/// Errors that can occur during index operations.
///
/// Every variant is a caller-side precondition failure or an allocation
/// failure; none of them is transient.
#[derive(Debug, Error)]
pub enum IndexError {
    /// Insert into an index that has not been trained
    #[error("Index is not trained")]
    NotTrained,

    /// k must be positive
    #[error("Invalid k: {0}")]
    InvalidK(usize),

    /// Dimension mismatch
    #[error("Dimension mismatch: expected {expected}, got {actual}")]
    DimensionMismatch { expected: usize, actual: usize },

    /// Operation not defined for the index metric
    #[error("Metric {metric} not supported for {operation}")]
    UnsupportedMetric {
        metric: MetricType,
        operation: &'static str,
    },

    /// Restricting selectors are undefined for dissimilarity extra metrics
    #[error("Selector not supported with metric {0}")]
    SelectorNotSupported(MetricType),

    /// Label was never issued or has been retired
    #[error("Label not found: {0}")]
    LabelNotFound(Label),

    /// Slot behind the label is already tombstoned
    #[error("Label {label} already deleted (slot {slot})")]
    AlreadyDeleted { label: Label, slot: Slot },

    /// Slot range outside [0, physical_count)
    #[error("Slot range {start}..{start}+{len} out of bounds (total {total})")]
    OutOfBounds { start: Slot, len: usize, total: usize },

    /// Distance computer used before a query was bound
    #[error("No query bound to distance computer")]
    QueryNotSet,

    /// Code buffer could not grow
    #[error("Capacity exhausted: {0}")]
    CapacityExhausted(String),

    /// Candidate list does not hold k entries per query
    #[error("Candidate count mismatch: expected {expected}, got {actual}")]
    CandidateCount { expected: usize, actual: usize },

    /// Code packer geometry error
    #[error("Pack error: {0}")]
    Pack(#[from] PackError),

    /// Configuration error
    #[error(transparent)]
    Config(#[from] ConfigError),
}
