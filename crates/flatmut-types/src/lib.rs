//! # flatmut-types
//!
//! Shared types for the flatmut vector index.
//!
//! This crate defines the vocabulary used by every other crate:
//! - Metrics: which distance or similarity a search ranks by
//! - Identifiers: caller-visible labels and internal storage slots
//! - Settings: layered configuration (defaults, file, environment)
//!
//! ## Usage
//!
//! ```rust
//! use flatmut_types::MetricType;
//!
//! let metric: MetricType = "ip".parse().unwrap();
//! assert!(metric.is_similarity());
//! ```

pub mod config;
pub mod error;
pub mod metric;

pub use config::Settings;
pub use error::ConfigError;
pub use metric::MetricType;

/// Caller-visible identifier of the vector currently occupying a slot.
///
/// Labels are minted monotonically and never reused.
pub type Label = u64;

/// Internal position in the code buffer.
pub type Slot = usize;
