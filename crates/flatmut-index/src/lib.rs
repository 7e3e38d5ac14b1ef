//! # flatmut-index
//!
//! Mutable exhaustive vector index.
//!
//! Vectors are stored contiguously, one fixed-size code per slot, and every
//! query is compared against every slot. Deletion is logical: a deleted slot
//! is tombstoned and later overwritten by the next insert, which receives a
//! fresh label. Labels are never reused.
//!
//! ## Features
//! - Squared L2 and inner product search with batched kernels
//! - Extra metrics (L1, Linf, Lp, Canberra, BrayCurtis, JensenShannon, Jaccard, NaNEuclidean)
//! - Range search and per-query candidate scoring
//! - Label-based selectors to restrict search
//!
//! ```
//! use flatmut_index::{FlatIndex, VectorIndex};
//! use flatmut_types::MetricType;
//!
//! let mut index = FlatIndex::new(2, MetricType::L2).unwrap();
//! let labels = index.add(&[0.0, 0.0, 1.0, 0.0]).unwrap();
//! assert_eq!(labels, vec![0, 1]);
//!
//! let hits = index.search(&[0.9, 0.0], 1, None).unwrap();
//! assert_eq!(hits[0][0].label, 1);
//! ```

pub mod codec;
pub mod distance;
pub mod error;
pub mod flat;
pub mod index;
pub mod storage;

pub use codec::{FlatCodec, VectorCodec};
pub use distance::{distance_computer, DistanceComputer, ExtraMetricDis, FlatIpDis, FlatL2Dis};
pub use error::IndexError;
pub use flat::FlatIndex;
pub use index::{IndexStats, SearchHit, VectorIndex};
pub use storage::FlatCodes;
