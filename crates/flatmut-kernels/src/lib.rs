//! # flatmut-kernels
//!
//! Leaf building blocks consumed by the flatmut index through narrow contracts:
//! - `distances`: L2 / inner-product kernels, 4-wide batched and by-index variants
//! - `extra`: the remaining metrics (L1, Linf, Lp, Canberra, ...)
//! - `heap`: bounded top-k selection keyed by (distance, id)
//! - `selector`: candidate-restricting predicates over ids
//! - `packer`: fixed-stride code (de)serialization helpers
//!
//! Nothing here knows about slots, labels or tombstones.

pub mod distances;
pub mod extra;
pub mod heap;
pub mod packer;
pub mod selector;

pub use distances::{
    inner_product, inner_product_batch_4, inner_products_by_idx, l2_sqr, l2_sqr_batch_4,
    l2_sqr_by_idx,
};
pub use extra::extra_distance;
pub use heap::{HeapOrder, TopK};
pub use packer::{CodePacker, CodePackerFlat, PackError};
pub use selector::{IdSelector, IdSelectorArray, IdSelectorBitmap, IdSelectorNot, IdSelectorRange};
