//! Metric types.
//!
//! `L2` and `InnerProduct` are the primary metrics: every index operation
//! supports them. The remaining metrics are scored by the extra-metrics
//! kernels and are only available to k-NN search.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// Metric used to compare a query against stored vectors.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum MetricType {
    /// Squared Euclidean distance. Smaller is better.
    #[default]
    L2,
    /// Dot product. Larger is better.
    InnerProduct,
    /// Manhattan distance.
    L1,
    /// Chebyshev distance.
    Linf,
    /// Sum of `|a - b|^p`, no root taken. The argument is `p`.
    Lp(f32),
    Canberra,
    BrayCurtis,
    JensenShannon,
    /// Weighted Jaccard similarity (`sum(min) / sum(max)`). Larger is better.
    Jaccard,
    /// Euclidean distance over dimensions where neither side is NaN.
    NaNEuclidean,
}

impl MetricType {
    /// True when larger scores rank first.
    pub fn is_similarity(&self) -> bool {
        matches!(self, MetricType::InnerProduct | MetricType::Jaccard)
    }

    /// True for the metrics every operation supports.
    pub fn is_primary(&self) -> bool {
        matches!(self, MetricType::L2 | MetricType::InnerProduct)
    }

    pub fn name(&self) -> &'static str {
        match self {
            MetricType::L2 => "l2",
            MetricType::InnerProduct => "ip",
            MetricType::L1 => "l1",
            MetricType::Linf => "linf",
            MetricType::Lp(_) => "lp",
            MetricType::Canberra => "canberra",
            MetricType::BrayCurtis => "braycurtis",
            MetricType::JensenShannon => "jensenshannon",
            MetricType::Jaccard => "jaccard",
            MetricType::NaNEuclidean => "naneuclidean",
        }
    }
}

impl fmt::Display for MetricType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MetricType::Lp(p) => write!(f, "lp:{}", p),
            other => f.write_str(other.name()),
        }
    }
}

impl FromStr for MetricType {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let lower = s.trim().to_ascii_lowercase();
        if let Some(arg) = lower.strip_prefix("lp:") {
            let p: f32 = arg
                .parse()
                .map_err(|_| ConfigError::InvalidInput(format!("invalid Lp argument: {}", arg)))?;
            if p.is_nan() || p <= 0.0 {
                return Err(ConfigError::InvalidInput(format!(
                    "Lp argument must be > 0, got {}",
                    p
                )));
            }
            return Ok(MetricType::Lp(p));
        }

        match lower.as_str() {
            "l2" => Ok(MetricType::L2),
            "ip" | "inner_product" => Ok(MetricType::InnerProduct),
            "l1" => Ok(MetricType::L1),
            "linf" => Ok(MetricType::Linf),
            "canberra" => Ok(MetricType::Canberra),
            "braycurtis" => Ok(MetricType::BrayCurtis),
            "jensenshannon" => Ok(MetricType::JensenShannon),
            "jaccard" => Ok(MetricType::Jaccard),
            "naneuclidean" => Ok(MetricType::NaNEuclidean),
            _ => Err(ConfigError::InvalidInput(format!("unknown metric: {}", s))),
        }
    }
}

impl TryFrom<String> for MetricType {
    type Error = ConfigError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<MetricType> for String {
    fn from(metric: MetricType) -> Self {
        metric.to_string()
    }
}
