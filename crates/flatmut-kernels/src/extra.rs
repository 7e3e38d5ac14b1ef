//! Extra metrics.
//!
//! Scores for every metric besides the two primary ones. Primary metrics
//! are accepted too and forwarded to [`crate::distances`], so callers can
//! use one entry point per metric.

use flatmut_types::MetricType;

use crate::distances::{inner_product, l2_sqr};

/// Score `a` against `b` under `metric`.
pub fn extra_distance(metric: MetricType, a: &[f32], b: &[f32]) -> f32 {
    match metric {
        MetricType::L2 => l2_sqr(a, b),
        MetricType::InnerProduct => inner_product(a, b),
        MetricType::L1 => pairs(a, b).map(|(x, y)| (x - y).abs()).sum(),
        MetricType::Linf => pairs(a, b).map(|(x, y)| (x - y).abs()).fold(0.0, f32::max),
        MetricType::Lp(p) => pairs(a, b).map(|(x, y)| (x - y).abs().powf(p)).sum(),
        MetricType::Canberra => canberra(a, b),
        MetricType::BrayCurtis => bray_curtis(a, b),
        MetricType::JensenShannon => jensen_shannon(a, b),
        MetricType::Jaccard => jaccard(a, b),
        MetricType::NaNEuclidean => nan_euclidean(a, b),
    }
}

fn pairs<'a>(a: &'a [f32], b: &'a [f32]) -> impl Iterator<Item = (f32, f32)> + 'a {
    a.iter().copied().zip(b.iter().copied())
}

fn canberra(a: &[f32], b: &[f32]) -> f32 {
    pairs(a, b)
        .filter_map(|(x, y)| {
            let denom = x.abs() + y.abs();
            // 0/0 terms contribute nothing
            (denom != 0.0).then(|| (x - y).abs() / denom)
        })
        .sum()
}

fn bray_curtis(a: &[f32], b: &[f32]) -> f32 {
    let (num, denom) = pairs(a, b).fold((0.0f32, 0.0f32), |(n, d), (x, y)| {
        (n + (x - y).abs(), d + (x + y).abs())
    });
    num / denom
}

fn jensen_shannon(a: &[f32], b: &[f32]) -> f32 {
    let total: f32 = pairs(a, b)
        .map(|(x, y)| {
            let m = 0.5 * (x + y);
            let mut term = 0.0;
            if x > 0.0 {
                term += x * (x / m).ln();
            }
            if y > 0.0 {
                term += y * (y / m).ln();
            }
            term
        })
        .sum();
    0.5 * total
}

fn jaccard(a: &[f32], b: &[f32]) -> f32 {
    let (num, denom) = pairs(a, b).fold((0.0f32, 0.0f32), |(n, d), (x, y)| {
        (n + x.min(y), d + x.max(y))
    });
    num / denom
}

fn nan_euclidean(a: &[f32], b: &[f32]) -> f32 {
    let mut present = 0usize;
    let mut sum = 0.0f32;
    for (x, y) in pairs(a, b) {
        if x.is_nan() || y.is_nan() {
            continue;
        }
        let diff = x - y;
        sum += diff * diff;
        present += 1;
    }
    if present == 0 {
        return f32::NAN;
    }
    (a.len() as f32 / present as f32 * sum).sqrt()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn close(a: f32, b: f32) -> bool {
        (a - b).abs() < 1e-5
    }

    #[test]
    fn test_l1_linf_lp() {
        let a = [1.0, -2.0, 3.0];
        let b = [0.0, 0.0, 0.0];
        assert!(close(extra_distance(MetricType::L1, &a, &b), 6.0));
        assert!(close(extra_distance(MetricType::Linf, &a, &b), 3.0));
        assert!(close(extra_distance(MetricType::Lp(2.0), &a, &b), 14.0));
    }

    #[test]
    fn test_primary_metrics_forwarded() {
        let a = [1.0, 2.0];
        let b = [3.0, 4.0];
        assert!(close(extra_distance(MetricType::L2, &a, &b), 8.0));
        assert!(close(extra_distance(MetricType::InnerProduct, &a, &b), 11.0));
    }

    #[test]
    fn test_canberra_skips_zero_terms() {
        let a = [0.0, 1.0];
        let b = [0.0, 3.0];
        assert!(close(extra_distance(MetricType::Canberra, &a, &b), 0.5));
    }

    #[test]
    fn test_bray_curtis() {
        let a = [1.0, 2.0];
        let b = [3.0, 2.0];
        assert!(close(extra_distance(MetricType::BrayCurtis, &a, &b), 0.25));
    }

    #[test]
    fn test_jensen_shannon_identical_is_zero() {
        let a = [0.25, 0.25, 0.5];
        assert!(close(extra_distance(MetricType::JensenShannon, &a, &a), 0.0));

        let p = [1.0, 0.0];
        let q = [0.0, 1.0];
        assert!(close(
            extra_distance(MetricType::JensenShannon, &p, &q),
            std::f32::consts::LN_2
        ));
    }

    #[test]
    fn test_jaccard() {
        let a = [1.0, 2.0, 0.0];
        let b = [2.0, 1.0, 1.0];
        assert!(close(extra_distance(MetricType::Jaccard, &a, &b), 0.4));
        assert!(close(extra_distance(MetricType::Jaccard, &a, &a), 1.0));
    }

    #[test]
    fn test_nan_euclidean() {
        let a = [1.0, f32::NAN, 3.0, 0.0];
        let b = [1.0, 5.0, 1.0, 0.0];
        // 3 of 4 dimensions present, squared sum 4
        let expected = (4.0f32 / 3.0 * 4.0).sqrt();
        assert!(close(extra_distance(MetricType::NaNEuclidean, &a, &b), expected));

        let all_nan = [f32::NAN, f32::NAN];
        assert!(extra_distance(MetricType::NaNEuclidean, &all_nan, &[0.0, 0.0]).is_nan());
    }
}
