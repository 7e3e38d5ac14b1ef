//! Primary distance kernels.
//!
//! All kernels assume both operands have the same length; only the common
//! prefix is scored otherwise. The batch-4 variants walk the query once and
//! accumulate four candidates per step so the inner loop stays in registers.

/// Squared Euclidean distance.
#[inline]
pub fn l2_sqr(a: &[f32], b: &[f32]) -> f32 {
    a.iter()
        .zip(b.iter())
        .map(|(x, y)| {
            let diff = x - y;
            diff * diff
        })
        .sum()
}

/// Dot product.
#[inline]
pub fn inner_product(a: &[f32], b: &[f32]) -> f32 {
    a.iter().zip(b.iter()).map(|(x, y)| x * y).sum()
}

/// Squared Euclidean distance from `q` to four candidates at once.
pub fn l2_sqr_batch_4(q: &[f32], y0: &[f32], y1: &[f32], y2: &[f32], y3: &[f32]) -> [f32; 4] {
    let d = q.len().min(y0.len()).min(y1.len()).min(y2.len()).min(y3.len());
    let mut acc = [0.0f32; 4];
    for i in 0..d {
        let qi = q[i];
        let d0 = qi - y0[i];
        let d1 = qi - y1[i];
        let d2 = qi - y2[i];
        let d3 = qi - y3[i];
        acc[0] += d0 * d0;
        acc[1] += d1 * d1;
        acc[2] += d2 * d2;
        acc[3] += d3 * d3;
    }
    acc
}

/// Dot product of `q` with four candidates at once.
pub fn inner_product_batch_4(
    q: &[f32],
    y0: &[f32],
    y1: &[f32],
    y2: &[f32],
    y3: &[f32],
) -> [f32; 4] {
    let d = q.len().min(y0.len()).min(y1.len()).min(y2.len()).min(y3.len());
    let mut acc = [0.0f32; 4];
    for i in 0..d {
        let qi = q[i];
        acc[0] += qi * y0[i];
        acc[1] += qi * y1[i];
        acc[2] += qi * y2[i];
        acc[3] += qi * y3[i];
    }
    acc
}

/// Squared L2 distance between each query and its own candidate list.
///
/// `queries` holds `nq = out.len() / k` rows of `dim` floats, `ids` holds `k`
/// candidate rows of `base` per query. Missing candidates score `+inf`.
///
/// # Panics
///
/// Panics if a candidate id addresses a row past the end of `base`.
pub fn l2_sqr_by_idx(
    out: &mut [f32],
    queries: &[f32],
    base: &[f32],
    ids: &[Option<usize>],
    dim: usize,
    k: usize,
) {
    by_idx(out, queries, base, ids, dim, k, f32::INFINITY, l2_sqr);
}

/// Inner products between each query and its own candidate list.
///
/// Same layout as [`l2_sqr_by_idx`]; missing candidates score `-inf`.
pub fn inner_products_by_idx(
    out: &mut [f32],
    queries: &[f32],
    base: &[f32],
    ids: &[Option<usize>],
    dim: usize,
    k: usize,
) {
    by_idx(out, queries, base, ids, dim, k, f32::NEG_INFINITY, inner_product);
}

#[allow(clippy::too_many_arguments)]
fn by_idx(
    out: &mut [f32],
    queries: &[f32],
    base: &[f32],
    ids: &[Option<usize>],
    dim: usize,
    k: usize,
    missing: f32,
    kernel: fn(&[f32], &[f32]) -> f32,
) {
    if dim == 0 || k == 0 {
        return;
    }
    for ((query, row_ids), row_out) in queries
        .chunks_exact(dim)
        .zip(ids.chunks_exact(k))
        .zip(out.chunks_exact_mut(k))
    {
        for (id, slot_out) in row_ids.iter().zip(row_out.iter_mut()) {
            *slot_out = match id {
                Some(i) => kernel(query, &base[i * dim..(i + 1) * dim]),
                None => missing,
            };
        }
    }
}
