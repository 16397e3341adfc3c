//! Jensen-Shannon divergence kernels over cached statistics.
//!
//! `JS(P, Q) = H(M) - H(P)/2 - H(Q)/2` with `M = (P + Q)/2`, in bits. The
//! cached `entropy_term` of each side is `-H`, so the result is the mixture
//! entropy pass plus half of each cached term. Each kernel touches every
//! stored weight once.

use std::cmp::Ordering;

use crate::cache::CacheEntry;
use crate::entropy::mixture_term;
use crate::error::{DivergenceError, Result};
use crate::vector::{check_weight, SparseVector};

#[inline]
fn combine(mixture: f32, a: CacheEntry, b: CacheEntry) -> f32 {
    mixture + a.entropy_term / 2.0 + b.entropy_term / 2.0
}

/// Divergence between two dense vectors of equal length.
///
/// Both entries must have positive mass. With `validate_weights`, negative
/// or non-finite weights fail with `InvalidVectorLayout`.
pub fn dense_divergence(
    a: &[f32],
    stats_a: CacheEntry,
    b: &[f32],
    stats_b: CacheEntry,
    validate_weights: bool,
) -> Result<f32> {
    if a.len() != b.len() {
        return Err(DivergenceError::InvalidVectorLayout(format!(
            "dense length mismatch: {} vs {}",
            a.len(),
            b.len()
        )));
    }
    debug_assert!(stats_a.mass > 0.0 && stats_b.mass > 0.0);

    let mut mixture = 0.0_f32;
    for (i, (&x, &y)) in a.iter().zip(b).enumerate() {
        if validate_weights {
            check_weight(x, i)?;
            check_weight(y, i)?;
        }
        let p = x / stats_a.mass;
        let q = y / stats_b.mass;
        mixture += mixture_term((p + q) / 2.0);
    }

    Ok(combine(mixture, stats_a, stats_b))
}

/// Divergence between two sparse vectors via a merge-join over positions.
///
/// A position present on only one side has probability zero on the other,
/// so its mixture weight is half the present probability. Once either side
/// runs out, the rest of the other side is consumed the same way, which
/// makes the result match [`dense_divergence`] on the expanded vectors.
/// A merge that stops at the first exhausted side drops that tail and
/// scores disjoint suffixes too low.
pub fn sparse_divergence(
    a: &SparseVector,
    stats_a: CacheEntry,
    b: &SparseVector,
    stats_b: CacheEntry,
) -> f32 {
    debug_assert!(stats_a.mass > 0.0 && stats_b.mass > 0.0);

    let (pos_a, val_a) = (a.positions(), a.values());
    let (pos_b, val_b) = (b.positions(), b.values());
    let one_sided = |w: f32, mass: f32| mixture_term(w / mass / 2.0);

    let mut mixture = 0.0_f32;
    let (mut i, mut j) = (0, 0);
    while i < pos_a.len() && j < pos_b.len() {
        match pos_a[i].cmp(&pos_b[j]) {
            Ordering::Equal => {
                let p = val_a[i] / stats_a.mass;
                let q = val_b[j] / stats_b.mass;
                mixture += mixture_term((p + q) / 2.0);
                i += 1;
                j += 1;
            },
            Ordering::Less => {
                mixture += one_sided(val_a[i], stats_a.mass);
                i += 1;
            },
            Ordering::Greater => {
                mixture += one_sided(val_b[j], stats_b.mass);
                j += 1;
            },
        }
    }
    for &w in &val_a[i..] {
        mixture += one_sided(w, stats_a.mass);
    }
    for &w in &val_b[j..] {
        mixture += one_sided(w, stats_b.mass);
    }

    combine(mixture, stats_a, stats_b)
}

/// Divergence between two dense vectors without a cache.
///
/// Computes both sides' statistics on the fly.
pub fn jensen_shannon(a: &[f32], b: &[f32]) -> Result<f32> {
    let stats = |v: &[f32], side: &str| {
        for (i, &w) in v.iter().enumerate() {
            check_weight(w, i)?;
        }
        CacheEntry::compute(v).ok_or_else(|| DivergenceError::DegenerateVector {
            space: side.to_string(),
            id: 0,
        })
    };
    let stats_a = stats(a, "<lhs>")?;
    let stats_b = stats(b, "<rhs>")?;
    dense_divergence(a, stats_a, b, stats_b, false)
}
