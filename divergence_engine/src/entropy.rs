//! Scalar kernels shared by the statistics cache and the scorers.
//!
//! Every logarithm here is base 2 and follows the `log2(0) := 0` convention,
//! so zero-probability terms contribute nothing instead of producing NaN.

/// Base-2 logarithm with `lb(x) = 0` for `x <= 0`.
#[inline]
pub fn lb(value: f32) -> f32 {
    if value > 0.0 {
        value.log2()
    } else {
        0.0
    }
}

/// `-m * lb(m)`, the Shannon entropy contribution of one mixture probability.
#[inline]
pub fn mixture_term(m: f32) -> f32 {
    -m * lb(m)
}

/// Total weight of a vector.
#[inline]
pub fn mass<I>(weights: I) -> f32
where
    I: IntoIterator<Item = f32>,
{
    weights.into_iter().sum()
}

/// `Σ (w/mass) * lb(w/mass)`: the negated Shannon entropy of the normalized weights.
///
/// The caller guarantees `mass > 0`.
#[inline]
pub fn entropy_term<I>(weights: I, mass: f32) -> f32
where
    I: IntoIterator<Item = f32>,
{
    weights
        .into_iter()
        .map(|w| {
            let p = w / mass;
            p * lb(p)
        })
        .sum()
}
