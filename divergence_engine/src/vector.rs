//! Vector representations accepted by the cache and the scorers.

use crate::error::{DivergenceError, Result};

/// Reject weights that cannot be part of a probability-like vector.
#[inline]
pub(crate) fn check_weight(weight: f32, at: usize) -> Result<()> {
    if weight.is_finite() && weight >= 0.0 {
        Ok(())
    } else {
        Err(DivergenceError::InvalidVectorLayout(format!(
            "weight {weight} at {at} is not a nonnegative finite value"
        )))
    }
}

/// A sparse weight vector stored as parallel position/value arrays.
///
/// Positions are strictly ascending and weights are nonnegative and finite.
/// Every constructor enforces this, so a `SparseVector` can be fed to the
/// merge-join scorer without re-sorting. Positions not stored are implicitly
/// zero.
///
/// # Example
///
/// ```
/// use divergence_engine::SparseVector;
///
/// let sparse = SparseVector::from_dense(&[0.0, 1.5, 0.0, 2.0]).unwrap();
/// assert_eq!(sparse.nnz(), 2);
/// assert_eq!(sparse.positions(), &[1, 3]);
/// assert_eq!(sparse.to_dense(4), vec![0.0, 1.5, 0.0, 2.0]);
/// ```
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SparseVector {
    positions: Vec<u32>,
    values: Vec<f32>,
}

impl SparseVector {
    /// Create an empty sparse vector.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create from `(position, weight)` pairs already sorted by position.
    ///
    /// Fails with `InvalidVectorLayout` if positions are not strictly
    /// ascending or a weight is negative or non-finite.
    pub fn from_pairs(pairs: Vec<(u32, f32)>) -> Result<Self> {
        let mut builder = SparseVectorBuilder::with_capacity(pairs.len());
        for (position, weight) in pairs {
            builder.push(position, weight)?;
        }
        Ok(builder.build())
    }

    /// Create from a dense vector, storing only non-zero weights.
    ///
    /// Fails with `InvalidVectorLayout` on a negative or non-finite weight.
    pub fn from_dense(dense: &[f32]) -> Result<Self> {
        let mut builder = SparseVectorBuilder::new();
        for (i, &val) in dense.iter().enumerate() {
            if val == 0.0 {
                continue;
            }
            check_weight(val, i)?;
            builder.push(i as u32, val)?;
        }
        Ok(builder.build())
    }

    /// Decode the interleaved `[index, weight, index, weight, ...]` integer layout.
    ///
    /// Pairs are read while the cursor is below `len`. The first negative
    /// index ends the vector early; the rest of the buffer is ignored. The
    /// result carries its length explicitly, so no sentinel survives decoding.
    pub fn from_interleaved(raw: &[i32], len: usize) -> Result<Self> {
        if len > raw.len() {
            return Err(DivergenceError::InvalidVectorLayout(format!(
                "declared length {len} exceeds buffer of {}",
                raw.len()
            )));
        }

        let mut builder = SparseVectorBuilder::with_capacity(len / 2);
        let mut cursor = 0;
        while cursor < len {
            let index = raw[cursor];
            if index < 0 {
                break;
            }
            if cursor + 1 >= len {
                return Err(DivergenceError::InvalidVectorLayout(format!(
                    "index {index} at {cursor} has no weight"
                )));
            }
            let weight = raw[cursor + 1];
            if weight < 0 {
                return Err(DivergenceError::InvalidVectorLayout(format!(
                    "weight {weight} at {} is negative",
                    cursor + 1
                )));
            }
            builder.push(index as u32, weight as f32)?;
            cursor += 2;
        }

        Ok(builder.build())
    }

    /// Number of stored weights.
    #[inline]
    pub fn nnz(&self) -> usize {
        self.values.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Stored positions, strictly ascending.
    #[inline]
    pub fn positions(&self) -> &[u32] {
        &self.positions
    }

    /// Stored weights, parallel to `positions()`.
    #[inline]
    pub fn values(&self) -> &[f32] {
        &self.values
    }

    /// Re-check every stored weight.
    pub(crate) fn check_weights(&self) -> Result<()> {
        self.values
            .iter()
            .enumerate()
            .try_for_each(|(at, &w)| check_weight(w, at))
    }

    /// Iterate over `(position, weight)` pairs.
    pub fn iter(&self) -> impl Iterator<Item = (u32, f32)> + '_ {
        self.positions
            .iter()
            .copied()
            .zip(self.values.iter().copied())
    }

    /// Expand into a dense vector of length `dimension`.
    ///
    /// Positions at or beyond `dimension` are dropped.
    pub fn to_dense(&self, dimension: usize) -> Vec<f32> {
        let mut dense = vec![0.0; dimension];
        for (pos, val) in self.iter() {
            if let Some(slot) = dense.get_mut(pos as usize) {
                *slot = val;
            }
        }
        dense
    }
}

/// Incremental builder that validates ordering as pairs are pushed.
#[derive(Debug, Default)]
pub struct SparseVectorBuilder {
    positions: Vec<u32>,
    values: Vec<f32>,
}

impl SparseVectorBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            positions: Vec::with_capacity(capacity),
            values: Vec::with_capacity(capacity),
        }
    }

    /// Append a pair. The position must exceed every position pushed so far.
    pub fn push(&mut self, position: u32, weight: f32) -> Result<()> {
        if let Some(&last) = self.positions.last() {
            if position <= last {
                return Err(DivergenceError::InvalidVectorLayout(format!(
                    "position {position} follows {last}; positions must be strictly ascending"
                )));
            }
        }
        check_weight(weight, self.values.len())?;
        self.positions.push(position);
        self.values.push(weight);
        Ok(())
    }

    pub fn build(self) -> SparseVector {
        SparseVector {
            positions: self.positions,
            values: self.values,
        }
    }
}

/// Vector content carried by lifecycle events.
#[derive(Debug, Clone, PartialEq)]
pub enum VectorPayload {
    /// Fixed-length weights; position `i` is comparable across the space.
    Dense(Vec<f32>),
    /// Sorted `(position, weight)` pairs with implicit zeros elsewhere.
    Sparse(SparseVector),
}

impl VectorPayload {
    /// The stored weights, without positions.
    pub fn weights(&self) -> &[f32] {
        match self {
            Self::Dense(v) => v,
            Self::Sparse(s) => s.values(),
        }
    }

    /// Number of stored weights.
    pub fn len(&self) -> usize {
        self.weights().len()
    }

    pub fn is_empty(&self) -> bool {
        self.weights().is_empty()
    }

    pub fn is_sparse(&self) -> bool {
        matches!(self, Self::Sparse(_))
    }
}

impl From<Vec<f32>> for VectorPayload {
    fn from(v: Vec<f32>) -> Self {
        Self::Dense(v)
    }
}

impl From<SparseVector> for VectorPayload {
    fn from(v: SparseVector) -> Self {
        Self::Sparse(v)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_pairs_sorted() {
        let v = SparseVector::from_pairs(vec![(0, 1.0), (4, 2.0), (9, 0.5)]).unwrap();
        assert_eq!(v.nnz(), 3);
        assert_eq!(v.positions(), &[0, 4, 9]);
        assert_eq!(v.values(), &[1.0, 2.0, 0.5]);
    }

    #[test]
    fn test_from_pairs_rejects_unsorted() {
        let err = SparseVector::from_pairs(vec![(3, 1.0), (1, 1.0)]).unwrap_err();
        assert!(matches!(err, DivergenceError::InvalidVectorLayout(_)));
    }

    #[test]
    fn test_from_pairs_rejects_duplicate_position() {
        let err = SparseVector::from_pairs(vec![(2, 1.0), (2, 3.0)]).unwrap_err();
        assert!(matches!(err, DivergenceError::InvalidVectorLayout(_)));
    }

    #[test]
    fn test_from_pairs_rejects_bad_weight() {
        assert!(SparseVector::from_pairs(vec![(0, -1.0)]).is_err());
        assert!(SparseVector::from_pairs(vec![(0, f32::NAN)]).is_err());
        assert!(SparseVector::from_pairs(vec![(0, f32::INFINITY)]).is_err());
    }

    #[test]
    fn test_from_dense_drops_zeros() {
        let v = SparseVector::from_dense(&[0.0, 2.0, 0.0, 0.0, 1.0]).unwrap();
        assert_eq!(v.positions(), &[1, 4]);
        assert_eq!(v.values(), &[2.0, 1.0]);
        assert_eq!(v.to_dense(5), vec![0.0, 2.0, 0.0, 0.0, 1.0]);
    }

    #[test]
    fn test_from_dense_rejects_invalid_weights() {
        let err = SparseVector::from_dense(&[-1.0, 1.0]).unwrap_err();
        assert!(matches!(err, DivergenceError::InvalidVectorLayout(_)));
        assert!(SparseVector::from_dense(&[1.0, 0.0, f32::NAN]).is_err());
        assert!(SparseVector::from_dense(&[f32::INFINITY]).is_err());
    }

    #[test]
    fn test_check_weights_catches_bad_values() {
        let v = SparseVector {
            positions: vec![0, 3],
            values: vec![1.0, f32::NAN],
        };
        assert!(v.check_weights().is_err());
        let v = SparseVector::from_pairs(vec![(0, 1.0), (3, 2.0)]).unwrap();
        assert!(v.check_weights().is_ok());
    }

    #[test]
    fn test_from_dense_error_reports_dense_index() {
        let err = SparseVector::from_dense(&[0.0, 0.0, -3.0]).unwrap_err();
        assert_eq!(
            err.to_string(),
            "invalid vector layout: weight -3 at 2 is not a nonnegative finite value"
        );
    }

    #[test]
    fn test_to_dense_truncates() {
        let v = SparseVector::from_pairs(vec![(1, 1.0), (8, 2.0)]).unwrap();
        assert_eq!(v.to_dense(3), vec![0.0, 1.0, 0.0]);
    }

    #[test]
    fn test_from_interleaved_full_length() {
        let raw = [0, 3, 2, 1, 5, 4];
        let v = SparseVector::from_interleaved(&raw, raw.len()).unwrap();
        assert_eq!(v.positions(), &[0, 2, 5]);
        assert_eq!(v.values(), &[3.0, 1.0, 4.0]);
    }

    #[test]
    fn test_from_interleaved_stops_at_end_marker() {
        let raw = [1, 2, 3, 4, -1, 0, 9, 9];
        let v = SparseVector::from_interleaved(&raw, raw.len()).unwrap();
        assert_eq!(v.positions(), &[1, 3]);
        assert_eq!(v.values(), &[2.0, 4.0]);
    }

    #[test]
    fn test_from_interleaved_stops_at_declared_length() {
        let raw = [1, 2, 3, 4, 5, 6];
        let v = SparseVector::from_interleaved(&raw, 4).unwrap();
        assert_eq!(v.positions(), &[1, 3]);
    }

    #[test]
    fn test_from_interleaved_marker_first() {
        let raw = [-1, 0, 2, 3];
        let v = SparseVector::from_interleaved(&raw, raw.len()).unwrap();
        assert!(v.is_empty());
    }

    #[test]
    fn test_from_interleaved_errors() {
        assert!(SparseVector::from_interleaved(&[0, 1], 4).is_err());
        assert!(SparseVector::from_interleaved(&[0, 1, 2], 3).is_err());
        assert!(SparseVector::from_interleaved(&[0, -5], 2).is_err());
        assert!(SparseVector::from_interleaved(&[4, 1, 2, 1], 4).is_err());
    }

    #[test]
    fn test_builder_rejects_descending() {
        let mut b = SparseVectorBuilder::new();
        b.push(5, 1.0).unwrap();
        assert!(b.push(5, 1.0).is_err());
        assert!(b.push(4, 1.0).is_err());
        b.push(6, 0.0).unwrap();
        assert_eq!(b.build().nnz(), 2);
    }

    #[test]
    fn test_payload_weights() {
        let dense = VectorPayload::from(vec![1.0, 0.0, 2.0]);
        assert_eq!(dense.weights(), &[1.0, 0.0, 2.0]);
        assert!(!dense.is_sparse());

        let sparse = VectorPayload::from(SparseVector::from_dense(&[1.0, 0.0, 2.0]).unwrap());
        assert_eq!(sparse.weights(), &[1.0, 2.0]);
        assert_eq!(sparse.len(), 2);
        assert!(sparse.is_sparse());
    }
}
