//! Integration test helpers for the divergence engine.
//!
//! Provides an in-memory host store that applies mutations and reports them
//! to a scorer registry, the way a real vector store drives its metrics.

use std::sync::Arc;

use dashmap::DashMap;
use divergence_engine::{
    JensenShannon, Result, ScorerRegistry, SimilarityScore, SparseVector, VectorEvent,
    VectorId, VectorPayload, JENSEN_SHANNON,
};

/// Minimal host vector store holding dense vectors per space.
pub struct MemoryHost {
    vectors: DashMap<(String, VectorId), Vec<f32>>,
    registry: Arc<ScorerRegistry>,
}

impl MemoryHost {
    /// Create a host with a Jensen-Shannon scorer registered.
    pub fn new() -> Self {
        let registry = Arc::new(ScorerRegistry::new());
        registry
            .register(Arc::new(JensenShannon::new()))
            .expect("fresh registry");
        Self {
            vectors: DashMap::new(),
            registry,
        }
    }

    pub fn registry(&self) -> &Arc<ScorerRegistry> {
        &self.registry
    }

    pub fn scorer(&self) -> Arc<dyn SimilarityScore> {
        self.registry.get(JENSEN_SHANNON).expect("registered")
    }

    pub fn create_space(&self, space: &str) -> Result<()> {
        self.registry.attach_space(space)
    }

    pub fn drop_space(&self, space: &str) -> Result<()> {
        self.vectors.retain(|(s, _), _| s != space);
        self.registry.detach_space(space)
    }

    pub fn add(&self, space: &str, id: VectorId, vector: Vec<f32>) -> Result<()> {
        self.vectors
            .insert((space.to_string(), id), vector.clone());
        self.registry.dispatch(&VectorEvent::Added {
            space: space.to_string(),
            id,
            vector: VectorPayload::Dense(vector),
        })
    }

    pub fn set(&self, space: &str, id: VectorId, vector: Vec<f32>) -> Result<()> {
        self.vectors
            .insert((space.to_string(), id), vector.clone());
        self.registry.dispatch(&VectorEvent::Replaced {
            space: space.to_string(),
            id,
            vector: VectorPayload::Dense(vector),
        })
    }

    /// Add `delta` element-wise onto the stored vector.
    pub fn accumulate(&self, space: &str, id: VectorId, delta: Vec<f32>) -> Result<()> {
        let accumulated = {
            let mut stored = self
                .vectors
                .entry((space.to_string(), id))
                .or_insert_with(|| vec![0.0; delta.len()]);
            for (slot, d) in stored.value_mut().iter_mut().zip(&delta) {
                *slot += d;
            }
            stored.value().clone()
        };
        self.registry.dispatch(&VectorEvent::Accumulated {
            space: space.to_string(),
            id,
            delta: VectorPayload::Dense(delta),
            accumulated: VectorPayload::Dense(accumulated),
        })
    }

    pub fn remove(&self, space: &str, id: VectorId) -> Result<()> {
        self.vectors.remove(&(space.to_string(), id));
        self.registry.dispatch(&VectorEvent::Removed {
            space: space.to_string(),
            id,
        })
    }

    pub fn get(&self, space: &str, id: VectorId) -> Option<Vec<f32>> {
        self.vectors
            .get(&(space.to_string(), id))
            .map(|v| v.value().clone())
    }

    /// Score two stored vectors through the dense path.
    pub fn score(&self, a: (&str, VectorId), b: (&str, VectorId)) -> Result<f32> {
        let va = self.get(a.0, a.1).unwrap_or_default();
        let vb = self.get(b.0, b.1).unwrap_or_default();
        self.scorer().score_dense(a.0, a.1, &va, b.0, b.1, &vb)
    }

    /// Score two stored vectors through the sparse path.
    pub fn score_sparse(&self, a: (&str, VectorId), b: (&str, VectorId)) -> Result<f32> {
        let va = SparseVector::from_dense(&self.get(a.0, a.1).unwrap_or_default())?;
        let vb = SparseVector::from_dense(&self.get(b.0, b.1).unwrap_or_default())?;
        self.scorer().score_sparse(a.0, a.1, &va, b.0, b.1, &vb)
    }
}

impl Default for MemoryHost {
    fn default() -> Self {
        Self::new()
    }
}

/// Generate nonnegative sample weight vectors with positive mass.
pub fn sample_weights(count: usize, dim: usize) -> Vec<Vec<f32>> {
    (0..count)
        .map(|i| {
            (0..dim)
                .map(|j| ((i * dim + j) as f32).sin().abs() + 0.01)
                .collect()
        })
        .collect()
}

/// Generate sample weight vectors where roughly `1 - density` of entries are zero.
pub fn sample_sparse_weights(count: usize, dim: usize, density: f32) -> Vec<Vec<f32>> {
    let stride = ((1.0 / density.max(1e-3)) as usize).max(1);
    (0..count)
        .map(|i| {
            (0..dim)
                .map(|j| {
                    if (i * 7 + j) % stride == 0 {
                        ((i * dim + j) as f32).cos().abs() + 0.05
                    } else {
                        0.0
                    }
                })
                .collect()
        })
        .collect()
}
