//! Pluggable scoring surface and the registry the host looks metrics up in.

use std::cmp::Ordering;
use std::collections::BTreeMap;
use std::sync::Arc;

use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use tracing::{instrument, warn};

use crate::error::{DivergenceError, Result};
use crate::lifecycle::{VectorEvent, VectorEventListener};
use crate::vector::SparseVector;
use crate::VectorId;

/// Direction in which a metric's results rank.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ScoreOrder {
    /// Lower scores are more similar (distances, divergences).
    Ascending,
    /// Higher scores are more similar (cosine, dot product).
    Descending,
}

impl ScoreOrder {
    /// Order `a` before `b` when `a` is the better match.
    pub fn compare(self, a: f32, b: f32) -> Ordering {
        match self {
            Self::Ascending => a.total_cmp(&b),
            Self::Descending => b.total_cmp(&a),
        }
    }

    pub fn is_better(self, a: f32, b: f32) -> bool {
        self.compare(a, b) == Ordering::Less
    }
}

/// A similarity metric that can be registered with the host.
///
/// Metrics that cache per-vector state receive lifecycle events through the
/// [`VectorEventListener`] supertrait.
pub trait SimilarityScore: VectorEventListener {
    /// Stable registry identifier.
    fn name(&self) -> &'static str;

    fn order(&self) -> ScoreOrder;

    fn score_dense(
        &self,
        space_a: &str,
        id_a: VectorId,
        a: &[f32],
        space_b: &str,
        id_b: VectorId,
        b: &[f32],
    ) -> Result<f32>;

    fn score_sparse(
        &self,
        space_a: &str,
        id_a: VectorId,
        a: &SparseVector,
        space_b: &str,
        id_b: VectorId,
        b: &SparseVector,
    ) -> Result<f32>;
}

/// Named collection of metrics that also fans lifecycle events out to them.
#[derive(Default)]
pub struct ScorerRegistry {
    scorers: RwLock<BTreeMap<&'static str, Arc<dyn SimilarityScore>>>,
}

impl ScorerRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&self, scorer: Arc<dyn SimilarityScore>) -> Result<()> {
        let name = scorer.name();
        let mut scorers = self.scorers.write();
        if scorers.contains_key(name) {
            return Err(DivergenceError::DuplicateScorer(name.to_string()));
        }
        scorers.insert(name, scorer);
        Ok(())
    }

    pub fn unregister(&self, name: &str) -> Option<Arc<dyn SimilarityScore>> {
        self.scorers.write().remove(name)
    }

    pub fn get(&self, name: &str) -> Option<Arc<dyn SimilarityScore>> {
        self.scorers.read().get(name).cloned()
    }

    /// Registered names in sorted order.
    pub fn names(&self) -> Vec<&'static str> {
        self.scorers.read().keys().copied().collect()
    }

    pub fn len(&self) -> usize {
        self.scorers.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.scorers.read().is_empty()
    }

    fn snapshot(&self) -> Vec<Arc<dyn SimilarityScore>> {
        self.scorers.read().values().cloned().collect()
    }

    /// Notify every scorer, then return the first failure, if any.
    fn broadcast<F>(&self, what: &str, mut notify: F) -> Result<()>
    where
        F: FnMut(&dyn SimilarityScore) -> Result<()>,
    {
        let mut first_err = None;
        for scorer in self.snapshot() {
            if let Err(e) = notify(scorer.as_ref()) {
                warn!(scorer = scorer.name(), error = %e, "{what} failed");
                first_err.get_or_insert(e);
            }
        }
        first_err.map_or(Ok(()), Err)
    }

    #[instrument(skip(self))]
    pub fn attach_space(&self, space: &str) -> Result<()> {
        self.broadcast("attach", |s| s.on_attached(space))
    }

    #[instrument(skip(self))]
    pub fn detach_space(&self, space: &str) -> Result<()> {
        self.broadcast("detach", |s| s.on_detached(space))
    }

    #[instrument(skip(self, event), fields(kind = event.kind(), space = event.space(), id = event.id()))]
    pub fn dispatch(&self, event: &VectorEvent) -> Result<()> {
        self.broadcast("event", |s| s.on_event(event))
    }
}
