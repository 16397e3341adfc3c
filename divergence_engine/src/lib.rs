//! DivergenceEngine - Jensen-Shannon scoring for attached vector spaces
//!
//! Scores pairs of nonnegative weight vectors by their Jensen-Shannon
//! divergence in bits. Per-vector sufficient statistics (total mass and the
//! negated entropy) are cached per space and id and kept current by the
//! host's lifecycle events, so each score is a single O(dimension) pass.
//!
//! # Components
//!
//! - **StatisticsCache**: `(space, id) -> (mass, entropy_term)`
//! - **Scorer kernels**: dense positional pass and sparse merge-join
//! - **LifecycleHandler**: maps add/replace/accumulate/remove to cache writes
//! - **JensenShannon**: the registrable metric tying the three together
//!
//! # Example
//!
//! ```
//! use divergence_engine::{JensenShannon, SimilarityScore, VectorEvent, VectorEventListener};
//!
//! let js = JensenShannon::new();
//! js.on_attached("docs")?;
//! js.on_event(&VectorEvent::Added { space: "docs".into(), id: 1, vector: vec![1.0, 1.0, 0.0].into() })?;
//! js.on_event(&VectorEvent::Added { space: "docs".into(), id: 2, vector: vec![0.0, 1.0, 1.0].into() })?;
//!
//! let d = js.score_dense("docs", 1, &[1.0, 1.0, 0.0], "docs", 2, &[0.0, 1.0, 1.0])?;
//! assert!((d - 0.5).abs() < 1e-5);
//! # Ok::<(), divergence_engine::DivergenceError>(())
//! ```

#![allow(clippy::cast_possible_truncation)]
#![allow(clippy::cast_sign_loss)]
#![allow(clippy::cast_precision_loss)]
#![allow(clippy::must_use_candidate)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::doc_markdown)]
#![allow(clippy::similar_names)]
#![allow(clippy::suboptimal_flops)]
#![allow(clippy::too_many_arguments)]
#![allow(clippy::len_without_is_empty)]

mod cache;
mod config;
mod entropy;
mod error;
mod lifecycle;
mod metric;
mod scorer;
mod stats;
mod vector;

pub use cache::{CacheEntry, StatisticsCache};
pub use config::DivergenceConfig;
pub use entropy::{entropy_term, lb, mass, mixture_term};
pub use error::{DivergenceError, Result};
pub use lifecycle::{LifecycleHandler, VectorEvent, VectorEventListener};
pub use metric::{ScoreOrder, ScorerRegistry, SimilarityScore};
pub use scorer::{dense_divergence, jensen_shannon, sparse_divergence};
pub use stats::{DivergenceStats, ScoreKind, StatsSnapshot};
pub use vector::{SparseVector, SparseVectorBuilder, VectorPayload};

use std::sync::Arc;

use tracing::instrument;

/// Identifier of a vector within its space.
pub type VectorId = u64;

/// Registry name of the Jensen-Shannon metric.
pub const JENSEN_SHANNON: &str = "jensenshannon";

/// Jensen-Shannon divergence metric with its own statistics cache.
///
/// Each instance owns its cache; nothing is shared between instances.
pub struct JensenShannon {
    cache: Arc<StatisticsCache>,
    lifecycle: LifecycleHandler,
    stats: Arc<DivergenceStats>,
    config: DivergenceConfig,
}

impl JensenShannon {
    /// Create a scorer with default configuration.
    pub fn new() -> Self {
        Self::build(DivergenceConfig::default())
    }

    /// Create a scorer with custom configuration.
    pub fn with_config(config: DivergenceConfig) -> Result<Self> {
        config.validate().map_err(DivergenceError::InvalidConfig)?;
        Ok(Self::build(config))
    }

    fn build(config: DivergenceConfig) -> Self {
        let stats = Arc::new(DivergenceStats::new());
        let cache = Arc::new(StatisticsCache::with_config(&config, Arc::clone(&stats)));
        Self {
            lifecycle: LifecycleHandler::new(Arc::clone(&cache)),
            cache,
            stats,
            config,
        }
    }

    pub fn cache(&self) -> &StatisticsCache {
        &self.cache
    }

    pub fn config(&self) -> &DivergenceConfig {
        &self.config
    }

    pub fn stats(&self) -> &DivergenceStats {
        &self.stats
    }

    pub fn stats_snapshot(&self) -> StatsSnapshot {
        self.stats.snapshot()
    }

    /// Fetch the statistics a score needs, mapping misses to `PreconditionViolation`.
    fn entry(&self, space: &str, id: VectorId) -> Result<CacheEntry> {
        let entry = self.cache.get(space, id).map_err(|_| {
            self.stats.record_precondition_failure();
            let reason = if self.cache.is_attached(space) {
                "no cached statistics for"
            } else {
                "unattached space for"
            };
            DivergenceError::PreconditionViolation(format!("{reason} {space}/{id}"))
        })?;
        if entry.mass <= 0.0 {
            return Err(DivergenceError::degenerate(space, id));
        }
        Ok(entry)
    }
}

impl Default for JensenShannon {
    fn default() -> Self {
        Self::new()
    }
}

impl VectorEventListener for JensenShannon {
    fn on_attached(&self, space: &str) -> Result<()> {
        self.lifecycle.on_attached(space)
    }

    fn on_detached(&self, space: &str) -> Result<()> {
        self.lifecycle.on_detached(space)
    }

    fn on_event(&self, event: &VectorEvent) -> Result<()> {
        self.lifecycle.handle(event)
    }
}

impl SimilarityScore for JensenShannon {
    fn name(&self) -> &'static str {
        JENSEN_SHANNON
    }

    fn order(&self) -> ScoreOrder {
        ScoreOrder::Ascending
    }

    #[instrument(skip(self, a, b), fields(dim = a.len()))]
    fn score_dense(
        &self,
        space_a: &str,
        id_a: VectorId,
        a: &[f32],
        space_b: &str,
        id_b: VectorId,
        b: &[f32],
    ) -> Result<f32> {
        let stats_a = self.entry(space_a, id_a)?;
        let stats_b = self.entry(space_b, id_b)?;
        let score = dense_divergence(a, stats_a, b, stats_b, self.config.validate_weights)?;
        self.stats.record_score(ScoreKind::Dense);
        Ok(score)
    }

    #[instrument(skip(self, a, b), fields(nnz_a = a.nnz(), nnz_b = b.nnz()))]
    fn score_sparse(
        &self,
        space_a: &str,
        id_a: VectorId,
        a: &SparseVector,
        space_b: &str,
        id_b: VectorId,
        b: &SparseVector,
    ) -> Result<f32> {
        let stats_a = self.entry(space_a, id_a)?;
        let stats_b = self.entry(space_b, id_b)?;
        if self.config.validate_weights {
            a.check_weights()?;
            b.check_weights()?;
        }
        let score = sparse_divergence(a, stats_a, b, stats_b);
        self.stats.record_score(ScoreKind::Sparse);
        Ok(score)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const EPS: f32 = 1e-5;

    fn added(space: &str, id: VectorId, vector: VectorPayload) -> VectorEvent {
        VectorEvent::Added {
            space: space.into(),
            id,
            vector,
        }
    }

    fn scorer_with(vectors: &[(VectorId, &[f32])]) -> JensenShannon {
        let js = JensenShannon::new();
        js.on_attached("docs").unwrap();
        for (id, v) in vectors {
            js.on_event(&added("docs", *id, v.to_vec().into())).unwrap();
        }
        js
    }

    #[test]
    fn test_name_and_order() {
        let js = JensenShannon::new();
        assert_eq!(js.name(), "jensenshannon");
        assert_eq!(js.order(), ScoreOrder::Ascending);
    }

    #[test]
    fn test_with_config_validates() {
        let config = DivergenceConfig {
            max_spaces: 0,
            ..Default::default()
        };
        assert!(matches!(
            JensenShannon::with_config(config),
            Err(DivergenceError::InvalidConfig(_))
        ));
        assert!(JensenShannon::with_config(DivergenceConfig::strict()).is_ok());
    }

    #[test]
    fn test_score_dense_worked_example() {
        let p = [1.0, 1.0, 0.0];
        let q = [0.0, 1.0, 1.0];
        let js = scorer_with(&[(1, &p), (2, &q)]);

        let d = js.score_dense("docs", 1, &p, "docs", 2, &q).unwrap();
        assert!((d - 0.5).abs() < EPS);
        assert_eq!(js.stats().scores(ScoreKind::Dense), 1);
    }

    #[test]
    fn test_score_sparse_matches_dense() {
        let p = [0.0, 2.0, 0.0, 1.0, 5.0, 0.0];
        let q = [3.0, 1.0, 0.0, 0.0, 2.0, 4.0];
        let js = scorer_with(&[(1, &p), (2, &q)]);

        let dense = js.score_dense("docs", 1, &p, "docs", 2, &q).unwrap();
        let sparse = js
            .score_sparse(
                "docs",
                1,
                &SparseVector::from_dense(&p).unwrap(),
                "docs",
                2,
                &SparseVector::from_dense(&q).unwrap(),
            )
            .unwrap();
        assert!((dense - sparse).abs() < EPS);
    }

    #[test]
    fn test_invalid_weights_rejected_on_both_paths() {
        let js = scorer_with(&[(1, &[1.0, 1.0, 1.0]), (2, &[1.0, 1.0, 1.0])]);
        let good = [1.0, 1.0, 1.0];

        for bad in [[-1.0, 1.0, f32::NAN], [-3.0, 1.0, 0.0]] {
            let err = js
                .score_dense("docs", 1, &bad, "docs", 2, &good)
                .unwrap_err();
            assert!(matches!(err, DivergenceError::InvalidVectorLayout(_)));

            let err = SparseVector::from_dense(&bad).unwrap_err();
            assert!(matches!(err, DivergenceError::InvalidVectorLayout(_)));
        }
        assert_eq!(js.stats().scores(ScoreKind::Dense), 0);
        assert_eq!(js.stats().scores(ScoreKind::Sparse), 0);
    }

    #[test]
    fn test_score_across_spaces() {
        let js = JensenShannon::new();
        js.on_attached("a").unwrap();
        js.on_attached("b").unwrap();
        js.on_event(&added("a", 1, vec![1.0, 0.0].into())).unwrap();
        js.on_event(&added("b", 1, vec![0.0, 1.0].into())).unwrap();

        let d = js
            .score_dense("a", 1, &[1.0, 0.0], "b", 1, &[0.0, 1.0])
            .unwrap();
        assert!((d - 1.0).abs() < EPS);
    }

    #[test]
    fn test_score_missing_entry_is_precondition_violation() {
        let js = scorer_with(&[(1, &[1.0, 1.0])]);
        let err = js
            .score_dense("docs", 1, &[1.0, 1.0], "docs", 99, &[1.0, 1.0])
            .unwrap_err();
        assert!(matches!(err, DivergenceError::PreconditionViolation(_)));
        assert_eq!(js.stats_snapshot().precondition_failures, 1);
    }

    #[test]
    fn test_score_unattached_space_is_precondition_violation() {
        let js = scorer_with(&[(1, &[1.0])]);
        let v = SparseVector::from_dense(&[1.0]).unwrap();
        let err = js
            .score_sparse("docs", 1, &v, "nowhere", 1, &v)
            .unwrap_err();
        assert!(matches!(err, DivergenceError::PreconditionViolation(_)));
    }

    #[test]
    fn test_score_after_removal_fails() {
        let js = scorer_with(&[(1, &[1.0]), (2, &[1.0])]);
        js.on_event(&VectorEvent::Removed {
            space: "docs".into(),
            id: 2,
        })
        .unwrap();
        assert!(js.score_dense("docs", 1, &[1.0], "docs", 2, &[1.0]).is_err());
    }

    #[test]
    fn test_score_after_degenerate_update_fails() {
        let js = scorer_with(&[(1, &[1.0, 1.0]), (2, &[1.0, 1.0])]);
        let err = js
            .on_event(&VectorEvent::Replaced {
                space: "docs".into(),
                id: 2,
                vector: vec![0.0, 0.0].into(),
            })
            .unwrap_err();
        assert!(matches!(err, DivergenceError::DegenerateVector { .. }));

        let err = js
            .score_dense("docs", 1, &[1.0, 1.0], "docs", 2, &[0.0, 0.0])
            .unwrap_err();
        assert!(matches!(err, DivergenceError::PreconditionViolation(_)));
    }

    #[test]
    fn test_score_dense_length_mismatch() {
        let js = scorer_with(&[(1, &[1.0, 1.0]), (2, &[1.0, 1.0, 1.0])]);
        let err = js
            .score_dense("docs", 1, &[1.0, 1.0], "docs", 2, &[1.0, 1.0, 1.0])
            .unwrap_err();
        assert!(matches!(err, DivergenceError::InvalidVectorLayout(_)));
    }

    #[test]
    fn test_score_reflects_latest_update() {
        let js = scorer_with(&[(1, &[1.0, 0.0]), (2, &[1.0, 0.0])]);
        let before = js
            .score_dense("docs", 1, &[1.0, 0.0], "docs", 2, &[1.0, 0.0])
            .unwrap();
        assert!(before.abs() < EPS);

        js.on_event(&VectorEvent::Replaced {
            space: "docs".into(),
            id: 2,
            vector: vec![0.0, 3.0].into(),
        })
        .unwrap();
        let after = js
            .score_dense("docs", 1, &[1.0, 0.0], "docs", 2, &[0.0, 3.0])
            .unwrap();
        assert!((after - 1.0).abs() < EPS);
    }

    #[test]
    fn test_instances_do_not_share_cache() {
        let a = scorer_with(&[(1, &[1.0])]);
        let b = JensenShannon::new();
        b.on_attached("docs").unwrap();
        assert!(a.cache().contains("docs", 1));
        assert!(!b.cache().contains("docs", 1));
    }

    #[test]
    fn test_registry_roundtrip() {
        let registry = ScorerRegistry::new();
        registry.register(Arc::new(JensenShannon::new())).unwrap();
        registry.attach_space("docs").unwrap();
        registry
            .dispatch(&added("docs", 1, vec![1.0, 1.0, 0.0].into()))
            .unwrap();
        registry
            .dispatch(&added("docs", 2, vec![0.0, 1.0, 1.0].into()))
            .unwrap();

        let js = registry.get(JENSEN_SHANNON).unwrap();
        assert_eq!(js.order(), ScoreOrder::Ascending);
        let d = js
            .score_dense("docs", 1, &[1.0, 1.0, 0.0], "docs", 2, &[0.0, 1.0, 1.0])
            .unwrap();
        assert!((d - 0.5).abs() < EPS);

        registry.detach_space("docs").unwrap();
        assert!(js
            .score_dense("docs", 1, &[1.0, 1.0, 0.0], "docs", 2, &[0.0, 1.0, 1.0])
            .is_err());
    }
}
