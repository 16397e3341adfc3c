//! Per-space cache of the sufficient statistics each divergence score needs.
//!
//! Each attached space owns a map from vector id to [`CacheEntry`]. An entry
//! is written as a single value, so a reader sees either the old pair of
//! scalars or the new one, never a mix.

use std::sync::{
    atomic::{AtomicUsize, Ordering},
    Arc,
};

use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use tracing::{debug, instrument, warn};

use crate::config::DivergenceConfig;
use crate::entropy;
use crate::error::{DivergenceError, Result};
use crate::stats::DivergenceStats;
use crate::vector::{check_weight, SparseVector, VectorPayload};
use crate::VectorId;

/// Cached statistics for one vector.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CacheEntry {
    /// Sum of the raw weights.
    pub mass: f32,
    /// `Σ (w/mass) * log2(w/mass)`, the negated Shannon entropy.
    pub entropy_term: f32,
}

impl CacheEntry {
    /// Compute statistics for `weights`, or `None` when the mass is zero.
    pub fn compute(weights: &[f32]) -> Option<Self> {
        let mass = entropy::mass(weights.iter().copied());
        if mass <= 0.0 {
            return None;
        }
        Some(Self {
            mass,
            entropy_term: entropy::entropy_term(weights.iter().copied(), mass),
        })
    }

    /// Shannon entropy of the normalized vector, in bits.
    #[inline]
    pub fn entropy(&self) -> f32 {
        -self.entropy_term
    }
}

/// The cache section belonging to one attached space.
#[derive(Debug, Default)]
pub struct SpaceStatistics {
    entries: DashMap<VectorId, CacheEntry>,
}

impl SpaceStatistics {
    fn with_capacity(capacity: usize) -> Self {
        Self {
            entries: DashMap::with_capacity(capacity),
        }
    }

    pub fn get(&self, id: VectorId) -> Option<CacheEntry> {
        self.entries.get(&id).map(|e| *e.value())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }
}

/// Statistics cache keyed by vector space and vector id.
pub struct StatisticsCache {
    spaces: DashMap<String, Arc<SpaceStatistics>>,
    attached: AtomicUsize,
    space_capacity: usize,
    max_spaces: usize,
    strict_remove: bool,
    stats: Arc<DivergenceStats>,
}

impl StatisticsCache {
    /// Create a cache with default configuration.
    pub fn new() -> Self {
        Self::with_config(&DivergenceConfig::default(), Arc::new(DivergenceStats::new()))
    }

    pub fn with_config(config: &DivergenceConfig, stats: Arc<DivergenceStats>) -> Self {
        Self {
            spaces: DashMap::new(),
            attached: AtomicUsize::new(0),
            space_capacity: config.space_capacity,
            max_spaces: config.max_spaces,
            strict_remove: config.strict_remove,
            stats,
        }
    }

    /// Create an empty section for `space`.
    ///
    /// Must be called before any vector of that space is updated. The space
    /// limit is reserved while the slot is held, so concurrent attaches never
    /// exceed `max_spaces`.
    #[instrument(skip(self))]
    pub fn attach_space(&self, space: &str) -> Result<()> {
        match self.spaces.entry(space.to_string()) {
            Entry::Occupied(_) => Err(DivergenceError::SpaceAlreadyAttached(space.to_string())),
            Entry::Vacant(slot) => {
                let limit = self.max_spaces;
                self.attached
                    .fetch_update(Ordering::AcqRel, Ordering::Acquire, |n| {
                        (n < limit).then_some(n + 1)
                    })
                    .map_err(|current| DivergenceError::SpaceLimitExceeded { current, limit })?;
                slot.insert(Arc::new(SpaceStatistics::with_capacity(self.space_capacity)));
                self.stats.increment_spaces();
                Ok(())
            },
        }
    }

    /// Drop the whole section for `space`, returning how many entries it held.
    #[instrument(skip(self))]
    pub fn detach_space(&self, space: &str) -> Result<usize> {
        let (_, section) = self
            .spaces
            .remove(space)
            .ok_or_else(|| DivergenceError::SpaceNotAttached(space.to_string()))?;
        self.attached.fetch_sub(1, Ordering::AcqRel);
        self.stats.decrement_spaces();
        Ok(section.len())
    }

    pub fn is_attached(&self, space: &str) -> bool {
        self.spaces.contains_key(space)
    }

    fn section(&self, space: &str) -> Result<Arc<SpaceStatistics>> {
        self.spaces
            .get(space)
            .map(|s| Arc::clone(s.value()))
            .ok_or_else(|| DivergenceError::SpaceNotAttached(space.to_string()))
    }

    /// Recompute and store the statistics for `id` from its current content.
    ///
    /// A rejected vector also evicts any previous entry for `id`.
    pub fn update(&self, space: &str, id: VectorId, vector: &VectorPayload) -> Result<CacheEntry> {
        self.update_weights(space, id, vector.weights())
    }

    pub fn update_dense(&self, space: &str, id: VectorId, vector: &[f32]) -> Result<CacheEntry> {
        self.update_weights(space, id, vector)
    }

    pub fn update_sparse(
        &self,
        space: &str,
        id: VectorId,
        vector: &SparseVector,
    ) -> Result<CacheEntry> {
        self.update_weights(space, id, vector.values())
    }

    #[instrument(skip(self, weights), fields(len = weights.len()))]
    fn update_weights(&self, space: &str, id: VectorId, weights: &[f32]) -> Result<CacheEntry> {
        let section = self.section(space)?;

        match Self::compute_entry(space, id, weights) {
            Ok(entry) => {
                if section.entries.insert(id, entry).is_some() {
                    debug!(space, id, mass = entry.mass, "overwrote cached statistics");
                }
                self.stats.record_update();
                Ok(entry)
            },
            Err(e) => {
                section.entries.remove(&id);
                self.stats.record_rejected();
                warn!(space, id, error = %e, "rejected vector update");
                Err(e)
            },
        }
    }

    fn compute_entry(space: &str, id: VectorId, weights: &[f32]) -> Result<CacheEntry> {
        for (i, &w) in weights.iter().enumerate() {
            check_weight(w, i)?;
        }
        let entry =
            CacheEntry::compute(weights).ok_or_else(|| DivergenceError::degenerate(space, id))?;
        if !entry.mass.is_finite() {
            return Err(DivergenceError::InvalidVectorLayout(format!(
                "mass of {space}/{id} overflows"
            )));
        }
        Ok(entry)
    }

    /// Delete the entry for `id`, returning whether one existed.
    #[instrument(skip(self))]
    pub fn remove(&self, space: &str, id: VectorId) -> Result<bool> {
        let section = self.section(space)?;
        let removed = section.entries.remove(&id).is_some();
        if removed {
            self.stats.record_removal();
        } else if self.strict_remove {
            warn!(space, id, "remove of uncached vector");
            return Err(DivergenceError::not_found(space, id));
        }
        Ok(removed)
    }

    /// Look up the statistics for `id`.
    pub fn get(&self, space: &str, id: VectorId) -> Result<CacheEntry> {
        self.spaces
            .get(space)
            .and_then(|s| s.get(id))
            .ok_or_else(|| DivergenceError::not_found(space, id))
    }

    pub fn contains(&self, space: &str, id: VectorId) -> bool {
        self.spaces
            .get(space)
            .is_some_and(|s| s.entries.contains_key(&id))
    }

    /// Number of entries in `space`, or `None` if it is not attached.
    pub fn len(&self, space: &str) -> Option<usize> {
        self.spaces.get(space).map(|s| s.len())
    }

    pub fn spaces(&self) -> Vec<String> {
        self.spaces.iter().map(|s| s.key().clone()).collect()
    }

    pub fn total_entries(&self) -> usize {
        self.spaces.iter().map(|s| s.len()).sum()
    }
}

impl Default for StatisticsCache {
    fn default() -> Self {
        Self::new()
    }
}
