use std::fmt;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::time::Instant;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ScoreKind {
    Dense,
    Sparse,
}

impl fmt::Display for ScoreKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Dense => write!(f, "dense"),
            Self::Sparse => write!(f, "sparse"),
        }
    }
}

/// Thread-safe scorer statistics with atomic counters.
pub struct DivergenceStats {
    updates: AtomicU64,
    removals: AtomicU64,
    rejected: AtomicU64,

    dense_scores: AtomicU64,
    sparse_scores: AtomicU64,
    precondition_failures: AtomicU64,

    spaces: AtomicUsize,

    start_time: Instant,
}

impl DivergenceStats {
    #[must_use]
    pub fn new() -> Self {
        Self {
            updates: AtomicU64::new(0),
            removals: AtomicU64::new(0),
            rejected: AtomicU64::new(0),
            dense_scores: AtomicU64::new(0),
            sparse_scores: AtomicU64::new(0),
            precondition_failures: AtomicU64::new(0),
            spaces: AtomicUsize::new(0),
            start_time: Instant::now(),
        }
    }

    pub fn record_update(&self) {
        self.updates.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_removal(&self) {
        self.removals.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_rejected(&self) {
        self.rejected.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_score(&self, kind: ScoreKind) {
        match kind {
            ScoreKind::Dense => self.dense_scores.fetch_add(1, Ordering::Relaxed),
            ScoreKind::Sparse => self.sparse_scores.fetch_add(1, Ordering::Relaxed),
        };
    }

    pub fn record_precondition_failure(&self) {
        self.precondition_failures.fetch_add(1, Ordering::Relaxed);
    }

    pub fn increment_spaces(&self) {
        self.spaces.fetch_add(1, Ordering::Relaxed);
    }

    pub fn decrement_spaces(&self) {
        self.spaces
            .fetch_update(Ordering::Relaxed, Ordering::Relaxed, |v| {
                Some(v.saturating_sub(1))
            })
            .ok();
    }

    #[must_use]
    pub fn scores(&self, kind: ScoreKind) -> u64 {
        match kind {
            ScoreKind::Dense => self.dense_scores.load(Ordering::Relaxed),
            ScoreKind::Sparse => self.sparse_scores.load(Ordering::Relaxed),
        }
    }

    #[must_use]
    pub fn spaces(&self) -> usize {
        self.spaces.load(Ordering::Relaxed)
    }

    #[must_use]
    pub fn uptime_secs(&self) -> u64 {
        self.start_time.elapsed().as_secs()
    }

    #[must_use]
    pub fn snapshot(&self) -> StatsSnapshot {
        StatsSnapshot {
            updates: self.updates.load(Ordering::Relaxed),
            removals: self.removals.load(Ordering::Relaxed),
            rejected: self.rejected.load(Ordering::Relaxed),
            dense_scores: self.dense_scores.load(Ordering::Relaxed),
            sparse_scores: self.sparse_scores.load(Ordering::Relaxed),
            precondition_failures: self.precondition_failures.load(Ordering::Relaxed),
            spaces: self.spaces.load(Ordering::Relaxed),
            uptime_secs: self.uptime_secs(),
        }
    }
}

impl Default for DivergenceStats {
    fn default() -> Self {
        Self::new()
    }
}

/// Point-in-time copy of [`DivergenceStats`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatsSnapshot {
    pub updates: u64,
    pub removals: u64,
    pub rejected: u64,
    pub dense_scores: u64,
    pub sparse_scores: u64,
    pub precondition_failures: u64,
    pub spaces: usize,
    pub uptime_secs: u64,
}

impl StatsSnapshot {
    #[must_use]
    pub fn total_scores(&self) -> u64 {
        self.dense_scores + self.sparse_scores
    }
}

impl fmt::Display for StatsSnapshot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Divergence Statistics:")?;
        writeln!(f, "  Spaces: {}", self.spaces)?;
        writeln!(
            f,
            "  Updates: {} ({} rejected), removals: {}",
            self.updates, self.rejected, self.removals
        )?;
        writeln!(
            f,
            "  Scores: {} dense, {} sparse, {} precondition failures",
            self.dense_scores, self.sparse_scores, self.precondition_failures
        )?;
        write!(f, "  Uptime: {}s", self.uptime_secs)
    }
}
