use thiserror::Error;

use crate::VectorId;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DivergenceError {
    #[error("statistics not found: {0}")]
    NotFound(String),

    #[error("vector space not attached: {0}")]
    SpaceNotAttached(String),

    #[error("vector space already attached: {0}")]
    SpaceAlreadyAttached(String),

    #[error("space limit exceeded: {current} spaces >= {limit} limit")]
    SpaceLimitExceeded { current: usize, limit: usize },

    #[error("precondition violation: {0}")]
    PreconditionViolation(String),

    #[error("invalid vector layout: {0}")]
    InvalidVectorLayout(String),

    #[error("degenerate vector: {space}/{id} has zero mass")]
    DegenerateVector { space: String, id: VectorId },

    #[error("scorer already registered: {0}")]
    DuplicateScorer(String),

    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
}

impl DivergenceError {
    pub(crate) fn not_found(space: &str, id: VectorId) -> Self {
        Self::NotFound(format!("{space}/{id}"))
    }

    pub(crate) fn degenerate(space: &str, id: VectorId) -> Self {
        Self::DegenerateVector {
            space: space.to_string(),
            id,
        }
    }
}

pub type Result<T> = std::result::Result<T, DivergenceError>;
