//! Configuration for the divergence engine.

use serde::{Deserialize, Serialize};

/// Configuration for a [`JensenShannon`](crate::JensenShannon) scorer and its cache.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DivergenceConfig {
    /// Fail `remove` with `NotFound` when the id has no entry.
    ///
    /// When false, removing an absent id is a no-op.
    pub strict_remove: bool,

    /// Initial entry capacity reserved for each attached space.
    pub space_capacity: usize,

    /// Maximum number of simultaneously attached spaces.
    pub max_spaces: usize,

    /// Check raw weights passed at score time (nonnegative, finite).
    pub validate_weights: bool,
}

impl Default for DivergenceConfig {
    fn default() -> Self {
        Self {
            strict_remove: false,
            space_capacity: 1024,
            max_spaces: 4096,
            validate_weights: true,
        }
    }
}

impl DivergenceConfig {
    /// Create a configuration that reports every lifecycle mismatch.
    pub fn strict() -> Self {
        Self {
            strict_remove: true,
            ..Default::default()
        }
    }

    /// Create a configuration optimized for low memory usage.
    pub fn low_memory() -> Self {
        Self {
            space_capacity: 64,
            max_spaces: 256,
            ..Default::default()
        }
    }

    /// Validate the configuration.
    pub fn validate(&self) -> Result<(), String> {
        if self.max_spaces == 0 {
            return Err("max_spaces must be greater than 0".into());
        }

        if self.space_capacity > 1 << 28 {
            return Err(format!(
                "space_capacity must not exceed {}, got {}",
                1 << 28,
                self.space_capacity
            ));
        }

        Ok(())
    }
}
