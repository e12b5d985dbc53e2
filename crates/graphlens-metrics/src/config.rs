//! Metrics parameters.

use serde::{Deserialize, Serialize};

use crate::{MetricsError, Result};

/// Default PageRank damping factor.
pub const DEFAULT_DAMPING: f64 = 0.85;

/// Default community detection seed.
pub const DEFAULT_COMMUNITY_SEED: u64 = 42;

/// Configuration for [`compute_with`](crate::compute_with).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MetricsConfig {
    /// Probability of following an edge rather than teleporting.
    pub damping: f64,
    /// Power-iteration cap.
    pub max_iterations: usize,
    /// L1 change between iterations below which PageRank stops early.
    pub tolerance: f64,
    /// Label-propagation pass cap.
    pub community_iterations: usize,
    /// Seed for the label-propagation traversal order.
    pub seed: u64,
}

impl Default for MetricsConfig {
    fn default() -> Self {
        Self {
            damping: DEFAULT_DAMPING,
            max_iterations: 20,
            tolerance: 1e-6,
            community_iterations: 20,
            seed: DEFAULT_COMMUNITY_SEED,
        }
    }
}

impl MetricsConfig {
    /// Parse a (possibly partial) JSON config and validate it.
    pub fn from_json_str(json: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    /// Reject values the algorithms cannot work with.
    pub fn validate(&self) -> Result<()> {
        if !(self.damping > 0.0 && self.damping < 1.0) {
            return Err(invalid(format!(
                "damping must be in (0, 1), got {}",
                self.damping
            )));
        }
        if self.tolerance.is_nan() || self.tolerance < 0.0 {
            return Err(invalid(format!(
                "tolerance must be non-negative, got {}",
                self.tolerance
            )));
        }
        Ok(())
    }
}

fn invalid(message: String) -> MetricsError {
    MetricsError::InvalidConfig { message }
}
