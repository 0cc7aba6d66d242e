// crates/trellis-reputation/src/capacity.rs
//
// Capacity curve: how much influence an identity's own trust values carry,
// as a function of its rank in a trust tree.
//
// The default table models roughly exponential decay. Ranks at or beyond
// the table length are past the cutoff and are not part of any trust tree.

use serde::{Deserialize, Serialize};

use trellis_core::TrellisError;

/// Default capacity for ranks 0, 1, 2, ...
pub const DEFAULT_CAPACITIES: [u32; 6] = [100, 40, 16, 6, 2, 1];

/// Configuration for trust-tree computation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScoreConfig {
    /// Capacity per rank. Must be non-empty, positive and non-increasing.
    pub capacities: Vec<u32>,
    /// Minimum trust value for an edge to carry rank. Must be at least 1.
    pub positive_threshold: i32,
}

impl Default for ScoreConfig {
    fn default() -> Self {
        Self {
            capacities: DEFAULT_CAPACITIES.to_vec(),
            positive_threshold: 1,
        }
    }
}

impl ScoreConfig {
    pub fn validate(&self) -> Result<(), TrellisError> {
        if self.capacities.is_empty() {
            return Err(TrellisError::InvalidParameter(
                "capacity table must not be empty".to_string(),
            ));
        }
        if self.capacities.iter().any(|&c| c == 0 || c > 100) {
            return Err(TrellisError::InvalidParameter(
                "capacities must lie in 1..=100".to_string(),
            ));
        }
        if self.capacities.windows(2).any(|w| w[1] > w[0]) {
            return Err(TrellisError::InvalidParameter(
                "capacities must not increase with rank".to_string(),
            ));
        }
        if self.positive_threshold < 1 {
            return Err(TrellisError::InvalidParameter(format!(
                "positive trust threshold must be at least 1, got {}",
                self.positive_threshold
            )));
        }
        Ok(())
    }

    /// Capacity at `rank`, or `None` past the cutoff.
    pub fn capacity(&self, rank: u32) -> Option<u32> {
        self.capacities.get(rank as usize).copied()
    }

    /// Highest rank that still belongs to a trust tree.
    pub fn max_rank(&self) -> u32 {
        (self.capacities.len() as u32).saturating_sub(1)
    }
}
