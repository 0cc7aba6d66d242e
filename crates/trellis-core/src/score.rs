// crates/trellis-core/src/score.rs
//
// Derived scores: rank, capacity and aggregate trust of a target from the
// perspective of one trust anchor (an own identity).

use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::TrellisError;
use crate::identity::IdentityId;

/// One row of an anchor's trust tree.
///
/// A missing row means the target is not in the anchor's trust tree. That is
/// distinct from a row with `score == 0`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Score {
    pub anchor: IdentityId,
    pub target: IdentityId,
    pub score: i32,
    /// Hop distance from the anchor over positive trust edges.
    pub rank: u32,
    /// Influence the target's own trust values carry, derived from rank.
    pub capacity: u32,
}

/// Bucket selector for listing identities by the sign of their score.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ScoreSign {
    Positive,
    Negative,
    Zero,
}

impl ScoreSign {
    pub fn matches(self, score: i32) -> bool {
        match (self, score.cmp(&0)) {
            (ScoreSign::Positive, Ordering::Greater) => true,
            (ScoreSign::Negative, Ordering::Less) => true,
            (ScoreSign::Zero, Ordering::Equal) => true,
            _ => false,
        }
    }
}

impl FromStr for ScoreSign {
    type Err = TrellisError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "+" => Ok(ScoreSign::Positive),
            "-" => Ok(ScoreSign::Negative),
            "0" => Ok(ScoreSign::Zero),
            other => Err(TrellisError::InvalidParameter(format!(
                "unhandled select value ({})",
                other
            ))),
        }
    }
}

impl fmt::Display for ScoreSign {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ScoreSign::Positive => write!(f, "+"),
            ScoreSign::Negative => write!(f, "-"),
            ScoreSign::Zero => write!(f, "0"),
        }
    }
}
