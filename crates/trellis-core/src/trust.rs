// crates/trellis-core/src/trust.rs
//
// Directed, weighted trust edges between identities.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::TrellisError;
use crate::identity::IdentityId;

/// Maximum trust comment length in characters.
pub const MAX_TRUST_COMMENT_LENGTH: usize = 256;

/// Trust value in -100..=100. Negative values express distrust.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "i32", into = "i32")]
pub struct TrustValue(i8);

impl TrustValue {
    pub const MIN: i32 = -100;
    pub const MAX: i32 = 100;

    pub fn get(self) -> i32 {
        i32::from(self.0)
    }

    pub fn is_positive(self) -> bool {
        self.0 > 0
    }
}

impl TryFrom<i32> for TrustValue {
    type Error = TrellisError;

    fn try_from(value: i32) -> Result<Self, Self::Error> {
        if !(Self::MIN..=Self::MAX).contains(&value) {
            return Err(TrellisError::InvalidParameter(format!(
                "trust value {} outside {}..={}",
                value,
                Self::MIN,
                Self::MAX
            )));
        }
        Ok(Self(value as i8))
    }
}

impl From<TrustValue> for i32 {
    fn from(value: TrustValue) -> Self {
        value.get()
    }
}

impl fmt::Display for TrustValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A trust edge Truster -> Trustee. At most one per ordered pair.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Trust {
    pub truster: IdentityId,
    pub trustee: IdentityId,
    pub value: TrustValue,
    pub comment: String,
    /// Edition of the truster's identity when the value was assigned.
    pub truster_edition: u64,
    pub assigned_at: DateTime<Utc>,
}

impl Trust {
    pub fn new(
        truster: IdentityId,
        trustee: IdentityId,
        value: TrustValue,
        comment: &str,
        truster_edition: u64,
        assigned_at: DateTime<Utc>,
    ) -> Result<Self, TrellisError> {
        validate_comment(comment)?;
        Ok(Self {
            truster,
            trustee,
            value,
            comment: comment.to_string(),
            truster_edition,
            assigned_at,
        })
    }
}

fn validate_comment(comment: &str) -> Result<(), TrellisError> {
    if comment.chars().count() > MAX_TRUST_COMMENT_LENGTH {
        return Err(TrellisError::InvalidParameter(format!(
            "trust comment longer than {} characters",
            MAX_TRUST_COMMENT_LENGTH
        )));
    }
    Ok(())
}
