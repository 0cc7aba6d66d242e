// crates/trellis-reputation/src/tree.rs
//
// TrustTree: the full score set of one anchor, produced as a value and
// swapped in whole.

use std::collections::BTreeMap;

use trellis_core::{IdentityId, Score, ScoreSign, StoreOp, TrellisError};

/// Every score row of one trust anchor, keyed by target.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TrustTree {
    anchor: IdentityId,
    scores: BTreeMap<IdentityId, Score>,
}

impl TrustTree {
    pub fn new(anchor: IdentityId) -> Self {
        Self {
            anchor,
            scores: BTreeMap::new(),
        }
    }

    /// Rebuild a tree from stored rows. Every row must belong to `anchor`.
    pub fn from_scores(
        anchor: IdentityId,
        scores: impl IntoIterator<Item = Score>,
    ) -> Result<Self, TrellisError> {
        let mut tree = Self::new(anchor);
        for score in scores {
            tree.insert(score)?;
        }
        Ok(tree)
    }

    /// Add a row. Fails on a second row for the same target.
    pub fn insert(&mut self, score: Score) -> Result<(), TrellisError> {
        if score.anchor != self.anchor {
            return Err(TrellisError::InvalidParameter(format!(
                "score for anchor {} inserted into tree of {}",
                score.anchor, self.anchor
            )));
        }
        if self.scores.contains_key(&score.target) {
            return Err(TrellisError::DuplicateScore {
                anchor: self.anchor.to_string(),
                target: score.target.to_string(),
            });
        }
        self.scores.insert(score.target.clone(), score);
        Ok(())
    }

    /// Add a row computed by the engine, which ranks each target once.
    pub(crate) fn push_ranked(&mut self, score: Score) {
        debug_assert_eq!(score.anchor, self.anchor);
        self.scores.insert(score.target.clone(), score);
    }

    pub fn anchor(&self) -> &IdentityId {
        &self.anchor
    }

    /// The row for `target`, or `NotInTrustTree` when there is none.
    pub fn get(&self, target: &IdentityId) -> Result<&Score, TrellisError> {
        self.scores
            .get(target)
            .ok_or_else(|| TrellisError::NotInTrustTree {
                anchor: self.anchor.to_string(),
                target: target.to_string(),
            })
    }

    pub fn contains(&self, target: &IdentityId) -> bool {
        self.scores.contains_key(target)
    }

    pub fn len(&self) -> usize {
        self.scores.len()
    }

    pub fn is_empty(&self) -> bool {
        self.scores.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Score> {
        self.scores.values()
    }

    /// Rows whose score has the given sign. Absent targets never match.
    pub fn by_sign(&self, sign: ScoreSign) -> impl Iterator<Item = &Score> {
        self.scores.values().filter(move |s| sign.matches(s.score))
    }

    /// Persistence ops turning `previous` into `self`: puts for new or
    /// changed rows, deletes for rows that disappeared.
    pub fn diff_from(&self, previous: &TrustTree) -> Vec<StoreOp> {
        let mut ops = Vec::new();
        for (target, score) in &self.scores {
            if previous.scores.get(target) != Some(score) {
                ops.push(StoreOp::PutScore(score.clone()));
            }
        }
        for target in previous.scores.keys() {
            if !self.scores.contains_key(target) {
                ops.push(StoreOp::DeleteScore {
                    anchor: previous.anchor.clone(),
                    target: target.clone(),
                });
            }
        }
        ops
    }
}
