// crates/trellis-graph/src/scores.rs
//
// Score queries against the current trust trees.

use std::collections::BTreeSet;

use trellis_core::error::TrellisError;
use trellis_core::identity::{Identity, IdentityId};
use trellis_core::score::{Score, ScoreSign};
use trellis_reputation::TrustTree;

use crate::graph::{matches_context, GraphState, TrustGraph};

impl TrustGraph {
    /// Score row of `target` in `anchor`'s tree. A target outside the tree
    /// is `NotInTrustTree`, never a zero score.
    pub fn get_score(&self, anchor: &IdentityId, target: &IdentityId) -> Result<Score, TrellisError> {
        let state = self.read()?;
        state.record(target)?;
        Ok(state.tree(anchor)?.get(target)?.clone())
    }

    /// Identities whose score has `sign`, filtered by `context`.
    ///
    /// With an anchor, only that anchor's tree is consulted. Without one,
    /// every own identity's tree is, and each target is reported once, for
    /// the first anchor in id order that selects it. Unreachable identities
    /// are in no bucket.
    pub fn identities_by_score(
        &self,
        anchor: Option<&IdentityId>,
        sign: ScoreSign,
        context: &str,
    ) -> Result<Vec<(Identity, Score)>, TrellisError> {
        let state = self.read()?;
        let trees: Vec<&TrustTree> = match anchor {
            Some(anchor) => vec![state.tree(anchor)?],
            None => state.trees.values().collect(),
        };

        let mut seen = BTreeSet::new();
        let mut selected = Vec::new();
        for tree in trees {
            for score in tree.by_sign(sign) {
                if seen.contains(&score.target) {
                    continue;
                }
                if let Some(identity) = selectable(&state, &score.target, context) {
                    seen.insert(score.target.clone());
                    selected.push((identity.clone(), score.clone()));
                }
            }
        }
        Ok(selected)
    }
}

fn selectable<'a>(state: &'a GraphState, target: &IdentityId, context: &str) -> Option<&'a Identity> {
    state
        .identities
        .get(target)
        .map(|record| record.identity())
        .filter(|identity| matches_context(identity, context))
}
