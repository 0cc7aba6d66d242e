// crates/trellis-graph/src/graph.rs
//
// TrustGraph: the locked in-memory graph plus its persistence.
//
// Every mutation runs under the write lock as
//   apply edge changes -> recompute affected trust trees -> commit one batch -> swap
// and a failed commit reverts the edge changes, leaving the previous trees and
// records in place. Reads take the read lock and therefore observe either all
// or none of a mutation.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};

use trellis_core::error::TrellisError;
use trellis_core::identity::{Identity, IdentityId, IdentityRecord, OwnIdentity};
use trellis_core::score::Score;
use trellis_core::traits::{GraphPersistence, StoreOp};
use trellis_core::trust::Trust;
use trellis_core::uri::RequestUri;
use trellis_reputation::{ScoreEngine, TrustMatrix, TrustTree, TrustView};

/// Context selector that matches every identity.
pub const ALL_CONTEXTS: &str = "all";

/// True if `identity` is selected by `context`.
pub fn matches_context(identity: &Identity, context: &str) -> bool {
    context == ALL_CONTEXTS || identity.has_context(context)
}

pub(crate) type EdgeKey = (IdentityId, IdentityId);

#[derive(Debug, Default)]
pub(crate) struct GraphState {
    pub(crate) identities: BTreeMap<IdentityId, IdentityRecord>,
    pub(crate) trusts: BTreeMap<EdgeKey, Trust>,
    pub(crate) matrix: TrustMatrix,
    /// One tree per own identity.
    pub(crate) trees: BTreeMap<IdentityId, TrustTree>,
}

impl GraphState {
    pub(crate) fn record(&self, id: &IdentityId) -> Result<&IdentityRecord, TrellisError> {
        self.identities
            .get(id)
            .ok_or_else(|| TrellisError::UnknownIdentity(id.to_string()))
    }

    pub(crate) fn own(&self, id: &IdentityId) -> Result<&OwnIdentity, TrellisError> {
        self.record(id)?
            .as_own()
            .ok_or_else(|| TrellisError::UnknownIdentity(format!("{} is not an own identity", id)))
    }

    pub(crate) fn tree(&self, anchor: &IdentityId) -> Result<&TrustTree, TrellisError> {
        self.own(anchor)?;
        self.trees
            .get(anchor)
            .ok_or_else(|| TrellisError::UnknownIdentity(anchor.to_string()))
    }

    /// Trusts given by `truster`, in trustee order.
    pub(crate) fn given(&self, truster: &IdentityId) -> Vec<&Trust> {
        self.matrix
            .given(truster)
            .into_iter()
            .filter_map(|(trustee, _)| self.trusts.get(&(truster.clone(), trustee.clone())))
            .collect()
    }

    /// Trusts received by `trustee`, in truster order.
    pub(crate) fn received(&self, trustee: &IdentityId) -> Vec<&Trust> {
        self.matrix
            .received(trustee)
            .into_iter()
            .filter_map(|(truster, _)| self.trusts.get(&(truster.clone(), trustee.clone())))
            .collect()
    }

    /// Resolve an identity id or request URI to the id of a known identity.
    pub(crate) fn resolve(&self, reference: &str) -> Result<IdentityId, TrellisError> {
        let reference = reference.trim();
        let id = match reference.parse::<IdentityId>() {
            Ok(id) => id,
            Err(_) => reference.parse::<RequestUri>()?.identity_id(),
        };
        self.record(&id)?;
        Ok(id)
    }
}

/// One edge change within a mutation.
#[derive(Debug, Clone)]
pub(crate) enum EdgeChange {
    Set(Trust),
    Remove { truster: IdentityId, trustee: IdentityId },
}

/// Everything one mutation writes. Records are upserts.
#[derive(Debug, Default)]
pub(crate) struct Mutation {
    pub(crate) records: Vec<IdentityRecord>,
    pub(crate) edges: Vec<EdgeChange>,
    /// Own identities whose trees must be built from scratch.
    pub(crate) new_anchors: Vec<IdentityId>,
}

/// The trust graph store.
pub struct TrustGraph {
    state: RwLock<GraphState>,
    persistence: Arc<dyn GraphPersistence>,
    engine: ScoreEngine,
}

impl TrustGraph {
    /// Load the persisted graph and recompute every anchor's tree. Stored
    /// score rows that disagree with the recomputation are rewritten.
    pub fn open(
        persistence: Arc<dyn GraphPersistence>,
        engine: ScoreEngine,
    ) -> Result<Self, TrellisError> {
        let snapshot = persistence.load()?;
        let mut state = GraphState::default();

        for record in snapshot.identities {
            state.identities.insert(record.identity().id.clone(), record);
        }
        for trust in snapshot.trusts {
            state
                .matrix
                .set_trust(&trust.truster, &trust.trustee, trust.value);
            state
                .trusts
                .insert((trust.truster.clone(), trust.trustee.clone()), trust);
        }

        let mut stored: BTreeMap<IdentityId, Vec<Score>> = BTreeMap::new();
        for score in snapshot.scores {
            stored.entry(score.anchor.clone()).or_default().push(score);
        }

        let anchors: Vec<IdentityId> = state
            .identities
            .values()
            .filter(|record| record.is_own())
            .map(|record| record.identity().id.clone())
            .collect();

        let mut ops = Vec::new();
        for anchor in anchors {
            let previous =
                TrustTree::from_scores(anchor.clone(), stored.remove(&anchor).unwrap_or_default())?;
            let tree = engine.compute_tree(&anchor, &state.matrix);
            ops.extend(tree.diff_from(&previous));
            state.trees.insert(anchor, tree);
        }
        // Rows of anchors that are no longer own identities.
        for score in stored.into_values().flatten() {
            ops.push(StoreOp::DeleteScore {
                anchor: score.anchor,
                target: score.target,
            });
        }

        if !ops.is_empty() {
            tracing::warn!("Rewriting {} stale score rows after restart", ops.len());
            persistence.commit(&ops)?;
        }

        tracing::info!(
            "Trust graph opened: {} identities, {} trusts, {} trust trees",
            state.identities.len(),
            state.trusts.len(),
            state.trees.len()
        );

        Ok(Self {
            state: RwLock::new(state),
            persistence,
            engine,
        })
    }

    pub(crate) fn read(&self) -> Result<RwLockReadGuard<'_, GraphState>, TrellisError> {
        self.state
            .read()
            .map_err(|e| TrellisError::Persistence(format!("RwLock poisoned: {}", e)))
    }

    pub(crate) fn write(&self) -> Result<RwLockWriteGuard<'_, GraphState>, TrellisError> {
        self.state
            .write()
            .map_err(|e| TrellisError::Persistence(format!("RwLock poisoned: {}", e)))
    }

    /// Resolve an identity id or request URI to a known identity's id.
    pub fn resolve(&self, reference: &str) -> Result<IdentityId, TrellisError> {
        self.read()?.resolve(reference)
    }

    /// Apply a mutation atomically. The caller holds the write lock.
    pub(crate) fn apply(
        &self,
        state: &mut GraphState,
        mutation: Mutation,
    ) -> Result<(), TrellisError> {
        let mut ops: Vec<StoreOp> = mutation
            .records
            .iter()
            .cloned()
            .map(StoreOp::PutIdentity)
            .collect();

        // Previous value of every edge touched, for rollback.
        let mut undo: Vec<(EdgeKey, Option<Trust>)> = Vec::new();
        let mut trusters = BTreeSet::new();
        for change in mutation.edges {
            match change {
                EdgeChange::Set(trust) => {
                    let key = (trust.truster.clone(), trust.trustee.clone());
                    state
                        .matrix
                        .set_trust(&trust.truster, &trust.trustee, trust.value);
                    trusters.insert(trust.truster.clone());
                    ops.push(StoreOp::PutTrust(trust.clone()));
                    let previous = state.trusts.insert(key.clone(), trust);
                    undo.push((key, previous));
                }
                EdgeChange::Remove { truster, trustee } => {
                    let key = (truster.clone(), trustee.clone());
                    if let Some(previous) = state.trusts.remove(&key) {
                        state.matrix.remove_trust(&truster, &trustee);
                        trusters.insert(truster.clone());
                        ops.push(StoreOp::DeleteTrust { truster, trustee });
                        undo.push((key, Some(previous)));
                    }
                }
            }
        }

        // A tree can only change if a truster of a changed edge is in it.
        let mut anchors: BTreeSet<IdentityId> = state
            .trees
            .iter()
            .filter(|(anchor, tree)| {
                trusters
                    .iter()
                    .any(|truster| truster == *anchor || tree.contains(truster))
            })
            .map(|(anchor, _)| anchor.clone())
            .collect();
        anchors.extend(mutation.new_anchors);

        let mut trees = Vec::with_capacity(anchors.len());
        for anchor in anchors {
            let tree = self.engine.compute_tree(&anchor, &state.matrix);
            let empty = TrustTree::new(anchor.clone());
            ops.extend(tree.diff_from(state.trees.get(&anchor).unwrap_or(&empty)));
            trees.push(tree);
        }

        if let Err(e) = self.persistence.commit(&ops) {
            tracing::error!("Graph commit failed, rolling back {} edge changes: {}", undo.len(), e);
            for ((truster, trustee), previous) in undo.into_iter().rev() {
                match previous {
                    Some(trust) => {
                        state.matrix.set_trust(&truster, &trustee, trust.value);
                        state.trusts.insert((truster, trustee), trust);
                    }
                    None => {
                        state.matrix.remove_trust(&truster, &trustee);
                        state.trusts.remove(&(truster, trustee));
                    }
                }
            }
            return Err(e);
        }

        for record in mutation.records {
            state.identities.insert(record.identity().id.clone(), record);
        }
        for tree in trees {
            tracing::debug!("Swapped trust tree of {} ({} rows)", tree.anchor(), tree.len());
            state.trees.insert(tree.anchor().clone(), tree);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::identities::NewOwnIdentity;
    use rand::rngs::StdRng;
    use rand::{Rng, SeedableRng};
    use trellis_core::{GraphSnapshot, InsertUri, TrustValue};
    use trellis_store::MemoryStore;

    fn open(store: &Arc<MemoryStore>) -> TrustGraph {
        TrustGraph::open(store.clone(), ScoreEngine::default()).unwrap()
    }

    #[test]
    fn resolve_accepts_id_and_request_uri() {
        let store = Arc::new(MemoryStore::new());
        let graph = open(&store);
        let own = graph
            .create_own_identity(NewOwnIdentity::new("alice"))
            .unwrap();

        let uri = own.identity.request_uri.to_string();
        assert_eq!(graph.resolve(&uri).unwrap(), *own.id());
        assert_eq!(graph.resolve(own.id().as_str()).unwrap(), *own.id());

        let stranger = InsertUri::generate().request_uri().to_string();
        assert!(matches!(
            graph.resolve(&stranger),
            Err(TrellisError::UnknownIdentity(_))
        ));
        assert!(matches!(
            graph.resolve("not a uri"),
            Err(TrellisError::InvalidParameter(_))
        ));
    }

    #[test]
    fn reopen_restores_graph_and_trees() {
        let store = Arc::new(MemoryStore::new());
        let (alice, bob) = {
            let graph = open(&store);
            let alice = graph.create_own_identity(NewOwnIdentity::new("alice")).unwrap();
            let bob = graph
                .add_identity(InsertUri::generate().request_uri())
                .unwrap();
            graph
                .set_trust(alice.id(), &bob.id, TrustValue::try_from(60).unwrap(), "ok")
                .unwrap();
            (alice, bob)
        };

        let graph = open(&store);
        assert_eq!(graph.get_score(alice.id(), &bob.id).unwrap().score, 60);
        assert_eq!(graph.get_trust(alice.id(), &bob.id).unwrap().comment, "ok");
    }

    #[test]
    fn stale_rows_are_rewritten_on_open() {
        let store = Arc::new(MemoryStore::new());
        let alice = {
            let graph = open(&store);
            graph.create_own_identity(NewOwnIdentity::new("alice")).unwrap()
        };

        // Corrupt the stored self row and leave a row of a vanished anchor.
        let ghost: IdentityId = format!("{:064x}", 7).parse().unwrap();
        store
            .commit(&[
                StoreOp::PutScore(Score {
                    anchor: alice.id().clone(),
                    target: alice.id().clone(),
                    score: 3,
                    rank: 0,
                    capacity: 100,
                }),
                StoreOp::PutScore(Score {
                    anchor: ghost.clone(),
                    target: ghost,
                    score: 100,
                    rank: 0,
                    capacity: 100,
                }),
            ])
            .unwrap();

        let _graph = open(&store);
        let GraphSnapshot { scores, .. } = store.load().unwrap();
        assert_eq!(scores.len(), 1);
        assert_eq!(scores[0].score, 100);
    }

    #[test]
    fn failed_commit_keeps_previous_state() {
        let store = Arc::new(MemoryStore::new());
        let graph = open(&store);
        let alice = graph.create_own_identity(NewOwnIdentity::new("alice")).unwrap();
        let bob = graph.add_identity(InsertUri::generate().request_uri()).unwrap();
        graph
            .set_trust(alice.id(), &bob.id, TrustValue::try_from(50).unwrap(), "")
            .unwrap();

        store.fail_next_commit();
        let result = graph.set_trust(alice.id(), &bob.id, TrustValue::try_from(-50).unwrap(), "");
        assert!(matches!(result, Err(TrellisError::Persistence(_))));

        assert_eq!(graph.get_trust(alice.id(), &bob.id).unwrap().value.get(), 50);
        assert_eq!(graph.get_score(alice.id(), &bob.id).unwrap().score, 50);
        // The own truster was not marked modified either.
        let own = graph.own_identity(alice.id()).unwrap();
        assert_eq!(own.revision, 1);
    }

    #[test]
    fn random_mutations_match_full_recompute() {
        let store = Arc::new(MemoryStore::new());
        let graph = open(&store);
        let mut ids: Vec<IdentityId> = (0..4)
            .map(|n| {
                let own = graph
                    .create_own_identity(NewOwnIdentity::new(&format!("anchor{}", n)))
                    .unwrap();
                own.id().clone()
            })
            .collect();
        for _ in 0..16 {
            ids.push(graph.add_identity(InsertUri::generate().request_uri()).unwrap().id);
        }

        let mut rng = StdRng::seed_from_u64(0x7e11);
        for step in 0..3000 {
            let truster = &ids[rng.gen_range(0..ids.len())];
            let trustee = &ids[rng.gen_range(0..ids.len())];
            if rng.gen_bool(0.25) {
                if let Err(e) = graph.remove_trust(truster, trustee) {
                    assert!(matches!(e, TrellisError::NotTrusted { .. }), "step {}: {}", step, e);
                }
            } else {
                let value = TrustValue::try_from(rng.gen_range(-100..=100)).unwrap();
                graph.set_trust(truster, trustee, value, "").unwrap();
            }

            // Skipped anchors must hold exactly what a full recompute yields.
            let state = graph.read().unwrap();
            assert_eq!(state.trees.len(), 4);
            for (anchor, tree) in &state.trees {
                let full = graph.engine.compute_tree(anchor, &state.matrix);
                assert_eq!(tree, &full, "tree of {} diverged at step {}", anchor, step);
            }
        }
    }
}
