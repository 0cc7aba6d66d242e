// crates/trellis-graph/src/trusts.rs
//
// Trust edge operations. Each edge change recomputes the affected trust
// trees before it becomes durable.

use chrono::Utc;

use trellis_core::error::TrellisError;
use trellis_core::identity::{Identity, IdentityId, IdentityRecord};
use trellis_core::trust::{Trust, TrustValue};

use crate::graph::{matches_context, EdgeChange, GraphState, Mutation, TrustGraph};

impl TrustGraph {
    /// Create a new edge. Fails with `DuplicateTrust` if one exists.
    pub fn create_trust(
        &self,
        truster: &IdentityId,
        trustee: &IdentityId,
        value: TrustValue,
        comment: &str,
    ) -> Result<(), TrellisError> {
        let mut state = self.write()?;
        if state.trusts.contains_key(&(truster.clone(), trustee.clone())) {
            return Err(TrellisError::DuplicateTrust {
                truster: truster.to_string(),
                trustee: trustee.to_string(),
            });
        }
        self.put_trust(&mut state, truster, trustee, value, comment)
    }

    /// Create or overwrite the edge `truster -> trustee`.
    pub fn set_trust(
        &self,
        truster: &IdentityId,
        trustee: &IdentityId,
        value: TrustValue,
        comment: &str,
    ) -> Result<(), TrellisError> {
        let mut state = self.write()?;
        if let Some(existing) = state.trusts.get(&(truster.clone(), trustee.clone())) {
            if existing.value == value && existing.comment == comment {
                return Ok(());
            }
        }
        self.put_trust(&mut state, truster, trustee, value, comment)
    }

    /// Delete the edge `truster -> trustee`. Fails with `NotTrusted` if absent.
    pub fn remove_trust(&self, truster: &IdentityId, trustee: &IdentityId) -> Result<(), TrellisError> {
        let mut state = self.write()?;
        if !state.trusts.contains_key(&(truster.clone(), trustee.clone())) {
            return Err(TrellisError::NotTrusted {
                truster: truster.to_string(),
                trustee: trustee.to_string(),
            });
        }
        let mutation = Mutation {
            records: touched_truster(&state, truster)?.into_iter().collect(),
            edges: vec![EdgeChange::Remove {
                truster: truster.clone(),
                trustee: trustee.clone(),
            }],
            ..Mutation::default()
        };
        self.apply(&mut state, mutation)?;

        tracing::info!("Removed trust {} -> {}", truster, trustee);
        Ok(())
    }

    /// The edge `truster -> trustee`. Fails with `NotTrusted` if absent.
    pub fn get_trust(&self, truster: &IdentityId, trustee: &IdentityId) -> Result<Trust, TrellisError> {
        self.read()?
            .trusts
            .get(&(truster.clone(), trustee.clone()))
            .cloned()
            .ok_or_else(|| TrellisError::NotTrusted {
                truster: truster.to_string(),
                trustee: trustee.to_string(),
            })
    }

    /// Trusts received by `trustee` whose truster matches `context`.
    pub fn trusters(
        &self,
        trustee: &IdentityId,
        context: &str,
    ) -> Result<Vec<(Identity, Trust)>, TrellisError> {
        let state = self.read()?;
        state.record(trustee)?;
        state
            .received(trustee)
            .into_iter()
            .filter_map(|trust| select(&state, &trust.truster, trust, context))
            .collect()
    }

    /// Trusts given by `truster` whose trustee matches `context`.
    pub fn trustees(
        &self,
        truster: &IdentityId,
        context: &str,
    ) -> Result<Vec<(Identity, Trust)>, TrellisError> {
        let state = self.read()?;
        state.record(truster)?;
        state
            .given(truster)
            .into_iter()
            .filter_map(|trust| select(&state, &trust.trustee, trust, context))
            .collect()
    }

    fn put_trust(
        &self,
        state: &mut GraphState,
        truster: &IdentityId,
        trustee: &IdentityId,
        value: TrustValue,
        comment: &str,
    ) -> Result<(), TrellisError> {
        let truster_edition = state.record(truster)?.identity().edition();
        state.record(trustee)?;
        let trust = Trust::new(
            truster.clone(),
            trustee.clone(),
            value,
            comment,
            truster_edition,
            Utc::now(),
        )?;

        let mutation = Mutation {
            records: touched_truster(state, truster)?.into_iter().collect(),
            edges: vec![EdgeChange::Set(trust)],
            ..Mutation::default()
        };
        self.apply(state, mutation)?;

        tracing::info!("Set trust {} -> {} = {}", truster, trustee, value);
        Ok(())
    }
}

/// An own truster's trust list changed, so it needs a new insert.
fn touched_truster(
    state: &GraphState,
    truster: &IdentityId,
) -> Result<Option<IdentityRecord>, TrellisError> {
    let record = state.record(truster)?;
    if !record.is_own() {
        return Ok(None);
    }
    let mut record = record.clone();
    record.touch(Utc::now());
    Ok(Some(record))
}

fn select(
    state: &GraphState,
    other: &IdentityId,
    trust: &Trust,
    context: &str,
) -> Option<Result<(Identity, Trust), TrellisError>> {
    match state.record(other) {
        Ok(record) if matches_context(record.identity(), context) => {
            Some(Ok((record.identity().clone(), trust.clone())))
        }
        Ok(_) => None,
        Err(e) => Some(Err(e)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::identities::NewOwnIdentity;
    use std::sync::Arc;
    use trellis_core::InsertUri;
    use trellis_reputation::ScoreEngine;
    use trellis_store::MemoryStore;

    fn graph() -> TrustGraph {
        TrustGraph::open(Arc::new(MemoryStore::new()), ScoreEngine::default()).unwrap()
    }

    fn v(value: i32) -> TrustValue {
        TrustValue::try_from(value).unwrap()
    }

    fn remote(graph: &TrustGraph) -> IdentityId {
        graph
            .add_identity(InsertUri::generate().request_uri())
            .unwrap()
            .id
    }

    #[test]
    fn duplicate_create_conflicts_but_set_overwrites() {
        let graph = graph();
        let alice = graph.create_own_identity(NewOwnIdentity::new("alice")).unwrap();
        let bob = remote(&graph);

        graph.create_trust(alice.id(), &bob, v(20), "").unwrap();
        assert!(matches!(
            graph.create_trust(alice.id(), &bob, v(30), ""),
            Err(TrellisError::DuplicateTrust { .. })
        ));
        graph.set_trust(alice.id(), &bob, v(30), "better").unwrap();
        assert_eq!(graph.get_score(alice.id(), &bob).unwrap().score, 30);
    }

    #[test]
    fn chain_and_negative_root_edge() {
        let graph = graph();
        let a = graph.create_own_identity(NewOwnIdentity::new("a")).unwrap();
        let b = remote(&graph);
        let c = remote(&graph);
        graph.set_trust(a.id(), &b, v(100), "").unwrap();
        graph.set_trust(&b, &c, v(50), "").unwrap();
        assert_eq!(graph.get_score(a.id(), &c).unwrap().score, 20);

        graph.set_trust(a.id(), &b, v(-10), "").unwrap();
        assert!(matches!(
            graph.get_score(a.id(), &b),
            Err(TrellisError::NotInTrustTree { .. })
        ));
        assert!(matches!(
            graph.get_score(a.id(), &c),
            Err(TrellisError::NotInTrustTree { .. })
        ));
    }

    #[test]
    fn remove_trust_recomputes_and_reports_absence() {
        let graph = graph();
        let a = graph.create_own_identity(NewOwnIdentity::new("a")).unwrap();
        let b = remote(&graph);
        graph.set_trust(a.id(), &b, v(40), "").unwrap();
        graph.remove_trust(a.id(), &b).unwrap();
        assert!(graph.get_score(a.id(), &b).is_err());
        assert!(matches!(
            graph.remove_trust(a.id(), &b),
            Err(TrellisError::NotTrusted { .. })
        ));
    }

    #[test]
    fn edges_outside_a_tree_leave_it_alone() {
        let graph = graph();
        let a = graph.create_own_identity(NewOwnIdentity::new("a")).unwrap();
        let z = graph.create_own_identity(NewOwnIdentity::new("z")).unwrap();
        let b = remote(&graph);
        graph.set_trust(z.id(), &b, v(70), "").unwrap();
        // b is in z's tree only.
        assert!(graph.get_score(a.id(), &b).is_err());
        assert_eq!(graph.get_score(z.id(), &b).unwrap().score, 70);
    }

    #[test]
    fn trust_requires_known_identities_and_valid_comment() {
        let graph = graph();
        let a = graph.create_own_identity(NewOwnIdentity::new("a")).unwrap();
        let stranger = InsertUri::generate().request_uri().identity_id();
        assert!(matches!(
            graph.set_trust(a.id(), &stranger, v(1), ""),
            Err(TrellisError::UnknownIdentity(_))
        ));
        let b = remote(&graph);
        let long = "x".repeat(300);
        assert!(matches!(
            graph.set_trust(a.id(), &b, v(1), &long),
            Err(TrellisError::InvalidParameter(_))
        ));
    }

    #[test]
    fn trusters_and_trustees_filter_by_context() {
        let graph = graph();
        let a = graph
            .create_own_identity(NewOwnIdentity::new("a").with_context("Freetalk"))
            .unwrap();
        let b = remote(&graph);
        graph.set_trust(a.id(), &b, v(10), "hi").unwrap();

        let trusters = graph.trusters(&b, "Freetalk").unwrap();
        assert_eq!(trusters.len(), 1);
        assert_eq!(trusters[0].1.comment, "hi");
        assert!(graph.trustees(a.id(), "Freetalk").unwrap().is_empty());
        assert_eq!(graph.trustees(a.id(), "all").unwrap().len(), 1);
    }

    #[test]
    fn trust_change_marks_own_truster_for_insert() {
        let graph = graph();
        let a = graph.create_own_identity(NewOwnIdentity::new("a")).unwrap();
        let b = remote(&graph);
        graph.set_trust(a.id(), &b, v(10), "").unwrap();
        // Unchanged value and comment: no-op.
        graph.set_trust(a.id(), &b, v(10), "").unwrap();
        assert_eq!(graph.own_identity(a.id()).unwrap().revision, 1);
    }
}
