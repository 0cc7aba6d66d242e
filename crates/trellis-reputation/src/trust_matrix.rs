// crates/trellis-reputation/src/trust_matrix.rs
//
// Trust matrix: sparse T(truster, trustee) trust values.
//
// Indexed both ways so the engine can walk given trust (rank traversal) and
// received trust (score aggregation) without scanning every edge.

use std::collections::{BTreeMap, HashMap};

use trellis_core::{IdentityId, TrustValue};

/// Read access to the trust edges of a graph snapshot.
pub trait TrustView {
    /// Edges given by `truster`, as (trustee, value).
    fn given(&self, truster: &IdentityId) -> Vec<(&IdentityId, TrustValue)>;

    /// Edges received by `trustee`, as (truster, value).
    fn received(&self, trustee: &IdentityId) -> Vec<(&IdentityId, TrustValue)>;
}

/// A sparse trust matrix where T(truster, trustee) = trust value.
///
/// At most one value per ordered pair; setting an existing pair replaces it.
#[derive(Debug, Clone, Default)]
pub struct TrustMatrix {
    given: HashMap<IdentityId, BTreeMap<IdentityId, TrustValue>>,
    received: HashMap<IdentityId, BTreeMap<IdentityId, TrustValue>>,
}

impl TrustMatrix {
    /// Create a new empty trust matrix.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the trust value from `truster` to `trustee`, returning the old value.
    pub fn set_trust(
        &mut self,
        truster: &IdentityId,
        trustee: &IdentityId,
        value: TrustValue,
    ) -> Option<TrustValue> {
        self.received
            .entry(trustee.clone())
            .or_default()
            .insert(truster.clone(), value);
        self.given
            .entry(truster.clone())
            .or_default()
            .insert(trustee.clone(), value)
    }

    /// Remove the edge from `truster` to `trustee`, returning its value.
    pub fn remove_trust(&mut self, truster: &IdentityId, trustee: &IdentityId) -> Option<TrustValue> {
        if let Some(row) = self.received.get_mut(trustee) {
            row.remove(truster);
            if row.is_empty() {
                self.received.remove(trustee);
            }
        }
        let removed = self.given.get_mut(truster).and_then(|row| row.remove(trustee));
        if self.given.get(truster).is_some_and(|row| row.is_empty()) {
            self.given.remove(truster);
        }
        removed
    }

    /// Get the trust value from `truster` to `trustee`, if any.
    pub fn get_trust(&self, truster: &IdentityId, trustee: &IdentityId) -> Option<TrustValue> {
        self.given.get(truster).and_then(|row| row.get(trustee)).copied()
    }

    /// Number of edges in the matrix.
    pub fn len(&self) -> usize {
        self.given.values().map(BTreeMap::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.given.is_empty()
    }
}

impl TrustView for TrustMatrix {
    fn given(&self, truster: &IdentityId) -> Vec<(&IdentityId, TrustValue)> {
        self.given
            .get(truster)
            .map(|row| row.iter().map(|(id, v)| (id, *v)).collect())
            .unwrap_or_default()
    }

    fn received(&self, trustee: &IdentityId) -> Vec<(&IdentityId, TrustValue)> {
        self.received
            .get(trustee)
            .map(|row| row.iter().map(|(id, v)| (id, *v)).collect())
            .unwrap_or_default()
    }
}
