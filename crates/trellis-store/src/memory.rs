// crates/trellis-store/src/memory.rs
//
// In-memory persistence for tests and the `memory` daemon mode.

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;

use trellis_core::error::TrellisError;
use trellis_core::identity::{IdentityId, IdentityRecord};
use trellis_core::score::Score;
use trellis_core::traits::{GraphPersistence, GraphSnapshot, StoreOp};
use trellis_core::trust::Trust;

#[derive(Debug, Clone, Default)]
struct Tables {
    identities: BTreeMap<IdentityId, IdentityRecord>,
    trusts: BTreeMap<(IdentityId, IdentityId), Trust>,
    scores: BTreeMap<(IdentityId, IdentityId), Score>,
}

impl Tables {
    fn apply(&mut self, op: &StoreOp) {
        match op {
            StoreOp::PutIdentity(record) => {
                self.identities
                    .insert(record.identity().id.clone(), record.clone());
            }
            StoreOp::PutTrust(trust) => {
                self.trusts.insert(
                    (trust.truster.clone(), trust.trustee.clone()),
                    trust.clone(),
                );
            }
            StoreOp::DeleteTrust { truster, trustee } => {
                self.trusts.remove(&(truster.clone(), trustee.clone()));
            }
            StoreOp::PutScore(score) => {
                self.scores.insert(
                    (score.anchor.clone(), score.target.clone()),
                    score.clone(),
                );
            }
            StoreOp::DeleteScore { anchor, target } => {
                self.scores.remove(&(anchor.clone(), target.clone()));
            }
        }
    }
}

/// Volatile `GraphPersistence`. A commit can be made to fail once, which
/// lets callers exercise their rollback paths.
#[derive(Debug, Default)]
pub struct MemoryStore {
    tables: Mutex<Tables>,
    fail_next_commit: AtomicBool,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make the next `commit` return a persistence error without writing.
    pub fn fail_next_commit(&self) {
        self.fail_next_commit.store(true, Ordering::SeqCst);
    }

    fn lock(&self) -> Result<std::sync::MutexGuard<'_, Tables>, TrellisError> {
        self.tables
            .lock()
            .map_err(|_| TrellisError::Persistence("memory store lock poisoned".to_string()))
    }
}

impl GraphPersistence for MemoryStore {
    fn load(&self) -> Result<GraphSnapshot, TrellisError> {
        let tables = self.lock()?;
        Ok(GraphSnapshot {
            identities: tables.identities.values().cloned().collect(),
            trusts: tables.trusts.values().cloned().collect(),
            scores: tables.scores.values().cloned().collect(),
        })
    }

    fn commit(&self, ops: &[StoreOp]) -> Result<(), TrellisError> {
        if self.fail_next_commit.swap(false, Ordering::SeqCst) {
            return Err(TrellisError::Persistence(
                "injected commit failure".to_string(),
            ));
        }
        let mut tables = self.lock()?;
        for op in ops {
            tables.apply(op);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use trellis_core::{InsertUri, OwnIdentity};

    #[test]
    fn injected_failure_writes_nothing_and_clears() {
        let store = MemoryStore::new();
        let record = IdentityRecord::Own(
            OwnIdentity::new(InsertUri::generate(), "carol", false, Utc::now()).unwrap(),
        );
        let batch = [StoreOp::PutIdentity(record)];

        store.fail_next_commit();
        assert!(matches!(
            store.commit(&batch),
            Err(TrellisError::Persistence(_))
        ));
        assert!(store.load().unwrap().identities.is_empty());

        store.commit(&batch).unwrap();
        assert_eq!(store.load().unwrap().identities.len(), 1);
    }
}
