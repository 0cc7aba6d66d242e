// crates/trellis-store/src/rocks.rs
//
// RocksDB-backed persistence for the trust graph.
//
// Key format:
//   - `identity:{id}`                -> JSON-serialized IdentityRecord
//   - `trust:{truster}:{trustee}`    -> JSON-serialized Trust
//   - `score:{anchor}:{target}`      -> JSON-serialized Score
//
// Identity ids are fixed-length hex, so the `:` separators never collide.
// Every commit is a single WriteBatch, which RocksDB applies atomically.

use rocksdb::{DBWithThreadMode, MultiThreaded, Options, WriteBatch};
use serde::de::DeserializeOwned;

use trellis_core::error::TrellisError;
use trellis_core::identity::IdentityId;
use trellis_core::traits::{GraphPersistence, GraphSnapshot, StoreOp};

const IDENTITY_PREFIX: &str = "identity:";
const TRUST_PREFIX: &str = "trust:";
const SCORE_PREFIX: &str = "score:";

/// RocksDB wrapper implementing the `GraphPersistence` trait.
#[derive(Debug)]
pub struct RocksStore {
    db: DBWithThreadMode<MultiThreaded>,
}

impl RocksStore {
    /// Open a RocksDB database at the given filesystem path.
    ///
    /// Creates the database directory if it does not exist.
    pub fn open(path: &str) -> Result<Self, TrellisError> {
        let mut opts = Options::default();
        opts.create_if_missing(true);

        let db = DBWithThreadMode::<MultiThreaded>::open(&opts, path).map_err(|e| {
            TrellisError::Persistence(format!("Failed to open RocksDB at {}: {}", path, e))
        })?;

        Ok(Self { db })
    }

    fn identity_key(id: &IdentityId) -> Vec<u8> {
        format!("{}{}", IDENTITY_PREFIX, id).into_bytes()
    }

    fn trust_key(truster: &IdentityId, trustee: &IdentityId) -> Vec<u8> {
        format!("{}{}:{}", TRUST_PREFIX, truster, trustee).into_bytes()
    }

    fn score_key(anchor: &IdentityId, target: &IdentityId) -> Vec<u8> {
        format!("{}{}:{}", SCORE_PREFIX, anchor, target).into_bytes()
    }

    /// Decode every value stored under `prefix`.
    fn scan<T: DeserializeOwned>(&self, prefix: &str) -> Result<Vec<T>, TrellisError> {
        let prefix = prefix.as_bytes();
        let mut values = Vec::new();

        for item in self.db.prefix_iterator(prefix) {
            let (key, value) = item
                .map_err(|e| TrellisError::Persistence(format!("RocksDB iteration error: {}", e)))?;

            // Without a prefix extractor the iterator runs past the prefix.
            if !key.starts_with(prefix) {
                break;
            }

            values.push(serde_json::from_slice(&value)?);
        }

        Ok(values)
    }

    /// Translate one op into the batch.
    fn stage(batch: &mut WriteBatch, op: &StoreOp) -> Result<(), TrellisError> {
        match op {
            StoreOp::PutIdentity(record) => {
                let key = Self::identity_key(&record.identity().id);
                batch.put(key, serde_json::to_vec(record)?);
            }
            StoreOp::PutTrust(trust) => {
                let key = Self::trust_key(&trust.truster, &trust.trustee);
                batch.put(key, serde_json::to_vec(trust)?);
            }
            StoreOp::DeleteTrust { truster, trustee } => {
                batch.delete(Self::trust_key(truster, trustee));
            }
            StoreOp::PutScore(score) => {
                let key = Self::score_key(&score.anchor, &score.target);
                batch.put(key, serde_json::to_vec(score)?);
            }
            StoreOp::DeleteScore { anchor, target } => {
                batch.delete(Self::score_key(anchor, target));
            }
        }
        Ok(())
    }
}

impl GraphPersistence for RocksStore {
    fn load(&self) -> Result<GraphSnapshot, TrellisError> {
        let snapshot = GraphSnapshot {
            identities: self.scan(IDENTITY_PREFIX)?,
            trusts: self.scan(TRUST_PREFIX)?,
            scores: self.scan(SCORE_PREFIX)?,
        };
        tracing::debug!(
            "Loaded {} identities, {} trusts, {} scores from RocksDB",
            snapshot.identities.len(),
            snapshot.trusts.len(),
            snapshot.scores.len()
        );
        Ok(snapshot)
    }

    fn commit(&self, ops: &[StoreOp]) -> Result<(), TrellisError> {
        if ops.is_empty() {
            return Ok(());
        }
        let mut batch = WriteBatch::default();
        for op in ops {
            Self::stage(&mut batch, op)?;
        }
        self.db
            .write(batch)
            .map_err(|e| TrellisError::Persistence(format!("RocksDB batch write failed: {}", e)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use trellis_core::{IdentityRecord, InsertUri, OwnIdentity, Score, Trust, TrustValue};
    use uuid::Uuid;

    fn temp_db_path() -> String {
        let dir = std::env::temp_dir().join(format!("trellis-rocks-{}", Uuid::now_v7()));
        dir.to_string_lossy().to_string()
    }

    fn own(nickname: &str) -> IdentityRecord {
        IdentityRecord::Own(
            OwnIdentity::new(InsertUri::generate(), nickname, true, Utc::now()).unwrap(),
        )
    }

    fn trust(truster: &IdentityRecord, trustee: &IdentityRecord, value: i32) -> Trust {
        Trust::new(
            truster.identity().id.clone(),
            trustee.identity().id.clone(),
            TrustValue::try_from(value).unwrap(),
            "",
            0,
            Utc::now(),
        )
        .unwrap()
    }

    #[test]
    fn committed_batch_survives_reopen() {
        let path = temp_db_path();
        let alice = own("alice");
        let bob = own("bob");
        let edge = trust(&alice, &bob, 75);
        let score = Score {
            anchor: alice.identity().id.clone(),
            target: bob.identity().id.clone(),
            score: 75,
            rank: 1,
            capacity: 40,
        };

        {
            let store = RocksStore::open(&path).unwrap();
            store
                .commit(&[
                    StoreOp::PutIdentity(alice.clone()),
                    StoreOp::PutIdentity(bob.clone()),
                    StoreOp::PutTrust(edge.clone()),
                    StoreOp::PutScore(score.clone()),
                ])
                .unwrap();
        }

        let store = RocksStore::open(&path).unwrap();
        let snapshot = store.load().unwrap();
        assert_eq!(snapshot.identities.len(), 2);
        assert!(snapshot.identities.contains(&alice));
        assert_eq!(snapshot.trusts, vec![edge]);
        assert_eq!(snapshot.scores, vec![score]);

        let _ = std::fs::remove_dir_all(&path);
    }

    #[test]
    fn deletes_remove_rows() {
        let path = temp_db_path();
        let store = RocksStore::open(&path).unwrap();
        let alice = own("alice");
        let bob = own("bob");
        let edge = trust(&alice, &bob, 10);

        store.commit(&[StoreOp::PutTrust(edge.clone())]).unwrap();
        store
            .commit(&[StoreOp::DeleteTrust {
                truster: edge.truster.clone(),
                trustee: edge.trustee.clone(),
            }])
            .unwrap();

        assert!(store.load().unwrap().trusts.is_empty());
        let _ = std::fs::remove_dir_all(&path);
    }

    #[test]
    fn prefixes_do_not_bleed_into_each_other() {
        let path = temp_db_path();
        let store = RocksStore::open(&path).unwrap();
        let alice = own("alice");
        store.commit(&[StoreOp::PutIdentity(alice)]).unwrap();

        let snapshot = store.load().unwrap();
        assert_eq!(snapshot.identities.len(), 1);
        assert!(snapshot.trusts.is_empty());
        assert!(snapshot.scores.is_empty());
        let _ = std::fs::remove_dir_all(&path);
    }
}
