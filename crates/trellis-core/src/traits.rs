// crates/trellis-core/src/traits.rs

use async_trait::async_trait;

use crate::error::TrellisError;
use crate::identity::{IdentityId, IdentityRecord};
use crate::score::Score;
use crate::trust::Trust;
use crate::uri::{InsertUri, RequestUri};

/// One write in a persistence batch.
#[derive(Debug, Clone, PartialEq)]
pub enum StoreOp {
    PutIdentity(IdentityRecord),
    PutTrust(Trust),
    DeleteTrust {
        truster: IdentityId,
        trustee: IdentityId,
    },
    PutScore(Score),
    DeleteScore {
        anchor: IdentityId,
        target: IdentityId,
    },
}

/// Everything persisted, as loaded at startup.
#[derive(Debug, Clone, Default)]
pub struct GraphSnapshot {
    pub identities: Vec<IdentityRecord>,
    pub trusts: Vec<Trust>,
    pub scores: Vec<Score>,
}

/// Durable storage for identities, trusts and scores.
///
/// Implemented by trellis-store (RocksDB and in-memory backends).
pub trait GraphPersistence: Send + Sync {
    /// Load every stored entity.
    fn load(&self) -> Result<GraphSnapshot, TrellisError>;

    /// Apply all operations atomically: either every op is durable or none is.
    fn commit(&self, batch: &[StoreOp]) -> Result<(), TrellisError>;
}

/// The content-addressed network that identities are published to.
///
/// Implemented by trellis-store (IPFS client and in-memory network).
#[async_trait]
pub trait ContentNetwork: Send + Sync {
    /// Publish `data` under the insert URI's key. Blocks until the insert
    /// completes and returns the edition that was published. On error no
    /// state changes.
    async fn publish(&self, insert_uri: &InsertUri, data: &[u8]) -> Result<u64, TrellisError>;

    /// Fetch the document published at `request_uri`.
    async fn fetch(&self, request_uri: &RequestUri) -> Result<Vec<u8>, TrellisError>;
}
