// crates/trellis-graph/src/publication.rs
//
// Publication bookkeeping for own identities.
//
// An insert is split in two locked steps around the unlocked network call:
//   - begin_insert: snapshot document, insert URI, start time and revision
//   - complete_insert: record the snapshot revision as inserted
// A modification that lands in between bumps the revision past the snapshot,
// so the identity stays due for the next cycle.

use chrono::{DateTime, Utc};

use trellis_core::document::{DocumentTrust, IdentityDocument, DOCUMENT_VERSION};
use trellis_core::error::TrellisError;
use trellis_core::identity::{Identity, IdentityId, IdentityRecord};
use trellis_core::uri::{InsertUri, RequestUri};

use crate::graph::{GraphState, Mutation, TrustGraph};

/// Snapshot of an own identity taken when its insert starts.
#[derive(Debug, Clone)]
pub struct PendingInsert {
    /// Identity being inserted.
    pub id: IdentityId,
    /// Insert URI at the edition this insert produces.
    pub insert_uri: InsertUri,
    /// Serialized identity document to publish.
    pub document: Vec<u8>,
    /// Revision the document was built from. Recorded as inserted on success.
    pub revision: u64,
    /// Recorded as the last insert time on success.
    pub started_at: DateTime<Utc>,
}

impl TrustGraph {
    /// Own identities that need an insert, in id order.
    pub fn pending_inserts(&self) -> Result<Vec<IdentityId>, TrellisError> {
        Ok(self
            .read()?
            .identities
            .values()
            .filter_map(IdentityRecord::as_own)
            .filter(|own| own.needs_insert())
            .map(|own| own.id().clone())
            .collect())
    }

    /// Snapshot `id` for insertion, or `None` if it does not need an insert.
    pub fn begin_insert(&self, id: &IdentityId) -> Result<Option<PendingInsert>, TrellisError> {
        let state = self.read()?;
        let own = state.own(id)?;
        if !own.needs_insert() {
            return Ok(None);
        }

        let insert_uri = own.next_insert_uri();
        let document = document_for(&state, &own.identity, insert_uri.request_uri());
        Ok(Some(PendingInsert {
            id: id.clone(),
            document: document.to_bytes()?,
            insert_uri,
            revision: own.revision,
            started_at: Utc::now(),
        }))
    }

    /// Record a successful insert of `pending` at `edition`.
    pub fn complete_insert(&self, pending: &PendingInsert, edition: u64) -> Result<(), TrellisError> {
        let mut state = self.write()?;
        let mut own = state.own(&pending.id)?.clone();
        own.record_insert(pending.revision, pending.started_at, edition);
        let still_pending = own.needs_insert();
        self.apply(
            &mut state,
            Mutation {
                records: vec![IdentityRecord::Own(own)],
                ..Mutation::default()
            },
        )?;

        if still_pending {
            tracing::info!(
                "Identity {} changed during its insert, will insert again",
                pending.id
            );
        }
        Ok(())
    }

    /// The document an own identity publishes at its current edition.
    pub fn build_document(&self, id: &IdentityId) -> Result<IdentityDocument, TrellisError> {
        let state = self.read()?;
        let own = state.own(id)?;
        Ok(document_for(&state, &own.identity, own.identity.request_uri.clone()))
    }
}

fn document_for(state: &GraphState, identity: &Identity, request_uri: RequestUri) -> IdentityDocument {
    let trust_list = if identity.publishes_trust_list {
        state
            .given(&identity.id)
            .into_iter()
            .filter_map(|trust| {
                let trustee = state.identities.get(&trust.trustee)?;
                Some(DocumentTrust {
                    trustee: trustee.identity().request_uri.clone(),
                    value: trust.value,
                    comment: trust.comment.clone(),
                })
            })
            .collect()
    } else {
        Vec::new()
    };

    IdentityDocument {
        version: DOCUMENT_VERSION,
        request_uri,
        nickname: identity.nickname.clone(),
        publishes_trust_list: identity.publishes_trust_list,
        contexts: identity.contexts.clone(),
        properties: identity.properties.clone(),
        trust_list,
    }
}
