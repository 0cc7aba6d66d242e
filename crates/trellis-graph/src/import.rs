// crates/trellis-graph/src/import.rs
//
// Import of fetched identity documents (passive discovery).
//
// A document replaces the publisher's nickname, contexts, properties and
// given trust list. Unknown trustees are added as remote identities. The
// whole import, including the recomputation of affected trees, is one
// mutation.

use std::collections::BTreeMap;

use chrono::Utc;

use trellis_core::document::IdentityDocument;
use trellis_core::error::TrellisError;
use trellis_core::identity::{Identity, IdentityId, IdentityRecord};
use trellis_core::trust::Trust;

use crate::graph::{EdgeChange, Mutation, TrustGraph};

/// What an import did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ImportOutcome {
    Imported { edition: u64, trusts: usize },
    /// The known edition is at least as new.
    Stale { known_edition: u64 },
    /// Own identities are never overwritten from the network.
    OwnIdentity,
}

impl TrustGraph {
    pub fn import_document(&self, document: &IdentityDocument) -> Result<ImportOutcome, TrellisError> {
        let now = Utc::now();
        let id = document.request_uri.identity_id();
        let mut state = self.write()?;

        let mut identity = match state.identities.get(&id) {
            Some(IdentityRecord::Own(_)) => return Ok(ImportOutcome::OwnIdentity),
            // An identity without nickname has never been fetched, so any
            // edition of its document is news.
            Some(IdentityRecord::Remote(known))
                if known.nickname.is_some() && document.edition() <= known.edition() =>
            {
                return Ok(ImportOutcome::Stale {
                    known_edition: known.edition(),
                });
            }
            Some(IdentityRecord::Remote(known)) => known.clone(),
            None => Identity::new(document.request_uri.clone(), now),
        };

        identity.set_edition(document.edition());
        if let Some(nickname) = &document.nickname {
            identity.set_nickname(nickname)?;
        }
        identity.publishes_trust_list = document.publishes_trust_list;
        identity.contexts.clear();
        for context in &document.contexts {
            identity.add_context(context)?;
        }
        identity.properties.clear();
        for (name, value) in &document.properties {
            identity.set_property(name, value)?;
        }
        identity.last_changed = now;

        let mut records = vec![IdentityRecord::Remote(identity)];
        let mut desired: BTreeMap<IdentityId, Trust> = BTreeMap::new();
        for entry in &document.trust_list {
            let trustee = entry.trustee.identity_id();
            if trustee != id
                && !state.identities.contains_key(&trustee)
                && !desired.contains_key(&trustee)
            {
                records.push(IdentityRecord::Remote(Identity::new(entry.trustee.clone(), now)));
            }
            let trust = Trust::new(
                id.clone(),
                trustee.clone(),
                entry.value,
                &entry.comment,
                document.edition(),
                now,
            )?;
            desired.insert(trustee, trust);
        }

        let mut edges = Vec::new();
        for existing in state.given(&id) {
            if !desired.contains_key(&existing.trustee) {
                edges.push(EdgeChange::Remove {
                    truster: id.clone(),
                    trustee: existing.trustee.clone(),
                });
            }
        }
        let trusts = desired.len();
        for (trustee, trust) in desired {
            let unchanged = state
                .trusts
                .get(&(id.clone(), trustee))
                .is_some_and(|old| old.value == trust.value && old.comment == trust.comment);
            if !unchanged {
                edges.push(EdgeChange::Set(trust));
            }
        }

        let created = records.len() - 1;
        self.apply(
            &mut state,
            Mutation {
                records,
                edges,
                ..Mutation::default()
            },
        )?;

        tracing::info!(
            "Imported edition {} of {} ({} trusts, {} new identities)",
            document.edition(),
            id,
            trusts,
            created
        );
        Ok(ImportOutcome::Imported {
            edition: document.edition(),
            trusts,
        })
    }
}
