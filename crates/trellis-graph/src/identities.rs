// crates/trellis-graph/src/identities.rs
//
// Identity operations: creation, lookup, contexts and properties.
//
// Context and property changes never recompute scores. On own identities
// they bump the revision so the publication scheduler picks them up.

use chrono::Utc;

use trellis_core::error::TrellisError;
use trellis_core::identity::{Identity, IdentityId, IdentityRecord, OwnIdentity};
use trellis_core::uri::{InsertUri, RequestUri};

use crate::graph::{matches_context, Mutation, TrustGraph};

/// Context marking identities that publish introduction puzzles.
pub const INTRODUCTION_CONTEXT: &str = "Introduction";
/// Property holding the number of published introduction puzzles.
pub const INTRODUCTION_PUZZLE_COUNT_PROPERTY: &str = "IntroductionPuzzleCount";
/// Puzzles an introduction-serving identity advertises.
pub const INTRODUCTION_PUZZLE_COUNT: u32 = 10;

/// Parameters of a new own identity.
#[derive(Debug, Clone)]
pub struct NewOwnIdentity {
    /// Generated when `None`.
    pub insert_uri: Option<InsertUri>,
    pub nickname: String,
    pub publishes_trust_list: bool,
    pub contexts: Vec<String>,
    pub properties: Vec<(String, String)>,
}

impl NewOwnIdentity {
    pub fn new(nickname: &str) -> Self {
        Self {
            insert_uri: None,
            nickname: nickname.to_string(),
            publishes_trust_list: true,
            contexts: Vec::new(),
            properties: Vec::new(),
        }
    }

    pub fn with_context(mut self, context: &str) -> Self {
        self.contexts.push(context.to_string());
        self
    }

    /// Advertise introduction puzzles. Only meaningful when the trust list
    /// is published.
    pub fn with_introduction(mut self) -> Self {
        self.contexts.push(INTRODUCTION_CONTEXT.to_string());
        self.properties.push((
            INTRODUCTION_PUZZLE_COUNT_PROPERTY.to_string(),
            INTRODUCTION_PUZZLE_COUNT.to_string(),
        ));
        self
    }
}

impl TrustGraph {
    /// Create an own identity and initialise its trust tree.
    pub fn create_own_identity(&self, request: NewOwnIdentity) -> Result<OwnIdentity, TrellisError> {
        let now = Utc::now();
        let insert_uri = request.insert_uri.unwrap_or_else(InsertUri::generate);
        let mut own = OwnIdentity::new(
            insert_uri,
            &request.nickname,
            request.publishes_trust_list,
            now,
        )?;
        for context in &request.contexts {
            own.identity.add_context(context)?;
        }
        for (name, value) in &request.properties {
            own.identity.set_property(name, value)?;
        }

        let mut state = self.write()?;
        let id = own.id().clone();
        if state.identities.contains_key(&id) {
            return Err(TrellisError::DuplicateIdentity(id.to_string()));
        }
        self.apply(
            &mut state,
            Mutation {
                records: vec![IdentityRecord::Own(own.clone())],
                new_anchors: vec![id.clone()],
                ..Mutation::default()
            },
        )?;

        tracing::info!("Created own identity '{}' ({})", request.nickname, id);
        Ok(own)
    }

    /// Add a remote identity known only by its request URI.
    pub fn add_identity(&self, request_uri: RequestUri) -> Result<Identity, TrellisError> {
        let identity = Identity::new(request_uri, Utc::now());
        let mut state = self.write()?;
        if state.identities.contains_key(&identity.id) {
            return Err(TrellisError::DuplicateIdentity(identity.id.to_string()));
        }
        self.apply(
            &mut state,
            Mutation {
                records: vec![IdentityRecord::Remote(identity.clone())],
                ..Mutation::default()
            },
        )?;

        tracing::info!("Added identity {}", identity.id);
        Ok(identity)
    }

    pub fn identity(&self, id: &IdentityId) -> Result<IdentityRecord, TrellisError> {
        Ok(self.read()?.record(id)?.clone())
    }

    pub fn own_identity(&self, id: &IdentityId) -> Result<OwnIdentity, TrellisError> {
        Ok(self.read()?.own(id)?.clone())
    }

    /// All own identities, in id order.
    pub fn own_identities(&self) -> Result<Vec<OwnIdentity>, TrellisError> {
        Ok(self
            .read()?
            .identities
            .values()
            .filter_map(IdentityRecord::as_own)
            .cloned()
            .collect())
    }

    /// Identities selected by `context`, in id order.
    pub fn identities_with_context(&self, context: &str) -> Result<Vec<Identity>, TrellisError> {
        Ok(self
            .read()?
            .identities
            .values()
            .map(IdentityRecord::identity)
            .filter(|identity| matches_context(identity, context))
            .cloned()
            .collect())
    }

    pub fn add_context(&self, id: &IdentityId, context: &str) -> Result<(), TrellisError> {
        self.update_own(id, |identity| identity.add_context(context))
    }

    pub fn remove_context(&self, id: &IdentityId, context: &str) -> Result<(), TrellisError> {
        self.update_own(id, |identity| Ok(identity.remove_context(context)))
    }

    pub fn set_property(&self, id: &IdentityId, name: &str, value: &str) -> Result<(), TrellisError> {
        self.update_own(id, |identity| {
            let changed = identity.property(name).ok() != Some(value);
            identity.set_property(name, value)?;
            Ok(changed)
        })
    }

    /// Property of any known identity.
    pub fn get_property(&self, id: &IdentityId, name: &str) -> Result<String, TrellisError> {
        Ok(self
            .read()?
            .record(id)?
            .identity()
            .property(name)?
            .to_string())
    }

    pub fn remove_property(&self, id: &IdentityId, name: &str) -> Result<(), TrellisError> {
        self.update_own(id, |identity| identity.remove_property(name).map(|_| true))
    }

    /// Apply `change` to an own identity; `change` reports whether anything
    /// changed. Changed identities are touched and persisted.
    fn update_own(
        &self,
        id: &IdentityId,
        change: impl FnOnce(&mut Identity) -> Result<bool, TrellisError>,
    ) -> Result<(), TrellisError> {
        let mut state = self.write()?;
        let mut record = IdentityRecord::Own(state.own(id)?.clone());
        if !change(record.identity_mut())? {
            return Ok(());
        }
        record.touch(Utc::now());
        self.apply(
            &mut state,
            Mutation {
                records: vec![record],
                ..Mutation::default()
            },
        )?;
        tracing::debug!("Updated own identity {}", id);
        Ok(())
    }
}
