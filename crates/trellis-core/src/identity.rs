// crates/trellis-core/src/identity.rs
//
// Identities in the web of trust.
//
// An `Identity` is any pseudonymous actor seen on the network. An
// `OwnIdentity` wraps an `Identity` together with the insert URI and the
// publication bookkeeping the local node keeps for identities it controls.

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::TrellisError;
use crate::uri::{InsertUri, RequestUri};

/// Maximum nickname length in characters.
pub const MAX_NICKNAME_LENGTH: usize = 30;
/// Maximum context tag length in characters.
pub const MAX_CONTEXT_LENGTH: usize = 32;
/// Maximum property name length in characters.
pub const MAX_PROPERTY_NAME_LENGTH: usize = 256;
/// Maximum property value length in characters.
pub const MAX_PROPERTY_VALUE_LENGTH: usize = 10 * 1024;

/// Stable identifier of an identity: lowercase hex SHA-256 of its routing key.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct IdentityId(String);

impl IdentityId {
    pub fn from_hash(hash: &[u8; 32]) -> Self {
        Self(hex::encode(hash))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for IdentityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for IdentityId {
    type Err = TrellisError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if s.len() != 64 || !s.bytes().all(|b| b.is_ascii_hexdigit()) {
            return Err(TrellisError::InvalidParameter(format!(
                "identity id must be 64 hex characters: {}",
                s
            )));
        }
        Ok(Self(s.to_ascii_lowercase()))
    }
}

/// A network-visible pseudonymous actor.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Identity {
    pub id: IdentityId,
    /// Request URI at the latest known edition.
    pub request_uri: RequestUri,
    /// Untrusted display name. `None` until the identity's document was seen.
    pub nickname: Option<String>,
    pub contexts: BTreeSet<String>,
    pub properties: BTreeMap<String, String>,
    /// Whether the identity publishes the trust values it gives.
    pub publishes_trust_list: bool,
    pub added_at: DateTime<Utc>,
    pub last_changed: DateTime<Utc>,
}

impl Identity {
    /// Create an identity known only by its request URI.
    pub fn new(request_uri: RequestUri, now: DateTime<Utc>) -> Self {
        Self {
            id: request_uri.identity_id(),
            request_uri,
            nickname: None,
            contexts: BTreeSet::new(),
            properties: BTreeMap::new(),
            publishes_trust_list: false,
            added_at: now,
            last_changed: now,
        }
    }

    pub fn edition(&self) -> u64 {
        self.request_uri.edition()
    }

    pub fn set_edition(&mut self, edition: u64) {
        self.request_uri = self.request_uri.with_edition(edition);
    }

    pub fn set_nickname(&mut self, nickname: &str) -> Result<(), TrellisError> {
        validate_nickname(nickname)?;
        self.nickname = Some(nickname.to_string());
        Ok(())
    }

    pub fn has_context(&self, context: &str) -> bool {
        self.contexts.contains(context)
    }

    /// Add a context tag. Returns `false` if it was already present.
    pub fn add_context(&mut self, context: &str) -> Result<bool, TrellisError> {
        validate_context(context)?;
        Ok(self.contexts.insert(context.to_string()))
    }

    /// Remove a context tag. Returns `false` if it was not present.
    pub fn remove_context(&mut self, context: &str) -> bool {
        self.contexts.remove(context)
    }

    pub fn set_property(&mut self, name: &str, value: &str) -> Result<(), TrellisError> {
        validate_property(name, value)?;
        self.properties.insert(name.to_string(), value.to_string());
        Ok(())
    }

    pub fn property(&self, name: &str) -> Result<&str, TrellisError> {
        self.properties
            .get(name)
            .map(String::as_str)
            .ok_or_else(|| TrellisError::UnknownProperty {
                identity: self.id.to_string(),
                property: name.to_string(),
            })
    }

    pub fn remove_property(&mut self, name: &str) -> Result<String, TrellisError> {
        self.properties
            .remove(name)
            .ok_or_else(|| TrellisError::UnknownProperty {
                identity: self.id.to_string(),
                property: name.to_string(),
            })
    }
}

/// An identity whose insert key this node holds.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OwnIdentity {
    pub identity: Identity,
    pub insert_uri: InsertUri,
    /// Start time of the last successful insert.
    pub last_insert: Option<DateTime<Utc>>,
    /// Incremented on every local modification.
    pub revision: u64,
    /// `revision` as captured when the last successful insert started.
    pub inserted_revision: Option<u64>,
}

impl OwnIdentity {
    /// Build an own identity. The request URI is derived from `insert_uri`.
    pub fn new(
        insert_uri: InsertUri,
        nickname: &str,
        publishes_trust_list: bool,
        now: DateTime<Utc>,
    ) -> Result<Self, TrellisError> {
        let mut identity = Identity::new(insert_uri.request_uri(), now);
        identity.set_nickname(nickname)?;
        identity.publishes_trust_list = publishes_trust_list;
        Ok(Self {
            identity,
            insert_uri,
            last_insert: None,
            revision: 0,
            inserted_revision: None,
        })
    }

    pub fn id(&self) -> &IdentityId {
        &self.identity.id
    }

    /// True if never inserted, or modified after the last insert started.
    pub fn needs_insert(&self) -> bool {
        self.inserted_revision != Some(self.revision)
    }

    /// Insert URI for the edition the next insert should produce.
    pub fn next_insert_uri(&self) -> InsertUri {
        let next = match self.last_insert {
            Some(_) => self.identity.edition() + 1,
            None => self.identity.edition(),
        };
        self.insert_uri.with_edition(next)
    }

    /// Record a successful insert that started at `started_at` while the
    /// identity was at `revision`.
    pub fn record_insert(&mut self, revision: u64, started_at: DateTime<Utc>, edition: u64) {
        self.inserted_revision = Some(revision);
        self.last_insert = Some(started_at);
        self.identity.set_edition(edition);
        self.insert_uri = self.insert_uri.with_edition(edition);
    }
}

/// Stored form of an identity: either remote or owned.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum IdentityRecord {
    Remote(Identity),
    Own(OwnIdentity),
}

impl IdentityRecord {
    pub fn identity(&self) -> &Identity {
        match self {
            IdentityRecord::Remote(identity) => identity,
            IdentityRecord::Own(own) => &own.identity,
        }
    }

    pub fn identity_mut(&mut self) -> &mut Identity {
        match self {
            IdentityRecord::Remote(identity) => identity,
            IdentityRecord::Own(own) => &mut own.identity,
        }
    }

    pub fn as_own(&self) -> Option<&OwnIdentity> {
        match self {
            IdentityRecord::Own(own) => Some(own),
            IdentityRecord::Remote(_) => None,
        }
    }

    pub fn as_own_mut(&mut self) -> Option<&mut OwnIdentity> {
        match self {
            IdentityRecord::Own(own) => Some(own),
            IdentityRecord::Remote(_) => None,
        }
    }

    pub fn is_own(&self) -> bool {
        matches!(self, IdentityRecord::Own(_))
    }

    /// Note a local modification. Own identities become due for insert.
    pub fn touch(&mut self, now: DateTime<Utc>) {
        self.identity_mut().last_changed = now;
        if let IdentityRecord::Own(own) = self {
            own.revision += 1;
        }
    }
}

fn validate_nickname(nickname: &str) -> Result<(), TrellisError> {
    let len = nickname.chars().count();
    if len == 0 || len > MAX_NICKNAME_LENGTH {
        return Err(TrellisError::InvalidParameter(format!(
            "nickname must be 1..={} characters",
            MAX_NICKNAME_LENGTH
        )));
    }
    if nickname.chars().any(|c| c.is_control()) {
        return Err(TrellisError::InvalidParameter(
            "nickname contains control characters".to_string(),
        ));
    }
    Ok(())
}

fn validate_context(context: &str) -> Result<(), TrellisError> {
    let len = context.chars().count();
    if len == 0 || len > MAX_CONTEXT_LENGTH || !context.chars().all(|c| c.is_ascii_alphanumeric())
    {
        return Err(TrellisError::InvalidParameter(format!(
            "context must be 1..={} ASCII letters or digits: '{}'",
            MAX_CONTEXT_LENGTH, context
        )));
    }
    Ok(())
}

fn validate_property(name: &str, value: &str) -> Result<(), TrellisError> {
    let len = name.chars().count();
    if len == 0 || len > MAX_PROPERTY_NAME_LENGTH {
        return Err(TrellisError::InvalidParameter(format!(
            "property name must be 1..={} characters",
            MAX_PROPERTY_NAME_LENGTH
        )));
    }
    if value.chars().count() > MAX_PROPERTY_VALUE_LENGTH {
        return Err(TrellisError::InvalidParameter(format!(
            "property value longer than {} characters",
            MAX_PROPERTY_VALUE_LENGTH
        )));
    }
    Ok(())
}
