// crates/trellis-core/src/uri.rs
//
// Request and insert URIs for identities on the content-addressed network.
//
// Format:
//   - Request: `wot:{routing_key_hex}/{edition}`
//   - Insert:  `wot-insert:{secret_key_hex}/{edition}`
//
// The routing key is the ed25519 public key of the identity. An insert URI
// holds the matching secret key, so its request URI can always be derived.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::crypto::{decode_key_hex, hash_bytes, validate_public_key, Keypair};
use crate::error::TrellisError;
use crate::identity::IdentityId;

const REQUEST_SCHEME: &str = "wot:";
const INSERT_SCHEME: &str = "wot-insert:";

/// Public address of an identity at a given edition.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct RequestUri {
    routing_key: [u8; 32],
    edition: u64,
}

impl RequestUri {
    pub fn new(routing_key: [u8; 32], edition: u64) -> Self {
        Self {
            routing_key,
            edition,
        }
    }

    pub fn routing_key(&self) -> &[u8; 32] {
        &self.routing_key
    }

    pub fn routing_key_hex(&self) -> String {
        hex::encode(self.routing_key)
    }

    pub fn edition(&self) -> u64 {
        self.edition
    }

    /// The same address pointing at another edition.
    pub fn with_edition(&self, edition: u64) -> Self {
        Self {
            routing_key: self.routing_key,
            edition,
        }
    }

    /// Stable identifier: hex SHA-256 of the routing key. Independent of edition.
    pub fn identity_id(&self) -> IdentityId {
        IdentityId::from_hash(&hash_bytes(&self.routing_key))
    }
}

impl fmt::Display for RequestUri {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}/{}", REQUEST_SCHEME, hex::encode(self.routing_key), self.edition)
    }
}

impl FromStr for RequestUri {
    type Err = TrellisError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (key_hex, edition) = split_uri(s.trim(), REQUEST_SCHEME)?;
        let routing_key = decode_key_hex(key_hex)?;
        validate_public_key(&routing_key)?;
        Ok(Self {
            routing_key,
            edition,
        })
    }
}

impl TryFrom<String> for RequestUri {
    type Error = TrellisError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<RequestUri> for String {
    fn from(uri: RequestUri) -> Self {
        uri.to_string()
    }
}

/// Private address used to publish new editions of an own identity.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct InsertUri {
    secret_key: [u8; 32],
    edition: u64,
}

impl InsertUri {
    /// Generate a fresh insert URI at edition 0.
    pub fn generate() -> Self {
        let keypair = Keypair::generate();
        Self {
            secret_key: keypair.secret_key_bytes(),
            edition: 0,
        }
    }

    pub fn edition(&self) -> u64 {
        self.edition
    }

    pub fn with_edition(&self, edition: u64) -> Self {
        Self {
            secret_key: self.secret_key,
            edition,
        }
    }

    /// Derive the public request URI for the same edition.
    pub fn request_uri(&self) -> RequestUri {
        let keypair = Keypair::from_secret(&self.secret_key);
        RequestUri::new(keypair.public_key_bytes(), self.edition)
    }

    /// Keypair behind this URI, for network layers that sign inserts.
    pub fn keypair(&self) -> Keypair {
        Keypair::from_secret(&self.secret_key)
    }

    /// Name under which the network layer files this key.
    pub fn key_name(&self) -> String {
        format!("wot-{}", self.request_uri().identity_id())
    }
}

// Never print the secret key.
impl fmt::Debug for InsertUri {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("InsertUri")
            .field("request_uri", &self.request_uri().to_string())
            .field("edition", &self.edition)
            .finish()
    }
}

impl fmt::Display for InsertUri {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}/{}", INSERT_SCHEME, hex::encode(self.secret_key), self.edition)
    }
}

impl FromStr for InsertUri {
    type Err = TrellisError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (key_hex, edition) = split_uri(s.trim(), INSERT_SCHEME)?;
        Ok(Self {
            secret_key: decode_key_hex(key_hex)?,
            edition,
        })
    }
}

impl TryFrom<String> for InsertUri {
    type Error = TrellisError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<InsertUri> for String {
    fn from(uri: InsertUri) -> Self {
        uri.to_string()
    }
}

/// Split `{scheme}{key}/{edition}` into key and edition.
fn split_uri<'a>(s: &'a str, scheme: &str) -> Result<(&'a str, u64), TrellisError> {
    let rest = s.strip_prefix(scheme).ok_or_else(|| {
        TrellisError::InvalidParameter(format!("URI must start with '{}': {}", scheme, s))
    })?;
    let (key, edition) = rest
        .split_once('/')
        .ok_or_else(|| TrellisError::InvalidParameter(format!("URI has no edition: {}", s)))?;
    let edition = edition
        .parse::<u64>()
        .map_err(|_| TrellisError::InvalidParameter(format!("invalid edition in URI: {}", s)))?;
    Ok((key, edition))
}
