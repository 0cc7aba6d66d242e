// crates/trellis-core/src/error.rs
//
// Web-of-trust error types shared by every Trellis crate.

use thiserror::Error;

/// Error type for all Trellis operations.
///
/// Each variant belongs to one [`ErrorKind`], which is what callers at the
/// protocol boundary branch on.
#[derive(Debug, Error)]
pub enum TrellisError {
    /// A parameter was present but malformed or out of range.
    #[error("Invalid parameter: {0}")]
    InvalidParameter(String),

    /// A mandatory request parameter was absent.
    #[error("Missing mandatory parameter: {0}")]
    MissingParameter(String),

    /// No identity with the given identifier or request URI is known.
    #[error("Unknown identity: {0}")]
    UnknownIdentity(String),

    /// The identity exists but has no such property.
    #[error("Unknown property '{property}' on identity {identity}")]
    UnknownProperty { identity: String, property: String },

    /// No trust edge exists from `truster` to `trustee`.
    #[error("{truster} does not trust {trustee}")]
    NotTrusted { truster: String, trustee: String },

    /// An identity with the same identifier already exists.
    #[error("Duplicate identity: {0}")]
    DuplicateIdentity(String),

    /// A trust edge for the ordered pair already exists.
    #[error("Duplicate trust from {truster} to {trustee}")]
    DuplicateTrust { truster: String, trustee: String },

    /// A score row for the (anchor, target) pair already exists.
    #[error("Duplicate score for {target} in the trust tree of {anchor}")]
    DuplicateScore { anchor: String, target: String },

    /// The target has no score row in the anchor's trust tree.
    #[error("{target} is not in the trust tree of {anchor}")]
    NotInTrustTree { anchor: String, target: String },

    /// Network insert or fetch failed.
    #[error("Transport error: {0}")]
    Transport(String),

    /// Persistence layer failed to load or commit.
    #[error("Persistence error: {0}")]
    Persistence(String),

    /// Serialization/deserialization error.
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Key material could not be parsed or derived.
    #[error("Crypto error: {0}")]
    Crypto(String),
}

/// Coarse classification of a [`TrellisError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Validation,
    NotFound,
    Conflict,
    Unreachable,
    Transport,
    Persistence,
}

impl TrellisError {
    /// Classify this error for boundary handling.
    pub fn kind(&self) -> ErrorKind {
        match self {
            TrellisError::InvalidParameter(_)
            | TrellisError::MissingParameter(_)
            | TrellisError::Crypto(_) => ErrorKind::Validation,
            TrellisError::UnknownIdentity(_)
            | TrellisError::UnknownProperty { .. }
            | TrellisError::NotTrusted { .. } => ErrorKind::NotFound,
            TrellisError::DuplicateIdentity(_)
            | TrellisError::DuplicateTrust { .. }
            | TrellisError::DuplicateScore { .. } => ErrorKind::Conflict,
            TrellisError::NotInTrustTree { .. } => ErrorKind::Unreachable,
            TrellisError::Transport(_) => ErrorKind::Transport,
            TrellisError::Persistence(_) | TrellisError::Serialization(_) => {
                ErrorKind::Persistence
            }
        }
    }
}

impl From<serde_json::Error> for TrellisError {
    fn from(e: serde_json::Error) -> Self {
        TrellisError::Serialization(e.to_string())
    }
}

impl From<ed25519_dalek::SignatureError> for TrellisError {
    fn from(e: ed25519_dalek::SignatureError) -> Self {
        TrellisError::Crypto(e.to_string())
    }
}

impl From<hex::FromHexError> for TrellisError {
    fn from(e: hex::FromHexError) -> Self {
        TrellisError::InvalidParameter(format!("invalid hex: {}", e))
    }
}
