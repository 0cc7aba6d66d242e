// crates/trellis-core/src/lib.rs
//
// trellis-core: Core types, traits, and crypto primitives for the Trellis
// web of trust.
//
// This is the leaf crate that all other crates in the workspace depend on.
// It defines identities, trust edges, scores, URIs, the published document
// format, the error type, and the persistence/network collaborator traits.

pub mod crypto;
pub mod document;
pub mod error;
pub mod identity;
pub mod score;
pub mod traits;
pub mod trust;
pub mod uri;

// Re-export key types for ergonomic access from downstream crates.
// Usage: `use trellis_core::Identity;`

// Identity types
pub use identity::{Identity, IdentityId, IdentityRecord, OwnIdentity};

// Trust and score types
pub use score::{Score, ScoreSign};
pub use trust::{Trust, TrustValue};

// Addressing and publication
pub use document::{DocumentTrust, IdentityDocument};
pub use uri::{InsertUri, RequestUri};

// Error type
pub use error::{ErrorKind, TrellisError};

// Traits
pub use traits::{ContentNetwork, GraphPersistence, GraphSnapshot, StoreOp};
