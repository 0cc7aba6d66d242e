// crates/trellis-rpc/src/handlers/mod.rs
//
// Handlers for every protocol message, grouped by what they act on.
// Each handler validates its parameters, calls into the trust graph and
// builds the reply FieldSet.

pub mod context;
pub mod identity;
pub mod trust;

use trellis_core::error::TrellisError;
use trellis_core::identity::IdentityId;
use trellis_graph::TrustGraph;

use crate::message::FieldSet;

/// Resolve the identity named by parameter `key` (an id or a request URI).
fn resolve_param(graph: &TrustGraph, params: &FieldSet, key: &str) -> Result<IdentityId, TrellisError> {
    graph.resolve(params.require(key)?)
}
