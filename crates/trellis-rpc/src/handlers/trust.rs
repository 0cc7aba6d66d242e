// crates/trellis-rpc/src/handlers/trust.rs
//
// Trust handlers: SetTrust, RemoveTrust, GetTrusters, GetTrustees.

use trellis_core::error::TrellisError;
use trellis_core::identity::Identity;
use trellis_core::trust::{Trust, TrustValue};
use trellis_graph::TrustGraph;

use super::resolve_param;
use crate::message::FieldSet;

/// Set the trust an own identity gives to a known identity.
pub fn handle_set_trust(graph: &TrustGraph, params: &FieldSet) -> Result<FieldSet, TrellisError> {
    let truster = resolve_param(graph, params, "Truster")?;
    graph.own_identity(&truster)?;
    let trustee = resolve_param(graph, params, "Trustee")?;
    let value = parse_value(params.require("Value")?)?;
    let comment = params.require("Comment")?;

    graph.set_trust(&truster, &trustee, value, comment)?;
    Ok(FieldSet::message("TrustSet"))
}

pub fn handle_remove_trust(graph: &TrustGraph, params: &FieldSet) -> Result<FieldSet, TrellisError> {
    let truster = resolve_param(graph, params, "Truster")?;
    graph.own_identity(&truster)?;
    let trustee = resolve_param(graph, params, "Trustee")?;

    graph.remove_trust(&truster, &trustee)?;
    Ok(FieldSet::message("TrustRemoved"))
}

/// Trusts received by Identity, from trusters matching Context.
pub fn handle_get_trusters(graph: &TrustGraph, params: &FieldSet) -> Result<FieldSet, TrellisError> {
    let id = resolve_param(graph, params, "Identity")?;
    let context = params.require("Context")?;
    Ok(trust_list(&graph.trusters(&id, context)?))
}

/// Trusts given by Identity, to trustees matching Context.
pub fn handle_get_trustees(graph: &TrustGraph, params: &FieldSet) -> Result<FieldSet, TrellisError> {
    let id = resolve_param(graph, params, "Identity")?;
    let context = params.require("Context")?;
    Ok(trust_list(&graph.trustees(&id, context)?))
}

fn parse_value(raw: &str) -> Result<TrustValue, TrellisError> {
    let value: i32 = raw
        .trim()
        .parse()
        .map_err(|_| TrellisError::InvalidParameter(format!("trust value is not a number: {}", raw)))?;
    TrustValue::try_from(value)
}

/// `Identities` reply naming the other side of each trust by request URI.
fn trust_list(trusts: &[(Identity, Trust)]) -> FieldSet {
    let mut reply = FieldSet::message("Identities");
    for (i, (identity, trust)) in trusts.iter().enumerate() {
        let n = i + 1;
        reply.put(format!("Identity{}", n), identity.request_uri.to_string());
        reply.put(format!("Value{}", n), trust.value.to_string());
        reply.put(format!("Comment{}", n), trust.comment.as_str());
    }
    reply
}
