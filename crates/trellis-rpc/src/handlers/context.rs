// crates/trellis-rpc/src/handlers/context.rs
//
// Context and property handlers: AddContext, RemoveContext, SetProperty,
// GetProperty, RemoveProperty. Only own identities can be changed; any
// known identity's properties can be read.

use trellis_core::error::TrellisError;
use trellis_graph::TrustGraph;

use super::resolve_param;
use crate::message::FieldSet;

/// AddContext: tag an own identity with `Context`.
pub fn handle_add_context(graph: &TrustGraph, params: &FieldSet) -> Result<FieldSet, TrellisError> {
    let id = resolve_param(graph, params, "Identity")?;
    graph.add_context(&id, params.require("Context")?)?;
    Ok(FieldSet::message("ContextAdded"))
}

/// RemoveContext: drop `Context` from an own identity.
pub fn handle_remove_context(graph: &TrustGraph, params: &FieldSet) -> Result<FieldSet, TrellisError> {
    let id = resolve_param(graph, params, "Identity")?;
    graph.remove_context(&id, params.require("Context")?)?;
    Ok(FieldSet::message("ContextRemoved"))
}

/// SetProperty: create or overwrite `Property` of an own identity.
pub fn handle_set_property(graph: &TrustGraph, params: &FieldSet) -> Result<FieldSet, TrellisError> {
    let id = resolve_param(graph, params, "Identity")?;
    let name = params.require("Property")?;
    let value = params.require("Value")?;
    graph.set_property(&id, name, value)?;
    Ok(FieldSet::message("PropertyAdded"))
}

/// GetProperty: read `Property` of any known identity.
///
/// The reply carries the value under the `Property` key.
pub fn handle_get_property(graph: &TrustGraph, params: &FieldSet) -> Result<FieldSet, TrellisError> {
    let id = resolve_param(graph, params, "Identity")?;
    let value = graph.get_property(&id, params.require("Property")?)?;
    Ok(FieldSet::message("PropertyValue").with("Property", value))
}

/// RemoveProperty: delete `Property` from an own identity. Fails if it
/// was never set.
pub fn handle_remove_property(graph: &TrustGraph, params: &FieldSet) -> Result<FieldSet, TrellisError> {
    let id = resolve_param(graph, params, "Identity")?;
    graph.remove_property(&id, params.require("Property")?)?;
    Ok(FieldSet::message("PropertyRemoved"))
}
