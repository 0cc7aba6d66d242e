// crates/trellis-rpc/src/handlers/identity.rs
//
// Identity handlers: CreateIdentity, AddIdentity, GetIdentity,
// GetOwnIdentities, GetIdentitiesByScore.

use std::sync::Arc;

use trellis_core::error::TrellisError;
use trellis_core::score::ScoreSign;
use trellis_core::uri::{InsertUri, RequestUri};
use trellis_graph::{NewOwnIdentity, TrustGraph};
use trellis_publish::Fetcher;

use super::resolve_param;
use crate::message::FieldSet;

/// Rendered for Trust, Score and Rank when there is no value.
const NULL: &str = "null";

// ---------------------------------------------------------------------------
// CreateIdentity
// ---------------------------------------------------------------------------

/// Create an own identity. A supplied InsertURI/RequestURI pair must name
/// the same key; without one a fresh key is generated.
pub fn handle_create_identity(graph: &TrustGraph, params: &FieldSet) -> Result<FieldSet, TrellisError> {
    let nickname = params.require("NickName")?;
    let publishes_trust_list = params.require_bool("PublishTrustList")?;
    let context = params.require("Context")?;

    let mut request = NewOwnIdentity::new(nickname).with_context(context);
    request.publishes_trust_list = publishes_trust_list;

    if let (Some(insert_uri), Some(request_uri)) = (params.get("InsertURI"), params.get("RequestURI")) {
        let insert_uri: InsertUri = insert_uri.parse()?;
        let request_uri: RequestUri = request_uri.parse()?;
        if insert_uri.request_uri().routing_key() != request_uri.routing_key() {
            return Err(TrellisError::InvalidParameter(
                "RequestURI does not belong to InsertURI".to_string(),
            ));
        }
        request.insert_uri = Some(insert_uri);
    }

    if params.get_bool("PublishIntroductionPuzzles")?.unwrap_or(false) {
        if publishes_trust_list {
            request = request.with_introduction();
        } else {
            tracing::warn!(
                "Ignoring PublishIntroductionPuzzles for '{}': trust list is not published",
                nickname
            );
        }
    }

    let own = graph.create_own_identity(request)?;
    Ok(FieldSet::message("IdentityCreated")
        .with("ID", own.id().to_string())
        .with("InsertURI", own.insert_uri.to_string())
        .with("RequestURI", own.identity.request_uri.to_string()))
}

// ---------------------------------------------------------------------------
// AddIdentity
// ---------------------------------------------------------------------------

/// Add a remote identity by request URI. With a fetcher, its document is
/// fetched in the background.
pub fn handle_add_identity(
    graph: &TrustGraph,
    fetcher: Option<&Arc<Fetcher>>,
    params: &FieldSet,
) -> Result<FieldSet, TrellisError> {
    let request_uri: RequestUri = params.require("RequestURI")?.parse()?;
    let identity = graph.add_identity(request_uri)?;

    if let Some(fetcher) = fetcher {
        let fetcher = Arc::clone(fetcher);
        let request_uri = identity.request_uri.clone();
        tokio::spawn(async move {
            if let Err(e) = fetcher.fetch_and_import(&request_uri).await {
                tracing::warn!("Fetch of added identity {} failed: {}", request_uri, e);
            }
        });
    }

    Ok(FieldSet::message("IdentityAdded")
        .with("ID", identity.id.to_string())
        .with("RequestURI", identity.request_uri.to_string()))
}

// ---------------------------------------------------------------------------
// GetIdentity
// ---------------------------------------------------------------------------

/// Describe an identity as seen from the tree of own identity TreeOwner.
pub fn handle_get_identity(graph: &TrustGraph, params: &FieldSet) -> Result<FieldSet, TrellisError> {
    let tree_owner = resolve_param(graph, params, "TreeOwner")?;
    graph.own_identity(&tree_owner)?;
    let id = resolve_param(graph, params, "Identity")?;
    let record = graph.identity(&id)?;
    let identity = record.identity();

    let mut reply = FieldSet::message("Identity")
        .with("ID", identity.id.to_string())
        .with("RequestURI", identity.request_uri.to_string())
        .with("Nickname", identity.nickname.clone().unwrap_or_default());

    match graph.get_trust(&tree_owner, &id) {
        Ok(trust) => reply.put("Trust", trust.value.to_string()),
        Err(TrellisError::NotTrusted { .. }) => reply.put("Trust", NULL),
        Err(e) => return Err(e),
    }

    match graph.get_score(&tree_owner, &id) {
        Ok(score) => {
            reply.put("Score", score.score.to_string());
            reply.put("Rank", score.rank.to_string());
        }
        Err(TrellisError::NotInTrustTree { .. }) => {
            reply.put("Score", NULL);
            reply.put("Rank", NULL);
        }
        Err(e) => return Err(e),
    }

    for (i, context) in identity.contexts.iter().enumerate() {
        reply.put(format!("Context{}", i + 1), context.as_str());
    }
    Ok(reply)
}

// ---------------------------------------------------------------------------
// GetOwnIdentities
// ---------------------------------------------------------------------------

pub fn handle_get_own_identities(graph: &TrustGraph) -> Result<FieldSet, TrellisError> {
    let mut reply = FieldSet::message("OwnIdentities");
    for (i, own) in graph.own_identities()?.iter().enumerate() {
        let n = i + 1;
        reply.put(format!("Identity{}", n), own.id().to_string());
        reply.put(format!("RequestURI{}", n), own.identity.request_uri.to_string());
        reply.put(format!("InsertURI{}", n), own.insert_uri.to_string());
        reply.put(
            format!("Nickname{}", n),
            own.identity.nickname.clone().unwrap_or_default(),
        );
    }
    Ok(reply)
}

// ---------------------------------------------------------------------------
// GetIdentitiesByScore
// ---------------------------------------------------------------------------

/// List identities by score sign (`+`, `-` or `0`). Without TreeOwner every
/// own identity's tree is consulted.
pub fn handle_get_identities_by_score(
    graph: &TrustGraph,
    params: &FieldSet,
) -> Result<FieldSet, TrellisError> {
    let sign: ScoreSign = params.require("Select")?.parse()?;
    let context = params.require("Context")?;
    let tree_owner = match params.get("TreeOwner") {
        Some(reference) => Some(graph.resolve(reference)?),
        None => None,
    };

    let selected = graph.identities_by_score(tree_owner.as_ref(), sign, context)?;
    let mut reply = FieldSet::message("Identities");
    for (i, (identity, _)) in selected.iter().enumerate() {
        let n = i + 1;
        reply.put(format!("Identity{}", n), identity.id.to_string());
        reply.put(format!("RequestURI{}", n), identity.request_uri.to_string());
        reply.put(
            format!("Nickname{}", n),
            identity.nickname.clone().unwrap_or_default(),
        );
    }
    Ok(reply)
}
