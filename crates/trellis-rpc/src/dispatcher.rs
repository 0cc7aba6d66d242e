// crates/trellis-rpc/src/dispatcher.rs
//
// Dispatcher: routes a request FieldSet to its handler by the `Message`
// field and turns handler errors into `Error` replies.

use std::sync::Arc;

use trellis_core::error::{ErrorKind, TrellisError};
use trellis_graph::TrustGraph;
use trellis_publish::Fetcher;

use crate::handlers;
use crate::message::FieldSet;

/// Reply `Message` for failed requests.
pub const ERROR_MESSAGE: &str = "Error";

#[derive(Clone)]
pub struct Dispatcher {
    graph: Arc<TrustGraph>,
    /// Fetches added identities when set.
    fetcher: Option<Arc<Fetcher>>,
}

impl std::fmt::Debug for Dispatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Dispatcher")
            .field("fetch_enabled", &self.fetcher.is_some())
            .finish()
    }
}

impl Dispatcher {
    pub fn new(graph: Arc<TrustGraph>) -> Self {
        Self { graph, fetcher: None }
    }

    /// Fetch every identity added through AddIdentity.
    pub fn with_fetcher(mut self, fetcher: Arc<Fetcher>) -> Self {
        self.fetcher = Some(fetcher);
        self
    }

    /// Handle one request. Never fails: errors become `Error` replies.
    pub async fn dispatch(&self, request: &FieldSet) -> FieldSet {
        let message = request.message_name().unwrap_or_default();
        match self.route(message, request) {
            Ok(reply) => {
                tracing::debug!("{} -> {}", message, reply.message_name().unwrap_or_default());
                reply
            }
            Err(e) => {
                match e.kind() {
                    // The node itself failed.
                    ErrorKind::Transport | ErrorKind::Persistence => {
                        tracing::error!("{} failed: {}", message, e)
                    }
                    _ => tracing::warn!("{} rejected: {}", message, e),
                }
                error_reply(message, &e)
            }
        }
    }

    fn route(&self, message: &str, params: &FieldSet) -> Result<FieldSet, TrellisError> {
        let graph = self.graph.as_ref();
        match message {
            "CreateIdentity" => handlers::identity::handle_create_identity(graph, params),
            "AddIdentity" => {
                handlers::identity::handle_add_identity(graph, self.fetcher.as_ref(), params)
            }
            "GetIdentity" => handlers::identity::handle_get_identity(graph, params),
            "GetOwnIdentities" => handlers::identity::handle_get_own_identities(graph),
            "GetIdentitiesByScore" => {
                handlers::identity::handle_get_identities_by_score(graph, params)
            }

            "SetTrust" => handlers::trust::handle_set_trust(graph, params),
            "RemoveTrust" => handlers::trust::handle_remove_trust(graph, params),
            "GetTrusters" => handlers::trust::handle_get_trusters(graph, params),
            "GetTrustees" => handlers::trust::handle_get_trustees(graph, params),

            "AddContext" => handlers::context::handle_add_context(graph, params),
            "RemoveContext" => handlers::context::handle_remove_context(graph, params),
            "SetProperty" => handlers::context::handle_set_property(graph, params),
            "GetProperty" => handlers::context::handle_get_property(graph, params),
            "RemoveProperty" => handlers::context::handle_remove_property(graph, params),

            "" => Err(TrellisError::MissingParameter("Message".to_string())),
            other => Err(TrellisError::InvalidParameter(format!(
                "Unknown message ({})",
                other
            ))),
        }
    }
}

/// `Error` reply for a failed `original_message`.
pub fn error_reply(original_message: &str, error: &TrellisError) -> FieldSet {
    FieldSet::message(ERROR_MESSAGE)
        .with("OriginalMessage", original_message)
        .with("Description", error.to_string())
}
