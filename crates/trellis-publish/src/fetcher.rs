// crates/trellis-publish/src/fetcher.rs
//
// Fetcher: pulls identity documents from the network into the graph.

use std::sync::Arc;

use trellis_core::document::IdentityDocument;
use trellis_core::error::TrellisError;
use trellis_core::traits::ContentNetwork;
use trellis_core::uri::RequestUri;
use trellis_graph::{ImportOutcome, TrustGraph};

/// Pulls published identity documents and imports them into the graph.
///
/// Fetches run outside the graph lock; only the import takes it.
pub struct Fetcher {
    graph: Arc<TrustGraph>,
    network: Arc<dyn ContentNetwork>,
}

impl Fetcher {
    pub fn new(graph: Arc<TrustGraph>, network: Arc<dyn ContentNetwork>) -> Self {
        Self { graph, network }
    }

    /// Fetch the document at `request_uri` and import it.
    pub async fn fetch_and_import(&self, request_uri: &RequestUri) -> Result<ImportOutcome, TrellisError> {
        let bytes = self.network.fetch(request_uri).await?;
        let document = IdentityDocument::from_bytes(&bytes)?;
        if document.request_uri.routing_key() != request_uri.routing_key() {
            return Err(TrellisError::InvalidParameter(format!(
                "document at {} names a different identity ({})",
                request_uri, document.request_uri
            )));
        }

        let outcome = self.graph.import_document(&document)?;
        tracing::debug!("Fetched {}: {:?}", request_uri, outcome);
        Ok(outcome)
    }
}
