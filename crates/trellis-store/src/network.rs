// crates/trellis-store/src/network.rs
//
// In-memory content network. Stores the latest document per routing key;
// used by tests and the `memory` daemon mode.

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;

use trellis_core::error::TrellisError;
use trellis_core::traits::ContentNetwork;
use trellis_core::uri::{InsertUri, RequestUri};

/// One recorded insert.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Published {
    pub request_uri: RequestUri,
    pub data: Vec<u8>,
}

#[derive(Debug, Default)]
pub struct InMemoryNetwork {
    latest: Mutex<HashMap<[u8; 32], Published>>,
    history: Mutex<Vec<Published>>,
    failures_left: AtomicUsize,
}

impl InMemoryNetwork {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make the next `count` publishes fail with a transport error.
    pub fn fail_next_publishes(&self, count: usize) {
        self.failures_left.store(count, Ordering::SeqCst);
    }

    /// Every successful insert, oldest first.
    pub fn history(&self) -> Vec<Published> {
        self.history
            .lock()
            .map(|history| history.clone())
            .unwrap_or_default()
    }

    /// Place a document on the network as if a remote node inserted it.
    pub fn seed(&self, request_uri: RequestUri, data: Vec<u8>) {
        if let Ok(mut latest) = self.latest.lock() {
            latest.insert(
                *request_uri.routing_key(),
                Published { request_uri, data },
            );
        }
    }

    fn take_failure(&self) -> bool {
        self.failures_left
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok()
    }
}

#[async_trait]
impl ContentNetwork for InMemoryNetwork {
    async fn publish(&self, insert_uri: &InsertUri, data: &[u8]) -> Result<u64, TrellisError> {
        if self.take_failure() {
            return Err(TrellisError::Transport(
                "injected publish failure".to_string(),
            ));
        }
        let published = Published {
            request_uri: insert_uri.request_uri(),
            data: data.to_vec(),
        };
        self.latest
            .lock()
            .map_err(|_| TrellisError::Transport("network lock poisoned".to_string()))?
            .insert(*published.request_uri.routing_key(), published.clone());
        self.history
            .lock()
            .map_err(|_| TrellisError::Transport("network lock poisoned".to_string()))?
            .push(published);
        Ok(insert_uri.edition())
    }

    async fn fetch(&self, request_uri: &RequestUri) -> Result<Vec<u8>, TrellisError> {
        self.latest
            .lock()
            .map_err(|_| TrellisError::Transport("network lock poisoned".to_string()))?
            .get(request_uri.routing_key())
            .map(|published| published.data.clone())
            .ok_or_else(|| {
                TrellisError::Transport(format!("nothing published at {}", request_uri))
            })
    }
}
