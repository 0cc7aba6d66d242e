// crates/trellis-store/src/ipfs.rs
//
// IPFS client: publishes identity documents under IPNS names and fetches
// them back. Uses reqwest to talk to a Kubo/IPFS daemon HTTP API.
//
// An own identity's ed25519 key is imported into the node's keystore under
// `InsertUri::key_name()`, so the IPNS name of an identity is the libp2p
// peer id of its routing key and anyone can resolve it from a request URI.

use std::collections::HashSet;
use std::sync::Mutex;

use async_trait::async_trait;
use libp2p_identity::{ed25519, Keypair, PeerId, PublicKey};

use trellis_core::error::TrellisError;
use trellis_core::traits::ContentNetwork;
use trellis_core::uri::{InsertUri, RequestUri};

/// IPFS client for interacting with a Kubo / IPFS daemon.
#[derive(Debug)]
pub struct IpfsClient {
    /// Base URL of the IPFS HTTP API (e.g., "http://127.0.0.1:5001").
    pub base_url: String,
    client: reqwest::Client,
    /// Key names already present in the node's keystore.
    imported: Mutex<HashSet<String>>,
}

impl IpfsClient {
    /// Create a new IPFS client pointing at the given API base URL.
    pub fn new(base_url: &str) -> Self {
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            client: reqwest::Client::new(),
            imported: Mutex::new(HashSet::new()),
        }
    }

    /// POST to an API path and return the successful response.
    async fn post(
        &self,
        what: &str,
        path_and_query: &str,
        form: Option<reqwest::multipart::Form>,
    ) -> Result<reqwest::Response, TrellisError> {
        let url = format!("{}/api/v0/{}", self.base_url, path_and_query);
        let mut request = self.client.post(&url);
        if let Some(form) = form {
            request = request.multipart(form);
        }
        let response = request
            .send()
            .await
            .map_err(|e| TrellisError::Transport(format!("IPFS {} request failed: {}", what, e)))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(TrellisError::Transport(format!(
                "IPFS {} failed ({}): {}",
                what, status, body
            )));
        }
        Ok(response)
    }

    /// Store raw bytes on IPFS and return the resulting CID.
    ///
    /// POST /api/v0/add with multipart form data.
    pub async fn add(&self, data: &[u8]) -> Result<String, TrellisError> {
        let part = reqwest::multipart::Part::bytes(data.to_vec()).file_name("identity.json");
        let form = reqwest::multipart::Form::new().part("file", part);
        let response = self.post("add", "add?pin=true", Some(form)).await?;

        let body: serde_json::Value = response.json().await.map_err(|e| {
            TrellisError::Serialization(format!("IPFS add response parse failed: {}", e))
        })?;

        body["Hash"]
            .as_str()
            .map(str::to_string)
            .ok_or_else(|| {
                TrellisError::Serialization("IPFS add response missing 'Hash' field".to_string())
            })
    }

    /// Retrieve raw bytes for an IPFS or IPNS path.
    ///
    /// POST /api/v0/cat?arg={path}
    pub async fn cat(&self, path: &str) -> Result<Vec<u8>, TrellisError> {
        let response = self.post("cat", &format!("cat?arg={}", path), None).await?;
        let bytes = response.bytes().await.map_err(|e| {
            TrellisError::Transport(format!("IPFS cat body read failed: {}", e))
        })?;
        Ok(bytes.to_vec())
    }

    /// Make sure the node holds the insert key, importing it on first use.
    ///
    /// POST /api/v0/key/import?arg={name} with the libp2p protobuf key.
    pub async fn import_key(&self, insert_uri: &InsertUri) -> Result<(), TrellisError> {
        let name = insert_uri.key_name();
        if self.is_imported(&name) {
            return Ok(());
        }

        let part = reqwest::multipart::Part::bytes(private_key_protobuf(insert_uri)?)
            .file_name("key");
        let form = reqwest::multipart::Form::new().part("file", part);
        match self
            .post("key import", &format!("key/import?arg={}", name), Some(form))
            .await
        {
            Ok(_) => {}
            // Imported by an earlier run of this node.
            Err(TrellisError::Transport(msg)) if msg.contains("already exists") => {}
            Err(e) => return Err(e),
        }

        tracing::debug!("Imported IPNS key {}", name);
        if let Ok(mut imported) = self.imported.lock() {
            imported.insert(name);
        }
        Ok(())
    }

    /// Point the IPNS name of `key_name` at `cid`.
    ///
    /// POST /api/v0/name/publish?arg=/ipfs/{cid}&key={key_name}
    pub async fn name_publish(&self, key_name: &str, cid: &str) -> Result<(), TrellisError> {
        self.post(
            "name publish",
            &format!(
                "name/publish?arg=/ipfs/{}&key={}&allow-offline=true",
                cid, key_name
            ),
            None,
        )
        .await?;
        Ok(())
    }

    fn is_imported(&self, name: &str) -> bool {
        self.imported
            .lock()
            .map(|imported| imported.contains(name))
            .unwrap_or(false)
    }
}

#[async_trait]
impl ContentNetwork for IpfsClient {
    async fn publish(&self, insert_uri: &InsertUri, data: &[u8]) -> Result<u64, TrellisError> {
        self.import_key(insert_uri).await?;
        let cid = self.add(data).await?;
        self.name_publish(&insert_uri.key_name(), &cid).await?;
        tracing::info!(
            "Published edition {} of {} as {}",
            insert_uri.edition(),
            insert_uri.request_uri().identity_id(),
            cid
        );
        Ok(insert_uri.edition())
    }

    async fn fetch(&self, request_uri: &RequestUri) -> Result<Vec<u8>, TrellisError> {
        self.cat(&format!("/ipns/{}", ipns_name(request_uri)?)).await
    }
}

/// IPNS name (libp2p peer id) of an identity's routing key.
pub fn ipns_name(request_uri: &RequestUri) -> Result<String, TrellisError> {
    let public_key = ed25519::PublicKey::try_from_bytes(request_uri.routing_key())
        .map_err(|e| TrellisError::Crypto(format!("Invalid routing key: {}", e)))?;
    Ok(PeerId::from_public_key(&PublicKey::from(public_key)).to_base58())
}

/// libp2p protobuf encoding of an identity's insert key, as `key/import`
/// expects it.
fn private_key_protobuf(insert_uri: &InsertUri) -> Result<Vec<u8>, TrellisError> {
    let keypair = Keypair::ed25519_from_bytes(insert_uri.keypair().secret_key_bytes())
        .map_err(|e| TrellisError::Crypto(format!("Invalid insert key: {}", e)))?;
    keypair
        .to_protobuf_encoding()
        .map_err(|e| TrellisError::Crypto(format!("Insert key encoding failed: {}", e)))
}
