// crates/trellis-rpc/src/server.rs
//
// RPC server setup: TrellisRpcServer and RpcConfig.
//
// Command messages travel as JSON over tonic's HTTP transport. A single
// service accepts a JSON FieldSet, hands it to the Dispatcher and returns
// the reply FieldSet as JSON. No proto codegen is involved.

use std::sync::Arc;

use http_body::Body as HttpBody;
use http_body_util::BodyExt;
use serde::{Deserialize, Serialize};
use tonic::transport::Server;
use tonic::Status;

use trellis_core::error::TrellisError;
use trellis_graph::TrustGraph;
use trellis_publish::{Fetcher, Shutdown};

use crate::dispatcher::{error_reply, Dispatcher};
use crate::message::FieldSet;
use crate::middleware;

// ---------------------------------------------------------------------------
// RpcConfig
// ---------------------------------------------------------------------------

/// Configuration for the RPC server.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RpcConfig {
    /// Host to bind to (e.g., "127.0.0.1" or "0.0.0.0").
    pub host: String,
    /// Port to listen on.
    pub port: u16,
}

impl Default for RpcConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 50051,
        }
    }
}

// ---------------------------------------------------------------------------
// TrellisRpcServer
// ---------------------------------------------------------------------------

/// The command server of a Trellis node.
#[derive(Debug, Clone)]
pub struct TrellisRpcServer {
    config: RpcConfig,
    dispatcher: Dispatcher,
}

impl TrellisRpcServer {
    pub fn new(config: RpcConfig, graph: Arc<TrustGraph>) -> Self {
        Self {
            config,
            dispatcher: Dispatcher::new(graph),
        }
    }

    /// Fetch identities added over RPC.
    pub fn with_fetcher(mut self, fetcher: Arc<Fetcher>) -> Self {
        self.dispatcher = self.dispatcher.with_fetcher(fetcher);
        self
    }

    /// Serve requests until `shutdown` triggers.
    pub async fn start_with_shutdown(
        &self,
        mut shutdown: Shutdown,
    ) -> Result<(), Box<dyn std::error::Error>> {
        let addr = format!("{}:{}", self.config.host, self.config.port).parse()?;
        tracing::info!("Trellis RPC server starting on {}", addr);

        Server::builder()
            .accept_http1(true)
            .add_service(tonic::service::interceptor::InterceptedService::new(
                TrellisJsonRpcServer::new(self.dispatcher.clone()),
                middleware::logging_interceptor,
            ))
            .serve_with_shutdown(addr, async move { shutdown.wait().await })
            .await?;

        tracing::info!("Trellis RPC server stopped");
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Tonic Service Wiring
// ---------------------------------------------------------------------------

/// Low-level service: JSON FieldSet in, JSON FieldSet out.
#[derive(Clone)]
pub struct TrellisJsonRpcServer {
    dispatcher: Dispatcher,
}

impl std::fmt::Debug for TrellisJsonRpcServer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TrellisJsonRpcServer").finish()
    }
}

impl TrellisJsonRpcServer {
    fn new(dispatcher: Dispatcher) -> Self {
        Self { dispatcher }
    }
}

impl tonic::server::NamedService for TrellisJsonRpcServer {
    const NAME: &'static str = "trellis.rpc.TrellisService";
}

impl<B> tower_service::Service<http::Request<B>> for TrellisJsonRpcServer
where
    B: HttpBody + Send + 'static,
    B::Error: Into<Box<dyn std::error::Error + Send + Sync>> + Send,
    B::Data: Send,
{
    type Response = http::Response<tonic::body::BoxBody>;
    type Error = std::convert::Infallible;
    type Future = std::pin::Pin<
        Box<dyn std::future::Future<Output = Result<Self::Response, Self::Error>> + Send>,
    >;

    fn poll_ready(
        &mut self,
        _cx: &mut std::task::Context<'_>,
    ) -> std::task::Poll<Result<(), Self::Error>> {
        std::task::Poll::Ready(Ok(()))
    }

    fn call(&mut self, req: http::Request<B>) -> Self::Future {
        let dispatcher = self.dispatcher.clone();

        Box::pin(async move {
            let body_bytes = match collect_body(req.into_body()).await {
                Ok(b) => b,
                Err(e) => {
                    tracing::error!("Failed to read request body: {}", e);
                    let reply = error_reply(
                        "",
                        &TrellisError::Serialization(format!("Failed to read request body: {}", e)),
                    );
                    return Ok(build_response(&reply));
                }
            };

            let request: FieldSet = match serde_json::from_slice(&body_bytes) {
                Ok(r) => r,
                Err(e) => {
                    let reply = error_reply(
                        "",
                        &TrellisError::Serialization(format!("Invalid command request: {}", e)),
                    );
                    return Ok(build_response(&reply));
                }
            };

            let reply = dispatcher.dispatch(&request).await;
            Ok(build_response(&reply))
        })
    }
}

/// Collect the body of an HTTP request into bytes.
async fn collect_body<B>(body: B) -> Result<Vec<u8>, String>
where
    B: HttpBody + Send,
    B::Error: Into<Box<dyn std::error::Error + Send + Sync>>,
    B::Data: Send,
{
    let mut collected = Vec::new();
    let mut body = std::pin::pin!(body);

    loop {
        match std::future::poll_fn(|cx| HttpBody::poll_frame(body.as_mut(), cx)).await {
            Some(Ok(frame)) => {
                if let Ok(mut data) = frame.into_data() {
                    use bytes::Buf;
                    while data.has_remaining() {
                        let chunk = data.chunk();
                        collected.extend_from_slice(chunk);
                        let len = chunk.len();
                        data.advance(len);
                    }
                }
            }
            Some(Err(e)) => return Err(e.into().to_string()),
            None => break,
        }
    }

    Ok(collected)
}

/// HTTP response carrying `reply` as JSON.
fn build_response(reply: &FieldSet) -> http::Response<tonic::body::BoxBody> {
    let json = serde_json::to_vec(reply).unwrap_or_default();
    let body = tonic::body::BoxBody::new(
        http_body_util::Full::new(bytes::Bytes::from(json))
            .map_err(|e| Status::internal(format!("body error: {}", e))),
    );

    let mut response = http::Response::new(body);
    response.headers_mut().insert(
        http::header::CONTENT_TYPE,
        http::HeaderValue::from_static("application/json"),
    );
    response
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::handlers::test_support::graph;
    use tower_service::Service;

    async fn call(service: &mut TrellisJsonRpcServer, body: &str) -> FieldSet {
        let request = http::Request::builder()
            .method("POST")
            .uri("/trellis.rpc.TrellisService/Call")
            .body(http_body_util::Full::new(bytes::Bytes::from(body.to_string())))
            .unwrap();
        let response = service.call(request).await.unwrap();
        assert_eq!(response.status(), http::StatusCode::OK);
        assert_eq!(
            response.headers().get(http::header::CONTENT_TYPE).unwrap(),
            "application/json"
        );
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn json_request_reaches_dispatcher() {
        let mut service = TrellisJsonRpcServer::new(Dispatcher::new(graph()));
        let reply = call(
            &mut service,
            r#"{"Message":"CreateIdentity","NickName":"alice","PublishTrustList":"false","Context":"Chat"}"#,
        )
        .await;
        assert_eq!(reply.message_name(), Some("IdentityCreated"));

        let reply = call(&mut service, r#"{"Message":"GetOwnIdentities"}"#).await;
        assert_eq!(reply.get("Nickname1"), Some("alice"));
    }

    #[tokio::test]
    async fn malformed_body_gets_error_reply() {
        let mut service = TrellisJsonRpcServer::new(Dispatcher::new(graph()));
        let reply = call(&mut service, "not json").await;
        assert_eq!(reply.message_name(), Some("Error"));
        assert!(reply
            .get("Description")
            .unwrap()
            .contains("Invalid command request"));
    }

    #[test]
    fn default_config_binds_localhost() {
        let config = RpcConfig::default();
        assert_eq!(config.host, "127.0.0.1");
        assert_eq!(config.port, 50051);
    }
}
