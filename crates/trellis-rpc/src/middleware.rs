// crates/trellis-rpc/src/middleware.rs
//
// Interceptors for the RPC server.

use tonic::{Request, Status};

/// Log every incoming command request.
pub fn logging_interceptor(req: Request<()>) -> Result<Request<()>, Status> {
    tracing::info!("Incoming command request: {:?}", req.metadata());
    Ok(req)
}
