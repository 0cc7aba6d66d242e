// crates/trellis-rpc/src/lib.rs
//
// trellis-rpc: Command protocol for a Trellis node.
//
// Requests and replies are FieldSets: flat string maps whose `Message`
// field names the command. The Dispatcher maps each command onto the
// trust graph; the server carries FieldSets as JSON over tonic.

pub mod dispatcher;
pub mod handlers;
pub mod message;
pub mod middleware;
pub mod server;

pub use dispatcher::{error_reply, Dispatcher};
pub use message::FieldSet;
pub use server::{RpcConfig, TrellisRpcServer};
