//! Line-delimited JSON RPC front end for the goal engine.

#![warn(missing_docs)]

pub mod protocol;
pub mod server;

pub use protocol::{RpcEnvelope, RpcError, RpcRequest, RpcResponse};
pub use server::{RpcServer, RpcServerConfig};
