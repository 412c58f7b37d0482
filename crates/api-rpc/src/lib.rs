//! JSON-RPC Server Layer
//!
//! Serves a [`Registry`] over a Unix domain socket: one request and one
//! response per connection, each connection on its own task.
//!
//! ```no_run
//! use sockrpc_api_rpc::{LoggingMiddleware, Outcome, Registry, Request};
//! use sockrpc_api_rpc::{RpcServer, RpcServerConfig};
//! use serde_json::json;
//! use std::sync::Arc;
//!
//! async fn hello(_req: Request) -> Outcome {
//!     Ok(json!("Hello World"))
//! }
//!
//! # async fn run() -> sockrpc_core::Result<()> {
//! let mut registry = Registry::new();
//! let logging = Arc::new(LoggingMiddleware::new("hello"));
//! registry.register("hello", hello, vec![logging])?;
//!
//! RpcServer::new(RpcServerConfig::new("/tmp/rpc.sock"), registry)
//!     .serve()
//!     .await
//! # }
//! ```

mod connection;
pub mod error;
pub mod middleware;
pub mod server;

pub use error::to_error_object;
pub use middleware::{LoggingMiddleware, RateLimitMiddleware, RateLimiter};
pub use server::{RpcServer, RpcServerConfig, ServerHandle};

pub use sockrpc_core::{
    domain::code, ErrorObject, Handler, Middleware, Outcome, Registry, Request, Response,
};
