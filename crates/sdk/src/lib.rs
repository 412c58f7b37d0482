//! sockrpc SDK - Rust Client Library
//!
//! Calls methods on a sockrpc server over its Unix domain socket. Every call
//! uses a fresh connection and a fresh correlation id.
//!
//! # Example
//!
//! ```no_run
//! use sockrpc_sdk::{CallContext, RpcClient};
//! use serde_json::json;
//! use std::time::Duration;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let client = RpcClient::new("/tmp/sockrpc.sock");
//!
//!     let ctx = CallContext::background().with_timeout(Duration::from_secs(5));
//!     let greeting: String = client.call(&ctx, "hello", json!({})).await?;
//!
//!     println!("{}", greeting);
//!     Ok(())
//! }
//! ```

mod client;
mod context;

pub use client::{ClientConfig, RpcClient};
pub use context::CallContext;

pub use sockrpc_core::{CancelCause, Error, ErrorObject, Result};
pub use tokio_util::sync::CancellationToken;
