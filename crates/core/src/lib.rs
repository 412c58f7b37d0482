// sockrpc Core - Protocol types, ports, registry and middleware chain
// NO socket or config dependencies (hexagonal: adapters live in infra-uds / api-rpc / sdk)

pub mod application;
pub mod domain;
pub mod error;
pub mod port;

pub use application::{Chain, HandlerEntry, Registry};
pub use domain::{ErrorObject, Outcome, Request, Response};
pub use error::{CancelCause, Error, Result};
pub use port::{CorrelationCounter, Handler, IdProvider, Middleware};

/// JSON-RPC protocol version carried in every envelope.
pub const JSONRPC_VERSION: &str = "2.0";
