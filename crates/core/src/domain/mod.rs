// Domain Layer - JSON-RPC envelopes

pub mod error_object;
pub mod request;
pub mod response;

// Re-exports
pub use error_object::{code, ErrorObject};
pub use request::Request;
pub use response::{Outcome, Response};
