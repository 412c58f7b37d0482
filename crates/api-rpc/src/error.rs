//! RPC Error Mapping
//!
//! Maps framework errors to JSON-RPC error objects for handlers that work in
//! terms of [`sockrpc_core::Result`].

use sockrpc_core::domain::code;
use sockrpc_core::{Error, ErrorObject};

/// Convert a framework error to the error object sent on the wire.
pub fn to_error_object(err: &Error) -> ErrorObject {
    match err {
        Error::Handler(obj) => obj.clone(),
        Error::NotFound(_) => ErrorObject::new(code::METHOD_NOT_FOUND, err.to_string()),
        Error::Serialization(e) => ErrorObject::invalid_params(e.to_string()),
        Error::Protocol(msg) => ErrorObject::new(code::INVALID_REQUEST, msg.clone()),
        Error::Transport(_)
        | Error::Cancelled(_)
        | Error::Registration(_)
        | Error::Config(_) => ErrorObject::internal(err.to_string()),
    }
}
