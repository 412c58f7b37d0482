// Central Error Type for sockrpc

use crate::domain::ErrorObject;
use thiserror::Error;

/// Why a client call stopped waiting before a response arrived.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CancelCause {
    /// The caller's cancellation token fired.
    Token,
    /// The call deadline elapsed.
    Deadline,
}

impl std::fmt::Display for CancelCause {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CancelCause::Token => write!(f, "cancelled by caller"),
            CancelCause::Deadline => write!(f, "deadline exceeded"),
        }
    }
}

/// Framework-level error type
///
/// Handler and middleware failures travel as [`ErrorObject`] inside a
/// response; this type is what the client returns to its caller and what the
/// server returns from setup (registration, bind).
#[derive(Error, Debug)]
pub enum Error {
    /// Dial, connect, read or write failure.
    #[error("Transport error: {0}")]
    Transport(#[from] std::io::Error),

    /// Response id mismatch, malformed envelope, unusable call arguments.
    #[error("Protocol error: {0}")]
    Protocol(String),

    #[error("Method not found: {0}")]
    NotFound(String),

    /// Application-level failure reported by the remote handler chain.
    #[error("RPC error ({}): {}", .0.code, .0.message)]
    Handler(ErrorObject),

    #[error("Call cancelled: {0}")]
    Cancelled(CancelCause),

    #[error("Registration error: {0}")]
    Registration(String),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Configuration error: {0}")]
    Config(String),
}

impl Error {
    /// Error object for a response error received from the server.
    ///
    /// `METHOD_NOT_FOUND` maps to [`Error::NotFound`] so callers can match on
    /// it without inspecting codes.
    pub fn from_remote(err: ErrorObject) -> Self {
        if err.code == crate::domain::code::METHOD_NOT_FOUND {
            Error::NotFound(err.message)
        } else {
            Error::Handler(err)
        }
    }

    pub fn is_cancelled(&self) -> bool {
        matches!(self, Error::Cancelled(_))
    }
}

/// Result type alias using the sockrpc Error
pub type Result<T> = std::result::Result<T, Error>;
