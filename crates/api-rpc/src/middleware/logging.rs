//! Structured request/outcome logging.

use sockrpc_core::{ErrorObject, Middleware, Outcome, Request};
use tracing::{info, warn};

/// Logs every call on the way in and its outcome on the way out.
///
/// The pre-dispatch hook never fails.
#[derive(Debug, Clone)]
pub struct LoggingMiddleware {
    label: String,
}

impl LoggingMiddleware {
    pub fn new(label: impl Into<String>) -> Self {
        Self {
            label: label.into(),
        }
    }
}

impl Default for LoggingMiddleware {
    fn default() -> Self {
        Self::new("rpc")
    }
}

impl Middleware for LoggingMiddleware {
    fn process_request(&self, request: &Request) -> Result<(), ErrorObject> {
        info!(
            label = %self.label,
            id = request.id,
            method = %request.method,
            "Request received"
        );
        Ok(())
    }

    fn process_response(&self, outcome: Outcome) -> Outcome {
        match &outcome {
            Ok(_) => info!(label = %self.label, "Request succeeded"),
            Err(err) => warn!(
                label = %self.label,
                code = err.code,
                message = %err.message,
                "Request failed"
            ),
        }
        outcome
    }
}
