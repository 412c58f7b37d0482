// Middleware Port - cross-cutting hooks around dispatch

use crate::domain::{ErrorObject, Outcome, Request};
use std::sync::Arc;

/// Hooks run before and after a handler.
///
/// Both hooks default to pass-through, so an implementation only overrides
/// what it needs. A handler type may implement this too and be listed in its
/// own middleware chain.
#[cfg_attr(test, mockall::automock)]
pub trait Middleware: Send + Sync {
    /// Observe the request before dispatch.
    ///
    /// Returning an error aborts the remaining pre-dispatch hooks and the
    /// handler; the error becomes the outcome seen by the post-dispatch hooks.
    fn process_request(&self, _request: &Request) -> Result<(), ErrorObject> {
        Ok(())
    }

    /// Transform the outcome after dispatch.
    ///
    /// Receives the handler result (or the error so far) and returns the
    /// outcome passed to the next hook.
    fn process_response(&self, outcome: Outcome) -> Outcome {
        outcome
    }
}

pub type BoxedMiddleware = Arc<dyn Middleware>;
