//! Built-in middleware.
//!
//! Each type implements [`sockrpc_core::Middleware`] and can be registered
//! per method or registry-wide.

mod logging;
mod rate_limit;

pub use logging::LoggingMiddleware;
pub use rate_limit::{RateLimitMiddleware, RateLimiter};
