// Port Layer - Seams between the framework and application code

pub mod handler;
pub mod id_provider; // Correlation ids (injectable for deterministic tests)
pub mod middleware;

// Re-exports
pub use handler::{BoxedHandler, Handler};
pub use id_provider::{CorrelationCounter, IdProvider};
pub use middleware::{BoxedMiddleware, Middleware};

#[cfg(test)]
pub use middleware::MockMiddleware;
