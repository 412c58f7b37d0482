// Handler Port - application logic behind a method name

use crate::domain::{Outcome, Request};
use async_trait::async_trait;
use std::future::Future;
use std::sync::Arc;

/// Produces the result (or error) for one call.
///
/// Implemented automatically for any `Fn(Request) -> impl Future<Output = Outcome>`,
/// so plain async closures and `async fn` items register directly.
#[async_trait]
pub trait Handler: Send + Sync + 'static {
    async fn call(&self, request: Request) -> Outcome;
}

/// Type-erased handler shared across connection tasks.
pub type BoxedHandler = Arc<dyn Handler>;

#[async_trait]
impl<F, Fut> Handler for F
where
    F: Fn(Request) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Outcome> + Send + 'static,
{
    async fn call(&self, request: Request) -> Outcome {
        (self)(request).await
    }
}
