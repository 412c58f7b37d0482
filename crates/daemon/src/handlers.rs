//! Demo methods served by the daemon

use crate::config::DaemonConfig;
use async_trait::async_trait;
use serde::Deserialize;
use serde_json::{json, Value};
use sockrpc_api_rpc::{
    to_error_object, ErrorObject, LoggingMiddleware, Outcome, Registry, Request,
};
use sockrpc_core::port::{BoxedHandler, BoxedMiddleware};
use sockrpc_core::{Error, Handler, Middleware, Result};
use std::sync::Arc;
use std::time::Duration;
use tracing::info;

const MAX_SLEEP_MS: u64 = 60_000;

/// Answers `hello` and observes its own calls.
///
/// Registered both as the handler and as the method's only middleware.
#[derive(Debug, Default)]
pub struct Greeter;

#[async_trait]
impl Handler for Greeter {
    async fn call(&self, _request: Request) -> Outcome {
        Ok(json!("Hello World"))
    }
}

impl Middleware for Greeter {
    fn process_request(&self, request: &Request) -> std::result::Result<(), ErrorObject> {
        info!(id = request.id, "Greeter received request");
        Ok(())
    }

    fn process_response(&self, outcome: Outcome) -> Outcome {
        info!(ok = outcome.is_ok(), "Greeter produced response");
        outcome
    }
}

#[derive(Debug, Deserialize)]
struct SleepParams {
    ms: u64,
}

async fn echo(request: Request) -> Result<Value> {
    Ok(request.params)
}

async fn sleep(request: Request) -> Result<Value> {
    let params: SleepParams = serde_json::from_value(request.params)?;
    let ms = params.ms.min(MAX_SLEEP_MS);
    tokio::time::sleep(Duration::from_millis(ms)).await;
    Ok(json!({ "slept_ms": ms }))
}

async fn fail(request: Request) -> Result<Value> {
    Err(Error::Handler(
        ErrorObject::application("requested failure").with_data(request.params),
    ))
}

fn respond(result: Result<Value>) -> Outcome {
    result.map_err(|e| to_error_object(&e))
}

/// All demo methods behind a registry-wide logger and, when configured, a
/// rate limiter.
pub fn build_registry(config: &DaemonConfig) -> Result<Registry> {
    let mut registry = Registry::new().with_middleware(LoggingMiddleware::new("daemon"));
    if let Some(limiter) = config.rate_limit() {
        info!(
            burst = config.rate_limit_burst,
            per_sec = config.rate_limit_per_sec,
            "Rate limiting enabled"
        );
        registry.use_middleware(Arc::new(limiter));
    }

    let greeter = Arc::new(Greeter);
    let greeter_handler: BoxedHandler = greeter.clone();
    let greeter_middleware: BoxedMiddleware = greeter;

    registry
        .register_boxed("hello", greeter_handler, vec![greeter_middleware])?
        .register(
            "echo",
            |req: Request| async move { respond(echo(req).await) },
            vec![],
        )?
        .register(
            "sleep",
            |req: Request| async move { respond(sleep(req).await) },
            vec![],
        )?
        .register(
            "fail",
            |req: Request| async move { respond(fail(req).await) },
            vec![],
        )?;

    Ok(registry)
}
