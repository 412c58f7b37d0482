//! sockrpc Client Implementation

use crate::context::CallContext;
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use sockrpc_core::{
    CancelCause, CorrelationCounter, Error, IdProvider, Request, Result,
};
use sockrpc_infra_uds::{dial, WireConnection, DEFAULT_MAX_FRAME_BYTES};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, trace};

/// Client configuration
#[derive(Debug, Clone)]
pub struct ClientConfig {
    pub socket_path: PathBuf,
    /// Applied when the call context carries no deadline.
    pub default_timeout: Option<Duration>,
    pub max_frame_bytes: usize,
}

impl ClientConfig {
    pub fn new(socket_path: impl Into<PathBuf>) -> Self {
        Self {
            socket_path: socket_path.into(),
            default_timeout: None,
            max_frame_bytes: DEFAULT_MAX_FRAME_BYTES,
        }
    }
}

/// JSON-RPC client over a Unix domain socket
///
/// Cheap to share: clone it or put it behind an `Arc`. Concurrent calls from
/// one client draw distinct ids from the same counter.
///
/// # Example
///
/// ```no_run
/// use sockrpc_sdk::{CallContext, RpcClient};
///
/// # async fn example() -> sockrpc_sdk::Result<()> {
/// let client = RpcClient::new("/tmp/sockrpc.sock");
/// let reply: String = client.call(&CallContext::background(), "hello", ()).await?;
/// # Ok(())
/// # }
/// ```
#[derive(Clone)]
pub struct RpcClient {
    config: ClientConfig,
    ids: Arc<dyn IdProvider>,
}

impl RpcClient {
    pub fn new(socket_path: impl Into<PathBuf>) -> Self {
        Self::with_config(ClientConfig::new(socket_path))
    }

    pub fn with_config(config: ClientConfig) -> Self {
        Self {
            config,
            ids: Arc::new(CorrelationCounter::new()),
        }
    }

    /// Replace the correlation id source (deterministic ids in tests).
    pub fn with_id_provider(mut self, ids: Arc<dyn IdProvider>) -> Self {
        self.ids = ids;
        self
    }

    pub fn socket_path(&self) -> &Path {
        &self.config.socket_path
    }

    /// Call `method` and decode its result into `R`.
    ///
    /// # Errors
    ///
    /// - [`Error::Transport`]: the socket could not be reached or the
    ///   connection failed mid-call. Never retried.
    /// - [`Error::Cancelled`]: the context fired first. The request may still
    ///   run on the server.
    /// - [`Error::Protocol`]: the response did not correlate or was malformed.
    /// - [`Error::NotFound`] / [`Error::Handler`]: the server answered with
    ///   an error.
    /// - [`Error::Serialization`]: `params` or the result did not (de)serialize.
    pub async fn call<P, R>(&self, ctx: &CallContext, method: &str, params: P) -> Result<R>
    where
        P: Serialize,
        R: DeserializeOwned,
    {
        let params = serde_json::to_value(params)?;
        let result = self.call_raw(ctx, method, params).await?;
        Ok(serde_json::from_value(result)?)
    }

    /// Call `method` and return the raw result value.
    pub async fn call_raw(&self, ctx: &CallContext, method: &str, params: Value) -> Result<Value> {
        if method.is_empty() {
            return Err(Error::Protocol("method must not be empty".into()));
        }
        if ctx.is_cancelled() {
            return Err(Error::Cancelled(CancelCause::Token));
        }

        let deadline = ctx.deadline().or_else(|| {
            self.config
                .default_timeout
                .map(|t| tokio::time::Instant::now() + t)
        });

        let started = Instant::now();
        let result = tokio::select! {
            biased;

            () = ctx.cancelled() => Err(Error::Cancelled(CancelCause::Token)),
            () = deadline_elapsed(deadline) => Err(Error::Cancelled(CancelCause::Deadline)),
            res = self.exchange(method, params) => res,
        };

        debug!(
            method = %method,
            ok = result.is_ok(),
            elapsed_ms = started.elapsed().as_micros() as f64 / 1000.0,
            "RPC call finished"
        );
        result
    }

    /// Dial, send, await the single response. The connection is dropped on
    /// every return path, including when the caller stops polling.
    async fn exchange(&self, method: &str, params: Value) -> Result<Value> {
        let stream = dial(&self.config.socket_path).await?;
        let mut conn = WireConnection::with_max_frame_bytes(stream, self.config.max_frame_bytes);

        let request = Request::new(self.ids.next_id(), method, params);
        trace!(id = request.id, method = %method, "Sending request");
        conn.send_request(&request).await?;

        let response = conn.recv_response().await?;
        if response.id != request.id {
            return Err(Error::Protocol(format!(
                "response id mismatch: expected {}, got {}",
                request.id, response.id
            )));
        }

        response.outcome.map_err(Error::from_remote)
    }
}

async fn deadline_elapsed(deadline: Option<tokio::time::Instant>) {
    match deadline {
        Some(deadline) => tokio::time::sleep_until(deadline).await,
        None => std::future::pending().await,
    }
}
