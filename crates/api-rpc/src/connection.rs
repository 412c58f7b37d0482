//! Per-connection handling: one request in, one response out, then close.

use sockrpc_core::{ErrorObject, Registry, Response, Result};
use sockrpc_infra_uds::{Inbound, WireConnection};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::net::UnixStream;
use tracing::{debug, trace, warn};

pub(crate) struct ConnectionSettings {
    pub read_timeout: Option<Duration>,
    pub max_frame_bytes: usize,
}

pub(crate) async fn handle_connection(
    stream: UnixStream,
    registry: Arc<Registry>,
    settings: Arc<ConnectionSettings>,
) -> Result<()> {
    let mut conn = WireConnection::with_max_frame_bytes(stream, settings.max_frame_bytes);

    let inbound = match settings.read_timeout {
        Some(limit) => match tokio::time::timeout(limit, conn.recv_request()).await {
            Ok(inbound) => inbound,
            Err(_) => {
                debug!(
                    timeout_ms = limit.as_millis() as u64,
                    "No request before read timeout"
                );
                return Ok(());
            }
        },
        None => conn.recv_request().await,
    };

    let response = match inbound {
        Ok(Inbound::Request(request)) => {
            let started = Instant::now();
            let method = request.method.clone();
            let response = registry.dispatch(request).await;
            debug!(
                method = %method,
                id = response.id,
                error = response.is_error(),
                elapsed_ms = started.elapsed().as_millis() as u64,
                "Request handled"
            );
            response
        }
        Ok(Inbound::Malformed {
            id: Some(id),
            reason,
        }) => {
            warn!(id, reason = %reason, "Malformed request");
            Response::error(id, ErrorObject::parse_error(reason))
        }
        Ok(Inbound::Malformed { id: None, reason }) => {
            warn!(reason = %reason, "Undecodable request, closing without response");
            return Ok(());
        }
        Ok(Inbound::Closed) => {
            trace!("Peer closed before sending a request");
            return Ok(());
        }
        Err(e) => {
            warn!(error = %e, "Failed to read request");
            return Ok(());
        }
    };

    // A cancelled client may already be gone; the write error is reported
    // to the accept loop and the task ends normally.
    conn.send_response(&response).await?;
    if let Err(e) = conn.close().await {
        trace!(error = %e, "Shutdown after response failed");
    }
    Ok(())
}
