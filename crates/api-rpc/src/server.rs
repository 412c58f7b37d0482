//! JSON-RPC Server
//!
//! Serves a [`Registry`] over a Unix domain socket (macOS/Linux).
//!
//! # Lifecycle
//!
//! 1. [`RpcServer::start`] binds the socket. Bind failures (path in use,
//!    permission denied) are returned to the caller, never retried.
//! 2. The accept loop spawns one task per connection and keeps accepting
//!    while earlier connections are still being handled.
//! 3. [`ServerHandle::stop`] stops accepting, waits for in-flight
//!    connections, and removes the socket file.

use crate::connection::{handle_connection, ConnectionSettings};
use sockrpc_core::application::{shutdown_channel, ShutdownSender, ShutdownToken};
use sockrpc_core::{Error, Registry, Result};
use sockrpc_infra_uds::{bind, remove_socket, DEFAULT_MAX_FRAME_BYTES};
use std::future::Future;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tokio::net::UnixListener;
use tokio::task::{JoinHandle, JoinSet};
use tracing::{error, info, warn};

const DEFAULT_SOCKET_PATH: &str = "~/.sockrpc/sockrpc.sock";
const DEFAULT_SOCKET_MODE: u32 = 0o600;
const DEFAULT_READ_TIMEOUT: Duration = Duration::from_secs(30);

/// RPC Server Configuration
#[derive(Debug, Clone)]
pub struct RpcServerConfig {
    pub socket_path: PathBuf,
    /// Permissions applied to the socket file after bind.
    pub socket_mode: Option<u32>,
    /// How long a connection may take to deliver its request.
    pub read_timeout: Option<Duration>,
    pub max_frame_bytes: usize,
}

impl RpcServerConfig {
    pub fn new(socket_path: impl Into<PathBuf>) -> Self {
        Self {
            socket_path: socket_path.into(),
            ..Default::default()
        }
    }

    /// Reject settings the server cannot run with.
    pub fn validate(&self) -> Result<()> {
        if self.socket_path.as_os_str().is_empty() {
            return Err(Error::Config("socket_path must not be empty".into()));
        }
        if self.max_frame_bytes == 0 {
            return Err(Error::Config("max_frame_bytes must be positive".into()));
        }
        if self.read_timeout.is_some_and(|t| t.is_zero()) {
            return Err(Error::Config("read_timeout must be positive".into()));
        }
        if let Some(mode) = self.socket_mode.filter(|m| *m > 0o777) {
            let reason = format!("socket_mode {mode:o} is not a permission mode");
            return Err(Error::Config(reason));
        }
        Ok(())
    }
}

impl Default for RpcServerConfig {
    fn default() -> Self {
        Self {
            socket_path: expand_socket_path(DEFAULT_SOCKET_PATH),
            socket_mode: Some(DEFAULT_SOCKET_MODE),
            read_timeout: Some(DEFAULT_READ_TIMEOUT),
            max_frame_bytes: DEFAULT_MAX_FRAME_BYTES,
        }
    }
}

/// Expand a leading `~` in a socket path.
pub fn expand_socket_path(path: &str) -> PathBuf {
    shellexpand::tilde(path).into_owned().into()
}

/// RPC Server
pub struct RpcServer {
    config: RpcServerConfig,
    registry: Arc<Registry>,
}

impl RpcServer {
    /// The registry is frozen from here on: it is shared read-only by every
    /// connection task.
    pub fn new(config: RpcServerConfig, registry: Registry) -> Self {
        Self {
            config,
            registry: Arc::new(registry),
        }
    }

    /// Bind the socket and start accepting in the background.
    pub async fn start(self) -> Result<ServerHandle> {
        self.config.validate()?;
        let listener = bind(&self.config.socket_path, self.config.socket_mode).await?;

        info!(
            socket = %self.config.socket_path.display(),
            methods = ?self.registry.methods(),
            "JSON-RPC server listening"
        );

        let (shutdown_tx, shutdown_rx) = shutdown_channel();
        let settings = Arc::new(ConnectionSettings {
            read_timeout: self.config.read_timeout,
            max_frame_bytes: self.config.max_frame_bytes,
        });
        let socket_path = self.config.socket_path.clone();

        let task = tokio::spawn(accept_loop(
            listener,
            self.registry,
            settings,
            shutdown_rx,
            socket_path.clone(),
        ));

        Ok(ServerHandle {
            shutdown: shutdown_tx,
            task,
            socket_path,
        })
    }

    /// Serve until Ctrl-C / SIGTERM, then drain and return.
    pub async fn serve(self) -> Result<()> {
        self.serve_with_shutdown(shutdown_signal()).await
    }

    /// Serve until `signal` resolves, then drain and return.
    pub async fn serve_with_shutdown(self, signal: impl Future<Output = ()>) -> Result<()> {
        let handle = self.start().await?;
        signal.await;
        info!("Shutdown signal received, draining connections");
        handle.stop();
        handle.stopped().await;
        Ok(())
    }
}

/// Control handle for a running server.
pub struct ServerHandle {
    shutdown: ShutdownSender,
    task: JoinHandle<()>,
    socket_path: PathBuf,
}

impl ServerHandle {
    /// Stop accepting connections. In-flight connections finish normally.
    pub fn stop(&self) {
        self.shutdown.shutdown();
    }

    /// Wait until the accept loop has exited and every connection finished.
    pub async fn stopped(self) {
        if let Err(e) = self.task.await {
            error!(error = %e, "Accept loop terminated abnormally");
        }
    }

    pub fn socket_path(&self) -> &Path {
        &self.socket_path
    }
}

async fn accept_loop(
    listener: UnixListener,
    registry: Arc<Registry>,
    settings: Arc<ConnectionSettings>,
    mut shutdown: ShutdownToken,
    socket_path: PathBuf,
) {
    let mut tasks = JoinSet::new();

    loop {
        tokio::select! {
            // Shutdown wins over queued connections
            biased;

            () = shutdown.wait() => {
                info!(in_flight = tasks.len(), "Stopped accepting connections");
                break;
            }

            res = listener.accept() => {
                match res {
                    Ok((stream, _addr)) => {
                        let registry = Arc::clone(&registry);
                        let settings = Arc::clone(&settings);
                        tasks.spawn(async move {
                            if let Err(e) = handle_connection(stream, registry, settings).await {
                                warn!(error = %e, "Connection error");
                            }
                        });
                    }
                    Err(e) => {
                        error!(error = %e, "Accept error");
                    }
                }
            }

            // Reap finished connection tasks so the set stays small
            Some(res) = tasks.join_next(), if !tasks.is_empty() => {
                if let Err(e) = res {
                    error!(error = %e, "Connection task failed");
                }
            }
        }
    }

    drop(listener);
    while tasks.join_next().await.is_some() {}
    remove_socket(&socket_path);
    info!(socket = %socket_path.display(), "JSON-RPC server stopped");
}

/// Resolves on SIGTERM or Ctrl-C.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!(error = %e, "Failed to listen for Ctrl-C");
            std::future::pending::<()>().await;
        }
    };

    let sigterm = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                error!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    tokio::select! {
        () = ctrl_c => {}
        () = sigterm => {}
    }
}
