//! sockrpc Daemon - Main Entry Point
//! Serves the demo methods over a Unix domain socket until Ctrl-C / SIGTERM.

mod config;
mod handlers;

use anyhow::{Context, Result};
use clap::Parser;
use config::DaemonConfig;
use sockrpc_api_rpc::RpcServer;
use std::path::PathBuf;
use tracing::info;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer};

const VERSION: &str = env!("CARGO_PKG_VERSION");

#[derive(Parser)]
#[command(name = "sockrpc-daemon")]
#[command(about = "Demo JSON-RPC server over a Unix domain socket", long_about = None)]
#[command(version)]
struct Args {
    /// Config file (TOML)
    #[arg(long, env = "SOCKRPC_CONFIG")]
    config: Option<PathBuf>,

    /// Socket path, overrides the config file
    #[arg(long)]
    socket: Option<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    // 1. Load configuration
    let config_file = args.config.or_else(config::default_config_file);
    let mut config = DaemonConfig::load(config_file.as_deref())?;
    if let Some(socket) = args.socket {
        config.socket_path = socket;
    }

    // 2. Initialize logging (kept alive for the file appender)
    let _log_guard = init_logging(&config)?;

    info!("sockrpc daemon v{} starting...", VERSION);
    if let Some(file) = &config_file {
        info!(config = %file.display(), "Configuration loaded");
    }

    // 3. Register methods
    let registry = handlers::build_registry(&config).context("Method registration failed")?;

    // 4. Serve until shutdown signal
    let server_config = config.server_config()?;
    info!(socket = %server_config.socket_path.display(), "Starting JSON-RPC server...");
    RpcServer::new(server_config, registry)
        .serve()
        .await
        .context("JSON-RPC server failed")?;

    info!("Shutdown complete.");
    Ok(())
}

/// JSON or pretty console output selected by `SOCKRPC_LOG_FORMAT`, plus a
/// daily-rolling file when `log_dir` is configured.
fn init_logging(config: &DaemonConfig) -> Result<Option<WorkerGuard>> {
    let log_format = std::env::var("SOCKRPC_LOG_FORMAT").unwrap_or_else(|_| "pretty".to_string());

    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new("sockrpc=info"))
        .context("Failed to create env filter")?;

    let console = match log_format.as_str() {
        // Production: JSON structured logging
        "json" => fmt::layer().json().boxed(),
        // Development: Pretty formatting with colors
        _ => fmt::layer().pretty().boxed(),
    };

    let (file_layer, guard) = match config.log_dir() {
        Some(dir) => {
            std::fs::create_dir_all(&dir)
                .with_context(|| format!("Failed to create log dir {}", dir.display()))?;
            let appender = tracing_appender::rolling::daily(dir, "sockrpc-daemon.log");
            let (writer, guard) = tracing_appender::non_blocking(appender);
            let layer = fmt::layer().json().with_ansi(false).with_writer(writer);
            (Some(layer), Some(guard))
        }
        None => (None, None),
    };

    tracing_subscriber::registry()
        .with(env_filter)
        .with(console)
        .with(file_layer)
        .init();

    Ok(guard)
}
