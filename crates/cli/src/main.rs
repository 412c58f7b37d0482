//! sockrpc CLI - Command-line client for sockrpc servers

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use colored::Colorize;
use serde_json::Value;
use sockrpc_sdk::{CallContext, Error, RpcClient};
use std::path::PathBuf;
use std::time::{Duration, Instant};

const DEFAULT_SOCKET_PATH: &str = "~/.sockrpc/sockrpc.sock";

#[derive(Parser)]
#[command(name = "sockrpc")]
#[command(about = "sockrpc JSON-RPC client", long_about = None)]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Server socket path
    #[arg(long, env = "SOCKRPC_SOCKET", default_value = DEFAULT_SOCKET_PATH)]
    socket: String,

    /// Give up after this many milliseconds (0 waits forever)
    #[arg(long, default_value = "10000")]
    timeout_ms: u64,
}

#[derive(Subcommand)]
enum Commands {
    /// Call a method and print its result
    Call {
        /// Method name
        method: String,

        /// Params as JSON string
        #[arg(short, long, default_value = "null")]
        params: String,

        /// Print compact JSON
        #[arg(long)]
        raw: bool,
    },

    /// Check that the server answers `hello`
    Ping,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let socket = PathBuf::from(shellexpand::tilde(&cli.socket).into_owned());
    let client = RpcClient::new(socket);
    let base = CallContext::background();
    let ctx = match cli.timeout_ms {
        0 => base,
        ms => base.with_timeout(Duration::from_millis(ms)),
    };

    match cli.command {
        Commands::Call {
            method,
            params,
            raw,
        } => {
            let params: Value = serde_json::from_str(&params).context("Invalid params")?;

            match client.call_raw(&ctx, &method, params).await {
                Ok(result) if raw => println!("{}", result),
                Ok(result) => {
                    println!("{}", format!("✓ {}", method).green().bold());
                    println!("{}", serde_json::to_string_pretty(&result)?);
                }
                Err(e) => return Err(report(e)),
            }
        }

        Commands::Ping => {
            let started = Instant::now();
            match client.call::<_, Value>(&ctx, "hello", ()).await {
                Ok(reply) => println!(
                    "{} {} ({:.1} ms)",
                    "✓ Server is up:".green().bold(),
                    reply,
                    started.elapsed().as_secs_f64() * 1000.0
                ),
                Err(e) => {
                    println!("{}", "✗ Server is not responding".red().bold());
                    return Err(report(e));
                }
            }
        }
    }

    Ok(())
}

/// Print server-side errors in detail and hand the error to `main`.
fn report(err: Error) -> anyhow::Error {
    if let Error::Handler(obj) = &err {
        eprintln!(
            "{} {}",
            format!("Error {}:", obj.code).red().bold(),
            obj.message
        );
        if let Some(data) = &obj.data {
            eprintln!("{} {}", "Data:".yellow(), data);
        }
    }
    err.into()
}
