//! Daemon configuration
//!
//! Layered with the `config` crate: built-in defaults, then an optional TOML
//! file, then `SOCKRPC_*` environment variables.

use anyhow::{Context, Result};
use config::{Config, Environment, File};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use sockrpc_api_rpc::{RateLimitMiddleware, RpcServerConfig};
use std::path::{Path, PathBuf};
use std::time::Duration;

const APP_NAME: &str = "sockrpc";
const ENV_PREFIX: &str = "SOCKRPC";
const DEFAULT_SOCKET_PATH: &str = "~/.sockrpc/sockrpc.sock";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DaemonConfig {
    pub socket_path: String,
    /// Octal permission bits, e.g. `"600"` or `"0o660"`.
    pub socket_mode: String,
    /// 0 disables the read timeout.
    pub read_timeout_ms: u64,
    pub max_frame_bytes: usize,
    /// 0 disables rate limiting.
    pub rate_limit_burst: u32,
    pub rate_limit_per_sec: u32,
    pub log_dir: Option<String>,
}

impl Default for DaemonConfig {
    fn default() -> Self {
        Self {
            socket_path: DEFAULT_SOCKET_PATH.to_string(),
            socket_mode: "600".to_string(),
            read_timeout_ms: 30_000,
            max_frame_bytes: 1024 * 1024,
            rate_limit_burst: 0,
            rate_limit_per_sec: 0,
            log_dir: None,
        }
    }
}

impl DaemonConfig {
    /// Load defaults, then `file` (if it exists), then the environment.
    pub fn load(file: Option<&Path>) -> Result<Self> {
        let defaults = Config::try_from(&DaemonConfig::default())
            .context("Failed to build default configuration")?;

        let mut builder = Config::builder().add_source(defaults);
        if let Some(file) = file {
            builder = builder.add_source(File::from(file).required(false));
        }

        builder
            .add_source(Environment::with_prefix(ENV_PREFIX).try_parsing(true))
            .build()
            .context("Failed to read configuration")?
            .try_deserialize()
            .context("Invalid configuration")
    }

    pub fn socket_path(&self) -> PathBuf {
        expand(&self.socket_path)
    }

    pub fn socket_mode(&self) -> Result<u32> {
        let digits = self.socket_mode.trim_start_matches("0o");
        u32::from_str_radix(digits, 8)
            .with_context(|| format!("socket_mode {:?} is not an octal mode", self.socket_mode))
    }

    pub fn log_dir(&self) -> Option<PathBuf> {
        self.log_dir.as_deref().map(expand)
    }

    pub fn server_config(&self) -> Result<RpcServerConfig> {
        Ok(RpcServerConfig {
            socket_path: self.socket_path(),
            socket_mode: Some(self.socket_mode()?),
            read_timeout: (self.read_timeout_ms > 0)
                .then(|| Duration::from_millis(self.read_timeout_ms)),
            max_frame_bytes: self.max_frame_bytes,
        })
    }

    pub fn rate_limit(&self) -> Option<RateLimitMiddleware> {
        (self.rate_limit_burst > 0)
            .then(|| RateLimitMiddleware::new(self.rate_limit_burst, self.rate_limit_per_sec))
    }
}

/// `<config_dir>/daemon.toml`, e.g. `~/.config/sockrpc/daemon.toml` on Linux.
pub fn default_config_file() -> Option<PathBuf> {
    ProjectDirs::from("", "", APP_NAME)
        .map(|dirs| dirs.config_dir().join("daemon.toml"))
}

fn expand(path: &str) -> PathBuf {
    PathBuf::from(shellexpand::tilde(path).into_owned())
}
