// Unix socket transport - dial / bind with stale-path handling

use sockrpc_core::{Error, Result};
use std::io;
use std::os::unix::fs::{FileTypeExt, PermissionsExt};
use std::path::Path;
use tokio::net::{UnixListener, UnixStream};
use tracing::{debug, info, warn};

/// Open a fresh connection to the socket at `path`.
pub async fn dial(path: impl AsRef<Path>) -> Result<UnixStream> {
    let path = path.as_ref();
    UnixStream::connect(path).await.map_err(|e| {
        Error::Transport(io::Error::new(
            e.kind(),
            format!("failed to connect to {}: {}", path.display(), e),
        ))
    })
}

/// Bind a listener at `path`.
///
/// Creates missing parent directories. An existing socket file is test-dialed: if
/// something accepts on it the bind fails with `AddrInUse`, otherwise the
/// stale file is removed. A non-socket file at `path` is never removed.
/// `mode` sets the socket file permissions (e.g. `0o600`).
pub async fn bind(path: impl AsRef<Path>, mode: Option<u32>) -> Result<UnixListener> {
    let path = path.as_ref();

    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            tokio::fs::create_dir_all(parent).await?;
        }
    }

    match tokio::fs::symlink_metadata(path).await {
        Ok(meta) if meta.file_type().is_socket() => {
            if UnixStream::connect(path).await.is_ok() {
                return Err(Error::Transport(io::Error::new(
                    io::ErrorKind::AddrInUse,
                    format!("socket {} is already in use", path.display()),
                )));
            }
            warn!(path = %path.display(), "Removing stale socket file");
            tokio::fs::remove_file(path).await?;
        }
        Ok(_) => {
            return Err(Error::Transport(io::Error::new(
                io::ErrorKind::AlreadyExists,
                format!("{} exists and is not a socket", path.display()),
            )));
        }
        Err(e) if e.kind() == io::ErrorKind::NotFound => {}
        Err(e) => return Err(e.into()),
    }

    let listener = UnixListener::bind(path).map_err(|e| {
        Error::Transport(io::Error::new(
            e.kind(),
            format!("failed to bind {}: {}", path.display(), e),
        ))
    })?;

    if let Some(mode) = mode {
        tokio::fs::set_permissions(path, std::fs::Permissions::from_mode(mode)).await?;
    }

    info!(path = %path.display(), "Socket bound");
    Ok(listener)
}

/// Remove the socket file, ignoring a missing path.
pub fn remove_socket(path: impl AsRef<Path>) {
    let path = path.as_ref();
    match std::fs::remove_file(path) {
        Ok(()) => debug!(path = %path.display(), "Socket file removed"),
        Err(e) if e.kind() == io::ErrorKind::NotFound => {}
        Err(e) => warn!(path = %path.display(), error = %e, "Failed to remove socket file"),
    }
}
