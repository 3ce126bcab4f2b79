// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! IPC client for the control client: connect to `beadsd`'s Unix socket,
//! auto-starting it when asked to, and exchange length-prefixed JSON frames
//! using the same wire format the daemon crate defines.

use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use bd_daemon::wire::{read_frame, write_frame};
use bd_daemon::{Request, Response};
use thiserror::Error;
use tokio::net::UnixStream;

use crate::daemon_process::{
    cleanup_stale_socket, probe_socket, start_daemon_background, wait_for_exit,
};

pub fn timeout_ipc() -> Duration {
    crate::env::timeout_ipc_ms().unwrap_or(Duration::from_secs(10))
}

pub fn timeout_connect() -> Duration {
    crate::env::timeout_connect_ms().unwrap_or(Duration::from_secs(5))
}

pub fn timeout_exit() -> Duration {
    crate::env::timeout_exit_ms().unwrap_or(Duration::from_secs(2))
}

pub fn poll_interval() -> Duration {
    crate::env::connect_poll_ms().unwrap_or(Duration::from_millis(50))
}

#[derive(Debug, Error)]
pub enum ClientError {
    #[error("daemon not running")]
    DaemonNotRunning,

    #[error("failed to start daemon: {0}")]
    DaemonStartFailed(String),

    #[error("timed out waiting for daemon to start")]
    DaemonStartTimeout,

    #[error("request timed out")]
    RequestTimeout,

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("wire error: {0}")]
    Wire(#[from] bd_daemon::DaemonError),
}

/// Resolves the metadata directory the daemon for `workspace` uses (or
/// would use, for a not-yet-started workspace): the same upward `.beads`
/// search `beadsd` itself performs, falling back to `<workspace>/.beads`
/// when nothing is found yet so a first `daemon start` has somewhere to
/// create it.
pub fn metadata_dir_for(workspace: &Path) -> PathBuf {
    bd_daemon::runtime::discover_metadata_dir(workspace).unwrap_or_else(|_| workspace.join(".beads"))
}

pub struct DaemonClient {
    socket_path: PathBuf,
}

impl DaemonClient {
    /// Connect to an already-running daemon; does not start one.
    pub fn connect(metadata_dir: &Path) -> Result<Self, ClientError> {
        let socket_path = metadata_dir.join("daemon.sock");
        if !socket_path.exists() || !probe_socket(&socket_path) {
            return Err(ClientError::DaemonNotRunning);
        }
        Ok(Self { socket_path })
    }

    /// Connect to the daemon for `workspace`, starting `beadsd` in the
    /// background if it isn't already running (or left a stale socket
    /// behind from an unclean exit).
    pub async fn connect_or_start(workspace: &Path) -> Result<Self, ClientError> {
        let metadata_dir = metadata_dir_for(workspace);
        let socket_path = metadata_dir.join("daemon.sock");

        if socket_path.exists() {
            if probe_socket(&socket_path) {
                return Ok(Self { socket_path });
            }
            cleanup_stale_socket(&socket_path);
        }

        std::fs::create_dir_all(&metadata_dir)?;
        let child = start_daemon_background(workspace)?;
        Self::connect_with_retry(socket_path, child).await
    }

    async fn connect_with_retry(socket_path: PathBuf, mut child: std::process::Child) -> Result<Self, ClientError> {
        let deadline = Instant::now() + timeout_connect();
        while Instant::now() < deadline {
            match child.try_wait() {
                Ok(Some(status)) => {
                    return Err(ClientError::DaemonStartFailed(format!("beadsd exited with {status}")));
                }
                Ok(None) => {}
                Err(_) => {}
            }

            if probe_socket(&socket_path) {
                return Ok(Self { socket_path });
            }
            tokio::time::sleep(poll_interval()).await;
        }
        Err(ClientError::DaemonStartTimeout)
    }

    pub async fn send(&self, request: &Request) -> Result<Response, ClientError> {
        let stream = UnixStream::connect(&self.socket_path).await?;
        let (mut reader, mut writer) = stream.into_split();

        tokio::time::timeout(timeout_ipc(), write_frame(&mut writer, request))
            .await
            .map_err(|_| ClientError::RequestTimeout)??;

        let response: Response = tokio::time::timeout(timeout_ipc(), read_frame(&mut reader))
            .await
            .map_err(|_| ClientError::RequestTimeout)??;

        Ok(response)
    }

    pub fn socket_path(&self) -> &Path {
        &self.socket_path
    }
}

/// Stop the daemon holding the lock on `metadata_dir`: SIGTERM, poll for
/// exit, then SIGKILL if it's still alive past the grace period. Returns
/// `false` when no daemon was running in the first place.
pub async fn stop_daemon(metadata_dir: &Path) -> bool {
    let Some(holder) = bd_daemon::WorkspaceLock::holder(metadata_dir) else {
        return false;
    };

    crate::daemon_process::terminate(holder.pid);
    if wait_for_exit(holder.pid, timeout_exit(), poll_interval()).await {
        return true;
    }

    crate::daemon_process::force_kill(holder.pid);
    wait_for_exit(holder.pid, timeout_exit(), poll_interval()).await;
    true
}

#[cfg(test)]
#[path = "client_tests.rs"]
mod tests;
