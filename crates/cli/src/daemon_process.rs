// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Daemon process management: finding the `beadsd` binary, spawning it
//! detached, and stopping it by signal. Status is never read from a
//! bespoke PID file -- `bd_daemon::WorkspaceLock::holder` is the one
//! source of truth the daemon itself already maintains.

use std::path::{Path, PathBuf};
use std::process::Command;
use std::time::{Duration, Instant};

use crate::client::ClientError;

/// Start `beadsd` in the background against `repo_root`, returning the
/// child's handle so the caller can detect an early exit during startup.
pub fn start_daemon_background(repo_root: &Path) -> Result<std::process::Child, ClientError> {
    let beadsd_path = find_beadsd_binary();

    Command::new(&beadsd_path)
        .arg(repo_root)
        .stdin(std::process::Stdio::null())
        .stdout(std::process::Stdio::null())
        .stderr(std::process::Stdio::null())
        .spawn()
        .map_err(|err| ClientError::DaemonStartFailed(err.to_string()))
}

fn find_beadsd_binary() -> PathBuf {
    if let Some(path) = crate::env::daemon_binary() {
        return PathBuf::from(path);
    }

    if let Ok(exe) = std::env::current_exe() {
        if let Some(dir) = exe.parent() {
            let sibling = dir.join("beadsd");
            if sibling.exists() {
                return sibling;
            }
        }
    }

    PathBuf::from("beadsd")
}

/// Probe whether a Unix socket is accepting connections.
pub fn probe_socket(socket_path: &Path) -> bool {
    std::os::unix::net::UnixStream::connect(socket_path).is_ok()
}

/// Remove a stale socket left behind by an uncleanly stopped daemon. Safe
/// to call unconditionally: it is only ever invoked after confirming no
/// live process holds the workspace lock.
pub fn cleanup_stale_socket(socket_path: &Path) {
    let _ = std::fs::remove_file(socket_path);
}

/// Check whether a process with the given PID is still alive, via
/// `kill -0`. Zero false negatives on a live process; a dead PID that has
/// been recycled by the OS is an accepted, tiny race shared with the
/// original oj control client this was adapted from.
pub fn process_exists(pid: u32) -> bool {
    kill_signal("-0", pid)
}

pub fn terminate(pid: u32) -> bool {
    kill_signal("-15", pid)
}

pub fn force_kill(pid: u32) -> bool {
    kill_signal("-9", pid)
}

fn kill_signal(signal: &str, pid: u32) -> bool {
    Command::new("kill")
        .args([signal, &pid.to_string()])
        .stdin(std::process::Stdio::null())
        .stdout(std::process::Stdio::null())
        .stderr(std::process::Stdio::null())
        .status()
        .map(|status| status.success())
        .unwrap_or(false)
}

/// Wait for a process to exit, polling at `poll_interval` up to `timeout`.
pub async fn wait_for_exit(pid: u32, timeout: Duration, poll_interval: Duration) -> bool {
    let start = Instant::now();
    while start.elapsed() < timeout {
        if !process_exists(pid) {
            return true;
        }
        tokio::time::sleep(poll_interval).await;
    }
    !process_exists(pid)
}

#[cfg(test)]
#[path = "daemon_process_tests.rs"]
mod tests;
