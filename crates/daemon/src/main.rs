// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! beadsd -- the background daemon that owns a workspace's SQLite database
//! and JSONL export, and answers RPC over a Unix socket (and, optionally, an
//! HTTP + SSE bridge).
//!
//! Not meant to be run directly by a human: `bd` starts it, waits for the
//! socket to appear, and talks to it from then on.

#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

use std::path::PathBuf;

use bd_daemon::runtime::Daemon;
use bd_daemon::DaemonError;
use tokio::signal::unix::{signal, SignalKind};
use tracing::{error, info};
use tracing_subscriber::{fmt, EnvFilter};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    match std::env::args().nth(1).as_deref() {
        Some("--version" | "-V") => {
            println!("beadsd {}", env!("CARGO_PKG_VERSION"));
            return Ok(());
        }
        Some("--help" | "-h") => {
            print_help();
            return Ok(());
        }
        Some(other) if other.starts_with('-') => {
            eprintln!("error: unexpected argument '{other}'");
            eprintln!("usage: beadsd [workspace-dir]");
            std::process::exit(1);
        }
        _ => {}
    }

    let repo_root = std::env::args()
        .nth(1)
        .map(PathBuf::from)
        .unwrap_or(std::env::current_dir()?);

    fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    info!(dir = %repo_root.display(), "starting beadsd");

    let daemon = match Daemon::start(repo_root).await {
        Ok(daemon) => daemon,
        Err(DaemonError::LockHeld { holder, host, pid }) => {
            eprintln!("beadsd is already running ({holder} on {host}, pid {pid})");
            std::process::exit(1);
        }
        Err(err) => {
            error!(%err, "failed to start daemon");
            return Err(err.into());
        }
    };

    info!(socket = %daemon.socket_path.display(), "beadsd ready");

    let mut sigterm = signal(SignalKind::terminate())?;
    let mut sigint = signal(SignalKind::interrupt())?;

    tokio::select! {
        _ = sigterm.recv() => info!("received SIGTERM, shutting down"),
        _ = sigint.recv() => info!("received SIGINT, shutting down"),
    }

    daemon.shutdown().await;
    info!("beadsd stopped");
    Ok(())
}

fn print_help() {
    println!("beadsd {}", env!("CARGO_PKG_VERSION"));
    println!();
    println!("Background process owning one beads workspace's database and JSONL export.");
    println!();
    println!("USAGE:");
    println!("    beadsd [workspace-dir]");
    println!();
    println!("beadsd is normally started by the `bd` control client and should not be");
    println!("invoked directly. It listens on a Unix socket under <workspace>/.beads/");
    println!("for commands from `bd`.");
    println!();
    println!("OPTIONS:");
    println!("    -h, --help       Print help information");
    println!("    -V, --version    Print version information");
}
