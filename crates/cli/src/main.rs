// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! `bd` -- the minimal control client for a beads workspace's daemon.
//!
//! Scope is deliberately narrow: daemon lifecycle (`start`/`stop`/`status`)
//! plus a generic `rpc` passthrough. Issue-authoring verbs (create, list,
//! close, ...) are an external CLI's concern that talks to the same wire
//! protocol; this binary exists for operating the daemon and for scripting
//! against it in tests.

#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

mod client;
mod daemon_process;
mod env;

use std::path::PathBuf;
use std::time::Duration;

use anyhow::{anyhow, Result};
use bd_daemon::Request;
use clap::{Parser, Subcommand};

use crate::client::DaemonClient;

#[derive(Parser)]
#[command(name = "bd", version, about = "Control client for a beads workspace daemon")]
struct Cli {
    /// Workspace directory to operate on (defaults to the current directory).
    #[arg(short = 'C', long = "workspace", global = true, value_name = "DIR")]
    workspace: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Daemon lifecycle management.
    Daemon {
        #[command(subcommand)]
        command: DaemonCommand,
    },
    /// Send a raw RPC request and print the JSON response.
    ///
    /// Starts the daemon automatically if it isn't already running.
    Rpc {
        /// Operation name (get, create, export, sync, migrate_fingerprint, ...).
        op: String,
        /// JSON-encoded arguments object. Defaults to `null`.
        #[arg(default_value = "null")]
        args: String,
        /// Fail rather than auto-starting the daemon if it isn't running.
        #[arg(long)]
        no_start: bool,
    },
}

#[derive(Subcommand)]
enum DaemonCommand {
    /// Start the daemon in the background if it isn't already running.
    Start,
    /// Stop the daemon.
    Stop,
    /// Report whether the daemon is running and basic workspace status.
    Status,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let workspace = cli.workspace.map(Ok).unwrap_or_else(std::env::current_dir)?;

    match cli.command {
        Command::Daemon { command } => daemon(command, &workspace).await,
        Command::Rpc { op, args, no_start } => rpc(&workspace, op, args, no_start).await,
    }
}

async fn daemon(command: DaemonCommand, workspace: &std::path::Path) -> Result<()> {
    match command {
        DaemonCommand::Start => {
            let client = DaemonClient::connect_or_start(workspace).await?;
            println!("beadsd running ({})", client.socket_path().display());
            Ok(())
        }
        DaemonCommand::Stop => {
            let metadata_dir = client::metadata_dir_for(workspace);
            if client::stop_daemon(&metadata_dir).await {
                println!("beadsd stopped");
            } else {
                println!("beadsd was not running");
            }
            Ok(())
        }
        DaemonCommand::Status => {
            let metadata_dir = client::metadata_dir_for(workspace);
            match bd_daemon::WorkspaceLock::holder(&metadata_dir) {
                Some(holder) if daemon_process::process_exists(holder.pid) => {
                    println!("running (pid {}, host {}, since {})", holder.pid, holder.hostname, holder.acquired_at);
                    if let Ok(client) = DaemonClient::connect(&metadata_dir) {
                        let response = client
                            .send(&Request::new("status", serde_json::Value::Null))
                            .await?;
                        print_response(&response);
                    }
                    Ok(())
                }
                _ => {
                    println!("not running");
                    Ok(())
                }
            }
        }
    }
}

async fn rpc(workspace: &std::path::Path, op: String, args: String, no_start: bool) -> Result<()> {
    let args: serde_json::Value = serde_json::from_str(&args).map_err(|err| anyhow!("invalid --args JSON: {err}"))?;

    let client = if no_start {
        let metadata_dir = client::metadata_dir_for(workspace);
        DaemonClient::connect(&metadata_dir)?
    } else {
        DaemonClient::connect_or_start(workspace).await?
    };

    let request = Request::new(op, args);
    let response = tokio::time::timeout(Duration::from_secs(60), client.send(&request)).await??;
    print_response(&response);

    if !response.success {
        std::process::exit(1);
    }
    Ok(())
}

fn print_response(response: &bd_daemon::Response) {
    let rendered = if response.success {
        serde_json::to_string_pretty(&response.payload).unwrap_or_else(|_| "null".to_string())
    } else {
        serde_json::json!({
            "error": response.error,
            "error_family": response.error_family,
        })
        .to_string()
    };
    println!("{rendered}");
}
