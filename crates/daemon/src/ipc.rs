// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Unix domain socket transport.
//!
//! Each connection carries exactly one request/response pair, framed per
//! `wire.rs`. A request whose ID belongs to a sibling workspace is forwarded
//! to that sibling's socket (if its daemon is live) rather than answered
//! locally -- see [`crate::router`].

use std::sync::Arc;

use tokio::net::{UnixListener, UnixStream};
use tracing::{debug, error, warn};

use crate::dispatcher::{dispatch_read_only, extract_prefix, Dispatcher};
use crate::error::{DaemonError, Result};
use crate::protocol::{Request, Response};
use crate::router::{RouteOutcome, Router, SiblingKind};
use crate::runtime::DB_FILE;
use crate::wire::{read_frame, write_frame};

pub async fn serve(listener: UnixListener, dispatcher: Arc<Dispatcher>, router: Arc<Router>) {
    loop {
        match listener.accept().await {
            Ok((stream, _addr)) => {
                let dispatcher = Arc::clone(&dispatcher);
                let router = Arc::clone(&router);
                tokio::spawn(async move {
                    if let Err(err) = handle_connection(stream, &dispatcher, &router).await {
                        warn!(%err, "ipc connection closed with an error");
                    }
                });
            }
            Err(err) => error!(%err, "failed to accept ipc connection"),
        }
    }
}

async fn handle_connection(mut stream: UnixStream, dispatcher: &Dispatcher, router: &Router) -> Result<()> {
    let (mut reader, mut writer) = stream.split();
    let request: Request = read_frame(&mut reader).await?;
    debug!(op = %request.op, "received ipc request");

    let response = route_and_dispatch(&request, dispatcher, router).await;

    write_frame(&mut writer, &response).await?;
    Ok(())
}

/// Resolve which workspace should answer this request, then dispatch it
/// there: locally, by forwarding to a live sibling daemon, or by refusing
/// when no route is known and the ID isn't ours.
async fn route_and_dispatch(request: &Request, dispatcher: &Dispatcher, router: &Router) -> Response {
    let Some(prefix) = request_prefix(request) else {
        return dispatcher.dispatch(request);
    };

    match router.resolve(prefix) {
        RouteOutcome::Local => dispatcher.dispatch(request),
        RouteOutcome::Unknown => dispatcher.dispatch(request),
        RouteOutcome::Sibling(handle) if handle.kind == SiblingKind::LiveDaemon => {
            match forward(&handle.workspace, request).await {
                Ok(response) => response,
                Err(err) => Response::err(&err),
            }
        }
        RouteOutcome::Sibling(handle) => {
            // No live daemon at the sibling; open its DB read-only and
            // answer from there directly rather than refusing outright.
            match read_only_sibling_dispatch(&handle.workspace, request) {
                Ok(response) => response,
                Err(err) => Response::err(&err),
            }
        }
    }
}

fn read_only_sibling_dispatch(sibling_metadata_dir: &std::path::Path, request: &Request) -> Result<Response> {
    let db_path = sibling_metadata_dir.join(DB_FILE);
    if !db_path.exists() {
        return Err(DaemonError::WorkspaceNotFound(format!(
            "sibling workspace at {} has no database to open read-only",
            sibling_metadata_dir.display()
        )));
    }
    let store = bd_storage::SqliteStore::open_read_only(&db_path)?;
    Ok(dispatch_read_only(&store, request))
}

async fn forward(sibling_metadata_dir: &std::path::Path, request: &Request) -> Result<Response> {
    let socket_path = sibling_metadata_dir.join("daemon.sock");
    let mut stream = UnixStream::connect(&socket_path).await?;
    let (mut reader, mut writer) = stream.split();
    write_frame(&mut writer, request).await?;
    read_frame(&mut reader).await
}

fn request_prefix(request: &Request) -> Option<&str> {
    request
        .args
        .get("id")
        .and_then(|v| v.as_str())
        .map(extract_prefix)
}

#[cfg(test)]
#[path = "ipc_tests.rs"]
mod tests;
