// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Cross-workspace request router.
//!
//! A request whose issue prefix doesn't match the local workspace consults
//! the route table and returns one of three outcomes: local (no routing
//! needed), a sibling workspace with a live daemon (forward over its
//! socket), or a sibling without a daemon (open its DB read-only). Routed
//! connections are refcounted; callers must drop their `SiblingHandle` to
//! release it, and leaked handles are visible via `open_handle_count`.

mod table;

pub use table::RouteTable;

use crate::env;
use crate::error::Result;
use crate::lock::WorkspaceLock;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SiblingKind {
    LiveDaemon,
    ReadOnly,
}

/// A reference-counted handle to a routed sibling workspace. Dropping it
/// releases the slot counted by `Router::open_handle_count`.
pub struct SiblingHandle {
    pub workspace: PathBuf,
    pub kind: SiblingKind,
    counter: Arc<AtomicU64>,
}

impl Drop for SiblingHandle {
    fn drop(&mut self) {
        self.counter.fetch_sub(1, Ordering::SeqCst);
    }
}

pub enum RouteOutcome {
    /// The prefix belongs to this workspace; no routing required.
    Local,
    /// The prefix belongs to a sibling workspace.
    Sibling(SiblingHandle),
    /// No route is known for this prefix.
    Unknown,
}

pub struct Router {
    table: RouteTable,
    own_prefix: Option<String>,
    open_handles: Arc<AtomicU64>,
}

impl Router {
    pub fn new(routes_path: PathBuf, own_prefix: Option<String>) -> Result<Self> {
        Ok(Self {
            table: RouteTable::load(routes_path)?,
            own_prefix,
            open_handles: Arc::new(AtomicU64::new(0)),
        })
    }

    /// Routing is bypassed entirely when the caller is pinned to a remote
    /// daemon or an explicit workspace override -- both make this process
    /// authoritative for every ID it's asked about.
    pub fn is_bypassed(&self) -> bool {
        env::remote_daemon().is_some() || env::workspace_override().is_some()
    }

    pub fn add_route(&mut self, prefix: impl Into<String>, workspace: PathBuf) -> Result<()> {
        self.table.insert(prefix.into(), workspace)
    }

    /// Resolve which workspace owns `prefix`. Partial-ID resolution for an
    /// ID under that prefix must then happen against the returned sibling,
    /// never locally -- prefix collisions across workspaces would
    /// otherwise corrupt results.
    pub fn resolve(&self, prefix: &str) -> RouteOutcome {
        if self.is_bypassed() {
            return RouteOutcome::Local;
        }
        if self.own_prefix.as_deref() == Some(prefix) {
            return RouteOutcome::Local;
        }
        let Some(workspace) = self.table.get(prefix) else {
            return RouteOutcome::Unknown;
        };

        let metadata_dir = workspace.clone();
        let kind = if WorkspaceLock::is_held(&metadata_dir) {
            SiblingKind::LiveDaemon
        } else {
            SiblingKind::ReadOnly
        };

        self.open_handles.fetch_add(1, Ordering::SeqCst);
        RouteOutcome::Sibling(SiblingHandle {
            workspace,
            kind,
            counter: self.open_handles.clone(),
        })
    }

    pub fn open_handle_count(&self) -> u64 {
        self.open_handles.load(Ordering::SeqCst)
    }

    pub fn routes_path(&self) -> &Path {
        self.table.path()
    }
}

#[cfg(test)]
#[path = "router_tests.rs"]
mod tests;
