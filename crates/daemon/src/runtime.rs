// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Daemon startup and shutdown.
//!
//! Ties together everything the other modules build in isolation: workspace
//! discovery, the exclusive lock, storage open plus fingerprint binding, the
//! IPC and optional HTTP listeners, the event bus, the filesystem watcher,
//! and a periodic sync scheduler. One `Daemon` owns exactly one workspace for
//! its whole lifetime; starting a second one against the same metadata
//! directory fails at the lock.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use bd_core::Fingerprint;
use bd_storage::{IssueStore, SqliteStore, StorageError};
use tokio::net::UnixListener;
use tokio::task::JoinHandle;

use crate::config::Config;
use crate::dispatcher::Dispatcher;
use crate::error::{DaemonError, Result};
use crate::event_bus::EventBus;
use crate::lock::WorkspaceLock;
use crate::protocol::Request;
use crate::router::Router;
use crate::watcher::{self, WatcherHandle};
use crate::{env, http};

pub const DB_FILE: &str = "beads.db";
const JSONL_FILE: &str = "issues.jsonl";
const ROUTES_FILE: &str = "routes.jsonl";
pub const SOCKET_FILE: &str = "daemon.sock";
const OWN_PREFIX_KEY: &str = "own_prefix";

/// Default interval of the background `sync` scheduler. Distinct from the
/// watcher's debounce: this runs even when nothing touched the JSONL file,
/// to pick up changes a sibling pushed upstream.
const DEFAULT_SYNC_INTERVAL: Duration = Duration::from_secs(30);

/// How long shutdown waits for in-flight IPC connections to finish on their
/// own before the listener task is aborted outright.
const SHUTDOWN_GRACE: Duration = Duration::from_secs(1);

/// A fully started daemon for one workspace. Dropping it is not enough to
/// release the lock cleanly in every case -- call [`Daemon::shutdown`] so the
/// listener tasks stop accepting connections before the lock file is
/// unlocked.
pub struct Daemon {
    pub metadata_dir: PathBuf,
    pub repo_root: PathBuf,
    pub config: Config,
    pub dispatcher: Arc<Dispatcher>,
    pub bus: EventBus,
    pub router: Arc<Router>,
    pub socket_path: PathBuf,
    lock: Option<WorkspaceLock>,
    watcher: Option<WatcherHandle>,
    ipc_task: JoinHandle<()>,
    http_task: Option<JoinHandle<()>>,
    sync_task: JoinHandle<()>,
}

impl Daemon {
    /// Starts a daemon rooted at `repo_root`. `repo_root` is a directory
    /// inside (or at) the repository the workspace tracks; the metadata
    /// directory is found by walking upward from it unless
    /// `BEADS_WORKSPACE` pins one directly.
    pub async fn start(repo_root: PathBuf) -> Result<Self> {
        let repo_root = repo_root
            .canonicalize()
            .map_err(DaemonError::Io)?;
        let metadata_dir = discover_metadata_dir(&repo_root)?;

        let lock = WorkspaceLock::acquire(&metadata_dir)?;
        tracing::info!(dir = %metadata_dir.display(), "acquired workspace lock");

        let config = Config::load(&metadata_dir);

        let store: Arc<dyn IssueStore> = Arc::new(SqliteStore::open(&metadata_dir.join(DB_FILE))?);
        let repo_id = bind_fingerprint(store.as_ref(), &repo_root, config.ignore_fingerprint_mismatch)?;

        let sync_enabled = sync_is_enabled(&repo_root, &config);

        let bus = EventBus::new();
        let jsonl_path = metadata_dir.join(JSONL_FILE);
        let dispatcher = Arc::new(Dispatcher::new(
            Arc::clone(&store),
            bus.clone(),
            config.clone(),
            jsonl_path.clone(),
            repo_id,
        ));

        let own_prefix = store.get_metadata(OWN_PREFIX_KEY)?;
        let router = Arc::new(Router::new(metadata_dir.join(ROUTES_FILE), own_prefix)?);

        let socket_path = metadata_dir.join(SOCKET_FILE);
        if socket_path.exists() {
            // Stale socket from a previous, uncleanly-stopped process -- the
            // lock we just acquired proves no live daemon owns it.
            let _ = std::fs::remove_file(&socket_path);
        }
        let listener = UnixListener::bind(&socket_path)?;
        let ipc_task = tokio::spawn(crate::ipc::serve(listener, Arc::clone(&dispatcher), Arc::clone(&router)));

        let http_task = match &config.http_bind {
            Some(addr) => Some(spawn_http(addr, Arc::clone(&dispatcher), bus.clone(), config.daemon_token.clone()).await?),
            None => None,
        };

        let watcher = if sync_enabled {
            Some(spawn_watcher(Arc::clone(&dispatcher), jsonl_path, config.debounce))
        } else {
            tracing::warn!("auto-import disabled: sync-branch equals the repository's current branch");
            None
        };

        let sync_task = spawn_sync_scheduler(Arc::clone(&dispatcher), repo_root.clone(), sync_enabled);

        Ok(Self {
            metadata_dir,
            repo_root,
            config,
            dispatcher,
            bus,
            router,
            socket_path,
            lock: Some(lock),
            watcher,
            ipc_task,
            http_task,
            sync_task,
        })
    }

    /// Stops accepting new connections, gives in-flight ones a grace period
    /// to finish, flushes the current state to JSONL, and releases the
    /// workspace lock. Idempotent: calling it twice is harmless.
    pub async fn shutdown(mut self) {
        if let Some(watcher) = self.watcher.take() {
            watcher.stop();
        }
        self.sync_task.abort();

        tokio::time::sleep(SHUTDOWN_GRACE).await;
        self.ipc_task.abort();
        if let Some(task) = self.http_task.take() {
            task.abort();
        }

        let export = self.dispatcher.dispatch(&Request::new("export", serde_json::Value::Null));
        if !export.success {
            tracing::warn!(error = ?export.error, "final export on shutdown failed");
        }

        let _ = std::fs::remove_file(&self.socket_path);
        drop(self.lock.take());
        tracing::info!(dir = %self.metadata_dir.display(), "workspace lock released");
    }
}

/// Walks upward from `start` looking for a `.beads` directory.
/// `BEADS_WORKSPACE` bypasses the walk entirely when set.
pub fn discover_metadata_dir(start: &Path) -> Result<PathBuf> {
    if let Some(dir) = env::workspace_override() {
        return Ok(dir);
    }

    let mut cur = start.to_path_buf();
    loop {
        let candidate = cur.join(".beads");
        if candidate.is_dir() {
            return Ok(candidate);
        }
        if !cur.pop() {
            return Err(DaemonError::WorkspaceNotFound(format!(
                "no .beads directory found above {}",
                start.display()
            )));
        }
    }
}

/// Binds (or verifies) the workspace fingerprint against the computed one,
/// returning the bound `repo_id` for the dispatcher to stamp onto exports.
///
/// - No stored fingerprint, empty database: bind the computed one. This is
///   the common case, a brand-new workspace's first startup.
/// - No stored fingerprint, non-empty database: refuse. A legacy database
///   predating `repo_id` must go through the explicit `migrate_fingerprint`
///   operation rather than being silently adopted.
/// - Stored fingerprint matches: proceed.
/// - Stored fingerprint differs: refuse, unless the caller has set
///   `BEADS_IGNORE_FINGERPRINT_MISMATCH`, in which case this is downgraded
///   to a warning -- syncing across mismatched workspaces can delete
///   issues, so this override exists for deliberate, informed use only.
fn bind_fingerprint(store: &dyn IssueStore, repo_root: &Path, ignore_mismatch: bool) -> Result<Option<String>> {
    let computed = compute_fingerprint(repo_root);
    match store.get_repo_id()? {
        None => {
            if store.is_empty()? {
                store.set_repo_id(computed.as_str())?;
                Ok(Some(computed.as_str().to_string()))
            } else if ignore_mismatch {
                tracing::warn!("non-empty database has no bound fingerprint; proceeding unbound per BEADS_IGNORE_FINGERPRINT_MISMATCH");
                Ok(None)
            } else {
                Err(DaemonError::Storage(StorageError::LegacyFingerprintMigrationRequired))
            }
        }
        Some(stored) if stored == computed.as_str() => Ok(Some(stored)),
        Some(stored) => {
            if ignore_mismatch {
                tracing::warn!(expected = %stored, computed = %computed.as_str(), "fingerprint mismatch ignored by BEADS_IGNORE_FINGERPRINT_MISMATCH");
                Ok(Some(stored))
            } else {
                Err(DaemonError::Storage(StorageError::FingerprintMismatch {
                    expected: stored,
                    found: computed.as_str().to_string(),
                }))
            }
        }
    }
}

/// The fingerprint input is the repository's upstream URL when one is
/// configured. A workspace with no git remote (common in tests, and for
/// users who keep beads data outside of git entirely) falls back to the
/// canonicalized workspace path, which is still stable across restarts and
/// still distinguishes unrelated workspaces from each other.
fn compute_fingerprint(repo_root: &Path) -> Fingerprint {
    match git::upstream_url(repo_root) {
        Some(url) => Fingerprint::compute(&url),
        None => Fingerprint::compute(&repo_root.display().to_string()),
    }
}

fn sync_is_enabled(repo_root: &Path, config: &Config) -> bool {
    let Some(configured) = config.sync_branch.as_deref() else {
        return true;
    };
    let Some(current) = git::current_branch(repo_root) else {
        return true;
    };
    !crate::sync::sync_branch_blocks(Some(configured), &current)
}

fn spawn_watcher(dispatcher: Arc<Dispatcher>, jsonl_path: PathBuf, debounce: Duration) -> WatcherHandle {
    watcher::spawn(jsonl_path, debounce, move || {
        let response = dispatcher.dispatch(&Request::new("import", serde_json::Value::Null));
        if !response.success {
            tracing::warn!(error = ?response.error, "auto-import triggered by filesystem watch failed");
        }
    })
}

fn spawn_sync_scheduler(dispatcher: Arc<Dispatcher>, repo_root: PathBuf, enabled: bool) -> JoinHandle<()> {
    tokio::spawn(async move {
        if !enabled {
            return;
        }
        let mut interval = tokio::time::interval(DEFAULT_SYNC_INTERVAL);
        interval.tick().await; // first tick fires immediately; skip it, startup already exported.
        loop {
            interval.tick().await;
            if let Err(err) = git::pull(&repo_root) {
                tracing::debug!(%err, "periodic git pull failed, syncing against local state only");
            }
            let response = dispatcher.dispatch(&Request::new("sync", serde_json::Value::Null));
            if !response.success {
                tracing::debug!(error = ?response.error, "periodic sync skipped or failed");
            }
        }
    })
}

async fn spawn_http(addr: &str, dispatcher: Arc<Dispatcher>, bus: EventBus, token: Option<String>) -> Result<JoinHandle<()>> {
    let addr: std::net::SocketAddr = addr
        .parse()
        .map_err(|err| DaemonError::InvalidInput(format!("invalid http_bind address {addr:?}: {err}")))?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    let app = http::router(dispatcher, bus, token);
    tracing::info!(%addr, "http bridge listening");
    Ok(tokio::spawn(async move {
        if let Err(err) = axum::serve(listener, app).await {
            tracing::error!(%err, "http bridge exited with an error");
        }
    }))
}

/// Minimal git shell-outs. Kept to the three operations the runtime needs;
/// anything richer (staging, conflict resolution) belongs in the three-way
/// merge, not here.
mod git {
    use std::path::Path;
    use std::process::Command;

    pub fn current_branch(repo_dir: &Path) -> Option<String> {
        run(repo_dir, &["rev-parse", "--abbrev-ref", "HEAD"])
    }

    pub fn upstream_url(repo_dir: &Path) -> Option<String> {
        run(repo_dir, &["remote", "get-url", "origin"])
    }

    pub fn pull(repo_dir: &Path) -> std::io::Result<bool> {
        Command::new("git")
            .args(["pull", "--ff-only"])
            .current_dir(repo_dir)
            .status()
            .map(|status| status.success())
    }

    fn run(dir: &Path, args: &[&str]) -> Option<String> {
        let output = Command::new("git").args(args).current_dir(dir).output().ok()?;
        if !output.status.success() {
            return None;
        }
        let text = String::from_utf8(output.stdout).ok()?;
        let trimmed = text.trim();
        if trimmed.is_empty() {
            None
        } else {
            Some(trimmed.to_string())
        }
    }
}

#[cfg(test)]
#[path = "runtime_tests.rs"]
mod tests;
