// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Filesystem watcher for the workspace JSONL file.
//!
//! A `notify` watcher fires on every filesystem event touching the JSONL
//! path, which includes events that don't actually change its content --
//! git checkout and rebase routinely flip mtimes without touching bytes.
//! Each raw event is content-hashed against the last observed hash and only
//! a genuine change is forwarded, through the same debounce gate the export
//! trigger uses, so a burst of git-internal touches collapses into at most
//! one auto-import.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use notify::{RecommendedWatcher, RecursiveMode, Watcher};
use parking_lot::Mutex;
use sha2::{Digest, Sha256};
use tokio::sync::{mpsc, oneshot};

/// Handle to a running watcher. Dropping it, or calling [`WatcherHandle::stop`]
/// explicitly, tears down the background task and the underlying `notify`
/// watcher.
pub struct WatcherHandle {
    shutdown: Option<oneshot::Sender<()>>,
}

impl WatcherHandle {
    pub fn stop(mut self) {
        if let Some(tx) = self.shutdown.take() {
            let _ = tx.send(());
        }
    }
}

impl Drop for WatcherHandle {
    fn drop(&mut self) {
        if let Some(tx) = self.shutdown.take() {
            let _ = tx.send(());
        }
    }
}

fn content_hash(path: &Path) -> Option<String> {
    let bytes = std::fs::read(path).ok()?;
    let mut hasher = Sha256::new();
    hasher.update(&bytes);
    Some(format!("{:x}", hasher.finalize()))
}

/// Watch `jsonl_path` for content changes, invoking `on_change` at most once
/// per `debounce` window after the last genuine change in that window.
///
/// `on_change` runs on a blocking thread pool hop (via `spawn_blocking`-free
/// synchronous call from the debounce task) since it is expected to trigger
/// an import, which is itself synchronous storage work.
pub fn spawn(jsonl_path: PathBuf, debounce: Duration, on_change: impl Fn() + Send + Sync + 'static) -> WatcherHandle {
    let (raw_tx, mut raw_rx) = mpsc::channel::<()>(64);
    let (shutdown_tx, mut shutdown_rx) = oneshot::channel();

    let watch_dir = jsonl_path
        .parent()
        .map(Path::to_path_buf)
        .unwrap_or_else(|| PathBuf::from("."));

    let watcher_result = notify::recommended_watcher(move |res: notify::Result<notify::Event>| {
        if res.is_ok() {
            let _ = raw_tx.blocking_send(());
        }
    });

    let Ok(mut watcher) = watcher_result else {
        tracing::warn!(path = %jsonl_path.display(), "failed to construct filesystem watcher, auto-import disabled");
        return WatcherHandle { shutdown: None };
    };

    // Watch the containing directory, not the file itself: editors and git
    // routinely replace the file via rename, which would orphan a watch on
    // the old inode.
    if let Err(err) = watcher.watch(&watch_dir, RecursiveMode::NonRecursive) {
        tracing::warn!(path = %watch_dir.display(), %err, "failed to start filesystem watch, auto-import disabled");
        return WatcherHandle { shutdown: None };
    }

    let last_hash: Arc<Mutex<Option<String>>> = Arc::new(Mutex::new(content_hash(&jsonl_path)));
    let on_change = Arc::new(on_change);

    tokio::spawn(async move {
        // Keep the watcher alive for the lifetime of the debounce task.
        let _watcher_guard = watcher;

        loop {
            tokio::select! {
                _ = &mut shutdown_rx => {
                    break;
                }
                maybe_event = raw_rx.recv() => {
                    if maybe_event.is_none() {
                        break;
                    }
                    // Drain any further events that arrive during the debounce
                    // window so a burst collapses into one check.
                    let deadline = tokio::time::sleep(debounce);
                    tokio::pin!(deadline);
                    loop {
                        tokio::select! {
                            _ = &mut deadline => break,
                            more = raw_rx.recv() => if more.is_none() { break },
                        }
                    }

                    let new_hash = content_hash(&jsonl_path);
                    let changed = {
                        let mut last = last_hash.lock();
                        let changed = *last != new_hash;
                        *last = new_hash;
                        changed
                    };
                    if changed {
                        tracing::debug!(path = %jsonl_path.display(), "jsonl content changed, scheduling auto-import");
                        on_change();
                    }
                }
            }
        }
    });

    WatcherHandle {
        shutdown: Some(shutdown_tx),
    }
}

#[cfg(test)]
#[path = "watcher_tests.rs"]
mod tests;
