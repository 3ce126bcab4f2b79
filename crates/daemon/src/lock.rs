// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Exclusive workspace lock.
//!
//! A workspace may have at most one live daemon. The lock is an OS advisory
//! file lock (`fs2`) on `daemon.lock`, which the kernel releases the instant
//! the holding process exits or crashes -- so a successful `try_lock` is by
//! construction never stale. A small JSON marker alongside it (pid, hostname,
//! acquired_at) exists purely for human diagnostics: `beads status` and error
//! messages read it to say who's holding the lock, not to decide whether it's
//! free.

use crate::error::{DaemonError, Result};
use chrono::{DateTime, Utc};
use fs2::FileExt;
use serde::{Deserialize, Serialize};
use std::fs::{self, File, OpenOptions};
use std::path::{Path, PathBuf};

pub const LOCK_FILE: &str = "daemon.lock";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LockHolder {
    pub pid: u32,
    pub hostname: String,
    pub acquired_at: DateTime<Utc>,
}

impl LockHolder {
    fn current() -> Self {
        Self {
            pid: std::process::id(),
            hostname: gethostname::gethostname().to_string_lossy().to_string(),
            acquired_at: Utc::now(),
        }
    }
}

/// An acquired workspace lock. Releases the advisory lock when dropped.
pub struct WorkspaceLock {
    path: PathBuf,
    file: File,
}

impl WorkspaceLock {
    /// Acquire the lock for a workspace's metadata directory. Fails
    /// immediately (non-blocking) if another process already holds it.
    pub fn acquire(metadata_dir: &Path) -> Result<Self> {
        fs::create_dir_all(metadata_dir)?;
        let path = metadata_dir.join(LOCK_FILE);

        let file = OpenOptions::new()
            .create(true)
            .truncate(false)
            .read(true)
            .write(true)
            .open(&path)?;

        if let Err(_err) = file.try_lock_exclusive() {
            let holder = read_holder(&path).unwrap_or(LockHolder {
                pid: 0,
                hostname: "unknown".to_string(),
                acquired_at: Utc::now(),
            });
            return Err(DaemonError::LockHeld {
                holder: "beadsd".to_string(),
                host: holder.hostname,
                pid: holder.pid,
            });
        }

        write_holder(&file, &LockHolder::current())?;

        Ok(Self { path, file })
    }

    /// Whether the lock is currently held by a live process, without
    /// attempting to acquire it ourselves.
    pub fn is_held(metadata_dir: &Path) -> bool {
        let path = metadata_dir.join(LOCK_FILE);
        let Ok(file) = OpenOptions::new().write(true).open(&path) else {
            return false;
        };
        match file.try_lock_exclusive() {
            Ok(()) => {
                let _ = FileExt::unlock(&file);
                false
            }
            Err(_) => true,
        }
    }

    pub fn holder(metadata_dir: &Path) -> Option<LockHolder> {
        read_holder(&metadata_dir.join(LOCK_FILE)).ok()
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Drop for WorkspaceLock {
    fn drop(&mut self) {
        let _ = FileExt::unlock(&self.file);
    }
}

fn write_holder(mut file: &File, holder: &LockHolder) -> Result<()> {
    use std::io::{Seek, SeekFrom, Write};
    let json = serde_json::to_vec_pretty(holder)?;
    file.set_len(0)?;
    file.seek(SeekFrom::Start(0))?;
    file.write_all(&json)?;
    file.sync_all()?;
    Ok(())
}

fn read_holder(path: &Path) -> Result<LockHolder> {
    let contents = fs::read_to_string(path)?;
    Ok(serde_json::from_str(&contents)?)
}

#[cfg(test)]
#[path = "lock_tests.rs"]
mod tests;
