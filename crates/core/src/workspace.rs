// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Workspace identity.
//!
//! A workspace is one `.beads` directory bound to a single repository via
//! its [`Fingerprint`][crate::fingerprint::Fingerprint]. `WorkspaceId` is the
//! handle daemon clients address a workspace by (its canonicalized root path);
//! the fingerprint is the value actually checked before any sync mutates state.

use crate::fingerprint::Fingerprint;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

crate::define_id! {
    /// Canonicalized path to a workspace's `.beads` directory.
    pub struct WorkspaceId;
}

/// Status of a workspace's daemon-managed lifecycle.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum WorkspaceStatus {
    /// Workspace directory discovered, fingerprint not yet verified.
    #[default]
    Discovered,
    /// Fingerprint verified against the stored database, ready to serve requests.
    Ready,
    /// Fingerprint mismatch between the stored database and the computed value.
    /// All mutating operations are refused until resolved.
    FingerprintMismatch { expected: String, found: String },
    /// Workspace directory went missing or became unreadable after startup.
    Lost { reason: String },
}

impl std::fmt::Display for WorkspaceStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            WorkspaceStatus::Discovered => write!(f, "discovered"),
            WorkspaceStatus::Ready => write!(f, "ready"),
            WorkspaceStatus::FingerprintMismatch { expected, found } => {
                write!(f, "fingerprint_mismatch(expected={expected}, found={found})")
            }
            WorkspaceStatus::Lost { reason } => write!(f, "lost: {reason}"),
        }
    }
}

/// A workspace the daemon knows about: its root directory, identity
/// fingerprint, and current lifecycle status.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Workspace {
    pub id: WorkspaceId,
    pub root: PathBuf,
    pub fingerprint: Fingerprint,
    pub status: WorkspaceStatus,
}

impl Workspace {
    pub fn new(root: PathBuf, fingerprint: Fingerprint) -> Self {
        let id = WorkspaceId::new(root.to_string_lossy().into_owned());
        Self {
            id,
            root,
            fingerprint,
            status: WorkspaceStatus::Discovered,
        }
    }

    pub fn is_ready(&self) -> bool {
        matches!(self.status, WorkspaceStatus::Ready)
    }
}

#[cfg(test)]
#[path = "workspace_tests.rs"]
mod tests;
