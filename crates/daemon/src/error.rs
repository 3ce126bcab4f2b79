// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The daemon's error taxonomy.
//!
//! Every variant here is one of the six kinds from the error handling
//! design: invalid input, policy violation, partial state, system error,
//! contention, or conflict. Storage errors bubble up unchanged via `#[from]`;
//! the dispatcher is the only place that wraps an error with the operation
//! name before it crosses the IPC or HTTP boundary.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum DaemonError {
    #[error("invalid input: {0}")]
    InvalidInput(String),

    #[error("policy violation: {0}")]
    PolicyViolation(String),

    #[error("partial state: {primary} succeeded but {secondary} failed: {reason}")]
    PartialState {
        primary: String,
        secondary: String,
        reason: String,
    },

    #[error("system error: {0}")]
    System(String),

    #[error("contention: {0}")]
    Contention(String),

    #[error("conflict on {issue_id}: {reason}")]
    Conflict { issue_id: String, reason: String },

    #[error(transparent)]
    Storage(#[from] bd_storage::StorageError),

    #[error("workspace lock held by {holder} on {host} (pid {pid})")]
    LockHeld {
        holder: String,
        host: String,
        pid: u32,
    },

    #[error("workspace discovery failed: {0}")]
    WorkspaceNotFound(String),

    #[error("sync skipped: in backoff window until {retry_at}")]
    BackoffWindow { retry_at: String },

    #[error("sync skipped: sync-branch equals current branch")]
    SyncBranchMatchesCurrent,

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("operation timed out after deadline")]
    DeadlineExceeded,

    #[error("unknown operation {0:?}")]
    UnknownOperation(String),
}

impl DaemonError {
    /// The coarse family this error belongs to, used for exit-code mapping
    /// in the control client and for structured logging.
    pub fn family(&self) -> &'static str {
        match self {
            DaemonError::InvalidInput(_) | DaemonError::UnknownOperation(_) => "invalid_input",
            DaemonError::PolicyViolation(_) => "policy_violation",
            DaemonError::PartialState { .. } => "partial_state",
            DaemonError::Contention(_) => "contention",
            DaemonError::Conflict { .. } => "conflict",
            DaemonError::Storage(_)
            | DaemonError::LockHeld { .. }
            | DaemonError::WorkspaceNotFound(_)
            | DaemonError::BackoffWindow { .. }
            | DaemonError::SyncBranchMatchesCurrent
            | DaemonError::Io(_)
            | DaemonError::Json(_)
            | DaemonError::DeadlineExceeded => "system_error",
        }
    }
}

pub type Result<T> = std::result::Result<T, DaemonError>;
