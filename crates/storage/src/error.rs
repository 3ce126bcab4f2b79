// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Storage-layer error kinds.
//!
//! These map to the "system error" and "invalid input" families in the
//! daemon's error taxonomy; the dispatcher wraps them with the operation
//! name before they leave the process.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("sqlite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("serialization error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("issue not found: {0}")]
    NotFound(String),

    #[error("ambiguous prefix {prefix:?} matches {count} issues")]
    AmbiguousPrefix { prefix: String, count: usize },

    #[error("issue {0} already exists")]
    AlreadyExists(String),

    #[error(
        "export refused: database is empty but {path} is non-empty (would truncate history)"
    )]
    EmptyDbNonEmptyJsonl { path: String },

    #[error("fingerprint mismatch: expected {expected}, found {found}")]
    FingerprintMismatch { expected: String, found: String },

    #[error("repo fingerprint not set; refusing to operate on an unbound workspace")]
    FingerprintMissing,

    #[error(
        "legacy database has no repo_id; run the explicit migrate-fingerprint command before syncing"
    )]
    LegacyFingerprintMigrationRequired,

    #[error("import sanity check failed: {reason}")]
    ImportSanity { reason: String },

    #[error("integrity check failed: {0}")]
    Integrity(String),
}

pub type Result<T> = std::result::Result<T, StorageError>;
