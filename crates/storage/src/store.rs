// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The storage trait boundary.
//!
//! Every caller — the daemon's mutation dispatcher, the sync pipeline, the
//! cross-workspace router's read-only fallback — reaches issues through this
//! trait, never past it to a raw connection or file handle. The primary
//! implementation is [`crate::sqlite::SqliteStore`]; an alternate
//! content-addressed backend can be slotted in without touching callers.

use crate::error::Result;
use bd_core::{Comment, Dependency, Issue};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A single-field search filter. Business-rule filtering (labels, free text,
/// dependency graph queries) lives in the external CLI; the core only needs
/// enough to serve the router and integration tests.
#[derive(Debug, Clone, Default)]
pub struct IssueFilter {
    pub status: Option<bd_core::IssueStatus>,
    pub assignee: Option<String>,
    pub include_tombstones: bool,
}

/// Options controlling a batch import, mirroring the shared import core's
/// knobs described in the sync pipeline: dry-run, prefix validation,
/// update-skip, and strictness.
#[derive(Debug, Clone)]
pub struct ImportOptions {
    pub dry_run: bool,
    pub validate_prefix: Option<String>,
    pub skip_unchanged: bool,
    pub strict: bool,
}

impl Default for ImportOptions {
    /// The sync pipeline's defaults per §4.3: non-dry-run, no prefix
    /// validation, no update-skip, non-strict.
    fn default() -> Self {
        Self {
            dry_run: false,
            validate_prefix: None,
            skip_unchanged: false,
            strict: false,
        }
    }
}

/// Outcome of a batch import.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ImportSummary {
    pub created: usize,
    pub updated: usize,
    pub skipped: usize,
    pub tombstoned: usize,
    pub errors: Vec<String>,
}

/// A problem surfaced by [`IssueStore::integrity_check`]: duplicate IDs
/// (should be impossible given the primary key, kept for defense against a
/// future non-SQL backend) or dependency edges pointing at nothing local
/// and not tagged `external:`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum IntegrityIssue {
    DuplicateId(String),
    OrphanDependency { from: String, to: String },
}

/// A persisted three-way-merge disagreement: both sides edited a field, or
/// one side deleted while the other modified. Never silently discarded —
/// surfaced on every read of [`IssueStore::list_conflicts`] until resolved.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConflictRecord {
    pub issue_id: String,
    pub field: String,
    pub base_value: Option<serde_json::Value>,
    pub local_value: serde_json::Value,
    pub remote_value: serde_json::Value,
    pub detected_at: DateTime<Utc>,
    pub resolved: bool,
}

/// The storage abstraction: read, write, bulk, and hash-bookkeeping
/// operations over the issue store. Implementations must provide
/// single-writer/multi-reader semantics: a process-wide mutex around write
/// transactions, with reads never blocking on writers beyond a short
/// snapshot boundary.
pub trait IssueStore: Send + Sync {
    // -- reads --

    /// Fetch by exact ID, falling back to unique-prefix resolution (like a
    /// git commit hash) when no exact match exists.
    fn get(&self, id: &str) -> Result<Option<Issue>>;

    fn search(&self, filter: &IssueFilter) -> Result<Vec<Issue>>;

    fn list_dependencies(&self, id: &str) -> Result<Vec<Dependency>>;

    fn get_metadata(&self, key: &str) -> Result<Option<String>>;

    fn is_empty(&self) -> Result<bool>;

    // -- writes --

    fn create(&self, issue: Issue) -> Result<()>;

    fn update(&self, issue: Issue) -> Result<()>;

    fn close(&self, id: &str, closed_at: DateTime<Utc>) -> Result<()>;

    /// Tombstone an issue. Never physically deletes the row: tombstones are
    /// first-class and must keep exporting so deletions propagate.
    fn delete(&self, id: &str, deleted_at: DateTime<Utc>) -> Result<()>;

    /// Explicit undelete. The only path back from `tombstone`.
    fn undelete(&self, id: &str) -> Result<()>;

    fn add_dependency(&self, from: &str, dep: Dependency) -> Result<()>;

    fn remove_dependency(&self, from: &str, target: &str) -> Result<()>;

    fn add_comment(&self, id: &str, comment: Comment) -> Result<()>;

    fn set_metadata(&self, key: &str, value: &str) -> Result<()>;

    // -- bulk --

    /// All issues including tombstones, sorted by ID — the export source of
    /// truth.
    fn export_all(&self) -> Result<Vec<Issue>>;

    fn import_batch(&self, issues: Vec<Issue>, opts: &ImportOptions) -> Result<ImportSummary>;

    // -- hash bookkeeping --

    fn set_export_hash(&self, issue_id: &str, hash: &str) -> Result<()>;

    fn get_export_hash(&self, issue_id: &str) -> Result<Option<String>>;

    // -- fingerprint --

    fn get_repo_id(&self) -> Result<Option<String>>;

    /// Bind the fingerprint. Only ever called once, at init.
    fn set_repo_id(&self, fingerprint: &str) -> Result<()>;

    // -- conflicts --

    fn record_conflict(&self, conflict: ConflictRecord) -> Result<()>;

    fn list_conflicts(&self) -> Result<Vec<ConflictRecord>>;

    fn resolve_conflict(&self, issue_id: &str) -> Result<()>;

    // -- integrity --

    fn integrity_check(&self) -> Result<Vec<IntegrityIssue>>;
}
