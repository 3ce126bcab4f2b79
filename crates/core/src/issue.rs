// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The issue domain entity and its lifecycle.

use crate::id::ShortId;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::collections::BTreeMap;

crate::define_id! {
    /// Human-readable issue identifier: `<prefix>-<token>` or `<parent>.<index>`.
    pub struct IssueId;
}

/// Lifecycle status of an issue.
///
/// `Tombstone` is first-class: it is never deleted outright, only
/// exported and carried forward so deletions propagate to every clone.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IssueStatus {
    Open,
    InProgress,
    Blocked,
    Closed,
    Deferred,
    Pinned,
    Tombstone,
}

impl IssueStatus {
    pub fn is_tombstone(self) -> bool {
        matches!(self, IssueStatus::Tombstone)
    }
}

impl std::fmt::Display for IssueStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            IssueStatus::Open => "open",
            IssueStatus::InProgress => "in_progress",
            IssueStatus::Blocked => "blocked",
            IssueStatus::Closed => "closed",
            IssueStatus::Deferred => "deferred",
            IssueStatus::Pinned => "pinned",
            IssueStatus::Tombstone => "tombstone",
        };
        write!(f, "{s}")
    }
}

/// Priority band. Ordering is significant: `Critical` sorts first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Priority {
    Critical,
    High,
    Medium,
    Low,
}

/// Typed edge between two issues.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DependencyKind {
    Blocks,
    Related,
    ParentChild,
    DiscoveredFrom,
}

/// A dependency edge from one issue to another (or to an opaque external reference).
///
/// Edges are kept in a separate adjacency relation rather than embedded as
/// pointers inside [`Issue`], so the dependency graph — which may contain
/// cycles — is always reconstructable from scratch.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Dependency {
    pub target: String,
    pub kind: DependencyKind,
}

impl Dependency {
    /// True when `target` is an opaque external reference (`external:<project>:<id>`)
    /// that is permitted to dangle rather than resolve to a local issue.
    pub fn is_external(&self) -> bool {
        self.target.starts_with("external:")
    }
}

/// A single comment attached to an issue, in posting order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Comment {
    pub author: String,
    pub body: String,
    pub created_at: chrono::DateTime<chrono::Utc>,
}

/// The issue domain entity.
///
/// `content_hash` is derived, not authoritative: callers should treat
/// [`Issue::recompute_hash`] as the single source of truth and never hand-roll
/// a hash when constructing an issue from an import line.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Issue {
    pub id: IssueId,
    pub title: String,
    #[serde(default)]
    pub description: String,
    /// Free-form, schema-owned-elsewhere metadata. Opaque to the sync core.
    #[serde(default)]
    pub metadata: BTreeMap<String, serde_json::Value>,
    pub status: IssueStatus,
    pub priority: Priority,
    #[serde(default)]
    pub issue_type: Option<String>,
    #[serde(default)]
    pub assignee: Option<String>,
    #[serde(default)]
    pub labels: Vec<String>,
    #[serde(default)]
    pub comments: Vec<Comment>,
    #[serde(default)]
    pub dependencies: Vec<Dependency>,
    /// Marks an issue as scaffolding generated for a run, not a durable record.
    #[serde(default)]
    pub ephemeral: bool,
    pub created_at: chrono::DateTime<chrono::Utc>,
    pub updated_at: chrono::DateTime<chrono::Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub closed_at: Option<chrono::DateTime<chrono::Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub deleted_at: Option<chrono::DateTime<chrono::Utc>>,
    #[serde(default)]
    pub content_hash: String,
    /// Fields this implementation doesn't model, preserved verbatim on round-trip.
    #[serde(flatten)]
    pub unknown_fields: BTreeMap<String, serde_json::Value>,
}

impl Issue {
    /// Recompute [`Issue::content_hash`] over the canonical serialization,
    /// excluding the hash field itself.
    pub fn recompute_hash(&mut self) {
        self.content_hash.clear();
        let mut hasher = Sha256::new();
        let canonical = serde_json::to_vec(self).unwrap_or_default();
        hasher.update(&canonical);
        self.content_hash = format!("{:x}", hasher.finalize());
    }

    /// Enforce the tombstone/closed invariants from the data model:
    /// `status = tombstone ⇒ deleted_at set`; `status = closed ⇒ closed_at set`;
    /// any record carrying `deleted_at` is normalized to tombstone.
    pub fn normalize(&mut self, now: chrono::DateTime<chrono::Utc>) {
        if self.deleted_at.is_some() && !self.status.is_tombstone() {
            self.status = IssueStatus::Tombstone;
        }
        if self.status.is_tombstone() && self.deleted_at.is_none() {
            self.deleted_at = Some(now);
        }
        if matches!(self.status, IssueStatus::Closed) && self.closed_at.is_none() {
            self.closed_at = Some(now);
        }
    }

    pub fn short_id(&self, n: usize) -> &str {
        self.id.short(n)
    }
}

#[cfg(test)]
#[path = "issue_tests.rs"]
mod tests;
