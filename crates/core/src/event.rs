// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Mutation events published on the daemon's internal event bus.
//!
//! Serializes with `{"type": "issue:name", ...fields}` format. Unknown type
//! tags deserialize to `Custom` so a future schema addition never breaks an
//! older reader replaying a WAL it doesn't fully understand.

use crate::issue::{IssueId, IssueStatus};
use serde::{Deserialize, Serialize};

/// Events that trigger state transitions in the materialized issue store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum Event {
    #[serde(rename = "issue:created")]
    Created { issue_id: IssueId, actor: String },

    #[serde(rename = "issue:updated")]
    Updated {
        issue_id: IssueId,
        actor: String,
        /// Names of the fields that changed, for selective SSE filtering.
        #[serde(default)]
        changed_fields: Vec<String>,
    },

    #[serde(rename = "issue:status_changed")]
    StatusChanged {
        issue_id: IssueId,
        actor: String,
        from: IssueStatus,
        to: IssueStatus,
    },

    #[serde(rename = "issue:deleted")]
    Deleted { issue_id: IssueId, actor: String },

    #[serde(rename = "issue:undeleted")]
    Undeleted { issue_id: IssueId, actor: String },

    #[serde(rename = "issue:commented")]
    Commented { issue_id: IssueId, actor: String },

    #[serde(rename = "issue:dependency_added")]
    DependencyAdded {
        issue_id: IssueId,
        actor: String,
        target: String,
    },

    #[serde(rename = "issue:dependency_removed")]
    DependencyRemoved {
        issue_id: IssueId,
        actor: String,
        target: String,
    },

    #[serde(rename = "sync:exported")]
    Exported {
        content_hash: String,
        issue_count: usize,
    },

    #[serde(rename = "sync:imported")]
    Imported {
        created: usize,
        updated: usize,
        skipped: usize,
    },

    #[serde(rename = "sync:conflict")]
    Conflict { issue_id: IssueId },

    /// Catch-all for unknown event types (extensibility)
    #[serde(other, skip_serializing)]
    Custom,
}

impl Event {
    /// The issue this event is about, when it is issue-scoped.
    pub fn issue_id(&self) -> Option<&IssueId> {
        match self {
            Event::Created { issue_id, .. }
            | Event::Updated { issue_id, .. }
            | Event::StatusChanged { issue_id, .. }
            | Event::Deleted { issue_id, .. }
            | Event::Undeleted { issue_id, .. }
            | Event::Commented { issue_id, .. }
            | Event::DependencyAdded { issue_id, .. }
            | Event::DependencyRemoved { issue_id, .. }
            | Event::Conflict { issue_id } => Some(issue_id),
            Event::Exported { .. } | Event::Imported { .. } | Event::Custom => None,
        }
    }

    pub fn name(&self) -> &str {
        match self {
            Event::Created { .. } => "issue:created",
            Event::Updated { .. } => "issue:updated",
            Event::StatusChanged { .. } => "issue:status_changed",
            Event::Deleted { .. } => "issue:deleted",
            Event::Undeleted { .. } => "issue:undeleted",
            Event::Commented { .. } => "issue:commented",
            Event::DependencyAdded { .. } => "issue:dependency_added",
            Event::DependencyRemoved { .. } => "issue:dependency_removed",
            Event::Exported { .. } => "sync:exported",
            Event::Imported { .. } => "sync:imported",
            Event::Conflict { .. } => "sync:conflict",
            Event::Custom => "custom",
        }
    }

    pub fn log_summary(&self) -> String {
        let t = self.name();
        match self {
            Event::Created { issue_id, actor } => format!("{t} id={issue_id} actor={actor}"),
            Event::Updated {
                issue_id,
                actor,
                changed_fields,
            } => format!(
                "{t} id={issue_id} actor={actor} fields={}",
                changed_fields.join(",")
            ),
            Event::StatusChanged {
                issue_id,
                actor,
                from,
                to,
            } => format!("{t} id={issue_id} actor={actor} {from}->{to}"),
            Event::Deleted { issue_id, actor } | Event::Undeleted { issue_id, actor } => {
                format!("{t} id={issue_id} actor={actor}")
            }
            Event::Commented { issue_id, actor } => format!("{t} id={issue_id} actor={actor}"),
            Event::DependencyAdded {
                issue_id, target, ..
            }
            | Event::DependencyRemoved {
                issue_id, target, ..
            } => format!("{t} id={issue_id} target={target}"),
            Event::Exported {
                content_hash,
                issue_count,
            } => format!("{t} hash={} issues={issue_count}", content_hash.as_str()),
            Event::Imported {
                created,
                updated,
                skipped,
            } => format!("{t} created={created} updated={updated} skipped={skipped}"),
            Event::Conflict { issue_id } => format!("{t} id={issue_id}"),
            Event::Custom => t.to_string(),
        }
    }
}

#[cfg(test)]
#[path = "event_tests.rs"]
mod tests;
