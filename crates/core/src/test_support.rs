// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Shared test helpers for use across crates.
//!
//! Gated behind `#[cfg(any(test, feature = "test-support"))]`.

use crate::{Issue, IssueId, IssueStatus, Priority};
use std::collections::BTreeMap;

/// A minimal, valid `Issue` with sensible defaults, for tests that only
/// care about a handful of fields.
pub fn issue(id: &str, title: &str) -> Issue {
    let now = chrono::Utc::now();
    let mut issue = Issue {
        id: IssueId::new(id),
        title: title.to_string(),
        description: String::new(),
        metadata: BTreeMap::new(),
        status: IssueStatus::Open,
        priority: Priority::Medium,
        issue_type: None,
        assignee: None,
        labels: Vec::new(),
        comments: Vec::new(),
        dependencies: Vec::new(),
        ephemeral: false,
        created_at: now,
        updated_at: now,
        closed_at: None,
        deleted_at: None,
        content_hash: String::new(),
        unknown_fields: BTreeMap::new(),
    };
    issue.recompute_hash();
    issue
}
