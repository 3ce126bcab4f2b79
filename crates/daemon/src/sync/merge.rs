// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Three-way merge with deletion tracking.
//!
//! For every issue ID appearing in any of base/left/right, classify the
//! change against base and resolve accordingly. Deletions are first-class:
//! "absent from a side that was present in base" is a deletion, not noise,
//! and wins over an unchanged counterpart on the other side. A deletion
//! racing a modification is a genuine conflict, recorded rather than
//! silently resolved either way.

use crate::config::ResolutionStrategy;
use bd_core::{Issue, IssueId};
use std::collections::{HashMap, HashSet};

/// Pluggable conflict resolution so alternative front-ends (GUI, batch
/// script) can plug in without touching the merge engine itself.
pub trait ConflictResolver: Send + Sync {
    /// Decide the winner when both sides modified the same issue.
    /// Returning `None` means "defer" -- the merge records a conflict and
    /// moves on rather than applying either side.
    fn resolve_both_modified(&self, base: Option<&Issue>, left: &Issue, right: &Issue) -> Option<Issue>;
}

pub struct PreferNewest;
impl ConflictResolver for PreferNewest {
    fn resolve_both_modified(&self, _base: Option<&Issue>, left: &Issue, right: &Issue) -> Option<Issue> {
        Some(if left.updated_at >= right.updated_at {
            left.clone()
        } else {
            right.clone()
        })
    }
}

pub struct PreferLocal;
impl ConflictResolver for PreferLocal {
    fn resolve_both_modified(&self, _base: Option<&Issue>, left: &Issue, _right: &Issue) -> Option<Issue> {
        Some(left.clone())
    }
}

pub struct PreferRemote;
impl ConflictResolver for PreferRemote {
    fn resolve_both_modified(&self, _base: Option<&Issue>, _left: &Issue, right: &Issue) -> Option<Issue> {
        Some(right.clone())
    }
}

pub struct Manual;
impl ConflictResolver for Manual {
    fn resolve_both_modified(&self, _base: Option<&Issue>, _left: &Issue, _right: &Issue) -> Option<Issue> {
        None
    }
}

pub fn resolver_for(strategy: ResolutionStrategy) -> Box<dyn ConflictResolver> {
    match strategy {
        ResolutionStrategy::PreferNewest => Box::new(PreferNewest),
        ResolutionStrategy::PreferLocal => Box::new(PreferLocal),
        ResolutionStrategy::PreferRemote => Box::new(PreferRemote),
        ResolutionStrategy::Manual => Box::new(Manual),
    }
}

/// A deletion racing a modification, or a both-sides-modification the
/// resolver declined to apply. Persisted by the caller, never discarded.
#[derive(Debug, Clone)]
pub struct MergeConflict {
    pub issue_id: IssueId,
    pub base: Option<Issue>,
    pub left: Option<Issue>,
    pub right: Option<Issue>,
    pub reason: String,
}

#[derive(Debug, Default)]
pub struct MergeOutcome {
    /// The merged issue set, keyed by ID. Tombstones are included.
    pub merged: Vec<Issue>,
    pub conflicts: Vec<MergeConflict>,
}

fn index(issues: &[Issue]) -> HashMap<&IssueId, &Issue> {
    issues.iter().map(|i| (&i.id, i)).collect()
}

/// Merge `left` (pre-pull local projection) and `right` (the JSONL on disk
/// after pull) against `base` (the ground truth from the last successful
/// sync), using `resolver` when both sides modified the same issue.
pub fn three_way_merge(
    base: &[Issue],
    left: &[Issue],
    right: &[Issue],
    resolver: &dyn ConflictResolver,
) -> MergeOutcome {
    let base_idx = index(base);
    let left_idx = index(left);
    let right_idx = index(right);

    let mut ids: HashSet<IssueId> = HashSet::new();
    ids.extend(base.iter().map(|i| i.id.clone()));
    ids.extend(left.iter().map(|i| i.id.clone()));
    ids.extend(right.iter().map(|i| i.id.clone()));

    let mut outcome = MergeOutcome::default();

    for id in ids {
        let b = base_idx.get(&id).copied();
        let l = left_idx.get(&id).copied();
        let r = right_idx.get(&id).copied();

        match (b, l, r) {
            // Absent everywhere already handled by not appearing in `ids`.
            (None, Some(l), None) => outcome.merged.push(l.clone()),
            (None, None, Some(r)) => outcome.merged.push(r.clone()),
            (None, Some(l), Some(r)) => {
                // New on both sides independently: prefer the resolver's
                // call, same as a both-modified case, anchored at no base.
                match resolver.resolve_both_modified(None, l, r) {
                    Some(merged) => outcome.merged.push(merged),
                    None => outcome.conflicts.push(MergeConflict {
                        issue_id: id,
                        base: None,
                        left: Some(l.clone()),
                        right: Some(r.clone()),
                        reason: "created independently on both sides".to_string(),
                    }),
                }
            }
            (Some(base_issue), None, Some(r)) => {
                if r.content_hash == base_issue.content_hash {
                    // Deleted on the left, unchanged on the right: deletion wins.
                    outcome.merged.push(tombstoned(r.clone()));
                } else {
                    outcome.conflicts.push(MergeConflict {
                        issue_id: id,
                        base: Some(base_issue.clone()),
                        left: None,
                        right: Some(r.clone()),
                        reason: "deleted locally but modified remotely".to_string(),
                    });
                }
            }
            (Some(base_issue), Some(l), None) => {
                if l.content_hash == base_issue.content_hash {
                    // Deleted on the right, unchanged on the left: deletion wins.
                    outcome.merged.push(tombstoned(l.clone()));
                } else {
                    outcome.conflicts.push(MergeConflict {
                        issue_id: id,
                        base: Some(base_issue.clone()),
                        left: Some(l.clone()),
                        right: None,
                        reason: "deleted remotely but modified locally".to_string(),
                    });
                }
            }
            (Some(_), None, None) => {
                // Deleted on both sides independently: tombstone wins by
                // construction, nothing left to pick between.
            }
            (base_opt, Some(l), Some(r)) => {
                let base_hash = base_opt.map(|b| b.content_hash.as_str());
                let left_changed = base_hash != Some(l.content_hash.as_str());
                let right_changed = base_hash != Some(r.content_hash.as_str());
                match (left_changed, right_changed) {
                    (false, false) => outcome.merged.push(l.clone()),
                    (true, false) => outcome.merged.push(l.clone()),
                    (false, true) => outcome.merged.push(r.clone()),
                    (true, true) => match resolver.resolve_both_modified(base_opt, l, r) {
                        Some(merged) => outcome.merged.push(merged),
                        None => outcome.conflicts.push(MergeConflict {
                            issue_id: id,
                            base: base_opt.cloned(),
                            left: Some(l.clone()),
                            right: Some(r.clone()),
                            reason: "modified on both sides".to_string(),
                        }),
                    },
                }
            }
            (None, None, None) => unreachable!("id only enters the set from a non-empty slice"),
        }
    }

    outcome.merged.sort_by(|a, b| a.id.as_str().cmp(b.id.as_str()));
    outcome
}

fn tombstoned(mut issue: Issue) -> Issue {
    issue.status = bd_core::IssueStatus::Tombstone;
    if issue.deleted_at.is_none() {
        issue.deleted_at = Some(chrono::Utc::now());
    }
    issue
}

#[cfg(test)]
#[path = "merge_tests.rs"]
mod tests;
