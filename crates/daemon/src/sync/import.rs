// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! JSONL → DB ingestion.
//!
//! Each line is parsed independently; a parse failure is logged and
//! skipped, never aborting the batch. Legacy forms are normalized before
//! the typed `Issue` model ever sees them: a `deleted` status string
//! doesn't exist in [`bd_core::IssueStatus`], so it's rewritten to
//! `tombstone` at the raw-JSON level before deserialization, and the
//! remaining invariants (`deleted_at` implies tombstone, `closed` implies
//! `closed_at`) are enforced by [`bd_core::Issue::normalize`].

use bd_core::Issue;
use bd_storage::{ImportOptions, ImportSummary, IssueFilter, IssueStore};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

use crate::error::{DaemonError, Result};

/// Above this fractional drop in issue count, an import is refused as
/// unsafe rather than silently applied -- a truncated or corrupt JSONL
/// should never be allowed to quietly erase most of a workspace.
const SANITY_DROP_FRACTION: f64 = 0.5;
const SANITY_MIN_BEFORE: usize = 10;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ImportReport {
    pub summary: ImportSummary,
    pub lines_skipped: usize,
}

pub fn import(store: &dyn IssueStore, jsonl_path: &Path) -> Result<ImportReport> {
    let contents = match fs::read_to_string(jsonl_path) {
        Ok(c) => c,
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
            return Ok(ImportReport::default())
        }
        Err(err) => return Err(err.into()),
    };

    let now = chrono::Utc::now();
    let mut issues = Vec::new();
    let mut lines_skipped = 0usize;

    for (lineno, line) in contents.lines().enumerate() {
        if line.trim().is_empty() {
            continue;
        }
        match parse_line(line, now) {
            Ok(issue) => issues.push(issue),
            Err(err) => {
                tracing::warn!(
                    path = %jsonl_path.display(),
                    line = lineno + 1,
                    %err,
                    "skipping unparseable JSONL line"
                );
                lines_skipped += 1;
            }
        }
    }

    // Tombstones never shrink the row count, so the sanity check compares
    // *living* (non-tombstone) issues: a mass-deletion replayed through
    // import shows up as a drop in living issues well before it would ever
    // show up as a drop in total rows.
    let before = store.search(&IssueFilter::default())?.len();
    let summary = store.import_batch(issues, &ImportOptions::default())?;
    let after = store.search(&IssueFilter::default())?.len();
    validate_delta(before, after)?;

    Ok(ImportReport {
        summary,
        lines_skipped,
    })
}

/// Parse and normalize a single JSONL line. Operates on the raw
/// [`serde_json::Value`] first so a legacy `status: "deleted"` tag can be
/// rewritten before the strongly-typed enum ever rejects it.
fn parse_line(line: &str, now: chrono::DateTime<chrono::Utc>) -> Result<Issue> {
    let mut value: serde_json::Value = serde_json::from_str(line)?;
    normalize_legacy_status(&mut value);
    let mut issue: Issue = serde_json::from_value(value)?;
    issue.normalize(now);
    Ok(issue)
}

/// Rewrites the legacy `"status": "deleted"` tag to `"tombstone"` so it
/// survives typed deserialization; `Issue::normalize` handles every other
/// legacy-form coercion once the value is an `Issue`.
fn normalize_legacy_status(value: &mut serde_json::Value) {
    let Some(obj) = value.as_object_mut() else {
        return;
    };
    let is_legacy_deleted = matches!(obj.get("status"), Some(serde_json::Value::String(s)) if s == "deleted");
    if is_legacy_deleted {
        obj.insert(
            "status".to_string(),
            serde_json::Value::String("tombstone".to_string()),
        );
    }
}

/// Refuses an import whose resulting issue count dropped by more than
/// [`SANITY_DROP_FRACTION`] -- the caller is expected to record an import
/// failure and run the backoff bookkeeper on this error.
fn validate_delta(before: usize, after: usize) -> Result<()> {
    if before < SANITY_MIN_BEFORE || after >= before {
        return Ok(());
    }
    let dropped = before - after;
    let fraction = dropped as f64 / before as f64;
    if fraction > SANITY_DROP_FRACTION {
        return Err(DaemonError::System(format!(
            "import would drop {dropped} of {before} issues ({:.0}%), refusing",
            fraction * 100.0
        )));
    }
    Ok(())
}

#[cfg(test)]
#[path = "import_tests.rs"]
mod tests;
