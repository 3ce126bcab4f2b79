// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! DB → JSONL projection.
//!
//! Issues (including tombstones) are read from storage, sorted by ID, and
//! written atomically to the workspace's JSONL file. A safety gate refuses
//! to export an empty database over a non-empty JSONL -- a broken or
//! not-yet-initialized store must never look like a mass deletion.

use bd_storage::IssueStore;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fs;
use std::io::Write;
use std::path::Path;

use crate::error::{DaemonError, Result};

const METADATA_CONTENT_HASH_KEY: &str = "jsonl_content_hash";
const METADATA_EXPORTED_AT_KEY: &str = "jsonl_exported_at";

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct ExportSummary {
    pub issue_count: usize,
    pub content_hash: String,
}

/// In multi-repo mode, metadata keys carry a per-repo suffix so multiple
/// JSONL roots sharing one DB don't collide; colons in path-derived repo
/// identifiers are mapped to underscores for filesystem-adjacent portability.
fn metadata_key(base: &str, repo_id: Option<&str>) -> String {
    match repo_id {
        Some(id) => format!("{base}:{}", id.replace(':', "_")),
        None => base.to_string(),
    }
}

pub fn export(store: &dyn IssueStore, jsonl_path: &Path, repo_id: Option<&str>) -> Result<ExportSummary> {
    if store.is_empty()? {
        let existing_nonempty = fs::metadata(jsonl_path)
            .map(|m| m.len() > 0)
            .unwrap_or(false);
        if existing_nonempty {
            return Err(DaemonError::PolicyViolation(format!(
                "refusing to export: database is empty but {} is not",
                jsonl_path.display()
            )));
        }
    }

    let mut issues = store.export_all()?;
    issues.sort_by(|a, b| a.id.as_str().cmp(b.id.as_str()));

    let tmp_path = jsonl_path.with_extension("jsonl.tmp");
    let mut hasher = Sha256::new();
    {
        let mut file = fs::File::create(&tmp_path)?;
        for issue in &issues {
            let line = serde_json::to_string(issue)?;
            writeln!(file, "{line}")?;
            hasher.update(line.as_bytes());
            hasher.update(b"\n");
        }
        file.sync_all()?;
    }
    fs::rename(&tmp_path, jsonl_path)?;

    for issue in &issues {
        store.set_export_hash(issue.id.as_str(), &issue.content_hash)?;
    }

    let content_hash = format!("{:x}", hasher.finalize());
    store.set_metadata(&metadata_key(METADATA_CONTENT_HASH_KEY, repo_id), &content_hash)?;
    store.set_metadata(
        &metadata_key(METADATA_EXPORTED_AT_KEY, repo_id),
        &chrono::Utc::now().to_rfc3339_opts(chrono::SecondsFormat::Nanos, true),
    )?;

    bump_db_mtime_if_present(jsonl_path)?;

    Ok(ExportSummary {
        issue_count: issues.len(),
        content_hash,
    })
}

/// Bumps the DB file's mtime to at least the JSONL's, defeating a class of
/// "JSONL newer than DB" false positives in change detection that compares
/// mtimes across the two files.
fn bump_db_mtime_if_present(jsonl_path: &Path) -> Result<()> {
    let Some(parent) = jsonl_path.parent() else {
        return Ok(());
    };
    let db_path = parent.join("beads.db");
    if !db_path.exists() {
        return Ok(());
    }
    let jsonl_mtime = filetime::FileTime::from_last_modification_time(&fs::metadata(jsonl_path)?);
    let db_mtime = filetime::FileTime::from_last_modification_time(&fs::metadata(&db_path)?);
    if db_mtime < jsonl_mtime {
        filetime::set_file_mtime(&db_path, jsonl_mtime)?;
    }
    Ok(())
}

#[cfg(test)]
#[path = "export_tests.rs"]
mod tests;
