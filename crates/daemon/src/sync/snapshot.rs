// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The base/left/right snapshot triple used by the three-way merge.
//!
//! `base` is the ground truth from the last successful sync; `left` is
//! taken immediately before a pull; `right` is simply the live JSONL file
//! on disk after the pull, so only `base` and `left` are persisted here.
//! Both live beside the JSONL with role-specific suffixes and are written
//! atomically (temp file + rename in the same directory).

use bd_core::Issue;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use crate::error::Result;

pub fn base_path(jsonl_path: &Path) -> PathBuf {
    append_suffix(jsonl_path, "base")
}

pub fn left_path(jsonl_path: &Path) -> PathBuf {
    append_suffix(jsonl_path, "left")
}

fn append_suffix(jsonl_path: &Path, suffix: &str) -> PathBuf {
    let mut name = jsonl_path
        .file_name()
        .map(|n| n.to_os_string())
        .unwrap_or_default();
    name.push(format!(".{suffix}"));
    jsonl_path.with_file_name(name)
}

pub fn read_snapshot(path: &Path) -> Result<Option<Vec<Issue>>> {
    let contents = match fs::read_to_string(path) {
        Ok(c) => c,
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => return Ok(None),
        Err(err) => return Err(err.into()),
    };

    let mut issues = Vec::new();
    for line in contents.lines() {
        if line.trim().is_empty() {
            continue;
        }
        match serde_json::from_str(line) {
            Ok(issue) => issues.push(issue),
            Err(err) => {
                tracing::warn!(path = %path.display(), %err, "skipping unparseable snapshot line");
            }
        }
    }
    Ok(Some(issues))
}

pub fn write_snapshot(path: &Path, issues: &[Issue]) -> Result<()> {
    let tmp_path = path.with_extension(format!(
        "{}.tmp",
        path.extension().and_then(|e| e.to_str()).unwrap_or("snap")
    ));

    {
        let mut file = fs::File::create(&tmp_path)?;
        for issue in issues {
            let line = serde_json::to_string(issue)?;
            writeln!(file, "{line}")?;
        }
        file.sync_all()?;
    }
    fs::rename(&tmp_path, path)?;
    Ok(())
}

/// Removes the left snapshot after a successful merge. The base snapshot
/// is overwritten with the merge result by the caller, never removed.
pub fn clear_left(jsonl_path: &Path) -> Result<()> {
    let path = left_path(jsonl_path);
    match fs::remove_file(&path) {
        Ok(()) => Ok(()),
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(()),
        Err(err) => Err(err.into()),
    }
}

#[cfg(test)]
#[path = "snapshot_tests.rs"]
mod tests;
