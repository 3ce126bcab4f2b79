// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Workspace identity fingerprint.
//!
//! The fingerprint binds a database to the repository it was created for.
//! Mismatch between the stored and computed fingerprint is a hard refusal:
//! silently syncing across mismatched workspaces can delete issues.

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

/// A stable hash of a workspace's canonicalized upstream URL.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Fingerprint(pub String);

impl Fingerprint {
    /// Compute a fingerprint from a raw upstream URL.
    ///
    /// Normalization: lowercase, strip a trailing slash, strip a trailing
    /// `.git` suffix. The scheme is not otherwise rewritten beyond lowercasing
    /// — `git@host:org/repo` and `https://host/org/repo` remain distinct,
    /// matching how most upstream configurations are actually entered.
    pub fn compute(upstream_url: &str) -> Self {
        let normalized = normalize_url(upstream_url);
        let mut hasher = Sha256::new();
        hasher.update(normalized.as_bytes());
        Fingerprint(format!("{:x}", hasher.finalize()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

fn normalize_url(url: &str) -> String {
    let mut s = url.trim().to_ascii_lowercase();
    if let Some(stripped) = s.strip_suffix('/') {
        s = stripped.to_string();
    }
    if let Some(stripped) = s.strip_suffix(".git") {
        s = stripped.to_string();
    }
    s
}

#[cfg(test)]
#[path = "fingerprint_tests.rs"]
mod tests;
