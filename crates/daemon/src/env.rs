// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Centralized environment variable access.
//!
//! These are the highest-precedence configuration layer: they override
//! both built-in defaults and a workspace's `.beads/config.toml`.

use std::path::PathBuf;

/// Forces a specific metadata directory, disabling filesystem discovery
/// and prefix routing.
pub const WORKSPACE_OVERRIDE: &str = "BEADS_WORKSPACE";

/// Redirects all RPC to a remote daemon `host:port`; disables local routing.
pub const REMOTE_DAEMON: &str = "BEADS_REMOTE_DAEMON";

/// Bearer token required when talking to the HTTP/SSE surface.
pub const DAEMON_TOKEN: &str = "BEADS_DAEMON_TOKEN";

/// Downgrades the fingerprint refusal to a warning. Dangerous: silent sync
/// across mismatched workspaces can delete issues.
pub const IGNORE_FINGERPRINT_MISMATCH: &str = "BEADS_IGNORE_FINGERPRINT_MISMATCH";

/// The actor string recorded against each mutation.
pub const ACTOR: &str = "BEADS_ACTOR";

pub fn workspace_override() -> Option<PathBuf> {
    std::env::var(WORKSPACE_OVERRIDE).ok().map(PathBuf::from)
}

pub fn remote_daemon() -> Option<String> {
    std::env::var(REMOTE_DAEMON).ok()
}

pub fn daemon_token() -> Option<String> {
    std::env::var(DAEMON_TOKEN).ok()
}

pub fn ignore_fingerprint_mismatch() -> bool {
    matches!(std::env::var(IGNORE_FINGERPRINT_MISMATCH).as_deref(), Ok("1") | Ok("true"))
}

pub fn actor() -> String {
    std::env::var(ACTOR).unwrap_or_else(|_| "unknown".to_string())
}

#[cfg(test)]
#[path = "env_tests.rs"]
mod tests;
