// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Layered configuration: built-in defaults < `.beads/config.toml` <
//! environment variables < explicit overrides passed by the embedding CLI.

use crate::env;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

/// The conflict-resolution strategy applied when a three-way merge finds
/// both sides modified.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResolutionStrategy {
    PreferNewest,
    PreferLocal,
    PreferRemote,
    Manual,
}

impl Default for ResolutionStrategy {
    fn default() -> Self {
        ResolutionStrategy::PreferNewest
    }
}

/// File-level config, deserialized from `.beads/config.toml`. Every field
/// is optional so a partial file only overrides what it mentions.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ConfigFile {
    pub sync_branch: Option<String>,
    pub resolution_strategy: Option<ResolutionStrategy>,
    pub debounce_ms: Option<u64>,
    pub http_bind: Option<String>,
    pub backoff_ceiling_secs: Option<u64>,
    pub multi_repo_roots: Option<Vec<String>>,
}

/// Fully resolved configuration used by the daemon runtime.
#[derive(Debug, Clone)]
pub struct Config {
    pub sync_branch: Option<String>,
    pub resolution_strategy: ResolutionStrategy,
    pub debounce: Duration,
    pub http_bind: Option<String>,
    pub backoff_ceiling: Duration,
    pub multi_repo_roots: Vec<String>,
    pub daemon_token: Option<String>,
    pub ignore_fingerprint_mismatch: bool,
    pub actor: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            sync_branch: None,
            resolution_strategy: ResolutionStrategy::default(),
            debounce: Duration::from_secs(5),
            http_bind: None,
            backoff_ceiling: Duration::from_secs(300),
            multi_repo_roots: Vec::new(),
            daemon_token: None,
            ignore_fingerprint_mismatch: false,
            actor: "unknown".to_string(),
        }
    }
}

impl Config {
    /// Load the layered configuration for a workspace metadata directory.
    /// Missing or unparseable `config.toml` falls back silently to defaults
    /// (a config file is an optimization, not a requirement).
    pub fn load(metadata_dir: &Path) -> Self {
        let mut config = Config::default();

        let config_path = metadata_dir.join("config.toml");
        if let Ok(contents) = std::fs::read_to_string(&config_path) {
            match toml::from_str::<ConfigFile>(&contents) {
                Ok(file) => config.apply_file(file),
                Err(err) => {
                    tracing::warn!(path = %config_path.display(), error = %err, "ignoring unparseable config.toml");
                }
            }
        }

        config.apply_env();
        config
    }

    fn apply_file(&mut self, file: ConfigFile) {
        if let Some(branch) = file.sync_branch {
            self.sync_branch = Some(branch);
        }
        if let Some(strategy) = file.resolution_strategy {
            self.resolution_strategy = strategy;
        }
        if let Some(ms) = file.debounce_ms {
            self.debounce = Duration::from_millis(ms);
        }
        if let Some(bind) = file.http_bind {
            self.http_bind = Some(bind);
        }
        if let Some(secs) = file.backoff_ceiling_secs {
            self.backoff_ceiling = Duration::from_secs(secs);
        }
        if let Some(roots) = file.multi_repo_roots {
            self.multi_repo_roots = roots;
        }
    }

    fn apply_env(&mut self) {
        if let Some(token) = env::daemon_token() {
            self.daemon_token = Some(token);
        }
        self.ignore_fingerprint_mismatch = env::ignore_fingerprint_mismatch();
        self.actor = env::actor();
    }
}

#[cfg(test)]
#[path = "config_tests.rs"]
mod tests;
