// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use serial_test::serial;
use std::fs;

#[test]
fn defaults_when_no_file_present() {
    let dir = tempfile::tempdir().unwrap();
    let config = Config::load(dir.path());
    assert_eq!(config.resolution_strategy, ResolutionStrategy::PreferNewest);
    assert_eq!(config.debounce, Duration::from_secs(5));
    assert_eq!(config.backoff_ceiling, Duration::from_secs(300));
    assert!(config.multi_repo_roots.is_empty());
}

#[test]
fn partial_file_only_overrides_mentioned_fields() {
    let dir = tempfile::tempdir().unwrap();
    fs::write(
        dir.path().join("config.toml"),
        "resolution_strategy = \"prefer_local\"\ndebounce_ms = 1500\n",
    )
    .unwrap();

    let config = Config::load(dir.path());
    assert_eq!(config.resolution_strategy, ResolutionStrategy::PreferLocal);
    assert_eq!(config.debounce, Duration::from_millis(1500));
    assert_eq!(config.backoff_ceiling, Duration::from_secs(300));
}

#[test]
fn unparseable_file_falls_back_to_defaults() {
    let dir = tempfile::tempdir().unwrap();
    fs::write(dir.path().join("config.toml"), "not valid toml {{{").unwrap();

    let config = Config::load(dir.path());
    assert_eq!(config.resolution_strategy, ResolutionStrategy::PreferNewest);
}

#[test]
#[serial(beads_env)]
fn env_vars_take_precedence_over_file() {
    let dir = tempfile::tempdir().unwrap();
    std::env::set_var(env::DAEMON_TOKEN, "secret-token");
    std::env::set_var(env::ACTOR, "bob");

    let config = Config::load(dir.path());
    assert_eq!(config.daemon_token.as_deref(), Some("secret-token"));
    assert_eq!(config.actor, "bob");

    std::env::remove_var(env::DAEMON_TOKEN);
    std::env::remove_var(env::ACTOR);
}
