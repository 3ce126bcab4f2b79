// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Centralized environment variable access for the control client.

use std::time::Duration;

fn parse_duration_ms(var: &str) -> Option<Duration> {
    std::env::var(var)
        .ok()
        .and_then(|s| s.parse::<u64>().ok())
        .map(Duration::from_millis)
}

/// Overrides the `beadsd` binary location, bypassing the sibling-of-`bd`
/// and `$PATH` lookups.
pub fn daemon_binary() -> Option<String> {
    std::env::var("BEADS_DAEMON_BINARY").ok()
}

pub fn timeout_ipc_ms() -> Option<Duration> {
    parse_duration_ms("BEADS_TIMEOUT_IPC_MS")
}

pub fn timeout_connect_ms() -> Option<Duration> {
    parse_duration_ms("BEADS_TIMEOUT_CONNECT_MS")
}

pub fn timeout_exit_ms() -> Option<Duration> {
    parse_duration_ms("BEADS_TIMEOUT_EXIT_MS")
}

pub fn connect_poll_ms() -> Option<Duration> {
    parse_duration_ms("BEADS_CONNECT_POLL_MS")
}

#[cfg(test)]
#[path = "env_tests.rs"]
mod tests;
