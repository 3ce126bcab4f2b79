// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Tracks consecutive sync failures per workspace and computes the window
//! during which further automatic sync attempts are skipped. A single
//! success clears the window entirely; manual invocations bypass it.

use bd_core::Clock;
use chrono::{DateTime, Utc};
use std::time::Duration;

const INITIAL_WINDOW: Duration = Duration::from_secs(1);

/// Exponential backoff with a ceiling, doubling per consecutive failure.
pub struct BackoffManager<C: Clock> {
    clock: C,
    ceiling: Duration,
    consecutive_failures: u32,
    retry_at: Option<DateTime<Utc>>,
}

impl<C: Clock> BackoffManager<C> {
    pub fn new(clock: C, ceiling: Duration) -> Self {
        Self {
            clock,
            ceiling,
            consecutive_failures: 0,
            retry_at: None,
        }
    }

    /// `None` when sync may proceed; `Some(retry_at)` when the caller is
    /// still inside the backoff window.
    pub fn blocked_until(&self) -> Option<DateTime<Utc>> {
        let retry_at = self.retry_at?;
        if self.clock.now() < retry_at {
            Some(retry_at)
        } else {
            None
        }
    }

    pub fn record_success(&mut self) {
        self.consecutive_failures = 0;
        self.retry_at = None;
    }

    pub fn record_failure(&mut self) {
        self.consecutive_failures = self.consecutive_failures.saturating_add(1);
        let window = INITIAL_WINDOW
            .checked_mul(1u32 << self.consecutive_failures.min(16))
            .unwrap_or(self.ceiling)
            .min(self.ceiling);
        let window = chrono::Duration::from_std(window).unwrap_or(chrono::Duration::zero());
        self.retry_at = Some(self.clock.now() + window);
    }

    pub fn consecutive_failures(&self) -> u32 {
        self.consecutive_failures
    }
}

#[cfg(test)]
#[path = "backoff_tests.rs"]
mod tests;
