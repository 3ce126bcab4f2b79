// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! bd-storage: the trait boundary between the daemon's dispatcher/sync
//! pipeline and the SQLite-backed issue database.
//!
//! Callers never reach past [`IssueStore`] to a raw connection. The primary
//! implementation, [`SqliteStore`], keeps a single `rusqlite::Connection`
//! behind a process-wide mutex, giving the single-writer/multi-reader
//! contract the sync pipeline relies on.

mod error;
mod sqlite;
mod store;

pub use error::{Result, StorageError};
pub use sqlite::SqliteStore;
pub use store::{
    ConflictRecord, ImportOptions, ImportSummary, IntegrityIssue, IssueFilter, IssueStore,
};
