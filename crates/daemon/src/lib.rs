// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The beads daemon core: workspace locking, event fan-out, the export /
//! import / merge sync pipeline, cross-workspace prefix routing, and the
//! wire protocol shared by the Unix socket and HTTP transports.
//!
//! This crate is a library; `beadsd` (`src/main.rs`) is a thin binary
//! wrapper that wires [`runtime::Daemon`] to a tokio runtime and the OS
//! signal handlers.

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

pub mod backoff;
pub mod config;
pub mod dispatcher;
pub mod env;
pub mod error;
pub mod event_bus;
pub mod http;
pub mod ipc;
pub mod lock;
pub mod protocol;
pub mod router;
pub mod runtime;
pub mod sync;
pub mod watcher;
pub mod wire;

pub use backoff::BackoffManager;
pub use config::{Config, ConfigFile, ResolutionStrategy};
pub use dispatcher::Dispatcher;
pub use error::{DaemonError, Result};
pub use event_bus::{EventBus, Subscription};
pub use lock::{LockHolder, WorkspaceLock};
pub use protocol::{Request, Response};
pub use router::{RouteOutcome, Router, SiblingHandle, SiblingKind};
pub use runtime::Daemon;
