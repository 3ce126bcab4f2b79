// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Wire-level request/response envelopes shared by the Unix socket and HTTP
//! transports. Both carry the same operation name plus JSON-encoded
//! arguments; neither transport interprets the operation itself, that's the
//! dispatcher's job.

use serde::{Deserialize, Serialize};
use std::time::Duration;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Request {
    pub op: String,
    #[serde(default = "serde_json::Value::default")]
    pub args: serde_json::Value,
    /// Milliseconds the caller is willing to wait; the dispatcher derives a
    /// deadline from this and aborts the operation past it.
    #[serde(default)]
    pub deadline_ms: Option<u64>,
}

impl Request {
    pub fn new(op: impl Into<String>, args: serde_json::Value) -> Self {
        Self {
            op: op.into(),
            args,
            deadline_ms: None,
        }
    }

    pub fn deadline(&self) -> Option<Duration> {
        self.deadline_ms.map(Duration::from_millis)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Response {
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub payload: Option<serde_json::Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    /// Coarse error family (see `DaemonError::family`), present only on
    /// failure; lets callers branch without string-matching the message.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_family: Option<String>,
}

impl Response {
    pub fn ok(payload: serde_json::Value) -> Self {
        Self {
            success: true,
            payload: Some(payload),
            error: None,
            error_family: None,
        }
    }

    pub fn err(err: &crate::error::DaemonError) -> Self {
        Self {
            success: false,
            payload: None,
            error: Some(err.to_string()),
            error_family: Some(err.family().to_string()),
        }
    }
}

#[cfg(test)]
#[path = "protocol_tests.rs"]
mod tests;
