// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! `routes.jsonl` persistence: an append-only log of prefix-to-workspace
//! mappings. The in-memory view keeps only the last mapping per prefix;
//! re-routing a prefix is expressed by appending a new line rather than
//! rewriting history, so the file remains a legible audit trail.

use crate::error::Result;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Serialize, Deserialize)]
struct RouteLine {
    prefix: String,
    workspace: PathBuf,
}

pub struct RouteTable {
    path: PathBuf,
    routes: HashMap<String, PathBuf>,
}

impl RouteTable {
    pub fn load(path: PathBuf) -> Result<Self> {
        let mut routes = HashMap::new();
        if let Ok(contents) = fs::read_to_string(&path) {
            for line in contents.lines() {
                if line.trim().is_empty() {
                    continue;
                }
                match serde_json::from_str::<RouteLine>(line) {
                    Ok(entry) => {
                        routes.insert(entry.prefix, entry.workspace);
                    }
                    Err(err) => {
                        tracing::warn!(%err, "skipping unparseable routes.jsonl line");
                    }
                }
            }
        }
        Ok(Self { path, routes })
    }

    pub fn get(&self, prefix: &str) -> Option<PathBuf> {
        self.routes.get(prefix).cloned()
    }

    pub fn insert(&mut self, prefix: String, workspace: PathBuf) -> Result<()> {
        let line = RouteLine {
            prefix: prefix.clone(),
            workspace: workspace.clone(),
        };
        let mut json = serde_json::to_string(&line)?;
        json.push('\n');

        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }
        let mut file = OpenOptions::new().create(true).append(true).open(&self.path)?;
        file.write_all(json.as_bytes())?;

        self.routes.insert(prefix, workspace);
        Ok(())
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn len(&self) -> usize {
        self.routes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.routes.is_empty()
    }
}
