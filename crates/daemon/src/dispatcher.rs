// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Maps an RPC operation name to a storage or sync call.
//!
//! Dispatch is synchronous: every operation it performs is either a local
//! SQLite call or an in-process bus publish, none of which ever await. The
//! transports (`ipc`, `http`) stay async and call into this from a blocking
//! context when they need to.

use std::path::PathBuf;
use std::sync::Arc;

use bd_core::{Comment, Dependency, Event, Issue, SystemClock};
use bd_storage::{IssueFilter, IssueStore};
use parking_lot::Mutex;
use serde::Deserialize;
use serde_json::json;

use crate::backoff::BackoffManager;
use crate::config::{Config, ResolutionStrategy};
use crate::error::{DaemonError, Result};
use crate::event_bus::EventBus;
use crate::protocol::{Request, Response};
use crate::sync;

/// Everything one dispatched request needs: storage, the bus to publish
/// mutation events on, and the sync pipeline's own state (backoff, the
/// JSONL path it projects to).
pub struct Dispatcher {
    store: Arc<dyn IssueStore>,
    bus: EventBus,
    backoff: Mutex<BackoffManager<SystemClock>>,
    config: Config,
    jsonl_path: PathBuf,
    repo_id: Option<String>,
}

impl Dispatcher {
    pub fn new(store: Arc<dyn IssueStore>, bus: EventBus, config: Config, jsonl_path: PathBuf, repo_id: Option<String>) -> Self {
        let backoff = BackoffManager::new(SystemClock, config.backoff_ceiling);
        Self {
            store,
            bus,
            backoff: Mutex::new(backoff),
            config,
            jsonl_path,
            repo_id,
        }
    }

    /// Dispatch a single request, wrapping any error into the response
    /// envelope rather than propagating it -- the IPC/HTTP transports never
    /// see a `DaemonError` directly.
    pub fn dispatch(&self, req: &Request) -> Response {
        match self.dispatch_inner(req) {
            Ok(payload) => Response::ok(payload),
            Err(err) => Response::err(&err),
        }
    }

    fn dispatch_inner(&self, req: &Request) -> Result<serde_json::Value> {
        match req.op.as_str() {
            "get" => self.op_get(&req.args),
            "search" => self.op_search(&req.args),
            "create" => self.op_create(&req.args),
            "update" => self.op_update(&req.args),
            "close" => self.op_close(&req.args),
            "delete" => self.op_delete(&req.args),
            "undelete" => self.op_undelete(&req.args),
            "add_dependency" => self.op_add_dependency(&req.args),
            "remove_dependency" => self.op_remove_dependency(&req.args),
            "add_comment" => self.op_add_comment(&req.args),
            "set_metadata" => self.op_set_metadata(&req.args),
            "list_conflicts" => self.op_list_conflicts(),
            "resolve_conflict" => self.op_resolve_conflict(&req.args),
            "integrity_check" => self.op_integrity_check(),
            "export" => self.op_export(),
            "import" => self.op_import(),
            "sync" => self.op_sync(&req.args),
            "status" => self.op_status(),
            "migrate_fingerprint" => self.op_migrate_fingerprint(&req.args),
            other => Err(DaemonError::UnknownOperation(other.to_string())),
        }
    }

    fn op_get(&self, args: &serde_json::Value) -> Result<serde_json::Value> {
        get_args(args, self.store.as_ref())
    }

    fn op_search(&self, args: &serde_json::Value) -> Result<serde_json::Value> {
        search_args(args, self.store.as_ref())
    }

    fn op_create(&self, args: &serde_json::Value) -> Result<serde_json::Value> {
        let mut issue: Issue = serde_json::from_value(args.clone())?;
        let now = chrono::Utc::now();
        issue.normalize(now);
        issue.recompute_hash();
        self.store.create(issue.clone())?;
        self.bus.publish(Event::Created {
            issue_id: issue.id.clone(),
            actor: self.config.actor.clone(),
        });
        Ok(json!(issue))
    }

    fn op_update(&self, args: &serde_json::Value) -> Result<serde_json::Value> {
        let mut issue: Issue = serde_json::from_value(args.clone())?;
        issue.normalize(chrono::Utc::now());
        issue.recompute_hash();
        self.store.update(issue.clone())?;
        self.bus.publish(Event::Updated {
            issue_id: issue.id.clone(),
            actor: self.config.actor.clone(),
            changed_fields: Vec::new(),
        });
        Ok(json!(issue))
    }

    fn op_close(&self, args: &serde_json::Value) -> Result<serde_json::Value> {
        #[derive(Deserialize)]
        struct Args {
            id: String,
        }
        let args: Args = serde_json::from_value(args.clone())?;
        let now = chrono::Utc::now();
        self.store.close(&args.id, now)?;
        self.bus.publish(Event::StatusChanged {
            issue_id: bd_core::IssueId::new(args.id),
            actor: self.config.actor.clone(),
            from: bd_core::IssueStatus::Open,
            to: bd_core::IssueStatus::Closed,
        });
        Ok(json!({"closed_at": now}))
    }

    fn op_delete(&self, args: &serde_json::Value) -> Result<serde_json::Value> {
        #[derive(Deserialize)]
        struct Args {
            id: String,
        }
        let args: Args = serde_json::from_value(args.clone())?;
        let now = chrono::Utc::now();
        self.store.delete(&args.id, now)?;
        self.bus.publish(Event::Deleted {
            issue_id: bd_core::IssueId::new(args.id),
            actor: self.config.actor.clone(),
        });
        Ok(json!({"deleted_at": now}))
    }

    fn op_undelete(&self, args: &serde_json::Value) -> Result<serde_json::Value> {
        #[derive(Deserialize)]
        struct Args {
            id: String,
        }
        let args: Args = serde_json::from_value(args.clone())?;
        self.store.undelete(&args.id)?;
        self.bus.publish(Event::Undeleted {
            issue_id: bd_core::IssueId::new(args.id),
            actor: self.config.actor.clone(),
        });
        Ok(json!({}))
    }

    fn op_add_dependency(&self, args: &serde_json::Value) -> Result<serde_json::Value> {
        #[derive(Deserialize)]
        struct Args {
            from: String,
            dependency: Dependency,
        }
        let args: Args = serde_json::from_value(args.clone())?;
        self.store.add_dependency(&args.from, args.dependency.clone())?;
        self.bus.publish(Event::DependencyAdded {
            issue_id: bd_core::IssueId::new(args.from),
            actor: self.config.actor.clone(),
            target: args.dependency.target,
        });
        Ok(json!({}))
    }

    fn op_remove_dependency(&self, args: &serde_json::Value) -> Result<serde_json::Value> {
        #[derive(Deserialize)]
        struct Args {
            from: String,
            target: String,
        }
        let args: Args = serde_json::from_value(args.clone())?;
        self.store.remove_dependency(&args.from, &args.target)?;
        self.bus.publish(Event::DependencyRemoved {
            issue_id: bd_core::IssueId::new(args.from),
            actor: self.config.actor.clone(),
            target: args.target,
        });
        Ok(json!({}))
    }

    fn op_add_comment(&self, args: &serde_json::Value) -> Result<serde_json::Value> {
        #[derive(Deserialize)]
        struct Args {
            id: String,
            comment: Comment,
        }
        let args: Args = serde_json::from_value(args.clone())?;
        self.store.add_comment(&args.id, args.comment)?;
        self.bus.publish(Event::Commented {
            issue_id: bd_core::IssueId::new(args.id),
            actor: self.config.actor.clone(),
        });
        Ok(json!({}))
    }

    fn op_set_metadata(&self, args: &serde_json::Value) -> Result<serde_json::Value> {
        #[derive(Deserialize)]
        struct Args {
            key: String,
            value: String,
        }
        let args: Args = serde_json::from_value(args.clone())?;
        self.store.set_metadata(&args.key, &args.value)?;
        Ok(json!({}))
    }

    fn op_list_conflicts(&self) -> Result<serde_json::Value> {
        Ok(json!(self.store.list_conflicts()?))
    }

    fn op_resolve_conflict(&self, args: &serde_json::Value) -> Result<serde_json::Value> {
        #[derive(Deserialize)]
        struct Args {
            id: String,
        }
        let args: Args = serde_json::from_value(args.clone())?;
        self.store.resolve_conflict(&args.id)?;
        Ok(json!({}))
    }

    fn op_integrity_check(&self) -> Result<serde_json::Value> {
        Ok(json!(self.store.integrity_check()?))
    }

    fn op_export(&self) -> Result<serde_json::Value> {
        let mut backoff = self.backoff.lock();
        let summary = sync::run_export(
            self.store.as_ref(),
            &self.jsonl_path,
            self.repo_id.as_deref(),
            &mut backoff,
            &self.bus,
        )?;
        Ok(json!(summary))
    }

    fn op_import(&self) -> Result<serde_json::Value> {
        let mut backoff = self.backoff.lock();
        let report = sync::run_import(self.store.as_ref(), &self.jsonl_path, &mut backoff, &self.bus)?;
        Ok(json!(report))
    }

    fn op_sync(&self, args: &serde_json::Value) -> Result<serde_json::Value> {
        #[derive(Deserialize, Default)]
        struct Args {
            strategy: Option<ResolutionStrategy>,
        }
        let args: Args = if args.is_null() {
            Args::default()
        } else {
            serde_json::from_value(args.clone())?
        };
        let strategy = args.strategy.unwrap_or(self.config.resolution_strategy);
        let mut backoff = self.backoff.lock();
        let report = sync::run_sync(
            self.store.as_ref(),
            &self.jsonl_path,
            self.repo_id.as_deref(),
            strategy,
            &mut backoff,
            &self.bus,
            || Ok(()),
        )?;
        Ok(json!(report))
    }

    fn op_status(&self) -> Result<serde_json::Value> {
        let conflicts = self.store.list_conflicts()?;
        Ok(json!({
            "repo_id": self.store.get_repo_id()?,
            "open_conflicts": conflicts.iter().filter(|c| !c.resolved).count(),
            "subscribers": self.bus.subscriber_count(),
        }))
    }

    /// Explicitly binds a fingerprint to a legacy database that predates
    /// `repo_id`. Never invoked implicitly -- a missing fingerprint on a
    /// non-empty database is a hard refusal at startup, and this is the
    /// only sanctioned way out of it, since a silent auto-bind would let a
    /// database quietly rebind itself to the wrong repository.
    fn op_migrate_fingerprint(&self, args: &serde_json::Value) -> Result<serde_json::Value> {
        #[derive(Deserialize)]
        struct Args {
            fingerprint: String,
            #[serde(default)]
            confirm: bool,
        }
        let args: Args = serde_json::from_value(args.clone())?;
        if !args.confirm {
            return Err(DaemonError::InvalidInput(
                "migrate_fingerprint requires confirm=true".to_string(),
            ));
        }
        if let Some(existing) = self.store.get_repo_id()? {
            return Err(DaemonError::PolicyViolation(format!(
                "database already has a fingerprint bound ({existing}); migrate_fingerprint only applies to unbound legacy databases"
            )));
        }
        self.store.set_repo_id(&args.fingerprint)?;
        Ok(json!({"repo_id": args.fingerprint}))
    }
}

/// The prefix component of an issue ID, used to decide whether a request
/// belongs to this workspace or must be routed to a sibling. Hierarchical
/// child IDs (`parent.index`) share their parent's prefix.
pub fn extract_prefix(id: &str) -> &str {
    let before_dot = id.split('.').next().unwrap_or(id);
    before_dot.split('-').next().unwrap_or(before_dot)
}

fn get_args(args: &serde_json::Value, store: &dyn IssueStore) -> Result<serde_json::Value> {
    #[derive(Deserialize)]
    struct Args {
        id: String,
    }
    let args: Args = serde_json::from_value(args.clone())?;
    let issue = store.get(&args.id)?;
    Ok(json!(issue))
}

fn search_args(args: &serde_json::Value, store: &dyn IssueStore) -> Result<serde_json::Value> {
    let filter: IssueFilter = if args.is_null() {
        IssueFilter::default()
    } else {
        #[derive(Deserialize, Default)]
        struct Args {
            status: Option<bd_core::IssueStatus>,
            assignee: Option<String>,
            #[serde(default)]
            include_tombstones: bool,
        }
        let a: Args = serde_json::from_value(args.clone())?;
        IssueFilter {
            status: a.status,
            assignee: a.assignee,
            include_tombstones: a.include_tombstones,
        }
    };
    let issues = store.search(&filter)?;
    Ok(json!(issues))
}

/// Answers a request directly against a sibling workspace's database,
/// opened read-only, for the router's case (c): a sibling is known but has
/// no live daemon. Only read operations are meaningful here -- a mutation
/// against a read-only handle would either fail at the SQLite layer or,
/// worse, silently diverge from what that workspace's own daemon would
/// have computed (event publication, export-hash bookkeeping). Anything
/// else is rejected as a policy violation rather than attempted.
pub fn dispatch_read_only(store: &dyn IssueStore, req: &Request) -> Response {
    let result = match req.op.as_str() {
        "get" => get_args(&req.args, store),
        "search" => search_args(&req.args, store),
        "list_conflicts" => Ok(json!(store.list_conflicts().unwrap_or_default())),
        "integrity_check" => Ok(json!(store.integrity_check().unwrap_or_default())),
        "status" => Ok(json!({"repo_id": store.get_repo_id().ok().flatten()})),
        other => Err(DaemonError::PolicyViolation(format!(
            "operation {other:?} is not permitted against a read-only sibling handle; the sibling's own daemon is not running"
        ))),
    };
    match result {
        Ok(payload) => Response::ok(payload),
        Err(err) => Response::err(&err),
    }
}

#[cfg(test)]
#[path = "dispatcher_tests.rs"]
mod tests;
