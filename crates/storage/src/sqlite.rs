// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! SQLite-backed [`IssueStore`].
//!
//! A single connection behind a process-wide mutex gives us the
//! single-writer/multi-reader discipline the storage abstraction demands
//! without reaching for a connection pool this workload doesn't need — one
//! daemon process serves exactly one workspace.

use crate::error::{Result, StorageError};
use crate::store::{
    ConflictRecord, ImportOptions, ImportSummary, IntegrityIssue, IssueFilter, IssueStore,
};
use bd_core::{Comment, Dependency, DependencyKind, Issue, IssueId, IssueStatus, Priority};
use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use rusqlite::{params, Connection, OptionalExtension};
use std::path::Path;

const SCHEMA: &str = r#"
CREATE TABLE IF NOT EXISTS issues (
    id              TEXT PRIMARY KEY,
    title           TEXT NOT NULL,
    description     TEXT NOT NULL DEFAULT '',
    metadata        TEXT NOT NULL DEFAULT '{}',
    status          TEXT NOT NULL,
    priority        TEXT NOT NULL,
    issue_type      TEXT,
    assignee        TEXT,
    labels          TEXT NOT NULL DEFAULT '[]',
    ephemeral       INTEGER NOT NULL DEFAULT 0,
    created_at      TEXT NOT NULL,
    updated_at      TEXT NOT NULL,
    closed_at       TEXT,
    deleted_at      TEXT,
    content_hash    TEXT NOT NULL DEFAULT '',
    unknown_fields  TEXT NOT NULL DEFAULT '{}'
);

CREATE TABLE IF NOT EXISTS comments (
    issue_id    TEXT NOT NULL,
    seq         INTEGER NOT NULL,
    author      TEXT NOT NULL,
    body        TEXT NOT NULL,
    created_at  TEXT NOT NULL,
    PRIMARY KEY (issue_id, seq)
);

CREATE TABLE IF NOT EXISTS dependencies (
    issue_id    TEXT NOT NULL,
    target      TEXT NOT NULL,
    kind        TEXT NOT NULL,
    PRIMARY KEY (issue_id, target, kind)
);

CREATE TABLE IF NOT EXISTS export_hashes (
    issue_id    TEXT PRIMARY KEY,
    hash        TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS metadata (
    key     TEXT PRIMARY KEY,
    value   TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS conflicts (
    issue_id        TEXT PRIMARY KEY,
    field           TEXT NOT NULL,
    base_value      TEXT,
    local_value     TEXT NOT NULL,
    remote_value    TEXT NOT NULL,
    detected_at     TEXT NOT NULL,
    resolved        INTEGER NOT NULL DEFAULT 0
);
"#;

const REPO_ID_KEY: &str = "repo_id";

pub struct SqliteStore {
    conn: Mutex<Connection>,
}

impl SqliteStore {
    pub fn open(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let conn = Connection::open(path)?;
        conn.execute_batch(SCHEMA)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        conn.execute_batch(SCHEMA)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// Open read-only, for the router's sibling-workspace fallback when no
    /// daemon owns the target DB.
    pub fn open_read_only(path: &Path) -> Result<Self> {
        let conn = Connection::open_with_flags(
            path,
            rusqlite::OpenFlags::SQLITE_OPEN_READ_ONLY | rusqlite::OpenFlags::SQLITE_OPEN_NO_MUTEX,
        )?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    fn load_comments(conn: &Connection, issue_id: &str) -> Result<Vec<Comment>> {
        let mut stmt = conn
            .prepare("SELECT author, body, created_at FROM comments WHERE issue_id = ?1 ORDER BY seq")?;
        let rows = stmt
            .query_map(params![issue_id], |row| {
                let created_at: String = row.get(2)?;
                Ok(Comment {
                    author: row.get(0)?,
                    body: row.get(1)?,
                    created_at: parse_dt(&created_at),
                })
            })?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
    }

    fn load_dependencies(conn: &Connection, issue_id: &str) -> Result<Vec<Dependency>> {
        let mut stmt =
            conn.prepare("SELECT target, kind FROM dependencies WHERE issue_id = ?1 ORDER BY target")?;
        let rows = stmt
            .query_map(params![issue_id], |row| {
                let kind: String = row.get(1)?;
                Ok(Dependency {
                    target: row.get(0)?,
                    kind: parse_kind(&kind),
                })
            })?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
    }

    fn row_to_issue(conn: &Connection, row: &rusqlite::Row) -> rusqlite::Result<Issue> {
        let id: String = row.get("id")?;
        let metadata_json: String = row.get("metadata")?;
        let labels_json: String = row.get("labels")?;
        let unknown_json: String = row.get("unknown_fields")?;
        let status: String = row.get("status")?;
        let priority: String = row.get("priority")?;
        let created_at: String = row.get("created_at")?;
        let updated_at: String = row.get("updated_at")?;
        let closed_at: Option<String> = row.get("closed_at")?;
        let deleted_at: Option<String> = row.get("deleted_at")?;

        let comments = Self::load_comments(conn, &id).unwrap_or_default();
        let dependencies = Self::load_dependencies(conn, &id).unwrap_or_default();

        Ok(Issue {
            id: IssueId::new(id),
            title: row.get("title")?,
            description: row.get("description")?,
            metadata: serde_json::from_str(&metadata_json).unwrap_or_default(),
            status: parse_status(&status),
            priority: parse_priority(&priority),
            issue_type: row.get("issue_type")?,
            assignee: row.get("assignee")?,
            labels: serde_json::from_str(&labels_json).unwrap_or_default(),
            comments,
            dependencies,
            ephemeral: row.get::<_, i64>("ephemeral")? != 0,
            created_at: parse_dt(&created_at),
            updated_at: parse_dt(&updated_at),
            closed_at: closed_at.as_deref().map(parse_dt),
            deleted_at: deleted_at.as_deref().map(parse_dt),
            content_hash: row.get("content_hash")?,
            unknown_fields: serde_json::from_str(&unknown_json).unwrap_or_default(),
        })
    }

    fn upsert(conn: &Connection, issue: &Issue) -> Result<()> {
        conn.execute(
            "INSERT INTO issues (
                id, title, description, metadata, status, priority, issue_type, assignee,
                labels, ephemeral, created_at, updated_at, closed_at, deleted_at, content_hash,
                unknown_fields
            ) VALUES (?1,?2,?3,?4,?5,?6,?7,?8,?9,?10,?11,?12,?13,?14,?15,?16)
            ON CONFLICT(id) DO UPDATE SET
                title=excluded.title, description=excluded.description, metadata=excluded.metadata,
                status=excluded.status, priority=excluded.priority, issue_type=excluded.issue_type,
                assignee=excluded.assignee, labels=excluded.labels, ephemeral=excluded.ephemeral,
                created_at=excluded.created_at, updated_at=excluded.updated_at,
                closed_at=excluded.closed_at, deleted_at=excluded.deleted_at,
                content_hash=excluded.content_hash, unknown_fields=excluded.unknown_fields",
            params![
                issue.id.as_str(),
                issue.title,
                issue.description,
                serde_json::to_string(&issue.metadata)?,
                issue.status.to_string(),
                priority_str(issue.priority),
                issue.issue_type,
                issue.assignee,
                serde_json::to_string(&issue.labels)?,
                issue.ephemeral as i64,
                fmt_dt(issue.created_at),
                fmt_dt(issue.updated_at),
                issue.closed_at.map(fmt_dt),
                issue.deleted_at.map(fmt_dt),
                issue.content_hash,
                serde_json::to_string(&issue.unknown_fields)?,
            ],
        )?;

        conn.execute("DELETE FROM comments WHERE issue_id = ?1", params![issue.id.as_str()])?;
        for (seq, c) in issue.comments.iter().enumerate() {
            conn.execute(
                "INSERT INTO comments (issue_id, seq, author, body, created_at) VALUES (?1,?2,?3,?4,?5)",
                params![issue.id.as_str(), seq as i64, c.author, c.body, fmt_dt(c.created_at)],
            )?;
        }

        conn.execute("DELETE FROM dependencies WHERE issue_id = ?1", params![issue.id.as_str()])?;
        for d in &issue.dependencies {
            conn.execute(
                "INSERT OR IGNORE INTO dependencies (issue_id, target, kind) VALUES (?1,?2,?3)",
                params![issue.id.as_str(), d.target, kind_str(d.kind)],
            )?;
        }

        Ok(())
    }
}

impl IssueStore for SqliteStore {
    fn get(&self, id: &str) -> Result<Option<Issue>> {
        let conn = self.conn.lock();
        let exact: Option<Issue> = conn
            .query_row("SELECT * FROM issues WHERE id = ?1", params![id], |row| {
                Self::row_to_issue(&conn, row)
            })
            .optional()?;
        if exact.is_some() {
            return Ok(exact);
        }

        let mut stmt = conn.prepare("SELECT id FROM issues WHERE id LIKE ?1 || '%'")?;
        let matches: Vec<String> = stmt
            .query_map(params![id], |row| row.get(0))?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        match matches.len() {
            0 => Ok(None),
            1 => conn
                .query_row(
                    "SELECT * FROM issues WHERE id = ?1",
                    params![matches[0]],
                    |row| Self::row_to_issue(&conn, row),
                )
                .optional()
                .map_err(StorageError::from),
            count => Err(StorageError::AmbiguousPrefix {
                prefix: id.to_string(),
                count,
            }),
        }
    }

    fn search(&self, filter: &IssueFilter) -> Result<Vec<Issue>> {
        let conn = self.conn.lock();
        let mut sql = String::from("SELECT * FROM issues WHERE 1=1");
        let mut bound: Vec<String> = Vec::new();
        if !filter.include_tombstones {
            sql.push_str(" AND status != 'tombstone'");
        }
        if let Some(status) = filter.status {
            bound.push(status.to_string());
            sql.push_str(&format!(" AND status = ?{}", bound.len()));
        }
        if let Some(assignee) = &filter.assignee {
            bound.push(assignee.clone());
            sql.push_str(&format!(" AND assignee = ?{}", bound.len()));
        }
        sql.push_str(" ORDER BY id");

        let mut stmt = conn.prepare(&sql)?;
        let issues = stmt
            .query_map(rusqlite::params_from_iter(bound.iter()), |row| {
                Self::row_to_issue(&conn, row)
            })?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(issues)
    }

    fn list_dependencies(&self, id: &str) -> Result<Vec<Dependency>> {
        let conn = self.conn.lock();
        Self::load_dependencies(&conn, id)
    }

    fn get_metadata(&self, key: &str) -> Result<Option<String>> {
        let conn = self.conn.lock();
        conn.query_row("SELECT value FROM metadata WHERE key = ?1", params![key], |row| {
            row.get(0)
        })
        .optional()
        .map_err(StorageError::from)
    }

    fn is_empty(&self) -> Result<bool> {
        let conn = self.conn.lock();
        let count: i64 = conn.query_row("SELECT COUNT(*) FROM issues", [], |row| row.get(0))?;
        Ok(count == 0)
    }

    fn create(&self, issue: Issue) -> Result<()> {
        let conn = self.conn.lock();
        let exists: Option<i64> = conn
            .query_row("SELECT 1 FROM issues WHERE id = ?1", params![issue.id.as_str()], |row| {
                row.get(0)
            })
            .optional()?;
        if exists.is_some() {
            return Err(StorageError::AlreadyExists(issue.id.as_str().to_string()));
        }
        Self::upsert(&conn, &issue)
    }

    fn update(&self, issue: Issue) -> Result<()> {
        let conn = self.conn.lock();
        Self::upsert(&conn, &issue)
    }

    fn close(&self, id: &str, closed_at: DateTime<Utc>) -> Result<()> {
        let conn = self.conn.lock();
        let changed = conn.execute(
            "UPDATE issues SET status = 'closed', closed_at = ?2, updated_at = ?2 WHERE id = ?1",
            params![id, fmt_dt(closed_at)],
        )?;
        if changed == 0 {
            return Err(StorageError::NotFound(id.to_string()));
        }
        Ok(())
    }

    fn delete(&self, id: &str, deleted_at: DateTime<Utc>) -> Result<()> {
        let conn = self.conn.lock();
        let changed = conn.execute(
            "UPDATE issues SET status = 'tombstone', deleted_at = ?2, updated_at = ?2 WHERE id = ?1",
            params![id, fmt_dt(deleted_at)],
        )?;
        if changed == 0 {
            return Err(StorageError::NotFound(id.to_string()));
        }
        Ok(())
    }

    fn undelete(&self, id: &str) -> Result<()> {
        let conn = self.conn.lock();
        let changed = conn.execute(
            "UPDATE issues SET status = 'open', deleted_at = NULL, updated_at = ?2
             WHERE id = ?1 AND status = 'tombstone'",
            params![id, fmt_dt(Utc::now())],
        )?;
        if changed == 0 {
            return Err(StorageError::NotFound(id.to_string()));
        }
        Ok(())
    }

    fn add_dependency(&self, from: &str, dep: Dependency) -> Result<()> {
        let conn = self.conn.lock();
        conn.execute(
            "INSERT OR IGNORE INTO dependencies (issue_id, target, kind) VALUES (?1,?2,?3)",
            params![from, dep.target, kind_str(dep.kind)],
        )?;
        Ok(())
    }

    fn remove_dependency(&self, from: &str, target: &str) -> Result<()> {
        let conn = self.conn.lock();
        conn.execute(
            "DELETE FROM dependencies WHERE issue_id = ?1 AND target = ?2",
            params![from, target],
        )?;
        Ok(())
    }

    fn add_comment(&self, id: &str, comment: Comment) -> Result<()> {
        let conn = self.conn.lock();
        let exists: Option<i64> = conn
            .query_row("SELECT 1 FROM issues WHERE id = ?1", params![id], |row| row.get(0))
            .optional()?;
        if exists.is_none() {
            return Err(StorageError::NotFound(id.to_string()));
        }
        let next_seq: i64 = conn.query_row(
            "SELECT COALESCE(MAX(seq) + 1, 0) FROM comments WHERE issue_id = ?1",
            params![id],
            |row| row.get(0),
        )?;
        conn.execute(
            "INSERT INTO comments (issue_id, seq, author, body, created_at) VALUES (?1,?2,?3,?4,?5)",
            params![id, next_seq, comment.author, comment.body, fmt_dt(comment.created_at)],
        )?;
        Ok(())
    }

    fn set_metadata(&self, key: &str, value: &str) -> Result<()> {
        let conn = self.conn.lock();
        conn.execute(
            "INSERT INTO metadata (key, value) VALUES (?1, ?2)
             ON CONFLICT(key) DO UPDATE SET value = excluded.value",
            params![key, value],
        )?;
        Ok(())
    }

    fn export_all(&self) -> Result<Vec<Issue>> {
        let conn = self.conn.lock();
        let mut stmt = conn.prepare("SELECT * FROM issues ORDER BY id")?;
        let issues = stmt
            .query_map([], |row| Self::row_to_issue(&conn, row))?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(issues)
    }

    fn import_batch(&self, issues: Vec<Issue>, opts: &ImportOptions) -> Result<ImportSummary> {
        let mut summary = ImportSummary::default();
        let conn = self.conn.lock();
        let tx = if opts.dry_run {
            None
        } else {
            Some(conn.unchecked_transaction()?)
        };

        for mut issue in issues {
            if let Some(prefix) = &opts.validate_prefix {
                if !issue.id.as_str().starts_with(prefix.as_str()) {
                    summary
                        .errors
                        .push(format!("{} does not match prefix {prefix}", issue.id));
                    if opts.strict {
                        return Err(StorageError::ImportSanity {
                            reason: format!("{} outside prefix {prefix}", issue.id),
                        });
                    }
                    continue;
                }
            }

            let existing: Option<String> = conn
                .query_row(
                    "SELECT content_hash FROM issues WHERE id = ?1",
                    params![issue.id.as_str()],
                    |row| row.get(0),
                )
                .optional()?;

            if issue.content_hash.is_empty() {
                issue.recompute_hash();
            }

            if opts.skip_unchanged {
                if let Some(existing_hash) = &existing {
                    if existing_hash == &issue.content_hash {
                        summary.skipped += 1;
                        continue;
                    }
                }
            }

            if issue.status.is_tombstone() {
                summary.tombstoned += 1;
            }

            if !opts.dry_run {
                Self::upsert(&conn, &issue)?;
            }

            if existing.is_some() {
                summary.updated += 1;
            } else {
                summary.created += 1;
            }
        }

        if let Some(tx) = tx {
            tx.commit()?;
        }

        Ok(summary)
    }

    fn set_export_hash(&self, issue_id: &str, hash: &str) -> Result<()> {
        let conn = self.conn.lock();
        conn.execute(
            "INSERT INTO export_hashes (issue_id, hash) VALUES (?1, ?2)
             ON CONFLICT(issue_id) DO UPDATE SET hash = excluded.hash",
            params![issue_id, hash],
        )?;
        Ok(())
    }

    fn get_export_hash(&self, issue_id: &str) -> Result<Option<String>> {
        let conn = self.conn.lock();
        conn.query_row(
            "SELECT hash FROM export_hashes WHERE issue_id = ?1",
            params![issue_id],
            |row| row.get(0),
        )
        .optional()
        .map_err(StorageError::from)
    }

    fn get_repo_id(&self) -> Result<Option<String>> {
        self.get_metadata(REPO_ID_KEY)
    }

    fn set_repo_id(&self, fingerprint: &str) -> Result<()> {
        self.set_metadata(REPO_ID_KEY, fingerprint)
    }

    fn record_conflict(&self, conflict: ConflictRecord) -> Result<()> {
        let conn = self.conn.lock();
        conn.execute(
            "INSERT INTO conflicts (issue_id, field, base_value, local_value, remote_value, detected_at, resolved)
             VALUES (?1,?2,?3,?4,?5,?6,?7)
             ON CONFLICT(issue_id) DO UPDATE SET
                field=excluded.field, base_value=excluded.base_value, local_value=excluded.local_value,
                remote_value=excluded.remote_value, detected_at=excluded.detected_at, resolved=0",
            params![
                conflict.issue_id,
                conflict.field,
                conflict.base_value.as_ref().map(serde_json::to_string).transpose()?,
                serde_json::to_string(&conflict.local_value)?,
                serde_json::to_string(&conflict.remote_value)?,
                fmt_dt(conflict.detected_at),
                conflict.resolved as i64,
            ],
        )?;
        Ok(())
    }

    fn list_conflicts(&self) -> Result<Vec<ConflictRecord>> {
        let conn = self.conn.lock();
        let mut stmt = conn.prepare(
            "SELECT issue_id, field, base_value, local_value, remote_value, detected_at, resolved
             FROM conflicts WHERE resolved = 0 ORDER BY detected_at",
        )?;
        let rows = stmt
            .query_map([], |row| {
                let base_value: Option<String> = row.get(2)?;
                let local_value: String = row.get(3)?;
                let remote_value: String = row.get(4)?;
                let detected_at: String = row.get(5)?;
                Ok((base_value, local_value, remote_value, detected_at, row.get::<_, i64>(6)?, row.get::<_, String>(0)?, row.get::<_, String>(1)?))
            })?
            .collect::<rusqlite::Result<Vec<_>>>()?;

        rows.into_iter()
            .map(|(base_value, local_value, remote_value, detected_at, resolved, issue_id, field)| {
                Ok(ConflictRecord {
                    issue_id,
                    field,
                    base_value: base_value.map(|s| serde_json::from_str(&s)).transpose()?,
                    local_value: serde_json::from_str(&local_value)?,
                    remote_value: serde_json::from_str(&remote_value)?,
                    detected_at: parse_dt(&detected_at),
                    resolved: resolved != 0,
                })
            })
            .collect()
    }

    fn resolve_conflict(&self, issue_id: &str) -> Result<()> {
        let conn = self.conn.lock();
        conn.execute(
            "UPDATE conflicts SET resolved = 1 WHERE issue_id = ?1",
            params![issue_id],
        )?;
        Ok(())
    }

    fn integrity_check(&self) -> Result<Vec<IntegrityIssue>> {
        let conn = self.conn.lock();
        let mut problems = Vec::new();

        let mut dup_stmt = conn.prepare("SELECT id, COUNT(*) c FROM issues GROUP BY id HAVING c > 1")?;
        let dups = dup_stmt
            .query_map([], |row| row.get::<_, String>(0))?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        problems.extend(dups.into_iter().map(IntegrityIssue::DuplicateId));

        let mut orphan_stmt = conn.prepare(
            "SELECT d.issue_id, d.target FROM dependencies d
             WHERE d.target NOT LIKE 'external:%'
             AND NOT EXISTS (SELECT 1 FROM issues i WHERE i.id = d.target)",
        )?;
        let orphans = orphan_stmt
            .query_map([], |row| Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?)))?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        problems.extend(
            orphans
                .into_iter()
                .map(|(from, to)| IntegrityIssue::OrphanDependency { from, to }),
        );

        Ok(problems)
    }
}

fn fmt_dt(dt: DateTime<Utc>) -> String {
    dt.to_rfc3339_opts(chrono::SecondsFormat::Nanos, true)
}

fn parse_dt(s: &str) -> DateTime<Utc> {
    DateTime::parse_from_rfc3339(s)
        .map(|dt| dt.with_timezone(&Utc))
        .unwrap_or_else(|_| Utc::now())
}

fn parse_status(s: &str) -> IssueStatus {
    match s {
        "open" => IssueStatus::Open,
        "in_progress" => IssueStatus::InProgress,
        "blocked" => IssueStatus::Blocked,
        "closed" => IssueStatus::Closed,
        "deferred" => IssueStatus::Deferred,
        "pinned" => IssueStatus::Pinned,
        _ => IssueStatus::Tombstone,
    }
}

fn parse_priority(s: &str) -> Priority {
    match s {
        "critical" => Priority::Critical,
        "high" => Priority::High,
        "low" => Priority::Low,
        _ => Priority::Medium,
    }
}

fn priority_str(p: Priority) -> &'static str {
    match p {
        Priority::Critical => "critical",
        Priority::High => "high",
        Priority::Medium => "medium",
        Priority::Low => "low",
    }
}

fn kind_str(k: DependencyKind) -> &'static str {
    match k {
        DependencyKind::Blocks => "blocks",
        DependencyKind::Related => "related",
        DependencyKind::ParentChild => "parent_child",
        DependencyKind::DiscoveredFrom => "discovered_from",
    }
}

fn parse_kind(s: &str) -> DependencyKind {
    match s {
        "related" => DependencyKind::Related,
        "parent_child" => DependencyKind::ParentChild,
        "discovered_from" => DependencyKind::DiscoveredFrom,
        _ => DependencyKind::Blocks,
    }
}

#[cfg(test)]
#[path = "sqlite_tests.rs"]
mod tests;
