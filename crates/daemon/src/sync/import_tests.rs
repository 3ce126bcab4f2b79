use super::*;
use bd_storage::SqliteStore;

fn issue_line(id: &str, status: &str, extra: &str) -> String {
    format!(
        r#"{{"id":"{id}","title":"t","description":"","metadata":{{}},"status":"{status}","priority":"medium","labels":[],"comments":[],"dependencies":[],"created_at":"2026-01-01T00:00:00Z","updated_at":"2026-01-01T00:00:00Z","content_hash":""{extra}}}"#
    )
}

#[test]
fn imports_well_formed_lines() {
    let store = SqliteStore::open_in_memory().unwrap();
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("issues.jsonl");
    std::fs::write(&path, format!("{}\n{}\n", issue_line("a-1", "open", ""), issue_line("a-2", "open", ""))).unwrap();

    let report = import(&store, &path).unwrap();
    assert_eq!(report.summary.created, 2);
    assert_eq!(report.lines_skipped, 0);
    assert!(store.get("a-1").unwrap().is_some());
}

#[test]
fn skips_unparseable_lines_without_aborting() {
    let store = SqliteStore::open_in_memory().unwrap();
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("issues.jsonl");
    std::fs::write(&path, format!("not json\n{}\n", issue_line("a-1", "open", ""))).unwrap();

    let report = import(&store, &path).unwrap();
    assert_eq!(report.lines_skipped, 1);
    assert_eq!(report.summary.created, 1);
}

#[test]
fn missing_file_is_a_no_op() {
    let store = SqliteStore::open_in_memory().unwrap();
    let report = import(&store, std::path::Path::new("/nonexistent/issues.jsonl")).unwrap();
    assert_eq!(report.summary.created, 0);
    assert_eq!(report.lines_skipped, 0);
}

#[test]
fn legacy_deleted_status_becomes_tombstone() {
    let store = SqliteStore::open_in_memory().unwrap();
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("issues.jsonl");
    std::fs::write(&path, format!("{}\n", issue_line("a-1", "deleted", r#","deleted_at":"2026-01-02T00:00:00Z""#))).unwrap();

    import(&store, &path).unwrap();
    let issue = store.get("a-1").unwrap().unwrap();
    assert!(issue.status.is_tombstone());
    assert!(issue.deleted_at.is_some());
}

#[test]
fn deleted_at_without_tombstone_status_is_coerced() {
    let store = SqliteStore::open_in_memory().unwrap();
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("issues.jsonl");
    std::fs::write(&path, format!("{}\n", issue_line("a-1", "open", r#","deleted_at":"2026-01-02T00:00:00Z""#))).unwrap();

    import(&store, &path).unwrap();
    let issue = store.get("a-1").unwrap().unwrap();
    assert!(issue.status.is_tombstone());
}

#[test]
fn tombstone_missing_deleted_at_gets_current_time() {
    let store = SqliteStore::open_in_memory().unwrap();
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("issues.jsonl");
    std::fs::write(&path, format!("{}\n", issue_line("a-1", "tombstone", ""))).unwrap();

    import(&store, &path).unwrap();
    let issue = store.get("a-1").unwrap().unwrap();
    assert!(issue.deleted_at.is_some());
}

#[test]
fn closed_missing_closed_at_gets_current_time() {
    let store = SqliteStore::open_in_memory().unwrap();
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("issues.jsonl");
    std::fs::write(&path, format!("{}\n", issue_line("a-1", "closed", ""))).unwrap();

    import(&store, &path).unwrap();
    let issue = store.get("a-1").unwrap().unwrap();
    assert!(issue.closed_at.is_some());
}

#[test]
fn large_drop_in_living_issue_count_is_refused() {
    let store = SqliteStore::open_in_memory().unwrap();
    for i in 0..20 {
        let mut issue: Issue = serde_json::from_str(&issue_line(&format!("a-{i}"), "open", "")).unwrap();
        issue.recompute_hash();
        store.create(issue).unwrap();
    }

    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("issues.jsonl");
    // Everything but two issues arrives tombstoned -- a catastrophic drop
    // in living issues even though no row is ever physically removed.
    let mut lines = vec![issue_line("a-0", "open", ""), issue_line("a-1", "open", "")];
    for i in 2..20 {
        lines.push(issue_line(
            &format!("a-{i}"),
            "tombstone",
            r#","deleted_at":"2026-01-02T00:00:00Z""#,
        ));
    }
    std::fs::write(&path, lines.join("\n") + "\n").unwrap();

    let err = import(&store, &path).unwrap_err();
    assert!(matches!(err, DaemonError::System(_)));
}
