use super::*;
use bd_core::{Issue, IssueId, IssueStatus, Priority};
use bd_storage::SqliteStore;

fn new_issue(id: &str, title: &str) -> Issue {
    let now = chrono::Utc::now();
    let mut issue = Issue {
        id: IssueId::new(id.to_string()),
        title: title.to_string(),
        description: String::new(),
        metadata: Default::default(),
        status: IssueStatus::Open,
        priority: Priority::Medium,
        issue_type: None,
        assignee: None,
        labels: Vec::new(),
        comments: Vec::new(),
        dependencies: Vec::new(),
        ephemeral: false,
        created_at: now,
        updated_at: now,
        closed_at: None,
        deleted_at: None,
        content_hash: String::new(),
        unknown_fields: Default::default(),
    };
    issue.recompute_hash();
    issue
}

#[test]
fn writes_sorted_jsonl_and_records_export_hashes() {
    let store = SqliteStore::open_in_memory().unwrap();
    store.create(new_issue("b-1", "second")).unwrap();
    store.create(new_issue("a-1", "first")).unwrap();

    let dir = tempfile::tempdir().unwrap();
    let jsonl = dir.path().join("issues.jsonl");
    let summary = export(&store, &jsonl, None).unwrap();

    assert_eq!(summary.issue_count, 2);
    let contents = std::fs::read_to_string(&jsonl).unwrap();
    let lines: Vec<&str> = contents.lines().collect();
    assert!(lines[0].contains("\"a-1\""));
    assert!(lines[1].contains("\"b-1\""));
    assert!(store.get_export_hash("a-1").unwrap().is_some());
}

#[test]
fn exporting_twice_with_no_mutation_is_byte_identical() {
    let store = SqliteStore::open_in_memory().unwrap();
    store.create(new_issue("a-1", "hello")).unwrap();

    let dir = tempfile::tempdir().unwrap();
    let jsonl = dir.path().join("issues.jsonl");
    export(&store, &jsonl, None).unwrap();
    let first = std::fs::read_to_string(&jsonl).unwrap();
    export(&store, &jsonl, None).unwrap();
    let second = std::fs::read_to_string(&jsonl).unwrap();

    assert_eq!(first, second);
}

#[test]
fn empty_db_refuses_to_export_over_nonempty_jsonl() {
    let store = SqliteStore::open_in_memory().unwrap();
    let dir = tempfile::tempdir().unwrap();
    let jsonl = dir.path().join("issues.jsonl");
    std::fs::write(&jsonl, "{\"id\":\"a-1\"}\n").unwrap();

    let err = export(&store, &jsonl, None).unwrap_err();
    assert!(matches!(err, DaemonError::PolicyViolation(_)));
}

#[test]
fn empty_db_over_empty_jsonl_is_allowed() {
    let store = SqliteStore::open_in_memory().unwrap();
    let dir = tempfile::tempdir().unwrap();
    let jsonl = dir.path().join("issues.jsonl");

    let summary = export(&store, &jsonl, None).unwrap();
    assert_eq!(summary.issue_count, 0);
}

#[test]
fn multi_repo_metadata_keys_carry_a_stable_suffix() {
    assert_eq!(metadata_key("jsonl_content_hash", None), "jsonl_content_hash");
    assert_eq!(
        metadata_key("jsonl_content_hash", Some("repo:one")),
        "jsonl_content_hash:repo_one"
    );
}

#[test]
fn tombstones_are_exported_alongside_living_issues() {
    let store = SqliteStore::open_in_memory().unwrap();
    store.create(new_issue("a-1", "alive")).unwrap();
    store.create(new_issue("a-2", "gone")).unwrap();
    store.delete("a-2", chrono::Utc::now()).unwrap();

    let dir = tempfile::tempdir().unwrap();
    let jsonl = dir.path().join("issues.jsonl");
    let summary = export(&store, &jsonl, None).unwrap();

    assert_eq!(summary.issue_count, 2);
    let contents = std::fs::read_to_string(&jsonl).unwrap();
    assert!(contents.contains("\"tombstone\""));
}
