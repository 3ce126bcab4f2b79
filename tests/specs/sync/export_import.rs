use crate::prelude::*;

#[test]
fn export_writes_one_jsonl_line_per_issue() {
    let ws = Workspace::empty();
    ws.rpc("create", issue_payload("ex-1", "first"));
    ws.rpc("create", issue_payload("ex-2", "second"));
    ws.rpc("export", serde_json::Value::Null);

    let jsonl = ws.read_jsonl();
    let lines: Vec<&str> = jsonl.lines().filter(|l| !l.trim().is_empty()).collect();
    assert_eq!(lines.len(), 2);
    assert!(jsonl.contains("\"id\":\"ex-1\""));
    assert!(jsonl.contains("\"id\":\"ex-2\""));
}

#[test]
fn deleting_an_issue_then_exporting_propagates_a_tombstone_not_a_removed_line() {
    let ws = Workspace::empty();
    ws.rpc("create", issue_payload("ex-3", "to be deleted"));
    ws.rpc("export", serde_json::Value::Null);
    assert_eq!(ws.read_jsonl().lines().filter(|l| !l.trim().is_empty()).count(), 1);

    ws.rpc("delete", serde_json::json!({"id": "ex-3"}));
    ws.rpc("export", serde_json::Value::Null);

    let jsonl = ws.read_jsonl();
    let lines: Vec<&str> = jsonl.lines().filter(|l| !l.trim().is_empty()).collect();
    assert_eq!(lines.len(), 1, "tombstones are carried forward, not dropped");
    assert!(lines[0].contains("\"status\":\"tombstone\""));
}

#[test]
fn export_then_import_on_an_untouched_db_reports_nothing_changed() {
    let ws = Workspace::empty();
    ws.rpc("create", issue_payload("ex-4", "round trip"));
    ws.rpc("export", serde_json::Value::Null);

    let report = ws.rpc("import", serde_json::Value::Null);
    assert_eq!(report["summary"]["created"], 0);
    assert_eq!(report["summary"]["updated"], 0);
}

#[test]
fn status_rpc_reports_repo_id_and_zero_open_conflicts_on_a_fresh_workspace() {
    let ws = Workspace::empty();
    let status = ws.rpc("status", serde_json::Value::Null);
    assert_eq!(status["open_conflicts"], 0);
}

#[test]
fn integrity_check_reports_no_issues_on_a_clean_database() {
    let ws = Workspace::empty();
    ws.rpc("create", issue_payload("ex-5", "clean"));
    let report = ws.rpc("integrity_check", serde_json::Value::Null);
    assert!(report.as_array().unwrap().is_empty());
}
