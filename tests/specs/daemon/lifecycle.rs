use crate::prelude::*;

#[test]
fn daemon_start_then_status_then_stop() {
    let ws = Workspace::empty();

    ws.bd().args(&["daemon", "start"]).passes().stdout_has("beadsd running");

    assert!(wait_for(SPEC_WAIT_MAX_MS, || ws.metadata_dir().join("daemon.sock").exists()));

    ws.bd().args(&["daemon", "status"]).passes().stdout_has("running (pid");

    ws.bd().args(&["daemon", "stop"]).passes().stdout_has("beadsd stopped");

    assert!(wait_for(SPEC_WAIT_MAX_MS, || !ws.metadata_dir().join("daemon.sock").exists()));
}

#[test]
fn stopping_a_daemon_that_is_not_running_is_reported_not_an_error() {
    let ws = Workspace::empty();
    ws.bd().args(&["daemon", "stop"]).passes().stdout_has("not running");
}

#[test]
fn starting_twice_reuses_the_already_running_daemon() {
    let ws = Workspace::empty();
    ws.bd().args(&["daemon", "start"]).passes();
    assert!(wait_for(SPEC_WAIT_MAX_MS, || ws.metadata_dir().join("daemon.sock").exists()));

    // Second start should notice the live socket and not error.
    ws.bd().args(&["daemon", "start"]).passes().stdout_has("beadsd running");
}

#[test]
fn rpc_auto_starts_the_daemon_when_not_running() {
    let ws = Workspace::empty();
    let status = ws.rpc("status", serde_json::Value::Null);
    assert!(status["repo_id"].is_string() || status["repo_id"].is_null());
    assert!(ws.metadata_dir().join("daemon.sock").exists());
}

#[test]
fn create_and_get_round_trip_through_the_daemon() {
    let ws = Workspace::empty();
    let created = ws.rpc("create", issue_payload("ws-1", "write the lifecycle test"));
    assert_eq!(created["id"], "ws-1");
    assert_eq!(created["title"], "write the lifecycle test");

    let fetched = ws.rpc("get", serde_json::json!({"id": "ws-1"}));
    assert_eq!(fetched["title"], "write the lifecycle test");
    assert_eq!(fetched["status"], "open");
}

#[test]
fn search_filters_by_status() {
    let ws = Workspace::empty();
    ws.rpc("create", issue_payload("ws-2", "open issue"));
    ws.rpc("create", issue_payload("ws-3", "closed issue"));
    ws.rpc("close", serde_json::json!({"id": "ws-3"}));

    let open_only = ws.rpc("search", serde_json::json!({"status": "open"}));
    let ids: Vec<&str> = open_only.as_array().unwrap().iter().map(|v| v["id"].as_str().unwrap()).collect();
    assert!(ids.contains(&"ws-2"));
    assert!(!ids.contains(&"ws-3"));
}
