use crate::prelude::*;

#[test]
fn rpc_with_no_start_fails_fast_when_daemon_is_not_running() {
    let ws = Workspace::empty();
    ws.bd()
        .args(&["rpc", "status", "null", "--no-start"])
        .fails()
        .stderr_has("not running");
}

#[test]
fn rpc_rejects_malformed_json_args() {
    let ws = Workspace::empty();
    ws.bd()
        .args(&["rpc", "get", "{not valid json"])
        .fails()
        .stderr_has("invalid --args JSON");
}

#[test]
fn daemon_status_on_a_fresh_workspace_reports_not_running() {
    let ws = Workspace::empty();
    ws.bd().args(&["daemon", "status"]).passes().stdout_has("not running");
}

#[test]
fn unknown_operation_is_reported_as_invalid_rather_than_crashing() {
    let ws = Workspace::empty();
    let response = ws.rpc_raw("this_is_not_a_real_op", serde_json::Value::Null);
    // print_response exits 1 on failure and prints the error envelope to stdout.
    assert_ne!(response.code(), Some(0));
    let payload = response.json();
    assert_eq!(payload["error_family"], "invalid_input");
}
