use crate::prelude::*;

fn write_route(routes_path: &std::path::Path, prefix: &str, sibling_metadata_dir: &std::path::Path) {
    if let Some(parent) = routes_path.parent() {
        std::fs::create_dir_all(parent).unwrap();
    }
    let line = serde_json::json!({"prefix": prefix, "workspace": sibling_metadata_dir});
    let mut contents = std::fs::read_to_string(routes_path).unwrap_or_default();
    contents.push_str(&line.to_string());
    contents.push('\n');
    std::fs::write(routes_path, contents).unwrap();
}

#[test]
fn a_request_for_a_routed_prefix_with_a_live_sibling_daemon_is_forwarded() {
    let a = Workspace::empty();
    let b = Workspace::empty();

    // b owns prefix "bb" and has a live daemon.
    b.rpc("create", issue_payload("bb-1", "owned by b"));

    write_route(&a.metadata_dir().join("routes.jsonl"), "bb", &b.metadata_dir());

    let fetched = a.rpc("get", serde_json::json!({"id": "bb-1"}));
    assert_eq!(fetched["title"], "owned by b");
}

#[test]
fn a_request_for_a_routed_prefix_with_no_live_daemon_falls_back_to_read_only() {
    let a = Workspace::empty();
    let b = Workspace::empty();

    b.rpc("create", issue_payload("bb-2", "owned by b, daemon now stopped"));
    b.rpc("export", serde_json::Value::Null);
    b.bd().args(&["daemon", "stop"]).passes();
    assert!(wait_for(SPEC_WAIT_MAX_MS, || !b.metadata_dir().join("daemon.sock").exists()));

    write_route(&a.metadata_dir().join("routes.jsonl"), "bb", &b.metadata_dir());

    let fetched = a.rpc("get", serde_json::json!({"id": "bb-2"}));
    assert_eq!(fetched["title"], "owned by b, daemon now stopped");

    // Mutations against a read-only sibling handle are refused outright.
    let response = a.rpc_raw("delete", serde_json::json!({"id": "bb-2"}));
    assert_ne!(response.code(), Some(0));
    let payload = response.json();
    assert_eq!(payload["error_family"], "policy_violation");
}

#[test]
fn an_unrouted_prefix_is_answered_locally_as_not_found() {
    let a = Workspace::empty();
    let fetched = a.rpc("get", serde_json::json!({"id": "zz-999"}));
    assert!(fetched.is_null());
}
