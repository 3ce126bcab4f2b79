use super::*;

#[test]
fn connect_fails_fast_when_no_socket_exists() {
    let dir = tempfile::tempdir().unwrap();
    let err = DaemonClient::connect(dir.path()).unwrap_err();
    assert!(matches!(err, ClientError::DaemonNotRunning));
}

#[test]
fn metadata_dir_for_falls_back_to_workspace_dot_beads_when_nothing_found() {
    let dir = tempfile::tempdir().unwrap();
    let resolved = metadata_dir_for(dir.path());
    assert_eq!(resolved, dir.path().join(".beads"));
}

#[test]
fn metadata_dir_for_finds_an_existing_dir_above_a_nested_path() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::create_dir_all(dir.path().join(".beads")).unwrap();
    let nested = dir.path().join("sub/dir");
    std::fs::create_dir_all(&nested).unwrap();

    assert_eq!(metadata_dir_for(&nested), dir.path().join(".beads"));
}

#[tokio::test]
async fn stop_daemon_returns_false_when_nothing_is_running() {
    let dir = tempfile::tempdir().unwrap();
    assert!(!stop_daemon(dir.path()).await);
}
