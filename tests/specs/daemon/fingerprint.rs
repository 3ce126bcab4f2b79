use crate::prelude::*;

/// A legacy database (no bound repo_id, already has data) refuses to start
/// until an operator runs the explicit migration.
#[test]
fn legacy_database_without_a_fingerprint_refuses_to_start() {
    let ws = Workspace::empty();
    std::fs::create_dir_all(ws.metadata_dir()).unwrap();
    {
        let store = bd_storage::SqliteStore::open(&ws.metadata_dir().join("beads.db")).unwrap();
        bd_storage::IssueStore::create(&store, bd_core::test_support::issue("lg-1", "predates fingerprints")).unwrap();
    }

    ws.bd().args(&["rpc", "status"]).fails();
    // The daemon never reaches a listening state; starting it fails rather
    // than silently binding. Confirm no socket was created.
    assert!(!ws.metadata_dir().join("daemon.sock").exists());
}

/// `BEADS_IGNORE_FINGERPRINT_MISMATCH` downgrades a mismatch to a warning
/// rather than a hard refusal -- an explicit, deliberate override.
#[test]
fn ignore_fingerprint_mismatch_env_var_allows_legacy_db_to_start_unbound() {
    let ws = Workspace::empty();
    std::fs::create_dir_all(ws.metadata_dir()).unwrap();
    {
        let store = bd_storage::SqliteStore::open(&ws.metadata_dir().join("beads.db")).unwrap();
        bd_storage::IssueStore::create(&store, bd_core::test_support::issue("lg-1", "predates fingerprints")).unwrap();
    }

    ws.bd()
        .env("BEADS_IGNORE_FINGERPRINT_MISMATCH", "1")
        .args(&["rpc", "status"])
        .passes();
}

/// The explicit `migrate_fingerprint` operation is the sanctioned way to
/// bind a fingerprint to a legacy, unbound database.
#[test]
fn migrate_fingerprint_binds_an_unbound_legacy_database() {
    let ws = Workspace::empty();
    std::fs::create_dir_all(ws.metadata_dir()).unwrap();
    {
        let store = bd_storage::SqliteStore::open(&ws.metadata_dir().join("beads.db")).unwrap();
        bd_storage::IssueStore::create(&store, bd_core::test_support::issue("lg-1", "predates fingerprints")).unwrap();
    }

    ws.bd()
        .env("BEADS_IGNORE_FINGERPRINT_MISMATCH", "1")
        .args(&["rpc", "migrate_fingerprint", r#"{"fingerprint":"deadbeef","confirm":true}"#])
        .passes();

    ws.bd().args(&["daemon", "stop"]).run();
}

/// Without `confirm: true`, migration is refused -- it's a one-shot,
/// irreversible rebind and must be deliberate.
#[test]
fn migrate_fingerprint_requires_explicit_confirmation() {
    let ws = Workspace::empty();
    std::fs::create_dir_all(ws.metadata_dir()).unwrap();
    {
        let store = bd_storage::SqliteStore::open(&ws.metadata_dir().join("beads.db")).unwrap();
        bd_storage::IssueStore::create(&store, bd_core::test_support::issue("lg-1", "predates fingerprints")).unwrap();
    }

    ws.bd()
        .env("BEADS_IGNORE_FINGERPRINT_MISMATCH", "1")
        .args(&["rpc", "migrate_fingerprint", r#"{"fingerprint":"deadbeef"}"#])
        .fails();
}
