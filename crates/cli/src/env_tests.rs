use super::*;
use serial_test::serial;

#[test]
#[serial(cli_env)]
fn daemon_binary_reads_override() {
    std::env::set_var("BEADS_DAEMON_BINARY", "/opt/bin/beadsd");
    assert_eq!(daemon_binary().as_deref(), Some("/opt/bin/beadsd"));
    std::env::remove_var("BEADS_DAEMON_BINARY");
}

#[test]
#[serial(cli_env)]
fn daemon_binary_absent_by_default() {
    std::env::remove_var("BEADS_DAEMON_BINARY");
    assert_eq!(daemon_binary(), None);
}

#[test]
#[serial(cli_env)]
fn timeout_ipc_ms_parses_a_valid_value() {
    std::env::set_var("BEADS_TIMEOUT_IPC_MS", "1500");
    assert_eq!(timeout_ipc_ms(), Some(Duration::from_millis(1500)));
    std::env::remove_var("BEADS_TIMEOUT_IPC_MS");
}

#[test]
#[serial(cli_env)]
fn timeout_ipc_ms_ignores_unparseable_values() {
    std::env::set_var("BEADS_TIMEOUT_IPC_MS", "not-a-number");
    assert_eq!(timeout_ipc_ms(), None);
    std::env::remove_var("BEADS_TIMEOUT_IPC_MS");
}
