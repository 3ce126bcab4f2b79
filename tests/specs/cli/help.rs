use crate::prelude::*;

#[test]
fn top_level_help_lists_subcommands() {
    cli()
        .args(&["--help"])
        .passes()
        .stdout_has("daemon")
        .stdout_has("rpc");
}

#[test]
fn version_flag_prints_a_version() {
    cli().args(&["--version"]).passes().stdout_has("bd ");
}

#[test]
fn daemon_help_lists_lifecycle_subcommands() {
    cli()
        .args(&["daemon", "--help"])
        .passes()
        .stdout_has("start")
        .stdout_has("stop")
        .stdout_has("status");
}

#[test]
fn rpc_help_documents_the_op_argument() {
    cli().args(&["rpc", "--help"]).passes().stdout_has("op");
}
