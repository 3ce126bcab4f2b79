//! Test helpers for behavioral specifications of the `bd` control client
//! and the `beadsd` daemon it talks to.
//!
//! These tests are black-box: they invoke the `bd` binary and verify
//! stdout, stderr, and exit codes, or parse the JSON payload of an `rpc`
//! response.

#![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic, dead_code)]

use std::path::{Path, PathBuf};
use std::process::{Command, Output};
use std::time::Duration;

// Aggressive timeouts so a hung daemon fails a test fast instead of the
// whole suite timing out.
const BEADS_TIMEOUT_CONNECT_MS: &str = "2000";
const BEADS_TIMEOUT_EXIT_MS: &str = "1000";
const BEADS_TIMEOUT_IPC_MS: &str = "2000";
const BEADS_CONNECT_POLL_MS: &str = "10";

pub const SPEC_POLL_INTERVAL_MS: u64 = 10;
pub const SPEC_WAIT_MAX_MS: u64 = 2000;

/// Returns the path to a binary, checking llvm-cov target directory first.
/// Falls back to resolving relative to the test binary itself when
/// CARGO_MANIFEST_DIR is stale (e.g. compiled by a removed worktree into a
/// shared target directory).
fn binary_path(name: &str) -> PathBuf {
    let manifest_dir = Path::new(env!("CARGO_MANIFEST_DIR"));

    let llvm_cov_path = manifest_dir.join("target/llvm-cov-target/debug").join(name);
    if llvm_cov_path.exists() {
        return llvm_cov_path;
    }

    let standard = manifest_dir.join("target/debug").join(name);
    if standard.exists() {
        return standard;
    }

    if let Ok(exe) = std::env::current_exe() {
        if let Some(debug_dir) = exe.parent().and_then(|d| d.parent()) {
            let fallback = debug_dir.join(name);
            if fallback.exists() {
                return fallback;
            }
        }
    }

    standard
}

fn bd_binary() -> PathBuf {
    binary_path("bd")
}

pub fn beadsd_binary() -> PathBuf {
    binary_path("beadsd")
}

pub fn bd_cmd() -> Command {
    Command::new(bd_binary())
}

/// Create a CLI builder for `bd` commands.
pub fn cli() -> CliBuilder {
    CliBuilder::new()
}

/// High-level builder for fluent test assertions against the `bd` binary.
pub struct CliBuilder {
    args: Vec<String>,
    dir: Option<PathBuf>,
    envs: Vec<(String, String)>,
}

impl CliBuilder {
    fn new() -> Self {
        Self {
            args: Vec::new(),
            dir: None,
            envs: vec![
                (
                    "BEADS_DAEMON_BINARY".into(),
                    beadsd_binary().to_string_lossy().into(),
                ),
                ("BEADS_TIMEOUT_CONNECT_MS".into(), BEADS_TIMEOUT_CONNECT_MS.into()),
                ("BEADS_TIMEOUT_EXIT_MS".into(), BEADS_TIMEOUT_EXIT_MS.into()),
                ("BEADS_TIMEOUT_IPC_MS".into(), BEADS_TIMEOUT_IPC_MS.into()),
                ("BEADS_CONNECT_POLL_MS".into(), BEADS_CONNECT_POLL_MS.into()),
            ],
        }
    }

    pub fn args(mut self, args: &[&str]) -> Self {
        self.args.extend(args.iter().map(|s| s.to_string()));
        self
    }

    pub fn pwd(mut self, path: impl Into<PathBuf>) -> Self {
        self.dir = Some(path.into());
        self
    }

    pub fn env(mut self, key: &str, value: impl AsRef<str>) -> Self {
        self.envs.push((key.to_string(), value.as_ref().to_string()));
        self
    }

    pub fn command(self) -> Command {
        let mut cmd = bd_cmd();
        cmd.args(&self.args);

        if let Some(dir) = self.dir {
            cmd.current_dir(dir);
        }

        for (key, value) in self.envs {
            cmd.env(key, value);
        }

        cmd
    }

    pub fn passes(self) -> RunAssert {
        let mut cmd = self.command();
        let output = cmd.output().expect("command should run");
        assert!(
            output.status.success(),
            "expected command to pass, got exit code {:?}\nstdout: {}\nstderr: {}",
            output.status.code(),
            String::from_utf8_lossy(&output.stdout),
            String::from_utf8_lossy(&output.stderr)
        );
        RunAssert { output }
    }

    pub fn fails(self) -> RunAssert {
        let mut cmd = self.command();
        let output = cmd.output().expect("command should run");
        assert!(
            !output.status.success(),
            "expected command to fail, but it passed\nstdout: {}\nstderr: {}",
            String::from_utf8_lossy(&output.stdout),
            String::from_utf8_lossy(&output.stderr)
        );
        RunAssert { output }
    }

    /// Run regardless of exit code, for tests that inspect both outcomes.
    pub fn run(self) -> RunAssert {
        let mut cmd = self.command();
        let output = cmd.output().expect("command should run");
        RunAssert { output }
    }
}

pub struct RunAssert {
    output: Output,
}

impl RunAssert {
    pub fn stdout(&self) -> String {
        String::from_utf8_lossy(&self.output.stdout).into_owned()
    }

    pub fn stderr(&self) -> String {
        String::from_utf8_lossy(&self.output.stderr).into_owned()
    }

    pub fn code(&self) -> Option<i32> {
        self.output.status.code()
    }

    /// Parse stdout as the JSON payload of a `bd rpc` call.
    pub fn json(&self) -> serde_json::Value {
        serde_json::from_str(self.stdout().trim()).unwrap_or_else(|err| {
            panic!("stdout was not valid JSON ({err}):\n{}", self.stdout());
        })
    }

    pub fn stdout_has(self, expected: &str) -> Self {
        let stdout = self.stdout();
        assert!(
            stdout.contains(expected),
            "stdout does not contain '{}'\nstdout: {}",
            expected,
            stdout
        );
        self
    }

    pub fn stderr_has(self, expected: &str) -> Self {
        let stderr = self.stderr();
        assert!(
            stderr.contains(expected),
            "stderr does not contain '{}'\nstderr: {}",
            expected,
            stderr
        );
        self
    }
}

/// Poll a condition until it returns true or the timeout is reached.
pub fn wait_for<F>(timeout_ms: u64, mut condition: F) -> bool
where
    F: FnMut() -> bool,
{
    let start = std::time::Instant::now();
    let timeout = Duration::from_millis(timeout_ms);
    let poll_interval = Duration::from_millis(SPEC_POLL_INTERVAL_MS);

    while start.elapsed() < timeout {
        if condition() {
            return true;
        }
        std::thread::sleep(poll_interval);
    }
    false
}

/// A temporary workspace directory with helper methods. Each workspace gets
/// its own `.beads` metadata directory once a daemon has been started
/// against it.
pub struct Workspace {
    dir: tempfile::TempDir,
}

impl Workspace {
    pub fn empty() -> Self {
        Self {
            dir: tempfile::tempdir().unwrap(),
        }
    }

    pub fn path(&self) -> &Path {
        self.dir.path()
    }

    pub fn metadata_dir(&self) -> PathBuf {
        self.path().join(".beads")
    }

    pub fn jsonl_path(&self) -> PathBuf {
        self.metadata_dir().join("issues.jsonl")
    }

    pub fn git_init(&self) {
        Command::new("git")
            .args(["init"])
            .current_dir(self.path())
            .stdout(std::process::Stdio::null())
            .stderr(std::process::Stdio::null())
            .status()
            .expect("git init should work");
        Command::new("git")
            .args(["config", "user.email", "test@example.com"])
            .current_dir(self.path())
            .status()
            .expect("git config should work");
        Command::new("git")
            .args(["config", "user.name", "Test"])
            .current_dir(self.path())
            .status()
            .expect("git config should work");
    }

    pub fn file(&self, path: impl AsRef<Path>, content: &str) {
        let full_path = self.path().join(path.as_ref());
        if let Some(parent) = full_path.parent() {
            std::fs::create_dir_all(parent).unwrap();
        }
        std::fs::write(full_path, content).unwrap();
    }

    pub fn read_jsonl(&self) -> String {
        std::fs::read_to_string(self.jsonl_path()).unwrap_or_default()
    }

    /// Run a `bd` command rooted at this workspace.
    pub fn bd(&self) -> CliBuilder {
        cli().pwd(self.path())
    }

    /// Send a generic RPC request and return the parsed JSON payload,
    /// asserting success.
    pub fn rpc(&self, op: &str, args: serde_json::Value) -> serde_json::Value {
        let response = self.bd().args(&["rpc", op, &args.to_string()]).passes();
        response.json()
    }

    /// Like `rpc`, but returns the raw assertion object for tests that
    /// expect failure.
    pub fn rpc_raw(&self, op: &str, args: serde_json::Value) -> RunAssert {
        self.bd().args(&["rpc", op, &args.to_string()]).run()
    }
}

impl Drop for Workspace {
    fn drop(&mut self) {
        let mut cmd = self.bd().args(&["daemon", "stop"]).command();
        cmd.stdout(std::process::Stdio::null())
            .stderr(std::process::Stdio::null());
        let _ = cmd.status();
    }
}

/// A minimal valid issue payload for `rpc create`, with `id` and `title`
/// overridden by the caller.
pub fn issue_payload(id: &str, title: &str) -> serde_json::Value {
    let now = chrono::Utc::now().to_rfc3339();
    serde_json::json!({
        "id": id,
        "title": title,
        "description": "",
        "status": "open",
        "priority": "medium",
        "labels": [],
        "comments": [],
        "dependencies": [],
        "created_at": now,
        "updated_at": now,
    })
}
