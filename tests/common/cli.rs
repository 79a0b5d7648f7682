//! Helpers for driving the `wg` binary in a scratch directory.

use std::ffi::OsStr;
use std::process::ExitStatus;

use assert_cmd::Command;
use serde_json::Value;
use tempfile::TempDir;

/// A temporary directory to run `wg` in.
pub struct WgWorkspace {
    pub temp_dir: TempDir,
}

impl WgWorkspace {
    pub fn new() -> Self {
        Self {
            temp_dir: TempDir::new().expect("create temp dir"),
        }
    }

    /// Fresh directory with `wg init` already run.
    pub fn initialized() -> Self {
        let workspace = Self::new();
        let init = run_wg(&workspace, ["init"], "init");
        assert!(init.status.success(), "init failed: {}", init.stderr);
        workspace
    }
}

pub struct WgOutput {
    pub status: ExitStatus,
    pub stdout: String,
    pub stderr: String,
}

impl WgOutput {
    pub fn code(&self) -> Option<i32> {
        self.status.code()
    }

    pub fn json(&self) -> Value {
        serde_json::from_str(&self.stdout)
            .unwrap_or_else(|err| panic!("stdout is not JSON ({err}): {}", self.stdout))
    }
}

/// Run `wg` with the given args. `label` only appears in failure messages.
pub fn run_wg<I, S>(workspace: &WgWorkspace, args: I, label: &str) -> WgOutput
where
    I: IntoIterator<Item = S>,
    S: AsRef<OsStr>,
{
    let output = Command::cargo_bin("wg")
        .unwrap_or_else(|err| panic!("{label}: binary not built: {err}"))
        .current_dir(workspace.temp_dir.path())
        .env("WG_ACTOR", "tester")
        .env_remove("WG_DIR")
        .env_remove("RUST_LOG")
        .args(args)
        .output()
        .unwrap_or_else(|err| panic!("{label}: failed to run wg: {err}"));

    WgOutput {
        status: output.status,
        stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
        stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
    }
}

/// Run `wg --json ...`, assert success and parse stdout.
pub fn run_wg_json<I, S>(workspace: &WgWorkspace, args: I, label: &str) -> Value
where
    I: IntoIterator<Item = S>,
    S: AsRef<OsStr>,
{
    let mut full: Vec<String> = vec!["--json".to_string()];
    full.extend(
        args.into_iter()
            .map(|arg| arg.as_ref().to_string_lossy().into_owned()),
    );
    let output = run_wg(workspace, &full, label);
    assert!(
        output.status.success(),
        "{label} failed ({:?}): {}",
        output.code(),
        output.stderr
    );
    output.json()
}

/// Create a project and return its ID.
pub fn create_project(workspace: &WgWorkspace, id: &str, extra: &[&str]) -> String {
    let mut args = vec!["project", "create", id];
    args.extend_from_slice(extra);
    let project = run_wg_json(workspace, args, "project create");
    project["id"].as_str().expect("project id").to_string()
}

/// Create a feature and return its ID.
pub fn create_feature(workspace: &WgWorkspace, project: &str, name: &str, deps: &[&str]) -> String {
    let mut args = vec![
        "feature", "create", name, "--project", project, "--goal", "ship it",
    ];
    for dep in deps {
        args.extend(["--depends-on", *dep]);
    }
    let feature = run_wg_json(workspace, args, "feature create");
    feature["id"].as_str().expect("feature id").to_string()
}

/// Create a task with the four required lists filled in; returns the JSON record.
pub fn create_task(workspace: &WgWorkspace, feature: &str, name: &str, deps: &[&str]) -> Value {
    let mut args = vec![
        "task",
        "create",
        name,
        "--feature",
        feature,
        "--goal",
        "do it",
        "--step",
        "write code",
        "--test-case",
        "it works",
        "--file",
        "src/lib.rs",
        "--library",
        "serde",
    ];
    for dep in deps {
        args.extend(["--depends-on", *dep]);
    }
    run_wg_json(workspace, args, "task create")
}
