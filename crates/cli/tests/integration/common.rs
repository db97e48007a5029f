//! Shared test helpers for CLI integration tests.

use std::path::{Path, PathBuf};

use assert_cmd::Command;
use assert_cmd::cargo::cargo_bin_cmd;
use tempfile::TempDir;

/// Isolated test environment.
///
/// Each test gets its own temporary directory holding the workspace root, a
/// target file and any upstream repositories to clone from.
pub struct TestEnv {
  pub temp: TempDir,
  pub targets_path: PathBuf,
}

impl TestEnv {
  pub fn new() -> Self {
    let temp = TempDir::new().unwrap();
    let targets_path = temp.path().join("targets.json");
    Self { temp, targets_path }
  }

  /// Create with a target file replacing the built-in targets.
  pub fn with_targets(targets: serde_json::Value) -> Self {
    let env = Self::new();
    env.write_targets(targets);
    env
  }

  pub fn write_targets(&self, targets: serde_json::Value) {
    let file = serde_json::json!({ "extend_builtin": false, "targets": targets });
    std::fs::write(&self.targets_path, serde_json::to_string_pretty(&file).unwrap()).unwrap();
  }

  /// Workspace root. Not created up front; wb creates it.
  pub fn root_path(&self) -> PathBuf {
    let base = dunce::canonicalize(self.temp.path()).unwrap();
    base.join("workspace")
  }

  /// Create an empty git repository under the temp directory.
  pub fn upstream_repo(&self, name: &str) -> PathBuf {
    let path = self.temp.path().join("upstream").join(name);
    std::fs::create_dir_all(&path).unwrap();
    git(&path, &["init", "--quiet"]);
    path
  }

  /// Write a file relative to the workspace root.
  pub fn write_workspace_file(&self, relative_path: &str, content: &str) {
    let path = self.root_path().join(relative_path);
    if let Some(parent) = path.parent() {
      std::fs::create_dir_all(parent).unwrap();
    }
    std::fs::write(&path, content).unwrap();
  }

  /// Get a pre-configured Command for the wb binary.
  ///
  /// Points `WORKBENCH_ROOT` and `WORKBENCH_TARGETS` into the temp directory
  /// and clears variables that would change configure commands.
  pub fn wb_cmd(&self) -> Command {
    let mut cmd: Command = cargo_bin_cmd!("wb");
    cmd.env("WORKBENCH_ROOT", self.root_path());
    cmd.env("WORKBENCH_TARGETS", &self.targets_path);
    for var in [
      "WORKBENCH_BUILD_TYPE",
      "WORKBENCH_GENERATOR",
      "WORKBENCH_TAIL_LINES",
      "CMAKE_BUILD_TYPE",
      "CMAKE_GENERATOR",
      "RUST_LOG",
    ] {
      cmd.env_remove(var);
    }
    cmd
  }

  /// Run wb with `-o json` and parse stdout.
  pub fn run_json(&self, args: &[&str]) -> (i32, serde_json::Value) {
    let output = self.wb_cmd().args(["-o", "json"]).args(args).output().unwrap();
    let code = output.status.code().unwrap_or(-1);
    let stdout = String::from_utf8_lossy(&output.stdout);
    let value = serde_json::from_str(&stdout)
      .unwrap_or_else(|e| panic!("invalid JSON ({e}) in stdout: {stdout}\nstderr: {}", String::from_utf8_lossy(&output.stderr)));
    (code, value)
  }
}

fn git(cwd: &Path, args: &[&str]) {
  let status = std::process::Command::new("git")
    .args(args)
    .current_dir(cwd)
    .status()
    .expect("git should be installed");
  assert!(status.success(), "git {:?} failed", args);
}
