//! Test utilities for workbench-lib.
//!
//! Cross-platform shell helpers, a recording fake for [`ProcessRunner`], and
//! helpers that create local git repositories to clone from.

use std::cell::RefCell;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use walkdir::WalkDir;

use crate::process::{CommandLine, Interrupt, OutputSink, ProcessError, ProcessOutput, ProcessRunner};
use crate::types::{OutputStream, Stage};

/// Returns the shell command and args to execute a shell script.
#[cfg(unix)]
pub fn shell_cmd(script: &str) -> (&'static str, Vec<String>) {
  ("/bin/sh", vec!["-c".to_string(), script.to_string()])
}

#[cfg(windows)]
pub fn shell_cmd(script: &str) -> (&'static str, Vec<String>) {
  ("cmd.exe", vec!["/C".to_string(), script.to_string()])
}

/// Run git with a fixed identity, panicking on failure.
pub fn git(cwd: &Path, args: &[&str]) {
  let status = std::process::Command::new("git")
    .args(["-c", "user.name=workbench", "-c", "user.email=workbench@example.com"])
    .args(args)
    .current_dir(cwd)
    .status()
    .expect("git should be installed");
  assert!(status.success(), "git {:?} failed", args);
}

/// Create an empty (no commits) repository at `path`.
pub fn init_empty_repo(path: &Path) {
  std::fs::create_dir_all(path).unwrap();
  git(path, &["init", "--quiet"]);
}

/// Create a repository at `path` with a single committed file.
pub fn init_repo_with_commit(path: &Path) {
  init_empty_repo(path);
  std::fs::write(path.join("README.md"), "hello\n").unwrap();
  git(path, &["add", "README.md"]);
  git(path, &["commit", "--quiet", "-m", "initial"]);
}

/// Relative path -> file content for every file under `root`.
pub fn snapshot_tree(root: &Path) -> BTreeMap<PathBuf, Vec<u8>> {
  WalkDir::new(root)
    .into_iter()
    .filter_map(|e| e.ok())
    .filter(|e| e.file_type().is_file())
    .map(|e| {
      let rel = e.path().strip_prefix(root).unwrap().to_path_buf();
      (rel, std::fs::read(e.path()).unwrap())
    })
    .collect()
}

/// Sink that records everything it receives.
#[derive(Debug, Default)]
pub struct CollectingSink {
  pub lines: Vec<(OutputStream, String)>,
  pub commands: Vec<CommandLine>,
  pub stages: Vec<(String, Stage)>,
}

impl OutputSink for CollectingSink {
  fn line(&mut self, stream: OutputStream, line: &str) {
    self.lines.push((stream, line.to_string()));
  }

  fn stage(&mut self, target: &str, stage: Stage) {
    self.stages.push((target.to_string(), stage));
  }

  fn command(&mut self, command: &CommandLine) {
    self.commands.push(command.clone());
  }
}

/// One recorded call to [`RecordingRunner::run`].
#[derive(Debug, Clone)]
pub struct Invocation {
  pub command: CommandLine,
  pub cwd: PathBuf,
}

/// A fake runner that records invocations instead of spawning processes.
///
/// Exit codes are scripted by command prefix: the first rule whose prefix
/// matches the rendered command line wins; unmatched commands exit 0.
#[derive(Debug, Default)]
pub struct RecordingRunner {
  rules: Vec<(String, i32)>,
  interrupt_prefixes: Vec<String>,
  interrupt: Interrupt,
  pub invocations: RefCell<Vec<Invocation>>,
}

impl RecordingRunner {
  pub fn new() -> Self {
    Self::default()
  }

  pub fn exit_with(mut self, prefix: &str, code: i32) -> Self {
    self.rules.push((prefix.to_string(), code));
    self
  }

  /// Commands matching `prefix` behave as if Ctrl-C arrived while they ran.
  pub fn interrupt_on(mut self, prefix: &str) -> Self {
    self.interrupt_prefixes.push(prefix.to_string());
    self
  }

  pub fn rendered(&self) -> Vec<String> {
    self.invocations.borrow().iter().map(|i| i.command.to_string()).collect()
  }

  pub fn invoked(&self, prefix: &str) -> bool {
    self.rendered().iter().any(|c| c.starts_with(prefix))
  }

  pub fn count(&self) -> usize {
    self.invocations.borrow().len()
  }
}

impl ProcessRunner for RecordingRunner {
  fn interrupt_requested(&self) -> bool {
    self.interrupt.requested()
  }

  async fn run(
    &self,
    command: &CommandLine,
    cwd: &Path,
    sink: &mut dyn OutputSink,
  ) -> Result<ProcessOutput, ProcessError> {
    let interrupted = || ProcessError::Interrupted {
      program: command.program.clone(),
    };
    if self.interrupt.requested() {
      return Err(interrupted());
    }

    sink.command(command);
    self.invocations.borrow_mut().push(Invocation {
      command: command.clone(),
      cwd: cwd.to_path_buf(),
    });

    let rendered = command.to_string();
    if self.interrupt_prefixes.iter().any(|p| rendered.starts_with(p.as_str())) {
      self.interrupt.trigger();
      return Err(interrupted());
    }

    let exit_code = self
      .rules
      .iter()
      .find(|(prefix, _)| rendered.starts_with(prefix.as_str()))
      .map(|(_, code)| *code)
      .unwrap_or(0);

    let line = format!("{} exited with {}", command.program, exit_code);
    sink.line(OutputStream::Stderr, &line);

    Ok(ProcessOutput {
      exit_code,
      tail: vec![line],
    })
  }
}
