//! Child process execution.
//!
//! Every external tool (git, cmake, ninja, the container runtime) is run
//! through a [`ProcessRunner`]. The system runner streams each output line to
//! an [`OutputSink`] as it arrives, keeps the last lines in a [`TailBuffer`]
//! for failure reports, and forwards an [`Interrupt`] to the child before
//! giving up on it.

mod interrupt;
mod tail;

use std::collections::BTreeMap;
use std::fmt;
use std::path::Path;
use std::process::{ExitStatus, Stdio};

use thiserror::Error;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::process::{Child, Command};
use tracing::{debug, info, warn};

use crate::consts::DEFAULT_TAIL_LINES;
use crate::types::{OutputStream, Stage};

pub use interrupt::Interrupt;
pub use tail::TailBuffer;

#[derive(Debug, Error)]
pub enum ProcessError {
  #[error("failed to start '{program}': {source}")]
  Spawn {
    program: String,
    #[source]
    source: std::io::Error,
  },

  #[error("interrupted while running '{program}'")]
  Interrupted { program: String },

  #[error("io error while running '{program}': {source}")]
  Io {
    program: String,
    #[source]
    source: std::io::Error,
  },
}

/// A program and its arguments, ready to run.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize)]
pub struct CommandLine {
  pub program: String,
  pub args: Vec<String>,
  #[serde(skip_serializing_if = "BTreeMap::is_empty")]
  pub env: BTreeMap<String, String>,
}

impl CommandLine {
  pub fn new<I, S>(program: impl Into<String>, args: I) -> Self
  where
    I: IntoIterator<Item = S>,
    S: Into<String>,
  {
    Self {
      program: program.into(),
      args: args.into_iter().map(Into::into).collect(),
      env: BTreeMap::new(),
    }
  }

  /// Split an argv list into program and arguments. `None` for an empty list.
  pub fn from_argv(argv: &[String]) -> Option<Self> {
    let (program, args) = argv.split_first()?;
    Some(Self::new(program.clone(), args.iter().cloned()))
  }

  /// Full argv, program first.
  pub fn argv(&self) -> Vec<&str> {
    std::iter::once(self.program.as_str())
      .chain(self.args.iter().map(String::as_str))
      .collect()
  }
}

impl fmt::Display for CommandLine {
  /// Shell-like rendering for logs and dry runs.
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    let rendered: Vec<String> = self.argv().into_iter().map(quote).collect();
    f.write_str(&rendered.join(" "))
  }
}

fn quote(arg: &str) -> String {
  let plain = !arg.is_empty()
    && arg
      .chars()
      .all(|c| c.is_ascii_alphanumeric() || "-_./=:,+@%$".contains(c));
  if plain {
    arg.to_string()
  } else {
    format!("'{}'", arg.replace('\'', r"'\''"))
  }
}

/// Receives child output and progress as it happens.
pub trait OutputSink {
  fn line(&mut self, stream: OutputStream, line: &str);

  /// Called when a target enters a stage.
  fn stage(&mut self, _target: &str, _stage: Stage) {}

  /// Called right before a command is spawned.
  fn command(&mut self, _command: &CommandLine) {}
}

/// Discards everything.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullSink;

impl OutputSink for NullSink {
  fn line(&mut self, _stream: OutputStream, _line: &str) {}
}

/// What a finished child left behind.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProcessOutput {
  /// Exit code; `128 + signal` when the child was killed by a signal.
  pub exit_code: i32,
  /// Last lines of combined stdout/stderr.
  pub tail: Vec<String>,
}

impl ProcessOutput {
  pub fn success(&self) -> bool {
    self.exit_code == 0
  }
}

/// Runs one command to completion.
#[allow(async_fn_in_trait)]
pub trait ProcessRunner {
  async fn run(
    &self,
    command: &CommandLine,
    cwd: &Path,
    sink: &mut dyn OutputSink,
  ) -> Result<ProcessOutput, ProcessError>;

  /// Whether an interrupt is pending. Checked between targets.
  fn interrupt_requested(&self) -> bool {
    false
  }
}

/// Runs real child processes.
#[derive(Debug, Clone)]
pub struct SystemRunner {
  tail_lines: usize,
  interrupt: Interrupt,
}

impl SystemRunner {
  pub fn new(tail_lines: usize) -> Self {
    Self {
      tail_lines,
      interrupt: Interrupt::default(),
    }
  }

  /// Stop children when `interrupt` is requested.
  pub fn with_interrupt(mut self, interrupt: Interrupt) -> Self {
    self.interrupt = interrupt;
    self
  }

  /// Forward the interrupt to the child's process group and wait for it to
  /// exit. A second request kills the group.
  async fn interrupt_child(&self, child: &mut Child, program: &str) -> ProcessError {
    warn!(program, "interrupt received, stopping child process");
    signal_group(child, GroupSignal::Interrupt);

    tokio::select! {
      status = child.wait() => log_stopped(program, status),
      () = self.interrupt.reached(2) => {
        warn!(program, "second interrupt, killing child process");
        signal_group(child, GroupSignal::Kill);
        log_stopped(program, child.wait().await);
      }
    }

    ProcessError::Interrupted {
      program: program.to_string(),
    }
  }
}

impl Default for SystemRunner {
  fn default() -> Self {
    Self::new(DEFAULT_TAIL_LINES)
  }
}

impl ProcessRunner for SystemRunner {
  fn interrupt_requested(&self) -> bool {
    self.interrupt.requested()
  }

  async fn run(
    &self,
    command: &CommandLine,
    cwd: &Path,
    sink: &mut dyn OutputSink,
  ) -> Result<ProcessOutput, ProcessError> {
    let program = command.program.clone();
    let io_err = |source: std::io::Error| ProcessError::Io {
      program: program.clone(),
      source,
    };

    if self.interrupt.requested() {
      return Err(ProcessError::Interrupted {
        program: command.program.clone(),
      });
    }

    info!(cmd = %command, cwd = %cwd.display(), "running command");
    sink.command(command);

    let mut child_cmd = Command::new(&command.program);
    child_cmd
      .args(&command.args)
      .envs(&command.env)
      .current_dir(cwd)
      .stdin(Stdio::null())
      .stdout(Stdio::piped())
      .stderr(Stdio::piped())
      .kill_on_drop(true);

    // Own process group: the interrupt is forwarded to the whole tool tree.
    #[cfg(unix)]
    child_cmd.process_group(0);

    let mut child = child_cmd.spawn().map_err(|source| ProcessError::Spawn {
      program: command.program.clone(),
      source,
    })?;

    let stdout = child.stdout.take().map(|s| BufReader::new(s).split(b'\n'));
    let stderr = child.stderr.take().map(|s| BufReader::new(s).split(b'\n'));
    let (Some(mut stdout), Some(mut stderr)) = (stdout, stderr) else {
      return Err(io_err(std::io::Error::other("child pipes unavailable")));
    };

    let mut tail = TailBuffer::new(self.tail_lines);
    let mut stdout_open = true;
    let mut stderr_open = true;

    let interrupt = self.interrupt.reached(1);
    tokio::pin!(interrupt);

    while stdout_open || stderr_open {
      tokio::select! {
        segment = stdout.next_segment(), if stdout_open => match segment.map_err(io_err)? {
          Some(bytes) => emit(sink, &mut tail, OutputStream::Stdout, &bytes),
          None => stdout_open = false,
        },
        segment = stderr.next_segment(), if stderr_open => match segment.map_err(io_err)? {
          Some(bytes) => emit(sink, &mut tail, OutputStream::Stderr, &bytes),
          None => stderr_open = false,
        },
        () = &mut interrupt => return Err(self.interrupt_child(&mut child, &command.program).await),
      }
    }

    let status = tokio::select! {
      status = child.wait() => status.map_err(io_err)?,
      () = &mut interrupt => return Err(self.interrupt_child(&mut child, &command.program).await),
    };

    let exit_code = exit_code(status);
    debug!(program = %command.program, exit_code, "command finished");

    Ok(ProcessOutput {
      exit_code,
      tail: tail.into_lines(),
    })
  }
}

fn emit(sink: &mut dyn OutputSink, tail: &mut TailBuffer, stream: OutputStream, bytes: &[u8]) {
  let text = String::from_utf8_lossy(bytes);
  let line = text.strip_suffix('\r').unwrap_or(&*text);
  sink.line(stream, line);
  tail.push(line.to_string());
}

#[derive(Debug, Clone, Copy)]
enum GroupSignal {
  Interrupt,
  Kill,
}

#[cfg(unix)]
fn signal_group(child: &mut Child, signal: GroupSignal) {
  let signal = match signal {
    GroupSignal::Interrupt => libc::SIGINT,
    GroupSignal::Kill => libc::SIGKILL,
  };
  if let Some(pid) = child.id() {
    // SAFETY: killpg only sends a signal; the group was created for this child.
    let rc = unsafe { libc::killpg(pid as libc::pid_t, signal) };
    if rc != 0 {
      let _ = child.start_kill();
    }
  }
}

#[cfg(not(unix))]
fn signal_group(child: &mut Child, _signal: GroupSignal) {
  let _ = child.start_kill();
}

fn log_stopped(program: &str, status: std::io::Result<ExitStatus>) {
  match status {
    Ok(status) => debug!(program, exit_code = exit_code(status), "child stopped after interrupt"),
    Err(e) => warn!(program, error = %e, "failed to wait for interrupted child"),
  }
}

#[cfg(unix)]
fn exit_code(status: ExitStatus) -> i32 {
  use std::os::unix::process::ExitStatusExt;
  status
    .code()
    .or_else(|| status.signal().map(|s| 128 + s))
    .unwrap_or(1)
}

#[cfg(not(unix))]
fn exit_code(status: ExitStatus) -> i32 {
  status.code().unwrap_or(1)
}
