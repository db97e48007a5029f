use std::path::PathBuf;
use std::time::Duration;

use serde::{Serialize, Serializer};

use crate::consts::EXIT_INTERRUPTED;
use crate::fetch::FetchOutcome;
use crate::process::CommandLine;
use crate::types::Stage;
use crate::workspace::WorkspaceState;

/// Largest exit code derived from a failure count.
const MAX_FAILURE_EXIT: usize = 100;

/// Which targets an invocation covers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Selection {
  All,
  One(String),
}

impl Selection {
  pub fn parse(s: &str) -> Self {
    if s == "all" {
      Selection::All
    } else {
      Selection::One(s.to_string())
    }
  }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RunOptions {
  /// Resolve and print, run nothing.
  pub dry_run: bool,
}

/// Progress of one target through an invocation.
///
/// ```text
/// NotStarted -> Fetching -> Fetched -> Building -> Succeeded | Failed
///                        -> FetchFailed
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TargetState {
  NotStarted,
  Fetching,
  Fetched,
  Building,
  Succeeded,
  Failed,
  FetchFailed,
}

impl TargetState {
  pub fn can_advance_to(self, next: TargetState) -> bool {
    use TargetState::*;
    matches!(
      (self, next),
      (NotStarted, Fetching)
        | (Fetching, Fetched)
        | (Fetching, FetchFailed)
        | (Fetching, Failed)
        | (Fetched, Building)
        | (Building, Succeeded)
        | (Building, Failed)
    )
  }

  pub fn is_terminal(self) -> bool {
    matches!(self, TargetState::Succeeded | TargetState::Failed | TargetState::FetchFailed)
  }
}

fn serialize_secs<S: Serializer>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
  serializer.serialize_f64(duration.as_secs_f64())
}

/// Outcome of one target in one invocation.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BuildResult {
  pub target: String,
  /// Furthest stage reached.
  pub stage: Stage,
  pub state: TargetState,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub fetch: Option<FetchOutcome>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub exit_code: Option<i32>,
  #[serde(rename = "duration_secs", serialize_with = "serialize_secs")]
  pub duration: Duration,
  /// Last output lines, only kept on failure.
  #[serde(skip_serializing_if = "Vec::is_empty")]
  pub output_tail: Vec<String>,
  /// Declared outputs absent after a successful build.
  #[serde(skip_serializing_if = "Vec::is_empty")]
  pub missing_outputs: Vec<String>,
  /// Stopped by an interrupt rather than by the tool failing. A tool that
  /// exits 130 on its own leaves this unset.
  pub interrupted: bool,
}

impl BuildResult {
  pub fn succeeded(&self) -> bool {
    self.state == TargetState::Succeeded
  }
}

/// What a dry run would do for one target.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PlannedTarget {
  pub target: String,
  pub source: PathBuf,
  pub build_dir: PathBuf,
  /// The source directory already holds files, so no clone would run.
  pub present: bool,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub fetch: Option<CommandLine>,
  pub configure: Vec<CommandLine>,
  pub compile: Vec<CommandLine>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct RunReport {
  pub dry_run: bool,
  #[serde(skip_serializing_if = "Vec::is_empty")]
  pub results: Vec<BuildResult>,
  #[serde(skip_serializing_if = "Vec::is_empty")]
  pub planned: Vec<PlannedTarget>,
  /// The batch was stopped by an interrupt.
  pub interrupted: bool,
  #[serde(skip)]
  pub workspace: Option<WorkspaceState>,
}

impl RunReport {
  pub fn failed_count(&self) -> usize {
    self.results.iter().filter(|r| !r.succeeded()).count()
  }

  /// Process exit code: 130 after an interrupt, otherwise the number of
  /// failed targets capped at 100.
  pub fn exit_code(&self) -> i32 {
    if self.interrupted {
      return EXIT_INTERRUPTED;
    }
    self.failed_count().min(MAX_FAILURE_EXIT) as i32
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  fn result(target: &str, state: TargetState) -> BuildResult {
    BuildResult {
      target: target.to_string(),
      stage: Stage::Build,
      state,
      fetch: None,
      exit_code: None,
      duration: Duration::from_millis(1500),
      output_tail: vec![],
      missing_outputs: vec![],
      interrupted: false,
    }
  }

  #[test]
  fn selection_all_is_reserved() {
    assert_eq!(Selection::parse("all"), Selection::All);
    assert_eq!(Selection::parse("llvm"), Selection::One("llvm".to_string()));
  }

  #[test]
  fn state_machine_edges() {
    use TargetState::*;
    assert!(NotStarted.can_advance_to(Fetching));
    assert!(Fetching.can_advance_to(FetchFailed));
    assert!(Building.can_advance_to(Failed));
    assert!(!NotStarted.can_advance_to(Building));
    assert!(!FetchFailed.can_advance_to(Building));
    assert!(!Succeeded.can_advance_to(Failed));
    assert!(FetchFailed.is_terminal());
    assert!(!Fetched.is_terminal());
  }

  #[test]
  fn exit_code_counts_failures() {
    let mut report = RunReport {
      results: vec![
        result("a", TargetState::Succeeded),
        result("b", TargetState::Failed),
        result("c", TargetState::FetchFailed),
      ],
      ..Default::default()
    };
    assert_eq!(report.exit_code(), 2);

    report.results = (0..150).map(|i| result(&i.to_string(), TargetState::Failed)).collect();
    assert_eq!(report.exit_code(), 100);

    report.interrupted = true;
    assert_eq!(report.exit_code(), EXIT_INTERRUPTED);
  }

  #[test]
  fn result_serializes_duration_in_seconds() {
    let json = serde_json::to_value(result("a", TargetState::Succeeded)).unwrap();
    assert_eq!(json["duration_secs"], 1.5);
    assert_eq!(json["state"], "succeeded");
    assert!(json.get("output_tail").is_none());
  }
}
