//! Configure and compile a fetched target.
//!
//! Commands run in the target's build directory, configure list first. The
//! first non-zero exit ends the stage, so a failed configure never reaches
//! compilation.

mod plan;

use std::fs;
use std::path::Path;

use serde::Serialize;
use tracing::{debug, info, warn};

use crate::consts::EXIT_SPAWN_FAILED;
use crate::process::{CommandLine, OutputSink, ProcessError, ProcessRunner};
use crate::registry::TargetSpec;
use crate::types::Stage;

pub use plan::{CommandPlan, CommandVars};

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum BuildOutcome {
  Succeeded,
  ConfigureFailed { exit_code: i32, tail: Vec<String> },
  CompileFailed { exit_code: i32, tail: Vec<String> },
}

impl BuildOutcome {
  /// The stage the outcome was decided in.
  pub fn stage(&self) -> Stage {
    match self {
      BuildOutcome::ConfigureFailed { .. } => Stage::Configure,
      BuildOutcome::Succeeded | BuildOutcome::CompileFailed { .. } => Stage::Build,
    }
  }
}

/// A failed command within a stage.
struct CommandFailure {
  exit_code: i32,
  tail: Vec<String>,
}

/// Run the configure then build commands of `plan`.
///
/// Only an interrupt is returned as an error. A command that cannot be
/// started fails its stage with exit code 127.
pub async fn build(
  spec: &TargetSpec,
  plan: &CommandPlan,
  runner: &impl ProcessRunner,
  sink: &mut dyn OutputSink,
) -> Result<BuildOutcome, ProcessError> {
  if let Err(e) = fs::create_dir_all(&plan.build_dir) {
    warn!(id = %spec.id, path = %plan.build_dir.display(), error = %e, "cannot create build directory");
    return Ok(BuildOutcome::ConfigureFailed {
      exit_code: 1,
      tail: vec![format!("failed to create '{}': {e}", plan.build_dir.display())],
    });
  }

  sink.stage(&spec.id, Stage::Configure);
  if let Some(failure) = run_all(&spec.id, &plan.configure, &plan.build_dir, runner, sink).await? {
    warn!(id = %spec.id, exit_code = failure.exit_code, "configure failed");
    return Ok(BuildOutcome::ConfigureFailed {
      exit_code: failure.exit_code,
      tail: failure.tail,
    });
  }

  sink.stage(&spec.id, Stage::Build);
  if let Some(failure) = run_all(&spec.id, &plan.compile, &plan.build_dir, runner, sink).await? {
    warn!(id = %spec.id, exit_code = failure.exit_code, "build failed");
    return Ok(BuildOutcome::CompileFailed {
      exit_code: failure.exit_code,
      tail: failure.tail,
    });
  }

  info!(id = %spec.id, "build succeeded");
  Ok(BuildOutcome::Succeeded)
}

async fn run_all(
  id: &str,
  commands: &[CommandLine],
  cwd: &Path,
  runner: &impl ProcessRunner,
  sink: &mut dyn OutputSink,
) -> Result<Option<CommandFailure>, ProcessError> {
  for command in commands {
    match runner.run(command, cwd, sink).await {
      Ok(output) if output.success() => {
        debug!(id, program = %command.program, "command succeeded");
      }
      Ok(output) => {
        return Ok(Some(CommandFailure {
          exit_code: output.exit_code,
          tail: output.tail,
        }));
      }
      Err(e @ ProcessError::Interrupted { .. }) => return Err(e),
      Err(e @ ProcessError::Spawn { .. }) => {
        return Ok(Some(CommandFailure {
          exit_code: EXIT_SPAWN_FAILED,
          tail: vec![e.to_string()],
        }));
      }
      Err(e) => {
        return Ok(Some(CommandFailure {
          exit_code: 1,
          tail: vec![e.to_string()],
        }));
      }
    }
  }
  Ok(None)
}

/// Declared outputs of `spec` that do not exist under `build_dir`.
pub fn missing_outputs(spec: &TargetSpec, build_dir: &Path) -> Vec<String> {
  spec
    .outputs
    .iter()
    .filter(|output| !build_dir.join(output).exists())
    .cloned()
    .collect()
}
