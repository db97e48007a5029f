//! Implementation of the `wb clean` command.

use anyhow::{Context, Result};

use workbench_lib::config::Config;
use workbench_lib::orchestrate::{OrchestrateError, Orchestrator};
use workbench_lib::process::SystemRunner;
use workbench_lib::workspace::WorkspaceError;

use crate::output::{OutputFormat, print_error, print_info, print_json, print_stat, print_success};
use crate::prompts::confirm;

pub fn cmd_clean(force: bool, config: Config, output: OutputFormat) -> Result<u8> {
  let root = config.root.clone();

  if !root.exists() {
    if output.is_json() {
      print_json(&serde_json::json!({ "root": root, "existed": false, "removed": 0 }))?;
    } else {
      print_info(&format!("Nothing to clean at {}", root.display()));
    }
    return Ok(0);
  }

  if !confirm(&format!("Delete workspace root {} and everything in it?", root.display()), force)? {
    print_info("Aborted");
    return Ok(0);
  }

  let orchestrator = Orchestrator::new(Default::default(), config, SystemRunner::default());

  match orchestrator.clean() {
    Ok(report) => {
      if output.is_json() {
        print_json(&report)?;
      } else {
        print_success(&format!("Removed {}", report.root.display()));
        print_stat("Entries removed", &report.removed.to_string());
      }
      Ok(0)
    }
    Err(OrchestrateError::Workspace(WorkspaceError::CleanupFailed { failures, removed })) => {
      if output.is_json() {
        print_json(&serde_json::json!({ "root": root, "removed": removed, "failures": failures }))?;
      } else {
        for failure in &failures {
          print_error(&format!("Could not remove {}", failure));
        }
        print_stat("Entries removed", &removed.to_string());
        print_stat("Entries left", &failures.len().to_string());
      }
      Ok(1)
    }
    Err(e) => Err(e).context("Clean failed"),
  }
}
