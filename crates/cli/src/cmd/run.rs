//! Implementation of the `wb run` command.

use anyhow::{Context, Result};
use tracing::debug;

use workbench_lib::config::Config;
use workbench_lib::orchestrate::{Orchestrator, RunOptions, Selection};
use workbench_lib::process::{Interrupt, SystemRunner};

use crate::output::{OutputFormat, TerminalSink, print_json, print_plan, print_report};

/// Execute the run command.
///
/// Fetches and builds the selected target (or all of them) and prints a
/// summary. Returns the process exit code: the number of failed targets,
/// capped at 100, or 130 when interrupted.
pub fn cmd_run(target: &str, dry_run: bool, config: Config, output: OutputFormat) -> Result<u8> {
  let selection = Selection::parse(target);

  // Child I/O is driven on one thread; targets run sequentially.
  let rt = tokio::runtime::Builder::new_current_thread()
    .enable_all()
    .build()
    .context("Failed to create async runtime")?;

  let mut sink = TerminalSink::new(output);
  let report = rt.block_on(async {
    // One Ctrl-C listener for the whole invocation, shared by every child.
    let interrupt = if dry_run { Interrupt::default() } else { Interrupt::listen() };
    let runner = SystemRunner::new(config.tail_lines).with_interrupt(interrupt);
    let orchestrator = Orchestrator::from_config(config, runner).context("Failed to load targets")?;
    Ok::<_, anyhow::Error>(orchestrator.run(&selection, RunOptions { dry_run }, &mut sink).await?)
  })?;

  if output.is_json() {
    print_json(&report)?;
  } else if report.dry_run {
    print_plan(&report.planned);
  } else {
    print_report(&report);
  }

  let code = report.exit_code();
  debug!(code, "run exit code");
  Ok(u8::try_from(code).unwrap_or(u8::MAX))
}
