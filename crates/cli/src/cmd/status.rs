//! Status command implementation.
//!
//! Shows which target source trees exist under the workspace root and the
//! commit each one has checked out.

use anyhow::{Context, Result};
use owo_colors::{OwoColorize, Stream};

use workbench_lib::config::Config;
use workbench_lib::orchestrate::Orchestrator;
use workbench_lib::process::SystemRunner;

use crate::output::{OutputFormat, print_json, print_stat, symbols, truncate_hash};

pub fn cmd_status(config: Config, output: OutputFormat) -> Result<u8> {
  let orchestrator = Orchestrator::from_config(config, SystemRunner::default()).context("Failed to load targets")?;
  let state = orchestrator.status();

  if output.is_json() {
    print_json(&state)?;
    return Ok(0);
  }

  print_stat("Workspace", &state.root.display().to_string());
  println!();

  let width = state.targets.iter().map(|t| t.id.len()).max().unwrap_or(0);
  for target in &state.targets {
    if target.present {
      let revision = target.revision.as_deref().map(truncate_hash).unwrap_or("-");
      println!(
        "  {} {:width$}  {}",
        symbols::SUCCESS.if_supports_color(Stream::Stdout, |s| s.green()),
        target.id,
        revision
      );
    } else {
      println!(
        "  {} {:width$}  {}",
        symbols::INFO.if_supports_color(Stream::Stdout, |s| s.dimmed()),
        target.id,
        "not fetched".if_supports_color(Stream::Stdout, |s| s.dimmed())
      );
    }
  }

  Ok(0)
}
