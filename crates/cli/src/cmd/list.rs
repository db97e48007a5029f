//! Implementation of the `wb list-targets` command.

use anyhow::{Context, Result};
use owo_colors::{OwoColorize, Stream};

use workbench_lib::config::Config;
use workbench_lib::orchestrate::Orchestrator;
use workbench_lib::process::SystemRunner;

use crate::output::{OutputFormat, print_json};

pub fn cmd_list_targets(config: Config, output: OutputFormat, verbose: bool) -> Result<u8> {
  let orchestrator = Orchestrator::from_config(config, SystemRunner::default()).context("Failed to load targets")?;
  let targets = orchestrator.list_targets();

  if output.is_json() {
    print_json(&targets)?;
    return Ok(0);
  }

  let width = targets.iter().map(|t| t.id.len()).max().unwrap_or(0);
  for target in targets {
    let description = target.description.as_deref().unwrap_or("");
    println!(
      "{:width$}  {}",
      target.id,
      description.if_supports_color(Stream::Stdout, |s| s.dimmed())
    );

    if verbose {
      let source = target.repository.as_deref().unwrap_or("(no repository)");
      println!("{:width$}  {}", "", source);
      if let Some(container) = &target.container {
        println!("{:width$}  container: {}", "", container.image);
      }
    }
  }

  Ok(0)
}
