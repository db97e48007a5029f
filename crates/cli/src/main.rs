mod cmd;
mod output;
mod prompts;

use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use workbench_lib::config::Config;

use crate::cmd::{cmd_clean, cmd_list_targets, cmd_run, cmd_status};
use crate::output::{OutputFormat, print_error};

/// wb - fetch, configure and build external source trees in one workspace
#[derive(Parser)]
#[command(name = "wb")]
#[command(author, version, about, long_about = None)]
struct Cli {
  /// Enable verbose output
  #[arg(short, long, global = true)]
  verbose: bool,

  /// Output format
  #[arg(short, long, global = true, value_enum, default_value_t = OutputFormat::Text)]
  output: OutputFormat,

  /// JSON file with additional targets (overrides WORKBENCH_TARGETS)
  #[arg(long, global = true)]
  targets: Option<PathBuf>,

  #[command(subcommand)]
  command: Commands,
}

#[derive(Subcommand)]
enum Commands {
  /// Fetch and build a target, or every target with `all`
  Run {
    /// Target identifier or `all`
    target: String,

    /// Print the commands without running anything
    #[arg(long)]
    dry_run: bool,
  },

  /// Delete the workspace root
  Clean {
    /// Skip the confirmation prompt
    #[arg(short, long)]
    force: bool,
  },

  /// List registered targets in build order
  ListTargets,

  /// Show which targets are present in the workspace
  Status,
}

fn init_tracing(verbose: bool) {
  let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(if verbose { "debug" } else { "warn" }));
  tracing_subscriber::fmt()
    .with_env_filter(filter)
    .with_writer(std::io::stderr)
    .without_time()
    .init();
}

fn load_config(targets: Option<PathBuf>) -> Result<Config> {
  let mut config = Config::from_env().context("Invalid configuration")?;
  if targets.is_some() {
    config.targets_file = targets;
  }
  Ok(config)
}

fn dispatch(cli: Cli) -> Result<u8> {
  let config = load_config(cli.targets)?;

  match cli.command {
    Commands::Run { target, dry_run } => cmd_run(&target, dry_run, config, cli.output),
    Commands::Clean { force } => cmd_clean(force, config, cli.output),
    Commands::ListTargets => cmd_list_targets(config, cli.output, cli.verbose),
    Commands::Status => cmd_status(config, cli.output),
  }
}

fn main() -> ExitCode {
  let cli = Cli::parse();
  init_tracing(cli.verbose);

  match dispatch(cli) {
    Ok(code) => ExitCode::from(code),
    Err(e) => {
      print_error(&format!("{e:#}"));
      ExitCode::FAILURE
    }
  }
}
