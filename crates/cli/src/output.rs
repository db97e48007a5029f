//! CLI output formatting utilities.
//!
//! Colored status lines, duration formatting, the terminal sink that shows
//! child output live, and the run summary.

use std::time::Duration;

use anyhow::Context;
use clap::ValueEnum;
use owo_colors::{OwoColorize, Stream};

use workbench_lib::orchestrate::{BuildResult, PlannedTarget, RunReport, TargetState};
use workbench_lib::process::{CommandLine, OutputSink};
use workbench_lib::types::{OutputStream, Stage};

#[derive(Debug, Clone, Copy, Default, ValueEnum)]
pub enum OutputFormat {
  #[default]
  Text,
  Json,
}

impl OutputFormat {
  pub fn is_json(self) -> bool {
    matches!(self, OutputFormat::Json)
  }
}

pub mod symbols {
  pub const SUCCESS: &str = "✓";
  pub const ERROR: &str = "✗";
  pub const WARNING: &str = "⚠";
  pub const INFO: &str = "•";
  pub const ARROW: &str = "→";
}

pub fn truncate_hash(hash: &str) -> &str {
  let len = hash.len().min(12);
  &hash[..len]
}

pub fn format_duration(duration: Duration) -> String {
  let secs = duration.as_secs();
  let millis = duration.subsec_millis();

  if secs >= 60 {
    let mins = secs / 60;
    let remaining_secs = secs % 60;
    format!("{}m {}s", mins, remaining_secs)
  } else if secs > 0 {
    format!("{}.{:02}s", secs, millis / 10)
  } else {
    format!("{}ms", millis)
  }
}

pub fn print_success(message: &str) {
  println!(
    "{} {}",
    symbols::SUCCESS.if_supports_color(Stream::Stdout, |s| s.green()),
    message
  );
}

pub fn print_error(message: &str) {
  eprintln!(
    "{} {}",
    symbols::ERROR.if_supports_color(Stream::Stderr, |s| s.red()),
    message.if_supports_color(Stream::Stderr, |s| s.red())
  );
}

pub fn print_warning(message: &str) {
  eprintln!(
    "{} {}",
    symbols::WARNING.if_supports_color(Stream::Stderr, |s| s.yellow()),
    message.if_supports_color(Stream::Stderr, |s| s.yellow())
  );
}

pub fn print_info(message: &str) {
  println!(
    "{} {}",
    symbols::INFO.if_supports_color(Stream::Stdout, |s| s.blue()),
    message
  );
}

pub fn print_stat(label: &str, value: &str) {
  println!(
    "  {}: {}",
    label.if_supports_color(Stream::Stdout, |s| s.dimmed()),
    value
  );
}

pub fn print_json<T: serde::Serialize>(value: &T) -> anyhow::Result<()> {
  let json = serde_json::to_string_pretty(value).context("Failed to serialize to JSON")?;
  println!("{}", json);
  Ok(())
}

/// Streams child output and progress to the terminal.
///
/// In JSON mode everything goes to stderr so stdout stays parseable.
pub struct TerminalSink {
  json: bool,
}

impl TerminalSink {
  pub fn new(format: OutputFormat) -> Self {
    Self { json: format.is_json() }
  }
}

impl OutputSink for TerminalSink {
  fn line(&mut self, stream: OutputStream, line: &str) {
    match stream {
      OutputStream::Stdout if !self.json => println!("{line}"),
      _ => eprintln!("{line}"),
    }
  }

  fn stage(&mut self, target: &str, stage: Stage) {
    eprintln!(
      "{} {} {}",
      symbols::ARROW.if_supports_color(Stream::Stderr, |s| s.cyan()),
      target.if_supports_color(Stream::Stderr, |s| s.bold()),
      stage
    );
  }

  fn command(&mut self, command: &CommandLine) {
    let rendered = format!("$ {command}");
    eprintln!("  {}", rendered.if_supports_color(Stream::Stderr, |s| s.dimmed()));
  }
}

fn print_tail(lines: &[String]) {
  for line in lines {
    eprintln!("    {}", line.if_supports_color(Stream::Stderr, |s| s.dimmed()));
  }
}

fn print_result(result: &BuildResult) {
  let elapsed = format_duration(result.duration);
  match result.state {
    TargetState::Succeeded => {
      print_success(&format!("{} ({elapsed})", result.target));
      if !result.missing_outputs.is_empty() {
        print_warning(&format!(
          "{}: declared outputs missing: {}",
          result.target,
          result.missing_outputs.join(", ")
        ));
      }
    }
    _ => {
      let exit = result
        .exit_code
        .map(|code| format!(", exit code {code}"))
        .unwrap_or_default();
      print_error(&format!("{} failed at {}{exit} ({elapsed})", result.target, result.stage));
      print_tail(&result.output_tail);
    }
  }
}

/// Per-target lines followed by totals.
pub fn print_report(report: &RunReport) {
  println!();
  for result in &report.results {
    print_result(result);
  }

  println!();
  let failed = report.failed_count();
  print_stat("Succeeded", &(report.results.len() - failed).to_string());
  print_stat("Failed", &failed.to_string());
  print_stat(
    "Duration",
    &format_duration(workbench_lib::orchestrate::total_duration(report)),
  );

  if report.interrupted {
    print_warning("Interrupted; remaining targets were skipped");
  }
}

/// The commands a dry run would execute.
pub fn print_plan(planned: &[PlannedTarget]) {
  print_info("Dry run - nothing will be fetched or built");
  for target in planned {
    println!();
    println!("{}", target.target.if_supports_color(Stream::Stdout, |s| s.bold()));
    print_stat("Source", &target.source.display().to_string());
    print_stat("Build", &target.build_dir.display().to_string());
    match &target.fetch {
      Some(clone) => println!("  {clone}"),
      None if target.present => println!("  # source already present"),
      None => println!("  # nothing to clone"),
    }
    for command in target.configure.iter().chain(target.compile.iter()) {
      println!("  {command}");
    }
  }
}
