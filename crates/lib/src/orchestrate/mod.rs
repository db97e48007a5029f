//! Drives targets through fetch and build.
//!
//! Targets run one at a time in registration order. A failing target is
//! recorded and the batch moves on; an unknown target or an unusable workspace
//! root aborts before anything runs.

mod types;

use std::path::Path;
use std::time::{Duration, Instant};

use thiserror::Error;
use tracing::{debug, info, warn};

use crate::build::{self, BuildOutcome, CommandPlan};
use crate::config::{Config, ConfigError};
use crate::consts::EXIT_INTERRUPTED;
use crate::fetch::{self, FetchOutcome, clone_command};
use crate::process::{OutputSink, ProcessError, ProcessRunner};
use crate::registry::{RegistryError, TargetRegistry, TargetSpec, load_target_file};
use crate::types::Stage;
use crate::workspace::{self, CleanReport, LastBuild, WorkspaceError, WorkspaceRoot, WorkspaceState};

pub use types::{BuildResult, PlannedTarget, RunOptions, RunReport, Selection, TargetState};

#[derive(Debug, Error)]
pub enum OrchestrateError {
  #[error(transparent)]
  Registry(#[from] RegistryError),

  #[error(transparent)]
  Workspace(#[from] WorkspaceError),

  #[error(transparent)]
  Config(#[from] ConfigError),
}

/// Tracks one target's state and assembles its [`BuildResult`].
struct TargetRun<'a> {
  id: &'a str,
  state: TargetState,
  stage: Stage,
  started: Instant,
  fetch: Option<FetchOutcome>,
}

impl<'a> TargetRun<'a> {
  fn new(id: &'a str) -> Self {
    Self {
      id,
      state: TargetState::NotStarted,
      stage: Stage::Fetch,
      started: Instant::now(),
      fetch: None,
    }
  }

  fn advance(&mut self, next: TargetState) {
    debug_assert!(
      self.state.can_advance_to(next),
      "invalid transition {:?} -> {:?}",
      self.state,
      next
    );
    debug!(id = self.id, from = ?self.state, to = ?next, "target state");
    self.state = next;
  }

  fn finish(self, exit_code: Option<i32>, output_tail: Vec<String>, missing_outputs: Vec<String>) -> BuildResult {
    debug_assert!(self.state.is_terminal(), "{} finished in {:?}", self.id, self.state);
    BuildResult {
      target: self.id.to_string(),
      stage: self.stage,
      state: self.state,
      fetch: self.fetch,
      exit_code,
      duration: self.started.elapsed(),
      output_tail,
      missing_outputs,
      interrupted: false,
    }
  }

  fn interrupted(mut self, e: &ProcessError) -> BuildResult {
    self.advance(TargetState::Failed);
    let mut result = self.finish(Some(EXIT_INTERRUPTED), vec![e.to_string()], vec![]);
    result.interrupted = true;
    result
  }
}

pub struct Orchestrator<R: ProcessRunner> {
  registry: TargetRegistry,
  config: Config,
  runner: R,
}

impl<R: ProcessRunner> Orchestrator<R> {
  pub fn new(registry: TargetRegistry, config: Config, runner: R) -> Self {
    Self {
      registry,
      config,
      runner,
    }
  }

  /// Build the registry from the built-ins and the configured target file.
  pub fn from_config(config: Config, runner: R) -> Result<Self, OrchestrateError> {
    let registry = match &config.targets_file {
      Some(path) => TargetRegistry::with_file(&load_target_file(path)?)?,
      None => TargetRegistry::builtin(),
    };
    Ok(Self::new(registry, config, runner))
  }

  pub fn config(&self) -> &Config {
    &self.config
  }

  pub fn registry(&self) -> &TargetRegistry {
    &self.registry
  }

  /// Every registered target in registration order.
  pub fn list_targets(&self) -> &[TargetSpec] {
    self.registry.all()
  }

  fn select(&self, selection: &Selection) -> Result<Vec<&TargetSpec>, OrchestrateError> {
    match selection {
      Selection::All => Ok(self.registry.all().iter().collect()),
      Selection::One(id) => Ok(vec![self.registry.lookup(id)?]),
    }
  }

  /// Fetch and build the selected targets.
  pub async fn run(
    &self,
    selection: &Selection,
    options: RunOptions,
    sink: &mut dyn OutputSink,
  ) -> Result<RunReport, OrchestrateError> {
    if options.dry_run {
      return self.plan(selection);
    }

    let specs = self.select(selection)?;
    let root = workspace::ensure_root(&self.config.root)?;
    let mut state = WorkspaceState::scan(root.path(), &self.registry);

    info!(root = %root.path().display(), targets = specs.len(), "starting run");

    let mut report = RunReport::default();
    for spec in specs {
      if self.runner.interrupt_requested() {
        warn!(id = %spec.id, "interrupted, skipping remaining targets");
        report.interrupted = true;
        break;
      }

      let result = self.run_target(spec, &root, sink).await;

      if result.fetch.as_ref().is_some_and(FetchOutcome::is_ok) {
        state.mark_fetched(&spec.id);
      }
      state.record(
        &spec.id,
        if result.succeeded() {
          LastBuild::Succeeded
        } else {
          LastBuild::Failed
        },
      );

      let stop = result.interrupted;
      report.results.push(result);
      if stop {
        warn!(id = %spec.id, "interrupted, skipping remaining targets");
        report.interrupted = true;
        break;
      }
    }

    info!(
      succeeded = report.results.len() - report.failed_count(),
      failed = report.failed_count(),
      "run finished"
    );
    report.workspace = Some(state);
    Ok(report)
  }

  async fn run_target(&self, spec: &TargetSpec, root: &WorkspaceRoot, sink: &mut dyn OutputSink) -> BuildResult {
    let mut run = TargetRun::new(&spec.id);

    run.advance(TargetState::Fetching);
    sink.stage(&spec.id, Stage::Fetch);
    let outcome = match fetch::fetch(spec, root, &self.runner, sink).await {
      Ok(outcome) => outcome,
      Err(e) => return run.interrupted(&e),
    };
    run.fetch = Some(outcome.clone());

    if let FetchOutcome::Failed { reason } = outcome {
      run.advance(TargetState::FetchFailed);
      let tail = reason.lines().map(str::to_string).collect();
      return run.finish(None, tail, vec![]);
    }
    run.advance(TargetState::Fetched);

    run.stage = Stage::Configure;
    run.advance(TargetState::Building);
    let plan = match CommandPlan::for_target(spec, &self.config, root.path()) {
      Ok(plan) => plan,
      Err(e) => {
        warn!(id = %spec.id, error = %e, "cannot resolve commands");
        run.advance(TargetState::Failed);
        return run.finish(Some(1), vec![e.to_string()], vec![]);
      }
    };

    let outcome = match build::build(spec, &plan, &self.runner, sink).await {
      Ok(outcome) => outcome,
      Err(e) => return run.interrupted(&e),
    };
    run.stage = outcome.stage();

    match outcome {
      BuildOutcome::Succeeded => {
        run.advance(TargetState::Succeeded);
        let missing = build::missing_outputs(spec, &plan.build_dir);
        if !missing.is_empty() {
          warn!(id = %spec.id, missing = ?missing, "declared outputs not found after build");
        }
        run.finish(Some(0), vec![], missing)
      }
      BuildOutcome::ConfigureFailed { exit_code, tail } | BuildOutcome::CompileFailed { exit_code, tail } => {
        run.advance(TargetState::Failed);
        run.finish(Some(exit_code), tail, vec![])
      }
    }
  }

  /// Resolve the selected targets and their commands without side effects.
  ///
  /// Nothing is created under the root and no process is spawned.
  pub fn plan(&self, selection: &Selection) -> Result<RunReport, OrchestrateError> {
    let specs = self.select(selection)?;
    let root: &Path = &self.config.root;

    let planned = specs
      .into_iter()
      .map(|spec| -> Result<PlannedTarget, OrchestrateError> {
        let plan = CommandPlan::for_target(spec, &self.config, root)?;
        let present = fetch::is_present(&plan.source);
        Ok(PlannedTarget {
          target: spec.id.clone(),
          fetch: if present { None } else { clone_command(spec, &plan.source) },
          present,
          source: plan.source,
          build_dir: plan.build_dir,
          configure: plan.configure,
          compile: plan.compile,
        })
      })
      .collect::<Result<Vec<_>, _>>()?;

    Ok(RunReport {
      dry_run: true,
      planned,
      ..Default::default()
    })
  }

  /// Remove the whole workspace root.
  pub fn clean(&self) -> Result<CleanReport, OrchestrateError> {
    Ok(workspace::clean(&self.config.root)?)
  }

  /// Presence and HEAD revision of every target.
  pub fn status(&self) -> WorkspaceState {
    WorkspaceState::scan(&self.config.root, &self.registry)
  }
}

/// Total wall time of a report's results.
pub fn total_duration(report: &RunReport) -> Duration {
  report.results.iter().map(|r| r.duration).sum()
}
