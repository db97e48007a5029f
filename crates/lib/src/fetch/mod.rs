//! Source fetching.
//!
//! A target's source tree is cloned once. A non-empty directory at the target
//! path is never touched again; re-fetching requires a clean.

use std::fs;
use std::path::Path;

use serde::Serialize;
use tracing::{debug, info, warn};

use crate::process::{CommandLine, OutputSink, ProcessError, ProcessRunner};
use crate::registry::TargetSpec;
use crate::workspace::WorkspaceRoot;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum FetchOutcome {
  /// The source directory already existed and was left alone.
  AlreadyPresent,
  Cloned,
  /// Nothing to clone; the (empty) source directory was created.
  NotRequired,
  /// `reason` holds git's own output when git ran.
  Failed { reason: String },
}

impl FetchOutcome {
  pub fn is_ok(&self) -> bool {
    !matches!(self, FetchOutcome::Failed { .. })
  }
}

/// The `git clone` invocation for `spec` into `dest`, or `None` without a
/// repository.
pub fn clone_command(spec: &TargetSpec, dest: &Path) -> Option<CommandLine> {
  let url = spec.repository.as_ref()?;

  let mut args = vec!["clone".to_string()];
  if let Some(branch) = &spec.branch {
    args.push("--branch".to_string());
    args.push(branch.clone());
  }
  if let Some(depth) = spec.depth {
    args.push("--depth".to_string());
    args.push(depth.to_string());
  }
  args.push(url.clone());
  args.push(dest.to_string_lossy().into_owned());

  Some(CommandLine::new("git", args))
}

/// Make the source tree of `spec` available under `root`.
///
/// Only an interrupt is returned as an error; every other problem is a
/// [`FetchOutcome::Failed`].
pub async fn fetch(
  spec: &TargetSpec,
  root: &WorkspaceRoot,
  runner: &impl ProcessRunner,
  sink: &mut dyn OutputSink,
) -> Result<FetchOutcome, ProcessError> {
  let dest = root.source_path(spec);

  match fs::symlink_metadata(&dest) {
    Ok(meta) if meta.is_dir() => {
      if is_present(&dest) {
        debug!(id = %spec.id, path = %dest.display(), "source already present");
        return Ok(FetchOutcome::AlreadyPresent);
      }
    }
    Ok(_) => {
      let reason = format!("'{}' exists and is not a directory", dest.display());
      warn!(id = %spec.id, %reason, "fetch failed");
      return Ok(FetchOutcome::Failed { reason });
    }
    Err(_) => {}
  }

  let Some(command) = clone_command(spec, &dest) else {
    if let Err(e) = fs::create_dir_all(&dest) {
      return Ok(FetchOutcome::Failed {
        reason: format!("failed to create '{}': {e}", dest.display()),
      });
    }
    debug!(id = %spec.id, "no repository to clone");
    return Ok(FetchOutcome::NotRequired);
  };

  info!(id = %spec.id, url = spec.repository.as_deref().unwrap_or_default(), "cloning repository");

  match runner.run(&command, root.path(), sink).await {
    Ok(output) if output.success() => {
      info!(id = %spec.id, path = %dest.display(), "cloned");
      Ok(FetchOutcome::Cloned)
    }
    Ok(output) => {
      warn!(id = %spec.id, exit_code = output.exit_code, "git clone failed");
      let reason = if output.tail.is_empty() {
        format!("git clone exited with code {}", output.exit_code)
      } else {
        output.tail.join("\n")
      };
      Ok(FetchOutcome::Failed { reason })
    }
    Err(e @ ProcessError::Interrupted { .. }) => Err(e),
    Err(e) => {
      warn!(id = %spec.id, error = %e, "git clone could not run");
      Ok(FetchOutcome::Failed { reason: e.to_string() })
    }
  }
}

/// Whether `path` holds a source tree that a fetch would leave alone: a
/// directory with at least one entry. An empty directory is cloned into.
pub fn is_present(path: &Path) -> bool {
  fs::read_dir(path).is_ok_and(|mut entries| entries.next().is_some())
}

/// HEAD commit of the git checkout at `path`, if it is one.
pub fn head_revision(path: &Path) -> Option<String> {
  let repo = gix::open(path).ok()?;
  let id = repo.head_id().ok()?;
  Some(id.to_string())
}
