//! Workspace root management.
//!
//! The workspace root holds one source tree per target, each with its build
//! directory inside. Path resolution is pure; only [`ensure_root`] and
//! [`clean`] touch the filesystem.

mod state;

use std::fmt;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use serde::Serialize;
use thiserror::Error;
use tracing::{debug, info, warn};
use walkdir::WalkDir;

use crate::registry::TargetSpec;

pub use state::{LastBuild, TargetPresence, WorkspaceState};

const PROBE_FILE: &str = ".workbench-probe";

/// A path that could not be removed during cleanup.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CleanupFailure {
  pub path: PathBuf,
  pub message: String,
}

impl fmt::Display for CleanupFailure {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "{}: {}", self.path.display(), self.message)
  }
}

#[derive(Debug, Error)]
pub enum WorkspaceError {
  #[error("workspace root '{path}' is not writable: {source}")]
  Unwritable {
    path: PathBuf,
    #[source]
    source: io::Error,
  },

  #[error("failed to remove {} path(s) under the workspace root (first: {})", .failures.len(), first_failure(.failures))]
  CleanupFailed {
    failures: Vec<CleanupFailure>,
    removed: usize,
  },
}

fn first_failure(failures: &[CleanupFailure]) -> String {
  failures.first().map(|f| f.to_string()).unwrap_or_default()
}

/// Source tree of `spec` under `root`.
pub fn resolve_path(root: &Path, spec: &TargetSpec) -> PathBuf {
  root.join(&spec.subdirectory)
}

/// Build directory of `spec` under `root`.
pub fn resolve_build_path(root: &Path, spec: &TargetSpec) -> PathBuf {
  resolve_path(root, spec).join(&spec.build_dir)
}

/// A workspace root that exists and accepted a write.
///
/// Only [`ensure_root`] creates one, so holding it means the stages may write
/// below it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkspaceRoot {
  path: PathBuf,
}

impl WorkspaceRoot {
  pub fn path(&self) -> &Path {
    &self.path
  }

  pub fn source_path(&self, spec: &TargetSpec) -> PathBuf {
    resolve_path(&self.path, spec)
  }

  pub fn build_path(&self, spec: &TargetSpec) -> PathBuf {
    resolve_build_path(&self.path, spec)
  }
}

/// Create `root` (recursively) and check it can be written to.
pub fn ensure_root(root: &Path) -> Result<WorkspaceRoot, WorkspaceError> {
  let unwritable = |source: io::Error| WorkspaceError::Unwritable {
    path: root.to_path_buf(),
    source,
  };

  fs::create_dir_all(root).map_err(unwritable)?;

  let probe = root.join(PROBE_FILE);
  fs::write(&probe, b"").map_err(unwritable)?;
  fs::remove_file(&probe).map_err(unwritable)?;

  let path = dunce::canonicalize(root).map_err(unwritable)?;
  debug!(root = %path.display(), "workspace root ready");
  Ok(WorkspaceRoot { path })
}

/// Filesystem removal used by [`clean_with`].
pub trait Remover {
  fn remove_file(&self, path: &Path) -> io::Result<()>;
  fn remove_dir(&self, path: &Path) -> io::Result<()>;
}

/// Removes entries from the real filesystem.
#[derive(Debug, Default, Clone, Copy)]
pub struct FsRemover;

impl Remover for FsRemover {
  fn remove_file(&self, path: &Path) -> io::Result<()> {
    fs::remove_file(path)
  }

  fn remove_dir(&self, path: &Path) -> io::Result<()> {
    fs::remove_dir(path)
  }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CleanReport {
  pub root: PathBuf,
  /// Whether there was anything to clean.
  pub existed: bool,
  /// Files and directories removed, the root included.
  pub removed: usize,
}

/// Recursively delete `root`.
pub fn clean(root: &Path) -> Result<CleanReport, WorkspaceError> {
  clean_with(root, &FsRemover)
}

/// Recursively delete `root`, best effort.
///
/// Entries are removed contents-first. A failure does not stop the walk:
/// every remaining entry is still attempted and every failed path is reported
/// in [`WorkspaceError::CleanupFailed`]. Directories left non-empty by a failed
/// child are not reported a second time.
pub fn clean_with(root: &Path, remover: &impl Remover) -> Result<CleanReport, WorkspaceError> {
  if fs::symlink_metadata(root).is_err() {
    debug!(root = %root.display(), "nothing to clean");
    return Ok(CleanReport {
      root: root.to_path_buf(),
      existed: false,
      removed: 0,
    });
  }

  info!(root = %root.display(), "cleaning workspace");

  let mut failures: Vec<CleanupFailure> = Vec::new();
  let mut removed = 0;

  for entry in WalkDir::new(root).contents_first(true) {
    let entry = match entry {
      Ok(entry) => entry,
      Err(e) => {
        let path = e.path().unwrap_or(root).to_path_buf();
        warn!(path = %path.display(), error = %e, "cannot read directory entry");
        failures.push(CleanupFailure {
          path,
          message: e.to_string(),
        });
        continue;
      }
    };

    let path = entry.path();
    let is_dir = entry.file_type().is_dir();

    if is_dir && failures.iter().any(|f| f.path.starts_with(path)) {
      continue;
    }

    let result = if is_dir {
      remover.remove_dir(path)
    } else {
      remover.remove_file(path)
    };

    match result {
      Ok(()) => removed += 1,
      Err(e) => {
        warn!(path = %path.display(), error = %e, "failed to remove");
        failures.push(CleanupFailure {
          path: path.to_path_buf(),
          message: e.to_string(),
        });
      }
    }
  }

  if failures.is_empty() {
    info!(root = %root.display(), removed, "workspace cleaned");
    Ok(CleanReport {
      root: root.to_path_buf(),
      existed: true,
      removed,
    })
  } else {
    Err(WorkspaceError::CleanupFailed { failures, removed })
  }
}
