use std::path::{Path, PathBuf};

use serde::Serialize;

use crate::fetch::head_revision;
use crate::registry::TargetRegistry;

use super::resolve_path;

/// Outcome of the most recent build in this invocation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum LastBuild {
  NeverBuilt,
  Succeeded,
  Failed,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TargetPresence {
  pub id: String,
  pub path: PathBuf,
  pub present: bool,
  pub last_build: LastBuild,
  /// HEAD commit when the source tree is a git checkout.
  #[serde(skip_serializing_if = "Option::is_none")]
  pub revision: Option<String>,
}

/// What the filesystem says about each registered target.
///
/// There is no state file: everything is derived from the directories under
/// the root, and build status only lives for one invocation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct WorkspaceState {
  pub root: PathBuf,
  pub targets: Vec<TargetPresence>,
}

impl WorkspaceState {
  pub fn scan(root: &Path, registry: &TargetRegistry) -> Self {
    let targets = registry
      .all()
      .iter()
      .map(|spec| {
        let path = resolve_path(root, spec);
        let present = path.is_dir();
        let revision = if present { head_revision(&path) } else { None };
        TargetPresence {
          id: spec.id.clone(),
          path,
          present,
          last_build: LastBuild::NeverBuilt,
          revision,
        }
      })
      .collect();

    Self {
      root: root.to_path_buf(),
      targets,
    }
  }

  pub fn get(&self, id: &str) -> Option<&TargetPresence> {
    self.targets.iter().find(|t| t.id == id)
  }

  /// Record a successful fetch: the source tree now exists. Unknown ids are
  /// ignored.
  pub fn mark_fetched(&mut self, id: &str) {
    if let Some(target) = self.targets.iter_mut().find(|t| t.id == id) {
      target.present = true;
      target.revision = head_revision(&target.path);
    }
  }

  /// Record a build outcome. Unknown ids are ignored.
  pub fn record(&mut self, id: &str, status: LastBuild) {
    if let Some(target) = self.targets.iter_mut().find(|t| t.id == id) {
      target.last_build = status;
      if status == LastBuild::Succeeded {
        target.present = true;
      }
    }
  }
}
