//! JSON target files.
//!
//! ```json
//! {
//!   "extend_builtin": false,
//!   "targets": [
//!     { "id": "demo", "repository": "/srv/git/demo", "subdirectory": "demo",
//!       "configure": [["true"]], "build": [["false"]] }
//!   ]
//! }
//! ```

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::debug;

use super::{RegistryError, TargetSpec};

fn default_true() -> bool {
  true
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TargetFile {
  /// Keep the built-in targets ahead of the file's targets.
  #[serde(default = "default_true")]
  pub extend_builtin: bool,
  #[serde(default)]
  pub targets: Vec<TargetSpec>,
}

pub fn load_target_file(path: &Path) -> Result<TargetFile, RegistryError> {
  let content = fs::read_to_string(path).map_err(|source| RegistryError::ReadFile {
    path: path.to_path_buf(),
    source,
  })?;

  let file: TargetFile = serde_json::from_str(&content).map_err(|source| RegistryError::ParseFile {
    path: path.to_path_buf(),
    source,
  })?;

  debug!(path = %path.display(), targets = file.targets.len(), "loaded target file");
  Ok(file)
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::registry::TargetRegistry;
  use tempfile::TempDir;

  const DEMO_FILE: &str = r#"{
    "extend_builtin": false,
    "targets": [
      {
        "id": "demo",
        "repository": "/srv/git/demo",
        "subdirectory": "demo",
        "configure": [["true"]],
        "build": [["false"]],
        "outputs": ["bin/demo"]
      },
      {
        "id": "second",
        "subdirectory": "second",
        "build_dir": "out",
        "build": [["make", "-C", "$${source}"]]
      }
    ]
  }"#;

  #[test]
  fn parses_targets_with_defaults() {
    let temp = TempDir::new().unwrap();
    let path = temp.path().join("targets.json");
    fs::write(&path, DEMO_FILE).unwrap();

    let file = load_target_file(&path).unwrap();
    assert!(!file.extend_builtin);
    assert_eq!(file.targets.len(), 2);

    let demo = &file.targets[0];
    assert_eq!(demo.repository.as_deref(), Some("/srv/git/demo"));
    assert_eq!(demo.build_dir, "build");
    assert_eq!(demo.configure, vec![vec!["true".to_string()]]);
    assert_eq!(file.targets[1].build_dir, "out");
  }

  #[test]
  fn replace_builtin_registers_only_file_targets() {
    let file: TargetFile = serde_json::from_str(DEMO_FILE).unwrap();
    let registry = TargetRegistry::with_file(&file).unwrap();

    let ids: Vec<&str> = registry.all().iter().map(|t| t.id.as_str()).collect();
    assert_eq!(ids, vec!["demo", "second"]);
  }

  #[test]
  fn extend_builtin_appends_after_builtins() {
    let file: TargetFile = serde_json::from_str(r#"{ "targets": [{ "id": "demo", "subdirectory": "demo" }] }"#).unwrap();
    let registry = TargetRegistry::with_file(&file).unwrap();

    assert_eq!(registry.all().last().unwrap().id, "demo");
    assert_eq!(registry.all()[0].id, "llvm");
  }

  #[test]
  fn missing_file_names_the_path() {
    let err = load_target_file(Path::new("/nonexistent/targets.json")).unwrap_err();
    assert!(err.to_string().contains("/nonexistent/targets.json"));
  }

  #[test]
  fn malformed_file_is_a_parse_error() {
    let temp = TempDir::new().unwrap();
    let path = temp.path().join("targets.json");
    fs::write(&path, r#"{ "targets": [{ "id": "x" }] }"#).unwrap();

    assert!(matches!(load_target_file(&path), Err(RegistryError::ParseFile { .. })));
  }
}
