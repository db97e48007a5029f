//! Target registry.
//!
//! A target is one external project that can be fetched and built. The
//! registry keeps targets in registration order, which is also the order a
//! batch (`run all`) processes them in.

mod builtin;
mod file;

use std::collections::HashSet;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::consts::{DEFAULT_BUILD_DIR, DEFAULT_CONTAINER_RUNTIME};
use crate::placeholder::{self, PlaceholderError};

pub use builtin::builtin_targets;
pub use file::{TargetFile, load_target_file};

#[derive(Debug, Error)]
pub enum RegistryError {
  #[error("unknown target '{0}'")]
  UnknownTarget(String),

  #[error("target '{0}' is already registered")]
  Duplicate(String),

  #[error("invalid target '{id}': {reason}")]
  InvalidTarget { id: String, reason: String },

  #[error("invalid placeholder in target '{id}' argument '{arg}': {source}")]
  Placeholder {
    id: String,
    arg: String,
    #[source]
    source: PlaceholderError,
  },

  #[error("failed to read target file '{path}': {source}")]
  ReadFile {
    path: PathBuf,
    #[source]
    source: std::io::Error,
  },

  #[error("failed to parse target file '{path}': {source}")]
  ParseFile {
    path: PathBuf,
    #[source]
    source: serde_json::Error,
  },
}

/// A container launched as the final build command of a target.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContainerSpec {
  pub image: String,
  /// `(host, container)` port bindings.
  #[serde(default)]
  pub ports: Vec<(u16, u16)>,
  /// `(host path, container path)` mounts. Host paths may use placeholders.
  #[serde(default)]
  pub volumes: Vec<(String, String)>,
  /// Runtime flags placed before the image, e.g. `--gpus=all`.
  #[serde(default)]
  pub run_args: Vec<String>,
  /// Command and arguments passed to the image.
  #[serde(default)]
  pub args: Vec<String>,
}

impl ContainerSpec {
  /// The argument list for `<runtime> run ...`.
  pub fn command(&self, runtime: &str) -> Vec<String> {
    let mut argv = vec![runtime.to_string(), "run".to_string(), "--rm".to_string()];
    argv.extend(self.run_args.iter().cloned());
    for (host, container) in &self.ports {
      argv.push("-p".to_string());
      argv.push(format!("{host}:{container}"));
    }
    for (host, container) in &self.volumes {
      argv.push("-v".to_string());
      argv.push(format!("{host}:{container}"));
    }
    argv.push(self.image.clone());
    argv.extend(self.args.iter().cloned());
    argv
  }
}

fn default_build_dir() -> String {
  DEFAULT_BUILD_DIR.to_string()
}

/// Description of one buildable target.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TargetSpec {
  pub id: String,
  /// Git URL or local path to clone. `None` for targets with nothing to fetch.
  #[serde(default)]
  pub repository: Option<String>,
  /// Directory name under the workspace root.
  pub subdirectory: String,
  /// Build directory, relative to the source tree.
  #[serde(default = "default_build_dir")]
  pub build_dir: String,
  #[serde(default)]
  pub branch: Option<String>,
  /// Shallow clone depth.
  #[serde(default)]
  pub depth: Option<u32>,
  #[serde(default)]
  pub configure: Vec<Vec<String>>,
  #[serde(default)]
  pub build: Vec<Vec<String>>,
  #[serde(default)]
  pub container: Option<ContainerSpec>,
  /// Binaries expected under the build directory after a successful build.
  #[serde(default)]
  pub outputs: Vec<String>,
  #[serde(default)]
  pub description: Option<String>,
}

impl TargetSpec {
  pub fn new(id: impl Into<String>, subdirectory: impl Into<String>) -> Self {
    Self {
      id: id.into(),
      repository: None,
      subdirectory: subdirectory.into(),
      build_dir: default_build_dir(),
      branch: None,
      depth: None,
      configure: Vec::new(),
      build: Vec::new(),
      container: None,
      outputs: Vec::new(),
      description: None,
    }
  }

  pub fn repository(mut self, url: impl Into<String>) -> Self {
    self.repository = Some(url.into());
    self
  }

  pub fn shallow(mut self, depth: u32) -> Self {
    self.depth = Some(depth);
    self
  }

  pub fn configure<I, S>(mut self, argv: I) -> Self
  where
    I: IntoIterator<Item = S>,
    S: Into<String>,
  {
    self.configure.push(argv.into_iter().map(Into::into).collect());
    self
  }

  pub fn build<I, S>(mut self, argv: I) -> Self
  where
    I: IntoIterator<Item = S>,
    S: Into<String>,
  {
    self.build.push(argv.into_iter().map(Into::into).collect());
    self
  }

  pub fn container(mut self, container: ContainerSpec) -> Self {
    self.container = Some(container);
    self
  }

  pub fn outputs<I, S>(mut self, outputs: I) -> Self
  where
    I: IntoIterator<Item = S>,
    S: Into<String>,
  {
    self.outputs = outputs.into_iter().map(Into::into).collect();
    self
  }

  pub fn describe(mut self, description: impl Into<String>) -> Self {
    self.description = Some(description.into());
    self
  }

  /// Check the spec is usable before it enters a registry.
  pub fn validate(&self) -> Result<(), RegistryError> {
    let invalid = |reason: &str| RegistryError::InvalidTarget {
      id: self.id.clone(),
      reason: reason.to_string(),
    };

    if self.id.is_empty() || self.id == "all" {
      return Err(invalid("identifier must be non-empty and not 'all'"));
    }
    if !is_plain_relative(&self.subdirectory) {
      return Err(invalid("subdirectory must be a single relative path component"));
    }
    if self.build_dir.is_empty() || self.build_dir.starts_with('/') || self.build_dir.split('/').any(|c| c == "..") {
      return Err(invalid("build directory must be relative to the source tree"));
    }
    if self.configure.iter().chain(self.build.iter()).any(|argv| argv.is_empty()) {
      return Err(invalid("commands must have at least a program"));
    }

    // The same argv the build substitutes.
    let container_argv = self
      .container
      .as_ref()
      .map(|c| c.command(DEFAULT_CONTAINER_RUNTIME))
      .unwrap_or_default();

    for arg in self.configure.iter().chain(self.build.iter()).flatten().chain(&container_argv) {
      placeholder::parse(arg).map_err(|source| RegistryError::Placeholder {
        id: self.id.clone(),
        arg: arg.clone(),
        source,
      })?;
    }

    Ok(())
  }
}

fn is_plain_relative(name: &str) -> bool {
  !name.is_empty() && name != "." && name != ".." && !name.contains('/') && !name.contains('\\')
}

/// Ordered, duplicate-free set of targets.
#[derive(Debug, Clone, Default)]
pub struct TargetRegistry {
  targets: Vec<TargetSpec>,
}

impl TargetRegistry {
  pub fn new() -> Self {
    Self::default()
  }

  /// Registry holding the built-in targets.
  pub fn builtin() -> Self {
    let mut registry = Self::new();
    for spec in builtin_targets() {
      if let Err(err) = registry.register(spec) {
        tracing::error!(error = %err, "skipping invalid built-in target");
      }
    }
    registry
  }

  /// Built-ins extended (or replaced) by the targets in `file`.
  pub fn with_file(file: &TargetFile) -> Result<Self, RegistryError> {
    let mut registry = if file.extend_builtin { Self::builtin() } else { Self::new() };
    for spec in &file.targets {
      registry.register(spec.clone())?;
    }
    Ok(registry)
  }

  pub fn register(&mut self, spec: TargetSpec) -> Result<(), RegistryError> {
    spec.validate()?;
    if self.targets.iter().any(|t| t.id == spec.id) {
      return Err(RegistryError::Duplicate(spec.id));
    }
    let subdirs: HashSet<&str> = self.targets.iter().map(|t| t.subdirectory.as_str()).collect();
    if subdirs.contains(spec.subdirectory.as_str()) {
      return Err(RegistryError::InvalidTarget {
        id: spec.id,
        reason: "subdirectory is already used by another target".to_string(),
      });
    }
    self.targets.push(spec);
    Ok(())
  }

  pub fn lookup(&self, id: &str) -> Result<&TargetSpec, RegistryError> {
    self
      .targets
      .iter()
      .find(|t| t.id == id)
      .ok_or_else(|| RegistryError::UnknownTarget(id.to_string()))
  }

  /// All targets in registration order.
  pub fn all(&self) -> &[TargetSpec] {
    &self.targets
  }

  pub fn len(&self) -> usize {
    self.targets.len()
  }

  pub fn is_empty(&self) -> bool {
    self.targets.is_empty()
  }
}
