//! Invocation configuration.
//!
//! All settings are resolved once into a [`Config`] value that is passed to
//! every stage, so two configurations (e.g. two test roots) never share state.

use std::collections::BTreeMap;
use std::path::PathBuf;

use thiserror::Error;
use tracing::debug;

use crate::consts::{
  DEFAULT_BUILD_TYPE, DEFAULT_CONTAINER_RUNTIME, DEFAULT_GENERATOR, DEFAULT_TAIL_LINES, ENV_BUILD_TYPE,
  ENV_CONTAINER_RUNTIME, ENV_GENERATOR, ENV_ROOT, ENV_TAIL_LINES, ENV_TARGETS,
};
use crate::platform::paths::default_workspace_root;

#[derive(Debug, Error)]
pub enum ConfigError {
  #[error("no workspace root: set WORKBENCH_ROOT or HOME")]
  NoRoot,

  #[error("invalid value for {var}: '{value}' ({reason})")]
  InvalidValue {
    var: String,
    value: String,
    reason: String,
  },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
  /// Directory holding every target's source and build trees.
  pub root: PathBuf,
  pub build_type: String,
  pub generator: String,
  pub container_runtime: String,
  /// Lines of child output kept for failure reports.
  pub tail_lines: usize,
  /// Optional JSON file with extra target definitions.
  pub targets_file: Option<PathBuf>,
  /// Per-target build type overrides, keyed by target id.
  pub build_type_overrides: BTreeMap<String, String>,
  /// Per-target generator overrides, keyed by target id.
  pub generator_overrides: BTreeMap<String, String>,
}

impl Config {
  /// Configuration with defaults rooted at `root`.
  pub fn new(root: impl Into<PathBuf>) -> Self {
    Self {
      root: root.into(),
      build_type: DEFAULT_BUILD_TYPE.to_string(),
      generator: DEFAULT_GENERATOR.to_string(),
      container_runtime: DEFAULT_CONTAINER_RUNTIME.to_string(),
      tail_lines: DEFAULT_TAIL_LINES,
      targets_file: None,
      build_type_overrides: BTreeMap::new(),
      generator_overrides: BTreeMap::new(),
    }
  }

  /// Resolve configuration from the process environment.
  ///
  /// Unrelated variables that are not valid UTF-8 are skipped; one this
  /// configuration reads is an error.
  pub fn from_env() -> Result<Self, ConfigError> {
    let mut vars = Vec::new();
    for (key, value) in std::env::vars_os() {
      let Ok(key) = key.into_string() else {
        continue;
      };
      match value.into_string() {
        Ok(value) => vars.push((key, value)),
        Err(raw) if is_recognized(&key) => {
          return Err(ConfigError::InvalidValue {
            var: key,
            value: raw.to_string_lossy().into_owned(),
            reason: "not valid UTF-8".to_string(),
          });
        }
        Err(_) => {}
      }
    }
    Self::from_vars(vars)
  }

  /// Resolve configuration from an explicit set of variables.
  pub fn from_vars<I, K, V>(vars: I) -> Result<Self, ConfigError>
  where
    I: IntoIterator<Item = (K, V)>,
    K: Into<String>,
    V: Into<String>,
  {
    let vars: BTreeMap<String, String> = vars
      .into_iter()
      .map(|(k, v)| (k.into(), v.into()))
      .filter(|(_, v)| !v.is_empty())
      .collect();

    let root = match vars.get(ENV_ROOT) {
      Some(root) => PathBuf::from(root),
      None => default_workspace_root().ok_or(ConfigError::NoRoot)?,
    };

    let mut config = Config::new(root);

    if let Some(v) = vars.get(ENV_BUILD_TYPE).or_else(|| vars.get("CMAKE_BUILD_TYPE")) {
      config.build_type = v.clone();
    }
    if let Some(v) = vars.get(ENV_GENERATOR).or_else(|| vars.get("CMAKE_GENERATOR")) {
      config.generator = v.clone();
    }
    if let Some(v) = vars.get(ENV_CONTAINER_RUNTIME) {
      config.container_runtime = v.clone();
    }
    if let Some(v) = vars.get(ENV_TAIL_LINES) {
      config.tail_lines = v
        .parse::<usize>()
        .ok()
        .filter(|n| *n > 0)
        .ok_or_else(|| ConfigError::InvalidValue {
          var: ENV_TAIL_LINES.to_string(),
          value: v.clone(),
          reason: "expected a positive integer".to_string(),
        })?;
    }
    if let Some(v) = vars.get(ENV_TARGETS) {
      config.targets_file = Some(PathBuf::from(v));
    }

    config.build_type_overrides = collect_overrides(&vars, ENV_BUILD_TYPE);
    config.generator_overrides = collect_overrides(&vars, ENV_GENERATOR);

    debug!(root = %config.root.display(), build_type = %config.build_type, generator = %config.generator, "resolved config");
    Ok(config)
  }

  /// Build type for a target, honoring `WORKBENCH_BUILD_TYPE_<ID>`.
  pub fn build_type_for(&self, target: &str) -> &str {
    self
      .build_type_overrides
      .get(&override_key(target))
      .unwrap_or(&self.build_type)
  }

  /// Generator for a target, honoring `WORKBENCH_GENERATOR_<ID>`.
  pub fn generator_for(&self, target: &str) -> &str {
    self
      .generator_overrides
      .get(&override_key(target))
      .unwrap_or(&self.generator)
  }
}

/// Variables that feed into a [`Config`].
fn is_recognized(key: &str) -> bool {
  key.starts_with("WORKBENCH_") || key == "CMAKE_BUILD_TYPE" || key == "CMAKE_GENERATOR"
}

/// Normalized key for per-target variables: `triton-server` -> `TRITON_SERVER`.
fn override_key(target: &str) -> String {
  target
    .chars()
    .map(|c| if c.is_ascii_alphanumeric() { c.to_ascii_uppercase() } else { '_' })
    .collect()
}

fn collect_overrides(vars: &BTreeMap<String, String>, prefix: &str) -> BTreeMap<String, String> {
  let prefix = format!("{prefix}_");
  vars
    .iter()
    .filter_map(|(k, v)| k.strip_prefix(&prefix).map(|id| (id.to_string(), v.clone())))
    .collect()
}
