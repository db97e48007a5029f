use std::path::{Path, PathBuf};

use serde::Serialize;

use crate::config::Config;
use crate::placeholder::{self, Placeholder, PlaceholderError, Resolver};
use crate::process::CommandLine;
use crate::registry::{RegistryError, TargetSpec};
use crate::workspace::{resolve_build_path, resolve_path};

/// Values available to `$${name}` placeholders in a target's commands.
#[derive(Debug, Clone)]
pub struct CommandVars {
  source: String,
  build: String,
  root: String,
  build_type: String,
  generator: String,
}

impl CommandVars {
  pub fn new(spec: &TargetSpec, config: &Config, root: &Path) -> Self {
    Self {
      source: resolve_path(root, spec).to_string_lossy().into_owned(),
      build: resolve_build_path(root, spec).to_string_lossy().into_owned(),
      root: root.to_string_lossy().into_owned(),
      build_type: config.build_type_for(&spec.id).to_string(),
      generator: config.generator_for(&spec.id).to_string(),
    }
  }
}

impl Resolver for CommandVars {
  fn resolve(&self, placeholder: Placeholder) -> Result<&str, PlaceholderError> {
    Ok(match placeholder {
      Placeholder::Source => &self.source,
      Placeholder::Build => &self.build,
      Placeholder::Root => &self.root,
      Placeholder::BuildType => &self.build_type,
      Placeholder::Generator => &self.generator,
    })
  }
}

/// The fully substituted commands of one target.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CommandPlan {
  pub source: PathBuf,
  pub build_dir: PathBuf,
  pub configure: Vec<CommandLine>,
  /// Build commands, the container launch last when the target has one.
  pub compile: Vec<CommandLine>,
}

impl CommandPlan {
  /// Resolve `spec` against `root` without touching the filesystem.
  pub fn for_target(spec: &TargetSpec, config: &Config, root: &Path) -> Result<Self, RegistryError> {
    let vars = CommandVars::new(spec, config, root);

    let configure = spec
      .configure
      .iter()
      .map(|argv| resolve_argv(spec, argv, &vars))
      .collect::<Result<Vec<_>, _>>()?;

    let mut compile = spec
      .build
      .iter()
      .map(|argv| resolve_argv(spec, argv, &vars))
      .collect::<Result<Vec<_>, _>>()?;

    if let Some(container) = &spec.container {
      compile.push(resolve_argv(spec, &container.command(&config.container_runtime), &vars)?);
    }

    Ok(Self {
      source: resolve_path(root, spec),
      build_dir: resolve_build_path(root, spec),
      configure,
      compile,
    })
  }
}

fn resolve_argv(spec: &TargetSpec, argv: &[String], vars: &CommandVars) -> Result<CommandLine, RegistryError> {
  let resolved = argv
    .iter()
    .map(|arg| {
      placeholder::substitute(arg, vars).map_err(|source| RegistryError::Placeholder {
        id: spec.id.clone(),
        arg: arg.clone(),
        source,
      })
    })
    .collect::<Result<Vec<_>, _>>()?;

  CommandLine::from_argv(&resolved).ok_or_else(|| RegistryError::InvalidTarget {
    id: spec.id.clone(),
    reason: "commands must have at least a program".to_string(),
  })
}
