//! Small shared types.

use std::fmt;

use serde::{Deserialize, Serialize};

/// The stage of a target's pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Stage {
  Fetch,
  Configure,
  Build,
}

impl Stage {
  pub fn as_str(self) -> &'static str {
    match self {
      Stage::Fetch => "fetch",
      Stage::Configure => "configure",
      Stage::Build => "build",
    }
  }
}

impl fmt::Display for Stage {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(self.as_str())
  }
}

/// Which pipe of a child process a line came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputStream {
  Stdout,
  Stderr,
}
