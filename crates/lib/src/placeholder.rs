//! Placeholder parsing and substitution for command arguments.
//!
//! Target commands are registered before the workspace root, build type or
//! generator are known. Placeholders let an argument refer to those values and
//! get resolved right before the command runs (or is printed by a dry run).
//!
//! # Placeholder Formats
//!
//! - `$${source}` - the target's source tree
//! - `$${build}` - the target's build directory
//! - `$${root}` - the workspace root
//! - `$${build_type}` - configured build type (e.g. `Release`)
//! - `$${generator}` - configured build generator (e.g. `Ninja`)
//!
//! # Shell Variables
//!
//! Single `$` characters pass through unchanged, so `$HOME` inside an
//! `sh -c` argument works without escaping.
//!
//! # Escaping
//!
//! Use `$$$` before `{` to produce a literal `$${` sequence.
//!
//! # Example
//!
//! ```
//! use workbench_lib::placeholder::{parse, Segment, Placeholder};
//!
//! let segments = parse("-S$${source}/llvm").unwrap();
//! assert_eq!(segments, vec![
//!     Segment::Literal("-S".to_string()),
//!     Segment::Placeholder(Placeholder::Source),
//!     Segment::Literal("/llvm".to_string()),
//! ]);
//! ```

use std::fmt;

use thiserror::Error;

/// A parsed placeholder reference.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Placeholder {
  Source,
  Build,
  Root,
  BuildType,
  Generator,
}

impl Placeholder {
  pub fn name(self) -> &'static str {
    match self {
      Placeholder::Source => "source",
      Placeholder::Build => "build",
      Placeholder::Root => "root",
      Placeholder::BuildType => "build_type",
      Placeholder::Generator => "generator",
    }
  }
}

impl fmt::Display for Placeholder {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "$${{{}}}", self.name())
  }
}

/// A segment of parsed text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Segment {
  /// Literal text (no placeholders)
  Literal(String),

  /// A placeholder to be resolved
  Placeholder(Placeholder),
}

/// Errors that can occur during placeholder parsing or resolution.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PlaceholderError {
  #[error("unclosed placeholder at position {0}")]
  Unclosed(usize),

  #[error("unknown placeholder: {0}")]
  Unknown(String),

  #[error("unresolved placeholder: {0}")]
  Unresolved(Placeholder),
}

/// Trait for resolving placeholder values.
pub trait Resolver {
  fn resolve(&self, placeholder: Placeholder) -> Result<&str, PlaceholderError>;
}

/// Parse a string containing placeholders into segments.
///
/// # Errors
///
/// Returns an error if a placeholder is unclosed or names an unknown value.
pub fn parse(input: &str) -> Result<Vec<Segment>, PlaceholderError> {
  let mut segments = Vec::new();
  let mut literal = String::new();
  let mut chars = input.char_indices().peekable();

  while let Some((pos, ch)) = chars.next() {
    if ch != '$' {
      literal.push(ch);
      continue;
    }

    match chars.peek() {
      Some((_, '$')) => {
        chars.next();

        match chars.peek() {
          Some((_, '$')) => {
            chars.next();

            // $$${ is the escape for a literal $${
            if let Some((_, '{')) = chars.peek() {
              literal.push_str("$${");
              chars.next();
            } else {
              literal.push_str("$$$");
            }
          }
          Some((_, '{')) => {
            chars.next();

            if !literal.is_empty() {
              segments.push(Segment::Literal(std::mem::take(&mut literal)));
            }

            let mut name = String::new();
            let mut found_close = false;

            for (_, c) in chars.by_ref() {
              if c == '}' {
                found_close = true;
                break;
              }
              name.push(c);
            }

            if !found_close {
              return Err(PlaceholderError::Unclosed(pos));
            }

            segments.push(Segment::Placeholder(parse_name(&name)?));
          }
          _ => literal.push_str("$$"),
        }
      }
      _ => literal.push('$'),
    }
  }

  if !literal.is_empty() {
    segments.push(Segment::Literal(literal));
  }

  Ok(segments)
}

fn parse_name(name: &str) -> Result<Placeholder, PlaceholderError> {
  match name.trim() {
    "source" => Ok(Placeholder::Source),
    "build" => Ok(Placeholder::Build),
    "root" => Ok(Placeholder::Root),
    "build_type" => Ok(Placeholder::BuildType),
    "generator" => Ok(Placeholder::Generator),
    other => Err(PlaceholderError::Unknown(other.to_string())),
  }
}

/// Parse and substitute in one step.
pub fn substitute(input: &str, resolver: &impl Resolver) -> Result<String, PlaceholderError> {
  let segments = parse(input)?;
  substitute_segments(&segments, resolver)
}

/// Substitute placeholders in pre-parsed segments.
pub fn substitute_segments(segments: &[Segment], resolver: &impl Resolver) -> Result<String, PlaceholderError> {
  let mut result = String::new();

  for segment in segments {
    match segment {
      Segment::Literal(s) => result.push_str(s),
      Segment::Placeholder(p) => result.push_str(resolver.resolve(*p)?),
    }
  }

  Ok(result)
}
