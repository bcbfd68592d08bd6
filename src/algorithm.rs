use std::{
  fmt,
  path::{Path, PathBuf},
};

use anyhow::Result;
use walkdir::WalkDir;

use crate::{error::ConfigError, ext::PathExt};

const SEPARATOR: char = '_';

/// An algorithm, independent of how it is executed. Declaration order is the
/// column order of every report.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Family {
  Greedy,
  Exact,
  Genetic,
  Brute,
}

impl Family {
  pub const ALL: [Family; 4] = [Family::Greedy, Family::Exact, Family::Genetic, Family::Brute];

  /// Families whose solutions are not guaranteed optimal, compared against
  /// [`Family::Exact`].
  pub const HEURISTIC: [Family; 2] = [Family::Greedy, Family::Genetic];

  pub fn name(self) -> &'static str {
    match self {
      Family::Greedy => "greedy",
      Family::Exact => "exact",
      Family::Genetic => "genetic",
      Family::Brute => "brute",
    }
  }

  pub fn from_token(token: &str) -> Option<Self> {
    Self::ALL.into_iter().find(|family| family.name() == token)
  }
}

impl fmt::Display for Family {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(self.name())
  }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Variant {
  Sequential,
  Parallel,
}

impl Variant {
  pub const ALL: [Variant; 2] = [Variant::Sequential, Variant::Parallel];

  /// Short tag used in executable names and report columns.
  pub fn tag(self) -> &'static str {
    match self {
      Variant::Sequential => "seq",
      Variant::Parallel => "par",
    }
  }

  pub fn from_token(token: &str) -> Option<Self> {
    match token {
      "seq" | "sequential" => Some(Variant::Sequential),
      "par" | "parallel" => Some(Variant::Parallel),
      _ => None,
    }
  }
}

impl fmt::Display for Variant {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(self.tag())
  }
}

/// Splits an executable's file name as `<family>_..._<variant>`. Returns
/// `None` for names of any other shape.
pub fn resolve(file_name: &str) -> Option<(Family, Variant)> {
  let mut tokens = file_name.split(SEPARATOR);
  let first = tokens.next()?;
  let last = tokens.next_back()?;

  Some((Family::from_token(first)?, Variant::from_token(last)?))
}

/// Validates the families requested on the command line. Unknown names are
/// dropped with a warning, and no names at all selects every family.
///
/// # Errors
///
/// This will return an error if none of `names` is a known family.
pub fn requested_families<S: AsRef<str>>(names: &[S]) -> Result<Vec<Family>, ConfigError> {
  if names.is_empty() {
    return Ok(Family::ALL.to_vec());
  }

  let mut families = Vec::new();
  for name in names {
    let name = name.as_ref();
    match Family::from_token(name) {
      Some(family) if !families.contains(&family) => families.push(family),
      Some(_) => {}
      None => tracing::warn!(
        "ignoring unknown algorithm family {name:?} (known: {})",
        Family::ALL.map(Family::name).join(", ")
      ),
    }
  }

  if families.is_empty() {
    return Err(ConfigError::NoRequestedFamilies);
  }

  families.sort();

  Ok(families)
}

/// A solver binary and the family/variant its name declares.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Executable {
  pub path: PathBuf,
  pub family: Family,
  pub variant: Variant,
}

impl Executable {
  pub fn name(&self) -> String {
    self
      .path
      .file_name()
      .map(|name| name.to_string_lossy().into_owned())
      .unwrap_or_default()
  }
}

/// Finds solver executables in `dir` and its immediate subdirectories (e.g.
/// `exec/sequential` and `exec/parallel`), ordered by path.
///
/// # Errors
///
/// This will return an error if `dir` does not exist.
pub fn discover(dir: &Path) -> Result<Vec<Executable>> {
  if !dir.is_dir() {
    return Err(ConfigError::MissingExecDir(dir.to_path_buf()).into());
  }

  let mut executables = Vec::new();
  for entry in WalkDir::new(dir).min_depth(1).max_depth(2) {
    let entry = match entry {
      Ok(entry) => entry,
      Err(err) => {
        tracing::warn!("error reading directory entry: {err}");
        continue;
      }
    };

    let path = entry.path();
    if !path.is_executable() {
      continue;
    }

    let name = entry.file_name().to_string_lossy();
    let Some((family, variant)) = resolve(&name) else {
      tracing::debug!("skipping {path:?}: not named <family>_<variant>");
      continue;
    };

    executables.push(Executable {
      path: path.to_path_buf(),
      family,
      variant,
    });
  }

  executables.sort_by(|a, b| a.path.cmp(&b.path));

  Ok(executables)
}
