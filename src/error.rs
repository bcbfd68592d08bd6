use std::path::PathBuf;

use thiserror::Error;

/// Errors that make a benchmark invocation unusable. These are raised before
/// any solver is executed.
#[derive(Error, Debug)]
pub enum ConfigError {
  #[error("input path {0:?} does not exist")]
  MissingInput(PathBuf),

  #[error("no {extension:?} test cases found in {dir:?}")]
  EmptyCatalog { dir: PathBuf, extension: &'static str },

  #[error("malformed test case name {name:?}: {reason}")]
  MalformedName { name: String, reason: String },

  #[error("none of the requested algorithm families are known")]
  NoRequestedFamilies,

  #[error("executable directory {0:?} does not exist")]
  MissingExecDir(PathBuf),

  #[error("timeout must be a positive number of seconds, got {0}")]
  InvalidTimeout(f64),
}
