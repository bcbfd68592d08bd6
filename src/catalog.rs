use std::{
  fs,
  path::{Path, PathBuf},
};

use anyhow::{Context, Result};

use crate::error::ConfigError;

/// Extension of test case descriptors.
pub const EXTENSION: &str = "json";

const DELIMITER: char = '_';

/// A named integer embedded in a test case file name, found at a fixed token
/// position after splitting the file stem on `_`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KeyField {
  pub name: &'static str,
  pub position: usize,
}

/// `<prefix>_n_<n>_s_<s>_z_<z>.json`
const DEFAULT_FIELDS: &[KeyField] = &[
  KeyField { name: "n", position: 2 },
  KeyField { name: "s", position: 4 },
  KeyField { name: "z", position: 6 },
];

/// Declares which parameters make up a test case's sort key, in order of
/// significance.
#[derive(Debug, Clone, Copy)]
pub struct KeySchema {
  fields: &'static [KeyField],
}

impl Default for KeySchema {
  fn default() -> Self {
    Self::new(DEFAULT_FIELDS)
  }
}

impl KeySchema {
  pub const fn new(fields: &'static [KeyField]) -> Self {
    Self { fields }
  }

  pub fn fields(&self) -> &'static [KeyField] {
    self.fields
  }

  /// Parses the sort key out of `file_name`. The extension, if any, is not
  /// part of the last token.
  pub fn parse(&self, file_name: &str) -> Result<SortKey, ConfigError> {
    let stem = Path::new(file_name)
      .file_stem()
      .map(|stem| stem.to_string_lossy())
      .unwrap_or_default();
    let tokens: Vec<&str> = stem.split(DELIMITER).collect();

    let malformed = |reason: String| ConfigError::MalformedName {
      name: file_name.to_string(),
      reason,
    };

    self
      .fields
      .iter()
      .map(|field| {
        let token = tokens
          .get(field.position)
          .ok_or_else(|| malformed(format!("missing field `{}` at token {}", field.name, field.position)))?;

        token
          .parse::<u64>()
          .map_err(|_| malformed(format!("field `{}` is not an integer: {token:?}", field.name)))
      })
      .collect::<Result<Vec<_>, _>>()
      .map(SortKey)
  }
}

/// Parameters parsed from a test case name, compared lexicographically.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub struct SortKey(pub Vec<u64>);

#[derive(Debug, Clone)]
pub struct TestCase {
  pub path: PathBuf,
  /// Always present for cases loaded from a directory.
  pub key: Option<SortKey>,
}

impl TestCase {
  pub fn name(&self) -> String {
    self
      .path
      .file_name()
      .map(|name| name.to_string_lossy().into_owned())
      .unwrap_or_else(|| self.path.display().to_string())
  }
}

/// The ordered set of test cases benchmarked by one invocation.
#[derive(Debug)]
pub struct Catalog {
  name: String,
  schema: KeySchema,
  cases: Vec<TestCase>,
}

impl Catalog {
  /// Loads a single test case file, or every `.json` file in a directory
  /// ordered by sort key.
  ///
  /// # Errors
  ///
  /// This will return an error if:
  /// - `path` does not exist.
  /// - `path` is a directory without any test cases.
  /// - a file name in the directory does not match `schema`.
  pub fn load(path: &Path, schema: KeySchema) -> Result<Self> {
    if !path.exists() {
      return Err(ConfigError::MissingInput(path.to_path_buf()).into());
    }

    // directories keep dots in their name, files lose their extension
    let name = if path.is_dir() { path.file_name() } else { path.file_stem() }
      .map(|name| name.to_string_lossy().into_owned())
      .unwrap_or_else(|| "catalog".to_string());

    let cases = if path.is_dir() {
      Self::scan(path, schema)?
    } else {
      let key = path
        .file_name()
        .and_then(|name| schema.parse(&name.to_string_lossy()).ok());

      vec![TestCase {
        path: path.to_path_buf(),
        key,
      }]
    };

    Ok(Self { name, schema, cases })
  }

  fn scan(dir: &Path, schema: KeySchema) -> Result<Vec<TestCase>> {
    let mut paths = fs::read_dir(dir)
      .with_context(|| format!("read dir {dir:?}"))?
      .map(|entry| Ok(entry?.path()))
      .collect::<Result<Vec<PathBuf>>>()?;

    paths.retain(|path| path.is_file() && path.extension().is_some_and(|ext| ext == EXTENSION));

    if paths.is_empty() {
      return Err(
        ConfigError::EmptyCatalog {
          dir: dir.to_path_buf(),
          extension: EXTENSION,
        }
        .into(),
      );
    }

    // keys should be unique; sorting names first keeps ties deterministic
    paths.sort();

    let mut cases = paths
      .into_iter()
      .map(|path| {
        let name = path.file_name().unwrap_or_default().to_string_lossy().into_owned();
        let key = schema.parse(&name)?;

        Ok(TestCase { path, key: Some(key) })
      })
      .collect::<Result<Vec<_>, ConfigError>>()?;

    cases.sort_by(|a, b| a.key.cmp(&b.key));

    Ok(cases)
  }

  pub fn name(&self) -> &str {
    &self.name
  }

  pub fn schema(&self) -> KeySchema {
    self.schema
  }

  pub fn cases(&self) -> &[TestCase] {
    &self.cases
  }

  pub fn len(&self) -> usize {
    self.cases.len()
  }
}
