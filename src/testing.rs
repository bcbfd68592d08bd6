//! Fixtures shared by unit tests.

use std::{fs, path::PathBuf};

use tempfile::TempDir;

/// Writes an executable shell script named `name` into `dir`.
#[cfg(unix)]
pub fn script(dir: &TempDir, name: &str, body: &str) -> PathBuf {
  use std::os::unix::fs::PermissionsExt;

  let path = dir.path().join(name);
  fs::write(&path, format!("#!/bin/sh\n{body}\n")).unwrap();
  fs::set_permissions(&path, fs::Permissions::from_mode(0o755)).unwrap();

  path
}

/// Writes an empty test case descriptor named `name` into `dir`.
pub fn test_case(dir: &TempDir, name: &str) -> PathBuf {
  let path = dir.path().join(name);
  fs::write(&path, "{}").unwrap();

  path
}
