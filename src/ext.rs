use std::{
  fs::File,
  io::{self, Read, Seek, SeekFrom},
  path::Path,
  process::{Child, ExitStatus},
  time::{Duration, Instant},
};

use anyhow::{Context, Result};
use wait_timeout::ChildExt as WaitExt;

#[extend::ext]
pub impl ExitStatus {
  /// `exit code 3`, or `signal 9` for a child that was killed.
  fn describe(&self) -> String {
    if let Some(code) = self.code() {
      return format!("exit code {code}");
    }

    #[cfg(unix)]
    {
      use std::os::unix::process::ExitStatusExt;

      if let Some(signal) = self.signal() {
        return format!("signal {signal}");
      }
    }

    self.to_string()
  }
}

#[extend::ext]
pub impl Child {
  /// Waits for the child to exit, checking every `interval`, until `deadline`.
  /// Returns `Ok(None)` if it is still running at the deadline.
  fn wait_until(&mut self, deadline: Instant, interval: Duration) -> io::Result<Option<ExitStatus>> {
    loop {
      let remaining = deadline.saturating_duration_since(Instant::now());
      if remaining.is_zero() {
        return Ok(None);
      }

      if let Some(status) = self.wait_timeout(interval.min(remaining))? {
        return Ok(Some(status));
      }
    }
  }

  /// Sends SIGKILL and waits for the child, so that it does not linger as a
  /// zombie.
  fn kill_and_reap(&mut self) -> io::Result<ExitStatus> {
    // an error here means it already exited; `wait` still has to reap it
    if let Err(err) = self.kill() {
      tracing::debug!("kill {}: {err}", self.id());
    }

    self.wait()
  }
}

#[extend::ext]
pub impl File {
  /// Reads back everything a child wrote into this file.
  fn read_captured(&mut self) -> Result<String> {
    self.seek(SeekFrom::Start(0)).context("seek")?;

    let mut bytes = Vec::new();
    self.read_to_end(&mut bytes).context("read")?;

    Ok(String::from_utf8_lossy(&bytes).into_owned())
  }
}

#[extend::ext]
pub impl Path {
  /// Whether this is a regular file that the current user may execute.
  fn is_executable(&self) -> bool {
    let Ok(metadata) = self.metadata() else {
      return false;
    };

    #[cfg(unix)]
    {
      use std::os::unix::fs::PermissionsExt;

      metadata.is_file() && metadata.permissions().mode() & 0o111 != 0
    }

    #[cfg(not(unix))]
    {
      metadata.is_file()
    }
  }
}
