use std::{
  path::Path,
  process::{Child, Command, ExitStatus, Stdio},
  time::{Duration, Instant},
};

use anyhow::{Context, Result};

use crate::ext::{ChildExt, ExitStatusExt, FileExt};

/// How often a running solver is checked for exit.
pub const POLL_INTERVAL: Duration = Duration::from_millis(10);

/// How a single solver run ended.
#[derive(Debug, Clone, PartialEq)]
pub enum Outcome {
  /// Exited with status zero. `elapsed` spans spawn to observed exit.
  Completed { elapsed: Duration, stdout: String },
  /// Exited non-zero, was killed by a signal (`code` is `None`), or could not
  /// be spawned at all.
  Failed { code: Option<i32>, stderr: String },
  /// Still running after `timeout` and killed.
  TimedOut { timeout: Duration },
}

impl Outcome {
  pub fn elapsed(&self) -> Option<Duration> {
    match self {
      Outcome::Completed { elapsed, .. } => Some(*elapsed),
      _ => None,
    }
  }

  /// The solution value printed by a completed run.
  pub fn solution(&self) -> Option<i64> {
    match self {
      Outcome::Completed { stdout, .. } => solution_value(stdout),
      _ => None,
    }
  }
}

/// A running child. Unless it has been observed to exit, it is killed and
/// reaped when dropped.
struct Supervised {
  child: Child,
  released: bool,
}

impl Supervised {
  fn new(child: Child) -> Self {
    Self { child, released: false }
  }

  fn wait_until(&mut self, deadline: Instant) -> Result<Option<ExitStatus>> {
    let status = self.child.wait_until(deadline, POLL_INTERVAL).context("wait")?;
    if status.is_some() {
      self.released = true;
    }

    Ok(status)
  }

  fn terminate(&mut self) {
    if self.released {
      return;
    }
    self.released = true;

    let pid = self.child.id();
    match self.child.kill_and_reap() {
      Ok(status) => tracing::debug!("terminated {pid}: {}", status.describe()),
      Err(err) => tracing::warn!("failed to reap killed process {pid}, it may have leaked: {err}"),
    }
  }
}

impl Drop for Supervised {
  fn drop(&mut self) {
    self.terminate();
  }
}

/// Runs `program test_case`, killing it once `timeout` has passed. Never
/// fails: problems spawning or waiting on the program are reported as
/// [`Outcome::Failed`] without an exit code.
pub fn execute(program: &Path, test_case: &Path, timeout: Duration) -> Outcome {
  supervise(program, test_case, timeout).unwrap_or_else(|err| Outcome::Failed {
    code: None,
    stderr: format!("{err:#}"),
  })
}

fn supervise(program: &Path, test_case: &Path, timeout: Duration) -> Result<Outcome> {
  // files rather than pipes, so a chatty solver never blocks on a full buffer
  let mut stdout = tempfile::tempfile().context("stdout tempfile")?;
  let mut stderr = tempfile::tempfile().context("stderr tempfile")?;

  let start = Instant::now();
  let child = Command::new(program)
    .arg(test_case)
    .stdin(Stdio::null())
    .stdout(stdout.try_clone().context("clone stdout")?)
    .stderr(stderr.try_clone().context("clone stderr")?)
    .spawn()
    .with_context(|| format!("spawn failed for {program:?}"))?;

  let mut child = Supervised::new(child);

  let Some(status) = child.wait_until(start + timeout)? else {
    child.terminate();

    return Ok(Outcome::TimedOut { timeout });
  };

  let elapsed = start.elapsed();

  if !status.success() {
    tracing::debug!("{program:?} exited with {}", status.describe());

    return Ok(Outcome::Failed {
      code: status.code(),
      stderr: stderr.read_captured().context("stderr")?,
    });
  }

  Ok(Outcome::Completed {
    elapsed,
    stdout: stdout.read_captured().context("stdout")?,
  })
}

/// The solution value a solver printed as the last token of its output, if
/// any.
pub fn solution_value(stdout: &str) -> Option<i64> {
  stdout.split_whitespace().next_back()?.parse().ok()
}
