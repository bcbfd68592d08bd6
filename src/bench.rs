use std::{
  collections::{BTreeMap, HashSet},
  io::Write,
  path::{Path, PathBuf},
  time::Duration,
};

use anyhow::{Context, Result};

use crate::{
  algorithm::{self, Executable, Family, Variant},
  catalog::{Catalog, KeySchema, TestCase},
  error::ConfigError,
  format,
  run::{self, Outcome},
  stats::{ResultMatrix, SpeedupRow},
};

/// Name of the key field results are grouped by.
const VERTICES: &str = "n";

/// Parses a timeout given in (possibly fractional) seconds.
pub fn parse_timeout(secs: &str) -> Result<Duration> {
  let secs: f64 = secs.trim().parse().with_context(|| format!("invalid timeout {secs:?}"))?;

  Duration::try_from_secs_f64(secs)
    .ok()
    .filter(|timeout| !timeout.is_zero())
    .ok_or_else(|| ConfigError::InvalidTimeout(secs).into())
}

pub struct Bench {
  catalog: Catalog,
  /// Solvers of the requested families, in path order.
  executables: Vec<Executable>,
  timeout: Duration,
  /// Elapsed times collected so far.
  pub matrix: ResultMatrix,
}

impl Bench {
  /// Loads the test cases in `input` and the solvers of the requested
  /// `families` in `exec_dir`. Nothing is executed yet.
  pub fn new<S: AsRef<str>>(input: &Path, families: &[S], exec_dir: &Path, timeout: Duration) -> Result<Self> {
    let catalog = Catalog::load(input, KeySchema::default()).context("catalog")?;
    let requested = algorithm::requested_families(families)?;

    let executables: Vec<Executable> = algorithm::discover(exec_dir)
      .context("discover")?
      .into_iter()
      .filter(|exe| requested.contains(&exe.family))
      .collect();

    let mut seen = HashSet::new();
    for exe in &executables {
      if !seen.insert((exe.family, exe.variant)) {
        tracing::warn!(
          "{:?} is another {}_{} solver, only the last one run is reported",
          exe.path,
          exe.family,
          exe.variant
        );
      }
    }

    if executables.is_empty() {
      tracing::warn!("no solvers of the requested families found in {exec_dir:?}");
    }

    tracing::info!(
      "benchmarking {} test cases with {} solvers ({})",
      catalog.len(),
      executables.len(),
      requested.iter().map(|family| family.name()).collect::<Vec<_>>().join(", ")
    );

    let matrix = ResultMatrix::new(catalog.len());

    Ok(Self {
      catalog,
      executables,
      timeout,
      matrix,
    })
  }

  /// Runs every solver on every test case, one at a time and in catalog
  /// order. Individual runs may fail or time out, which leaves their cell in
  /// the matrix absent.
  pub fn bench(&mut self) {
    let Self {
      catalog,
      executables,
      timeout,
      matrix,
    } = self;

    for (index, case) in catalog.cases().iter().enumerate() {
      tracing::info!("processing test case {}", case.name());

      for exe in executables.iter() {
        tracing::info!("  running {}", exe.name());

        let outcome = run::execute(&exe.path, &case.path, *timeout);
        log_outcome(exe, case, &outcome);

        matrix.record(exe.family, exe.variant, index, &outcome);
      }

      log_case(matrix, &matrix.speedup_row(index), catalog);
    }
  }

  /// Mean speedup of every family over the test cases where both of its
  /// variants completed, skipping infinite ratios.
  pub fn mean_speedups(&self) -> BTreeMap<Family, (f64, usize)> {
    let mut sums: BTreeMap<Family, (f64, usize)> = BTreeMap::new();
    for row in self.matrix.speedup_rows() {
      for (family, speedup) in row.speedups {
        if let Some(speedup) = speedup.filter(|speedup| speedup.ratio.is_finite()) {
          let (sum, count) = sums.entry(family).or_default();
          *sum += speedup.ratio;
          *count += 1;
        }
      }
    }

    sums
      .into_iter()
      .map(|(family, (sum, count))| (family, (sum / count as f64, count)))
      .collect()
  }

  /// Mean of `value` over the test cases sharing a vertex count `n`, per
  /// family. Cases without a sort key or a value are skipped.
  fn mean_by_vertices<F>(&self, value: F) -> BTreeMap<(u64, Family), (f64, usize)>
  where
    F: Fn(Family, usize) -> Option<f64>,
  {
    let Some(position) = self.catalog.schema().fields().iter().position(|field| field.name == VERTICES) else {
      return BTreeMap::new();
    };

    let mut sums: BTreeMap<(u64, Family), (f64, usize)> = BTreeMap::new();
    for (index, case) in self.catalog.cases().iter().enumerate() {
      let Some(&vertices) = case.key.as_ref().and_then(|key| key.0.get(position)) else {
        continue;
      };

      for family in Family::ALL {
        if let Some(value) = value(family, index) {
          let (sum, count) = sums.entry((vertices, family)).or_default();
          *sum += value;
          *count += 1;
        }
      }
    }

    sums
      .into_iter()
      .map(|(key, (sum, count))| (key, (sum / count as f64, count)))
      .collect()
  }

  /// Mean sequential time in seconds per vertex count and family.
  pub fn mean_times_by_vertices(&self) -> BTreeMap<(u64, Family), (f64, usize)> {
    self.mean_by_vertices(|family, index| {
      self
        .matrix
        .get(family, Variant::Sequential, index)
        .map(|time| time.as_secs_f64())
    })
  }

  /// Mean accuracy against the exact solver per vertex count and heuristic
  /// family, over the test cases the exact solver solved.
  pub fn mean_accuracies_by_vertices(&self) -> BTreeMap<(u64, Family), (f64, usize)> {
    self.mean_by_vertices(|family, index| {
      Family::HEURISTIC
        .contains(&family)
        .then(|| self.matrix.compute_accuracy(family, index))
        .flatten()
    })
  }

  pub fn catalog(&self) -> &Catalog {
    &self.catalog
  }

  pub fn report(&self) -> Result<String> {
    format::format_report(&self.catalog, &self.matrix)
  }

  /// Writes the report into `dir`, named after the catalog.
  pub fn emit(&self, dir: &Path) -> Result<PathBuf> {
    format::emit(&self.catalog, &self.matrix, dir, self.catalog.name())
  }

  /// Prints the report to `out`, then writes it into `dir`. The results
  /// are printed even when `dir` cannot be written.
  pub fn publish<W: Write>(&self, out: &mut W, dir: &Path) -> Result<PathBuf> {
    let report = self.report().context("report")?;
    out.write_all(report.as_bytes()).context("print")?;
    out.flush().context("print")?;

    self.emit(dir).context("emit")
  }
}

/// Runs a single `program` on every test case in `input`, in catalog order.
pub fn run_program(program: &Path, input: &Path, timeout: Duration) -> Result<(Catalog, Vec<Outcome>)> {
  let catalog = Catalog::load(input, KeySchema::default()).context("catalog")?;

  let outcomes = catalog
    .cases()
    .iter()
    .map(|case| {
      tracing::info!("running {program:?} on {}", case.name());
      run::execute(program, &case.path, timeout)
    })
    .collect();

  Ok((catalog, outcomes))
}

fn log_outcome(exe: &Executable, case: &TestCase, outcome: &Outcome) {
  let (program, case) = (exe.name(), case.name());

  match outcome {
    Outcome::Completed { elapsed, stdout } => {
      tracing::info!("{program} on {case}: {:.4}s", elapsed.as_secs_f64());
      if let Some(value) = run::solution_value(stdout) {
        tracing::debug!("{program} on {case}: solution value {value}");
      }
    }
    Outcome::Failed { code: Some(code), stderr } => {
      tracing::warn!("{program} failed on {case} with exit code {code}: {}", stderr.trim());
    }
    Outcome::Failed { code: None, stderr } => {
      tracing::warn!("{program} failed on {case}: {}", stderr.trim());
    }
    Outcome::TimedOut { timeout } => {
      tracing::warn!("{program} timed out on {case} after {:.1}s", timeout.as_secs_f64());
    }
  }
}

fn log_case(matrix: &ResultMatrix, row: &SpeedupRow, catalog: &Catalog) {
  let case = catalog.cases()[row.index].name();

  for (family, speedup) in &row.speedups {
    let Some(speedup) = speedup else {
      continue;
    };

    tracing::info!(
      "speedup of {family}_{} over {family}_{} on {case}: {:.4}s / {:.4}s = {:.2}",
      Variant::Parallel,
      Variant::Sequential,
      speedup.seq.as_secs_f64(),
      speedup.par.as_secs_f64(),
      speedup.ratio
    );
  }

  for family in Family::HEURISTIC {
    if let Some(accuracy) = matrix.compute_accuracy(family, row.index) {
      tracing::info!("accuracy of {family} against {} on {case}: {accuracy:.3}", Family::Exact);
    }
  }
}
