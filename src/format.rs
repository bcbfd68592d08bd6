use std::{
  fmt::Write as _,
  fs::{self, OpenOptions},
  io::{self, Write as _},
  path::{Path, PathBuf},
  time::Duration,
};

use anyhow::{Context, Result};

use crate::{
  algorithm::{Family, Variant},
  catalog::{Catalog, TestCase},
  run::Outcome,
  stats::ResultMatrix,
};

const COLUMN_WIDTH: usize = 14;
const COLUMN_PADDING: &str = "  ";

/// Rendered in place of any value that could not be measured.
pub const NOT_AVAILABLE: &str = "n/a";

pub const REPORT_EXTENSION: &str = "txt";

fn format_time(time: Option<Duration>) -> String {
  time.map_or_else(|| NOT_AVAILABLE.to_string(), |time| format!("{:.6}", time.as_secs_f64()))
}

fn format_params(case: &TestCase, count: usize) -> impl Iterator<Item = String> + '_ {
  (0..count).map(move |i| {
    case
      .key
      .as_ref()
      .and_then(|key| key.0.get(i))
      .map_or_else(|| NOT_AVAILABLE.to_string(), u64::to_string)
  })
}

fn format_ratio(ratio: Option<f64>) -> String {
  ratio.map_or_else(|| NOT_AVAILABLE.to_string(), |ratio| format!("{ratio:.3}"))
}

/// Lays `rows` out in fixed-width columns, each as wide as its widest cell.
/// The first column is left-aligned, every other column is right-aligned and
/// at least `COLUMN_WIDTH` wide.
fn format_table(rows: &[Vec<String>]) -> Result<String> {
  let count = rows.iter().map(Vec::len).max().unwrap_or_default();
  let widths: Vec<usize> = (0..count)
    .map(|i| {
      let widest = rows.iter().filter_map(|row| row.get(i)).map(String::len).max();
      let min = if i == 0 { 0 } else { COLUMN_WIDTH };
      widest.unwrap_or_default().max(min)
    })
    .collect();

  let mut table = String::new();
  for row in rows {
    let line = row
      .iter()
      .zip(&widths)
      .enumerate()
      .map(|(i, (col, &width))| match i {
        0 => format!("{col:<width$}"),
        _ => format!("{col:>width$}"),
      })
      .collect::<Vec<_>>()
      .join(COLUMN_PADDING);

    writeln!(table, "{}", line.trim_end())?;
  }

  Ok(table)
}

fn header<I: IntoIterator<Item = String>>(catalog: &Catalog, results: I) -> Vec<String> {
  std::iter::once("test_case".to_string())
    .chain(catalog.schema().fields().iter().map(|field| field.name.to_string()))
    .chain(results)
    .collect()
}

/// `<family>_seq_t`, `<family>_par_t`, `<family>_speedup` for every known
/// family, whichever families actually ran, then `<family>_accuracy` for
/// every heuristic family.
pub fn result_columns() -> Vec<String> {
  Family::ALL
    .into_iter()
    .flat_map(|family| {
      Variant::ALL
        .map(|variant| format!("{family}_{variant}_t"))
        .into_iter()
        .chain([format!("{family}_speedup")])
    })
    .chain(Family::HEURISTIC.map(|family| format!("{family}_accuracy")))
    .collect()
}

/// Formats `matrix` as a whitespace separated table with one row per test
/// case of `catalog`.
pub fn format_report(catalog: &Catalog, matrix: &ResultMatrix) -> Result<String> {
  let fields = catalog.schema().fields().len();
  let mut rows = vec![header(catalog, result_columns())];

  for (index, case) in catalog.cases().iter().enumerate() {
    let times = Family::ALL.into_iter().flat_map(|family| {
      [
        format_time(matrix.get(family, Variant::Sequential, index)),
        format_time(matrix.get(family, Variant::Parallel, index)),
        format_ratio(matrix.compute_speedup(family, index).map(|speedup| speedup.ratio)),
      ]
    });
    let accuracies = Family::HEURISTIC
      .into_iter()
      .map(|family| format_ratio(matrix.compute_accuracy(family, index)));

    let row = std::iter::once(case.name())
      .chain(format_params(case, fields))
      .chain(times)
      .chain(accuracies);
    rows.push(row.collect());
  }

  format_table(&rows)
}

/// Formats the outcome of a single solver on every test case, with its
/// elapsed time and the solution value it printed.
pub fn format_runs(catalog: &Catalog, outcomes: &[Outcome]) -> Result<String> {
  let fields = catalog.schema().fields().len();
  let mut rows = vec![header(catalog, ["time".to_string(), "solution".to_string()])];

  for (case, outcome) in catalog.cases().iter().zip(outcomes) {
    let result = match outcome {
      Outcome::Completed { elapsed, .. } => [
        format_time(Some(*elapsed)),
        outcome
          .solution()
          .map_or_else(|| NOT_AVAILABLE.to_string(), |value| value.to_string()),
      ],
      Outcome::Failed { code: Some(code), .. } => [NOT_AVAILABLE.to_string(), format!("exit:{code}")],
      Outcome::Failed { code: None, .. } => [NOT_AVAILABLE.to_string(), "failed".to_string()],
      Outcome::TimedOut { .. } => [NOT_AVAILABLE.to_string(), "timeout".to_string()],
    };

    let row = std::iter::once(case.name())
      .chain(format_params(case, fields))
      .chain(result);
    rows.push(row.collect());
  }

  format_table(&rows)
}

/// Writes the report for `matrix` to `<dir>/<name>.txt`. An existing report is
/// never touched: the first free name of `<name>_1.txt`, `<name>_2.txt`, ...
/// is used instead.
pub fn emit(catalog: &Catalog, matrix: &ResultMatrix, dir: &Path, name: &str) -> Result<PathBuf> {
  let report = format_report(catalog, matrix).context("format")?;

  fs::create_dir_all(dir).with_context(|| format!("create_dir {dir:?}"))?;

  let mut suffix = 0usize;
  let (path, mut file) = loop {
    let path = match suffix {
      0 => dir.join(format!("{name}.{REPORT_EXTENSION}")),
      n => dir.join(format!("{name}_{n}.{REPORT_EXTENSION}")),
    };

    match OpenOptions::new().write(true).create_new(true).open(&path) {
      Ok(file) => break (path, file),
      Err(err) if err.kind() == io::ErrorKind::AlreadyExists => suffix += 1,
      Err(err) => return Err(err).with_context(|| format!("create {path:?}")),
    }
  };

  file
    .write_all(report.as_bytes())
    .with_context(|| format!("write {path:?}"))?;

  Ok(path)
}

#[cfg(test)]
mod tests {
  use tempfile::TempDir;

  use super::*;
  use crate::{catalog::KeySchema, testing::test_case};

  fn catalog(dir: &TempDir, names: &[&str]) -> Catalog {
    for name in names {
      test_case(dir, name);
    }

    Catalog::load(dir.path(), KeySchema::default()).unwrap()
  }

  fn columns(line: &str) -> Vec<&str> {
    line.split_whitespace().collect()
  }

  /// Byte offsets just past every cell of `line`.
  fn cell_ends(line: &str) -> Vec<usize> {
    let bytes = line.as_bytes();
    (0..bytes.len())
      .filter(|&i| bytes[i] != b' ' && bytes.get(i + 1).map_or(true, |next| *next == b' '))
      .map(|i| i + 1)
      .collect()
  }

  fn assert_aligned(table: &str) {
    let lines: Vec<&str> = table.lines().collect();
    let header = cell_ends(lines[0]);

    for line in &lines[1..] {
      // the first column is left-aligned, every other one ends where its header does
      assert_eq!(&cell_ends(line)[1..], &header[1..], "\n{}\n{line}", lines[0]);
      assert_eq!(line.len(), lines[0].len());
    }
  }

  #[test]
  fn header_lists_every_family() {
    let dir = TempDir::new().unwrap();
    let catalog = catalog(&dir, &["t_n_5_s_1_z_0.json"]);

    let report = format_report(&catalog, &ResultMatrix::new(1)).unwrap();
    let header = report.lines().next().unwrap();

    assert_eq!(
      columns(header),
      vec![
        "test_case",
        "n",
        "s",
        "z",
        "greedy_seq_t",
        "greedy_par_t",
        "greedy_speedup",
        "exact_seq_t",
        "exact_par_t",
        "exact_speedup",
        "genetic_seq_t",
        "genetic_par_t",
        "genetic_speedup",
        "brute_seq_t",
        "brute_par_t",
        "brute_speedup",
        "greedy_accuracy",
        "genetic_accuracy",
      ]
    );
  }

  #[test]
  fn unrun_families_are_not_available() {
    let dir = TempDir::new().unwrap();
    let catalog = catalog(&dir, &["t_n_5_s_1_z_0.json", "t_n_6_s_2_z_0.json"]);
    let mut matrix = ResultMatrix::new(2);
    matrix.set(Family::Greedy, Variant::Sequential, 0, Some(Duration::from_secs(3)));
    matrix.set(Family::Greedy, Variant::Parallel, 0, Some(Duration::from_millis(1500)));

    let report = format_report(&catalog, &matrix).unwrap();
    let rows: Vec<Vec<&str>> = report.lines().map(columns).collect();

    assert_eq!(rows.len(), 3);
    assert!(rows.iter().all(|row| row.len() == 18));

    assert_eq!(&rows[1][..7], &["t_n_5_s_1_z_0.json", "5", "1", "0", "3.000000", "1.500000", "2.000"]);
    assert!(rows[1][7..].iter().all(|col| *col == NOT_AVAILABLE));
    assert!(rows[2][4..].iter().all(|col| *col == NOT_AVAILABLE));
  }

  #[test]
  fn infinite_speedup_is_rendered() {
    let dir = TempDir::new().unwrap();
    let catalog = catalog(&dir, &["t_n_5_s_1_z_0.json"]);
    let mut matrix = ResultMatrix::new(1);
    matrix.set(Family::Brute, Variant::Sequential, 0, Some(Duration::from_secs(1)));
    matrix.set(Family::Brute, Variant::Parallel, 0, Some(Duration::ZERO));

    let report = format_report(&catalog, &matrix).unwrap();
    let row = columns(report.lines().nth(1).unwrap());

    assert_eq!(&row[13..16], &["1.000000", "0.000000", "inf"]);
  }

  #[test]
  fn single_file_without_key_has_placeholder_parameters() {
    let dir = TempDir::new().unwrap();
    let path = test_case(&dir, "custom.json");
    let catalog = Catalog::load(&path, KeySchema::default()).unwrap();

    let report = format_report(&catalog, &ResultMatrix::new(1)).unwrap();
    let row = columns(report.lines().nth(1).unwrap());

    assert_eq!(&row[..4], &["custom.json", NOT_AVAILABLE, NOT_AVAILABLE, NOT_AVAILABLE]);
  }

  #[test]
  fn run_table_shows_solution_or_status() {
    let dir = TempDir::new().unwrap();
    let catalog = catalog(&dir, &["t_n_1_s_1_z_0.json", "t_n_2_s_1_z_0.json", "t_n_3_s_1_z_0.json"]);
    let outcomes = [
      Outcome::Completed {
        elapsed: Duration::from_millis(250),
        stdout: "0 2 1\n9\n".to_string(),
      },
      Outcome::Failed {
        code: Some(4),
        stderr: String::new(),
      },
      Outcome::TimedOut {
        timeout: Duration::from_secs(20),
      },
    ];

    let table = format_runs(&catalog, &outcomes).unwrap();
    let rows: Vec<Vec<&str>> = table.lines().map(columns).collect();

    assert_eq!(rows[0], vec!["test_case", "n", "s", "z", "time", "solution"]);
    assert_eq!(&rows[1][4..], &["0.250000", "9"]);
    assert_eq!(&rows[2][4..], &[NOT_AVAILABLE, "exit:4"]);
    assert_eq!(&rows[3][4..], &[NOT_AVAILABLE, "timeout"]);
  }

  #[test]
  fn report_columns_line_up_with_header() {
    let dir = TempDir::new().unwrap();
    let catalog = catalog(&dir, &["t_n_5_s_1_z_0.json", "t_n_1000_s_20_z_3_with_a_longer_name.json"]);
    let mut matrix = ResultMatrix::new(2);
    for family in Family::ALL {
      matrix.set(family, Variant::Sequential, 0, Some(Duration::from_secs(12345)));
      matrix.set(family, Variant::Parallel, 0, Some(Duration::ZERO));
    }
    matrix.set_solution(Family::Exact, Variant::Sequential, 0, Some(4));
    matrix.set_solution(Family::Genetic, Variant::Sequential, 0, Some(5));

    let report = format_report(&catalog, &matrix).unwrap();

    assert!(report.contains("genetic_speedup"));
    assert_aligned(&report);
  }

  #[test]
  fn run_table_columns_line_up_with_header() {
    let dir = TempDir::new().unwrap();
    let catalog = catalog(&dir, &["t_n_5_s_1_z_0.json", "t_n_10_s_1_z_0.json"]);
    let outcomes = [
      Outcome::Completed {
        elapsed: Duration::from_secs(3),
        stdout: "123456789012345678\n".to_string(),
      },
      Outcome::Failed {
        code: None,
        stderr: String::new(),
      },
    ];

    assert_aligned(&format_runs(&catalog, &outcomes).unwrap());
  }

  #[test]
  fn heuristic_accuracy_is_reported_against_exact() {
    let dir = TempDir::new().unwrap();
    let catalog = catalog(&dir, &["t_n_5_s_1_z_0.json", "t_n_6_s_1_z_0.json"]);
    let mut matrix = ResultMatrix::new(2);
    matrix.set_solution(Family::Exact, Variant::Sequential, 0, Some(8));
    matrix.set_solution(Family::Greedy, Variant::Parallel, 0, Some(10));
    matrix.set_solution(Family::Greedy, Variant::Sequential, 1, Some(10));

    let report = format_report(&catalog, &matrix).unwrap();
    let rows: Vec<Vec<&str>> = report.lines().map(columns).collect();

    assert_eq!(&rows[0][16..], &["greedy_accuracy", "genetic_accuracy"]);
    assert_eq!(&rows[1][16..], &["1.250", NOT_AVAILABLE]);
    assert_eq!(&rows[2][16..], &[NOT_AVAILABLE, NOT_AVAILABLE]);
  }

  #[test]
  fn emit_never_overwrites() {
    let dir = TempDir::new().unwrap();
    let inputs = TempDir::new().unwrap();
    let catalog = catalog(&inputs, &["t_n_5_s_1_z_0.json"]);
    let reports = dir.path().join("reports");

    let mut matrix = ResultMatrix::new(1);
    let first = emit(&catalog, &matrix, &reports, "a_few").unwrap();
    let first_content = fs::read_to_string(&first).unwrap();

    matrix.set(Family::Exact, Variant::Sequential, 0, Some(Duration::from_secs(2)));
    let second = emit(&catalog, &matrix, &reports, "a_few").unwrap();
    let third = emit(&catalog, &matrix, &reports, "a_few").unwrap();

    assert_eq!(first, reports.join("a_few.txt"));
    assert_eq!(second, reports.join("a_few_1.txt"));
    assert_eq!(third, reports.join("a_few_2.txt"));
    assert_eq!(fs::read_to_string(&first).unwrap(), first_content);
    assert_ne!(fs::read_to_string(&second).unwrap(), first_content);
  }
}
