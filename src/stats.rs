use std::{collections::BTreeMap, time::Duration};

use crate::{
  algorithm::{Family, Variant},
  run::Outcome,
};

/// Sequential and parallel times of one family on one test case.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Speedup {
  pub seq: Duration,
  pub par: Duration,
  /// `seq / par`, infinite if `par` is zero.
  pub ratio: f64,
}

impl Speedup {
  pub fn new(seq: Duration, par: Duration) -> Self {
    let ratio = if par.is_zero() {
      f64::INFINITY
    } else {
      seq.as_secs_f64() / par.as_secs_f64()
    };

    Self { seq, par, ratio }
  }
}

/// How close a `found` solution value is to the `exact` one:
/// `1 - (exact - found) / exact`. A heuristic that found nothing (`0`), or
/// reported no solution (`-1`) where one exists, scores zero. Undefined when
/// the exact value is zero.
pub fn accuracy(exact: i64, found: i64) -> Option<f64> {
  if exact == 0 {
    return None;
  }

  if found == 0 || (found == -1 && exact != -1) {
    return Some(0.0);
  }

  Some(1.0 - (exact - found) as f64 / exact as f64)
}

/// Speedups of every family on a single test case.
#[derive(Debug, Clone, PartialEq)]
pub struct SpeedupRow {
  /// Position of the test case in the catalog.
  pub index: usize,
  pub speedups: BTreeMap<Family, Option<Speedup>>,
}

type Columns<T> = BTreeMap<(Family, Variant), Vec<Option<T>>>;

fn columns<T: Clone>(len: usize) -> Columns<T> {
  Family::ALL
    .into_iter()
    .flat_map(|family| Variant::ALL.map(|variant| ((family, variant), vec![None; len])))
    .collect()
}

fn cell<T>(table: &mut Columns<T>, family: Family, variant: Variant, index: usize) -> &mut Option<T> {
  let column = table
    .get_mut(&(family, variant))
    .unwrap_or_else(|| unreachable!("column {family}_{variant} is always present"));

  &mut column[index]
}

/// Elapsed times and solution values of every family and variant on every
/// test case of a catalog. Every column exists from the start, so a family
/// that never ran is recorded as absent rather than missing.
#[derive(Debug, Clone)]
pub struct ResultMatrix {
  cells: Columns<Duration>,
  solutions: Columns<i64>,
  len: usize,
}

impl ResultMatrix {
  pub fn new(len: usize) -> Self {
    Self {
      cells: columns(len),
      solutions: columns(len),
      len,
    }
  }

  /// Replaces the cells for `index` with the run's elapsed time and solution
  /// value, or with absence if it did not complete.
  ///
  /// # Panics
  ///
  /// If `index` is out of range.
  pub fn record(&mut self, family: Family, variant: Variant, index: usize, outcome: &Outcome) {
    self.set(family, variant, index, outcome.elapsed());
    self.set_solution(family, variant, index, outcome.solution());
  }

  pub fn set(&mut self, family: Family, variant: Variant, index: usize, elapsed: Option<Duration>) {
    *cell(&mut self.cells, family, variant, index) = elapsed;
  }

  pub fn set_solution(&mut self, family: Family, variant: Variant, index: usize, value: Option<i64>) {
    *cell(&mut self.solutions, family, variant, index) = value;
  }

  pub fn get(&self, family: Family, variant: Variant, index: usize) -> Option<Duration> {
    self.cells.get(&(family, variant))?.get(index).copied().flatten()
  }

  /// The solution value `family` found on `index`, from its sequential run if
  /// that printed one, else from its parallel run.
  pub fn solution(&self, family: Family, index: usize) -> Option<i64> {
    Variant::ALL
      .into_iter()
      .find_map(|variant| self.solutions.get(&(family, variant))?.get(index).copied().flatten())
  }

  /// Accuracy of `family` against the exact solver on `index`. `None` unless
  /// both printed a solution value.
  pub fn compute_accuracy(&self, family: Family, index: usize) -> Option<f64> {
    accuracy(self.solution(Family::Exact, index)?, self.solution(family, index)?)
  }

  /// Returns `None` unless both variants of `family` completed on `index`.
  pub fn compute_speedup(&self, family: Family, index: usize) -> Option<Speedup> {
    let seq = self.get(family, Variant::Sequential, index)?;
    let par = self.get(family, Variant::Parallel, index)?;

    Some(Speedup::new(seq, par))
  }

  pub fn speedup_row(&self, index: usize) -> SpeedupRow {
    SpeedupRow {
      index,
      speedups: Family::ALL
        .into_iter()
        .map(|family| (family, self.compute_speedup(family, index)))
        .collect(),
    }
  }

  pub fn speedup_rows(&self) -> Vec<SpeedupRow> {
    (0..self.len).map(|index| self.speedup_row(index)).collect()
  }
}
