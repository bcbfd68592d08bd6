mod algorithm;
mod bench;
mod catalog;
mod error;
mod ext;
mod format;
mod run;
mod stats;
#[cfg(test)]
mod testing;

use std::{path::PathBuf, time::Duration};

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use self::{
  algorithm::Variant,
  bench::{parse_timeout, Bench},
};

#[derive(Parser)]
#[command(about = "Benchmarks sequential and parallel solvers against a set of test cases")]
struct Args {
  #[command(subcommand)]
  command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
  /// Runs every solver on every test case and reports sequential vs. parallel
  /// speedups.
  Bench {
    /// A test case file, or a directory of them.
    input: PathBuf,
    /// Algorithm families to benchmark (greedy, exact, genetic, brute). All of
    /// them if omitted.
    #[arg(short, long, value_delimiter = ',')]
    families: Vec<String>,
    /// Directory containing the solver executables, directly or one
    /// subdirectory deep.
    #[arg(long, default_value = "./exec")]
    exec_dir: PathBuf,
    /// Directory the report is written to.
    #[arg(long, default_value = "./reports")]
    report_dir: PathBuf,
    /// Seconds after which a solver run is killed.
    #[arg(short, long, default_value = "20", value_parser = parse_timeout)]
    timeout: Duration,
  },
  /// Runs a single solver on every test case, printing its times and
  /// solution values.
  Run {
    /// The solver executable.
    program: PathBuf,
    /// A test case file, or a directory of them.
    input: PathBuf,
    /// Seconds after which a solver run is killed.
    #[arg(short, long, default_value = "20", value_parser = parse_timeout)]
    timeout: Duration,
  },
}

fn main() -> Result<()> {
  tracing_subscriber::registry()
    .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| "solver_bench=info".into()))
    .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
    .init();

  match Args::parse().command {
    Command::Bench {
      input,
      families,
      exec_dir,
      report_dir,
      timeout,
    } => {
      let mut bench = Bench::new(&input, &families, &exec_dir, timeout).context("Bench::new")?;
      bench.bench();

      for ((vertices, family), (mean, count)) in bench.mean_times_by_vertices() {
        tracing::info!("mean {family}_{} time for n = {vertices}: {mean:.4}s over {count} test cases", Variant::Sequential);
      }
      for ((vertices, family), (mean, count)) in bench.mean_accuracies_by_vertices() {
        tracing::info!("mean {family} accuracy for n = {vertices}: {mean:.3} over {count} test cases");
      }
      for (family, (mean, count)) in bench.mean_speedups() {
        tracing::info!("mean {family} speedup: {mean:.2} over {count} test cases");
      }

      let path = bench.publish(&mut std::io::stdout().lock(), &report_dir)?;
      tracing::info!("report for {} written to {path:?}", bench.catalog().name());
    }
    Command::Run {
      program,
      input,
      timeout,
    } => {
      let (catalog, outcomes) = bench::run_program(&program, &input, timeout).context("run")?;

      println!("{}", format::format_runs(&catalog, &outcomes).context("format")?);
    }
  }

  Ok(())
}
