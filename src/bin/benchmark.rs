//! Scripted reconstruction benchmark.
//!
//! Usage: `benchmark [SCRIPT] [SEED]`
//!
//! Runs every line of the experiment script (default
//! `benchmark_script.txt`) through the repair pipeline with the tangential
//! complex engine, writing OFF exports under `exports/` and one JSON-Lines
//! metrics record per run under `performance_logs/`. Log verbosity follows
//! `RUST_LOG` (default `info`).

use std::process::ExitCode;

use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use tangential::engine::tangential::TangentialComplex;
use tangential::metrics::MetricsLog;
use tangential::runner::ExperimentRunner;

const DEFAULT_SCRIPT: &str = "benchmark_script.txt";
const DEFAULT_SEED: u64 = 42;

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .init();

    let mut args = std::env::args().skip(1);
    let script = args.next().unwrap_or_else(|| DEFAULT_SCRIPT.to_string());
    let seed = match args.next() {
        Some(raw) => match raw.parse() {
            Ok(seed) => seed,
            Err(_) => {
                error!(%raw, "seed must be an unsigned integer");
                return ExitCode::FAILURE;
            }
        },
        None => DEFAULT_SEED,
    };

    info!(%script, seed, "starting benchmark");
    let runner = ExperimentRunner::new("exports", seed);
    let mut log = MetricsLog::new("performance_logs");
    match runner.run_script::<TangentialComplex>(&script, &mut log) {
        Ok(summary) => {
            info!(
                completed = summary.completed,
                skipped = summary.skipped,
                metrics = ?log.path(),
                "benchmark finished"
            );
            ExitCode::SUCCESS
        }
        Err(error) => {
            error!(%error, "benchmark failed");
            ExitCode::FAILURE
        }
    }
}
