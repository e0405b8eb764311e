//! Scripted experiment runner.
//!
//! An experiment script is a plain-text file of runs, one per line, thirteen
//! whitespace-separated fields each:
//!
//! ```text
//! input p1 p2 p3 n_points ambient intrinsic sparsity perturb add_hd collapse time_limit iterations
//! ```
//!
//! `input` is either a generator identifier (`generate_sphere_d`, ...) or a
//! path to a coordinate file. The three `Y`/`N` flags gate the optional
//! repair stages, `time_limit` is the perturbation budget in seconds, and
//! `iterations` repeats the run with fresh randomness.
//!
//! Lines starting with `#`, blank lines, and malformed lines are skipped with
//! a warning; so is a run whose input yields no points or a point set the
//! engine rejects (mixed dimensions, intrinsic dimension too large). Skipped
//! runs still consume their sequence number, keeping seeds stable across
//! edits to unrelated lines.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use rand::SeedableRng;
use rand::rngs::StdRng;
use thiserror::Error;
use tracing::{info, warn};

use crate::engine::ReconstructionEngine;
use crate::export::{MeshExporter, strip_input_name};
use crate::geometry::generators::Generator;
use crate::geometry::point::PointD;
use crate::metrics::{MetricsError, MetricsLog};
use crate::pipeline::{PipelineConfig, PipelineError, RepairPipeline, RepairStage, StageSet};

/// Errors that abort a script run.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum RunnerError {
    /// The script file could not be read.
    #[error("Cannot read experiment script {path}: {source}")]
    Script {
        /// Path of the script file.
        path: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// An export or metrics write failed during a pipeline run.
    #[error(transparent)]
    Pipeline(#[from] PipelineError),

    /// The metrics log failed.
    #[error(transparent)]
    Metrics(#[from] MetricsError),
}

/// Counts of what a script run did.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct RunSummary {
    /// Pipeline runs that completed and committed a record.
    pub completed: usize,
    /// Lines or iterations skipped (comments, malformed lines, empty inputs).
    pub skipped: usize,
}

/// One parsed script line.
#[derive(Clone, Debug, PartialEq)]
struct ScriptLine {
    input: String,
    params: [f64; 3],
    n_points: usize,
    ambient_dim: usize,
    intrinsic_dim: usize,
    sparsity: f64,
    stages: StageSet,
    time_limit: Duration,
    iterations: usize,
}

impl ScriptLine {
    /// Parses one non-comment line; `None` if it is malformed.
    fn parse(line: &str) -> Option<Self> {
        let fields: Vec<&str> = line.split_whitespace().collect();
        if fields.len() < 13 {
            return None;
        }

        let params = [
            fields[1].parse().ok()?,
            fields[2].parse().ok()?,
            fields[3].parse().ok()?,
        ];
        let time_limit: f64 = fields[11].parse().ok()?;
        if !time_limit.is_finite() || time_limit < 0.0 {
            return None;
        }

        let mut stages = StageSet::new();
        for (field, stage) in [
            (fields[8], RepairStage::PerturbPoints),
            (fields[9], RepairStage::AddHigherDimSimplices),
            (fields[10], RepairStage::Collapse),
        ] {
            match field {
                "Y" | "y" => {
                    stages.insert(stage);
                }
                "N" | "n" => {}
                _ => return None,
            }
        }

        Some(Self {
            input: fields[0].to_string(),
            params,
            n_points: fields[4].parse().ok()?,
            ambient_dim: fields[5].parse().ok()?,
            intrinsic_dim: fields[6].parse().ok()?,
            sparsity: fields[7].parse().ok()?,
            stages,
            time_limit: Duration::from_secs_f64(time_limit),
            iterations: fields[12].parse().ok()?,
        })
    }
}

/// Runs experiment scripts end to end, one metrics record per completed run.
#[derive(Clone, Debug)]
pub struct ExperimentRunner {
    exporter: MeshExporter,
    seed: u64,
    worker_counts: Vec<Option<usize>>,
}

impl ExperimentRunner {
    /// Creates a runner exporting meshes under `export_dir`, deriving all
    /// randomness from `seed`.
    #[must_use]
    pub fn new(export_dir: impl Into<PathBuf>, seed: u64) -> Self {
        Self {
            exporter: MeshExporter::new(export_dir),
            seed,
            worker_counts: vec![None],
        }
    }

    /// Re-runs the whole script once per worker-pool size, for scaling
    /// comparisons.
    #[must_use]
    pub fn with_worker_counts(mut self, counts: impl IntoIterator<Item = usize>) -> Self {
        let counts: Vec<Option<usize>> = counts.into_iter().map(Some).collect();
        if !counts.is_empty() {
            self.worker_counts = counts;
        }
        self
    }

    /// Runs every line of the script at `path` through the pipeline.
    ///
    /// # Errors
    ///
    /// Fails if the script cannot be read or an export/metrics write fails;
    /// malformed lines, empty inputs, and point sets the engine rejects are
    /// skipped, not errors.
    pub fn run_script<E: ReconstructionEngine>(
        &self,
        path: impl AsRef<Path>,
        log: &mut MetricsLog,
    ) -> Result<RunSummary, RunnerError> {
        let path = path.as_ref();
        let script = fs::read_to_string(path).map_err(|source| RunnerError::Script {
            path: path.to_path_buf(),
            source,
        })?;

        let mut summary = RunSummary::default();

        for &workers in &self.worker_counts {
            // Sequence numbers every attempted run, including skipped ones,
            // so a line's seeds do not depend on the fate of earlier lines'
            // inputs. Restarting per sweep value reruns every worker count
            // on the same point sets.
            let mut sequence: u64 = 0;
            for (line_no, raw) in script.lines().enumerate() {
                let trimmed = raw.trim();
                if trimmed.is_empty() || trimmed.starts_with('#') {
                    continue;
                }
                let Some(line) = ScriptLine::parse(trimmed) else {
                    warn!(line = line_no + 1, "skipping malformed script line");
                    summary.skipped += 1;
                    continue;
                };

                for iteration in 0..line.iterations {
                    sequence += 1;
                    let run_seed = self.seed.wrapping_add(sequence);
                    let points = self.acquire_points(&line, run_seed);
                    if points.is_empty() {
                        warn!(
                            input = %line.input,
                            iteration,
                            "skipping run: input produced no points"
                        );
                        summary.skipped += 1;
                        continue;
                    }

                    info!(
                        input = %line.input,
                        iteration,
                        points = points.len(),
                        intrinsic_dim = line.intrinsic_dim,
                        ?workers,
                        "starting run"
                    );
                    let config = PipelineConfig {
                        input_label: strip_input_name(&line.input),
                        intrinsic_dim: line.intrinsic_dim,
                        sparsity: line.sparsity,
                        stages: line.stages.clone(),
                        perturb_time_limit: line.time_limit,
                        workers,
                        seed: run_seed,
                    };
                    match RepairPipeline::new(config, self.exporter.clone())
                        .run::<E>(points, log)
                    {
                        Ok(_) => summary.completed += 1,
                        // An unusable point set fails engine construction;
                        // that kills this iteration, not the script.
                        Err(PipelineError::Engine(error)) => {
                            warn!(
                                input = %line.input,
                                iteration,
                                %error,
                                "skipping run: engine rejected the point set"
                            );
                            summary.skipped += 1;
                        }
                        Err(error) => return Err(error.into()),
                    }
                }
            }
        }

        info!(
            completed = summary.completed,
            skipped = summary.skipped,
            "script finished"
        );
        Ok(summary)
    }

    /// Produces the run's point set: generated for a known generator name,
    /// loaded from disk otherwise. Failures warn and yield an empty set.
    fn acquire_points(&self, line: &ScriptLine, run_seed: u64) -> Vec<PointD> {
        if let Some(generator) = Generator::from_name(&line.input) {
            let mut rng = StdRng::seed_from_u64(run_seed);
            match generator.generate(line.n_points, line.ambient_dim, line.params, &mut rng) {
                Ok(points) => points,
                Err(error) => {
                    warn!(input = %line.input, %error, "point generation failed");
                    Vec::new()
                }
            }
        } else {
            match load_points_from_file(&line.input) {
                Ok(points) => points,
                Err(error) => {
                    warn!(input = %line.input, %error, "point file unusable");
                    Vec::new()
                }
            }
        }
    }
}

/// Loads a point set from a text file, one point per line, coordinates
/// separated by whitespace or commas. Blank lines are ignored.
pub fn load_points_from_file(path: impl AsRef<Path>) -> Result<Vec<PointD>, std::io::Error> {
    let text = fs::read_to_string(path)?;
    let mut points = Vec::new();
    for (line_no, raw) in text.lines().enumerate() {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            continue;
        }
        let mut coords = Vec::new();
        for token in trimmed.split(|c: char| c.is_whitespace() || c == ',') {
            if token.is_empty() {
                continue;
            }
            let value: f64 = token.parse().map_err(|_| {
                std::io::Error::new(
                    std::io::ErrorKind::InvalidData,
                    format!("line {}: not a coordinate: {token:?}", line_no + 1),
                )
            })?;
            coords.push(value);
        }
        let point = PointD::new(coords).map_err(|e| {
            std::io::Error::new(
                std::io::ErrorKind::InvalidData,
                format!("line {}: {e}", line_no + 1),
            )
        })?;
        points.push(point);
    }
    Ok(points)
}
