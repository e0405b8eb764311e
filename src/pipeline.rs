//! The repair pipeline: construction → repair → validation → metrics.
//!
//! [`RepairPipeline`] drives one reconstruction run through eleven strictly
//! sequential stages, each wall-clock-timed independently:
//!
//! 1. **Init**: sparsify the point set and construct the engine.
//! 2. **Compute**: build the tangential complex.
//! 3. **ExportBefore**: mesh export of the raw reconstruction.
//! 4. **PerturbRepair**: time-bounded perturbation repair (gated).
//! 5. **ExportAfterPerturb**: export with remaining inconsistencies
//!    highlighted (only if stage 4 ran).
//! 6. **HigherDimRepair**: patch by adding higher-dimension simplices
//!    (gated, unbounded: it is a finite combinatorial pass).
//! 7. **ExportAfterFix2**: export the complex as patched by stage 6, or as
//!    left by stages 2/4 when stage 6 was gated off.
//! 8. **Diagnostics & Collapse**: export over-dimension simplices
//!    (always), then collapse (gated).
//! 9. **Validate**: pseudomanifold check, always performed.
//! 10. **ExportFinal**: export with the three defect categories colored.
//! 11. **Emit**: commit one metrics record.
//!
//! A pipeline value is single-use: `run` consumes it. Mesh exports are
//! guarded, not fatal; the only fatal condition is engine construction
//! failure on an unusable point set.

use std::collections::BTreeSet;
use std::time::{Duration, Instant};

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::info;

use crate::engine::{EngineError, FixOutcome, ReconstructionEngine};
use crate::export::{ExportError, Highlights, MeshExporter};
use crate::geometry::point::PointD;
use crate::geometry::sparsify::sparsify_point_set;
use crate::metrics::{MetricsError, MetricsLog, NOT_APPLICABLE};
use crate::topology::complex::{Simplex, SimplicialComplex};
use crate::topology::pseudomanifold::PseudomanifoldReport;

/// Errors that abort a pipeline run.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum PipelineError {
    /// Engine construction failed, the run's only fatal condition.
    #[error(transparent)]
    Engine(#[from] EngineError),

    /// A mesh export failed at the I/O level.
    #[error(transparent)]
    Export(#[from] ExportError),

    /// The metrics record could not be committed.
    #[error(transparent)]
    Metrics(#[from] MetricsError),
}

/// The optional repair stages.
///
/// Stage gating is an explicit set of these values rather than positional
/// booleans, so the state machine's reachable paths are enumerable.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum RepairStage {
    /// Stage 4: perturbation-based repair.
    PerturbPoints,
    /// Stage 6: higher-dimension-simplex repair.
    AddHigherDimSimplices,
    /// Stage 8: simplicial collapse.
    Collapse,
}

/// The set of repair stages requested for a run.
pub type StageSet = BTreeSet<RepairStage>;

/// Configuration of one pipeline run.
#[derive(Clone, Debug)]
pub struct PipelineConfig {
    /// Label for exports and metrics (input name, directories stripped).
    pub input_label: String,
    /// Target intrinsic dimension of the reconstruction.
    pub intrinsic_dim: usize,
    /// Sparsification distance; non-positive disables sparsification.
    pub sparsity: f64,
    /// Which optional repair stages to run.
    pub stages: StageSet,
    /// Wall-clock budget for the perturbation repair.
    pub perturb_time_limit: Duration,
    /// Engine worker-pool size (`None` = engine default).
    pub workers: Option<usize>,
    /// Seed for the engine's perturbation randomness.
    pub seed: u64,
}

/// Per-stage elapsed times. `None` marks a stage that was skipped (gated
/// off, or a guarded export), which is the metrics sentinel, distinct from
/// a zero duration.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StageTimings {
    /// Sparsification and engine construction.
    pub init: Duration,
    /// Tangential-complex build.
    pub compute: Duration,
    /// Pre-repair export.
    pub export_before: Option<Duration>,
    /// Perturbation repair.
    pub perturb: Option<Duration>,
    /// Post-perturbation export.
    pub export_after_perturb: Option<Duration>,
    /// Higher-dimension-simplex repair.
    pub higher_dim: Option<Duration>,
    /// Post-patch export.
    pub export_after_fix2: Option<Duration>,
    /// Over-dimension diagnostics export.
    pub export_diagnostics: Option<Duration>,
    /// Simplicial collapse.
    pub collapse: Option<Duration>,
    /// Pseudomanifold validation.
    pub validate: Duration,
    /// Final colored export.
    pub export_final: Option<Duration>,
}

/// Immutable record of one pipeline run, owned by the caller.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct RepairRunResult {
    /// Input label.
    pub input_label: String,
    /// Target intrinsic dimension.
    pub intrinsic_dim: usize,
    /// Ambient dimension of the point set.
    pub ambient_dim: usize,
    /// Sparsification distance used.
    pub sparsity: f64,
    /// Point count before sparsification.
    pub points_in_input: usize,
    /// Point count actually reconstructed.
    pub points_reconstructed: usize,
    /// Perturbation-repair outcome (status `NotPerformed` when gated off).
    pub fix: FixOutcome,
    /// Simplices added by the higher-dimension repair (`None` when gated
    /// off).
    pub higher_dim_simplices_added: Option<usize>,
    /// Free pairs removed by collapse (`None` when gated off).
    pub collapsed_pairs: Option<usize>,
    /// Validation outcome with the three defect categories.
    pub validation: PseudomanifoldReport,
    /// Per-dimension simplex counts of the final complex.
    pub final_stats: std::collections::BTreeMap<usize, usize>,
    /// Per-stage elapsed times.
    pub timings: StageTimings,
}

/// Orchestrates one reconstruction-and-repair run. Single-use.
#[derive(Clone, Debug)]
pub struct RepairPipeline {
    config: PipelineConfig,
    exporter: MeshExporter,
}

impl RepairPipeline {
    /// Creates a pipeline for one run.
    #[must_use]
    pub fn new(config: PipelineConfig, exporter: MeshExporter) -> Self {
        Self { config, exporter }
    }

    /// Runs all eleven stages and commits one metrics record.
    ///
    /// # Errors
    ///
    /// Fails only on engine construction (empty/unusable point set), export
    /// I/O, or metrics I/O; repair non-convergence and validation failure
    /// are outcomes, not errors.
    pub fn run<E: ReconstructionEngine>(
        self,
        points: Vec<PointD>,
        log: &mut MetricsLog,
    ) -> Result<RepairRunResult, PipelineError> {
        let Self { config, exporter } = self;
        let mut timings = StageTimings::default();

        // Stage 1: Init. Sparsify, then construct the engine.
        let points_in_input = points.len();
        let clock = Instant::now();
        let points = sparsify_point_set(points, config.sparsity);
        let points_reconstructed = points.len();
        let mut engine = E::construct(
            points,
            config.intrinsic_dim,
            config.workers,
            config.seed,
        )?;
        timings.init = clock.elapsed();

        // Stage 2: Compute.
        let clock = Instant::now();
        engine.compute();
        timings.compute = clock.elapsed();

        let ambient_dim = engine.ambient_dimension();
        let export = |exporter: &MeshExporter,
                      engine: &E,
                      complex: &SimplicialComplex,
                      suffix: &str,
                      highlights: &Highlights<'_>|
         -> Result<Option<Duration>, PipelineError> {
            let clock = Instant::now();
            let written = exporter.export(
                engine.points(),
                complex,
                config.intrinsic_dim,
                ambient_dim,
                &config.input_label,
                suffix,
                highlights,
            )?;
            Ok(written.map(|_| clock.elapsed()))
        };

        // Stage 3: ExportBefore, the raw reconstruction.
        let mut raw = SimplicialComplex::new();
        engine.export_to(&mut raw);
        timings.export_before =
            export(&exporter, &engine, &raw, "_BEFORE_FIX", &Highlights::default())?;
        drop(raw);

        // Stage 4: PerturbRepair (gated).
        let fix = if config.stages.contains(&RepairStage::PerturbPoints) {
            let clock = Instant::now();
            let outcome = engine.fix_inconsistencies(config.perturb_time_limit);
            timings.perturb = Some(clock.elapsed());

            // Stage 5: ExportAfterPerturb, remaining inconsistencies in red.
            let inconsistent = engine.inconsistent_simplices();
            let mut current = SimplicialComplex::new();
            engine.export_to(&mut current);
            timings.export_after_perturb = export(
                &exporter,
                &engine,
                &current,
                "_AFTER_FIX",
                &Highlights::red_only(&inconsistent),
            )?;
            outcome
        } else {
            FixOutcome::not_performed()
        };

        // Stage 6: HigherDimRepair (gated). A finite combinatorial patch,
        // no time bound.
        let higher_dim_simplices_added = if config
            .stages
            .contains(&RepairStage::AddHigherDimSimplices)
        {
            let clock = Instant::now();
            let added = engine.resolve_by_adding_higher_dimension_simplices();
            timings.higher_dim = Some(clock.elapsed());
            Some(added)
        } else {
            None
        };

        // The complex every remaining stage operates on.
        let mut complex = SimplicialComplex::new();
        let max_dim = engine.export_to(&mut complex);

        // Stage 7: ExportAfterFix2. Always exported; holds the patches when
        // stage 6 ran, the stage 2/4 reconstruction otherwise.
        timings.export_after_fix2 =
            export(&exporter, &engine, &complex, "_AFTER_FIX2", &Highlights::default())?;

        // Stage 8: Diagnostics (always) & Collapse (gated).
        let over_dimension: BTreeSet<Simplex> = complex
            .simplices_of_dimension_above(config.intrinsic_dim)
            .cloned()
            .collect();
        timings.export_diagnostics = export(
            &exporter,
            &engine,
            &complex,
            "_BEFORE_COLLAPSE",
            &Highlights::red_only(&over_dimension),
        )?;
        let collapsed_pairs = if config.stages.contains(&RepairStage::Collapse) {
            let clock = Instant::now();
            let pairs = complex.collapse(max_dim);
            timings.collapse = Some(clock.elapsed());
            Some(pairs)
        } else {
            None
        };

        // Stage 9: Validate, always performed; failure is the measured
        // outcome.
        let clock = Instant::now();
        let validation = complex.is_pure_pseudomanifold(
            config.intrinsic_dim,
            engine.number_of_vertices(),
            false,
            1,
        );
        timings.validate = clock.elapsed();

        // Stage 10: ExportFinal, the three defect categories colored.
        timings.export_final = export(
            &exporter,
            &engine,
            &complex,
            "_AFTER_COLLAPSE",
            &Highlights {
                red: Some(validation.wrong_dimension.simplices()),
                green: Some(validation.wrong_cofaces.simplices()),
                blue: Some(validation.unconnected_stars.simplices()),
            },
        )?;

        let result = RepairRunResult {
            input_label: config.input_label.clone(),
            intrinsic_dim: config.intrinsic_dim,
            ambient_dim,
            sparsity: config.sparsity,
            points_in_input,
            points_reconstructed,
            fix,
            higher_dim_simplices_added,
            collapsed_pairs,
            validation,
            final_stats: complex.stats(),
            timings,
        };

        info!(
            input = %result.input_label,
            vertices = engine.number_of_vertices(),
            pseudomanifold = result.validation.is_pseudomanifold,
            fix_status = ?result.fix.status,
            "pipeline run complete"
        );

        // Stage 11: Emit.
        emit(log, &result, config.workers)?;
        Ok(result)
    }
}

/// Renders a gated/guarded stage duration, `N/A` when skipped.
fn duration_metric(duration: Option<Duration>) -> String {
    duration.map_or_else(
        || NOT_APPLICABLE.to_string(),
        |d| format!("{:.6}", d.as_secs_f64()),
    )
}

/// Assembles and commits the metrics record for one completed run.
fn emit(
    log: &mut MetricsLog,
    result: &RepairRunResult,
    workers: Option<usize>,
) -> Result<(), MetricsError> {
    use crate::engine::FixStatus;

    log.set("Input", &result.input_label)?;
    log.set("Intrinsic_dim", result.intrinsic_dim)?;
    log.set("Ambient_dim", result.ambient_dim)?;
    log.set("Sparsity", result.sparsity)?;
    log.set("Num_points_in_input", result.points_in_input)?;
    log.set("Num_points", result.points_reconstructed)?;
    if result.fix.status == FixStatus::NotPerformed {
        log.set("Initial_num_inconsistent_local_tr", NOT_APPLICABLE)?;
        log.set("Best_num_inconsistent_local_tr", NOT_APPLICABLE)?;
        log.set("Final_num_inconsistent_local_tr", NOT_APPLICABLE)?;
        log.set("Perturb_steps", NOT_APPLICABLE)?;
    } else {
        log.set("Initial_num_inconsistent_local_tr", result.fix.initial)?;
        log.set("Best_num_inconsistent_local_tr", result.fix.best)?;
        log.set("Final_num_inconsistent_local_tr", result.fix.final_count)?;
        log.set("Perturb_steps", result.fix.steps)?;
    }
    log.set("Init_time", format!("{:.6}", result.timings.init.as_secs_f64()))?;
    log.set(
        "Comput_time",
        format!("{:.6}", result.timings.compute.as_secs_f64()),
    )?;
    log.set("Perturb_successful", result.fix.status.as_metric())?;
    log.set("Perturb_time", duration_metric(result.timings.perturb))?;
    log.set(
        "Add_higher_dim_simpl_time",
        duration_metric(result.timings.higher_dim),
    )?;
    log.set(
        "Result_pure_pseudomanifold",
        if result.validation.is_pseudomanifold { "Y" } else { "N" },
    )?;
    log.set(
        "Result_num_wrong_dim_simplices",
        result.validation.wrong_dimension.count(),
    )?;
    log.set(
        "Result_num_wrong_number_of_cofaces",
        result.validation.wrong_cofaces.count(),
    )?;
    log.set(
        "Result_num_unconnected_stars",
        result.validation.unconnected_stars.count(),
    )?;
    log.set(
        "Num_threads",
        workers.map_or_else(|| NOT_APPLICABLE.to_string(), |n| n.to_string()),
    )?;
    log.set("Info", "")?;
    log.commit()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::tangential::TangentialComplex;

    fn circle_points(n: usize) -> Vec<PointD> {
        (0..n)
            .map(|i| {
                #[allow(clippy::cast_precision_loss)]
                let angle = std::f64::consts::TAU * i as f64 / n as f64;
                PointD::new(vec![angle.cos(), angle.sin()]).unwrap()
            })
            .collect()
    }

    fn config(stages: StageSet) -> (PipelineConfig, MeshExporter, tempfile::TempDir) {
        let dir = tempfile::tempdir().unwrap();
        let config = PipelineConfig {
            input_label: "circle".to_string(),
            intrinsic_dim: 1,
            sparsity: 0.0,
            stages,
            perturb_time_limit: Duration::from_millis(50),
            workers: None,
            seed: 7,
        };
        let exporter = MeshExporter::new(dir.path().join("output"));
        (config, exporter, dir)
    }

    #[test]
    fn empty_point_set_is_fatal() {
        let (config, exporter, dir) = config(StageSet::new());
        let mut log = MetricsLog::new(dir.path().join("perf"));
        let result =
            RepairPipeline::new(config, exporter).run::<TangentialComplex>(vec![], &mut log);
        assert!(matches!(
            result,
            Err(PipelineError::Engine(EngineError::EmptyPointSet))
        ));
        // Fatal before Emit: nothing committed.
        assert_eq!(log.committed(), 0);
    }

    #[test]
    fn skipped_perturb_is_not_applicable_not_zero() {
        let (config, exporter, dir) = config(StageSet::new());
        let mut log = MetricsLog::new(dir.path().join("perf"));
        let result = RepairPipeline::new(config, exporter)
            .run::<TangentialComplex>(circle_points(12), &mut log)
            .unwrap();
        assert_eq!(result.fix.status, crate::engine::FixStatus::NotPerformed);
        assert!(result.timings.perturb.is_none());

        let text = std::fs::read_to_string(log.path().unwrap()).unwrap();
        let record: serde_json::Value = serde_json::from_str(text.lines().next().unwrap()).unwrap();
        assert_eq!(record["Initial_num_inconsistent_local_tr"], "N/A");
        assert_eq!(record["Perturb_successful"], "N/A");
        assert_eq!(record["Perturb_time"], "N/A");
    }

    #[test]
    fn all_stages_produce_a_complete_record() {
        let stages: StageSet = [
            RepairStage::PerturbPoints,
            RepairStage::AddHigherDimSimplices,
            RepairStage::Collapse,
        ]
        .into();
        let (config, exporter, dir) = config(stages);
        let mut log = MetricsLog::new(dir.path().join("perf"));
        let result = RepairPipeline::new(config, exporter)
            .run::<TangentialComplex>(circle_points(16), &mut log)
            .unwrap();

        assert_ne!(result.fix.status, crate::engine::FixStatus::NotPerformed);
        assert!(result.timings.perturb.is_some());
        assert!(result.timings.higher_dim.is_some());
        assert!(result.timings.collapse.is_some());
        assert!(result.higher_dim_simplices_added.is_some());
        assert!(result.collapsed_pairs.is_some());
        assert_eq!(log.committed(), 1);
    }

    #[test]
    fn sparsification_reduces_reconstructed_points() {
        let (mut config, exporter, dir) = config(StageSet::new());
        config.sparsity = 0.5;
        let mut log = MetricsLog::new(dir.path().join("perf"));
        let result = RepairPipeline::new(config, exporter)
            .run::<TangentialComplex>(circle_points(64), &mut log)
            .unwrap();
        assert_eq!(result.points_in_input, 64);
        assert!(result.points_reconstructed < 64);
    }

    #[test]
    fn exports_are_written_for_low_dimension() {
        let (config, exporter, dir) = config(StageSet::new());
        let mut log = MetricsLog::new(dir.path().join("perf"));
        let result = RepairPipeline::new(config, exporter)
            .run::<TangentialComplex>(circle_points(12), &mut log)
            .unwrap();
        assert!(result.timings.export_before.is_some());
        assert!(result.timings.export_final.is_some());
        let output = dir.path().join("output");
        assert!(output.join("circle_1_in_R2_BEFORE_FIX.off").exists());
        assert!(output.join("circle_1_in_R2_AFTER_COLLAPSE.off").exists());
    }
}
