//! Reconstruction engine boundary.
//!
//! The repair pipeline consumes the geometry kernel only through the
//! [`ReconstructionEngine`] trait: construction from a point set, the
//! tangential-complex build, the two repair operations, and export into a
//! [`SimplicialComplex`]. The crate ships one implementation,
//! [`tangential::TangentialComplex`]; tests may substitute their own.

pub mod tangential;

use std::collections::BTreeSet;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::geometry::point::PointD;
use crate::topology::complex::{Simplex, SimplicialComplex};

/// Errors produced when constructing an engine.
///
/// Engine construction failure is the only fatal condition in a pipeline
/// run; everything downstream reports outcomes as values.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
#[non_exhaustive]
pub enum EngineError {
    /// The point set is empty.
    #[error("Cannot construct a reconstruction engine from an empty point set")]
    EmptyPointSet,

    /// Points disagree on ambient dimension.
    #[error("Point {index} has ambient dimension {actual}, expected {expected}")]
    MixedAmbientDimension {
        /// Index of the offending point.
        index: usize,
        /// Dimension of the first point.
        expected: usize,
        /// Dimension of the offending point.
        actual: usize,
    },

    /// The target intrinsic dimension does not fit the ambient space.
    #[error("Intrinsic dimension {intrinsic} invalid for ambient dimension {ambient}")]
    InvalidIntrinsicDimension {
        /// Requested intrinsic dimension.
        intrinsic: usize,
        /// Ambient dimension of the point set.
        ambient: usize,
    },

    /// The worker pool could not be created.
    #[error("Failed to build worker pool: {0}")]
    WorkerPool(String),
}

/// Terminal status of the perturbation repair.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum FixStatus {
    /// The inconsistency count reached zero.
    Fixed,
    /// The time budget ran out with inconsistencies remaining.
    NotFixed,
    /// The repair stage was not requested.
    NotPerformed,
}

impl FixStatus {
    /// `Y`/`N` rendering used in metrics records.
    #[must_use]
    pub const fn as_metric(self) -> &'static str {
        match self {
            Self::Fixed => "Y",
            Self::NotFixed => "N",
            Self::NotPerformed => "N/A",
        }
    }
}

/// Outcome of one perturbation-repair invocation.
///
/// `initial`, `best`, and `final_count` track the number of locally
/// inconsistent neighborhoods over the run; callers must distinguish "not
/// attempted" ([`FixStatus::NotPerformed`]) from "attempted and failed".
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct FixOutcome {
    /// Terminal status.
    pub status: FixStatus,
    /// Number of perturbation iterations performed.
    pub steps: u32,
    /// Inconsistent-neighborhood count before the first iteration.
    pub initial: usize,
    /// Best (lowest) count observed.
    pub best: usize,
    /// Count when the repair returned.
    pub final_count: usize,
}

impl FixOutcome {
    /// The sentinel outcome for a skipped repair stage.
    #[must_use]
    pub const fn not_performed() -> Self {
        Self {
            status: FixStatus::NotPerformed,
            steps: 0,
            initial: 0,
            best: 0,
            final_count: 0,
        }
    }
}

/// Contract between the repair pipeline and the geometry kernel.
pub trait ReconstructionEngine: Sized {
    /// Constructs the engine from an already-sparsified point set.
    ///
    /// `workers` sizes the engine-internal worker pool (`None` = library
    /// default); `seed` makes perturbation repair reproducible.
    ///
    /// # Errors
    ///
    /// Fails on an empty or dimensionally inconsistent point set, the only
    /// fatal condition of a pipeline run.
    fn construct(
        points: Vec<PointD>,
        intrinsic_dim: usize,
        workers: Option<usize>,
        seed: u64,
    ) -> Result<Self, EngineError>;

    /// Builds the tangential complex. Always succeeds once constructed.
    fn compute(&mut self);

    /// Iteratively perturbs vertex positions to reduce the count of locally
    /// inconsistent neighborhoods, bounded by `time_limit` wall-clock time.
    ///
    /// The bound is advisory: the call may overrun slightly to finish its
    /// current iteration. A zero budget performs no iterative steps.
    fn fix_inconsistencies(&mut self, time_limit: Duration) -> FixOutcome;

    /// Second-pass repair: patches remaining inconsistencies by inserting
    /// simplices of dimension above the target intrinsic dimension. Runs to
    /// completion; returns the number of simplices added.
    fn resolve_by_adding_higher_dimension_simplices(&mut self) -> usize;

    /// Exports the current reconstruction into `complex`; returns the
    /// maximum simplex dimension exported (0 for an empty reconstruction).
    fn export_to(&self, complex: &mut SimplicialComplex) -> usize;

    /// Simplices currently part of an inconsistent local neighborhood.
    fn inconsistent_simplices(&self) -> BTreeSet<Simplex>;

    /// Number of vertices in the reconstruction.
    fn number_of_vertices(&self) -> usize;

    /// Target intrinsic dimension.
    fn intrinsic_dimension(&self) -> usize;

    /// Ambient dimension of the point set.
    fn ambient_dimension(&self) -> usize;

    /// The (possibly perturbed) point positions.
    fn points(&self) -> &[PointD];
}
