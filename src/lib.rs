//! # tangential
//!
//! Simplicial reconstruction of d-dimensional manifolds from point samples,
//! inspired by the tangential complex of
//! [CGAL](https://www.cgal.org).
//!
//! # Features
//!
//! - Tangential-complex reconstruction of a k-manifold sampled in ambient
//!   d-dimensional space
//! - Two-phase topological repair: seeded point perturbation, then patching
//!   with higher-dimension simplices
//! - Simplicial collapse of the over-dimension patches
//! - Pure-pseudomanifold validation with per-category defect reporting
//! - Scripted experiment runs with structured JSON-Lines metrics
//!
//! # Basic Usage
//!
//! ```rust
//! use tangential::prelude::*;
//! use std::time::Duration;
//!
//! // Sample a circle (a 1-manifold) in the plane.
//! let points: Vec<PointD> = (0..32)
//!     .map(|i| {
//!         let angle = std::f64::consts::TAU * f64::from(i) / 32.0;
//!         PointD::new(vec![angle.cos(), angle.sin()]).unwrap()
//!     })
//!     .collect();
//!
//! // Reconstruct, repair, and validate.
//! let mut engine = TangentialComplex::construct(points, 1, None, 42).unwrap();
//! engine.compute();
//! engine.fix_inconsistencies(Duration::from_secs(1));
//! engine.resolve_by_adding_higher_dimension_simplices();
//!
//! let mut complex = SimplicialComplex::new();
//! let max_dim = engine.export_to(&mut complex);
//! complex.collapse(max_dim);
//!
//! let report = complex.is_pure_pseudomanifold(1, engine.number_of_vertices(), false, 1);
//! println!("pure pseudomanifold: {}", report.is_pseudomanifold);
//! # assert_eq!(engine.number_of_vertices(), 32);
//! ```
//!
//! # Validation
//!
//! [`SimplicialComplex::is_pure_pseudomanifold`](topology::complex::SimplicialComplex::is_pure_pseudomanifold)
//! checks three independent properties and reports the offending simplices of
//! each:
//!
//! - **Purity** – every maximal simplex has exactly the intrinsic dimension.
//! - **Coface counts** – every ridge (codimension-1 face of a top simplex)
//!   has exactly two top cofaces, or exactly one where boundary is allowed.
//! - **Star connectivity** – each vertex star is connected through shared
//!   ridges.
//!
//! # Experiment scripts
//!
//! [`runner::ExperimentRunner`] drives whole benchmark scripts through the
//! [`pipeline::RepairPipeline`], committing one
//! [`metrics::MetricsLog`] record per run.

#![forbid(unsafe_code)]

/// Shared collection types tuned for small simplicial data.
pub mod collections;

/// Point sets: validated d-dimensional points, seeded generators, and
/// sparsification.
pub mod geometry {
    pub mod generators;
    pub mod point;
    pub mod sparsify;
    pub use generators::*;
    pub use point::*;
    pub use sparsify::*;
}

/// Simplicial complexes and the pseudomanifold validation they support.
pub mod topology {
    pub mod complex;
    pub mod pseudomanifold;
    pub use complex::*;
    pub use pseudomanifold::*;
}

/// Reconstruction engines behind the [`engine::ReconstructionEngine`] trait.
pub mod engine;

/// OFF mesh export with defect highlighting.
pub mod export;

/// Structured JSON-Lines performance/quality metrics.
pub mod metrics;

/// The construction → repair → validation → metrics pipeline.
pub mod pipeline;

/// Scripted experiment runner.
pub mod runner;

/// Re-exports of the commonly used types.
pub mod prelude {
    pub use crate::collections::{
        FastHashMap, FastHashSet, SmallBuffer, fast_hash_map_with_capacity,
        fast_hash_set_with_capacity,
    };
    pub use crate::engine::{
        EngineError, FixOutcome, FixStatus, ReconstructionEngine, tangential::TangentialComplex,
    };
    pub use crate::export::{Highlights, MeshExporter, strip_input_name};
    pub use crate::geometry::{generators::*, point::*, sparsify::*};
    pub use crate::metrics::{METRIC_FIELDS, MetricsError, MetricsLog, NOT_APPLICABLE};
    pub use crate::pipeline::{
        PipelineConfig, PipelineError, RepairPipeline, RepairRunResult, RepairStage, StageSet,
        StageTimings,
    };
    pub use crate::runner::{ExperimentRunner, RunSummary, RunnerError, load_points_from_file};
    pub use crate::topology::{complex::*, pseudomanifold::*};
}

/// The function `is_normal` checks that structs implement `auto` traits.
/// Traits are checked at compile time, so this function is only used for
/// testing.
#[must_use]
pub const fn is_normal<T: Sized + Send + Sync + Unpin>() -> bool {
    true
}

#[cfg(test)]
mod tests {
    use crate::{
        engine::tangential::TangentialComplex,
        geometry::point::PointD,
        is_normal,
        topology::complex::{Simplex, SimplicialComplex},
    };

    #[test]
    fn normal_types() {
        assert!(is_normal::<PointD>());
        assert!(is_normal::<Simplex>());
        assert!(is_normal::<SimplicialComplex>());
        assert!(is_normal::<TangentialComplex>());
    }

    #[test]
    fn prelude_exports_resolve() {
        use crate::prelude::*;

        let mut map: FastHashMap<u64, usize> = FastHashMap::default();
        map.insert(1, 2);
        assert_eq!(map.get(&1), Some(&2));

        let simplex = Simplex::new([2, 0, 1]).unwrap();
        assert_eq!(simplex.dimension(), 2);
        assert_eq!(NOT_APPLICABLE, "N/A");
    }
}
