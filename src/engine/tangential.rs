//! Reference tangential-complex engine.
//!
//! Builds, for every sample point, a local star from its nearest neighbors
//! projected onto an estimated tangent space, then reconciles the stars:
//! a star simplex is *consistent* when every one of its vertices carries it
//! in its own star. The per-point local-geometry phase is embarrassingly
//! parallel and runs on a fixed-size worker pool; workers read the shared,
//! immutable point set and produce disjoint per-point results merged
//! afterwards.
//!
//! The tangent estimation here (PCA of the centered neighbor cloud) is a
//! reference scheme: the pipeline only depends on the
//! [`ReconstructionEngine`] contract, not on how local triangulations are
//! produced.

use std::collections::BTreeSet;
use std::time::{Duration, Instant};

use nalgebra::{DMatrix, DVector};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rayon::prelude::*;
use tracing::{debug, trace};

use crate::geometry::point::PointD;
use crate::topology::complex::{Simplex, SimplicialComplex};

use super::{EngineError, FixOutcome, FixStatus, ReconstructionEngine};

/// Extra nearest neighbors examined beyond the intrinsic dimension when
/// estimating a tangent basis.
const TANGENT_NEIGHBORHOOD_SLACK: usize = 4;

/// Fraction of the nearest-neighbor distance used as perturbation magnitude.
const PERTURBATION_SCALE: f64 = 0.3;

/// Tangential-complex reconstruction over a dynamic-dimension point set.
#[derive(Debug)]
pub struct TangentialComplex {
    points: Vec<PointD>,
    intrinsic_dim: usize,
    ambient_dim: usize,
    pool: Option<rayon::ThreadPool>,
    rng: StdRng,
    /// Per-point local stars; index i holds the simplices incident to i.
    stars: Vec<BTreeSet<Simplex>>,
    /// Higher-dimensional patches added by the second-pass repair.
    patches: BTreeSet<Simplex>,
}

impl TangentialComplex {
    /// Computes the local star of point `i`: one k-simplex over `i` and its
    /// k nearest neighbors in the estimated tangent plane.
    fn local_star(&self, i: usize) -> Option<Simplex> {
        let k = self.intrinsic_dim;
        let center = &self.points[i];

        // Candidate neighborhood: the m ambient-nearest neighbors, ties
        // broken by index so the result is order-independent of the scan.
        let m = (k + TANGENT_NEIGHBORHOOD_SLACK).min(self.points.len() - 1);
        if m < k {
            return None;
        }
        let mut by_distance: Vec<(f64, usize)> = self
            .points
            .iter()
            .enumerate()
            .filter(|&(j, _)| j != i)
            .map(|(j, p)| (center.sq_dist(p), j))
            .collect();
        by_distance
            .sort_unstable_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));
        let candidates = &by_distance[..m];

        // Tangent basis: top-k right singular vectors of the centered
        // neighbor matrix.
        let d = self.ambient_dim;
        let centered = DMatrix::from_fn(m, d, |row, col| {
            self.points[candidates[row].1].coords()[col] - center.coords()[col]
        });
        let svd = centered.svd(false, true);
        let v_t = svd.v_t?;
        let basis = v_t.rows(0, k.min(v_t.nrows())).into_owned();

        // Rank neighbors by squared norm of their tangent-plane projection,
        // ties again broken by index.
        let mut projected: Vec<(f64, usize)> = candidates
            .iter()
            .map(|&(_, j)| {
                let delta = DVector::from_fn(d, |row, _| {
                    self.points[j].coords()[row] - center.coords()[row]
                });
                let proj = &basis * &delta;
                (proj.norm_squared(), j)
            })
            .collect();
        projected
            .sort_unstable_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));

        let vertices = std::iter::once(i).chain(projected[..k].iter().map(|&(_, j)| j));
        Simplex::new(vertices).ok()
    }

    /// Rebuilds every local star from the current point positions.
    fn rebuild_stars(&mut self) {
        let n = self.points.len();
        let stars: Vec<Option<Simplex>> = match &self.pool {
            Some(pool) => pool.install(|| (0..n).into_par_iter().map(|i| self.local_star(i)).collect()),
            None => (0..n).into_par_iter().map(|i| self.local_star(i)).collect(),
        };
        self.stars = stars
            .into_iter()
            .map(|star| star.into_iter().collect())
            .collect();
    }

    /// Whether `simplex`, found in some star, is carried by the stars of all
    /// of its vertices.
    fn is_consistent(&self, simplex: &Simplex) -> bool {
        simplex
            .vertices()
            .iter()
            .all(|&v| self.stars[v].contains(simplex))
    }

    /// Indices of points whose star contains an inconsistent simplex.
    fn inconsistent_points(&self) -> Vec<usize> {
        (0..self.points.len())
            .filter(|&i| self.stars[i].iter().any(|s| !self.is_consistent(s)))
            .collect()
    }

    /// Nearest-neighbor distance of point `i`, used to scale perturbations.
    fn nearest_neighbor_distance(&self, i: usize) -> f64 {
        self.points
            .iter()
            .enumerate()
            .filter(|&(j, _)| j != i)
            .map(|(_, p)| self.points[i].sq_dist(p))
            .fold(f64::INFINITY, f64::min)
            .sqrt()
    }

    /// Displaces point `i` by a random offset proportional to its local scale.
    fn perturb_point(&mut self, i: usize) {
        let scale = self.nearest_neighbor_distance(i);
        if !scale.is_finite() || scale == 0.0 {
            return;
        }
        let magnitude = scale * PERTURBATION_SCALE;
        let coords: Vec<f64> = self.points[i]
            .coords()
            .iter()
            .map(|&c| c + self.rng.random_range(-magnitude..magnitude))
            .collect();
        if let Ok(point) = PointD::new(coords) {
            self.points[i] = point;
        }
    }
}

impl ReconstructionEngine for TangentialComplex {
    fn construct(
        points: Vec<PointD>,
        intrinsic_dim: usize,
        workers: Option<usize>,
        seed: u64,
    ) -> Result<Self, EngineError> {
        let Some(first) = points.first() else {
            return Err(EngineError::EmptyPointSet);
        };
        let ambient_dim = first.dim();
        for (index, point) in points.iter().enumerate() {
            if point.dim() != ambient_dim {
                return Err(EngineError::MixedAmbientDimension {
                    index,
                    expected: ambient_dim,
                    actual: point.dim(),
                });
            }
        }
        if intrinsic_dim == 0 || intrinsic_dim > ambient_dim {
            return Err(EngineError::InvalidIntrinsicDimension {
                intrinsic: intrinsic_dim,
                ambient: ambient_dim,
            });
        }

        let pool = match workers {
            Some(n) if n > 0 => Some(
                rayon::ThreadPoolBuilder::new()
                    .num_threads(n)
                    .build()
                    .map_err(|e| EngineError::WorkerPool(e.to_string()))?,
            ),
            _ => None,
        };

        let n = points.len();
        Ok(Self {
            points,
            intrinsic_dim,
            ambient_dim,
            pool,
            rng: StdRng::seed_from_u64(seed),
            stars: vec![BTreeSet::new(); n],
            patches: BTreeSet::new(),
        })
    }

    fn compute(&mut self) {
        self.rebuild_stars();
        debug!(
            vertices = self.points.len(),
            inconsistent = self.inconsistent_points().len(),
            "tangential complex computed"
        );
    }

    fn fix_inconsistencies(&mut self, time_limit: Duration) -> FixOutcome {
        let start = Instant::now();
        let initial = self.inconsistent_points().len();
        let mut best = initial;
        let mut current = initial;
        let mut steps = 0u32;

        while current > 0 && start.elapsed() < time_limit {
            let targets = self.inconsistent_points();
            for i in targets {
                self.perturb_point(i);
            }
            self.rebuild_stars();
            steps += 1;
            current = self.inconsistent_points().len();
            best = best.min(current);
            trace!(steps, current, best, "perturbation iteration");
        }

        let status = if current == 0 {
            FixStatus::Fixed
        } else {
            FixStatus::NotFixed
        };
        debug!(?status, steps, initial, best, current, "perturbation repair done");
        FixOutcome {
            status,
            steps,
            initial,
            best,
            final_count: current,
        }
    }

    fn resolve_by_adding_higher_dimension_simplices(&mut self) -> usize {
        let mut added = 0;
        // Snapshot: patching mutates stars as it reconciles them.
        let star_simplices: Vec<Simplex> = self
            .stars
            .iter()
            .flat_map(|star| star.iter().cloned())
            .collect();

        for simplex in star_simplices {
            for &v in simplex.vertices() {
                if self.stars[v].contains(&simplex) {
                    continue;
                }
                // Patch the disagreement with the union of the missing
                // star's own simplex and the contested one, then record the
                // contested simplex so the star becomes consistent.
                if let Some(witness) = self.stars[v].iter().next().cloned() {
                    let union = simplex.union(&witness);
                    if union.dimension() > self.intrinsic_dim && self.patches.insert(union) {
                        added += 1;
                    }
                }
                self.stars[v].insert(simplex.clone());
            }
        }
        debug!(added, "higher-dimension simplex resolution done");
        added
    }

    fn export_to(&self, complex: &mut SimplicialComplex) -> usize {
        let mut max_dim = 0;
        for star in &self.stars {
            for simplex in star {
                max_dim = max_dim.max(simplex.dimension());
                complex.insert(simplex.clone());
            }
        }
        for patch in &self.patches {
            max_dim = max_dim.max(patch.dimension());
            complex.insert(patch.clone());
        }
        max_dim
    }

    fn inconsistent_simplices(&self) -> BTreeSet<Simplex> {
        self.stars
            .iter()
            .flat_map(|star| star.iter())
            .filter(|s| !self.is_consistent(s))
            .cloned()
            .collect()
    }

    fn number_of_vertices(&self) -> usize {
        self.points.len()
    }

    fn intrinsic_dimension(&self) -> usize {
        self.intrinsic_dim
    }

    fn ambient_dimension(&self) -> usize {
        self.ambient_dim
    }

    fn points(&self) -> &[PointD] {
        &self.points
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn segment_points() -> Vec<PointD> {
        vec![
            PointD::new(vec![0.0, 0.0]).unwrap(),
            PointD::new(vec![1.0, 0.0]).unwrap(),
        ]
    }

    fn circle_points(n: usize) -> Vec<PointD> {
        (0..n)
            .map(|i| {
                #[allow(clippy::cast_precision_loss)]
                let angle = std::f64::consts::TAU * i as f64 / n as f64;
                PointD::new(vec![angle.cos(), angle.sin()]).unwrap()
            })
            .collect()
    }

    #[test]
    fn construct_rejects_bad_input() {
        assert_eq!(
            TangentialComplex::construct(vec![], 1, None, 0).unwrap_err(),
            EngineError::EmptyPointSet
        );
        let mixed = vec![
            PointD::new(vec![0.0, 0.0]).unwrap(),
            PointD::new(vec![0.0]).unwrap(),
        ];
        assert!(matches!(
            TangentialComplex::construct(mixed, 1, None, 0).unwrap_err(),
            EngineError::MixedAmbientDimension { index: 1, .. }
        ));
        assert!(matches!(
            TangentialComplex::construct(segment_points(), 3, None, 0).unwrap_err(),
            EngineError::InvalidIntrinsicDimension { .. }
        ));
    }

    #[test]
    fn two_point_segment_is_already_consistent() {
        let mut engine = TangentialComplex::construct(segment_points(), 1, None, 7).unwrap();
        engine.compute();
        assert_eq!(engine.inconsistent_points().len(), 0);

        let outcome = engine.fix_inconsistencies(Duration::ZERO);
        assert_eq!(outcome.status, FixStatus::Fixed);
        assert_eq!(outcome.steps, 0);
        assert_eq!(outcome.initial, 0);
    }

    #[test]
    fn zero_time_limit_performs_no_steps() {
        let mut engine = TangentialComplex::construct(circle_points(12), 1, None, 7).unwrap();
        engine.compute();
        let before = engine.inconsistent_points().len();
        let start = Instant::now();
        let outcome = engine.fix_inconsistencies(Duration::ZERO);
        assert!(start.elapsed() < Duration::from_millis(250));
        assert_eq!(outcome.steps, 0);
        assert_eq!(outcome.initial, before);
        assert_eq!(outcome.final_count, before);
        if before > 0 {
            assert_eq!(outcome.status, FixStatus::NotFixed);
        }
    }

    #[test]
    fn resolution_eliminates_all_inconsistencies() {
        let mut engine = TangentialComplex::construct(circle_points(16), 1, None, 3).unwrap();
        engine.compute();
        engine.resolve_by_adding_higher_dimension_simplices();
        assert_eq!(engine.inconsistent_points().len(), 0);
        assert!(engine.inconsistent_simplices().is_empty());
    }

    #[test]
    fn export_includes_stars_and_patches() {
        let mut engine = TangentialComplex::construct(circle_points(16), 1, None, 3).unwrap();
        engine.compute();
        let added = engine.resolve_by_adding_higher_dimension_simplices();
        let mut complex = SimplicialComplex::new();
        let max_dim = engine.export_to(&mut complex);
        assert!(!complex.is_empty());
        if added > 0 {
            assert!(max_dim > 1);
            assert!(complex.simplices_of_dimension_above(1).count() >= added);
        }
    }

    #[test]
    fn worker_pool_matches_sequential_result() {
        let mut sequential =
            TangentialComplex::construct(circle_points(20), 1, None, 11).unwrap();
        let mut pooled =
            TangentialComplex::construct(circle_points(20), 1, Some(2), 11).unwrap();
        sequential.compute();
        pooled.compute();
        let mut a = SimplicialComplex::new();
        let mut b = SimplicialComplex::new();
        sequential.export_to(&mut a);
        pooled.export_to(&mut b);
        assert_eq!(a, b);
    }

    #[test]
    fn compute_is_reproducible() {
        let build = || {
            let mut engine =
                TangentialComplex::construct(circle_points(24), 1, None, 42).unwrap();
            engine.compute();
            let mut complex = SimplicialComplex::new();
            engine.export_to(&mut complex);
            complex
        };
        assert_eq!(build(), build());
    }
}
