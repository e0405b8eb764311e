//! Pure-pseudomanifold validation.
//!
//! A complex is a *pseudomanifold of intrinsic dimension k* if it is pure of
//! dimension k, every (k−1)-face is shared by exactly two k-simplices (one
//! also allowed under a boundary policy), and the dual adjacency graph of
//! every vertex star is connected. Violations are classified into three
//! disjoint categories, each carrying the offending simplices for diagnostic
//! export; validation failure is the primary measured outcome of a repair
//! run, never an error.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::collections::{FastHashMap, SmallBuffer, fast_hash_map_with_capacity};

use super::complex::{Simplex, SimplicialComplex};

/// One category of pseudomanifold defects: the offending simplices.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DefectSet {
    simplices: BTreeSet<Simplex>,
}

impl DefectSet {
    /// Number of offending simplices.
    #[must_use]
    pub fn count(&self) -> usize {
        self.simplices.len()
    }

    /// Whether this category has no offenders.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.simplices.is_empty()
    }

    /// The offending simplices, in stable order.
    #[must_use]
    pub fn simplices(&self) -> &BTreeSet<Simplex> {
        &self.simplices
    }

    fn insert(&mut self, simplex: Simplex) {
        self.simplices.insert(simplex);
    }
}

/// Result of [`SimplicialComplex::is_pure_pseudomanifold`]: one structured
/// value carrying all three defect categories, computed regardless of the
/// boolean outcome.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PseudomanifoldReport {
    /// Whether the complex is a pure pseudomanifold of the requested
    /// intrinsic dimension.
    pub is_pseudomanifold: bool,
    /// Maximal simplices whose dimension differs from the intrinsic
    /// dimension.
    pub wrong_dimension: DefectSet,
    /// Ridges with the wrong number of cofaces, together with their incident
    /// top-dimensional simplices.
    pub wrong_cofaces: DefectSet,
    /// Simplices belonging to a vertex star whose dual adjacency graph is
    /// disconnected.
    pub unconnected_stars: DefectSet,
}

impl SimplicialComplex {
    /// Checks the pure-pseudomanifold criterion at `intrinsic_dim`.
    ///
    /// `vertex_count` bounds the vertex index range for the star scan.
    /// With `boundary_allowed`, ridges incident to a single k-simplex are
    /// accepted. Vertex stars containing fewer than `min_star_size`
    /// k-simplices are exempt from the connectivity check.
    ///
    /// All three defect categories are always computed; the report's boolean
    /// is simply "all categories empty".
    #[must_use]
    pub fn is_pure_pseudomanifold(
        &self,
        intrinsic_dim: usize,
        vertex_count: usize,
        boundary_allowed: bool,
        min_star_size: usize,
    ) -> PseudomanifoldReport {
        let mut report = PseudomanifoldReport::default();

        // Purity: every maximal simplex must have exactly intrinsic_dim + 1
        // vertices.
        for simplex in self.iter() {
            if simplex.dimension() != intrinsic_dim && self.is_maximal(simplex) {
                report.wrong_dimension.insert(simplex.clone());
            }
        }

        let top_simplices: Vec<&Simplex> = self
            .matching(|s| s.dimension() == intrinsic_dim)
            .collect();

        // Manifold-edge condition: map each ridge to its incident
        // k-simplices and flag wrong multiplicities.
        let mut ridge_to_cofaces: FastHashMap<Simplex, SmallBuffer<usize, 2>> =
            fast_hash_map_with_capacity(top_simplices.len() * (intrinsic_dim + 1) / 2 + 1);
        for (index, simplex) in top_simplices.iter().enumerate() {
            for ridge in simplex.facets() {
                ridge_to_cofaces.entry(ridge).or_default().push(index);
            }
        }
        for (ridge, cofaces) in &ridge_to_cofaces {
            let ok = match cofaces.len() {
                2 => true,
                1 => boundary_allowed,
                _ => false,
            };
            if !ok {
                report.wrong_cofaces.insert(ridge.clone());
                for &index in cofaces {
                    report.wrong_cofaces.insert(top_simplices[index].clone());
                }
            }
        }

        // Star connectivity: the dual adjacency graph of each vertex star
        // (k-simplices adjacent when sharing a ridge) must be connected.
        for vertex in 0..vertex_count {
            let star: Vec<usize> = top_simplices
                .iter()
                .enumerate()
                .filter(|(_, s)| s.contains_vertex(vertex))
                .map(|(i, _)| i)
                .collect();
            if star.len() < min_star_size.max(2) {
                continue;
            }
            if !star_is_connected(&star, &top_simplices, intrinsic_dim) {
                for &index in &star {
                    report.unconnected_stars.insert(top_simplices[index].clone());
                }
            }
        }

        report.is_pseudomanifold = report.wrong_dimension.is_empty()
            && report.wrong_cofaces.is_empty()
            && report.unconnected_stars.is_empty();

        debug!(
            is_pseudomanifold = report.is_pseudomanifold,
            wrong_dimension = report.wrong_dimension.count(),
            wrong_cofaces = report.wrong_cofaces.count(),
            unconnected_stars = report.unconnected_stars.count(),
            "pseudomanifold check"
        );

        report
    }
}

/// BFS over the star's dual adjacency graph: members are adjacent when they
/// share all but one vertex.
fn star_is_connected(star: &[usize], top_simplices: &[&Simplex], intrinsic_dim: usize) -> bool {
    let mut visited = vec![false; star.len()];
    let mut queue = std::collections::VecDeque::from([0usize]);
    visited[0] = true;
    let mut reached = 1;
    while let Some(current) = queue.pop_front() {
        for next in 0..star.len() {
            if visited[next] {
                continue;
            }
            let shared =
                top_simplices[star[current]].shared_vertex_count(top_simplices[star[next]]);
            if shared == intrinsic_dim {
                visited[next] = true;
                reached += 1;
                queue.push_back(next);
            }
        }
    }
    reached == star.len()
}
