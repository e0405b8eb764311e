//! Simplices and simplicial complexes.
//!
//! A [`Simplex`] is an unordered set of unique vertex indices; a
//! [`SimplicialComplex`] is a set of simplices. Unlike the fixed-dimension
//! triangulation data structures common in Delaunay codes, the complex here
//! stores simplices of mixed dimension: the reconstruction engine emits
//! k-simplices but topological repair may add higher-dimensional patches and
//! collapse may leave lower-dimensional remnants.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::collections::{MAX_PRACTICAL_DIMENSION_SIZE, SmallBuffer};

/// Errors produced by simplex construction.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
#[non_exhaustive]
pub enum ComplexError {
    /// A simplex must contain at least one vertex.
    #[error("Simplex must contain at least one vertex")]
    EmptySimplex,
}

/// An abstract simplex: a set of unique vertex indices.
///
/// Vertices are stored sorted and deduplicated, so equality is set equality
/// and the derived `Ord` is a stable total order over vertex-index tuples,
/// which [`SimplicialComplex::collapse`] relies on for reproducibility.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Simplex {
    vertices: SmallBuffer<usize, MAX_PRACTICAL_DIMENSION_SIZE>,
}

impl Simplex {
    /// Creates a simplex from vertex indices, sorting and deduplicating.
    pub fn new(vertices: impl IntoIterator<Item = usize>) -> Result<Self, ComplexError> {
        let mut vertices: SmallBuffer<usize, MAX_PRACTICAL_DIMENSION_SIZE> =
            vertices.into_iter().collect();
        if vertices.is_empty() {
            return Err(ComplexError::EmptySimplex);
        }
        vertices.sort_unstable();
        vertices.dedup();
        Ok(Self { vertices })
    }

    /// Dimension: number of vertices minus one.
    #[must_use]
    pub fn dimension(&self) -> usize {
        self.vertices.len() - 1
    }

    /// Sorted vertex indices.
    #[must_use]
    pub fn vertices(&self) -> &[usize] {
        &self.vertices
    }

    /// Whether `vertex` is one of this simplex's vertices.
    #[must_use]
    pub fn contains_vertex(&self, vertex: usize) -> bool {
        self.vertices.binary_search(&vertex).is_ok()
    }

    /// Whether `self` is a proper face of `other` (strict subset of vertices).
    #[must_use]
    pub fn is_proper_face_of(&self, other: &Self) -> bool {
        self.vertices.len() < other.vertices.len()
            && self.vertices.iter().all(|&v| other.contains_vertex(v))
    }

    /// Number of shared vertices with `other`.
    #[must_use]
    pub fn shared_vertex_count(&self, other: &Self) -> usize {
        self.vertices
            .iter()
            .filter(|&&v| other.contains_vertex(v))
            .count()
    }

    /// The codimension-1 faces, each omitting one vertex.
    ///
    /// A 0-simplex has no facets.
    pub fn facets(&self) -> impl Iterator<Item = Simplex> + '_ {
        let n = self.vertices.len();
        (0..n).filter(move |_| n > 1).map(move |omit| {
            let vertices: SmallBuffer<usize, MAX_PRACTICAL_DIMENSION_SIZE> = self
                .vertices
                .iter()
                .enumerate()
                .filter(|&(i, _)| i != omit)
                .map(|(_, &v)| v)
                .collect();
            Simplex { vertices }
        })
    }

    /// The union of two simplices' vertex sets as a new simplex.
    #[must_use]
    pub fn union(&self, other: &Self) -> Simplex {
        let mut vertices: SmallBuffer<usize, MAX_PRACTICAL_DIMENSION_SIZE> =
            self.vertices.clone();
        vertices.extend(other.vertices.iter().copied());
        vertices.sort_unstable();
        vertices.dedup();
        Simplex { vertices }
    }
}

/// A set of simplices with classification, statistics, and simplification
/// operations.
///
/// Backed by a `BTreeSet`, so iteration order is the stable [`Simplex`]
/// total order and repeated runs over identical input are bit-identical.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SimplicialComplex {
    simplices: BTreeSet<Simplex>,
}

impl SimplicialComplex {
    /// Creates an empty complex.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts a simplex built from the given vertex indices.
    ///
    /// Idempotent: returns `true` iff the simplex was not already present.
    pub fn add_simplex(
        &mut self,
        vertices: impl IntoIterator<Item = usize>,
    ) -> Result<bool, ComplexError> {
        Ok(self.insert(Simplex::new(vertices)?))
    }

    /// Inserts an already-built simplex; returns `true` iff newly inserted.
    pub fn insert(&mut self, simplex: Simplex) -> bool {
        self.simplices.insert(simplex)
    }

    /// Whether the complex contains exactly this simplex.
    #[must_use]
    pub fn contains(&self, simplex: &Simplex) -> bool {
        self.simplices.contains(simplex)
    }

    /// Number of stored simplices.
    #[must_use]
    pub fn len(&self) -> usize {
        self.simplices.len()
    }

    /// Whether the complex is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.simplices.is_empty()
    }

    /// Iterates over the stored simplices in stable order.
    pub fn iter(&self) -> impl Iterator<Item = &Simplex> {
        self.simplices.iter()
    }

    /// Lazy sequence of simplices satisfying `predicate`.
    ///
    /// Restartable: each call re-evaluates against the complex as it is at
    /// call time, it is not a snapshot.
    pub fn matching<'a, P>(&'a self, predicate: P) -> impl Iterator<Item = &'a Simplex>
    where
        P: Fn(&Simplex) -> bool + 'a,
    {
        self.simplices.iter().filter(move |s| predicate(s))
    }

    /// Simplices of dimension strictly greater than `dim`.
    pub fn simplices_of_dimension_above(&self, dim: usize) -> impl Iterator<Item = &Simplex> {
        self.matching(move |s| s.dimension() > dim)
    }

    /// Largest dimension among stored simplices, `None` when empty.
    #[must_use]
    pub fn max_dimension(&self) -> Option<usize> {
        self.simplices.iter().map(Simplex::dimension).max()
    }

    /// Whether `simplex` is maximal: stored and not a proper face of any
    /// other stored simplex.
    #[must_use]
    pub fn is_maximal(&self, simplex: &Simplex) -> bool {
        self.contains(simplex)
            && !self
                .simplices
                .iter()
                .any(|other| simplex.is_proper_face_of(other))
    }

    /// Stored simplices strictly containing `simplex`.
    pub fn proper_cofaces<'a>(&'a self, simplex: &'a Simplex) -> impl Iterator<Item = &'a Simplex> {
        self.simplices
            .iter()
            .filter(move |other| simplex.is_proper_face_of(other))
    }

    /// Simplicial collapse: repeatedly removes free pairs until none remain.
    ///
    /// A stored simplex `f` is a *free face* if exactly one stored simplex
    /// strictly contains it; removing the pair `(f, coface)` preserves the
    /// homotopy type. Cofaces are consumed from `max_dimension` downward;
    /// within a dimension, candidate free faces are scanned in the complex's
    /// stable simplex order, so the result is deterministic.
    ///
    /// Returns the number of removed pairs. Calling `collapse` again on an
    /// already-collapsed complex removes nothing.
    pub fn collapse(&mut self, max_dimension: usize) -> usize {
        let mut pairs_removed = 0;
        // A low-dimension removal can newly free a face under a
        // higher-dimension coface, so the sweep repeats until a full pass
        // over all dimensions removes nothing.
        loop {
            let mut removed_this_pass = 0;
            for dim in (1..=max_dimension).rev() {
                loop {
                    let Some((face, coface)) = self.find_free_pair(dim) else {
                        break;
                    };
                    self.simplices.remove(&face);
                    self.simplices.remove(&coface);
                    removed_this_pass += 1;
                }
            }
            if removed_this_pass == 0 {
                break;
            }
            pairs_removed += removed_this_pass;
        }
        pairs_removed
    }

    /// First free pair `(face, coface)` whose coface has dimension `dim`,
    /// in stable scan order.
    fn find_free_pair(&self, dim: usize) -> Option<(Simplex, Simplex)> {
        for face in &self.simplices {
            if face.dimension() >= dim {
                continue;
            }
            let mut cofaces = self.proper_cofaces(face);
            let Some(first) = cofaces.next() else {
                continue;
            };
            if cofaces.next().is_none() && first.dimension() == dim {
                return Some((face.clone(), first.clone()));
            }
        }
        None
    }

    /// Per-dimension simplex counts, for diagnostic display. Side-effect-free.
    #[must_use]
    pub fn stats(&self) -> std::collections::BTreeMap<usize, usize> {
        let mut counts = std::collections::BTreeMap::new();
        for simplex in &self.simplices {
            *counts.entry(simplex.dimension()).or_insert(0) += 1;
        }
        counts
    }
}

impl FromIterator<Simplex> for SimplicialComplex {
    fn from_iter<I: IntoIterator<Item = Simplex>>(iter: I) -> Self {
        Self {
            simplices: iter.into_iter().collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn simplex(vertices: &[usize]) -> Simplex {
        Simplex::new(vertices.iter().copied()).unwrap()
    }

    #[test]
    fn simplex_is_sorted_and_deduplicated() {
        let s = simplex(&[3, 1, 2, 1]);
        assert_eq!(s.vertices(), &[1, 2, 3]);
        assert_eq!(s.dimension(), 2);
        assert_eq!(s, simplex(&[1, 2, 3]));
    }

    #[test]
    fn empty_simplex_is_rejected() {
        assert_eq!(
            Simplex::new(Vec::<usize>::new()),
            Err(ComplexError::EmptySimplex)
        );
    }

    #[test]
    fn facets_omit_one_vertex_each() {
        let facets: Vec<Simplex> = simplex(&[0, 1, 2]).facets().collect();
        assert_eq!(
            facets,
            vec![simplex(&[1, 2]), simplex(&[0, 2]), simplex(&[0, 1])]
        );
        assert_eq!(simplex(&[5]).facets().count(), 0);
    }

    #[test]
    fn proper_face_relation() {
        let edge = simplex(&[0, 1]);
        let triangle = simplex(&[0, 1, 2]);
        assert!(edge.is_proper_face_of(&triangle));
        assert!(!triangle.is_proper_face_of(&edge));
        assert!(!triangle.is_proper_face_of(&triangle));
    }

    #[test]
    fn add_simplex_is_idempotent() {
        let mut complex = SimplicialComplex::new();
        assert!(complex.add_simplex([0, 1, 2]).unwrap());
        assert!(!complex.add_simplex([2, 1, 0]).unwrap());
        assert_eq!(complex.len(), 1);
    }

    #[test]
    fn matching_reflects_complex_at_call_time() {
        let mut complex = SimplicialComplex::new();
        complex.add_simplex([0, 1]).unwrap();
        assert_eq!(complex.matching(|s| s.dimension() == 1).count(), 1);
        complex.add_simplex([2, 3]).unwrap();
        assert_eq!(complex.matching(|s| s.dimension() == 1).count(), 2);
    }

    #[test]
    fn stats_counts_per_dimension() {
        let mut complex = SimplicialComplex::new();
        complex.add_simplex([0]).unwrap();
        complex.add_simplex([0, 1]).unwrap();
        complex.add_simplex([1, 2]).unwrap();
        complex.add_simplex([0, 1, 2]).unwrap();
        let stats = complex.stats();
        assert_eq!(stats.get(&0), Some(&1));
        assert_eq!(stats.get(&1), Some(&2));
        assert_eq!(stats.get(&2), Some(&1));
    }

    #[test]
    fn collapse_removes_free_pair() {
        // A triangle with one stored edge that belongs to it alone.
        let mut complex = SimplicialComplex::new();
        complex.add_simplex([0, 1, 2]).unwrap();
        complex.add_simplex([0, 1]).unwrap();
        let removed = complex.collapse(2);
        assert_eq!(removed, 1);
        assert!(complex.is_empty());
    }

    #[test]
    fn collapse_spares_shared_faces() {
        // Edge [1,2] belongs to both triangles and is not free.
        let mut complex = SimplicialComplex::new();
        complex.add_simplex([0, 1, 2]).unwrap();
        complex.add_simplex([1, 2, 3]).unwrap();
        complex.add_simplex([1, 2]).unwrap();
        let removed = complex.collapse(2);
        assert_eq!(removed, 0);
        assert_eq!(complex.len(), 3);
    }

    #[test]
    fn collapse_revisits_higher_dimensions_after_lower_removals() {
        // {0} starts with two cofaces ({0,1} and {0,2,3}) and is not free.
        // Removing the dim-1 pair ({1},{0,1}) frees it under the triangle,
        // which only a repeated dim-2 sweep can pick up.
        let mut complex = SimplicialComplex::new();
        complex.add_simplex([0]).unwrap();
        complex.add_simplex([1]).unwrap();
        complex.add_simplex([0, 1]).unwrap();
        complex.add_simplex([0, 2, 3]).unwrap();

        assert_eq!(complex.collapse(2), 2);
        assert!(complex.is_empty());
        assert_eq!(complex.collapse(2), 0);
    }

    #[test]
    fn collapse_never_increases_count_and_is_idempotent() {
        let mut complex = SimplicialComplex::new();
        complex.add_simplex([0, 1, 2, 3]).unwrap();
        complex.add_simplex([0, 1, 2]).unwrap();
        complex.add_simplex([0, 1]).unwrap();
        let before = complex.len();
        complex.collapse(3);
        assert!(complex.len() <= before);
        let after_first = complex.clone();
        assert_eq!(complex.collapse(3), 0);
        assert_eq!(complex, after_first);
    }
}
