//! Integration tests for pure-pseudomanifold validation.
//!
//! These tests cover:
//! - Closed surfaces that must pass (tetrahedron and octahedron boundaries)
//! - Closed curves at intrinsic dimension 1
//! - Each defect category in isolation and in combination
//! - Defect categories staying disjoint in mixed failures

use tangential::prelude::*;

fn simplex(vertices: &[usize]) -> Simplex {
    Simplex::new(vertices.iter().copied()).unwrap()
}

/// Boundary of the octahedron: 8 triangles over 6 vertices, every edge shared
/// by exactly two triangles, every vertex star a 4-cycle.
fn octahedron_boundary() -> SimplicialComplex {
    [
        [0, 2, 4],
        [0, 4, 3],
        [0, 3, 5],
        [0, 5, 2],
        [1, 2, 4],
        [1, 4, 3],
        [1, 3, 5],
        [1, 5, 2],
    ]
    .into_iter()
    .map(|v| Simplex::new(v).unwrap())
    .collect()
}

/// A closed n-cycle of edges: a pure 1-pseudomanifold.
fn cycle(n: usize) -> SimplicialComplex {
    (0..n)
        .map(|i| Simplex::new([i, (i + 1) % n]).unwrap())
        .collect()
}

// =========================================================================
// Closed manifolds pass
// =========================================================================

#[test]
fn octahedron_boundary_is_pure_pseudomanifold() {
    let report = octahedron_boundary().is_pure_pseudomanifold(2, 6, false, 1);
    assert!(report.is_pseudomanifold);
    assert!(report.wrong_dimension.is_empty());
    assert!(report.wrong_cofaces.is_empty());
    assert!(report.unconnected_stars.is_empty());
}

#[test]
fn cycle_is_pure_pseudomanifold_at_dimension_one() {
    let report = cycle(8).is_pure_pseudomanifold(1, 8, false, 1);
    assert!(report.is_pseudomanifold);
}

#[test]
fn open_path_needs_boundary_allowance() {
    // A path of 3 edges: the two endpoint vertices are ridges with one coface.
    let mut complex = SimplicialComplex::new();
    for i in 0..3 {
        complex.add_simplex([i, i + 1]).unwrap();
    }
    let strict = complex.is_pure_pseudomanifold(1, 4, false, 1);
    assert!(!strict.is_pseudomanifold);
    assert!(strict.wrong_cofaces.count() > 0);

    let with_boundary = complex.is_pure_pseudomanifold(1, 4, true, 1);
    assert!(with_boundary.is_pseudomanifold);
}

// =========================================================================
// Defect categories
// =========================================================================

#[test]
fn over_dimension_patch_is_a_purity_defect() {
    let mut complex = octahedron_boundary();
    complex.add_simplex([0, 2, 4, 1]).unwrap();
    let report = complex.is_pure_pseudomanifold(2, 6, false, 1);
    assert!(!report.is_pseudomanifold);
    assert!(
        report
            .wrong_dimension
            .simplices()
            .contains(&simplex(&[0, 1, 2, 4]))
    );
    // The triangles it covers are faces, not maximal, and stay unflagged.
    assert!(
        !report
            .wrong_dimension
            .simplices()
            .contains(&simplex(&[0, 2, 4]))
    );
}

#[test]
fn three_triangles_on_one_edge_are_a_coface_defect() {
    let mut complex = SimplicialComplex::new();
    for tri in [[0, 1, 2], [0, 1, 3], [0, 1, 4]] {
        complex.add_simplex(tri).unwrap();
    }
    let report = complex.is_pure_pseudomanifold(2, 5, true, 1);
    assert!(!report.is_pseudomanifold);
    // The shared edge plus its three incident triangles.
    assert!(report.wrong_cofaces.simplices().contains(&simplex(&[0, 1])));
    assert!(report.wrong_cofaces.count() >= 4);
}

#[test]
fn figure_eight_fails_by_coface_count() {
    // Two 4-cycles glued at vertex 0: the glue vertex is a ridge with four
    // edge cofaces. Its star still counts as connected because every member
    // shares that ridge.
    let mut complex = SimplicialComplex::new();
    for edge in [[0, 1], [1, 2], [2, 3], [3, 0]] {
        complex.add_simplex(edge).unwrap();
    }
    for edge in [[0, 4], [4, 5], [5, 6], [6, 0]] {
        complex.add_simplex(edge).unwrap();
    }
    let report = complex.is_pure_pseudomanifold(1, 7, false, 1);
    assert!(!report.is_pseudomanifold);
    assert!(report.wrong_cofaces.simplices().contains(&simplex(&[0])));
    assert!(report.unconnected_stars.is_empty());
}

#[test]
fn pinched_spheres_are_a_star_defect() {
    // Two octahedron boundaries glued at one pole. Every edge keeps exactly
    // two triangle cofaces, but the glue vertex's star splits into two dual
    // components of four triangles each.
    let mut complex = octahedron_boundary();
    for tri in [
        [0, 7, 9],
        [0, 9, 8],
        [0, 8, 10],
        [0, 10, 7],
        [6, 7, 9],
        [6, 9, 8],
        [6, 8, 10],
        [6, 10, 7],
    ] {
        complex.add_simplex(tri).unwrap();
    }
    let report = complex.is_pure_pseudomanifold(2, 11, false, 1);
    assert!(!report.is_pseudomanifold);
    assert!(report.wrong_dimension.is_empty());
    assert!(report.wrong_cofaces.is_empty());
    // Exactly the eight triangles of the glue vertex's star.
    assert_eq!(report.unconnected_stars.count(), 8);
    assert!(
        report
            .unconnected_stars
            .simplices()
            .iter()
            .all(|s| s.contains_vertex(0))
    );
}

#[test]
fn mixed_failure_reports_every_category() {
    let mut complex = octahedron_boundary();
    // Purity defect: a maximal dangling edge.
    complex.add_simplex([0, 7]).unwrap();
    // Coface defect: a third triangle on edge [0, 2].
    complex.add_simplex([0, 2, 8]).unwrap();
    let report = complex.is_pure_pseudomanifold(2, 9, false, 1);
    assert!(!report.is_pseudomanifold);
    assert!(!report.wrong_dimension.is_empty());
    assert!(!report.wrong_cofaces.is_empty());
    assert!(
        report
            .wrong_dimension
            .simplices()
            .contains(&simplex(&[0, 7]))
    );
    assert!(report.wrong_cofaces.simplices().contains(&simplex(&[0, 2])));
}

#[test]
fn report_is_stable_across_repeated_checks() {
    let complex = octahedron_boundary();
    let a = complex.is_pure_pseudomanifold(2, 6, false, 1);
    let b = complex.is_pure_pseudomanifold(2, 6, false, 1);
    assert_eq!(a, b);
}
