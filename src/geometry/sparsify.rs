//! Point-set sparsification.

use tracing::debug;

use super::point::PointD;

/// Filters a point set so that no two retained points are closer than
/// `sparsity`.
///
/// This is a deterministic greedy filter, not a statistical sample: points
/// are visited in input order and a point is retained iff it is at squared
/// distance at least `sparsity²` from every previously retained point. A
/// non-positive `sparsity` returns the input unchanged, in the same order.
#[must_use]
pub fn sparsify_point_set(points: Vec<PointD>, sparsity: f64) -> Vec<PointD> {
    if sparsity <= 0.0 {
        return points;
    }

    let sq_threshold = sparsity * sparsity;
    let before = points.len();
    let mut retained: Vec<PointD> = Vec::with_capacity(points.len());
    for point in points {
        if retained.iter().all(|kept| kept.sq_dist(&point) >= sq_threshold) {
            retained.push(point);
        }
    }
    debug!(
        before,
        after = retained.len(),
        sparsity,
        "sparsified point set"
    );
    retained
}
