//! Dynamic-dimension points.
//!
//! The ambient dimension of a reconstruction run is a value read from the
//! experiment script, not a compile-time constant, so points carry their
//! coordinates in an owned vector and expose the dimension at runtime.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors produced when constructing a [`PointD`].
#[derive(Clone, Debug, Error, PartialEq)]
#[non_exhaustive]
pub enum PointError {
    /// A point must have at least one coordinate.
    #[error("Point must have at least one coordinate")]
    Empty,

    /// Coordinates must be finite (no NaN or infinity).
    #[error("Coordinate {index} is not finite: {value}")]
    NonFinite {
        /// Index of the offending coordinate.
        index: usize,
        /// The non-finite value encountered.
        value: f64,
    },
}

/// A point in D-dimensional ambient space, D fixed per run.
///
/// Construction validates that every coordinate is finite, so downstream
/// distance computations never observe NaN.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct PointD {
    coords: Vec<f64>,
}

impl PointD {
    /// Creates a point from its coordinates, validating finiteness.
    pub fn new(coords: Vec<f64>) -> Result<Self, PointError> {
        if coords.is_empty() {
            return Err(PointError::Empty);
        }
        for (index, &value) in coords.iter().enumerate() {
            if !value.is_finite() {
                return Err(PointError::NonFinite { index, value });
            }
        }
        Ok(Self { coords })
    }

    /// Ambient dimension of this point.
    #[must_use]
    pub fn dim(&self) -> usize {
        self.coords.len()
    }

    /// Coordinate slice.
    #[must_use]
    pub fn coords(&self) -> &[f64] {
        &self.coords
    }

    /// Squared Euclidean distance to another point.
    ///
    /// Both points must have the same dimension; mismatched dimensions are a
    /// caller bug and only checked in debug builds.
    #[must_use]
    pub fn sq_dist(&self, other: &Self) -> f64 {
        debug_assert_eq!(self.dim(), other.dim(), "dimension mismatch in sq_dist");
        self.coords
            .iter()
            .zip(&other.coords)
            .map(|(a, b)| {
                let d = a - b;
                d * d
            })
            .sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn new_validates_coordinates() {
        assert!(PointD::new(vec![0.0, 1.0, 2.0]).is_ok());
        assert_eq!(PointD::new(vec![]), Err(PointError::Empty));
        assert!(matches!(
            PointD::new(vec![0.0, f64::NAN]),
            Err(PointError::NonFinite { index: 1, .. })
        ));
        assert!(matches!(
            PointD::new(vec![f64::INFINITY]),
            Err(PointError::NonFinite { index: 0, .. })
        ));
    }

    #[test]
    fn sq_dist_matches_hand_computation() {
        let a = PointD::new(vec![0.0, 0.0, 0.0]).unwrap();
        let b = PointD::new(vec![1.0, 2.0, 2.0]).unwrap();
        assert_relative_eq!(a.sq_dist(&b), 9.0);
        assert_relative_eq!(a.sq_dist(&a), 0.0);
    }

    #[test]
    fn serde_round_trip() {
        let p = PointD::new(vec![1.5, -2.5]).unwrap();
        let json = serde_json::to_string(&p).unwrap();
        let back: PointD = serde_json::from_str(&json).unwrap();
        assert_eq!(p, back);
    }
}
