//! Seeded point-set generators for the experiment runner.
//!
//! Each generator samples a classical test manifold: the moment curve, a
//! 2-plane embedded in ambient space, the d-sphere, and three Klein-bottle
//! embeddings (the figure-8 immersion in R³, the flat embedding in R⁴, and a
//! 5-dimensional variant with an extra harmonic coordinate).
//!
//! All generators draw from a caller-supplied [`StdRng`] so experiment runs
//! are reproducible given a fixed seed.

use std::f64::consts::TAU;

use rand::Rng;
use rand::rngs::StdRng;
use rand_distr::StandardNormal;
use thiserror::Error;

use super::point::{PointD, PointError};

/// Errors produced by point-set generation.
#[derive(Clone, Debug, Error, PartialEq)]
#[non_exhaustive]
pub enum GeneratorError {
    /// A generator parameter is out of its valid range.
    #[error("Invalid parameters for {generator}: {details}")]
    InvalidParameters {
        /// Generator name as it appears in experiment scripts.
        generator: &'static str,
        /// What was wrong with the parameters.
        details: String,
    },

    /// The requested ambient dimension cannot host this generator's output.
    #[error("{generator} requires ambient dimension {required}, got {actual}")]
    AmbientDimension {
        /// Generator name as it appears in experiment scripts.
        generator: &'static str,
        /// Minimum (or exact) ambient dimension required.
        required: usize,
        /// Ambient dimension requested by the configuration.
        actual: usize,
    },

    /// A generated coordinate failed point validation.
    #[error(transparent)]
    Point(#[from] PointError),
}

/// The point generators recognized in experiment scripts.
///
/// Script identifiers match the original benchmark vocabulary
/// (`generate_moment_curve`, `generate_plane`, ...); anything else is treated
/// by the runner as a file path.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Generator {
    /// Points `(t, t², …, t^d)` with `t` uniform in `[param1, param2]`.
    MomentCurve,
    /// Points on the 2-plane spanned by the first two axes, remaining
    /// coordinates zero.
    Plane,
    /// Points on the (d−1)-sphere of radius `param1` with relative radius
    /// noise `param2`.
    SphereD,
    /// Figure-8 Klein bottle immersion in R³ with radii `param1`, `param2`.
    KleinBottle3D,
    /// Flat Klein bottle embedding in R⁴ with radii `param1`, `param2`.
    KleinBottle4D,
    /// R⁵ Klein bottle variant: the R⁴ embedding plus a second-harmonic
    /// fifth coordinate.
    KleinBottleVariant5D,
}

impl Generator {
    /// Resolves a script identifier to a generator, or `None` for file paths.
    #[must_use]
    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "generate_moment_curve" => Some(Self::MomentCurve),
            "generate_plane" => Some(Self::Plane),
            "generate_sphere_d" => Some(Self::SphereD),
            "generate_klein_bottle_3D" => Some(Self::KleinBottle3D),
            "generate_klein_bottle_4D" => Some(Self::KleinBottle4D),
            "generate_klein_bottle_variant_5D" => Some(Self::KleinBottleVariant5D),
            _ => None,
        }
    }

    /// Script identifier for this generator.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::MomentCurve => "generate_moment_curve",
            Self::Plane => "generate_plane",
            Self::SphereD => "generate_sphere_d",
            Self::KleinBottle3D => "generate_klein_bottle_3D",
            Self::KleinBottle4D => "generate_klein_bottle_4D",
            Self::KleinBottleVariant5D => "generate_klein_bottle_variant_5D",
        }
    }

    /// Generates `n_points` points in `ambient_dim`-dimensional space.
    ///
    /// `params` are the up-to-three positional generator parameters from the
    /// script line; unused entries are ignored.
    pub fn generate(
        self,
        n_points: usize,
        ambient_dim: usize,
        params: [f64; 3],
        rng: &mut StdRng,
    ) -> Result<Vec<PointD>, GeneratorError> {
        match self {
            Self::MomentCurve => moment_curve(n_points, ambient_dim, params[0], params[1], rng),
            Self::Plane => plane(n_points, ambient_dim, rng),
            Self::SphereD => sphere_d(n_points, ambient_dim, params[0], params[1], rng),
            Self::KleinBottle3D => klein_bottle(n_points, 3, params[0], params[1], rng),
            Self::KleinBottle4D => klein_bottle(n_points, 4, params[0], params[1], rng),
            Self::KleinBottleVariant5D => klein_bottle(n_points, 5, params[0], params[1], rng),
        }
    }
}

/// Points on the moment curve `(t, t², …, t^d)`, `t` uniform in `[min, max]`.
pub fn moment_curve(
    n_points: usize,
    ambient_dim: usize,
    min: f64,
    max: f64,
    rng: &mut StdRng,
) -> Result<Vec<PointD>, GeneratorError> {
    if ambient_dim == 0 {
        return Err(GeneratorError::AmbientDimension {
            generator: Generator::MomentCurve.name(),
            required: 1,
            actual: ambient_dim,
        });
    }
    if !(min < max) {
        return Err(GeneratorError::InvalidParameters {
            generator: Generator::MomentCurve.name(),
            details: format!("expected min < max, got [{min}, {max}]"),
        });
    }

    let mut points = Vec::with_capacity(n_points);
    for _ in 0..n_points {
        let t: f64 = rng.random_range(min..max);
        let mut coords = Vec::with_capacity(ambient_dim);
        let mut power = t;
        for _ in 0..ambient_dim {
            coords.push(power);
            power *= t;
        }
        points.push(PointD::new(coords)?);
    }
    Ok(points)
}

/// Points on the 2-plane spanned by the first two axes, padded with zeros.
pub fn plane(
    n_points: usize,
    ambient_dim: usize,
    rng: &mut StdRng,
) -> Result<Vec<PointD>, GeneratorError> {
    if ambient_dim < 2 {
        return Err(GeneratorError::AmbientDimension {
            generator: Generator::Plane.name(),
            required: 2,
            actual: ambient_dim,
        });
    }

    let mut points = Vec::with_capacity(n_points);
    for _ in 0..n_points {
        let mut coords = vec![0.0; ambient_dim];
        coords[0] = rng.random_range(-5.0..5.0);
        coords[1] = rng.random_range(-5.0..5.0);
        points.push(PointD::new(coords)?);
    }
    Ok(points)
}

/// Points on the (d−1)-sphere of the given radius.
///
/// Directions are sampled from per-coordinate standard normals and
/// normalized, giving the uniform distribution on the sphere.
/// `radius_noise` perturbs each radius multiplicatively by a uniform factor
/// in `[1 − noise, 1 + noise]`.
pub fn sphere_d(
    n_points: usize,
    ambient_dim: usize,
    radius: f64,
    radius_noise: f64,
    rng: &mut StdRng,
) -> Result<Vec<PointD>, GeneratorError> {
    if ambient_dim < 2 {
        return Err(GeneratorError::AmbientDimension {
            generator: Generator::SphereD.name(),
            required: 2,
            actual: ambient_dim,
        });
    }
    if radius <= 0.0 {
        return Err(GeneratorError::InvalidParameters {
            generator: Generator::SphereD.name(),
            details: format!("radius must be positive, got {radius}"),
        });
    }
    if !(0.0..1.0).contains(&radius_noise) {
        return Err(GeneratorError::InvalidParameters {
            generator: Generator::SphereD.name(),
            details: format!("radius noise must be in [0, 1), got {radius_noise}"),
        });
    }

    let mut points = Vec::with_capacity(n_points);
    while points.len() < n_points {
        let direction: Vec<f64> = (0..ambient_dim)
            .map(|_| rng.sample(StandardNormal))
            .collect();
        let norm = direction.iter().map(|x| x * x).sum::<f64>().sqrt();
        if norm < f64::EPSILON {
            // Degenerate draw; resample.
            continue;
        }
        let r = if radius_noise > 0.0 {
            radius * rng.random_range(1.0 - radius_noise..1.0 + radius_noise)
        } else {
            radius
        };
        let coords = direction.into_iter().map(|x| x / norm * r).collect();
        points.push(PointD::new(coords)?);
    }
    Ok(points)
}

/// Points on a Klein-bottle embedding in R³, R⁴, or R⁵.
///
/// `(u, v)` are uniform in `[0, 2π)²`. `a` is the major radius, `b` the minor
/// radius. In R³ this is the figure-8 immersion; in R⁴ the flat embedding;
/// the R⁵ variant appends `b·sin(2v)` as a fifth coordinate.
pub fn klein_bottle(
    n_points: usize,
    ambient_dim: usize,
    a: f64,
    b: f64,
    rng: &mut StdRng,
) -> Result<Vec<PointD>, GeneratorError> {
    let generator = match ambient_dim {
        3 => Generator::KleinBottle3D,
        4 => Generator::KleinBottle4D,
        5 => Generator::KleinBottleVariant5D,
        _ => {
            return Err(GeneratorError::AmbientDimension {
                generator: Generator::KleinBottle4D.name(),
                required: 4,
                actual: ambient_dim,
            });
        }
    };
    if a <= 0.0 || b <= 0.0 {
        return Err(GeneratorError::InvalidParameters {
            generator: generator.name(),
            details: format!("radii must be positive, got a={a}, b={b}"),
        });
    }

    let mut points = Vec::with_capacity(n_points);
    for _ in 0..n_points {
        let u: f64 = rng.random_range(0.0..TAU);
        let v: f64 = rng.random_range(0.0..TAU);
        let coords = match ambient_dim {
            3 => {
                // Figure-8 immersion.
                let w = a + b * ((u / 2.0).cos() * v.sin() - (u / 2.0).sin() * (2.0 * v).sin());
                vec![
                    w * u.cos(),
                    w * u.sin(),
                    b * ((u / 2.0).sin() * v.sin() + (u / 2.0).cos() * (2.0 * v).sin()),
                ]
            }
            4 => flat_klein_coords(u, v, a, b),
            _ => {
                let mut coords = flat_klein_coords(u, v, a, b);
                coords.push(b * (2.0 * v).sin());
                coords
            }
        };
        points.push(PointD::new(coords)?);
    }
    Ok(points)
}

fn flat_klein_coords(u: f64, v: f64, a: f64, b: f64) -> Vec<f64> {
    let w = a + b * v.cos();
    vec![
        w * u.cos(),
        w * u.sin(),
        b * v.sin() * (u / 2.0).cos(),
        b * v.sin() * (u / 2.0).sin(),
    ]
}
