//! OFF mesh export for visual inspection of reconstructions.
//!
//! The OFF face-list format can only represent cells up to dimension 3, so
//! export is guarded: a complex whose intrinsic dimension exceeds 3 is
//! reported as "not exported" (`Ok(None)`), never as an error.

use std::collections::BTreeSet;
use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use thiserror::Error;
use tracing::debug;

use crate::geometry::point::PointD;
use crate::topology::complex::{Simplex, SimplicialComplex};

/// Errors produced by mesh export.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum ExportError {
    /// The destination file could not be created or written.
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

/// Up to three highlight sets written with fixed, distinct color tags.
///
/// Precedence when a simplex appears in more than one set:
/// red (dimension defects) > green (coface defects) > blue (connectivity
/// defects).
#[derive(Clone, Copy, Debug, Default)]
pub struct Highlights<'a> {
    /// Red: wrong-dimension simplices.
    pub red: Option<&'a BTreeSet<Simplex>>,
    /// Green: wrong-coface-count simplices.
    pub green: Option<&'a BTreeSet<Simplex>>,
    /// Blue: unconnected-star simplices.
    pub blue: Option<&'a BTreeSet<Simplex>>,
}

impl<'a> Highlights<'a> {
    /// Highlights with only the red category set.
    #[must_use]
    pub fn red_only(set: &'a BTreeSet<Simplex>) -> Self {
        Self {
            red: Some(set),
            ..Self::default()
        }
    }

    fn color_of(&self, simplex: &Simplex) -> Option<&'static str> {
        if self.red.is_some_and(|s| s.contains(simplex)) {
            Some("1.0 0.0 0.0")
        } else if self.green.is_some_and(|s| s.contains(simplex)) {
            Some("0.0 1.0 0.0")
        } else if self.blue.is_some_and(|s| s.contains(simplex)) {
            Some("0.0 0.0 1.0")
        } else {
            None
        }
    }
}

/// Renders simplicial complexes to OFF files under a fixed output directory.
#[derive(Clone, Debug)]
pub struct MeshExporter {
    output_dir: PathBuf,
}

impl MeshExporter {
    /// Creates an exporter writing under `output_dir`.
    #[must_use]
    pub fn new(output_dir: impl Into<PathBuf>) -> Self {
        Self {
            output_dir: output_dir.into(),
        }
    }

    /// Exports `complex` to `<label>_<k>_in_R<d><suffix>.off`.
    ///
    /// Returns `Ok(None)` without touching the filesystem when
    /// `intrinsic_dim > 3`. Vertex coordinates are truncated or zero-padded
    /// to three components; simplices of dimension ≥ 1 are written as index
    /// lists, highlighted ones with their color tag.
    pub fn export(
        &self,
        points: &[PointD],
        complex: &SimplicialComplex,
        intrinsic_dim: usize,
        ambient_dim: usize,
        label: &str,
        suffix: &str,
        highlights: &Highlights<'_>,
    ) -> Result<Option<PathBuf>, ExportError> {
        if intrinsic_dim > 3 {
            debug!(intrinsic_dim, "export skipped: dimension not representable in OFF");
            return Ok(None);
        }

        fs::create_dir_all(&self.output_dir)?;
        let path = self
            .output_dir
            .join(format!("{label}_{intrinsic_dim}_in_R{ambient_dim}{suffix}.off"));
        let mut writer = BufWriter::new(File::create(&path)?);

        let faces: Vec<&Simplex> = complex.matching(|s| s.dimension() >= 1).collect();

        writeln!(writer, "OFF")?;
        writeln!(writer, "{} {} 0", points.len(), faces.len())?;
        for point in points {
            let mut coords = [0.0f64; 3];
            for (slot, &c) in coords.iter_mut().zip(point.coords().iter().take(3)) {
                *slot = c;
            }
            writeln!(writer, "{} {} {}", coords[0], coords[1], coords[2])?;
        }
        for simplex in faces {
            write!(writer, "{}", simplex.vertices().len())?;
            for &v in simplex.vertices() {
                write!(writer, " {v}")?;
            }
            if let Some(color) = highlights.color_of(simplex) {
                write!(writer, " {color}")?;
            }
            writeln!(writer)?;
        }
        writer.flush()?;

        debug!(path = %path.display(), "exported complex");
        Ok(Some(path))
    }
}

/// Strips directories and the extension from an input identifier, for use as
/// an output/metrics label.
#[must_use]
pub fn strip_input_name(input: &str) -> String {
    Path::new(input)
        .file_stem()
        .map_or_else(|| input.to_string(), |s| s.to_string_lossy().into_owned())
}
