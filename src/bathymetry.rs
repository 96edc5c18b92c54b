//! Structured source grids.
//!
//! A [`GridGeometry`] describes a regular, unrotated SWASH input grid by its
//! origin, spacing and sample counts. A [`ScalarField`] attaches one value per
//! grid sample, with samples equal to the exception value stored as missing.
//! [`BathymetryGrid`] pairs the bottom field with its porosity field.
//!
//! Storage is row-major with row 0 the southern row, whatever layout the
//! source file used.

use thiserror::Error;

use crate::types::Bounds2D;

/// Error building a structured grid.
#[derive(Debug, Error)]
pub enum BathymetryError {
    /// Grid geometry is unusable.
    #[error("Invalid grid geometry: {0}")]
    InvalidGeometry(String),

    /// Value array does not match the grid shape.
    #[error("Shape mismatch for {what}: expected {expected} values, got {actual}")]
    ShapeMismatch {
        what: &'static str,
        expected: usize,
        actual: usize,
    },
}

/// Geometry of a regular structured grid.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct GridGeometry {
    /// x of the south-west sample
    pub x0: f64,
    /// y of the south-west sample
    pub y0: f64,
    pub dx: f64,
    pub dy: f64,
    /// Samples per row (SWASH `mx + 1`)
    pub n_cols: usize,
    /// Number of rows (SWASH `my + 1`)
    pub n_rows: usize,
}

impl GridGeometry {
    pub fn new(x0: f64, y0: f64, dx: f64, dy: f64, n_cols: usize, n_rows: usize) -> Self {
        Self {
            x0,
            y0,
            dx,
            dy,
            n_cols,
            n_rows,
        }
    }

    /// Build from SWASH `INPGRID` numbers, where `mx`/`my` count meshes, not samples.
    pub fn from_swash(xp: f64, yp: f64, mx: usize, my: usize, dx: f64, dy: f64) -> Self {
        Self::new(xp, yp, dx, dy, mx + 1, my + 1)
    }

    pub fn validate(&self) -> Result<(), BathymetryError> {
        if !(self.x0.is_finite() && self.y0.is_finite()) {
            return Err(BathymetryError::InvalidGeometry(format!(
                "origin ({}, {}) is not finite",
                self.x0, self.y0
            )));
        }
        if !(self.dx > 0.0 && self.dy > 0.0) || !(self.dx.is_finite() && self.dy.is_finite()) {
            return Err(BathymetryError::InvalidGeometry(format!(
                "spacing ({}, {}) must be positive",
                self.dx, self.dy
            )));
        }
        if self.n_cols < 2 || self.n_rows < 2 {
            return Err(BathymetryError::InvalidGeometry(format!(
                "grid needs at least 2x2 samples, got {}x{}",
                self.n_cols, self.n_rows
            )));
        }
        if self.checked_len().is_none() {
            return Err(BathymetryError::InvalidGeometry(format!(
                "{}x{} samples overflow the address space",
                self.n_cols, self.n_rows
            )));
        }
        Ok(())
    }

    /// Total number of samples, saturating at `usize::MAX`.
    #[inline]
    pub fn len(&self) -> usize {
        self.n_cols.saturating_mul(self.n_rows)
    }

    /// Total number of samples, `None` on overflow.
    #[inline]
    pub fn checked_len(&self) -> Option<usize> {
        self.n_cols.checked_mul(self.n_rows)
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Row-major index of sample (col, row).
    #[inline]
    pub fn index(&self, col: usize, row: usize) -> usize {
        row * self.n_cols + col
    }

    #[inline]
    pub fn x(&self, col: usize) -> f64 {
        self.x0 + col as f64 * self.dx
    }

    #[inline]
    pub fn y(&self, row: usize) -> f64 {
        self.y0 + row as f64 * self.dy
    }

    /// Extent covered by the samples.
    pub fn bounds(&self) -> Bounds2D {
        Bounds2D::from_extent(
            self.x0,
            self.x(self.n_cols.saturating_sub(1)),
            self.y0,
            self.y(self.n_rows.saturating_sub(1)),
        )
    }

    /// Smaller of the two spacings.
    pub fn min_spacing(&self) -> f64 {
        self.dx.min(self.dy)
    }

    /// Same geometry up to a relative tolerance on the coordinates.
    pub fn matches(&self, other: &GridGeometry) -> bool {
        let tol = 1e-9 * self.bounds().diagonal().max(1.0);
        self.n_cols == other.n_cols
            && self.n_rows == other.n_rows
            && (self.x0 - other.x0).abs() <= tol
            && (self.y0 - other.y0).abs() <= tol
            && (self.dx - other.dx).abs() <= tol
            && (self.dy - other.dy).abs() <= tol
    }
}

/// One value per grid sample; `None` marks a missing sample.
#[derive(Clone, Debug, PartialEq)]
pub struct ScalarField {
    geometry: GridGeometry,
    values: Vec<Option<f64>>,
    exception: Option<f64>,
}

impl ScalarField {
    pub fn new(
        geometry: GridGeometry,
        values: Vec<Option<f64>>,
        exception: Option<f64>,
    ) -> Result<Self, BathymetryError> {
        geometry.validate()?;
        if values.len() != geometry.len() {
            return Err(BathymetryError::ShapeMismatch {
                what: "values",
                expected: geometry.len(),
                actual: values.len(),
            });
        }
        Ok(Self {
            geometry,
            values,
            exception,
        })
    }

    /// Field without missing samples.
    pub fn from_values(geometry: GridGeometry, values: Vec<f64>) -> Result<Self, BathymetryError> {
        Self::new(geometry, values.into_iter().map(Some).collect(), None)
    }

    /// Field with the same value everywhere.
    pub fn uniform(geometry: GridGeometry, value: f64) -> Result<Self, BathymetryError> {
        geometry.validate()?;
        Self::from_values(geometry, vec![value; geometry.len()])
    }

    /// Field sampled from a function of (x, y).
    pub fn from_fn<F>(geometry: GridGeometry, f: F) -> Result<Self, BathymetryError>
    where
        F: Fn(f64, f64) -> f64,
    {
        geometry.validate()?;
        let mut values = Vec::with_capacity(geometry.len());
        for row in 0..geometry.n_rows {
            for col in 0..geometry.n_cols {
                values.push(f(geometry.x(col), geometry.y(row)));
            }
        }
        Self::from_values(geometry, values)
    }

    #[inline]
    pub fn geometry(&self) -> &GridGeometry {
        &self.geometry
    }

    pub fn values(&self) -> &[Option<f64>] {
        &self.values
    }

    /// Exception value declared for the source file.
    pub fn exception(&self) -> Option<f64> {
        self.exception
    }

    #[inline]
    pub fn get(&self, col: usize, row: usize) -> Option<f64> {
        self.values[self.geometry.index(col, row)]
    }

    pub fn missing_count(&self) -> usize {
        self.values.iter().filter(|v| v.is_none()).count()
    }

    /// All non-missing samples as (x, y, value).
    pub fn valid_samples(&self) -> Vec<(f64, f64, f64)> {
        let g = &self.geometry;
        let mut samples = Vec::with_capacity(self.values.len());
        for row in 0..g.n_rows {
            for col in 0..g.n_cols {
                if let Some(v) = self.get(col, row) {
                    samples.push((g.x(col), g.y(row), v));
                }
            }
        }
        samples
    }

    /// Bilinear value at (x, y), clamped onto the grid.
    ///
    /// When the stencil touches a missing sample the nearest valid stencil
    /// sample is used; `None` when all four are missing.
    pub fn bilinear(&self, x: f64, y: f64) -> Option<f64> {
        let g = &self.geometry;
        let fx = ((x - g.x0) / g.dx).clamp(0.0, (g.n_cols - 1) as f64);
        let fy = ((y - g.y0) / g.dy).clamp(0.0, (g.n_rows - 1) as f64);
        if !(fx.is_finite() && fy.is_finite()) {
            return None;
        }

        let i = (fx.floor() as usize).min(g.n_cols - 2);
        let j = (fy.floor() as usize).min(g.n_rows - 2);
        let tx = fx - i as f64;
        let ty = fy - j as f64;

        let corners = [
            (self.get(i, j), (1.0 - tx) * (1.0 - ty), tx * tx + ty * ty),
            (self.get(i + 1, j), tx * (1.0 - ty), (1.0 - tx).powi(2) + ty * ty),
            (self.get(i, j + 1), (1.0 - tx) * ty, tx * tx + (1.0 - ty).powi(2)),
            (
                self.get(i + 1, j + 1),
                tx * ty,
                (1.0 - tx).powi(2) + (1.0 - ty).powi(2),
            ),
        ];

        if corners.iter().all(|(v, _, _)| v.is_some()) {
            return Some(
                corners
                    .iter()
                    .map(|(v, w, _)| v.unwrap_or(0.0) * w)
                    .sum(),
            );
        }

        corners
            .iter()
            .filter_map(|&(v, _, d2)| v.map(|v| (v, d2)))
            .min_by(|a, b| a.1.total_cmp(&b.1))
            .map(|(v, _)| v)
    }
}

/// Structured bathymetry: bottom levels plus porosity on one grid.
///
/// Depth follows the SWASH bottom convention of the source file; no sign is
/// changed anywhere in the crate.
#[derive(Clone, Debug, PartialEq)]
pub struct BathymetryGrid {
    depth: ScalarField,
    porosity: Vec<f64>,
}

impl BathymetryGrid {
    /// Grid with porosity 1.0 everywhere.
    pub fn new(depth: ScalarField) -> Self {
        let porosity = vec![1.0; depth.geometry().len()];
        Self { depth, porosity }
    }

    /// Attach a porosity array of the same shape as the depth field.
    ///
    /// Missing porosity samples count as fully open (1.0).
    pub fn with_porosity(mut self, porosity: &ScalarField) -> Result<Self, BathymetryError> {
        if !self.depth.geometry().matches(porosity.geometry()) {
            return Err(BathymetryError::InvalidGeometry(format!(
                "porosity grid {:?} differs from bottom grid {:?}",
                porosity.geometry(),
                self.depth.geometry()
            )));
        }
        self.porosity = porosity.values().iter().map(|v| v.unwrap_or(1.0)).collect();
        Ok(self)
    }

    /// Attach a raw row-major porosity array.
    pub fn with_porosity_values(mut self, porosity: Vec<f64>) -> Result<Self, BathymetryError> {
        if porosity.len() != self.depth.geometry().len() {
            return Err(BathymetryError::ShapeMismatch {
                what: "porosity",
                expected: self.depth.geometry().len(),
                actual: porosity.len(),
            });
        }
        self.porosity = porosity;
        Ok(self)
    }

    #[inline]
    pub fn geometry(&self) -> &GridGeometry {
        self.depth.geometry()
    }

    pub fn depth(&self) -> &ScalarField {
        &self.depth
    }

    pub fn porosity(&self) -> &[f64] {
        &self.porosity
    }

    pub fn bounds(&self) -> Bounds2D {
        self.geometry().bounds()
    }

    /// Bilinear depth lookup, see [`ScalarField::bilinear`].
    pub fn depth_bilinear(&self, x: f64, y: f64) -> Option<f64> {
        self.depth.bilinear(x, y)
    }
}
