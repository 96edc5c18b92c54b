//! Scattered-data interpolation of structured fields onto mesh nodes.
//!
//! Valid source samples are indexed once per field. Each node then gets
//!
//! - the sample value when it coincides with a sample
//! - a local thin-plate spline over its `k` nearest samples when it lies in
//!   the convex hull of the samples
//! - the nearest sample value otherwise, or when the local solve is not finite
//!
//! Nodes outside the hull and nodes whose solve failed are reported
//! separately; only the former are a coverage problem. Values are never
//! clamped or sign-flipped.

mod nearest;
mod rbf;

pub use nearest::SampleIndex;
pub use rbf::{thin_plate_kernel, thin_plate_value};

use geo::{ConvexHull, Intersects, MultiPoint, Point, Polygon};
use thiserror::Error;

use crate::bathymetry::ScalarField;
use crate::config::InterpolationConfig;
use crate::io::swash_input::Quantity;

/// Error type for interpolation.
#[derive(Debug, Error)]
pub enum InterpolationError {
    /// Every source sample is missing.
    #[error("no valid {quantity} samples to interpolate from")]
    NoSamples { quantity: String },
}

/// How node values are derived from the source samples.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum InterpolationMethod {
    /// Local thin-plate spline with nearest-sample fallback.
    #[default]
    ThinPlateSpline,
    /// Nearest valid sample everywhere.
    Nearest,
}

impl InterpolationMethod {
    /// Porosity is categorical and is never blended.
    pub fn for_quantity(quantity: &Quantity) -> Self {
        match quantity {
            Quantity::Porosity => InterpolationMethod::Nearest,
            _ => InterpolationMethod::ThinPlateSpline,
        }
    }
}

/// Where a node value came from.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum NodeSource {
    /// Sample value or local spline.
    Interpolated,
    /// Nearest sample, the node lies outside the sample hull.
    OutsideCoverage,
    /// Nearest sample, the local spline was not finite.
    UnstableSolve,
}

/// Node-aligned interpolated values.
#[derive(Clone, Debug, PartialEq)]
pub struct InterpolatedField {
    /// One value per mesh node.
    pub values: Vec<f64>,
    /// Nodes outside the sample hull that took the nearest sample.
    pub outside_nodes: Vec<usize>,
    /// Nodes inside the hull whose local solve failed.
    pub unstable_nodes: Vec<usize>,
}

impl InterpolatedField {
    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn outside_count(&self) -> usize {
        self.outside_nodes.len()
    }

    pub fn unstable_count(&self) -> usize {
        self.unstable_nodes.len()
    }
}

/// Interpolator over the valid samples of one field.
#[derive(Debug)]
pub struct Interpolator {
    index: SampleIndex,
    hull: Polygon<f64>,
    neighbors: usize,
    /// Distance under which a node takes a sample value verbatim.
    coincidence: f64,
}

impl Interpolator {
    /// Build from (x, y, value) samples; `None` when there are none.
    pub fn new(samples: Vec<(f64, f64, f64)>, neighbors: usize) -> Option<Self> {
        if samples.is_empty() {
            return None;
        }

        let (mut x_min, mut x_max) = (f64::INFINITY, f64::NEG_INFINITY);
        let (mut y_min, mut y_max) = (f64::INFINITY, f64::NEG_INFINITY);
        for &(x, y, _) in &samples {
            x_min = x_min.min(x);
            x_max = x_max.max(x);
            y_min = y_min.min(y);
            y_max = y_max.max(y);
        }
        let extent = (x_max - x_min).hypot(y_max - y_min);

        let hull = MultiPoint::from(
            samples
                .iter()
                .map(|&(x, y, _)| Point::new(x, y))
                .collect::<Vec<_>>(),
        )
        .convex_hull();

        Some(Self {
            index: SampleIndex::new(samples),
            hull,
            neighbors: neighbors.max(3),
            coincidence: 1e-12 * extent.max(1.0),
        })
    }

    /// Interpolator over the valid samples of `field`.
    pub fn from_field(field: &ScalarField, neighbors: usize) -> Option<Self> {
        Self::new(field.valid_samples(), neighbors)
    }

    pub fn sample_count(&self) -> usize {
        self.index.len()
    }

    /// Whether (x, y) lies in the convex hull of the samples, boundary included.
    pub fn covers(&self, x: f64, y: f64) -> bool {
        self.hull.intersects(&Point::new(x, y))
    }

    /// Value of the nearest sample.
    pub fn nearest(&self, x: f64, y: f64) -> Option<f64> {
        self.index.nearest(x, y).map(|((_, _, v), _)| v)
    }

    /// Interpolated value and where it came from.
    pub fn value(&self, x: f64, y: f64, method: InterpolationMethod) -> Option<(f64, NodeSource)> {
        let ((_, _, nearest), distance) = self.index.nearest(x, y)?;
        if method == InterpolationMethod::Nearest || distance <= self.coincidence {
            return Some((nearest, NodeSource::Interpolated));
        }
        if !self.covers(x, y) {
            return Some((nearest, NodeSource::OutsideCoverage));
        }

        let local = self.index.k_nearest(x, y, self.neighbors);
        match thin_plate_value(&local, x, y) {
            Some(v) => Some((v, NodeSource::Interpolated)),
            None => Some((nearest, NodeSource::UnstableSolve)),
        }
    }

    /// Values at every node, in node order.
    pub fn interpolate(
        &self,
        nodes: &[(f64, f64)],
        method: InterpolationMethod,
    ) -> InterpolatedField {
        let mut values = Vec::with_capacity(nodes.len());
        let mut outside_nodes = Vec::new();
        let mut unstable_nodes = Vec::new();
        for (i, &(x, y)) in nodes.iter().enumerate() {
            // the index is non-empty by construction
            let (v, source) = self
                .value(x, y, method)
                .unwrap_or((f64::NAN, NodeSource::OutsideCoverage));
            match source {
                NodeSource::Interpolated => {}
                NodeSource::OutsideCoverage => outside_nodes.push(i),
                NodeSource::UnstableSolve => unstable_nodes.push(i),
            }
            values.push(v);
        }
        InterpolatedField {
            values,
            outside_nodes,
            unstable_nodes,
        }
    }
}

/// Interpolate `field` onto `nodes`.
pub fn interpolate_field(
    field: &ScalarField,
    quantity: &Quantity,
    nodes: &[(f64, f64)],
    method: InterpolationMethod,
    config: &InterpolationConfig,
) -> Result<InterpolatedField, InterpolationError> {
    let interpolator = Interpolator::from_field(field, config.neighbors).ok_or_else(|| {
        InterpolationError::NoSamples {
            quantity: quantity.to_string(),
        }
    })?;

    let result = interpolator.interpolate(nodes, method);
    if result.outside_count() > 0 {
        tracing::warn!(
            quantity = %quantity,
            count = result.outside_count(),
            nodes = nodes.len(),
            "nodes outside source coverage took the nearest sample"
        );
    }
    if result.unstable_count() > 0 {
        tracing::debug!(
            quantity = %quantity,
            count = result.unstable_count(),
            "local spline not finite, nodes took the nearest sample"
        );
    }
    tracing::debug!(
        quantity = %quantity,
        samples = interpolator.sample_count(),
        nodes = nodes.len(),
        ?method,
        "interpolated field"
    );
    Ok(result)
}
