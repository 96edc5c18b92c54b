//! Feature extraction from structured bathymetry.
//!
//! - **Shoreline**: isoline of the depth field at the configured datum
//! - **Breakwaters**: connected runs of samples whose porosity departs from 1
//! - **Gauges**: named locations passed through from the job
//!
//! The resulting [`FeatureSet`] is read-only input to the sizing field and
//! the mesh builder.

mod breakwater;
mod shoreline;

pub use breakwater::detect_breakwaters;
pub use shoreline::extract_shoreline;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::bathymetry::BathymetryGrid;
use crate::config::FeatureConfig;
use crate::mesh::BoundaryTag;
use crate::types::Polyline;

/// Error type for feature extraction.
#[derive(Debug, Error)]
pub enum FeatureError {
    /// The depth field never crosses the datum.
    #[error("no shoreline found: depth never crosses the datum {datum}")]
    NoShorelineFound { datum: f64 },
}

/// A named output location.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct GaugePoint {
    pub name: String,
    pub x: f64,
    pub y: f64,
}

impl GaugePoint {
    pub fn new(name: impl Into<String>, x: f64, y: f64) -> Self {
        Self {
            name: name.into(),
            x,
            y,
        }
    }
}

/// A detected breakwater, represented by its medial line.
#[derive(Clone, Debug, PartialEq)]
pub struct Breakwater {
    /// Scan-order identifier starting at 0.
    pub id: usize,
    pub points: Polyline,
    /// Number of flagged grid samples in the run.
    pub cell_count: usize,
}

impl Breakwater {
    /// Mesh marker for edges along this breakwater.
    pub fn tag(&self) -> BoundaryTag {
        BoundaryTag::Breakwater(self.id as u32)
    }
}

/// Features that drive refinement.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct FeatureSet {
    pub shoreline: Vec<Polyline>,
    pub breakwaters: Vec<Breakwater>,
    pub gauges: Vec<GaugePoint>,
}

impl FeatureSet {
    /// Total number of shoreline vertices.
    pub fn shoreline_points(&self) -> usize {
        self.shoreline.iter().map(Polyline::len).sum()
    }
}

/// Extract shoreline and breakwaters from `grid`, attach `gauges`.
pub fn extract_features(
    grid: &BathymetryGrid,
    gauges: &[GaugePoint],
    config: &FeatureConfig,
) -> Result<FeatureSet, FeatureError> {
    let shoreline = extract_shoreline(grid.depth(), config.datum, config.chain_tolerance);
    if shoreline.is_empty() {
        tracing::error!(datum = config.datum, "depth field never crosses the datum");
        return Err(FeatureError::NoShorelineFound {
            datum: config.datum,
        });
    }

    let breakwaters = detect_breakwaters(grid, config);

    let features = FeatureSet {
        shoreline,
        breakwaters,
        gauges: gauges.to_vec(),
    };
    tracing::info!(
        shoreline_polylines = features.shoreline.len(),
        shoreline_points = features.shoreline_points(),
        breakwaters = features.breakwaters.len(),
        gauges = features.gauges.len(),
        "extracted features"
    );

    Ok(features)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bathymetry::{GridGeometry, ScalarField};

    #[test]
    fn test_submerged_grid_has_no_shoreline() {
        let g = GridGeometry::new(0.0, 0.0, 10.0, 10.0, 5, 5);
        let grid = BathymetryGrid::new(ScalarField::uniform(g, -50.0).unwrap());
        let err = extract_features(&grid, &[], &FeatureConfig::default()).unwrap_err();
        assert!(matches!(err, FeatureError::NoShorelineFound { datum } if datum == 0.0));
    }

    #[test]
    fn test_gauges_pass_through() {
        let g = GridGeometry::new(0.0, 0.0, 10.0, 10.0, 5, 5);
        let grid = BathymetryGrid::new(ScalarField::from_fn(g, |x, _| x - 15.0).unwrap());
        let gauges = vec![GaugePoint::new("G1", 1.0, 2.0), GaugePoint::new("G2", 3.0, 4.0)];
        let features = extract_features(&grid, &gauges, &FeatureConfig::default()).unwrap();
        assert_eq!(features.gauges, gauges);
        assert_eq!(features.shoreline.len(), 1);
        // One crossing per sample row
        assert_eq!(features.shoreline_points(), 5);
        assert!(features.breakwaters.is_empty());
    }
}
