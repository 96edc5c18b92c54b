//! Target element size over the domain.
//!
//! The sizing field combines independent rules by taking their minimum:
//!
//! - **Baseline**: `depth_coefficient * |depth| + base_size`
//! - **Thresholds**: distance to the shoreline, breakwaters and gauges mapped
//!   through [`threshold_size`]
//! - **Wavelength** (optional): `L(T, h) / points_per_wavelength`
//!
//! The result is clamped to `[global_min_size, global_max_size]`.

mod threshold;
mod wavelength;

pub use threshold::{threshold_size, DistanceField, ThresholdField};
pub use wavelength::{deep_water_wavelength, wavelength, GRAVITY};

use crate::bathymetry::{BathymetryGrid, ScalarField};
use crate::config::{SizingConfig, WavelengthSizing};
use crate::features::FeatureSet;

/// Water depths below this do not carry a wave for the wavelength rule.
const MIN_WAVE_DEPTH: f64 = 0.01;

/// Anything that answers "what element size here?".
///
/// Meshing engines only see this trait.
pub trait SizeFunction {
    fn size_at(&self, x: f64, y: f64) -> f64;
}

impl<F> SizeFunction for F
where
    F: Fn(f64, f64) -> f64,
{
    fn size_at(&self, x: f64, y: f64) -> f64 {
        self(x, y)
    }
}

/// Sizing field borrowed from the bathymetry it samples.
#[derive(Debug)]
pub struct SizingField<'a> {
    depth: &'a ScalarField,
    config: SizingConfig,
    datum: f64,
    thresholds: Vec<ThresholdField>,
}

impl<'a> SizingField<'a> {
    /// Baseline-only field (no feature thresholds).
    pub fn new(depth: &'a ScalarField, config: SizingConfig, datum: f64) -> Self {
        Self {
            depth,
            config,
            datum,
            thresholds: Vec::new(),
        }
    }

    /// Add a threshold rule.
    pub fn with_threshold(mut self, field: ThresholdField) -> Self {
        self.thresholds.push(field);
        self
    }

    pub fn config(&self) -> &SizingConfig {
        &self.config
    }

    pub fn thresholds(&self) -> &[ThresholdField] {
        &self.thresholds
    }

    pub fn min_size(&self) -> f64 {
        self.config.global_min_size
    }

    pub fn max_size(&self) -> f64 {
        self.config.global_max_size
    }

    /// Depth-driven baseline size before the global clamp.
    pub fn baseline(&self, x: f64, y: f64) -> f64 {
        match self.depth.bilinear(x, y) {
            Some(depth) => self.config.depth_coefficient * depth.abs() + self.config.base_size,
            None => self.config.global_max_size,
        }
    }

    fn wavelength_limit(&self, rule: &WavelengthSizing, x: f64, y: f64) -> Option<f64> {
        // Depths are elevations, so water lies below the datum
        let h = self.datum - self.depth.bilinear(x, y)?;
        if h < MIN_WAVE_DEPTH {
            return None;
        }
        Some(wavelength(rule.period, h) / rule.points_per_wavelength)
    }

    /// Combined size at (x, y).
    pub fn evaluate(&self, x: f64, y: f64) -> f64 {
        let mut size = self.baseline(x, y);
        for field in &self.thresholds {
            if let Some(s) = field.size_at(x, y) {
                size = size.min(s);
            }
        }
        if let Some(rule) = &self.config.wavelength {
            if let Some(s) = self.wavelength_limit(rule, x, y) {
                size = size.min(s);
            }
        }
        size.clamp(self.config.global_min_size, self.config.global_max_size)
    }
}

impl SizeFunction for SizingField<'_> {
    fn size_at(&self, x: f64, y: f64) -> f64 {
        self.evaluate(x, y)
    }
}

/// Build the sizing field for `features` over `grid`.
///
/// `datum` is the still-water level used by the wavelength rule.
pub fn build_sizing_field<'a>(
    grid: &'a BathymetryGrid,
    features: &FeatureSet,
    config: &SizingConfig,
    datum: f64,
) -> SizingField<'a> {
    let mut field = SizingField::new(grid.depth(), config.clone(), datum);

    if let Some(params) = config.shoreline {
        if !features.shoreline.is_empty() {
            let distance = DistanceField::new(&features.shoreline, &[]);
            field = field.with_threshold(ThresholdField::new("shoreline", params, distance));
        }
    }
    if let Some(params) = config.breakwaters {
        if !features.breakwaters.is_empty() {
            let distance = DistanceField::new(features.breakwaters.iter().map(|b| &b.points), &[]);
            field = field.with_threshold(ThresholdField::new("breakwaters", params, distance));
        }
    }
    if let Some(params) = config.gauges {
        if !features.gauges.is_empty() {
            let points: Vec<(f64, f64)> = features.gauges.iter().map(|g| (g.x, g.y)).collect();
            let distance = DistanceField::new(std::iter::empty(), &points);
            field = field.with_threshold(ThresholdField::new("gauges", params, distance));
        }
    }

    tracing::info!(
        min = config.global_min_size,
        max = config.global_max_size,
        thresholds = field.thresholds.len(),
        wavelength = config.wavelength.is_some(),
        "built sizing field"
    );
    field
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bathymetry::GridGeometry;
    use crate::config::ThresholdParams;
    use crate::features::GaugePoint;
    use crate::types::Polyline;
    use approx::assert_relative_eq;

    fn flat_grid(depth: f64) -> BathymetryGrid {
        let g = GridGeometry::new(0.0, 0.0, 10.0, 10.0, 101, 101);
        BathymetryGrid::new(ScalarField::uniform(g, depth).unwrap())
    }

    #[test]
    fn test_closure_is_size_function() {
        let f = |x: f64, _y: f64| 1.0 + x;
        assert_relative_eq!(f.size_at(2.0, 0.0), 3.0);
    }

    #[test]
    fn test_baseline_clamped() {
        let grid = flat_grid(-30.0);
        let config = SizingConfig::new(5.0, 100.0).with_baseline(10.0, 2.0);
        let field = build_sizing_field(&grid, &FeatureSet::default(), &config, 0.0);
        assert_relative_eq!(field.size_at(500.0, 500.0), 70.0);

        let deep = flat_grid(-300.0);
        let field = build_sizing_field(&deep, &FeatureSet::default(), &config, 0.0);
        assert_relative_eq!(field.size_at(500.0, 500.0), 100.0);
    }

    #[test]
    fn test_shoreline_threshold_monotone_and_bounded() {
        let grid = flat_grid(-40.0);
        let features = FeatureSet {
            shoreline: vec![Polyline::new(vec![(0.0, 500.0), (1000.0, 500.0)])],
            ..FeatureSet::default()
        };
        let config = SizingConfig::new(5.0, 100.0)
            .with_shoreline(ThresholdParams::new(5.0, 50.0, 10.0, 200.0));
        let field = build_sizing_field(&grid, &features, &config, 0.0);

        assert_relative_eq!(field.size_at(300.0, 500.0), 5.0);
        assert_relative_eq!(field.size_at(300.0, 800.0), 50.0);

        let mut previous = 0.0;
        for k in 0..60 {
            let s = field.size_at(300.0, 500.0 + 5.0 * k as f64);
            assert!((5.0..=100.0).contains(&s));
            assert!(s >= previous);
            previous = s;
        }
    }

    #[test]
    fn test_gauge_threshold_released_beyond_dist_max() {
        let grid = flat_grid(-10.0);
        let features = FeatureSet {
            gauges: vec![GaugePoint::new("G1", 500.0, 500.0)],
            ..FeatureSet::default()
        };
        let config = SizingConfig::new(5.0, 100.0)
            .with_gauges(ThresholdParams::new(5.0, 50.0, 0.0, 200.0).stop_at_dist_max());
        let field = build_sizing_field(&grid, &features, &config, 0.0);

        assert_relative_eq!(field.size_at(500.0, 500.0), 5.0);
        assert_relative_eq!(field.size_at(600.0, 500.0), 27.5);
        assert_relative_eq!(field.size_at(900.0, 900.0), 100.0);
    }

    #[test]
    fn test_wavelength_rule() {
        let grid = flat_grid(-20.0);
        let rule = WavelengthSizing::new(8.0, 20.0);
        let config = SizingConfig::new(1.0, 100.0).with_wavelength(rule);
        let field = build_sizing_field(&grid, &FeatureSet::default(), &config, 0.0);

        let expected = wavelength(8.0, 20.0) / 20.0;
        assert_relative_eq!(field.size_at(100.0, 100.0), expected, max_relative = 1e-12);
    }

    #[test]
    fn test_wavelength_skipped_at_datum() {
        let grid = flat_grid(0.0);
        let config = SizingConfig::new(1.0, 100.0).with_wavelength(WavelengthSizing::new(8.0, 20.0));
        let field = build_sizing_field(&grid, &FeatureSet::default(), &config, 0.0);
        assert_relative_eq!(field.size_at(100.0, 100.0), 100.0);
    }

    #[test]
    fn test_wavelength_skipped_on_dry_land() {
        // 20 m above the datum carries no wave
        let grid = flat_grid(20.0);
        let config = SizingConfig::new(1.0, 100.0).with_wavelength(WavelengthSizing::new(8.0, 20.0));
        let field = build_sizing_field(&grid, &FeatureSet::default(), &config, 0.0);
        assert_relative_eq!(field.size_at(100.0, 100.0), 100.0);

        // Same elevation under a raised datum is 5 m of water
        let field = build_sizing_field(&grid, &FeatureSet::default(), &config, 25.0);
        let expected = wavelength(8.0, 5.0) / 20.0;
        assert_relative_eq!(field.size_at(100.0, 100.0), expected, max_relative = 1e-12);
    }
}
