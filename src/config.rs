//! Conversion job configuration.
//!
//! All tunables of a conversion are carried by one [`ConversionConfig`] value
//! that is handed to each stage explicitly. Every section has sensible
//! defaults and `with_*` builders; the whole value round-trips through JSON.
//!
//! # Example
//!
//! ```
//! use swash_mesh::config::{ConversionConfig, SizingConfig, ThresholdParams};
//! use swash_mesh::features::GaugePoint;
//!
//! let config = ConversionConfig::default()
//!     .with_sizing(
//!         SizingConfig::new(10.0, 100.0)
//!             .with_gauges(ThresholdParams::new(5.0, 50.0, 0.0, 200.0)),
//!     )
//!     .with_gauge(GaugePoint::new("G1", 0.0, 0.0));
//!
//! assert!(config.validate().is_ok());
//! ```

use std::path::Path;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::features::GaugePoint;

/// Configuration error.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// I/O error reading or writing a configuration file.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Malformed configuration file.
    #[error("Parse error: {0}")]
    Parse(String),

    /// A value outside its allowed range.
    #[error("Invalid value for '{key}': {value} ({reason})")]
    InvalidValue {
        key: String,
        value: String,
        reason: String,
    },
}

impl ConfigError {
    fn invalid(key: &str, value: impl ToString, reason: &str) -> Self {
        ConfigError::InvalidValue {
            key: key.to_string(),
            value: value.to_string(),
            reason: reason.to_string(),
        }
    }
}

/// Grid connectivity used when grouping flagged porosity samples.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Connectivity {
    /// Edge neighbours only (N, E, S, W).
    #[default]
    Four,
    /// Edge and diagonal neighbours.
    Eight,
}

/// Feature extraction settings.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FeatureConfig {
    /// Depth level that defines the shoreline.
    pub datum: f64,
    /// Distance below which shoreline polyline endpoints are joined.
    pub chain_tolerance: f64,
    /// Samples with `|porosity - 1| > porosity_tolerance` belong to a breakwater.
    pub porosity_tolerance: f64,
    /// Neighbourhood used to group breakwater samples.
    pub connectivity: Connectivity,
    /// Smallest run of flagged samples kept as a breakwater.
    pub min_breakwater_cells: usize,
}

impl Default for FeatureConfig {
    fn default() -> Self {
        Self {
            datum: 0.0,
            chain_tolerance: 1e-6,
            porosity_tolerance: 1e-3,
            connectivity: Connectivity::Four,
            min_breakwater_cells: 1,
        }
    }
}

impl FeatureConfig {
    pub fn with_datum(mut self, datum: f64) -> Self {
        self.datum = datum;
        self
    }

    pub fn with_connectivity(mut self, connectivity: Connectivity) -> Self {
        self.connectivity = connectivity;
        self
    }

    pub fn with_porosity_tolerance(mut self, tolerance: f64) -> Self {
        self.porosity_tolerance = tolerance;
        self
    }

    pub fn with_min_breakwater_cells(mut self, cells: usize) -> Self {
        self.min_breakwater_cells = cells;
        self
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if !self.datum.is_finite() {
            return Err(ConfigError::invalid("features.datum", self.datum, "must be finite"));
        }
        if !(self.chain_tolerance >= 0.0) {
            return Err(ConfigError::invalid(
                "features.chain_tolerance",
                self.chain_tolerance,
                "must be non-negative",
            ));
        }
        if !(self.porosity_tolerance >= 0.0) {
            return Err(ConfigError::invalid(
                "features.porosity_tolerance",
                self.porosity_tolerance,
                "must be non-negative",
            ));
        }
        if self.min_breakwater_cells == 0 {
            return Err(ConfigError::invalid(
                "features.min_breakwater_cells",
                self.min_breakwater_cells,
                "must be at least 1",
            ));
        }
        Ok(())
    }
}

/// Distance-threshold parameters for one feature kind.
///
/// Size is `size_min` up to `dist_min` from the feature, `size_max` from
/// `dist_max` on, and linear in between.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct ThresholdParams {
    pub size_min: f64,
    pub size_max: f64,
    pub dist_min: f64,
    pub dist_max: f64,
    /// When set, the feature imposes no size constraint beyond `dist_max`.
    #[serde(default)]
    pub stop_at_dist_max: bool,
}

impl ThresholdParams {
    pub fn new(size_min: f64, size_max: f64, dist_min: f64, dist_max: f64) -> Self {
        Self {
            size_min,
            size_max,
            dist_min,
            dist_max,
            stop_at_dist_max: false,
        }
    }

    /// Release the constraint beyond `dist_max`.
    pub fn stop_at_dist_max(mut self) -> Self {
        self.stop_at_dist_max = true;
        self
    }

    fn validate(&self, key: &str) -> Result<(), ConfigError> {
        if !(self.size_min > 0.0) {
            return Err(ConfigError::invalid(
                &format!("{key}.size_min"),
                self.size_min,
                "must be positive",
            ));
        }
        if !(self.size_max >= self.size_min) {
            return Err(ConfigError::invalid(
                &format!("{key}.size_max"),
                self.size_max,
                "must be at least size_min",
            ));
        }
        if !(self.dist_min >= 0.0) {
            return Err(ConfigError::invalid(
                &format!("{key}.dist_min"),
                self.dist_min,
                "must be non-negative",
            ));
        }
        if !(self.dist_max >= self.dist_min) {
            return Err(ConfigError::invalid(
                &format!("{key}.dist_max"),
                self.dist_max,
                "must be at least dist_min",
            ));
        }
        Ok(())
    }
}

/// Wavelength resolution rule: at least `points_per_wavelength` elements per
/// local wavelength of a wave with the given period.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct WavelengthSizing {
    /// Wave period (s).
    pub period: f64,
    pub points_per_wavelength: f64,
}

impl WavelengthSizing {
    pub fn new(period: f64, points_per_wavelength: f64) -> Self {
        Self {
            period,
            points_per_wavelength,
        }
    }
}

/// Sizing field settings.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SizingConfig {
    pub global_min_size: f64,
    pub global_max_size: f64,
    /// Baseline size at zero depth.
    pub base_size: f64,
    /// Baseline growth per unit of |depth|.
    pub depth_coefficient: f64,
    pub shoreline: Option<ThresholdParams>,
    pub breakwaters: Option<ThresholdParams>,
    pub gauges: Option<ThresholdParams>,
    pub wavelength: Option<WavelengthSizing>,
}

impl Default for SizingConfig {
    fn default() -> Self {
        Self {
            global_min_size: 5.0,
            global_max_size: 100.0,
            base_size: 10.0,
            depth_coefficient: 2.0,
            shoreline: Some(ThresholdParams::new(5.0, 50.0, 0.0, 200.0)),
            breakwaters: Some(ThresholdParams::new(5.0, 50.0, 0.0, 100.0)),
            gauges: Some(ThresholdParams::new(5.0, 50.0, 0.0, 100.0)),
            wavelength: None,
        }
    }
}

impl SizingConfig {
    /// Size limits only: no feature fields, baseline equal to `global_max_size`.
    pub fn new(global_min_size: f64, global_max_size: f64) -> Self {
        Self {
            global_min_size,
            global_max_size,
            base_size: global_max_size,
            depth_coefficient: 0.0,
            shoreline: None,
            breakwaters: None,
            gauges: None,
            wavelength: None,
        }
    }

    pub fn with_baseline(mut self, base_size: f64, depth_coefficient: f64) -> Self {
        self.base_size = base_size;
        self.depth_coefficient = depth_coefficient;
        self
    }

    pub fn with_shoreline(mut self, params: ThresholdParams) -> Self {
        self.shoreline = Some(params);
        self
    }

    pub fn with_breakwaters(mut self, params: ThresholdParams) -> Self {
        self.breakwaters = Some(params);
        self
    }

    pub fn with_gauges(mut self, params: ThresholdParams) -> Self {
        self.gauges = Some(params);
        self
    }

    pub fn with_wavelength(mut self, rule: WavelengthSizing) -> Self {
        self.wavelength = Some(rule);
        self
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(self.global_min_size > 0.0) {
            return Err(ConfigError::invalid(
                "sizing.global_min_size",
                self.global_min_size,
                "must be positive",
            ));
        }
        if !(self.global_max_size >= self.global_min_size) || !self.global_max_size.is_finite() {
            return Err(ConfigError::invalid(
                "sizing.global_max_size",
                self.global_max_size,
                "must be finite and at least global_min_size",
            ));
        }
        if !(self.base_size >= 0.0) {
            return Err(ConfigError::invalid(
                "sizing.base_size",
                self.base_size,
                "must be non-negative",
            ));
        }
        if !(self.depth_coefficient >= 0.0) {
            return Err(ConfigError::invalid(
                "sizing.depth_coefficient",
                self.depth_coefficient,
                "must be non-negative",
            ));
        }
        if let Some(p) = &self.shoreline {
            p.validate("sizing.shoreline")?;
        }
        if let Some(p) = &self.breakwaters {
            p.validate("sizing.breakwaters")?;
        }
        if let Some(p) = &self.gauges {
            p.validate("sizing.gauges")?;
        }
        if let Some(w) = &self.wavelength {
            if !(w.period > 0.0) {
                return Err(ConfigError::invalid(
                    "sizing.wavelength.period",
                    w.period,
                    "must be positive",
                ));
            }
            if !(w.points_per_wavelength > 0.0) {
                return Err(ConfigError::invalid(
                    "sizing.wavelength.points_per_wavelength",
                    w.points_per_wavelength,
                    "must be positive",
                ));
            }
        }
        Ok(())
    }
}

/// Interpolation settings.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct InterpolationConfig {
    /// Number of nearest source samples in each local RBF fit.
    pub neighbors: usize,
}

impl Default for InterpolationConfig {
    fn default() -> Self {
        Self { neighbors: 16 }
    }
}

impl InterpolationConfig {
    pub fn with_neighbors(mut self, neighbors: usize) -> Self {
        self.neighbors = neighbors;
        self
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.neighbors < 3 {
            return Err(ConfigError::invalid(
                "interpolation.neighbors",
                self.neighbors,
                "must be at least 3",
            ));
        }
        Ok(())
    }
}

/// Output settings.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExportConfig {
    /// Base name of the mesh files (`<basename>.node`, `.ele`, ...).
    pub basename: String,
    /// Also write a Gmsh MSH 2.2 copy of the mesh.
    pub write_gmsh: bool,
    /// Rewrite the SWASH input file in place instead of writing a copy.
    pub in_place: bool,
}

impl Default for ExportConfig {
    fn default() -> Self {
        Self {
            basename: "mesh".to_string(),
            write_gmsh: true,
            in_place: false,
        }
    }
}

impl ExportConfig {
    pub fn with_basename(mut self, basename: impl Into<String>) -> Self {
        self.basename = basename.into();
        self
    }

    pub fn in_place(mut self) -> Self {
        self.in_place = true;
        self
    }

    pub fn without_gmsh(mut self) -> Self {
        self.write_gmsh = false;
        self
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.basename.is_empty()
            || self.basename.contains(['/', '\\', '\''])
            || self.basename.chars().any(char::is_whitespace)
        {
            return Err(ConfigError::invalid(
                "export.basename",
                &self.basename,
                "must be a non-empty file name without separators, quotes or spaces",
            ));
        }
        Ok(())
    }
}

/// Complete configuration of one conversion job.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ConversionConfig {
    pub features: FeatureConfig,
    pub sizing: SizingConfig,
    pub interpolation: InterpolationConfig,
    pub export: ExportConfig,
    /// Gauge locations supplied by configuration.
    pub gauges: Vec<GaugePoint>,
}

impl ConversionConfig {
    pub fn with_features(mut self, features: FeatureConfig) -> Self {
        self.features = features;
        self
    }

    pub fn with_sizing(mut self, sizing: SizingConfig) -> Self {
        self.sizing = sizing;
        self
    }

    pub fn with_interpolation(mut self, interpolation: InterpolationConfig) -> Self {
        self.interpolation = interpolation;
        self
    }

    pub fn with_export(mut self, export: ExportConfig) -> Self {
        self.export = export;
        self
    }

    pub fn with_gauge(mut self, gauge: GaugePoint) -> Self {
        self.gauges.push(gauge);
        self
    }

    /// Load and validate a JSON configuration file.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path.as_ref())?;
        let config: ConversionConfig =
            serde_json::from_str(&content).map_err(|e| ConfigError::Parse(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Save as pretty-printed JSON.
    pub fn save_to_file<P: AsRef<Path>>(&self, path: P) -> Result<(), ConfigError> {
        let content =
            serde_json::to_string_pretty(self).map_err(|e| ConfigError::Parse(e.to_string()))?;
        std::fs::write(path, content)?;
        Ok(())
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        self.features.validate()?;
        self.sizing.validate()?;
        self.interpolation.validate()?;
        self.export.validate()?;
        for gauge in &self.gauges {
            if !(gauge.x.is_finite() && gauge.y.is_finite()) {
                return Err(ConfigError::invalid(
                    "gauges",
                    format!("{} ({}, {})", gauge.name, gauge.x, gauge.y),
                    "coordinates must be finite",
                ));
            }
        }
        Ok(())
    }
}
