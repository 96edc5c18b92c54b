//! # swash-mesh
//!
//! Unstructured triangular meshes for SWASH models defined on structured grids.
//!
//! This crate provides the building blocks of the conversion:
//! - SWASH command file parsing and structured value file reading
//! - Shoreline, breakwater and gauge feature extraction
//! - Distance-threshold sizing fields
//! - Size-driven triangulation behind a pluggable engine trait
//! - Thin-plate spline interpolation of bathymetry onto mesh nodes
//! - Triangle, Gmsh and patched SWASH input output
//!
//! The [`pipeline`] module strings these together into the create-mesh and
//! apply-mesh jobs.

pub mod bathymetry;
pub mod config;
pub mod error;
pub mod features;
pub mod interpolation;
pub mod io;
pub mod mesh;
pub mod pipeline;
pub mod sizing;
pub mod types;

// Re-export main types for convenience
pub use bathymetry::{BathymetryError, BathymetryGrid, GridGeometry, ScalarField};
pub use config::{
    ConfigError, Connectivity, ConversionConfig, ExportConfig, FeatureConfig, InterpolationConfig,
    SizingConfig, ThresholdParams, WavelengthSizing,
};
pub use error::{ConversionError, InputError, InterpolationCoverageWarning};
pub use features::{extract_features, Breakwater, FeatureError, FeatureSet, GaugePoint};
pub use interpolation::{
    interpolate_field, InterpolatedField, InterpolationError, InterpolationMethod, Interpolator,
    NodeSource,
};
pub use mesh::{
    build_mesh, BoundaryTag, DelaunayEngine, EngineError, GmshEngine, Mesh2D, MeshRequest,
    MeshingEngine,
};
pub use pipeline::{apply_mesh, create_mesh, ConversionReport};
pub use sizing::{build_sizing_field, SizeFunction, SizingField};
pub use types::{Bounds2D, Polyline, Side, SideBoundaries};
