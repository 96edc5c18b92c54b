//! Job-level error taxonomy.
//!
//! Each stage keeps its own error enum; [`ConversionError`] gathers them
//! under the category the caller acts on. Non-fatal coverage problems are
//! collected as [`InterpolationCoverageWarning`] values instead.

use std::fmt;
use std::path::PathBuf;

use thiserror::Error;

use crate::bathymetry::BathymetryError;
use crate::config::ConfigError;
use crate::features::FeatureError;
use crate::interpolation::InterpolationError;
use crate::io::gauge_reader::GaugeFileError;
use crate::io::grid_reader::GridReadError;
use crate::io::swash_input::SwashParseError;
use crate::io::triangle::TriangleFileError;
use crate::mesh::MeshBuildError;

/// A malformed or unusable input file.
#[derive(Debug, Error)]
pub enum InputError {
    #[error(transparent)]
    Swash(#[from] SwashParseError),

    #[error(transparent)]
    Grid(#[from] GridReadError),

    #[error(transparent)]
    Gauges(#[from] GaugeFileError),

    #[error(transparent)]
    Mesh(#[from] TriangleFileError),

    #[error(transparent)]
    Bathymetry(#[from] BathymetryError),
}

/// Failure of a conversion job.
#[derive(Debug, Error)]
pub enum ConversionError {
    /// An input file could not be read or understood.
    #[error("input parse error: {0}")]
    InputParse(#[from] InputError),

    /// The depth field never crosses the datum.
    #[error("no shoreline found: depth never crosses the datum {datum}")]
    NoShorelineFound { datum: f64 },

    /// The meshing engine rejected the geometry or failed.
    #[error("mesh generation failed ({engine}): {diagnostic}")]
    MeshGenerationFailed { engine: String, diagnostic: String },

    /// A source field had nothing to interpolate from.
    #[error(transparent)]
    Interpolation(#[from] InterpolationError),

    /// An output file could not be written.
    #[error("cannot write '{}': {source}", path.display())]
    ExportIo {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Invalid configuration.
    #[error("invalid configuration: {0}")]
    Config(#[from] ConfigError),
}

impl ConversionError {
    /// Pipeline stage the error belongs to.
    pub fn stage(&self) -> &'static str {
        match self {
            ConversionError::InputParse(_) => "load",
            ConversionError::NoShorelineFound { .. } => "features",
            ConversionError::MeshGenerationFailed { .. } => "mesh",
            ConversionError::Interpolation(_) => "interpolate",
            ConversionError::ExportIo { .. } => "export",
            ConversionError::Config(_) => "config",
        }
    }

    pub(crate) fn export_io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        ConversionError::ExportIo {
            path: path.into(),
            source,
        }
    }
}

impl From<SwashParseError> for ConversionError {
    fn from(e: SwashParseError) -> Self {
        ConversionError::InputParse(e.into())
    }
}

impl From<GridReadError> for ConversionError {
    fn from(e: GridReadError) -> Self {
        ConversionError::InputParse(e.into())
    }
}

impl From<GaugeFileError> for ConversionError {
    fn from(e: GaugeFileError) -> Self {
        ConversionError::InputParse(e.into())
    }
}

impl From<TriangleFileError> for ConversionError {
    fn from(e: TriangleFileError) -> Self {
        ConversionError::InputParse(e.into())
    }
}

impl From<BathymetryError> for ConversionError {
    fn from(e: BathymetryError) -> Self {
        ConversionError::InputParse(e.into())
    }
}

impl From<FeatureError> for ConversionError {
    fn from(e: FeatureError) -> Self {
        match e {
            FeatureError::NoShorelineFound { datum } => ConversionError::NoShorelineFound { datum },
        }
    }
}

impl From<MeshBuildError> for ConversionError {
    fn from(e: MeshBuildError) -> Self {
        ConversionError::MeshGenerationFailed {
            engine: e.engine,
            diagnostic: e.source.to_string(),
        }
    }
}

/// Mesh nodes of one quantity that fell outside the source coverage.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct InterpolationCoverageWarning {
    pub quantity: String,
    /// Number of nodes that took the nearest-sample value.
    pub count: usize,
    /// Indices of those nodes.
    pub nodes: Vec<usize>,
}

impl fmt::Display for InterpolationCoverageWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} nodes outside the {} source coverage took the nearest sample",
            self.count, self.quantity
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mesh::EngineError;

    #[test]
    fn test_stage_names() {
        let err: ConversionError = FeatureError::NoShorelineFound { datum: 0.5 }.into();
        assert_eq!(err.stage(), "features");
        assert!(err.to_string().contains("0.5"));

        let err: ConversionError = SwashParseError::MissingBottom.into();
        assert_eq!(err.stage(), "load");
        assert!(matches!(err, ConversionError::InputParse(InputError::Swash(_))));
    }

    #[test]
    fn test_every_stage_is_named() {
        let errors: Vec<ConversionError> = vec![
            SwashParseError::MissingBottom.into(),
            FeatureError::NoShorelineFound { datum: 0.0 }.into(),
            ConversionError::MeshGenerationFailed {
                engine: "delaunay".to_string(),
                diagnostic: String::new(),
            },
            InterpolationError::NoSamples {
                quantity: "BOTTOM".to_string(),
            }
            .into(),
            ConversionError::export_io("mesh.node", std::io::Error::other("full")),
            ConfigError::InvalidValue {
                key: "sizing.global_min_size".to_string(),
                value: "-1".to_string(),
                reason: "must be positive".to_string(),
            }
            .into(),
        ];
        let stages: Vec<&str> = errors.iter().map(ConversionError::stage).collect();
        assert_eq!(
            stages,
            vec!["load", "features", "mesh", "interpolate", "export", "config"]
        );
    }

    #[test]
    fn test_engine_diagnostic_is_verbatim() {
        let err: ConversionError = MeshBuildError {
            engine: "gmsh".to_string(),
            source: EngineError::Rejected("Error   : Self-intersecting curve".to_string()),
        }
        .into();
        match &err {
            ConversionError::MeshGenerationFailed { engine, diagnostic } => {
                assert_eq!(engine, "gmsh");
                assert_eq!(diagnostic, "Error   : Self-intersecting curve");
            }
            other => panic!("unexpected error {other:?}"),
        }
        assert_eq!(err.stage(), "mesh");
    }

    #[test]
    fn test_export_error_names_path() {
        let err = ConversionError::export_io(
            "/no/such/dir/mesh.node",
            std::io::Error::new(std::io::ErrorKind::NotFound, "missing"),
        );
        assert_eq!(err.stage(), "export");
        assert!(err.to_string().contains("/no/such/dir/mesh.node"));
    }
}
