//! Mesh representation and generation.
//!
//! Provides:
//! - [`Mesh2D`]: triangular mesh with edge connectivity and boundary markers
//! - [`BoundaryTag`]: SWASH side and breakwater markers
//! - [`engine`]: triangulation backends behind the [`MeshingEngine`] trait
//! - [`build_mesh`]: engine run plus orientation, tagging and numbering

mod boundary_tags;
mod builder;
pub mod engine;
mod mesh2d;

pub use boundary_tags::{BoundaryTag, FIRST_FEATURE_MARKER};
pub use builder::{assemble, build_mesh, mesh_request, MeshBuildError};
pub use engine::{
    ConstraintCurve, DelaunayEngine, EngineError, EngineMesh, GmshEngine, MeshRequest,
    MeshingEngine,
};
pub use mesh2d::{Edge, ElementFace, Mesh2D};

pub(crate) use mesh2d::triangle_signed_area;
