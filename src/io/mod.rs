//! File formats read and written by a conversion.
//!
//! This module provides:
//! - **SWASH command files**: grid, input-grid and output-point commands
//! - **Structured value files**: the FREE-format files behind `READINP`
//! - **Gauge files**: named output locations
//! - **Triangle files**: `.node`/`.ele`/`.edge` meshes and node-aligned values
//! - **Gmsh MSH 2.2**: mesh exchange with the external engine
//! - **Input patching**: the SWASH file rewritten for the unstructured mesh
//!
//! # File Formats
//!
//! ## Structured Value Files
//!
//! ```text
//! -12.0 -11.5 -11.0 -10.5
//! -10.0  -9.5  -9.0  -8.5
//! ```
//!
//! Layout given by the `idla` code of the `READINP` command; `nhedf` header
//! lines are skipped.
//!
//! ## Gauge Files
//!
//! ```text
//! # name x y
//! G1 100.0 250.0
//! 300.0 400.0
//! ```
//!
//! ## Node-Aligned Value Files
//!
//! One value per line in node order, e.g. `mesh.bot` for the bottom.
//!
//! # Example
//!
//! ```no_run
//! use std::path::Path;
//! use swash_mesh::io::{read_input_grid, SwashInput};
//!
//! let input = SwashInput::read(Path::new("harbour.sws")).unwrap();
//! let bottom = input.bottom_grid().unwrap();
//! let depth = read_input_grid(&bottom, &input.base_dir()).unwrap();
//! println!("{} bottom samples", depth.geometry().len());
//! ```

pub mod gauge_reader;
pub mod gmsh;
pub mod grid_reader;
pub mod swash_input;
pub mod swash_patch;
pub mod triangle;

pub use gauge_reader::{
    gauges_from_point_sets, parse_gauges, read_gauge_file, write_gauge_file, GaugeFileError,
};
pub use gmsh::{read_gmsh_file, write_gmsh_mesh, GmshError, GmshMesh};
pub use grid_reader::{read_input_grid, read_structured_values, GridReadError};
pub use swash_input::{
    ComputationalGrid, InputGrid, PointSet, PointSource, Quantity, SwashInput, SwashParseError,
};
pub use swash_patch::{patch_input, GridPatch};
pub use triangle::{
    read_triangle_mesh, read_value_file, write_triangle_mesh, write_value_file, with_suffix,
    TriangleFileError, TriangleFiles,
};
