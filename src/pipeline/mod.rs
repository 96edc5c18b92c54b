//! Conversion jobs.
//!
//! - [`create_mesh`]: SWASH input with structured grids in, refined mesh,
//!   node-aligned values and patched input out
//! - [`apply_mesh`]: an existing Triangle mesh plus a SWASH input in,
//!   node-aligned values and patched input out
//!
//! ```text
//! load -> features -> sizing -> mesh -> interpolate -> export
//! ```
//!
//! Each job owns its state; nothing is shared between jobs.
//!
//! # Example
//!
//! ```no_run
//! use std::path::Path;
//! use swash_mesh::config::ConversionConfig;
//! use swash_mesh::mesh::DelaunayEngine;
//! use swash_mesh::pipeline::create_mesh;
//!
//! let report = create_mesh(
//!     Path::new("harbour.sws"),
//!     Some(Path::new("gauges.txt")),
//!     Path::new("out"),
//!     &ConversionConfig::default(),
//!     &DelaunayEngine::new(),
//! )
//! .unwrap();
//! println!("{report}");
//! ```

mod export;
mod report;

pub use export::{
    ensure_output_dir, file_reference, patched_input_path, write_mesh_files, write_node_values,
    PATCHED_PREFIX,
};
pub use report::{ConversionReport, SkippedGrid};

use std::borrow::Cow;
use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};

use crate::bathymetry::{BathymetryGrid, ScalarField};
use crate::config::ConversionConfig;
use crate::error::{ConversionError, InterpolationCoverageWarning};
use crate::features::{extract_features, GaugePoint};
use crate::interpolation::{interpolate_field, InterpolationMethod};
use crate::io::gauge_reader::{gauges_from_point_sets, read_gauge_file};
use crate::io::grid_reader::read_input_grid;
use crate::io::swash_input::{InputGrid, Quantity, SwashInput, SwashParseError};
use crate::io::swash_patch::{patch_input, GridPatch};
use crate::io::triangle::{read_triangle_mesh, with_suffix};
use crate::mesh::{build_mesh, mesh_request, Mesh2D, MeshingEngine};
use crate::sizing::build_sizing_field;

/// Build a refined mesh for the SWASH input at `input` and carry its
/// structured grids onto it.
///
/// Gauges come from `config`, from the optional `gauges` file and from the
/// `POINTS` commands of the input.
pub fn create_mesh(
    input: &Path,
    gauges: Option<&Path>,
    output_dir: &Path,
    config: &ConversionConfig,
    engine: &dyn MeshingEngine,
) -> Result<ConversionReport, ConversionError> {
    config.validate()?;

    // load
    let swash = SwashInput::read(input)?;
    let base_dir = swash.base_dir();
    let grids = swash.input_grids()?;
    let bottom = swash.bottom_grid()?;
    if bottom.nonstationary {
        return Err(SwashParseError::Unsupported {
            line: swash.commands()[bottom.inpgrid_command].line_number(),
            what: "non-stationary BOTTOM grid".to_string(),
        }
        .into());
    }
    let depth = read_input_grid(&bottom, &base_dir)?;
    let mut grid = BathymetryGrid::new(depth.clone());
    if let Some(porosity) = grids
        .iter()
        .find(|g| g.quantity == Quantity::Porosity && !g.nonstationary)
    {
        grid = grid.with_porosity(&read_input_grid(porosity, &base_dir)?)?;
    }

    let mut gauge_points: Vec<GaugePoint> = config.gauges.clone();
    if let Some(path) = gauges {
        gauge_points.extend(read_gauge_file(path)?);
    }
    gauge_points.extend(gauges_from_point_sets(&swash.point_sets()?, &base_dir)?);

    tracing::info!(
        input = %input.display(),
        samples = grid.geometry().len(),
        grids = grids.len(),
        gauges = gauge_points.len(),
        "loaded SWASH input"
    );

    // features, sizing, mesh
    let features = extract_features(&grid, &gauge_points, &config.features)?;
    let sizing = build_sizing_field(&grid, &features, &config.sizing, config.features.datum);
    let request = mesh_request(
        grid.bounds(),
        &features,
        config.sizing.global_min_size,
        config.sizing.global_max_size,
    );
    let mesh = build_mesh(engine, &request, &sizing)?;

    // export
    ensure_output_dir(output_dir)?;
    let base = output_dir.join(&config.export.basename);
    let (files, gmsh) = write_mesh_files(&base, &mesh, config.export.write_gmsh)?;

    let mut report = ConversionReport::for_mesh(&mesh);
    report.n_breakwaters = features.breakwaters.len();
    report.n_shoreline_polylines = features.shoreline.len();
    report.gmsh_file = gmsh;

    let patched = patched_input_path(input, output_dir, config.export.in_place);
    carry_grids(
        &swash,
        &grids,
        Some((&bottom, &depth)),
        &mesh,
        &base,
        &base,
        &patched,
        config,
        &mut report,
    )?;
    report.mesh_files = Some(files);

    tracing::info!(
        nodes = report.n_nodes,
        elements = report.n_elements,
        patched = %report.patched_input.display(),
        "conversion finished"
    );
    Ok(report)
}

/// Carry the structured grids of the SWASH input at `input` onto the
/// existing Triangle mesh `<mesh_base>.node/.ele`.
///
/// Value files are named after the mesh; the mesh files are not rewritten.
pub fn apply_mesh(
    mesh_base: &Path,
    input: &Path,
    output_dir: &Path,
    config: &ConversionConfig,
) -> Result<ConversionReport, ConversionError> {
    config.validate()?;

    let mesh = read_triangle_mesh(mesh_base)?;
    let swash = SwashInput::read(input)?;
    let grids = swash.input_grids()?;
    tracing::info!(
        mesh = %mesh_base.display(),
        nodes = mesh.n_vertices,
        grids = grids.len(),
        "loaded mesh and SWASH input"
    );

    ensure_output_dir(output_dir)?;
    let stem = mesh_base
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| config.export.basename.clone());
    let values_base = output_dir.join(stem);

    let mut report = ConversionReport::for_mesh(&mesh);
    let patched = patched_input_path(input, output_dir, config.export.in_place);
    carry_grids(
        &swash,
        &grids,
        None,
        &mesh,
        &values_base,
        mesh_base,
        &patched,
        config,
        &mut report,
    )?;

    tracing::info!(
        nodes = report.n_nodes,
        patched = %report.patched_input.display(),
        "mesh applied"
    );
    Ok(report)
}

/// Interpolate every convertible grid onto `mesh`, write the value files
/// next to `values_base` and the patched input to `patched`.
#[allow(clippy::too_many_arguments)]
fn carry_grids(
    swash: &SwashInput,
    grids: &[InputGrid],
    preloaded: Option<(&InputGrid, &ScalarField)>,
    mesh: &Mesh2D,
    values_base: &Path,
    mesh_base: &Path,
    patched: &Path,
    config: &ConversionConfig,
    report: &mut ConversionReport,
) -> Result<(), ConversionError> {
    let base_dir = swash.base_dir();
    let patched_dir = patched.parent().unwrap_or_else(|| Path::new(""));
    let mut used = HashSet::new();
    let mut patches = Vec::new();

    for grid in grids {
        if let Err(reason) = grid.convertible() {
            let line = swash.commands()[grid.inpgrid_command].line_number();
            tracing::warn!(quantity = %grid.quantity, line, %reason, "input grid left structured");
            report.skipped_grids.push(SkippedGrid {
                quantity: grid.quantity.to_string(),
                line,
                reason,
            });
            continue;
        }

        let field = match preloaded {
            Some((g, f)) if g.inpgrid_command == grid.inpgrid_command => Cow::Borrowed(f),
            _ => Cow::Owned(read_input_grid(grid, &base_dir)?),
        };
        let method = InterpolationMethod::for_quantity(&grid.quantity);
        let result = interpolate_field(
            &field,
            &grid.quantity,
            &mesh.vertices,
            method,
            &config.interpolation,
        )?;
        if result.outside_count() > 0 {
            report.warnings.push(InterpolationCoverageWarning {
                quantity: grid.quantity.to_string(),
                count: result.outside_count(),
                nodes: result.outside_nodes.clone(),
            });
        }
        report.unstable_nodes += result.unstable_count();

        let path = value_path(values_base, &grid.quantity, &mut used);
        write_node_values(&path, &result.values)?;
        patches.push(GridPatch::new(grid, file_reference(patched_dir, &path)));
        report
            .value_files
            .push((grid.quantity.keyword().to_string(), path));
    }

    let text = patch_input(swash, &file_reference(patched_dir, mesh_base), &patches)?;
    fs::write(patched, text).map_err(|e| ConversionError::export_io(patched, e))?;
    report.patched_input = patched.to_path_buf();
    Ok(())
}

/// `<base>.<ext>`, or `<base>_<n>.<ext>` when a quantity appears twice.
fn value_path(base: &Path, quantity: &Quantity, used: &mut HashSet<PathBuf>) -> PathBuf {
    let ext = quantity.file_extension();
    let mut path = with_suffix(base, &ext);
    let mut n = 2;
    while !used.insert(path.clone()) {
        let mut name = base.as_os_str().to_owned();
        name.push(format!("_{n}"));
        path = with_suffix(Path::new(&name), &ext);
        n += 1;
    }
    path
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_value_path_disambiguates() {
        let mut used = HashSet::new();
        let base = Path::new("out/mesh");
        assert_eq!(value_path(base, &Quantity::Bottom, &mut used), PathBuf::from("out/mesh.bot"));
        assert_eq!(
            value_path(base, &Quantity::Porosity, &mut used),
            PathBuf::from("out/mesh.poro")
        );
        assert_eq!(
            value_path(base, &Quantity::Bottom, &mut used),
            PathBuf::from("out/mesh_2.bot")
        );
    }
}
