//! Output placement and writing.
//!
//! Every write failure becomes [`ConversionError::ExportIo`] with the path
//! that could not be written.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use crate::error::ConversionError;
use crate::io::gmsh::{write_gmsh_mesh, GmshError};
use crate::io::triangle::{with_suffix, write_triangle_mesh, write_value_file, TriangleFileError};
use crate::io::TriangleFiles;
use crate::mesh::Mesh2D;

/// Prefix for a patched copy that would otherwise replace its input.
pub const PATCHED_PREFIX: &str = "mesh_";

/// Create `dir` and its parents.
pub fn ensure_output_dir(dir: &Path) -> Result<(), ConversionError> {
    fs::create_dir_all(dir).map_err(|e| ConversionError::export_io(dir, e))
}

/// Write the Triangle files of `mesh` and, if requested, a Gmsh copy.
pub fn write_mesh_files(
    base: &Path,
    mesh: &Mesh2D,
    write_gmsh: bool,
) -> Result<(TriangleFiles, Option<PathBuf>), ConversionError> {
    let files = write_triangle_mesh(base, mesh).map_err(export_error)?;

    let gmsh = if write_gmsh {
        let path = with_suffix(base, "msh");
        write_gmsh_mesh(mesh, &path).map_err(|e| match e {
            GmshError::IoError(source) => ConversionError::export_io(&path, source),
            other => ConversionError::export_io(
                &path,
                io::Error::new(io::ErrorKind::Other, other.to_string()),
            ),
        })?;
        Some(path)
    } else {
        None
    };

    tracing::info!(
        node = %files.node.display(),
        ele = %files.ele.display(),
        gmsh = gmsh.is_some(),
        "wrote mesh files"
    );
    Ok((files, gmsh))
}

/// Write node-aligned `values` to `path`.
pub fn write_node_values(path: &Path, values: &[f64]) -> Result<(), ConversionError> {
    write_value_file(path, values).map_err(export_error)
}

/// Where the patched SWASH input goes.
///
/// In place: the input itself. Otherwise a file of the same name in
/// `output_dir`, prefixed with [`PATCHED_PREFIX`] when that file is the
/// input.
pub fn patched_input_path(input: &Path, output_dir: &Path, in_place: bool) -> PathBuf {
    if in_place {
        return input.to_path_buf();
    }
    let name = input
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| "input.sws".to_string());
    let candidate = output_dir.join(&name);
    if same_file(&candidate, input) {
        output_dir.join(format!("{PATCHED_PREFIX}{name}"))
    } else {
        candidate
    }
}

/// How a file referenced from a command file in `from_dir` is written:
/// bare name when it sits next to the command file, the full path otherwise.
pub fn file_reference(from_dir: &Path, target: &Path) -> String {
    let parent = target.parent().unwrap_or_else(|| Path::new(""));
    let beside = parent == from_dir || (parent.exists() && same_file(parent, from_dir));
    match target.file_name() {
        Some(name) if beside => name.to_string_lossy().into_owned(),
        _ => target.display().to_string(),
    }
}

fn same_file(a: &Path, b: &Path) -> bool {
    if a == b {
        return true;
    }
    match (a.canonicalize(), b.canonicalize()) {
        (Ok(a), Ok(b)) => a == b,
        _ => false,
    }
}

fn export_error(e: TriangleFileError) -> ConversionError {
    match e {
        TriangleFileError::IoError { path, source } => ConversionError::export_io(path, source),
        TriangleFileError::ParseError { path, message, .. }
        | TriangleFileError::Inconsistent { path, message } => {
            ConversionError::export_io(path, io::Error::new(io::ErrorKind::InvalidData, message))
        }
    }
}
