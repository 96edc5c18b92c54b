//! Structured value file reader.
//!
//! Reads the FREE-format files referenced by `READINP` commands. Values are
//! separated by blanks or commas; line structure is ignored after the
//! `nhedf` header lines.
//!
//! # Layouts (`idla`)
//!
//! | idla | first value | row order |
//! |------|-------------|-----------|
//! | 1, 2 | north-west  | north to south |
//! | 3, 4 | south-west  | south to north |
//!
//! Within a row values always run west to east. Column-wise layouts (5, 6)
//! are rejected.

use std::fs;
use std::path::Path;

use thiserror::Error;

use crate::bathymetry::{BathymetryError, GridGeometry, ScalarField};
use crate::io::swash_input::{parse_number, InputGrid};

/// Error reading a structured value file.
#[derive(Debug, Error)]
pub enum GridReadError {
    /// File could not be read.
    #[error("I/O error reading '{path}': {source}")]
    IoError {
        path: String,
        source: std::io::Error,
    },

    /// Token that is not a number.
    #[error("'{path}' line {line}: invalid value '{token}'")]
    InvalidValue {
        path: String,
        line: usize,
        token: String,
    },

    /// Fewer values than grid samples.
    #[error("'{path}': expected {expected} values, found {found}")]
    TooFewValues {
        path: String,
        expected: usize,
        found: usize,
    },

    /// Layout code not supported.
    #[error("unsupported idla {0} (only 1, 2, 3 and 4 are supported)")]
    UnsupportedLayout(i32),

    /// Rotated input grid.
    #[error("rotated input grids are not supported ({quantity} alp = {alp})")]
    RotatedGrid { quantity: String, alp: f64 },

    /// Data format other than FREE.
    #[error("unsupported data format for {quantity}: {format}")]
    UnsupportedFormat { quantity: String, format: String },

    /// Grid construction failed.
    #[error(transparent)]
    Grid(#[from] BathymetryError),
}

/// Read the file of an [`InputGrid`], resolving its name against `base_dir`.
pub fn read_input_grid(grid: &InputGrid, base_dir: &Path) -> Result<ScalarField, GridReadError> {
    if grid.alp != 0.0 {
        return Err(GridReadError::RotatedGrid {
            quantity: grid.quantity.to_string(),
            alp: grid.alp,
        });
    }
    if let Some(format) = &grid.format {
        return Err(GridReadError::UnsupportedFormat {
            quantity: grid.quantity.to_string(),
            format: format.clone(),
        });
    }

    let path = base_dir.join(&grid.file);
    let values = read_structured_values(
        &path,
        &grid.geometry,
        grid.fac,
        grid.idla,
        grid.nhedf,
        grid.exception,
    )?;
    tracing::debug!(
        quantity = %grid.quantity,
        path = %path.display(),
        samples = grid.geometry.len(),
        missing = values.missing_count(),
        "read structured input grid"
    );
    Ok(values)
}

/// Read a structured value file into a south-first [`ScalarField`].
///
/// Raw values equal to `exception` become missing; all others are
/// multiplied by `fac`.
pub fn read_structured_values(
    path: &Path,
    geometry: &GridGeometry,
    fac: f64,
    idla: i32,
    nhedf: usize,
    exception: Option<f64>,
) -> Result<ScalarField, GridReadError> {
    let content = fs::read_to_string(path).map_err(|source| GridReadError::IoError {
        path: path.display().to_string(),
        source,
    })?;
    parse_structured_values(
        &content,
        &path.display().to_string(),
        geometry,
        fac,
        idla,
        nhedf,
        exception,
    )
}

/// Parse structured values from text, see [`read_structured_values`].
pub fn parse_structured_values(
    content: &str,
    name: &str,
    geometry: &GridGeometry,
    fac: f64,
    idla: i32,
    nhedf: usize,
    exception: Option<f64>,
) -> Result<ScalarField, GridReadError> {
    let north_first = match idla {
        1 | 2 => true,
        3 | 4 => false,
        other => return Err(GridReadError::UnsupportedLayout(other)),
    };

    geometry.validate()?;
    // Grow with the file, not with the header
    let expected = geometry.len();
    let mut raw = Vec::new();
    'lines: for (line_num, line) in content.lines().enumerate().skip(nhedf) {
        for token in line.split(|c: char| c.is_whitespace() || c == ',') {
            if token.is_empty() {
                continue;
            }
            let value = parse_number(token).ok_or_else(|| GridReadError::InvalidValue {
                path: name.to_string(),
                line: line_num + 1,
                token: token.to_string(),
            })?;
            raw.push(value);
            if raw.len() == expected {
                break 'lines;
            }
        }
    }

    if raw.len() < expected {
        return Err(GridReadError::TooFewValues {
            path: name.to_string(),
            expected,
            found: raw.len(),
        });
    }

    let mut values = vec![None; expected];
    for (k, &v) in raw.iter().enumerate() {
        let file_row = k / geometry.n_cols;
        let col = k % geometry.n_cols;
        let row = if north_first {
            geometry.n_rows - 1 - file_row
        } else {
            file_row
        };
        let missing = exception.is_some_and(|exc| v == exc);
        values[geometry.index(col, row)] = if missing { None } else { Some(v * fac) };
    }

    Ok(ScalarField::new(*geometry, values, exception)?)
}
