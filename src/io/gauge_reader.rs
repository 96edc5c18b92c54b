//! Gauge position file reader.
//!
//! # File Format
//!
//! ```text
//! # Wave gauges
//! 0.0 0.0
//! 150.0 -20.0
//! harbour_mouth 300.0 45.0
//! ```
//!
//! One gauge per line, either `x y` (named `G1`, `G2`, ... by position) or
//! `name x y`. Lines starting with `#`, `$` or `!` are comments. Commas are
//! accepted as separators.

use std::fs::File;
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::Path;

use thiserror::Error;

use crate::features::GaugePoint;
use crate::io::swash_input::{parse_number, PointSet, PointSource};

/// Error type for gauge file operations.
#[derive(Debug, Error)]
pub enum GaugeFileError {
    /// IO error reading file
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    /// Parse error in file content
    #[error("{source_name} line {line}: {message}")]
    ParseError {
        source_name: String,
        line: usize,
        message: String,
    },
}

/// Read a gauge position file.
pub fn read_gauge_file(path: &Path) -> Result<Vec<GaugePoint>, GaugeFileError> {
    let file = File::open(path)?;
    let reader = BufReader::new(file);
    let source_name = path.display().to_string();

    let mut gauges = Vec::new();
    for (line_num, line_result) in reader.lines().enumerate() {
        let line = line_result?;
        if let Some(gauge) = parse_gauge_line(&line, line_num + 1, &source_name, gauges.len())? {
            gauges.push(gauge);
        }
    }
    Ok(gauges)
}

/// Parse gauge positions from text.
pub fn parse_gauges(content: &str) -> Result<Vec<GaugePoint>, GaugeFileError> {
    let mut gauges = Vec::new();
    for (line_num, line) in content.lines().enumerate() {
        if let Some(gauge) = parse_gauge_line(line, line_num + 1, "<text>", gauges.len())? {
            gauges.push(gauge);
        }
    }
    Ok(gauges)
}

fn parse_gauge_line(
    line: &str,
    line_num: usize,
    source_name: &str,
    position: usize,
) -> Result<Option<GaugePoint>, GaugeFileError> {
    let line = line.trim();
    if line.is_empty() || line.starts_with(['#', '$', '!']) {
        return Ok(None);
    }

    let parts: Vec<&str> = line
        .split(|c: char| c.is_whitespace() || c == ',')
        .filter(|s| !s.is_empty())
        .collect();

    let error = |message: String| GaugeFileError::ParseError {
        source_name: source_name.to_string(),
        line: line_num,
        message,
    };

    let (name, xs, ys) = match parts.as_slice() {
        [x, y] => (format!("G{}", position + 1), *x, *y),
        [name, x, y] => (name.trim_matches('\'').to_string(), *x, *y),
        _ => {
            return Err(error(format!(
                "expected 'x y' or 'name x y', found {} fields",
                parts.len()
            )))
        }
    };

    let x = parse_number(xs).ok_or_else(|| error(format!("invalid x coordinate '{xs}'")))?;
    let y = parse_number(ys).ok_or_else(|| error(format!("invalid y coordinate '{ys}'")))?;
    Ok(Some(GaugePoint::new(name, x, y)))
}

/// Gauges named in `POINTS` commands, file sets resolved against `base_dir`.
///
/// Points of a set are named `<set>_<n>`.
pub fn gauges_from_point_sets(
    sets: &[PointSet],
    base_dir: &Path,
) -> Result<Vec<GaugePoint>, GaugeFileError> {
    let mut gauges = Vec::new();
    for set in sets {
        let coords: Vec<(f64, f64)> = match &set.source {
            PointSource::Inline(points) => points.clone(),
            PointSource::File(file) => read_gauge_file(&base_dir.join(file))?
                .into_iter()
                .map(|g| (g.x, g.y))
                .collect(),
        };
        gauges.extend(
            coords
                .into_iter()
                .enumerate()
                .map(|(i, (x, y))| GaugePoint::new(format!("{}_{}", set.name, i + 1), x, y)),
        );
    }
    Ok(gauges)
}

/// Write gauges as `name x y` lines.
pub fn write_gauge_file(path: &Path, gauges: &[GaugePoint]) -> Result<(), GaugeFileError> {
    let file = File::create(path)?;
    let mut writer = BufWriter::new(file);
    writeln!(writer, "# name x y")?;
    for gauge in gauges {
        writeln!(writer, "{} {} {}", gauge.name, gauge.x, gauge.y)?;
    }
    writer.flush()?;
    Ok(())
}
