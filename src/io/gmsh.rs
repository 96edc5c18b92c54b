//! Gmsh mesh file I/O.
//!
//! Supports reading and writing Gmsh MSH format version 2.2 (ASCII).
//!
//! ## Supported Element Types
//! - 2 = Triangle (3-node)
//! - 1 = Line (2-node, physical tag = boundary marker)
//!
//! Other element types (points written by `gmsh -2`, higher-order elements)
//! are skipped. Node ids need not be contiguous.
//!
//! ## Example
//! ```no_run
//! use swash_mesh::io::gmsh::read_gmsh_file;
//! use std::path::Path;
//!
//! let msh = read_gmsh_file(Path::new("mesh.msh")).expect("Failed to read mesh");
//! println!("{} triangles", msh.triangles.len());
//! ```

use std::collections::HashMap;
use std::fs::File;
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::Path;

use thiserror::Error;

use crate::mesh::Mesh2D;

/// Error type for Gmsh I/O operations.
#[derive(Debug, Error)]
pub enum GmshError {
    /// File could not be opened.
    #[error("I/O error: {0}")]
    IoError(#[from] std::io::Error),

    /// Invalid file format.
    #[error("Parse error: {0}")]
    ParseError(String),

    /// Unsupported mesh format version.
    #[error("Unsupported Gmsh version: {0}")]
    UnsupportedVersion(String),

    /// Missing required section.
    #[error("Missing section: {0}")]
    MissingSection(String),
}

/// Gmsh element types.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum GmshElementType {
    Line = 1,
    Triangle = 2,
}

impl GmshElementType {
    fn from_code(value: i32) -> Option<Self> {
        match value {
            1 => Some(GmshElementType::Line),
            2 => Some(GmshElementType::Triangle),
            _ => None,
        }
    }
}

/// Raw contents of an MSH 2.2 file, 0-based.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct GmshMesh {
    pub vertices: Vec<(f64, f64)>,
    pub triangles: Vec<[usize; 3]>,
    /// Line elements with their physical tag.
    pub lines: Vec<([usize; 2], u32)>,
}

/// Read a Gmsh MSH file (format 2.2).
pub fn read_gmsh_file(path: &Path) -> Result<GmshMesh, GmshError> {
    let file = File::open(path)?;
    parse_gmsh(BufReader::new(file))
}

/// Parse MSH 2.2 content from any buffered reader.
pub fn parse_gmsh<R: BufRead>(reader: R) -> Result<GmshMesh, GmshError> {
    let mut lines = reader.lines();
    let mut nodes: Option<(Vec<(f64, f64)>, HashMap<usize, usize>)> = None;
    let mut raw_elements: Option<Vec<RawElement>> = None;

    while let Some(line_result) = lines.next() {
        let line = line_result?;
        let line = line.trim();

        if line.starts_with("$MeshFormat") {
            parse_mesh_format(&mut lines)?;
        } else if line.starts_with("$Nodes") {
            nodes = Some(parse_nodes(&mut lines)?);
        } else if line.starts_with("$Elements") {
            raw_elements = Some(parse_elements(&mut lines)?);
        }
    }

    let (vertices, id_map) = nodes.ok_or_else(|| GmshError::MissingSection("Nodes".to_string()))?;
    let raw_elements =
        raw_elements.ok_or_else(|| GmshError::MissingSection("Elements".to_string()))?;

    let lookup = |id: usize| {
        id_map
            .get(&id)
            .copied()
            .ok_or_else(|| GmshError::ParseError(format!("Element references unknown node {id}")))
    };

    let mut mesh = GmshMesh {
        vertices,
        ..GmshMesh::default()
    };
    for element in raw_elements {
        match element.kind {
            GmshElementType::Triangle => mesh.triangles.push([
                lookup(element.nodes[0])?,
                lookup(element.nodes[1])?,
                lookup(element.nodes[2])?,
            ]),
            GmshElementType::Line => mesh.lines.push((
                [lookup(element.nodes[0])?, lookup(element.nodes[1])?],
                element.physical_tag,
            )),
        }
    }
    Ok(mesh)
}

/// Parse the $MeshFormat section.
fn parse_mesh_format<I>(lines: &mut I) -> Result<(), GmshError>
where
    I: Iterator<Item = std::io::Result<String>>,
{
    if let Some(line_result) = lines.next() {
        let line = line_result?;
        let parts: Vec<&str> = line.split_whitespace().collect();
        if parts.is_empty() {
            return Err(GmshError::ParseError("Empty MeshFormat line".to_string()));
        }

        let version = parts[0];
        if !version.starts_with("2.") {
            return Err(GmshError::UnsupportedVersion(version.to_string()));
        }
        if parts.get(1).is_some_and(|&file_type| file_type != "0") {
            return Err(GmshError::UnsupportedVersion(format!("{version} (binary)")));
        }

        skip_to_end(lines, "$EndMeshFormat")?;
    }
    Ok(())
}

/// Parse the $Nodes section; returns coordinates and the node id map.
fn parse_nodes<I>(lines: &mut I) -> Result<(Vec<(f64, f64)>, HashMap<usize, usize>), GmshError>
where
    I: Iterator<Item = std::io::Result<String>>,
{
    let n_nodes = parse_count(lines, "node")?;

    let mut vertices = Vec::with_capacity(n_nodes);
    let mut id_map = HashMap::with_capacity(n_nodes);

    for _ in 0..n_nodes {
        let line = next_line(lines, "Nodes")?;
        let parts: Vec<&str> = line.split_whitespace().collect();
        if parts.len() < 4 {
            return Err(GmshError::ParseError(format!("Invalid node line: {}", line)));
        }

        // Format: node_id x y z
        let id: usize = parse_field(parts[0], "node id")?;
        let x: f64 = parse_field(parts[1], "x coordinate")?;
        let y: f64 = parse_field(parts[2], "y coordinate")?;

        id_map.insert(id, vertices.len());
        vertices.push((x, y));
    }

    skip_to_end(lines, "$EndNodes")?;
    Ok((vertices, id_map))
}

struct RawElement {
    kind: GmshElementType,
    physical_tag: u32,
    nodes: Vec<usize>,
}

/// Parse the $Elements section, keeping lines and triangles.
fn parse_elements<I>(lines: &mut I) -> Result<Vec<RawElement>, GmshError>
where
    I: Iterator<Item = std::io::Result<String>>,
{
    let n_elements = parse_count(lines, "element")?;
    let mut elements = Vec::new();

    for _ in 0..n_elements {
        let line = next_line(lines, "Elements")?;
        let parts: Vec<&str> = line.split_whitespace().collect();
        if parts.len() < 3 {
            return Err(GmshError::ParseError(format!("Invalid element line: {}", line)));
        }

        // Format: elem_id elem_type n_tags tag1 ... tagN node1 node2 ...
        let elem_type: i32 = parse_field(parts[1], "element type")?;
        let n_tags: usize = parse_field(parts[2], "tag count")?;

        let Some(kind) = GmshElementType::from_code(elem_type) else {
            continue;
        };

        // Physical tag (first tag) carries the boundary marker
        let physical_tag = if n_tags > 0 && parts.len() > 3 {
            parse_field(parts[3], "physical tag")?
        } else {
            0
        };

        let node_start = 3 + n_tags;
        let n_nodes = match kind {
            GmshElementType::Line => 2,
            GmshElementType::Triangle => 3,
        };
        if parts.len() < node_start + n_nodes {
            return Err(GmshError::ParseError(format!(
                "Element needs {} nodes: {}",
                n_nodes, line
            )));
        }
        let nodes = parts[node_start..node_start + n_nodes]
            .iter()
            .map(|p| parse_field(p, "node id"))
            .collect::<Result<Vec<usize>, _>>()?;

        elements.push(RawElement {
            kind,
            physical_tag,
            nodes,
        });
    }

    skip_to_end(lines, "$EndElements")?;
    Ok(elements)
}

fn parse_count<I>(lines: &mut I, what: &str) -> Result<usize, GmshError>
where
    I: Iterator<Item = std::io::Result<String>>,
{
    match lines.next() {
        Some(Ok(line)) => line
            .trim()
            .parse::<usize>()
            .map_err(|_| GmshError::ParseError(format!("Invalid {} count", what))),
        Some(Err(e)) => Err(e.into()),
        None => Err(GmshError::ParseError(format!("Missing {} count", what))),
    }
}

fn next_line<I>(lines: &mut I, section: &str) -> Result<String, GmshError>
where
    I: Iterator<Item = std::io::Result<String>>,
{
    match lines.next() {
        Some(line) => Ok(line?),
        None => Err(GmshError::ParseError(format!(
            "Unexpected end of file in {} section",
            section
        ))),
    }
}

fn parse_field<T: std::str::FromStr>(token: &str, what: &str) -> Result<T, GmshError> {
    token
        .parse()
        .map_err(|_| GmshError::ParseError(format!("Invalid {}: {}", what, token)))
}

fn skip_to_end<I>(lines: &mut I, end: &str) -> Result<(), GmshError>
where
    I: Iterator<Item = std::io::Result<String>>,
{
    for line_result in lines.by_ref() {
        let line = line_result?;
        if line.trim().starts_with(end) {
            break;
        }
    }
    Ok(())
}

/// Write a Mesh2D to Gmsh MSH format 2.2.
///
/// Every edge with a non-zero marker is written as a line element whose
/// physical tag is the marker; triangles follow.
pub fn write_gmsh_mesh(mesh: &Mesh2D, path: &Path) -> Result<(), GmshError> {
    let file = File::create(path)?;
    let mut writer = BufWriter::new(file);

    writeln!(writer, "$MeshFormat")?;
    writeln!(writer, "2.2 0 8")?;
    writeln!(writer, "$EndMeshFormat")?;

    writeln!(writer, "$Nodes")?;
    writeln!(writer, "{}", mesh.vertices.len())?;
    for (i, &(x, y)) in mesh.vertices.iter().enumerate() {
        writeln!(writer, "{} {} {} 0", i + 1, x, y)?;
    }
    writeln!(writer, "$EndNodes")?;

    let marked: Vec<_> = mesh.marked_edges().collect();
    let n_total = marked.len() + mesh.n_elements;

    writeln!(writer, "$Elements")?;
    writeln!(writer, "{}", n_total)?;

    let mut elem_id = 1;
    for edge in &marked {
        let (n0, n1) = edge.vertices;
        let physical_tag = edge.tag.marker();
        // Format: elem_id type n_tags physical_tag geometrical_tag node1 node2
        writeln!(
            writer,
            "{} 1 2 {} {} {} {}",
            elem_id,
            physical_tag,
            physical_tag,
            n0 + 1,
            n1 + 1
        )?;
        elem_id += 1;
    }

    for elem in &mesh.elements {
        writeln!(
            writer,
            "{} 2 2 0 1 {} {} {}",
            elem_id,
            elem[0] + 1,
            elem[1] + 1,
            elem[2] + 1
        )?;
        elem_id += 1;
    }

    writeln!(writer, "$EndElements")?;
    writer.flush()?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mesh::BoundaryTag;
    use crate::types::Bounds2D;
    use std::io::Write as IoWrite;
    use tempfile::NamedTempFile;

    #[test]
    fn test_read_simple_mesh() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(
            file,
            r#"$MeshFormat
2.2 0 8
$EndMeshFormat
$Nodes
4
1 0.0 0.0 0.0
2 1.0 0.0 0.0
3 1.0 1.0 0.0
4 0.0 1.0 0.0
$EndNodes
$Elements
2
1 2 2 0 1 1 2 3
2 2 2 0 1 1 3 4
$EndElements"#
        )
        .unwrap();

        let msh = read_gmsh_file(file.path()).unwrap();
        assert_eq!(msh.vertices.len(), 4);
        assert_eq!(msh.triangles, vec![[0, 1, 2], [0, 2, 3]]);
        assert!(msh.lines.is_empty());
    }

    #[test]
    fn test_sparse_node_ids_and_skipped_points() {
        let content = "$MeshFormat\n2.2 0 8\n$EndMeshFormat\n$Nodes\n3\n10 0 0 0\n20 2 0 0\n30 0 2 0\n$EndNodes\n$Elements\n3\n1 15 2 0 1 10\n2 1 2 4 4 10 20\n3 2 2 0 1 10 20 30\n$EndElements\n";
        let msh = parse_gmsh(content.as_bytes()).unwrap();
        assert_eq!(msh.triangles, vec![[0, 1, 2]]);
        assert_eq!(msh.lines, vec![([0, 1], 4)]);
    }

    #[test]
    fn test_unknown_node_reference() {
        let content = "$Nodes\n1\n1 0 0 0\n$EndNodes\n$Elements\n1\n1 1 2 1 1 1 7\n$EndElements\n";
        assert!(matches!(
            parse_gmsh(content.as_bytes()),
            Err(GmshError::ParseError(_))
        ));
    }

    #[test]
    fn test_version_check() {
        let content = "$MeshFormat\n4.1 0 8\n$EndMeshFormat\n";
        assert!(matches!(
            parse_gmsh(content.as_bytes()),
            Err(GmshError::UnsupportedVersion(_))
        ));
    }

    #[test]
    fn test_error_missing_nodes() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(
            file,
            r#"$MeshFormat
2.2 0 8
$EndMeshFormat
$Elements
1
1 2 2 0 1 1 2 3
$EndElements"#
        )
        .unwrap();

        let result = read_gmsh_file(file.path());
        assert!(matches!(result, Err(GmshError::MissingSection(_))));
    }

    #[test]
    fn test_roundtrip_keeps_markers() {
        let mesh = Mesh2D::uniform_rectangle(Bounds2D::new(0.0, 2.0, 0.0, 1.0), 2, 2);

        let file = NamedTempFile::new().unwrap();
        write_gmsh_mesh(&mesh, file.path()).unwrap();
        let msh = read_gmsh_file(file.path()).unwrap();

        assert_eq!(msh.vertices, mesh.vertices);
        assert_eq!(msh.triangles, mesh.elements);
        assert_eq!(msh.lines.len(), mesh.n_boundary_edges);
        let west = msh
            .lines
            .iter()
            .filter(|(_, tag)| *tag == BoundaryTag::West.marker())
            .count();
        assert_eq!(west, 2);
    }
}
