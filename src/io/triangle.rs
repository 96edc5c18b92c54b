//! Triangle-format mesh files as read by SWASH.
//!
//! `<base>.node`:
//! ```text
//! <n> 2 0 1
//! <i> <x> <y> <marker>
//! ```
//! `<base>.ele`:
//! ```text
//! <n> 3 0
//! <i> <a> <b> <c>
//! ```
//! `<base>.edge`:
//! ```text
//! <n> 1
//! <i> <a> <b> <marker>
//! ```
//!
//! Files are written 1-based. Readers accept whatever index the first
//! record uses as the base, as Triangle itself does. Lines starting with
//! `#` are comments. Coordinates are written in shortest round-trip form.

use std::collections::HashMap;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use thiserror::Error;

use crate::mesh::{BoundaryTag, Mesh2D};

/// Error type for Triangle file I/O.
#[derive(Debug, Error)]
pub enum TriangleFileError {
    #[error("I/O error on '{}': {source}", path.display())]
    IoError {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("'{}' line {line}: {message}", path.display())]
    ParseError {
        path: PathBuf,
        line: usize,
        message: String,
    },

    /// Records refer to something that does not exist.
    #[error("'{}': {message}", path.display())]
    Inconsistent { path: PathBuf, message: String },
}

impl TriangleFileError {
    fn io(path: &Path, source: std::io::Error) -> Self {
        TriangleFileError::IoError {
            path: path.to_path_buf(),
            source,
        }
    }

    fn parse(path: &Path, line: usize, message: impl Into<String>) -> Self {
        TriangleFileError::ParseError {
            path: path.to_path_buf(),
            line,
            message: message.into(),
        }
    }
}

/// `<base>.<ext>`, keeping any dots already in the base name.
pub fn with_suffix(base: &Path, ext: &str) -> PathBuf {
    let mut name = base.as_os_str().to_owned();
    name.push(".");
    name.push(ext);
    PathBuf::from(name)
}

/// Paths of the three mesh files of a base name.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TriangleFiles {
    pub node: PathBuf,
    pub ele: PathBuf,
    pub edge: PathBuf,
}

impl TriangleFiles {
    pub fn new(base: &Path) -> Self {
        Self {
            node: with_suffix(base, "node"),
            ele: with_suffix(base, "ele"),
            edge: with_suffix(base, "edge"),
        }
    }
}

/// Write `<base>.node`, `<base>.ele` and `<base>.edge`.
pub fn write_triangle_mesh(base: &Path, mesh: &Mesh2D) -> Result<TriangleFiles, TriangleFileError> {
    let files = TriangleFiles::new(base);
    write_node_file(&files.node, mesh)?;
    write_ele_file(&files.ele, mesh)?;
    write_edge_file(&files.edge, mesh)?;
    Ok(files)
}

pub fn write_node_file(path: &Path, mesh: &Mesh2D) -> Result<(), TriangleFileError> {
    let write = || -> std::io::Result<()> {
        let mut w = create_raw(path)?;
        writeln!(w, "{} 2 0 1", mesh.n_vertices)?;
        for (i, (&(x, y), tag)) in mesh.vertices.iter().zip(&mesh.vertex_tags).enumerate() {
            writeln!(w, "{} {} {} {}", i + 1, x, y, tag.marker())?;
        }
        w.flush()
    };
    write().map_err(|e| TriangleFileError::io(path, e))
}

pub fn write_ele_file(path: &Path, mesh: &Mesh2D) -> Result<(), TriangleFileError> {
    let write = || -> std::io::Result<()> {
        let mut w = create_raw(path)?;
        writeln!(w, "{} 3 0", mesh.n_elements)?;
        for (k, elem) in mesh.elements.iter().enumerate() {
            writeln!(w, "{} {} {} {}", k + 1, elem[0] + 1, elem[1] + 1, elem[2] + 1)?;
        }
        w.flush()
    };
    write().map_err(|e| TriangleFileError::io(path, e))
}

pub fn write_edge_file(path: &Path, mesh: &Mesh2D) -> Result<(), TriangleFileError> {
    let write = || -> std::io::Result<()> {
        let mut w = create_raw(path)?;
        writeln!(w, "{} 1", mesh.n_edges)?;
        for (e, edge) in mesh.edges.iter().enumerate() {
            let (a, b) = edge.vertices;
            writeln!(w, "{} {} {} {}", e + 1, a + 1, b + 1, edge.tag.marker())?;
        }
        w.flush()
    };
    write().map_err(|e| TriangleFileError::io(path, e))
}

fn create_raw(path: &Path) -> std::io::Result<BufWriter<File>> {
    File::create(path).map(BufWriter::new)
}

/// Write one value per line, in node order.
pub fn write_value_file(path: &Path, values: &[f64]) -> Result<(), TriangleFileError> {
    let write = || -> std::io::Result<()> {
        let mut w = create_raw(path)?;
        for v in values {
            writeln!(w, "{}", v)?;
        }
        w.flush()
    };
    write().map_err(|e| TriangleFileError::io(path, e))
}

/// Read a file written by [`write_value_file`] (any whitespace separation).
pub fn read_value_file(path: &Path) -> Result<Vec<f64>, TriangleFileError> {
    let content = std::fs::read_to_string(path).map_err(|e| TriangleFileError::io(path, e))?;
    let mut values = Vec::new();
    for (i, line) in content.lines().enumerate() {
        for token in strip_comment(line).split_whitespace() {
            let v = token
                .parse::<f64>()
                .map_err(|_| TriangleFileError::parse(path, i + 1, format!("invalid value '{token}'")))?;
            values.push(v);
        }
    }
    Ok(values)
}

fn strip_comment(line: &str) -> &str {
    match line.find('#') {
        Some(pos) => &line[..pos],
        None => line,
    }
}

/// Non-empty, comment-stripped records with their 1-based line numbers.
fn records<'a>(content: &'a str) -> impl Iterator<Item = (usize, Vec<&'a str>)> + 'a {
    content.lines().enumerate().filter_map(|(i, line)| {
        let fields: Vec<&str> = strip_comment(line).split_whitespace().collect();
        (!fields.is_empty()).then_some((i + 1, fields))
    })
}

fn field<T: std::str::FromStr>(
    path: &Path,
    line: usize,
    fields: &[&str],
    k: usize,
    what: &str,
) -> Result<T, TriangleFileError> {
    let token = fields
        .get(k)
        .ok_or_else(|| TriangleFileError::parse(path, line, format!("missing {what}")))?;
    token
        .parse()
        .map_err(|_| TriangleFileError::parse(path, line, format!("invalid {what} '{token}'")))
}

/// Nodes of a `.node` file: coordinates, markers (0 when absent) and index base.
pub fn read_node_file(path: &Path) -> Result<(Vec<(f64, f64)>, Vec<u32>, usize), TriangleFileError> {
    let content = std::fs::read_to_string(path).map_err(|e| TriangleFileError::io(path, e))?;
    let mut it = records(&content);
    let (line, header) = it
        .next()
        .ok_or_else(|| TriangleFileError::parse(path, 1, "empty node file"))?;
    let n: usize = field(path, line, &header, 0, "node count")?;
    let n_attributes: usize = field(path, line, &header, 2, "attribute count").unwrap_or(0);
    let has_marker = field::<usize>(path, line, &header, 3, "marker flag").unwrap_or(0) > 0;

    // The header count is untrusted until the records are there
    let mut vertices = Vec::new();
    let mut markers = Vec::new();
    let mut base = None;
    for (line, fields) in it.by_ref().take(n) {
        let id: usize = field(path, line, &fields, 0, "node index")?;
        let first = *base.get_or_insert(id);
        if id != first + vertices.len() {
            return Err(TriangleFileError::parse(path, line, format!("node index {id} out of sequence")));
        }
        let x: f64 = field(path, line, &fields, 1, "x coordinate")?;
        let y: f64 = field(path, line, &fields, 2, "y coordinate")?;
        let marker = if has_marker {
            field(path, line, &fields, 3 + n_attributes, "boundary marker")?
        } else {
            0
        };
        vertices.push((x, y));
        markers.push(marker);
    }
    if vertices.len() != n {
        return Err(TriangleFileError::Inconsistent {
            path: path.to_path_buf(),
            message: format!("header announces {n} nodes, found {}", vertices.len()),
        });
    }
    Ok((vertices, markers, base.unwrap_or(1)))
}

/// Triangles of an `.ele` file, 0-based using the node index `base`.
pub fn read_ele_file(path: &Path, base: usize, n_vertices: usize) -> Result<Vec<[usize; 3]>, TriangleFileError> {
    let content = std::fs::read_to_string(path).map_err(|e| TriangleFileError::io(path, e))?;
    let mut it = records(&content);
    let (line, header) = it
        .next()
        .ok_or_else(|| TriangleFileError::parse(path, 1, "empty element file"))?;
    let n: usize = field(path, line, &header, 0, "element count")?;
    let per_element: usize = field(path, line, &header, 1, "nodes per element")?;
    if per_element < 3 {
        return Err(TriangleFileError::parse(path, line, format!("{per_element} nodes per element")));
    }

    let mut elements = Vec::new();
    for (line, fields) in it.by_ref().take(n) {
        let mut tri = [0usize; 3];
        for (j, slot) in tri.iter_mut().enumerate() {
            *slot = node_ref(path, line, &fields, 1 + j, base, n_vertices)?;
        }
        elements.push(tri);
    }
    if elements.len() != n {
        return Err(TriangleFileError::Inconsistent {
            path: path.to_path_buf(),
            message: format!("header announces {n} elements, found {}", elements.len()),
        });
    }
    Ok(elements)
}

/// Edges of an `.edge` file: sorted 0-based pair and marker (0 when absent).
pub fn read_edge_file(
    path: &Path,
    base: usize,
    n_vertices: usize,
) -> Result<Vec<((usize, usize), u32)>, TriangleFileError> {
    let content = std::fs::read_to_string(path).map_err(|e| TriangleFileError::io(path, e))?;
    let mut it = records(&content);
    let (line, header) = it
        .next()
        .ok_or_else(|| TriangleFileError::parse(path, 1, "empty edge file"))?;
    let n: usize = field(path, line, &header, 0, "edge count")?;
    let has_marker = field::<usize>(path, line, &header, 1, "marker flag").unwrap_or(0) > 0;

    let mut edges = Vec::new();
    for (line, fields) in it.by_ref().take(n) {
        let a = node_ref(path, line, &fields, 1, base, n_vertices)?;
        let b = node_ref(path, line, &fields, 2, base, n_vertices)?;
        let marker = if has_marker {
            field(path, line, &fields, 3, "boundary marker")?
        } else {
            0
        };
        edges.push((if a < b { (a, b) } else { (b, a) }, marker));
    }
    if edges.len() != n {
        return Err(TriangleFileError::Inconsistent {
            path: path.to_path_buf(),
            message: format!("header announces {n} edges, found {}", edges.len()),
        });
    }
    Ok(edges)
}

fn node_ref(
    path: &Path,
    line: usize,
    fields: &[&str],
    k: usize,
    base: usize,
    n_vertices: usize,
) -> Result<usize, TriangleFileError> {
    let id: usize = field(path, line, fields, k, "node reference")?;
    match id.checked_sub(base) {
        Some(v) if v < n_vertices => Ok(v),
        _ => Err(TriangleFileError::Inconsistent {
            path: path.to_path_buf(),
            message: format!("line {line}: node {id} does not exist"),
        }),
    }
}

/// Read a mesh from `<base>.node`, `<base>.ele` and, if present, `<base>.edge`.
///
/// Clockwise triangles are reoriented. Edge markers come from the `.edge`
/// file; without one, boundary edges inherit a shared vertex marker.
pub fn read_triangle_mesh(base: &Path) -> Result<Mesh2D, TriangleFileError> {
    let files = TriangleFiles::new(base);
    let (vertices, markers, index_base) = read_node_file(&files.node)?;
    let mut elements = read_ele_file(&files.ele, index_base, vertices.len())?;

    for elem in &mut elements {
        let [a, b, c] = *elem;
        if crate::mesh::triangle_signed_area(vertices[a], vertices[b], vertices[c]) < 0.0 {
            elem.swap(1, 2);
        }
    }

    let mut edge_tags: HashMap<(usize, usize), BoundaryTag> = HashMap::new();
    let from_edge_file = files.edge.exists();
    if from_edge_file {
        for (key, marker) in read_edge_file(&files.edge, index_base, vertices.len())? {
            if marker != 0 {
                edge_tags.insert(key, BoundaryTag::from_marker(marker));
            }
        }
    }

    let vertex_tags: Vec<BoundaryTag> = markers.iter().map(|&m| BoundaryTag::from_marker(m)).collect();
    let mut mesh = Mesh2D::from_parts(vertices, vertex_tags, elements, &edge_tags);

    if !from_edge_file {
        let tags = mesh.vertex_tags.clone();
        for edge in mesh.edges.iter_mut().filter(|e| e.is_boundary()) {
            let (a, b) = edge.vertices;
            if tags[a] == tags[b] {
                edge.tag = tags[a];
            }
        }
    }

    tracing::debug!(
        path = %files.node.display(),
        nodes = mesh.n_vertices,
        elements = mesh.n_elements,
        edges = mesh.n_edges,
        "read triangle mesh"
    );
    Ok(mesh)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Bounds2D;
    use std::fs;
    use tempfile::tempdir;

    #[test]
    fn test_roundtrip_is_exact() {
        let dir = tempdir().unwrap();
        let base = dir.path().join("mesh");
        let bounds = Bounds2D::new(0.1, 1.0 / 3.0 + 10.0, -7.25, 2.0_f64.sqrt());
        let mesh = Mesh2D::uniform_rectangle(bounds, 5, 3);

        let files = write_triangle_mesh(&base, &mesh).unwrap();
        assert!(files.node.ends_with("mesh.node"));

        let back = read_triangle_mesh(&base).unwrap();
        assert_eq!(back.vertices, mesh.vertices);
        assert_eq!(back.elements, mesh.elements);
        assert_eq!(back.vertex_tags, mesh.vertex_tags);
        assert_eq!(back.edges, mesh.edges);
    }

    #[test]
    fn test_file_headers() {
        let dir = tempdir().unwrap();
        let base = dir.path().join("grid.v1");
        let mesh = Mesh2D::uniform_rectangle(Bounds2D::new(0.0, 1.0, 0.0, 1.0), 1, 1);
        let files = write_triangle_mesh(&base, &mesh).unwrap();
        assert!(files.node.ends_with("grid.v1.node"));

        let node = fs::read_to_string(&files.node).unwrap();
        assert_eq!(node.lines().next(), Some("4 2 0 1"));
        assert_eq!(node.lines().nth(1), Some("1 0 0 1"));
        let ele = fs::read_to_string(&files.ele).unwrap();
        assert_eq!(ele.lines().next(), Some("2 3 0"));
        assert_eq!(ele.lines().nth(1), Some("1 1 2 4"));
        let edge = fs::read_to_string(&files.edge).unwrap();
        assert_eq!(edge.lines().next(), Some("5 1"));
    }

    #[test]
    fn test_zero_based_and_clockwise_input() {
        let dir = tempdir().unwrap();
        let base = dir.path().join("zero");
        fs::write(
            with_suffix(&base, "node"),
            "# comment\n4 2 0 1\n0 0 0 1\n1 1 0 4\n2 1 1 3\n3 0 1 2\n",
        )
        .unwrap();
        fs::write(with_suffix(&base, "ele"), "2 3 0\n0 0 2 1\n1 0 3 2\n").unwrap();

        let mesh = read_triangle_mesh(&base).unwrap();
        assert_eq!(mesh.n_vertices, 4);
        for k in 0..mesh.n_elements {
            assert!(mesh.signed_area(k) > 0.0);
        }
        // no edge file: markers inherited from vertices where both ends agree
        assert_eq!(mesh.edges_with_tag(BoundaryTag::South).count(), 0);
        assert_eq!(mesh.n_boundary_edges, 4);
    }

    #[test]
    fn test_bad_reference() {
        let dir = tempdir().unwrap();
        let base = dir.path().join("bad");
        fs::write(with_suffix(&base, "node"), "3 2 0 1\n1 0 0 0\n2 1 0 0\n3 0 1 0\n").unwrap();
        fs::write(with_suffix(&base, "ele"), "1 3 0\n1 1 2 9\n").unwrap();
        assert!(matches!(
            read_triangle_mesh(&base),
            Err(TriangleFileError::Inconsistent { .. })
        ));
    }

    #[test]
    fn test_header_count_beyond_file() {
        let dir = tempdir().unwrap();
        let base = dir.path().join("short");
        fs::write(with_suffix(&base, "node"), "999999999999999999 2 0 1\n1 0 0 0\n").unwrap();
        fs::write(with_suffix(&base, "ele"), "0 3 0\n").unwrap();
        match read_triangle_mesh(&base) {
            Err(TriangleFileError::Inconsistent { message, .. }) => {
                assert!(message.contains("found 1"), "message: {message}");
            }
            other => panic!("unexpected result {other:?}"),
        }

        let edge = dir.path().join("short.edge");
        fs::write(&edge, "999999999999999999 1\n1 1 2 1\n").unwrap();
        assert!(matches!(
            read_edge_file(&edge, 1, 3),
            Err(TriangleFileError::Inconsistent { .. })
        ));
    }

    #[test]
    fn test_value_file_roundtrip() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("mesh.bot");
        let values = vec![-12.5, 0.1 + 0.2, 1e-300, 42.0];
        write_value_file(&path, &values).unwrap();
        assert_eq!(read_value_file(&path).unwrap(), values);
    }

    #[test]
    fn test_unwritable_path() {
        let dir = tempdir().unwrap();
        let base = dir.path().join("missing").join("mesh");
        let mesh = Mesh2D::uniform_rectangle(Bounds2D::new(0.0, 1.0, 0.0, 1.0), 1, 1);
        assert!(matches!(
            write_triangle_mesh(&base, &mesh),
            Err(TriangleFileError::IoError { .. })
        ));
    }
}
