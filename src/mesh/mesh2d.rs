//! 2D triangular mesh representation.
//!
//! The mesh stores:
//! - Vertex coordinates and per-vertex boundary tags
//! - Element-vertex connectivity (counter-clockwise ordering)
//! - Edge list with element adjacency and boundary markers
//!
//! Face convention (counter-clockwise around element):
//! - Face 0: from vertex 0 to vertex 1
//! - Face 1: from vertex 1 to vertex 2
//! - Face 2: from vertex 2 to vertex 0
//!
//! Indices are 0-based in memory. Edges are numbered in order of first
//! appearance when walking elements and faces, so numbering depends only on
//! the element list.

use std::collections::{BTreeMap, HashMap};

use super::boundary_tags::BoundaryTag;
use crate::types::Bounds2D;

/// Reference to an element and one of its faces.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ElementFace {
    /// Element index
    pub element: usize,
    /// Face index (0-2)
    pub face: usize,
}

impl ElementFace {
    pub fn new(element: usize, face: usize) -> Self {
        Self { element, face }
    }
}

/// Information about an edge in the mesh.
#[derive(Clone, Debug, PartialEq)]
pub struct Edge {
    /// Vertex indices (v0, v1) with v0 < v1 for consistent ordering
    pub vertices: (usize, usize),
    /// Left element-face (always present)
    pub left: ElementFace,
    /// Right element-face (None on the domain boundary)
    pub right: Option<ElementFace>,
    /// Side, breakwater or interior
    pub tag: BoundaryTag,
}

impl Edge {
    /// Check if this is a domain boundary edge.
    pub fn is_boundary(&self) -> bool {
        self.right.is_none()
    }

    /// Check if this is an interior edge.
    pub fn is_interior(&self) -> bool {
        self.right.is_some()
    }
}

/// 2D mesh of triangular elements.
#[derive(Clone, Debug, PartialEq)]
pub struct Mesh2D {
    /// Vertex coordinates: vertices[i] = (x, y)
    pub vertices: Vec<(f64, f64)>,

    /// Boundary tag of each vertex
    pub vertex_tags: Vec<BoundaryTag>,

    /// Element-vertex connectivity, counter-clockwise
    pub elements: Vec<[usize; 3]>,

    /// Edge list with connectivity information
    pub edges: Vec<Edge>,

    /// Element-to-edge mapping: element_edges[k][f] = edge index for face f of element k
    pub element_edges: Vec<[usize; 3]>,

    /// Number of elements
    pub n_elements: usize,

    /// Number of edges
    pub n_edges: usize,

    /// Number of domain boundary edges
    pub n_boundary_edges: usize,

    /// Number of vertices
    pub n_vertices: usize,
}

impl Mesh2D {
    /// Assemble a mesh from vertices, tags and counter-clockwise triangles.
    ///
    /// `edge_tags` maps sorted vertex pairs to markers; edges not listed are
    /// tagged [`BoundaryTag::Interior`].
    pub fn from_parts(
        vertices: Vec<(f64, f64)>,
        vertex_tags: Vec<BoundaryTag>,
        elements: Vec<[usize; 3]>,
        edge_tags: &HashMap<(usize, usize), BoundaryTag>,
    ) -> Self {
        let n_vertices = vertices.len();
        let n_elements = elements.len();

        let mut edge_index: HashMap<(usize, usize), usize> = HashMap::new();
        let mut edges: Vec<Edge> = Vec::new();
        let mut element_edges = vec![[0usize; 3]; n_elements];

        for (k, elem) in elements.iter().enumerate() {
            for face in 0..3 {
                let (v0, v1) = (elem[face], elem[(face + 1) % 3]);
                let key = sorted_pair(v0, v1);
                let ef = ElementFace::new(k, face);
                let idx = match edge_index.get(&key) {
                    Some(&idx) => {
                        edges[idx].right = Some(ef);
                        idx
                    }
                    None => {
                        let idx = edges.len();
                        edge_index.insert(key, idx);
                        edges.push(Edge {
                            vertices: key,
                            left: ef,
                            right: None,
                            tag: edge_tags.get(&key).copied().unwrap_or_default(),
                        });
                        idx
                    }
                };
                element_edges[k][face] = idx;
            }
        }

        let n_edges = edges.len();
        let n_boundary_edges = edges.iter().filter(|e| e.is_boundary()).count();

        Self {
            vertices,
            vertex_tags,
            elements,
            edges,
            element_edges,
            n_elements,
            n_edges,
            n_boundary_edges,
            n_vertices,
        }
    }

    /// Uniform triangulation of a rectangle, each cell split along its
    /// south-west to north-east diagonal, tagged by side.
    pub fn uniform_rectangle(bounds: Bounds2D, nx: usize, ny: usize) -> Self {
        assert!(
            nx > 0 && ny > 0,
            "Need at least one element in each direction"
        );

        let mut vertices = Vec::with_capacity((nx + 1) * (ny + 1));
        for j in 0..=ny {
            for i in 0..=nx {
                let x = if i == nx {
                    bounds.x_max
                } else {
                    bounds.x_min + i as f64 * bounds.width() / nx as f64
                };
                let y = if j == ny {
                    bounds.y_max
                } else {
                    bounds.y_min + j as f64 * bounds.height() / ny as f64
                };
                vertices.push((x, y));
            }
        }

        let mut elements = Vec::with_capacity(2 * nx * ny);
        for j in 0..ny {
            for i in 0..nx {
                let v0 = j * (nx + 1) + i;
                let v1 = v0 + 1;
                let v2 = v1 + (nx + 1);
                let v3 = v0 + (nx + 1);
                elements.push([v0, v1, v2]);
                elements.push([v0, v2, v3]);
            }
        }

        let vertex_tags = vertices
            .iter()
            .map(|&(x, y)| BoundaryTag::for_vertex(&bounds, x, y, 0.0))
            .collect();
        let mut mesh = Self::from_parts(vertices, vertex_tags, elements, &HashMap::new());
        mesh.tag_boundary_sides(&bounds, 0.0);
        mesh
    }

    /// Tag every boundary edge lying on a side of `bounds` with that side.
    pub fn tag_boundary_sides(&mut self, bounds: &Bounds2D, tol: f64) {
        for edge in self.edges.iter_mut().filter(|e| e.right.is_none()) {
            let a = self.vertices[edge.vertices.0];
            let b = self.vertices[edge.vertices.1];
            if let Some(tag) = BoundaryTag::for_edge(bounds, a, b, tol) {
                edge.tag = tag;
            }
        }
    }

    /// Get vertex coordinates for element k.
    pub fn element_vertices(&self, k: usize) -> [(f64, f64); 3] {
        let [a, b, c] = self.elements[k];
        [self.vertices[a], self.vertices[b], self.vertices[c]]
    }

    /// Signed area of element k (positive when counter-clockwise).
    pub fn signed_area(&self, k: usize) -> f64 {
        let [p0, p1, p2] = self.element_vertices(k);
        triangle_signed_area(p0, p1, p2)
    }

    /// Length of edge e.
    pub fn edge_length(&self, e: usize) -> f64 {
        let (a, b) = self.edges[e].vertices;
        let (pa, pb) = (self.vertices[a], self.vertices[b]);
        (pb.0 - pa.0).hypot(pb.1 - pa.1)
    }

    /// Shortest edge length.
    pub fn h_min(&self) -> f64 {
        (0..self.n_edges)
            .map(|e| self.edge_length(e))
            .fold(f64::INFINITY, f64::min)
    }

    /// Longest edge length.
    pub fn h_max(&self) -> f64 {
        (0..self.n_edges)
            .map(|e| self.edge_length(e))
            .fold(0.0, f64::max)
    }

    /// Edges carrying a given tag.
    pub fn edges_with_tag(&self, tag: BoundaryTag) -> impl Iterator<Item = &Edge> {
        self.edges.iter().filter(move |e| e.tag == tag)
    }

    /// Number of edges per non-zero marker.
    pub fn marker_counts(&self) -> BTreeMap<u32, usize> {
        let mut counts = BTreeMap::new();
        for edge in self.edges.iter().filter(|e| !e.tag.is_interior()) {
            *counts.entry(edge.tag.marker()).or_insert(0) += 1;
        }
        counts
    }

    /// Edges that carry a non-interior marker, in edge order.
    pub fn marked_edges(&self) -> impl Iterator<Item = &Edge> {
        self.edges.iter().filter(|e| !e.tag.is_interior())
    }

    /// Bounding box of all vertices.
    pub fn bounds(&self) -> Bounds2D {
        let mut b = Bounds2D::from_extent(
            f64::INFINITY,
            f64::NEG_INFINITY,
            f64::INFINITY,
            f64::NEG_INFINITY,
        );
        for &(x, y) in &self.vertices {
            b.x_min = b.x_min.min(x);
            b.x_max = b.x_max.max(x);
            b.y_min = b.y_min.min(y);
            b.y_max = b.y_max.max(y);
        }
        b
    }

    /// Mean length of the edges incident to each vertex.
    pub fn local_edge_lengths(&self) -> Vec<f64> {
        let mut sum = vec![0.0; self.n_vertices];
        let mut count = vec![0usize; self.n_vertices];
        for e in 0..self.n_edges {
            let len = self.edge_length(e);
            let (a, b) = self.edges[e].vertices;
            sum[a] += len;
            sum[b] += len;
            count[a] += 1;
            count[b] += 1;
        }
        sum.iter()
            .zip(&count)
            .map(|(s, &c)| if c > 0 { s / c as f64 } else { 0.0 })
            .collect()
    }
}

#[inline]
pub(crate) fn sorted_pair(a: usize, b: usize) -> (usize, usize) {
    if a < b {
        (a, b)
    } else {
        (b, a)
    }
}

/// Twice-halved cross product: positive for counter-clockwise triangles.
#[inline]
pub(crate) fn triangle_signed_area(p0: (f64, f64), p1: (f64, f64), p2: (f64, f64)) -> f64 {
    0.5 * ((p1.0 - p0.0) * (p2.1 - p0.1) - (p2.0 - p0.0) * (p1.1 - p0.1))
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn unit() -> Bounds2D {
        Bounds2D::new(0.0, 1.0, 0.0, 1.0)
    }

    #[test]
    fn test_uniform_rectangle_dimensions() {
        let mesh = Mesh2D::uniform_rectangle(unit(), 4, 3);
        assert_eq!(mesh.n_vertices, 20);
        assert_eq!(mesh.n_elements, 24);
        // V - E + F = 1 for a disc
        assert_eq!(mesh.n_vertices + mesh.n_elements - mesh.n_edges, 1);
        assert_eq!(mesh.n_boundary_edges, 2 * (4 + 3));
    }

    #[test]
    fn test_elements_counter_clockwise() {
        let mesh = Mesh2D::uniform_rectangle(unit(), 3, 3);
        for k in 0..mesh.n_elements {
            assert!(mesh.signed_area(k) > 0.0);
        }
        let total: f64 = (0..mesh.n_elements).map(|k| mesh.signed_area(k)).sum();
        assert_relative_eq!(total, 1.0, epsilon = 1e-12);
    }

    #[test]
    fn test_side_markers() {
        let mesh = Mesh2D::uniform_rectangle(Bounds2D::new(-2.0, 2.0, -1.0, 1.0), 4, 2);
        let counts = mesh.marker_counts();
        assert_eq!(counts.get(&1), Some(&2));
        assert_eq!(counts.get(&2), Some(&4));
        assert_eq!(counts.get(&3), Some(&2));
        assert_eq!(counts.get(&4), Some(&4));
        assert_eq!(counts.len(), 4);

        for edge in mesh.edges_with_tag(BoundaryTag::West) {
            assert_eq!(mesh.vertices[edge.vertices.0].0, -2.0);
            assert_eq!(mesh.vertices[edge.vertices.1].0, -2.0);
        }
    }

    #[test]
    fn test_neighbor_connectivity() {
        let mesh = Mesh2D::uniform_rectangle(unit(), 1, 1);
        // Shared diagonal
        let diagonal = mesh.edges.iter().find(|e| e.is_interior()).unwrap();
        assert_eq!(diagonal.vertices, (0, 3));
        assert_eq!(diagonal.left.element, 0);
        assert_eq!(diagonal.right.map(|f| f.element), Some(1));
        assert_eq!(mesh.element_edges[0][2], mesh.element_edges[1][0]);
    }

    #[test]
    fn test_h_min_h_max() {
        let mesh = Mesh2D::uniform_rectangle(Bounds2D::new(0.0, 4.0, 0.0, 3.0), 4, 1);
        assert_relative_eq!(mesh.h_min(), 1.0);
        assert_relative_eq!(mesh.h_max(), 10.0_f64.sqrt());
    }

    #[test]
    fn test_vertex_tags() {
        let mesh = Mesh2D::uniform_rectangle(unit(), 2, 2);
        assert_eq!(mesh.vertex_tags[0], BoundaryTag::West);
        assert_eq!(mesh.vertex_tags[2], BoundaryTag::South);
        assert_eq!(mesh.vertex_tags[4], BoundaryTag::Interior);
        assert_eq!(mesh.vertex_tags[8], BoundaryTag::East);
        assert_eq!(mesh.vertex_tags[6], BoundaryTag::North);
    }
}
