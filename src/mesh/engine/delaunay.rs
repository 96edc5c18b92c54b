//! In-process constrained Delaunay engine.
//!
//! 1. Seed points from a quadtree over the domain: a cell splits while it is
//!    larger than the size at its centre. Leaf corners are the seeds, snapped
//!    to an integer lattice so neighbouring leaves share corners exactly.
//! 2. Resample every constraint curve at the local size.
//! 3. Drop seeds closer than half the local size to a constraint segment.
//! 4. Triangulate with `spade`, constraint segments as fixed edges.
//!
//! Output depends only on the request and the size function.

use std::collections::{BTreeSet, HashMap};

use rstar::primitives::Line;
use rstar::{PointDistance, RTree};
use spade::{ConstrainedDelaunayTriangulation, Point2, Triangulation};

use super::{EngineError, EngineMesh, MeshRequest, MeshingEngine};
use crate::sizing::SizeFunction;

/// Default quadtree refinement limit below the root cells.
pub const DEFAULT_MAX_DEPTH: u32 = 16;

/// Constrained Delaunay triangulation of size-driven quadtree seeds.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct DelaunayEngine {
    max_depth: u32,
}

impl Default for DelaunayEngine {
    fn default() -> Self {
        Self {
            max_depth: DEFAULT_MAX_DEPTH,
        }
    }
}

impl DelaunayEngine {
    pub fn new() -> Self {
        Self::default()
    }

    /// Limit quadtree refinement (1 to 24 levels).
    pub fn with_max_depth(mut self, max_depth: u32) -> Self {
        self.max_depth = max_depth.clamp(1, 24);
        self
    }

    pub fn max_depth(&self) -> u32 {
        self.max_depth
    }
}

impl MeshingEngine for DelaunayEngine {
    fn name(&self) -> &str {
        "delaunay"
    }

    fn triangulate(
        &self,
        request: &MeshRequest,
        size: &dyn SizeFunction,
    ) -> Result<EngineMesh, EngineError> {
        request.validate()?;

        let lattice = Lattice::new(request, self.max_depth);
        let seeds = lattice.seeds(request, size);
        let curves: Vec<(u32, Vec<(f64, f64)>)> = request
            .curves
            .iter()
            .map(|c| (c.tag.marker(), resample(&c.points, request, size)))
            .collect();
        let seeds = remove_near_constraints(seeds, &curves, request, size);

        tracing::debug!(
            seeds = seeds.len(),
            constraint_points = curves.iter().map(|(_, p)| p.len()).sum::<usize>(),
            "triangulating"
        );

        let mut cdt = ConstrainedDelaunayTriangulation::<Point2<f64>>::new();
        for &(x, y) in &seeds {
            cdt.insert(Point2::new(x, y))
                .map_err(|e| EngineError::Rejected(format!("cannot insert ({x}, {y}): {e:?}")))?;
        }

        let mut vertex_marker: HashMap<usize, u32> = HashMap::new();
        for (marker, points) in &curves {
            let mut handles = Vec::with_capacity(points.len());
            for &(x, y) in points {
                let handle = cdt.insert(Point2::new(x, y)).map_err(|e| {
                    EngineError::Rejected(format!("cannot insert ({x}, {y}): {e:?}"))
                })?;
                vertex_marker.insert(handle.index(), *marker);
                handles.push(handle);
            }
            for pair in handles.windows(2) {
                let (from, to) = (pair[0], pair[1]);
                if from == to {
                    continue;
                }
                if !cdt.can_add_constraint(from, to) {
                    return Err(EngineError::Rejected(format!(
                        "constraint segment of marker {marker} crosses another constraint"
                    )));
                }
                cdt.add_constraint(from, to);
            }
        }

        let vertices: Vec<(f64, f64)> = cdt
            .vertices()
            .map(|v| {
                let p = v.position();
                (p.x, p.y)
            })
            .collect();
        let triangles: Vec<[usize; 3]> = cdt
            .inner_faces()
            .map(|face| face.vertices().map(|v| v.fix().index()))
            .collect();
        let edges: Vec<([usize; 2], u32)> = cdt
            .undirected_edges()
            .filter(|edge| cdt.is_constraint_edge(edge.fix()))
            .filter_map(|edge| {
                let [a, b] = edge.vertices().map(|v| v.fix().index());
                let marker = vertex_marker.get(&a).or_else(|| vertex_marker.get(&b))?;
                Some(([a, b], *marker))
            })
            .collect();

        if triangles.is_empty() {
            return Err(EngineError::Rejected(format!(
                "triangulation of {} points produced no triangles",
                vertices.len()
            )));
        }

        Ok(EngineMesh {
            vertices,
            triangles,
            edges,
        })
    }
}

/// Integer lattice at the finest quadtree level.
///
/// Root cells are `scale` lattice units wide in each direction.
struct Lattice {
    x_min: f64,
    y_min: f64,
    x_max: f64,
    y_max: f64,
    nx: u64,
    ny: u64,
    scale: u64,
    max_depth: u32,
    /// Root cell size
    cell_w: f64,
    cell_h: f64,
}

impl Lattice {
    fn new(request: &MeshRequest, max_depth: u32) -> Self {
        let b = &request.bounds;
        let nx = (b.width() / request.max_size).ceil().max(1.0) as u64;
        let ny = (b.height() / request.max_size).ceil().max(1.0) as u64;
        let scale = 1u64 << max_depth;
        Self {
            x_min: b.x_min,
            y_min: b.y_min,
            x_max: b.x_max,
            y_max: b.y_max,
            nx,
            ny,
            scale,
            max_depth,
            cell_w: b.width() / nx as f64,
            cell_h: b.height() / ny as f64,
        }
    }

    /// Fraction of a root cell covered by `units` lattice units (exact for powers of two).
    fn fraction(&self, units: u64) -> f64 {
        units as f64 / self.scale as f64
    }

    fn x(&self, i: u64) -> f64 {
        if i == self.nx * self.scale {
            self.x_max
        } else {
            self.x_min + self.fraction(i) * self.cell_w
        }
    }

    fn y(&self, j: u64) -> f64 {
        if j == self.ny * self.scale {
            self.y_max
        } else {
            self.y_min + self.fraction(j) * self.cell_h
        }
    }

    /// Leaf corners of the size-driven quadtree, ordered by lattice position.
    fn seeds(&self, request: &MeshRequest, size: &dyn SizeFunction) -> Vec<(f64, f64)> {
        let mut corners: BTreeSet<(u64, u64)> = BTreeSet::new();
        let mut stack: Vec<(u64, u64, u64, u32)> = Vec::new();
        for j in 0..self.ny {
            for i in 0..self.nx {
                stack.push((i * self.scale, j * self.scale, self.scale, 0));
            }
        }

        while let Some((i, j, span, depth)) = stack.pop() {
            let w = self.fraction(span) * self.cell_w;
            let h = self.fraction(span) * self.cell_h;
            let half = span / 2;
            let cx = self.x(i) + 0.5 * w;
            let cy = self.y(j) + 0.5 * h;

            if depth < self.max_depth && w.max(h) > request.clamped_size(size, cx, cy) {
                stack.push((i, j, half, depth + 1));
                stack.push((i + half, j, half, depth + 1));
                stack.push((i, j + half, half, depth + 1));
                stack.push((i + half, j + half, half, depth + 1));
            } else {
                corners.insert((i, j));
                corners.insert((i + span, j));
                corners.insert((i, j + span));
                corners.insert((i + span, j + span));
            }
        }

        corners
            .into_iter()
            .map(|(i, j)| (self.x(i), self.y(j)))
            .collect()
    }
}

/// Points along `points` spaced no wider than the local size.
fn resample(points: &[(f64, f64)], request: &MeshRequest, size: &dyn SizeFunction) -> Vec<(f64, f64)> {
    let mut out: Vec<(f64, f64)> = Vec::new();
    if let Some(&first) = points.first() {
        out.push(first);
    }
    for w in points.windows(2) {
        let (a, b) = (w[0], w[1]);
        let length = (b.0 - a.0).hypot(b.1 - a.1);
        if length == 0.0 {
            continue;
        }
        let mid = (0.5 * (a.0 + b.0), 0.5 * (a.1 + b.1));
        let h = request
            .clamped_size(size, a.0, a.1)
            .min(request.clamped_size(size, mid.0, mid.1))
            .min(request.clamped_size(size, b.0, b.1));
        let n = (length / h).ceil().max(1.0) as usize;
        for k in 1..n {
            let t = k as f64 / n as f64;
            out.push((a.0 + t * (b.0 - a.0), a.1 + t * (b.1 - a.1)));
        }
        out.push(b);
    }
    out
}

/// Remove seeds within half the local size of a constraint; corners stay.
fn remove_near_constraints(
    seeds: Vec<(f64, f64)>,
    curves: &[(u32, Vec<(f64, f64)>)],
    request: &MeshRequest,
    size: &dyn SizeFunction,
) -> Vec<(f64, f64)> {
    let segments: Vec<Line<[f64; 2]>> = curves
        .iter()
        .flat_map(|(_, points)| points.windows(2))
        .map(|w| Line::new([w[0].0, w[0].1], [w[1].0, w[1].1]))
        .collect();
    if segments.is_empty() {
        return seeds;
    }
    let tree = RTree::bulk_load(segments);
    let corners = request.corners();

    seeds
        .into_iter()
        .filter(|&(x, y)| {
            if corners.contains(&(x, y)) {
                return true;
            }
            let query = [x, y];
            let limit = 0.5 * request.clamped_size(size, x, y);
            tree.nearest_neighbor(&query)
                .map_or(true, |s| s.distance_2(&query).sqrt() >= limit)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mesh::BoundaryTag;
    use crate::types::Bounds2D;
    use approx::assert_relative_eq;

    fn area(mesh: &EngineMesh) -> f64 {
        mesh.triangles
            .iter()
            .map(|t| {
                let [a, b, c] = t.map(|v| mesh.vertices[v]);
                0.5 * ((b.0 - a.0) * (c.1 - a.1) - (c.0 - a.0) * (b.1 - a.1)).abs()
            })
            .sum()
    }

    #[test]
    fn test_uniform_size_covers_domain() {
        let request = MeshRequest::new(Bounds2D::new(0.0, 100.0, 0.0, 50.0), 10.0, 10.0);
        let mesh = DelaunayEngine::new()
            .triangulate(&request, &|_: f64, _: f64| 10.0)
            .unwrap();

        // 10 x 5 root cells, no splitting
        assert_eq!(mesh.vertices.len(), 11 * 6);
        assert_eq!(mesh.triangles.len(), 2 * 10 * 5);
        assert_relative_eq!(area(&mesh), 5000.0, epsilon = 1e-6);
        assert!(mesh.edges.is_empty());
    }

    #[test]
    fn test_refines_where_size_is_small() {
        let request = MeshRequest::new(Bounds2D::new(0.0, 100.0, 0.0, 100.0), 1.0, 50.0);
        let size = |x: f64, _: f64| if x < 50.0 { 5.0 } else { 50.0 };
        let mesh = DelaunayEngine::new().triangulate(&request, &size).unwrap();

        let west = mesh.vertices.iter().filter(|p| p.0 < 50.0).count();
        let east = mesh.vertices.iter().filter(|p| p.0 > 50.0).count();
        assert!(west > 10 * east, "west {west}, east {east}");
        assert_relative_eq!(area(&mesh), 10000.0, epsilon = 1e-6);
    }

    #[test]
    fn test_constraint_edges_are_kept() {
        let request = MeshRequest::new(Bounds2D::new(0.0, 100.0, 0.0, 100.0), 2.0, 10.0)
            .with_curve(BoundaryTag::Breakwater(0), vec![(23.0, 41.0), (77.0, 41.0)]);
        let mesh = DelaunayEngine::new()
            .triangulate(&request, &|_: f64, _: f64| 10.0)
            .unwrap();

        assert!(!mesh.edges.is_empty());
        let mut covered = 0.0;
        for ([a, b], marker) in &mesh.edges {
            assert_eq!(*marker, 5);
            let (pa, pb) = (mesh.vertices[*a], mesh.vertices[*b]);
            assert_relative_eq!(pa.1, 41.0, epsilon = 1e-9);
            assert_relative_eq!(pb.1, 41.0, epsilon = 1e-9);
            covered += (pb.0 - pa.0).abs();
        }
        assert_relative_eq!(covered, 54.0, epsilon = 1e-9);
        assert_relative_eq!(area(&mesh), 10000.0, epsilon = 1e-6);
    }

    #[test]
    fn test_deterministic() {
        let request = MeshRequest::new(Bounds2D::new(0.0, 300.0, 0.0, 200.0), 3.0, 40.0)
            .with_curve(BoundaryTag::Breakwater(2), vec![(50.0, 50.0), (120.0, 90.0)]);
        let size = |x: f64, y: f64| 3.0 + 0.1 * ((x - 150.0).hypot(y - 100.0));
        let a = DelaunayEngine::new().triangulate(&request, &size).unwrap();
        let b = DelaunayEngine::new().triangulate(&request, &size).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn test_resample_spacing() {
        let request = MeshRequest::new(Bounds2D::new(0.0, 100.0, 0.0, 100.0), 1.0, 100.0);
        let points = resample(&[(0.0, 0.0), (10.0, 0.0), (10.0, 3.0)], &request, &|_: f64, _: f64| 4.0);
        let expected = [(0.0, 0.0), (10.0 / 3.0, 0.0), (20.0 / 3.0, 0.0), (10.0, 0.0), (10.0, 3.0)];
        assert_eq!(points.len(), expected.len());
        for (p, e) in points.iter().zip(&expected) {
            assert_relative_eq!(p.0, e.0, epsilon = 1e-12);
            assert_relative_eq!(p.1, e.1, epsilon = 1e-12);
        }
    }

    #[test]
    fn test_rejects_invalid_geometry() {
        let request = MeshRequest::new(Bounds2D::from_extent(0.0, 10.0, 5.0, 5.0), 1.0, 2.0);
        let err = DelaunayEngine::new()
            .triangulate(&request, &|_: f64, _: f64| 1.0)
            .unwrap_err();
        assert!(matches!(err, EngineError::InvalidGeometry(_)));
    }
}
