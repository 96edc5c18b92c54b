//! Triangulation engines.
//!
//! An engine receives the domain geometry and a size query and returns raw
//! node, triangle and constrained-edge arrays. Everything else (orientation,
//! tagging, numbering) happens in the mesh builder.
//!
//! - [`DelaunayEngine`]: in-process constrained Delaunay triangulation
//! - [`GmshEngine`]: the external `gmsh` executable

mod delaunay;
mod gmsh_cli;

pub use delaunay::DelaunayEngine;
pub use gmsh_cli::GmshEngine;

use geo::{Coord, Intersects, Line};
use thiserror::Error;

use crate::io::gmsh::GmshError;
use crate::mesh::BoundaryTag;
use crate::sizing::SizeFunction;
use crate::types::{Bounds2D, Side, SideBoundaries};

/// Error type for meshing engines.
#[derive(Debug, Error)]
pub enum EngineError {
    /// Geometry rejected before meshing.
    #[error("invalid geometry: {0}")]
    InvalidGeometry(String),

    /// The engine itself failed; the diagnostic is kept verbatim.
    #[error("{0}")]
    Rejected(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Engine output could not be read back.
    #[error("unreadable engine output: {0}")]
    Output(#[from] GmshError),
}

// =============================================================================
// Request
// =============================================================================

/// A polyline the mesh must follow edge by edge.
#[derive(Clone, Debug, PartialEq)]
pub struct ConstraintCurve {
    pub tag: BoundaryTag,
    pub points: Vec<(f64, f64)>,
}

impl ConstraintCurve {
    pub fn new(tag: BoundaryTag, points: Vec<(f64, f64)>) -> Self {
        Self { tag, points }
    }

    pub fn segments(&self) -> impl Iterator<Item = ((f64, f64), (f64, f64))> + '_ {
        self.points.windows(2).map(|w| (w[0], w[1]))
    }
}

/// Geometry handed to an engine.
///
/// The outer boundary is the rectangle `bounds`, walked clockwise from the
/// south-west corner: West (SW→NW), North (NW→NE), East (NE→SE), South (SE→SW).
#[derive(Clone, Debug, PartialEq)]
pub struct MeshRequest {
    pub bounds: Bounds2D,
    pub min_size: f64,
    pub max_size: f64,
    /// Embedded curves (breakwaters), each with its own tag.
    pub curves: Vec<ConstraintCurve>,
}

impl MeshRequest {
    pub fn new(bounds: Bounds2D, min_size: f64, max_size: f64) -> Self {
        Self {
            bounds,
            min_size,
            max_size,
            curves: Vec::new(),
        }
    }

    pub fn with_curve(mut self, tag: BoundaryTag, points: Vec<(f64, f64)>) -> Self {
        self.curves.push(ConstraintCurve::new(tag, points));
        self
    }

    /// Corners in boundary order: SW, NW, NE, SE.
    pub fn corners(&self) -> [(f64, f64); 4] {
        let b = &self.bounds;
        [
            (b.x_min, b.y_min),
            (b.x_min, b.y_max),
            (b.x_max, b.y_max),
            (b.x_max, b.y_min),
        ]
    }

    /// Start and end point of each side, clockwise.
    pub fn boundary(&self) -> SideBoundaries<[(f64, f64); 2]> {
        let c = self.corners();
        SideBoundaries::from_fn(|side| {
            let i = side.index();
            [c[i], c[(i + 1) % 4]]
        })
    }

    /// Size query clamped to the request limits; non-finite sizes map to `max_size`.
    pub fn clamped_size(&self, size: &dyn SizeFunction, x: f64, y: f64) -> f64 {
        let s = size.size_at(x, y);
        if s.is_finite() {
            s.clamp(self.min_size, self.max_size)
        } else {
            self.max_size
        }
    }

    /// Geometry checks shared by all engines.
    pub fn validate(&self) -> Result<(), EngineError> {
        let b = &self.bounds;
        if b.is_degenerate() {
            return Err(EngineError::InvalidGeometry(format!(
                "domain [{}, {}] x [{}, {}] has no area",
                b.x_min, b.x_max, b.y_min, b.y_max
            )));
        }
        if !(self.min_size > 0.0 && self.min_size.is_finite()) || !(self.max_size >= self.min_size) {
            return Err(EngineError::InvalidGeometry(format!(
                "size limits [{}, {}] are not usable",
                self.min_size, self.max_size
            )));
        }

        let tol = 1e-9 * b.diagonal();
        for curve in &self.curves {
            if curve.points.len() < 2 {
                return Err(EngineError::InvalidGeometry(format!(
                    "{} curve has {} point(s)",
                    curve.tag,
                    curve.points.len()
                )));
            }
            for &(x, y) in &curve.points {
                if !(x.is_finite() && y.is_finite()) {
                    return Err(EngineError::InvalidGeometry(format!(
                        "{} curve has a non-finite point ({x}, {y})",
                        curve.tag
                    )));
                }
                if !b.contains_with_tolerance(x, y, tol) {
                    return Err(EngineError::InvalidGeometry(format!(
                        "{} curve point ({x}, {y}) lies outside the domain",
                        curve.tag
                    )));
                }
            }
            if self_intersects(curve) {
                return Err(EngineError::InvalidGeometry(format!(
                    "{} curve intersects itself",
                    curve.tag
                )));
            }
        }

        for (i, a) in self.curves.iter().enumerate() {
            for other in &self.curves[i + 1..] {
                if curves_intersect(a, other) {
                    return Err(EngineError::InvalidGeometry(format!(
                        "{} curve intersects {} curve",
                        a.tag, other.tag
                    )));
                }
            }
        }
        Ok(())
    }
}

fn line(a: (f64, f64), b: (f64, f64)) -> Line<f64> {
    Line::new(Coord { x: a.0, y: a.1 }, Coord { x: b.0, y: b.1 })
}

/// Non-adjacent segments touching, or adjacent segments folding back.
fn self_intersects(curve: &ConstraintCurve) -> bool {
    let segments: Vec<Line<f64>> = curve.segments().map(|(a, b)| line(a, b)).collect();
    let n = segments.len();
    let closed = n > 2 && curve.points.first() == curve.points.last();
    for i in 0..n {
        for j in i + 1..n {
            let adjacent = j == i + 1 || (closed && i == 0 && j == n - 1);
            if adjacent {
                if folds_back(&segments[i], &segments[j]) {
                    return true;
                }
            } else if segments[i].intersects(&segments[j]) {
                return true;
            }
        }
    }
    false
}

/// Consecutive collinear segments that overlap.
fn folds_back(a: &Line<f64>, b: &Line<f64>) -> bool {
    let (da, db) = (a.delta(), b.delta());
    let cross = da.x * db.y - da.y * db.x;
    let dot = da.x * db.x + da.y * db.y;
    cross == 0.0 && dot < 0.0
}

fn curves_intersect(a: &ConstraintCurve, b: &ConstraintCurve) -> bool {
    a.segments().any(|(p, q)| {
        let s = line(p, q);
        b.segments().any(|(r, t)| s.intersects(&line(r, t)))
    })
}

// =============================================================================
// Output
// =============================================================================

/// Raw engine output, 0-based.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct EngineMesh {
    pub vertices: Vec<(f64, f64)>,
    /// Triangles in any orientation.
    pub triangles: Vec<[usize; 3]>,
    /// Edges the engine reports with a marker (constraint and boundary edges).
    pub edges: Vec<([usize; 2], u32)>,
}

// =============================================================================
// Engine trait
// =============================================================================

/// A triangulation backend.
pub trait MeshingEngine {
    /// Short name used in diagnostics.
    fn name(&self) -> &str;

    /// Triangulate `request`, with edge lengths following `size`.
    fn triangulate(
        &self,
        request: &MeshRequest,
        size: &dyn SizeFunction,
    ) -> Result<EngineMesh, EngineError>;
}

/// Side owning the marker on the boundary, for engines that tag by side.
pub(crate) fn side_marker(side: Side) -> u32 {
    BoundaryTag::from_side(side).marker()
}
