//! Ordered point sequences (shorelines, breakwater medial lines).

use geo::{Coord, LineString, Simplify};

/// An ordered sequence of (x, y) points.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Polyline {
    /// Vertex coordinates in order
    pub points: Vec<(f64, f64)>,
}

impl Polyline {
    pub fn new(points: Vec<(f64, f64)>) -> Self {
        Self { points }
    }

    /// Number of vertices.
    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// True when the first and last vertex coincide (and there is more than one vertex).
    pub fn is_closed(&self) -> bool {
        self.points.len() > 2 && self.points.first() == self.points.last()
    }

    /// Total length along the polyline.
    pub fn length(&self) -> f64 {
        self.segments()
            .map(|((x0, y0), (x1, y1))| (x1 - x0).hypot(y1 - y0))
            .sum()
    }

    /// Iterate over consecutive point pairs.
    pub fn segments(&self) -> impl Iterator<Item = ((f64, f64), (f64, f64))> + '_ {
        self.points.windows(2).map(|w| (w[0], w[1]))
    }

    /// Drop consecutive duplicate points.
    pub fn dedup(&mut self) {
        self.points.dedup();
    }

    /// Ramer-Douglas-Peucker simplification with tolerance `epsilon`.
    pub fn simplified(&self, epsilon: f64) -> Self {
        if self.points.len() < 3 || epsilon <= 0.0 {
            return self.clone();
        }
        let simplified = self.to_line_string().simplify(&epsilon);
        Self::new(simplified.0.into_iter().map(|c| (c.x, c.y)).collect())
    }

    /// Convert to a `geo` line string.
    pub fn to_line_string(&self) -> LineString<f64> {
        LineString::new(
            self.points
                .iter()
                .map(|&(x, y)| Coord { x, y })
                .collect(),
        )
    }
}

impl From<Vec<(f64, f64)>> for Polyline {
    fn from(points: Vec<(f64, f64)>) -> Self {
        Self::new(points)
    }
}
