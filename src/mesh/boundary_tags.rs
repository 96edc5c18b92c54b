//! Boundary markers for mesh vertices and edges.
//!
//! SWASH reads the marker column of the Triangle files to apply boundary
//! conditions per side:
//!
//! | marker | meaning |
//! |--------|---------|
//! | 0      | interior |
//! | 1      | west (x = x_min) |
//! | 2      | north (y = y_max) |
//! | 3      | east (x = x_max) |
//! | 4      | south (y = y_min) |
//! | 5 + id | breakwater `id` |
//!
//! Corners belong to the side that starts there when walking the boundary
//! clockwise from the south-west: SW is west, NW is north, NE is east and
//! SE is south.

use std::fmt;

use crate::types::{Bounds2D, Side};

/// First marker available for embedded features.
pub const FIRST_FEATURE_MARKER: u32 = 5;

/// Tag identifying where a vertex or edge lies.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum BoundaryTag {
    /// Not on the domain boundary or a feature
    #[default]
    Interior,
    West,
    North,
    East,
    South,
    /// Constrained breakwater line with the given id
    Breakwater(u32),
}

impl BoundaryTag {
    /// Integer marker written to the mesh files.
    pub fn marker(&self) -> u32 {
        match self {
            BoundaryTag::Interior => 0,
            BoundaryTag::West => 1,
            BoundaryTag::North => 2,
            BoundaryTag::East => 3,
            BoundaryTag::South => 4,
            BoundaryTag::Breakwater(id) => FIRST_FEATURE_MARKER + id,
        }
    }

    /// Inverse of [`BoundaryTag::marker`].
    pub fn from_marker(marker: u32) -> Self {
        match marker {
            0 => BoundaryTag::Interior,
            1 => BoundaryTag::West,
            2 => BoundaryTag::North,
            3 => BoundaryTag::East,
            4 => BoundaryTag::South,
            m => BoundaryTag::Breakwater(m - FIRST_FEATURE_MARKER),
        }
    }

    pub fn from_side(side: Side) -> Self {
        match side {
            Side::West => BoundaryTag::West,
            Side::North => BoundaryTag::North,
            Side::East => BoundaryTag::East,
            Side::South => BoundaryTag::South,
        }
    }

    pub fn is_interior(&self) -> bool {
        matches!(self, BoundaryTag::Interior)
    }

    /// Tag of a vertex at (x, y), with corner ownership as in the module docs.
    pub fn for_vertex(bounds: &Bounds2D, x: f64, y: f64, tol: f64) -> Self {
        let on_west = (x - bounds.x_min).abs() <= tol;
        let on_east = (x - bounds.x_max).abs() <= tol;
        let on_south = (y - bounds.y_min).abs() <= tol;
        let on_north = (y - bounds.y_max).abs() <= tol;

        if on_west {
            if on_north {
                BoundaryTag::North
            } else {
                BoundaryTag::West
            }
        } else if on_north {
            if on_east {
                BoundaryTag::East
            } else {
                BoundaryTag::North
            }
        } else if on_east {
            if on_south {
                BoundaryTag::South
            } else {
                BoundaryTag::East
            }
        } else if on_south {
            BoundaryTag::South
        } else {
            BoundaryTag::Interior
        }
    }

    /// Side tag of an edge whose two ends lie on the same side, else `None`.
    pub fn for_edge(bounds: &Bounds2D, a: (f64, f64), b: (f64, f64), tol: f64) -> Option<Self> {
        let near = |v: f64, target: f64| (v - target).abs() <= tol;
        if near(a.0, bounds.x_min) && near(b.0, bounds.x_min) {
            Some(BoundaryTag::West)
        } else if near(a.1, bounds.y_max) && near(b.1, bounds.y_max) {
            Some(BoundaryTag::North)
        } else if near(a.0, bounds.x_max) && near(b.0, bounds.x_max) {
            Some(BoundaryTag::East)
        } else if near(a.1, bounds.y_min) && near(b.1, bounds.y_min) {
            Some(BoundaryTag::South)
        } else {
            None
        }
    }
}

impl fmt::Display for BoundaryTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BoundaryTag::Interior => write!(f, "interior"),
            BoundaryTag::West => write!(f, "west"),
            BoundaryTag::North => write!(f, "north"),
            BoundaryTag::East => write!(f, "east"),
            BoundaryTag::South => write!(f, "south"),
            BoundaryTag::Breakwater(id) => write!(f, "breakwater {id}"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_marker_roundtrip() {
        for marker in 0..12 {
            assert_eq!(BoundaryTag::from_marker(marker).marker(), marker);
        }
        assert_eq!(BoundaryTag::Breakwater(0).marker(), 5);
        assert_eq!(BoundaryTag::from_side(Side::East).marker(), 3);
    }

    #[test]
    fn test_corner_ownership() {
        let b = Bounds2D::new(0.0, 10.0, 0.0, 5.0);
        assert_eq!(BoundaryTag::for_vertex(&b, 0.0, 0.0, 0.0), BoundaryTag::West);
        assert_eq!(BoundaryTag::for_vertex(&b, 0.0, 5.0, 0.0), BoundaryTag::North);
        assert_eq!(BoundaryTag::for_vertex(&b, 10.0, 5.0, 0.0), BoundaryTag::East);
        assert_eq!(BoundaryTag::for_vertex(&b, 10.0, 0.0, 0.0), BoundaryTag::South);
        assert_eq!(BoundaryTag::for_vertex(&b, 4.0, 0.0, 0.0), BoundaryTag::South);
        assert_eq!(BoundaryTag::for_vertex(&b, 4.0, 2.0, 0.0), BoundaryTag::Interior);
    }

    #[test]
    fn test_edge_side() {
        let b = Bounds2D::new(0.0, 10.0, 0.0, 5.0);
        assert_eq!(
            BoundaryTag::for_edge(&b, (0.0, 0.0), (0.0, 2.0), 1e-9),
            Some(BoundaryTag::West)
        );
        assert_eq!(
            BoundaryTag::for_edge(&b, (0.0, 0.0), (3.0, 0.0), 1e-9),
            Some(BoundaryTag::South)
        );
        assert_eq!(BoundaryTag::for_edge(&b, (0.0, 0.0), (3.0, 2.0), 1e-9), None);
    }

    #[test]
    fn test_classification() {
        assert!(BoundaryTag::Interior.is_interior());
        assert!(!BoundaryTag::North.is_interior());
        assert_eq!(BoundaryTag::from_marker(7), BoundaryTag::Breakwater(2));
    }
}
