//! 2D domain bounds.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Axis-aligned rectangular extent of a structured grid or mesh domain.
///
/// # Example
///
/// ```
/// use swash_mesh::types::Bounds2D;
///
/// let bounds = Bounds2D::new(-2000.0, 2000.0, -1000.0, 1000.0);
/// assert_eq!(bounds.width(), 4000.0);
/// assert_eq!(bounds.height(), 2000.0);
/// assert_eq!(bounds.center(), (0.0, 0.0));
/// ```
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Bounds2D {
    /// Minimum x-coordinate (western boundary)
    pub x_min: f64,
    /// Maximum x-coordinate (eastern boundary)
    pub x_max: f64,
    /// Minimum y-coordinate (southern boundary)
    pub y_min: f64,
    /// Maximum y-coordinate (northern boundary)
    pub y_max: f64,
}

impl Bounds2D {
    /// Create new domain bounds.
    ///
    /// # Panics
    ///
    /// Panics if `x_max <= x_min` or `y_max <= y_min`. Use [`Bounds2D::from_extent`]
    /// when the extent comes from user data and may be degenerate.
    pub fn new(x_min: f64, x_max: f64, y_min: f64, y_max: f64) -> Self {
        assert!(
            x_max > x_min,
            "x_max ({}) must be greater than x_min ({})",
            x_max,
            x_min
        );
        assert!(
            y_max > y_min,
            "y_max ({}) must be greater than y_min ({})",
            y_max,
            y_min
        );

        Self::from_extent(x_min, x_max, y_min, y_max)
    }

    /// Create bounds without checking the ordering of the limits.
    pub fn from_extent(x_min: f64, x_max: f64, y_min: f64, y_max: f64) -> Self {
        Self {
            x_min,
            x_max,
            y_min,
            y_max,
        }
    }

    /// Domain width (x_max - x_min).
    #[inline]
    pub fn width(&self) -> f64 {
        self.x_max - self.x_min
    }

    /// Domain height (y_max - y_min).
    #[inline]
    pub fn height(&self) -> f64 {
        self.y_max - self.y_min
    }

    /// Domain area.
    #[inline]
    pub fn area(&self) -> f64 {
        self.width() * self.height()
    }

    /// Domain center point.
    #[inline]
    pub fn center(&self) -> (f64, f64) {
        (
            (self.x_min + self.x_max) / 2.0,
            (self.y_min + self.y_max) / 2.0,
        )
    }

    /// Length of the diagonal, used as a scale for geometric tolerances.
    #[inline]
    pub fn diagonal(&self) -> f64 {
        self.width().hypot(self.height())
    }

    /// True when the extent has no positive area or contains non-finite limits.
    pub fn is_degenerate(&self) -> bool {
        !(self.x_min.is_finite()
            && self.x_max.is_finite()
            && self.y_min.is_finite()
            && self.y_max.is_finite())
            || self.width() <= 0.0
            || self.height() <= 0.0
    }

    /// Check if a point is inside the domain (inclusive).
    #[inline]
    pub fn contains(&self, x: f64, y: f64) -> bool {
        x >= self.x_min && x <= self.x_max && y >= self.y_min && y <= self.y_max
    }

    /// Check if a point is inside the domain, allowing `tol` outside each side.
    #[inline]
    pub fn contains_with_tolerance(&self, x: f64, y: f64, tol: f64) -> bool {
        x >= self.x_min - tol
            && x <= self.x_max + tol
            && y >= self.y_min - tol
            && y <= self.y_max + tol
    }

    /// Clamp a point onto the domain.
    #[inline]
    pub fn clamp(&self, x: f64, y: f64) -> (f64, f64) {
        (
            x.clamp(self.x_min, self.x_max),
            y.clamp(self.y_min, self.y_max),
        )
    }

    /// Return bounds as tuple (x_min, x_max, y_min, y_max).
    #[inline]
    pub fn as_tuple(&self) -> (f64, f64, f64, f64) {
        (self.x_min, self.x_max, self.y_min, self.y_max)
    }
}

impl fmt::Display for Bounds2D {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "[{:.2}, {:.2}] × [{:.2}, {:.2}]",
            self.x_min, self.x_max, self.y_min, self.y_max
        )
    }
}
