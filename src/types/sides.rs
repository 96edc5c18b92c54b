//! Per-side values with named fields.
//!
//! SWASH numbers the sides of a rectangular domain clockwise from the west:
//! West = 1, North = 2, East = 3, South = 4. Everything that walks the
//! domain boundary uses that order.

use std::fmt;

/// The four sides of a rectangular domain.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Side {
    /// x = x_min
    West,
    /// y = y_max
    North,
    /// x = x_max
    East,
    /// y = y_min
    South,
}

impl Side {
    /// All sides in boundary-marker order.
    pub const ALL: [Side; 4] = [Side::West, Side::North, Side::East, Side::South];

    /// Zero-based position in [`Side::ALL`].
    pub fn index(self) -> usize {
        match self {
            Side::West => 0,
            Side::North => 1,
            Side::East => 2,
            Side::South => 3,
        }
    }
}

impl fmt::Display for Side {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Side::West => "west",
            Side::North => "north",
            Side::East => "east",
            Side::South => "south",
        };
        f.write_str(name)
    }
}

/// One value per domain side.
///
/// # Example
///
/// ```
/// use swash_mesh::types::{Side, SideBoundaries};
///
/// let markers = SideBoundaries::new(1, 2, 3, 4);
/// assert_eq!(*markers.get(Side::East), 3);
/// assert_eq!(markers.to_array(), [1, 2, 3, 4]);
/// ```
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SideBoundaries<T> {
    /// West boundary (x = x_min)
    pub west: T,
    /// North boundary (y = y_max)
    pub north: T,
    /// East boundary (x = x_max)
    pub east: T,
    /// South boundary (y = y_min)
    pub south: T,
}

impl<T> SideBoundaries<T> {
    /// Order: west, north, east, south (clockwise from the west).
    pub fn new(west: T, north: T, east: T, south: T) -> Self {
        Self {
            west,
            north,
            east,
            south,
        }
    }

    /// Create with the same value on all sides.
    pub fn uniform(value: T) -> Self
    where
        T: Clone,
    {
        Self {
            west: value.clone(),
            north: value.clone(),
            east: value.clone(),
            south: value,
        }
    }

    /// Build from a function of the side.
    pub fn from_fn<F>(mut f: F) -> Self
    where
        F: FnMut(Side) -> T,
    {
        Self {
            west: f(Side::West),
            north: f(Side::North),
            east: f(Side::East),
            south: f(Side::South),
        }
    }

    /// Map a function over all sides.
    pub fn map<U, F>(self, mut f: F) -> SideBoundaries<U>
    where
        F: FnMut(T) -> U,
    {
        SideBoundaries {
            west: f(self.west),
            north: f(self.north),
            east: f(self.east),
            south: f(self.south),
        }
    }

    /// Value for a side.
    pub fn get(&self, side: Side) -> &T {
        match side {
            Side::West => &self.west,
            Side::North => &self.north,
            Side::East => &self.east,
            Side::South => &self.south,
        }
    }

    /// Convert to array [west, north, east, south].
    pub fn to_array(self) -> [T; 4] {
        [self.west, self.north, self.east, self.south]
    }

    /// Iterate over (side, value) in order: west, north, east, south.
    pub fn iter(&self) -> impl Iterator<Item = (Side, &T)> {
        Side::ALL.into_iter().zip([&self.west, &self.north, &self.east, &self.south])
    }
}

impl<T: fmt::Display> fmt::Display for SideBoundaries<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "W:{} N:{} E:{} S:{}",
            self.west, self.north, self.east, self.south
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_creation_order() {
        let sides = SideBoundaries::new(1, 2, 3, 4);
        assert_eq!(sides.west, 1);
        assert_eq!(sides.north, 2);
        assert_eq!(sides.east, 3);
        assert_eq!(sides.south, 4);
    }

    #[test]
    fn test_from_fn_and_get() {
        let sides = SideBoundaries::from_fn(|s| s.index() * 10);
        for side in Side::ALL {
            assert_eq!(*sides.get(side), side.index() * 10);
        }
    }

    #[test]
    fn test_iter_order() {
        let sides = SideBoundaries::uniform(0).map(|_| 'x');
        let order: Vec<Side> = sides.iter().map(|(s, _)| s).collect();
        assert_eq!(order, Side::ALL.to_vec());
    }
}
