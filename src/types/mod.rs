//! Small geometric value types shared by every stage.
//!
//! - [`Bounds2D`]: rectangular extent of a grid or mesh domain
//! - [`Side`] / [`SideBoundaries`]: the four domain sides in SWASH order
//! - [`Polyline`]: ordered (x, y) point sequence

mod bounds;
mod polyline;
mod sides;

pub use bounds::Bounds2D;
pub use polyline::Polyline;
pub use sides::{Side, SideBoundaries};
