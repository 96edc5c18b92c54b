//! Distance fields and distance-threshold sizing.

use rstar::primitives::Line;
use rstar::{PointDistance, RTree};

use crate::config::ThresholdParams;
use crate::types::Polyline;

/// Euclidean distance to a set of segments and points.
///
/// Points are stored as zero-length segments so one R-tree answers both.
#[derive(Clone)]
pub struct DistanceField {
    tree: RTree<Line<[f64; 2]>>,
}

impl std::fmt::Debug for DistanceField {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DistanceField")
            .field("elements", &self.tree.size())
            .finish()
    }
}

impl DistanceField {
    /// Distance field of polylines and isolated points.
    pub fn new<'a, I>(polylines: I, points: &[(f64, f64)]) -> Self
    where
        I: IntoIterator<Item = &'a Polyline>,
    {
        let mut items: Vec<Line<[f64; 2]>> = Vec::new();
        for line in polylines {
            match line.len() {
                0 => {}
                1 => {
                    let p = line.points[0];
                    items.push(Line::new([p.0, p.1], [p.0, p.1]));
                }
                _ => items.extend(
                    line.segments()
                        .map(|(a, b)| Line::new([a.0, a.1], [b.0, b.1])),
                ),
            }
        }
        items.extend(points.iter().map(|&(x, y)| Line::new([x, y], [x, y])));

        Self {
            tree: RTree::bulk_load(items),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.tree.size() == 0
    }

    /// Distance from (x, y) to the nearest element; `None` for an empty field.
    pub fn distance(&self, x: f64, y: f64) -> Option<f64> {
        let query = [x, y];
        self.tree
            .nearest_neighbor(&query)
            .map(|segment| segment.distance_2(&query).sqrt())
    }
}

/// Size at distance `d` from a feature.
///
/// `None` means the feature imposes no constraint at that distance (only
/// when `stop_at_dist_max` is set and `d > dist_max`).
pub fn threshold_size(d: f64, params: &ThresholdParams) -> Option<f64> {
    if params.stop_at_dist_max && d > params.dist_max {
        return None;
    }
    let size = if d <= params.dist_min {
        params.size_min
    } else if d >= params.dist_max {
        params.size_max
    } else {
        let t = (d - params.dist_min) / (params.dist_max - params.dist_min);
        params.size_min + t * (params.size_max - params.size_min)
    };
    Some(size)
}

/// A distance field with its threshold parameters.
#[derive(Clone, Debug)]
pub struct ThresholdField {
    pub name: &'static str,
    pub params: ThresholdParams,
    pub distance: DistanceField,
}

impl ThresholdField {
    pub fn new(name: &'static str, params: ThresholdParams, distance: DistanceField) -> Self {
        Self {
            name,
            params,
            distance,
        }
    }

    pub fn size_at(&self, x: f64, y: f64) -> Option<f64> {
        self.distance
            .distance(x, y)
            .and_then(|d| threshold_size(d, &self.params))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_distance_to_segments_and_points() {
        let line = Polyline::new(vec![(0.0, 0.0), (10.0, 0.0)]);
        let field = DistanceField::new([&line], &[(100.0, 100.0)]);

        assert_relative_eq!(field.distance(5.0, 3.0).unwrap(), 3.0);
        assert_relative_eq!(field.distance(-4.0, 3.0).unwrap(), 5.0);
        assert_relative_eq!(field.distance(100.0, 98.0).unwrap(), 2.0);
    }

    #[test]
    fn test_empty_field() {
        let field = DistanceField::new(std::iter::empty::<&Polyline>(), &[]);
        assert!(field.is_empty());
        assert_eq!(field.distance(0.0, 0.0), None);
    }

    #[test]
    fn test_threshold_bands() {
        let p = ThresholdParams::new(5.0, 50.0, 10.0, 100.0);
        assert_eq!(threshold_size(0.0, &p), Some(5.0));
        assert_eq!(threshold_size(10.0, &p), Some(5.0));
        assert_relative_eq!(threshold_size(55.0, &p).unwrap(), 27.5);
        assert_eq!(threshold_size(100.0, &p), Some(50.0));
        assert_eq!(threshold_size(1e6, &p), Some(50.0));
    }

    #[test]
    fn test_stop_at_dist_max() {
        let p = ThresholdParams::new(5.0, 50.0, 0.0, 200.0).stop_at_dist_max();
        assert_eq!(threshold_size(200.0, &p), Some(50.0));
        assert_eq!(threshold_size(200.1, &p), None);
    }

    #[test]
    fn test_threshold_monotone() {
        let p = ThresholdParams::new(2.0, 40.0, 5.0, 120.0);
        let mut previous = 0.0;
        for k in 0..200 {
            let s = threshold_size(k as f64, &p).unwrap();
            assert!(s >= previous);
            previous = s;
        }
    }
}
