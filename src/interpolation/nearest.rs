//! Nearest-sample queries over scattered (x, y, value) samples.

use rstar::{PointDistance, RTree, RTreeObject, AABB};

/// One sample in the R-tree, referring back to its position in the sample list.
#[derive(Clone, Copy, Debug)]
struct SampleEntry {
    point: [f64; 2],
    index: usize,
}

impl RTreeObject for SampleEntry {
    type Envelope = AABB<[f64; 2]>;

    fn envelope(&self) -> Self::Envelope {
        AABB::from_point(self.point)
    }
}

impl PointDistance for SampleEntry {
    fn distance_2(&self, point: &[f64; 2]) -> f64 {
        let dx = self.point[0] - point[0];
        let dy = self.point[1] - point[1];
        dx * dx + dy * dy
    }
}

/// R-tree over sample positions.
pub struct SampleIndex {
    samples: Vec<(f64, f64, f64)>,
    tree: RTree<SampleEntry>,
}

impl std::fmt::Debug for SampleIndex {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SampleIndex")
            .field("samples", &self.samples.len())
            .finish()
    }
}

impl SampleIndex {
    pub fn new(samples: Vec<(f64, f64, f64)>) -> Self {
        let entries = samples
            .iter()
            .enumerate()
            .map(|(index, &(x, y, _))| SampleEntry {
                point: [x, y],
                index,
            })
            .collect();
        Self {
            samples,
            tree: RTree::bulk_load(entries),
        }
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    pub fn samples(&self) -> &[(f64, f64, f64)] {
        &self.samples
    }

    /// Nearest sample and its distance.
    pub fn nearest(&self, x: f64, y: f64) -> Option<((f64, f64, f64), f64)> {
        let query = [x, y];
        self.tree
            .nearest_neighbor(&query)
            .map(|e| (self.samples[e.index], e.distance_2(&query).sqrt()))
    }

    /// Up to `k` samples ordered by distance.
    pub fn k_nearest(&self, x: f64, y: f64, k: usize) -> Vec<(f64, f64, f64)> {
        self.tree
            .nearest_neighbor_iter(&[x, y])
            .take(k)
            .map(|e| self.samples[e.index])
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_nearest() {
        let index = SampleIndex::new(vec![(0.0, 0.0, 1.0), (10.0, 0.0, 2.0), (0.0, 10.0, 3.0)]);
        let ((x, y, v), d) = index.nearest(8.0, 1.0).unwrap();
        assert_eq!((x, y, v), (10.0, 0.0, 2.0));
        assert_relative_eq!(d, 5.0_f64.sqrt());
    }

    #[test]
    fn test_k_nearest_ordered() {
        let samples: Vec<_> = (0..10).map(|i| (i as f64, 0.0, i as f64)).collect();
        let index = SampleIndex::new(samples);
        let near = index.k_nearest(2.2, 0.0, 3);
        let values: Vec<f64> = near.iter().map(|s| s.2).collect();
        assert_eq!(values, vec![2.0, 3.0, 1.0]);
        assert_eq!(index.k_nearest(0.0, 0.0, 50).len(), 10);
    }

    #[test]
    fn test_empty() {
        let index = SampleIndex::new(Vec::new());
        assert!(index.is_empty());
        assert!(index.nearest(0.0, 0.0).is_none());
    }
}
