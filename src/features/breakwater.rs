//! Breakwater detection from the porosity field.
//!
//! Samples with `|porosity - 1| > tolerance` are flagged and grouped into
//! connected runs. Each run is reduced to a medial line: sample positions are
//! projected on the run's principal axis, binned at the grid spacing and
//! averaged per bin, then simplified.

use std::collections::VecDeque;

use crate::bathymetry::{BathymetryGrid, GridGeometry};
use crate::config::{Connectivity, FeatureConfig};
use crate::features::Breakwater;
use crate::types::Polyline;

const FOUR: [(isize, isize); 4] = [(1, 0), (-1, 0), (0, 1), (0, -1)];
const EIGHT: [(isize, isize); 8] = [
    (1, 0),
    (-1, 0),
    (0, 1),
    (0, -1),
    (1, 1),
    (1, -1),
    (-1, 1),
    (-1, -1),
];

/// Detect breakwaters; ids follow the scan order (rows from the south, west to east).
pub fn detect_breakwaters(grid: &BathymetryGrid, config: &FeatureConfig) -> Vec<Breakwater> {
    let geometry = *grid.geometry();
    let flagged: Vec<bool> = grid
        .porosity()
        .iter()
        .map(|p| (p - 1.0).abs() > config.porosity_tolerance)
        .collect();

    let runs = connected_runs(&geometry, &flagged, config.connectivity);
    let total = runs.len();

    let breakwaters: Vec<Breakwater> = runs
        .into_iter()
        .filter(|cells| cells.len() >= config.min_breakwater_cells)
        .enumerate()
        .map(|(id, cells)| Breakwater {
            id,
            points: medial_line(&geometry, &cells),
            cell_count: cells.len(),
        })
        .collect();

    if breakwaters.len() < total {
        tracing::debug!(
            dropped = total - breakwaters.len(),
            min_cells = config.min_breakwater_cells,
            "ignored small porosity runs"
        );
    }
    for bw in &breakwaters {
        tracing::debug!(
            id = bw.id,
            cells = bw.cell_count,
            points = bw.points.len(),
            "breakwater"
        );
    }
    breakwaters
}

/// Connected components of flagged samples, each listed in discovery order.
fn connected_runs(
    geometry: &GridGeometry,
    flagged: &[bool],
    connectivity: Connectivity,
) -> Vec<Vec<(usize, usize)>> {
    let offsets: &[(isize, isize)] = match connectivity {
        Connectivity::Four => &FOUR,
        Connectivity::Eight => &EIGHT,
    };
    let (nx, ny) = (geometry.n_cols as isize, geometry.n_rows as isize);
    let mut visited = vec![false; flagged.len()];
    let mut runs = Vec::new();

    for row in 0..geometry.n_rows {
        for col in 0..geometry.n_cols {
            let start = geometry.index(col, row);
            if !flagged[start] || visited[start] {
                continue;
            }
            visited[start] = true;
            let mut cells = Vec::new();
            let mut queue = VecDeque::from([(col, row)]);

            while let Some((c, r)) = queue.pop_front() {
                cells.push((c, r));
                for &(dc, dr) in offsets {
                    let (nc, nr) = (c as isize + dc, r as isize + dr);
                    if nc < 0 || nr < 0 || nc >= nx || nr >= ny {
                        continue;
                    }
                    let k = geometry.index(nc as usize, nr as usize);
                    if flagged[k] && !visited[k] {
                        visited[k] = true;
                        queue.push_back((nc as usize, nr as usize));
                    }
                }
            }
            runs.push(cells);
        }
    }
    runs
}

/// Medial line of a run of samples.
fn medial_line(geometry: &GridGeometry, cells: &[(usize, usize)]) -> Polyline {
    let points: Vec<(f64, f64)> = cells
        .iter()
        .map(|&(c, r)| (geometry.x(c), geometry.y(r)))
        .collect();
    let n = points.len() as f64;
    let cx = points.iter().map(|p| p.0).sum::<f64>() / n;
    let cy = points.iter().map(|p| p.1).sum::<f64>() / n;

    let (mut sxx, mut syy, mut sxy) = (0.0, 0.0, 0.0);
    for &(x, y) in &points {
        sxx += (x - cx) * (x - cx);
        syy += (y - cy) * (y - cy);
        sxy += (x - cx) * (y - cy);
    }
    let theta = 0.5 * (2.0 * sxy).atan2(sxx - syy);
    let (ux, uy) = (theta.cos(), theta.sin());

    let spacing = geometry.min_spacing();
    let t: Vec<f64> = points
        .iter()
        .map(|&(x, y)| (x - cx) * ux + (y - cy) * uy)
        .collect();
    let t_min = t.iter().copied().fold(f64::INFINITY, f64::min);

    let mut bins: Vec<(f64, f64, usize)> = Vec::new();
    for (&(x, y), &ti) in points.iter().zip(&t) {
        let b = ((ti - t_min) / spacing).round() as usize;
        if b >= bins.len() {
            bins.resize(b + 1, (0.0, 0.0, 0));
        }
        bins[b].0 += x;
        bins[b].1 += y;
        bins[b].2 += 1;
    }

    let mut line = Polyline::new(
        bins.into_iter()
            .filter(|&(_, _, count)| count > 0)
            .map(|(x, y, count)| (x / count as f64, y / count as f64))
            .collect(),
    );
    line.dedup();
    let mut line = line.simplified(0.5 * spacing);

    let first = line.points[0];
    let last = line.points[line.points.len() - 1];
    if (last.0, last.1) < (first.0, first.1) {
        line.points.reverse();
    }
    line
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bathymetry::ScalarField;
    use approx::assert_relative_eq;

    fn grid_with_porosity(n_cols: usize, n_rows: usize, porous: &[(usize, usize)]) -> BathymetryGrid {
        let g = GridGeometry::new(0.0, 0.0, 10.0, 10.0, n_cols, n_rows);
        let mut porosity = vec![1.0; n_cols * n_rows];
        for &(c, r) in porous {
            porosity[g.index(c, r)] = 0.4;
        }
        BathymetryGrid::new(ScalarField::uniform(g, -5.0).unwrap())
            .with_porosity_values(porosity)
            .unwrap()
    }

    #[test]
    fn test_straight_run_of_forty() {
        let cells: Vec<(usize, usize)> = (5..45).map(|c| (c, 10)).collect();
        let grid = grid_with_porosity(50, 20, &cells);
        let found = detect_breakwaters(&grid, &FeatureConfig::default());

        assert_eq!(found.len(), 1);
        let bw = &found[0];
        assert_eq!(bw.id, 0);
        assert_eq!(bw.cell_count, 40);
        assert_eq!(bw.points.len(), 2);
        assert_relative_eq!(bw.points.points[0].0, 50.0, epsilon = 1e-9);
        assert_relative_eq!(bw.points.points[1].0, 440.0, epsilon = 1e-9);
        assert_relative_eq!(bw.points.points[0].1, 100.0, epsilon = 1e-9);
    }

    #[test]
    fn test_thick_run_collapses_to_centre_line() {
        let mut cells = Vec::new();
        for c in 2..12 {
            for r in 4..7 {
                cells.push((c, r));
            }
        }
        let grid = grid_with_porosity(20, 12, &cells);
        let found = detect_breakwaters(&grid, &FeatureConfig::default());
        assert_eq!(found.len(), 1);
        for &(_, y) in &found[0].points.points {
            assert_relative_eq!(y, 50.0, epsilon = 1e-9);
        }
    }

    #[test]
    fn test_diagonal_connectivity() {
        let cells: Vec<(usize, usize)> = (0..6).map(|k| (k + 2, k + 2)).collect();
        let grid = grid_with_porosity(12, 12, &cells);

        let four = detect_breakwaters(&grid, &FeatureConfig::default());
        assert_eq!(four.len(), 6);

        let eight = detect_breakwaters(
            &grid,
            &FeatureConfig::default().with_connectivity(Connectivity::Eight),
        );
        assert_eq!(eight.len(), 1);
        assert_eq!(eight[0].cell_count, 6);
        assert_eq!(eight[0].points.len(), 2);
    }

    #[test]
    fn test_scan_order_ids_and_min_cells() {
        // Northern run discovered after the southern one
        let mut cells: Vec<(usize, usize)> = (1..5).map(|c| (c, 8)).collect();
        cells.extend((3..9).map(|c| (c, 2)));
        cells.push((10, 5));
        let grid = grid_with_porosity(12, 10, &cells);

        let found = detect_breakwaters(&grid, &FeatureConfig::default().with_min_breakwater_cells(2));
        assert_eq!(found.len(), 2);
        assert_eq!(found[0].id, 0);
        assert_eq!(found[0].cell_count, 6);
        assert_relative_eq!(found[0].points.points[0].1, 20.0);
        assert_eq!(found[1].id, 1);
        assert_eq!(found[1].cell_count, 4);
    }

    #[test]
    fn test_tolerance() {
        let g = GridGeometry::new(0.0, 0.0, 1.0, 1.0, 4, 4);
        let mut porosity = vec![1.0; 16];
        porosity[5] = 0.9995;
        let grid = BathymetryGrid::new(ScalarField::uniform(g, -1.0).unwrap())
            .with_porosity_values(porosity)
            .unwrap();
        assert!(detect_breakwaters(&grid, &FeatureConfig::default()).is_empty());
        let strict = FeatureConfig::default().with_porosity_tolerance(1e-4);
        assert_eq!(detect_breakwaters(&grid, &strict).len(), 1);
    }
}
