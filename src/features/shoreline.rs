//! Shoreline tracing with marching squares.
//!
//! Each grid cell whose four samples are valid contributes up to two
//! segments between crossing points on its edges. Crossing points are keyed
//! by grid edge, so segments of neighbouring cells share endpoints exactly and
//! can be chained without a tolerance. Ambiguous (saddle) cells are resolved
//! with the average of the four corners.
//!
//! Output ordering is deterministic:
//! - an open polyline starts at its lexicographically smallest endpoint
//! - a closed polyline starts at its smallest vertex
//! - polylines are sorted by length, longest first, ties by first point

use std::collections::HashMap;

use crate::bathymetry::ScalarField;
use crate::types::Polyline;

/// Trace the `datum` isoline of `depth` into ordered polylines.
///
/// Polylines whose endpoints lie within `chain_tolerance` are joined.
/// Returns an empty vector when the field never crosses the datum.
pub fn extract_shoreline(depth: &ScalarField, datum: f64, chain_tolerance: f64) -> Vec<Polyline> {
    let tracer = ContourTracer::new(depth, datum);
    let segments = tracer.segments();
    if segments.is_empty() {
        return Vec::new();
    }

    let chains = chain_segments(&segments);
    let mut polylines: Vec<Polyline> = chains
        .into_iter()
        .map(|edges| {
            let mut line = Polyline::new(edges.iter().map(|&e| tracer.edge_point(e)).collect());
            line.dedup();
            line
        })
        .filter(|line| line.len() >= 2)
        .collect();

    join_close_endpoints(&mut polylines, chain_tolerance);

    for line in &mut polylines {
        canonicalize(line);
    }
    polylines.sort_by(|a, b| {
        b.length()
            .total_cmp(&a.length())
            .then_with(|| compare_points(a.points[0], b.points[0]))
    });
    polylines
}

struct ContourTracer<'a> {
    field: &'a ScalarField,
    datum: f64,
    n_horizontal: usize,
}

impl<'a> ContourTracer<'a> {
    fn new(field: &'a ScalarField, datum: f64) -> Self {
        let g = field.geometry();
        Self {
            field,
            datum,
            n_horizontal: (g.n_cols - 1) * g.n_rows,
        }
    }

    /// Edge between (i, j) and (i + 1, j).
    fn horizontal(&self, i: usize, j: usize) -> usize {
        j * (self.field.geometry().n_cols - 1) + i
    }

    /// Edge between (i, j) and (i, j + 1).
    fn vertical(&self, i: usize, j: usize) -> usize {
        self.n_horizontal + j * self.field.geometry().n_cols + i
    }

    fn level(&self, col: usize, row: usize) -> Option<f64> {
        self.field.get(col, row).map(|d| d - self.datum)
    }

    /// Crossing point on a grid edge, by linear interpolation.
    fn edge_point(&self, edge: usize) -> (f64, f64) {
        let g = self.field.geometry();
        let ((ia, ja), (ib, jb)) = if edge < self.n_horizontal {
            let i = edge % (g.n_cols - 1);
            let j = edge / (g.n_cols - 1);
            ((i, j), (i + 1, j))
        } else {
            let k = edge - self.n_horizontal;
            let i = k % g.n_cols;
            let j = k / g.n_cols;
            ((i, j), (i, j + 1))
        };
        let va = self.level(ia, ja).unwrap_or(0.0);
        let vb = self.level(ib, jb).unwrap_or(0.0);
        let t = if va == vb { 0.5 } else { va / (va - vb) };
        let (xa, ya) = (g.x(ia), g.y(ja));
        let (xb, yb) = (g.x(ib), g.y(jb));
        (xa + t * (xb - xa), ya + t * (yb - ya))
    }

    /// All cell segments as pairs of grid edge ids, in scan order.
    fn segments(&self) -> Vec<(usize, usize)> {
        let g = self.field.geometry();
        let mut segments = Vec::new();

        for j in 0..g.n_rows - 1 {
            for i in 0..g.n_cols - 1 {
                let (Some(v0), Some(v1), Some(v2), Some(v3)) = (
                    self.level(i, j),
                    self.level(i + 1, j),
                    self.level(i + 1, j + 1),
                    self.level(i, j + 1),
                ) else {
                    continue;
                };

                let case = (v0 > 0.0) as u8
                    | ((v1 > 0.0) as u8) << 1
                    | ((v2 > 0.0) as u8) << 2
                    | ((v3 > 0.0) as u8) << 3;

                let bottom = self.horizontal(i, j);
                let right = self.vertical(i + 1, j);
                let top = self.horizontal(i, j + 1);
                let left = self.vertical(i, j);
                let center_above = (v0 + v1 + v2 + v3) / 4.0 > 0.0;

                match case {
                    0 | 15 => {}
                    1 | 14 => segments.push((left, bottom)),
                    2 | 13 => segments.push((bottom, right)),
                    3 | 12 => segments.push((left, right)),
                    4 | 11 => segments.push((right, top)),
                    6 | 9 => segments.push((bottom, top)),
                    7 | 8 => segments.push((left, top)),
                    5 => {
                        if center_above {
                            segments.push((bottom, right));
                            segments.push((top, left));
                        } else {
                            segments.push((left, bottom));
                            segments.push((right, top));
                        }
                    }
                    10 => {
                        if center_above {
                            segments.push((left, bottom));
                            segments.push((right, top));
                        } else {
                            segments.push((bottom, right));
                            segments.push((top, left));
                        }
                    }
                    _ => unreachable!("marching squares case out of range"),
                }
            }
        }
        segments
    }
}

/// Link segments that share a grid edge into edge-id chains.
fn chain_segments(segments: &[(usize, usize)]) -> Vec<Vec<usize>> {
    let mut by_edge: HashMap<usize, Vec<usize>> = HashMap::new();
    for (s, &(a, b)) in segments.iter().enumerate() {
        by_edge.entry(a).or_default().push(s);
        by_edge.entry(b).or_default().push(s);
    }

    let mut used = vec![false; segments.len()];
    let mut chains = Vec::new();

    let next_segment = |edge: usize, used: &[bool]| -> Option<usize> {
        by_edge
            .get(&edge)
            .and_then(|list| list.iter().copied().find(|&s| !used[s]))
    };

    for start in 0..segments.len() {
        if used[start] {
            continue;
        }
        used[start] = true;
        let (a, b) = segments[start];
        let mut chain = vec![a, b];

        let mut tail = b;
        while let Some(s) = next_segment(tail, &used) {
            used[s] = true;
            let (p, q) = segments[s];
            tail = if p == tail { q } else { p };
            chain.push(tail);
        }

        let mut head = a;
        let mut prefix = Vec::new();
        while let Some(s) = next_segment(head, &used) {
            used[s] = true;
            let (p, q) = segments[s];
            head = if p == head { q } else { p };
            prefix.push(head);
        }
        if !prefix.is_empty() {
            prefix.reverse();
            prefix.extend(chain);
            chain = prefix;
        }

        chains.push(chain);
    }
    chains
}

fn distance(a: (f64, f64), b: (f64, f64)) -> f64 {
    (a.0 - b.0).hypot(a.1 - b.1)
}

/// Merge open polylines whose endpoints are within `tol`; close near-loops.
fn join_close_endpoints(lines: &mut Vec<Polyline>, tol: f64) {
    loop {
        let mut merged = false;
        'search: for i in 0..lines.len() {
            if lines[i].is_closed() {
                continue;
            }
            for j in (i + 1)..lines.len() {
                if lines[j].is_closed() {
                    continue;
                }
                let (a_start, a_end) = endpoints(&lines[i]);
                let (b_start, b_end) = endpoints(&lines[j]);

                let mut other = lines[j].points.clone();
                let joined = if distance(a_end, b_start) <= tol {
                    Some((false, other))
                } else if distance(a_end, b_end) <= tol {
                    other.reverse();
                    Some((false, other))
                } else if distance(a_start, b_end) <= tol {
                    Some((true, other))
                } else if distance(a_start, b_start) <= tol {
                    other.reverse();
                    Some((true, other))
                } else {
                    None
                };

                if let Some((prepend, other)) = joined {
                    let base = std::mem::take(&mut lines[i].points);
                    lines[i].points = if prepend {
                        let mut pts = other;
                        pts.extend(base.into_iter().skip(1));
                        pts
                    } else {
                        let mut pts = base;
                        pts.extend(other.into_iter().skip(1));
                        pts
                    };
                    lines.remove(j);
                    merged = true;
                    break 'search;
                }
            }
        }
        if !merged {
            break;
        }
    }

    for line in lines.iter_mut() {
        if line.is_closed() || line.len() < 3 {
            continue;
        }
        let (start, end) = endpoints(line);
        if distance(start, end) <= tol {
            if let Some(last) = line.points.last_mut() {
                *last = start;
            }
        }
    }
}

fn endpoints(line: &Polyline) -> ((f64, f64), (f64, f64)) {
    (line.points[0], line.points[line.points.len() - 1])
}

fn compare_points(a: (f64, f64), b: (f64, f64)) -> std::cmp::Ordering {
    a.0.total_cmp(&b.0).then_with(|| a.1.total_cmp(&b.1))
}

/// Orient a polyline so it starts at its smallest point.
fn canonicalize(line: &mut Polyline) {
    if line.is_closed() {
        let mut ring = line.points[..line.points.len() - 1].to_vec();
        let start = ring
            .iter()
            .enumerate()
            .min_by(|a, b| compare_points(*a.1, *b.1))
            .map(|(k, _)| k)
            .unwrap_or(0);
        ring.rotate_left(start);
        let n = ring.len();
        if n > 2 && compare_points(ring[n - 1], ring[1]).is_lt() {
            ring[1..].reverse();
        }
        ring.push(ring[0]);
        line.points = ring;
    } else if compare_points(line.points[line.points.len() - 1], line.points[0]).is_lt() {
        line.points.reverse();
    }
}
