//! Local thin-plate spline interpolation.
//!
//! For a query point and its neighbouring samples `(x_i, y_i, v_i)` solve
//!
//! ```text
//! | Φ   P | | w |   | v |
//! | Pᵀ  0 | | c | = | 0 |
//! ```
//!
//! with `Φ_ij = φ(|p_i - p_j|)`, `φ(r) = r² ln r` and `P_i = [1, x_i, y_i]`.
//! Coordinates are centred on the query point and scaled by the neighbourhood
//! radius, so the value at the query point is `Σ w_i φ(|p_i|) + c_0`.
//! The linear term makes planar fields reproduce exactly.

use faer::{linalg::solvers::Solve, Mat};

/// Thin-plate kernel `r² ln r`, zero at the origin.
#[inline]
pub fn thin_plate_kernel(r: f64) -> f64 {
    if r > 0.0 {
        r * r * r.ln()
    } else {
        0.0
    }
}

/// Value at (x, y) of the thin-plate spline through `samples`.
///
/// `None` when there are fewer than three samples, when every sample sits on
/// the query point, or when the solve is not finite.
pub fn thin_plate_value(samples: &[(f64, f64, f64)], x: f64, y: f64) -> Option<f64> {
    let m = samples.len();
    if m < 3 {
        return None;
    }

    let radius = samples
        .iter()
        .map(|&(sx, sy, _)| (sx - x).hypot(sy - y))
        .fold(0.0, f64::max);
    if !(radius > 0.0) {
        return None;
    }

    let local: Vec<(f64, f64)> = samples
        .iter()
        .map(|&(sx, sy, _)| ((sx - x) / radius, (sy - y) / radius))
        .collect();

    let n = m + 3;
    let mut a = Mat::<f64>::zeros(n, n);
    let mut rhs = Mat::<f64>::zeros(n, 1);
    for i in 0..m {
        let (xi, yi) = local[i];
        for j in 0..m {
            let (xj, yj) = local[j];
            a[(i, j)] = thin_plate_kernel((xi - xj).hypot(yi - yj));
        }
        a[(i, m)] = 1.0;
        a[(i, m + 1)] = xi;
        a[(i, m + 2)] = yi;
        a[(m, i)] = 1.0;
        a[(m + 1, i)] = xi;
        a[(m + 2, i)] = yi;
        rhs[(i, 0)] = samples[i].2;
    }

    let lu = a.as_ref().full_piv_lu();
    let solution = lu.solve(&rhs);

    let mut value = solution[(m, 0)];
    for (i, &(xi, yi)) in local.iter().enumerate() {
        value += solution[(i, 0)] * thin_plate_kernel(xi.hypot(yi));
    }
    value.is_finite().then_some(value)
}
