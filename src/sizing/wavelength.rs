//! Linear wave dispersion.
//!
//! Wavelength `L = 2π / k` where `k` solves `ω² = g k tanh(k h)`.

use std::f64::consts::PI;

/// Gravitational acceleration (m/s²).
pub const GRAVITY: f64 = 9.81;

/// Deep-water wavelength `g T² / 2π`.
pub fn deep_water_wavelength(period: f64) -> f64 {
    GRAVITY * period * period / (2.0 * PI)
}

/// Wavelength of a wave of `period` in water of depth `depth`.
///
/// Shallow (`h / L0 < 0.05`) and deep (`h / L0 > 0.5`) water use the limiting
/// forms; otherwise the dispersion relation is solved by Newton iteration
/// on the wavenumber.
pub fn wavelength(period: f64, depth: f64) -> f64 {
    let l0 = deep_water_wavelength(period);
    if !(depth > 0.0) {
        return 0.0;
    }
    let ratio = depth / l0;
    if ratio < 0.05 {
        return period * (GRAVITY * depth).sqrt();
    }
    if ratio > 0.5 {
        return l0;
    }

    let omega2 = (2.0 * PI / period).powi(2);
    let k0 = 2.0 * PI / l0;
    // Eckart's approximation as a starting point
    let mut k = k0 / (k0 * depth).tanh().sqrt();
    for _ in 0..50 {
        let th = (k * depth).tanh();
        let f = GRAVITY * k * th - omega2;
        let df = GRAVITY * th + GRAVITY * k * depth * (1.0 - th * th);
        let step = f / df;
        k -= step;
        if step.abs() <= 1e-12 * k {
            break;
        }
    }
    2.0 * PI / k
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_limits() {
        let l0 = deep_water_wavelength(10.0);
        assert_relative_eq!(l0, 156.13, epsilon = 0.01);
        assert_eq!(wavelength(10.0, 1000.0), l0);
        assert_relative_eq!(wavelength(10.0, 1.0), 10.0 * GRAVITY.sqrt());
        assert_eq!(wavelength(10.0, 0.0), 0.0);
    }

    #[test]
    fn test_dispersion_satisfied() {
        let (period, depth) = (8.0, 20.0);
        let l = wavelength(period, depth);
        let k = 2.0 * PI / l;
        let omega2 = (2.0 * PI / period).powi(2);
        assert_relative_eq!(GRAVITY * k * (k * depth).tanh(), omega2, max_relative = 1e-10);
        assert!(l < deep_water_wavelength(period));
    }

    #[test]
    fn test_wavelength_grows_with_depth() {
        let mut previous = 0.0;
        for depth in [1.0, 5.0, 10.0, 20.0, 40.0, 80.0] {
            let l = wavelength(6.0, depth);
            assert!(l >= previous, "L({depth}) = {l} < {previous}");
            previous = l;
        }
    }
}
