//! Shared latitude conversions used by the projection kernels.
//!
//! Every kernel goes through these helpers rather than carrying its own
//! series; forward and inverse of different projections must agree
//! bit-for-bit on the auxiliary latitudes they share.
//!
//!   tsfn:  t(φ) = tan(π/4 − φ/2) / ((1 − e·sinφ)/(1 + e·sinφ))^(e/2)
//!   msfn:  m(φ) = cosφ / sqrt(1 − e²·sin²φ)
//!   qsfn:  q(φ) = (1−e²)·[ sinφ/(1−e²sin²φ) − (1/2e)·ln((1−e·sinφ)/(1+e·sinφ)) ]
//!
//! `t` is e^(−ψ) for the isometric latitude ψ; `q` drives the authalic
//! latitude β through sinβ = q/q(π/2).

use std::f64::consts::{FRAC_PI_2, FRAC_PI_4};

use crate::error::TransformError;

/// Angular convergence tolerance for the iterative inverses (radians).
pub const ITERATION_TOLERANCE: f64 = 1e-12;
/// Iteration cap; exceeding it reports `NonConvergence`.
pub const MAX_ITERATIONS: usize = 15;

/// Below this eccentricity the ellipsoid is treated as a sphere in the
/// auxiliary-latitude formulas (the 1/e terms are singular).
const SPHERICAL_ECCENTRICITY: f64 = 1e-12;

/// m(φ) = cosφ / sqrt(1 − e²·sin²φ), the parallel radius over `a`.
pub fn msfn(phi: f64, e2: f64) -> f64 {
    let s = phi.sin();
    phi.cos() / (1.0 - e2 * s * s).sqrt()
}

/// t(φ) = e^(−ψ(φ)), decreasing from ∞ at the south pole to 0 at the
/// north pole.
pub fn tsfn(phi: f64, e: f64) -> f64 {
    let s = e * phi.sin();
    (FRAC_PI_4 - phi / 2.0).tan() / ((1.0 - s) / (1.0 + s)).powf(e / 2.0)
}

/// dψ/dφ for the isometric latitude, (1−e²)/((1−e²·sin²φ)·cosφ).
pub fn dpsi_dphi(phi: f64, e2: f64) -> f64 {
    let s = phi.sin();
    (1.0 - e2) / ((1.0 - e2 * s * s) * phi.cos())
}

/// Recover φ from t(φ) by fixed-point iteration (Snyder 7-9).
pub fn phi_from_ts(ts: f64, e: f64) -> Result<f64, TransformError> {
    let mut phi = FRAC_PI_2 - 2.0 * ts.atan();
    if e < SPHERICAL_ECCENTRICITY {
        return Ok(phi);
    }
    let half_e = e / 2.0;
    let mut delta = f64::MAX;
    for _ in 0..MAX_ITERATIONS {
        let s = e * phi.sin();
        let next = FRAC_PI_2 - 2.0 * (ts * ((1.0 - s) / (1.0 + s)).powf(half_e)).atan();
        delta = (next - phi).abs();
        phi = next;
        if delta < ITERATION_TOLERANCE {
            return Ok(phi);
        }
    }
    Err(TransformError::NonConvergence {
        iterations: MAX_ITERATIONS,
        delta,
    })
}

/// q(φ), Snyder 3-12. For a sphere this degenerates to 2·sinφ.
pub fn qsfn(phi: f64, e: f64) -> f64 {
    if e < SPHERICAL_ECCENTRICITY {
        return 2.0 * phi.sin();
    }
    let e2 = e * e;
    let s = phi.sin();
    let es = e * s;
    (1.0 - e2) * (s / (1.0 - e2 * s * s) - (1.0 / (2.0 * e)) * ((1.0 - es) / (1.0 + es)).ln())
}

/// dq/dφ = 2·(1−e²)·cosφ / (1−e²·sin²φ)².
pub fn dqsfn_dphi(phi: f64, e: f64) -> f64 {
    let e2 = e * e;
    let s = phi.sin();
    let d = 1.0 - e2 * s * s;
    2.0 * (1.0 - e2) * phi.cos() / (d * d)
}

/// q(π/2), the authalic normalizer.
pub fn qp(e: f64) -> f64 {
    qsfn(FRAC_PI_2, e)
}

/// Authalic latitude β with sinβ = q(φ)/q(π/2), clamped against
/// rounding at the poles.
pub fn authalic_latitude(phi: f64, e: f64) -> f64 {
    let ratio = (qsfn(phi, e) / qp(e)).clamp(-1.0, 1.0);
    ratio.asin()
}

/// Recover φ from the authalic latitude by Newton iteration (Snyder 3-16).
pub fn phi_from_authalic(beta: f64, e: f64) -> Result<f64, TransformError> {
    if e < SPHERICAL_ECCENTRICITY {
        return Ok(beta);
    }
    if FRAC_PI_2 - beta.abs() < ITERATION_TOLERANCE {
        return Ok(FRAC_PI_2.copysign(beta));
    }
    let e2 = e * e;
    let q = qp(e) * beta.sin();
    let mut phi = beta;
    let mut delta = f64::MAX;
    for _ in 0..MAX_ITERATIONS {
        let s = phi.sin();
        let es = e * s;
        let d = 1.0 - e2 * s * s;
        let step = (d * d) / (2.0 * phi.cos())
            * (q / (1.0 - e2) - s / d + (1.0 / (2.0 * e)) * ((1.0 - es) / (1.0 + es)).ln());
        phi += step;
        delta = step.abs();
        if delta < ITERATION_TOLERANCE {
            return Ok(phi);
        }
    }
    Err(TransformError::NonConvergence {
        iterations: MAX_ITERATIONS,
        delta,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::proj::ellipsoid::WGS84;
    use approx::assert_relative_eq;

    #[test]
    fn test_tsfn_phi_roundtrip() {
        let e = WGS84.eccentricity();
        for lat_deg in [-80.0, -45.0, -5.0, 0.0, 5.0, 30.0, 60.0, 89.0] {
            let phi = (lat_deg as f64).to_radians();
            let ts = tsfn(phi, e);
            let back = phi_from_ts(ts, e).unwrap();
            assert_relative_eq!(back, phi, epsilon = 1e-11);
        }
    }

    #[test]
    fn test_tsfn_monotone() {
        let e = WGS84.eccentricity();
        // t decreases from 1 at the equator towards 0 at the north pole.
        assert_relative_eq!(tsfn(0.0, e), 1.0, epsilon = 1e-15);
        assert!(tsfn(1.0, e) < tsfn(0.5, e));
        assert!(tsfn(0.5, e) < 1.0);
        assert!(tsfn(-0.5, e) > 1.0);
    }

    #[test]
    fn test_msfn_known_values() {
        // m(0) = 1, m(π/2) = 0 on any ellipsoid.
        assert_relative_eq!(msfn(0.0, WGS84.e2), 1.0);
        assert_relative_eq!(msfn(FRAC_PI_2, WGS84.e2), 0.0, epsilon = 1e-15);
    }

    #[test]
    fn test_dpsi_dphi_matches_difference_quotient() {
        let e2 = WGS84.e2;
        let e = WGS84.eccentricity();
        let h = 1e-7;
        for lat_deg in [-60.0, -10.0, 15.0, 45.0, 75.0] {
            let phi = (lat_deg as f64).to_radians();
            let psi = |p: f64| -tsfn(p, e).ln();
            let numeric = (psi(phi + h) - psi(phi - h)) / (2.0 * h);
            assert_relative_eq!(dpsi_dphi(phi, e2), numeric, epsilon = 1e-6);
        }
    }

    #[test]
    fn test_authalic_roundtrip() {
        let e = WGS84.eccentricity();
        for lat_deg in [-89.0, -45.0, 0.0, 20.0, 52.5, 88.0] {
            let phi = (lat_deg as f64).to_radians();
            let beta = authalic_latitude(phi, e);
            // β is slightly closer to the equator than φ.
            assert!(beta.abs() <= phi.abs() + 1e-15);
            let back = phi_from_authalic(beta, e).unwrap();
            assert_relative_eq!(back, phi, epsilon = 1e-11);
        }
    }

    #[test]
    fn test_authalic_pole_exact() {
        let e = WGS84.eccentricity();
        assert_relative_eq!(authalic_latitude(FRAC_PI_2, e), FRAC_PI_2);
        assert_relative_eq!(
            phi_from_authalic(FRAC_PI_2, e).unwrap(),
            FRAC_PI_2
        );
    }

    #[test]
    fn test_dqsfn_matches_difference_quotient() {
        let e = WGS84.eccentricity();
        let h = 1e-7;
        for lat_deg in [-70.0, -30.0, 0.0, 41.0, 80.0] {
            let phi = (lat_deg as f64).to_radians();
            let numeric = (qsfn(phi + h, e) - qsfn(phi - h, e)) / (2.0 * h);
            assert_relative_eq!(dqsfn_dphi(phi, e), numeric, epsilon = 1e-6);
        }
    }

    #[test]
    fn test_spherical_degeneration() {
        // e = 0: q = 2·sinφ and β = φ.
        assert_relative_eq!(qsfn(0.5, 0.0), 2.0 * 0.5f64.sin());
        assert_relative_eq!(authalic_latitude(0.7, 0.0), 0.7);
        assert_relative_eq!(phi_from_authalic(0.7, 0.0).unwrap(), 0.7);
    }
}
