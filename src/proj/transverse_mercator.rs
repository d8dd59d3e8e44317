//! Transverse Mercator kernel — Krüger n-series, 6th order.
//!
//! Karney (2011) formulation with 6th-order α/β series coefficients,
//! normalized to a unit semi-major axis (UTM scale factor and false
//! offsets live in the factory's denormalize step).
//!
//! The Jacobian is analytic: (ξ, η) is a conformal function of the
//! isometric latitude ψ and longitude λ, so the full 2×2 matrix follows
//! from the complex series derivative 1 + Σ 2j·αⱼ·cos(2j·ζ′) (Karney
//! eq. 23) times dζ′/d(ψ+iλ), with the real chain factor dψ/dφ.

use std::f64::consts::{FRAC_PI_2, PI};

use crate::domain::Envelope;
use crate::error::TransformError;
use crate::proj::common::{dpsi_dphi, ITERATION_TOLERANCE, MAX_ITERATIONS};
use crate::proj::ellipsoid::Ellipsoid;
use crate::proj::NormalizedProjection;

pub struct TransverseMercator {
    ellipsoid: Ellipsoid,
    e: f64,
    /// A/a = 1/(1+n) · (1 + n²/4 + n⁴/64), the rectifying radius over a.
    a_hat: f64,
    alpha: [f64; 6], // Forward series coefficients
    beta: [f64; 6],  // Inverse series coefficients
    m0: f64,         // Normalized meridional arc at lat0
}

impl TransverseMercator {
    pub fn new(ellipsoid: Ellipsoid, lat0: f64) -> Self {
        let n = ellipsoid.n;
        let n2 = n * n;
        let n3 = n2 * n;
        let n4 = n3 * n;
        let n5 = n4 * n;
        let n6 = n5 * n;

        let a_hat = 1.0 / (1.0 + n) * (1.0 + n2 / 4.0 + n4 / 64.0);
        let alpha = Self::alpha_coefficients(n, n2, n3, n4, n5, n6);
        let beta = Self::beta_coefficients(n, n2, n3, n4, n5, n6);
        let m0 = Self::meridional_arc_normalized(lat0, n);

        Self {
            ellipsoid,
            e: ellipsoid.eccentricity(),
            a_hat,
            alpha,
            beta,
            m0,
        }
    }

    /// Forward series coefficients α₁..α₆ (Krüger, 6th order).
    fn alpha_coefficients(n: f64, n2: f64, n3: f64, n4: f64, n5: f64, n6: f64) -> [f64; 6] {
        [
            // α₁
            n / 2.0 - 2.0 / 3.0 * n2 + 5.0 / 16.0 * n3 + 41.0 / 180.0 * n4 - 127.0 / 288.0 * n5
                + 7891.0 / 37800.0 * n6,
            // α₂
            13.0 / 48.0 * n2 - 3.0 / 5.0 * n3 + 557.0 / 1440.0 * n4 + 281.0 / 630.0 * n5
                - 1983433.0 / 1935360.0 * n6,
            // α₃
            61.0 / 240.0 * n3 - 103.0 / 140.0 * n4
                + 15061.0 / 26880.0 * n5
                + 167603.0 / 181440.0 * n6,
            // α₄
            49561.0 / 161280.0 * n4 - 179.0 / 168.0 * n5 + 6601661.0 / 7257600.0 * n6,
            // α₅
            34729.0 / 80640.0 * n5 - 3418889.0 / 1995840.0 * n6,
            // α₆
            212378941.0 / 319334400.0 * n6,
        ]
    }

    /// Inverse series coefficients β₁..β₆ (Krüger, 6th order).
    fn beta_coefficients(n: f64, n2: f64, n3: f64, n4: f64, n5: f64, n6: f64) -> [f64; 6] {
        [
            // β₁
            n / 2.0 - 2.0 / 3.0 * n2 + 37.0 / 96.0 * n3 - 1.0 / 360.0 * n4 - 81.0 / 512.0 * n5
                + 96199.0 / 604800.0 * n6,
            // β₂
            1.0 / 48.0 * n2 + 1.0 / 15.0 * n3 - 437.0 / 1440.0 * n4 + 46.0 / 105.0 * n5
                - 1118711.0 / 3870720.0 * n6,
            // β₃
            17.0 / 480.0 * n3 - 37.0 / 840.0 * n4 - 209.0 / 4480.0 * n5 + 5569.0 / 90720.0 * n6,
            // β₄
            4397.0 / 161280.0 * n4 - 11.0 / 504.0 * n5 - 830251.0 / 7257600.0 * n6,
            // β₅
            4583.0 / 161280.0 * n5 - 108847.0 / 3991680.0 * n6,
            // β₆
            20648693.0 / 638668800.0 * n6,
        ]
    }

    /// Normalized meridional arc distance (ξ₀).
    fn meridional_arc_normalized(phi: f64, n: f64) -> f64 {
        let n2 = n * n;
        let n3 = n2 * n;
        let n4 = n3 * n;

        let a2 = -3.0 / 2.0 * n + 9.0 / 16.0 * n3;
        let a4 = 15.0 / 16.0 * n2 - 15.0 / 32.0 * n4;
        let a6 = -35.0 / 48.0 * n3;
        let a8 = 315.0 / 512.0 * n4;

        phi + a2 * (2.0 * phi).sin()
            + a4 * (4.0 * phi).sin()
            + a6 * (6.0 * phi).sin()
            + a8 * (8.0 * phi).sin()
    }

    /// Convert geodetic tangent τ to conformal tangent τ'.
    fn tau_to_tau_prime(&self, tau: f64) -> f64 {
        let e = self.e;
        let tau1 = (1.0 + tau * tau).sqrt(); // = hypot(1, τ)
        let sigma = (e * (e * tau / tau1).atanh()).sinh();
        tau * (1.0 + sigma * sigma).sqrt() - sigma * tau1
    }

    /// Convert conformal tangent τ' back to geodetic tangent τ via
    /// Newton iteration.
    fn tau_prime_to_tau(&self, tau_prime: f64) -> Result<f64, TransformError> {
        let e = self.e;
        let e2 = self.ellipsoid.e2;
        let mut tau = tau_prime; // initial guess
        let mut delta = f64::MAX;

        for _ in 0..MAX_ITERATIONS {
            let tau1 = (1.0 + tau * tau).sqrt();
            let sigma = (e * (e * tau / tau1).atanh()).sinh();
            let tau_prime_est = tau * (1.0 + sigma * sigma).sqrt() - sigma * tau1;
            let dtau = (tau_prime - tau_prime_est) * (1.0 + (1.0 - e2) * tau * tau)
                / ((1.0 - e2) * tau1 * (1.0 + tau_prime_est * tau_prime_est).sqrt());
            tau += dtau;
            delta = dtau.abs();
            if delta < ITERATION_TOLERANCE * (1.0 + tau.abs()) {
                return Ok(tau);
            }
        }
        Err(TransformError::NonConvergence {
            iterations: MAX_ITERATIONS,
            delta,
        })
    }

    /// Gauss-Schreiber coordinates (ξ′, η′) for (λ, φ).
    fn xi_eta_prime(&self, lon: f64, lat: f64) -> (f64, f64) {
        let tau_prime = self.tau_to_tau_prime(lat.tan());
        let xi_prime = tau_prime.atan2(lon.cos());
        let eta_prime =
            (lon.sin() / (tau_prime * tau_prime + lon.cos() * lon.cos()).sqrt()).asinh();
        (xi_prime, eta_prime)
    }
}

impl NormalizedProjection for TransverseMercator {
    fn name(&self) -> &'static str {
        "Transverse Mercator"
    }

    fn ellipsoid(&self) -> &Ellipsoid {
        &self.ellipsoid
    }

    fn forward(&self, lon: f64, lat: f64) -> Result<(f64, f64), TransformError> {
        if FRAC_PI_2 - lat.abs() <= f64::EPSILON {
            return Err(TransformError::PoleSingularity { lon, lat });
        }
        let (xi_prime, eta_prime) = self.xi_eta_prime(lon, lat);

        // Apply α series (forward)
        let mut xi = xi_prime;
        let mut eta = eta_prime;
        for (j, &a) in self.alpha.iter().enumerate() {
            let k = 2.0 * (j as f64 + 1.0);
            xi += a * (k * xi_prime).sin() * (k * eta_prime).cosh();
            eta += a * (k * xi_prime).cos() * (k * eta_prime).sinh();
        }

        Ok((self.a_hat * eta, self.a_hat * (xi - self.m0)))
    }

    fn inverse(&self, x: f64, y: f64) -> Result<(f64, f64), TransformError> {
        let eta = x / self.a_hat;
        let xi = y / self.a_hat + self.m0;

        // Apply β series (inverse)
        let mut xi_prime = xi;
        let mut eta_prime = eta;
        for (j, &b) in self.beta.iter().enumerate() {
            let k = 2.0 * (j as f64 + 1.0);
            xi_prime -= b * (k * xi).sin() * (k * eta).cosh();
            eta_prime -= b * (k * xi).cos() * (k * eta).sinh();
        }

        // τ' = sin(ξ') / hypot(sinh(η'), cos(ξ'))
        let sinh_eta = eta_prime.sinh();
        let cos_xi = xi_prime.cos();
        let sin_xi = xi_prime.sin();
        let tau_prime = sin_xi / (sinh_eta * sinh_eta + cos_xi * cos_xi).sqrt();

        let tau = self.tau_prime_to_tau(tau_prime)?;

        Ok((sinh_eta.atan2(cos_xi), tau.atan()))
    }

    fn jacobian(&self, lon: f64, lat: f64) -> Result<[[f64; 2]; 2], TransformError> {
        if FRAC_PI_2 - lat.abs() <= f64::EPSILON {
            return Err(TransformError::PoleSingularity { lon, lat });
        }
        let tau_prime = self.tau_to_tau_prime(lat.tan());
        let (xi_prime, eta_prime) = self.xi_eta_prime(lon, lat);

        // dζ′/dz for ζ′ = ξ′ + iη′ analytic in z = ψ + iλ.
        let h2 = tau_prime * tau_prime + lon.cos() * lon.cos();
        let sec = (1.0 + tau_prime * tau_prime).sqrt();
        let dz_re = lon.cos() * sec / h2;
        let dz_im = -tau_prime * lon.sin() / h2;

        // Series derivative 1 + Σ 2j·αⱼ·cos(2j·ζ′), complex cosine.
        let mut s_re = 1.0;
        let mut s_im = 0.0;
        for (j, &a) in self.alpha.iter().enumerate() {
            let k = 2.0 * (j as f64 + 1.0);
            s_re += k * a * (k * xi_prime).cos() * (k * eta_prime).cosh();
            s_im -= k * a * (k * xi_prime).sin() * (k * eta_prime).sinh();
        }

        // W = U + iV = series · dζ′/dz = d(ξ+iη)/d(ψ+iλ).
        let u = s_re * dz_re - s_im * dz_im;
        let v = s_re * dz_im + s_im * dz_re;

        let dpsi = dpsi_dphi(lat, self.ellipsoid.e2);
        let a_hat = self.a_hat;
        // x = A·η, y = A·(ξ − ξ₀); ∂/∂λ = i·d/dz, ∂/∂φ = dψ/dφ · d/dz.
        Ok([
            [a_hat * u, a_hat * v * dpsi],
            [-a_hat * v, a_hat * u * dpsi],
        ])
    }

    /// Krüger series accuracy degrades away from the central meridian;
    /// the declared domain stops at ±30° of longitude and ±84° latitude
    /// (the UTM/UPS handover).
    fn domain(&self) -> Envelope {
        Envelope::new_2d(
            -30.0 * PI / 180.0,
            -84.0 * PI / 180.0,
            30.0 * PI / 180.0,
            84.0 * PI / 180.0,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::proj::ellipsoid::WGS84;
    use crate::proj::test_support::{assert_jacobian_consistent, assert_roundtrip};
    use approx::assert_relative_eq;

    const UTM_K0: f64 = 0.9996;

    #[test]
    fn test_roundtrip() {
        let tm = TransverseMercator::new(WGS84, 0.0);
        // Longitudes are relative to the central meridian.
        let cases: &[(f64, f64)] = &[
            (0.0, 52.0),
            (-3.0, 50.0),
            (3.0, 50.0),
            (0.0, 0.0),
            (0.0, 80.0),
            (-1.5, 52.5),
            (2.0, -30.0),
        ];
        assert_roundtrip(&tm, cases, 1e-9);
    }

    #[test]
    fn test_central_meridian_maps_to_x_zero() {
        let tm = TransverseMercator::new(WGS84, 0.0);
        let (x, _) = tm.forward(0.0, 45.0_f64.to_radians()).unwrap();
        assert_relative_eq!(x, 0.0, epsilon = 1e-12);
    }

    #[test]
    fn test_utm_northing_reference() {
        // (15°E, 52°N) in UTM 33N: northing 5761038.21 m (PROJ). The
        // kernel sees λ relative to the 15°E central meridian, and the
        // UTM scale/semi-major live outside the kernel.
        let tm = TransverseMercator::new(WGS84, 0.0);
        let (x, y) = tm.forward(0.0, 52.0_f64.to_radians()).unwrap();
        assert_relative_eq!(x * WGS84.a * UTM_K0, 0.0, epsilon = 1e-6);
        assert_relative_eq!(y * WGS84.a * UTM_K0, 5_761_038.212, epsilon = 0.05);
    }

    #[test]
    fn test_off_meridian_easting_range() {
        // 2° east of the central meridian at 45°N is ~157km easting.
        let tm = TransverseMercator::new(WGS84, 0.0);
        let (x, _) = tm
            .forward(2.0_f64.to_radians(), 45.0_f64.to_radians())
            .unwrap();
        let easting = x * WGS84.a * UTM_K0;
        assert!(easting > 150_000.0 && easting < 165_000.0, "easting = {easting}");
    }

    #[test]
    fn test_nonzero_origin_latitude() {
        let tm = TransverseMercator::new(WGS84, 45.0_f64.to_radians());
        let (_, y) = tm.forward(0.0, 45.0_f64.to_radians()).unwrap();
        assert_relative_eq!(y, 0.0, epsilon = 1e-12);
        let (lon, lat) = tm.inverse(0.0, 0.0).unwrap();
        assert_relative_eq!(lon, 0.0, epsilon = 1e-12);
        assert_relative_eq!(lat, 45.0_f64.to_radians(), epsilon = 1e-11);
    }

    #[test]
    fn test_jacobian_consistent() {
        let tm = TransverseMercator::new(WGS84, 0.0);
        assert_jacobian_consistent(
            &tm,
            &[(0.0, 0.0), (2.0, 45.0), (-2.5, 60.0), (1.0, -35.0)],
            1e-6,
        );
    }

    #[test]
    fn test_jacobian_is_conformal() {
        // A conformal projection's Jacobian in (λ, ψ) space is a scaled
        // rotation; in (λ, φ) the columns stay orthogonal after removing
        // the dψ/dφ factor.
        let tm = TransverseMercator::new(WGS84, 0.0);
        let lat = 52.0_f64.to_radians();
        let j = tm.jacobian(1.5_f64.to_radians(), lat).unwrap();
        let dpsi = dpsi_dphi(lat, WGS84.e2);
        // Cauchy-Riemann: ∂x/∂λ = ∂y/∂ψ and ∂x/∂ψ = −∂y/∂λ.
        assert_relative_eq!(j[0][0], j[1][1] / dpsi, epsilon = 1e-12);
        assert_relative_eq!(j[0][1] / dpsi, -j[1][0], epsilon = 1e-12);
    }

    #[test]
    fn test_pole_reports_singularity() {
        let tm = TransverseMercator::new(WGS84, 0.0);
        assert!(matches!(
            tm.forward(0.0, FRAC_PI_2),
            Err(TransformError::PoleSingularity { .. })
        ));
    }
}
