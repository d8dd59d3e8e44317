//! Lambert Conformal Conic kernel (1SP and 2SP).
//!
//! Snyder (1987) §15. Meridians are straight lines converging at the
//! cone apex, parallels are concentric arcs of radius ρ = F·tⁿ. Because
//! the projection is conformal, ρ is F·e^(−nψ) in the isometric
//! latitude ψ, which gives the closed-form radial derivative
//! dρ/dφ = −n·ρ·dψ/dφ used by the Jacobian.

use std::f64::consts::{FRAC_PI_2, FRAC_PI_4, PI};

use crate::domain::Envelope;
use crate::error::{FactoryError, TransformError};
use crate::proj::common::{msfn, phi_from_ts, tsfn, dpsi_dphi};
use crate::proj::ellipsoid::Ellipsoid;
use crate::proj::NormalizedProjection;

pub struct LambertConformalConic {
    ellipsoid: Ellipsoid,
    e: f64,
    /// Cone constant, sin(φ₁) for the tangent case. Negative in the
    /// southern hemisphere.
    n: f64,
    f: f64,
    rho0: f64,
}

impl LambertConformalConic {
    /// Single standard parallel (tangent cone), which is also the
    /// latitude of origin.
    pub fn tangent(ellipsoid: Ellipsoid, lat1: f64) -> Result<Self, FactoryError> {
        if FRAC_PI_2 - lat1.abs() <= f64::EPSILON || lat1.abs() < f64::EPSILON {
            return Err(FactoryError::invalid_parameter(
                "latitude_of_origin",
                "tangent cone requires a non-polar, non-equatorial standard parallel",
            ));
        }
        let e = ellipsoid.eccentricity();
        let n = lat1.sin();
        let m1 = msfn(lat1, ellipsoid.e2);
        let t1 = tsfn(lat1, e);
        let f = m1 / (n * t1.powf(n));
        let rho0 = f * t1.powf(n);
        Ok(Self { ellipsoid, e, n, f, rho0 })
    }

    /// Two standard parallels (secant cone) with a separate latitude of
    /// origin for the northing datum.
    pub fn secant(
        ellipsoid: Ellipsoid,
        lat1: f64,
        lat2: f64,
        lat0: f64,
    ) -> Result<Self, FactoryError> {
        if FRAC_PI_2 - lat1.abs() <= f64::EPSILON || FRAC_PI_2 - lat2.abs() <= f64::EPSILON {
            return Err(FactoryError::invalid_parameter(
                "standard_parallel",
                "standard parallels must not touch a pole",
            ));
        }
        if (lat1 + lat2).abs() < f64::EPSILON {
            return Err(FactoryError::invalid_parameter(
                "standard_parallel",
                "standard parallels symmetric about the equator give a zero cone constant",
            ));
        }
        let e = ellipsoid.eccentricity();
        let m1 = msfn(lat1, ellipsoid.e2);
        let t1 = tsfn(lat1, e);
        let n = if (lat1 - lat2).abs() < f64::EPSILON {
            lat1.sin()
        } else {
            let m2 = msfn(lat2, ellipsoid.e2);
            let t2 = tsfn(lat2, e);
            (m1.ln() - m2.ln()) / (t1.ln() - t2.ln())
        };
        let f = m1 / (n * t1.powf(n));
        let t0 = tsfn(lat0, e);
        let rho0 = f * t0.powf(n);
        Ok(Self { ellipsoid, e, n, f, rho0 })
    }

    fn rho(&self, lat: f64) -> f64 {
        self.f * tsfn(lat, self.e).powf(self.n)
    }
}

impl NormalizedProjection for LambertConformalConic {
    fn name(&self) -> &'static str {
        "Lambert Conformal Conic"
    }

    fn ellipsoid(&self) -> &Ellipsoid {
        &self.ellipsoid
    }

    fn forward(&self, lon: f64, lat: f64) -> Result<(f64, f64), TransformError> {
        // The pole away from the cone apex maps to infinity.
        if FRAC_PI_2 - lat.abs() <= f64::EPSILON && lat * self.n < 0.0 {
            return Err(TransformError::PoleSingularity { lon, lat });
        }
        let rho = self.rho(lat);
        let theta = self.n * lon;
        Ok((rho * theta.sin(), self.rho0 - rho * theta.cos()))
    }

    fn inverse(&self, x: f64, y: f64) -> Result<(f64, f64), TransformError> {
        let mut xp = x;
        let mut yp = self.rho0 - y;
        let mut rho = (xp * xp + yp * yp).sqrt();
        if self.n < 0.0 {
            rho = -rho;
            xp = -xp;
            yp = -yp;
        }
        if rho == 0.0 {
            // Cone apex.
            return Ok((0.0, FRAC_PI_2.copysign(self.n)));
        }
        let theta = xp.atan2(yp);
        let t = (rho / self.f).powf(1.0 / self.n);
        let lat = phi_from_ts(t, self.e)?;
        Ok((theta / self.n, lat))
    }

    fn jacobian(&self, lon: f64, lat: f64) -> Result<[[f64; 2]; 2], TransformError> {
        if FRAC_PI_2 - lat.abs() <= f64::EPSILON {
            return Err(TransformError::PoleSingularity { lon, lat });
        }
        let rho = self.rho(lat);
        let theta = self.n * lon;
        let (sin_t, cos_t) = theta.sin_cos();
        let drho_dphi = -self.n * rho * dpsi_dphi(lat, self.ellipsoid.e2);
        Ok([
            [rho * self.n * cos_t, drho_dphi * sin_t],
            [rho * self.n * sin_t, -drho_dphi * cos_t],
        ])
    }

    fn domain(&self) -> Envelope {
        // Stay away from the anti-apex pole; the far hemisphere is
        // severely distorted anyway.
        let (lat_min, lat_max) = if self.n >= 0.0 {
            (-FRAC_PI_4, FRAC_PI_2 - 1e-10)
        } else {
            (-FRAC_PI_2 + 1e-10, FRAC_PI_4)
        };
        Envelope::new_2d(-PI, lat_min, PI, lat_max)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::proj::ellipsoid::{GRS80, WGS84};
    use crate::proj::test_support::{assert_jacobian_consistent, assert_roundtrip};
    use approx::assert_relative_eq;

    fn conus() -> LambertConformalConic {
        LambertConformalConic::secant(
            GRS80,
            33.0_f64.to_radians(),
            45.0_f64.to_radians(),
            39.0_f64.to_radians(),
        )
        .unwrap()
    }

    #[test]
    fn test_origin_maps_to_zero() {
        let lcc = conus();
        let (x, y) = lcc.forward(0.0, 39.0_f64.to_radians()).unwrap();
        assert_relative_eq!(x, 0.0, epsilon = 1e-12);
        assert_relative_eq!(y, 0.0, epsilon = 1e-12);
    }

    #[test]
    fn test_roundtrip() {
        let lcc = conus();
        let cases: &[(f64, f64)] = &[
            (0.0, 39.0),
            (-10.0, 35.0),
            (10.0, 48.0),
            (-25.0, 20.0),
            (5.0, 60.0),
        ];
        assert_roundtrip(&lcc, cases, 1e-9);
    }

    #[test]
    fn test_unit_scale_on_standard_parallels() {
        // Point scale k = n·ρ / m(φ) must be exactly 1 on both
        // standard parallels and below 1 between them where the cone
        // cuts inside the ellipsoid.
        let lcc = conus();
        for lat_deg in [33.0_f64, 45.0] {
            let lat = lat_deg.to_radians();
            let j = lcc.jacobian(0.0, lat).unwrap();
            let k = j[0][0] / msfn(lat, GRS80.e2);
            assert_relative_eq!(k, 1.0, epsilon = 1e-12);
        }
        let lat = 39.0_f64.to_radians();
        let j = lcc.jacobian(0.0, lat).unwrap();
        assert!(j[0][0] / msfn(lat, GRS80.e2) < 1.0);
    }

    #[test]
    fn test_tangent_cone() {
        let lcc = LambertConformalConic::tangent(WGS84, 49.0_f64.to_radians()).unwrap();
        assert_relative_eq!(lcc.n, 49.0_f64.to_radians().sin(), epsilon = 1e-15);
        assert_roundtrip(&lcc, &[(0.0, 49.0), (-5.0, 45.0), (8.0, 55.0)], 1e-9);
    }

    #[test]
    fn test_southern_hemisphere() {
        let lcc = LambertConformalConic::secant(
            WGS84,
            (-30.0_f64).to_radians(),
            (-45.0_f64).to_radians(),
            (-38.0_f64).to_radians(),
        )
        .unwrap();
        assert!(lcc.n < 0.0);
        assert_roundtrip(&lcc, &[(0.0, -38.0), (12.0, -30.0), (-8.0, -50.0)], 1e-9);
        // Northward displacement still increases y.
        let (_, y1) = lcc.forward(0.0, (-40.0_f64).to_radians()).unwrap();
        let (_, y2) = lcc.forward(0.0, (-36.0_f64).to_radians()).unwrap();
        assert!(y2 > y1);
    }

    #[test]
    fn test_apex_inverse() {
        let lcc = conus();
        // ρ = 0 is the cone apex, which the inverse maps to the pole.
        let (lon, lat) = lcc.inverse(0.0, lcc.rho0).unwrap();
        assert_relative_eq!(lon, 0.0);
        assert_relative_eq!(lat, FRAC_PI_2);
    }

    #[test]
    fn test_symmetric_parallels_rejected() {
        let err = LambertConformalConic::secant(
            WGS84,
            30.0_f64.to_radians(),
            (-30.0_f64).to_radians(),
            0.0,
        );
        assert!(matches!(err, Err(FactoryError::InvalidParameter { .. })));
    }

    #[test]
    fn test_far_pole_is_singular() {
        let lcc = conus();
        assert!(matches!(
            lcc.forward(0.0, -FRAC_PI_2),
            Err(TransformError::PoleSingularity { .. })
        ));
    }

    #[test]
    fn test_jacobian_consistent() {
        let lcc = conus();
        assert_jacobian_consistent(
            &lcc,
            &[(0.0, 39.0), (-10.0, 35.0), (15.0, 50.0), (-3.0, 25.0)],
            1e-6,
        );
    }
}
