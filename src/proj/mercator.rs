//! Mercator kernels — spherical, ellipsoidal and authalic variants.
//!
//! Normalized formulas (unit radius, central meridian 0):
//!   spherical:   x = λ, y = atanh(sin φ)
//!   ellipsoidal: x = λ, y = ψ(φ) = −ln t(φ)    (isometric latitude)
//!   authalic:    x = λ, y = atanh(sin β(φ))    (spherical form on the
//!                authalic sphere)
//!
//! All three are undefined at the poles; the exact poles report
//! `PoleSingularity`, and the declared domain stops at ±89°.

use std::f64::consts::{FRAC_PI_2, PI};

use crate::domain::Envelope;
use crate::error::TransformError;
use crate::proj::common::{
    authalic_latitude, dpsi_dphi, dqsfn_dphi, phi_from_authalic, phi_from_ts, qp, tsfn,
};
use crate::proj::ellipsoid::{Ellipsoid, SPHERE};
use crate::proj::NormalizedProjection;

/// Latitude bound of the declared Mercator domain (89°).
const MAX_LAT: f64 = 89.0 * PI / 180.0;

fn mercator_domain() -> Envelope {
    Envelope::new_2d(-PI, -MAX_LAT, PI, MAX_LAT)
}

fn check_pole(lon: f64, lat: f64) -> Result<(), TransformError> {
    if FRAC_PI_2 - lat.abs() <= f64::EPSILON {
        return Err(TransformError::PoleSingularity { lon, lat });
    }
    Ok(())
}

/// Spherical Mercator, closed form in both directions.
#[derive(Debug, Default)]
pub struct Mercator;

impl NormalizedProjection for Mercator {
    fn name(&self) -> &'static str {
        "Mercator (spherical)"
    }

    fn ellipsoid(&self) -> &Ellipsoid {
        &SPHERE
    }

    fn forward(&self, lon: f64, lat: f64) -> Result<(f64, f64), TransformError> {
        check_pole(lon, lat)?;
        Ok((lon, lat.sin().atanh()))
    }

    fn inverse(&self, x: f64, y: f64) -> Result<(f64, f64), TransformError> {
        Ok((x, y.sinh().atan()))
    }

    fn jacobian(&self, lon: f64, lat: f64) -> Result<[[f64; 2]; 2], TransformError> {
        check_pole(lon, lat)?;
        Ok([[1.0, 0.0], [0.0, 1.0 / lat.cos()]])
    }

    fn domain(&self) -> Envelope {
        mercator_domain()
    }
}

/// Ellipsoidal Mercator through the isometric latitude; the inverse
/// iterates `phi_from_ts`.
pub struct EllipsoidalMercator {
    ellipsoid: Ellipsoid,
    e: f64,
}

impl EllipsoidalMercator {
    pub fn new(ellipsoid: Ellipsoid) -> Self {
        let e = ellipsoid.eccentricity();
        Self { ellipsoid, e }
    }
}

impl NormalizedProjection for EllipsoidalMercator {
    fn name(&self) -> &'static str {
        "Mercator"
    }

    fn ellipsoid(&self) -> &Ellipsoid {
        &self.ellipsoid
    }

    fn forward(&self, lon: f64, lat: f64) -> Result<(f64, f64), TransformError> {
        check_pole(lon, lat)?;
        Ok((lon, -tsfn(lat, self.e).ln()))
    }

    fn inverse(&self, x: f64, y: f64) -> Result<(f64, f64), TransformError> {
        let lat = phi_from_ts((-y).exp(), self.e)?;
        Ok((x, lat))
    }

    fn jacobian(&self, lon: f64, lat: f64) -> Result<[[f64; 2]; 2], TransformError> {
        check_pole(lon, lat)?;
        Ok([[1.0, 0.0], [0.0, dpsi_dphi(lat, self.ellipsoid.e2)]])
    }

    fn domain(&self) -> Envelope {
        mercator_domain()
    }
}

/// Mercator on the authalic sphere: the spherical formula applied to
/// the authalic latitude β. Equal-area-consistent with the other
/// authalic kernels since it shares their β conversion.
pub struct AuthalicMercator {
    ellipsoid: Ellipsoid,
    e: f64,
    qp: f64,
}

impl AuthalicMercator {
    pub fn new(ellipsoid: Ellipsoid) -> Self {
        let e = ellipsoid.eccentricity();
        Self {
            ellipsoid,
            e,
            qp: qp(e),
        }
    }
}

impl NormalizedProjection for AuthalicMercator {
    fn name(&self) -> &'static str {
        "Authalic Mercator"
    }

    fn ellipsoid(&self) -> &Ellipsoid {
        &self.ellipsoid
    }

    fn forward(&self, lon: f64, lat: f64) -> Result<(f64, f64), TransformError> {
        check_pole(lon, lat)?;
        let beta = authalic_latitude(lat, self.e);
        Ok((lon, beta.sin().atanh()))
    }

    fn inverse(&self, x: f64, y: f64) -> Result<(f64, f64), TransformError> {
        let beta = y.tanh().asin();
        let lat = phi_from_authalic(beta, self.e)?;
        Ok((x, lat))
    }

    fn jacobian(&self, lon: f64, lat: f64) -> Result<[[f64; 2]; 2], TransformError> {
        check_pole(lon, lat)?;
        // dy/dφ = (1/cosβ)·dβ/dφ with dβ/dφ = q′(φ)/(qp·cosβ).
        let beta = authalic_latitude(lat, self.e);
        let cos_beta = beta.cos();
        let dy_dlat = dqsfn_dphi(lat, self.e) / (self.qp * cos_beta * cos_beta);
        Ok([[1.0, 0.0], [0.0, dy_dlat]])
    }

    fn domain(&self) -> Envelope {
        mercator_domain()
    }
}
