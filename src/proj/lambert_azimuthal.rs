//! Lambert Azimuthal Equal-Area kernel.
//!
//! Snyder (1987) §24, ellipsoidal form via the authalic sphere: geodetic
//! latitude maps to authalic latitude β with q = qsfn(φ), then the
//! spherical equal-area formulas apply on a sphere of radius
//! Rq = √(qₚ/2). The oblique and equatorial aspects share one code
//! path; the polar aspects use the ρ = √(qₚ ∓ q) closed form.

use std::f64::consts::{FRAC_PI_2, PI};

use crate::domain::Envelope;
use crate::error::TransformError;
use crate::proj::common::{
    authalic_latitude, dqsfn_dphi, msfn, phi_from_authalic, qp, qsfn,
};
use crate::proj::ellipsoid::Ellipsoid;
use crate::proj::NormalizedProjection;

/// Below this the forward point is effectively antipodal to the
/// projection centre and the mapping blows up.
const ANTIPODAL_GUARD: f64 = 1e-10;

enum Aspect {
    Oblique {
        sin_b1: f64,
        cos_b1: f64,
        /// D = m₁/(Rq·cosβ₁), the Snyder shape factor that keeps the
        /// projection equal-area off the sphere.
        d: f64,
    },
    NorthPolar,
    SouthPolar,
}

pub struct LambertAzimuthalEqualArea {
    ellipsoid: Ellipsoid,
    e: f64,
    lat0: f64,
    qp: f64,
    rq: f64,
    aspect: Aspect,
}

impl LambertAzimuthalEqualArea {
    pub fn new(ellipsoid: Ellipsoid, lat0: f64) -> Self {
        let e = ellipsoid.eccentricity();
        let qp = qp(e);
        let rq = (qp / 2.0).sqrt();
        let aspect = if FRAC_PI_2 - lat0.abs() <= f64::EPSILON {
            if lat0 > 0.0 {
                Aspect::NorthPolar
            } else {
                Aspect::SouthPolar
            }
        } else {
            let b1 = authalic_latitude(lat0, e);
            let m1 = msfn(lat0, ellipsoid.e2);
            Aspect::Oblique {
                sin_b1: b1.sin(),
                cos_b1: b1.cos(),
                d: m1 / (rq * b1.cos()),
            }
        };
        Self { ellipsoid, e, lat0, qp, rq, aspect }
    }

    /// dβ/dφ, the authalic chain factor for the φ column of the
    /// Jacobian.
    fn dbeta_dphi(&self, lat: f64, beta: f64) -> f64 {
        dqsfn_dphi(lat, self.e) / (self.qp * beta.cos())
    }
}

impl NormalizedProjection for LambertAzimuthalEqualArea {
    fn name(&self) -> &'static str {
        "Lambert Azimuthal Equal Area"
    }

    fn ellipsoid(&self) -> &Ellipsoid {
        &self.ellipsoid
    }

    fn forward(&self, lon: f64, lat: f64) -> Result<(f64, f64), TransformError> {
        let q = qsfn(lat, self.e);
        match self.aspect {
            Aspect::Oblique { sin_b1, cos_b1, d } => {
                let beta = authalic_latitude(lat, self.e);
                let (sin_b, cos_b) = beta.sin_cos();
                let s = 1.0 + sin_b1 * sin_b + cos_b1 * cos_b * lon.cos();
                if s < ANTIPODAL_GUARD {
                    return Err(TransformError::DomainExceeded { x: lon, y: lat });
                }
                let b = (2.0 / s).sqrt();
                let x = self.rq * d * b * cos_b * lon.sin();
                let y = (self.rq / d) * b * (cos_b1 * sin_b - sin_b1 * cos_b * lon.cos());
                Ok((x, y))
            }
            Aspect::NorthPolar => {
                let rho = (self.qp - q).max(0.0).sqrt();
                Ok((rho * lon.sin(), -rho * lon.cos()))
            }
            Aspect::SouthPolar => {
                let rho = (self.qp + q).max(0.0).sqrt();
                Ok((rho * lon.sin(), rho * lon.cos()))
            }
        }
    }

    fn inverse(&self, x: f64, y: f64) -> Result<(f64, f64), TransformError> {
        match self.aspect {
            Aspect::Oblique { sin_b1, cos_b1, d } => {
                let xd = x / d;
                let yd = y * d;
                let rho = (xd * xd + yd * yd).sqrt();
                if rho < ANTIPODAL_GUARD {
                    return Ok((0.0, self.lat0));
                }
                let half = rho / (2.0 * self.rq);
                if half > 1.0 {
                    return Err(TransformError::DomainExceeded { x, y });
                }
                let ce = 2.0 * half.asin();
                let (sin_ce, cos_ce) = ce.sin_cos();
                let sin_b = cos_ce * sin_b1 + yd * sin_ce * cos_b1 / rho;
                let lon = (x * sin_ce)
                    .atan2(d * rho * cos_b1 * cos_ce - d * yd * sin_b1 * sin_ce);
                let lat = phi_from_authalic(sin_b.clamp(-1.0, 1.0).asin(), self.e)?;
                Ok((lon, lat))
            }
            Aspect::NorthPolar | Aspect::SouthPolar => {
                let north = matches!(self.aspect, Aspect::NorthPolar);
                let rho2 = x * x + y * y;
                if rho2 > 2.0 * self.qp {
                    return Err(TransformError::DomainExceeded { x, y });
                }
                let q = if north { self.qp - rho2 } else { rho2 - self.qp };
                if rho2 == 0.0 {
                    return Ok((0.0, self.lat0));
                }
                let beta = (q / self.qp).clamp(-1.0, 1.0).asin();
                let lat = phi_from_authalic(beta, self.e)?;
                let lon = if north { x.atan2(-y) } else { x.atan2(y) };
                Ok((lon, lat))
            }
        }
    }

    fn jacobian(&self, lon: f64, lat: f64) -> Result<[[f64; 2]; 2], TransformError> {
        let q = qsfn(lat, self.e);
        match self.aspect {
            Aspect::Oblique { sin_b1, cos_b1, d } => {
                let beta = authalic_latitude(lat, self.e);
                let (sin_b, cos_b) = beta.sin_cos();
                let (sin_l, cos_l) = lon.sin_cos();
                let s = 1.0 + sin_b1 * sin_b + cos_b1 * cos_b * cos_l;
                if s < ANTIPODAL_GUARD {
                    return Err(TransformError::DomainExceeded { x: lon, y: lat });
                }
                let b = (2.0 / s).sqrt();

                // ∂S and the induced ∂k with k = √(2/S).
                let ds_dl = -cos_b1 * cos_b * sin_l;
                let ds_db = sin_b1 * cos_b - cos_b1 * sin_b * cos_l;
                let db_dl = -(b / (2.0 * s)) * ds_dl;
                let db_db = -(b / (2.0 * s)) * ds_db;

                let n = cos_b1 * sin_b - sin_b1 * cos_b * cos_l;
                let dn_dl = sin_b1 * cos_b * sin_l;
                let dn_db = cos_b1 * cos_b + sin_b1 * sin_b * cos_l;

                let cx = self.rq * d;
                let cy = self.rq / d;
                // Partials in (λ, β), then the β column is scaled by
                // dβ/dφ.
                let dx_dl = cx * (db_dl * cos_b * sin_l + b * cos_b * cos_l);
                let dx_db = cx * (db_db * cos_b * sin_l - b * sin_b * sin_l);
                let dy_dl = cy * (db_dl * n + b * dn_dl);
                let dy_db = cy * (db_db * n + b * dn_db);

                let chain = self.dbeta_dphi(lat, beta);
                Ok([[dx_dl, dx_db * chain], [dy_dl, dy_db * chain]])
            }
            Aspect::NorthPolar | Aspect::SouthPolar => {
                let north = matches!(self.aspect, Aspect::NorthPolar);
                let rho2 = if north { self.qp - q } else { self.qp + q };
                if rho2 <= 0.0 {
                    return Err(TransformError::PoleSingularity { lon, lat });
                }
                let rho = rho2.sqrt();
                let (sin_l, cos_l) = lon.sin_cos();
                let qd = dqsfn_dphi(lat, self.e);
                // ρ² = qₚ ∓ q, so ∂ρ/∂φ = ∓q′/(2ρ).
                let drho = if north { -qd / (2.0 * rho) } else { qd / (2.0 * rho) };
                if north {
                    Ok([
                        [rho * cos_l, drho * sin_l],
                        [rho * sin_l, -drho * cos_l],
                    ])
                } else {
                    Ok([
                        [rho * cos_l, drho * sin_l],
                        [-rho * sin_l, drho * cos_l],
                    ])
                }
            }
        }
    }

    fn domain(&self) -> Envelope {
        // The full hemisphere around the centre is well conditioned;
        // beyond ~90° of angular distance distortion grows without
        // bound, so the declared domain keeps longitude to a
        // half-world.
        Envelope::new_2d(-PI / 2.0, -FRAC_PI_2, PI / 2.0, FRAC_PI_2)
    }
}
