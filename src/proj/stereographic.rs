//! Polar Stereographic kernel (variants A/B).
//!
//! Snyder (1987) §21, ellipsoidal form. The kernel maps the polar
//! aspect at natural scale, ρ = C·t with C = 2/√((1+e)^(1+e)·(1−e)^(1−e));
//! the scale factor at the pole or the equivalent k₀ derived from a
//! standard parallel is applied outside the kernel, together with the
//! semi-major axis and false offsets.

use std::f64::consts::{FRAC_PI_2, PI};

use crate::domain::Envelope;
use crate::error::TransformError;
use crate::proj::common::{dpsi_dphi, msfn, phi_from_ts, tsfn};
use crate::proj::ellipsoid::Ellipsoid;
use crate::proj::NormalizedProjection;

pub struct PolarStereographic {
    ellipsoid: Ellipsoid,
    e: f64,
    north: bool,
    /// ρ = c·t, the conformal radius constant.
    c: f64,
}

impl PolarStereographic {
    pub fn new(ellipsoid: Ellipsoid, north: bool) -> Self {
        let e = ellipsoid.eccentricity();
        let c = 2.0 / ((1.0 + e).powf(1.0 + e) * (1.0 - e).powf(1.0 - e)).sqrt();
        Self { ellipsoid, e, north, c }
    }

    /// Scale factor equivalent to a standard parallel (variant B): the
    /// k₀ that makes the projection true to scale at `lat_ts`. The
    /// factory folds this into the denormalize affine.
    pub fn scale_at(&self, lat_ts: f64) -> f64 {
        let lat = if self.north { lat_ts } else { -lat_ts.abs() };
        let lat = lat.abs();
        let m = msfn(lat, self.ellipsoid.e2);
        let t = tsfn(lat, self.e);
        m / (self.c * t)
    }

    /// Signed ρ helper: latitude folded into the projection hemisphere.
    fn rho(&self, lat: f64) -> f64 {
        let phi = if self.north { lat } else { -lat };
        self.c * tsfn(phi, self.e)
    }
}

impl NormalizedProjection for PolarStereographic {
    fn name(&self) -> &'static str {
        "Polar Stereographic"
    }

    fn ellipsoid(&self) -> &Ellipsoid {
        &self.ellipsoid
    }

    fn forward(&self, lon: f64, lat: f64) -> Result<(f64, f64), TransformError> {
        // The opposite pole maps to infinity.
        let opposite = if self.north { -FRAC_PI_2 } else { FRAC_PI_2 };
        if (lat - opposite).abs() <= f64::EPSILON {
            return Err(TransformError::PoleSingularity { lon, lat });
        }
        let rho = self.rho(lat);
        if self.north {
            Ok((rho * lon.sin(), -rho * lon.cos()))
        } else {
            Ok((rho * lon.sin(), rho * lon.cos()))
        }
    }

    fn inverse(&self, x: f64, y: f64) -> Result<(f64, f64), TransformError> {
        let rho = (x * x + y * y).sqrt();
        if rho == 0.0 {
            let pole = if self.north { FRAC_PI_2 } else { -FRAC_PI_2 };
            return Ok((0.0, pole));
        }
        let t = rho / self.c;
        let phi = phi_from_ts(t, self.e)?;
        if self.north {
            Ok((x.atan2(-y), phi))
        } else {
            Ok((x.atan2(y), -phi))
        }
    }

    fn jacobian(&self, lon: f64, lat: f64) -> Result<[[f64; 2]; 2], TransformError> {
        let opposite = if self.north { -FRAC_PI_2 } else { FRAC_PI_2 };
        if (lat - opposite).abs() <= f64::EPSILON {
            return Err(TransformError::PoleSingularity { lon, lat });
        }
        let rho = self.rho(lat);
        let (sin_l, cos_l) = lon.sin_cos();
        // ρ ∝ e^(−nψ) with n = 1, in the folded latitude.
        let phi = if self.north { lat } else { -lat };
        let drho_dphi_folded = -rho * dpsi_dphi(phi, self.ellipsoid.e2);
        if self.north {
            let drho = drho_dphi_folded;
            Ok([
                [rho * cos_l, drho * sin_l],
                [rho * sin_l, -drho * cos_l],
            ])
        } else {
            // d(folded φ)/dφ = −1 in the southern aspect.
            let drho = -drho_dphi_folded;
            Ok([
                [rho * cos_l, drho * sin_l],
                [-rho * sin_l, drho * cos_l],
            ])
        }
    }

    fn domain(&self) -> Envelope {
        // Usable down to the equator; beyond it ρ grows past the
        // conformal sphere diameter.
        if self.north {
            Envelope::new_2d(-PI, 0.0, PI, FRAC_PI_2)
        } else {
            Envelope::new_2d(-PI, -FRAC_PI_2, PI, 0.0)
        }
    }
}
