//! Normalized map projection kernels.
//!
//! A kernel works in the canonical projection space: longitude/latitude
//! in radians relative to the central meridian, unit semi-major axis,
//! no scale factor, no false easting/northing. The operation factory
//! wraps kernels between normalize/denormalize affine steps that carry
//! central meridian, units, `a·k0` scaling and offsets.

pub mod common;
pub mod ellipsoid;
pub mod lambert_azimuthal;
pub mod lambert_conformal;
pub mod mercator;
pub mod stereographic;
pub mod transverse_mercator;

use std::sync::{Arc, OnceLock};

use crate::domain::Envelope;
use crate::error::TransformError;
use crate::matrix::Matrix;
use crate::transform::{check_dimension, MathTransform};

pub use ellipsoid::Ellipsoid;

/// A projection kernel in normalized space.
///
/// `forward` maps (λ, φ) in radians to normalized (x, y); `jacobian`
/// returns the analytic 2×2 partial-derivative matrix
/// `[[∂x/∂λ, ∂x/∂φ], [∂y/∂λ, ∂y/∂φ]]`. Singular inputs (poles, points
/// outside the projection domain) report a `TransformError` rather than
/// producing NaN; limiting values that are mathematically defined are
/// documented per kernel.
pub trait NormalizedProjection: Send + Sync {
    fn name(&self) -> &'static str;

    fn ellipsoid(&self) -> &Ellipsoid;

    fn forward(&self, lon: f64, lat: f64) -> Result<(f64, f64), TransformError>;

    fn inverse(&self, x: f64, y: f64) -> Result<(f64, f64), TransformError>;

    fn jacobian(&self, lon: f64, lat: f64) -> Result<[[f64; 2]; 2], TransformError>;

    /// The (λ, φ) envelope in which forward/inverse accuracy holds.
    fn domain(&self) -> Envelope;
}

/// Adapter exposing a projection kernel as a 2D→2D [`MathTransform`].
pub struct ProjectionTransform {
    projection: Arc<dyn NormalizedProjection>,
    inverse: OnceLock<Arc<dyn MathTransform>>,
}

impl ProjectionTransform {
    pub fn new(projection: Arc<dyn NormalizedProjection>) -> Self {
        Self {
            projection,
            inverse: OnceLock::new(),
        }
    }

    pub fn projection(&self) -> &Arc<dyn NormalizedProjection> {
        &self.projection
    }
}

impl MathTransform for ProjectionTransform {
    fn source_dimensions(&self) -> usize {
        2
    }

    fn target_dimensions(&self) -> usize {
        2
    }

    fn transform_point(&self, src: &[f64], dst: &mut [f64]) -> Result<(), TransformError> {
        check_dimension(src, 2)?;
        check_dimension(dst, 2)?;
        let (x, y) = self.projection.forward(src[0], src[1])?;
        dst[0] = x;
        dst[1] = y;
        Ok(())
    }

    fn derivative(&self, point: &[f64]) -> Result<Matrix, TransformError> {
        check_dimension(point, 2)?;
        let j = self.projection.jacobian(point[0], point[1])?;
        Ok(Matrix::from_row_major(
            2,
            2,
            vec![j[0][0], j[0][1], j[1][0], j[1][1]],
        ))
    }

    fn inverse(&self) -> Result<Arc<dyn MathTransform>, TransformError> {
        let inv = self.inverse.get_or_init(|| {
            Arc::new(InverseProjectionTransform {
                projection: self.projection.clone(),
            })
        });
        Ok(inv.clone())
    }

    fn domain(&self) -> Option<Envelope> {
        Some(self.projection.domain())
    }
}

/// The inverse side of a projection kernel.
///
/// Its Jacobian is the matrix inverse of the forward Jacobian evaluated
/// at the recovered geographic point.
struct InverseProjectionTransform {
    projection: Arc<dyn NormalizedProjection>,
}

impl MathTransform for InverseProjectionTransform {
    fn source_dimensions(&self) -> usize {
        2
    }

    fn target_dimensions(&self) -> usize {
        2
    }

    fn transform_point(&self, src: &[f64], dst: &mut [f64]) -> Result<(), TransformError> {
        check_dimension(src, 2)?;
        check_dimension(dst, 2)?;
        let (lon, lat) = self.projection.inverse(src[0], src[1])?;
        dst[0] = lon;
        dst[1] = lat;
        Ok(())
    }

    fn derivative(&self, point: &[f64]) -> Result<Matrix, TransformError> {
        check_dimension(point, 2)?;
        let (lon, lat) = self.projection.inverse(point[0], point[1])?;
        let j = self.projection.jacobian(lon, lat)?;
        Matrix::from_row_major(2, 2, vec![j[0][0], j[0][1], j[1][0], j[1][1]]).inverse()
    }

    fn inverse(&self) -> Result<Arc<dyn MathTransform>, TransformError> {
        Ok(Arc::new(ProjectionTransform::new(self.projection.clone())))
    }
}

#[cfg(test)]
pub(crate) mod test_support {
    use super::*;
    use approx::assert_relative_eq;

    /// Round-trip a kernel over sample (λ, φ) points, degrees in.
    pub fn assert_roundtrip(
        proj: &dyn NormalizedProjection,
        cases: &[(f64, f64)],
        epsilon: f64,
    ) {
        for &(lon_deg, lat_deg) in cases {
            let lon = lon_deg.to_radians();
            let lat = lat_deg.to_radians();
            let (x, y) = proj.forward(lon, lat).unwrap();
            let (lon2, lat2) = proj.inverse(x, y).unwrap();
            assert_relative_eq!(lon2, lon, epsilon = epsilon, max_relative = epsilon);
            assert_relative_eq!(lat2, lat, epsilon = epsilon, max_relative = epsilon);
        }
    }

    /// Compare the analytic Jacobian against central differences.
    pub fn assert_jacobian_consistent(
        proj: &dyn NormalizedProjection,
        cases: &[(f64, f64)],
        relative: f64,
    ) {
        let h = 1e-7;
        for &(lon_deg, lat_deg) in cases {
            let lon = lon_deg.to_radians();
            let lat = lat_deg.to_radians();
            let j = proj.jacobian(lon, lat).unwrap();

            let (xp, yp) = proj.forward(lon + h, lat).unwrap();
            let (xm, ym) = proj.forward(lon - h, lat).unwrap();
            let dx_dlon = (xp - xm) / (2.0 * h);
            let dy_dlon = (yp - ym) / (2.0 * h);

            let (xp, yp) = proj.forward(lon, lat + h).unwrap();
            let (xm, ym) = proj.forward(lon, lat - h).unwrap();
            let dx_dlat = (xp - xm) / (2.0 * h);
            let dy_dlat = (yp - ym) / (2.0 * h);

            for (analytic, numeric) in [
                (j[0][0], dx_dlon),
                (j[0][1], dx_dlat),
                (j[1][0], dy_dlon),
                (j[1][1], dy_dlat),
            ] {
                assert_relative_eq!(
                    analytic,
                    numeric,
                    epsilon = 1e-7,
                    max_relative = relative
                );
            }
        }
    }
}
