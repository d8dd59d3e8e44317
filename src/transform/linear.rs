//! Affine transforms backed by the extended-precision matrix.
//!
//! An N→M affine map is stored as an (M+1)×(N+1) homogeneous matrix with
//! double-double elements, so that normalize/denormalize chains built by
//! the factory (axis swaps, unit conversions, false easting/northing)
//! compose without double-rounding drift. Point evaluation accumulates
//! the low words before collapsing to `f64`.

use std::sync::{Arc, OnceLock};

use crate::error::TransformError;
use crate::matrix::{DoubleDouble, ExtendedMatrix, Matrix};
use crate::transform::{check_dimension, MathTransform};

pub struct LinearTransform {
    matrix: ExtendedMatrix,
    /// Plain-f64 linear part (target dim × source dim), kept for the
    /// constant Jacobian.
    jacobian: Matrix,
    inverse: OnceLock<Result<Arc<LinearTransform>, TransformError>>,
}

impl LinearTransform {
    /// Build from a homogeneous matrix; the last row must be `[0, …, 0, 1]`.
    pub fn new(matrix: ExtendedMatrix) -> Result<Self, TransformError> {
        let rows = matrix.rows();
        let cols = matrix.cols();
        if rows < 2 || cols < 2 {
            return Err(TransformError::MismatchedDimension {
                expected: 2,
                actual: rows.min(cols),
            });
        }
        for j in 0..cols {
            let expected = if j == cols - 1 { 1.0 } else { 0.0 };
            let v = matrix.get(rows - 1, j);
            if v.hi != expected || v.lo != 0.0 {
                return Err(TransformError::NoInverse(format!(
                    "matrix is not affine: last row element {j} is {}",
                    v.value()
                )));
            }
        }
        let mut jacobian = Matrix::zeros(rows - 1, cols - 1);
        for i in 0..rows - 1 {
            for j in 0..cols - 1 {
                jacobian.set(i, j, matrix.get(i, j).value());
            }
        }
        Ok(Self {
            matrix,
            jacobian,
            inverse: OnceLock::new(),
        })
    }

    pub fn from_matrix(matrix: &Matrix) -> Result<Self, TransformError> {
        Self::new(ExtendedMatrix::from_matrix(matrix))
    }

    pub fn identity(dimension: usize) -> Self {
        Self::new(ExtendedMatrix::identity(dimension + 1))
            .expect("identity matrix is affine")
    }

    /// 2D scale-then-translate: `(x, y) -> (sx·x + tx, sy·y + ty)`.
    pub fn scale_translate_2d(
        sx: DoubleDouble,
        sy: DoubleDouble,
        tx: DoubleDouble,
        ty: DoubleDouble,
    ) -> Self {
        let mut m = ExtendedMatrix::identity(3);
        m.set(0, 0, sx);
        m.set(1, 1, sy);
        m.set(0, 2, tx);
        m.set(1, 2, ty);
        Self::new(m).expect("scale/translate matrix is affine")
    }

    /// Uniform per-axis scale in 2D.
    pub fn scale_2d(sx: DoubleDouble, sy: DoubleDouble) -> Self {
        Self::scale_translate_2d(sx, sy, DoubleDouble::ZERO, DoubleDouble::ZERO)
    }

    /// Axis swap `(x, y) -> (y, x)`.
    pub fn swap_xy_2d() -> Self {
        let mut m = ExtendedMatrix::zeros(3, 3);
        m.set(0, 1, DoubleDouble::ONE);
        m.set(1, 0, DoubleDouble::ONE);
        m.set(2, 2, DoubleDouble::ONE);
        Self::new(m).expect("swap matrix is affine")
    }

    pub fn matrix(&self) -> &ExtendedMatrix {
        &self.matrix
    }

    /// Compose `self ∘ other` (apply `other` first) in extended precision.
    pub fn concatenate(&self, other: &LinearTransform) -> Result<LinearTransform, TransformError> {
        LinearTransform::new(self.matrix.multiply(&other.matrix)?)
    }
}

impl MathTransform for LinearTransform {
    fn source_dimensions(&self) -> usize {
        self.matrix.cols() - 1
    }

    fn target_dimensions(&self) -> usize {
        self.matrix.rows() - 1
    }

    fn transform_point(&self, src: &[f64], dst: &mut [f64]) -> Result<(), TransformError> {
        let sd = self.source_dimensions();
        let td = self.target_dimensions();
        check_dimension(src, sd)?;
        check_dimension(dst, td)?;
        for i in 0..td {
            let mut acc = self.matrix.get(i, sd);
            for (j, &x) in src.iter().enumerate() {
                let m = self.matrix.get(i, j);
                if m.is_zero() {
                    continue;
                }
                acc = acc.add(m.mul(DoubleDouble::from(x)));
            }
            dst[i] = acc.value();
        }
        Ok(())
    }

    fn derivative(&self, point: &[f64]) -> Result<Matrix, TransformError> {
        check_dimension(point, self.source_dimensions())?;
        Ok(self.jacobian.clone())
    }

    fn as_linear(&self) -> Option<&LinearTransform> {
        Some(self)
    }

    fn inverse(&self) -> Result<Arc<dyn MathTransform>, TransformError> {
        let inv = self
            .inverse
            .get_or_init(|| {
                if self.matrix.rows() != self.matrix.cols() {
                    return Err(TransformError::NoInverse(format!(
                        "non-square affine {}x{}",
                        self.matrix.rows(),
                        self.matrix.cols()
                    )));
                }
                Ok(Arc::new(LinearTransform::new(self.matrix.inverse()?)?))
            })
            .clone()?;
        Ok(inv as Arc<dyn MathTransform>)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::matrix::double::{deg_to_rad, rad_to_deg};
    use approx::assert_relative_eq;

    #[test]
    fn test_scale_translate() {
        let t = LinearTransform::scale_translate_2d(
            DoubleDouble::from(10.0),
            DoubleDouble::from(-10.0),
            DoubleDouble::from(500_000.0),
            DoubleDouble::from(6_000_000.0),
        );
        let out = t.transform(&[100.0, 100.0]).unwrap();
        assert_relative_eq!(out[0], 501_000.0);
        assert_relative_eq!(out[1], 5_999_000.0);
    }

    #[test]
    fn test_inverse_roundtrip() {
        let t = LinearTransform::scale_translate_2d(
            DoubleDouble::from(10.0),
            DoubleDouble::from(-10.0),
            DoubleDouble::from(500_000.0),
            DoubleDouble::from(6_000_000.0),
        );
        let inv = t.inverse().unwrap();
        let out = inv.transform(&[501_000.0, 5_999_000.0]).unwrap();
        assert_relative_eq!(out[0], 100.0, epsilon = 1e-10);
        assert_relative_eq!(out[1], 100.0, epsilon = 1e-10);
    }

    #[test]
    fn test_inverse_cached() {
        let t = LinearTransform::identity(2);
        let a = t.inverse().unwrap();
        let b = t.inverse().unwrap();
        assert!(Arc::ptr_eq(&a, &b));
    }

    #[test]
    fn test_degree_radian_composition_is_identity() {
        // The double-rounding case the extended matrix exists for:
        // deg→rad composed with rad→deg must collapse to exact identity.
        let to_rad = LinearTransform::scale_2d(deg_to_rad(), deg_to_rad());
        let to_deg = LinearTransform::scale_2d(rad_to_deg(), rad_to_deg());
        let composed = to_deg.concatenate(&to_rad).unwrap();
        let m = composed.matrix();
        assert_eq!(m.get(0, 0).hi, 1.0);
        assert_eq!(m.get(1, 1).hi, 1.0);
        assert!(m.get(0, 0).lo.abs() < 1e-31);

        let out = composed.transform(&[123.456, -54.321]).unwrap();
        assert_eq!(out[0], 123.456);
        assert_eq!(out[1], -54.321);
    }

    #[test]
    fn test_swap_axes() {
        let t = LinearTransform::swap_xy_2d();
        let out = t.transform(&[1.0, 2.0]).unwrap();
        assert_eq!(out, vec![2.0, 1.0]);
        // Swap is its own inverse.
        let inv = t.inverse().unwrap();
        let back = inv.transform(&out).unwrap();
        assert_eq!(back, vec![1.0, 2.0]);
    }

    #[test]
    fn test_singular_rejected() {
        let mut m = ExtendedMatrix::identity(3);
        m.set(0, 0, DoubleDouble::ZERO);
        m.set(0, 1, DoubleDouble::ZERO);
        let t = LinearTransform::new(m).unwrap();
        assert!(t.inverse().is_err());
    }

    #[test]
    fn test_non_affine_rejected() {
        let mut m = ExtendedMatrix::identity(3);
        m.set(2, 0, DoubleDouble::from(0.5));
        assert!(LinearTransform::new(m).is_err());
    }

    #[test]
    fn test_constant_jacobian() {
        let t = LinearTransform::scale_translate_2d(
            DoubleDouble::from(2.0),
            DoubleDouble::from(3.0),
            DoubleDouble::from(7.0),
            DoubleDouble::from(-7.0),
        );
        let j = t.derivative(&[0.0, 0.0]).unwrap();
        assert_relative_eq!(j.get(0, 0), 2.0);
        assert_relative_eq!(j.get(1, 1), 3.0);
        assert_relative_eq!(j.get(0, 1), 0.0);
    }
}
