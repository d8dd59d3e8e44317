//! Pass-through transforms — apply a sub-transform to a contiguous
//! range of ordinates and carry the rest unchanged.
//!
//! This is the ellipsoidal-height-combiner building block: a 2D
//! horizontal operation wrapped over the first two ordinates of a 3D
//! compound coordinate keeps the height untouched.

use std::sync::{Arc, OnceLock};

use crate::error::TransformError;
use crate::matrix::Matrix;
use crate::transform::{check_dimension, MathTransform};

pub struct PassThroughTransform {
    sub: Arc<dyn MathTransform>,
    first_affected: usize,
    trailing: usize,
    inverse: OnceLock<Arc<dyn MathTransform>>,
}

impl PassThroughTransform {
    pub fn new(sub: Arc<dyn MathTransform>, first_affected: usize, trailing: usize) -> Self {
        Self {
            sub,
            first_affected,
            trailing,
            inverse: OnceLock::new(),
        }
    }

    pub fn sub_transform(&self) -> &Arc<dyn MathTransform> {
        &self.sub
    }
}

impl MathTransform for PassThroughTransform {
    fn source_dimensions(&self) -> usize {
        self.first_affected + self.sub.source_dimensions() + self.trailing
    }

    fn target_dimensions(&self) -> usize {
        self.first_affected + self.sub.target_dimensions() + self.trailing
    }

    fn transform_point(&self, src: &[f64], dst: &mut [f64]) -> Result<(), TransformError> {
        check_dimension(src, self.source_dimensions())?;
        check_dimension(dst, self.target_dimensions())?;
        let f = self.first_affected;
        let ssub = self.sub.source_dimensions();
        let tsub = self.sub.target_dimensions();

        dst[..f].copy_from_slice(&src[..f]);
        self.sub
            .transform_point(&src[f..f + ssub], &mut dst[f..f + tsub])?;
        dst[f + tsub..].copy_from_slice(&src[f + ssub..]);
        Ok(())
    }

    /// Block-diagonal Jacobian: identity on the untouched ordinates,
    /// the sub-transform Jacobian on the affected range.
    fn derivative(&self, point: &[f64]) -> Result<Matrix, TransformError> {
        check_dimension(point, self.source_dimensions())?;
        let f = self.first_affected;
        let ssub = self.sub.source_dimensions();
        let sub_j = self.sub.derivative(&point[f..f + ssub])?;

        let mut j = Matrix::zeros(self.target_dimensions(), self.source_dimensions());
        for i in 0..f {
            j.set(i, i, 1.0);
        }
        for r in 0..sub_j.rows() {
            for c in 0..sub_j.cols() {
                j.set(f + r, f + c, sub_j.get(r, c));
            }
        }
        for k in 0..self.trailing {
            j.set(f + sub_j.rows() + k, f + sub_j.cols() + k, 1.0);
        }
        Ok(j)
    }

    fn inverse(&self) -> Result<Arc<dyn MathTransform>, TransformError> {
        if let Some(inv) = self.inverse.get() {
            return Ok(inv.clone());
        }
        let inverted: Arc<dyn MathTransform> = Arc::new(PassThroughTransform::new(
            self.sub.inverse()?,
            self.first_affected,
            self.trailing,
        ));
        Ok(self.inverse.get_or_init(|| inverted).clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::matrix::DoubleDouble;
    use crate::transform::LinearTransform;
    use approx::assert_relative_eq;

    fn height_combiner() -> PassThroughTransform {
        // Horizontal scale over (x, y), height carried through.
        let horizontal = Arc::new(LinearTransform::scale_2d(
            DoubleDouble::from(2.0),
            DoubleDouble::from(3.0),
        ));
        PassThroughTransform::new(horizontal, 0, 1)
    }

    #[test]
    fn test_height_carried_through() {
        let t = height_combiner();
        assert_eq!(t.source_dimensions(), 3);
        assert_eq!(t.target_dimensions(), 3);
        let out = t.transform(&[1.0, 2.0, 42.5]).unwrap();
        assert_relative_eq!(out[0], 2.0);
        assert_relative_eq!(out[1], 6.0);
        assert_relative_eq!(out[2], 42.5);
    }

    #[test]
    fn test_leading_ordinates_untouched() {
        let sub = Arc::new(LinearTransform::scale_2d(
            DoubleDouble::from(10.0),
            DoubleDouble::from(10.0),
        ));
        let t = PassThroughTransform::new(sub, 1, 0);
        let out = t.transform(&[7.0, 1.0, 2.0]).unwrap();
        assert_relative_eq!(out[0], 7.0);
        assert_relative_eq!(out[1], 10.0);
        assert_relative_eq!(out[2], 20.0);
    }

    #[test]
    fn test_block_diagonal_derivative() {
        let t = height_combiner();
        let j = t.derivative(&[1.0, 1.0, 1.0]).unwrap();
        assert_relative_eq!(j.get(0, 0), 2.0);
        assert_relative_eq!(j.get(1, 1), 3.0);
        assert_relative_eq!(j.get(2, 2), 1.0);
        assert_relative_eq!(j.get(0, 2), 0.0);
        assert_relative_eq!(j.get(2, 0), 0.0);
    }

    #[test]
    fn test_inverse_roundtrip() {
        let t = height_combiner();
        let inv = t.inverse().unwrap();
        let p = [1.5, -2.5, 99.0];
        let fwd = t.transform(&p).unwrap();
        let back = inv.transform(&fwd).unwrap();
        for (a, b) in back.iter().zip(&p) {
            assert_relative_eq!(a, b, epsilon = 1e-12);
        }
    }

    #[test]
    fn test_in_place_aliasing() {
        // Pass-through over a shared buffer, same offsets.
        let t = height_combiner();
        let mut data = [1.0, 2.0, 10.0, 3.0, 4.0, 20.0];
        t.transform_in_place(&mut data, 0, 0, 2).unwrap();
        assert_eq!(data, [2.0, 6.0, 10.0, 6.0, 12.0, 20.0]);
    }
}
