//! The math transform abstraction — an immutable function from
//! N-dimensional source coordinates to M-dimensional target coordinates.
//!
//! Implementations are stateless after construction and safe to share
//! across threads (`Send + Sync` is part of the trait bound); per-call
//! scratch lives on the stack or in call-local buffers.
//!
//! Coordinate arrays are flat `f64` slices with a stride equal to the
//! dimension. Offset and count parameters define the working window.

pub mod concat;
pub mod linear;
pub mod passthrough;

pub use concat::ConcatenatedTransform;
pub use linear::LinearTransform;
pub use passthrough::PassThroughTransform;

use std::sync::Arc;

use crate::coord::Position;
use crate::domain::Envelope;
use crate::error::TransformError;
use crate::matrix::Matrix;

pub trait MathTransform: Send + Sync {
    fn source_dimensions(&self) -> usize;

    fn target_dimensions(&self) -> usize;

    /// Transform one point. `src.len()` must equal the source dimension
    /// and `dst.len()` the target dimension.
    fn transform_point(&self, src: &[f64], dst: &mut [f64]) -> Result<(), TransformError>;

    /// The Jacobian matrix (target dimension × source dimension) at the
    /// given source point. Analytic, not finite-difference.
    fn derivative(&self, point: &[f64]) -> Result<Matrix, TransformError>;

    /// The inverse transform. Round-trips within implementation
    /// tolerance away from documented singularities. May be iterative.
    fn inverse(&self) -> Result<Arc<dyn MathTransform>, TransformError>;

    /// The envelope in which forward/inverse accuracy is guaranteed,
    /// if the transform declares one.
    fn domain(&self) -> Option<Envelope> {
        None
    }

    /// View this transform as an affine, when it is one. Lets the
    /// concatenation machinery fold adjacent affine stages in extended
    /// precision.
    fn as_linear(&self) -> Option<&LinearTransform> {
        None
    }

    /// Transform one point into a freshly allocated tuple.
    fn transform(&self, src: &[f64]) -> Result<Vec<f64>, TransformError> {
        let mut dst = vec![0.0; self.target_dimensions()];
        self.transform_point(src, &mut dst)?;
        Ok(dst)
    }

    /// Transform an owned [`Position`].
    fn transform_position(&self, position: &Position) -> Result<Position, TransformError> {
        position.expect_dimension(self.source_dimensions())?;
        Ok(Position::new(self.transform(position.ordinates())?))
    }

    /// Transform the point and also return the Jacobian evaluated at it.
    fn transform_with_derivative(
        &self,
        src: &[f64],
        dst: &mut [f64],
    ) -> Result<Matrix, TransformError> {
        let derivative = self.derivative(src)?;
        self.transform_point(src, dst)?;
        Ok(derivative)
    }

    /// Bulk transform between two distinct arrays. A failure aborts the
    /// batch and reports the index of the offending point.
    fn transform_array(
        &self,
        src: &[f64],
        src_offset: usize,
        dst: &mut [f64],
        dst_offset: usize,
        count: usize,
    ) -> Result<(), TransformError> {
        let sd = self.source_dimensions();
        let td = self.target_dimensions();
        check_window(src.len(), src_offset, sd, count)?;
        check_window(dst.len(), dst_offset, td, count)?;
        for i in 0..count {
            let s = src_offset + i * sd;
            let d = dst_offset + i * td;
            self.transform_point(&src[s..s + sd], &mut dst[d..d + td])
                .map_err(|e| e.at_point(i))?;
        }
        Ok(())
    }

    /// Bulk transform within a single array; source and destination
    /// windows may overlap arbitrarily.
    ///
    /// The iteration direction is chosen so that no source ordinate is
    /// overwritten before it is read: with equal offsets this means
    /// forward when the target dimension does not exceed the source
    /// dimension and backward otherwise. Overlaps that neither direction
    /// can serve fall back to buffering the source window.
    fn transform_in_place(
        &self,
        data: &mut [f64],
        src_offset: usize,
        dst_offset: usize,
        count: usize,
    ) -> Result<(), TransformError> {
        let sd = self.source_dimensions();
        let td = self.target_dimensions();
        check_window(data.len(), src_offset, sd, count)?;
        check_window(data.len(), dst_offset, td, count)?;

        let direction = IterationDirection::choose(src_offset, sd, dst_offset, td, count);
        if let IterationDirection::Buffered = direction {
            let src: Vec<f64> = data[src_offset..src_offset + sd * count].to_vec();
            return self.transform_array(&src, 0, data, dst_offset, count);
        }

        let mut scratch = vec![0.0; sd];
        for k in 0..count {
            let i = match direction {
                IterationDirection::Forward => k,
                _ => count - 1 - k,
            };
            let s = src_offset + i * sd;
            let d = dst_offset + i * td;
            scratch.copy_from_slice(&data[s..s + sd]);
            self.transform_point(&scratch, &mut data[d..d + td])
                .map_err(|e| e.at_point(i))?;
        }
        Ok(())
    }
}

/// Iteration order for in-place bulk transforms over a shared buffer.
///
/// Each point's own source is protected by a scratch copy; the direction
/// only has to guarantee that a point's write never lands on the source
/// window of a point not yet processed.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum IterationDirection {
    Forward,
    Backward,
    /// No single direction is safe; copy the source window first.
    Buffered,
}

impl IterationDirection {
    fn choose(
        src_offset: usize,
        src_dim: usize,
        dst_offset: usize,
        dst_dim: usize,
        count: usize,
    ) -> Self {
        if count <= 1 {
            return IterationDirection::Forward;
        }
        let d = dst_offset as i64;
        let s = src_offset as i64;
        let sd = src_dim as i64;
        let td = dst_dim as i64;
        let m = count as i64 - 1;

        // Forward is safe when every write finishes below the next
        // unread source: d - s <= min over k in [1, m] of k*(sd - td).
        let forward_bound = if sd >= td { sd - td } else { m * (sd - td) };
        if d - s <= forward_bound {
            return IterationDirection::Forward;
        }
        // Backward mirror: every source is consumed before a later
        // (lower-index) write can reach it.
        let backward_bound = if td >= sd { td - sd } else { m * (td - sd) };
        if s - d <= backward_bound {
            return IterationDirection::Backward;
        }
        IterationDirection::Buffered
    }
}

/// Validate a flat-array working window.
fn check_window(
    len: usize,
    offset: usize,
    dimension: usize,
    count: usize,
) -> Result<(), TransformError> {
    let needed = offset + dimension * count;
    if needed > len {
        return Err(TransformError::MismatchedDimension {
            expected: needed,
            actual: len,
        });
    }
    Ok(())
}

/// Check that a point slice has the expected dimension.
pub(crate) fn check_dimension(point: &[f64], expected: usize) -> Result<(), TransformError> {
    if point.len() != expected {
        return Err(TransformError::MismatchedDimension {
            expected,
            actual: point.len(),
        });
    }
    Ok(())
}

/// The identity transform of a given dimension.
#[derive(Debug, Clone)]
pub struct IdentityTransform {
    dimension: usize,
}

impl IdentityTransform {
    pub fn new(dimension: usize) -> Self {
        Self { dimension }
    }
}

impl MathTransform for IdentityTransform {
    fn source_dimensions(&self) -> usize {
        self.dimension
    }

    fn target_dimensions(&self) -> usize {
        self.dimension
    }

    fn transform_point(&self, src: &[f64], dst: &mut [f64]) -> Result<(), TransformError> {
        check_dimension(src, self.dimension)?;
        check_dimension(dst, self.dimension)?;
        dst.copy_from_slice(src);
        Ok(())
    }

    fn derivative(&self, point: &[f64]) -> Result<Matrix, TransformError> {
        check_dimension(point, self.dimension)?;
        Ok(Matrix::identity(self.dimension))
    }

    fn inverse(&self) -> Result<Arc<dyn MathTransform>, TransformError> {
        Ok(Arc::new(IdentityTransform::new(self.dimension)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    /// 2D→1D: keeps x only. Exercises the dimension-reducing in-place path.
    struct DropY;

    impl MathTransform for DropY {
        fn source_dimensions(&self) -> usize {
            2
        }
        fn target_dimensions(&self) -> usize {
            1
        }
        fn transform_point(&self, src: &[f64], dst: &mut [f64]) -> Result<(), TransformError> {
            check_dimension(src, 2)?;
            check_dimension(dst, 1)?;
            dst[0] = src[0];
            Ok(())
        }
        fn derivative(&self, _point: &[f64]) -> Result<Matrix, TransformError> {
            Ok(Matrix::from_row_major(1, 2, vec![1.0, 0.0]))
        }
        fn inverse(&self) -> Result<Arc<dyn MathTransform>, TransformError> {
            Err(TransformError::NoInverse("dimension-reducing".into()))
        }
    }

    /// 1D→2D: duplicates x. Exercises the dimension-increasing in-place path.
    struct DuplicateX;

    impl MathTransform for DuplicateX {
        fn source_dimensions(&self) -> usize {
            1
        }
        fn target_dimensions(&self) -> usize {
            2
        }
        fn transform_point(&self, src: &[f64], dst: &mut [f64]) -> Result<(), TransformError> {
            check_dimension(src, 1)?;
            check_dimension(dst, 2)?;
            dst[0] = src[0];
            dst[1] = src[0] + 100.0;
            Ok(())
        }
        fn derivative(&self, _point: &[f64]) -> Result<Matrix, TransformError> {
            Ok(Matrix::from_row_major(2, 1, vec![1.0, 1.0]))
        }
        fn inverse(&self) -> Result<Arc<dyn MathTransform>, TransformError> {
            Err(TransformError::NoInverse("dimension-increasing".into()))
        }
    }

    #[test]
    fn test_identity_roundtrip() {
        let id = IdentityTransform::new(3);
        let out = id.transform(&[1.0, 2.0, 3.0]).unwrap();
        assert_eq!(out, vec![1.0, 2.0, 3.0]);
        assert!(id.derivative(&[1.0, 2.0, 3.0]).unwrap().is_identity(0.0));
    }

    #[test]
    fn test_dimension_mismatch() {
        let id = IdentityTransform::new(2);
        assert!(matches!(
            id.transform(&[1.0, 2.0, 3.0]),
            Err(TransformError::MismatchedDimension { .. })
        ));
    }

    #[test]
    fn test_array_window_bounds() {
        let id = IdentityTransform::new(2);
        let src = [1.0, 2.0, 3.0, 4.0];
        let mut dst = [0.0; 3];
        // Destination window too small for 2 points of dimension 2.
        assert!(id.transform_array(&src, 0, &mut dst, 0, 2).is_err());
    }

    #[test]
    fn test_in_place_forward_reducing() {
        // 3 points of (x, y) collapse to (x,) in the same buffer with
        // identical offsets; forward iteration must not clobber unread input.
        let t = DropY;
        let mut aliased = [1.0, 10.0, 2.0, 20.0, 3.0, 30.0];
        t.transform_in_place(&mut aliased, 0, 0, 3).unwrap();
        assert_eq!(&aliased[..3], &[1.0, 2.0, 3.0]);

        // Reference: non-aliased call.
        let src = [1.0, 10.0, 2.0, 20.0, 3.0, 30.0];
        let mut dst = [0.0; 3];
        t.transform_array(&src, 0, &mut dst, 0, 3).unwrap();
        assert_eq!(&aliased[..3], &dst);
    }

    #[test]
    fn test_in_place_backward_increasing() {
        // 3 points of (x,) expand to (x, x+100) in place; backward
        // iteration must not clobber unread input.
        let t = DuplicateX;
        let mut aliased = [1.0, 2.0, 3.0, 0.0, 0.0, 0.0];
        t.transform_in_place(&mut aliased, 0, 0, 3).unwrap();
        assert_eq!(aliased, [1.0, 101.0, 2.0, 102.0, 3.0, 103.0]);

        let src = [1.0, 2.0, 3.0];
        let mut dst = [0.0; 6];
        t.transform_array(&src, 0, &mut dst, 0, 3).unwrap();
        assert_eq!(aliased, dst);
    }

    #[test]
    fn test_in_place_offset_overlap() {
        // Overlapping but not identical windows.
        let id = IdentityTransform::new(2);
        let mut data = [1.0, 2.0, 3.0, 4.0, 0.0, 0.0];
        id.transform_in_place(&mut data, 0, 2, 2).unwrap();
        assert_relative_eq!(data[2], 1.0);
        assert_relative_eq!(data[3], 2.0);
        assert_relative_eq!(data[4], 3.0);
        assert_relative_eq!(data[5], 4.0);
    }

    #[test]
    fn test_direction_choice() {
        // Equal offsets: forward for reducing/equal, backward for increasing.
        assert_eq!(
            IterationDirection::choose(0, 2, 0, 2, 4),
            IterationDirection::Forward
        );
        assert_eq!(
            IterationDirection::choose(0, 2, 0, 1, 4),
            IterationDirection::Forward
        );
        assert_eq!(
            IterationDirection::choose(0, 1, 0, 2, 4),
            IterationDirection::Backward
        );
        // Destination strictly ahead of source, equal dims: backward.
        assert_eq!(
            IterationDirection::choose(0, 2, 2, 2, 2),
            IterationDirection::Backward
        );
        // Destination slightly ahead while reducing: neither direction
        // is safe for interior points.
        assert_eq!(
            IterationDirection::choose(0, 2, 2, 1, 4),
            IterationDirection::Buffered
        );
    }

    #[test]
    fn test_in_place_buffered_fallback() {
        // dst window starts inside the second source point while
        // reducing 2D→1D: needs buffering.
        let t = DropY;
        let mut data = [1.0, 10.0, 2.0, 20.0, 3.0, 30.0, 4.0, 40.0];
        t.transform_in_place(&mut data, 0, 2, 4).unwrap();
        assert_eq!(&data[2..6], &[1.0, 2.0, 3.0, 4.0]);
    }

    #[test]
    fn test_bulk_window_checked_up_front() {
        let t = DropY;
        let src = [1.0, 2.0, 3.0]; // 1.5 points worth of data
        let mut dst = [0.0; 2];
        let err = t.transform_array(&src, 0, &mut dst, 0, 2).unwrap_err();
        assert!(matches!(err, TransformError::MismatchedDimension { .. }));
    }

    /// 1D transform that rejects negative inputs, for bulk error paths.
    struct RejectNegative;

    impl MathTransform for RejectNegative {
        fn source_dimensions(&self) -> usize {
            1
        }
        fn target_dimensions(&self) -> usize {
            1
        }
        fn transform_point(&self, src: &[f64], dst: &mut [f64]) -> Result<(), TransformError> {
            if src[0] < 0.0 {
                return Err(TransformError::DomainExceeded { x: src[0], y: 0.0 });
            }
            dst[0] = src[0];
            Ok(())
        }
        fn derivative(&self, _point: &[f64]) -> Result<Matrix, TransformError> {
            Ok(Matrix::identity(1))
        }
        fn inverse(&self) -> Result<Arc<dyn MathTransform>, TransformError> {
            Err(TransformError::NoInverse("test transform".into()))
        }
    }

    #[test]
    fn test_bulk_error_carries_point_index() {
        let t = RejectNegative;
        let src = [1.0, 2.0, -3.0, 4.0];
        let mut dst = [0.0; 4];
        let err = t.transform_array(&src, 0, &mut dst, 0, 4).unwrap_err();
        match err {
            TransformError::AtPoint { index, source } => {
                assert_eq!(index, 2);
                assert!(matches!(*source, TransformError::DomainExceeded { .. }));
            }
            other => panic!("expected AtPoint, got {other:?}"),
        }
    }

    #[test]
    fn test_transform_position() {
        let id = IdentityTransform::new(2);
        let p = Position::new_2d(3.0, 4.0);
        let out = id.transform_position(&p).unwrap();
        assert_eq!(out, p);
        let too_big: Position = (1.0, 2.0, 3.0).into();
        assert!(id.transform_position(&too_big).is_err());
    }
}
