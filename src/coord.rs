//! Coordinate tuples — thin wrappers over flat `f64` ordinate arrays.
//!
//! The transform engine itself works on flat slices with a stride equal
//! to the dimension (see [`crate::transform::MathTransform`]); this type
//! exists for callers that want an owned, dimension-checked position.

use crate::error::TransformError;

/// An owned coordinate tuple: `dimension == ordinates.len()`.
#[derive(Clone, Debug, PartialEq)]
pub struct Position {
    ordinates: Vec<f64>,
}

impl Position {
    pub fn new(ordinates: Vec<f64>) -> Self {
        Self { ordinates }
    }

    /// Convenience constructor for the common 2D case.
    pub fn new_2d(x: f64, y: f64) -> Self {
        Self {
            ordinates: vec![x, y],
        }
    }

    pub fn dimension(&self) -> usize {
        self.ordinates.len()
    }

    pub fn ordinates(&self) -> &[f64] {
        &self.ordinates
    }

    /// Fail unless this position has the expected dimension.
    pub fn expect_dimension(&self, expected: usize) -> Result<(), TransformError> {
        if self.ordinates.len() != expected {
            return Err(TransformError::MismatchedDimension {
                expected,
                actual: self.ordinates.len(),
            });
        }
        Ok(())
    }
}

impl From<(f64, f64)> for Position {
    fn from((x, y): (f64, f64)) -> Self {
        Self::new_2d(x, y)
    }
}

impl From<(f64, f64, f64)> for Position {
    fn from((x, y, z): (f64, f64, f64)) -> Self {
        Self {
            ordinates: vec![x, y, z],
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_dimension_check() {
        let p = Position::new_2d(1.0, 2.0);
        assert!(p.expect_dimension(2).is_ok());
        assert!(matches!(
            p.expect_dimension(3),
            Err(TransformError::MismatchedDimension {
                expected: 3,
                actual: 2
            })
        ));
    }

    #[test]
    fn test_from_tuples() {
        let p: Position = (1.0, 2.0, 3.0).into();
        assert_eq!(p.dimension(), 3);
        assert_eq!(p.ordinates(), &[1.0, 2.0, 3.0]);
    }
}
