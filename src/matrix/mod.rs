//! Dense matrix algebra for affine transforms and Jacobians.
//!
//! Affine transform matrices follow the homogeneous convention: a map
//! from N to M dimensions is an (M+1)×(N+1) matrix whose last row is
//! `[0, …, 0, 1]`. Jacobians are plain M×N matrices.

pub mod double;

pub use double::{DoubleDouble, ExtendedMatrix};

use crate::error::TransformError;

/// Row-major dense matrix of `f64`.
#[derive(Clone, Debug, PartialEq)]
pub struct Matrix {
    rows: usize,
    cols: usize,
    data: Vec<f64>,
}

impl Matrix {
    pub fn zeros(rows: usize, cols: usize) -> Self {
        Self {
            rows,
            cols,
            data: vec![0.0; rows * cols],
        }
    }

    pub fn identity(size: usize) -> Self {
        let mut m = Self::zeros(size, size);
        for i in 0..size {
            m.data[i * size + i] = 1.0;
        }
        m
    }

    /// Build from row-major data. Panics if `data.len() != rows * cols`.
    pub fn from_row_major(rows: usize, cols: usize, data: Vec<f64>) -> Self {
        assert_eq!(data.len(), rows * cols, "row-major data length");
        Self { rows, cols, data }
    }

    pub fn rows(&self) -> usize {
        self.rows
    }

    pub fn cols(&self) -> usize {
        self.cols
    }

    pub fn get(&self, row: usize, col: usize) -> f64 {
        self.data[row * self.cols + col]
    }

    pub fn set(&mut self, row: usize, col: usize, value: f64) {
        self.data[row * self.cols + col] = value;
    }

    pub fn as_slice(&self) -> &[f64] {
        &self.data
    }

    /// Matrix product `self · rhs`.
    pub fn multiply(&self, rhs: &Matrix) -> Result<Matrix, TransformError> {
        if self.cols != rhs.rows {
            return Err(TransformError::MismatchedDimension {
                expected: self.cols,
                actual: rhs.rows,
            });
        }
        let mut out = Matrix::zeros(self.rows, rhs.cols);
        for i in 0..self.rows {
            for k in 0..self.cols {
                let a = self.data[i * self.cols + k];
                if a == 0.0 {
                    continue;
                }
                for j in 0..rhs.cols {
                    out.data[i * rhs.cols + j] += a * rhs.data[k * rhs.cols + j];
                }
            }
        }
        Ok(out)
    }

    /// Invert a square matrix by Gauss-Jordan elimination with partial
    /// pivoting.
    pub fn inverse(&self) -> Result<Matrix, TransformError> {
        if self.rows != self.cols {
            return Err(TransformError::MismatchedDimension {
                expected: self.rows,
                actual: self.cols,
            });
        }
        let n = self.rows;
        let mut a = self.data.clone();
        let mut inv = Matrix::identity(n);

        for col in 0..n {
            // Pivot search
            let mut pivot_row = col;
            let mut pivot_mag = a[col * n + col].abs();
            for row in (col + 1)..n {
                let mag = a[row * n + col].abs();
                if mag > pivot_mag {
                    pivot_row = row;
                    pivot_mag = mag;
                }
            }
            if pivot_mag < f64::EPSILON {
                return Err(TransformError::SingularMatrix {
                    rows: n,
                    cols: n,
                    pivot: pivot_mag,
                });
            }
            if pivot_row != col {
                for j in 0..n {
                    a.swap(col * n + j, pivot_row * n + j);
                    inv.data.swap(col * n + j, pivot_row * n + j);
                }
            }

            let pivot = a[col * n + col];
            for j in 0..n {
                a[col * n + j] /= pivot;
                inv.data[col * n + j] /= pivot;
            }
            for row in 0..n {
                if row == col {
                    continue;
                }
                let factor = a[row * n + col];
                if factor == 0.0 {
                    continue;
                }
                for j in 0..n {
                    a[row * n + j] -= factor * a[col * n + j];
                    inv.data[row * n + j] -= factor * inv.data[col * n + j];
                }
            }
        }
        Ok(inv)
    }

    /// True if this is an identity matrix within `tolerance`.
    pub fn is_identity(&self, tolerance: f64) -> bool {
        if self.rows != self.cols {
            return false;
        }
        for i in 0..self.rows {
            for j in 0..self.cols {
                let expected = if i == j { 1.0 } else { 0.0 };
                if (self.get(i, j) - expected).abs() > tolerance {
                    return false;
                }
            }
        }
        true
    }

    /// True if the last row is `[0, …, 0, 1]`, i.e. the matrix can be
    /// interpreted as an affine transform in homogeneous form.
    pub fn is_affine(&self) -> bool {
        if self.rows < 1 {
            return false;
        }
        let last = self.rows - 1;
        for j in 0..self.cols {
            let expected = if j == self.cols - 1 { 1.0 } else { 0.0 };
            if self.get(last, j) != expected {
                return false;
            }
        }
        true
    }
}
