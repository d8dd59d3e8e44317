//! Double-double arithmetic and the extended-precision matrix.
//!
//! Composing many chained affine steps (degree↔radian folding, axis
//! swaps, unit scales) in plain `f64` loses one ulp per product; with
//! each element kept as an unevaluated high+low pair the composition of
//! a conversion with its inverse stays exactly identity. Based on the
//! classic error-free transformations (Knuth two-sum, FMA two-product).

use crate::error::TransformError;
use crate::matrix::Matrix;

/// An unevaluated sum of two doubles, `hi + lo`, with `|lo| <= ulp(hi)/2`.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct DoubleDouble {
    pub hi: f64,
    pub lo: f64,
}

/// π with its f64 representation error carried in the low word.
pub const PI_DD: DoubleDouble = DoubleDouble {
    hi: std::f64::consts::PI,
    lo: 1.224_646_799_147_353_2e-16,
};

#[inline]
fn two_sum(a: f64, b: f64) -> (f64, f64) {
    let s = a + b;
    let bb = s - a;
    let err = (a - (s - bb)) + (b - bb);
    (s, err)
}

#[inline]
fn quick_two_sum(a: f64, b: f64) -> (f64, f64) {
    // Requires |a| >= |b|.
    let s = a + b;
    let err = b - (s - a);
    (s, err)
}

#[inline]
fn two_prod(a: f64, b: f64) -> (f64, f64) {
    let p = a * b;
    let err = a.mul_add(b, -p);
    (p, err)
}

impl DoubleDouble {
    pub const ZERO: DoubleDouble = DoubleDouble { hi: 0.0, lo: 0.0 };
    pub const ONE: DoubleDouble = DoubleDouble { hi: 1.0, lo: 0.0 };

    pub fn new(hi: f64, lo: f64) -> Self {
        let (hi, lo) = quick_two_sum(hi, lo);
        Self { hi, lo }
    }

    pub fn value(self) -> f64 {
        self.hi + self.lo
    }

    pub fn is_zero(self) -> bool {
        self.hi == 0.0 && self.lo == 0.0
    }

    pub fn add(self, other: DoubleDouble) -> DoubleDouble {
        let (s, e) = two_sum(self.hi, other.hi);
        let e = e + self.lo + other.lo;
        let (hi, lo) = quick_two_sum(s, e);
        DoubleDouble { hi, lo }
    }

    pub fn sub(self, other: DoubleDouble) -> DoubleDouble {
        self.add(other.neg())
    }

    pub fn neg(self) -> DoubleDouble {
        DoubleDouble {
            hi: -self.hi,
            lo: -self.lo,
        }
    }

    pub fn mul(self, other: DoubleDouble) -> DoubleDouble {
        let (p, e) = two_prod(self.hi, other.hi);
        let e = e + self.hi * other.lo + self.lo * other.hi;
        let (hi, lo) = quick_two_sum(p, e);
        DoubleDouble { hi, lo }
    }

    /// Quotient, one Newton correction past the double estimate.
    pub fn div(self, other: DoubleDouble) -> DoubleDouble {
        let q1 = self.hi / other.hi;
        let r = self.sub(other.mul(DoubleDouble::from(q1)));
        let q2 = (r.hi + r.lo) / (other.hi + other.lo);
        let (hi, lo) = quick_two_sum(q1, q2);
        DoubleDouble { hi, lo }
    }
}

impl From<f64> for DoubleDouble {
    fn from(v: f64) -> Self {
        DoubleDouble { hi: v, lo: 0.0 }
    }
}

/// The degrees→radians factor π/180 in double-double precision.
pub fn deg_to_rad() -> DoubleDouble {
    PI_DD.div(DoubleDouble::from(180.0))
}

/// The radians→degrees factor 180/π in double-double precision.
pub fn rad_to_deg() -> DoubleDouble {
    DoubleDouble::from(180.0).div(PI_DD)
}

/// Row-major dense matrix with double-double elements.
///
/// Used for affine composition in the operation factory; evaluation of
/// points happens through [`crate::transform::LinearTransform`] which
/// accumulates the low words.
#[derive(Clone, Debug, PartialEq)]
pub struct ExtendedMatrix {
    rows: usize,
    cols: usize,
    data: Vec<DoubleDouble>,
}

impl ExtendedMatrix {
    pub fn zeros(rows: usize, cols: usize) -> Self {
        Self {
            rows,
            cols,
            data: vec![DoubleDouble::ZERO; rows * cols],
        }
    }

    pub fn identity(size: usize) -> Self {
        let mut m = Self::zeros(size, size);
        for i in 0..size {
            m.data[i * size + i] = DoubleDouble::ONE;
        }
        m
    }

    pub fn from_matrix(m: &Matrix) -> Self {
        let mut out = Self::zeros(m.rows(), m.cols());
        for i in 0..m.rows() {
            for j in 0..m.cols() {
                out.set(i, j, DoubleDouble::from(m.get(i, j)));
            }
        }
        out
    }

    pub fn to_matrix(&self) -> Matrix {
        let mut out = Matrix::zeros(self.rows, self.cols);
        for i in 0..self.rows {
            for j in 0..self.cols {
                out.set(i, j, self.get(i, j).value());
            }
        }
        out
    }

    pub fn rows(&self) -> usize {
        self.rows
    }

    pub fn cols(&self) -> usize {
        self.cols
    }

    pub fn get(&self, row: usize, col: usize) -> DoubleDouble {
        self.data[row * self.cols + col]
    }

    pub fn set(&mut self, row: usize, col: usize, value: DoubleDouble) {
        self.data[row * self.cols + col] = value;
    }

    /// Matrix product `self · rhs` with double-double accumulation.
    pub fn multiply(&self, rhs: &ExtendedMatrix) -> Result<ExtendedMatrix, TransformError> {
        if self.cols != rhs.rows {
            return Err(TransformError::MismatchedDimension {
                expected: self.cols,
                actual: rhs.rows,
            });
        }
        let mut out = ExtendedMatrix::zeros(self.rows, rhs.cols);
        for i in 0..self.rows {
            for j in 0..rhs.cols {
                let mut acc = DoubleDouble::ZERO;
                for k in 0..self.cols {
                    let a = self.get(i, k);
                    if a.is_zero() {
                        continue;
                    }
                    acc = acc.add(a.mul(rhs.get(k, j)));
                }
                out.set(i, j, acc);
            }
        }
        Ok(out)
    }

    /// Gauss-Jordan inversion with partial pivoting, all arithmetic in
    /// double-double.
    pub fn inverse(&self) -> Result<ExtendedMatrix, TransformError> {
        if self.rows != self.cols {
            return Err(TransformError::MismatchedDimension {
                expected: self.rows,
                actual: self.cols,
            });
        }
        let n = self.rows;
        let mut a = self.data.clone();
        let mut inv = ExtendedMatrix::identity(n);

        for col in 0..n {
            let mut pivot_row = col;
            let mut pivot_mag = a[col * n + col].hi.abs();
            for row in (col + 1)..n {
                let mag = a[row * n + col].hi.abs();
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
                a[col * n + j] = a[col * n + j].div(pivot);
                inv.data[col * n + j] = inv.data[col * n + j].div(pivot);
            }
            for row in 0..n {
                if row == col {
                    continue;
                }
                let factor = a[row * n + col];
                if factor.is_zero() {
                    continue;
                }
                for j in 0..n {
                    a[row * n + j] = a[row * n + j].sub(factor.mul(a[col * n + j]));
                    inv.data[row * n + j] =
                        inv.data[row * n + j].sub(factor.mul(inv.data[col * n + j]));
                }
            }
        }
        Ok(inv)
    }
}
