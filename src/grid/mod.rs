//! Datum shift grids and the grid-backed transform.
//!
//! A [`DatumShiftGrid`] is an immutable row-major lattice of shift
//! values (longitude/latitude offsets in radians for horizontal
//! datum grids). Lookups interpolate bilinearly between the four
//! surrounding nodes; shared grids are wrapped in `Arc` and read
//! concurrently without locking.

pub mod reader;

use std::sync::{Arc, OnceLock};

use crate::domain::Envelope;
use crate::error::{GridError, TransformError};
use crate::matrix::Matrix;
use crate::transform::{check_dimension, MathTransform};

/// How to treat lattice nodes holding the nodata sentinel.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodataPolicy {
    /// A sentinel node participating in an interpolation is an error
    /// (NTv2-style grids, where nodata means "not covered").
    Fail,
    /// A sentinel node contributes a zero shift (formats that define an
    /// absent value as "no correction").
    Zero,
}

#[derive(Debug)]
pub struct DatumShiftGrid {
    origin: [f64; 2],
    cell_size: [f64; 2],
    nx: usize,
    ny: usize,
    dim: usize,
    values: Vec<f64>,
    nodata: Option<f64>,
    policy: NodataPolicy,
}

impl DatumShiftGrid {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        origin: [f64; 2],
        cell_size: [f64; 2],
        nx: usize,
        ny: usize,
        dim: usize,
        values: Vec<f64>,
        nodata: Option<f64>,
        policy: NodataPolicy,
    ) -> Result<Self, GridError> {
        if nx < 2 || ny < 2 {
            return Err(GridError::Inconsistent(format!(
                "lattice needs at least 2x2 nodes, got {nx}x{ny}"
            )));
        }
        if dim == 0 {
            return Err(GridError::Inconsistent("zero-dimensional shift values".into()));
        }
        if !(cell_size[0] > 0.0 && cell_size[1] > 0.0) {
            return Err(GridError::Inconsistent(format!(
                "cell size must be positive, got [{}, {}]",
                cell_size[0], cell_size[1]
            )));
        }
        let expected = nx * ny * dim;
        if values.len() != expected {
            return Err(GridError::Inconsistent(format!(
                "expected {expected} values for {nx}x{ny}x{dim}, got {}",
                values.len()
            )));
        }
        if values
            .iter()
            .any(|v| !v.is_finite() && nodata.map_or(true, |nd| *v != nd))
        {
            return Err(GridError::Inconsistent("non-finite shift value".into()));
        }
        Ok(Self { origin, cell_size, nx, ny, dim, values, nodata, policy })
    }

    pub fn dim(&self) -> usize {
        self.dim
    }

    pub fn cell_size(&self) -> [f64; 2] {
        self.cell_size
    }

    /// Coverage of the lattice in grid coordinates.
    pub fn extent(&self) -> Envelope {
        Envelope::new_2d(
            self.origin[0],
            self.origin[1],
            self.origin[0] + self.cell_size[0] * (self.nx - 1) as f64,
            self.origin[1] + self.cell_size[1] * (self.ny - 1) as f64,
        )
    }

    fn node(&self, i: usize, j: usize, k: usize) -> f64 {
        self.values[(j * self.nx + i) * self.dim + k]
    }

    /// Bilinear interpolation of the shift vector at `(x, y)`.
    ///
    /// An exact node hit returns the stored values exactly. Points
    /// outside the lattice fail with `OutsideDomain`; sentinel nodes
    /// follow the grid's [`NodataPolicy`].
    pub fn interpolate_at(&self, x: f64, y: f64, out: &mut [f64]) -> Result<(), TransformError> {
        check_dimension(out, self.dim)?;
        let fx = (x - self.origin[0]) / self.cell_size[0];
        let fy = (y - self.origin[1]) / self.cell_size[1];
        if fx < 0.0 || fy < 0.0 || fx > (self.nx - 1) as f64 || fy > (self.ny - 1) as f64 {
            return Err(TransformError::OutsideDomain { x, y });
        }
        // Clamp so the top/right edges fall in the last cell.
        let i0 = (fx.floor() as usize).min(self.nx - 2);
        let j0 = (fy.floor() as usize).min(self.ny - 2);
        let tx = fx - i0 as f64;
        let ty = fy - j0 as f64;

        let corners = [
            (i0, j0, (1.0 - tx) * (1.0 - ty)),
            (i0 + 1, j0, tx * (1.0 - ty)),
            (i0, j0 + 1, (1.0 - tx) * ty),
            (i0 + 1, j0 + 1, tx * ty),
        ];
        out.fill(0.0);
        for (i, j, w) in corners {
            if w == 0.0 {
                continue;
            }
            for k in 0..self.dim {
                let v = self.node(i, j, k);
                if self.nodata.is_some_and(|nd| v == nd) {
                    match self.policy {
                        NodataPolicy::Fail => {
                            return Err(TransformError::OutsideDomain { x, y })
                        }
                        NodataPolicy::Zero => continue,
                    }
                }
                out[k] += w * v;
            }
        }
        Ok(())
    }
}

/// Two-dimensional grid-backed datum shift.
///
/// Forward adds the interpolated shift to the input coordinate. The
/// inverse has no closed form; it runs the standard fixed-point
/// iteration, looking the shift up at the current estimate.
pub struct GridShiftTransform {
    grid: Arc<DatumShiftGrid>,
    forward: bool,
    inverse: OnceLock<Arc<GridShiftTransform>>,
}

/// Fixed-point iteration cap for the inverse shift.
const MAX_INVERSE_ITERATIONS: usize = 15;

impl GridShiftTransform {
    pub fn new(grid: Arc<DatumShiftGrid>) -> Result<Self, GridError> {
        if grid.dim() != 2 {
            return Err(GridError::Inconsistent(format!(
                "horizontal shift grid must carry 2 values per node, got {}",
                grid.dim()
            )));
        }
        Ok(Self { grid, forward: true, inverse: OnceLock::new() })
    }

    fn shift(&self, x: f64, y: f64) -> Result<[f64; 2], TransformError> {
        let mut s = [0.0; 2];
        self.grid.interpolate_at(x, y, &mut s)?;
        Ok(s)
    }

    fn apply_forward(&self, x: f64, y: f64) -> Result<[f64; 2], TransformError> {
        let s = self.shift(x, y)?;
        Ok([x + s[0], y + s[1]])
    }

    fn apply_inverse(&self, x: f64, y: f64) -> Result<[f64; 2], TransformError> {
        let cell = self.grid.cell_size();
        let tol_x = 1e-12 * cell[0];
        let tol_y = 1e-12 * cell[1];
        let mut gx = x;
        let mut gy = y;
        let mut delta = f64::MAX;
        for _ in 0..MAX_INVERSE_ITERATIONS {
            let s = self.shift(gx, gy)?;
            let nx = x - s[0];
            let ny = y - s[1];
            let dx = nx - gx;
            let dy = ny - gy;
            gx = nx;
            gy = ny;
            if dx.abs() < tol_x && dy.abs() < tol_y {
                return Ok([gx, gy]);
            }
            delta = dx.hypot(dy);
        }
        Err(TransformError::NonConvergence {
            iterations: MAX_INVERSE_ITERATIONS,
            delta,
        })
    }

    /// Jacobian of the forward shift: identity plus the finite-difference
    /// gradient of the shift field. The half-cell stencil is clamped to
    /// the lattice, so points near an edge fall back to a one-sided
    /// difference instead of stepping outside the coverage.
    fn forward_derivative(&self, x: f64, y: f64) -> Result<Matrix, TransformError> {
        let cell = self.grid.cell_size();
        let extent = self.grid.extent();
        let xp = (x + cell[0] / 2.0).min(extent.max(0));
        let xm = (x - cell[0] / 2.0).max(extent.min(0));
        let yp = (y + cell[1] / 2.0).min(extent.max(1));
        let ym = (y - cell[1] / 2.0).max(extent.min(1));
        let east = self.shift(xp, y)?;
        let west = self.shift(xm, y)?;
        let north = self.shift(x, yp)?;
        let south = self.shift(x, ym)?;
        Ok(Matrix::from_row_major(
            2,
            2,
            vec![
                1.0 + (east[0] - west[0]) / (xp - xm),
                (north[0] - south[0]) / (yp - ym),
                (east[1] - west[1]) / (xp - xm),
                1.0 + (north[1] - south[1]) / (yp - ym),
            ],
        ))
    }
}

impl MathTransform for GridShiftTransform {
    fn source_dimensions(&self) -> usize {
        2
    }

    fn target_dimensions(&self) -> usize {
        2
    }

    fn transform_point(&self, src: &[f64], dst: &mut [f64]) -> Result<(), TransformError> {
        check_dimension(src, 2)?;
        check_dimension(dst, 2)?;
        let out = if self.forward {
            self.apply_forward(src[0], src[1])?
        } else {
            self.apply_inverse(src[0], src[1])?
        };
        dst[0] = out[0];
        dst[1] = out[1];
        Ok(())
    }

    fn derivative(&self, point: &[f64]) -> Result<Matrix, TransformError> {
        check_dimension(point, 2)?;
        if self.forward {
            self.forward_derivative(point[0], point[1])
        } else {
            // Differentiate at the recovered source point, then invert.
            let src = self.apply_inverse(point[0], point[1])?;
            self.forward_derivative(src[0], src[1])?.inverse()
        }
    }

    fn inverse(&self) -> Result<Arc<dyn MathTransform>, TransformError> {
        let inv = self.inverse.get_or_init(|| {
            Arc::new(GridShiftTransform {
                grid: Arc::clone(&self.grid),
                forward: !self.forward,
                inverse: OnceLock::new(),
            })
        });
        Ok(Arc::clone(inv) as Arc<dyn MathTransform>)
    }

    fn domain(&self) -> Option<Envelope> {
        Some(self.grid.extent())
    }
}
