//! Concatenated transforms — an ordered pipeline of stages evaluated as
//! a single math transform.

use std::sync::{Arc, OnceLock};

use log::debug;

use crate::domain::Envelope;
use crate::error::TransformError;
use crate::matrix::Matrix;
use crate::transform::{check_dimension, MathTransform};

pub struct ConcatenatedTransform {
    stages: Vec<Arc<dyn MathTransform>>,
    source_dim: usize,
    target_dim: usize,
    /// Largest dimension appearing anywhere in the pipeline; sizes the
    /// scratch buffers for bulk evaluation.
    max_dim: usize,
    inverse: OnceLock<Result<Arc<dyn MathTransform>, TransformError>>,
}

impl ConcatenatedTransform {
    /// Concatenate stages, checking adjacent dimensions and merging
    /// adjacent affine stages in extended precision. A single remaining
    /// stage is returned as-is.
    pub fn create(
        stages: Vec<Arc<dyn MathTransform>>,
    ) -> Result<Arc<dyn MathTransform>, TransformError> {
        if stages.is_empty() {
            return Err(TransformError::NoInverse(
                "cannot concatenate an empty stage list".into(),
            ));
        }
        for pair in stages.windows(2) {
            let out = pair[0].target_dimensions();
            let inn = pair[1].source_dimensions();
            if out != inn {
                return Err(TransformError::MismatchedDimension {
                    expected: out,
                    actual: inn,
                });
            }
        }

        // Fold adjacent affine stages into one extended-precision matrix.
        let mut merged: Vec<Arc<dyn MathTransform>> = Vec::with_capacity(stages.len());
        for stage in stages {
            let fused = match (merged.last(), stage.as_linear()) {
                (Some(prev), Some(lin)) => prev
                    .as_linear()
                    .map(|prev_lin| lin.concatenate(prev_lin))
                    .transpose()?,
                _ => None,
            };
            match fused {
                Some(f) => {
                    merged.pop();
                    merged.push(Arc::new(f));
                }
                None => merged.push(stage),
            }
        }

        if merged.len() == 1 {
            return Ok(merged.into_iter().next().unwrap());
        }
        debug!(
            "concatenated {} stages ({} -> {} dimensions)",
            merged.len(),
            merged.first().unwrap().source_dimensions(),
            merged.last().unwrap().target_dimensions()
        );

        let source_dim = merged.first().unwrap().source_dimensions();
        let target_dim = merged.last().unwrap().target_dimensions();
        let max_dim = merged
            .iter()
            .map(|s| s.source_dimensions().max(s.target_dimensions()))
            .max()
            .unwrap();
        Ok(Arc::new(Self {
            stages: merged,
            source_dim,
            target_dim,
            max_dim,
            inverse: OnceLock::new(),
        }))
    }

    pub fn stages(&self) -> &[Arc<dyn MathTransform>] {
        &self.stages
    }

    /// Pipe one point through all stages using the two caller-provided
    /// scratch buffers (each at least `max_dim` long).
    fn pipe(
        &self,
        src: &[f64],
        dst: &mut [f64],
        buf_a: &mut [f64],
        buf_b: &mut [f64],
    ) -> Result<(), TransformError> {
        buf_a[..src.len()].copy_from_slice(src);
        let mut cur_len = src.len();
        let last = self.stages.len() - 1;
        for (i, stage) in self.stages.iter().enumerate() {
            let out_len = stage.target_dimensions();
            if i == last {
                stage.transform_point(&buf_a[..cur_len], &mut dst[..out_len])?;
            } else {
                stage.transform_point(&buf_a[..cur_len], &mut buf_b[..out_len])?;
                buf_a[..out_len].copy_from_slice(&buf_b[..out_len]);
            }
            cur_len = out_len;
        }
        Ok(())
    }
}

impl MathTransform for ConcatenatedTransform {
    fn source_dimensions(&self) -> usize {
        self.source_dim
    }

    fn target_dimensions(&self) -> usize {
        self.target_dim
    }

    fn transform_point(&self, src: &[f64], dst: &mut [f64]) -> Result<(), TransformError> {
        check_dimension(src, self.source_dim)?;
        check_dimension(dst, self.target_dim)?;
        let mut buf_a = vec![0.0; self.max_dim];
        let mut buf_b = vec![0.0; self.max_dim];
        self.pipe(src, dst, &mut buf_a, &mut buf_b)
    }

    fn transform_array(
        &self,
        src: &[f64],
        src_offset: usize,
        dst: &mut [f64],
        dst_offset: usize,
        count: usize,
    ) -> Result<(), TransformError> {
        let sd = self.source_dim;
        let td = self.target_dim;
        // Scratch is hoisted out of the per-point loop.
        let mut buf_a = vec![0.0; self.max_dim];
        let mut buf_b = vec![0.0; self.max_dim];
        for i in 0..count {
            let s = src_offset + i * sd;
            let d = dst_offset + i * td;
            if s + sd > src.len() || d + td > dst.len() {
                return Err(TransformError::MismatchedDimension {
                    expected: (s + sd).max(d + td),
                    actual: src.len().min(dst.len()),
                });
            }
            self.pipe(&src[s..s + sd], &mut dst[d..d + td], &mut buf_a, &mut buf_b)
                .map_err(|e| e.at_point(i))?;
        }
        Ok(())
    }

    /// Chain-rule Jacobian: `J = J_n · … · J_1`, each stage's Jacobian
    /// evaluated at the point forwarded through the preceding stages.
    fn derivative(&self, point: &[f64]) -> Result<Matrix, TransformError> {
        check_dimension(point, self.source_dim)?;
        let mut current = point.to_vec();
        let mut total: Option<Matrix> = None;
        for stage in &self.stages {
            let mut next = vec![0.0; stage.target_dimensions()];
            let jacobian = stage.transform_with_derivative(&current, &mut next)?;
            total = Some(match total {
                None => jacobian,
                Some(t) => jacobian.multiply(&t)?,
            });
            current = next;
        }
        Ok(total.expect("stage list is non-empty"))
    }

    /// Reverse the stage list and invert each stage. Built inside the
    /// cell initializer so the first caller pays the (possibly
    /// iterative) inversion once and concurrent callers block on it.
    fn inverse(&self) -> Result<Arc<dyn MathTransform>, TransformError> {
        self.inverse
            .get_or_init(|| {
                let mut reversed: Vec<Arc<dyn MathTransform>> =
                    Vec::with_capacity(self.stages.len());
                for stage in self.stages.iter().rev() {
                    reversed.push(stage.inverse()?);
                }
                ConcatenatedTransform::create(reversed)
            })
            .clone()
    }

    fn domain(&self) -> Option<Envelope> {
        self.stages.first().and_then(|s| s.domain())
    }
}
