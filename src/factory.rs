//! Coordinate operation factory.
//!
//! Turns a pair of [`Crs`] descriptors into a single
//! [`MathTransform`] chain. Every operation pivots through geographic
//! longitude/latitude in radians on the source datum: the source chain
//! normalizes into that space, a registered datum shift bridges datums
//! when they differ, and the target chain is the mirror image built
//! forward. Affine stages (axis swaps, unit conversions, central
//! meridian, semi-major scale, false offsets) are composed in extended
//! precision, so adjacent stages collapse without double rounding when
//! the concatenation merges them.

use std::sync::Arc;

use crate::crs::{
    AxisOrder, Crs, GeographicCrs, ProjectedCrs, ProjectionMethod, ProjectionParameters,
};
use crate::domain::{wrap_longitude, Envelope};
use crate::error::{FactoryError, TransformError};
use crate::matrix::double::{deg_to_rad, DoubleDouble};
use crate::matrix::{ExtendedMatrix, Matrix};
use crate::proj::lambert_azimuthal::LambertAzimuthalEqualArea;
use crate::proj::lambert_conformal::LambertConformalConic;
use crate::proj::mercator::{AuthalicMercator, EllipsoidalMercator, Mercator};
use crate::proj::stereographic::PolarStereographic;
use crate::proj::transverse_mercator::TransverseMercator;
use crate::proj::{NormalizedProjection, ProjectionTransform};
use crate::transform::{
    check_dimension, ConcatenatedTransform, LinearTransform, MathTransform, PassThroughTransform,
};

struct DatumShiftEntry {
    from: String,
    to: String,
    transform: Arc<dyn MathTransform>,
    /// Stated accuracy in metres; the tie-break key between candidate
    /// paths.
    accuracy: f64,
}

#[derive(Default)]
pub struct OperationFactory {
    shifts: Vec<DatumShiftEntry>,
}

impl OperationFactory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a horizontal datum shift between two named datums. The
    /// transform operates on geographic lon-lat in radians and must be
    /// invertible if operations in the opposite direction are wanted.
    pub fn register_datum_shift(
        &mut self,
        from: impl Into<String>,
        to: impl Into<String>,
        transform: Arc<dyn MathTransform>,
        accuracy: f64,
    ) {
        self.shifts.push(DatumShiftEntry {
            from: from.into(),
            to: to.into(),
            transform,
            accuracy,
        });
    }

    pub fn create_operation(
        &self,
        source: &Crs,
        target: &Crs,
    ) -> Result<Arc<dyn MathTransform>, FactoryError> {
        match (source, target) {
            (
                Crs::Compound { horizontal: sh, vertical: sv },
                Crs::Compound { horizontal: th, vertical: tv },
            ) => {
                let horizontal = self.create_operation(sh, th)?;
                let dim = sh.dimension();
                let mut stages: Vec<Arc<dyn MathTransform>> =
                    vec![Arc::new(PassThroughTransform::new(horizontal, 0, 1))];
                if sv.unit_to_metres != tv.unit_to_metres {
                    stages.push(Arc::new(axis_scale(
                        dim + 1,
                        dim,
                        DoubleDouble::from(sv.unit_to_metres)
                            .div(DoubleDouble::from(tv.unit_to_metres)),
                    )?));
                }
                log::debug!(
                    "compound operation {} -> {}: height carried through",
                    describe(source),
                    describe(target)
                );
                Ok(ConcatenatedTransform::create(stages)?)
            }
            (Crs::Compound { .. }, _) | (_, Crs::Compound { .. }) => {
                Err(self.not_found(source, target))
            }
            _ => {
                if source.dimension() != target.dimension() {
                    return Err(self.not_found(source, target));
                }
                let mut stages = Vec::new();
                self.push_to_pivot(source, &mut stages)?;
                if source.datum() != target.datum() {
                    stages.push(self.datum_shift(source, target)?);
                }
                self.push_from_pivot(target, &mut stages)?;
                let op = ConcatenatedTransform::create(stages)?;
                log::debug!(
                    "operation {} -> {}: {} source dims, {} target dims",
                    describe(source),
                    describe(target),
                    op.source_dimensions(),
                    op.target_dimensions()
                );
                Ok(op)
            }
        }
    }

    /// Stages taking the source CRS to geographic lon-lat radians on
    /// its own datum.
    fn push_to_pivot(
        &self,
        crs: &Crs,
        stages: &mut Vec<Arc<dyn MathTransform>>,
    ) -> Result<(), FactoryError> {
        match crs {
            Crs::Geographic(geo) => {
                stages.push(Arc::new(normalize_geographic(geo)?));
                Ok(())
            }
            Crs::Projected(proj) => {
                let chain = projection_chain(proj)?;
                for stage in chain.iter().rev() {
                    stages.push(stage.inverse().map_err(FactoryError::Transform)?);
                }
                Ok(())
            }
            Crs::Compound { .. } => Err(self.not_found(crs, crs)),
        }
    }

    /// Stages taking geographic lon-lat radians on the target datum to
    /// the target CRS.
    fn push_from_pivot(
        &self,
        crs: &Crs,
        stages: &mut Vec<Arc<dyn MathTransform>>,
    ) -> Result<(), FactoryError> {
        match crs {
            Crs::Geographic(geo) => {
                let normalize = normalize_geographic(geo)?;
                stages.push(normalize.inverse().map_err(FactoryError::Transform)?);
                Ok(())
            }
            Crs::Projected(proj) => {
                stages.extend(projection_chain(proj)?);
                Ok(())
            }
            Crs::Compound { .. } => Err(self.not_found(crs, crs)),
        }
    }

    /// Pick the registered shift bridging the two datums: smallest
    /// stated accuracy wins, exact ties are ambiguous.
    fn datum_shift(
        &self,
        source: &Crs,
        target: &Crs,
    ) -> Result<Arc<dyn MathTransform>, FactoryError> {
        let from = source.datum();
        let to = target.datum();
        let mut candidates: Vec<(f64, Arc<dyn MathTransform>)> = Vec::new();
        for entry in &self.shifts {
            if entry.from == from && entry.to == to {
                candidates.push((entry.accuracy, Arc::clone(&entry.transform)));
            } else if entry.from == to && entry.to == from {
                let inv = entry.transform.inverse().map_err(FactoryError::Transform)?;
                candidates.push((entry.accuracy, inv));
            }
        }
        if candidates.is_empty() {
            return Err(self.not_found(source, target));
        }
        candidates.sort_by(|a, b| a.0.total_cmp(&b.0));
        let best = candidates[0].0;
        let tied = candidates.iter().filter(|(acc, _)| *acc == best).count();
        if tied > 1 {
            return Err(FactoryError::AmbiguousOperation {
                source_crs: describe(source),
                target_crs: describe(target),
                candidates: tied,
            });
        }
        let (_, transform) = candidates.swap_remove(0);
        // Shifts are horizontal; lift over any extra ordinates.
        let dim = source.dimension();
        if dim > 2 {
            Ok(Arc::new(PassThroughTransform::new(transform, 0, dim - 2)))
        } else {
            Ok(transform)
        }
    }

    fn not_found(&self, source: &Crs, target: &Crs) -> FactoryError {
        FactoryError::OperationNotFound {
            source_crs: describe(source),
            target_crs: describe(target),
        }
    }
}

fn describe(crs: &Crs) -> String {
    match crs {
        Crs::Geographic(g) => format!("Geographic({})", g.datum),
        Crs::Projected(p) => format!("Projected({:?} on {})", p.method, p.base.datum),
        Crs::Compound { horizontal, .. } => format!("Compound({})", describe(horizontal)),
    }
}

/// Affine from caller axis order and angular unit to lon-lat radians,
/// carrying any extra ordinates through unchanged.
fn normalize_geographic(geo: &GeographicCrs) -> Result<LinearTransform, FactoryError> {
    if !(geo.unit_to_radians > 0.0) {
        return Err(FactoryError::invalid_parameter(
            "unit_to_radians",
            format!("must be positive, got {}", geo.unit_to_radians),
        ));
    }
    if geo.dimension < 2 {
        return Err(FactoryError::invalid_parameter(
            "dimension",
            format!("geographic CRS needs at least 2 ordinates, got {}", geo.dimension),
        ));
    }
    let scale = angular_unit(geo.unit_to_radians);
    let dim = geo.dimension;
    let mut m = ExtendedMatrix::identity(dim + 1);
    let (lon_col, lat_col) = match geo.axis_order {
        AxisOrder::LonLat => (0, 1),
        AxisOrder::LatLon => (1, 0),
    };
    m.set(0, 0, DoubleDouble::ZERO);
    m.set(1, 1, DoubleDouble::ZERO);
    m.set(0, lon_col, scale);
    m.set(1, lat_col, scale);
    LinearTransform::new(m).map_err(FactoryError::Transform)
}

/// Extended-precision angular unit factor; the degree case uses the
/// double-double π/180 so that deg→rad∘rad→deg collapses exactly.
fn angular_unit(unit_to_radians: f64) -> DoubleDouble {
    if unit_to_radians == std::f64::consts::PI / 180.0 {
        deg_to_rad()
    } else {
        DoubleDouble::from(unit_to_radians)
    }
}

/// Diagonal affine scaling one axis, identity elsewhere.
fn axis_scale(
    dim: usize,
    axis: usize,
    factor: DoubleDouble,
) -> Result<LinearTransform, TransformError> {
    let mut m = ExtendedMatrix::identity(dim + 1);
    m.set(axis, axis, factor);
    LinearTransform::new(m)
}

/// Forward stages for a projected CRS: geographic lon-lat radians →
/// normalize affine → (longitude wrap) → kernel → denormalize affine.
fn projection_chain(proj: &ProjectedCrs) -> Result<Vec<Arc<dyn MathTransform>>, FactoryError> {
    let params = &proj.parameters;
    if !(params.scale_factor > 0.0) {
        return Err(FactoryError::invalid_parameter(
            "scale_factor",
            format!("must be positive, got {}", params.scale_factor),
        ));
    }
    if !(proj.unit_to_metres > 0.0) {
        return Err(FactoryError::invalid_parameter(
            "unit_to_metres",
            format!("must be positive, got {}", proj.unit_to_metres),
        ));
    }

    let ellipsoid = proj.base.ellipsoid;
    let (kernel, k0): (Arc<dyn NormalizedProjection>, f64) = match proj.method {
        ProjectionMethod::SphericalMercator => {
            (Arc::new(Mercator), mercator_scale(params, |lat| lat.cos()))
        }
        ProjectionMethod::Mercator => (
            Arc::new(EllipsoidalMercator::new(ellipsoid)),
            mercator_scale(params, |lat| crate::proj::common::msfn(lat, ellipsoid.e2)),
        ),
        ProjectionMethod::AuthalicMercator => (Arc::new(AuthalicMercator::new(ellipsoid)), 1.0),
        ProjectionMethod::TransverseMercator => (
            Arc::new(TransverseMercator::new(
                ellipsoid,
                params.latitude_of_origin.to_radians(),
            )),
            params.scale_factor,
        ),
        ProjectionMethod::LambertConformalConic => {
            let lcc = match (params.standard_parallel_1, params.standard_parallel_2) {
                (Some(sp1), Some(sp2)) => LambertConformalConic::secant(
                    ellipsoid,
                    sp1.to_radians(),
                    sp2.to_radians(),
                    params.latitude_of_origin.to_radians(),
                )?,
                _ => LambertConformalConic::tangent(
                    ellipsoid,
                    params.latitude_of_origin.to_radians(),
                )?,
            };
            (Arc::new(lcc), params.scale_factor)
        }
        ProjectionMethod::LambertAzimuthalEqualArea => (
            Arc::new(LambertAzimuthalEqualArea::new(
                ellipsoid,
                params.latitude_of_origin.to_radians(),
            )),
            1.0,
        ),
        ProjectionMethod::PolarStereographicNorth | ProjectionMethod::PolarStereographicSouth => {
            let north = matches!(proj.method, ProjectionMethod::PolarStereographicNorth);
            let ps = PolarStereographic::new(ellipsoid, north);
            let k0 = match params.standard_parallel_1 {
                Some(sp1) => ps.scale_at(sp1.to_radians()),
                None => params.scale_factor,
            };
            (Arc::new(ps), k0)
        }
    };

    let mut stages: Vec<Arc<dyn MathTransform>> = Vec::with_capacity(3);

    // Normalize: shift the central meridian to zero, in extended
    // precision straight from the degree value. When the recentred zone
    // straddles the ±π seam the shift must wrap in both directions;
    // otherwise a plain affine suffices and folds into the normalize
    // step.
    if params.central_meridian != 0.0 {
        let lam0 = DoubleDouble::from(params.central_meridian).mul(deg_to_rad());
        let d = kernel.domain();
        let shifted =
            Envelope::new_2d(d.min(0) + lam0.hi, d.min(1), d.max(0) + lam0.hi, d.max(1));
        if shifted.crosses_antimeridian() {
            stages.push(Arc::new(CentralMeridianShift::new(lam0.neg())));
        } else {
            stages.push(Arc::new(LinearTransform::scale_translate_2d(
                DoubleDouble::ONE,
                DoubleDouble::ONE,
                lam0.neg(),
                DoubleDouble::ZERO,
            )));
        }
    }

    stages.push(Arc::new(ProjectionTransform::new(kernel)));

    // Denormalize: semi-major axis, scale factor and linear unit on
    // both axes, then false offsets in the projected unit.
    let scale = DoubleDouble::from(ellipsoid.a)
        .mul(DoubleDouble::from(k0))
        .div(DoubleDouble::from(proj.unit_to_metres));
    stages.push(Arc::new(LinearTransform::scale_translate_2d(
        scale,
        scale,
        DoubleDouble::from(params.false_easting),
        DoubleDouble::from(params.false_northing),
    )));

    Ok(stages)
}

fn mercator_scale(params: &ProjectionParameters, at_parallel: impl Fn(f64) -> f64) -> f64 {
    match params.standard_parallel_1 {
        Some(sp1) => at_parallel(sp1.to_radians()),
        None => params.scale_factor,
    }
}

/// Central-meridian recentring for zones straddling the ±π seam:
/// translates longitude in extended precision, then normalizes the
/// result into (−π, π]; latitude passes through. The inverse translates
/// by the opposite offset and wraps again, so longitudes recovered past
/// the seam land back in the principal range.
struct CentralMeridianShift {
    offset: DoubleDouble,
}

impl CentralMeridianShift {
    fn new(offset: DoubleDouble) -> Self {
        Self { offset }
    }
}

impl MathTransform for CentralMeridianShift {
    fn source_dimensions(&self) -> usize {
        2
    }

    fn target_dimensions(&self) -> usize {
        2
    }

    fn transform_point(&self, src: &[f64], dst: &mut [f64]) -> Result<(), TransformError> {
        check_dimension(src, 2)?;
        check_dimension(dst, 2)?;
        dst[0] = wrap_longitude(DoubleDouble::from(src[0]).add(self.offset).value());
        dst[1] = src[1];
        Ok(())
    }

    fn derivative(&self, point: &[f64]) -> Result<Matrix, TransformError> {
        check_dimension(point, 2)?;
        Ok(Matrix::identity(2))
    }

    fn inverse(&self) -> Result<Arc<dyn MathTransform>, TransformError> {
        Ok(Arc::new(CentralMeridianShift::new(self.offset.neg())))
    }
}
